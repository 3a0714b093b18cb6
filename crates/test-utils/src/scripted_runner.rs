use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::Mutex;
use std::time::Duration;

use nfvbench::errors::BenchError;
use nfvbench::exec::{CommandOutput, CommandRunner, RunFuture};

/// Reported duration of every scripted command.
pub const SCRIPTED_ELAPSED: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
enum Step {
    Output(i32, String),
    LaunchError,
}

/// One command the runner was asked to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub action: String,
    pub command: String,
}

#[derive(Debug, Default)]
struct State {
    queued: HashMap<String, VecDeque<Step>>,
    defaults: HashMap<String, Step>,
    calls: Vec<Call>,
}

/// A `CommandRunner` that:
/// - replays queued outputs per action name, in order
/// - falls back to a per-action default once the queue is empty
///   (exit 0 with empty stdout when no default is set)
/// - records every call, including poll checks.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    state: Mutex<State>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one output for `action`.
    pub fn push(&self, action: &str, exit_code: i32, stdout: &str) -> &Self {
        let mut state = self.state.lock().unwrap();
        state
            .queued
            .entry(action.to_string())
            .or_default()
            .push_back(Step::Output(exit_code, stdout.to_string()));
        self
    }

    /// Queue `n` identical outputs for `action`.
    pub fn push_n(&self, action: &str, n: usize, exit_code: i32, stdout: &str) -> &Self {
        for _ in 0..n {
            self.push(action, exit_code, stdout);
        }
        self
    }

    /// Queue a launch failure for `action`.
    pub fn push_launch_error(&self, action: &str) -> &Self {
        let mut state = self.state.lock().unwrap();
        state
            .queued
            .entry(action.to_string())
            .or_default()
            .push_back(Step::LaunchError);
        self
    }

    pub fn set_default(&self, action: &str, exit_code: i32, stdout: &str) -> &Self {
        let mut state = self.state.lock().unwrap();
        state
            .defaults
            .insert(action.to_string(), Step::Output(exit_code, stdout.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Action names of every call, in order.
    pub fn actions(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.action).collect()
    }

    pub fn count(&self, action: &str) -> usize {
        self.calls().iter().filter(|c| c.action == action).count()
    }

    fn next(&self, action: &str, command: &str) -> Step {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call {
            action: action.to_string(),
            command: command.to_string(),
        });
        if let Some(step) = state.queued.get_mut(action).and_then(VecDeque::pop_front) {
            return step;
        }
        state
            .defaults
            .get(action)
            .cloned()
            .unwrap_or_else(|| Step::Output(0, String::new()))
    }
}

impl CommandRunner for ScriptedRunner {
    fn run<'a>(&'a self, action: &'a str, command: &'a str) -> RunFuture<'a> {
        let step = self.next(action, command);
        Box::pin(async move {
            match step {
                Step::Output(code, stdout) => Ok(CommandOutput::new(code, stdout, SCRIPTED_ELAPSED)),
                Step::LaunchError => Err(BenchError::Execution {
                    action: action.to_string(),
                    source: io::Error::new(io::ErrorKind::NotFound, "scripted launch failure"),
                }),
            }
        })
    }
}

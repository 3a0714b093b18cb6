// src/orchestrator/gatekeeper.rs

//! REST gatekeeper variant of the orchestrator.
//!
//! The gatekeeper exposes `POST /packages` (multipart upload) and
//! `POST /instantiations` (empty JSON body). Requests are issued through the
//! same `CommandRunner` as the CLI variant, as `curl` invocations that print
//! only the HTTP status code; success means a 2xx status.

use std::sync::Arc;

use tracing::{error, info};

use crate::errors::{BenchError, Result};
use crate::exec::CommandRunner;
use crate::session::ExperimentSession;
use crate::status::parse_http_status;

use super::commands::quote;

pub const PACKAGE_ONBOARD: &str = "package-onboard";
pub const SERVICE_INSTANTIATE: &str = "service-instantiate";

pub struct GatekeeperClient<R: CommandRunner> {
    runner: Arc<R>,
    endpoint: String,
}

impl<R: CommandRunner> GatekeeperClient<R> {
    pub fn new(runner: Arc<R>, endpoint: impl Into<String>) -> Self {
        Self {
            runner,
            endpoint: endpoint.into(),
        }
    }

    pub fn onboard_command(&self, package: &str) -> String {
        format!(
            "curl -s -o /dev/null -w '%{{http_code}}' -X POST -F {} http://{}/packages",
            quote(&format!("package=@{package}")),
            self.endpoint
        )
    }

    pub fn instantiate_command(&self) -> String {
        format!(
            "curl -s -o /dev/null -w '%{{http_code}}' -X POST -H 'Content-Type: application/json' -d '{{}}' http://{}/instantiations",
            self.endpoint
        )
    }

    /// Upload a service package. Failure is fatal.
    pub async fn onboard(&self, session: &mut ExperimentSession, package: &str) -> Result<u16> {
        let cmd = self.onboard_command(package);
        self.request(session, PACKAGE_ONBOARD, &cmd).await
    }

    /// Instantiate the onboarded service. Failure is fatal.
    pub async fn instantiate(&self, session: &mut ExperimentSession) -> Result<u16> {
        let cmd = self.instantiate_command();
        self.request(session, SERVICE_INSTANTIATE, &cmd).await
    }

    async fn request(&self, session: &mut ExperimentSession, action: &str, cmd: &str) -> Result<u16> {
        let started = std::time::Instant::now();
        let out = match self.runner.run(action, cmd).await {
            Ok(out) => out,
            Err(err) => {
                session.record(action, started.elapsed());
                return Err(err);
            }
        };
        session.record(action, out.elapsed);

        let status = parse_http_status(&out.stdout);
        match status {
            Some(code) if out.success() && (200..300).contains(&code) => {
                info!(action, status = code, "gatekeeper request accepted");
                Ok(code)
            }
            _ => {
                error!(action, exit_code = out.exit_code, ?status, "gatekeeper request failed");
                Err(BenchError::OperationFailed {
                    action: action.to_string(),
                    exit_code: status.map(i32::from).unwrap_or(out.exit_code),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::ShellCommandRunner;

    fn client() -> GatekeeperClient<ShellCommandRunner> {
        GatekeeperClient::new(Arc::new(ShellCommandRunner::default()), "127.0.0.1:5000")
    }

    #[test]
    fn onboard_uploads_package_as_multipart_field() {
        assert_eq!(
            client().onboard_command("pkgs/svc.son"),
            "curl -s -o /dev/null -w '%{http_code}' -X POST -F package=@pkgs/svc.son http://127.0.0.1:5000/packages"
        );
    }

    #[test]
    fn instantiate_posts_empty_json() {
        let cmd = client().instantiate_command();
        assert!(cmd.contains("-d '{}'"));
        assert!(cmd.ends_with("http://127.0.0.1:5000/instantiations"));
    }
}

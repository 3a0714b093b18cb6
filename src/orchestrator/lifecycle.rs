// src/orchestrator/lifecycle.rs

//! Lifecycle operations against the orchestrator CLI.
//!
//! Every public primitive records exactly one `TimedResult` in the session,
//! including when it fails, and records it *before* mutating the session's
//! counters. Poll checks issued while waiting are not recorded on their own;
//! for create-then-wait primitives the wait is folded into the primitive's
//! duration.
//!
//! Per service instance:
//!
//! ```text
//! [absent] --instantiate--> [pending] --poll:ready--> [ready]
//! [ready]  --terminate----> [pending-delete] --poll:gone--> [absent]
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::config::ServiceSection;
use crate::errors::{BenchError, Result};
use crate::exec::{CommandOutput, CommandRunner};
use crate::poll::{PollOutcome, RetryPolicy, wait_until};
use crate::session::ExperimentSession;
use crate::status::{is_ready, parse_account_list, parse_instance_list, parse_instance_status};

use super::commands::{OsmCommands, action};

pub struct LifecycleOrchestrator<R: CommandRunner> {
    runner: Arc<R>,
    commands: OsmCommands,
    policy: RetryPolicy,
}

impl<R: CommandRunner> Clone for LifecycleOrchestrator<R> {
    fn clone(&self) -> Self {
        Self {
            runner: Arc::clone(&self.runner),
            commands: self.commands.clone(),
            policy: self.policy,
        }
    }
}

impl<R: CommandRunner> fmt::Debug for LifecycleOrchestrator<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleOrchestrator")
            .field("commands", &self.commands)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<R: CommandRunner> LifecycleOrchestrator<R> {
    pub fn new(runner: Arc<R>, commands: OsmCommands, policy: RetryPolicy) -> Self {
        Self {
            runner,
            commands,
            policy,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn commands(&self) -> &OsmCommands {
        &self.commands
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run one primitive. A launch failure is recorded before it is returned.
    async fn primitive(
        &self,
        session: &mut ExperimentSession,
        action: &str,
        command: &str,
    ) -> Result<CommandOutput> {
        let started = Instant::now();
        match self.runner.run(action, command).await {
            Ok(out) => Ok(out),
            Err(err) => {
                session.record(action, started.elapsed());
                error!(action, error = %err, "external command could not be run");
                Err(err)
            }
        }
    }

    fn failed(action: &str, out: &CommandOutput) -> BenchError {
        BenchError::OperationFailed {
            action: action.to_string(),
            exit_code: out.exit_code,
        }
    }

    // ---- infrastructure accounts -------------------------------------------------

    /// Register the PoP listening on `port` as an infrastructure account.
    /// Failure is fatal.
    pub async fn attach_account(&self, session: &mut ExperimentSession, port: u32) -> Result<()> {
        let cmd = self.commands.vim_create(port);
        let out = self.primitive(session, action::VIM_CREATE, &cmd).await?;
        session.record(action::VIM_CREATE, out.elapsed);

        if !out.success() {
            error!(port, exit_code = out.exit_code, "attaching account failed");
            return Err(Self::failed(action::VIM_CREATE, &out));
        }
        session.mark_attached(port);
        Ok(())
    }

    /// `vim-show` for one account; `Ok(false)` when the orchestrator does not
    /// know it.
    pub async fn show_account(&self, session: &mut ExperimentSession, port: u32) -> Result<bool> {
        let cmd = self.commands.vim_show(port);
        let out = self.primitive(session, action::VIM_SHOW, &cmd).await?;
        session.record(action::VIM_SHOW, out.elapsed);
        Ok(out.success())
    }

    /// Show every given account; any unknown account is fatal.
    pub async fn show_accounts(&self, session: &mut ExperimentSession, ports: &[u32]) -> Result<()> {
        for &port in ports {
            if !self.show_account(session, port).await? {
                error!(port, "attached account is not visible on the orchestrator");
                return Err(BenchError::OperationFailed {
                    action: action::VIM_SHOW.to_string(),
                    exit_code: 1,
                });
            }
        }
        Ok(())
    }

    /// Remove one account and wait until `vim-show` no longer finds it.
    ///
    /// Failures are tolerated: a non-zero `vim-delete` or a wait that never
    /// sees the account disappear is logged and reported as `Ok(false)`, and
    /// the account stays in the session's attached set. Callers retry with
    /// [`detach_all`](Self::detach_all).
    pub async fn detach_account(
        &self,
        session: &mut ExperimentSession,
        port: u32,
        force: bool,
    ) -> Result<bool> {
        let cmd = self.commands.vim_delete(port, force);
        let out = self.primitive(session, action::VIM_DELETE, &cmd).await?;
        session.record(action::VIM_DELETE, out.elapsed);

        if !out.success() {
            warn!(port, exit_code = out.exit_code, force, "detaching account failed; tolerated");
            return Ok(false);
        }

        let outcome = self.wait_account_gone(port).await?;
        if !outcome.is_converged() {
            warn!(port, attempts = outcome.attempts(), "account still visible after detach");
            return Ok(false);
        }

        session.mark_detached(port);
        Ok(true)
    }

    /// List accounts, detach each one, and reconcile the session with what
    /// the orchestrator reported. Returns the listed accounts, or `None`
    /// when the listing itself failed; the session is left untouched then.
    pub async fn detach_all(
        &self,
        session: &mut ExperimentSession,
        force: bool,
    ) -> Result<Option<Vec<u32>>> {
        let Some(listed) = self.list_accounts_checked(session).await else {
            return Ok(None);
        };

        // Accounts the orchestrator no longer reports are gone.
        let stale: Vec<u32> = session
            .attached_accounts()
            .iter()
            .copied()
            .filter(|a| !listed.contains(a))
            .collect();
        for account in stale {
            debug!(account, "account no longer listed; dropping from session");
            session.mark_detached(account);
        }

        for &port in &listed {
            self.detach_account(session, port, force).await?;
        }
        Ok(Some(listed))
    }

    /// `vim-list`, parsed. Never fails: any problem yields an empty list.
    pub async fn list_accounts(&self, session: &mut ExperimentSession) -> Vec<u32> {
        self.list_accounts_checked(session).await.unwrap_or_default()
    }

    /// `vim-list`, parsed; `None` when the command could not be run or
    /// exited non-zero.
    pub async fn list_accounts_checked(&self, session: &mut ExperimentSession) -> Option<Vec<u32>> {
        let cmd = self.commands.vim_list();
        let out = match self.primitive(session, action::VIM_LIST, &cmd).await {
            Ok(out) => out,
            Err(err) => {
                warn!(error = %err, "listing accounts failed");
                return None;
            }
        };
        session.record(action::VIM_LIST, out.elapsed);

        if !out.success() {
            warn!(exit_code = out.exit_code, "listing accounts failed");
            return None;
        }
        let accounts = parse_account_list(&out.stdout, self.commands.account_prefix());
        info!(?accounts, "accounts listed");
        Some(accounts)
    }

    async fn account_gone(&self, port: u32) -> Result<bool> {
        let cmd = self.commands.vim_show(port);
        let out = self.runner.run(action::VIM_SHOW, &cmd).await?;
        Ok(!out.success())
    }

    async fn wait_account_gone(&self, port: u32) -> Result<PollOutcome> {
        wait_until(&self.policy, "account gone", move || self.account_gone(port)).await
    }

    // ---- descriptors ---------------------------------------------------------------

    pub async fn onboard_vnfd(&self, session: &mut ExperimentSession, package: &str) -> Result<()> {
        let cmd = self.commands.vnfd_create(package);
        self.fatal_primitive(session, action::VNFD_CREATE, &cmd).await
    }

    pub async fn onboard_nsd(&self, session: &mut ExperimentSession, package: &str) -> Result<()> {
        let cmd = self.commands.nsd_create(package);
        self.fatal_primitive(session, action::NSD_CREATE, &cmd).await
    }

    /// Onboard every VNF descriptor, then the service descriptor.
    pub async fn onboard_service(
        &self,
        session: &mut ExperimentSession,
        service: &ServiceSection,
    ) -> Result<()> {
        for package in &service.vnfd_packages {
            self.onboard_vnfd(session, package).await?;
        }
        self.onboard_nsd(session, &service.nsd_package).await
    }

    pub async fn delete_nsd(&self, session: &mut ExperimentSession, name: &str, force: bool) -> Result<()> {
        let cmd = self.commands.nsd_delete(name, force);
        self.delete_primitive(session, action::NSD_DELETE, &cmd, force).await
    }

    pub async fn delete_vnfd(&self, session: &mut ExperimentSession, name: &str, force: bool) -> Result<()> {
        let cmd = self.commands.vnfd_delete(name, force);
        self.delete_primitive(session, action::VNFD_DELETE, &cmd, force).await
    }

    /// Delete the service descriptor, then every VNF descriptor.
    pub async fn offboard_service(
        &self,
        session: &mut ExperimentSession,
        service: &ServiceSection,
        force: bool,
    ) -> Result<()> {
        self.delete_nsd(session, &service.nsd_name, force).await?;
        for name in &service.vnfd_names {
            self.delete_vnfd(session, name, force).await?;
        }
        Ok(())
    }

    async fn fatal_primitive(&self, session: &mut ExperimentSession, action: &str, cmd: &str) -> Result<()> {
        let out = self.primitive(session, action, cmd).await?;
        session.record(action, out.elapsed);
        if !out.success() {
            error!(action, exit_code = out.exit_code, "operation failed");
            return Err(Self::failed(action, &out));
        }
        Ok(())
    }

    async fn delete_primitive(
        &self,
        session: &mut ExperimentSession,
        action: &str,
        cmd: &str,
        force: bool,
    ) -> Result<()> {
        let out = self.primitive(session, action, cmd).await?;
        session.record(action, out.elapsed);
        if !out.success() {
            if force {
                warn!(action, exit_code = out.exit_code, "forced delete failed; tolerated");
                return Ok(());
            }
            error!(action, exit_code = out.exit_code, "delete failed");
            return Err(Self::failed(action, &out));
        }
        Ok(())
    }

    // ---- service instances -----------------------------------------------------------

    /// Create `instance` from `nsd_name` on the account at `port` and wait
    /// until it is running and configured. Returns the number of poll
    /// attempts the wait took.
    ///
    /// The recorded `ns-create` duration covers the command and the wait.
    /// A non-zero exit, a readiness timeout or a failed readiness check is
    /// fatal. Once `ns-create` has succeeded the instance is tracked by the
    /// session either way, so teardown removes it.
    pub async fn instantiate(
        &self,
        session: &mut ExperimentSession,
        nsd_name: &str,
        instance: &str,
        port: u32,
    ) -> Result<u32> {
        let started = Instant::now();
        let cmd = self.commands.ns_create(nsd_name, instance, port);
        let out = self.primitive(session, action::NS_CREATE, &cmd).await?;

        if !out.success() {
            session.record(action::NS_CREATE, started.elapsed());
            error!(instance, port, exit_code = out.exit_code, "instantiation failed");
            return Err(Self::failed(action::NS_CREATE, &out));
        }

        let waited = wait_until(&self.policy, "instance ready", move || self.instance_ready(instance)).await;
        session.record(action::NS_CREATE, started.elapsed());
        // The create went through, so the instance is ours to tear down
        // whatever the readiness wait reports.
        session.mark_instantiated(instance);

        match waited {
            Ok(PollOutcome::Converged { attempts }) => {
                info!(instance, port, attempts, "instance ready");
                Ok(attempts)
            }
            Ok(timed_out @ PollOutcome::TimedOut { .. }) => {
                error!(instance, port, attempts = timed_out.attempts(), "instance never became ready");
                timed_out.into_result("instance ready")
            }
            Err(err) => {
                error!(instance, port, error = %err, "readiness check could not be run");
                Err(err)
            }
        }
    }

    /// Delete `instance` and wait until `ns-show` no longer finds it.
    ///
    /// A non-zero `ns-delete` is fatal unless `force` is set. A wait that
    /// never sees the instance disappear is only logged; the instance is
    /// considered gone either way.
    pub async fn terminate(&self, session: &mut ExperimentSession, instance: &str, force: bool) -> Result<()> {
        let started = Instant::now();
        let cmd = self.commands.ns_delete(instance, force);
        let out = self.primitive(session, action::NS_DELETE, &cmd).await?;

        if !out.success() {
            if !force {
                session.record(action::NS_DELETE, started.elapsed());
                error!(instance, exit_code = out.exit_code, "termination failed");
                return Err(Self::failed(action::NS_DELETE, &out));
            }
            warn!(instance, exit_code = out.exit_code, "forced termination failed; tolerated");
        }

        let waited = wait_until(&self.policy, "instance gone", move || self.instance_gone(instance)).await;
        session.record(action::NS_DELETE, started.elapsed());

        let outcome = waited?;
        if !outcome.is_converged() {
            warn!(instance, attempts = outcome.attempts(), "instance still visible after terminate; continuing");
        }
        session.mark_terminated(instance);
        Ok(())
    }

    /// Terminate every instance the orchestrator lists.
    pub async fn terminate_all(&self, session: &mut ExperimentSession, force: bool) -> Result<Vec<String>> {
        let instances = self.list_instances(session).await;
        for instance in &instances {
            self.terminate(session, instance, force).await?;
        }
        Ok(instances)
    }

    /// `ns-list`, parsed. Never fails: any problem yields an empty list.
    pub async fn list_instances(&self, session: &mut ExperimentSession) -> Vec<String> {
        let cmd = self.commands.ns_list();
        let out = match self.primitive(session, action::NS_LIST, &cmd).await {
            Ok(out) => out,
            Err(err) => {
                warn!(error = %err, "listing instances failed; assuming none");
                return Vec::new();
            }
        };
        session.record(action::NS_LIST, out.elapsed);

        if !out.success() {
            warn!(exit_code = out.exit_code, "listing instances failed; assuming none");
            return Vec::new();
        }
        let instances = parse_instance_list(&out.stdout);
        info!(?instances, "instances listed");
        instances
    }

    /// One readiness check: `ns-show` succeeds and reports running + configured.
    pub async fn instance_ready(&self, instance: &str) -> Result<bool> {
        let cmd = self.commands.ns_show(instance);
        let out = self.runner.run(action::NS_SHOW, &cmd).await?;
        if !out.success() {
            return Ok(false);
        }
        let tokens = parse_instance_status(&out.stdout);
        debug!(instance, status = ?tokens, "instance status");
        Ok(is_ready(&tokens))
    }

    async fn instance_gone(&self, instance: &str) -> Result<bool> {
        let cmd = self.commands.ns_show(instance);
        let out = self.runner.run(action::NS_SHOW, &cmd).await?;
        Ok(!out.success())
    }
}

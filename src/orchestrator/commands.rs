// src/orchestrator/commands.rs

//! Command-line construction for the orchestrator CLI.

use crate::config::OrchestratorSection;

/// Action names used both as CLI subcommands and as recorded action labels.
pub mod action {
    pub const VIM_CREATE: &str = "vim-create";
    pub const VIM_DELETE: &str = "vim-delete";
    pub const VIM_LIST: &str = "vim-list";
    pub const VIM_SHOW: &str = "vim-show";
    pub const NSD_CREATE: &str = "nsd-create";
    pub const NSD_DELETE: &str = "nsd-delete";
    pub const VNFD_CREATE: &str = "vnfd-create";
    pub const VNFD_DELETE: &str = "vnfd-delete";
    pub const NS_CREATE: &str = "ns-create";
    pub const NS_LIST: &str = "ns-list";
    pub const NS_SHOW: &str = "ns-show";
    pub const NS_DELETE: &str = "ns-delete";
}

/// Builds `<tool> <subcommand> [--flag value]*` command strings.
#[derive(Debug, Clone)]
pub struct OsmCommands {
    tool: String,
    vim_host: String,
    vim_user: String,
    vim_password: String,
    vim_tenant: String,
    account_type: String,
    account_prefix: String,
}

impl OsmCommands {
    pub fn from_config(cfg: &OrchestratorSection) -> Self {
        Self {
            tool: cfg.tool.clone(),
            vim_host: cfg.vim_host.clone(),
            vim_user: cfg.vim_user.clone(),
            vim_password: cfg.vim_password.clone(),
            vim_tenant: cfg.vim_tenant.clone(),
            account_type: cfg.account_type.clone(),
            account_prefix: cfg.account_prefix.clone(),
        }
    }

    pub fn account_prefix(&self) -> &str {
        &self.account_prefix
    }

    /// `pop6001` for port 6001 with the default prefix.
    pub fn account_name(&self, port: u32) -> String {
        format!("{}{}", self.account_prefix, port)
    }

    pub fn vim_create(&self, port: u32) -> String {
        format!(
            "{} {} --name {} --user {} --password {} --auth_url {} --tenant {} --account_type {}",
            self.tool,
            action::VIM_CREATE,
            self.account_name(port),
            quote(&self.vim_user),
            quote(&self.vim_password),
            quote(&format!("http://{}:{}/v2.0", self.vim_host, port)),
            quote(&self.vim_tenant),
            quote(&self.account_type),
        )
    }

    pub fn vim_delete(&self, port: u32, force: bool) -> String {
        with_force(
            format!("{} {} {}", self.tool, action::VIM_DELETE, self.account_name(port)),
            force,
        )
    }

    pub fn vim_list(&self) -> String {
        format!("{} {}", self.tool, action::VIM_LIST)
    }

    pub fn vim_show(&self, port: u32) -> String {
        format!("{} {} {}", self.tool, action::VIM_SHOW, self.account_name(port))
    }

    pub fn nsd_create(&self, package: &str) -> String {
        format!("{} {} {}", self.tool, action::NSD_CREATE, quote(package))
    }

    pub fn nsd_delete(&self, name: &str, force: bool) -> String {
        with_force(
            format!("{} {} {}", self.tool, action::NSD_DELETE, quote(name)),
            force,
        )
    }

    pub fn vnfd_create(&self, package: &str) -> String {
        format!("{} {} {}", self.tool, action::VNFD_CREATE, quote(package))
    }

    pub fn vnfd_delete(&self, name: &str, force: bool) -> String {
        with_force(
            format!("{} {} {}", self.tool, action::VNFD_DELETE, quote(name)),
            force,
        )
    }

    pub fn ns_create(&self, nsd_name: &str, instance: &str, port: u32) -> String {
        format!(
            "{} {} --nsd_name {} --ns_name {} --vim_account {}",
            self.tool,
            action::NS_CREATE,
            quote(nsd_name),
            quote(instance),
            self.account_name(port),
        )
    }

    pub fn ns_list(&self) -> String {
        format!("{} {}", self.tool, action::NS_LIST)
    }

    pub fn ns_show(&self, instance: &str) -> String {
        format!("{} {} {}", self.tool, action::NS_SHOW, quote(instance))
    }

    pub fn ns_delete(&self, instance: &str, force: bool) -> String {
        with_force(
            format!("{} {} {}", self.tool, action::NS_DELETE, quote(instance)),
            force,
        )
    }
}

fn with_force(cmd: String, force: bool) -> String {
    if force {
        format!("{cmd} --force")
    } else {
        cmd
    }
}

/// Single-quote a shell word unless it only contains safe characters.
pub fn quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._-/:@=+,%".contains(c));
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

//! Command handlers for the testsmith CLI
//!
//! Each module handles one command group, delegating to `testsmith-core` for the work.

pub(crate) mod catalog;
pub(crate) mod generate;
pub(crate) mod plan;
pub(crate) mod policy;

pub(crate) use catalog::handle_catalog_command;
pub(crate) use generate::handle_generate_command;
pub(crate) use plan::handle_plan_command;
pub(crate) use policy::handle_policy_command;

use std::path::{Path, PathBuf};

use anyhow::Context;
use testsmith_core::{PolicyStore, TestPolicy};

use crate::cli_config::CliConfig;

/// `--policy`, else the config file's `policy`, else none.
pub(crate) fn policy_path(flag: Option<PathBuf>, config: &CliConfig) -> Option<PathBuf> {
    flag.or_else(|| config.policy.clone())
}

/// Load the policy at `path`, or the built-in policy when there is none.
pub(crate) fn load_policy(path: Option<&Path>) -> anyhow::Result<TestPolicy> {
    match path {
        Some(path) => TestPolicy::load(path)
            .with_context(|| format!("invalid test policy '{}'", path.display())),
        None => Ok(TestPolicy::builtin()),
    }
}

pub(crate) fn load_store(path: Option<&Path>) -> anyhow::Result<PolicyStore> {
    load_policy(path).map(PolicyStore::new)
}

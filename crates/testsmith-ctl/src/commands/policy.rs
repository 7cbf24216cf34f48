//! `testsmith policy`: show and validate test policies.

use std::path::Path;

use testsmith_core::policy::PolicySummary;

use super::{load_policy, load_store, policy_path};
use crate::cli_config::CliConfig;
use crate::output;
use crate::PolicyCommands;

pub(crate) async fn handle_policy_command(
    cmd: PolicyCommands,
    config: &CliConfig,
) -> anyhow::Result<()> {
    match cmd {
        PolicyCommands::Show {
            policy,
            profile,
            json,
        } => {
            let path = policy_path(policy, config);
            show(path.as_deref(), profile.or_else(|| config.profile.clone()), json).await
        }
        PolicyCommands::Validate { policy } => validate(&policy),
    }
}

async fn show(path: Option<&Path>, profile: Option<String>, json: bool) -> anyhow::Result<()> {
    let store = load_store(path)?;
    let summary = match profile {
        Some(name) => store.switch_profile(&name).await?,
        None => store.snapshot().await.summary(),
    };

    if json {
        output::plain(serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &PolicySummary) {
    output::header("Test policy");
    output::label(
        "Profile",
        summary.current_profile.as_deref().unwrap_or("individual"),
    );
    if let Some(description) = &summary.profile_description {
        output::label("Description", description);
    }
    output::label(
        "Enabled categories",
        summary
            .enabled_types
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    );
    output::label("Tests per endpoint", summary.tests_per_endpoint);

    output::blank();
    output::header("Available profiles");
    for profile in &summary.available_profiles {
        output::profile(
            &profile.name,
            summary.current_profile.as_deref() == Some(profile.name.as_str()),
            profile.tests_per_endpoint,
            &profile.description,
        );
    }
}

fn validate(path: &Path) -> anyhow::Result<()> {
    let policy = load_policy(Some(path))?;
    output::success(format!("Policy '{}' is valid", path.display()));
    output::label("Categories", policy.categories.len());
    output::label("Profiles", policy.profiles.len());
    output::label("Enabled sub-tests", policy.enabled_sub_tests().len());
    Ok(())
}

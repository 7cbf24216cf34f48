//! `testsmith plan`: shape checks for externally written test plans.

use std::path::Path;

use anyhow::{bail, Context};
use testsmith_core::plan::{validate_test_plan, PlanInsights};

use crate::output;
use crate::PlanCommands;

pub(crate) fn handle_plan_command(cmd: PlanCommands) -> anyhow::Result<()> {
    match cmd {
        PlanCommands::Validate { file } => validate(&file),
    }
}

fn validate(path: &Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read test plan '{}'", path.display()))?;

    let validation = validate_test_plan(&text);
    if !validation.is_valid {
        bail!("{}", validation.message);
    }

    output::success(validation.message);
    let insights = PlanInsights::extract(&text);
    if !insights.application_context.is_empty() {
        output::label("Context", &insights.application_context);
    }
    output::label("Workflow lines", insights.workflows.len());
    output::label("Performance lines", insights.performance.len());
    output::label("Security lines", insights.security.len());
    Ok(())
}

//! `testsmith generate`: catalog, synthesize, optionally augment, report, emit.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use testsmith_core::augmenter::{
    AugmentConfig, Augmenter, DisabledGenerator, GeneratorError, HttpTextGenerator, TextGenerator,
};
use testsmith_core::catalog::load_catalog;
use testsmith_core::pipeline::GenerationRun;
use testsmith_core::plan::{validate_test_plan, PlanInsights};
use testsmith_core::TestGenerator;
use tracing::warn;

use super::{load_store, policy_path};
use crate::cli_config::{AiConfig, CliConfig};
use crate::emit::{self, PytestEmitter};
use crate::output;
use crate::GenerateArgs;

pub(crate) async fn handle_generate_command(
    args: GenerateArgs,
    config: &CliConfig,
) -> anyhow::Result<()> {
    let catalog = load_catalog(&args.spec).with_context(|| {
        format!("failed to load OpenAPI document '{}'", args.spec.display())
    })?;

    let store = load_store(policy_path(args.policy, config).as_deref())?;
    let mut generator = TestGenerator::new(Arc::new(store))
        .workers(args.workers.or(config.workers).unwrap_or(1));

    if let Some(plan) = &args.plan {
        generator = generator.with_insights(read_insights(plan, args.json)?);
    }
    if args.ai || config.ai.enabled {
        generator = generator.with_augmenter(build_augmenter(&config.ai)?);
    }

    let run = match args.profile.or_else(|| config.profile.clone()) {
        Some(profile) => generator.generate_with_profile(&catalog, &profile).await?,
        None => generator.generate(&catalog).await,
    };

    let document = serde_json::to_string_pretty(&run)?;
    if let Some(path) = &args.output {
        write_file(path, &document)?;
    }

    if args.json {
        output::plain(&document);
    } else {
        print_report(&run);
        if let Some(path) = &args.output {
            output::success(format!("Test cases written to {}", path.display()));
        }
    }

    let pytest_dir = args.pytest_dir.or_else(|| config.pytest_dir.clone());
    if let Some(dir) = pytest_dir {
        let title = catalog.info.title.as_deref().unwrap_or("OpenAPI document");
        let files = PytestEmitter::new(config.base_url.clone())?.render(&run.result, title)?;
        let written = emit::write_all(&files, &dir)?;
        if !args.json {
            output::success(format!(
                "{} pytest files written to {}",
                written.len(),
                dir.display()
            ));
        }
    }

    Ok(())
}

fn read_insights(path: &Path, quiet: bool) -> anyhow::Result<PlanInsights> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read test plan '{}'", path.display()))?;
    let validation = validate_test_plan(&text);
    if !validation.is_valid {
        warn!(path = %path.display(), reason = %validation.message, "Test plan failed shape checks");
        if !quiet {
            output::warning(format!("Test plan: {}", validation.message));
        }
    }
    Ok(PlanInsights::extract(&text))
}

/// HTTP augmenter when an API key is available; otherwise every case keeps its
/// rule-based content.
fn build_augmenter(ai: &AiConfig) -> anyhow::Result<Augmenter> {
    let categories = ai.categories()?;
    let http = ai.http_config();
    let defaults = AugmentConfig::default();
    let config = AugmentConfig {
        timeout: Duration::from_secs(http.timeout_secs),
        concurrency: ai.concurrency.unwrap_or(defaults.concurrency),
        categories,
    };

    let generator: Arc<dyn TextGenerator> = match HttpTextGenerator::from_env(http) {
        Ok(generator) => Arc::new(generator),
        Err(GeneratorError::MissingApiKey(var)) => {
            warn!(env = %var, "No API key for AI augmentation; using rule-based output");
            Arc::new(DisabledGenerator)
        }
        Err(e) => return Err(e).context("failed to initialize AI generator"),
    };
    Ok(Augmenter::new(generator, config))
}

fn write_file(path: &Path, content: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory '{}'", parent.display()))?;
    }
    std::fs::write(path, content)
        .with_context(|| format!("failed to write '{}'", path.display()))
}

fn print_report(run: &GenerationRun) {
    let stats = &run.stats;

    output::header("Generation summary");
    output::label("Profile", run.profile.as_deref().unwrap_or("individual"));
    output::label("Test cases", stats.total);
    output::label(
        "Operations covered",
        format!(
            "{}/{} ({:.0}%)",
            stats.operations_covered,
            stats.operations_total,
            stats.operation_coverage() * 100.0
        ),
    );
    output::label("Automation candidates", stats.automation_candidates);
    if let Some(report) = &run.augmentation {
        output::label(
            "AI augmented",
            format!(
                "{} accepted, {} kept rule-based",
                report.accepted, report.fallbacks
            ),
        );
    }

    output::blank();
    output::header("By category");
    for (category, count) in &stats.by_category {
        output::tally(category, *count, stats.total);
    }

    output::blank();
    output::header("By component");
    for (component, count) in &stats.by_component {
        output::tally(component, *count, stats.total);
    }

    output::blank();
    output::header("By priority");
    for (priority, count) in &stats.by_priority {
        output::priority_tally(*priority, *count, stats.total);
    }

    if !stats.skipped.is_empty() {
        output::blank();
        output::warning(format!("{} operations skipped", stats.skipped_count));
        for skip in &stats.skipped {
            output::skipped(skip.operation.method, &skip.operation.path, &skip.reason);
        }
    }
}

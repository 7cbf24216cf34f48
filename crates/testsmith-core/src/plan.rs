//! Test-plan prose: shape validation and insight extraction.
//!
//! Plans are written elsewhere (by a person or a text-generation service).
//! This module only checks that a plan looks like one and pulls out lines that
//! workflow test cases can reference.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Minimum trimmed plan length in characters.
pub const MIN_PLAN_LENGTH: usize = 100;

/// Maximum lines kept per insight kind.
pub const MAX_INSIGHT_LINES: usize = 5;

static CONTENT_PATTERNS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"(?i)(test|testing)").expect("valid regex"),
        Regex::new(r"(?i)(objective|goal|purpose)").expect("valid regex"),
        Regex::new(r"(?i)(scenario|case|step)").expect("valid regex"),
    ]
});

static STRUCTURE_PATTERNS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"(?m)^#{1,6}\s").expect("valid regex"),
        Regex::new(r"(?m)^\d+\.").expect("valid regex"),
        Regex::new(r"(?m)^[-*+]\s").expect("valid regex"),
    ]
});

const WORKFLOW_KEYWORDS: [&str; 9] = [
    "workflow",
    "process",
    "sequence",
    "integration",
    "end-to-end",
    "business logic",
    "transaction",
    "pipeline",
    "orchestration",
];
const PERFORMANCE_KEYWORDS: [&str; 5] =
    ["performance", "response time", "throughput", "latency", "load"];
const SECURITY_KEYWORDS: [&str; 5] = [
    "security",
    "authentication",
    "authorization",
    "encryption",
    "owasp",
];

/// Outcome of [`validate_test_plan`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanValidation {
    pub is_valid: bool,
    pub message: String,
}

impl PlanValidation {
    fn fail(message: &str) -> Self {
        Self {
            is_valid: false,
            message: message.to_string(),
        }
    }
}

/// Check that `plan` is long enough, talks about testing, objectives, and
/// scenarios, and uses headings or lists.
pub fn validate_test_plan(plan: &str) -> PlanValidation {
    let trimmed = plan.trim();
    if trimmed.is_empty() {
        return PlanValidation::fail("Test plan is empty or contains only whitespace");
    }
    if trimmed.chars().count() < MIN_PLAN_LENGTH {
        return PlanValidation::fail(&format!(
            "Test plan is too short (minimum {} characters required)",
            MIN_PLAN_LENGTH
        ));
    }
    if !CONTENT_PATTERNS.iter().all(|re| re.is_match(plan)) {
        return PlanValidation::fail(
            "Test plan is missing essential content. Consider adding more detail about testing objectives, scenarios, and steps.",
        );
    }
    if !STRUCTURE_PATTERNS.iter().any(|re| re.is_match(plan)) {
        return PlanValidation::fail(
            "Test plan lacks clear structure. Consider using headers, lists, or numbered steps.",
        );
    }
    PlanValidation {
        is_valid: true,
        message: "Test plan validation passed".to_string(),
    }
}

/// Lines of a plan that inform workflow test cases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlanInsights {
    /// Text following an "Executive Summary" or "Strategic Overview" heading.
    pub application_context: String,
    pub workflows: Vec<String>,
    pub performance: Vec<String>,
    pub security: Vec<String>,
}

impl PlanInsights {
    pub fn extract(plan: &str) -> Self {
        let lines: Vec<String> = plan.lines().map(|l| l.trim().to_lowercase()).collect();

        Self {
            application_context: application_context(plan),
            workflows: matching(&lines, &WORKFLOW_KEYWORDS, |l| l.len() > 20),
            performance: matching(&lines, &PERFORMANCE_KEYWORDS, |_| true),
            security: matching(&lines, &SECURITY_KEYWORDS, |_| true),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.application_context.is_empty()
            && self.workflows.is_empty()
            && self.performance.is_empty()
            && self.security.is_empty()
    }
}

fn matching(lines: &[String], keywords: &[&str], keep: impl Fn(&str) -> bool) -> Vec<String> {
    lines
        .iter()
        .filter(|line| keep(line.as_str()) && keywords.iter().any(|k| line.contains(*k)))
        .take(MAX_INSIGHT_LINES)
        .cloned()
        .collect()
}

fn application_context(plan: &str) -> String {
    let mut parts = Vec::new();
    let mut in_summary = false;
    for line in plan.lines() {
        let trimmed = line.trim();
        if trimmed.contains("Executive Summary") || trimmed.contains("Strategic Overview") {
            in_summary = true;
            continue;
        }
        if !in_summary {
            continue;
        }
        if trimmed.starts_with('#') || (trimmed.starts_with("**") && !trimmed.contains("Executive")) {
            break;
        }
        if !trimmed.is_empty() {
            parts.push(trimmed);
        }
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &str = "# Orders API Test Plan

## Executive Summary
The orders service handles checkout for the storefront.

## Objectives
- Verify the checkout workflow across cart and payment services end to end
- Confirm latency stays under 200ms at peak load
- Enforce authentication on every endpoint

## Scenarios
1. Create an order and fetch it back
2. Cancel an order mid-transaction with a rollback step
";

    #[test]
    fn test_valid_plan() {
        let result = validate_test_plan(PLAN);
        assert!(result.is_valid, "{}", result.message);
    }

    #[test]
    fn test_empty_and_short_plans() {
        assert!(!validate_test_plan("   \n").is_valid);
        let short = validate_test_plan("# Test plan\n- scenario");
        assert!(!short.is_valid);
        assert!(short.message.contains("too short"));
    }

    #[test]
    fn test_missing_objectives() {
        let plan = format!("# Testing\n- scenario one\n{}", "x".repeat(120));
        let result = validate_test_plan(&plan);
        assert!(!result.is_valid);
        assert!(result.message.contains("missing essential content"));
    }

    #[test]
    fn test_unstructured_plan() {
        let plan = format!(
            "This testing plan has an objective and a scenario but no layout. {}",
            "More words. ".repeat(10)
        );
        let result = validate_test_plan(&plan);
        assert!(!result.is_valid);
        assert!(result.message.contains("structure"));
    }

    #[test]
    fn test_insights_extracted() {
        let insights = PlanInsights::extract(PLAN);
        assert_eq!(
            insights.application_context,
            "The orders service handles checkout for the storefront."
        );
        assert_eq!(insights.workflows.len(), 2);
        assert_eq!(insights.performance.len(), 1);
        assert!(insights.performance[0].contains("latency"));
        assert_eq!(insights.security.len(), 1);
    }

    #[test]
    fn test_insights_capped() {
        let plan = "- load check\n".repeat(12);
        assert_eq!(PlanInsights::extract(&plan).performance.len(), MAX_INSIGHT_LINES);
    }
}

//! Optional AI enrichment of rule-based test cases.
//!
//! The augmenter asks a [`TextGenerator`] to rewrite the steps and expected
//! results of a case. Anything other than a well-formed reply that matches the
//! case leaves the rule-based case untouched: identity, component, category,
//! priority, and test data are never changed by this module.

mod http;

pub use http::{HttpGeneratorConfig, HttpTextGenerator};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::{Catalog, Operation};
use crate::policy::Category;
use crate::synthesizer::GenerationResult;
use crate::testcase::{Origin, TestCase};

/// Errors from a [`TextGenerator`] backend.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("text generation is disabled")]
    Disabled,

    #[error("missing API key: set {0}")]
    MissingApiKey(String),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("invalid response format: {0}")]
    InvalidResponse(String),
}

/// Capability that turns a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync + fmt::Debug {
    async fn complete(&self, prompt: &str) -> Result<String, GeneratorError>;
}

/// Generator that declines every request. Used when AI is not configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledGenerator;

#[async_trait]
impl TextGenerator for DisabledGenerator {
    async fn complete(&self, _prompt: &str) -> Result<String, GeneratorError> {
        Err(GeneratorError::Disabled)
    }
}

/// Why a reply was not applied.
#[derive(Debug, thiserror::Error)]
pub enum AugmentError {
    #[error(transparent)]
    Generator(#[from] GeneratorError),

    #[error("no reply within {0:?}")]
    Timeout(Duration),

    #[error("reply is not a valid JSON object: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("reply field '{field}' is '{found}', expected '{expected}'")]
    Mismatch {
        field: &'static str,
        expected: String,
        found: String,
    },

    #[error("reply has no {0}")]
    Empty(&'static str),
}

#[derive(Debug, Clone)]
pub struct AugmentConfig {
    /// Upper bound on one generator call.
    pub timeout: Duration,
    /// Generator calls in flight at once.
    pub concurrency: usize,
    /// Categories whose cases are sent for enrichment.
    pub categories: Vec<Category>,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            concurrency: 4,
            categories: Category::ALL.to_vec(),
        }
    }
}

/// Counts from [`Augmenter::augment_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AugmentReport {
    pub attempted: usize,
    pub accepted: usize,
    pub fallbacks: usize,
}

#[derive(Debug, Deserialize)]
struct Reply {
    steps: Vec<String>,
    expected_results: Vec<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    path: Option<String>,
}

enum Attempt {
    Skipped,
    Accepted,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct Augmenter {
    generator: Arc<dyn TextGenerator>,
    config: AugmentConfig,
}

impl Augmenter {
    pub fn new(generator: Arc<dyn TextGenerator>, config: AugmentConfig) -> Self {
        Self { generator, config }
    }

    /// Augmenter that always falls back.
    pub fn disabled() -> Self {
        Self::new(Arc::new(DisabledGenerator), AugmentConfig::default())
    }

    pub fn config(&self) -> &AugmentConfig {
        &self.config
    }

    /// Enrich `draft`, or return it unchanged on any failure.
    pub async fn augment(
        &self,
        draft: &TestCase,
        operation: &Operation,
        category: Category,
    ) -> TestCase {
        match self.try_augment(draft, operation, category).await {
            Ok(case) => case,
            Err(err) => {
                info!(id = %draft.id, error = %err, "Keeping rule-based test case");
                draft.clone()
            }
        }
    }

    /// As [`Augmenter::augment`] but reports why a reply was rejected.
    pub async fn try_augment(
        &self,
        draft: &TestCase,
        operation: &Operation,
        category: Category,
    ) -> Result<TestCase, AugmentError> {
        let prompt = build_prompt(draft, operation, category);
        let raw = tokio::time::timeout(self.config.timeout, self.generator.complete(&prompt))
            .await
            .map_err(|_| AugmentError::Timeout(self.config.timeout))??;

        let reply: Reply = serde_json::from_str(&strip_code_fence(&raw))?;
        check_echo("id", reply.id.as_deref(), &draft.id)?;
        check_echo("category", reply.category.as_deref(), category.as_str())?;
        check_echo("method", reply.method.as_deref(), draft.operation.method.as_str())?;
        check_echo("path", reply.path.as_deref(), &draft.operation.path)?;

        let steps = non_blank(reply.steps);
        if steps.is_empty() {
            return Err(AugmentError::Empty("steps"));
        }
        let expected_results = non_blank(reply.expected_results);
        if expected_results.is_empty() {
            return Err(AugmentError::Empty("expected results"));
        }

        debug!(id = %draft.id, steps = steps.len(), "Accepted AI-augmented steps");
        let mut case = draft.clone();
        case.steps = steps;
        case.expected_results = expected_results;
        case.origin = Origin::AiAugmented;
        Ok(case)
    }

    /// Enrich every case in a configured category, `concurrency` calls at a
    /// time. Output order matches input order.
    pub async fn augment_all(
        &self,
        result: GenerationResult,
        catalog: &Catalog,
    ) -> (GenerationResult, AugmentReport) {
        let GenerationResult {
            test_cases,
            skipped,
            operations_total,
            ..
        } = result;

        let outcomes: Vec<(TestCase, Attempt)> = stream::iter(test_cases)
            .map(|case| self.attempt(case, catalog))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut report = AugmentReport::default();
        let mut cases = Vec::with_capacity(outcomes.len());
        for (case, attempt) in outcomes {
            match attempt {
                Attempt::Skipped => {}
                Attempt::Accepted => {
                    report.attempted += 1;
                    report.accepted += 1;
                }
                Attempt::Fallback => {
                    report.attempted += 1;
                    report.fallbacks += 1;
                }
            }
            cases.push(case);
        }

        info!(
            attempted = report.attempted,
            accepted = report.accepted,
            fallbacks = report.fallbacks,
            "AI augmentation complete"
        );
        (GenerationResult::new(cases, skipped, operations_total), report)
    }

    async fn attempt(&self, case: TestCase, catalog: &Catalog) -> (TestCase, Attempt) {
        if !self.config.categories.contains(&case.category) {
            return (case, Attempt::Skipped);
        }
        let Some(operation) = catalog.find(case.operation.method, &case.operation.path) else {
            return (case, Attempt::Skipped);
        };
        match self.try_augment(&case, operation, case.category).await {
            Ok(augmented) => (augmented, Attempt::Accepted),
            Err(err) => {
                info!(id = %case.id, error = %err, "Keeping rule-based test case");
                (case, Attempt::Fallback)
            }
        }
    }
}

fn check_echo(field: &'static str, found: Option<&str>, expected: &str) -> Result<(), AugmentError> {
    match found {
        Some(found) if !found.trim().eq_ignore_ascii_case(expected) => Err(AugmentError::Mismatch {
            field,
            expected: expected.to_string(),
            found: found.to_string(),
        }),
        _ => Ok(()),
    }
}

fn non_blank(lines: Vec<String>) -> Vec<String> {
    lines
        .into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

fn strip_code_fence(value: &str) -> String {
    let trimmed = value.trim();
    let inner = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"));
    match inner {
        Some(stripped) => stripped.trim().trim_end_matches("```").trim().to_string(),
        None => trimmed.to_string(),
    }
}

fn build_prompt(draft: &TestCase, operation: &Operation, category: Category) -> String {
    let numbered = |lines: &[String]| {
        lines
            .iter()
            .enumerate()
            .map(|(i, line)| format!("{}. {}", i + 1, line))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let statuses = if draft.expected_status.is_empty() {
        "none (descriptive check)".to_string()
    } else {
        draft
            .expected_status
            .iter()
            .map(u16::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };
    let parameters = operation
        .parameters
        .iter()
        .map(|p| {
            format!(
                "{} ({}, {}{})",
                p.name,
                p.location,
                p.param_type,
                if p.required { ", required" } else { "" }
            )
        })
        .collect::<Vec<_>>()
        .join("; ");

    format!(
        "Improve the steps and expected results of this API test case.\n\
         \n\
         API: {signature}\n\
         Operation: {operation_id}\n\
         Parameters: {parameters}\n\
         Category: {category}\n\
         Sub-test: {sub_test}\n\
         Test case: {id} - {title}\n\
         Description: {description}\n\
         Expected status codes: {statuses}\n\
         \n\
         Current steps:\n{steps}\n\
         \n\
         Current expected results:\n{expected}\n\
         \n\
         Requirements:\n\
         - Keep the same intent and expected status codes\n\
         - Be specific to this endpoint\n\
         - Reply with only a JSON object: {{\"steps\": [string], \"expected_results\": [string]}}",
        signature = operation.signature(),
        operation_id = operation.operation_id,
        parameters = if parameters.is_empty() { "none".to_string() } else { parameters },
        category = category,
        sub_test = draft.sub_test,
        id = draft.id,
        title = draft.title,
        description = draft.description,
        statuses = statuses,
        steps = numbered(&draft.steps),
        expected = numbered(&draft.expected_results),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::catalog::{ApiInfo, HttpMethod, Parameter};
    use crate::policy::TestPolicy;
    use crate::synthesizer::synthesize;

    #[derive(Debug)]
    struct Scripted(String);

    #[async_trait]
    impl TextGenerator for Scripted {
        async fn complete(&self, _prompt: &str) -> Result<String, GeneratorError> {
            Ok(self.0.clone())
        }
    }

    #[derive(Debug)]
    struct Slow;

    #[async_trait]
    impl TextGenerator for Slow {
        async fn complete(&self, _prompt: &str) -> Result<String, GeneratorError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(String::new())
        }
    }

    /// Accepts every other call.
    #[derive(Debug, Default)]
    struct Alternating(AtomicUsize);

    #[async_trait]
    impl TextGenerator for Alternating {
        async fn complete(&self, _prompt: &str) -> Result<String, GeneratorError> {
            if self.0.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
                Ok(r#"{"steps": ["call it"], "expected_results": ["it works"]}"#.into())
            } else {
                Err(GeneratorError::InvalidResponse("empty choices".into()))
            }
        }
    }

    fn catalog() -> Catalog {
        Catalog {
            info: ApiInfo::default(),
            operations: vec![Operation {
                method: HttpMethod::Get,
                path: "/namespaces/{id}/policies".into(),
                operation_id: "list_policies".into(),
                summary: None,
                tags: vec![],
                parameters: vec![Parameter::path("id")],
                responses: vec!["200".into(), "404".into()],
                has_request_body: false,
                request_content_types: vec![],
                unresolved_refs: vec![],
            }],
        }
    }

    fn drafts(catalog: &Catalog) -> GenerationResult {
        let policy = TestPolicy::builtin().apply_profile("quick").unwrap();
        synthesize(&catalog.operations, &policy)
    }

    fn augmenter(generator: impl TextGenerator + 'static) -> Augmenter {
        Augmenter::new(
            Arc::new(generator),
            AugmentConfig {
                timeout: Duration::from_millis(50),
                ..AugmentConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn test_accepted_reply_replaces_only_steps() {
        let catalog = catalog();
        let draft = drafts(&catalog).test_cases[0].clone();
        let reply = format!(
            "```json\n{{\"id\": \"{}\", \"category\": \"FUNCTIONAL\", \"steps\": [\"Send GET\", \" \"], \"expected_results\": [\"200 returned\"]}}\n```",
            draft.id
        );

        let case = augmenter(Scripted(reply))
            .augment(&draft, &catalog.operations[0], draft.category)
            .await;
        assert_eq!(case.origin, Origin::AiAugmented);
        assert_eq!(case.steps, vec!["Send GET"]);
        assert_eq!(case.expected_results, vec!["200 returned"]);
        assert_eq!(case.id, draft.id);
        assert_eq!(case.test_data, draft.test_data);
        assert_eq!(case.expected_status, draft.expected_status);
    }

    #[tokio::test]
    async fn test_failures_fall_back_to_draft() {
        let catalog = catalog();
        let op = &catalog.operations[0];
        let draft = drafts(&catalog).test_cases[0].clone();

        let replies = [
            "not json at all".to_string(),
            r#"{"steps": [], "expected_results": ["x"]}"#.to_string(),
            r#"{"steps": ["x"], "expected_results": []}"#.to_string(),
            r#"{"steps": ["x"], "expected_results": ["y"], "id": "TC-OTHER-001"}"#.to_string(),
            r#"{"steps": ["x"], "expected_results": ["y"], "path": "/elsewhere"}"#.to_string(),
        ];
        for reply in replies {
            let case = augmenter(Scripted(reply.clone()))
                .augment(&draft, op, draft.category)
                .await;
            assert_eq!(case, draft, "reply {reply:?} should be rejected");
        }

        assert_eq!(augmenter(Slow).augment(&draft, op, draft.category).await, draft);
        assert_eq!(
            Augmenter::disabled().augment(&draft, op, draft.category).await,
            draft
        );
    }

    #[tokio::test]
    async fn test_timeout_reported() {
        let catalog = catalog();
        let draft = drafts(&catalog).test_cases[0].clone();
        let err = augmenter(Slow)
            .try_augment(&draft, &catalog.operations[0], draft.category)
            .await
            .unwrap_err();
        assert!(matches!(err, AugmentError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_augment_all_keeps_order_and_counts() {
        let catalog = catalog();
        let original = drafts(&catalog);
        let mut aug = augmenter(Alternating::default());
        aug.config.concurrency = 1;
        aug.config.categories = vec![Category::Functional];

        let (result, report) = aug.augment_all(original.clone(), &catalog).await;
        let functional = original
            .test_cases
            .iter()
            .filter(|c| c.category == Category::Functional)
            .count();

        assert_eq!(report.attempted, functional);
        assert_eq!(report.accepted + report.fallbacks, report.attempted);
        assert_eq!(report.accepted, functional.div_ceil(2));
        assert_eq!(result.len(), original.len());
        for (after, before) in result.test_cases.iter().zip(&original.test_cases) {
            assert_eq!(after.id, before.id);
            assert_eq!(after.category, before.category);
            if before.category != Category::Functional {
                assert_eq!(after, before);
            }
        }
        assert_eq!(result.by_component, original.by_component);
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("```\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn test_prompt_mentions_operation() {
        let catalog = catalog();
        let draft = drafts(&catalog).test_cases[0].clone();
        let prompt = build_prompt(&draft, &catalog.operations[0], draft.category);
        assert!(prompt.contains("GET /namespaces/{id}/policies"));
        assert!(prompt.contains(&draft.id));
        assert!(prompt.contains("id (path, string, required)"));
    }
}

//! Rule-based test-case synthesis.
//!
//! Enumeration order is fixed: operations in catalog order, then enabled
//! categories in policy order, then sub-tests in declared order. Identifiers
//! are assigned only after all drafts are collected in that order, so the
//! parallel path produces exactly the same output as the sequential one.

mod rules;
mod values;

use std::collections::{BTreeMap, HashMap};

use heck::ToShoutySnakeCase;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::{Operation, OperationRef};
use crate::classifier::{classify, Component};
use crate::plan::PlanInsights;
use crate::policy::{Category, CategoryPolicy, SubTestId, TestPolicy};
use crate::relationships::{analyze, ApiRelationships};
use crate::testcase::{Origin, TestCase};

use rules::{Draft, RuleContext};

/// Why an operation produced no test cases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    #[error("operation declares no responses")]
    NoResponses,
    #[error("operation declares no success (2xx) response")]
    NoSuccessResponse,
    #[error("unresolved references: {}", .0.join(", "))]
    UnresolvedRefs(Vec<String>),
}

impl SkipReason {
    /// The first reason `operation` cannot be synthesized, if any.
    pub fn check(operation: &Operation) -> Option<Self> {
        if operation.responses.is_empty() {
            Some(Self::NoResponses)
        } else if operation.success_status().is_none() {
            Some(Self::NoSuccessResponse)
        } else if !operation.unresolved_refs.is_empty() {
            Some(Self::UnresolvedRefs(operation.unresolved_refs.clone()))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedOperation {
    pub operation: OperationRef,
    pub reason: SkipReason,
}

/// Output of one synthesis run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationResult {
    pub test_cases: Vec<TestCase>,
    pub skipped: Vec<SkippedOperation>,
    /// Operations considered, including skipped ones.
    pub operations_total: usize,
    pub by_component: BTreeMap<Component, usize>,
    pub by_category: BTreeMap<Category, usize>,
}

impl GenerationResult {
    pub(crate) fn new(
        test_cases: Vec<TestCase>,
        skipped: Vec<SkippedOperation>,
        operations_total: usize,
    ) -> Self {
        let mut by_component = BTreeMap::new();
        let mut by_category = BTreeMap::new();
        for case in &test_cases {
            *by_component.entry(case.component.clone()).or_insert(0) += 1;
            *by_category.entry(case.category).or_insert(0) += 1;
        }
        Self {
            test_cases,
            skipped,
            operations_total,
            by_component,
            by_category,
        }
    }

    pub fn len(&self) -> usize {
        self.test_cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.test_cases.is_empty()
    }

    /// Components in order of first appearance.
    pub fn components(&self) -> Vec<&Component> {
        let mut seen: Vec<&Component> = Vec::new();
        for case in &self.test_cases {
            if !seen.contains(&&case.component) {
                seen.push(&case.component);
            }
        }
        seen
    }

    pub fn for_component<'a>(
        &'a self,
        component: &'a Component,
    ) -> impl Iterator<Item = &'a TestCase> + 'a {
        self.test_cases
            .iter()
            .filter(move |c| &c.component == component)
    }

    /// Categories present in the output, in enumeration order.
    pub fn categories(&self) -> Vec<Category> {
        let mut seen = Vec::new();
        for case in &self.test_cases {
            if !seen.contains(&case.category) {
                seen.push(case.category);
            }
        }
        seen
    }
}

/// Synthesize test cases for `operations` under `policy`.
pub fn synthesize(operations: &[Operation], policy: &TestPolicy) -> GenerationResult {
    Synthesizer::new(operations, policy).run()
}

/// As [`synthesize`], fanning operations out over `workers` threads.
pub fn synthesize_parallel(
    operations: &[Operation],
    policy: &TestPolicy,
    workers: usize,
) -> GenerationResult {
    Synthesizer::new(operations, policy).workers(workers).run()
}

/// Configurable synthesis run.
#[derive(Debug)]
pub struct Synthesizer<'a> {
    operations: &'a [Operation],
    policy: &'a TestPolicy,
    insights: Option<&'a PlanInsights>,
    workers: usize,
}

type Outcome = Result<Vec<TestCase>, SkippedOperation>;

impl<'a> Synthesizer<'a> {
    pub fn new(operations: &'a [Operation], policy: &'a TestPolicy) -> Self {
        Self {
            operations,
            policy,
            insights: None,
            workers: 1,
        }
    }

    /// Plan insights referenced by workflow records.
    pub fn with_insights(mut self, insights: &'a PlanInsights) -> Self {
        self.insights = Some(insights);
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn run(self) -> GenerationResult {
        let components: Vec<Component> = self.operations.iter().map(classify).collect();
        let relationships: ApiRelationships = analyze(self.operations);
        let ctx = RuleContext {
            operations: self.operations,
            components: &components,
            relationships: &relationships,
            insights: self.insights,
        };

        let indexed: Vec<(&Operation, &Component)> =
            self.operations.iter().zip(&components).collect();

        let outcomes: Vec<Outcome> = if self.workers <= 1 || indexed.len() < 2 {
            indexed
                .iter()
                .map(|(op, component)| self.outcome(op, component, &ctx))
                .collect()
        } else {
            let chunk_size = indexed.len().div_ceil(self.workers);
            let this = &self;
            std::thread::scope(|scope| {
                let handles: Vec<_> = indexed
                    .chunks(chunk_size)
                    .map(|chunk| {
                        let ctx = &ctx;
                        scope.spawn(move || {
                            chunk
                                .iter()
                                .map(|(op, component)| this.outcome(op, component, ctx))
                                .collect::<Vec<_>>()
                        })
                    })
                    .collect();

                handles
                    .into_iter()
                    .flat_map(|handle| match handle.join() {
                        Ok(outcomes) => outcomes,
                        Err(panic) => std::panic::resume_unwind(panic),
                    })
                    .collect()
            })
        };

        let mut test_cases = Vec::new();
        let mut skipped = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(cases) => test_cases.extend(cases),
                Err(skip) => {
                    warn!(
                        method = %skip.operation.method,
                        path = %skip.operation.path,
                        reason = %skip.reason,
                        "Skipping operation"
                    );
                    skipped.push(skip);
                }
            }
        }
        assign_ids(&mut test_cases);

        info!(
            operations = self.operations.len(),
            test_cases = test_cases.len(),
            skipped = skipped.len(),
            categories = ?self.policy.enabled_categories(),
            "Synthesis complete"
        );
        GenerationResult::new(test_cases, skipped, self.operations.len())
    }

    fn outcome(&self, operation: &Operation, component: &Component, ctx: &RuleContext<'_>) -> Outcome {
        if let Some(reason) = SkipReason::check(operation) {
            return Err(SkippedOperation {
                operation: operation.reference(),
                reason,
            });
        }

        let mut cases = Vec::new();
        for entry in self.policy.enabled() {
            for sub_test in &entry.sub_tests {
                for draft in rules::drafts(operation, component, entry.category, sub_test, ctx) {
                    cases.push(finish(draft, operation, component, entry, sub_test));
                }
            }
        }

        debug!(
            method = %operation.method,
            path = %operation.path,
            component = %component,
            test_cases = cases.len(),
            "Synthesized operation"
        );
        Ok(cases)
    }
}

fn finish(
    draft: Draft,
    operation: &Operation,
    component: &Component,
    entry: &CategoryPolicy,
    sub_test: &SubTestId,
) -> TestCase {
    let mut tags = vec![
        "api".to_string(),
        entry.category.as_str().to_string(),
        sub_test.as_str().to_ascii_lowercase(),
    ];
    for tag in draft.tags {
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }

    TestCase {
        id: String::new(),
        title: format!("{} {} - {}", operation.method, operation.path, draft.title),
        description: draft.description,
        component: component.clone(),
        category: entry.category,
        sub_test: sub_test.clone(),
        priority: entry.priority,
        operation: operation.reference(),
        steps: draft.steps,
        expected_results: draft.expected_results,
        expected_status: draft.expected_status,
        test_data: draft.test_data,
        tags,
        automation_candidate: draft.automation_candidate,
        origin: Origin::RuleBased,
    }
}

/// `TC-{COMPONENT}-{CATEGORY}-{SUBTEST}-{SEQ:03}`, with SEQ counted per prefix
/// in enumeration order.
fn assign_ids(cases: &mut [TestCase]) {
    let mut counters: HashMap<String, u32> = HashMap::new();
    for case in cases {
        let prefix = id_prefix(&case.component, case.category, &case.sub_test);
        let seq = counters.entry(prefix.clone()).or_insert(0);
        *seq += 1;
        case.id = format!("{}-{:03}", prefix, seq);
    }
}

pub(crate) fn id_prefix(component: &Component, category: Category, sub_test: &SubTestId) -> String {
    format!(
        "TC-{}-{}-{}",
        component.as_str().to_shouty_snake_case(),
        category.as_str().to_shouty_snake_case(),
        sub_test.as_str().to_ascii_uppercase()
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use serde_json::json;

    use super::*;
    use crate::catalog::{HttpMethod, Parameter};
    use crate::policy::{Priority, Profile};

    fn operation(method: HttpMethod, path: &str, responses: &[&str]) -> Operation {
        Operation {
            method,
            path: path.into(),
            operation_id: format!("{}_{}", method, path),
            summary: None,
            tags: vec![],
            parameters: crate::catalog::openapi::template_parameters(path)
                .into_iter()
                .map(Parameter::path)
                .collect(),
            responses: responses.iter().map(|s| s.to_string()).collect(),
            has_request_body: false,
            request_content_types: vec![],
            unresolved_refs: vec![],
        }
    }

    fn policy(entries: &[(Category, bool, &[&str])]) -> TestPolicy {
        TestPolicy {
            categories: entries
                .iter()
                .map(|(category, enabled, ids)| CategoryPolicy {
                    category: *category,
                    enabled: *enabled,
                    sub_tests: ids.iter().map(|id| SubTestId::new(*id)).collect(),
                    priority: category.default_priority(),
                    description: None,
                })
                .collect(),
            profiles: vec![Profile {
                name: "errors".into(),
                description: String::new(),
                enabled_types: vec![Category::ErrorHandling],
            }],
            current_profile: None,
        }
    }

    #[test]
    fn test_namespaces_scenario() {
        let ops = vec![operation(HttpMethod::Get, "/namespaces/{id}/policies", &["200", "404"])];
        let policy = policy(&[(Category::Functional, true, &["FUNC-HAPPY", "FUNC-NEGATIVE"])]);

        let result = synthesize(&ops, &policy);
        assert_eq!(result.len(), 2);
        assert!(result.skipped.is_empty());

        let happy = &result.test_cases[0];
        assert_eq!(happy.id, "TC-NAMESPACES-FUNCTIONAL-FUNC-HAPPY-001");
        assert_eq!(happy.category, Category::Functional);
        assert_eq!(happy.expected_status, vec![200]);
        assert_eq!(happy.test_data.value_of("id"), Some(&json!("sample-id")));
        assert_eq!(happy.priority, Priority::High);

        let negative = &result.test_cases[1];
        assert_eq!(negative.id, "TC-NAMESPACES-FUNCTIONAL-FUNC-NEGATIVE-001");
        assert_eq!(negative.test_data.omitted, vec!["id"]);
        assert!(negative.test_data.value_of("id").is_none());
        assert!((400..500).contains(&negative.expected_status[0]));
    }

    #[test]
    fn test_sequence_counts_per_prefix() {
        let ops = vec![
            operation(HttpMethod::Get, "/users", &["200"]),
            operation(HttpMethod::Post, "/users", &["201"]),
            operation(HttpMethod::Get, "/orders", &["200"]),
        ];
        let policy = policy(&[(Category::Security, true, &["SEC-AUTH"])]);
        let ids: Vec<String> = synthesize(&ops, &policy)
            .test_cases
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(
            ids,
            vec![
                "TC-USERS-SECURITY-SEC-AUTH-001",
                "TC-USERS-SECURITY-SEC-AUTH-002",
                "TC-USERS-SECURITY-SEC-AUTH-003",
                "TC-USERS-SECURITY-SEC-AUTH-004",
                "TC-ORDERS-SECURITY-SEC-AUTH-001",
                "TC-ORDERS-SECURITY-SEC-AUTH-002",
            ]
        );
    }

    #[test]
    fn test_skips_are_recorded_and_generation_continues() {
        let mut dangling = operation(HttpMethod::Get, "/broken", &["200"]);
        dangling.unresolved_refs = vec!["#/components/schemas/Gone".into()];
        let ops = vec![
            operation(HttpMethod::Get, "/empty", &[]),
            operation(HttpMethod::Get, "/errors-only", &["400", "default"]),
            dangling,
            operation(HttpMethod::Get, "/fine", &["200"]),
        ];
        let policy = policy(&[(Category::Functional, true, &["FUNC-HAPPY"])]);

        let result = synthesize(&ops, &policy);
        assert_eq!(result.len(), 1);
        assert_eq!(result.operations_total, 4);
        let reasons: Vec<&SkipReason> = result.skipped.iter().map(|s| &s.reason).collect();
        assert_eq!(reasons[0], &SkipReason::NoResponses);
        assert_eq!(reasons[1], &SkipReason::NoSuccessResponse);
        assert!(matches!(reasons[2], SkipReason::UnresolvedRefs(_)));
    }

    #[test]
    fn test_disabled_category_removed_without_touching_others() {
        let ops = vec![operation(HttpMethod::Get, "/items/{id}", &["200"])];
        let both = policy(&[
            (Category::Functional, true, &["FUNC-HAPPY"]),
            (Category::ErrorHandling, true, &["ERR-NOTFOUND"]),
        ]);
        let only_errors = both.apply_profile("errors").unwrap();

        let full = synthesize(&ops, &both);
        let reduced = synthesize(&ops, &only_errors);
        assert_eq!(full.categories(), vec![Category::Functional, Category::ErrorHandling]);
        assert_eq!(reduced.categories(), vec![Category::ErrorHandling]);

        let full_errors: Vec<&TestCase> = full
            .test_cases
            .iter()
            .filter(|c| c.category == Category::ErrorHandling)
            .collect();
        assert_eq!(full_errors.len(), reduced.len());
        assert_eq!(full_errors[0], &reduced.test_cases[0]);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let ops: Vec<Operation> = (0..13)
            .map(|i| operation(HttpMethod::Get, &format!("/res{}/{{id}}", i % 4), &["200"]))
            .collect();
        let policy = TestPolicy::builtin()
            .apply_profile("comprehensive")
            .unwrap();

        let sequential = synthesize(&ops, &policy);
        for workers in [2, 3, 8, 32] {
            assert_eq!(synthesize_parallel(&ops, &policy, workers), sequential);
        }
    }

    #[test]
    fn test_ids_unique_and_counts_consistent() {
        let ops = vec![
            operation(HttpMethod::Get, "/a/{id}", &["200"]),
            operation(HttpMethod::Delete, "/a/{id}", &["204"]),
            operation(HttpMethod::Get, "/v1/b", &["200"]),
        ];
        let policy = TestPolicy::builtin()
            .apply_profile("comprehensive")
            .unwrap();
        let result = synthesize(&ops, &policy);

        let ids: HashSet<&str> = result.test_cases.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.len(), result.len());
        assert_eq!(result.by_component.values().sum::<usize>(), result.len());
        assert_eq!(result.by_category.values().sum::<usize>(), result.len());
        assert_eq!(result.components().len(), 2);
    }

    #[test]
    fn test_id_prefix_format() {
        assert_eq!(
            id_prefix(
                &Component::new("audit_logs"),
                Category::ErrorHandling,
                &SubTestId::new("ERR-INVALID")
            ),
            "TC-AUDIT_LOGS-ERROR_HANDLING-ERR-INVALID"
        );
    }
}

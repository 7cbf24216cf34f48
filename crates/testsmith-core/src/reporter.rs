//! Coverage statistics over a [`GenerationResult`].

use std::collections::BTreeMap;

use serde::Serialize;

use crate::policy::{Category, Priority};
use crate::synthesizer::{GenerationResult, SkippedOperation};
use crate::testcase::Origin;

/// Counts for one generation run. Skipped operations are always reported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageStats {
    pub total: usize,
    pub by_component: BTreeMap<String, usize>,
    pub by_category: BTreeMap<Category, usize>,
    pub by_priority: BTreeMap<Priority, usize>,
    pub automation_candidates: usize,
    pub ai_augmented: usize,
    pub operations_total: usize,
    pub operations_covered: usize,
    pub skipped_count: usize,
    pub skipped: Vec<SkippedOperation>,
}

impl CoverageStats {
    /// Share of operations that produced at least one test case, 0.0..=1.0.
    pub fn operation_coverage(&self) -> f64 {
        if self.operations_total == 0 {
            return 0.0;
        }
        self.operations_covered as f64 / self.operations_total as f64
    }
}

pub fn summarize(result: &GenerationResult) -> CoverageStats {
    let mut by_priority = BTreeMap::new();
    let mut covered: Vec<(&str, &str)> = Vec::new();
    let mut automation_candidates = 0;
    let mut ai_augmented = 0;

    for case in &result.test_cases {
        *by_priority.entry(case.priority).or_insert(0) += 1;
        if case.automation_candidate {
            automation_candidates += 1;
        }
        if case.origin == Origin::AiAugmented {
            ai_augmented += 1;
        }
        let key = (case.operation.method.as_str(), case.operation.path.as_str());
        if !covered.contains(&key) {
            covered.push(key);
        }
    }

    CoverageStats {
        total: result.test_cases.len(),
        by_component: result
            .by_component
            .iter()
            .map(|(component, count)| (component.to_string(), *count))
            .collect(),
        by_category: result.by_category.clone(),
        by_priority,
        automation_candidates,
        ai_augmented,
        operations_total: result.operations_total,
        operations_covered: covered.len(),
        skipped_count: result.skipped.len(),
        skipped: result.skipped.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{HttpMethod, Operation, Parameter};
    use crate::policy::TestPolicy;
    use crate::synthesizer::synthesize;

    fn operation(method: HttpMethod, path: &str, responses: &[&str]) -> Operation {
        Operation {
            method,
            path: path.into(),
            operation_id: "op".into(),
            summary: None,
            tags: vec![],
            parameters: vec![Parameter::path("id")],
            responses: responses.iter().map(|s| s.to_string()).collect(),
            has_request_body: false,
            request_content_types: vec![],
            unresolved_refs: vec![],
        }
    }

    #[test]
    fn test_summary_counts() {
        let ops = vec![
            operation(HttpMethod::Get, "/users/{id}", &["200"]),
            operation(HttpMethod::Delete, "/users/{id}", &["204"]),
            operation(HttpMethod::Get, "/broken/{id}", &["500"]),
        ];
        let policy = TestPolicy::builtin().apply_profile("performance").unwrap();
        let result = synthesize(&ops, &policy);
        let stats = summarize(&result);

        assert_eq!(stats.total, result.len());
        assert_eq!(stats.operations_total, 3);
        assert_eq!(stats.operations_covered, 2);
        assert_eq!(stats.skipped_count, 1);
        assert_eq!(stats.by_component.get("users"), Some(&stats.total));
        assert_eq!(stats.by_priority.values().sum::<usize>(), stats.total);
        assert!(stats.automation_candidates < stats.total);
        assert_eq!(stats.ai_augmented, 0);
        assert!((stats.operation_coverage() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_result() {
        let stats = summarize(&synthesize(&[], &TestPolicy::builtin()));
        assert_eq!(stats.total, 0);
        assert_eq!(stats.skipped_count, 0);
        assert_eq!(stats.operation_coverage(), 0.0);
    }
}

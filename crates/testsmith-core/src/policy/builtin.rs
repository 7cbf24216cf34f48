//! Built-in default policy, used when no policy file is supplied.

use super::{Category, CategoryPolicy, Profile, SubTestId, SubTestKind, TestPolicy};

const DEFAULT_PROFILE: &str = "standard";

const CATEGORY_DESCRIPTIONS: [(Category, &str); 9] = [
    (Category::Functional, "Core behavior: happy path, negative input, validation, boundaries"),
    (Category::Security, "Authentication, authorization, content-type and transport checks"),
    (Category::ErrorHandling, "Missing resources and malformed requests"),
    (Category::EdgeCases, "Extreme and boundary parameter values"),
    (Category::Performance, "Load, stress and spike behavior"),
    (Category::Reliability, "Timeout handling and retry behavior"),
    (Category::Scalability, "Concurrent callers"),
    (Category::Compatibility, "API version compatibility"),
    (Category::Workflow, "End-to-end, sequence, CRUD and cross-component workflows"),
];

const PROFILES: [(&str, &str, &[Category]); 5] = [
    (
        "quick",
        "Fast feedback: functional and security checks only",
        &[Category::Functional, Category::Security],
    ),
    (
        "standard",
        "Functional, security and error-handling coverage",
        &[
            Category::Functional,
            Category::Security,
            Category::ErrorHandling,
        ],
    ),
    (
        "security",
        "Security-focused run with error handling and edge cases",
        &[
            Category::Security,
            Category::ErrorHandling,
            Category::EdgeCases,
        ],
    ),
    (
        "performance",
        "Functional baseline plus non-functional load and resilience intents",
        &[
            Category::Functional,
            Category::Performance,
            Category::Reliability,
            Category::Scalability,
        ],
    ),
    (
        "comprehensive",
        "Every category",
        &Category::ALL,
    ),
];

impl TestPolicy {
    /// Every category with all known sub-tests, the five standard profiles,
    /// and the `standard` profile applied.
    pub fn builtin() -> Self {
        let enabled: &[Category] = PROFILES
            .iter()
            .find(|(name, _, _)| *name == DEFAULT_PROFILE)
            .map(|(_, _, types)| *types)
            .unwrap_or(&[]);

        let categories = CATEGORY_DESCRIPTIONS
            .iter()
            .map(|(category, description)| CategoryPolicy {
                category: *category,
                enabled: enabled.contains(category),
                sub_tests: SubTestKind::ALL
                    .into_iter()
                    .filter(|kind| kind.category() == *category)
                    .map(SubTestId::from)
                    .collect(),
                priority: category.default_priority(),
                description: Some((*description).to_string()),
            })
            .collect();

        let profiles = PROFILES
            .iter()
            .map(|(name, description, enabled_types)| Profile {
                name: (*name).to_string(),
                description: (*description).to_string(),
                enabled_types: enabled_types.to_vec(),
            })
            .collect();

        TestPolicy {
            categories,
            profiles,
            current_profile: Some(DEFAULT_PROFILE.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_has_every_category_in_order() {
        let policy = TestPolicy::builtin();
        let order: Vec<Category> = policy.categories.iter().map(|c| c.category).collect();
        assert_eq!(order, Category::ALL.to_vec());
    }

    #[test]
    fn test_builtin_sub_test_counts() {
        let policy = TestPolicy::builtin();
        let count = |c| policy.category(c).map(|e| e.sub_tests.len()).unwrap_or(0);
        assert_eq!(count(Category::Functional), 5);
        assert_eq!(count(Category::Security), 4);
        assert_eq!(count(Category::ErrorHandling), 2);
        assert_eq!(count(Category::Workflow), 4);
    }

    #[test]
    fn test_builtin_applies_standard_profile() {
        let policy = TestPolicy::builtin();
        assert_eq!(policy.current_profile.as_deref(), Some("standard"));
        assert_eq!(
            policy.enabled_categories(),
            vec![
                Category::Functional,
                Category::Security,
                Category::ErrorHandling
            ]
        );
        assert_eq!(policy.tests_per_endpoint(), 11);
    }

    #[test]
    fn test_comprehensive_enables_everything() {
        let policy = TestPolicy::builtin().apply_profile("comprehensive").unwrap();
        assert_eq!(policy.enabled_categories(), Category::ALL.to_vec());
        assert_eq!(policy.tests_per_endpoint(), SubTestKind::ALL.len());
    }
}

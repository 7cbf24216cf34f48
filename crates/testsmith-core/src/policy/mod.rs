//! Test policy: which categories and sub-tests are generated, at what priority.
//!
//! A [`TestPolicy`] is a value object. Switching profiles produces a new value
//! via [`TestPolicy::apply_profile`]; the process-wide current policy lives in a
//! [`PolicyStore`] and generation runs work from an `Arc` snapshot of it.

mod builtin;
mod loader;
mod store;

pub use store::PolicyStore;

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Test categories. Policy files key their tables by [`Category::as_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Functional,
    Security,
    ErrorHandling,
    EdgeCases,
    Performance,
    Reliability,
    Scalability,
    Compatibility,
    Workflow,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Self::Functional,
        Self::Security,
        Self::ErrorHandling,
        Self::EdgeCases,
        Self::Performance,
        Self::Reliability,
        Self::Scalability,
        Self::Compatibility,
        Self::Workflow,
    ];

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == key)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Functional => "functional",
            Self::Security => "security",
            Self::ErrorHandling => "error_handling",
            Self::EdgeCases => "edge_cases",
            Self::Performance => "performance",
            Self::Reliability => "reliability",
            Self::Scalability => "scalability",
            Self::Compatibility => "compatibility",
            Self::Workflow => "workflow",
        }
    }

    /// Priority used when a policy file does not set one.
    pub fn default_priority(&self) -> Priority {
        match self {
            Self::Security => Priority::Critical,
            Self::Functional | Self::Workflow => Priority::High,
            Self::Compatibility => Priority::Low,
            Self::ErrorHandling
            | Self::EdgeCases
            | Self::Performance
            | Self::Reliability
            | Self::Scalability => Priority::Medium,
        }
    }

    /// Non-functional categories only ever produce intent records.
    pub fn is_non_functional(&self) -> bool {
        matches!(
            self,
            Self::Performance | Self::Reliability | Self::Scalability | Self::Compatibility
        )
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Test-case priority, most urgent first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];

    /// Case-insensitive (`"High"` and `"high"` both parse).
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_ascii_lowercase().as_str() {
            "critical" => Some(Self::Critical),
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sub-test identifier as written in the policy (`FUNC-HAPPY`, `SEC-AUTH`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SubTestId(String);

impl SubTestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The generation rule for this id, if it is one of the known ids.
    pub fn kind(&self) -> Option<SubTestKind> {
        SubTestKind::from_id(&self.0)
    }
}

impl fmt::Display for SubTestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<SubTestKind> for SubTestId {
    fn from(kind: SubTestKind) -> Self {
        Self::new(kind.as_str())
    }
}

/// Known sub-test identifiers, each bound to exactly one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubTestKind {
    FuncHappy,
    FuncNegative,
    FuncValidation,
    FuncWorkflow,
    FuncBoundary,
    SecAuth,
    SecAuthz,
    SecContent,
    SecEncryption,
    ErrNotFound,
    ErrInvalid,
    EdgeBoundary,
    PerfLoad,
    PerfStress,
    PerfSpike,
    ReliTimeout,
    ReliRetry,
    ScaleConcurrent,
    CompatVersions,
    WorkflowE2e,
    WorkflowSequence,
    WorkflowCrud,
    WorkflowIntegration,
}

impl SubTestKind {
    pub const ALL: [SubTestKind; 23] = [
        Self::FuncHappy,
        Self::FuncNegative,
        Self::FuncValidation,
        Self::FuncWorkflow,
        Self::FuncBoundary,
        Self::SecAuth,
        Self::SecAuthz,
        Self::SecContent,
        Self::SecEncryption,
        Self::ErrNotFound,
        Self::ErrInvalid,
        Self::EdgeBoundary,
        Self::PerfLoad,
        Self::PerfStress,
        Self::PerfSpike,
        Self::ReliTimeout,
        Self::ReliRetry,
        Self::ScaleConcurrent,
        Self::CompatVersions,
        Self::WorkflowE2e,
        Self::WorkflowSequence,
        Self::WorkflowCrud,
        Self::WorkflowIntegration,
    ];

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == id)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FuncHappy => "FUNC-HAPPY",
            Self::FuncNegative => "FUNC-NEGATIVE",
            Self::FuncValidation => "FUNC-VALIDATION",
            Self::FuncWorkflow => "FUNC-WORKFLOW",
            Self::FuncBoundary => "FUNC-BOUNDARY",
            Self::SecAuth => "SEC-AUTH",
            Self::SecAuthz => "SEC-AUTHZ",
            Self::SecContent => "SEC-CONTENT",
            Self::SecEncryption => "SEC-ENCRYPTION",
            Self::ErrNotFound => "ERR-NOTFOUND",
            Self::ErrInvalid => "ERR-INVALID",
            Self::EdgeBoundary => "EDGE-BOUNDARY",
            Self::PerfLoad => "PERF-LOAD",
            Self::PerfStress => "PERF-STRESS",
            Self::PerfSpike => "PERF-SPIKE",
            Self::ReliTimeout => "RELI-TIMEOUT",
            Self::ReliRetry => "RELI-RETRY",
            Self::ScaleConcurrent => "SCALE-CONCURRENT",
            Self::CompatVersions => "COMPAT-VERSIONS",
            Self::WorkflowE2e => "WORKFLOW-E2E",
            Self::WorkflowSequence => "WORKFLOW-SEQUENCE",
            Self::WorkflowCrud => "WORKFLOW-CRUD",
            Self::WorkflowIntegration => "WORKFLOW-INTEGRATION",
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Self::FuncHappy
            | Self::FuncNegative
            | Self::FuncValidation
            | Self::FuncWorkflow
            | Self::FuncBoundary => Category::Functional,
            Self::SecAuth | Self::SecAuthz | Self::SecContent | Self::SecEncryption => {
                Category::Security
            }
            Self::ErrNotFound | Self::ErrInvalid => Category::ErrorHandling,
            Self::EdgeBoundary => Category::EdgeCases,
            Self::PerfLoad | Self::PerfStress | Self::PerfSpike => Category::Performance,
            Self::ReliTimeout | Self::ReliRetry => Category::Reliability,
            Self::ScaleConcurrent => Category::Scalability,
            Self::CompatVersions => Category::Compatibility,
            Self::WorkflowE2e
            | Self::WorkflowSequence
            | Self::WorkflowCrud
            | Self::WorkflowIntegration => Category::Workflow,
        }
    }
}

/// Configuration of one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryPolicy {
    pub category: Category,
    pub enabled: bool,
    /// Ordered, unique within the category.
    pub sub_tests: Vec<SubTestId>,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A named bundle of enabled categories.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub name: String,
    pub description: String,
    pub enabled_types: Vec<Category>,
}

/// Error loading a policy or applying a profile.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("failed to read policy file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {format} policy: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },
    #[error("policy has no 'enabled_test_types' table")]
    MissingEnabledTestTypes,
    #[error("category '{category}' is missing required field '{field}'")]
    MissingField {
        category: String,
        field: &'static str,
    },
    #[error("invalid value for '{field}' in '{owner}': {message}")]
    InvalidField {
        owner: String,
        field: &'static str,
        message: String,
    },
    #[error("unknown test category '{0}'")]
    UnknownCategory(String),
    #[error("sub-test '{id}' is listed more than once in category '{category}'")]
    DuplicateSubTest { category: Category, id: String },
    #[error("sub-test '{id}' belongs to category '{expected}', not '{declared}'")]
    MisplacedSubTest {
        id: String,
        declared: Category,
        expected: Category,
    },
    #[error("profile '{profile}' references category '{category}' which the policy does not define")]
    UndefinedProfileCategory { profile: String, category: String },
    #[error("category '{0}' is enabled but lists no sub-tests")]
    EmptyCategory(Category),
    #[error("current_profile '{0}' is not a defined profile")]
    UnknownCurrentProfile(String),
    #[error("profile '{name}' not found. Available profiles: {}", available.join(", "))]
    ProfileNotFound {
        name: String,
        available: Vec<String>,
    },
}

impl PolicyError {
    /// Whether this error means the policy source itself is malformed.
    pub fn is_config_error(&self) -> bool {
        !matches!(self, Self::ProfileNotFound { .. } | Self::Io { .. })
    }
}

/// Ordered category table plus named profiles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestPolicy {
    pub categories: Vec<CategoryPolicy>,
    pub profiles: Vec<Profile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_profile: Option<String>,
}

impl TestPolicy {
    pub fn category(&self, category: Category) -> Option<&CategoryPolicy> {
        self.categories.iter().find(|c| c.category == category)
    }

    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    pub fn profile_names(&self) -> Vec<String> {
        self.profiles.iter().map(|p| p.name.clone()).collect()
    }

    /// Enabled categories in declared order.
    pub fn enabled_categories(&self) -> Vec<Category> {
        self.enabled().map(|c| c.category).collect()
    }

    /// Enabled category entries in declared order.
    ///
    /// A category with no sub-tests produces no records, so it never counts as
    /// enabled even when a profile switches it on.
    pub fn enabled(&self) -> impl Iterator<Item = &CategoryPolicy> {
        self.categories
            .iter()
            .filter(|c| c.enabled && !c.sub_tests.is_empty())
    }

    /// Sub-tests of every enabled category, in generation order.
    pub fn enabled_sub_tests(&self) -> Vec<SubTestId> {
        self.enabled()
            .flat_map(|c| c.sub_tests.iter().cloned())
            .collect()
    }

    /// Number of sub-tests generated per operation (each yields at least one record).
    pub fn tests_per_endpoint(&self) -> usize {
        self.enabled().map(|c| c.sub_tests.len()).sum()
    }

    /// A new policy with `enabled` set to membership in the profile's category set.
    ///
    /// Sub-test lists and priorities are untouched; `self` is never modified.
    pub fn apply_profile(&self, name: &str) -> Result<TestPolicy, PolicyError> {
        let profile = self
            .profile(name)
            .ok_or_else(|| PolicyError::ProfileNotFound {
                name: name.to_string(),
                available: self.profile_names(),
            })?;

        let categories = self
            .categories
            .iter()
            .map(|entry| CategoryPolicy {
                enabled: profile.enabled_types.contains(&entry.category),
                ..entry.clone()
            })
            .collect();

        Ok(TestPolicy {
            categories,
            profiles: self.profiles.clone(),
            current_profile: Some(profile.name.clone()),
        })
    }

    /// Serializable overview of the active configuration and available profiles.
    pub fn summary(&self) -> PolicySummary {
        let profile = self.current_profile.as_deref().and_then(|n| self.profile(n));

        let available_profiles = self
            .profiles
            .iter()
            .map(|p| ProfileSummary {
                name: p.name.clone(),
                description: p.description.clone(),
                enabled_types: p.enabled_types.clone(),
                tests_per_endpoint: p
                    .enabled_types
                    .iter()
                    .filter_map(|c| self.category(*c))
                    .map(|c| c.sub_tests.len())
                    .sum(),
            })
            .collect();

        PolicySummary {
            current_profile: self.current_profile.clone(),
            profile_description: profile.map(|p| p.description.clone()),
            enabled_types: self.enabled_categories(),
            enabled_sub_tests: self.enabled_sub_tests(),
            tests_per_endpoint: self.tests_per_endpoint(),
            available_profiles,
        }
    }
}

/// Overview returned by [`TestPolicy::summary`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicySummary {
    pub current_profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_description: Option<String>,
    pub enabled_types: Vec<Category>,
    pub enabled_sub_tests: Vec<SubTestId>,
    pub tests_per_endpoint: usize,
    pub available_profiles: Vec<ProfileSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileSummary {
    pub name: String,
    pub description: String,
    pub enabled_types: Vec<Category>,
    pub tests_per_endpoint: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_keys_round_trip() {
        for category in Category::ALL {
            assert_eq!(Category::from_key(category.as_str()), Some(category));
        }
        assert_eq!(Category::from_key("Functional"), None);
        assert_eq!(Category::from_key("usability"), None);
    }

    #[test]
    fn test_every_kind_has_prefix_of_its_category() {
        for kind in SubTestKind::ALL {
            let prefix = kind.as_str().split('-').next().unwrap();
            let expected = match kind.category() {
                Category::Functional => "FUNC",
                Category::Security => "SEC",
                Category::ErrorHandling => "ERR",
                Category::EdgeCases => "EDGE",
                Category::Performance => "PERF",
                Category::Reliability => "RELI",
                Category::Scalability => "SCALE",
                Category::Compatibility => "COMPAT",
                Category::Workflow => "WORKFLOW",
            };
            assert_eq!(prefix, expected, "{}", kind.as_str());
        }
    }

    #[test]
    fn test_priority_parse_is_case_insensitive() {
        assert_eq!(Priority::from_key("Critical"), Some(Priority::Critical));
        assert_eq!(Priority::from_key(" low "), Some(Priority::Low));
        assert_eq!(Priority::from_key("urgent"), None);
        assert!(Priority::Critical < Priority::Low);
    }

    #[test]
    fn test_apply_profile_sets_enabled_flags_only() {
        let policy = TestPolicy::builtin();
        let quick = policy.apply_profile("quick").unwrap();

        assert_eq!(
            quick.enabled_categories(),
            vec![Category::Functional, Category::Security]
        );
        assert_eq!(quick.current_profile.as_deref(), Some("quick"));
        for (before, after) in policy.categories.iter().zip(&quick.categories) {
            assert_eq!(before.sub_tests, after.sub_tests);
            assert_eq!(before.priority, after.priority);
        }
        // Source value untouched.
        assert_eq!(policy, TestPolicy::builtin());
    }

    #[test]
    fn test_apply_profile_unknown_name() {
        let err = TestPolicy::builtin().apply_profile("nightly").unwrap_err();
        assert!(matches!(err, PolicyError::ProfileNotFound { .. }));
        assert!(!err.is_config_error());
        assert!(err.to_string().contains("quick"));
    }

    #[test]
    fn test_profile_cannot_enable_empty_category() {
        let mut policy = TestPolicy::builtin();
        policy
            .categories
            .iter_mut()
            .find(|c| c.category == Category::Security)
            .unwrap()
            .sub_tests
            .clear();

        let quick = policy.apply_profile("quick").unwrap();
        assert!(quick.category(Category::Security).unwrap().enabled);
        assert_eq!(quick.enabled_categories(), vec![Category::Functional]);
    }

    #[test]
    fn test_summary_counts_profiles() {
        let summary = TestPolicy::builtin().summary();
        let quick = summary
            .available_profiles
            .iter()
            .find(|p| p.name == "quick")
            .unwrap();
        assert_eq!(quick.tests_per_endpoint, 9);
        assert_eq!(summary.tests_per_endpoint, summary.enabled_sub_tests.len());
    }
}

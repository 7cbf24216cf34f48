//! Policy files in JSON, TOML, or YAML.
//!
//! All three formats are normalized to a `serde_json::Value` and validated by
//! one walker, so document order and error reporting are identical across them.
//!
//! ```toml
//! current_profile = "quick"
//!
//! [enabled_test_types.functional]
//! enabled = true
//! tests = ["FUNC-HAPPY", "FUNC-NEGATIVE"]
//! priority = "high"
//!
//! [predefined_profiles.quick]
//! description = "Fast feedback"
//! enabled_types = ["functional"]
//! ```

use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use super::{Category, CategoryPolicy, PolicyError, Priority, Profile, SubTestId, TestPolicy};

/// `current_profile` value meaning "use the per-category flags as written".
const INDIVIDUAL_PROFILE: &str = "individual";

impl TestPolicy {
    /// Load a policy file, choosing the format from the extension.
    ///
    /// Unknown extensions are tried as JSON, then YAML.
    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let content = std::fs::read_to_string(path).map_err(|e| PolicyError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let policy = match extension.as_deref() {
            Some("json") => Self::from_json_str(&content),
            Some("toml") => Self::from_toml_str(&content),
            Some("yaml" | "yml") => Self::from_yaml_str(&content),
            _ => Self::from_json_str(&content).or_else(|_| Self::from_yaml_str(&content)),
        }?;

        debug!(
            path = %path.display(),
            categories = policy.categories.len(),
            profiles = policy.profiles.len(),
            current_profile = ?policy.current_profile,
            "Loaded test policy"
        );
        Ok(policy)
    }

    pub fn from_json_str(content: &str) -> Result<Self, PolicyError> {
        let value: Value = serde_json::from_str(content).map_err(|e| PolicyError::Parse {
            format: "JSON",
            message: e.to_string(),
        })?;
        Self::from_value(&value)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, PolicyError> {
        let table: toml::Value = toml::from_str(content).map_err(|e| PolicyError::Parse {
            format: "TOML",
            message: e.to_string(),
        })?;
        let value = serde_json::to_value(table).map_err(|e| PolicyError::Parse {
            format: "TOML",
            message: e.to_string(),
        })?;
        Self::from_value(&value)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, PolicyError> {
        let value: Value = serde_yaml::from_str(content).map_err(|e| PolicyError::Parse {
            format: "YAML",
            message: e.to_string(),
        })?;
        Self::from_value(&value)
    }

    /// Validate an already-parsed policy document.
    ///
    /// When `current_profile` names a profile, that profile is applied and
    /// overrides the per-category `enabled` flags.
    pub fn from_value(value: &Value) -> Result<Self, PolicyError> {
        let table = value
            .get("enabled_test_types")
            .and_then(Value::as_object)
            .ok_or(PolicyError::MissingEnabledTestTypes)?;

        let categories = table
            .iter()
            .map(|(key, entry)| parse_category(key, entry))
            .collect::<Result<Vec<_>, _>>()?;

        let profiles = match value.get("predefined_profiles") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Object(profiles)) => profiles
                .iter()
                .map(|(name, entry)| parse_profile(name, entry, &categories))
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => {
                return Err(PolicyError::InvalidField {
                    owner: "policy".to_string(),
                    field: "predefined_profiles",
                    message: "expected a table of profiles".to_string(),
                })
            }
        };

        let policy = TestPolicy {
            categories,
            profiles,
            current_profile: None,
        };

        match value.get("current_profile").and_then(Value::as_str) {
            None | Some(INDIVIDUAL_PROFILE) => Ok(policy),
            Some(name) if policy.profile(name).is_some() => policy.apply_profile(name),
            Some(name) => Err(PolicyError::UnknownCurrentProfile(name.to_string())),
        }
    }
}

fn parse_category(key: &str, entry: &Value) -> Result<CategoryPolicy, PolicyError> {
    let category =
        Category::from_key(key).ok_or_else(|| PolicyError::UnknownCategory(key.to_string()))?;
    let entry = entry.as_object().ok_or_else(|| PolicyError::InvalidField {
        owner: key.to_string(),
        field: "enabled_test_types",
        message: "expected a table".to_string(),
    })?;

    let enabled = match required(entry, key, "enabled")? {
        Value::Bool(enabled) => *enabled,
        _ => return Err(invalid(key, "enabled", "expected a boolean")),
    };

    let tests = required(entry, key, "tests")?
        .as_array()
        .ok_or_else(|| invalid(key, "tests", "expected a list of sub-test ids"))?;

    let mut sub_tests: Vec<SubTestId> = Vec::with_capacity(tests.len());
    for test in tests {
        let id = test
            .as_str()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| invalid(key, "tests", "sub-test ids must be non-empty strings"))?;
        let id = SubTestId::new(id);

        if sub_tests.contains(&id) {
            return Err(PolicyError::DuplicateSubTest {
                category,
                id: id.to_string(),
            });
        }
        if let Some(kind) = id.kind() {
            if kind.category() != category {
                return Err(PolicyError::MisplacedSubTest {
                    id: id.to_string(),
                    declared: category,
                    expected: kind.category(),
                });
            }
        }
        sub_tests.push(id);
    }
    if enabled && sub_tests.is_empty() {
        return Err(PolicyError::EmptyCategory(category));
    }

    let priority = match entry.get("priority") {
        None | Some(Value::Null) => category.default_priority(),
        Some(Value::String(raw)) if raw.trim().is_empty() => category.default_priority(),
        Some(Value::String(raw)) => Priority::from_key(raw)
            .ok_or_else(|| invalid(key, "priority", "expected critical, high, medium, or low"))?,
        Some(_) => return Err(invalid(key, "priority", "expected a string")),
    };

    Ok(CategoryPolicy {
        category,
        enabled,
        sub_tests,
        priority,
        description: entry
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_owned),
    })
}

fn parse_profile(
    name: &str,
    entry: &Value,
    categories: &[CategoryPolicy],
) -> Result<Profile, PolicyError> {
    let types = entry
        .get("enabled_types")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid(name, "enabled_types", "expected a list of categories"))?;

    let mut enabled_types = Vec::with_capacity(types.len());
    for raw in types {
        let raw = raw
            .as_str()
            .ok_or_else(|| invalid(name, "enabled_types", "expected category names"))?;
        let category = Category::from_key(raw)
            .filter(|c| categories.iter().any(|entry| entry.category == *c))
            .ok_or_else(|| PolicyError::UndefinedProfileCategory {
                profile: name.to_string(),
                category: raw.to_string(),
            })?;
        if !enabled_types.contains(&category) {
            enabled_types.push(category);
        }
    }

    Ok(Profile {
        name: name.to_string(),
        description: entry
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        enabled_types,
    })
}

fn required<'a>(
    entry: &'a Map<String, Value>,
    category: &str,
    field: &'static str,
) -> Result<&'a Value, PolicyError> {
    entry.get(field).ok_or_else(|| PolicyError::MissingField {
        category: category.to_string(),
        field,
    })
}

fn invalid(owner: &str, field: &'static str, message: &str) -> PolicyError {
    PolicyError::InvalidField {
        owner: owner.to_string(),
        field,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const JSON_POLICY: &str = r#"{
        "enabled_test_types": {
            "security": {"enabled": true, "tests": ["SEC-AUTH"], "priority": "Critical"},
            "functional": {"enabled": true, "tests": ["FUNC-HAPPY", "FUNC-NEGATIVE"]},
            "performance": {"enabled": false, "tests": ["PERF-LOAD"]}
        },
        "predefined_profiles": {
            "quick": {"description": "fast", "enabled_types": ["functional"]}
        }
    }"#;

    #[test]
    fn test_json_keeps_document_order() {
        let policy = TestPolicy::from_json_str(JSON_POLICY).unwrap();
        assert_eq!(
            policy.enabled_categories(),
            vec![Category::Security, Category::Functional]
        );
        assert_eq!(policy.current_profile, None);
        assert_eq!(
            policy.category(Category::Security).unwrap().priority,
            Priority::Critical
        );
        assert_eq!(
            policy.category(Category::Functional).unwrap().priority,
            Priority::High
        );
    }

    #[test]
    fn test_toml_current_profile_applied() {
        let toml = r#"
current_profile = "quick"

[enabled_test_types.functional]
enabled = false
tests = ["FUNC-HAPPY"]

[enabled_test_types.security]
enabled = true
tests = ["SEC-AUTH", "SEC-AUTHZ"]

[predefined_profiles.quick]
description = "functional only"
enabled_types = ["functional"]
"#;
        let policy = TestPolicy::from_toml_str(toml).unwrap();
        assert_eq!(policy.current_profile.as_deref(), Some("quick"));
        assert_eq!(policy.enabled_categories(), vec![Category::Functional]);
    }

    #[test]
    fn test_yaml_individual_profile_keeps_flags() {
        let yaml = r#"
current_profile: individual
enabled_test_types:
  error_handling:
    enabled: true
    tests: [ERR-NOTFOUND]
  functional:
    enabled: false
    tests: [FUNC-HAPPY]
"#;
        let policy = TestPolicy::from_yaml_str(yaml).unwrap();
        assert_eq!(policy.enabled_categories(), vec![Category::ErrorHandling]);
    }

    #[test]
    fn test_missing_table() {
        let err = TestPolicy::from_json_str(r#"{"predefined_profiles": {}}"#).unwrap_err();
        assert!(matches!(err, PolicyError::MissingEnabledTestTypes));
        assert!(err.is_config_error());
    }

    #[test]
    fn test_missing_tests_field() {
        let err = TestPolicy::from_json_str(r#"{"enabled_test_types": {"functional": {"enabled": true}}}"#)
            .unwrap_err();
        assert!(matches!(
            err,
            PolicyError::MissingField { field: "tests", .. }
        ));
    }

    #[test]
    fn test_unknown_category() {
        let err = TestPolicy::from_json_str(
            r#"{"enabled_test_types": {"usability": {"enabled": true, "tests": []}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, PolicyError::UnknownCategory(ref key) if key == "usability"));
    }

    #[test]
    fn test_duplicate_sub_test() {
        let err = TestPolicy::from_json_str(
            r#"{"enabled_test_types": {"functional": {"enabled": true, "tests": ["FUNC-HAPPY", "FUNC-HAPPY"]}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, PolicyError::DuplicateSubTest { .. }));
    }

    #[test]
    fn test_misplaced_known_sub_test() {
        let err = TestPolicy::from_json_str(
            r#"{"enabled_test_types": {"functional": {"enabled": true, "tests": ["SEC-AUTH"]}}}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PolicyError::MisplacedSubTest {
                declared: Category::Functional,
                expected: Category::Security,
                ..
            }
        ));
    }

    #[test]
    fn test_enabled_category_without_sub_tests() {
        let err = TestPolicy::from_json_str(
            r#"{"enabled_test_types": {
                "functional": {"enabled": true, "tests": ["FUNC-HAPPY"]},
                "security": {"enabled": true, "tests": []}
            }}"#,
        )
        .unwrap_err();
        assert!(matches!(err, PolicyError::EmptyCategory(Category::Security)));
        assert!(err.is_config_error());
        assert!(err.to_string().contains("no sub-tests"));

        // Disabled placeholders stay allowed.
        let policy = TestPolicy::from_json_str(
            r#"{"enabled_test_types": {
                "functional": {"enabled": true, "tests": ["FUNC-HAPPY"]},
                "security": {"enabled": false, "tests": []}
            }}"#,
        )
        .unwrap();
        assert_eq!(policy.enabled_categories(), vec![Category::Functional]);
    }

    #[test]
    fn test_unknown_sub_test_accepted() {
        let policy = TestPolicy::from_json_str(
            r#"{"enabled_test_types": {"functional": {"enabled": true, "tests": ["FUNC-SMOKE"]}}}"#,
        )
        .unwrap();
        let entry = policy.category(Category::Functional).unwrap();
        assert_eq!(entry.sub_tests[0].as_str(), "FUNC-SMOKE");
        assert!(entry.sub_tests[0].kind().is_none());
    }

    #[test]
    fn test_profile_with_undefined_category() {
        let err = TestPolicy::from_json_str(
            r#"{
                "enabled_test_types": {"functional": {"enabled": true, "tests": ["FUNC-HAPPY"]}},
                "predefined_profiles": {"sec": {"description": "", "enabled_types": ["security"]}}
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, PolicyError::UndefinedProfileCategory { .. }));
    }

    #[test]
    fn test_unknown_current_profile() {
        let err = TestPolicy::from_json_str(
            r#"{"enabled_test_types": {}, "current_profile": "nightly"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, PolicyError::UnknownCurrentProfile(_)));
    }

    #[test]
    fn test_invalid_priority() {
        let err = TestPolicy::from_json_str(
            r#"{"enabled_test_types": {"functional": {"enabled": true, "tests": ["FUNC-HAPPY"], "priority": "urgent"}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, PolicyError::InvalidField { field: "priority", .. }));
    }

    #[test]
    fn test_load_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(JSON_POLICY.as_bytes()).unwrap();

        let policy = TestPolicy::load(file.path()).unwrap();
        assert_eq!(policy.profiles.len(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let err = TestPolicy::load(Path::new("/nonexistent/policy.toml")).unwrap_err();
        assert!(matches!(err, PolicyError::Io { .. }));
        assert!(!err.is_config_error());
    }
}

//! Component classification from path templates.

use std::fmt;

use serde::Serialize;

use crate::catalog::Operation;

/// Fallback component for paths with no meaningful segment.
pub const GENERAL_COMPONENT: &str = "general";

/// Logical grouping of operations, derived from the path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Component(String);

impl Component {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Assign an operation to a component.
///
/// The first path segment that is neither a `{parameter}` nor a version marker
/// (`v1`, `v2.1`) names the component, lower-cased with non-alphanumerics
/// mapped to `_`.
pub fn classify(operation: &Operation) -> Component {
    classify_path(&operation.path)
}

/// Path-only form of [`classify`].
pub fn classify_path(path: &str) -> Component {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .find(|segment| !is_template_parameter(segment) && !is_version_marker(segment))
        .map(normalize)
        .filter(|name| name.chars().any(|c| c.is_ascii_alphanumeric()))
        .map(Component)
        .unwrap_or_else(|| Component::new(GENERAL_COMPONENT))
}

fn is_template_parameter(segment: &str) -> bool {
    segment.starts_with('{') && segment.ends_with('}')
}

fn is_version_marker(segment: &str) -> bool {
    let Some(rest) = segment
        .strip_prefix('v')
        .or_else(|| segment.strip_prefix('V'))
    else {
        return false;
    };
    !rest.is_empty()
        && rest.starts_with(|c: char| c.is_ascii_digit())
        && rest.chars().all(|c| c.is_ascii_digit() || c == '.')
}

fn normalize(segment: &str) -> String {
    segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_segment_names_component() {
        assert_eq!(classify_path("/namespaces/{id}/policies").as_str(), "namespaces");
        assert_eq!(classify_path("/Users").as_str(), "users");
    }

    #[test]
    fn test_version_and_parameters_skipped() {
        assert_eq!(classify_path("/v1/orders/{id}").as_str(), "orders");
        assert_eq!(classify_path("/v2.1/{tenant}/billing").as_str(), "billing");
        assert_eq!(classify_path("/{tenant}/reports").as_str(), "reports");
    }

    #[test]
    fn test_version_lookalikes_kept() {
        assert_eq!(classify_path("/views").as_str(), "views");
        assert_eq!(classify_path("/v/items").as_str(), "v");
    }

    #[test]
    fn test_non_alphanumerics_mapped() {
        assert_eq!(classify_path("/audit-logs").as_str(), "audit_logs");
        assert_eq!(classify_path("/health.check").as_str(), "health_check");
    }

    #[test]
    fn test_general_fallback() {
        assert_eq!(classify_path("/").as_str(), GENERAL_COMPONENT);
        assert_eq!(classify_path("/v1/{id}").as_str(), GENERAL_COMPONENT);
        assert_eq!(classify_path("").as_str(), GENERAL_COMPONENT);
    }
}

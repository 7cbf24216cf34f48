//! Normalized operation catalog.
//!
//! An [`Operation`] is an immutable descriptor of one API endpoint variant
//! (method + path). The catalog is built once per generation run from an
//! OpenAPI document (see [`openapi`]) and is read-only afterwards.

pub mod openapi;

pub use openapi::{build_catalog, load_catalog, parse_catalog_str, CatalogError};

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// HTTP methods that produce operations. Other path-item keys are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// Parse an OpenAPI path-item key (`get`, `post`, ...). Case-insensitive.
    pub fn from_key(key: &str) -> Option<Self> {
        match key.to_ascii_lowercase().as_str() {
            "get" => Some(Self::Get),
            "post" => Some(Self::Post),
            "put" => Some(Self::Put),
            "patch" => Some(Self::Patch),
            "delete" => Some(Self::Delete),
            "head" => Some(Self::Head),
            "options" => Some(Self::Options),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }

    /// Whether requests with this method conventionally carry a body.
    pub fn carries_body(&self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a parameter travels in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Cookie,
    /// Top-level property of a JSON request body.
    Body,
}

impl ParamLocation {
    pub(crate) fn from_key(key: &str) -> Option<Self> {
        match key {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "cookie" => Some(Self::Cookie),
            "body" | "formData" => Some(Self::Body),
            _ => None,
        }
    }
}

impl fmt::Display for ParamLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Cookie => "cookie",
            Self::Body => "body",
        };
        f.write_str(s)
    }
}

/// Declared JSON Schema type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    /// Map a schema `type` keyword. Missing or unknown types are treated as strings.
    pub fn from_schema_type(value: Option<&str>) -> Self {
        match value {
            Some("integer") => Self::Integer,
            Some("number") => Self::Number,
            Some("boolean") => Self::Boolean,
            Some("array") => Self::Array,
            Some("object") => Self::Object,
            _ => Self::String,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Number)
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        };
        f.write_str(s)
    }
}

/// Length, range, and enumeration constraints from a parameter schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Constraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<Value>,
}

impl Constraints {
    pub fn has_length(&self) -> bool {
        self.min_length.is_some() || self.max_length.is_some()
    }

    pub fn has_range(&self) -> bool {
        self.minimum.is_some() || self.maximum.is_some()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_length() && !self.has_range() && self.enum_values.is_empty()
    }
}

/// One request parameter of an operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub location: ParamLocation,
    pub required: bool,
    pub param_type: ParamType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Item type for arrays.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_type: Option<ParamType>,
    #[serde(skip_serializing_if = "Constraints::is_empty")]
    pub constraints: Constraints,
}

impl Parameter {
    /// A required string path parameter, used for path templates that omit their declarations.
    pub fn path(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: ParamLocation::Path,
            required: true,
            param_type: ParamType::String,
            format: None,
            item_type: None,
            constraints: Constraints::default(),
        }
    }
}

/// Reference to the operation a test case targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OperationRef {
    pub method: HttpMethod,
    pub path: String,
    pub operation_id: String,
}

/// Immutable descriptor of one API endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    pub method: HttpMethod,
    pub path: String,
    pub operation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub parameters: Vec<Parameter>,
    /// Declared response keys in document order (`200`, `2XX`, `default`, ...).
    pub responses: Vec<String>,
    pub has_request_body: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub request_content_types: Vec<String>,
    /// `$ref`s that could not be resolved while building this operation.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unresolved_refs: Vec<String>,
}

impl Operation {
    pub fn reference(&self) -> OperationRef {
        OperationRef {
            method: self.method,
            path: self.path.clone(),
            operation_id: self.operation_id.clone(),
        }
    }

    /// The lowest declared 2xx status. A `2XX` range key counts as 200.
    pub fn success_status(&self) -> Option<u16> {
        self.declared_in(200..=299)
    }

    /// Lowest declared status inside `range`, honoring `NXX` range keys.
    pub fn declared_in(&self, range: std::ops::RangeInclusive<u16>) -> Option<u16> {
        self.responses
            .iter()
            .filter_map(|key| parse_status_key(key))
            .filter(|code| range.contains(code))
            .min()
    }

    /// Whether `code` is declared exactly.
    pub fn declares(&self, code: u16) -> bool {
        self.responses
            .iter()
            .any(|key| key.trim().parse::<u16>().ok() == Some(code))
    }

    /// The client-error code to expect for rejected input: a declared 400, then
    /// 422, then any declared 4xx, then 400.
    pub fn client_error_status(&self) -> u16 {
        if self.declares(400) {
            400
        } else if self.declares(422) {
            422
        } else {
            self.responses
                .iter()
                .filter_map(|key| parse_status_key(key))
                .filter(|code| (400..=499).contains(code))
                .filter(|code| !matches!(code, 401 | 403 | 404 | 415))
                .min()
                .unwrap_or(400)
        }
    }

    pub fn required_parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(|p| p.required)
    }

    pub fn path_parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters
            .iter()
            .filter(|p| p.location == ParamLocation::Path)
    }

    /// `METHOD /path`, used in titles and log fields.
    pub fn signature(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

fn parse_status_key(key: &str) -> Option<u16> {
    let key = key.trim();
    if let Ok(code) = key.parse::<u16>() {
        return Some(code);
    }
    let bytes = key.as_bytes();
    if bytes.len() == 3 && bytes[1..].eq_ignore_ascii_case(b"xx") && bytes[0].is_ascii_digit() {
        return Some(u16::from(bytes[0] - b'0') * 100);
    }
    None
}

/// Title and version from the document's `info` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApiInfo {
    pub title: Option<String>,
    pub version: Option<String>,
}

/// Ordered operations plus document metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Catalog {
    pub info: ApiInfo,
    pub operations: Vec<Operation>,
}

impl Catalog {
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Find an operation by method and path.
    pub fn find(&self, method: HttpMethod, path: &str) -> Option<&Operation> {
        self.operations
            .iter()
            .find(|op| op.method == method && op.path == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op_with_responses(responses: &[&str]) -> Operation {
        Operation {
            method: HttpMethod::Get,
            path: "/items".into(),
            operation_id: "list_items".into(),
            summary: None,
            tags: vec![],
            parameters: vec![],
            responses: responses.iter().map(|s| s.to_string()).collect(),
            has_request_body: false,
            request_content_types: vec![],
            unresolved_refs: vec![],
        }
    }

    #[test]
    fn test_success_status_picks_lowest_2xx() {
        let op = op_with_responses(&["404", "201", "200", "default"]);
        assert_eq!(op.success_status(), Some(200));
    }

    #[test]
    fn test_success_status_range_key() {
        let op = op_with_responses(&["2XX", "400"]);
        assert_eq!(op.success_status(), Some(200));
    }

    #[test]
    fn test_success_status_absent() {
        let op = op_with_responses(&["default", "500"]);
        assert_eq!(op.success_status(), None);
    }

    #[test]
    fn test_client_error_status_preference() {
        assert_eq!(op_with_responses(&["200"]).client_error_status(), 400);
        assert_eq!(op_with_responses(&["200", "422"]).client_error_status(), 422);
        assert_eq!(
            op_with_responses(&["200", "401", "409"]).client_error_status(),
            409
        );
    }

    #[test]
    fn test_method_from_key() {
        assert_eq!(HttpMethod::from_key("GET"), Some(HttpMethod::Get));
        assert_eq!(HttpMethod::from_key("patch"), Some(HttpMethod::Patch));
        assert_eq!(HttpMethod::from_key("parameters"), None);
        assert!(HttpMethod::Post.carries_body());
        assert!(!HttpMethod::Delete.carries_body());
    }
}

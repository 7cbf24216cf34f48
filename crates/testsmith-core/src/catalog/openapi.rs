//! Parsing an OpenAPI document into a [`Catalog`].
//!
//! Accepts OpenAPI 3.x (and the Swagger 2 parameter forms that are still
//! common in the wild) as JSON or YAML. Paths and methods keep document order,
//! which the rest of the pipeline relies on for reproducible output.

use std::path::{Path, PathBuf};

use heck::ToSnakeCase;
use serde_json::Value;
use tracing::debug;

use super::{
    ApiInfo, Catalog, Constraints, HttpMethod, Operation, ParamLocation, ParamType, Parameter,
};

/// Nested `$ref` chains longer than this are reported as unresolved.
const MAX_REF_DEPTH: usize = 8;

/// Error while loading or parsing an API description.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read API description '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("API description is neither valid JSON nor YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("API description has no 'paths' object")]
    MissingPaths,
    #[error("path item '{0}' is not an object")]
    InvalidPathItem(String),
}

/// Load and build a catalog from a JSON or YAML file.
pub fn load_catalog(path: &Path) -> Result<Catalog, CatalogError> {
    let content = std::fs::read_to_string(path).map_err(|e| CatalogError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_catalog_str(&content)
}

/// Build a catalog from document text, trying JSON first and then YAML.
pub fn parse_catalog_str(content: &str) -> Result<Catalog, CatalogError> {
    let document: Value = match serde_json::from_str(content) {
        Ok(value) => value,
        Err(_) => serde_yaml::from_str(content)?,
    };
    build_catalog(&document)
}

/// Build a catalog from an already-parsed document.
pub fn build_catalog(document: &Value) -> Result<Catalog, CatalogError> {
    let paths = document
        .get("paths")
        .and_then(Value::as_object)
        .ok_or(CatalogError::MissingPaths)?;

    let info = ApiInfo {
        title: document
            .pointer("/info/title")
            .and_then(Value::as_str)
            .map(str::to_owned),
        version: document
            .pointer("/info/version")
            .and_then(Value::as_str)
            .map(str::to_owned),
    };

    let mut operations = Vec::new();
    for (path, item) in paths {
        let item = item
            .as_object()
            .ok_or_else(|| CatalogError::InvalidPathItem(path.clone()))?;
        let shared = item.get("parameters");

        for (key, raw) in item {
            let Some(method) = HttpMethod::from_key(key) else {
                continue;
            };
            let operation = OperationBuilder::new(document).build(path, method, raw, shared);
            debug!(
                method = %operation.method,
                path = %operation.path,
                parameters = operation.parameters.len(),
                "Catalogued operation"
            );
            operations.push(operation);
        }
    }

    Ok(Catalog { info, operations })
}

struct OperationBuilder<'a> {
    document: &'a Value,
    unresolved: Vec<String>,
}

impl<'a> OperationBuilder<'a> {
    fn new(document: &'a Value) -> Self {
        Self {
            document,
            unresolved: Vec::new(),
        }
    }

    fn build(
        mut self,
        path: &str,
        method: HttpMethod,
        raw: &'a Value,
        shared: Option<&'a Value>,
    ) -> Operation {
        let mut parameters = self.declared_parameters(raw, shared);

        for name in template_parameters(path) {
            let declared = parameters
                .iter()
                .any(|p| p.location == ParamLocation::Path && p.name == name);
            if !declared {
                parameters.push(Parameter::path(name));
            }
        }

        let (has_request_body, request_content_types) = match raw.get("requestBody") {
            Some(body) => {
                let (content_types, body_params) = self.request_body(body);
                parameters.extend(body_params);
                (true, content_types)
            }
            None => (
                parameters.iter().any(|p| p.location == ParamLocation::Body),
                Vec::new(),
            ),
        };

        let responses = raw
            .get("responses")
            .and_then(Value::as_object)
            .map(|responses| responses.keys().cloned().collect())
            .unwrap_or_default();

        let operation_id = raw
            .get("operationId")
            .and_then(Value::as_str)
            .filter(|id| !id.trim().is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| derive_operation_id(method, path));

        let tags = raw
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        Operation {
            method,
            path: path.to_string(),
            operation_id,
            summary: raw
                .get("summary")
                .and_then(Value::as_str)
                .map(str::to_owned),
            tags,
            parameters,
            responses,
            has_request_body,
            request_content_types,
            unresolved_refs: self.unresolved,
        }
    }

    /// Follow `$ref` chains inside the document.
    fn resolve(&mut self, value: &'a Value) -> Option<&'a Value> {
        let mut current = value;
        for _ in 0..MAX_REF_DEPTH {
            let Some(reference) = current.get("$ref").and_then(Value::as_str) else {
                return Some(current);
            };
            match reference
                .strip_prefix('#')
                .and_then(|pointer| self.document.pointer(pointer))
            {
                Some(target) => current = target,
                None => {
                    self.unresolved.push(reference.to_string());
                    return None;
                }
            }
        }
        if let Some(reference) = current.get("$ref").and_then(Value::as_str) {
            self.unresolved.push(reference.to_string());
            return None;
        }
        Some(current)
    }

    /// Path-level then operation-level parameters; operation-level declarations
    /// replace path-level ones with the same name and location.
    fn declared_parameters(
        &mut self,
        raw: &'a Value,
        shared: Option<&'a Value>,
    ) -> Vec<Parameter> {
        let mut parameters: Vec<Parameter> = Vec::new();

        for list in [shared, raw.get("parameters")].into_iter().flatten() {
            let Some(items) = list.as_array() else {
                continue;
            };
            for item in items {
                let Some(item) = self.resolve(item) else {
                    continue;
                };
                for param in self.parameter(item) {
                    match parameters
                        .iter_mut()
                        .find(|p| p.name == param.name && p.location == param.location)
                    {
                        Some(existing) => *existing = param,
                        None => parameters.push(param),
                    }
                }
            }
        }

        parameters
    }

    fn parameter(&mut self, item: &'a Value) -> Vec<Parameter> {
        let Some(name) = item.get("name").and_then(Value::as_str) else {
            return Vec::new();
        };
        let Some(location) = item
            .get("in")
            .and_then(Value::as_str)
            .and_then(ParamLocation::from_key)
        else {
            return Vec::new();
        };

        // Swagger 2 body parameter: the schema describes the whole payload.
        if item.get("in").and_then(Value::as_str) == Some("body") {
            return match item.get("schema").and_then(|s| self.resolve(s)) {
                Some(schema) => self.body_parameters(schema),
                None => Vec::new(),
            };
        }

        let required = location == ParamLocation::Path
            || item
                .get("required")
                .and_then(Value::as_bool)
                .unwrap_or(false);

        // OpenAPI 3 nests the schema; Swagger 2 puts type keywords on the parameter.
        let schema = match item.get("schema") {
            Some(schema) => self.resolve(schema).unwrap_or(item),
            None => item,
        };

        vec![self.schema_parameter(name, location, required, schema)]
    }

    fn request_body(&mut self, body: &'a Value) -> (Vec<String>, Vec<Parameter>) {
        let Some(body) = self.resolve(body) else {
            return (Vec::new(), Vec::new());
        };
        let Some(content) = body.get("content").and_then(Value::as_object) else {
            return (Vec::new(), Vec::new());
        };

        let content_types: Vec<String> = content.keys().cloned().collect();
        let media = content
            .get("application/json")
            .or_else(|| {
                content
                    .iter()
                    .find(|(key, _)| key.contains("json"))
                    .map(|(_, value)| value)
            })
            .or_else(|| content.values().next());

        let params = match media
            .and_then(|m| m.get("schema"))
            .and_then(|s| self.resolve(s))
        {
            Some(schema) => self.body_parameters(schema),
            None => Vec::new(),
        };

        (content_types, params)
    }

    /// Flatten the top-level properties of an object schema (including `allOf` parts).
    fn body_parameters(&mut self, schema: &'a Value) -> Vec<Parameter> {
        let mut params = Vec::new();

        if let Some(parts) = schema.get("allOf").and_then(Value::as_array) {
            for part in parts {
                if let Some(part) = self.resolve(part) {
                    params.extend(self.body_parameters(part));
                }
            }
        }

        let required: Vec<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
            for (name, property) in properties {
                let Some(property) = self.resolve(property) else {
                    continue;
                };
                params.push(self.schema_parameter(
                    name,
                    ParamLocation::Body,
                    required.contains(&name.as_str()),
                    property,
                ));
            }
        }

        params
    }

    fn schema_parameter(
        &mut self,
        name: &str,
        location: ParamLocation,
        required: bool,
        schema: &'a Value,
    ) -> Parameter {
        let item_type = schema
            .get("items")
            .and_then(|items| self.resolve(items))
            .map(|items| ParamType::from_schema_type(schema_type(items)));

        Parameter {
            name: name.to_string(),
            location,
            required,
            param_type: ParamType::from_schema_type(schema_type(schema)),
            format: schema
                .get("format")
                .and_then(Value::as_str)
                .map(str::to_owned),
            item_type,
            constraints: Constraints {
                min_length: schema.get("minLength").and_then(Value::as_u64),
                max_length: schema.get("maxLength").and_then(Value::as_u64),
                minimum: schema.get("minimum").and_then(Value::as_f64),
                maximum: schema.get("maximum").and_then(Value::as_f64),
                enum_values: schema
                    .get("enum")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default(),
            },
        }
    }
}

/// The schema `type`, taking the first non-null entry of an OpenAPI 3.1 type array.
fn schema_type(schema: &Value) -> Option<&str> {
    match schema.get("type") {
        Some(Value::String(t)) => Some(t.as_str()),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null"),
        _ => None,
    }
}

/// `{name}` placeholders in a path template, in order.
pub(crate) fn template_parameters(path: &str) -> Vec<String> {
    path.split('/')
        .filter_map(|segment| {
            segment
                .strip_prefix('{')
                .and_then(|rest| rest.strip_suffix('}'))
        })
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .collect()
}

fn derive_operation_id(method: HttpMethod, path: &str) -> String {
    let path_part = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.trim_matches(|c| c == '{' || c == '}'))
        .collect::<Vec<_>>()
        .join("_");
    format!("{}_{}", method.as_str().to_ascii_lowercase(), path_part).to_snake_case()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PETSTORE: &str = r##"
openapi: 3.0.3
info:
  title: Petstore
  version: 1.2.0
paths:
  /pets:
    get:
      operationId: listPets
      tags: [pets]
      parameters:
        - name: limit
          in: query
          schema:
            type: integer
            minimum: 1
            maximum: 100
      responses:
        "200":
          description: ok
    post:
      requestBody:
        content:
          application/json:
            schema:
              $ref: "#/components/schemas/NewPet"
      responses:
        "201":
          description: created
        "422":
          description: invalid
  /pets/{petId}:
    parameters:
      - $ref: "#/components/parameters/PetId"
    get:
      responses:
        "200":
          description: ok
        "404":
          description: missing
components:
  parameters:
    PetId:
      name: petId
      in: path
      required: true
      schema:
        type: string
        format: uuid
  schemas:
    NewPet:
      type: object
      required: [name]
      properties:
        name:
          type: string
          minLength: 1
          maxLength: 40
        tag:
          type: string
          enum: [cat, dog]
"##;

    #[test]
    fn test_yaml_document_keeps_order() {
        let catalog = parse_catalog_str(PETSTORE).unwrap();
        let signatures: Vec<String> = catalog.operations.iter().map(|o| o.signature()).collect();
        assert_eq!(
            signatures,
            vec!["GET /pets", "POST /pets", "GET /pets/{petId}"]
        );
        assert_eq!(catalog.info.title.as_deref(), Some("Petstore"));
        assert_eq!(catalog.info.version.as_deref(), Some("1.2.0"));
    }

    #[test]
    fn test_query_constraints_extracted() {
        let catalog = parse_catalog_str(PETSTORE).unwrap();
        let list = &catalog.operations[0];
        assert_eq!(list.operation_id, "listPets");
        assert_eq!(list.tags, vec!["pets"]);
        let limit = &list.parameters[0];
        assert_eq!(limit.location, ParamLocation::Query);
        assert!(!limit.required);
        assert_eq!(limit.param_type, ParamType::Integer);
        assert_eq!(limit.constraints.minimum, Some(1.0));
        assert_eq!(limit.constraints.maximum, Some(100.0));
    }

    #[test]
    fn test_request_body_properties_flattened() {
        let catalog = parse_catalog_str(PETSTORE).unwrap();
        let create = &catalog.operations[1];
        assert!(create.has_request_body);
        assert_eq!(create.request_content_types, vec!["application/json"]);
        assert_eq!(create.operation_id, "post_pets");

        let name = create.parameters.iter().find(|p| p.name == "name").unwrap();
        assert_eq!(name.location, ParamLocation::Body);
        assert!(name.required);
        assert_eq!(name.constraints.max_length, Some(40));

        let tag = create.parameters.iter().find(|p| p.name == "tag").unwrap();
        assert!(!tag.required);
        assert_eq!(tag.constraints.enum_values.len(), 2);
    }

    #[test]
    fn test_path_level_ref_parameter_resolved() {
        let catalog = parse_catalog_str(PETSTORE).unwrap();
        let get = &catalog.operations[2];
        assert!(get.unresolved_refs.is_empty());
        let pet_id = &get.parameters[0];
        assert_eq!(pet_id.name, "petId");
        assert!(pet_id.required);
        assert_eq!(pet_id.format.as_deref(), Some("uuid"));
    }

    #[test]
    fn test_undeclared_template_parameter_added() {
        let doc = serde_json::json!({
            "paths": {
                "/namespaces/{id}/policies": {
                    "get": { "responses": { "200": { "description": "ok" } } }
                }
            }
        });
        let catalog = build_catalog(&doc).unwrap();
        let op = &catalog.operations[0];
        assert_eq!(op.parameters, vec![Parameter::path("id")]);
        assert_eq!(op.operation_id, "get_namespaces_id_policies");
    }

    #[test]
    fn test_dangling_ref_recorded() {
        let doc = serde_json::json!({
            "paths": {
                "/things": {
                    "get": {
                        "parameters": [ { "$ref": "#/components/parameters/Missing" } ],
                        "responses": { "200": {} }
                    }
                }
            }
        });
        let catalog = build_catalog(&doc).unwrap();
        assert_eq!(
            catalog.operations[0].unresolved_refs,
            vec!["#/components/parameters/Missing"]
        );
    }

    #[test]
    fn test_missing_paths_is_error() {
        let result = parse_catalog_str(r#"{"openapi": "3.0.0"}"#);
        assert!(matches!(result, Err(CatalogError::MissingPaths)));
    }

    #[test]
    fn test_non_method_keys_ignored() {
        let doc = serde_json::json!({
            "paths": {
                "/health": {
                    "summary": "health",
                    "servers": [],
                    "get": { "responses": { "200": {} } }
                }
            }
        });
        let catalog = build_catalog(&doc).unwrap();
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_load_catalog_missing_file() {
        let result = load_catalog(Path::new("/nonexistent/openapi.json"));
        assert!(matches!(result, Err(CatalogError::Io { .. })));
    }

    #[test]
    fn test_template_parameters() {
        assert_eq!(
            template_parameters("/a/{x}/b/{y}"),
            vec!["x".to_string(), "y".to_string()]
        );
        assert!(template_parameters("/plain").is_empty());
    }
}

//! pytest module emission.
//!
//! One `test_{component}.py` per component, in order of first appearance, plus
//! a `pytest.ini` registering every marker the modules use and a
//! `requirements.txt` for the runner.

mod filters;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use heck::ToSnakeCase;
use serde::Serialize;
use serde_json::{Map, Value};
use tera::{Context, Tera};
use testsmith_core::catalog::ParamLocation;
use testsmith_core::policy::Priority;
use testsmith_core::testcase::TestData;
use testsmith_core::{GenerationResult, Origin, TestCase};

const MODULE_TEMPLATE: &str = "test_module.py";
const INI_TEMPLATE: &str = "pytest.ini";
const REQUIREMENTS_FILE: &str = "requirements.txt";
const REQUIREMENTS: &str = "pytest>=7.0.0\nrequests>=2.28.0\npytest-html>=3.1.0\n";

/// A rendered output file ready to be written to disk.
#[derive(Debug)]
pub(crate) struct RenderedFile {
    /// Path relative to the output directory.
    pub path: String,
    pub content: String,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum EmitError {
    #[error("template error: {0}")]
    Template(#[from] tera::Error),
    #[error("failed to write '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// View of one test case shaped for the module template.
#[derive(Debug, Serialize)]
struct CaseView {
    id: String,
    /// Python method name, unique within its module.
    function: String,
    title: String,
    description: String,
    category: &'static str,
    priority: &'static str,
    origin: &'static str,
    method: &'static str,
    path: String,
    request_path: String,
    steps: Vec<String>,
    expected_results: Vec<String>,
    intent: bool,
    skip_reason: String,
    path_params: Value,
    query: Value,
    headers: Value,
    cookies: Value,
    body: Value,
    raw_body: Value,
    expected_status: Vec<u16>,
}

impl CaseView {
    fn new(case: &TestCase, function: String) -> Self {
        let data = &case.test_data;
        let suffix = data
            .intent
            .get("path_suffix")
            .and_then(Value::as_str)
            .unwrap_or_default();

        Self {
            id: case.id.clone(),
            function,
            title: docstring(&case.title),
            description: docstring(&case.description),
            category: case.category.as_str(),
            priority: case.priority.as_str(),
            origin: match case.origin {
                Origin::RuleBased => "rule-based",
                Origin::AiAugmented => "ai-augmented",
            },
            method: case.operation.method.as_str(),
            path: case.operation.path.clone(),
            request_path: format!("{}{}", case.operation.path, suffix),
            steps: case.steps.iter().map(|s| docstring(s)).collect(),
            expected_results: case.expected_results.iter().map(|s| docstring(s)).collect(),
            intent: case.is_intent(),
            skip_reason: format!(
                "{} is a descriptive check for an external harness",
                case.sub_test
            ),
            path_params: located(data, ParamLocation::Path),
            query: located(data, ParamLocation::Query),
            headers: headers(data),
            cookies: located(data, ParamLocation::Cookie),
            body: match located(data, ParamLocation::Body) {
                Value::Object(map) if map.is_empty() => Value::Null,
                body => body,
            },
            raw_body: data.raw_body.clone().map(Value::String).unwrap_or(Value::Null),
            expected_status: case.expected_status.clone(),
        }
    }
}

fn located(data: &TestData, location: ParamLocation) -> Value {
    Value::Object(
        data.located(location)
            .map(|p| (p.name.clone(), p.value.clone()))
            .collect::<Map<_, _>>(),
    )
}

/// Declared header parameters followed by the case's request headers.
fn headers(data: &TestData) -> Value {
    let mut map: Map<String, Value> = data
        .located(ParamLocation::Header)
        .map(|p| {
            let value = match &p.value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (p.name.clone(), Value::String(value))
        })
        .collect();
    for (name, value) in &data.headers {
        map.insert(name.clone(), Value::String(value.clone()));
    }
    Value::Object(map)
}

/// `test_<snake id>` names for one module. Ids that only differ by punctuation
/// snake-case to the same name, so later ones get a numeric suffix.
fn function_names<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut used = HashSet::new();
    ids.map(|id| {
        let base = format!("test_{}", id.to_snake_case());
        let mut name = base.clone();
        let mut n = 2;
        while !used.insert(name.clone()) {
            name = format!("{}_{}", base, n);
            n += 1;
        }
        name
    })
    .collect()
}

/// Make text safe inside a triple-quoted Python docstring.
fn docstring(text: &str) -> String {
    text.replace('\\', "\\\\").replace("\"\"\"", "'''")
}

#[derive(Debug)]
pub(crate) struct PytestEmitter {
    tera: Tera,
    base_url: String,
}

impl PytestEmitter {
    pub(crate) fn new(base_url: impl Into<String>) -> Result<Self, EmitError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (MODULE_TEMPLATE, include_str!("templates/test_module.py.tera")),
            (INI_TEMPLATE, include_str!("templates/pytest.ini.tera")),
        ])?;
        tera.register_filter("pascal_case", filters::pascal_case);
        tera.register_filter("python_literal", filters::python_literal);

        Ok(Self {
            tera,
            base_url: base_url.into(),
        })
    }

    /// Render every module plus `pytest.ini` and `requirements.txt`. Empty
    /// results render nothing.
    pub(crate) fn render(
        &self,
        result: &GenerationResult,
        api_title: &str,
    ) -> Result<Vec<RenderedFile>, EmitError> {
        let components = result.components();
        let mut files = Vec::with_capacity(components.len() + 2);

        for component in &components {
            let names = function_names(result.for_component(component).map(|c| c.id.as_str()));
            let cases: Vec<CaseView> = result
                .for_component(component)
                .zip(names)
                .map(|(case, function)| CaseView::new(case, function))
                .collect();
            let augmented = result
                .for_component(component)
                .any(|c| c.origin == Origin::AiAugmented);

            let mut context = Context::new();
            context.insert("component", component.as_str());
            context.insert("api_title", api_title);
            context.insert("base_url", &self.base_url);
            context.insert(
                "origin_label",
                if augmented { "AI-enhanced" } else { "Rule-based" },
            );
            context.insert("cases", &cases);

            files.push(RenderedFile {
                path: format!("test_{}.py", component),
                content: self.tera.render(MODULE_TEMPLATE, &context)?,
            });
        }

        if files.is_empty() {
            return Ok(files);
        }

        let mut context = Context::new();
        context.insert(
            "categories",
            &result
                .categories()
                .iter()
                .map(|c| c.as_str())
                .collect::<Vec<_>>(),
        );
        context.insert(
            "priorities",
            &Priority::ALL.iter().map(|p| p.as_str()).collect::<Vec<_>>(),
        );
        context.insert(
            "components",
            &components.iter().map(|c| c.as_str()).collect::<Vec<_>>(),
        );
        files.push(RenderedFile {
            path: INI_TEMPLATE.to_string(),
            content: self.tera.render(INI_TEMPLATE, &context)?,
        });
        files.push(RenderedFile {
            path: REQUIREMENTS_FILE.to_string(),
            content: REQUIREMENTS.to_string(),
        });

        Ok(files)
    }
}

/// Write rendered files under `dir`, creating it if needed.
pub(crate) fn write_all(files: &[RenderedFile], dir: &Path) -> Result<Vec<PathBuf>, EmitError> {
    std::fs::create_dir_all(dir).map_err(|source| EmitError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    files
        .iter()
        .map(|file| {
            let path = dir.join(&file.path);
            std::fs::write(&path, &file.content).map_err(|source| EmitError::Io {
                path: path.clone(),
                source,
            })?;
            Ok(path)
        })
        .collect()
}

//! Per-sub-test generation rules.
//!
//! Each rule turns one operation into one or more [`Draft`]s. Drafts carry
//! everything rule-specific; identity fields (id, component, category,
//! priority, operation) are filled in by the caller.

use serde_json::{json, Value};

use super::values::{
    boundary_variants, example_value, is_constrained, nonexistent_value, wrong_type_value,
    BoundaryVariant, VariantValue,
};
use crate::catalog::{Operation, ParamLocation, ParamType, Parameter};
use crate::classifier::Component;
use crate::plan::PlanInsights;
use crate::policy::{Category, SubTestId, SubTestKind};
use crate::relationships::ApiRelationships;
use crate::testcase::{ParameterValue, TestData};

pub(crate) const AUTHORIZATION: &str = "Authorization";
pub(crate) const CONTENT_TYPE: &str = "Content-Type";
pub(crate) const VALID_TOKEN: &str = "Bearer <valid-token>";
const CORRUPTED_TOKEN: &str = "Bearer invalid.token.signature";
const LOW_PRIVILEGE_TOKEN: &str = "Bearer <low-privilege-token>";
const UNEXPECTED_FIELD: &str = "unexpected_field";
const MAX_PEERS: usize = 5;

/// Read-only data shared by every rule in a run.
#[derive(Debug)]
pub(crate) struct RuleContext<'a> {
    pub operations: &'a [Operation],
    pub components: &'a [Component],
    pub relationships: &'a ApiRelationships,
    pub insights: Option<&'a PlanInsights>,
}

/// Rule output before identity fields are attached.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Draft {
    pub title: String,
    pub description: String,
    pub steps: Vec<String>,
    pub expected_results: Vec<String>,
    pub expected_status: Vec<u16>,
    pub test_data: TestData,
    pub tags: Vec<&'static str>,
    pub automation_candidate: bool,
}

impl Draft {
    fn executable(title: String, description: String, status: u16, test_data: TestData) -> Self {
        Self {
            title,
            description,
            steps: Vec::new(),
            expected_results: Vec::new(),
            expected_status: vec![status],
            test_data,
            tags: Vec::new(),
            automation_candidate: true,
        }
    }

    fn intent(title: String, description: String, intent: Value) -> Self {
        let intent = match intent {
            Value::Object(map) => map.into_iter().collect(),
            _ => Default::default(),
        };
        Self {
            title,
            description,
            steps: Vec::new(),
            expected_results: Vec::new(),
            expected_status: Vec::new(),
            test_data: TestData {
                intent,
                ..Default::default()
            },
            tags: vec!["non-functional"],
            automation_candidate: false,
        }
    }

    fn steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps = steps.into_iter().map(Into::into).collect();
        self
    }

    fn results<I, S>(mut self, results: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expected_results = results.into_iter().map(Into::into).collect();
        self
    }

    fn tags(mut self, tags: &[&'static str]) -> Self {
        self.tags.extend_from_slice(tags);
        self
    }

    /// Append test-plan lines to the description; intent records also carry them.
    fn with_plan_notes(mut self, notes: &[String]) -> Self {
        self.description = format!("{}. Plan notes: {}", self.description, notes.join("; "));
        if self.expected_status.is_empty() {
            self.test_data
                .intent
                .insert("plan_notes".to_string(), json!(notes));
        }
        self
    }
}

/// All drafts for one (operation, category, sub-test). Never empty.
pub(crate) fn drafts(
    operation: &Operation,
    component: &Component,
    category: Category,
    sub_test: &SubTestId,
    ctx: &RuleContext<'_>,
) -> Vec<Draft> {
    let Some(kind) = sub_test.kind() else {
        return vec![generic(operation, category, sub_test)];
    };

    let drafts = match kind {
        SubTestKind::FuncHappy => vec![happy_path(operation)],
        SubTestKind::FuncNegative => negative(operation),
        SubTestKind::FuncValidation => boundaries(operation, Flavor::Validation),
        SubTestKind::FuncBoundary => boundaries(operation, Flavor::Boundary),
        SubTestKind::EdgeBoundary => boundaries(operation, Flavor::Edge),
        SubTestKind::SecAuth => authentication(operation),
        SubTestKind::SecAuthz => vec![authorization(operation)],
        SubTestKind::SecContent => vec![content_type(operation)],
        SubTestKind::SecEncryption => vec![encryption(operation)],
        SubTestKind::ErrNotFound => vec![not_found(operation)],
        SubTestKind::ErrInvalid => vec![malformed(operation)],
        SubTestKind::PerfLoad => vec![non_functional(operation, Nfr::Load)],
        SubTestKind::PerfStress => vec![non_functional(operation, Nfr::Stress)],
        SubTestKind::PerfSpike => vec![non_functional(operation, Nfr::Spike)],
        SubTestKind::ReliTimeout => vec![non_functional(operation, Nfr::Timeout)],
        SubTestKind::ReliRetry => vec![non_functional(operation, Nfr::Retry)],
        SubTestKind::ScaleConcurrent => vec![non_functional(operation, Nfr::Concurrent)],
        SubTestKind::CompatVersions => vec![non_functional(operation, Nfr::Versions)],
        SubTestKind::FuncWorkflow => vec![workflow(operation, component, Flow::Component, ctx)],
        SubTestKind::WorkflowE2e => vec![workflow(operation, component, Flow::EndToEnd, ctx)],
        SubTestKind::WorkflowSequence => vec![workflow(operation, component, Flow::Sequence, ctx)],
        SubTestKind::WorkflowCrud => vec![workflow(operation, component, Flow::Crud, ctx)],
        SubTestKind::WorkflowIntegration => {
            vec![workflow(operation, component, Flow::Integration, ctx)]
        }
    };

    match plan_notes(kind.category(), ctx) {
        Some(notes) if !notes.is_empty() => drafts
            .into_iter()
            .map(|draft| draft.with_plan_notes(notes))
            .collect(),
        _ => drafts,
    }
}

/// Plan lines relevant to a category's records.
fn plan_notes<'a>(category: Category, ctx: &RuleContext<'a>) -> Option<&'a [String]> {
    let insights = ctx.insights?;
    match category {
        Category::Security => Some(insights.security.as_slice()),
        Category::Performance | Category::Reliability | Category::Scalability => {
            Some(insights.performance.as_slice())
        }
        Category::Functional
        | Category::ErrorHandling
        | Category::EdgeCases
        | Category::Compatibility
        | Category::Workflow => None,
    }
}

// ---------------------------------------------------------------------------
// Request data
// ---------------------------------------------------------------------------

fn takes_body(operation: &Operation) -> bool {
    operation.has_request_body
        || operation
            .parameters
            .iter()
            .any(|p| p.location == ParamLocation::Body)
}

fn body_content_type(operation: &Operation) -> &str {
    operation
        .request_content_types
        .iter()
        .find(|t| t.contains("json"))
        .or_else(|| operation.request_content_types.first())
        .map(String::as_str)
        .unwrap_or("application/json")
}

/// Example values for every parameter except optional booleans, plus a valid
/// token and a body content type where one applies.
fn valid_data(operation: &Operation) -> TestData {
    let mut data = TestData {
        parameters: operation
            .parameters
            .iter()
            .filter(|p| p.required || p.param_type != ParamType::Boolean)
            .map(|p| ParameterValue {
                name: p.name.clone(),
                location: p.location,
                value: example_value(p),
            })
            .collect(),
        ..Default::default()
    };
    data.headers
        .insert(AUTHORIZATION.to_string(), VALID_TOKEN.to_string());
    if takes_body(operation) {
        data.headers.insert(
            CONTENT_TYPE.to_string(),
            body_content_type(operation).to_string(),
        );
    }
    data
}

fn set_value(data: &mut TestData, param: &Parameter, value: Value) {
    match data
        .parameters
        .iter_mut()
        .find(|p| p.name == param.name && p.location == param.location)
    {
        Some(existing) => existing.value = value,
        None => data.parameters.push(ParameterValue {
            name: param.name.clone(),
            location: param.location,
            value,
        }),
    }
}

fn omit(data: &mut TestData, param: &Parameter) {
    data.parameters
        .retain(|p| !(p.name == param.name && p.location == param.location));
    data.omitted.push(param.name.clone());
}

fn status_line(code: u16) -> String {
    format!("Status code {}", code)
}

fn send_step(operation: &Operation) -> String {
    format!("Send {} {}", operation.method, operation.path)
}

/// `default` when declared or when none of `alternatives` is; else the first
/// declared alternative.
fn declared_status(operation: &Operation, default: u16, alternatives: &[u16]) -> u16 {
    if operation.declares(default) {
        return default;
    }
    alternatives
        .iter()
        .copied()
        .find(|code| operation.declares(*code))
        .unwrap_or(default)
}

fn success_status(operation: &Operation) -> u16 {
    operation.success_status().unwrap_or(200)
}

// ---------------------------------------------------------------------------
// Functional
// ---------------------------------------------------------------------------

fn happy_path(operation: &Operation) -> Draft {
    let code = success_status(operation);
    let data = valid_data(operation);
    let prepare = match data.parameters.len() {
        0 => "Prepare the request (the operation takes no parameters)".to_string(),
        n => format!("Prepare valid values for {} parameter(s)", n),
    };

    Draft::executable(
        "Happy Path".to_string(),
        format!(
            "Verify a valid {} request to {} succeeds",
            operation.method, operation.path
        ),
        code,
        data,
    )
    .steps([
        prepare,
        "Attach a valid authorization header".to_string(),
        send_step(operation),
        format!("Verify the response status is {}", code),
        "Validate the response body against the declared schema".to_string(),
    ])
    .results([
        status_line(code),
        "Response body matches the declared schema".to_string(),
        "Content-Type header is present".to_string(),
    ])
    .tags(&["happy-path", "smoke", "regression"])
}

fn negative(operation: &Operation) -> Vec<Draft> {
    let code = operation.client_error_status();
    let required: Vec<&Parameter> = operation.required_parameters().collect();

    if required.is_empty() {
        return vec![match operation.parameters.first() {
            Some(param) => wrong_type(operation, param, "Negative", code),
            None => extra_field(operation, "Negative", code),
        }];
    }

    required
        .into_iter()
        .map(|param| {
            let mut data = valid_data(operation);
            omit(&mut data, param);
            Draft::executable(
                format!(
                    "Negative - missing required {} parameter '{}'",
                    param.location, param.name
                ),
                format!(
                    "Verify {} {} rejects a request without '{}'",
                    operation.method, operation.path, param.name
                ),
                code,
                data,
            )
            .steps([
                "Prepare valid values for all other parameters".to_string(),
                format!("Omit the {} parameter '{}'", param.location, param.name),
                send_step(operation),
                format!("Verify the response status is {}", code),
            ])
            .results([
                status_line(code),
                format!("Error message identifies '{}'", param.name),
                "No resource is created or modified".to_string(),
            ])
            .tags(&["negative", "missing-parameter"])
        })
        .collect()
}

fn wrong_type(operation: &Operation, param: &Parameter, label: &str, code: u16) -> Draft {
    let mut data = valid_data(operation);
    let value = wrong_type_value(param);
    set_value(&mut data, param, value.clone());

    Draft::executable(
        format!("{} - wrong type for '{}'", label, param.name),
        format!(
            "Verify {} {} rejects a {} value of the wrong type for '{}'",
            operation.method, operation.path, param.location, param.name
        ),
        code,
        data,
    )
    .steps([
        "Prepare valid values for all other parameters".to_string(),
        format!(
            "Set '{}' (declared {}) to {}",
            param.name, param.param_type, value
        ),
        send_step(operation),
        format!("Verify the response status is {}", code),
    ])
    .results([
        status_line(code),
        format!("Error message describes the invalid '{}'", param.name),
    ])
    .tags(&["negative", "wrong-type"])
}

fn extra_field(operation: &Operation, label: &str, code: u16) -> Draft {
    let location = if operation.method.carries_body() {
        ParamLocation::Body
    } else {
        ParamLocation::Query
    };
    let mut data = valid_data(operation);
    data.parameters.push(ParameterValue {
        name: UNEXPECTED_FIELD.to_string(),
        location,
        value: json!("unexpected"),
    });

    Draft::executable(
        format!("{} - unexpected {} field", label, location),
        format!(
            "Verify {} {} rejects an undeclared {} field",
            operation.method, operation.path, location
        ),
        code,
        data,
    )
    .steps([
        format!("Add an undeclared {} field '{}'", location, UNEXPECTED_FIELD),
        send_step(operation),
        format!("Verify the response status is {}", code),
    ])
    .results([
        status_line(code),
        "Undeclared input is rejected, not silently accepted".to_string(),
    ])
    .tags(&["negative", "unexpected-field"])
}

#[derive(Debug, Clone, Copy)]
enum Flavor {
    Validation,
    Boundary,
    Edge,
}

impl Flavor {
    fn label(self) -> &'static str {
        match self {
            Self::Validation => "Input validation",
            Self::Boundary => "Boundary value",
            Self::Edge => "Edge case",
        }
    }

    fn tag(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Boundary => "boundary",
            Self::Edge => "edge-case",
        }
    }
}

fn boundaries(operation: &Operation, flavor: Flavor) -> Vec<Draft> {
    let success = success_status(operation);
    let failure = operation.client_error_status();

    let drafts: Vec<Draft> = operation
        .parameters
        .iter()
        .filter(|p| is_constrained(p))
        .flat_map(|param| {
            boundary_variants(param).into_iter().map(move |variant| {
                let code = if variant.valid { success } else { failure };
                let value = match &variant.value {
                    VariantValue::Literal(value) => value.clone(),
                    VariantValue::Oversized { length } => {
                        return oversized(operation, param, &variant, *length, code, flavor);
                    }
                };
                let mut data = valid_data(operation);
                set_value(&mut data, param, value.clone());
                let verdict = if variant.valid { "accepts" } else { "rejects" };

                Draft::executable(
                    format!("{} - '{}' {}", flavor.label(), param.name, variant.label),
                    format!(
                        "Verify {} {} {} '{}' at {}",
                        operation.method, operation.path, verdict, param.name, variant.label
                    ),
                    code,
                    data,
                )
                .steps([
                    "Prepare valid values for all other parameters".to_string(),
                    format!("Set '{}' to {}", param.name, value),
                    send_step(operation),
                    format!("Verify the response status is {}", code),
                ])
                .results([
                    status_line(code),
                    if variant.valid {
                        "Value at the declared bound is accepted".to_string()
                    } else {
                        format!("Error message describes the constraint on '{}'", param.name)
                    },
                ])
                .tags(&[flavor.tag()])
            })
        })
        .collect();

    if !drafts.is_empty() {
        return drafts;
    }

    let draft = match operation.parameters.first() {
        Some(param) => wrong_type(operation, param, flavor.label(), failure),
        None => extra_field(operation, flavor.label(), failure),
    };
    vec![draft.tags(&[flavor.tag()])]
}

/// A length bound too large to send literally, recorded for an external harness.
fn oversized(
    operation: &Operation,
    param: &Parameter,
    variant: &BoundaryVariant,
    length: u64,
    code: u16,
    flavor: Flavor,
) -> Draft {
    let mut draft = Draft::intent(
        format!("{} - '{}' {}", flavor.label(), param.name, variant.label),
        format!(
            "Verify {} {} answers {} when '{}' is {} characters long",
            operation.method, operation.path, code, param.name, length
        ),
        json!({
            "parameter": param.name,
            "location": param.location,
            "fill": "a",
            "length": length,
            "expected_status": code,
        }),
    )
    .steps([
        "Prepare valid values for all other parameters".to_string(),
        format!("Generate a {}-character value for '{}'", length, param.name),
        send_step(operation),
        format!("Verify the response status is {}", code),
    ])
    .results([status_line(code)]);
    draft.tags = vec![flavor.tag()];
    draft
}

// ---------------------------------------------------------------------------
// Security
// ---------------------------------------------------------------------------

fn authentication(operation: &Operation) -> Vec<Draft> {
    let code = declared_status(operation, 401, &[403]);

    let mut stripped = valid_data(operation);
    stripped.headers.remove(AUTHORIZATION);
    stripped.omitted.push(AUTHORIZATION.to_string());

    let mut corrupted = valid_data(operation);
    corrupted
        .headers
        .insert(AUTHORIZATION.to_string(), CORRUPTED_TOKEN.to_string());

    vec![
        Draft::executable(
            "Authentication - missing token".to_string(),
            format!(
                "Verify {} {} rejects requests without credentials",
                operation.method, operation.path
            ),
            code,
            stripped,
        )
        .steps([
            "Prepare a valid request".to_string(),
            "Remove the Authorization header".to_string(),
            send_step(operation),
            format!("Verify the response status is {}", code),
        ])
        .results([
            status_line(code),
            "No protected data is returned".to_string(),
        ])
        .tags(&["security", "authentication"]),
        Draft::executable(
            "Authentication - corrupted token".to_string(),
            format!(
                "Verify {} {} rejects a malformed bearer token",
                operation.method, operation.path
            ),
            code,
            corrupted,
        )
        .steps([
            "Prepare a valid request".to_string(),
            "Replace the bearer token with a corrupted value".to_string(),
            send_step(operation),
            format!("Verify the response status is {}", code),
        ])
        .results([
            status_line(code),
            "Token validation failure is reported without leaking details".to_string(),
        ])
        .tags(&["security", "authentication"]),
    ]
}

fn authorization(operation: &Operation) -> Draft {
    let code = declared_status(operation, 403, &[404]);
    let mut data = valid_data(operation);
    data.headers
        .insert(AUTHORIZATION.to_string(), LOW_PRIVILEGE_TOKEN.to_string());

    Draft::executable(
        "Authorization - insufficient privilege".to_string(),
        format!(
            "Verify {} {} refuses a caller without the required role",
            operation.method, operation.path
        ),
        code,
        data,
    )
    .steps([
        "Authenticate as a user lacking the required permission".to_string(),
        send_step(operation),
        format!("Verify the response status is {}", code),
    ])
    .results([
        status_line(code),
        "Resource is neither returned nor modified".to_string(),
    ])
    .tags(&["security", "authorization"])
}

fn content_type(operation: &Operation) -> Draft {
    let code = declared_status(operation, 415, &[400]);
    let mut data = valid_data(operation);
    data.headers
        .insert(CONTENT_TYPE.to_string(), "application/xml".to_string());
    if takes_body(operation) {
        data.raw_body = Some("<request/>".to_string());
    }

    Draft::executable(
        "Content type - unsupported media type".to_string(),
        format!(
            "Verify {} {} rejects an unsupported Content-Type",
            operation.method, operation.path
        ),
        code,
        data,
    )
    .steps([
        "Set Content-Type to application/xml".to_string(),
        send_step(operation),
        format!("Verify the response status is {}", code),
    ])
    .results([
        status_line(code),
        "Payload is not processed".to_string(),
    ])
    .tags(&["security", "content-type"])
}

fn encryption(operation: &Operation) -> Draft {
    Draft::intent(
        "Transport encryption".to_string(),
        format!(
            "Verify {} {} is only served over TLS",
            operation.method, operation.path
        ),
        json!({
            "scheme": "http",
            "expect": "refused_or_redirected_to_https",
            "min_tls_version": "1.2",
            "required_headers": ["Strict-Transport-Security"],
        }),
    )
    .steps([
        format!("Send {} {} over plain HTTP", operation.method, operation.path),
        "Verify the request is refused or redirected to HTTPS".to_string(),
        "Verify the negotiated TLS version is 1.2 or higher".to_string(),
        "Verify HSTS and related security headers are present".to_string(),
    ])
    .results([
        "Only HTTPS connections are served",
        "TLS 1.2 or higher is negotiated",
        "Strict-Transport-Security header is present",
    ])
    .tags(&["security", "encryption", "tls"])
}

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

fn not_found(operation: &Operation) -> Draft {
    let code = 404;
    let mut data = valid_data(operation);
    let path_params: Vec<&Parameter> = operation.path_parameters().collect();

    let step = if path_params.is_empty() {
        data.intent
            .insert("path_suffix".to_string(), json!("/nonexistent-resource"));
        format!("Append '/nonexistent-resource' to {}", operation.path)
    } else {
        for param in &path_params {
            set_value(&mut data, param, nonexistent_value(param));
        }
        format!(
            "Use identifiers that do not exist for {}",
            path_params
                .iter()
                .map(|p| format!("'{}'", p.name))
                .collect::<Vec<_>>()
                .join(", ")
        )
    };

    Draft::executable(
        "Not found - nonexistent resource".to_string(),
        format!(
            "Verify {} {} reports a missing resource",
            operation.method, operation.path
        ),
        code,
        data,
    )
    .steps([
        step,
        send_step(operation),
        format!("Verify the response status is {}", code),
    ])
    .results([
        status_line(code),
        "Error body explains that the resource does not exist".to_string(),
    ])
    .tags(&["error-handling", "not-found"])
}

fn malformed(operation: &Operation) -> Draft {
    let code = 400;
    let mut data = valid_data(operation);

    let (title, step) = if takes_body(operation) {
        data.raw_body = Some("{\"malformed\": ".to_string());
        data.headers
            .insert(CONTENT_TYPE.to_string(), "application/json".to_string());
        (
            "Invalid request - malformed body",
            "Send a truncated JSON document as the body".to_string(),
        )
    } else {
        let name = operation
            .parameters
            .iter()
            .find(|p| p.location == ParamLocation::Query)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "filter".to_string());
        let param = Parameter {
            location: ParamLocation::Query,
            ..Parameter::path(name)
        };
        set_value(&mut data, &param, json!("%%malformed%%"));
        (
            "Invalid request - malformed query",
            format!("Set query parameter '{}' to an undecodable value", param.name),
        )
    };

    Draft::executable(
        title.to_string(),
        format!(
            "Verify {} {} rejects a malformed request",
            operation.method, operation.path
        ),
        code,
        data,
    )
    .steps([
        step,
        send_step(operation),
        format!("Verify the response status is {}", code),
    ])
    .results([
        status_line(code),
        "Parser error is reported without a stack trace".to_string(),
    ])
    .tags(&["error-handling", "malformed-input"])
}

// ---------------------------------------------------------------------------
// Non-functional intents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Nfr {
    Load,
    Stress,
    Spike,
    Timeout,
    Retry,
    Concurrent,
    Versions,
}

fn non_functional(operation: &Operation, check: Nfr) -> Draft {
    let target = format!("{} {}", operation.method, operation.path);

    match check {
        Nfr::Load => Draft::intent(
            "Performance - sustained load".to_string(),
            format!("Measure p95 latency of {} under 10 concurrent callers", target),
            json!({"concurrent_users": 10, "duration_secs": 300, "p95_ms": 5000}),
        )
        .steps([
            "Configure 10 concurrent users for 5 minutes".to_string(),
            format!("Send continuous requests to {}", target),
            "Record response times and error rates".to_string(),
        ])
        .results(["p95 latency below 5000 ms", "Error rate below 1%"])
        .tags(&["performance", "load"]),

        Nfr::Stress => Draft::intent(
            "Performance - stress".to_string(),
            format!("Find the breaking point of {}", target),
            json!({"start_users": 50, "max_users": 200, "ramp": "linear", "stop_when": "p95_degrades"}),
        )
        .steps([
            "Ramp load from 50 to 200 concurrent users".to_string(),
            "Continue until response times degrade significantly".to_string(),
            "Observe behavior at and after the breaking point".to_string(),
        ])
        .results(["Graceful degradation under overload", "Recovery once load drops"])
        .tags(&["performance", "stress"]),

        Nfr::Spike => Draft::intent(
            "Performance - spike".to_string(),
            format!("Verify {} survives sudden load spikes", target),
            json!({"baseline_users": 5, "spike_users": 100, "repetitions": 3}),
        )
        .steps([
            "Hold a baseline of 5 users".to_string(),
            "Spike to 100 concurrent users, then return to baseline".to_string(),
            "Repeat the spike three times".to_string(),
        ])
        .results(["No failures during spikes", "Latency returns to baseline"])
        .tags(&["performance", "spike"]),

        Nfr::Timeout => Draft::intent(
            "Reliability - timeout handling".to_string(),
            format!("Verify {} handles client timeouts cleanly", target),
            json!({"client_timeout_secs": 1, "check": ["no_hanging_connections", "clear_error"]}),
        )
        .steps([
            "Configure the client with a 1 second timeout".to_string(),
            format!("Send {}", target),
            "Verify timeout behavior and connection cleanup".to_string(),
        ])
        .results(["Timeout surfaces as a clear error", "No leaked connections"])
        .tags(&["reliability", "timeout"]),

        Nfr::Retry => Draft::intent(
            "Reliability - retry behavior".to_string(),
            format!("Verify retries against {} back off correctly", target),
            json!({"inject": "5xx", "max_attempts": 3, "backoff": "exponential"}),
        )
        .steps([
            "Inject transient 5xx failures".to_string(),
            format!("Send {} through a retrying client", target),
            "Verify attempt count and backoff timing".to_string(),
        ])
        .results(["Retries use exponential backoff", "Eventual success or a clear final failure"])
        .tags(&["reliability", "retry"]),

        Nfr::Concurrent => Draft::intent(
            "Scalability - concurrent users".to_string(),
            format!("Verify {} scales with concurrent callers", target),
            json!({"min_users": 50, "max_users": 500, "check": ["race_conditions", "data_consistency"]}),
        )
        .steps([
            "Run 50 to 500 concurrent users".to_string(),
            "Check for race conditions and inconsistent data".to_string(),
            "Track resource utilization".to_string(),
        ])
        .results(["Acceptable latency scaling", "No race conditions"])
        .tags(&["scalability", "concurrency"]),

        Nfr::Versions => Draft::intent(
            "Compatibility - API versions".to_string(),
            format!("Verify {} behaves consistently across API versions", target),
            json!({"versions": ["v1", "v2"], "negotiation": "header"}),
        )
        .steps([
            "Send the request with each supported version header".to_string(),
            "Compare response formats".to_string(),
            "Check deprecation warnings".to_string(),
        ])
        .results(["Backward compatibility maintained", "Deprecations are announced"])
        .tags(&["compatibility", "versioning"]),

    }
}

// ---------------------------------------------------------------------------
// Workflow intents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Flow {
    Component,
    EndToEnd,
    Sequence,
    Crud,
    Integration,
}

fn workflow(
    operation: &Operation,
    component: &Component,
    flow: Flow,
    ctx: &RuleContext<'_>,
) -> Draft {
    let target = format!("{} {}", operation.method, operation.path);
    let same_component: Vec<String> = ctx
        .operations
        .iter()
        .zip(ctx.components)
        .filter(|(op, c)| *c == component && op.signature() != target)
        .map(|(op, _)| op.signature())
        .collect();

    match flow {
        Flow::Component => Draft::intent(
            "Functional workflow".to_string(),
            format!("Verify {} within the {} component's flow", target, component),
            json!({"component": component.as_str(), "related_operations": same_component}),
        )
        .steps([
            "Prepare prerequisite resources through related operations".to_string(),
            format!("Send {}", target),
            "Verify the follow-up operations observe the change".to_string(),
        ])
        .results(["State is consistent across related operations"])
        .tags(&["workflow"]),

        Flow::EndToEnd => {
            let (context, flows) = match ctx.insights {
                Some(insights) => (
                    Value::String(insights.application_context.clone()),
                    json!(insights.workflows),
                ),
                None => (Value::Null, json!([])),
            };
            Draft::intent(
                "End-to-end business workflow".to_string(),
                format!("Verify {} within complete business workflows", target),
                json!({
                    "component": component.as_str(),
                    "application_context": context,
                    "business_workflows": flows,
                }),
            )
            .steps([
                format!("Identify the business workflow involving {}", operation.path),
                "Set up prerequisite data and state".to_string(),
                format!("Execute the workflow including {}", target),
                "Validate business rules, audit trail, and rollback on failure".to_string(),
            ])
            .results(["Workflow completes", "Business rules enforced"])
            .tags(&["workflow", "e2e"])
        }

        Flow::Sequence => {
            let sequence = ctx.relationships.sequence_for(operation);
            let partner = sequence
                .and_then(|s| s.partner_of(operation))
                .map(|r| format!("{} {}", r.method, r.path));
            let description = match &partner {
                Some(other) => format!("Verify {} in sequence with {}", target, other),
                None => format!("Verify {} in sequence with related operations", target),
            };
            Draft::intent(
                "API sequence".to_string(),
                description,
                json!({
                    "sequence_type": sequence.map(|s| s.sequence_type()),
                    "related_operation": partner,
                }),
            )
            .steps([
                "Call the prerequisite operation".to_string(),
                format!("Call {} using its output", target),
                "Verify data flows between the calls".to_string(),
            ])
            .results(["Sequence executes in order", "Errors propagate predictably"])
            .tags(&["workflow", "sequence"])
        }

        Flow::Crud => {
            let group = ctx.relationships.crud_group(component);
            let methods: Vec<&str> = group
                .map(|g| g.methods.iter().map(|m| m.as_str()).collect())
                .unwrap_or_default();
            Draft::intent(
                "CRUD lifecycle".to_string(),
                format!("Verify {} within the {} create/read/update/delete cycle", target, component),
                json!({"component": component.as_str(), "crud_methods": methods}),
            )
            .steps([
                "Create a resource".to_string(),
                format!("Exercise {} against it", target),
                "Update, then delete, verifying each step".to_string(),
            ])
            .results(["Resource lifecycle is consistent", "Referential integrity maintained"])
            .tags(&["workflow", "crud"])
        }

        Flow::Integration => {
            let peers: Vec<String> = ctx
                .operations
                .iter()
                .zip(ctx.components)
                .filter(|(op, c)| *c != component && op.path != operation.path)
                .take(MAX_PEERS)
                .map(|(op, _)| op.signature())
                .collect();
            Draft::intent(
                "Cross-component integration".to_string(),
                format!("Verify {} integrates with other components", target),
                json!({"component": component.as_str(), "peer_operations": peers}),
            )
            .steps([
                format!("Identify dependencies of {} on other components", operation.path),
                "Exercise the dependent operations".to_string(),
                "Verify data exchange and error isolation across components".to_string(),
            ])
            .results(["Components exchange data consistently", "Failures stay contained"])
            .tags(&["workflow", "integration"])
        }

    }
}

/// One descriptive record for a sub-test id without a dedicated rule.
fn generic(operation: &Operation, category: Category, sub_test: &SubTestId) -> Draft {
    Draft::intent(
        format!("{} check", sub_test),
        format!(
            "{} check '{}' for {} {}",
            category, sub_test, operation.method, operation.path
        ),
        json!({"category": category.as_str(), "sub_test": sub_test.as_str()}),
    )
    .steps([
        format!("Define the '{}' check for {} {}", sub_test, operation.method, operation.path),
        "Execute it with an external harness".to_string(),
    ])
    .results([format!("'{}' criteria are met", sub_test)])
}

//! The test-case record shared by every generation path.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::catalog::{OperationRef, ParamLocation};
use crate::classifier::Component;
use crate::policy::{Category, Priority, SubTestId};

/// How a test case's steps and expected results were produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    RuleBased,
    AiAugmented,
}

/// A concrete value sent for one parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterValue {
    pub name: String,
    pub location: ParamLocation,
    pub value: Value,
}

/// Request inputs and structured intent for a test case.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TestData {
    pub parameters: Vec<ParameterValue>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Parameters deliberately left out of the request.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub omitted: Vec<String>,
    /// Body text sent verbatim instead of the JSON-encoded body parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_body: Option<String>,
    /// Parameters for checks run by an external harness (load shape, timeouts, ...).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub intent: BTreeMap<String, Value>,
}

impl TestData {
    pub fn value_of(&self, name: &str) -> Option<&Value> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }

    /// Parameters sent in `location`, in order.
    pub fn located(&self, location: ParamLocation) -> impl Iterator<Item = &ParameterValue> {
        self.parameters
            .iter()
            .filter(move |p| p.location == location)
    }
}

/// One generated test case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestCase {
    pub id: String,
    pub title: String,
    pub description: String,
    pub component: Component,
    pub category: Category,
    pub sub_test: SubTestId,
    pub priority: Priority,
    pub operation: OperationRef,
    pub steps: Vec<String>,
    pub expected_results: Vec<String>,
    /// Acceptable response codes. Empty for intent records.
    pub expected_status: Vec<u16>,
    pub test_data: TestData,
    pub tags: Vec<String>,
    pub automation_candidate: bool,
    pub origin: Origin,
}

impl TestCase {
    /// Intent records describe checks with no status assertion.
    pub fn is_intent(&self) -> bool {
        self.expected_status.is_empty()
    }
}

//! Harness domain model

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One synthesised edge-case invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub function_name: String,
    /// Keyword arguments, JSON-encoded per parameter
    pub args: serde_json::Map<String, Value>,
    pub description: String,
}

/// Outcome of running one case in the sandbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub function_name: String,
    pub test_description: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub duration_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_value: Option<String>,
}

impl TestResult {
    pub fn failure(
        case: &TestCase,
        error_type: impl Into<String>,
        error_message: impl Into<String>,
        duration_ms: f64,
    ) -> Self {
        Self {
            function_name: case.function_name.clone(),
            test_description: case.description.clone(),
            passed: false,
            error_type: Some(error_type.into()),
            error_message: Some(error_message.into()),
            duration_ms,
            return_value: None,
        }
    }
}

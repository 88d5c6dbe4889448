//! Boundary input synthesis
//!
//! Inputs are keyed by parameter annotation; unannotated parameters get
//! the whole battery: None, empty/long/malicious strings, boundary
//! numbers, empty and null-filled collections.

use serde_json::{json, Value};

use blastshield_analysis::domain::FunctionDef;

use crate::domain::TestCase;

/// Strings that routinely break naive input handling.
const MALICIOUS_STRINGS: [(&str, &str); 3] = [
    ("<script>alert(1)</script>", "XSS payload"),
    ("'; DROP TABLE users; --", "SQL injection"),
    ("../../../etc/passwd", "path traversal"),
];

/// Generate edge cases for one function. Each case perturbs a single
/// parameter while the rest stay `None`.
pub fn generate_edge_cases(func: &FunctionDef) -> Vec<TestCase> {
    let params: Vec<&str> = func.parameter_names();

    if params.is_empty() {
        return vec![TestCase {
            function_name: func.name.clone(),
            args: serde_json::Map::new(),
            description: "call with no arguments".to_string(),
        }];
    }

    let mut cases = Vec::new();
    for param in &params {
        let annotation = func
            .parameters
            .iter()
            .find(|p| p.name == *param)
            .and_then(|p| p.annotation.as_deref())
            .unwrap_or("")
            .to_lowercase();

        for (value, description) in boundary_values(&annotation) {
            let mut args = serde_json::Map::new();
            for other in &params {
                args.insert((*other).to_string(), Value::Null);
            }
            args.insert((*param).to_string(), value);

            cases.push(TestCase {
                function_name: func.name.clone(),
                args,
                description: format!("{param}={description}"),
            });
        }
    }
    cases
}

fn boundary_values(annotation: &str) -> Vec<(Value, String)> {
    let unannotated = annotation.is_empty();
    let mut values: Vec<(Value, String)> = vec![(Value::Null, "None input".to_string())];

    if unannotated || annotation.contains("str") {
        values.push((json!(""), "empty string".to_string()));
        values.push((json!("a".repeat(10_000)), "very long string".to_string()));
        for (payload, label) in MALICIOUS_STRINGS {
            values.push((json!(payload), label.to_string()));
        }
    }

    if unannotated || annotation.contains("int") || annotation.contains("float") {
        values.push((json!(0), "zero".to_string()));
        values.push((json!(-1), "negative".to_string()));
        values.push((json!(2_i64.pow(31)), "oversized integer".to_string()));
    }

    if unannotated || annotation.contains("list") || annotation.contains("sequence") {
        values.push((json!([]), "empty collection".to_string()));
        values.push((json!(vec![Value::Null; 100]), "collection of nulls".to_string()));
    }

    if unannotated || annotation.contains("dict") || annotation.contains("mapping") {
        values.push((json!({}), "empty mapping".to_string()));
    }

    values
}

//! Subordinate process execution
//!
//! Each case runs `python3 -c <driver>` in its own process with a hard
//! wall-clock timeout; the driver script is passed on the command line so
//! nothing is written to disk. A timeout is reported as the test-failure
//! signal (likely hang or infinite loop), and any harness-internal error
//! is reported as a failed case rather than propagated.

use std::process::Stdio;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::domain::{TestCase, TestResult};

#[derive(Deserialize)]
struct DriverOutput {
    passed: bool,
    #[serde(default)]
    error_type: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    return_value: Option<String>,
}

/// Run a single case against the module source in a subordinate process.
pub async fn run_case(case: &TestCase, source: &str, timeout_s: u64) -> TestResult {
    let script = build_driver_script(case, source);
    let start = Instant::now();

    let child = Command::new("python3")
        .arg("-c")
        .arg(&script)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();

    let child = match child {
        Ok(child) => child,
        Err(e) => {
            return TestResult::failure(case, "SpawnError", e.to_string(), elapsed_ms(start));
        }
    };

    let output = match tokio::time::timeout(
        Duration::from_secs(timeout_s),
        child.wait_with_output(),
    )
    .await
    {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return TestResult::failure(case, "ProcessError", e.to_string(), elapsed_ms(start));
        }
        Err(_) => {
            debug!(function = %case.function_name, "Case timed out");
            return TestResult::failure(
                case,
                "TimeoutError",
                format!("test exceeded {timeout_s}s timeout"),
                elapsed_ms(start),
            );
        }
    };

    let duration_ms = elapsed_ms(start);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout.trim();

    if !output.status.success() || line.is_empty() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let message: String = stderr.chars().take(500).collect();
        return TestResult::failure(case, "ProcessError", message, duration_ms);
    }

    match serde_json::from_str::<DriverOutput>(line) {
        Ok(driver) => TestResult {
            function_name: case.function_name.clone(),
            test_description: case.description.clone(),
            passed: driver.passed,
            error_type: driver.error_type,
            error_message: driver.error_message,
            duration_ms,
            return_value: driver.return_value,
        },
        Err(_) => {
            let message: String = line.chars().take(500).collect();
            TestResult::failure(case, "OutputParseError", message, duration_ms)
        }
    }
}

/// Compose the Python driver: module source, then one invocation with the
/// case's keyword arguments, reporting a single JSON line on stdout.
fn build_driver_script(case: &TestCase, source: &str) -> String {
    let args_json = serde_json::to_string(&case.args).unwrap_or_else(|_| "{}".to_string());
    // The JSON is embedded as a Python string literal; escape accordingly.
    let escaped_args = args_json.replace('\\', "\\\\").replace('\'', "\\'");

    format!(
        "import json\nimport traceback\n\n{source}\n\ntry:\n    args = json.loads('{escaped_args}')\n    result = {function}(**args)\n    print(json.dumps({{\"passed\": True, \"return_value\": repr(result)}}))\nexcept Exception as e:\n    print(json.dumps({{\"passed\": False, \"error_type\": type(e).__name__, \"error_message\": str(e)[:500]}}))\n",
        function = case.function_name,
    )
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

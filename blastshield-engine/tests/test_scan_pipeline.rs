//! End-to-end scan pipeline tests
//!
//! Exercises the full engine through the host-facing operations:
//! deterministic detection, scoring, LLM merge and rejection, cache reuse,
//! background execution and the fallback guarantees.

mod common;

use blastshield_analysis::domain::{severity_bucket, SeverityBucket};
use blastshield_core::config::Config;
use blastshield_engine::domain::ScanStatus;
use blastshield_engine::{EngineError, ScanReport, ScanRequest};

use common::{deterministic_engine, deterministic_engine_with, engine_with_llm, request};

fn report_of(response: blastshield_engine::ScanResponse) -> ScanReport {
    response.report.expect("inline scan should carry a report")
}

// A bare eval of a parameter is one critical violation scoring exactly
// round(10 * 1.0 / 20 * 100) = 50, bucket Medium.
#[tokio::test]
async fn test_dangerous_eval_scenario() {
    let engine = deterministic_engine();
    let response = engine
        .scan(request(&[("a.py", "def run(x):\n    return eval(x)\n")]))
        .await
        .unwrap();

    let report = report_of(response);
    assert_eq!(report.issues.len(), 1);
    let issue = &report.issues[0];
    assert_eq!(issue.rule_id, "dangerous_eval");
    assert_eq!(issue.severity, "critical");
    assert_eq!(issue.line, 2);
    assert_eq!(report.risk_score, 50);
    assert_eq!(severity_bucket(report.risk_score), SeverityBucket::Medium);
    assert!(report.deterministic_only);
}

// An unawaited async call inside an async function, with the async
// boundary factor applied to the caller's contribution.
#[tokio::test]
async fn test_missing_await_scenario() {
    let engine = deterministic_engine();
    let response = engine
        .scan(request(&[(
            "a.py",
            "async def a():\n    pass\n\nasync def b():\n    a()\n",
        )]))
        .await
        .unwrap();

    let report = report_of(response);
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].rule_id, "missing_await");
    assert_eq!(report.issues[0].severity, "high");

    let contribution = &report.risk_breakdown.violation_contributions[0];
    assert_eq!(contribution.async_boundary_factor, 0.2);
}

// Two async writers of one module-level dict produce both the shared
// state finding and the race, each carrying the state mutation factor.
#[tokio::test]
async fn test_shared_state_race_scenario() {
    let engine = deterministic_engine();
    let response = engine
        .scan(request(&[(
            "state.py",
            "state = {}\n\nasync def writer_a():\n    state['a'] = 1\n\nasync def writer_b():\n    state['b'] = 2\n",
        )]))
        .await
        .unwrap();

    let report = report_of(response);
    let rule_ids: Vec<&str> = report.issues.iter().map(|i| i.rule_id.as_str()).collect();
    assert!(rule_ids.contains(&"race_condition"));
    assert!(rule_ids.contains(&"shared_mutable_state"));

    for contribution in &report.risk_breakdown.violation_contributions {
        assert_eq!(
            contribution.state_mutation_factor, 0.2,
            "state factor missing for {}",
            contribution.rule_id
        );
    }
}

// Clean code scores zero with an empty issue list.
#[tokio::test]
async fn test_clean_code_scenario() {
    let engine = deterministic_engine();
    let response = engine
        .scan(request(&[("clean.py", "def add(a, b):\n    return a + b\n")]))
        .await
        .unwrap();

    let report = report_of(response);
    assert!(report.issues.is_empty());
    assert_eq!(report.risk_score, 0);
    assert!(report.deterministic_only);
    assert!(!report.llm_used);
}

// A syntax error in one file is a low-severity marker; the other file
// is analysed normally and the scan succeeds.
#[tokio::test]
async fn test_parse_error_scenario() {
    let engine = deterministic_engine();
    let response = engine
        .scan(request(&[
            ("a.py", "def broken(:\n"),
            ("b.py", "def ok():\n    pass\n"),
        ]))
        .await
        .unwrap();

    let report = report_of(response);
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].rule_id, "parse_error");
    assert_eq!(report.issues[0].severity, "low");
    assert_eq!(report.issues[0].file, "a.py");
    assert_eq!(report.audit.files_scanned, 2);
}

// An LLM patch outside the violation envelope rejects the whole
// response; the report falls back and stays deterministic.
#[tokio::test]
async fn test_llm_hallucination_rejected() {
    let hallucinated = r#"{
        "explanations": [{
            "violation_rule_id": "dangerous_eval",
            "natural_language_explanation": "llm prose",
            "production_risk_summary": "llm risk",
            "patch_suggestions": [{
                "file": "a.py",
                "start_line": 50,
                "end_line": 52,
                "new_code": "something far away"
            }]
        }]
    }"#;
    let engine = engine_with_llm(hallucinated);
    let response = engine
        .scan(request(&[("a.py", "def run(x):\n    return eval(x)\n")]))
        .await
        .unwrap();

    let report = report_of(response);
    assert!(!report.llm_used);
    assert!(report.deterministic_only);
    // Fallback prose, not the rejected LLM prose.
    assert_ne!(report.issues[0].explanation, "llm prose");
    assert!(!report.issues[0].risk.is_empty());
}

// A valid LLM response merges in, and every issue stays anchored to
// the deterministic violation set with patches inside the envelope.
#[tokio::test]
async fn test_valid_llm_response_merged() {
    let valid = r#"{
        "explanations": [{
            "violation_rule_id": "dangerous_eval",
            "natural_language_explanation": "eval executes attacker input",
            "production_risk_summary": "remote code execution in production",
            "patch_suggestions": [{
                "file": "a.py",
                "start_line": 2,
                "end_line": 2,
                "new_code": "    return ast.literal_eval(x)"
            }]
        }],
        "blast_impact_summary": "one function"
    }"#;
    let engine = engine_with_llm(valid);
    let response = engine
        .scan(request(&[("a.py", "def run(x):\n    return eval(x)\n")]))
        .await
        .unwrap();

    let report = report_of(response);
    assert!(report.llm_used);
    assert!(!report.deterministic_only);
    assert_eq!(report.audit.llm_tokens_used, 150);

    let deterministic_rules: Vec<&str> = report
        .risk_breakdown
        .violation_contributions
        .iter()
        .map(|c| c.rule_id.as_str())
        .collect();
    for issue in &report.issues {
        assert!(deterministic_rules.contains(&issue.rule_id.as_str()));
        assert_eq!(issue.explanation, "eval executes attacker input");
        for patch in &issue.patches {
            assert_eq!(patch.file, "a.py");
            assert!(patch.start_line >= issue.line.saturating_sub(5));
            assert!(patch.end_line <= issue.line + 5);
        }
    }
}

// The refiner is gated off below the threshold when nothing is critical.
#[tokio::test]
async fn test_llm_gated_off_below_threshold() {
    // A single medium violation scores round(4/8*100) = 50 >= 30, so raise
    // the threshold to keep the gate closed.
    let mut config = Config::default();
    config.llm.risk_threshold = 80;

    let valid = r#"{"explanations": []}"#;
    let engine = {
        use std::sync::Arc;
        use std::time::Duration;
        let cache = Arc::new(blastshield_analysis::infrastructure::InMemoryFileCache::new(
            Duration::from_secs(300),
        ));
        let client = Arc::new(common::mocks::MockCompletionClient::new(valid));
        let refiner = Arc::new(blastshield_llm::application::RefineViolationsUseCase::new(
            client.clone(),
            config.llm.clone(),
            1,
        ));
        blastshield_engine::ScanEngine::new(
            config,
            cache,
            Some(refiner),
            Arc::new(blastshield_core::infrastructure::NoopAuditSink),
        )
    };

    // shared_mutable_state (medium) only; no critical violation.
    let response = engine
        .scan(request(&[(
            "state.py",
            "registry = {}\n\ndef put(k, v):\n    registry[k] = v\n",
        )]))
        .await
        .unwrap();

    let report = report_of(response);
    assert!(!report.llm_used);
    assert!(report.deterministic_only);
    assert!(report.issues.iter().any(|i| i.rule_id == "shared_mutable_state"));
}

// Input order does not change the deterministic report.
#[tokio::test]
async fn test_determinism_under_shuffle() {
    let files = [
        ("b.py", "def run(x):\n    return eval(x)\n"),
        ("a.py", "async def w():\n    pass\n\nasync def v():\n    w()\n"),
        ("c.py", "state = {}\n\nasync def m1():\n    state['x'] = 1\n\nasync def m2():\n    state['y'] = 2\n"),
    ];
    let mut shuffled = files;
    shuffled.reverse();

    let first = report_of(deterministic_engine().scan(request(&files)).await.unwrap());
    let second = report_of(deterministic_engine().scan(request(&shuffled)).await.unwrap());

    assert_eq!(
        serde_json::to_string(&first.issues).unwrap(),
        serde_json::to_string(&second.issues).unwrap()
    );
    assert_eq!(first.risk_score, second.risk_score);
    assert_eq!(
        serde_json::to_string(&first.risk_breakdown.violation_contributions).unwrap(),
        serde_json::to_string(&second.risk_breakdown.violation_contributions).unwrap()
    );
}

// A repeated scan of identical content reuses cached per-file results
// and produces byte-identical issues.
#[tokio::test]
async fn test_cache_reuse_is_transparent() {
    let engine = deterministic_engine();
    let req = request(&[("a.py", "def run(x):\n    return eval(x)\n")]);

    let first = report_of(engine.scan(req.clone()).await.unwrap());
    let second = report_of(engine.scan(req).await.unwrap());

    assert_eq!(
        serde_json::to_string(&first.issues).unwrap(),
        serde_json::to_string(&second.issues).unwrap()
    );
    assert_eq!(first.risk_score, second.risk_score);
}

// The fallback path yields non-empty prose for every violation kind.
#[tokio::test]
async fn test_fallback_totality() {
    let engine = deterministic_engine();
    let response = engine
        .scan(request(&[
            ("a.py", "def run(x):\n    return eval(x)\n"),
            ("b.py", "def broken(:\n"),
            ("c.ts", "const x = 1;\n"),
            ("d.py", "async def h():\n    time.sleep(1)\n"),
        ]))
        .await
        .unwrap();

    let report = report_of(response);
    assert!(report.issues.len() >= 4);
    for issue in &report.issues {
        assert!(!issue.explanation.is_empty(), "empty explanation for {}", issue.rule_id);
        assert!(!issue.risk.is_empty(), "empty risk for {}", issue.rule_id);
    }
}

#[tokio::test]
async fn test_empty_file_set_is_request_error() {
    let engine = deterministic_engine();
    let err = engine.scan(ScanRequest::default()).await.unwrap_err();
    assert!(matches!(err, EngineError::EmptyFileSet));
    assert_eq!(err.code(), "empty_file_set");
}

#[tokio::test]
async fn test_legacy_combined_field() {
    let engine = deterministic_engine();
    let response = engine
        .scan(ScanRequest {
            files: vec![],
            combined: Some("def run(x):\n    return eval(x)\n".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    let report = report_of(response);
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].file, "combined.py");
}

#[tokio::test]
async fn test_oversize_file_is_skipped_not_fatal() {
    let mut config = Config::default();
    config.scan.max_file_size_bytes = 64;
    let engine = deterministic_engine_with(config);

    let big = format!("def ok():\n    pass\n# {}\n", "x".repeat(200));
    let response = engine
        .scan(request(&[
            ("big.py", big.as_str()),
            ("small.py", "def run(x):\n    return eval(x)\n"),
        ]))
        .await
        .unwrap();

    let report = report_of(response);
    let skipped = report
        .issues
        .iter()
        .find(|i| i.rule_id == "file_skipped")
        .expect("skip marker");
    assert_eq!(skipped.file, "big.py");
    assert_eq!(skipped.severity, "low");
    assert!(report.issues.iter().any(|i| i.rule_id == "dangerous_eval"));
}

#[tokio::test]
async fn test_pr_scan_summary_framing() {
    let engine = deterministic_engine();
    let response = engine
        .pr_scan(request(&[("a.py", "def run(x):\n    return eval(x)\n")]))
        .await
        .unwrap();

    let report = report_of(response);
    assert!(report.summary.starts_with("PR Analysis:"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_background_scan_lifecycle() {
    let engine = deterministic_engine();

    // Above the default threshold of 10 files.
    let sources: Vec<(String, String)> = (0..12)
        .map(|i| (format!("f{i}.py"), format!("def f{i}():\n    return {i}\n")))
        .collect();
    let refs: Vec<(&str, &str)> = sources
        .iter()
        .map(|(p, c)| (p.as_str(), c.as_str()))
        .collect();

    let response = engine.scan(request(&refs)).await.unwrap();
    assert_eq!(response.message, "scan_queued");
    assert!(response.report.is_none());
    let scan_id = response.scan_id.clone();

    // Poll until the background task completes.
    let mut status = None;
    for _ in 0..100 {
        let current = engine.status(&scan_id).await.expect("known scan id");
        if current.status.is_terminal() {
            status = Some(current);
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    let status = status.expect("scan should terminate");
    assert_eq!(status.status, ScanStatus::Complete);
    assert_eq!(status.progress, 1.0);
    let report = status.report.expect("completed scan carries report");
    assert!(report.issues.is_empty());
    assert_eq!(report.audit.files_scanned, 12);
}

#[tokio::test]
async fn test_status_unknown_scan() {
    let engine = deterministic_engine();
    assert!(engine.status("nope").await.is_none());
}

#[tokio::test]
async fn test_health() {
    let engine = deterministic_engine();
    let health = engine.health();
    assert_eq!(health.status, "ok");
    assert_eq!(health.engine, "blastshield-engine");
    assert!(!health.model.is_empty());
    assert!(!health.version.is_empty());
}

// The score is zero exactly when the issue list is empty.
#[tokio::test]
async fn test_score_zero_iff_no_issues() {
    let engine = deterministic_engine();

    let clean = report_of(
        engine
            .scan(request(&[("a.py", "def id(x):\n    return x\n")]))
            .await
            .unwrap(),
    );
    assert!(clean.issues.is_empty());
    assert_eq!(clean.risk_score, 0);

    let dirty = report_of(
        engine
            .scan(request(&[("a.py", "def run(x):\n    return eval(x)\n")]))
            .await
            .unwrap(),
    );
    assert!(!dirty.issues.is_empty());
    assert!(dirty.risk_score > 0);
}

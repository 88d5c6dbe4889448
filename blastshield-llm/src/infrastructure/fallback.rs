//! Deterministic fallback templates
//!
//! One risk narrative and one patch hint per rule id, used whenever the
//! refiner is gated off, times out, errors, or is rejected by the
//! validator. The default template guarantees the fallback path is total
//! over every rule id the engine can emit.

/// A pre-written explanation template for one rule.
#[derive(Debug, Clone, Copy)]
pub struct FallbackTemplate {
    pub risk: &'static str,
    pub patch_hint: &'static str,
}

const DEFAULT_TEMPLATE: FallbackTemplate = FallbackTemplate {
    risk: "This violation may cause failures in production environments.",
    patch_hint: "Review and fix the flagged code.",
};

/// Template for a rule id. Unknown rules get the default.
pub fn template_for(rule_id: &str) -> FallbackTemplate {
    match rule_id {
        "race_condition" => FallbackTemplate {
            risk: "Concurrent async functions writing to the same shared mutable state will \
                   corrupt data non-deterministically, producing intermittent bugs that are \
                   impossible to reproduce locally.",
            patch_hint: "Use asyncio.Lock() to synchronize access, or refactor to pass state \
                         via arguments.",
        },
        "missing_await" => FallbackTemplate {
            risk: "The coroutine is created but never executed. The operation (database write, \
                   API call, file operation) silently does not happen, causing data loss.",
            patch_hint: "Add 'await' before the async function call.",
        },
        "dangerous_eval" => FallbackTemplate {
            risk: "eval()/exec() with dynamic input enables arbitrary code execution. Anyone \
                   controlling the input can run any Python code in the process, including \
                   reading secrets or modifying data.",
            patch_hint: "Replace eval/exec with ast.literal_eval() for data parsing, or use a \
                         proper parser.",
        },
        "unsanitized_io" => FallbackTemplate {
            risk: "User-controlled input flows into file or system operations without \
                   sanitization. An attacker can traverse paths, overwrite critical files, or \
                   execute system commands.",
            patch_hint: "Validate and sanitize input: use os.path.basename(), restrict to \
                         allowed paths, and never pass raw input to system operations.",
        },
        "shared_mutable_state" => FallbackTemplate {
            risk: "Module-level mutable state couples functions implicitly. Under concurrency \
                   it causes data races; in tests it leaks state between cases and makes them \
                   flaky.",
            patch_hint: "Encapsulate state in a class, pass it as function arguments, or use \
                         thread-local storage.",
        },
        "missing_exception_boundary" => FallbackTemplate {
            risk: "Unhandled exceptions in entry points return raw stack traces to clients \
                   (information leakage) or kill background workers without cleanup.",
            patch_hint: "Wrap the handler body in try/except, log the error, and return a \
                         structured error response.",
        },
        "retry_without_backoff" => FallbackTemplate {
            risk: "Retry loops without growing backoff hammer the target service at full speed \
                   on failure, exhausting rate limits and amplifying outages.",
            patch_hint: "Add exponential backoff between retries, e.g. time.sleep(2 ** attempt) \
                         with a bounded retry count.",
        },
        "blocking_io_in_async" => FallbackTemplate {
            risk: "Blocking I/O inside async functions stalls the event loop. Every concurrent \
                   request and background task freezes until the call completes.",
            patch_hint: "Use async equivalents: asyncio.sleep(), httpx.AsyncClient, \
                         aiofiles.open(), asyncio.create_subprocess_exec().",
        },
        "parse_error" => FallbackTemplate {
            risk: "The file could not be parsed, so none of its code was analysed. Defects in \
                   this file are invisible to the scan.",
            patch_hint: "Fix the syntax error and re-run the scan.",
        },
        "unsupported_language" => FallbackTemplate {
            risk: "The file is written in a language the engine does not analyse, so its \
                   defects are invisible to this scan.",
            patch_hint: "No action needed; only Python sources are analysed today.",
        },
        "file_skipped" => FallbackTemplate {
            risk: "The file exceeded the size limit and was excluded, so its defects are \
                   invisible to this scan.",
            patch_hint: "Split the file or raise max_file_size_bytes if it is genuinely source.",
        },
        "rule_error" => FallbackTemplate {
            risk: "An analysis rule failed internally on this input; its findings for the \
                   affected file may be incomplete.",
            patch_hint: "No action needed in the scanned code.",
        },
        _ => DEFAULT_TEMPLATE,
    }
}

//! Configuration management
//!
//! Every option has a default so the engine runs out of the box;
//! `Config::from_env` overlays the environment variable surface documented
//! in the README. Absence of LLM credentials forces deterministic-only
//! operation rather than failing startup.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub scan: ScanConfig,
    pub llm: LlmConfig,
    pub harness: HarnessConfig,
    pub cache: CacheConfig,
    pub audit: AuditConfig,
    pub analysis: AnalysisConfig,
}

/// Server configuration (transport pass-through; the engine itself never
/// binds a socket)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins. Use ["*"] to allow any (development only).
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
            cors_origins: vec!["*".to_string()],
        }
    }
}

/// Scan intake limits and background execution switch-over
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Per-file byte cap; oversize files are skipped with a non-fatal marker
    pub max_file_size_bytes: usize,
    /// File counts above this run off the request path; caller polls by scan id
    pub background_file_threshold: usize,
    /// Bounded lifetime of background scan records
    pub scan_result_ttl_s: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: 500_000,
            background_file_threshold: 10,
            scan_result_ttl_s: 1800,
        }
    }
}

/// LLM gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider API key. `None` disables the refiner entirely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: String,
    /// Bounds a single completion call
    pub timeout_s: u64,
    /// Retries with exponential backoff 1s -> 2s -> 4s
    pub max_retries: u32,
    pub temperature: f64,
    /// Per-scan token budget; exhaustion suppresses further calls
    pub max_tokens_per_scan: u32,
    /// Minimum deterministic score before the refiner is invoked
    pub risk_threshold: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "moonshotai/kimi-k2-instruct-0905".to_string(),
            timeout_s: 30,
            max_retries: 3,
            temperature: 0.1,
            max_tokens_per_scan: 4096,
            risk_threshold: 30,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_s)
    }
}

/// Edge-case test harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Feature flag: generated inputs are executed in subordinate processes
    pub enabled: bool,
    /// Per-test wall clock in seconds
    pub timeout_s: u64,
    /// Functions with more parameters than this are not exercised
    pub max_params: usize,
    /// Network-touching modules are skipped unless explicitly opted in
    pub allow_network: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_s: 5,
            max_params: 6,
            allow_network: false,
        }
    }
}

/// Per-file analysis cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_s: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_s: 3600 }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_s)
    }
}

/// Audit sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Path of the append-only JSON-lines audit log
    pub log_path: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            log_path: "audit.jsonl".to_string(),
        }
    }
}

/// Static analysis tuning: graph bounds and the allow-lists the rules
/// consume. Keeping these in configuration lets deployments teach the
/// engine new sinks and sleep equivalents without a rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Bound on blast-radius BFS depth; cycles are permitted but revisits skipped
    pub max_graph_depth: usize,
    /// Hops of call-graph context serialized around each violation for the refiner
    pub subgraph_hops: usize,
    /// Calls considered dangerous when reached by unsanitised input
    pub taint_sinks: Vec<String>,
    /// Calls that neutralise tainted input before a sink
    pub sanitizers: Vec<String>,
    /// Network/API calls checked by the retry rule
    pub network_sinks: Vec<String>,
    /// Sleep equivalents recognised inside retry loops
    pub sleep_equivalents: Vec<String>,
    /// Blocking calls forbidden inside async functions, with fix suggestions
    pub blocking_sinks: Vec<(String, String)>,
    /// Container methods treated as writes to their receiver
    pub mutating_methods: Vec<String>,
    /// Decorators that mark a function as an externally reachable entry point
    pub entry_decorators: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_graph_depth: 10,
            subgraph_hops: 1,
            taint_sinks: [
                "eval",
                "exec",
                "compile",
                "open",
                "os.open",
                "os.system",
                "os.popen",
                "os.remove",
                "os.unlink",
                "shutil.rmtree",
                "subprocess.run",
                "subprocess.call",
                "subprocess.Popen",
                "subprocess.check_output",
                "cursor.execute",
                "cursor.executemany",
                "conn.execute",
                "db.execute",
            ]
            .map(str::to_string)
            .to_vec(),
            sanitizers: [
                "shlex.quote",
                "os.path.basename",
                "os.path.normpath",
                "ast.literal_eval",
                "int",
                "float",
                "html.escape",
                "re.escape",
            ]
            .map(str::to_string)
            .to_vec(),
            network_sinks: [
                "requests.get",
                "requests.post",
                "requests.put",
                "requests.delete",
                "requests.patch",
                "requests.head",
                "requests.request",
                "httpx.get",
                "httpx.post",
                "httpx.request",
                "urllib.request.urlopen",
                "client.chat.completions.create",
            ]
            .map(str::to_string)
            .to_vec(),
            sleep_equivalents: ["time.sleep", "asyncio.sleep", "sleep"]
                .map(str::to_string)
                .to_vec(),
            blocking_sinks: [
                ("time.sleep", "use asyncio.sleep()"),
                ("requests.get", "use httpx.AsyncClient or aiohttp"),
                ("requests.post", "use httpx.AsyncClient or aiohttp"),
                ("requests.put", "use httpx.AsyncClient or aiohttp"),
                ("requests.delete", "use httpx.AsyncClient or aiohttp"),
                ("requests.request", "use httpx.AsyncClient or aiohttp"),
                ("urllib.request.urlopen", "use httpx.AsyncClient or aiohttp"),
                ("open", "use aiofiles.open()"),
                ("input", "use aioconsole.ainput()"),
                ("os.system", "use asyncio.create_subprocess_shell()"),
                ("subprocess.run", "use asyncio.create_subprocess_exec()"),
                ("subprocess.call", "use asyncio.create_subprocess_exec()"),
                ("subprocess.check_output", "use asyncio.create_subprocess_exec()"),
                ("psycopg2.connect", "use asyncpg"),
                ("sqlite3.connect", "use aiosqlite"),
            ]
            .map(|(c, s)| (c.to_string(), s.to_string()))
            .to_vec(),
            mutating_methods: [
                "append", "extend", "insert", "remove", "pop", "clear", "update", "setdefault",
                "add", "discard", "popitem",
            ]
            .map(str::to_string)
            .to_vec(),
            entry_decorators: [
                "app.route",
                "app.get",
                "app.post",
                "app.put",
                "app.delete",
                "app.patch",
                "router.get",
                "router.post",
                "router.put",
                "router.delete",
                "router.patch",
                "route",
                "get",
                "post",
                "put",
                "delete",
                "patch",
            ]
            .map(str::to_string)
            .to_vec(),
        }
    }
}

impl Config {
    /// Load configuration from the environment on top of defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("HOST") {
            config.server.host = host;
        }
        if let Some(port) = parse_var("PORT") {
            config.server.port = port;
        }
        if let Ok(origins) = std::env::var("CORS_ORIGINS") {
            config.server.cors_origins =
                origins.split(',').map(|o| o.trim().to_string()).collect();
        }

        if let Ok(key) = std::env::var("GROQ_API_KEY") {
            if !key.is_empty() {
                config.llm.api_key = Some(key);
            }
        }
        if let Ok(model) = std::env::var("BLASTSHIELD_MODEL") {
            config.llm.model = model;
        }
        if let Some(v) = parse_var("LLM_TIMEOUT_S") {
            config.llm.timeout_s = v;
        }
        if let Some(v) = parse_var("LLM_MAX_RETRIES") {
            config.llm.max_retries = v;
        }
        if let Some(v) = parse_var("LLM_TEMPERATURE") {
            config.llm.temperature = v;
        }
        if let Some(v) = parse_var("LLM_MAX_TOKENS_PER_SCAN") {
            config.llm.max_tokens_per_scan = v;
        }
        if let Some(v) = parse_var("LLM_RISK_THRESHOLD") {
            config.llm.risk_threshold = v;
        }

        if let Some(v) = parse_var("MAX_FILE_SIZE_BYTES") {
            config.scan.max_file_size_bytes = v;
        }
        if let Some(v) = parse_var("BACKGROUND_FILE_THRESHOLD") {
            config.scan.background_file_threshold = v;
        }
        if let Some(v) = parse_var("SCAN_RESULT_TTL_S") {
            config.scan.scan_result_ttl_s = v;
        }

        if let Some(v) = parse_var("TEST_HARNESS_ENABLED") {
            config.harness.enabled = v;
        }
        if let Some(v) = parse_var("TEST_HARNESS_TIMEOUT_S") {
            config.harness.timeout_s = v;
        }

        if let Some(v) = parse_var("CACHE_TTL_S") {
            config.cache.ttl_s = v;
        }
        if let Ok(path) = std::env::var("AUDIT_LOG_PATH") {
            config.audit.log_path = path;
        }

        config
    }

    /// Whether LLM refinement can be attempted at all.
    pub fn llm_available(&self) -> bool {
        self.llm.api_key.is_some()
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.scan.max_file_size_bytes, 500_000);
        assert_eq!(config.scan.background_file_threshold, 10);
        assert_eq!(config.llm.risk_threshold, 30);
        assert_eq!(config.cache.ttl_s, 3600);
        assert!(!config.llm_available());
    }

    #[test]
    fn test_analysis_lists_nonempty() {
        let analysis = AnalysisConfig::default();
        assert!(analysis.taint_sinks.iter().any(|s| s == "eval"));
        assert!(analysis.sleep_equivalents.iter().any(|s| s == "asyncio.sleep"));
        assert!(analysis.blocking_sinks.iter().any(|(c, _)| c == "time.sleep"));
        assert!(analysis.max_graph_depth > 0);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let restored: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.scan.max_file_size_bytes, config.scan.max_file_size_bytes);
        assert_eq!(restored.llm.model, config.llm.model);
    }
}

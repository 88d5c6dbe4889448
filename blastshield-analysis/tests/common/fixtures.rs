//! Test fixtures: small Python projects with known defects

/// Service module with an eval of request input reachable from a route.
pub fn vulnerable_service() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "app/handlers.py",
            "from app.engine import run_query\n\n@app.post\nasync def query(request):\n    return run_query(request)\n",
        ),
        (
            "app/engine.py",
            "def run_query(expr):\n    return eval(expr)\n",
        ),
    ]
}

/// Module with shared state written from concurrent async workers.
pub fn racy_worker_pool() -> &'static str {
    "results = {}\n\nasync def worker_one(job):\n    results[job] = 'one'\n\nasync def worker_two(job):\n    results[job] = 'two'\n\ndef report():\n    return len(results)\n"
}

/// Clean utility module that should produce no findings.
pub fn clean_utils() -> &'static str {
    "def add(a, b):\n    return a + b\n\ndef clamp(value, low, high):\n    return max(low, min(value, high))\n"
}

use std::path::PathBuf;
use std::time::Duration;

/// Process-wide settings, read-only after startup. Every component takes a
/// clone at construction so the pipeline stays reentrant and tests can
/// substitute deterministic values (zero delays, a local search endpoint).
#[derive(Debug, Clone)]
pub struct Config {
    /// Per-attempt HTTP timeout.
    pub timeout: Duration,
    /// Rotating user-agent pool.
    pub user_agents: Vec<String>,
    /// Jitter range slept before every fetch attempt, in milliseconds.
    pub fetch_delay_ms: (u64, u64),
    /// Pacing range slept between batch items, in milliseconds.
    pub batch_delay_ms: (u64, u64),
    /// Fixed pause between content extractions in a search session.
    pub extraction_pacing_ms: u64,
    /// Hard cap on content extractions per search session.
    pub max_extractions: usize,
    /// Engine-side cap on the requested result count.
    pub engine_result_cap: usize,
    /// Minimum title length for a parsed result to count.
    pub min_title_len: usize,
    /// Stricter title threshold used by the backup anchor scan.
    pub backup_min_title_len: usize,
    /// The search engine's own domains, never returned as results.
    pub blocked_domains: Vec<String>,
    /// HTML results endpoint of the search engine.
    pub search_endpoint: String,
    /// Storage directory for the dataset utility.
    pub datasets_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            timeout: Duration::from_secs(30),
            user_agents: vec![
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:121.0) Gecko/20100101 Firefox/121.0".to_string(),
            ],
            fetch_delay_ms: (500, 2000),
            batch_delay_ms: (1000, 3000),
            extraction_pacing_ms: 1000,
            max_extractions: 3,
            engine_result_cap: 50,
            min_title_len: 3,
            backup_min_title_len: 5,
            blocked_domains: vec![
                "bing.com".to_string(),
                "microsoft.com".to_string(),
                "msn.com".to_string(),
            ],
            search_endpoint: "https://www.bing.com/search".to_string(),
            datasets_dir: PathBuf::from("datasets"),
        }
    }
}

pub mod batch;
pub mod config;
pub mod delay_manager;
pub mod extractor;
pub mod fetcher;
pub mod logger;
pub mod search;

// Exporting types for convenience
pub use batch::{Orchestrator, SearchSession};
pub use config::Config;
pub use extractor::{ContentExtractor, ExtractedPage, PageStatus};
pub use fetcher::{FetchError, Fetcher};
pub use search::{SearchEngine, SearchResult};

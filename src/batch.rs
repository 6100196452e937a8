use serde::Serialize;
use log::info;

use crate::config::Config;
use crate::delay_manager;
use crate::extractor::{ContentExtractor, ExtractedPage, PageMeta, PageStatus};
use crate::search::{SearchEngine, SearchResult};

/// Extracted content attached to a search session is capped at this many
/// characters per page.
const CONTENT_PREVIEW_CHARS: usize = 5000;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExtractedContent {
    pub index: usize,
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub content: String,
    pub meta: PageMeta,
    pub status: PageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SearchSummary {
    pub search_results_count: usize,
    pub content_extractions_attempted: usize,
    pub content_extractions_successful: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchSession {
    pub query: String,
    pub results: Vec<SearchResult>,
    pub extracted_content: Vec<ExtractedContent>,
    pub summary: SearchSummary,
}

/// Sequences fetch/extract operations with inter-request pacing and
/// per-item failure isolation. Also the single façade the tool host calls
/// for one-off extraction and search.
pub struct Orchestrator {
    extractor: ContentExtractor,
    search: SearchEngine,
    config: Config,
}

impl Orchestrator {
    pub fn new(config: Config) -> Self {
        Orchestrator {
            extractor: ContentExtractor::new(config.clone()),
            search: SearchEngine::new(config.clone()),
            config,
        }
    }

    pub fn extract(&self, url: &str, extract_text: bool) -> ExtractedPage {
        self.extractor.extract(url, extract_text)
    }

    pub fn search(&self, query: &str, num_results: usize) -> Vec<SearchResult> {
        self.search.search(query, num_results)
    }

    /// Extract every URL in order. One failed URL never aborts the batch;
    /// the output always lines up 1:1 with the input.
    pub fn batch_extract(&self, urls: &[String], extract_text: bool) -> Vec<ExtractedPage> {
        let mut pages = Vec::with_capacity(urls.len());
        for (i, url) in urls.iter().enumerate() {
            if i > 0 {
                let (min_ms, max_ms) = self.config.batch_delay_ms;
                delay_manager::random_delay_ms(min_ms, max_ms);
            }
            info!("Batch item {} / {}: {}", i + 1, urls.len(), url);
            pages.push(self.extractor.extract(url, extract_text));
        }
        pages
    }

    /// Search, then extract content from the top results, at most
    /// `max_extractions` of them regardless of how many results came back.
    pub fn search_and_extract(
        &self,
        query: &str,
        num_results: usize,
        extract_content: bool,
    ) -> SearchSession {
        let results = self.search.search(query, num_results);

        let usable = results.first().map_or(false, |first| !first.is_error());
        let extracted_content = if extract_content && usable {
            extract_top_results(
                &results,
                self.config.max_extractions,
                self.config.extraction_pacing_ms,
                |url| self.extractor.extract(url, true),
            )
        } else {
            Vec::new()
        };

        let summary = SearchSummary {
            search_results_count: results.iter().filter(|r| !r.is_error()).count(),
            content_extractions_attempted: extracted_content.len(),
            content_extractions_successful: extracted_content
                .iter()
                .filter(|e| e.status == PageStatus::Success)
                .count(),
        };

        SearchSession {
            query: query.to_string(),
            results,
            extracted_content,
            summary,
        }
    }
}

/// Walk the top results, extracting at most `cap` of them with a fixed
/// pacing delay between extractions. The extraction callback is injected
/// so the cap and isolation can be exercised without the network.
fn extract_top_results<F>(
    results: &[SearchResult],
    cap: usize,
    pacing_ms: u64,
    mut extract: F,
) -> Vec<ExtractedContent>
where
    F: FnMut(&str) -> ExtractedPage,
{
    let mut extracted = Vec::new();

    for (index, result) in results.iter().enumerate() {
        if extracted.len() >= cap {
            break;
        }
        if result.url.is_empty() {
            continue;
        }
        if !extracted.is_empty() {
            delay_manager::fixed_delay_ms(pacing_ms);
        }

        let page = extract(&result.url);
        let entry = if page.is_success() {
            ExtractedContent {
                index,
                url: result.url.clone(),
                title: result.title.clone(),
                snippet: result.snippet.clone(),
                content: truncate_chars(&page.content, CONTENT_PREVIEW_CHARS),
                meta: page.meta,
                status: PageStatus::Success,
                error: None,
            }
        } else {
            ExtractedContent {
                index,
                url: result.url.clone(),
                title: result.title.clone(),
                snippet: result.snippet.clone(),
                content: String::new(),
                meta: PageMeta::default(),
                status: PageStatus::Error,
                error: Some(
                    page.error
                        .unwrap_or_else(|| "Failed to extract content".to_string()),
                ),
            }
        };
        extracted.push(entry);
    }
    extracted
}

fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(limit).collect();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_config() -> Config {
        Config {
            fetch_delay_ms: (0, 0),
            batch_delay_ms: (0, 0),
            extraction_pacing_ms: 0,
            ..Config::default()
        }
    }

    fn fake_results(n: usize) -> Vec<SearchResult> {
        let page = format!(
            "<html><body>{}</body></html>",
            (0..n)
                .map(|i| format!(
                    r#"<li class="b_algo"><h2><a href="https://example.com/{i}">Result number {i}</a></h2><p>snippet {i}</p></li>"#
                ))
                .collect::<String>()
        );
        SearchEngine::new(quick_config()).parse_results(&page, n)
    }

    fn success_page(url: &str, content: &str) -> ExtractedPage {
        ExtractedPage {
            url: url.to_string(),
            title: "t".to_string(),
            content: content.to_string(),
            raw_html: None,
            meta: PageMeta::default(),
            status: PageStatus::Success,
            error: None,
        }
    }

    #[test]
    fn batch_output_aligns_with_input() {
        let orchestrator = Orchestrator::new(quick_config());
        let urls = vec![
            "not a url".to_string(),
            "also::broken".to_string(),
            "still bad".to_string(),
        ];
        let pages = orchestrator.batch_extract(&urls, true);
        assert_eq!(pages.len(), urls.len());
        for (page, url) in pages.iter().zip(&urls) {
            assert_eq!(&page.url, url);
            assert_eq!(page.status, PageStatus::Error);
            assert!(page.content.is_empty());
        }
    }

    #[test]
    fn empty_batch_yields_empty_output() {
        let orchestrator = Orchestrator::new(quick_config());
        assert!(orchestrator.batch_extract(&[], true).is_empty());
    }

    #[test]
    fn extraction_cap_limits_attempts() {
        let results = fake_results(10);
        assert_eq!(results.len(), 10);

        let mut attempts = 0;
        let extracted = extract_top_results(&results, 3, 0, |url| {
            attempts += 1;
            success_page(url, "body text")
        });

        assert_eq!(attempts, 3);
        assert_eq!(extracted.len(), 3);
        assert_eq!(
            extracted.iter().map(|e| e.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn failed_extractions_still_count_against_the_cap() {
        let results = fake_results(10);
        let mut attempts = 0;
        let extracted = extract_top_results(&results, 3, 0, |url| {
            attempts += 1;
            ExtractedPage::failed(url, "boom".to_string())
        });

        assert_eq!(attempts, 3);
        assert_eq!(extracted.len(), 3);
        assert!(extracted.iter().all(|e| e.status == PageStatus::Error));
        assert_eq!(extracted[0].error.as_deref(), Some("boom"));
    }

    #[test]
    fn extraction_failure_is_isolated_per_item() {
        let results = fake_results(3);
        let extracted = extract_top_results(&results, 3, 0, |url| {
            if url.ends_with("/1") {
                ExtractedPage::failed(url, "middle failed".to_string())
            } else {
                success_page(url, "fine")
            }
        });

        assert_eq!(extracted.len(), 3);
        assert_eq!(extracted[0].status, PageStatus::Success);
        assert_eq!(extracted[1].status, PageStatus::Error);
        assert_eq!(extracted[2].status, PageStatus::Success);
        assert!(extracted[1].content.is_empty());
        assert_eq!(extracted[1].meta, PageMeta::default());
    }

    #[test]
    fn long_content_is_truncated_with_marker() {
        let results = fake_results(1);
        let long_body = "x".repeat(CONTENT_PREVIEW_CHARS + 100);
        let extracted = extract_top_results(&results, 3, 0, |url| success_page(url, &long_body));

        assert_eq!(
            extracted[0].content.chars().count(),
            CONTENT_PREVIEW_CHARS + 3
        );
        assert!(extracted[0].content.ends_with("..."));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let text = "héllo wörld".repeat(10);
        let out = truncate_chars(&text, 5);
        assert_eq!(out, "héllo...");
    }

    #[test]
    fn search_session_counts_and_caps_extractions() {
        let mut server = mockito::Server::new();
        let results_page = format!(
            "<html><body>{}</body></html>",
            (0..10)
                .map(|i| format!(
                    r#"<li class="b_algo"><h2><a href="{{base}}/page/{i}">Result number {i}</a></h2><p>s</p></li>"#
                ))
                .collect::<String>()
                .replace("{base}", &server.url())
        );
        server
            .mock("GET", "/search")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(results_page)
            .create();
        server
            .mock("GET", mockito::Matcher::Regex("^/page/".to_string()))
            .with_status(200)
            .with_body("<html><body><div>extracted page body</div></body></html>")
            .expect(3)
            .create();

        let orchestrator = Orchestrator::new(Config {
            search_endpoint: format!("{}/search", server.url()),
            blocked_domains: vec!["msn.com".to_string()],
            ..quick_config()
        });

        let session = orchestrator.search_and_extract("anything", 10, true);
        assert_eq!(session.summary.search_results_count, 10);
        assert_eq!(session.summary.content_extractions_attempted, 3);
        assert_eq!(session.summary.content_extractions_successful, 3);
        assert_eq!(session.extracted_content.len(), 3);
        assert!(session.extracted_content[0]
            .content
            .contains("extracted page body"));
    }

    #[test]
    fn failed_search_skips_extraction_entirely() {
        let mut server = mockito::Server::new();
        server.mock("GET", mockito::Matcher::Any).with_status(500).create();

        let orchestrator = Orchestrator::new(Config {
            search_endpoint: format!("{}/search", server.url()),
            ..quick_config()
        });

        let session = orchestrator.search_and_extract("anything", 5, true);
        assert_eq!(session.results.len(), 1);
        assert!(session.results[0].is_error());
        assert!(session.extracted_content.is_empty());
        assert_eq!(session.summary.search_results_count, 0);
        assert_eq!(session.summary.content_extractions_attempted, 0);
    }
}

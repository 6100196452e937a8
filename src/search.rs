use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use log::{info, warn};

use crate::config::Config;
use crate::fetcher::Fetcher;

/// Snippet element fallbacks tried in order within a result container.
const SNIPPET_SELECTORS: &[&str] = &["p", "div.b_caption", "span", "div"];

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchResult {
    fn entry(title: String, url: String, snippet: String) -> Self {
        SearchResult {
            title,
            url,
            snippet,
            error: None,
        }
    }

    /// Sentinel entry returned when the search itself failed.
    pub fn failure(reason: String) -> Self {
        SearchResult {
            title: String::new(),
            url: String::new(),
            snippet: String::new(),
            error: Some(reason),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Queries the search engine's HTML results page and parses result entries
/// through a cascade of selector strategies, so routine layout changes on
/// the engine side degrade to the next strategy instead of breaking.
pub struct SearchEngine {
    fetcher: Fetcher,
    config: Config,
}

impl SearchEngine {
    pub fn new(config: Config) -> Self {
        SearchEngine {
            fetcher: Fetcher::new(config.clone()),
            config,
        }
    }

    /// Run `query` and return at most `num_results` entries, in document
    /// order. Never fails: a fetch problem comes back as a single sentinel
    /// entry carrying the error.
    pub fn search(&self, query: &str, num_results: usize) -> Vec<SearchResult> {
        let count = num_results.min(self.config.engine_result_cap);
        let search_url = format!(
            "{}?q={}&count={}",
            self.config.search_endpoint,
            urlencoding::encode(query),
            count
        );
        info!("Searching for: '{}'", query);

        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static("https://www.bing.com/"));

        match self.fetcher.fetch(&search_url, Some(&headers)) {
            Ok(html) => self.parse_results(&html, num_results),
            Err(e) => {
                warn!("Search failed: {}", e);
                vec![SearchResult::failure(format!("Search failed: {}", e))]
            }
        }
    }

    /// Parse a results page. Exposed separately from `search` so layout
    /// handling can be exercised on fixture documents.
    pub fn parse_results(&self, html: &str, num_results: usize) -> Vec<SearchResult> {
        let document = Html::parse_document(html);
        let containers = result_containers(&document);

        let mut results = Vec::new();
        for container in containers.into_iter().take(num_results) {
            if let Some(entry) = self.parse_container(container) {
                results.push(entry);
            }
        }

        if results.is_empty() {
            results = self.backup_from_anchors(&document, num_results);
        }
        results
    }

    /// Canonical title/link/snippet pattern with per-element fallbacks.
    /// Candidates failing URL or title validation are silently dropped.
    fn parse_container(&self, container: ElementRef<'_>) -> Option<SearchResult> {
        let title_link = Selector::parse("h2 a").unwrap();
        let any_link = Selector::parse("a[href]").unwrap();

        let link = container
            .select(&title_link)
            .next()
            .or_else(|| container.select(&any_link).next())?;
        let href = link.value().attr("href")?;
        let title = link.text().collect::<String>().trim().to_string();

        if !self.valid_result_url(href) {
            return None;
        }
        if title.chars().count() <= self.config.min_title_len {
            return None;
        }

        let snippet = first_snippet(container);
        Some(SearchResult::entry(title, href.to_string(), snippet))
    }

    /// Last-ditch extraction: scan every anchor on the page, keeping the
    /// first `num_results` that survive the deny-list and a stricter title
    /// threshold.
    fn backup_from_anchors(&self, document: &Html, num_results: usize) -> Vec<SearchResult> {
        let anchors = Selector::parse("a[href]").unwrap();
        let mut results = Vec::new();

        for link in document.select(&anchors) {
            if results.len() >= num_results {
                break;
            }
            let href = match link.value().attr("href") {
                Some(h) => h,
                None => continue,
            };
            if !self.valid_result_url(href) {
                continue;
            }
            let title = link.text().collect::<String>().trim().to_string();
            if title.chars().count() > self.config.backup_min_title_len {
                results.push(SearchResult::entry(title, href.to_string(), String::new()));
            }
        }
        results
    }

    fn valid_result_url(&self, href: &str) -> bool {
        href.starts_with("http")
            && !self
                .config
                .blocked_domains
                .iter()
                .any(|domain| href.contains(domain.as_str()))
    }
}

/// Primary container class, alternative container class, then any div whose
/// class mentions the result marker. First strategy with matches wins.
fn result_containers(document: &Html) -> Vec<ElementRef<'_>> {
    let primary = Selector::parse("li.b_algo").unwrap();
    let mut containers: Vec<ElementRef> = document.select(&primary).collect();

    if containers.is_empty() {
        let alternative = Selector::parse("div.b_algo").unwrap();
        containers = document.select(&alternative).collect();
    }

    if containers.is_empty() {
        let any_div = Selector::parse("div").unwrap();
        containers = document
            .select(&any_div)
            .filter(|el| {
                el.value()
                    .attr("class")
                    .map_or(false, |class| class.to_lowercase().contains("algo"))
            })
            .collect();
    }
    containers
}

fn first_snippet(container: ElementRef<'_>) -> String {
    for selector_str in SNIPPET_SELECTORS {
        let selector = Selector::parse(selector_str).unwrap();
        if let Some(element) = container.select(&selector).next() {
            return element.text().collect::<String>().trim().to_string();
        }
    }
    String::new()
}

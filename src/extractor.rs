use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

use crate::config::Config;
use crate::fetcher::Fetcher;

/// Boilerplate stripped from the document before any text extraction.
const NOISE_SELECTOR: &str = "script, style, nav, footer, header, aside, form, noscript";

/// Semantic/structural selectors tried in order to find the content root.
const CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    "[role='main']",
    ".content",
    ".main-content",
    ".post-content",
    ".entry-content",
    ".article-content",
    ".page-content",
    "#content",
    "#main",
    ".container .row .col",
];

/// Where a metadata rule reads its value once the selector matches.
enum MetaSource {
    Attr(&'static str),
    Text,
}

struct MetaRule {
    selector: &'static str,
    source: MetaSource,
}

const DESCRIPTION_RULES: &[MetaRule] = &[
    MetaRule { selector: "meta[name='description']", source: MetaSource::Attr("content") },
    MetaRule { selector: "meta[property='og:description']", source: MetaSource::Attr("content") },
    MetaRule { selector: "meta[name='twitter:description']", source: MetaSource::Attr("content") },
];

const KEYWORDS_RULES: &[MetaRule] = &[
    MetaRule { selector: "meta[name='keywords']", source: MetaSource::Attr("content") },
];

const AUTHOR_RULES: &[MetaRule] = &[
    MetaRule { selector: "meta[name='author']", source: MetaSource::Attr("content") },
    MetaRule { selector: "meta[name='article:author']", source: MetaSource::Attr("content") },
    MetaRule { selector: "meta[property='article:author']", source: MetaSource::Attr("content") },
    MetaRule { selector: ".author", source: MetaSource::Text },
    MetaRule { selector: ".byline", source: MetaSource::Text },
    MetaRule { selector: ".post-author", source: MetaSource::Text },
    MetaRule { selector: "[rel='author']", source: MetaSource::Text },
];

const DATE_RULES: &[MetaRule] = &[
    MetaRule { selector: "meta[property='article:published_time']", source: MetaSource::Attr("content") },
    MetaRule { selector: "meta[name='article:published_time']", source: MetaSource::Attr("content") },
    MetaRule { selector: "meta[name='pubdate']", source: MetaSource::Attr("content") },
    MetaRule { selector: "time[datetime]", source: MetaSource::Attr("datetime") },
    MetaRule { selector: ".date", source: MetaSource::Text },
    MetaRule { selector: ".published", source: MetaSource::Text },
    MetaRule { selector: ".post-date", source: MetaSource::Text },
];

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq)]
pub struct PageMeta {
    pub description: String,
    pub keywords: String,
    pub author: String,
    pub published_date: String,
    pub content_length: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExtractedPage {
    pub url: String,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_html: Option<String>,
    pub meta: PageMeta,
    pub status: PageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractedPage {
    pub fn failed(url: &str, reason: String) -> Self {
        ExtractedPage {
            url: url.to_string(),
            title: String::new(),
            content: String::new(),
            raw_html: None,
            meta: PageMeta::default(),
            status: PageStatus::Error,
            error: Some(reason),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == PageStatus::Success
    }
}

/// Turns raw pages into cleaned text plus metadata. Failures of any kind
/// are folded into an `ExtractedPage` with `status = error`; `extract`
/// never returns an error to the caller.
pub struct ContentExtractor {
    fetcher: Fetcher,
    space_runs: Regex,
    newline_edges: Regex,
    blank_lines: Regex,
}

impl ContentExtractor {
    pub fn new(config: Config) -> Self {
        ContentExtractor {
            fetcher: Fetcher::new(config),
            space_runs: Regex::new(r"[ \t\r]+").unwrap(),
            newline_edges: Regex::new(r" ?\n ?").unwrap(),
            blank_lines: Regex::new(r"\n{3,}").unwrap(),
        }
    }

    pub fn extract(&self, url: &str, extract_text: bool) -> ExtractedPage {
        match self.fetcher.fetch(url, None) {
            Ok(html) => self.extract_from_html(url, &html, extract_text),
            Err(e) => ExtractedPage::failed(url, format!("Content extraction failed: {}", e)),
        }
    }

    /// Extraction over already-fetched HTML. Deterministic: the same
    /// document always yields the same page.
    pub fn extract_from_html(&self, url: &str, html: &str, extract_text: bool) -> ExtractedPage {
        let mut document = Html::parse_document(html);
        strip_noise(&mut document);

        let title = document_title(&document);

        if !extract_text {
            return ExtractedPage {
                url: url.to_string(),
                title,
                content: String::new(),
                raw_html: Some(html.to_string()),
                meta: PageMeta::default(),
                status: PageStatus::Success,
                error: None,
            };
        }

        let content = match content_root(&document) {
            Some(root) => self.normalize_whitespace(&element_text(root)),
            None => String::new(),
        };

        let mut meta = extract_metadata(&document);
        meta.content_length = content.chars().count();

        ExtractedPage {
            url: url.to_string(),
            title,
            content,
            raw_html: None,
            meta,
            status: PageStatus::Success,
            error: None,
        }
    }

    /// Collapse runs of spaces/tabs to one space, trim spaces around line
    /// breaks, then squeeze three or more newlines down to one blank line.
    pub fn normalize_whitespace(&self, text: &str) -> String {
        let text = self.space_runs.replace_all(text, " ");
        let text = self.newline_edges.replace_all(&text, "\n");
        let text = self.blank_lines.replace_all(&text, "\n\n");
        text.trim().to_string()
    }
}

fn strip_noise(document: &mut Html) {
    let selector = Selector::parse(NOISE_SELECTOR).unwrap();
    let ids: Vec<_> = document.select(&selector).map(|el| el.id()).collect();
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn document_title(document: &Html) -> String {
    let selector = Selector::parse("title").unwrap();
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "No title".to_string())
}

/// Locate the main content node. Semantic selectors first, then the div
/// with the longest text (first-seen wins on equal length), then the body.
fn content_root(document: &Html) -> Option<ElementRef<'_>> {
    for selector_str in CONTENT_SELECTORS {
        let selector = match Selector::parse(selector_str) {
            Ok(s) => s,
            Err(_) => continue,
        };
        if let Some(element) = document.select(&selector).next() {
            return Some(element);
        }
    }

    let div_selector = Selector::parse("div").unwrap();
    let mut best: Option<(usize, ElementRef)> = None;
    for div in document.select(&div_selector) {
        let len = element_text(div).trim().chars().count();
        if len > 0 && best.map_or(true, |(max_len, _)| len > max_len) {
            best = Some((len, div));
        }
    }
    if let Some((_, element)) = best {
        return Some(element);
    }

    let body_selector = Selector::parse("body").unwrap();
    document
        .select(&body_selector)
        .next()
        .or_else(|| Some(document.root_element()))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ")
}

fn extract_metadata(document: &Html) -> PageMeta {
    PageMeta {
        description: resolve_meta(document, DESCRIPTION_RULES),
        keywords: resolve_meta(document, KEYWORDS_RULES),
        author: resolve_meta(document, AUTHOR_RULES),
        published_date: resolve_meta(document, DATE_RULES),
        content_length: 0,
    }
}

/// First matching rule wins, even when its value is empty; no match at all
/// leaves the field as an empty string.
fn resolve_meta(document: &Html, rules: &[MetaRule]) -> String {
    for rule in rules {
        let selector = match Selector::parse(rule.selector) {
            Ok(s) => s,
            Err(_) => continue,
        };
        if let Some(element) = document.select(&selector).next() {
            return match rule.source {
                MetaSource::Attr(name) => {
                    element.value().attr(name).unwrap_or("").trim().to_string()
                }
                MetaSource::Text => element.text().collect::<String>().trim().to_string(),
            };
        }
    }
    String::new()
}

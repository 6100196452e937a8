use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION, USER_AGENT};
use log::{debug, warn};
use thiserror::Error;
use url::Url;

use crate::config::Config;
use crate::delay_manager;

/// Number of fallback strategies tried per fetch.
const STRATEGY_COUNT: usize = 3;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("all {attempts} fetch strategies failed, last error: {last}")]
    Exhausted { attempts: usize, last: String },
}

/// HTTP fetcher with a strategy cascade: a plain request with a random
/// user-agent, the same request with a rotated user-agent, then a
/// cookie-store session client that keeps connection state across calls.
pub struct Fetcher {
    client: Client,
    session: Client,
    config: Config,
}

impl Fetcher {
    pub fn new(config: Config) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to build HTTP client");

        let session = Client::builder()
            .timeout(config.timeout)
            .cookie_store(true)
            .build()
            .expect("Failed to build session client");

        Fetcher {
            client,
            session,
            config,
        }
    }

    fn random_user_agent(&self) -> &str {
        let pool = &self.config.user_agents;
        let mut rng = rand::thread_rng();
        use rand::Rng;
        &pool[rng.gen_range(0..pool.len())]
    }

    fn base_headers(&self, overrides: Option<&HeaderMap>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        if let Ok(ua) = HeaderValue::from_str(self.random_user_agent()) {
            headers.insert(USER_AGENT, ua);
        }
        if let Some(extra) = overrides {
            for (name, value) in extra.iter() {
                headers.insert(name.clone(), value.clone());
            }
        }
        headers
    }

    /// Fetch `url`, trying each strategy in order until one yields a 2xx/3xx
    /// response. A jittered delay runs before every attempt. Invalid input
    /// fails immediately, with no network attempt and no delay.
    pub fn fetch(&self, url: &str, headers: Option<&HeaderMap>) -> Result<String, FetchError> {
        match Url::parse(url) {
            Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => {}
            _ => return Err(FetchError::InvalidUrl(url.to_string())),
        }

        let base = self.base_headers(headers);
        let mut last_error = String::new();

        for attempt in 0..STRATEGY_COUNT {
            let (min_ms, max_ms) = self.config.fetch_delay_ms;
            delay_manager::random_delay_ms(min_ms, max_ms);

            let request = match attempt {
                0 => self.client.get(url).headers(base.clone()),
                1 => {
                    let mut rotated = base.clone();
                    if let Ok(ua) = HeaderValue::from_str(self.random_user_agent()) {
                        rotated.insert(USER_AGENT, ua);
                    }
                    self.client.get(url).headers(rotated)
                }
                _ => self.session.get(url).headers(base.clone()),
            };

            match request.send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() || status.is_redirection() {
                        match resp.text() {
                            Ok(text) => {
                                debug!("Fetched {} on attempt {}", url, attempt + 1);
                                return Ok(text);
                            }
                            Err(e) => last_error = format!("failed to read body: {}", e),
                        }
                    } else {
                        last_error = format!("HTTP status {}", status);
                    }
                }
                Err(e) => last_error = e.to_string(),
            }
            warn!(
                "Fetch attempt {} of {} failed for {}: {}",
                attempt + 1,
                STRATEGY_COUNT,
                url,
                last_error
            );
        }

        Err(FetchError::Exhausted {
            attempts: STRATEGY_COUNT,
            last: last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn quick_config() -> Config {
        Config {
            fetch_delay_ms: (0, 0),
            ..Config::default()
        }
    }

    #[test]
    fn invalid_url_fails_without_network() {
        let fetcher = Fetcher::new(quick_config());
        let start = Instant::now();
        let err = fetcher.fetch("not a url", None).unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
        assert!(start.elapsed().as_millis() < 100);
    }

    #[test]
    fn non_http_scheme_is_rejected() {
        let fetcher = Fetcher::new(quick_config());
        let err = fetcher.fetch("ftp://example.com/file", None).unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    #[test]
    fn success_returns_body() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/page")
            .with_status(200)
            .with_body("<html><body>hello</body></html>")
            .create();

        let fetcher = Fetcher::new(quick_config());
        let body = fetcher.fetch(&format!("{}/page", server.url()), None).unwrap();
        assert!(body.contains("hello"));
        mock.assert();
    }

    #[test]
    fn persistent_failure_exhausts_all_strategies() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/broken")
            .with_status(500)
            .expect(STRATEGY_COUNT)
            .create();

        let fetcher = Fetcher::new(quick_config());
        let err = fetcher
            .fetch(&format!("{}/broken", server.url()), None)
            .unwrap_err();
        match err {
            FetchError::Exhausted { attempts, last } => {
                assert_eq!(attempts, STRATEGY_COUNT);
                assert!(last.contains("500"), "last error was: {}", last);
            }
            other => panic!("expected Exhausted, got {:?}", other),
        }
        mock.assert();
    }

    #[test]
    fn header_override_is_sent() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/ref")
            .match_header("referer", "https://www.bing.com/")
            .with_status(200)
            .with_body("ok")
            .create();

        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::REFERER,
            HeaderValue::from_static("https://www.bing.com/"),
        );

        let fetcher = Fetcher::new(quick_config());
        let body = fetcher
            .fetch(&format!("{}/ref", server.url()), Some(&headers))
            .unwrap();
        assert_eq!(body, "ok");
        mock.assert();
    }
}

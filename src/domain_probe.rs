//! Website liveness and parking detection.
//!
//! A probe issues a HEAD request with a bounded timeout and, when the site
//! answers, fetches the page to look for parking-page indicators. Every
//! failure degrades to `not_found`; the probe never returns an error.

use async_trait::async_trait;
use moka::future::Cache;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use url::Url;

use crate::errors::AppError;
use crate::models::DomainCheck;

/// Case-insensitive phrases that mark a placeholder page.
pub const PARKING_INDICATORS: &[&str] = &[
    "domain for sale",
    "parked domain",
    "this domain may be for sale",
    "under construction",
    "coming soon",
    "domain parking",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMethod {
    Head,
    Get,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status_ok: bool,
    /// Response body; always empty for HEAD.
    pub body: String,
}

/// Generic HTTP capability used by the domain probe.
#[async_trait]
pub trait NetworkFetch: Send + Sync {
    async fn fetch(
        &self,
        method: FetchMethod,
        url: &str,
        timeout: Duration,
    ) -> Result<FetchResponse, AppError>;
}

/// `NetworkFetch` backed by reqwest.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("rust-leads-api/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl NetworkFetch for HttpFetcher {
    async fn fetch(
        &self,
        method: FetchMethod,
        url: &str,
        timeout: Duration,
    ) -> Result<FetchResponse, AppError> {
        let request = match method {
            FetchMethod::Head => self.client.head(url),
            FetchMethod::Get => self.client.get(url),
        };

        let response = request.timeout(timeout).send().await?;
        let status_ok = response.status().is_success();

        let body = match method {
            FetchMethod::Head => String::new(),
            FetchMethod::Get => response.text().await?,
        };

        Ok(FetchResponse { status_ok, body })
    }
}

/// Classifies websites as active, parked or not found.
#[derive(Clone)]
pub struct DomainProbe {
    fetcher: Arc<dyn NetworkFetch>,
    timeout: Duration,
    /// "scheme://host[:port]" -> conclusive probe result (1 hour TTL).
    cache: Cache<String, DomainCheck>,
}

impl DomainProbe {
    pub fn new(fetcher: Arc<dyn NetworkFetch>, timeout: Duration) -> Self {
        let cache = Cache::builder()
            .time_to_live(Duration::from_secs(3600))
            .max_capacity(10_000)
            .build();

        Self {
            fetcher,
            timeout,
            cache,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probes a website URL or bare domain.
    ///
    /// Conclusive results (active or parked) are cached per origin; failures
    /// are not, so a transient outage is retried on the next batch.
    pub async fn check(&self, website: &str) -> DomainCheck {
        let url = match normalize_url(website) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Skipping domain probe for '{}': {}", website, e);
                return DomainCheck::failed(e);
            }
        };
        let origin = cache_key(&url);

        if let Some(cached) = self.cache.get(&origin).await {
            tracing::debug!("Domain cache HIT for {}", origin);
            return cached;
        }

        let result = self.probe(url.as_str()).await;
        if result.error.is_none() && result.found {
            self.cache.insert(origin, result.clone()).await;
        }
        result
    }

    async fn probe(&self, url: &str) -> DomainCheck {
        let head = match self.fetch(FetchMethod::Head, url).await {
            Ok(head) => head,
            Err(e) => {
                tracing::debug!("Domain HEAD failed for {}: {}", url, e);
                return DomainCheck::failed(describe_failure(&e));
            }
        };
        if !head.status_ok {
            tracing::debug!("Domain HEAD returned non-success status for {}", url);
            return DomainCheck::failed("non-success status");
        }

        let page = match self.fetch(FetchMethod::Get, url).await {
            Ok(page) => page,
            Err(e) => {
                tracing::debug!("Domain GET failed for {}: {}", url, e);
                return DomainCheck::failed(describe_failure(&e));
            }
        };

        if is_parked_page(&page.body) {
            tracing::info!("Parked domain detected: {}", url);
            DomainCheck::parked()
        } else {
            DomainCheck::active()
        }
    }

    /// Runs one fetch under the probe deadline, whatever the fetcher does
    /// with its own timeout argument.
    async fn fetch(&self, method: FetchMethod, url: &str) -> Result<FetchResponse, AppError> {
        tokio::time::timeout(self.timeout, self.fetcher.fetch(method, url, self.timeout))
            .await
            .map_err(|_| AppError::Timeout(format!("{:?} {}", method, url)))?
    }
}

/// Turns a website value into an absolute http(s) URL with a host.
/// Scheme-less values are assumed to be https.
pub fn normalize_url(website: &str) -> Result<Url, String> {
    let trimmed = website.trim();
    if trimmed.is_empty() {
        return Err("empty website".to_string());
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let url = Url::parse(&candidate).map_err(|e| format!("invalid url: {}", e))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(format!("unsupported scheme: {}", url.scheme()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err("url has no host".to_string());
    }
    Ok(url)
}

/// Scheme, lowercase host and explicit port; http and https are probed
/// separately.
fn cache_key(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_lowercase();
    match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    }
}

/// Checks the page title and visible text for parking indicators.
pub fn is_parked_page(html: &str) -> bool {
    let title = page_title(html).unwrap_or_default().to_lowercase();
    let text = visible_text(html).to_lowercase();

    PARKING_INDICATORS
        .iter()
        .any(|indicator| title.contains(indicator) || text.contains(indicator))
}

fn page_title(html: &str) -> Option<String> {
    static TITLE: OnceLock<Regex> = OnceLock::new();
    let re = TITLE.get_or_init(|| {
        Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("title regex is valid")
    });
    re.captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Strips scripts, styles and tags, collapsing whitespace.
fn visible_text(html: &str) -> String {
    static HIDDEN: OnceLock<Regex> = OnceLock::new();
    static TAGS: OnceLock<Regex> = OnceLock::new();
    let hidden = HIDDEN.get_or_init(|| {
        Regex::new(r"(?is)<(script|style|noscript)[^>]*>.*?</(script|style|noscript)>")
            .expect("hidden-block regex is valid")
    });
    let tags = TAGS.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("tag regex is valid"));

    let without_hidden = hidden.replace_all(html, " ");
    let without_tags = tags.replace_all(&without_hidden, " ");
    without_tags.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn describe_failure(error: &AppError) -> String {
    match error {
        AppError::Timeout(_) => "timeout".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DomainStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubFetcher {
        head_ok: bool,
        body: String,
        calls: AtomicUsize,
    }

    impl StubFetcher {
        fn new(head_ok: bool, body: &str) -> Self {
            Self {
                head_ok,
                body: body.to_string(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl NetworkFetch for StubFetcher {
        async fn fetch(
            &self,
            method: FetchMethod,
            _url: &str,
            _timeout: Duration,
        ) -> Result<FetchResponse, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(match method {
                FetchMethod::Head => FetchResponse {
                    status_ok: self.head_ok,
                    body: String::new(),
                },
                FetchMethod::Get => FetchResponse {
                    status_ok: true,
                    body: self.body.clone(),
                },
            })
        }
    }

    struct HangingFetcher;

    #[async_trait]
    impl NetworkFetch for HangingFetcher {
        async fn fetch(
            &self,
            _method: FetchMethod,
            _url: &str,
            _timeout: Duration,
        ) -> Result<FetchResponse, AppError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(AppError::InternalError("unreachable".to_string()))
        }
    }

    #[test]
    fn test_normalize_bare_domain() {
        let url = normalize_url(" example.com ").unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        assert!(normalize_url("").is_err());
        assert!(normalize_url("ftp://example.com").is_err());
        assert!(normalize_url("http://").is_err());
    }

    #[test]
    fn test_parked_title_detected() {
        let html = "<html><head><title>Example.com - Domain For Sale</title></head></html>";
        assert!(is_parked_page(html));
    }

    #[test]
    fn test_parked_visible_text_detected() {
        let html = "<body><h1>Coming <b>Soon</b></h1></body>";
        assert!(is_parked_page(html));
    }

    #[test]
    fn test_script_text_is_not_visible() {
        let html = "<body><script>var msg = 'coming soon';</script><p>Fresh bread daily</p></body>";
        assert!(!is_parked_page(html));
    }

    #[tokio::test]
    async fn test_active_site() {
        let fetcher = Arc::new(StubFetcher::new(true, "<title>Joe's Bakery</title>"));
        let probe = DomainProbe::new(fetcher.clone(), Duration::from_secs(1));

        let check = probe.check("joesbakery.com").await;
        assert_eq!(check, DomainCheck::active());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_parked_site_is_found() {
        let fetcher = Arc::new(StubFetcher::new(true, "<p>This domain may be for sale!</p>"));
        let probe = DomainProbe::new(fetcher, Duration::from_secs(1));

        let check = probe.check("https://parked.example").await;
        assert!(check.found);
        assert_eq!(check.status, DomainStatus::Parked);
    }

    #[tokio::test]
    async fn test_failed_head_is_not_found() {
        let fetcher = Arc::new(StubFetcher::new(false, ""));
        let probe = DomainProbe::new(fetcher.clone(), Duration::from_secs(1));

        let check = probe.check("gone.example").await;
        assert!(!check.found);
        assert_eq!(check.status, DomainStatus::NotFound);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_conclusive_results_are_cached_per_origin() {
        let fetcher = Arc::new(StubFetcher::new(true, "<title>Shop</title>"));
        let probe = DomainProbe::new(fetcher.clone(), Duration::from_secs(1));

        probe.check("https://shop.example/about").await;
        probe.check("https://SHOP.example").await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);

        probe.check("http://shop.example").await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_cache_key_separates_schemes_and_ports() {
        let key = |raw: &str| cache_key(&normalize_url(raw).unwrap());
        assert_eq!(key("https://Shop.Example/menu"), "https://shop.example");
        assert_eq!(key("shop.example"), "https://shop.example");
        assert_eq!(key("http://shop.example"), "http://shop.example");
        assert_eq!(key("http://shop.example:8080/"), "http://shop.example:8080");
    }

    #[tokio::test]
    async fn test_hanging_fetch_times_out() {
        let probe = DomainProbe::new(Arc::new(HangingFetcher), Duration::from_millis(20));

        let check = probe.check("slow.example").await;
        assert_eq!(check, DomainCheck::failed("timeout"));
    }
}

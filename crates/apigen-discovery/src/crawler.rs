//! Bounded documentation-site crawl: sitemap first, breadth-first fallback.

use apigen_core::config::CrawlConfig;
use apigen_core::{ErrorKind, HttpFetcher, Page, PageOrigin, RunError};
use apigen_telemetry::{CollaboratorCall, trace_collaborator_call};
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, LazyLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

const STAGE: &str = "discover_from_web";

static LOC_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?is)<loc>\s*(.*?)\s*</loc>").ok());

static LINK_SELECTOR: LazyLock<Option<Selector>> =
    LazyLock::new(|| Selector::parse("a[href]").ok());

/// Pages collected by a crawl plus the per-page failures.
#[derive(Debug, Default)]
pub struct CrawlOutcome {
    pub pages: Vec<Page>,
    pub errors: Vec<RunError>,
}

/// Enforces a minimum delay between successive fetches.
struct Throttle {
    delay: std::time::Duration,
    last: Option<Instant>,
}

impl Throttle {
    fn new(delay: std::time::Duration) -> Self {
        Self { delay, last: None }
    }

    async fn wait(&mut self) {
        if let Some(last) = self.last {
            tokio::time::sleep_until(last + self.delay).await;
        }
        self.last = Some(Instant::now());
    }
}

/// Crawls a documentation site through an [`HttpFetcher`].
///
/// Fetches are strictly sequential. The page cap counts fetch attempts, so a
/// site full of broken links still terminates after `max_pages` requests.
pub struct WebCrawler {
    fetcher: Arc<dyn HttpFetcher>,
    config: CrawlConfig,
}

impl WebCrawler {
    pub fn new(fetcher: Arc<dyn HttpFetcher>, config: CrawlConfig) -> Self {
        Self { fetcher, config }
    }

    pub async fn crawl(&self, root_url: &str) -> CrawlOutcome {
        let mut outcome = CrawlOutcome::default();

        let root = match Url::parse(root_url) {
            Ok(url) if is_web_url(&url) => url,
            Ok(_) | Err(_) => {
                warn!(url = %root_url, "Invalid root URL");
                outcome.errors.push(RunError::new(
                    ErrorKind::Crawl,
                    STAGE,
                    root_url,
                    "invalid root URL",
                ));
                return outcome;
            }
        };

        let mut throttle = Throttle::new(self.config.throttle());

        let sitemap_urls = self.sitemap_urls(&root, &mut throttle).await;
        if sitemap_urls.is_empty() {
            info!(root = %root, "No usable sitemap, crawling breadth-first");
            self.breadth_first(&root, &mut throttle, &mut outcome).await;
        } else {
            info!(root = %root, urls = sitemap_urls.len(), "Using sitemap");
            for url in sitemap_urls.into_iter().take(self.config.max_pages) {
                throttle.wait().await;
                if let Some(content) = self.fetch_page(url.as_str(), &mut outcome).await {
                    outcome.pages.push(Page {
                        url: url.to_string(),
                        content,
                        origin: PageOrigin::Sitemap,
                    });
                }
            }
        }

        info!(
            root = %root,
            pages = outcome.pages.len(),
            failures = outcome.errors.len(),
            "Crawl completed"
        );
        outcome
    }

    /// Same-domain URLs listed in the site's sitemap, deduplicated in listed order.
    async fn sitemap_urls(&self, root: &Url, throttle: &mut Throttle) -> Vec<Url> {
        let Ok(sitemap_url) = root.join(&self.config.sitemap_path) else {
            return Vec::new();
        };

        throttle.wait().await;
        let result = self.fetcher.fetch(sitemap_url.as_str()).await;
        trace_collaborator_call(CollaboratorCall {
            collaborator: "http_fetcher",
            operation: "fetch_sitemap",
            subject: sitemap_url.as_str(),
            outcome: result.as_ref().map(|_| ()).map_err(|e| e.to_string()),
        });

        let body = match result {
            Ok(body) => body,
            Err(e) => {
                debug!(url = %sitemap_url, error = %e, "Sitemap not available");
                return Vec::new();
            }
        };

        let mut locations = same_host_urls(sitemap_locations(&body), root);
        if is_sitemap_index(&body) {
            // one level of child sitemaps; nested indexes are not followed
            let children = std::mem::take(&mut locations);
            for child in children {
                if locations.len() >= self.config.max_pages {
                    break;
                }
                throttle.wait().await;
                match self.fetcher.fetch(child.as_str()).await {
                    Ok(child_body) => {
                        locations.extend(same_host_urls(sitemap_locations(&child_body), root))
                    }
                    Err(e) => debug!(url = %child, error = %e, "Child sitemap not available"),
                }
            }
        }

        let mut seen = HashSet::new();
        locations
            .into_iter()
            .filter(|url| !url.path().to_ascii_lowercase().ends_with(".xml"))
            .filter(|url| seen.insert(url.to_string()))
            .collect()
    }

    async fn breadth_first(&self, root: &Url, throttle: &mut Throttle, outcome: &mut CrawlOutcome) {
        let root = without_fragment(root.clone());
        let mut queued: HashSet<String> = HashSet::from([root.to_string()]);
        let mut frontier: VecDeque<Url> = VecDeque::from([root.clone()]);
        let mut attempts = 0;

        while let Some(url) = frontier.pop_front() {
            if attempts >= self.config.max_pages {
                break;
            }
            attempts += 1;

            throttle.wait().await;
            let Some(content) = self.fetch_page(url.as_str(), outcome).await else {
                continue;
            };

            let links = extract_links(&url, &content);
            let before = frontier.len();
            for link in links {
                if same_host(&link, &root) && queued.insert(link.to_string()) {
                    frontier.push_back(link);
                }
            }
            debug!(url = %url, new_links = frontier.len() - before, "Extracted links");

            outcome.pages.push(Page {
                url: url.to_string(),
                content,
                origin: PageOrigin::Crawl,
            });
        }
    }

    async fn fetch_page(&self, url: &str, outcome: &mut CrawlOutcome) -> Option<String> {
        let result = self.fetcher.fetch(url).await;
        trace_collaborator_call(CollaboratorCall {
            collaborator: "http_fetcher",
            operation: "fetch",
            subject: url,
            outcome: result.as_ref().map(|_| ()).map_err(|e| e.to_string()),
        });

        match result {
            Ok(content) => Some(content),
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to fetch page");
                outcome
                    .errors
                    .push(RunError::new(ErrorKind::Crawl, STAGE, url, e.to_string()));
                None
            }
        }
    }
}

/// `<loc>` entries of a sitemap document, entity-decoded.
pub fn sitemap_locations(body: &str) -> Vec<String> {
    let Some(pattern) = LOC_PATTERN.as_ref() else {
        return Vec::new();
    };
    pattern
        .captures_iter(body)
        .filter_map(|cap| cap.get(1))
        .map(|m| decode_entities(m.as_str()))
        .filter(|loc| !loc.is_empty())
        .collect()
}

/// Whether a sitemap document lists child sitemaps rather than pages.
pub fn is_sitemap_index(body: &str) -> bool {
    body.to_ascii_lowercase().contains("<sitemapindex")
}

fn same_host_urls(locations: Vec<String>, root: &Url) -> Vec<Url> {
    locations
        .into_iter()
        .filter_map(|loc| Url::parse(&loc).ok())
        .map(without_fragment)
        .filter(|url| is_web_url(url) && same_host(url, root))
        .collect()
}

/// Absolute http(s) links of an HTML page, fragments removed.
pub fn extract_links(base: &Url, html: &str) -> Vec<Url> {
    let Some(selector) = LINK_SELECTOR.as_ref() else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    document
        .select(selector)
        .filter_map(|el| el.value().attr("href"))
        .filter(|href| !href.trim_start().starts_with('#'))
        .filter_map(|href| base.join(href.trim()).ok())
        .filter(is_web_url)
        .map(without_fragment)
        .collect()
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn is_web_url(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

fn same_host(url: &Url, root: &Url) -> bool {
    match (url.host_str(), root.host_str()) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    }
}

fn without_fragment(mut url: Url) -> Url {
    url.set_fragment(None);
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Serves a fixed site and records every requested URL with its (virtual) time.
    struct FakeSite {
        pages: HashMap<String, String>,
        requests: Mutex<Vec<(String, Instant)>>,
    }

    impl FakeSite {
        fn new(pages: &[(&str, &str)]) -> Arc<Self> {
            Arc::new(Self {
                pages: pages
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.to_string()))
                    .collect(),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requested(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|(url, _)| url.clone())
                .collect()
        }
    }

    #[async_trait]
    impl HttpFetcher for FakeSite {
        async fn fetch(&self, url: &str) -> anyhow::Result<String> {
            self.requests
                .lock()
                .unwrap()
                .push((url.to_string(), Instant::now()));
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("HTTP error 404 Not Found: {}", url))
        }
    }

    fn config(max_pages: usize, throttle_ms: u64) -> CrawlConfig {
        CrawlConfig {
            max_pages,
            throttle_ms,
            ..CrawlConfig::default()
        }
    }

    #[tokio::test]
    async fn test_sitemap_first() {
        let site = FakeSite::new(&[
            (
                "https://docs.example.com/sitemap.xml",
                "<urlset><url><loc>https://docs.example.com/a</loc></url>\
                 <url><loc> https://docs.example.com/b </loc></url>\
                 <url><loc>https://other.com/c</loc></url></urlset>",
            ),
            ("https://docs.example.com/a", "GET /api/a"),
            ("https://docs.example.com/b", "GET /api/b"),
        ]);
        let crawler = WebCrawler::new(site.clone(), config(10, 0));

        let outcome = crawler.crawl("https://docs.example.com").await;
        let urls: Vec<&str> = outcome.pages.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, vec!["https://docs.example.com/a", "https://docs.example.com/b"]);
        assert!(outcome.pages.iter().all(|p| p.origin == PageOrigin::Sitemap));
        assert!(outcome.errors.is_empty());
        assert!(!site.requested().iter().any(|u| u.contains("other.com")));
    }

    #[tokio::test]
    async fn test_sitemap_index_expands_child_sitemaps() {
        let site = FakeSite::new(&[
            (
                "https://docs.example.com/sitemap.xml",
                "<sitemapindex>\
                 <sitemap><loc>https://docs.example.com/sitemap-api.xml</loc></sitemap>\
                 <sitemap><loc>https://docs.example.com/sitemap-missing.xml</loc></sitemap>\
                 <sitemap><loc>https://cdn.other.com/sitemap.xml</loc></sitemap>\
                 </sitemapindex>",
            ),
            (
                "https://docs.example.com/sitemap-api.xml",
                "<urlset><url><loc>https://docs.example.com/reference</loc></url>\
                 <url><loc>https://docs.example.com/nested.xml</loc></url></urlset>",
            ),
            ("https://docs.example.com/reference", "DELETE /v1/sessions/{id}"),
        ]);
        let crawler = WebCrawler::new(site.clone(), config(10, 0));

        let outcome = crawler.crawl("https://docs.example.com").await;
        let urls: Vec<&str> = outcome.pages.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, vec!["https://docs.example.com/reference"]);
        assert!(outcome.errors.is_empty());
        assert_eq!(
            site.requested(),
            vec![
                "https://docs.example.com/sitemap.xml",
                "https://docs.example.com/sitemap-api.xml",
                "https://docs.example.com/sitemap-missing.xml",
                "https://docs.example.com/reference",
            ]
        );
    }

    #[tokio::test]
    async fn test_breadth_first_respects_cap_and_domain() {
        let site = FakeSite::new(&[
            (
                "https://docs.example.com/",
                r##"<a href="/one">1</a><a href="two#section">2</a>
                    <a href="https://evil.example.org/x">x</a><a href="#top">top</a>
                    <a href="mailto:someone@example.com">mail</a><a href="/three">3</a>"##,
            ),
            ("https://docs.example.com/one", r#"<a href="/four">4</a>"#),
            ("https://docs.example.com/two", "no links"),
            ("https://docs.example.com/three", "no links"),
            ("https://docs.example.com/four", "no links"),
        ]);
        let crawler = WebCrawler::new(site.clone(), config(3, 0));

        let outcome = crawler.crawl("https://docs.example.com/").await;
        let urls: Vec<&str> = outcome.pages.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://docs.example.com/",
                "https://docs.example.com/one",
                "https://docs.example.com/two",
            ]
        );

        let requested = site.requested();
        // sitemap probe + 3 pages
        assert_eq!(requested.len(), 4);
        assert!(requested.iter().all(|u| u.starts_with("https://docs.example.com/")));
    }

    #[tokio::test]
    async fn test_failed_fetches_are_recorded_and_counted() {
        let site = FakeSite::new(&[(
            "https://docs.example.com/",
            r#"<a href="/gone">gone</a><a href="/ok">ok</a>"#,
        ), ("https://docs.example.com/ok", "fine")]);
        let crawler = WebCrawler::new(site, config(2, 0));

        let outcome = crawler.crawl("https://docs.example.com/").await;
        assert_eq!(outcome.pages.len(), 1);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].kind, ErrorKind::Crawl);
        assert_eq!(outcome.errors[0].subject, "https://docs.example.com/gone");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetches_are_throttled() {
        let site = FakeSite::new(&[
            ("https://docs.example.com/", r#"<a href="/a">a</a><a href="/b">b</a>"#),
            ("https://docs.example.com/a", ""),
            ("https://docs.example.com/b", ""),
        ]);
        let crawler = WebCrawler::new(site.clone(), config(10, 500));

        crawler.crawl("https://docs.example.com/").await;

        let requests = site.requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 4);
        for pair in requests.windows(2) {
            assert!(pair[1].1.duration_since(pair[0].1) >= Duration::from_millis(500));
        }
    }

    #[tokio::test]
    async fn test_invalid_root_url() {
        let crawler = WebCrawler::new(FakeSite::new(&[]), config(5, 0));
        let outcome = crawler.crawl("ftp://docs.example.com").await;
        assert!(outcome.pages.is_empty());
        assert_eq!(outcome.errors.len(), 1);
    }

    #[test]
    fn test_sitemap_locations_decode_entities() {
        let locs = sitemap_locations("<loc>https://a.com/?x=1&amp;y=2</loc><LOC></LOC>");
        assert_eq!(locs, vec!["https://a.com/?x=1&y=2"]);
    }
}

//! ImageCache: banner URL -> renderable source.
//!
//! Sources are inline `data:` URLs so a rendered banner never depends on the
//! network again. Default banners are additionally memoised per cleaned URL
//! by `warm_defaults`; URLs of the random image service are never memoised.
//! An inlined default remembers the URL it was fetched from, so rendering it
//! still counts as a fetch of that URL.

use async_trait::async_trait;
use banners_types::DefaultConfig;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use moka::sync::Cache;
use parking_lot::Mutex;
use regex::Regex;
use std::path::Path;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use crate::config::{defaults, NOT_FOUND_URL_MARKER, RANDOM_IMAGE_SERVICE_HOST};
use crate::resolver::is_falsy_banner;
use crate::settings::NormalizedSettings;

static QUOTED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"^"(.*)"$"#).unwrap());

/// Body and final location of a successful GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    /// URL after redirects
    pub final_url: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Transport for banner images.
///
/// `Err` covers transport failures and non-success statuses alike.
#[async_trait]
pub trait BannerFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, String>;
}

/// reqwest for http(s), the filesystem for `file://`.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(defaults::HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| format!("HTTP client error: {}", e))?;
        Ok(Self { client })
    }

    async fn read_local(url: &url::Url) -> Result<FetchedImage, String> {
        let path = url
            .to_file_path()
            .map_err(|_| format!("Not a local file URL: {}", url))?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Ok(FetchedImage {
            final_url: url.to_string(),
            content_type: Some(mime_for_path(&path).to_string()),
            bytes,
        })
    }
}

#[async_trait]
impl BannerFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, String> {
        let parsed = url::Url::parse(url).map_err(|e| format!("Invalid URL '{}': {}", url, e))?;
        if parsed.scheme() == "file" {
            return Self::read_local(&parsed).await;
        }

        let resp = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;

        if !resp.status().is_success() {
            return Err(format!("HTTP-Error: {}", resp.status()));
        }

        let final_url = resp.url().to_string();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| format!("Failed to read body: {}", e))?;

        Ok(FetchedImage {
            final_url,
            content_type,
            bytes: bytes.to_vec(),
        })
    }
}

fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Encode bytes as a `data:` URL usable as a CSS background image.
pub fn to_data_url(content_type: Option<&str>, bytes: &[u8]) -> String {
    let mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(str::trim)
        .filter(|ct| !ct.is_empty())
        .unwrap_or("application/octet-stream");
    format!("data:{};base64,{}", mime, BASE64.encode(bytes))
}

/// Whether the URL is served by the random image service (varies per load).
pub fn is_random_service_url(url: &str) -> bool {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.eq_ignore_ascii_case(RANDOM_IMAGE_SERVICE_HOST)))
        .unwrap_or(false)
}

/// Drop surrounding double quotes and turn graph-relative `../` paths into
/// `file://` URLs under the graph root.
pub fn clean_banner_url(url: &str, graph_path: Option<&str>) -> String {
    let url = url.trim();
    let url = QUOTED_RE.replace(url, "$1").into_owned();

    if !url.starts_with("../") {
        return url;
    }
    let Some(root) = graph_path.map(|p| p.trim_end_matches('/')) else {
        log::debug!("[IMAGE_CACHE] No graph path for local banner {}", url);
        return url;
    };

    let local = format!("{}{}", root, &url[2..]);
    match url::Url::from_file_path(&local) {
        Ok(file_url) => file_url.to_string(),
        Err(_) => format!("file://{}", local),
    }
}

#[derive(Debug, Clone)]
struct InlinedBanner {
    data_url: String,
    final_url: String,
}

pub struct ImageCache {
    fetcher: Arc<dyn BannerFetcher>,
    /// cleaned default banner URL -> inlined image
    inline: Cache<String, InlinedBanner>,
    /// data URL -> final URL it was fetched from
    origins: Cache<String, String>,
    last_banner_url: Mutex<Option<String>>,
}

impl ImageCache {
    pub fn new(fetcher: Arc<dyn BannerFetcher>) -> Self {
        Self {
            fetcher,
            inline: Cache::new(defaults::INLINE_CACHE_CAPACITY),
            origins: Cache::new(defaults::INLINE_CACHE_CAPACITY),
            last_banner_url: Mutex::new(None),
        }
    }

    pub fn http() -> Result<Self, String> {
        Ok(Self::new(Arc::new(HttpFetcher::new()?)))
    }

    /// Final URL of the most recent successful fetch.
    pub fn last_banner_url(&self) -> Option<String> {
        self.last_banner_url.lock().clone()
    }

    pub fn clear_last_banner_url(&self) {
        *self.last_banner_url.lock() = None;
    }

    async fn fetch_image(&self, url: &str) -> Option<FetchedImage> {
        match self.fetcher.fetch(url).await {
            Ok(image) if image.final_url.contains(NOT_FOUND_URL_MARKER) => {
                log::info!("[IMAGE_CACHE] Not found placeholder for {}", url);
                None
            }
            Ok(image) => Some(image),
            Err(e) => {
                log::info!("[IMAGE_CACHE] {} ({})", e, url);
                None
            }
        }
    }

    /// Resolve a banner URL into a display source, or `""` when no image is
    /// available. Already-inline sources pass through untouched.
    ///
    /// The last banner URL survives a successful fetch, or an inline source
    /// produced by `warm_defaults` (its original final URL).
    pub async fn resolve_banner_source(&self, url: &str, graph_path: Option<&str>) -> String {
        self.clear_last_banner_url();

        let url = clean_banner_url(url, graph_path);
        if url.is_empty() {
            return String::new();
        }
        if url.starts_with("data:") {
            if let Some(origin) = self.origins.get(&url) {
                *self.last_banner_url.lock() = Some(origin);
            }
            return url;
        }

        match self.fetch_image(&url).await {
            Some(image) => {
                *self.last_banner_url.lock() = Some(image.final_url.clone());
                to_data_url(image.content_type.as_deref(), &image.bytes)
            }
            None => String::new(),
        }
    }

    /// Inline one default banner, memoised. `None` leaves the value as configured.
    async fn inline_default(&self, banner: Option<&str>, graph_path: Option<&str>) -> Option<String> {
        let banner = banner?;
        if is_falsy_banner(Some(banner)) || banner.starts_with("data:") {
            return None;
        }

        let url = clean_banner_url(banner, graph_path);
        if is_random_service_url(&url) {
            log::debug!("[IMAGE_CACHE] Not caching random image {}", url);
            return None;
        }
        let inlined = match self.inline.get(&url) {
            Some(cached) => cached,
            None => {
                let image = self.fetch_image(&url).await?;
                let inlined = InlinedBanner {
                    data_url: to_data_url(image.content_type.as_deref(), &image.bytes),
                    final_url: image.final_url,
                };
                self.inline.insert(url.clone(), inlined.clone());
                log::debug!("[IMAGE_CACHE] Cached default banner {}", url);
                inlined
            }
        };
        self.origins.insert(inlined.data_url.clone(), inlined.final_url);
        Some(inlined.data_url)
    }

    /// Inline the default banners. The page default is left alone while auto
    /// page banners are on, since it is then only a fallback.
    pub async fn warm_defaults(
        &self,
        config: &DefaultConfig,
        graph_path: Option<&str>,
        auto_page_banner: bool,
    ) -> DefaultConfig {
        let mut warmed = config.clone();

        if !auto_page_banner {
            if let Some(inline) = self.inline_default(config.page.banner.as_deref(), graph_path).await {
                warmed.page.banner = Some(inline);
            }
        }
        if let Some(inline) = self.inline_default(config.journal.banner.as_deref(), graph_path).await {
            warmed.journal.banner = Some(inline);
        }

        warmed
    }

    /// Second phase after `normalize`: same settings with inline default banners.
    pub async fn warm_cache(&self, settings: &NormalizedSettings, graph_path: Option<&str>) -> NormalizedSettings {
        let default_config = self
            .warm_defaults(&settings.default_config, graph_path, settings.flags.auto_page_banner)
            .await;
        NormalizedSettings {
            default_config,
            ..settings.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{normalize, RawSettings, SettingKey};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct MockFetcher {
        responses: HashMap<String, Result<FetchedImage, String>>,
        calls: AtomicUsize,
    }

    impl MockFetcher {
        fn ok(mut self, url: &str, final_url: &str, bytes: &[u8]) -> Self {
            self.responses.insert(
                url.to_string(),
                Ok(FetchedImage {
                    final_url: final_url.to_string(),
                    content_type: Some("image/png".to_string()),
                    bytes: bytes.to_vec(),
                }),
            );
            self
        }

        fn err(mut self, url: &str, e: &str) -> Self {
            self.responses.insert(url.to_string(), Err(e.to_string()));
            self
        }
    }

    #[async_trait]
    impl BannerFetcher for MockFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedImage, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .get(url)
                .cloned()
                .unwrap_or_else(|| Err("HTTP-Error: 404 Not Found".to_string()))
        }
    }

    #[tokio::test]
    async fn test_resolve_success_records_last_url() {
        let fetcher = MockFetcher::default().ok("https://img.test/a.png", "https://cdn.test/a.png", b"abc");
        let cache = ImageCache::new(Arc::new(fetcher));

        let source = cache.resolve_banner_source("https://img.test/a.png", None).await;
        assert_eq!(source, "data:image/png;base64,YWJj");
        assert_eq!(cache.last_banner_url().as_deref(), Some("https://cdn.test/a.png"));
    }

    #[tokio::test]
    async fn test_resolve_failures_yield_empty() {
        let fetcher = MockFetcher::default()
            .err("https://img.test/down.png", "Request failed: connection refused")
            .ok(
                "https://source.unsplash.com/1200x280?x",
                "https://images.unsplash.com/source-404?x",
                b"",
            );
        let cache = ImageCache::new(Arc::new(fetcher));

        assert_eq!(cache.resolve_banner_source("https://img.test/down.png", None).await, "");
        assert_eq!(cache.resolve_banner_source("https://img.test/missing.png", None).await, "");
        assert_eq!(
            cache
                .resolve_banner_source("https://source.unsplash.com/1200x280?x", None)
                .await,
            ""
        );
        assert!(cache.last_banner_url().is_none());
    }

    #[tokio::test]
    async fn test_data_url_passes_through_without_fetch() {
        let fetcher = Arc::new(MockFetcher::default());
        let cache = ImageCache::new(fetcher.clone());
        let source = cache.resolve_banner_source("data:image/png;base64,AAAA", None).await;
        assert_eq!(source, "data:image/png;base64,AAAA");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        assert!(cache.last_banner_url().is_none());
    }

    #[tokio::test]
    async fn test_inlined_default_records_its_origin() {
        let fetcher = Arc::new(MockFetcher::default().ok(
            "https://img.test/p.png",
            "https://cdn.test/p.png",
            b"p",
        ));
        let cache = ImageCache::new(fetcher.clone());
        let settings = normalize(&RawSettings::new().with(SettingKey::DefaultPageBanner, "https://img.test/p.png"));
        let warmed = cache.warm_cache(&settings, None).await;
        let inline = warmed.default_config.page.banner.unwrap();

        let source = cache.resolve_banner_source(&inline, None).await;
        assert_eq!(source, inline);
        assert_eq!(cache.last_banner_url().as_deref(), Some("https://cdn.test/p.png"));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_warm_defaults_memoises_and_skips_random_service() {
        let fetcher = Arc::new(MockFetcher::default().ok("https://img.test/j.png", "https://img.test/j.png", b"j"));
        let cache = ImageCache::new(fetcher.clone());

        let raw = RawSettings::new()
            .with(SettingKey::DefaultJournalBanner, "https://img.test/j.png")
            .with(SettingKey::DefaultPageBanner, "https://source.unsplash.com/random");
        let settings = normalize(&raw);

        let first = cache.warm_cache(&settings, None).await;
        let second = cache.warm_cache(&settings, None).await;

        assert_eq!(first.default_config.journal.banner.as_deref(), Some("data:image/png;base64,ag=="));
        assert_eq!(first.default_config.page.banner.as_deref(), Some("https://source.unsplash.com/random"));
        assert_eq!(first, second);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_warm_keeps_configured_url_on_failure() {
        let cache = ImageCache::new(Arc::new(MockFetcher::default()));
        let settings = normalize(&RawSettings::new().with(SettingKey::DefaultJournalBanner, "https://img.test/gone.png"));
        let warmed = cache.warm_cache(&settings, None).await;
        assert_eq!(warmed.default_config.journal.banner.as_deref(), Some("https://img.test/gone.png"));
    }

    #[test]
    fn test_random_service_detection() {
        assert!(is_random_service_url("https://source.unsplash.com/1200x280?lake"));
        assert!(!is_random_service_url("https://images.unsplash.com/photo-1"));
        assert!(!is_random_service_url("https://example.com/?q=source.unsplash.com"));
        assert!(!is_random_service_url("not a url"));
    }

    #[test]
    fn test_clean_banner_url() {
        assert_eq!(clean_banner_url("\"https://a.test/x.png\"", None), "https://a.test/x.png");
        assert_eq!(
            clean_banner_url("../assets/my image.png", Some("/home/me/graph")),
            "file:///home/me/graph/assets/my%20image.png"
        );
        assert_eq!(clean_banner_url("../assets/x.png", None), "../assets/x.png");
    }

    #[tokio::test]
    async fn test_local_file_banner() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("assets")).unwrap();
        std::fs::write(dir.path().join("assets/bg.png"), b"png!").unwrap();

        let cache = ImageCache::http().unwrap();
        let graph_path = dir.path().to_str().unwrap();
        let source = cache.resolve_banner_source("../assets/bg.png", Some(graph_path)).await;

        assert_eq!(source, format!("data:image/png;base64,{}", BASE64.encode(b"png!")));
        assert!(cache.last_banner_url().unwrap().starts_with("file://"));
    }
}

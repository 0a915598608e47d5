#![allow(dead_code)]

use async_trait::async_trait;
use banners_engine::config::Timings;
use banners_engine::image_cache::{BannerFetcher, FetchedImage};
use banners_engine::snapshot::SnapshotBlock;
use banners_engine::{BannerController, DomSurface, GraphSnapshot, ImageCache, QuoteExtractor, SnapshotHost};
use banners_types::{GraphInfo, PageData};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// =====================================================
// DOM
// =====================================================

#[derive(Debug, Clone, Default)]
pub struct DomState {
    pub page_type: Option<String>,
    pub vars: HashMap<String, String>,
    /// Values the host theme provides, e.g. `--ls-primary-text-color`
    pub theme: HashMap<String, String>,
    pub body_classes: HashSet<String>,
    pub widgets_classes: HashSet<String>,
    pub container: bool,
    pub container_visible: bool,
    pub calendar_visible: bool,
    pub quote_html: Option<String>,
    pub hidden_props: Vec<String>,
    pub has_pre_block: bool,
    pub watching: Option<u64>,
    pub watch_attaches: usize,
}

#[derive(Default)]
pub struct RecordingDom {
    state: Mutex<DomState>,
}

impl RecordingDom {
    pub fn new(page_type: Option<&str>) -> Self {
        let mut theme = HashMap::new();
        theme.insert("--ls-primary-text-color".to_string(), "#ffffff".to_string());
        theme.insert("--ls-primary-background-color".to_string(), "rgb(0, 43, 54)".to_string());
        Self {
            state: Mutex::new(DomState {
                page_type: page_type.map(str::to_string),
                theme,
                has_pre_block: true,
                ..Default::default()
            }),
        }
    }

    pub fn snapshot(&self) -> DomState {
        self.state.lock().clone()
    }

    pub fn var(&self, name: &str) -> Option<String> {
        self.state.lock().vars.get(name).cloned()
    }

    pub fn set_page_type(&self, page_type: Option<&str>) {
        self.state.lock().page_type = page_type.map(str::to_string);
    }

    pub fn set_theme_color(&self, name: &str, value: &str) {
        self.state.lock().theme.insert(name.to_string(), value.to_string());
    }
}

impl DomSurface for RecordingDom {
    fn page_type(&self) -> Option<String> {
        self.state.lock().page_type.clone()
    }

    fn set_style_var(&self, name: &str, value: &str) {
        self.state.lock().vars.insert(name.to_string(), value.to_string());
    }

    fn computed_style_var(&self, name: &str) -> Option<String> {
        let state = self.state.lock();
        state
            .vars
            .get(name)
            .or_else(|| state.theme.get(name))
            .filter(|v| !v.is_empty())
            .cloned()
    }

    fn toggle_body_class(&self, class: &str, on: bool) {
        let mut state = self.state.lock();
        if on {
            state.body_classes.insert(class.to_string());
        } else {
            state.body_classes.remove(class);
        }
    }

    fn ensure_container(&self) {
        self.state.lock().container = true;
    }

    fn set_container_visible(&self, visible: bool) {
        self.state.lock().container_visible = visible;
    }

    fn remove_container(&self) {
        let mut state = self.state.lock();
        state.container = false;
        state.container_visible = false;
        state.quote_html = None;
    }

    fn set_calendar_visible(&self, visible: bool) {
        self.state.lock().calendar_visible = visible;
    }

    fn toggle_widgets_class(&self, class: &str, on: bool) {
        let mut state = self.state.lock();
        if on {
            state.widgets_classes.insert(class.to_string());
        } else {
            state.widgets_classes.remove(class);
        }
    }

    fn set_quote_html(&self, html: Option<&str>) {
        self.state.lock().quote_html = html.map(str::to_string);
    }

    fn hide_page_props(&self, keys: &[&str]) {
        self.state.lock().hidden_props = keys.iter().map(|k| k.to_string()).collect();
    }

    fn watch_props(&self, watch_id: u64) -> bool {
        let mut state = self.state.lock();
        if !state.has_pre_block {
            return false;
        }
        assert!(state.watching.is_none(), "watch attached twice without detaching");
        state.watching = Some(watch_id);
        state.watch_attaches += 1;
        true
    }

    fn unwatch_props(&self) {
        self.state.lock().watching = None;
    }
}

// =====================================================
// Network
// =====================================================

#[derive(Default)]
pub struct MockFetcher {
    /// url -> (final url, body)
    images: Mutex<HashMap<String, (String, Vec<u8>)>>,
    delays: Mutex<HashMap<String, Duration>>,
    pub calls: AtomicUsize,
}

impl MockFetcher {
    pub fn serve(&self, url: &str, final_url: &str, body: &[u8]) {
        self.images
            .lock()
            .insert(url.to_string(), (final_url.to_string(), body.to_vec()));
    }

    pub fn delay(&self, url: &str, delay: Duration) {
        self.delays.lock().insert(url.to_string(), delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BannerFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delays.lock().get(url).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let served = self.images.lock().get(url).cloned();
        match served {
            Some((final_url, bytes)) => Ok(FetchedImage {
                final_url,
                content_type: Some("image/jpeg".to_string()),
                bytes,
            }),
            None => Err("HTTP-Error: 404 Not Found".to_string()),
        }
    }
}

// =====================================================
// Fixtures
// =====================================================

pub const JOURNAL_BANNER: &str = "https://img.test/journal.jpg";
pub const PAGE_BANNER: &str = "https://img.test/page.jpg";

pub fn graph() -> GraphInfo {
    GraphInfo {
        name: "notes".to_string(),
        path: "/home/me/notes".to_string(),
        url: None,
    }
}

pub fn page(id: i64, name: &str, properties: Value) -> PageData {
    PageData {
        id: Some(id),
        name: Some(name.to_lowercase()),
        original_name: Some(name.to_string()),
        properties: serde_json::from_value(properties).ok(),
        ..Default::default()
    }
}

pub fn block(uuid: &str, content: &str, page: Option<&str>, refs: &[&str]) -> SnapshotBlock {
    SnapshotBlock {
        uuid: uuid.to_string(),
        content: content.to_string(),
        page: page.map(str::to_string),
        refs: refs.iter().map(|r| r.to_string()).collect(),
        ..Default::default()
    }
}

pub fn base_settings() -> Value {
    serde_json::json!({
        "defaultJournalBanner": JOURNAL_BANNER,
        "defaultPageBanner": PAGE_BANNER,
        "widgetsQuoteTag": "#quote",
    })
}

pub struct Harness {
    pub host: Arc<SnapshotHost>,
    pub dom: Arc<RecordingDom>,
    pub fetcher: Arc<MockFetcher>,
    pub images: Arc<ImageCache>,
    pub controller: Arc<BannerController>,
}

impl Harness {
    pub fn new(snapshot: GraphSnapshot) -> Self {
        let fetcher = Arc::new(MockFetcher::default());
        fetcher.serve(JOURNAL_BANNER, JOURNAL_BANNER, b"journal");
        fetcher.serve(PAGE_BANNER, PAGE_BANNER, b"page");

        let dom = Arc::new(RecordingDom::new(snapshot.page_type.as_deref()));
        let host = Arc::new(SnapshotHost::new(snapshot));
        let images = Arc::new(ImageCache::new(fetcher.clone()));
        let quotes = QuoteExtractor::with_seed(host.clone(), 1);
        let controller = BannerController::new(host.clone(), dom.clone(), images.clone(), quotes, Timings::immediate());

        Self {
            host,
            dom,
            fetcher,
            images,
            controller,
        }
    }

    pub fn navigate(&self, page_type: Option<&str>, current_page: Option<PageData>) {
        self.host.navigate(page_type, current_page);
        self.dom.set_page_type(page_type);
    }
}

/// Let spawned settle tasks run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

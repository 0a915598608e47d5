//! ReactiveController: host events in, render passes out.
//!
//! One render pass at a time. Starting a pass cancels the previous one, which
//! stops at its next await point; the render lock keeps DOM writes of two
//! passes from interleaving. Settings and graph identity are swapped
//! wholesale and snapshotted into a `RenderSession` per pass.
//!
//! Teardown is final: handlers still in flight stop at their next await
//! point and make no further DOM writes.

use banners_types::{AssetData, GraphInfo, MsgSeverity};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::{css, defaults, Timings};
use crate::host::{current_page_data, HostApi};
use crate::image_cache::{clean_banner_url, ImageCache};
use crate::page::PageContext;
use crate::quote::QuoteExtractor;
use crate::render::{BannerDom, DomSurface};
use crate::resolver::{self, is_falsy_banner};
use crate::session::RenderSession;
use crate::settings::normalize::normalize_unit_value;
use crate::settings::{normalize, NormalizedSettings, RawSettings, UnitBounds};

/// What happened to the page's properties block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropsChange {
    /// The properties block was removed
    Deleted,
    /// Properties were edited or added
    Edited,
}

/// Map a raw class-attribute mutation inside the watched block to a change.
///
/// `old_class` is the attribute's previous value, `target_in_pre_block`
/// whether the mutated element sits inside the properties block.
pub fn classify_props_mutation(old_class: Option<&str>, target_in_pre_block: bool) -> Option<PropsChange> {
    let old_class = old_class?;
    if old_class.contains("pre-block") {
        return Some(PropsChange::Deleted);
    }
    if target_in_pre_block && old_class == "editor-wrapper" {
        return Some(PropsChange::Edited);
    }
    None
}

#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    InitialLoad,
    SettingsChanged(RawSettings),
    RouteChanged,
    /// Properties edited while watch `watch_id` was attached
    PropsEdited { watch_id: u64, change: PropsChange },
    ThemeModeChanged,
    GraphChanged,
    /// "Save banner for this page" command
    SaveBanner,
    BeforeUnload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Not a page or home surface
    Hidden,
    /// Banner resolved to nothing
    Cleared,
    Rendered(AssetData),
    /// A newer pass or teardown took over
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { banner: String, align: String },
    /// Page already has a different `banner` property
    Conflict,
    /// No page, or no fetched banner to save
    NothingToSave,
    Failed(String),
}

pub struct BannerController {
    host: Arc<dyn HostApi>,
    dom: BannerDom,
    images: Arc<ImageCache>,
    quotes: QuoteExtractor,
    timings: Timings,
    settings: RwLock<Arc<NormalizedSettings>>,
    settings_generation: AtomicU64,
    graph: RwLock<Option<Arc<GraphInfo>>>,
    render_lock: tokio::sync::Mutex<()>,
    current_pass: Mutex<CancellationToken>,
    /// Bumped on every detach and scheduled attach; stale attaches are dropped
    watch_seq: AtomicU64,
    /// Watch id currently attached, 0 when detached
    active_watch: AtomicU64,
    shut_down: AtomicBool,
}

impl BannerController {
    pub fn new(
        host: Arc<dyn HostApi>,
        surface: Arc<dyn DomSurface>,
        images: Arc<ImageCache>,
        quotes: QuoteExtractor,
        timings: Timings,
    ) -> Arc<Self> {
        Arc::new(Self {
            host,
            dom: BannerDom::new(surface),
            images,
            quotes,
            timings,
            settings: RwLock::new(Arc::new(NormalizedSettings::default())),
            settings_generation: AtomicU64::new(0),
            graph: RwLock::new(None),
            render_lock: tokio::sync::Mutex::new(()),
            current_pass: Mutex::new(CancellationToken::new()),
            watch_seq: AtomicU64::new(0),
            active_watch: AtomicU64::new(0),
            shut_down: AtomicBool::new(false),
        })
    }

    pub fn settings(&self) -> Arc<NormalizedSettings> {
        self.settings.read().clone()
    }

    pub fn graph(&self) -> Option<Arc<GraphInfo>> {
        self.graph.read().clone()
    }

    pub fn active_watch(&self) -> Option<u64> {
        match self.active_watch.load(Ordering::SeqCst) {
            0 => None,
            id => Some(id),
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    fn session(&self, page: PageContext) -> RenderSession {
        RenderSession::new(self.settings(), self.graph(), page)
    }

    /// Consume host events until the channel closes. Each event runs on its
    /// own task so a new render can supersede one still in flight.
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<HostEvent>) {
        log::info!("[BANNERS] Controller started");
        while let Some(event) = events.recv().await {
            let controller = self.clone();
            tokio::spawn(async move {
                controller.handle(event).await;
            });
        }
        log::info!("[BANNERS] Event channel closed, controller stopped");
    }

    pub async fn handle(self: &Arc<Self>, event: HostEvent) {
        if self.is_shut_down() {
            log::debug!("[BANNERS] Ignoring {:?} after teardown", event);
            return;
        }
        match event {
            HostEvent::InitialLoad => {
                log::info!("[BANNERS] Loaded");
                self.dom.ensure_placeholder();
                tokio::time::sleep(self.timings.initial_render).await;
                if self.is_shut_down() {
                    return;
                }
                self.refresh_graph().await;
                let raw = match self.host.settings().await {
                    Ok(raw) => raw,
                    Err(e) => {
                        log::warn!("[SETTINGS] Failed to read settings, using defaults: {}", e);
                        RawSettings::default()
                    }
                };
                self.apply_settings(&raw).await;
                self.render().await;
                self.schedule_props_watch();
            }
            HostEvent::SettingsChanged(raw) => {
                log::debug!("[BANNERS] Settings changed");
                self.apply_settings(&raw).await;
                self.render().await;
            }
            HostEvent::RouteChanged => {
                log::debug!("[BANNERS] Page route changed");
                self.stop_props_watch();
                self.render().await;
                self.schedule_props_watch();
            }
            HostEvent::PropsEdited { watch_id, change } => {
                if watch_id == 0 || self.active_watch() != Some(watch_id) {
                    log::debug!("[BANNERS] Ignoring props change from stale watch {}", watch_id);
                    return;
                }
                log::info!("[BANNERS] Page props - {:?}", change);
                self.render().await;
            }
            HostEvent::ThemeModeChanged => {
                let controller = self.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(controller.timings.theme_settle).await;
                    if !controller.is_shut_down() {
                        controller.dom.sample_colors();
                    }
                });
            }
            HostEvent::GraphChanged => self.refresh_graph().await,
            HostEvent::SaveBanner => {
                self.save_banner().await;
            }
            HostEvent::BeforeUnload => self.teardown(),
        }
    }

    pub async fn refresh_graph(&self) {
        match self.host.current_graph().await {
            Ok(graph) => {
                log::debug!(
                    "[BANNERS] Current graph: {}",
                    graph.as_ref().map(|g| g.name.as_str()).unwrap_or("none")
                );
                *self.graph.write() = graph.map(Arc::new);
            }
            Err(e) => log::warn!("[BANNERS] Failed to get current graph: {}", e),
        }
    }

    /// Normalise, inline default banners, then swap the configuration in.
    /// A slower, older rebuild never overwrites a newer one.
    pub async fn apply_settings(&self, raw: &RawSettings) {
        let generation = self.settings_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let normalized = normalize(raw);

        let graph = self.graph();
        let graph_path = graph.as_deref().map(|g| g.path.as_str());
        let warmed = self.images.warm_cache(&normalized, graph_path).await;

        if self.is_shut_down() {
            return;
        }
        if self.settings_generation.load(Ordering::SeqCst) != generation {
            log::debug!("[SETTINGS] Dropping superseded settings rebuild {}", generation);
            return;
        }

        self.dom.apply_widget_vars(&warmed.widgets_config);
        *self.settings.write() = Arc::new(warmed);
        self.dom.sample_colors();
    }

    /// Run one render pass, superseding any pass in flight.
    pub async fn render(&self) -> RenderOutcome {
        let token = {
            let mut current = self.current_pass.lock();
            current.cancel();
            let token = CancellationToken::new();
            *current = token.clone();
            token
        };
        // teardown sets the flag before cancelling, so one of the two is seen
        if self.is_shut_down() {
            token.cancel();
            return RenderOutcome::Superseded;
        }

        let _guard = tokio::select! {
            biased;
            _ = token.cancelled() => {
                log::debug!("[BANNERS] Render superseded before start");
                return RenderOutcome::Superseded;
            }
            guard = self.render_lock.lock() => guard,
        };

        tokio::select! {
            biased;
            _ = token.cancelled() => {
                log::debug!("[BANNERS] Render superseded");
                RenderOutcome::Superseded
            }
            outcome = self.render_pass() => outcome,
        }
    }

    async fn render_pass(&self) -> RenderOutcome {
        if self.is_shut_down() {
            return RenderOutcome::Superseded;
        }
        let page_context = PageContext::classify(self.dom.page_type().as_deref());
        if !page_context.shows_banner() {
            self.dom.hide_banner();
            self.images.clear_last_banner_url();
            return RenderOutcome::Hidden;
        }

        self.dom.hide_plugin_props();

        let page = if page_context.is_page() {
            current_page_data(self.host.as_ref()).await
        } else {
            None
        };
        if self.is_shut_down() {
            return RenderOutcome::Superseded;
        }
        let page_context = page_context.with_journal(page.as_ref().is_some_and(|p| p.journal));
        let session = self.session(page_context);

        let asset = resolver::resolve(&session, page.as_ref());
        let Some(banner) = asset.banner.as_deref().filter(|b| !is_falsy_banner(Some(*b))) else {
            self.dom.hide_banner();
            self.images.clear_last_banner_url();
            return RenderOutcome::Cleared;
        };

        let mut source = self.images.resolve_banner_source(banner, session.graph_path()).await;
        if self.is_shut_down() {
            return RenderOutcome::Superseded;
        }
        if source.is_empty() {
            let fallback = session.settings.default_config.page.banner.as_deref();
            match fallback.filter(|b| !is_falsy_banner(Some(*b))) {
                Some(fallback) => {
                    log::debug!("[BANNERS] Falling back to the default page banner");
                    source = clean_banner_url(fallback, session.graph_path());
                }
                None => {
                    self.dom.hide_banner();
                    return RenderOutcome::Cleared;
                }
            }
        }

        self.dom.show_banner(&asset, &source);

        let quote = self.quotes.get_random_quote(&session).await;
        if self.is_shut_down() {
            return RenderOutcome::Superseded;
        }
        self.dom.render_widgets(&session, quote.as_ref());

        RenderOutcome::Rendered(asset)
    }

    pub fn stop_props_watch(&self) {
        self.watch_seq.fetch_add(1, Ordering::SeqCst);
        self.active_watch.store(0, Ordering::SeqCst);
        self.dom.surface().unwatch_props();
    }

    /// Re-attach the properties watch once the page has settled.
    pub fn schedule_props_watch(self: &Arc<Self>) {
        let watch_id = self.watch_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let controller = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(controller.timings.observer_settle).await;
            if controller.is_shut_down() || controller.watch_seq.load(Ordering::SeqCst) != watch_id {
                return;
            }
            let surface = controller.dom.surface();
            surface.unwatch_props();
            if surface.watch_props(watch_id) {
                controller.active_watch.store(watch_id, Ordering::SeqCst);
                log::debug!("[BANNERS] Watching page props ({})", watch_id);
            } else {
                controller.active_watch.store(0, Ordering::SeqCst);
            }
            if controller.is_shut_down() {
                controller.active_watch.store(0, Ordering::SeqCst);
                surface.unwatch_props();
            }
        });
    }

    /// Write the last fetched banner and the current alignment to the page's
    /// properties block, unless the page already names a different banner.
    pub async fn save_banner(&self) -> SaveOutcome {
        let Some(page) = current_page_data(self.host.as_ref()).await else {
            log::warn!("[BANNERS] Save banner: no current page");
            return SaveOutcome::NothingToSave;
        };
        let Some(current_banner) = self.images.last_banner_url() else {
            log::warn!("[BANNERS] Save banner: no fetched banner on this page");
            return SaveOutcome::NothingToSave;
        };

        let page_banner = page.property("banner").and_then(resolver::property_text);
        if page_banner.as_deref().is_some_and(|b| !b.is_empty() && b != current_banner) {
            self.host
                .show_msg(
                    "There is the \"banner\" property in this page with a different value. Remove it manually and run this command again.",
                    MsgSeverity::Warning,
                    Some(defaults::CONFLICT_TOAST_TIMEOUT_MS),
                )
                .await;
            return SaveOutcome::Conflict;
        }

        let align = page
            .property("banner-align")
            .and_then(resolver::property_text)
            .or_else(|| self.dom.surface().computed_style_var(css::BANNER_ALIGN))
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| normalize_unit_value(None, &UnitBounds::BANNER_ALIGN));

        let Some(page_name) = page.name.clone().or_else(|| page.original_name.clone()) else {
            return SaveOutcome::Failed("Current page has no name".to_string());
        };

        match self.write_banner_props(&page_name, &current_banner, &align).await {
            Ok(()) => {
                self.host
                    .show_msg("Current banner saved to page properties", MsgSeverity::Success, None)
                    .await;
                SaveOutcome::Saved {
                    banner: current_banner,
                    align,
                }
            }
            Err(e) => {
                log::error!("[BANNERS] Save banner failed: {}", e);
                SaveOutcome::Failed(e)
            }
        }
    }

    async fn write_banner_props(&self, page_name: &str, banner: &str, align: &str) -> Result<(), String> {
        let blocks = self.host.page_blocks_tree(page_name).await?;
        let properties_block = blocks
            .first()
            .ok_or_else(|| format!("Page '{}' has no blocks", page_name))?;

        self.host
            .upsert_block_property(&properties_block.uuid, "banner", banner)
            .await?;
        self.host
            .upsert_block_property(&properties_block.uuid, "banner-align", align)
            .await?;
        Ok(())
    }

    /// Remove everything injected and cancel any pass in flight. Later
    /// events are ignored.
    pub fn teardown(&self) {
        log::info!("[BANNERS] Unloading");
        self.shut_down.store(true, Ordering::SeqCst);
        self.current_pass.lock().cancel();
        self.watch_seq.fetch_add(1, Ordering::SeqCst);
        self.active_watch.store(0, Ordering::SeqCst);
        self.dom.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_props_mutation() {
        assert_eq!(
            classify_props_mutation(Some("flex pre-block ls-block"), false),
            Some(PropsChange::Deleted)
        );
        assert_eq!(classify_props_mutation(Some("editor-wrapper"), true), Some(PropsChange::Edited));
        assert_eq!(classify_props_mutation(Some("editor-wrapper"), false), None);
        assert_eq!(classify_props_mutation(Some("block-content"), true), None);
        assert_eq!(classify_props_mutation(None, true), None);
    }
}

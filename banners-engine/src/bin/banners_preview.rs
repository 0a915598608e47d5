//! Resolve the banner, widgets and quote for a graph snapshot and print them as JSON.
//!
//! `--schema` prints the settings schema instead.

use banners_engine::config::{self, PLUGIN_ID};
use banners_engine::host::current_page_data;
use banners_engine::image_cache::ImageCache;
use banners_engine::resolver::{self, is_falsy_banner};
use banners_engine::settings::settings_schema;
use banners_engine::{normalize, HostApi, PageContext, QuoteExtractor, RawSettings, RenderSession, SnapshotHost};
use dotenv::dotenv;
use serde_json::json;
use std::sync::Arc;

/// Long data URLs are shortened for display.
fn describe_source(source: &str) -> String {
    match source.split_once(";base64,") {
        Some((head, data)) => format!("{};base64,... ({} chars)", head, data.len()),
        None => source.to_string(),
    }
}

async fn load_settings(host: &SnapshotHost) -> RawSettings {
    let path = config::settings_path();
    match tokio::fs::read_to_string(&path).await {
        Ok(content) => match RawSettings::from_json(&content) {
            Ok(raw) => return raw,
            Err(e) => log::warn!("[SETTINGS] {} in {}, using snapshot settings", e, path.display()),
        },
        Err(_) => log::debug!("[SETTINGS] No settings file at {}, using snapshot settings", path.display()),
    }
    host.settings().await.unwrap_or_default()
}

async fn run() -> Result<(), String> {
    if std::env::args().any(|arg| arg == "--schema") {
        let schema = serde_json::to_string_pretty(&settings_schema())
            .map_err(|e| format!("Failed to render schema: {}", e))?;
        println!("{}", schema);
        return Ok(());
    }

    let host = Arc::new(SnapshotHost::load(&config::snapshot_path()).await?);
    let raw = load_settings(&host).await;
    let fetch = config::fetch_enabled();

    let graph = host.current_graph().await?.map(Arc::new);
    let graph_path = graph.as_deref().map(|g| g.path.clone());

    let images = ImageCache::http()?;
    let mut settings = normalize(&raw);
    if fetch {
        settings = images.warm_cache(&settings, graph_path.as_deref()).await;
    }

    let mut page_context = PageContext::classify(host.page_type().as_deref());
    let page = if page_context.is_page() {
        current_page_data(host.as_ref()).await
    } else {
        None
    };
    page_context = page_context.with_journal(page.as_ref().is_some_and(|p| p.journal));

    let session = RenderSession::new(Arc::new(settings), graph, page_context);
    let asset = if page_context.shows_banner() {
        resolver::resolve(&session, page.as_ref())
    } else {
        Default::default()
    };

    let banner_source = match asset.banner.as_deref() {
        Some(banner) if fetch && !is_falsy_banner(Some(banner)) => {
            Some(images.resolve_banner_source(banner, session.graph_path()).await)
        }
        _ => None,
    };

    let quotes = QuoteExtractor::new(host.clone());
    let quote = quotes.get_random_quote(&session).await;

    let report = json!({
        "plugin": PLUGIN_ID,
        "page": page_context,
        "asset": asset,
        "bannerSource": banner_source.as_deref().map(describe_source),
        "lastBannerUrl": images.last_banner_url(),
        "widgets": session.settings.widgets_config,
        "quote": quote,
    });
    let output = serde_json::to_string_pretty(&report).map_err(|e| format!("Failed to render report: {}", e))?;
    println!("{}", output);
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    log::info!("{} preview v{}", PLUGIN_ID, env!("CARGO_PKG_VERSION"));
    if let Err(e) = run().await {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

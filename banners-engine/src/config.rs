use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Plugin identifier used in log lines and host registration
pub const PLUGIN_ID: &str = "logseq-banners-plugin";

/// Environment variable names - single source of truth
pub mod env_vars {
    /// Path to a JSON file holding the host's flat settings object.
    pub const SETTINGS_PATH: &str = "BANNERS_SETTINGS_PATH";
    /// Path to a JSON graph snapshot (see `snapshot::GraphSnapshot`).
    pub const SNAPSHOT_PATH: &str = "BANNERS_SNAPSHOT_PATH";
    /// Set to "false" or "0" to skip network fetches in the preview binary.
    pub const FETCH: &str = "BANNERS_FETCH";
}

/// Default values
pub mod defaults {
    pub const SETTINGS_PATH: &str = "./banners-settings.json";
    pub const SNAPSHOT_PATH: &str = "./graph-snapshot.json";

    pub const PAGE_BANNER: &str = "https://wallpaperaccess.com/full/1146672.jpg";
    pub const JOURNAL_BANNER: &str = "https://images.unsplash.com/photo-1646026371686-79950ceb6daa?ixlib=rb-1.2.1&ixid=MnwxMjA3fDB8MHxwaG90by1wYWdlfHx8fGVufDB8fHx8&auto=format&fit=crop&w=1034&q=80";

    /// `{height}` is the banner height in px without unit, `{title}` the derived page title.
    pub const AUTO_BANNER_URL_PATTERN: &str = "https://source.unsplash.com/1200x{height}?{title}";

    pub const AUTO_TITLE_MIN_WORD_LENGTH: usize = 3;
    pub const AUTO_TITLE_MAX_WORDS: usize = 3;

    pub const HTTP_TIMEOUT_SECS: u64 = 30;
    /// Max number of inlined default banners kept in memory
    pub const INLINE_CACHE_CAPACITY: u64 = 16;

    pub const INITIAL_RENDER_DELAY_MS: u64 = 500;
    pub const OBSERVER_SETTLE_MS: u64 = 200;
    pub const THEME_SETTLE_MS: u64 = 300;
    pub const CONFLICT_TOAST_TIMEOUT_MS: u64 = 10_000;
}

/// Host serving random images per request; its URLs are never inlined.
pub const RANDOM_IMAGE_SERVICE_HOST: &str = "source.unsplash.com";

/// Substring of a redirected URL that the random image service uses for "no image".
pub const NOT_FOUND_URL_MARKER: &str = "source-404";

/// Banner values meaning "no banner".
pub const FALSY_BANNER_VALUES: &[&str] = &["", "false", "off", "none", "\"\"", "''"];

/// Page properties owned by the plugin, hidden from the properties block.
pub const PLUGIN_PAGE_PROPS: &[&str] = &["banner", "banner-align", "color"];

/// Host page types that count as the home / all-journals surface.
pub const HOME_PAGE_TYPES: &[&str] = &["home", "all-journals"];
pub const PAGE_PAGE_TYPE: &str = "page";

/// CSS hooks consumed by the styling layer
pub mod css {
    pub const BANNER_ACTIVE_CLASS: &str = "is-banner-active";
    pub const ICON_ACTIVE_CLASS: &str = "is-icon-active";
    pub const WIDGETS_BG_CLASS: &str = "banner-widgets-bg";

    pub const PAGE_BANNER: &str = "--pageBanner";
    pub const BANNER_HEIGHT: &str = "--bannerHeight";
    pub const BANNER_ALIGN: &str = "--bannerAlign";
    pub const CALENDAR_WIDTH: &str = "--widgetsCalendarWidth";
    pub const QUOTE_FONT_SIZE: &str = "--widgetsQuoteFS";
    pub const QUOTE_SIZE: &str = "--widgetsQuoteSize";
    pub const QUOTE_MAX_WIDTH: &str = "--widgetsQuoteMaxWidth";
    pub const WIDGETS_TEXT_COLOR: &str = "--widgetsTextColor";
    pub const WIDGETS_BG_COLOR: &str = "--widgetsBgColor";

    pub const HOST_PRIMARY_TEXT_COLOR: &str = "--ls-primary-text-color";
    pub const HOST_PRIMARY_BG_COLOR: &str = "--ls-primary-background-color";
}

/// Timings for the advisory settle delays.
#[derive(Debug, Clone, Copy)]
pub struct Timings {
    pub initial_render: Duration,
    pub observer_settle: Duration,
    pub theme_settle: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            initial_render: Duration::from_millis(defaults::INITIAL_RENDER_DELAY_MS),
            observer_settle: Duration::from_millis(defaults::OBSERVER_SETTLE_MS),
            theme_settle: Duration::from_millis(defaults::THEME_SETTLE_MS),
        }
    }
}

impl Timings {
    /// No delays at all; used by tests and headless hosts.
    pub fn immediate() -> Self {
        Self {
            initial_render: Duration::ZERO,
            observer_settle: Duration::ZERO,
            theme_settle: Duration::ZERO,
        }
    }
}

/// Get the settings file path for the preview binary
pub fn settings_path() -> PathBuf {
    PathBuf::from(env::var(env_vars::SETTINGS_PATH).unwrap_or_else(|_| defaults::SETTINGS_PATH.to_string()))
}

/// Get the graph snapshot path for the preview binary
pub fn snapshot_path() -> PathBuf {
    PathBuf::from(env::var(env_vars::SNAPSHOT_PATH).unwrap_or_else(|_| defaults::SNAPSHOT_PATH.to_string()))
}

/// Whether the preview binary may hit the network (default: true)
pub fn fetch_enabled() -> bool {
    env::var(env_vars::FETCH)
        .map(|v| !matches!(v.trim().to_lowercase().as_str(), "false" | "0"))
        .unwrap_or(true)
}

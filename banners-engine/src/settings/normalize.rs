//! Raw settings -> validated, typed configuration.
//!
//! Pure and synchronous. Default banners are inlined afterwards by
//! `ImageCache::warm_defaults`, never from here.

use banners_types::{AssetData, CalendarConfig, DefaultConfig, QuoteConfig, WidgetMode, WidgetsConfig};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

use super::{RawSettings, SettingKey};
use crate::config::defaults;

/// Declared range and unit of a numeric-with-unit setting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitBounds {
    pub unit: &'static str,
    pub default: f64,
    pub min: f64,
    pub max: Option<f64>,
}

impl UnitBounds {
    pub const CALENDAR_WIDTH: UnitBounds = UnitBounds { unit: "px", default: 380.0, min: 380.0, max: None };
    pub const BANNER_HEIGHT: UnitBounds = UnitBounds { unit: "px", default: 280.0, min: 280.0, max: None };
    pub const BANNER_ALIGN: UnitBounds = UnitBounds { unit: "%", default: 50.0, min: 0.0, max: Some(100.0) };
    pub const QUOTE_MAX_WIDTH: UnitBounds = UnitBounds { unit: "ch", default: 48.0, min: 48.0, max: None };
    pub const QUOTE_SIZE: UnitBounds = UnitBounds { unit: "%", default: 100.0, min: 20.0, max: None };

    /// Bounds for a settings key, if it is a numeric-with-unit setting
    pub fn for_key(key: SettingKey) -> Option<UnitBounds> {
        match key {
            SettingKey::WidgetsCalendarWidth => Some(Self::CALENDAR_WIDTH),
            SettingKey::JournalBannerHeight | SettingKey::PageBannerHeight => Some(Self::BANNER_HEIGHT),
            SettingKey::JournalBannerAlign | SettingKey::PageBannerAlign => Some(Self::BANNER_ALIGN),
            SettingKey::WidgetsQuoteMaxWidth => Some(Self::QUOTE_MAX_WIDTH),
            SettingKey::WidgetsQuoteSize => Some(Self::QUOTE_SIZE),
            _ => None,
        }
    }

    fn clamp(&self, value: f64) -> f64 {
        let floored = value.max(self.min);
        match self.max {
            Some(max) => floored.min(max),
            None => floored,
        }
    }
}

/// Normalise one numeric-with-unit value to `"<number><unit>"`.
///
/// Missing or empty -> default; unit suffix stripped once; unparsable ->
/// default; clamped to bounds; unit re-appended.
pub fn normalize_unit_value(raw: Option<&str>, bounds: &UnitBounds) -> String {
    let number = raw
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| value.strip_suffix(bounds.unit).unwrap_or(value).trim())
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(bounds.default);

    format!("{}{}", format_number(bounds.clamp(number)), bounds.unit)
}

/// Plain decimal, no exponent and no trailing `.0`.
fn format_number(value: f64) -> String {
    if value == 0.0 {
        // -0 prints with its sign
        "0".to_string()
    } else {
        format!("{}", value)
    }
}

/// Numeric part of a normalised value, e.g. `"280px"` -> `"280"`.
pub fn strip_unit<'a>(value: &'a str, bounds: &UnitBounds) -> &'a str {
    value.trim().strip_suffix(bounds.unit).unwrap_or(value).trim()
}

/// Non-visual switches derived from settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingsFlags {
    pub auto_page_banner: bool,
    pub auto_title_strip_prefix: Option<String>,
    pub auto_title_min_word_length: usize,
    pub quote_cleanup_before: Vec<String>,
    pub quote_cleanup_after: Vec<String>,
}

impl Default for SettingsFlags {
    fn default() -> Self {
        Self {
            auto_page_banner: false,
            auto_title_strip_prefix: None,
            auto_title_min_word_length: defaults::AUTO_TITLE_MIN_WORD_LENGTH,
            quote_cleanup_before: Vec::new(),
            quote_cleanup_after: Vec::new(),
        }
    }
}

/// Output of `normalize`, immutable until the next settings change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedSettings {
    pub default_config: DefaultConfig,
    pub widgets_config: WidgetsConfig,
    /// Banner overrides keyed by lower-cased page-type tag
    pub custom_props: BTreeMap<String, AssetData>,
    pub flags: SettingsFlags,
}

impl Default for NormalizedSettings {
    fn default() -> Self {
        normalize(&RawSettings::default())
    }
}

impl NormalizedSettings {
    /// Render back into the host's flat settings shape.
    pub fn to_raw(&self) -> RawSettings {
        let journal = &self.default_config.journal;
        let page = &self.default_config.page;
        let widgets = &self.widgets_config;

        let mut raw = RawSettings::new()
            .with(SettingKey::WidgetsCalendarEnabled, widgets.calendar.enabled.as_ref())
            .with(SettingKey::WidgetsCalendarWidth, widgets.calendar.width.as_str())
            .with(SettingKey::WidgetsQuoteEnabled, widgets.quote.enabled.as_ref())
            .with(SettingKey::WidgetsQuoteTag, format!("#{}", widgets.quote.tag))
            .with(SettingKey::WidgetsQuoteMaxWidth, widgets.quote.max_width.as_str())
            .with(SettingKey::WidgetsQuoteSize, widgets.quote.size.as_str())
            .with(SettingKey::AutoPageBanner, self.flags.auto_page_banner)
            .with(
                SettingKey::Advanced,
                json!({
                    "quoteCleanupBefore": self.flags.quote_cleanup_before,
                    "quoteCleanupAfter": self.flags.quote_cleanup_after,
                    "autoTitleStripPrefix": self.flags.auto_title_strip_prefix,
                    "autoTitleMinWordLength": self.flags.auto_title_min_word_length,
                }),
            );

        let fields = [
            (SettingKey::DefaultJournalBanner, &journal.banner),
            (SettingKey::JournalBannerHeight, &journal.banner_height),
            (SettingKey::JournalBannerAlign, &journal.banner_align),
            (SettingKey::DefaultPageBanner, &page.banner),
            (SettingKey::PageBannerHeight, &page.banner_height),
            (SettingKey::PageBannerAlign, &page.banner_align),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                raw.set(key, value.as_str());
            }
        }

        let custom: serde_json::Map<String, Value> = self
            .custom_props
            .iter()
            .filter_map(|(tag, asset)| serde_json::to_value(asset).ok().map(|v| (tag.clone(), v)))
            .collect();
        raw.set(SettingKey::CustomProps, Value::Object(custom));

        raw
    }
}

fn unit_setting(raw: &RawSettings, key: SettingKey) -> String {
    let bounds = UnitBounds::for_key(key).unwrap_or(UnitBounds::BANNER_HEIGHT);
    normalize_unit_value(raw.text(key).as_deref(), &bounds)
}

/// Banner URL setting: missing -> built-in default, explicit empty stays empty (disabled).
fn banner_setting(raw: &RawSettings, key: SettingKey) -> String {
    match raw.text(key) {
        Some(value) => value.trim().to_string(),
        None => key.default_value().unwrap_or_default().to_string(),
    }
}

fn mode_setting(raw: &RawSettings, key: SettingKey) -> WidgetMode {
    raw.text(key)
        .map(|value| WidgetMode::from_str_or_default(&value))
        .unwrap_or_default()
}

fn quote_tag(raw: &RawSettings) -> String {
    let fallback = SettingKey::WidgetsQuoteTag.default_value().unwrap_or("#quote");
    let tag = raw.text(SettingKey::WidgetsQuoteTag).unwrap_or_default();
    let tag = tag.trim().trim_start_matches('#').trim();
    if tag.is_empty() {
        fallback.trim_start_matches('#').to_string()
    } else {
        tag.to_string()
    }
}

/// Clamp the optional height/align of a custom-props override.
fn normalize_override(asset: &AssetData) -> AssetData {
    AssetData {
        title: None,
        banner: asset.banner.as_ref().map(|b| b.trim().to_string()),
        banner_height: asset
            .banner_height
            .as_deref()
            .map(|h| normalize_unit_value(Some(h), &UnitBounds::BANNER_HEIGHT)),
        banner_align: asset
            .banner_align
            .as_deref()
            .map(|a| normalize_unit_value(Some(a), &UnitBounds::BANNER_ALIGN)),
    }
}

/// Turn the host's raw settings into typed configuration.
pub fn normalize(raw: &RawSettings) -> NormalizedSettings {
    let advanced = raw.advanced();

    let default_config = DefaultConfig {
        page: AssetData {
            title: None,
            banner: Some(banner_setting(raw, SettingKey::DefaultPageBanner)),
            banner_height: Some(unit_setting(raw, SettingKey::PageBannerHeight)),
            banner_align: Some(unit_setting(raw, SettingKey::PageBannerAlign)),
        },
        journal: AssetData {
            title: None,
            banner: Some(banner_setting(raw, SettingKey::DefaultJournalBanner)),
            banner_height: Some(unit_setting(raw, SettingKey::JournalBannerHeight)),
            banner_align: Some(unit_setting(raw, SettingKey::JournalBannerAlign)),
        },
    };

    let widgets_config = WidgetsConfig {
        calendar: CalendarConfig {
            enabled: mode_setting(raw, SettingKey::WidgetsCalendarEnabled),
            width: unit_setting(raw, SettingKey::WidgetsCalendarWidth),
        },
        quote: QuoteConfig {
            enabled: mode_setting(raw, SettingKey::WidgetsQuoteEnabled),
            tag: quote_tag(raw),
            max_width: unit_setting(raw, SettingKey::WidgetsQuoteMaxWidth),
            size: unit_setting(raw, SettingKey::WidgetsQuoteSize),
        },
    };

    let custom_props = raw
        .custom_props()
        .iter()
        .map(|(tag, asset)| (tag.clone(), normalize_override(asset)))
        .collect();

    let flags = SettingsFlags {
        auto_page_banner: raw.flag(SettingKey::AutoPageBanner).unwrap_or(false),
        auto_title_strip_prefix: advanced
            .auto_title_strip_prefix
            .map(|prefix| prefix.trim().to_string())
            .filter(|prefix| !prefix.is_empty()),
        auto_title_min_word_length: advanced
            .auto_title_min_word_length
            .unwrap_or(defaults::AUTO_TITLE_MIN_WORD_LENGTH),
        quote_cleanup_before: advanced.quote_cleanup_before,
        quote_cleanup_after: advanced.quote_cleanup_after,
    };

    log::debug!(
        "[SETTINGS] Normalised: calendar={} quote={} (#{}) auto_page_banner={}",
        widgets_config.calendar.enabled.as_ref(),
        widgets_config.quote.enabled.as_ref(),
        widgets_config.quote.tag,
        flags.auto_page_banner
    );

    NormalizedSettings {
        default_config,
        widgets_config,
        custom_props,
        flags,
    }
}

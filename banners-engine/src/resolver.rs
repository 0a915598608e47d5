//! BannerResolver: page classification + defaults + page properties -> `AssetData`.
//!
//! Precedence for ordinary pages, lowest first:
//! built-in fallback < page defaults < custom props (by page type) < page properties.
//! Home and journal pages always get the journal defaults verbatim.

use banners_types::{AssetData, PageData};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::config::{defaults, FALSY_BANNER_VALUES};
use crate::page::PageKind;
use crate::session::RenderSession;
use crate::settings::normalize::strip_unit;
use crate::settings::{SettingKey, SettingsFlags, UnitBounds};

static BRACKETS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\[\](){}]").unwrap());

/// Page property keys that may carry a page type for the custom-props layer.
const PAGE_TYPE_PROPS: &[&str] = &["type", "tags"];

/// Lowest layer: the schema's declared defaults for ordinary pages.
pub fn builtin_fallback() -> AssetData {
    AssetData {
        title: None,
        banner: SettingKey::DefaultPageBanner.default_value().map(str::to_string),
        banner_height: SettingKey::PageBannerHeight.default_value().map(str::to_string),
        banner_align: SettingKey::PageBannerAlign.default_value().map(str::to_string),
    }
}

/// Merge layers in order; later layers win field by field.
pub fn layered_merge(layers: &[&AssetData]) -> AssetData {
    layers
        .iter()
        .fold(AssetData::default(), |merged, layer| merged.overlay(layer))
}

/// True when the banner value means "render nothing".
pub fn is_falsy_banner(banner: Option<&str>) -> bool {
    match banner {
        None => true,
        Some(value) => FALSY_BANNER_VALUES.contains(&value.trim()),
    }
}

pub(crate) fn property_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) if items.len() == 1 => property_text(&items[0]),
        _ => None,
    }
}

/// Map plugin page properties onto `AssetData`; accepts kebab and camel case keys.
pub fn asset_from_properties(props: &BTreeMap<String, Value>) -> AssetData {
    let lookup = |keys: &[&str]| keys.iter().find_map(|key| props.get(*key).and_then(property_text));

    AssetData {
        title: None,
        banner: lookup(&["banner"]),
        banner_height: lookup(&["banner-height", "bannerHeight"]),
        banner_align: lookup(&["banner-align", "bannerAlign"]),
    }
}

/// Page-type tags named by the page's `type::` / `tags::` properties, lower-cased.
fn page_type_tags(props: &BTreeMap<String, Value>) -> Vec<String> {
    let mut tags = Vec::new();
    for key in PAGE_TYPE_PROPS {
        let values = match props.get(*key) {
            Some(Value::Array(items)) => items.iter().filter_map(property_text).collect(),
            Some(value) => property_text(value)
                .map(|text| text.split(',').map(str::to_string).collect())
                .unwrap_or_default(),
            None => Vec::new(),
        };
        for value in values {
            let tag = BRACKETS_RE.replace_all(&value, "");
            let tag = tag.trim().trim_start_matches('#').trim().to_lowercase();
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }
    }
    tags
}

fn custom_layer<'a>(session: &'a RenderSession, props: &BTreeMap<String, Value>) -> Option<&'a AssetData> {
    let custom = &session.settings.custom_props;
    if custom.is_empty() {
        return None;
    }
    page_type_tags(props).iter().find_map(|tag| custom.get(tag))
}

/// Title for the auto-banner search: brackets removed, namespace separators
/// collapsed, optional leading namespace dropped, short words skipped, at
/// most three words hyphen-joined.
pub fn derive_title(name: &str, strip_prefix: Option<&str>, min_word_length: usize) -> Option<String> {
    let cleaned = BRACKETS_RE.replace_all(name, "");
    let mut segments: Vec<&str> = cleaned.split('/').map(str::trim).collect();

    if let Some(prefix) = strip_prefix {
        if segments.len() > 1 && segments[0].eq_ignore_ascii_case(prefix.trim()) {
            segments.remove(0);
        }
    }

    let words: Vec<&str> = segments
        .iter()
        .flat_map(|segment| segment.split_whitespace())
        .filter(|word| word.chars().count() >= min_word_length)
        .take(defaults::AUTO_TITLE_MAX_WORDS)
        .collect();

    if words.is_empty() {
        None
    } else {
        Some(words.join("-"))
    }
}

/// Auto-banner URL for a title at the given (normalised) height.
pub fn auto_banner_url(banner_height: Option<&str>, title: &str) -> String {
    let height = banner_height
        .map(|h| strip_unit(h, &UnitBounds::BANNER_HEIGHT))
        .filter(|h| h.parse::<f64>().is_ok())
        .map(str::to_string)
        .unwrap_or_else(|| UnitBounds::BANNER_HEIGHT.default.to_string());

    defaults::AUTO_BANNER_URL_PATTERN
        .replace("{height}", &height)
        .replace("{title}", &urlencoding::encode(title))
}

fn apply_auto_banner(asset: &mut AssetData, page_props: &AssetData, flags: &SettingsFlags) {
    if !flags.auto_page_banner || page_props.banner.is_some() {
        return;
    }
    if let Some(title) = asset.title.as_deref() {
        let url = auto_banner_url(asset.banner_height.as_deref(), title);
        log::debug!("[BANNERS] Auto banner: {}", url);
        asset.banner = Some(url);
    }
}

/// Resolve the visual configuration for one render pass.
pub fn resolve(session: &RenderSession, page: Option<&PageData>) -> AssetData {
    let settings = &session.settings;
    let defaults = &settings.default_config;

    match session.page.kind {
        PageKind::Home => {
            log::debug!("[BANNERS] Homepage");
            return defaults.journal.clone();
        }
        PageKind::Other => return AssetData::default(),
        PageKind::Page => {}
    }

    if session.page.is_journal() || page.is_some_and(|p| p.journal) {
        log::debug!("[BANNERS] Journal page");
        return defaults.journal.clone();
    }

    let fallback = builtin_fallback();
    let (mut asset, page_layer) = match page.and_then(|p| p.properties.as_ref()) {
        Some(props) => {
            log::debug!("[BANNERS] Use page props");
            let page_layer = asset_from_properties(props);
            let merged = match custom_layer(session, props) {
                Some(custom) => layered_merge(&[&fallback, &defaults.page, custom, &page_layer]),
                None => layered_merge(&[&fallback, &defaults.page, &page_layer]),
            };
            (merged, page_layer)
        }
        None => {
            log::debug!("[BANNERS] Default page");
            (layered_merge(&[&fallback, &defaults.page]), AssetData::default())
        }
    };

    asset.title = page.and_then(PageData::display_name).and_then(|name| {
        derive_title(
            name,
            settings.flags.auto_title_strip_prefix.as_deref(),
            settings.flags.auto_title_min_word_length,
        )
    });

    apply_auto_banner(&mut asset, &page_layer, &settings.flags);

    log::debug!("[BANNERS] pageAssetsData -- {:?}", asset);
    asset
}

//! Plugin settings: the schema declared to the host, the raw flat object it
//! hands back, and the normaliser that turns it into typed configuration.

pub mod normalize;
pub mod schema;

use banners_types::AssetData;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub use normalize::{normalize, NormalizedSettings, SettingsFlags, UnitBounds};
pub use schema::{settings_schema, SettingDefinition, SettingInputType, SettingKey};

/// The host's flat settings object, exactly as persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawSettings {
    values: Map<String, Value>,
}

/// Contents of the nested `advanced` settings object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedSettings {
    /// Regexes removed from a quote before the built-in cleanup
    #[serde(default)]
    pub quote_cleanup_before: Vec<String>,
    /// Regexes removed from a quote after the built-in cleanup
    #[serde(default)]
    pub quote_cleanup_after: Vec<String>,
    /// Namespace segment dropped from auto-banner titles
    #[serde(default)]
    pub auto_title_strip_prefix: Option<String>,
    #[serde(default)]
    pub auto_title_min_word_length: Option<usize>,
}

impl RawSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(values) => Self { values },
            Value::Null => Self::default(),
            other => {
                log::warn!("[SETTINGS] Expected a settings object, got {}, using defaults", other);
                Self::default()
            }
        }
    }

    pub fn from_json(content: &str) -> Result<Self, String> {
        let value: Value =
            serde_json::from_str(content).map_err(|e| format!("Failed to parse settings: {}", e))?;
        Ok(Self::from_value(value))
    }

    /// Builder-style setter, mostly for tests and the preview binary
    pub fn with(mut self, key: SettingKey, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: SettingKey, value: impl Into<Value>) {
        self.values.insert(key.as_ref().to_string(), value.into());
    }

    pub fn raw(&self, key: SettingKey) -> Option<&Value> {
        self.values.get(key.as_ref())
    }

    /// Scalar setting rendered as text. Objects, arrays and null count as missing.
    pub fn text(&self, key: SettingKey) -> Option<String> {
        match self.raw(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Boolean setting; the host stores some booleans as "true"/"false" strings.
    pub fn flag(&self, key: SettingKey) -> Option<bool> {
        match self.raw(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" => Some(true),
                "false" | "" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn advanced(&self) -> AdvancedSettings {
        match self.raw(SettingKey::Advanced) {
            Some(value @ Value::Object(_)) => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
                log::warn!("[SETTINGS] Ignoring malformed advanced settings: {}", e);
                AdvancedSettings::default()
            }),
            _ => AdvancedSettings::default(),
        }
    }

    /// Banner overrides keyed by lower-cased page-type tag
    pub fn custom_props(&self) -> BTreeMap<String, AssetData> {
        let Some(Value::Object(entries)) = self.raw(SettingKey::CustomProps) else {
            return BTreeMap::new();
        };

        entries
            .iter()
            .filter_map(|(tag, value)| {
                match serde_json::from_value::<AssetData>(value.clone()) {
                    Ok(asset) => Some((tag.trim().trim_start_matches('#').to_lowercase(), asset)),
                    Err(e) => {
                        log::warn!("[SETTINGS] Ignoring custom props for '{}': {}", tag, e);
                        None
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_accepts_scalars_only() {
        let raw = RawSettings::from_value(json!({
            "widgetsCalendarWidth": 400,
            "widgetsQuoteTag": "#quote",
            "pageBannerAlign": {"nested": true},
        }));
        assert_eq!(raw.text(SettingKey::WidgetsCalendarWidth).as_deref(), Some("400"));
        assert_eq!(raw.text(SettingKey::WidgetsQuoteTag).as_deref(), Some("#quote"));
        assert_eq!(raw.text(SettingKey::PageBannerAlign), None);
        assert_eq!(raw.text(SettingKey::PageBannerHeight), None);
    }

    #[test]
    fn test_flag_accepts_string_booleans() {
        let raw = RawSettings::new().with(SettingKey::AutoPageBanner, "true");
        assert_eq!(raw.flag(SettingKey::AutoPageBanner), Some(true));
        let raw = RawSettings::new().with(SettingKey::AutoPageBanner, false);
        assert_eq!(raw.flag(SettingKey::AutoPageBanner), Some(false));
    }

    #[test]
    fn test_advanced_and_custom_props() {
        let raw = RawSettings::from_value(json!({
            "advanced": {
                "quoteCleanupBefore": ["foo"],
                "autoTitleMinWordLength": 4
            },
            "customProps": {
                "#Book": {"banner": "book.jpg", "bannerAlign": "20%"},
                "broken": 12
            }
        }));
        let advanced = raw.advanced();
        assert_eq!(advanced.quote_cleanup_before, vec!["foo"]);
        assert_eq!(advanced.auto_title_min_word_length, Some(4));

        let custom = raw.custom_props();
        assert_eq!(custom.len(), 1);
        assert_eq!(custom["book"].banner.as_deref(), Some("book.jpg"));
    }

    #[test]
    fn test_non_object_settings_fall_back() {
        let raw = RawSettings::from_value(json!([1, 2, 3]));
        assert_eq!(raw, RawSettings::default());
        assert!(RawSettings::from_json("not json").is_err());
    }
}

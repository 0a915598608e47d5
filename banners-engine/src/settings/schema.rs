//! Settings schema declared to the host.
//!
//! Each key maps to one entry in the host's settings UI. The host renders
//! the schema and hands back a flat object keyed by the camelCase names.

use banners_types::WidgetMode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator};

use crate::config::defaults;

/// Available setting keys, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, AsRefStr, EnumIter)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum SettingKey {
    WidgetsCalendarHeading,
    WidgetsCalendarEnabled,
    WidgetsCalendarWidth,
    WidgetsQuoteHeading,
    WidgetsQuoteEnabled,
    WidgetsQuoteTag,
    WidgetsQuoteMaxWidth,
    WidgetsQuoteSize,
    JournalHeading,
    DefaultJournalBanner,
    JournalBannerHeight,
    JournalBannerAlign,
    PageHeading,
    DefaultPageBanner,
    PageBannerHeight,
    PageBannerAlign,
    AutoPageBanner,
    /// Nested object: quote cleanup regexes and auto-title rules
    Advanced,
    /// Nested object: banner overrides keyed by page-type tag
    CustomProps,
}

/// Input type for rendering the setting in the host UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingInputType {
    Heading,
    Enum,
    String,
    Boolean,
    Object,
}

impl SettingKey {
    /// Get the display title for this setting
    pub fn label(&self) -> &'static str {
        match self {
            Self::WidgetsCalendarHeading => "📅 Widgets: calendar",
            Self::WidgetsCalendarEnabled => "Show calendar?",
            Self::WidgetsCalendarWidth => "Block calendar widget width (in px)",
            Self::WidgetsQuoteHeading => "💬 Widgets: quote",
            Self::WidgetsQuoteEnabled => "Show random quote?",
            Self::WidgetsQuoteTag => "Show random quotes with this tag",
            Self::WidgetsQuoteMaxWidth => "Quote width limit (in chars)",
            Self::WidgetsQuoteSize => "Quote font size (relative to default calculated, in %)",
            Self::JournalHeading => "📆 Journal and home settings",
            Self::DefaultJournalBanner => "Default banner for journal and home page (set empty to disable)",
            Self::JournalBannerHeight => "Banner height for journal & home page",
            Self::JournalBannerAlign => "Default banner vertical align for journal and home page",
            Self::PageHeading => "📄 Common page settings",
            Self::DefaultPageBanner => "Default banner for common page (set empty to disable)",
            Self::PageBannerHeight => "Banner height for common page",
            Self::PageBannerAlign => "Default banner vertical align for common page",
            Self::AutoPageBanner => "Turn on auto page banner mode?",
            Self::Advanced => "⚙ Advanced",
            Self::CustomProps => "🏷 Custom banners per page type",
        }
    }

    /// Get the description for this setting
    pub fn description(&self) -> &'static str {
        match self {
            Self::WidgetsCalendarEnabled | Self::WidgetsQuoteEnabled => {
                "⚠ check readme for instructions! https://github.com/yoyurec/logseq-banners-plugin"
            }
            Self::AutoPageBanner => "Autogenerate banner image URL according to the page tile",
            Self::Advanced => {
                "quoteCleanupBefore / quoteCleanupAfter: lists of regexes removed from quotes \
                 before and after the built-in cleanup. autoTitleStripPrefix: namespace dropped \
                 from auto banner titles. autoTitleMinWordLength: shortest word kept in titles."
            }
            Self::CustomProps => {
                "Map of page type (the page's `type::` or `tags::` value) to \
                 { banner, bannerHeight, bannerAlign } overrides."
            }
            _ => "",
        }
    }

    /// Get the input type for the UI
    pub fn input_type(&self) -> SettingInputType {
        match self {
            Self::WidgetsCalendarHeading
            | Self::WidgetsQuoteHeading
            | Self::JournalHeading
            | Self::PageHeading => SettingInputType::Heading,
            Self::WidgetsCalendarEnabled | Self::WidgetsQuoteEnabled => SettingInputType::Enum,
            Self::AutoPageBanner => SettingInputType::Boolean,
            Self::Advanced | Self::CustomProps => SettingInputType::Object,
            _ => SettingInputType::String,
        }
    }

    /// Get the default value for scalar settings (headings and objects have none)
    pub fn default_value(&self) -> Option<&'static str> {
        match self {
            Self::WidgetsCalendarEnabled | Self::WidgetsQuoteEnabled => Some("journals"),
            Self::WidgetsCalendarWidth => Some("380px"),
            Self::WidgetsQuoteTag => Some("#quote"),
            Self::WidgetsQuoteMaxWidth => Some("48ch"),
            Self::WidgetsQuoteSize => Some("100%"),
            Self::DefaultJournalBanner => Some(defaults::JOURNAL_BANNER),
            Self::JournalBannerHeight | Self::PageBannerHeight => Some("280px"),
            Self::JournalBannerAlign | Self::PageBannerAlign => Some("50%"),
            Self::DefaultPageBanner => Some(defaults::PAGE_BANNER),
            Self::AutoPageBanner => Some("false"),
            _ => None,
        }
    }

    /// Get the available choices for enum inputs
    pub fn choices(&self) -> Option<Vec<&'static str>> {
        match self.input_type() {
            SettingInputType::Enum => Some(WidgetMode::iter().map(<&'static str>::from).collect()),
            _ => None,
        }
    }
}

/// Definition of a setting in the shape the host's schema API expects
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingDefinition {
    pub key: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub input_type: SettingInputType,
    pub default: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_choices: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_picker: Option<String>,
}

impl From<SettingKey> for SettingDefinition {
    fn from(key: SettingKey) -> Self {
        let default = match (key.input_type(), key.default_value()) {
            (SettingInputType::Object, _) => json!({}),
            (SettingInputType::Boolean, value) => Value::Bool(value == Some("true")),
            (_, Some(value)) => Value::String(value.to_string()),
            (_, None) => Value::Null,
        };
        let enum_choices = key
            .choices()
            .map(|choices| choices.into_iter().map(str::to_string).collect());

        Self {
            key: key.as_ref().to_string(),
            title: key.label().to_string(),
            description: key.description().to_string(),
            input_type: key.input_type(),
            default,
            enum_picker: enum_choices.as_ref().map(|_| "radio".to_string()),
            enum_choices,
        }
    }
}

/// The full settings schema, in display order
pub fn settings_schema() -> Vec<SettingDefinition> {
    SettingKey::iter().map(SettingDefinition::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setting_key_serialization() {
        assert_eq!(SettingKey::WidgetsCalendarEnabled.as_ref(), "widgetsCalendarEnabled");
        assert_eq!(SettingKey::DefaultJournalBanner.as_ref(), "defaultJournalBanner");
        assert_eq!(SettingKey::CustomProps.as_ref(), "customProps");
    }

    #[test]
    fn test_schema_enum_entries() {
        let schema = settings_schema();
        let calendar = schema
            .iter()
            .find(|def| def.key == "widgetsCalendarEnabled")
            .unwrap();
        assert_eq!(calendar.input_type, SettingInputType::Enum);
        assert_eq!(
            calendar.enum_choices.as_deref(),
            Some(&["off".to_string(), "journals".to_string(), "everywhere".to_string()][..])
        );
        assert_eq!(calendar.default, json!("journals"));
    }

    #[test]
    fn test_schema_headings_have_null_default() {
        let schema = settings_schema();
        let heading = schema.iter().find(|def| def.key == "pageHeading").unwrap();
        assert_eq!(heading.input_type, SettingInputType::Heading);
        assert!(heading.default.is_null());
        assert_eq!(schema.len(), SettingKey::iter().count());

        let auto = schema.iter().find(|def| def.key == "autoPageBanner").unwrap();
        assert_eq!(auto.default, json!(false));
    }
}

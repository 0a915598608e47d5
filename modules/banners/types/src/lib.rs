//! Shared types for the banners engine and the host bindings that drive it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use strum::{AsRefStr, EnumIter, EnumString, IntoStaticStr};

// =====================================================
// Resolved banner configuration
// =====================================================

/// Fully resolved visual configuration for one page render.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner_height: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner_align: Option<String>,
}

impl AssetData {
    /// Layer `upper` on top of `self`. Every field present in `upper` wins.
    pub fn overlay(&self, upper: &AssetData) -> AssetData {
        AssetData {
            title: upper.title.clone().or_else(|| self.title.clone()),
            banner: upper.banner.clone().or_else(|| self.banner.clone()),
            banner_height: upper
                .banner_height
                .clone()
                .or_else(|| self.banner_height.clone()),
            banner_align: upper
                .banner_align
                .clone()
                .or_else(|| self.banner_align.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.banner.is_none()
            && self.banner_height.is_none()
            && self.banner_align.is_none()
    }
}

/// Process-wide baseline, rebuilt whenever settings change.
///
/// `journal` applies to the home view and journal-dated pages, `page` to
/// everything else unless page properties override it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultConfig {
    pub page: AssetData,
    pub journal: AssetData,
}

// =====================================================
// Widgets
// =====================================================

/// Where a widget is shown.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize, EnumString, AsRefStr, EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WidgetMode {
    Off,
    #[default]
    Journals,
    Everywhere,
}

impl WidgetMode {
    /// Parse from string, defaulting to `Journals` if invalid
    pub fn from_str_or_default(s: &str) -> Self {
        s.trim().to_lowercase().parse().unwrap_or_default()
    }

    /// Whether the widget renders on the current surface.
    pub fn allows(self, journal_surface: bool) -> bool {
        match self {
            WidgetMode::Off => false,
            WidgetMode::Journals => journal_surface,
            WidgetMode::Everywhere => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarConfig {
    pub enabled: WidgetMode,
    /// Normalised CSS width, e.g. `380px`
    pub width: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteConfig {
    pub enabled: WidgetMode,
    /// Tag without the leading `#`
    pub tag: String,
    /// Normalised CSS width in characters, e.g. `48ch`
    pub max_width: String,
    /// Normalised relative font size, e.g. `100%`
    pub size: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetsConfig {
    pub calendar: CalendarConfig,
    pub quote: QuoteConfig,
}

// =====================================================
// Host data
// =====================================================

/// The active note collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphInfo {
    pub name: String,
    /// Filesystem path of the graph root
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Reference from a block entity to the page that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    pub id: i64,
}

/// Page entity as reported by the host editor.
///
/// When the host's "current page" is really a zoomed-in block, `page` points
/// at its owning page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageData {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub original_name: Option<String>,
    #[serde(default, rename = "journal?")]
    pub journal: bool,
    #[serde(default)]
    pub properties: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub page: Option<PageRef>,
}

impl PageData {
    /// Name shown to the user, preferring the original casing.
    pub fn display_name(&self) -> Option<&str> {
        self.original_name.as_deref().or(self.name.as_deref())
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.as_ref().and_then(|props| props.get(key))
    }
}

/// A content block in the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub uuid: String,
    pub content: String,
    /// Task marker (`TODO`, `DONE`, ...) if the block is a task
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    /// Lower-cased names of pages this block references
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub refs: Vec<String>,
}

// =====================================================
// UI feedback
// =====================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MsgSeverity {
    Success,
    Warning,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_upper_wins() {
        let base = AssetData {
            banner: Some("a.jpg".to_string()),
            banner_height: Some("280px".to_string()),
            ..Default::default()
        };
        let upper = AssetData {
            banner: Some("b.jpg".to_string()),
            ..Default::default()
        };
        let merged = base.overlay(&upper);
        assert_eq!(merged.banner.as_deref(), Some("b.jpg"));
        assert_eq!(merged.banner_height.as_deref(), Some("280px"));
        assert!(merged.banner_align.is_none());
    }

    #[test]
    fn test_widget_mode_parsing() {
        assert_eq!(WidgetMode::from_str_or_default("off"), WidgetMode::Off);
        assert_eq!(WidgetMode::from_str_or_default("Everywhere"), WidgetMode::Everywhere);
        assert_eq!(WidgetMode::from_str_or_default("bogus"), WidgetMode::Journals);
        assert_eq!(WidgetMode::Journals.as_ref(), "journals");
    }

    #[test]
    fn test_widget_mode_allows() {
        assert!(!WidgetMode::Off.allows(true));
        assert!(WidgetMode::Journals.allows(true));
        assert!(!WidgetMode::Journals.allows(false));
        assert!(WidgetMode::Everywhere.allows(false));
    }

    #[test]
    fn test_page_data_from_host_json() {
        let page: PageData = serde_json::from_str(
            r#"{"id": 12, "name": "my page", "originalName": "My Page", "journal?": false,
                "properties": {"banner": "x.jpg", "bannerAlign": "30%"}}"#,
        )
        .unwrap();
        assert_eq!(page.display_name(), Some("My Page"));
        assert!(!page.journal);
        assert_eq!(page.property("banner").and_then(|v| v.as_str()), Some("x.jpg"));
        assert!(page.page.is_none());
    }
}

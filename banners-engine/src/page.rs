//! Classification of the currently displayed surface.

use serde::Serialize;

use crate::config::{HOME_PAGE_TYPES, PAGE_PAGE_TYPE};

/// What the host is showing, derived from its page-type attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    /// Home or the all-journals aggregate view
    Home,
    /// A single page (journal-dated or ordinary)
    Page,
    /// Anything else: settings, graph view, search...
    Other,
}

/// Per-pass classification. `is_home` and `is_page` are never both true;
/// `is_journal` is only set for a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageContext {
    pub kind: PageKind,
    pub is_journal: bool,
}

impl PageContext {
    pub fn classify(page_type: Option<&str>) -> Self {
        let kind = match page_type.map(str::trim) {
            Some(t) if HOME_PAGE_TYPES.contains(&t) => PageKind::Home,
            Some(PAGE_PAGE_TYPE) => PageKind::Page,
            _ => PageKind::Other,
        };
        Self { kind, is_journal: false }
    }

    pub fn home() -> Self {
        Self { kind: PageKind::Home, is_journal: false }
    }

    pub fn page(is_journal: bool) -> Self {
        Self { kind: PageKind::Page, is_journal }
    }

    /// Record whether the page turned out to be journal-dated.
    pub fn with_journal(self, is_journal: bool) -> Self {
        Self {
            is_journal: is_journal && self.kind == PageKind::Page,
            ..self
        }
    }

    pub fn is_home(&self) -> bool {
        self.kind == PageKind::Home
    }

    pub fn is_page(&self) -> bool {
        self.kind == PageKind::Page
    }

    pub fn is_journal(&self) -> bool {
        self.is_journal
    }

    /// Banners render only on home and page surfaces.
    pub fn shows_banner(&self) -> bool {
        self.kind != PageKind::Other
    }

    /// Home or a journal page: where journal defaults and "journals" widgets apply.
    pub fn is_journal_surface(&self) -> bool {
        self.is_home() || self.is_journal
    }
}

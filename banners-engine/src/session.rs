//! Per-pass render session.
//!
//! Settings and graph identity are replaced wholesale by the controller; a
//! pass snapshots them here together with the page classification, and every
//! stage downstream reads only from this snapshot.

use banners_types::GraphInfo;
use std::sync::Arc;

use crate::page::PageContext;
use crate::settings::NormalizedSettings;

#[derive(Debug, Clone)]
pub struct RenderSession {
    pub settings: Arc<NormalizedSettings>,
    pub graph: Option<Arc<GraphInfo>>,
    pub page: PageContext,
}

impl RenderSession {
    pub fn new(settings: Arc<NormalizedSettings>, graph: Option<Arc<GraphInfo>>, page: PageContext) -> Self {
        Self { settings, graph, page }
    }

    /// Same snapshot, refined page classification.
    pub fn with_page(&self, page: PageContext) -> Self {
        Self {
            settings: self.settings.clone(),
            graph: self.graph.clone(),
            page,
        }
    }

    pub fn graph_name(&self) -> Option<&str> {
        self.graph.as_deref().map(|g| g.name.as_str())
    }

    pub fn graph_path(&self) -> Option<&str> {
        self.graph.as_deref().map(|g| g.path.as_str())
    }
}

//! The host editor, seen from the engine: page and graph queries, property
//! writes, settings and toasts. DOM access lives in `render::DomSurface`.

use async_trait::async_trait;
use banners_types::{Block, GraphInfo, MsgSeverity, PageData};

use crate::settings::RawSettings;

#[async_trait]
pub trait HostApi: Send + Sync {
    /// Page (or zoomed-in block) currently displayed.
    async fn current_page(&self) -> Result<Option<PageData>, String>;

    async fn page_by_id(&self, id: i64) -> Result<Option<PageData>, String>;

    /// Top-level blocks of a page in document order; the first one holds the page properties.
    async fn page_blocks_tree(&self, page_name: &str) -> Result<Vec<Block>, String>;

    /// Blocks referencing the page named `tag` (lower-cased, no `#`).
    async fn tagged_blocks(&self, tag: &str) -> Result<Vec<Block>, String>;

    async fn block_by_uuid(&self, uuid: &str) -> Result<Option<Block>, String>;

    async fn upsert_block_property(&self, block_uuid: &str, key: &str, value: &str) -> Result<(), String>;

    async fn current_graph(&self) -> Result<Option<GraphInfo>, String>;

    /// The persisted flat settings object.
    async fn settings(&self) -> Result<RawSettings, String>;

    async fn show_msg(&self, message: &str, severity: MsgSeverity, timeout_ms: Option<u64>);
}

/// Current page, redirected to the owning page when the host reports a block.
pub async fn current_page_data(host: &dyn HostApi) -> Option<PageData> {
    let page = match host.current_page().await {
        Ok(page) => page?,
        Err(e) => {
            log::warn!("[BANNERS] Failed to get current page: {}", e);
            return None;
        }
    };

    let Some(parent) = page.page else {
        return Some(page);
    };

    match host.page_by_id(parent.id).await {
        Ok(Some(parent_page)) => Some(parent_page),
        Ok(None) => {
            log::debug!("[BANNERS] Parent page {} not found", parent.id);
            None
        }
        Err(e) => {
            log::warn!("[BANNERS] Failed to get parent page {}: {}", parent.id, e);
            None
        }
    }
}

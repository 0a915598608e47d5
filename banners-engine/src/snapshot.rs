//! JSON-backed host: a frozen graph with one current page.
//!
//! Drives the preview binary and the integration tests. Property writes and
//! toasts are recorded so callers can inspect them afterwards.

use async_trait::async_trait;
use banners_types::{Block, GraphInfo, MsgSeverity, PageData};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::host::HostApi;
use crate::settings::RawSettings;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotBlock {
    pub uuid: String,
    pub content: String,
    #[serde(default)]
    pub marker: Option<String>,
    #[serde(default)]
    pub refs: Vec<String>,
    /// Name of the owning page
    #[serde(default)]
    pub page: Option<String>,
}

impl From<&SnapshotBlock> for Block {
    fn from(block: &SnapshotBlock) -> Self {
        Block {
            uuid: block.uuid.clone(),
            content: block.content.clone(),
            marker: block.marker.clone(),
            refs: block.refs.iter().map(|r| r.to_lowercase()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSnapshot {
    #[serde(default)]
    pub graph: Option<GraphInfo>,
    #[serde(default)]
    pub settings: RawSettings,
    /// Host page type: `home`, `all-journals`, `page`, ...
    #[serde(default)]
    pub page_type: Option<String>,
    #[serde(default)]
    pub current_page: Option<PageData>,
    #[serde(default)]
    pub pages: Vec<PageData>,
    #[serde(default)]
    pub blocks: Vec<SnapshotBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostMessage {
    pub message: String,
    pub severity: MsgSeverity,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyWrite {
    pub block_uuid: String,
    pub key: String,
    pub value: String,
}

pub struct SnapshotHost {
    state: RwLock<GraphSnapshot>,
    messages: Mutex<Vec<HostMessage>>,
    writes: Mutex<Vec<PropertyWrite>>,
}

impl SnapshotHost {
    pub fn new(snapshot: GraphSnapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
            messages: Mutex::new(Vec::new()),
            writes: Mutex::new(Vec::new()),
        }
    }

    pub async fn load(path: &Path) -> Result<Self, String> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read snapshot {}: {}", path.display(), e))?;
        let snapshot: GraphSnapshot =
            serde_json::from_str(&content).map_err(|e| format!("Failed to parse snapshot: {}", e))?;
        log::info!(
            "[BANNERS] Loaded snapshot with {} pages and {} blocks",
            snapshot.pages.len(),
            snapshot.blocks.len()
        );
        Ok(Self::new(snapshot))
    }

    pub fn page_type(&self) -> Option<String> {
        self.state.read().page_type.clone()
    }

    /// Navigate: new page type and current page.
    pub fn navigate(&self, page_type: Option<&str>, current_page: Option<PageData>) {
        let mut state = self.state.write();
        state.page_type = page_type.map(str::to_string);
        state.current_page = current_page;
    }

    pub fn set_settings(&self, settings: RawSettings) {
        self.state.write().settings = settings;
    }

    pub fn set_graph(&self, graph: Option<GraphInfo>) {
        self.state.write().graph = graph;
    }

    pub fn page(&self, name: &str) -> Option<PageData> {
        self.state
            .read()
            .pages
            .iter()
            .find(|p| p.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(name)))
            .cloned()
    }

    pub fn messages(&self) -> Vec<HostMessage> {
        self.messages.lock().clone()
    }

    pub fn writes(&self) -> Vec<PropertyWrite> {
        self.writes.lock().clone()
    }
}

fn set_page_property(page: &mut PageData, key: &str, value: &str) {
    page.properties
        .get_or_insert_with(Default::default)
        .insert(key.to_string(), Value::String(value.to_string()));
}

#[async_trait]
impl HostApi for SnapshotHost {
    async fn current_page(&self) -> Result<Option<PageData>, String> {
        Ok(self.state.read().current_page.clone())
    }

    async fn page_by_id(&self, id: i64) -> Result<Option<PageData>, String> {
        Ok(self.state.read().pages.iter().find(|p| p.id == Some(id)).cloned())
    }

    async fn page_blocks_tree(&self, page_name: &str) -> Result<Vec<Block>, String> {
        Ok(self
            .state
            .read()
            .blocks
            .iter()
            .filter(|b| b.page.as_deref().is_some_and(|p| p.eq_ignore_ascii_case(page_name)))
            .map(Block::from)
            .collect())
    }

    async fn tagged_blocks(&self, tag: &str) -> Result<Vec<Block>, String> {
        Ok(self
            .state
            .read()
            .blocks
            .iter()
            .filter(|b| b.refs.iter().any(|r| r.eq_ignore_ascii_case(tag)))
            .map(Block::from)
            .collect())
    }

    async fn block_by_uuid(&self, uuid: &str) -> Result<Option<Block>, String> {
        Ok(self.state.read().blocks.iter().find(|b| b.uuid == uuid).map(Block::from))
    }

    async fn upsert_block_property(&self, block_uuid: &str, key: &str, value: &str) -> Result<(), String> {
        let mut state = self.state.write();
        let page_name = state
            .blocks
            .iter()
            .find(|b| b.uuid == block_uuid)
            .ok_or_else(|| format!("Block {} not found", block_uuid))?
            .page
            .clone();

        if let Some(name) = page_name {
            let same_page = |p: &PageData| p.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(&name));
            for page in state.pages.iter_mut().filter(|p| same_page(&**p)) {
                set_page_property(page, key, value);
            }
            if let Some(current) = state.current_page.as_mut().filter(|p| same_page(&**p)) {
                set_page_property(current, key, value);
            }
        }

        self.writes.lock().push(PropertyWrite {
            block_uuid: block_uuid.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    async fn current_graph(&self) -> Result<Option<GraphInfo>, String> {
        Ok(self.state.read().graph.clone())
    }

    async fn settings(&self) -> Result<RawSettings, String> {
        Ok(self.state.read().settings.clone())
    }

    async fn show_msg(&self, message: &str, severity: MsgSeverity, timeout_ms: Option<u64>) {
        log::info!("[BANNERS] Toast ({}): {}", severity.as_ref(), message);
        self.messages.lock().push(HostMessage {
            message: message.to_string(),
            severity,
            timeout_ms,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_load_snapshot_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "graph": {{"name": "notes", "path": "/tmp/notes"}},
                "pageType": "page",
                "currentPage": {{"id": 2, "name": "rust", "originalName": "Rust"}},
                "pages": [{{"id": 2, "name": "rust", "originalName": "Rust"}}],
                "blocks": [{{"uuid": "b1", "content": "banner:: x.jpg", "page": "rust"}}]
            }}"#
        )
        .unwrap();

        let host = SnapshotHost::load(file.path()).await.unwrap();
        assert_eq!(host.page_type().as_deref(), Some("page"));
        assert_eq!(host.current_graph().await.unwrap().unwrap().name, "notes");
        assert_eq!(host.page_blocks_tree("Rust").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_updates_page_properties() {
        let page = PageData {
            id: Some(2),
            name: Some("rust".to_string()),
            ..Default::default()
        };
        let host = SnapshotHost::new(GraphSnapshot {
            current_page: Some(page.clone()),
            pages: vec![page],
            blocks: vec![SnapshotBlock {
                uuid: "b1".to_string(),
                page: Some("rust".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        });

        host.upsert_block_property("b1", "banner", "x.jpg").await.unwrap();
        assert!(host.upsert_block_property("nope", "banner", "x.jpg").await.is_err());

        let current = host.current_page().await.unwrap().unwrap();
        assert_eq!(current.property("banner").and_then(Value::as_str), Some("x.jpg"));
        assert_eq!(host.writes().len(), 1);
    }
}

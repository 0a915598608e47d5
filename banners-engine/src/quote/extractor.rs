use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;
use serde::Serialize;
use std::sync::{Arc, LazyLock};

use super::sanitize::QuoteSanitizer;
use crate::host::HostApi;
use crate::session::RenderSession;

static BLOCK_REF_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(\(([0-9A-Fa-f-]{36})\)\)").unwrap());

/// A picked quote, ready for the widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    /// Sanitised quote wrapped in a deep link to its block
    pub html: String,
    pub block_uuid: String,
    /// Value for `--widgetsQuoteFS`
    pub font_size: &'static str,
}

/// Font size for the quote widget by sanitised length.
pub fn font_size_for(len: usize) -> &'static str {
    if len > 200 {
        "1.2em"
    } else if len > 150 {
        "1.25em"
    } else {
        "1.3em"
    }
}

/// `logseq://graph/<graph>?block-id=<uuid>`
pub fn block_deep_link(graph_name: &str, block_uuid: &str) -> String {
    format!(
        "logseq://graph/{}?block-id={}",
        urlencoding::encode(graph_name),
        urlencoding::encode(block_uuid)
    )
}

pub struct QuoteExtractor {
    host: Arc<dyn HostApi>,
    rng: Mutex<StdRng>,
}

impl QuoteExtractor {
    pub fn new(host: Arc<dyn HostApi>) -> Self {
        Self {
            host,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic picks, for tests and previews.
    pub fn with_seed(host: Arc<dyn HostApi>, seed: u64) -> Self {
        Self {
            host,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Replace every `((uuid))` token in already sanitised text with the
    /// sanitised content of that block. Unknown or malformed references stay
    /// as written.
    async fn resolve_block_refs(&self, text: &str, sanitizer: &QuoteSanitizer) -> String {
        let refs: Vec<(std::ops::Range<usize>, String)> = BLOCK_REF_RE
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let uuid = caps.get(1)?.as_str();
                uuid::Uuid::parse_str(uuid).ok()?;
                Some((whole.range(), uuid.to_string()))
            })
            .collect();

        if refs.is_empty() {
            return text.to_string();
        }

        let mut resolved = String::with_capacity(text.len());
        let mut cursor = 0;
        for (range, uuid) in refs {
            resolved.push_str(&text[cursor..range.start]);
            match self.host.block_by_uuid(&uuid).await {
                Ok(Some(block)) => resolved.push_str(&sanitizer.sanitize(&block.content)),
                Ok(None) => resolved.push_str(&text[range.clone()]),
                Err(e) => {
                    log::warn!("[QUOTE] Failed to resolve (({})): {}", uuid, e);
                    resolved.push_str(&text[range.clone()]);
                }
            }
            cursor = range.end;
        }
        resolved.push_str(&text[cursor..]);
        resolved
    }

    /// A random quote for the current surface, or `None` when the widget is
    /// off here or nothing is tagged.
    pub async fn get_random_quote(&self, session: &RenderSession) -> Option<Quote> {
        let quote_config = &session.settings.widgets_config.quote;
        if !quote_config.enabled.allows(session.page.is_journal_surface()) {
            return None;
        }

        let tag = quote_config.tag.to_lowercase();
        let blocks = match self.host.tagged_blocks(&tag).await {
            Ok(blocks) => blocks,
            Err(e) => {
                log::warn!("[QUOTE] Query for #{} failed: {}", tag, e);
                return None;
            }
        };
        let candidates: Vec<_> = blocks.into_iter().filter(|b| b.marker.is_none()).collect();
        if candidates.is_empty() {
            log::debug!("[QUOTE] No blocks tagged #{}", tag);
            return None;
        }

        let pick = self.rng.lock().gen_range(0..candidates.len());
        let block = &candidates[pick];

        let flags = &session.settings.flags;
        let sanitizer = QuoteSanitizer::new(&tag, &flags.quote_cleanup_before, &flags.quote_cleanup_after);

        let text = sanitizer.sanitize(&block.content);
        let text = self.resolve_block_refs(&text, &sanitizer).await;
        if text.is_empty() {
            log::debug!("[QUOTE] Block {} is empty after cleanup", block.uuid);
            return None;
        }

        let link = block_deep_link(session.graph_name().unwrap_or_default(), &block.uuid);
        Some(Quote {
            font_size: font_size_for(text.chars().count()),
            html: format!(r#"<a href="{}" id="banner-widgets-quote-link">{}</a>"#, link, text),
            block_uuid: block.uuid.clone(),
        })
    }
}

//! Creation of new mirrors.
//!
//! Renders a resolved source into a reply body, posts it under the
//! requesting parent, and records the tracked item with its initial
//! recheck state. Remote rejection leaves no rows so the next scan can
//! retry.

use crate::api::{ContentApi, Node};
use crate::config::MirrorConfig;
use crate::db::tracked_repo::{MirrorRecordRow, MirrorReplyRow};
use crate::db::{tracked_repo, Database, DatabaseError};
use crate::render::Renderer;
use crate::resolver::Resolved;
use crate::scheduler;

/// Posts mirror replies and records them for recheck.
pub struct Mirrorer<'a, A: ContentApi> {
    api: &'a A,
    db: Database,
    renderer: Renderer<'a, A>,
    settings: &'a MirrorConfig,
}

impl<'a, A: ContentApi> Mirrorer<'a, A> {
    pub fn new(api: &'a A, db: Database, settings: &'a MirrorConfig) -> Self {
        Self {
            api,
            db,
            renderer: Renderer::new(api, &settings.error_msg),
            settings,
        }
    }

    /// Mirrors `source` as a reply to `parent`. Returns whether a mirror
    /// was posted and recorded.
    pub fn mirror(
        &self,
        parent: &Node,
        source: &Resolved,
        now: i64,
    ) -> Result<bool, DatabaseError> {
        let item_id = item_id(parent);
        let (title, content) = self.renderer.render_source(source);
        if title.is_empty() && content.is_empty() {
            return Ok(false);
        }

        let tagline = pick_tagline(&self.settings.taglines);
        let body = self
            .renderer
            .compose_body(tagline, &title, &content, &self.settings.footer);

        match self.api.post_reply(parent, &body) {
            Ok(reply_ref) => {
                let record = MirrorRecordRow {
                    tracked_item_id: item_id.clone(),
                    permalink: source.node.permalink().to_string(),
                    created: source.node.created(),
                    edited: source.node.edited(),
                    last_checked: now,
                    update_interval: scheduler::reset_interval(),
                };
                let reply = MirrorReplyRow {
                    tracked_item_id: item_id.clone(),
                    permalink: reply_ref.permalink,
                    latest_content: content,
                };
                tracked_repo::insert_mirrored(&self.db, &record, &reply)?;
                log::info!(
                    "Successfully copied \"{}\" to \"{}\"",
                    source.node.id(),
                    item_id
                );
                Ok(true)
            }
            Err(e) => {
                log::error!(
                    "Failed to copy \"{}\" to \"{}\": {}",
                    source.node.id(),
                    item_id,
                    e
                );
                Ok(false)
            }
        }
    }

    /// Records `parent` as seen without mirroring, so it is never
    /// reprocessed.
    pub fn ignore(&self, parent: &Node) -> Result<(), DatabaseError> {
        tracked_repo::insert_ignored(&self.db, &item_id(parent))
    }

    /// Whether `parent` was already mirrored or ignored.
    pub fn is_tracked(&self, parent: &Node) -> Result<bool, DatabaseError> {
        tracked_repo::exists(&self.db, &item_id(parent))
    }
}

/// Tracked item key: the document id alone, or document and reply ids
/// joined with `+` when the request came from a reply.
pub fn item_id(parent: &Node) -> String {
    match parent {
        Node::Document(d) => d.id.clone(),
        Node::Reply(r) => format!("{}+{}", r.document_id, r.id),
    }
}

fn pick_tagline(taglines: &[String]) -> Option<&str> {
    if taglines.is_empty() {
        return None;
    }
    let mut buf = [0u8; 8];
    let idx = match getrandom::fill(&mut buf) {
        Ok(()) => (u64::from_le_bytes(buf) % taglines.len() as u64) as usize,
        Err(_) => 0,
    };
    Some(&taglines[idx])
}

//! Edit reconciliation.
//!
//! Once per due tracked item: check whether the source content changed
//! since the last look, and if so append a dated diff annotation to the
//! mirrored reply while preserving every previously appended annotation.
//! The mirrored body is re-parsed by divider, so the divider literal in
//! [`crate::render`] is part of the persistent format.

use crate::api::{ContentApi, Node, ReplyRef};
use crate::db::{tracked_repo, Database, DatabaseError};
use crate::diff::{format_edit_block, unified_diff};
use crate::render::{Renderer, TEXT_DIVIDER};
use crate::resolver::ContentResolver;
use crate::scheduler::{self, RecheckScheduler};

/// Outcome of reconciling one tracked item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Nothing to do; interval backoff may have grown.
    NoOp,
    /// The mirrored reply was rewritten and the edit recorded.
    Updated,
    /// The remote rejected the edit or the result could not be persisted.
    Failed,
}

/// Reconciles mirrored replies against edited source content.
pub struct EditReconciler<'a, A: ContentApi> {
    api: &'a A,
    db: Database,
    resolver: ContentResolver<'a, A>,
    renderer: Renderer<'a, A>,
    scheduler: RecheckScheduler,
}

impl<'a, A: ContentApi> EditReconciler<'a, A> {
    pub fn new(api: &'a A, db: Database, error_msg: &'a str) -> Self {
        Self {
            api,
            resolver: ContentResolver::new(api),
            renderer: Renderer::new(api, error_msg),
            scheduler: RecheckScheduler::new(db.clone()),
            db,
        }
    }

    pub fn with_pass_limit(api: &'a A, db: Database, error_msg: &'a str, pass_limit: usize) -> Self {
        Self {
            api,
            resolver: ContentResolver::new(api),
            renderer: Renderer::new(api, error_msg),
            scheduler: RecheckScheduler::with_pass_limit(db.clone(), pass_limit),
            db,
        }
    }

    /// Runs one reconciliation pass over the scheduler's due worklist.
    /// Returns the number of items examined.
    pub fn run_pass(&self, now: i64) -> Result<usize, DatabaseError> {
        let due = self.scheduler.due_items(now)?;
        let examined = due.len();
        for item_id in due {
            match self.reconcile_item(&item_id, now) {
                Ok(action) => log::debug!("Reconciled \"{}\": {:?}", item_id, action),
                Err(e) => log::error!("Reconciliation of \"{}\" failed: {}", item_id, e),
            }
        }
        Ok(examined)
    }

    /// Reconciles a single tracked item.
    pub fn reconcile_item(
        &self,
        item_id: &str,
        now: i64,
    ) -> Result<ReconcileAction, DatabaseError> {
        let Some(record) = tracked_repo::find_record(&self.db, item_id)? else {
            log::debug!("Tracked item \"{}\" has no mirror record, skipping", item_id);
            return Ok(ReconcileAction::NoOp);
        };

        // The source may have been deleted or moved; leave state untouched
        // and let the next pass look again.
        let resolved = match self.resolver.resolve_full(&record.permalink) {
            Ok(Some(resolved)) => resolved,
            Ok(None) => return Ok(ReconcileAction::NoOp),
            Err(e) => {
                log::warn!("Stored permalink no longer resolves for \"{}\": {}", item_id, e);
                return Ok(ReconcileAction::NoOp);
            }
        };

        let edited = resolved.node.edited();
        let changed = matches!(edited, Some(ts) if ts > record.last_checked);
        if !changed {
            return self.note_unchanged(record, edited, now);
        }

        let Some(mut reply) = tracked_repo::find_reply(&self.db, item_id)? else {
            log::warn!("Tracked item \"{}\" has a record but no reply", item_id);
            return Ok(ReconcileAction::NoOp);
        };
        let live_reply = match self.resolver.resolve_full(&reply.permalink) {
            Ok(Some(live)) => match live.node {
                Node::Reply(live_reply) => live_reply,
                Node::Document(_) => {
                    log::warn!("Mirror reply permalink resolved to a document for \"{}\"", item_id);
                    return Ok(ReconcileAction::NoOp);
                }
            },
            _ => {
                log::warn!("Mirror reply unavailable for \"{}\"", item_id);
                return Ok(ReconcileAction::NoOp);
            }
        };
        let Some(live_body) = live_reply.body.as_deref() else {
            log::warn!("Mirror reply body missing for \"{}\"", item_id);
            return Ok(ReconcileAction::NoOp);
        };

        // Editable region: strictly between the first and last divider.
        let divider_open = TEXT_DIVIDER.trim_start();
        let (Some(open_idx), Some(body_end)) =
            (live_body.find(divider_open), live_body.rfind(TEXT_DIVIDER.trim()))
        else {
            log::warn!("Mirror reply for \"{}\" has no divider structure", item_id);
            return Ok(ReconcileAction::NoOp);
        };
        let body_start = open_idx + divider_open.len();
        let footer = &live_body[body_end..];
        let mut region = &live_body[body_start..body_end];

        // Peel one trailing segment per previously appended edit to recover
        // the original content section. Running out of dividers means a
        // prior pass saved an edit without updating the reply; stop early.
        let prior_edits = tracked_repo::list_edits(&self.db, item_id)?;
        let divider_tail = TEXT_DIVIDER.trim_end();
        for _ in 0..prior_edits.len() {
            match region.rfind(divider_tail) {
                Some(idx) => region = &region[..idx],
                None => break,
            }
        }

        let (_title, fresh) = self.renderer.render_source(&resolved);
        let diff = unified_diff(&reply.latest_content, &fresh);
        // Clock skew and no-op edits move the timestamp without changing
        // anything visible.
        if diff.is_empty() {
            return self.note_unchanged(record, edited, now);
        }

        let edit_time = edited.unwrap_or(now);
        let edit_block = format_edit_block(&diff, edit_time);

        let mut new_body = String::with_capacity(live_body.len() + edit_block.len());
        new_body.push_str(&live_body[..body_start]);
        new_body.push_str(region);
        for edit in &prior_edits {
            new_body.push_str(TEXT_DIVIDER);
            new_body.push_str(&edit.content);
        }
        new_body.push_str(TEXT_DIVIDER);
        new_body.push_str(&edit_block);
        new_body.push_str(footer);

        let reply_ref = ReplyRef {
            id: live_reply.id.clone(),
            permalink: live_reply.permalink.clone(),
        };
        let mut record = record;
        match self.api.edit_reply(&reply_ref, &new_body) {
            Ok(()) => {
                record.last_checked = now;
                record.edited = edited;
                record.update_interval = scheduler::reset_interval();
                reply.latest_content = fresh;
                if let Err(e) =
                    tracked_repo::save_reconciled(&self.db, &record, &reply, &edit_block, edit_time)
                {
                    // Next pass recomputes from the last durably saved
                    // state; this cycle is lost, nothing corrupts.
                    log::error!("Failed to save \"{}\": {}", item_id, e);
                    return Ok(ReconcileAction::Failed);
                }
                log::info!("Successfully edited \"{}\" in \"{}\"", live_reply.id, item_id);
                Ok(ReconcileAction::Updated)
            }
            Err(e) => {
                log::error!("Failed to edit \"{}\" in \"{}\": {}", live_reply.id, item_id, e);
                record.last_checked = now;
                record.edited = edited;
                record.update_interval =
                    scheduler::grow_interval_after_failure(record.update_interval);
                if let Err(e) = tracked_repo::update_record(&self.db, &record) {
                    log::error!("Failed to save backoff for \"{}\": {}", item_id, e);
                }
                Ok(ReconcileAction::Failed)
            }
        }
    }

    /// Refreshes check state after a quiet look: timestamps advance, the
    /// interval doubles.
    fn note_unchanged(
        &self,
        mut record: tracked_repo::MirrorRecordRow,
        edited: Option<i64>,
        now: i64,
    ) -> Result<ReconcileAction, DatabaseError> {
        record.last_checked = now;
        record.edited = edited;
        record.update_interval = scheduler::grow_interval(record.update_interval);
        if let Err(e) = tracked_repo::update_record(&self.db, &record) {
            log::error!("Failed to save \"{}\": {}", record.tracked_item_id, e);
        }
        Ok(ReconcileAction::NoOp)
    }
}

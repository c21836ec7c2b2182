//! Adaptive recheck scheduling.
//!
//! Every tracked item self-paces: its recheck interval doubles each time a
//! check finds nothing new and resets when a change lands. The due query is
//! the sole admission control bounding API call volume.

use crate::db::{tracked_repo, Database, DatabaseError};

/// Floor for the recheck interval, in seconds.
pub const MIN_UPDATE_INTERVAL: i64 = 60;

/// Interval cap while a source is quiet.
pub const MAX_UPDATE_INTERVAL: i64 = 16_384;

/// Higher cap applied after submit failures, so a permanently failing item
/// cannot hot-loop.
pub const MAX_FAILURE_INTERVAL: i64 = 2 * MAX_UPDATE_INTERVAL;

/// Items processed per reconciliation pass.
pub const PASS_LIMIT: usize = 8;

/// Produces the ordered worklist of items due for recheck.
pub struct RecheckScheduler {
    db: Database,
    pass_limit: usize,
}

impl RecheckScheduler {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            pass_limit: PASS_LIMIT,
        }
    }

    pub fn with_pass_limit(db: Database, pass_limit: usize) -> Self {
        Self { db, pass_limit }
    }

    /// Items whose elapsed time since last check exceeds their interval,
    /// in stable creation order, at most `pass_limit` of them.
    pub fn due_items(&self, now: i64) -> Result<Vec<String>, DatabaseError> {
        tracked_repo::find_due(&self.db, now, self.pass_limit)
    }
}

/// Doubles an interval after a quiet check.
pub fn grow_interval(interval: i64) -> i64 {
    (interval * 2).clamp(MIN_UPDATE_INTERVAL, MAX_UPDATE_INTERVAL)
}

/// Doubles an interval after a failed submit; capped higher than the quiet
/// cap.
pub fn grow_interval_after_failure(interval: i64) -> i64 {
    (interval * 2).clamp(MIN_UPDATE_INTERVAL, MAX_FAILURE_INTERVAL)
}

/// Interval after a successful edit: back to the floor.
pub fn reset_interval() -> i64 {
    MIN_UPDATE_INTERVAL
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tracked_repo::{MirrorRecordRow, MirrorReplyRow};

    fn insert_item(db: &Database, id: &str, last_checked: i64, update_interval: i64) {
        tracked_repo::insert_mirrored(
            db,
            &MirrorRecordRow {
                tracked_item_id: id.to_string(),
                permalink: format!("https://www.reddit.com/r/s/comments/{}/t/", id),
                created: 0,
                edited: None,
                last_checked,
                update_interval,
            },
            &MirrorReplyRow {
                tracked_item_id: id.to_string(),
                permalink: format!("https://www.reddit.com/r/m/comments/m1/t/{}r", id),
                latest_content: String::new(),
            },
        )
        .unwrap();
    }

    #[test]
    fn test_due_predicate_boundaries() {
        let db = Database::open_in_memory().unwrap();
        insert_item(&db, "p1", 0, 60);
        let scheduler = RecheckScheduler::new(db);

        assert!(scheduler.due_items(30).unwrap().is_empty());
        // Exactly at the boundary is not yet due; strictly past it is.
        assert!(scheduler.due_items(60).unwrap().is_empty());
        assert_eq!(scheduler.due_items(61).unwrap(), vec!["p1".to_string()]);
    }

    #[test]
    fn test_due_items_respects_pass_limit() {
        let db = Database::open_in_memory().unwrap();
        for i in 0..12 {
            insert_item(&db, &format!("p{:02}", i), 0, 60);
        }
        let scheduler = RecheckScheduler::new(db);

        let due = scheduler.due_items(1_000).unwrap();
        assert_eq!(due.len(), PASS_LIMIT);
        assert_eq!(due[0], "p00");
    }

    #[test]
    fn test_grow_interval_never_exceeds_cap() {
        let mut interval = MIN_UPDATE_INTERVAL;
        for _ in 0..30 {
            interval = grow_interval(interval);
            assert!(interval <= MAX_UPDATE_INTERVAL);
            assert!(interval >= MIN_UPDATE_INTERVAL);
        }
        assert_eq!(interval, MAX_UPDATE_INTERVAL);
    }

    #[test]
    fn test_grow_interval_after_failure_cap() {
        let mut interval = MIN_UPDATE_INTERVAL;
        for _ in 0..30 {
            interval = grow_interval_after_failure(interval);
        }
        assert_eq!(interval, MAX_FAILURE_INTERVAL);
    }

    #[test]
    fn test_grow_interval_clamps_below_floor() {
        // A corrupt or zero interval recovers to the floor.
        assert_eq!(grow_interval(0), MIN_UPDATE_INTERVAL);
        assert_eq!(grow_interval(-120), MIN_UPDATE_INTERVAL);
    }

    #[test]
    fn test_reset_interval() {
        assert_eq!(reset_interval(), MIN_UPDATE_INTERVAL);
    }
}

//! Tracked item repository — CRUD for the aggregate of one mirrored source.
//!
//! A `tracked_items` row is the aggregate root; `mirror_records`,
//! `mirror_replies` and `edit_entries` rows belong to exactly one item and
//! have no independent lifecycle. Items are never deleted: an item with no
//! record/reply rows marks a source that was examined and ignored.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{Database, DatabaseError};

/// Snapshot of the last-seen state of the mirrored source content.
#[derive(Debug, Clone)]
pub struct MirrorRecordRow {
    pub tracked_item_id: String,
    pub permalink: String,
    pub created: i64,
    pub edited: Option<i64>,
    pub last_checked: i64,
    pub update_interval: i64,
}

impl MirrorRecordRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            tracked_item_id: row.get("tracked_item_id")?,
            permalink: row.get("permalink")?,
            created: row.get("created")?,
            edited: row.get("edited")?,
            last_checked: row.get("last_checked")?,
            update_interval: row.get("update_interval")?,
        })
    }
}

/// The bot's posted reply and the rendered content it last carried.
#[derive(Debug, Clone)]
pub struct MirrorReplyRow {
    pub tracked_item_id: String,
    pub permalink: String,
    pub latest_content: String,
}

impl MirrorReplyRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            tracked_item_id: row.get("tracked_item_id")?,
            permalink: row.get("permalink")?,
            latest_content: row.get("latest_content")?,
        })
    }
}

/// One appended edit annotation, ordered by insertion.
#[derive(Debug, Clone)]
pub struct EditEntryRow {
    pub id: i64,
    pub tracked_item_id: String,
    pub content: String,
    pub edit_time: i64,
}

impl EditEntryRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            tracked_item_id: row.get("tracked_item_id")?,
            content: row.get("content")?,
            edit_time: row.get("edit_time")?,
        })
    }
}

/// Checks whether a tracked item exists.
pub fn exists(db: &Database, item_id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let count: u32 = conn.query_row(
            "SELECT COUNT(*) FROM tracked_items WHERE id = ?1",
            params![item_id],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    })
}

/// Records an item with no mirror state so it is never reprocessed.
pub fn insert_ignored(db: &Database, item_id: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT OR IGNORE INTO tracked_items (id) VALUES (?1)",
            params![item_id],
        )?;
        Ok(())
    })
}

/// Inserts a freshly mirrored item: the item itself, its record and its
/// reply, atomically.
pub fn insert_mirrored(
    db: &Database,
    record: &MirrorRecordRow,
    reply: &MirrorReplyRow,
) -> Result<(), DatabaseError> {
    db.with_tx(|conn| {
        conn.execute(
            "INSERT INTO tracked_items (id) VALUES (?1)",
            params![record.tracked_item_id],
        )?;
        insert_record(conn, record)?;
        conn.execute(
            "INSERT INTO mirror_replies (tracked_item_id, permalink, latest_content)
             VALUES (?1, ?2, ?3)",
            params![reply.tracked_item_id, reply.permalink, reply.latest_content],
        )?;
        Ok(())
    })
}

fn insert_record(conn: &Connection, record: &MirrorRecordRow) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO mirror_records (tracked_item_id, permalink, created, edited,
         last_checked, update_interval)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            record.tracked_item_id,
            record.permalink,
            record.created,
            record.edited,
            record.last_checked,
            record.update_interval,
        ],
    )?;
    Ok(())
}

/// Finds the mirror record for an item, if the item was actually copied.
pub fn find_record(db: &Database, item_id: &str) -> Result<Option<MirrorRecordRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM mirror_records WHERE tracked_item_id = ?1",
                params![item_id],
                MirrorRecordRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Finds the bot reply for an item.
pub fn find_reply(db: &Database, item_id: &str) -> Result<Option<MirrorReplyRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM mirror_replies WHERE tracked_item_id = ?1",
                params![item_id],
                MirrorReplyRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Overwrites the mutable fields of a mirror record.
pub fn update_record(db: &Database, record: &MirrorRecordRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| update_record_on(conn, record))
}

fn update_record_on(conn: &Connection, record: &MirrorRecordRow) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE mirror_records SET edited=?2, last_checked=?3, update_interval=?4
         WHERE tracked_item_id=?1",
        params![
            record.tracked_item_id,
            record.edited,
            record.last_checked,
            record.update_interval,
        ],
    )?;
    Ok(())
}

/// Lists all edit entries for an item in insertion order.
pub fn list_edits(db: &Database, item_id: &str) -> Result<Vec<EditEntryRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM edit_entries WHERE tracked_item_id = ?1 ORDER BY id ASC",
        )?;
        let rows: Vec<EditEntryRow> = stmt
            .query_map(params![item_id], EditEntryRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Counts the edit entries recorded for an item.
pub fn count_edits(db: &Database, item_id: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM edit_entries WHERE tracked_item_id = ?1",
            params![item_id],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

/// Persists the outcome of a successful reconciliation: the refreshed record,
/// the new diff baseline and the appended edit entry, in one transaction.
pub fn save_reconciled(
    db: &Database,
    record: &MirrorRecordRow,
    reply: &MirrorReplyRow,
    edit_content: &str,
    edit_time: i64,
) -> Result<(), DatabaseError> {
    db.with_tx(|conn| {
        update_record_on(conn, record)?;
        conn.execute(
            "UPDATE mirror_replies SET latest_content=?2 WHERE tracked_item_id=?1",
            params![reply.tracked_item_id, reply.latest_content],
        )?;
        conn.execute(
            "INSERT INTO edit_entries (tracked_item_id, content, edit_time)
             VALUES (?1, ?2, ?3)",
            params![record.tracked_item_id, edit_content, edit_time],
        )?;
        Ok(())
    })
}

/// Returns the ids of items due for a recheck, in creation order.
///
/// The selection predicate is `now > last_checked + update_interval`; the
/// limit bounds per-pass latency.
pub fn find_due(db: &Database, now: i64, limit: usize) -> Result<Vec<String>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT t.id FROM tracked_items t
             JOIN mirror_records r ON r.tracked_item_id = t.id
             WHERE ?1 > r.last_checked + r.update_interval
             ORDER BY t.rowid ASC
             LIMIT ?2",
        )?;
        let ids: Vec<String> = stmt
            .query_map(params![now, limit as i64], |r| r.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    })
}

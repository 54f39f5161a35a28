//! Append-only audit log.
//!
//! Rows are only ever inserted here; the schema's triggers reject updates and
//! deletes from any connection.

use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{Connection, params};

use super::sqlite::{format_datetime, parse_datetime};
use crate::error::{Result, classify};
use crate::types::{AuditEntry, AuditQuery, AuditTarget, StatusId};

/// Writes one entry and returns its id. Callers run this inside the
/// transaction making the change it describes.
pub(super) fn append(
    conn: &Connection,
    author: &str,
    status: StatusId,
    target: AuditTarget,
    description: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO audit_log (author, status_id, description, target_kind, target_id, changed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            author,
            status,
            description,
            target.kind(),
            target.id(),
            format_datetime(&Utc::now()),
        ],
    )
    .map_err(classify)?;

    tracing::debug!("Audit: {}", description);
    Ok(conn.last_insert_rowid())
}

/// Entries matching `query`, oldest first. With a limit, the most recent
/// `limit` entries are returned.
pub(super) fn query(conn: &Connection, query: &AuditQuery) -> Result<Vec<AuditEntry>> {
    let limit = query.limit.map_or(-1, i64::from);
    let mut stmt = conn.prepare(
        "SELECT id, author, status_id, description, target_kind, target_id, changed_at
         FROM audit_log
         WHERE (?1 IS NULL OR (target_kind = ?1 AND target_id = ?2))
           AND (?3 IS NULL OR author = ?3)
         ORDER BY id DESC
         LIMIT ?4",
    )?;

    let rows = stmt.query_map(
        params![
            query.target.map(|t| t.kind()),
            query.target.map(|t| t.id()),
            query.author,
            limit,
        ],
        |row| {
            let kind: String = row.get(4)?;
            let target = AuditTarget::from_parts(&kind, row.get(5)?).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    4,
                    Type::Text,
                    format!("unknown audit target '{kind}'").into(),
                )
            })?;

            Ok(AuditEntry {
                id: row.get(0)?,
                author: row.get(1)?,
                status: row.get(2)?,
                description: row.get(3)?,
                target,
                changed_at: parse_datetime(&row.get::<_, String>(6)?),
            })
        },
    )?;

    let mut entries = rows.collect::<std::result::Result<Vec<_>, _>>()?;
    entries.reverse();
    Ok(entries)
}

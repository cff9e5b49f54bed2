//! Snapshot repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist one ordered snapshot of canonical records per domain and
//!   attribute kind.
//! - Keep table selection inside the store: callers name an
//!   `AttributeKind`, never a table string.
//!
//! # Invariants
//! - `list_by_domain` returns rows in insertion order.
//! - `replace_snapshot` is all-or-nothing: readers see either the previous
//!   snapshot or the new one.
//! - Rows that fail to decode are surfaced as `InvalidData`, never skipped.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::attribute::AttributeKind;
use crate::model::record::CanonicalRecord;
use log::{debug, info};
use rusqlite::{params, Connection, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    Serialization(serde_json::Error),
    InvalidData(String),
    /// Connection was not migrated (or migrated by an older binary).
    SchemaNotReady { found: u32, expected: u32 },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "snapshot row serialization failed: {err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted snapshot data: {message}"),
            Self::SchemaNotReady { found, expected } => write!(
                f,
                "snapshot store schema v{found} is not ready, expected v{expected}"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::InvalidData(_) | Self::SchemaNotReady { .. } => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Replace-semantics store for domain snapshots.
pub trait SnapshotRepository {
    /// Deletes every row of `domain`. Idempotent; returns the removed count.
    fn clear(&self, kind: AttributeKind, domain: &str) -> RepoResult<usize>;
    /// Appends one record after the domain's current last row.
    fn insert(&self, kind: AttributeKind, domain: &str, record: &CanonicalRecord)
        -> RepoResult<()>;
    fn list_by_domain(&self, kind: AttributeKind, domain: &str)
        -> RepoResult<Vec<CanonicalRecord>>;
    /// Clears and rewrites the domain snapshot inside one transaction.
    fn replace_snapshot(
        &mut self,
        kind: AttributeKind,
        domain: &str,
        records: &[CanonicalRecord],
    ) -> RepoResult<usize>;
}

/// SQLite-backed snapshot repository.
pub struct SqliteSnapshotRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteSnapshotRepository<'conn> {
    /// Wraps a connection opened through `open_db*`.
    ///
    /// Fails with `SchemaNotReady` when migrations were not applied.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        let found: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        let expected = latest_version();
        if found != expected {
            return Err(RepoError::SchemaNotReady { found, expected });
        }
        Ok(Self { conn })
    }
}

impl SnapshotRepository for SqliteSnapshotRepository<'_> {
    fn clear(&self, kind: AttributeKind, domain: &str) -> RepoResult<usize> {
        let removed = clear_rows(self.conn, kind, domain)?;
        debug!(
            "event=snapshot_clear module=repo table={} rows={}",
            kind.table_name(),
            removed
        );
        Ok(removed)
    }

    fn insert(
        &self,
        kind: AttributeKind,
        domain: &str,
        record: &CanonicalRecord,
    ) -> RepoResult<()> {
        let position = next_position(self.conn, kind, domain)?;
        insert_row(self.conn, kind, domain, position, record)
    }

    fn list_by_domain(
        &self,
        kind: AttributeKind,
        domain: &str,
    ) -> RepoResult<Vec<CanonicalRecord>> {
        let sql = format!(
            "SELECT id, value FROM {} WHERE domain = ?1 ORDER BY position ASC, id ASC;",
            kind.table_name()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([domain])?;

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let id: i64 = row.get(0)?;
            let value: String = row.get(1)?;
            let record = serde_json::from_str(&value).map_err(|err| {
                RepoError::InvalidData(format!(
                    "row {id} in {} does not decode: {err}",
                    kind.table_name()
                ))
            })?;
            records.push(record);
        }
        Ok(records)
    }

    fn replace_snapshot(
        &mut self,
        kind: AttributeKind,
        domain: &str,
        records: &[CanonicalRecord],
    ) -> RepoResult<usize> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let removed = clear_rows(&tx, kind, domain)?;
        for (position, record) in records.iter().enumerate() {
            insert_row(&tx, kind, domain, position as i64, record)?;
        }
        tx.commit()?;

        info!(
            "event=snapshot_replace module=repo table={} removed={} rows={}",
            kind.table_name(),
            removed,
            records.len()
        );
        Ok(records.len())
    }
}

fn clear_rows(conn: &Connection, kind: AttributeKind, domain: &str) -> RepoResult<usize> {
    let sql = format!("DELETE FROM {} WHERE domain = ?1;", kind.table_name());
    Ok(conn.execute(&sql, [domain])?)
}

fn next_position(conn: &Connection, kind: AttributeKind, domain: &str) -> RepoResult<i64> {
    let sql = format!(
        "SELECT COALESCE(MAX(position) + 1, 0) FROM {} WHERE domain = ?1;",
        kind.table_name()
    );
    Ok(conn.query_row(&sql, [domain], |row| row.get(0))?)
}

fn insert_row(
    conn: &Connection,
    kind: AttributeKind,
    domain: &str,
    position: i64,
    record: &CanonicalRecord,
) -> RepoResult<()> {
    let value = serde_json::to_string(record)?;
    let sql = format!(
        "INSERT INTO {} (domain, position, value) VALUES (?1, ?2, ?3);",
        kind.table_name()
    );
    conn.execute(&sql, params![domain, position, value])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{RepoError, SnapshotRepository, SqliteSnapshotRepository};
    use crate::db::open_db_in_memory;
    use crate::model::attribute::AttributeKind;
    use crate::model::date::ProvenanceDate;
    use crate::model::record::CanonicalRecord;
    use chrono::NaiveDate;
    use rusqlite::Connection;

    fn record(value: &str) -> CanonicalRecord {
        let today = NaiveDate::from_ymd_opt(2024, 2, 2).unwrap();
        CanonicalRecord::new(value, value, ProvenanceDate::parse("20230101"), today)
    }

    #[test]
    fn rejects_unmigrated_connection() {
        let mut conn = Connection::open_in_memory().unwrap();
        let err = SqliteSnapshotRepository::try_new(&mut conn)
            .err()
            .expect("raw connection must be rejected");
        assert!(matches!(err, RepoError::SchemaNotReady { found: 0, .. }));
    }

    #[test]
    fn insert_appends_in_order_per_domain() {
        let mut conn = open_db_in_memory().unwrap();
        let repo = SqliteSnapshotRepository::try_new(&mut conn).unwrap();
        repo.insert(AttributeKind::Email, "a.ch", &record("z@a.ch")).unwrap();
        repo.insert(AttributeKind::Email, "b.ch", &record("x@b.ch")).unwrap();
        repo.insert(AttributeKind::Email, "a.ch", &record("b@a.ch")).unwrap();

        let values: Vec<_> = repo
            .list_by_domain(AttributeKind::Email, "a.ch")
            .unwrap()
            .into_iter()
            .map(|r| r.display_value)
            .collect();
        assert_eq!(values, vec!["z@a.ch", "b@a.ch"]);
        assert!(repo
            .list_by_domain(AttributeKind::Phone, "a.ch")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn clear_is_idempotent() {
        let mut conn = open_db_in_memory().unwrap();
        let repo = SqliteSnapshotRepository::try_new(&mut conn).unwrap();
        repo.insert(AttributeKind::Phone, "a.ch", &record("+41791234567")).unwrap();
        assert_eq!(repo.clear(AttributeKind::Phone, "a.ch").unwrap(), 1);
        assert_eq!(repo.clear(AttributeKind::Phone, "a.ch").unwrap(), 0);
    }

    #[test]
    fn corrupt_rows_surface_as_invalid_data() {
        let mut conn = open_db_in_memory().unwrap();
        conn.execute(
            "INSERT INTO endpoints (domain, position, value) VALUES ('a.ch', 0, 'not json');",
            [],
        )
        .unwrap();
        let repo = SqliteSnapshotRepository::try_new(&mut conn).unwrap();
        let err = repo
            .list_by_domain(AttributeKind::Endpoint, "a.ch")
            .unwrap_err();
        assert!(matches!(err, RepoError::InvalidData(_)));
    }
}

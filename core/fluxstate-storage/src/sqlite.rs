//! SQLite-backed persistence gateway.
//!
//! All collections share one `records` table. Domain fields live in the
//! `data` column as JSON and are filtered/ordered with SQLite's JSON
//! functions. `AUTOINCREMENT` guarantees local ids are never reused, and
//! partial unique indexes keep remote ids and natural keys unique per
//! `(collection, owner_id)`.

use crate::error::{StorageError, StorageResult};
use crate::gateway::{
    Clause, Direction, OrderBy, PersistenceGateway, Predicate, Row, UpsertKey, WriteOp,
};
use fluxstate_types::{LocalId, OwnerId, RemoteId};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS records (
        local_id INTEGER PRIMARY KEY AUTOINCREMENT,
        collection TEXT NOT NULL,
        owner_id INTEGER NOT NULL,
        remote_id INTEGER,
        natural_key TEXT,
        is_local_only INTEGER NOT NULL DEFAULT 0,
        is_locally_modified INTEGER NOT NULL DEFAULT 0,
        data TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_records_owner
        ON records (collection, owner_id);

    CREATE UNIQUE INDEX IF NOT EXISTS idx_records_remote
        ON records (collection, owner_id, remote_id)
        WHERE remote_id IS NOT NULL;

    CREATE UNIQUE INDEX IF NOT EXISTS idx_records_natural
        ON records (collection, owner_id, natural_key)
        WHERE natural_key IS NOT NULL;
";

const COLUMNS: &str = "local_id, collection, owner_id, remote_id, natural_key, \
                       is_local_only, is_locally_modified, data";

/// Persistence gateway backed by a single SQLite connection.
#[derive(Clone)]
pub struct SqliteGateway {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteGateway {
    /// Opens (or creates) a gateway database at the given path.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        debug!("opening record database at {}", path.display());
        Self::with_connection(Connection::open(path)?)
    }

    /// Opens an in-memory gateway (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StorageResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

impl PersistenceGateway for SqliteGateway {
    fn insert(&self, row: &Row) -> StorageResult<LocalId> {
        let conn = self.conn()?;
        insert_row(&conn, row, None)
    }

    fn upsert(&self, row: &Row, key: UpsertKey) -> StorageResult<LocalId> {
        let conn = self.conn()?;
        upsert_row(&conn, row, key)
    }

    fn delete_where(&self, predicate: &Predicate) -> StorageResult<usize> {
        let conn = self.conn()?;
        delete_rows(&conn, predicate)
    }

    fn count_where(&self, predicate: &Predicate) -> StorageResult<usize> {
        let conn = self.conn()?;
        let (filter, params) = where_clause(predicate)?;
        let sql = format!("SELECT COUNT(*) FROM records WHERE {filter}");
        let count: i64 = conn.query_row(&sql, params_from_iter(params), |r| r.get(0))?;
        usize::try_from(count).map_err(|_| StorageError::InvalidData(format!("bad count {count}")))
    }

    fn select_where(&self, predicate: &Predicate, order: &OrderBy) -> StorageResult<Vec<Row>> {
        let conn = self.conn()?;
        let (filter, mut params) = where_clause(predicate)?;
        let ordering = order_clause(order, &mut params)?;
        let sql = format!("SELECT {COLUMNS} FROM records WHERE {filter}{ordering}");

        let mut stmt = conn.prepare(&sql)?;
        let raw_rows = stmt.query_map(params_from_iter(params), |r| {
            Ok(RawRow {
                local_id: r.get(0)?,
                collection: r.get(1)?,
                owner_id: r.get(2)?,
                remote_id: r.get(3)?,
                natural_key: r.get(4)?,
                is_local_only: r.get(5)?,
                is_locally_modified: r.get(6)?,
                data: r.get(7)?,
            })
        })?;

        let mut rows = Vec::new();
        for raw in raw_rows {
            rows.push(raw?.into_row()?);
        }
        Ok(rows)
    }

    fn write_all(&self, ops: &[WriteOp]) -> StorageResult<Vec<usize>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut touched = Vec::with_capacity(ops.len());
        for op in ops {
            touched.push(apply_op(&tx, op)?);
        }
        tx.commit()?;
        debug!(
            "committed {:?} rows across {:?}",
            touched,
            ops.iter().map(WriteOp::collection_name).collect::<Vec<_>>()
        );
        Ok(touched)
    }
}

fn apply_op(conn: &Connection, op: &WriteOp) -> StorageResult<usize> {
    match op {
        WriteOp::Upsert { rows, key } => {
            let mut stored = HashSet::new();
            for row in rows {
                stored.insert(upsert_row(conn, row, *key)?);
            }
            Ok(stored.len())
        }
        WriteOp::Replace { predicate, rows } => {
            delete_rows(conn, predicate)?;
            let mut stored = HashSet::new();
            for row in rows {
                let local_id = match replace_key(row) {
                    Some(key) => upsert_row(conn, row, key)?,
                    None => insert_row(conn, row, None)?,
                };
                stored.insert(local_id);
            }
            Ok(stored.len())
        }
        WriteOp::Delete(predicate) => delete_rows(conn, predicate),
    }
}

/// Identity a replacement row is matched on against rows stored earlier
/// in the same replace.
fn replace_key(row: &Row) -> Option<UpsertKey> {
    if row.remote_id.is_some() {
        Some(UpsertKey::RemoteId)
    } else if row.natural_key.is_some() {
        Some(UpsertKey::NaturalKey)
    } else {
        None
    }
}

struct RawRow {
    local_id: i64,
    collection: String,
    owner_id: i64,
    remote_id: Option<i64>,
    natural_key: Option<String>,
    is_local_only: bool,
    is_locally_modified: bool,
    data: String,
}

impl RawRow {
    fn into_row(self) -> StorageResult<Row> {
        let local_id = LocalId::new(self.local_id)
            .map_err(|e| StorageError::InvalidData(e.to_string()))?;
        let remote_id = self.remote_id.map(remote_from_sql).transpose()?;
        Ok(Row {
            local_id: Some(local_id),
            collection: self.collection,
            owner_id: OwnerId::new(self.owner_id),
            remote_id,
            natural_key: self.natural_key,
            is_local_only: self.is_local_only,
            is_locally_modified: self.is_locally_modified,
            data: serde_json::from_str(&self.data)?,
        })
    }
}

fn check_row(row: &Row) -> StorageResult<()> {
    if row.is_local_only && row.remote_id.is_some() {
        return Err(StorageError::InvalidData(format!(
            "local-only row in {} carries remote id",
            row.collection
        )));
    }
    Ok(())
}

fn insert_row(conn: &Connection, row: &Row, local_id: Option<LocalId>) -> StorageResult<LocalId> {
    check_row(row)?;
    let remote_id = row.remote_id.map(remote_to_sql).transpose()?;
    conn.execute(
        "INSERT INTO records (local_id, collection, owner_id, remote_id, natural_key, \
         is_local_only, is_locally_modified, data) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            local_id.map(i64::from),
            row.collection,
            row.owner_id.get(),
            remote_id,
            row.natural_key,
            row.is_local_only,
            row.is_locally_modified,
            serde_json::to_string(&row.data)?,
        ],
    )?;
    LocalId::new(conn.last_insert_rowid()).map_err(|e| StorageError::InvalidData(e.to_string()))
}

fn update_row(conn: &Connection, local_id: LocalId, row: &Row) -> StorageResult<()> {
    check_row(row)?;
    let remote_id = row.remote_id.map(remote_to_sql).transpose()?;
    conn.execute(
        "UPDATE records SET owner_id = ?1, remote_id = ?2, natural_key = ?3, \
         is_local_only = ?4, is_locally_modified = ?5, data = ?6 WHERE local_id = ?7",
        params![
            row.owner_id.get(),
            remote_id,
            row.natural_key,
            row.is_local_only,
            row.is_locally_modified,
            serde_json::to_string(&row.data)?,
            local_id.get(),
        ],
    )?;
    Ok(())
}

fn upsert_row(conn: &Connection, row: &Row, key: UpsertKey) -> StorageResult<LocalId> {
    match find_existing(conn, row, key)? {
        Some(local_id) => {
            update_row(conn, local_id, row)?;
            Ok(local_id)
        }
        None => {
            let explicit = match key {
                UpsertKey::LocalId => row.local_id,
                UpsertKey::RemoteId | UpsertKey::NaturalKey => None,
            };
            insert_row(conn, row, explicit)
        }
    }
}

fn find_existing(conn: &Connection, row: &Row, key: UpsertKey) -> StorageResult<Option<LocalId>> {
    let found: Option<i64> = match key {
        UpsertKey::LocalId => match row.local_id {
            None => None,
            Some(local_id) => conn
                .query_row(
                    "SELECT local_id FROM records WHERE local_id = ?1 AND collection = ?2",
                    params![local_id.get(), row.collection],
                    |r| r.get(0),
                )
                .optional()?,
        },
        UpsertKey::RemoteId => {
            let remote_id = row.remote_id.ok_or_else(|| {
                StorageError::InvalidData(format!(
                    "upsert by remote id on {} row without one",
                    row.collection
                ))
            })?;
            conn.query_row(
                "SELECT local_id FROM records \
                 WHERE collection = ?1 AND owner_id = ?2 AND remote_id = ?3",
                params![row.collection, row.owner_id.get(), remote_to_sql(remote_id)?],
                |r| r.get(0),
            )
            .optional()?
        }
        UpsertKey::NaturalKey => {
            let natural_key = row.natural_key.as_deref().ok_or_else(|| {
                StorageError::InvalidData(format!(
                    "upsert by natural key on {} row without one",
                    row.collection
                ))
            })?;
            conn.query_row(
                "SELECT local_id FROM records \
                 WHERE collection = ?1 AND owner_id = ?2 AND natural_key = ?3",
                params![row.collection, row.owner_id.get(), natural_key],
                |r| r.get(0),
            )
            .optional()?
        }
    };

    found
        .map(|raw| LocalId::new(raw).map_err(|e| StorageError::InvalidData(e.to_string())))
        .transpose()
}

fn delete_rows(conn: &Connection, predicate: &Predicate) -> StorageResult<usize> {
    let (filter, params) = where_clause(predicate)?;
    let sql = format!("DELETE FROM records WHERE {filter}");
    Ok(conn.execute(&sql, params_from_iter(params))?)
}

fn where_clause(predicate: &Predicate) -> StorageResult<(String, Vec<SqlValue>)> {
    let mut sql = String::from("collection = ?");
    let mut params = vec![SqlValue::Text(predicate.collection_name().to_string())];

    for clause in predicate.clauses() {
        match clause {
            Clause::Owner(owner_id) => {
                sql.push_str(" AND owner_id = ?");
                params.push(SqlValue::Integer(owner_id.get()));
            }
            Clause::LocalId(local_id) => {
                sql.push_str(" AND local_id = ?");
                params.push(SqlValue::Integer(local_id.get()));
            }
            Clause::RemoteId(remote_id) => {
                sql.push_str(" AND remote_id = ?");
                params.push(SqlValue::Integer(remote_to_sql(*remote_id)?));
            }
            Clause::NaturalKey(key) => {
                sql.push_str(" AND natural_key = ?");
                params.push(SqlValue::Text(key.clone()));
            }
            Clause::LocalOnly(flag) => {
                sql.push_str(" AND is_local_only = ?");
                params.push(SqlValue::Integer(i64::from(*flag)));
            }
            Clause::LocallyModified(flag) => {
                sql.push_str(" AND is_locally_modified = ?");
                params.push(SqlValue::Integer(i64::from(*flag)));
            }
            Clause::FieldEq(field, value) => {
                params.push(SqlValue::Text(json_path(field)?));
                match json_to_sql(value) {
                    Some(v) => {
                        sql.push_str(" AND json_extract(data, ?) = ?");
                        params.push(v);
                    }
                    None => sql.push_str(" AND json_extract(data, ?) IS NULL"),
                }
            }
        }
    }

    Ok((sql, params))
}

fn order_clause(order: &OrderBy, params: &mut Vec<SqlValue>) -> StorageResult<String> {
    let keyword = |d: &Direction| match d {
        Direction::Asc => "ASC",
        Direction::Desc => "DESC",
    };
    Ok(match order {
        OrderBy::LocalId(direction) => format!(" ORDER BY local_id {}", keyword(direction)),
        OrderBy::Field(field, direction) => {
            params.push(SqlValue::Text(json_path(field)?));
            format!(
                " ORDER BY json_extract(data, ?) {}, local_id ASC",
                keyword(direction)
            )
        }
    })
}

/// Top-level field names only; anything else is rejected rather than
/// spliced into a JSON path.
fn json_path(field: &str) -> StorageResult<String> {
    let valid = !field.is_empty() && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(format!("$.{field}"))
    } else {
        Err(StorageError::InvalidData(format!("invalid field name {field:?}")))
    }
}

/// SQL value comparable with `json_extract` output. `None` means JSON null.
fn json_to_sql(value: &Value) -> Option<SqlValue> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(SqlValue::Integer(i64::from(*b))),
        Value::Number(n) => Some(match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        }),
        Value::String(s) => Some(SqlValue::Text(s.clone())),
        other => Some(SqlValue::Text(other.to_string())),
    }
}

fn remote_to_sql(remote_id: RemoteId) -> StorageResult<i64> {
    i64::try_from(remote_id.get())
        .map_err(|_| StorageError::InvalidData(format!("remote id {remote_id} out of range")))
}

fn remote_from_sql(raw: i64) -> StorageResult<RemoteId> {
    u64::try_from(raw)
        .map_err(|_| StorageError::InvalidData(format!("negative remote id {raw}")))
        .and_then(|v| RemoteId::new(v).map_err(|e| StorageError::InvalidData(e.to_string())))
}

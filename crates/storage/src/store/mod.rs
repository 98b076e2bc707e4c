#![forbid(unsafe_code)]

mod apply;
mod error;
mod history;
mod schema;
mod snapshot;
mod types;

pub use error::StoreError;
pub use types::{AppliedPlan, EventRow, UndoApplied};

use mesh_core::ids::{UserId, WorkspaceId};
use mesh_core::model::{Actor, CanvasLock};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DB_FILE: &str = "mindmesh.db";

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    storage_dir: PathBuf,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let conn = Connection::open(storage_dir.join(DB_FILE))?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(&schema::full_schema_sql())?;
        conn.execute(
            "INSERT OR IGNORE INTO meta(key, value) VALUES (?1, ?2)",
            params!["schema_version", "v0"],
        )?;

        Ok(Self { conn, storage_dir })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn workspace_init(&mut self, workspace: &WorkspaceId) -> Result<(), StoreError> {
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        ensure_workspace_tx(&tx, workspace.as_str(), now_ms)?;
        tx.commit()?;
        Ok(())
    }

    /// One consistent read of the whole workspace graph.
    pub fn graph_snapshot(
        &mut self,
        workspace: &WorkspaceId,
    ) -> Result<mesh_core::model::GraphSnapshot, StoreError> {
        let tx = self.conn.transaction()?;
        let snapshot = snapshot::snapshot_tx(&tx, workspace)?;
        tx.commit()?;
        Ok(snapshot)
    }

    /// Acquires the exclusive canvas lock for `user`. Re-acquiring a lock
    /// the same user already holds returns the existing lock unchanged.
    pub fn lock_acquire(
        &mut self,
        workspace: &WorkspaceId,
        user: &UserId,
    ) -> Result<CanvasLock, StoreError> {
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        require_workspace_tx(&tx, workspace.as_str())?;

        if let Some(lock) = lock_row_tx(&tx, workspace.as_str())? {
            if &lock.holder == user {
                tx.commit()?;
                return Ok(lock);
            }
            return Err(StoreError::LockHeld {
                holder: lock.holder.into_string(),
            });
        }

        tx.execute(
            "INSERT INTO canvas_locks(workspace, holder, issued_at_ms) VALUES (?1, ?2, ?3)",
            params![workspace.as_str(), user.as_str(), now_ms],
        )?;
        tx.commit()?;
        Ok(CanvasLock {
            holder: user.clone(),
            issued_at_ms: now_ms,
        })
    }

    /// Releases the canvas lock. Releasing an already-free canvas is a
    /// no-op; releasing a lock held by someone else is a violation.
    pub fn lock_release(
        &mut self,
        workspace: &WorkspaceId,
        user: &UserId,
    ) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        require_workspace_tx(&tx, workspace.as_str())?;

        match lock_row_tx(&tx, workspace.as_str())? {
            None => {}
            Some(lock) if &lock.holder == user => {
                tx.execute(
                    "DELETE FROM canvas_locks WHERE workspace=?1",
                    params![workspace.as_str()],
                )?;
            }
            Some(lock) => {
                return Err(StoreError::LockViolation {
                    holder: Some(lock.holder.into_string()),
                });
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn lock_state(
        &mut self,
        workspace: &WorkspaceId,
    ) -> Result<Option<CanvasLock>, StoreError> {
        let tx = self.conn.transaction()?;
        let lock = lock_row_tx(&tx, workspace.as_str())?;
        tx.commit()?;
        Ok(lock)
    }

    /// Event feed for observers, ordered by sequence. `after` is an opaque
    /// cursor (`event_id` of the last event already seen).
    pub fn events_list(
        &self,
        workspace: &WorkspaceId,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<EventRow>, StoreError> {
        let after_seq = match after {
            Some(cursor) => parse_event_cursor(cursor)?,
            None => 0,
        };
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let mut stmt = self.conn.prepare(
            "SELECT seq, ts_ms, type, payload_json FROM events \
             WHERE workspace=?1 AND seq>?2 ORDER BY seq ASC LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![workspace.as_str(), after_seq, limit], |row| {
            Ok(EventRow {
                seq: row.get(0)?,
                ts_ms: row.get(1)?,
                event_type: row.get(2)?,
                payload_json: row.get(3)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration,
        Err(_) => return 0,
    };

    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}

fn ensure_workspace_tx(
    tx: &Transaction<'_>,
    workspace: &str,
    now_ms: i64,
) -> Result<(), StoreError> {
    tx.execute(
        "INSERT OR IGNORE INTO workspaces(workspace, created_at_ms) VALUES (?1, ?2)",
        params![workspace, now_ms],
    )?;
    Ok(())
}

fn require_workspace_tx(tx: &Transaction<'_>, workspace: &str) -> Result<(), StoreError> {
    let exists: Option<i64> = tx
        .query_row(
            "SELECT 1 FROM workspaces WHERE workspace=?1",
            params![workspace],
            |row| row.get(0),
        )
        .optional()?;
    if exists.is_none() {
        return Err(StoreError::UnknownWorkspace);
    }
    Ok(())
}

fn next_counter_tx(tx: &Transaction<'_>, workspace: &str, name: &str) -> Result<i64, StoreError> {
    let current: i64 = tx
        .query_row(
            "SELECT value FROM counters WHERE workspace=?1 AND name=?2",
            params![workspace, name],
            |row| row.get(0),
        )
        .optional()?
        .unwrap_or(0);
    let next = current + 1;
    tx.execute(
        r#"
        INSERT INTO counters(workspace, name, value) VALUES (?1, ?2, ?3)
        ON CONFLICT(workspace, name) DO UPDATE SET value=excluded.value
        "#,
        params![workspace, name, next],
    )?;
    Ok(next)
}

fn insert_event_tx(
    tx: &Transaction<'_>,
    workspace: &str,
    ts_ms: i64,
    event_type: &str,
    payload_json: &str,
) -> Result<EventRow, StoreError> {
    tx.execute(
        "INSERT INTO events(workspace, ts_ms, type, payload_json) VALUES (?1, ?2, ?3, ?4)",
        params![workspace, ts_ms, event_type, payload_json],
    )?;
    Ok(EventRow {
        seq: tx.last_insert_rowid(),
        ts_ms,
        event_type: event_type.to_string(),
        payload_json: payload_json.to_string(),
    })
}

fn lock_row_tx(tx: &Transaction<'_>, workspace: &str) -> Result<Option<CanvasLock>, StoreError> {
    let row: Option<(String, i64)> = tx
        .query_row(
            "SELECT holder, issued_at_ms FROM canvas_locks WHERE workspace=?1",
            params![workspace],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let Some((holder, issued_at_ms)) = row else {
        return Ok(None);
    };
    let holder =
        UserId::try_new(holder).map_err(|_| StoreError::InvalidInput("stored lock holder"))?;
    Ok(Some(CanvasLock {
        holder,
        issued_at_ms,
    }))
}

/// Lock discipline at the persistence boundary, re-checked inside the same
/// transaction that applies the mutations. A user must hold the lock;
/// system-originated mutations run only while the canvas is unlocked.
fn verify_lock_tx(tx: &Transaction<'_>, workspace: &str, actor: &Actor) -> Result<(), StoreError> {
    let lock = lock_row_tx(tx, workspace)?;
    match actor {
        Actor::User(user) => match lock {
            Some(lock) if &lock.holder == user => Ok(()),
            Some(lock) => Err(StoreError::LockViolation {
                holder: Some(lock.holder.into_string()),
            }),
            None => Err(StoreError::LockViolation { holder: None }),
        },
        Actor::System => match lock {
            None => Ok(()),
            Some(lock) => Err(StoreError::LockViolation {
                holder: Some(lock.holder.into_string()),
            }),
        },
    }
}

fn parse_event_cursor(cursor: &str) -> Result<i64, StoreError> {
    cursor
        .strip_prefix("evt_")
        .and_then(|digits| digits.parse::<i64>().ok())
        .ok_or(StoreError::InvalidInput("malformed event cursor"))
}

#![forbid(unsafe_code)]

use super::apply::write_mutation_tx;
use super::{
    SqliteStore, StoreError, UndoApplied, insert_event_tx, now_ms, snapshot, verify_lock_tx,
};
use mesh_core::ids::{UserId, WorkspaceId};
use mesh_core::model::Actor;
use mesh_core::plan::{PlanMutation, apply_to_snapshot};
use rusqlite::{OptionalExtension, params};

impl SqliteStore {
    /// Rolls back the most recently executed plan by applying its stored
    /// inverse batch. One step only; the undo itself is not undoable, and
    /// executing any new plan retires the rollback window.
    pub fn undo_last(
        &mut self,
        workspace: &WorkspaceId,
        user: &UserId,
    ) -> Result<UndoApplied, StoreError> {
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;

        let pre = snapshot::snapshot_tx(&tx, workspace)?;
        verify_lock_tx(&tx, workspace.as_str(), &Actor::User(user.clone()))?;

        let row: Option<(i64, String, String)> = tx
            .query_row(
                "SELECT seq, plan_id, inverse_json FROM plan_history \
                 WHERE workspace=?1 ORDER BY seq DESC LIMIT 1",
                params![workspace.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        let Some((seq, plan_id, inverse_json)) = row else {
            return Err(StoreError::HistoryEmpty);
        };

        let inverse: Vec<PlanMutation> = serde_json::from_str(&inverse_json)?;
        let mut working = pre;
        for mutation in &inverse {
            apply_to_snapshot(&mut working, mutation)?;
            write_mutation_tx(&tx, workspace.as_str(), &working, mutation)?;
        }

        tx.execute(
            "DELETE FROM plan_history WHERE workspace=?1 AND seq=?2",
            params![workspace.as_str(), seq],
        )?;

        let payload = serde_json::json!({
            "plan_id": plan_id,
            "mutations": inverse.len(),
        });
        let event = insert_event_tx(
            &tx,
            workspace.as_str(),
            now_ms,
            "plan_undone",
            &payload.to_string(),
        )?;

        tx.commit()?;
        Ok(UndoApplied {
            plan_id,
            mutations_applied: inverse.len(),
            event,
        })
    }

    /// Number of plans currently reversible (zero or one).
    pub fn history_len(&self, workspace: &WorkspaceId) -> Result<usize, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM plan_history WHERE workspace=?1",
            params![workspace.as_str()],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

#![forbid(unsafe_code)]

use crate::error::EngineError;
use mesh_core::ids::{UserId, WorkspaceId};
use mesh_core::model::Actor;
use mesh_core::plan::Plan;
use mesh_storage::{AppliedPlan, SqliteStore, StoreError, UndoApplied};

/// Executes a plan atomically. The store re-verifies the lock discipline
/// and re-validates every mutation inside its transaction, so a plan built
/// against a snapshot that has since changed fails as `StalePlan` with
/// nothing applied.
pub fn execute_plan(
    store: &mut SqliteStore,
    workspace: &WorkspaceId,
    actor: &Actor,
    plan: &Plan,
) -> Result<AppliedPlan, EngineError> {
    store.apply_plan(workspace, actor, plan).map_err(|err| match err {
            StoreError::LockViolation { holder } => EngineError::LockViolation { holder },
            StoreError::Plan(plan_err) => EngineError::StalePlan(plan_err),
            StoreError::Sql(_) | StoreError::Io(_) => EngineError::PartialFailure {
                reason: err.to_string(),
            },
            other => EngineError::Store(other),
        })
}

/// Rolls back the most recent plan for the lock-holding user.
pub fn undo_last(
    store: &mut SqliteStore,
    workspace: &WorkspaceId,
    user: &UserId,
) -> Result<UndoApplied, EngineError> {
    store.undo_last(workspace, user).map_err(|err| match err {
        StoreError::HistoryEmpty => EngineError::NothingToUndo,
        StoreError::LockViolation { holder } => EngineError::LockViolation { holder },
        other => EngineError::Store(other),
    })
}

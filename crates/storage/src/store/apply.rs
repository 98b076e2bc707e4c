#![forbid(unsafe_code)]

use super::{
    AppliedPlan, SqliteStore, StoreError, insert_event_tx, next_counter_tx, now_ms, snapshot,
    verify_lock_tx,
};
use mesh_core::ids::WorkspaceId;
use mesh_core::model::{Actor, Container, GraphSnapshot, Node, PortSide};
use mesh_core::plan::{Plan, PlanMutation, apply_to_snapshot, invert_mutations};
use rusqlite::{Transaction, params};
use serde_json::{Value, json};
use std::time::Instant;

impl SqliteStore {
    /// Applies a plan atomically: every mutation lands or none does. The
    /// lock discipline is re-verified inside the transaction, the inverse
    /// batch is captured against the pre-state, and the telemetry rows
    /// (one per mutation with a before/after summary, one per plan with
    /// the mutation count and duration) land in the same transaction.
    pub fn apply_plan(
        &mut self,
        workspace: &WorkspaceId,
        actor: &Actor,
        plan: &Plan,
    ) -> Result<AppliedPlan, StoreError> {
        if plan.mutations.is_empty() {
            return Err(StoreError::InvalidInput("empty mutation batch"));
        }
        let started = Instant::now();
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;

        let pre = snapshot::snapshot_tx(&tx, workspace)?;
        verify_lock_tx(&tx, workspace.as_str(), actor)?;
        let inverse = invert_mutations(&pre, &plan.mutations)?;

        let mut recorded = Vec::with_capacity(plan.mutations.len() + 1);
        let mut working = pre;
        for mutation in &plan.mutations {
            let before = summarize_target(&working, mutation);
            apply_to_snapshot(&mut working, mutation)?;
            write_mutation_tx(&tx, workspace.as_str(), &working, mutation)?;
            let payload = json!({
                "target": mutation_target(workspace.as_str(), mutation),
                "before": before,
                "after": summarize_target(&working, mutation),
            });
            recorded.push(insert_event_tx(
                &tx,
                workspace.as_str(),
                now_ms,
                mutation_event_type(mutation),
                &payload.to_string(),
            )?);
        }

        let seq = next_counter_tx(&tx, workspace.as_str(), "plans")?;
        let plan_id = format!("plan-{seq:03}");

        // Single-step rollback: executing a plan retires the previous one.
        tx.execute(
            "DELETE FROM plan_history WHERE workspace=?1",
            params![workspace.as_str()],
        )?;
        tx.execute(
            "INSERT INTO plan_history(workspace, plan_id, applied_json, inverse_json, ts_ms) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                workspace.as_str(),
                plan_id,
                serde_json::to_string(&plan.mutations)?,
                serde_json::to_string(&inverse)?,
                now_ms
            ],
        )?;

        let duration_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);
        let summary = json!({
            "plan_id": plan_id,
            "mutations": plan.mutations.len(),
            "duration_ms": duration_ms,
            "notifications": &plan.events,
        });
        recorded.push(insert_event_tx(
            &tx,
            workspace.as_str(),
            now_ms,
            "plan_executed",
            &summary.to_string(),
        )?);

        tx.commit()?;
        Ok(AppliedPlan {
            plan_id,
            mutations_applied: plan.mutations.len(),
            events: recorded,
        })
    }
}

fn mutation_event_type(mutation: &PlanMutation) -> &'static str {
    match mutation {
        PlanMutation::CreateContainer { .. } => "container_created",
        PlanMutation::UpdateContainer { .. } => "container_updated",
        PlanMutation::DeleteContainer { .. } => "container_deleted",
        PlanMutation::CreateNode { .. } => "node_created",
        PlanMutation::DeleteNode { .. } => "node_deleted",
        PlanMutation::ActivateGhost { .. } => "ghost_activated",
        PlanMutation::RevertGhost { .. } => "ghost_reverted",
        PlanMutation::SetLayoutBroken { .. } => "layout_flag_set",
    }
}

fn mutation_target(workspace: &str, mutation: &PlanMutation) -> String {
    match mutation {
        PlanMutation::CreateContainer { container } => container.id.as_str().to_string(),
        PlanMutation::UpdateContainer { id, .. }
        | PlanMutation::DeleteContainer { id }
        | PlanMutation::ActivateGhost { id, .. }
        | PlanMutation::RevertGhost { id } => id.as_str().to_string(),
        PlanMutation::CreateNode { node } => node.id.as_str().to_string(),
        PlanMutation::DeleteNode { id } => id.as_str().to_string(),
        PlanMutation::SetLayoutBroken { .. } => workspace.to_string(),
    }
}

/// Summary of the entity a mutation touches, as it stands in `snapshot`.
/// Called once before and once after application, so a deleted entity
/// summarizes to null on the after side and a created one on the before
/// side.
fn summarize_target(snapshot: &GraphSnapshot, mutation: &PlanMutation) -> Value {
    match mutation {
        PlanMutation::CreateContainer { container } => {
            container_summary_opt(snapshot.container(&container.id))
        }
        PlanMutation::UpdateContainer { id, .. }
        | PlanMutation::DeleteContainer { id }
        | PlanMutation::ActivateGhost { id, .. }
        | PlanMutation::RevertGhost { id } => container_summary_opt(snapshot.container(id)),
        PlanMutation::CreateNode { node } => node_summary_opt(snapshot.node(&node.id)),
        PlanMutation::DeleteNode { id } => node_summary_opt(snapshot.node(id)),
        PlanMutation::SetLayoutBroken { .. } => {
            json!(snapshot.workspace.has_broken_default_layout)
        }
    }
}

fn container_summary_opt(container: Option<&Container>) -> Value {
    match container {
        Some(container) => json!({
            "title": container.title,
            "state": container.state.as_str(),
            "position": container.position.map(|p| json!({ "x": p.x, "y": p.y })),
            "parent": container.parent.as_ref().map(|p| p.as_str()),
        }),
        None => Value::Null,
    }
}

fn node_summary_opt(node: Option<&Node>) -> Value {
    match node {
        Some(node) => json!({
            "from": node.from.container.as_str(),
            "to": node.to.container.as_str(),
            "origin": node.origin.as_str(),
        }),
        None => Value::Null,
    }
}

/// Mirrors one already-validated mutation into SQL. `working` is the
/// in-memory snapshot with the mutation applied, so updated rows can be
/// rewritten wholesale from the post-state.
pub(super) fn write_mutation_tx(
    tx: &Transaction<'_>,
    workspace: &str,
    working: &GraphSnapshot,
    mutation: &PlanMutation,
) -> Result<(), StoreError> {
    match mutation {
        PlanMutation::CreateContainer { container } => {
            insert_container_tx(tx, workspace, container)?;
        }
        PlanMutation::UpdateContainer { id, .. }
        | PlanMutation::ActivateGhost { id, .. }
        | PlanMutation::RevertGhost { id } => {
            let container = working
                .container(id)
                .ok_or(StoreError::InvalidInput("updated container not in snapshot"))?;
            update_container_tx(tx, workspace, container)?;
        }
        PlanMutation::DeleteContainer { id } => {
            tx.execute(
                "DELETE FROM ports WHERE workspace=?1 AND container=?2",
                params![workspace, id.as_str()],
            )?;
            tx.execute(
                "DELETE FROM containers WHERE workspace=?1 AND id=?2",
                params![workspace, id.as_str()],
            )?;
        }
        PlanMutation::CreateNode { node } => {
            tx.execute(
                "INSERT INTO nodes(workspace, id, from_container, from_side, to_container, to_side, origin) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    workspace,
                    node.id.as_str(),
                    node.from.container.as_str(),
                    node.from.side.as_str(),
                    node.to.container.as_str(),
                    node.to.side.as_str(),
                    node.origin.as_str()
                ],
            )?;
        }
        PlanMutation::DeleteNode { id } => {
            tx.execute(
                "DELETE FROM nodes WHERE workspace=?1 AND id=?2",
                params![workspace, id.as_str()],
            )?;
        }
        PlanMutation::SetLayoutBroken { broken } => {
            tx.execute(
                "UPDATE workspaces SET broken_layout=?2 WHERE workspace=?1",
                params![workspace, if *broken { 1i64 } else { 0i64 }],
            )?;
        }
    }
    Ok(())
}

fn insert_container_tx(
    tx: &Transaction<'_>,
    workspace: &str,
    container: &Container,
) -> Result<(), StoreError> {
    write_container_row_tx(
        tx,
        "INSERT INTO containers(workspace, id, kind, title, external_entity, external_parent, \
                                state, pos_x, pos_y, width, height, layout, parent) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        workspace,
        container,
    )?;
    for side in PortSide::ALL {
        tx.execute(
            "INSERT INTO ports(workspace, container, side) VALUES (?1, ?2, ?3)",
            params![workspace, container.id.as_str(), side.as_str()],
        )?;
    }
    Ok(())
}

fn update_container_tx(
    tx: &Transaction<'_>,
    workspace: &str,
    container: &Container,
) -> Result<(), StoreError> {
    write_container_row_tx(
        tx,
        "UPDATE containers SET kind=?3, title=?4, external_entity=?5, external_parent=?6, \
                               state=?7, pos_x=?8, pos_y=?9, width=?10, height=?11, \
                               layout=?12, parent=?13 \
         WHERE workspace=?1 AND id=?2",
        workspace,
        container,
    )
}

// Both writers share one positional parameter layout.
fn write_container_row_tx(
    tx: &Transaction<'_>,
    sql: &str,
    workspace: &str,
    container: &Container,
) -> Result<(), StoreError> {
    tx.execute(
        sql,
        params![
            workspace,
            container.id.as_str(),
            container.kind.as_str(),
            container.title,
            container.external_ref.as_ref().map(|r| r.entity.as_str()),
            container
                .external_ref
                .as_ref()
                .and_then(|r| r.parent.as_ref())
                .map(|p| p.as_str()),
            container.state.as_str(),
            container.position.map(|p| p.x),
            container.position.map(|p| p.y),
            container.size.width,
            container.size.height,
            container.layout.as_str(),
            container.parent.as_ref().map(|p| p.as_str())
        ],
    )?;
    Ok(())
}

#![forbid(unsafe_code)]

use crate::error::PlanError;
use crate::ids::{ContainerId, NodeId, UserId};
use crate::model::{Container, ContainerState, GraphSnapshot, Node};

/// Nesting chains deeper than this are treated as corrupt state rather than
/// walked forever.
pub const MAX_NEST_DEPTH: usize = 64;

pub fn require_container<'a>(
    snapshot: &'a GraphSnapshot,
    id: &ContainerId,
) -> Result<&'a Container, PlanError> {
    snapshot
        .container(id)
        .ok_or_else(|| PlanError::UnknownContainer { id: id.clone() })
}

/// Looks up a container and rejects ghosts; interactive intents require an
/// active container.
pub fn require_active<'a>(
    snapshot: &'a GraphSnapshot,
    id: &ContainerId,
) -> Result<&'a Container, PlanError> {
    let container = require_container(snapshot, id)?;
    if container.state == ContainerState::Ghost {
        return Err(PlanError::GhostNotInteractive { id: id.clone() });
    }
    Ok(container)
}

pub fn require_node<'a>(snapshot: &'a GraphSnapshot, id: &NodeId) -> Result<&'a Node, PlanError> {
    snapshot
        .node(id)
        .ok_or_else(|| PlanError::UnknownNode { id: id.clone() })
}

/// Mutating intents require the acting user to hold the workspace's canvas
/// lock in the supplied snapshot. Execution re-verifies against fresh state.
pub fn require_lock_holder(snapshot: &GraphSnapshot, user: &UserId) -> Result<(), PlanError> {
    match &snapshot.lock {
        None => Err(PlanError::LockRequired),
        Some(lock) if &lock.holder == user => Ok(()),
        Some(lock) => Err(PlanError::LockHeldByOther {
            holder: lock.holder.clone(),
        }),
    }
}

/// Rejects self-nesting, nesting under a descendant, and nesting under a
/// container kind that cannot hold children.
pub fn ensure_nest_allowed(
    snapshot: &GraphSnapshot,
    container: &ContainerId,
    parent: &ContainerId,
) -> Result<(), PlanError> {
    if container == parent {
        return Err(PlanError::NestCycle {
            container: container.clone(),
            parent: parent.clone(),
        });
    }
    let parent_container = require_container(snapshot, parent)?;
    if !parent_container.kind.can_nest_children() {
        return Err(PlanError::KindNotNestable {
            parent: parent.clone(),
        });
    }
    if ancestors(snapshot, parent).contains(container) {
        return Err(PlanError::NestCycle {
            container: container.clone(),
            parent: parent.clone(),
        });
    }
    Ok(())
}

/// Ancestor chain of a container, nearest first, capped at
/// `MAX_NEST_DEPTH`.
pub fn ancestors(snapshot: &GraphSnapshot, id: &ContainerId) -> Vec<ContainerId> {
    let mut chain = Vec::new();
    let mut cursor = snapshot.container(id).and_then(|c| c.parent.clone());
    while let Some(parent) = cursor {
        if chain.len() >= MAX_NEST_DEPTH || chain.contains(&parent) {
            break;
        }
        cursor = snapshot.container(&parent).and_then(|c| c.parent.clone());
        chain.push(parent);
    }
    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::WorkspaceId;
    use crate::model::{
        CanvasLock, EntityKind, LayoutMode, Position, Size, Workspace,
    };

    fn container(id: &str, kind: EntityKind, parent: Option<&str>) -> Container {
        Container {
            id: ContainerId::try_new(id).unwrap(),
            workspace: WorkspaceId::try_new("ws").unwrap(),
            kind,
            title: id.to_string(),
            external_ref: None,
            state: ContainerState::Active,
            position: Some(Position::new(0.0, 0.0)),
            size: Size::new(220.0, 96.0),
            layout: LayoutMode::Hierarchy,
            parent: parent.map(|p| ContainerId::try_new(p).unwrap()),
        }
    }

    fn snapshot(containers: Vec<Container>) -> GraphSnapshot {
        GraphSnapshot {
            workspace: Workspace {
                id: WorkspaceId::try_new("ws").unwrap(),
                has_broken_default_layout: false,
                created_at_ms: 0,
            },
            containers,
            nodes: vec![],
            lock: None,
        }
    }

    #[test]
    fn lock_checks_distinguish_missing_and_foreign_locks() {
        let user = UserId::try_new("u1").unwrap();
        let other = UserId::try_new("u2").unwrap();

        let unlocked = snapshot(vec![]);
        assert_eq!(
            require_lock_holder(&unlocked, &user).unwrap_err(),
            PlanError::LockRequired
        );

        let mut locked = snapshot(vec![]);
        locked.lock = Some(CanvasLock {
            holder: other.clone(),
            issued_at_ms: 1,
        });
        assert_eq!(
            require_lock_holder(&locked, &user).unwrap_err(),
            PlanError::LockHeldByOther { holder: other }
        );
        locked.lock = Some(CanvasLock {
            holder: user.clone(),
            issued_at_ms: 1,
        });
        assert!(require_lock_holder(&locked, &user).is_ok());
    }

    #[test]
    fn nesting_under_self_is_a_cycle() {
        let snap = snapshot(vec![container("A", EntityKind::Idea, None)]);
        let a = ContainerId::try_new("A").unwrap();
        assert!(matches!(
            ensure_nest_allowed(&snap, &a, &a).unwrap_err(),
            PlanError::NestCycle { .. }
        ));
    }

    #[test]
    fn nesting_under_descendant_is_a_cycle() {
        let snap = snapshot(vec![
            container("A", EntityKind::Idea, None),
            container("B", EntityKind::Idea, Some("A")),
            container("C", EntityKind::Idea, Some("B")),
        ]);
        let a = ContainerId::try_new("A").unwrap();
        let c = ContainerId::try_new("C").unwrap();
        assert!(matches!(
            ensure_nest_allowed(&snap, &a, &c).unwrap_err(),
            PlanError::NestCycle { .. }
        ));
        // The reverse direction is fine.
        assert!(ensure_nest_allowed(&snap, &c, &a).is_ok());
    }

    #[test]
    fn tasks_cannot_hold_children() {
        let snap = snapshot(vec![
            container("A", EntityKind::Idea, None),
            container("T", EntityKind::Task, None),
        ]);
        let a = ContainerId::try_new("A").unwrap();
        let t = ContainerId::try_new("T").unwrap();
        assert_eq!(
            ensure_nest_allowed(&snap, &a, &t).unwrap_err(),
            PlanError::KindNotNestable { parent: t }
        );
    }

    #[test]
    fn ghost_rejected_where_active_required() {
        let mut ghost = container("G", EntityKind::Task, None);
        ghost.state = ContainerState::Ghost;
        ghost.position = None;
        let snap = snapshot(vec![ghost]);
        let g = ContainerId::try_new("G").unwrap();
        assert_eq!(
            require_active(&snap, &g).unwrap_err(),
            PlanError::GhostNotInteractive { id: g }
        );
    }
}

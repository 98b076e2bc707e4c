#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::ids::{ContainerId, ExternalEntityId, NodeId};
use crate::model::{
    Container, ContainerState, GraphSnapshot, LayoutMode, Node, PortRef, Position, Size,
};

/// Field patch for an `UpdateContainer` mutation. `None` means "leave
/// unchanged"; `parent` uses a nested option so "unnest" (set to `None`)
/// stays distinct from "unchanged".
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Option<ContainerId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<LayoutMode>,
}

impl ContainerPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.parent.is_none()
            && self.position.is_none()
            && self.size.is_none()
            && self.layout.is_none()
    }

    /// Applies the patch in place. Position and size changes are rejected on
    /// ghosts so the ghost/position invariant cannot be violated through a
    /// patch.
    pub fn apply(&self, container: &mut Container) -> Result<(), PlanError> {
        if container.state == ContainerState::Ghost
            && (self.position.is_some() || self.size.is_some())
        {
            return Err(PlanError::GhostNotInteractive {
                id: container.id.clone(),
            });
        }
        if let Some(title) = &self.title {
            container.title = title.clone();
        }
        if let Some(parent) = &self.parent {
            container.parent = parent.clone();
        }
        if let Some(position) = self.position {
            container.position = Some(position);
        }
        if let Some(size) = self.size {
            container.size = size;
        }
        if let Some(layout) = self.layout {
            container.layout = layout;
        }
        Ok(())
    }

    /// The patch that undoes `self` when applied after it, captured from the
    /// container as it stands before `self` is applied.
    pub fn inverse_for(&self, current: &Container) -> ContainerPatch {
        ContainerPatch {
            title: self.title.as_ref().map(|_| current.title.clone()),
            parent: self.parent.as_ref().map(|_| current.parent.clone()),
            position: if self.position.is_some() {
                current.position
            } else {
                None
            },
            size: self.size.map(|_| current.size),
            layout: self.layout.map(|_| current.layout),
        }
    }
}

/// Primitive graph mutation. `RevertGhost` is produced only by mutation
/// inversion (undo of an activation); planners never emit it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanMutation {
    CreateContainer { container: Container },
    UpdateContainer { id: ContainerId, patch: ContainerPatch },
    DeleteContainer { id: ContainerId },
    CreateNode { node: Node },
    DeleteNode { id: NodeId },
    ActivateGhost { id: ContainerId, position: Position },
    RevertGhost { id: ContainerId },
    SetLayoutBroken { broken: bool },
}

/// Notification emitted to observers after the plan carrying it executes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanEvent {
    ContainerMoved { container: ContainerId },
    ContainerResized { container: ContainerId },
    ContainerNested { container: ContainerId, parent: ContainerId },
    ContainerUnnested { container: ContainerId },
    GhostActivated { container: ContainerId },
    GhostMaterialized { container: ContainerId },
    ContainerRemoved { container: ContainerId },
    ContainerRefreshed { container: ContainerId },
    NodeCreated { node: NodeId },
    NodeDeleted { node: NodeId },
    LayoutReset,
}

impl PlanEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ContainerMoved { .. } => "container_moved",
            Self::ContainerResized { .. } => "container_resized",
            Self::ContainerNested { .. } => "container_nested",
            Self::ContainerUnnested { .. } => "container_unnested",
            Self::GhostActivated { .. } => "ghost_activated",
            Self::GhostMaterialized { .. } => "ghost_materialized",
            Self::ContainerRemoved { .. } => "container_removed",
            Self::ContainerRefreshed { .. } => "container_refreshed",
            Self::NodeCreated { .. } => "node_created",
            Self::NodeDeleted { .. } => "node_deleted",
            Self::LayoutReset => "layout_reset",
        }
    }
}

/// An immutable, unexecuted batch of mutations plus the notifications to
/// emit once it has been applied. A plan id is assigned at execution time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub mutations: Vec<PlanMutation>,
    pub events: Vec<PlanEvent>,
}

/// User-originated request. Closed set; the plan service matches on it
/// exhaustively.
#[derive(Clone, Debug, PartialEq)]
pub enum Intent {
    MoveContainer { container: ContainerId, to: Position },
    ResizeContainer { container: ContainerId, size: Size },
    NestContainer { container: ContainerId, parent: ContainerId },
    UnnestContainer { container: ContainerId },
    ActivateGhostContainer { container: ContainerId },
    CreateNode { from: PortRef, to: PortRef },
    DeleteNode { node: NodeId },
    ResetLayout,
}

/// External authoritative system notification. Closed set of seven; update
/// events flow only for tasks (the upstream feed does not push track or
/// sub-track renames).
#[derive(Clone, Debug, PartialEq)]
pub enum ExternalEvent {
    TrackCreated { entity: ExternalEntityId, title: String },
    TrackDeleted { entity: ExternalEntityId },
    SubTrackCreated {
        entity: ExternalEntityId,
        parent: ExternalEntityId,
        title: String,
    },
    SubTrackDeleted { entity: ExternalEntityId },
    TaskCreated {
        entity: ExternalEntityId,
        parent: ExternalEntityId,
        title: String,
    },
    TaskUpdated { entity: ExternalEntityId, title: String },
    TaskDeleted { entity: ExternalEntityId },
}

/// Applies one mutation to an in-memory snapshot. This is the reference
/// semantics for mutation application; storage mirrors it row by row, and
/// mutation inversion simulates intermediate states with it.
pub fn apply_to_snapshot(
    snapshot: &mut GraphSnapshot,
    mutation: &PlanMutation,
) -> Result<(), PlanError> {
    match mutation {
        PlanMutation::CreateContainer { container } => {
            if snapshot.container(&container.id).is_some() {
                return Err(PlanError::DuplicateContainer {
                    id: container.id.clone(),
                });
            }
            if !container.position_consistent() {
                return Err(PlanError::PositionMissing {
                    id: container.id.clone(),
                });
            }
            snapshot.containers.push(container.clone());
        }
        PlanMutation::UpdateContainer { id, patch } => {
            let container = snapshot
                .container_mut(id)
                .ok_or_else(|| PlanError::UnknownContainer { id: id.clone() })?;
            patch.apply(container)?;
        }
        PlanMutation::DeleteContainer { id } => {
            if snapshot.container(id).is_none() {
                return Err(PlanError::UnknownContainer { id: id.clone() });
            }
            if snapshot.nodes.iter().any(|n| n.touches(id)) {
                return Err(PlanError::ContainerHasNodes { id: id.clone() });
            }
            snapshot.containers.retain(|c| &c.id != id);
        }
        PlanMutation::CreateNode { node } => {
            if snapshot.node(&node.id).is_some() {
                return Err(PlanError::DuplicateNode {
                    id: node.id.clone(),
                });
            }
            for endpoint in [&node.from, &node.to] {
                if snapshot.container(&endpoint.container).is_none() {
                    return Err(PlanError::UnknownContainer {
                        id: endpoint.container.clone(),
                    });
                }
            }
            snapshot.nodes.push(node.clone());
        }
        PlanMutation::DeleteNode { id } => {
            if snapshot.node(id).is_none() {
                return Err(PlanError::UnknownNode { id: id.clone() });
            }
            snapshot.nodes.retain(|n| &n.id != id);
        }
        PlanMutation::ActivateGhost { id, position } => {
            let container = snapshot
                .container_mut(id)
                .ok_or_else(|| PlanError::UnknownContainer { id: id.clone() })?;
            if container.state != ContainerState::Ghost {
                return Err(PlanError::ContainerNotGhost { id: id.clone() });
            }
            container.state = ContainerState::Active;
            container.position = Some(*position);
        }
        PlanMutation::RevertGhost { id } => {
            let container = snapshot
                .container_mut(id)
                .ok_or_else(|| PlanError::UnknownContainer { id: id.clone() })?;
            if container.state != ContainerState::Active {
                return Err(PlanError::InvalidInput("container is not active"));
            }
            container.state = ContainerState::Ghost;
            container.position = None;
        }
        PlanMutation::SetLayoutBroken { broken } => {
            snapshot.workspace.has_broken_default_layout = *broken;
        }
    }
    Ok(())
}

/// Computes the mutation list that reverses `mutations` when applied to the
/// post-execution state, given the pre-execution snapshot. Walks forward
/// simulating each step so captures reflect the state each mutation actually
/// saw.
pub fn invert_mutations(
    pre: &GraphSnapshot,
    mutations: &[PlanMutation],
) -> Result<Vec<PlanMutation>, PlanError> {
    let mut state = pre.clone();
    let mut inverse = Vec::with_capacity(mutations.len());
    for mutation in mutations {
        let inverted = match mutation {
            PlanMutation::CreateContainer { container } => PlanMutation::DeleteContainer {
                id: container.id.clone(),
            },
            PlanMutation::UpdateContainer { id, patch } => {
                let current = state
                    .container(id)
                    .ok_or_else(|| PlanError::UnknownContainer { id: id.clone() })?;
                PlanMutation::UpdateContainer {
                    id: id.clone(),
                    patch: patch.inverse_for(current),
                }
            }
            PlanMutation::DeleteContainer { id } => {
                let current = state
                    .container(id)
                    .cloned()
                    .ok_or_else(|| PlanError::UnknownContainer { id: id.clone() })?;
                PlanMutation::CreateContainer { container: current }
            }
            PlanMutation::CreateNode { node } => PlanMutation::DeleteNode {
                id: node.id.clone(),
            },
            PlanMutation::DeleteNode { id } => {
                let current = state
                    .node(id)
                    .cloned()
                    .ok_or_else(|| PlanError::UnknownNode { id: id.clone() })?;
                PlanMutation::CreateNode { node: current }
            }
            PlanMutation::ActivateGhost { id, .. } => {
                PlanMutation::RevertGhost { id: id.clone() }
            }
            PlanMutation::RevertGhost { id } => {
                let current = state
                    .container(id)
                    .ok_or_else(|| PlanError::UnknownContainer { id: id.clone() })?;
                let position = current
                    .position
                    .ok_or_else(|| PlanError::PositionMissing { id: id.clone() })?;
                PlanMutation::ActivateGhost {
                    id: id.clone(),
                    position,
                }
            }
            PlanMutation::SetLayoutBroken { .. } => PlanMutation::SetLayoutBroken {
                broken: state.workspace.has_broken_default_layout,
            },
        };
        apply_to_snapshot(&mut state, mutation)?;
        inverse.push(inverted);
    }
    inverse.reverse();
    Ok(inverse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{UserId, WorkspaceId};
    use crate::model::{EntityKind, NodeOrigin, PortSide, Workspace};

    fn workspace() -> Workspace {
        Workspace {
            id: WorkspaceId::try_new("ws").unwrap(),
            has_broken_default_layout: false,
            created_at_ms: 0,
        }
    }

    fn active(id: &str, position: Position) -> Container {
        Container {
            id: ContainerId::try_new(id).unwrap(),
            workspace: WorkspaceId::try_new("ws").unwrap(),
            kind: EntityKind::Idea,
            title: id.to_string(),
            external_ref: None,
            state: ContainerState::Active,
            position: Some(position),
            size: Size::new(220.0, 96.0),
            layout: LayoutMode::Hierarchy,
            parent: None,
        }
    }

    fn ghost(id: &str) -> Container {
        Container {
            state: ContainerState::Ghost,
            position: None,
            ..active(id, Position::new(0.0, 0.0))
        }
    }

    fn snapshot(containers: Vec<Container>, nodes: Vec<Node>) -> GraphSnapshot {
        GraphSnapshot {
            workspace: workspace(),
            containers,
            nodes,
            lock: None,
        }
    }

    fn apply_all(state: &mut GraphSnapshot, mutations: &[PlanMutation]) {
        for mutation in mutations {
            apply_to_snapshot(state, mutation).expect("apply mutation");
        }
    }

    #[test]
    fn create_then_inverse_restores_snapshot() {
        let pre = snapshot(vec![], vec![]);
        let mutations = vec![PlanMutation::CreateContainer {
            container: active("A", Position::new(10.0, 20.0)),
        }];
        let inverse = invert_mutations(&pre, &mutations).unwrap();

        let mut state = pre.clone();
        apply_all(&mut state, &mutations);
        apply_all(&mut state, &inverse);
        assert_eq!(state, pre);
    }

    #[test]
    fn update_inverse_captures_prior_fields() {
        let pre = snapshot(vec![active("A", Position::new(0.0, 0.0))], vec![]);
        let mutations = vec![
            PlanMutation::UpdateContainer {
                id: ContainerId::try_new("A").unwrap(),
                patch: ContainerPatch {
                    position: Some(Position::new(100.0, 200.0)),
                    layout: Some(LayoutMode::Free),
                    ..Default::default()
                },
            },
            PlanMutation::SetLayoutBroken { broken: true },
        ];
        let inverse = invert_mutations(&pre, &mutations).unwrap();

        let mut state = pre.clone();
        apply_all(&mut state, &mutations);
        assert!(state.workspace.has_broken_default_layout);
        apply_all(&mut state, &inverse);
        assert_eq!(state, pre);
    }

    #[test]
    fn delete_inverse_recreates_nodes_in_order() {
        let a = active("A", Position::new(0.0, 0.0));
        let b = active("B", Position::new(10.0, 0.0));
        let node = Node {
            id: NodeId::manual_edge(&a.id, "right", &b.id, "left"),
            from: PortRef::new(a.id.clone(), PortSide::Right),
            to: PortRef::new(b.id.clone(), PortSide::Left),
            origin: NodeOrigin::Manual,
        };
        let pre = snapshot(vec![a.clone(), b], vec![node.clone()]);
        let mutations = vec![
            PlanMutation::DeleteNode {
                id: node.id.clone(),
            },
            PlanMutation::DeleteContainer { id: a.id.clone() },
        ];
        let inverse = invert_mutations(&pre, &mutations).unwrap();

        let mut state = pre.clone();
        apply_all(&mut state, &mutations);
        apply_all(&mut state, &inverse);
        assert_eq!(state, pre);
    }

    #[test]
    fn activation_inverse_reverts_to_ghost() {
        let pre = snapshot(vec![ghost("G")], vec![]);
        let mutations = vec![PlanMutation::ActivateGhost {
            id: ContainerId::try_new("G").unwrap(),
            position: Position::new(40.0, 40.0),
        }];
        let inverse = invert_mutations(&pre, &mutations).unwrap();
        assert_eq!(
            inverse,
            vec![PlanMutation::RevertGhost {
                id: ContainerId::try_new("G").unwrap()
            }]
        );

        let mut state = pre.clone();
        apply_all(&mut state, &mutations);
        apply_all(&mut state, &inverse);
        assert_eq!(state, pre);
    }

    #[test]
    fn deleting_container_with_nodes_is_rejected() {
        let a = active("A", Position::new(0.0, 0.0));
        let b = active("B", Position::new(10.0, 0.0));
        let node = Node {
            id: NodeId::auto_edge(&a.id, &b.id),
            from: PortRef::new(a.id.clone(), PortSide::Bottom),
            to: PortRef::new(b.id.clone(), PortSide::Top),
            origin: NodeOrigin::AutoGenerated,
        };
        let mut state = snapshot(vec![a.clone(), b], vec![node]);
        let err = apply_to_snapshot(
            &mut state,
            &PlanMutation::DeleteContainer { id: a.id.clone() },
        )
        .unwrap_err();
        assert_eq!(err, PlanError::ContainerHasNodes { id: a.id });
    }

    #[test]
    fn ghost_invariant_guards_creation_and_patch() {
        let mut bad = ghost("G");
        bad.position = Some(Position::new(1.0, 1.0));
        let mut state = snapshot(vec![], vec![]);
        let err = apply_to_snapshot(
            &mut state,
            &PlanMutation::CreateContainer { container: bad },
        )
        .unwrap_err();
        assert!(matches!(err, PlanError::PositionMissing { .. }));

        let mut state = snapshot(vec![ghost("G")], vec![]);
        let err = apply_to_snapshot(
            &mut state,
            &PlanMutation::UpdateContainer {
                id: ContainerId::try_new("G").unwrap(),
                patch: ContainerPatch {
                    position: Some(Position::new(5.0, 5.0)),
                    ..Default::default()
                },
            },
        )
        .unwrap_err();
        assert!(matches!(err, PlanError::GhostNotInteractive { .. }));
    }

    #[test]
    fn lock_state_does_not_affect_pure_application() {
        let mut with_lock = snapshot(vec![ghost("G")], vec![]);
        with_lock.lock = Some(crate::model::CanvasLock {
            holder: UserId::try_new("u1").unwrap(),
            issued_at_ms: 7,
        });
        let mutation = PlanMutation::ActivateGhost {
            id: ContainerId::try_new("G").unwrap(),
            position: Position::new(1.0, 2.0),
        };
        apply_to_snapshot(&mut with_lock, &mutation).unwrap();
        assert!(with_lock.container(&ContainerId::try_new("G").unwrap())
            .unwrap()
            .position_consistent());
    }
}

#![forbid(unsafe_code)]

use crate::error::PlanError;
use crate::ids::{ContainerId, NodeId, UserId};
use crate::layout::{self, LayoutParams};
use crate::model::{GraphSnapshot, LayoutMode, Position, Size};
use crate::plan::{ContainerPatch, PlanMutation};
use crate::validate;

/// Moves an active container to a user-chosen position. The first manual
/// move in a hierarchy-managed workspace also breaks the default layout,
/// atomically with the move itself.
pub fn move_container(
    snapshot: &GraphSnapshot,
    user: &UserId,
    container: &ContainerId,
    to: Position,
) -> Result<Vec<PlanMutation>, PlanError> {
    validate::require_lock_holder(snapshot, user)?;
    validate::require_active(snapshot, container)?;

    let mut mutations = vec![PlanMutation::UpdateContainer {
        id: container.clone(),
        patch: ContainerPatch {
            position: Some(to),
            layout: Some(LayoutMode::Free),
            ..Default::default()
        },
    }];
    if !snapshot.workspace.has_broken_default_layout {
        mutations.push(PlanMutation::SetLayoutBroken { broken: true });
    }
    Ok(mutations)
}

/// Resizes an active container. Counts as a manual rearrangement, so it
/// breaks the default layout the same way a move does.
pub fn resize_container(
    snapshot: &GraphSnapshot,
    user: &UserId,
    container: &ContainerId,
    size: Size,
) -> Result<Vec<PlanMutation>, PlanError> {
    validate::require_lock_holder(snapshot, user)?;
    validate::require_active(snapshot, container)?;

    let mut mutations = vec![PlanMutation::UpdateContainer {
        id: container.clone(),
        patch: ContainerPatch {
            size: Some(size),
            ..Default::default()
        },
    }];
    if !snapshot.workspace.has_broken_default_layout {
        mutations.push(PlanMutation::SetLayoutBroken { broken: true });
    }
    Ok(mutations)
}

/// Nests a container under a new parent: re-links the auto-generated
/// hierarchy edge and, while the default layout is intact, slots the child
/// under its new parent.
pub fn nest_container(
    snapshot: &GraphSnapshot,
    params: &LayoutParams,
    user: &UserId,
    container: &ContainerId,
    parent: &ContainerId,
) -> Result<Vec<PlanMutation>, PlanError> {
    validate::require_lock_holder(snapshot, user)?;
    let child = validate::require_active(snapshot, container)?;
    validate::require_active(snapshot, parent)?;
    validate::ensure_nest_allowed(snapshot, container, parent)?;
    if child.parent.as_ref() == Some(parent) {
        return Err(PlanError::InvalidInput(
            "container is already nested under that parent",
        ));
    }

    let mut mutations = Vec::new();
    if let Some(old_parent) = &child.parent {
        let old_edge = NodeId::auto_edge(old_parent, container);
        if snapshot.node(&old_edge).is_some() {
            mutations.push(PlanMutation::DeleteNode { id: old_edge });
        }
    }

    let mut patch = ContainerPatch {
        parent: Some(Some(parent.clone())),
        ..Default::default()
    };
    if !snapshot.workspace.has_broken_default_layout {
        patch.position = Some(layout::hierarchy_position(
            snapshot,
            params,
            Some(parent),
            Some(container),
        ));
        patch.layout = Some(LayoutMode::Hierarchy);
    }
    mutations.push(PlanMutation::UpdateContainer {
        id: container.clone(),
        patch,
    });

    let edge = NodeId::auto_edge(parent, container);
    if snapshot.node(&edge).is_none() {
        mutations.push(PlanMutation::CreateNode {
            node: layout::auto_node(parent, container),
        });
    }
    Ok(mutations)
}

/// Detaches a container from its parent and drops the hierarchy edge.
pub fn unnest_container(
    snapshot: &GraphSnapshot,
    user: &UserId,
    container: &ContainerId,
) -> Result<Vec<PlanMutation>, PlanError> {
    validate::require_lock_holder(snapshot, user)?;
    let child = validate::require_active(snapshot, container)?;
    let Some(parent) = &child.parent else {
        return Err(PlanError::NotNested {
            id: container.clone(),
        });
    };

    let mut mutations = Vec::new();
    let edge = NodeId::auto_edge(parent, container);
    if snapshot.node(&edge).is_some() {
        mutations.push(PlanMutation::DeleteNode { id: edge });
    }
    mutations.push(PlanMutation::UpdateContainer {
        id: container.clone(),
        patch: ContainerPatch {
            parent: Some(None),
            ..Default::default()
        },
    });
    Ok(mutations)
}

/// Activates a ghost, assigning it the layout-determined default position.
/// The one-way ghost-to-active transition; it never runs in reverse outside
/// of undo.
pub fn activate_ghost(
    snapshot: &GraphSnapshot,
    params: &LayoutParams,
    user: &UserId,
    container: &ContainerId,
) -> Result<Vec<PlanMutation>, PlanError> {
    validate::require_lock_holder(snapshot, user)?;
    let ghost = validate::require_container(snapshot, container)?;
    if ghost.state == crate::model::ContainerState::Active {
        return Err(PlanError::ContainerNotGhost {
            id: container.clone(),
        });
    }

    let position = layout::default_position(
        snapshot,
        params,
        ghost.parent.as_ref(),
        Some(container),
    );
    Ok(vec![PlanMutation::ActivateGhost {
        id: container.clone(),
        position,
    }])
}

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::ids::{ContainerId, NodeId};
use crate::model::{
    Container, ContainerState, GraphSnapshot, LayoutMode, Node, NodeOrigin, PortRef, PortSide,
    Position, Reference, Size,
};
use crate::plan::{ContainerPatch, PlanMutation};
use crate::validate;

/// Tunables for the deterministic hierarchy layout and for free-floating
/// spawns once the default layout is broken.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutParams {
    pub origin: Position,
    pub depth_indent: f64,
    pub row_pitch: f64,
    pub free_spawn: Position,
    pub default_size: Size,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            origin: Position::new(40.0, 40.0),
            depth_indent: 260.0,
            row_pitch: 120.0,
            free_spawn: Position::new(80.0, 80.0),
            default_size: Size::new(220.0, 96.0),
        }
    }
}

/// Nesting depth of a container (roots are depth zero).
pub fn depth_of(snapshot: &GraphSnapshot, id: &ContainerId) -> usize {
    validate::ancestors(snapshot, id).len()
}

/// Deterministic hierarchy slot for the next container under `parent`:
/// indented by depth, one row per existing sibling. `exclude` omits the
/// container being placed from the sibling count so re-placing an existing
/// container (activation, reset) does not shift its own slot.
pub fn hierarchy_position(
    snapshot: &GraphSnapshot,
    params: &LayoutParams,
    parent: Option<&ContainerId>,
    exclude: Option<&ContainerId>,
) -> Position {
    let depth = match parent {
        Some(parent) => depth_of(snapshot, parent) + 1,
        None => 0,
    };
    let row = snapshot
        .containers
        .iter()
        .filter(|c| c.parent.as_ref() == parent)
        .filter(|c| Some(&c.id) != exclude)
        .count();
    slot(params, depth, row)
}

fn slot(params: &LayoutParams, depth: usize, row: usize) -> Position {
    Position::new(
        params.origin.x + depth as f64 * params.depth_indent,
        params.origin.y + row as f64 * params.row_pitch,
    )
}

/// Spawn position for a container entering the workspace: hierarchy slot
/// while the default layout is intact, the free-floating default once a
/// user has broken it.
pub fn default_position(
    snapshot: &GraphSnapshot,
    params: &LayoutParams,
    parent: Option<&ContainerId>,
    exclude: Option<&ContainerId>,
) -> Position {
    if snapshot.workspace.has_broken_default_layout {
        params.free_spawn
    } else {
        hierarchy_position(snapshot, params, parent, exclude)
    }
}

/// Mutations that materialize a ghost container for an external reference,
/// or `None` when a container for that entity already exists (the caller
/// reports a no-op). The ghost is linked to its materialized parent, if
/// any, by an auto-generated hierarchy node.
pub fn materialize_ghost(
    snapshot: &GraphSnapshot,
    params: &LayoutParams,
    reference: &Reference,
    title: &str,
) -> Option<Vec<PlanMutation>> {
    if snapshot.container_by_reference(&reference.entity).is_some() {
        return None;
    }
    let id = ContainerId::for_entity(&reference.entity);
    let parent = reference
        .parent
        .as_ref()
        .and_then(|p| snapshot.container_by_reference(p))
        .map(|c| c.id.clone());
    let layout = if snapshot.workspace.has_broken_default_layout {
        LayoutMode::Free
    } else {
        LayoutMode::Hierarchy
    };
    let container = Container {
        id: id.clone(),
        workspace: snapshot.workspace.id.clone(),
        kind: reference.kind,
        title: title.to_string(),
        external_ref: Some(reference.clone()),
        state: ContainerState::Ghost,
        position: None,
        size: params.default_size,
        layout,
        parent: parent.clone(),
    };
    let mut mutations = vec![PlanMutation::CreateContainer { container }];
    if let Some(parent) = parent {
        mutations.push(PlanMutation::CreateNode {
            node: auto_node(&parent, &id),
        });
    }
    Some(mutations)
}

/// The auto-generated hierarchy edge between a parent container and a
/// child: parent bottom port to child top port.
pub fn auto_node(parent: &ContainerId, child: &ContainerId) -> Node {
    Node {
        id: NodeId::auto_edge(parent, child),
        from: PortRef::new(parent.clone(), PortSide::Bottom),
        to: PortRef::new(child.clone(), PortSide::Top),
        origin: NodeOrigin::AutoGenerated,
    }
}

/// Explicit layout reset: reassert hierarchy placement for every active
/// container (parents before children, siblings ordered by id) and clear
/// the broken-layout flag. Never produced implicitly.
pub fn reset_layout(snapshot: &GraphSnapshot, params: &LayoutParams) -> Vec<PlanMutation> {
    let mut mutations = Vec::new();
    place_children(snapshot, params, None, 0, &mut mutations);
    mutations.push(PlanMutation::SetLayoutBroken { broken: false });
    mutations
}

fn place_children(
    snapshot: &GraphSnapshot,
    params: &LayoutParams,
    parent: Option<&ContainerId>,
    depth: usize,
    mutations: &mut Vec<PlanMutation>,
) {
    if depth > validate::MAX_NEST_DEPTH {
        return;
    }
    let mut children: Vec<&Container> = snapshot
        .containers
        .iter()
        .filter(|c| c.parent.as_ref() == parent)
        .collect();
    children.sort_by(|a, b| a.id.cmp(&b.id));
    for (row, child) in children.iter().enumerate() {
        if child.state == ContainerState::Active {
            mutations.push(PlanMutation::UpdateContainer {
                id: child.id.clone(),
                patch: ContainerPatch {
                    position: Some(slot(params, depth, row)),
                    layout: Some(LayoutMode::Hierarchy),
                    ..Default::default()
                },
            });
        }
        place_children(snapshot, params, Some(&child.id), depth + 1, mutations);
    }
}

/// Recomputes the auto-generated hierarchy edges implied by current parent
/// links, emitting creations for any that are missing. Auto nodes carry no
/// independent truth: deleting one without removing the underlying
/// reference makes it reappear here.
pub fn derive_auto_nodes(snapshot: &GraphSnapshot) -> Vec<PlanMutation> {
    let mut mutations = Vec::new();
    for container in &snapshot.containers {
        let Some(parent) = &container.parent else {
            continue;
        };
        if snapshot.container(parent).is_none() {
            continue;
        }
        let id = NodeId::auto_edge(parent, &container.id);
        if snapshot.node(&id).is_none() {
            mutations.push(PlanMutation::CreateNode {
                node: auto_node(parent, &container.id),
            });
        }
    }
    mutations
}

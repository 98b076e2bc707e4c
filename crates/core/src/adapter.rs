#![forbid(unsafe_code)]

//! One-way translation of external authoritative events into graph
//! mutations. The adapter holds no handle into the external system and can
//! never write back; its only output is a mutation list for this graph.

use crate::error::PlanError;
use crate::ids::ExternalEntityId;
use crate::layout::{self, LayoutParams};
use crate::model::{Container, EntityKind, GraphSnapshot, Reference};
use crate::plan::{ContainerPatch, ExternalEvent, PlanMutation};

/// Result of translating one external event. `NoOp` is a valid success:
/// the event needs no graph change (already materialized, already gone,
/// already identical).
#[derive(Clone, Debug, PartialEq)]
pub enum AdapterOutcome {
    Mutations(Vec<PlanMutation>),
    NoOp,
}

pub fn plan_external_event(
    snapshot: &GraphSnapshot,
    params: &LayoutParams,
    event: &ExternalEvent,
) -> Result<AdapterOutcome, PlanError> {
    match event {
        ExternalEvent::TrackCreated { entity, title } => materialize(
            snapshot,
            params,
            Reference {
                entity: entity.clone(),
                kind: EntityKind::Track,
                parent: None,
            },
            title,
        ),
        ExternalEvent::SubTrackCreated {
            entity,
            parent,
            title,
        } => materialize(
            snapshot,
            params,
            Reference {
                entity: entity.clone(),
                kind: EntityKind::SubTrack,
                parent: Some(parent.clone()),
            },
            title,
        ),
        ExternalEvent::TaskCreated {
            entity,
            parent,
            title,
        } => materialize(
            snapshot,
            params,
            Reference {
                entity: entity.clone(),
                kind: EntityKind::Task,
                parent: Some(parent.clone()),
            },
            title,
        ),
        ExternalEvent::TrackDeleted { entity }
        | ExternalEvent::SubTrackDeleted { entity }
        | ExternalEvent::TaskDeleted { entity } => remove(snapshot, entity),
        ExternalEvent::TaskUpdated { entity, title } => refresh(snapshot, entity, title),
    }
}

fn materialize(
    snapshot: &GraphSnapshot,
    params: &LayoutParams,
    reference: Reference,
    title: &str,
) -> Result<AdapterOutcome, PlanError> {
    match layout::materialize_ghost(snapshot, params, &reference, title) {
        Some(mutations) => Ok(AdapterOutcome::Mutations(mutations)),
        None => Ok(AdapterOutcome::NoOp),
    }
}

/// Plans the removal cascade for a deleted external entity: every node
/// touching the container's ports, then the container itself (its ports go
/// with it). Children nested under it are detached so they never point at
/// a deleted parent; their own deletion events arrive separately.
fn remove(
    snapshot: &GraphSnapshot,
    entity: &ExternalEntityId,
) -> Result<AdapterOutcome, PlanError> {
    let Some(container) = snapshot.container_by_reference(entity) else {
        return Ok(AdapterOutcome::NoOp);
    };

    let mut touching: Vec<_> = snapshot.nodes_touching(&container.id);
    touching.sort_by(|a, b| a.id.cmp(&b.id));

    let mut mutations: Vec<PlanMutation> = touching
        .iter()
        .map(|node| PlanMutation::DeleteNode {
            id: node.id.clone(),
        })
        .collect();

    let mut children: Vec<&Container> = snapshot.children_of(&container.id);
    children.sort_by(|a, b| a.id.cmp(&b.id));
    for child in children {
        mutations.push(PlanMutation::UpdateContainer {
            id: child.id.clone(),
            patch: ContainerPatch {
                parent: Some(None),
                ..Default::default()
            },
        });
    }

    mutations.push(PlanMutation::DeleteContainer {
        id: container.id.clone(),
    });
    Ok(AdapterOutcome::Mutations(mutations))
}

/// Metadata refresh only. Position is never touched so external updates
/// cannot fight user layout.
fn refresh(
    snapshot: &GraphSnapshot,
    entity: &ExternalEntityId,
    title: &str,
) -> Result<AdapterOutcome, PlanError> {
    let Some(container) = snapshot.container_by_reference(entity) else {
        return Ok(AdapterOutcome::NoOp);
    };
    if container.title == title {
        return Ok(AdapterOutcome::NoOp);
    }
    Ok(AdapterOutcome::Mutations(vec![
        PlanMutation::UpdateContainer {
            id: container.id.clone(),
            patch: ContainerPatch {
                title: Some(title.to_string()),
                ..Default::default()
            },
        },
    ]))
}

#![forbid(unsafe_code)]

use mesh_core::adapter::{self, AdapterOutcome};
use mesh_core::error::PlanError;
use mesh_core::ids::{ContainerId, UserId};
use mesh_core::layout::LayoutParams;
use mesh_core::model::{GraphSnapshot, NodeOrigin};
use mesh_core::plan::{ExternalEvent, Intent, Plan, PlanEvent, PlanMutation};
use mesh_core::planners;

/// Output of the planning stage. `no_op` is a successful outcome with no
/// plan: the request needed no graph change.
#[derive(Clone, Debug, PartialEq)]
pub struct PlanOutcome {
    pub plan: Option<Plan>,
    pub no_op: bool,
    pub warnings: Vec<String>,
}

impl PlanOutcome {
    fn planned(plan: Plan, warnings: Vec<String>) -> Self {
        Self {
            plan: Some(plan),
            no_op: false,
            warnings,
        }
    }

    fn no_op() -> Self {
        Self {
            plan: None,
            no_op: true,
            warnings: Vec::new(),
        }
    }
}

/// Plans a user intent against a snapshot. Pure: nothing is persisted and
/// the snapshot is not modified; execution happens separately.
pub fn plan_for_intent(
    snapshot: &GraphSnapshot,
    params: &LayoutParams,
    user: &UserId,
    intent: &Intent,
) -> Result<PlanOutcome, PlanError> {
    let mut warnings = Vec::new();
    let (mutations, events) = match intent {
        Intent::MoveContainer { container, to } => {
            let mutations = planners::move_container(snapshot, user, container, *to)?;
            note_layout_break(snapshot, &mut warnings);
            (
                mutations,
                vec![PlanEvent::ContainerMoved {
                    container: container.clone(),
                }],
            )
        }
        Intent::ResizeContainer { container, size } => {
            let mutations = planners::resize_container(snapshot, user, container, *size)?;
            note_layout_break(snapshot, &mut warnings);
            (
                mutations,
                vec![PlanEvent::ContainerResized {
                    container: container.clone(),
                }],
            )
        }
        Intent::NestContainer { container, parent } => {
            let mutations =
                planners::nest_container(snapshot, params, user, container, parent)?;
            (
                mutations,
                vec![PlanEvent::ContainerNested {
                    container: container.clone(),
                    parent: parent.clone(),
                }],
            )
        }
        Intent::UnnestContainer { container } => {
            let mutations = planners::unnest_container(snapshot, user, container)?;
            (
                mutations,
                vec![PlanEvent::ContainerUnnested {
                    container: container.clone(),
                }],
            )
        }
        Intent::ActivateGhostContainer { container } => {
            let mutations = planners::activate_ghost(snapshot, params, user, container)?;
            (
                mutations,
                vec![PlanEvent::GhostActivated {
                    container: container.clone(),
                }],
            )
        }
        Intent::CreateNode { from, to } => {
            let mutations = planners::create_manual_node(snapshot, user, from, to)?;
            let events = mutations
                .iter()
                .filter_map(|m| match m {
                    PlanMutation::CreateNode { node } => Some(PlanEvent::NodeCreated {
                        node: node.id.clone(),
                    }),
                    _ => None,
                })
                .collect();
            (mutations, events)
        }
        Intent::DeleteNode { node } => {
            let mutations = planners::delete_node(snapshot, user, node)?;
            if snapshot
                .node(node)
                .is_some_and(|n| n.origin == NodeOrigin::AutoGenerated)
            {
                warnings.push(
                    "deleting an auto-generated node leaves its reference in place; \
                     the edge reappears on the next layout reset"
                        .to_string(),
                );
            }
            (
                mutations,
                vec![PlanEvent::NodeDeleted { node: node.clone() }],
            )
        }
        Intent::ResetLayout => {
            let mutations = planners::reset_layout(snapshot, params, user)?;
            (mutations, vec![PlanEvent::LayoutReset])
        }
    };
    Ok(PlanOutcome::planned(Plan { mutations, events }, warnings))
}

/// Plans one external-system event. Replays and events for untracked
/// entities come back as no-ops, never as errors, so the sync feed can be
/// consumed idempotently.
pub fn plan_for_event(
    snapshot: &GraphSnapshot,
    params: &LayoutParams,
    event: &ExternalEvent,
) -> Result<PlanOutcome, PlanError> {
    let outcome = adapter::plan_external_event(snapshot, params, event)?;
    let mutations = match outcome {
        AdapterOutcome::NoOp => return Ok(PlanOutcome::no_op()),
        AdapterOutcome::Mutations(mutations) => mutations,
    };

    let container = event_container_id(event);
    let mut warnings = Vec::new();
    let events = match event {
        ExternalEvent::TrackCreated { .. }
        | ExternalEvent::SubTrackCreated { .. }
        | ExternalEvent::TaskCreated { .. } => vec![PlanEvent::GhostMaterialized { container }],
        ExternalEvent::TrackDeleted { .. }
        | ExternalEvent::SubTrackDeleted { .. }
        | ExternalEvent::TaskDeleted { .. } => {
            let manual = mutations
                .iter()
                .filter(|m| match m {
                    PlanMutation::DeleteNode { id } => snapshot
                        .node(id)
                        .is_some_and(|n| n.origin == NodeOrigin::Manual),
                    _ => false,
                })
                .count();
            if manual > 0 {
                warnings.push(format!(
                    "removing {} also deletes {manual} manually created node(s)",
                    container.as_str()
                ));
            }
            vec![PlanEvent::ContainerRemoved { container }]
        }
        ExternalEvent::TaskUpdated { .. } => vec![PlanEvent::ContainerRefreshed { container }],
    };
    Ok(PlanOutcome::planned(Plan { mutations, events }, warnings))
}

fn event_container_id(event: &ExternalEvent) -> ContainerId {
    let entity = match event {
        ExternalEvent::TrackCreated { entity, .. }
        | ExternalEvent::TrackDeleted { entity }
        | ExternalEvent::SubTrackCreated { entity, .. }
        | ExternalEvent::SubTrackDeleted { entity }
        | ExternalEvent::TaskCreated { entity, .. }
        | ExternalEvent::TaskUpdated { entity, .. }
        | ExternalEvent::TaskDeleted { entity } => entity,
    };
    ContainerId::for_entity(entity)
}

fn note_layout_break(snapshot: &GraphSnapshot, warnings: &mut Vec<String>) {
    if !snapshot.workspace.has_broken_default_layout {
        warnings.push(
            "first manual rearrangement breaks the default layout; \
             use a layout reset to restore it"
                .to_string(),
        );
    }
}

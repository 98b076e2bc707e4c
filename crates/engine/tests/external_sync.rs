#![forbid(unsafe_code)]

use mesh_core::ids::{ContainerId, ExternalEntityId, NodeId, UserId, WorkspaceId};
use mesh_core::model::{ContainerState, PortRef, PortSide};
use mesh_core::plan::{ExternalEvent, Intent};
use mesh_engine::{EngineConfig, EngineError, FailureStage, Orchestrator};
use mesh_storage::SqliteStore;
use std::path::PathBuf;

fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = base.join(format!("mesh_engine_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn setup(test_name: &str) -> (Orchestrator, SqliteStore, WorkspaceId) {
    let mut store = SqliteStore::open(temp_dir(test_name)).expect("open store");
    let workspace = WorkspaceId::try_new("ws_sync").expect("workspace id");
    store.workspace_init(&workspace).expect("workspace init");
    (Orchestrator::new(EngineConfig::default()), store, workspace)
}

fn eid(id: &str) -> ExternalEntityId {
    ExternalEntityId::try_new(id).expect("entity id")
}

fn track_created(entity: &str) -> ExternalEvent {
    ExternalEvent::TrackCreated {
        entity: eid(entity),
        title: entity.to_string(),
    }
}

fn task_created(entity: &str, parent: &str) -> ExternalEvent {
    ExternalEvent::TaskCreated {
        entity: eid(entity),
        parent: eid(parent),
        title: entity.to_string(),
    }
}

#[test]
fn created_entities_materialize_as_ghosts() {
    let (orch, mut store, workspace) = setup("materialize");
    let result = orch
        .handle_external_event(&mut store, &workspace, &track_created("track-1"))
        .expect("track event");
    assert!(!result.no_op);

    orch.handle_external_event(&mut store, &workspace, &task_created("task-1", "track-1"))
        .expect("task event");

    let snapshot = store.graph_snapshot(&workspace).expect("snapshot");
    let track = ContainerId::for_entity(&eid("track-1"));
    let task = ContainerId::for_entity(&eid("task-1"));
    assert_eq!(
        snapshot.container(&track).expect("track").state,
        ContainerState::Ghost
    );
    let task_container = snapshot.container(&task).expect("task");
    assert_eq!(task_container.state, ContainerState::Ghost);
    assert_eq!(task_container.parent.as_ref(), Some(&track));
    // Hierarchy edges follow the parent link automatically.
    assert!(snapshot.node(&NodeId::auto_edge(&track, &task)).is_some());
}

#[test]
fn replayed_events_are_no_ops() {
    let (orch, mut store, workspace) = setup("replay");
    orch.handle_external_event(&mut store, &workspace, &track_created("track-1"))
        .expect("first delivery");

    let replay = orch
        .handle_external_event(&mut store, &workspace, &track_created("track-1"))
        .expect("replayed delivery");
    assert!(replay.no_op);
    assert_eq!(replay.mutations_applied, 0);

    let unknown = orch
        .handle_external_event(
            &mut store,
            &workspace,
            &ExternalEvent::TaskDeleted {
                entity: eid("never-seen"),
            },
        )
        .expect("deletion of untracked entity");
    assert!(unknown.no_op);
}

#[test]
fn entity_deletion_cascades_through_nodes_atomically() {
    let (orch, mut store, workspace) = setup("deletion_cascade");
    orch.handle_external_event(&mut store, &workspace, &track_created("track-1"))
        .expect("track");
    orch.handle_external_event(&mut store, &workspace, &task_created("task-1", "track-1"))
        .expect("task a");
    orch.handle_external_event(&mut store, &workspace, &task_created("task-2", "track-1"))
        .expect("task b");

    let result = orch
        .handle_external_event(
            &mut store,
            &workspace,
            &ExternalEvent::TrackDeleted {
                entity: eid("track-1"),
            },
        )
        .expect("track deletion");
    // Two hierarchy edges, two parent unlinks, one container, in one plan.
    assert!(result.mutations_applied >= 3);

    let snapshot = store.graph_snapshot(&workspace).expect("snapshot");
    let track = ContainerId::for_entity(&eid("track-1"));
    assert!(snapshot.container(&track).is_none());
    assert!(snapshot.nodes.iter().all(|n| n.from.container != track && n.to.container != track));
    // Orphaned children stay on the canvas without a parent.
    let task = snapshot
        .container(&ContainerId::for_entity(&eid("task-1")))
        .expect("task survives");
    assert!(task.parent.is_none());
}

#[test]
fn task_updates_refresh_the_title_and_skip_identical_ones() {
    let (orch, mut store, workspace) = setup("task_update");
    orch.handle_external_event(&mut store, &workspace, &track_created("track-1"))
        .expect("track");
    orch.handle_external_event(&mut store, &workspace, &task_created("task-1", "track-1"))
        .expect("task");

    let renamed = orch
        .handle_external_event(
            &mut store,
            &workspace,
            &ExternalEvent::TaskUpdated {
                entity: eid("task-1"),
                title: "Ship it".to_string(),
            },
        )
        .expect("rename");
    assert_eq!(renamed.mutations_applied, 1);
    let snapshot = store.graph_snapshot(&workspace).expect("snapshot");
    let task = ContainerId::for_entity(&eid("task-1"));
    assert_eq!(snapshot.container(&task).expect("task").title, "Ship it");

    let identical = orch
        .handle_external_event(
            &mut store,
            &workspace,
            &ExternalEvent::TaskUpdated {
                entity: eid("task-1"),
                title: "Ship it".to_string(),
            },
        )
        .expect("identical title");
    assert!(identical.no_op);

    let unknown = orch
        .handle_external_event(
            &mut store,
            &workspace,
            &ExternalEvent::TaskUpdated {
                entity: eid("task-9"),
                title: "whatever".to_string(),
            },
        )
        .expect("unknown entity");
    assert!(unknown.no_op);
}

#[test]
fn sync_is_blocked_while_a_user_holds_the_lock() {
    let (orch, mut store, workspace) = setup("sync_blocked");
    let user = UserId::try_new("u1").expect("user id");
    store.lock_acquire(&workspace, &user).expect("acquire lock");

    let err = orch
        .handle_external_event(&mut store, &workspace, &track_created("track-1"))
        .expect_err("canvas is locked");
    assert_eq!(err.stage(), FailureStage::Execution);
    match err.error {
        EngineError::LockViolation { holder } => assert_eq!(holder.as_deref(), Some("u1")),
        other => panic!("expected LockViolation, got {other:?}"),
    }

    store.lock_release(&workspace, &user).expect("release lock");
    orch.handle_external_event(&mut store, &workspace, &track_created("track-1"))
        .expect("sync resumes after release");
}

#[test]
fn planning_warnings_survive_an_execution_failure() {
    let (orch, mut store, workspace) = setup("warnings_on_failure");
    let user = UserId::try_new("u1").expect("user id");
    orch.handle_external_event(&mut store, &workspace, &track_created("track-1"))
        .expect("track");
    orch.handle_external_event(&mut store, &workspace, &task_created("task-1", "track-1"))
        .expect("task");

    let track = ContainerId::for_entity(&eid("track-1"));
    let task = ContainerId::for_entity(&eid("task-1"));
    store.lock_acquire(&workspace, &user).expect("acquire lock");
    for container in [&track, &task] {
        orch.handle_intent(
            &mut store,
            &workspace,
            &user,
            &Intent::ActivateGhostContainer {
                container: container.clone(),
            },
        )
        .expect("activate ghost");
    }
    orch.handle_intent(
        &mut store,
        &workspace,
        &user,
        &Intent::CreateNode {
            from: PortRef::new(track.clone(), PortSide::Right),
            to: PortRef::new(task.clone(), PortSide::Left),
        },
    )
    .expect("wire manual node");

    // The lock is still held, so the deletion plans fine but cannot execute.
    let err = orch
        .handle_external_event(
            &mut store,
            &workspace,
            &ExternalEvent::TrackDeleted {
                entity: eid("track-1"),
            },
        )
        .expect_err("user still holds the lock");
    assert_eq!(err.stage(), FailureStage::Execution);
    assert!(matches!(
        err.error,
        EngineError::LockViolation { ref holder } if holder.as_deref() == Some("u1")
    ));
    assert_eq!(err.warnings.len(), 1);
    assert!(
        err.warnings[0].contains("manually created"),
        "got {:?}",
        err.warnings
    );
}

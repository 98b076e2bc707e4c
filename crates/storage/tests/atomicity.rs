#![forbid(unsafe_code)]

use mesh_core::ids::{ContainerId, UserId, WorkspaceId};
use mesh_core::model::{
    Actor, Container, ContainerState, EntityKind, LayoutMode, Position, Size,
};
use mesh_core::plan::{ContainerPatch, Plan, PlanMutation};
use mesh_storage::{SqliteStore, StoreError};
use std::path::PathBuf;

fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = base.join(format!("mesh_storage_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn active_container(workspace: &WorkspaceId, id: &str) -> Container {
    Container {
        id: ContainerId::try_new(id).expect("container id"),
        workspace: workspace.clone(),
        kind: EntityKind::Idea,
        title: id.to_string(),
        external_ref: None,
        state: ContainerState::Active,
        position: Some(Position::new(40.0, 40.0)),
        size: Size::new(220.0, 96.0),
        layout: LayoutMode::Hierarchy,
        parent: None,
    }
}

fn plan(mutations: Vec<PlanMutation>) -> Plan {
    Plan {
        mutations,
        events: vec![],
    }
}

fn locked_store(test_name: &str) -> (SqliteStore, WorkspaceId, UserId) {
    let mut store = SqliteStore::open(temp_dir(test_name)).expect("open store");
    let workspace = WorkspaceId::try_new("ws_atomic").expect("workspace id");
    let user = UserId::try_new("u1").expect("user id");
    store.workspace_init(&workspace).expect("workspace init");
    store.lock_acquire(&workspace, &user).expect("acquire lock");
    (store, workspace, user)
}

#[test]
fn failed_mutation_mid_batch_rolls_back_everything() {
    let (mut store, workspace, user) = locked_store("mid_batch_rollback");
    let actor = Actor::User(user);

    store
        .apply_plan(
            &workspace,
            &actor,
            &plan(vec![PlanMutation::CreateContainer {
                container: active_container(&workspace, "A"),
            }]),
        )
        .expect("seed container");
    let pre = store.graph_snapshot(&workspace).expect("snapshot");
    let events_before = store.events_list(&workspace, None, 100).expect("events");

    let batch = plan(vec![
        PlanMutation::UpdateContainer {
            id: ContainerId::try_new("A").expect("id"),
            patch: ContainerPatch {
                title: Some("renamed".to_string()),
                ..Default::default()
            },
        },
        PlanMutation::DeleteContainer {
            id: ContainerId::try_new("missing").expect("id"),
        },
    ]);
    let err = store
        .apply_plan(&workspace, &actor, &batch)
        .expect_err("second mutation must fail");
    assert!(matches!(err, StoreError::Plan(_)), "got {err:?}");

    let post = store.graph_snapshot(&workspace).expect("snapshot");
    assert_eq!(post, pre, "expected atomic rollback");

    // No telemetry row from the failed plan survives either.
    let events_after = store.events_list(&workspace, None, 100).expect("events");
    assert_eq!(events_after.len(), events_before.len());
}

#[test]
fn empty_mutation_batch_is_rejected() {
    let (mut store, workspace, user) = locked_store("empty_batch");
    let err = store
        .apply_plan(&workspace, &Actor::User(user), &plan(vec![]))
        .expect_err("empty batch");
    assert!(matches!(err, StoreError::InvalidInput(_)));
}

#[test]
fn every_mutation_gets_a_telemetry_row_plus_a_plan_summary() {
    let (mut store, workspace, user) = locked_store("telemetry_rows");
    let actor = Actor::User(user);

    let applied = store
        .apply_plan(
            &workspace,
            &actor,
            &plan(vec![
                PlanMutation::CreateContainer {
                    container: active_container(&workspace, "A"),
                },
                PlanMutation::UpdateContainer {
                    id: ContainerId::try_new("A").expect("id"),
                    patch: ContainerPatch {
                        title: Some("renamed".to_string()),
                        ..Default::default()
                    },
                },
            ]),
        )
        .expect("apply plan");

    assert_eq!(applied.events.len(), 3);
    assert_eq!(applied.events[0].event_type, "container_created");
    assert_eq!(applied.events[1].event_type, "container_updated");
    assert_eq!(applied.events[2].event_type, "plan_executed");

    let created: serde_json::Value =
        serde_json::from_str(&applied.events[0].payload_json).expect("payload");
    assert_eq!(created["target"], "A");
    assert!(created["before"].is_null());
    assert_eq!(created["after"]["title"], "A");

    let updated: serde_json::Value =
        serde_json::from_str(&applied.events[1].payload_json).expect("payload");
    assert_eq!(updated["before"]["title"], "A");
    assert_eq!(updated["after"]["title"], "renamed");

    let summary: serde_json::Value =
        serde_json::from_str(&applied.events[2].payload_json).expect("payload");
    assert_eq!(summary["plan_id"], applied.plan_id);
    assert_eq!(summary["mutations"], 2);
    assert!(summary["duration_ms"].is_i64());
}

#[test]
fn events_are_persisted_with_the_plan_and_cursorable() {
    let (mut store, workspace, user) = locked_store("event_cursor");
    let actor = Actor::User(user);

    for id in ["A", "B"] {
        let applied = store
            .apply_plan(
                &workspace,
                &actor,
                &plan(vec![PlanMutation::CreateContainer {
                    container: active_container(&workspace, id),
                }]),
            )
            .expect("apply plan");
        assert_eq!(applied.events.len(), 2);
    }

    // One mutation row and one plan row per plan.
    let all = store.events_list(&workspace, None, 100).expect("events");
    assert_eq!(all.len(), 4);
    let cursor = all[1].event_id();
    let tail = store
        .events_list(&workspace, Some(&cursor), 100)
        .expect("events after cursor");
    assert_eq!(tail.len(), 2);
    assert_eq!(tail[0].seq, all[2].seq);
}

#[test]
fn snapshot_of_unknown_workspace_fails() {
    let mut store = SqliteStore::open(temp_dir("unknown_workspace")).expect("open store");
    let workspace = WorkspaceId::try_new("ws_missing").expect("workspace id");
    let err = store.graph_snapshot(&workspace).expect_err("no workspace");
    assert!(matches!(err, StoreError::UnknownWorkspace));
}

#[test]
fn plan_ids_are_sequential_per_workspace() {
    let (mut store, workspace, user) = locked_store("plan_ids");
    let actor = Actor::User(user);

    let first = store
        .apply_plan(
            &workspace,
            &actor,
            &plan(vec![PlanMutation::CreateContainer {
                container: active_container(&workspace, "A"),
            }]),
        )
        .expect("first plan");
    let second = store
        .apply_plan(
            &workspace,
            &actor,
            &plan(vec![PlanMutation::CreateContainer {
                container: active_container(&workspace, "B"),
            }]),
        )
        .expect("second plan");
    assert_eq!(first.plan_id, "plan-001");
    assert_eq!(second.plan_id, "plan-002");
}

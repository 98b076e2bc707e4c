#![forbid(unsafe_code)]

use super::{StoreError, lock_row_tx};
use mesh_core::ids::{ContainerId, ExternalEntityId, NodeId, WorkspaceId};
use mesh_core::model::{
    Container, ContainerState, EntityKind, GraphSnapshot, LayoutMode, Node, NodeOrigin, PortRef,
    PortSide, Position, Reference, Size, Workspace,
};
use rusqlite::{OptionalExtension, Transaction, params};

struct ContainerRow {
    id: String,
    kind: String,
    title: String,
    external_entity: Option<String>,
    external_parent: Option<String>,
    state: String,
    pos_x: Option<f64>,
    pos_y: Option<f64>,
    width: f64,
    height: f64,
    layout: String,
    parent: Option<String>,
}

struct NodeRow {
    id: String,
    from_container: String,
    from_side: String,
    to_container: String,
    to_side: String,
    origin: String,
}

pub(super) fn snapshot_tx(
    tx: &Transaction<'_>,
    workspace: &WorkspaceId,
) -> Result<GraphSnapshot, StoreError> {
    let header: Option<(i64, i64)> = tx
        .query_row(
            "SELECT broken_layout, created_at_ms FROM workspaces WHERE workspace=?1",
            params![workspace.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let Some((broken_layout, created_at_ms)) = header else {
        return Err(StoreError::UnknownWorkspace);
    };

    let mut stmt = tx.prepare(
        "SELECT id, kind, title, external_entity, external_parent, state, \
                pos_x, pos_y, width, height, layout, parent \
         FROM containers WHERE workspace=?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![workspace.as_str()], |row| {
        Ok(ContainerRow {
            id: row.get(0)?,
            kind: row.get(1)?,
            title: row.get(2)?,
            external_entity: row.get(3)?,
            external_parent: row.get(4)?,
            state: row.get(5)?,
            pos_x: row.get(6)?,
            pos_y: row.get(7)?,
            width: row.get(8)?,
            height: row.get(9)?,
            layout: row.get(10)?,
            parent: row.get(11)?,
        })
    })?;
    let mut containers = Vec::new();
    for row in rows {
        containers.push(container_from_row(workspace, row?)?);
    }

    let mut stmt = tx.prepare(
        "SELECT id, from_container, from_side, to_container, to_side, origin \
         FROM nodes WHERE workspace=?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![workspace.as_str()], |row| {
        Ok(NodeRow {
            id: row.get(0)?,
            from_container: row.get(1)?,
            from_side: row.get(2)?,
            to_container: row.get(3)?,
            to_side: row.get(4)?,
            origin: row.get(5)?,
        })
    })?;
    let mut nodes = Vec::new();
    for row in rows {
        nodes.push(node_from_row(row?)?);
    }

    let lock = lock_row_tx(tx, workspace.as_str())?;

    Ok(GraphSnapshot {
        workspace: Workspace {
            id: workspace.clone(),
            has_broken_default_layout: broken_layout != 0,
            created_at_ms,
        },
        containers,
        nodes,
        lock,
    })
}

fn container_from_row(
    workspace: &WorkspaceId,
    row: ContainerRow,
) -> Result<Container, StoreError> {
    let kind = EntityKind::parse(&row.kind)
        .ok_or(StoreError::InvalidInput("stored container kind"))?;
    let state = ContainerState::parse(&row.state)
        .ok_or(StoreError::InvalidInput("stored container state"))?;
    let layout = LayoutMode::parse(&row.layout)
        .ok_or(StoreError::InvalidInput("stored container layout"))?;

    let external_ref = match row.external_entity {
        Some(entity) => {
            let entity = ExternalEntityId::try_new(entity)
                .map_err(|_| StoreError::InvalidInput("stored external entity id"))?;
            let parent = row
                .external_parent
                .map(ExternalEntityId::try_new)
                .transpose()
                .map_err(|_| StoreError::InvalidInput("stored external parent id"))?;
            Some(Reference {
                entity,
                kind,
                parent,
            })
        }
        None => None,
    };

    let position = match (row.pos_x, row.pos_y) {
        (Some(x), Some(y)) => Some(Position::new(x, y)),
        _ => None,
    };

    Ok(Container {
        id: ContainerId::try_new(row.id)
            .map_err(|_| StoreError::InvalidInput("stored container id"))?,
        workspace: workspace.clone(),
        kind,
        title: row.title,
        external_ref,
        state,
        position,
        size: Size::new(row.width, row.height),
        layout,
        parent: row
            .parent
            .map(ContainerId::try_new)
            .transpose()
            .map_err(|_| StoreError::InvalidInput("stored parent id"))?,
    })
}

fn node_from_row(row: NodeRow) -> Result<Node, StoreError> {
    let from_side =
        PortSide::parse(&row.from_side).ok_or(StoreError::InvalidInput("stored port side"))?;
    let to_side =
        PortSide::parse(&row.to_side).ok_or(StoreError::InvalidInput("stored port side"))?;
    let origin =
        NodeOrigin::parse(&row.origin).ok_or(StoreError::InvalidInput("stored node origin"))?;

    Ok(Node {
        id: NodeId::try_new(row.id).map_err(|_| StoreError::InvalidInput("stored node id"))?,
        from: PortRef::new(
            ContainerId::try_new(row.from_container)
                .map_err(|_| StoreError::InvalidInput("stored container id"))?,
            from_side,
        ),
        to: PortRef::new(
            ContainerId::try_new(row.to_container)
                .map_err(|_| StoreError::InvalidInput("stored container id"))?,
            to_side,
        ),
        origin,
    })
}

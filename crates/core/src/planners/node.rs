#![forbid(unsafe_code)]

use crate::error::PlanError;
use crate::ids::{NodeId, UserId};
use crate::model::{GraphSnapshot, Node, NodeOrigin, PortRef};
use crate::plan::PlanMutation;
use crate::validate;

/// Creates a user-drawn node between two ports. Both endpoints must be
/// active containers; a ghost has to be activated before it can be wired
/// manually.
pub fn create_manual_node(
    snapshot: &GraphSnapshot,
    user: &UserId,
    from: &PortRef,
    to: &PortRef,
) -> Result<Vec<PlanMutation>, PlanError> {
    validate::require_lock_holder(snapshot, user)?;
    validate::require_active(snapshot, &from.container)?;
    validate::require_active(snapshot, &to.container)?;
    if from.container == to.container {
        return Err(PlanError::EndpointsIdentical);
    }

    let id = NodeId::manual_edge(
        &from.container,
        from.side.as_str(),
        &to.container,
        to.side.as_str(),
    );
    if snapshot.node(&id).is_some() {
        return Err(PlanError::DuplicateNode { id });
    }
    Ok(vec![PlanMutation::CreateNode {
        node: Node {
            id,
            from: from.clone(),
            to: to.clone(),
            origin: NodeOrigin::Manual,
        },
    }])
}

/// Deletes a node, manual or auto-generated. Deleting an auto-generated
/// node leaves its underlying reference untouched, so the edge reappears on
/// the next auto-node recomputation.
pub fn delete_node(
    snapshot: &GraphSnapshot,
    user: &UserId,
    node: &NodeId,
) -> Result<Vec<PlanMutation>, PlanError> {
    validate::require_lock_holder(snapshot, user)?;
    validate::require_node(snapshot, node)?;
    Ok(vec![PlanMutation::DeleteNode { id: node.clone() }])
}

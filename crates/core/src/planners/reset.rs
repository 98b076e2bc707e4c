#![forbid(unsafe_code)]

use crate::error::PlanError;
use crate::ids::UserId;
use crate::layout::{self, LayoutParams};
use crate::model::GraphSnapshot;
use crate::plan::PlanMutation;
use crate::validate;

/// Explicit layout reset. Reasserts hierarchy placement, recreates any
/// missing auto-generated hierarchy edges, and clears
/// `has_broken_default_layout`; nothing else ever clears that flag.
pub fn reset_layout(
    snapshot: &GraphSnapshot,
    params: &LayoutParams,
    user: &UserId,
) -> Result<Vec<PlanMutation>, PlanError> {
    validate::require_lock_holder(snapshot, user)?;
    let mut mutations = layout::derive_auto_nodes(snapshot);
    mutations.extend(layout::reset_layout(snapshot, params));
    Ok(mutations)
}

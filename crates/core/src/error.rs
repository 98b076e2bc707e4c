#![forbid(unsafe_code)]

use crate::ids::{ContainerId, NodeId, UserId};

/// Typed planning/validation failure. Produced by validation, planners and
/// the external-system adapter; never reaches storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlanError {
    UnknownContainer { id: ContainerId },
    UnknownNode { id: NodeId },
    DuplicateContainer { id: ContainerId },
    DuplicateNode { id: NodeId },
    GhostNotInteractive { id: ContainerId },
    ContainerNotGhost { id: ContainerId },
    ContainerHasNodes { id: ContainerId },
    NestCycle { container: ContainerId, parent: ContainerId },
    KindNotNestable { parent: ContainerId },
    EndpointsIdentical,
    NotNested { id: ContainerId },
    PositionMissing { id: ContainerId },
    LockRequired,
    LockHeldByOther { holder: UserId },
    InvalidInput(&'static str),
}

impl std::fmt::Display for PlanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownContainer { id } => write!(f, "unknown container: {}", id.as_str()),
            Self::UnknownNode { id } => write!(f, "unknown node: {}", id.as_str()),
            Self::DuplicateContainer { id } => {
                write!(f, "container already exists: {}", id.as_str())
            }
            Self::DuplicateNode { id } => write!(f, "node already exists: {}", id.as_str()),
            Self::GhostNotInteractive { id } => write!(
                f,
                "container {} is a ghost and must be activated first",
                id.as_str()
            ),
            Self::ContainerNotGhost { id } => {
                write!(f, "container {} is already active", id.as_str())
            }
            Self::ContainerHasNodes { id } => {
                write!(f, "container {} still has nodes attached", id.as_str())
            }
            Self::NestCycle { container, parent } => write!(
                f,
                "nesting {} under {} would create a cycle",
                container.as_str(),
                parent.as_str()
            ),
            Self::KindNotNestable { parent } => write!(
                f,
                "container {} cannot hold nested containers",
                parent.as_str()
            ),
            Self::EndpointsIdentical => write!(f, "node endpoints must be distinct containers"),
            Self::NotNested { id } => write!(f, "container {} is not nested", id.as_str()),
            Self::PositionMissing { id } => write!(
                f,
                "active container {} is missing a position",
                id.as_str()
            ),
            Self::LockRequired => write!(f, "canvas lock is not held"),
            Self::LockHeldByOther { holder } => {
                write!(f, "canvas lock is held by {}", holder.as_str())
            }
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
        }
    }
}

impl std::error::Error for PlanError {}

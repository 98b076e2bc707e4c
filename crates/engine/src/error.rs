#![forbid(unsafe_code)]

use mesh_core::error::PlanError;
use mesh_storage::StoreError;

/// Which side of the plan/execute boundary an error came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureStage {
    Planning,
    Execution,
}

#[derive(Debug)]
pub enum EngineError {
    /// Validation rejected the request before any plan was produced.
    Planning(PlanError),
    /// The plan validated against a snapshot that no longer matches the
    /// persisted graph; nothing was applied.
    StalePlan(PlanError),
    LockViolation { holder: Option<String> },
    NothingToUndo,
    /// Execution aborted partway and was rolled back.
    PartialFailure { reason: String },
    Store(StoreError),
}

impl EngineError {
    pub fn stage(&self) -> FailureStage {
        match self {
            Self::Planning(_) => FailureStage::Planning,
            _ => FailureStage::Execution,
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Planning(err) => write!(f, "planning rejected: {err}"),
            Self::StalePlan(err) => write!(f, "plan no longer applies: {err}"),
            Self::LockViolation { holder } => match holder {
                Some(holder) => write!(f, "canvas lock violation (held by {holder})"),
                None => write!(f, "canvas lock violation (no lock held)"),
            },
            Self::NothingToUndo => write!(f, "nothing to undo"),
            Self::PartialFailure { reason } => {
                write!(f, "execution rolled back: {reason}")
            }
            Self::Store(err) => write!(f, "store: {err}"),
        }
    }
}

impl std::error::Error for EngineError {}

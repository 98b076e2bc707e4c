#![forbid(unsafe_code)]

use mesh_core::error::PlanError;

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Sql(rusqlite::Error),
    Json(serde_json::Error),
    Plan(PlanError),
    InvalidInput(&'static str),
    UnknownWorkspace,
    LockViolation { holder: Option<String> },
    LockHeld { holder: String },
    HistoryEmpty,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io: {err}"),
            Self::Sql(err) => write!(f, "sqlite: {err}"),
            Self::Json(err) => write!(f, "json: {err}"),
            Self::Plan(err) => write!(f, "plan: {err}"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::UnknownWorkspace => write!(f, "unknown workspace"),
            Self::LockViolation { holder } => match holder {
                Some(holder) => write!(f, "canvas lock violation (held by {holder})"),
                None => write!(f, "canvas lock violation (no lock held)"),
            },
            Self::LockHeld { holder } => write!(f, "canvas lock already held by {holder}"),
            Self::HistoryEmpty => write!(f, "no plan to undo"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<PlanError> for StoreError {
    fn from(value: PlanError) -> Self {
        Self::Plan(value)
    }
}

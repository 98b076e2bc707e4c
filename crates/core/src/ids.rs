#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkspaceId(String);

impl WorkspaceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn try_new(value: impl Into<String>) -> Result<Self, WorkspaceIdError> {
        let value = value.into();
        validate_workspace_id(&value)?;
        Ok(Self(value))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkspaceIdError {
    Empty,
    TooLong,
    InvalidFirstChar,
    InvalidChar { ch: char, index: usize },
}

impl WorkspaceIdError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "workspace id must not be empty",
            Self::TooLong => "workspace id is too long",
            Self::InvalidFirstChar => "workspace id must start with an alphanumeric character",
            Self::InvalidChar { .. } => "workspace id contains an invalid character",
        }
    }
}

fn validate_workspace_id(value: &str) -> Result<(), WorkspaceIdError> {
    if value.is_empty() {
        return Err(WorkspaceIdError::Empty);
    }
    if value.len() > 128 {
        return Err(WorkspaceIdError::TooLong);
    }
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return Err(WorkspaceIdError::Empty);
    };
    if !first.is_ascii_alphanumeric() {
        return Err(WorkspaceIdError::InvalidFirstChar);
    }
    for (index, ch) in value.chars().enumerate() {
        if index == 0 {
            continue;
        }
        if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
            continue;
        }
        return Err(WorkspaceIdError::InvalidChar { ch, index });
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn try_new(value: impl Into<String>) -> Result<Self, ContainerIdError> {
        let value = value.into();
        validate_opaque_id(&value).map_err(|kind| match kind {
            OpaqueIdError::Empty => ContainerIdError::Empty,
            OpaqueIdError::TooLong => ContainerIdError::TooLong,
            OpaqueIdError::ContainsPipe => ContainerIdError::ContainsPipe,
            OpaqueIdError::ContainsControl => ContainerIdError::ContainsControl,
        })?;
        Ok(Self(value))
    }

    /// Deterministic id for the container materialized from an external entity.
    pub fn for_entity(entity: &ExternalEntityId) -> Self {
        Self(format!("ext:{}", entity.as_str()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContainerIdError {
    Empty,
    TooLong,
    ContainsPipe,
    ContainsControl,
}

impl ContainerIdError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "container id must not be empty",
            Self::TooLong => "container id is too long",
            Self::ContainsPipe => "container id must not contain '|'",
            Self::ContainsControl => "container id contains control characters",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn try_new(value: impl Into<String>) -> Result<Self, NodeIdError> {
        let value = value.into();
        validate_opaque_id(&value).map_err(|kind| match kind {
            OpaqueIdError::Empty => NodeIdError::Empty,
            OpaqueIdError::TooLong => NodeIdError::TooLong,
            OpaqueIdError::ContainsPipe => NodeIdError::ContainsPipe,
            OpaqueIdError::ContainsControl => NodeIdError::ContainsControl,
        })?;
        Ok(Self(value))
    }

    /// Deterministic id for the auto-generated hierarchy edge between a
    /// parent container and one of its children. Regenerating the same edge
    /// always yields the same id, which is what keeps auto nodes derivable.
    pub fn auto_edge(parent: &ContainerId, child: &ContainerId) -> Self {
        Self(format!("auto:{}->{}", parent.as_str(), child.as_str()))
    }

    /// Deterministic id for a user-created node between two ports.
    pub fn manual_edge(
        from: &ContainerId,
        from_side: &str,
        to: &ContainerId,
        to_side: &str,
    ) -> Self {
        Self(format!(
            "manual:{}.{}->{}.{}",
            from.as_str(),
            from_side,
            to.as_str(),
            to_side
        ))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeIdError {
    Empty,
    TooLong,
    ContainsPipe,
    ContainsControl,
}

impl NodeIdError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "node id must not be empty",
            Self::TooLong => "node id is too long",
            Self::ContainsPipe => "node id must not contain '|'",
            Self::ContainsControl => "node id contains control characters",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn try_new(value: impl Into<String>) -> Result<Self, UserIdError> {
        let value = value.into();
        validate_opaque_id(&value).map_err(|kind| match kind {
            OpaqueIdError::Empty => UserIdError::Empty,
            OpaqueIdError::TooLong => UserIdError::TooLong,
            OpaqueIdError::ContainsPipe => UserIdError::ContainsPipe,
            OpaqueIdError::ContainsControl => UserIdError::ContainsControl,
        })?;
        Ok(Self(value))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserIdError {
    Empty,
    TooLong,
    ContainsPipe,
    ContainsControl,
}

impl UserIdError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "user id must not be empty",
            Self::TooLong => "user id is too long",
            Self::ContainsPipe => "user id must not contain '|'",
            Self::ContainsControl => "user id contains control characters",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExternalEntityId(String);

impl ExternalEntityId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn try_new(value: impl Into<String>) -> Result<Self, ExternalEntityIdError> {
        let value = value.into();
        validate_opaque_id(&value).map_err(|kind| match kind {
            OpaqueIdError::Empty => ExternalEntityIdError::Empty,
            OpaqueIdError::TooLong => ExternalEntityIdError::TooLong,
            OpaqueIdError::ContainsPipe => ExternalEntityIdError::ContainsPipe,
            OpaqueIdError::ContainsControl => ExternalEntityIdError::ContainsControl,
        })?;
        Ok(Self(value))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExternalEntityIdError {
    Empty,
    TooLong,
    ContainsPipe,
    ContainsControl,
}

impl ExternalEntityIdError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "external entity id must not be empty",
            Self::TooLong => "external entity id is too long",
            Self::ContainsPipe => "external entity id must not contain '|'",
            Self::ContainsControl => "external entity id contains control characters",
        }
    }
}

enum OpaqueIdError {
    Empty,
    TooLong,
    ContainsPipe,
    ContainsControl,
}

fn validate_opaque_id(value: &str) -> Result<(), OpaqueIdError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(OpaqueIdError::Empty);
    }
    if trimmed.len() > 256 {
        return Err(OpaqueIdError::TooLong);
    }
    if trimmed.contains('|') {
        return Err(OpaqueIdError::ContainsPipe);
    }
    if trimmed.chars().any(|c| c.is_control()) {
        return Err(OpaqueIdError::ContainsControl);
    }
    Ok(())
}

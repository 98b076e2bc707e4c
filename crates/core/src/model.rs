#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::ids::{ContainerId, ExternalEntityId, NodeId, UserId, WorkspaceId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Idea,
    Track,
    SubTrack,
    Task,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idea => "idea",
            Self::Track => "track",
            Self::SubTrack => "sub_track",
            Self::Task => "task",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "idea" => Some(Self::Idea),
            "track" => Some(Self::Track),
            "sub_track" => Some(Self::SubTrack),
            "task" => Some(Self::Task),
            _ => None,
        }
    }

    /// Tasks are leaves of the external hierarchy; everything else may hold
    /// nested containers.
    pub fn can_nest_children(&self) -> bool {
        !matches!(self, Self::Task)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerState {
    Ghost,
    Active,
}

impl ContainerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ghost => "ghost",
            Self::Active => "active",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ghost" => Some(Self::Ghost),
            "active" => Some(Self::Active),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    Hierarchy,
    Free,
}

impl LayoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hierarchy => "hierarchy",
            Self::Free => "free",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "hierarchy" => Some(Self::Hierarchy),
            "free" => Some(Self::Free),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortSide {
    Top,
    Right,
    Bottom,
    Left,
}

impl PortSide {
    pub const ALL: [PortSide; 4] = [Self::Top, Self::Right, Self::Bottom, Self::Left];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Right => "right",
            Self::Bottom => "bottom",
            Self::Left => "left",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "top" => Some(Self::Top),
            "right" => Some(Self::Right),
            "bottom" => Some(Self::Bottom),
            "left" => Some(Self::Left),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeOrigin {
    Manual,
    AutoGenerated,
}

impl NodeOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::AutoGenerated => "auto",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "manual" => Some(Self::Manual),
            "auto" => Some(Self::AutoGenerated),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Back-pointer from a container to the external entity it represents.
/// This is the only channel through which the external system shapes the
/// graph; nothing is ever written in the reverse direction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub entity: ExternalEntityId,
    pub kind: EntityKind,
    pub parent: Option<ExternalEntityId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub id: ContainerId,
    pub workspace: WorkspaceId,
    pub kind: EntityKind,
    pub title: String,
    pub external_ref: Option<Reference>,
    pub state: ContainerState,
    pub position: Option<Position>,
    pub size: Size,
    pub layout: LayoutMode,
    pub parent: Option<ContainerId>,
}

impl Container {
    /// Ghosts carry no position; active containers always carry one.
    pub fn position_consistent(&self) -> bool {
        match self.state {
            ContainerState::Ghost => self.position.is_none(),
            ContainerState::Active => self.position.is_some(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
    pub container: ContainerId,
    pub side: PortSide,
}

impl PortRef {
    pub fn new(container: ContainerId, side: PortSide) -> Self {
        Self { container, side }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub from: PortRef,
    pub to: PortRef,
    pub origin: NodeOrigin,
}

impl Node {
    pub fn touches(&self, container: &ContainerId) -> bool {
        &self.from.container == container || &self.to.container == container
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanvasLock {
    pub holder: UserId,
    pub issued_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub has_broken_default_layout: bool,
    pub created_at_ms: i64,
}

/// The acting party for a mutating call. External-system synchronization
/// runs as `System` and carries no write capability into the external
/// system itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Actor {
    User(UserId),
    System,
}

/// One consistent read of a workspace graph. All pure functions operate on
/// this snapshot; no ambient state is consulted anywhere in the core.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphSnapshot {
    pub workspace: Workspace,
    pub containers: Vec<Container>,
    pub nodes: Vec<Node>,
    pub lock: Option<CanvasLock>,
}

impl GraphSnapshot {
    pub fn container(&self, id: &ContainerId) -> Option<&Container> {
        self.containers.iter().find(|c| &c.id == id)
    }

    pub fn container_mut(&mut self, id: &ContainerId) -> Option<&mut Container> {
        self.containers.iter_mut().find(|c| &c.id == id)
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn container_by_reference(&self, entity: &ExternalEntityId) -> Option<&Container> {
        self.containers
            .iter()
            .find(|c| c.external_ref.as_ref().is_some_and(|r| &r.entity == entity))
    }

    pub fn children_of(&self, parent: &ContainerId) -> Vec<&Container> {
        self.containers
            .iter()
            .filter(|c| c.parent.as_ref() == Some(parent))
            .collect()
    }

    pub fn roots(&self) -> Vec<&Container> {
        self.containers.iter().filter(|c| c.parent.is_none()).collect()
    }

    pub fn nodes_touching(&self, container: &ContainerId) -> Vec<&Node> {
        self.nodes.iter().filter(|n| n.touches(container)).collect()
    }

    /// Ports are derived: four anchor sides per container.
    pub fn ports(&self) -> Vec<PortRef> {
        let mut out = Vec::with_capacity(self.containers.len() * PortSide::ALL.len());
        for container in &self.containers {
            for side in PortSide::ALL {
                out.push(PortRef::new(container.id.clone(), side));
            }
        }
        out
    }
}

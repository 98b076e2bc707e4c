#![forbid(unsafe_code)]

use crate::config::EngineConfig;
use crate::error::{EngineError, FailureStage};
use crate::execution;
use crate::plan_service;
use mesh_core::ids::{UserId, WorkspaceId};
use mesh_core::model::Actor;
use mesh_core::plan::{ExternalEvent, Intent};
use mesh_storage::SqliteStore;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrchestrationResult {
    pub plan_id: Option<String>,
    pub no_op: bool,
    pub mutations_applied: usize,
    pub warnings: Vec<String>,
}

impl OrchestrationResult {
    fn no_op() -> Self {
        Self {
            plan_id: None,
            no_op: true,
            mutations_applied: 0,
            warnings: Vec::new(),
        }
    }
}

/// A failed orchestration. Carries the warnings collected before the
/// failure, so a request that planned with warnings and then failed to
/// execute still hands the caller the full context.
#[derive(Debug)]
pub struct OrchestrationFailure {
    pub error: EngineError,
    pub warnings: Vec<String>,
}

impl OrchestrationFailure {
    pub fn stage(&self) -> FailureStage {
        self.error.stage()
    }
}

impl From<EngineError> for OrchestrationFailure {
    fn from(error: EngineError) -> Self {
        Self {
            error,
            warnings: Vec::new(),
        }
    }
}

impl std::fmt::Display for OrchestrationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.error.fmt(f)
    }
}

impl std::error::Error for OrchestrationFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Ties the planning and execution stages together over one store. Holds
/// only configuration; all graph state lives in the store.
#[derive(Clone, Debug, Default)]
pub struct Orchestrator {
    config: EngineConfig,
}

impl Orchestrator {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn handle_intent(
        &self,
        store: &mut SqliteStore,
        workspace: &WorkspaceId,
        user: &UserId,
        intent: &Intent,
    ) -> Result<OrchestrationResult, OrchestrationFailure> {
        let snapshot = store.graph_snapshot(workspace).map_err(EngineError::Store)?;
        let outcome =
            plan_service::plan_for_intent(&snapshot, &self.config.layout, user, intent)
                .map_err(EngineError::Planning)?;
        let Some(plan) = outcome.plan else {
            return Ok(OrchestrationResult::no_op());
        };
        for warning in &outcome.warnings {
            log::warn!("workspace {}: {warning}", workspace.as_str());
        }

        let applied = execution::execute_plan(store, workspace, &Actor::User(user.clone()), &plan)
            .map_err(|error| OrchestrationFailure {
                error,
                warnings: outcome.warnings.clone(),
            })?;
        log::info!(
            "workspace {}: {} applied ({} mutations)",
            workspace.as_str(),
            applied.plan_id,
            applied.mutations_applied
        );
        Ok(OrchestrationResult {
            plan_id: Some(applied.plan_id),
            no_op: false,
            mutations_applied: applied.mutations_applied,
            warnings: outcome.warnings,
        })
    }

    /// Applies one external-system event. Runs as the system actor, so it
    /// only proceeds while no user holds the canvas lock; replays come back
    /// as no-ops.
    pub fn handle_external_event(
        &self,
        store: &mut SqliteStore,
        workspace: &WorkspaceId,
        event: &ExternalEvent,
    ) -> Result<OrchestrationResult, OrchestrationFailure> {
        let snapshot = store.graph_snapshot(workspace).map_err(EngineError::Store)?;
        let outcome = plan_service::plan_for_event(&snapshot, &self.config.layout, event)
            .map_err(EngineError::Planning)?;
        let Some(plan) = outcome.plan else {
            log::debug!("workspace {}: external event was a no-op", workspace.as_str());
            return Ok(OrchestrationResult::no_op());
        };
        for warning in &outcome.warnings {
            log::warn!("workspace {}: {warning}", workspace.as_str());
        }

        let applied = execution::execute_plan(store, workspace, &Actor::System, &plan)
            .map_err(|error| OrchestrationFailure {
                error,
                warnings: outcome.warnings.clone(),
            })?;
        log::info!(
            "workspace {}: {} applied from external event ({} mutations)",
            workspace.as_str(),
            applied.plan_id,
            applied.mutations_applied
        );
        Ok(OrchestrationResult {
            plan_id: Some(applied.plan_id),
            no_op: false,
            mutations_applied: applied.mutations_applied,
            warnings: outcome.warnings,
        })
    }

    pub fn handle_undo(
        &self,
        store: &mut SqliteStore,
        workspace: &WorkspaceId,
        user: &UserId,
    ) -> Result<OrchestrationResult, OrchestrationFailure> {
        let undone = execution::undo_last(store, workspace, user)
            .map_err(OrchestrationFailure::from)?;
        log::info!(
            "workspace {}: {} rolled back ({} mutations)",
            workspace.as_str(),
            undone.plan_id,
            undone.mutations_applied
        );
        Ok(OrchestrationResult {
            plan_id: Some(undone.plan_id),
            no_op: false,
            mutations_applied: undone.mutations_applied,
            warnings: Vec::new(),
        })
    }
}

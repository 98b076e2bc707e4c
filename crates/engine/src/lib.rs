#![forbid(unsafe_code)]

pub mod config;
pub mod error;
mod execution;
mod orchestrate;
mod plan_service;
mod telemetry;

pub use config::{ConfigError, EngineConfig};
pub use error::{EngineError, FailureStage};
pub use execution::{execute_plan, undo_last};
pub use orchestrate::{OrchestrationFailure, OrchestrationResult, Orchestrator};
pub use plan_service::{PlanOutcome, plan_for_event, plan_for_intent};
pub use telemetry::event_feed_json;

//! Reinstate: declarative application state capture and restore.
//!
//! A blueprint enumerates the resources that make up an installed
//! application (file trees, registry-style keys, environment variables,
//! services, hosts entries) plus side-effect hooks; a snapshot archive
//! holds the blueprint together with the captured payloads, portable
//! across machines via variable substitution.

pub mod actions;
pub mod backend;
pub mod blueprint;
pub mod context;
pub mod error;
pub mod hooks;
pub mod logging;
pub mod orchestrator;
pub mod snapshot;
pub mod types;

pub use actions::Action;
pub use backend::Backends;
pub use blueprint::{Blueprint, InstanceBlueprint, ProjectBlueprint};
pub use context::{AbortOnErrorCallback, ActionCallback, ActionContext, ContinueAllCallback};
pub use error::EngineError;
pub use hooks::Hook;
pub use orchestrator::Orchestrator;
pub use snapshot::{SnapshotReader, SnapshotWriter};
pub use types::{Decision, Phase, VerifyResult, VerifyStatus};

//! Error types for the scenario runner

use std::time::Duration;

use diorama_core::{CoreError, ResolutionError};
use thiserror::Error;

/// Fatal problems found while configuring a run. Nothing is retried.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An application reference could not be resolved
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// Conductor-level validation failed (duplicate names, missing zomes)
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("No instances configured")]
    NoInstances,

    /// A bridge names an instance that is not configured
    #[error("Bridge '{handle}' references unknown instance '{instance}'")]
    UnknownBridgeInstance { handle: String, instance: String },

    #[error("Scenario timeout must be greater than zero")]
    ZeroTimeout,
}

/// Result type for configuration
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Failures attributed to a single scenario
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("No instance named '{0}' in this scenario")]
    UnknownInstance(String),

    #[error("Scenario timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Scenario panicked: {0}")]
    Panicked(String),

    #[error("Failed to start instances: {0}")]
    Startup(#[from] CoreError),
}

//! Process-boundary error sink.
//!
//! Errors that escape a scenario (handler errors, panics, failures of tasks
//! spawned through the scenario API) are reported here instead of being
//! lost. The runner installs the sink when a run starts and drains it when
//! the run ends; every record counts as a failure.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinError;

/// An error that escaped its scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    /// Index of the offending scenario, if known
    pub scenario: Option<usize>,
    pub description: Option<String>,
    pub error: String,
}

#[derive(Debug, Default)]
struct SinkState {
    installed: bool,
    rejections: Vec<Rejection>,
}

#[derive(Clone, Default)]
pub struct ErrorSink {
    state: Arc<Mutex<SinkState>>,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start collecting for a new run, discarding anything left over.
    pub(crate) fn install(&self) {
        let mut state = self.state.lock();
        if !state.rejections.is_empty() {
            tracing::warn!(
                count = state.rejections.len(),
                "Discarding rejections reported outside a run"
            );
        }
        state.installed = true;
        state.rejections.clear();
    }

    /// Stop collecting and hand back everything reported.
    pub(crate) fn drain(&self) -> Vec<Rejection> {
        let mut state = self.state.lock();
        state.installed = false;
        std::mem::take(&mut state.rejections)
    }

    pub fn is_installed(&self) -> bool {
        self.state.lock().installed
    }

    /// Report an error attributed to a scenario.
    pub fn report_scenario(&self, index: usize, description: &str, error: impl Into<String>) {
        let error = error.into();
        tracing::error!(scenario = %description, error = %error, "Unhandled rejection");
        self.push(Rejection {
            scenario: Some(index),
            description: Some(description.to_string()),
            error,
        });
    }

    /// Report an error nobody can be blamed for.
    pub fn report(&self, error: impl Into<String>) {
        let error = error.into();
        tracing::error!(error = %error, "Unhandled rejection");
        self.push(Rejection {
            scenario: None,
            description: None,
            error,
        });
    }

    fn push(&self, rejection: Rejection) {
        let mut state = self.state.lock();
        if !state.installed {
            tracing::warn!(error = %rejection.error, "Rejection reported outside a run");
        }
        state.rejections.push(rejection);
    }
}

/// Human-readable text for a failed task
pub(crate) fn join_error_message(err: JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

//! Scenario API (`s`): network consistency and attributed background tasks.

use std::future::Future;
use std::sync::Arc;

use diorama_core::Conductor;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::sink::{join_error_message, ErrorSink};

struct ApiInner {
    index: usize,
    description: Arc<str>,
    conductor: Arc<Conductor>,
    sink: ErrorSink,
    spawned: Mutex<Vec<JoinHandle<()>>>,
}

#[derive(Clone)]
pub struct ScenarioApi {
    inner: Arc<ApiInner>,
}

impl ScenarioApi {
    pub(crate) fn new(
        index: usize,
        description: Arc<str>,
        conductor: Arc<Conductor>,
        sink: ErrorSink,
    ) -> Self {
        Self {
            inner: Arc::new(ApiInner {
                index,
                description,
                conductor,
                sink,
                spawned: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn description(&self) -> &str {
        &self.inner.description
    }

    /// Position of this scenario in registration order
    pub fn index(&self) -> usize {
        self.inner.index
    }

    /// Wait until everything published so far is visible to every instance.
    pub async fn consistent(&self) {
        self.inner.conductor.consistent().await;
    }

    /// Run a task alongside the handler.
    ///
    /// The scenario is not finished until the task is; an error or panic
    /// from it is reported to the error sink against this scenario.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let sink = self.inner.sink.clone();
        let index = self.inner.index;
        let description = self.inner.description.clone();

        let handle = tokio::spawn(
            async move {
                if let Err(e) = task.await {
                    sink.report_scenario(index, &description, format!("{:#}", e));
                }
            }
            .instrument(tracing::Span::current()),
        );
        self.inner.spawned.lock().push(handle);
    }

    /// Wait for spawned tasks, including ones spawned while waiting.
    pub(crate) async fn join_spawned(&self) {
        loop {
            let handles = std::mem::take(&mut *self.inner.spawned.lock());
            if handles.is_empty() {
                break;
            }
            for handle in handles {
                if let Err(e) = handle.await {
                    self.inner.sink.report_scenario(
                        self.inner.index,
                        &self.inner.description,
                        format!("spawned task failed: {}", join_error_message(e)),
                    );
                }
            }
        }
    }

    pub(crate) fn abort_spawned(&self) {
        for handle in self.inner.spawned.lock().drain(..) {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for ScenarioApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioApi")
            .field("index", &self.inner.index)
            .field("description", &self.inner.description)
            .finish()
    }
}

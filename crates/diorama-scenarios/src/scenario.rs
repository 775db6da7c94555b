//! Registered scenarios.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::api::ScenarioApi;
use crate::assert::Assert;
use crate::instance::Instances;

/// Future returned by a scenario handler
pub type ScenarioFuture = BoxFuture<'static, anyhow::Result<()>>;

/// Type-erased scenario handler
pub type ScenarioFn = Arc<dyn Fn(ScenarioApi, Assert, Instances) -> ScenarioFuture + Send + Sync>;

/// A description plus the handler to run
pub struct Scenario {
    pub description: String,
    /// Run exclusively: when any scenario is marked, unmarked ones are skipped
    pub only: bool,
    handler: ScenarioFn,
}

impl Scenario {
    pub fn new<F, Fut>(description: impl Into<String>, handler: F) -> Self
    where
        F: Fn(ScenarioApi, Assert, Instances) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            description: description.into(),
            only: false,
            handler: Arc::new(move |s, t, instances| Box::pin(handler(s, t, instances))),
        }
    }

    pub(crate) fn invoke(&self, s: ScenarioApi, t: Assert, instances: Instances) -> ScenarioFuture {
        (self.handler)(s, t, instances)
    }
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("description", &self.description)
            .field("only", &self.only)
            .finish()
    }
}

//! Instance handles as seen by scenario handlers.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use diorama_core::{CallResult, InstanceHandle};
use serde_json::Value;

use crate::error::ScenarioError;
use crate::middleware::{CallContext, Middleware};

/// Shared, ordered middleware list
pub(crate) type MiddlewareChain = Arc<[Arc<dyn Middleware>]>;

/// One named instance inside a running scenario
#[derive(Clone)]
pub struct ScenarioInstance {
    handle: InstanceHandle,
    scenario: Arc<str>,
    middleware: MiddlewareChain,
}

impl ScenarioInstance {
    pub(crate) fn new(handle: InstanceHandle, scenario: Arc<str>, middleware: MiddlewareChain) -> Self {
        Self {
            handle,
            scenario,
            middleware,
        }
    }

    pub fn name(&self) -> &str {
        self.handle.name()
    }

    /// The underlying conductor handle, bypassing middleware
    pub fn handle(&self) -> &InstanceHandle {
        &self.handle
    }

    /// Call a zome function. Await it before issuing calls that depend on
    /// its result.
    pub async fn call(&self, zome: &str, function: &str, payload: Value) -> CallResult {
        let ctx = CallContext {
            scenario: &self.scenario,
            instance: self.handle.name(),
            zome,
            function,
        };

        let mut payload = payload;
        for m in self.middleware.iter() {
            m.before_call(&ctx, &mut payload);
        }

        let started = Instant::now();
        let result = self.handle.call(zome, function, payload.clone()).await;
        let elapsed = started.elapsed();

        for m in self.middleware.iter() {
            m.after_call(&ctx, &payload, &result, elapsed);
        }
        result
    }
}

impl std::fmt::Debug for ScenarioInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioInstance")
            .field("name", &self.name())
            .field("scenario", &self.scenario)
            .finish()
    }
}

/// Instances available to a scenario, by name
#[derive(Debug, Clone, Default)]
pub struct Instances {
    by_name: BTreeMap<String, ScenarioInstance>,
}

impl Instances {
    pub(crate) fn new(instances: impl IntoIterator<Item = ScenarioInstance>) -> Self {
        Self {
            by_name: instances
                .into_iter()
                .map(|i| (i.name().to_string(), i))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Result<&ScenarioInstance, ScenarioError> {
        self.by_name
            .get(name)
            .ok_or_else(|| ScenarioError::UnknownInstance(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScenarioInstance> {
        self.by_name.values()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

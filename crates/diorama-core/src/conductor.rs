//! In-process conductor hosting named instances.
//!
//! Each instance has its own source chain; instances of the same DNA share
//! one [`Network`]. A conductor is cheap to start, so a runner can give every
//! scenario a fresh one.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::Value;

use crate::address::Address;
use crate::chain::SourceChain;
use crate::dna::DnaRef;
use crate::envelope::{CallResult, ZomeApiError, ZomeApiResult};
use crate::error::{CoreError, CoreResult};
use crate::network::Network;
use crate::zome::{ZomeApi, ZomeRegistry};

/// Conductor tuning
#[derive(Debug, Clone, Default)]
pub struct ConductorOptions {
    /// Delay applied to each DHT publish before it becomes visible to peers
    pub gossip_delay: Duration,
}

struct Instance {
    name: String,
    dna: DnaRef,
    chain: RwLock<SourceChain>,
    network: Arc<Network>,
    zomes: ZomeRegistry,
}

/// Handle to one running instance
#[derive(Clone)]
pub struct InstanceHandle(Arc<Instance>);

impl InstanceHandle {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn dna(&self) -> &DnaRef {
        &self.0.dna
    }

    /// Number of elements on this instance's source chain
    pub fn chain_len(&self) -> usize {
        self.0.chain.read().len()
    }

    /// Invoke a zome function.
    ///
    /// Never fails at the Rust level: unknown zomes or functions, bad
    /// payloads and zome errors all come back as the error branch.
    pub async fn call(&self, zome: &str, function: &str, payload: Value) -> CallResult {
        // Calls are suspension points even though zome code runs inline.
        tokio::task::yield_now().await;

        let result = self.dispatch(zome, function, payload);
        match &result {
            Ok(_) => tracing::trace!(
                instance = %self.name(),
                zome = %zome,
                function = %function,
                "Zome call succeeded"
            ),
            Err(e) => tracing::debug!(
                instance = %self.name(),
                zome = %zome,
                function = %function,
                error = %e,
                "Zome call returned error"
            ),
        }
        CallResult::from(result)
    }

    fn dispatch(&self, zome: &str, function: &str, payload: Value) -> ZomeApiResult<Value> {
        let not_implemented = || ZomeApiError::FunctionNotImplemented(format!("{}/{}", zome, function));

        let zome_def = self.0.dna.file().zome(zome).ok_or_else(not_implemented)?;
        if zome_def.function(function).is_none() {
            return Err(not_implemented());
        }
        if !payload.is_object() {
            return Err(ZomeApiError::ArgumentDeserializationFailed(
                "payload must be a JSON object".to_string(),
            ));
        }
        let implementation = self.0.zomes.get(zome).ok_or_else(not_implemented)?;

        let api = ZomeApi::new(
            &self.0.name,
            zome,
            zome_def,
            &self.0.chain,
            &self.0.network,
        );
        implementation.call(&api, function, payload)
    }
}

impl std::fmt::Debug for InstanceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceHandle")
            .field("name", &self.0.name)
            .field("dna", &self.0.dna.id())
            .finish()
    }
}

/// A set of running instances
pub struct Conductor {
    instances: BTreeMap<String, InstanceHandle>,
    networks: HashMap<Address, Arc<Network>>,
}

impl Conductor {
    /// Start one instance per `(name, dna)` pair.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<I>(instances: I, zomes: &ZomeRegistry, options: &ConductorOptions) -> CoreResult<Self>
    where
        I: IntoIterator<Item = (String, DnaRef)>,
    {
        let mut handles = BTreeMap::new();
        let mut networks: HashMap<Address, Arc<Network>> = HashMap::new();

        for (name, dna) in instances {
            if handles.contains_key(&name) {
                return Err(CoreError::DuplicateInstance(name));
            }
            zomes.check_dna(&dna)?;

            let network = networks
                .entry(dna.hash().clone())
                .or_insert_with(|| Network::start(dna.hash().clone(), options.gossip_delay))
                .clone();

            tracing::debug!(instance = %name, dna = %dna.id(), "Starting instance");

            let handle = InstanceHandle(Arc::new(Instance {
                name: name.clone(),
                dna,
                chain: RwLock::new(SourceChain::new()),
                network,
                zomes: zomes.clone(),
            }));
            handles.insert(name, handle);
        }

        Ok(Self {
            instances: handles,
            networks,
        })
    }

    pub fn instance(&self, name: &str) -> Option<&InstanceHandle> {
        self.instances.get(name)
    }

    pub fn instances(&self) -> impl Iterator<Item = &InstanceHandle> {
        self.instances.values()
    }

    pub fn names(&self) -> Vec<String> {
        self.instances.keys().cloned().collect()
    }

    /// Stop every network's gossip task. Instances stay callable but no
    /// longer see each other's publishes.
    pub fn shutdown(&self) {
        for network in self.networks.values() {
            network.stop();
        }
    }

    /// Wait until every network has applied all outstanding publishes.
    pub async fn consistent(&self) {
        for network in self.networks.values() {
            network.consistent().await;
        }
    }
}

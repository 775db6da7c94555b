//! Native zome implementations and the host API they run against.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::address::Address;
use crate::chain::{Link, SourceChain};
use crate::dna::{DnaRef, Sharing, ZomeDef};
use crate::entry::Entry;
use crate::envelope::{ZomeApiError, ZomeApiResult};
use crate::error::{CoreError, CoreResult};
use crate::network::{DhtOp, Network};

/// Application logic of one zome.
///
/// Implementations are synchronous; the conductor awaits around them.
pub trait Zome: Send + Sync {
    /// Zome name as declared in the DNA
    fn name(&self) -> &str;

    /// Run `function` with a JSON object payload.
    fn call(&self, api: &ZomeApi<'_>, function: &str, payload: Value) -> ZomeApiResult<Value>;
}

/// Decode a call payload into the function's typed inputs.
pub fn parse_input<T: DeserializeOwned>(payload: Value) -> ZomeApiResult<T> {
    serde_json::from_value(payload)
        .map_err(|e| ZomeApiError::ArgumentDeserializationFailed(e.to_string()))
}

/// Encode a function's typed output.
pub fn to_output<T: Serialize>(output: T) -> ZomeApiResult<Value> {
    Ok(serde_json::to_value(output)?)
}

/// Zome implementations available to a conductor, keyed by zome name.
#[derive(Clone, Default)]
pub struct ZomeRegistry {
    zomes: BTreeMap<String, Arc<dyn Zome>>,
}

impl ZomeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a zome, replacing any earlier one of the same name.
    pub fn register(&mut self, zome: impl Zome + 'static) -> &mut Self {
        self.zomes.insert(zome.name().to_string(), Arc::new(zome));
        self
    }

    pub fn with(mut self, zome: impl Zome + 'static) -> Self {
        self.register(zome);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Zome>> {
        self.zomes.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.zomes.keys().map(String::as_str)
    }

    /// Check that every zome the DNA declares has an implementation.
    pub fn check_dna(&self, dna: &DnaRef) -> CoreResult<()> {
        for zome in dna.file().zomes.keys() {
            if !self.zomes.contains_key(zome) {
                return Err(CoreError::ZomeNotRegistered {
                    dna: dna.id().to_string(),
                    zome: zome.clone(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ZomeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.zomes.keys()).finish()
    }
}

/// Host functions available to zome code during one call.
pub struct ZomeApi<'a> {
    agent: &'a str,
    zome_name: &'a str,
    zome_def: &'a ZomeDef,
    chain: &'a RwLock<SourceChain>,
    network: &'a Network,
}

impl<'a> ZomeApi<'a> {
    pub(crate) fn new(
        agent: &'a str,
        zome_name: &'a str,
        zome_def: &'a ZomeDef,
        chain: &'a RwLock<SourceChain>,
        network: &'a Network,
    ) -> Self {
        Self {
            agent,
            zome_name,
            zome_def,
            chain,
            network,
        }
    }

    /// Name of the instance the call runs on
    pub fn agent(&self) -> &str {
        self.agent
    }

    /// Address an entry would be committed at, without committing it.
    pub fn entry_address(&self, entry: &Entry) -> Address {
        entry.address()
    }

    /// Commit an entry to the source chain and publish it if it is public.
    pub fn commit_entry(&self, entry: &Entry) -> ZomeApiResult<Address> {
        let def = self.zome_def.entry_type(entry.entry_type()).ok_or_else(|| {
            ZomeApiError::ValidationFailed(format!(
                "entry type '{}' is not defined in zome '{}'",
                entry.entry_type(),
                self.zome_name
            ))
        })?;

        let address = self.chain.write().commit(entry.clone());
        if def.sharing == Sharing::Public {
            self.network.publish(DhtOp::StoreEntry(entry.clone()));
        }

        tracing::debug!(
            agent = %self.agent,
            entry_type = %entry.entry_type(),
            address = %address,
            "Committed entry"
        );
        Ok(address)
    }

    /// Look an entry up on the local chain, then on the DHT.
    pub fn get_entry(&self, address: &Address) -> ZomeApiResult<Option<Entry>> {
        if let Some(entry) = self.chain.read().get(address) {
            return Ok(Some(entry.clone()));
        }
        Ok(self.network.get_entry(address))
    }

    /// Fetch an entry and decode its data, failing if it does not exist.
    pub fn get_as_type<T: DeserializeOwned>(&self, address: &Address) -> ZomeApiResult<T> {
        let entry = self
            .get_entry(address)?
            .ok_or_else(|| ZomeApiError::HashNotFound(address.to_string()))?;
        Ok(entry.decode()?)
    }

    /// Link two existing entries.
    ///
    /// Both ends must resolve and the base entry type must declare
    /// `link_type` towards the target's entry type.
    pub fn link_entries(
        &self,
        base: &Address,
        target: &Address,
        link_type: &str,
        tag: &str,
    ) -> ZomeApiResult<Address> {
        let base_entry = self.get_entry(base)?.ok_or_else(|| {
            ZomeApiError::ValidationFailed(format!("base for link not found: {}", base))
        })?;
        let target_entry = self.get_entry(target)?.ok_or_else(|| {
            ZomeApiError::ValidationFailed(format!("target for link not found: {}", target))
        })?;

        if !self.zome_def.allows_link(
            base_entry.entry_type(),
            link_type,
            target_entry.entry_type(),
        ) {
            return Err(ZomeApiError::ValidationFailed(format!(
                "link type '{}' from '{}' to '{}' is not defined",
                link_type,
                base_entry.entry_type(),
                target_entry.entry_type()
            )));
        }

        let link = Link {
            base: base.clone(),
            target: target.clone(),
            link_type: link_type.to_string(),
            tag: tag.to_string(),
        };
        let address = link.address();

        self.chain.write().add_link(link.clone());
        self.network.publish(DhtOp::AddLink(link));
        Ok(address)
    }

    /// Targets linked from `base`, own links first, then links gossiped
    /// in from other instances.
    pub fn get_links(
        &self,
        base: &Address,
        link_type: &str,
        tag: Option<&str>,
    ) -> ZomeApiResult<Vec<Address>> {
        let mut targets = self.chain.read().links(base, link_type, tag);
        for target in self.network.get_links(base, link_type, tag) {
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
        Ok(targets)
    }
}

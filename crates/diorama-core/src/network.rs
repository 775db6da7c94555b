//! Shared DHT for the instances of one DNA.
//!
//! Publishes go through an unbounded channel to a gossip task that applies
//! them to the shared store, optionally after a delay. A `watch` counter of
//! in-flight publishes lets callers wait for consistency.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::address::Address;
use crate::chain::Link;
use crate::entry::Entry;

/// Operation published by an instance
#[derive(Debug, Clone)]
pub enum DhtOp {
    StoreEntry(Entry),
    AddLink(Link),
}

#[derive(Debug, Default)]
struct DhtStore {
    entries: HashMap<Address, Entry>,
    links: Vec<Link>,
}

impl DhtStore {
    fn apply(&mut self, op: DhtOp) {
        match op {
            DhtOp::StoreEntry(entry) => {
                self.entries.insert(entry.address(), entry);
            }
            DhtOp::AddLink(link) => {
                if !self.links.contains(&link) {
                    self.links.push(link);
                }
            }
        }
    }
}

/// Network shared by every instance of one DNA within a conductor
pub struct Network {
    dna_hash: Address,
    store: Arc<RwLock<DhtStore>>,
    tx: mpsc::UnboundedSender<DhtOp>,
    pending: Arc<watch::Sender<usize>>,
    gossip: JoinHandle<()>,
}

impl Network {
    /// Start the gossip task. Must be called from within a tokio runtime.
    pub fn start(dna_hash: Address, gossip_delay: Duration) -> Arc<Self> {
        let store = Arc::new(RwLock::new(DhtStore::default()));
        let (tx, mut rx) = mpsc::unbounded_channel::<DhtOp>();
        let (pending, _) = watch::channel(0usize);
        let pending = Arc::new(pending);

        let task_store = store.clone();
        let task_pending = pending.clone();
        let task_dna = dna_hash.clone();
        let gossip = tokio::spawn(async move {
            while let Some(op) = rx.recv().await {
                if !gossip_delay.is_zero() {
                    tokio::time::sleep(gossip_delay).await;
                }
                tracing::trace!(dna = %task_dna, op = ?op, "Applying DHT op");
                task_store.write().apply(op);
                task_pending.send_modify(|n| *n = n.saturating_sub(1));
            }
        });

        Arc::new(Self {
            dna_hash,
            store,
            tx,
            pending,
            gossip,
        })
    }

    pub fn dna_hash(&self) -> &Address {
        &self.dna_hash
    }

    pub fn publish(&self, op: DhtOp) {
        self.pending.send_modify(|n| *n += 1);
        if let Err(e) = self.tx.send(op) {
            self.pending.send_modify(|n| *n = n.saturating_sub(1));
            tracing::warn!(dna = %self.dna_hash, op = ?e.0, "Gossip task stopped, dropping publish");
        }
    }

    /// Number of publishes not yet applied
    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    /// Wait until every publish issued so far has been applied.
    pub async fn consistent(&self) {
        let mut rx = self.pending.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Stop gossiping. Queued publishes are dropped and waiters released.
    pub fn stop(&self) {
        self.gossip.abort();
        self.pending.send_replace(0);
    }

    pub fn get_entry(&self, address: &Address) -> Option<Entry> {
        self.store.read().entries.get(address).cloned()
    }

    pub fn get_links(&self, base: &Address, link_type: &str, tag: Option<&str>) -> Vec<Address> {
        self.store
            .read()
            .links
            .iter()
            .filter(|l| l.matches(base, link_type, tag))
            .map(|l| l.target.clone())
            .collect()
    }
}

impl Drop for Network {
    fn drop(&mut self) {
        self.gossip.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dna() -> Address {
        Address::from_content(b"test-dna")
    }

    #[tokio::test]
    async fn test_publish_then_consistent() {
        let network = Network::start(dna(), Duration::ZERO);
        let entry = Entry::app("note", &"hello").unwrap();

        network.publish(DhtOp::StoreEntry(entry.clone()));
        network.consistent().await;

        assert_eq!(network.pending(), 0);
        assert_eq!(network.get_entry(&entry.address()), Some(entry));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_gossip_is_not_visible_until_applied() {
        let network = Network::start(dna(), Duration::from_millis(500));
        let entry = Entry::app("note", &"later").unwrap();

        network.publish(DhtOp::StoreEntry(entry.clone()));
        assert_eq!(network.pending(), 1);
        assert!(network.get_entry(&entry.address()).is_none());

        network.consistent().await;
        assert_eq!(network.get_entry(&entry.address()), Some(entry));
    }

    #[tokio::test]
    async fn test_links_are_deduplicated() {
        let network = Network::start(dna(), Duration::ZERO);
        let base = Address::from_content(b"base");
        let target = Address::from_content(b"target");
        let link = Link {
            base: base.clone(),
            target: target.clone(),
            link_type: "items".into(),
            tag: "".into(),
        };

        network.publish(DhtOp::AddLink(link.clone()));
        network.publish(DhtOp::AddLink(link));
        network.consistent().await;

        assert_eq!(network.get_links(&base, "items", None), vec![target]);
    }

    #[tokio::test]
    async fn test_consistent_with_nothing_pending_returns() {
        let network = Network::start(dna(), Duration::ZERO);
        network.consistent().await;
        assert_eq!(network.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_releases_waiters() {
        let network = Network::start(dna(), Duration::from_secs(3600));
        network.publish(DhtOp::StoreEntry(Entry::app("note", &"never").unwrap()));
        assert_eq!(network.pending(), 1);

        network.stop();
        network.consistent().await;
        assert_eq!(network.pending(), 0);
    }
}

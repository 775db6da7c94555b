//! Per-instance source chain.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::entry::Entry;

/// A link between two entries
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub base: Address,
    pub target: Address,
    pub link_type: String,
    pub tag: String,
}

impl Link {
    pub fn address(&self) -> Address {
        let content = format!(
            "{}\0{}\0{}\0{}",
            self.base, self.target, self.link_type, self.tag
        );
        Address::from_content(content.as_bytes())
    }

    /// Whether this link answers a query for `link_type` (and `tag`, if given)
    pub fn matches(&self, base: &Address, link_type: &str, tag: Option<&str>) -> bool {
        &self.base == base && self.link_type == link_type && tag.map_or(true, |t| self.tag == t)
    }
}

/// Everything an instance has authored, in commit order.
#[derive(Debug, Default)]
pub struct SourceChain {
    entries: HashMap<Address, Entry>,
    order: Vec<Address>,
    links: Vec<Link>,
}

impl SourceChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Committing identical content again records a new
    /// chain element but keeps the same address.
    pub fn commit(&mut self, entry: Entry) -> Address {
        let address = entry.address();
        self.order.push(address.clone());
        self.entries.insert(address.clone(), entry);
        address
    }

    pub fn get(&self, address: &Address) -> Option<&Entry> {
        self.entries.get(address)
    }

    pub fn add_link(&mut self, link: Link) {
        if !self.links.contains(&link) {
            self.links.push(link);
        }
    }

    pub fn links(&self, base: &Address, link_type: &str, tag: Option<&str>) -> Vec<Address> {
        self.links
            .iter()
            .filter(|l| l.matches(base, link_type, tag))
            .map(|l| l.target.clone())
            .collect()
    }

    /// Number of chain elements
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Entries in commit order
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &Entry)> {
        self.order
            .iter()
            .filter_map(|address| self.entries.get(address).map(|entry| (address, entry)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_and_get() {
        let mut chain = SourceChain::new();
        let entry = Entry::app("note", &"hello").unwrap();
        let address = chain.commit(entry.clone());

        assert_eq!(chain.get(&address), Some(&entry));
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_recommit_keeps_address() {
        let mut chain = SourceChain::new();
        let entry = Entry::app("note", &"hello").unwrap();
        let a = chain.commit(entry.clone());
        let b = chain.commit(entry);

        assert_eq!(a, b);
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_links_filter_by_type_and_tag() {
        let mut chain = SourceChain::new();
        let base = chain.commit(Entry::app("book", &"b").unwrap());
        let one = chain.commit(Entry::app("note", &"1").unwrap());
        let two = chain.commit(Entry::app("note", &"2").unwrap());

        chain.add_link(Link {
            base: base.clone(),
            target: one.clone(),
            link_type: "notes".into(),
            tag: "".into(),
        });
        chain.add_link(Link {
            base: base.clone(),
            target: two.clone(),
            link_type: "notes".into(),
            tag: "draft".into(),
        });

        assert_eq!(chain.links(&base, "notes", None), vec![one.clone(), two.clone()]);
        assert_eq!(chain.links(&base, "notes", Some("")), vec![one]);
        assert!(chain.links(&base, "other", None).is_empty());
    }
}

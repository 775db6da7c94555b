//! Application entries as committed by zome code.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::address::Address;

/// An entry on a source chain.
///
/// Serialises as `{"App": [entry_type, json_string]}` where the second
/// element is the entry's data already rendered to a JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entry {
    App(String, String),
}

impl Entry {
    /// Build an app entry from any serialisable value.
    pub fn app<T: Serialize + ?Sized>(
        entry_type: impl Into<String>,
        value: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Entry::App(entry_type.into(), serde_json::to_string(value)?))
    }

    pub fn entry_type(&self) -> &str {
        match self {
            Entry::App(entry_type, _) => entry_type,
        }
    }

    /// The JSON string carried by the entry
    pub fn content(&self) -> &str {
        match self {
            Entry::App(_, content) => content,
        }
    }

    /// Content address of this entry.
    ///
    /// The type name takes part in the hash so that equal data under two
    /// entry types lands at two addresses.
    pub fn address(&self) -> Address {
        let mut bytes = Vec::with_capacity(self.entry_type().len() + 1 + self.content().len());
        bytes.extend_from_slice(self.entry_type().as_bytes());
        bytes.push(0);
        bytes.extend_from_slice(self.content().as_bytes());
        Address::from_content(&bytes)
    }

    /// Decode the entry data into a typed value.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(self.content())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Note {
        content: String,
    }

    #[test]
    fn test_app_entry_wire_shape() {
        let entry = Entry::app(
            "my_entry",
            &Note {
                content: "sample content".into(),
            },
        )
        .unwrap();

        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({"App": ["my_entry", "{\"content\":\"sample content\"}"]})
        );
    }

    #[test]
    fn test_decode() {
        let entry = Entry::App("my_entry".into(), r#"{"content":"hi"}"#.into());
        let note: Note = entry.decode().unwrap();
        assert_eq!(note.content, "hi");
    }

    #[test]
    fn test_entry_type_participates_in_address() {
        let a = Entry::app("user", &"x").unwrap();
        let b = Entry::app("commitment", &"x").unwrap();
        assert_ne!(a.address(), b.address());
        assert_eq!(a.address(), Entry::app("user", &"x").unwrap().address());
    }
}

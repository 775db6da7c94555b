//! Content addresses.
//!
//! An address is a base58-encoded SHA-256 multihash (`Qm…`, 46 characters).
//! Identical content always yields the identical address, which is what makes
//! re-running a scenario on fresh instances reproducible.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CoreError;

/// Multihash code for SHA2-256
const SHA2_256_CODE: u8 = 0x12;
/// Digest length in bytes
const SHA2_256_LEN: u8 = 0x20;

/// Length of the rendered base58 form
pub const ADDRESS_LEN: usize = 46;

/// A content address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Hash arbitrary bytes into an address.
    pub fn from_content(content: &[u8]) -> Self {
        let digest = Sha256::digest(content);

        let mut multihash = Vec::with_capacity(2 + digest.len());
        multihash.push(SHA2_256_CODE);
        multihash.push(SHA2_256_LEN);
        multihash.extend_from_slice(&digest);

        Self(bs58::encode(multihash).into_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|_| CoreError::InvalidAddress(s.to_string()))?;

        let well_formed = bytes.len() == 2 + SHA2_256_LEN as usize
            && bytes[0] == SHA2_256_CODE
            && bytes[1] == SHA2_256_LEN;

        if !well_formed {
            return Err(CoreError::InvalidAddress(s.to_string()));
        }

        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for Address {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

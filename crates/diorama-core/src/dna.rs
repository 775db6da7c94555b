//! DNA definitions and application references.
//!
//! A DNA file is the serialized application definition an instance runs.
//! Only the parts the conductor needs are modelled: zomes, their entry
//! types with link declarations, and their function declarations. Zome code
//! itself is supplied natively through [`crate::zome::ZomeRegistry`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::address::Address;
use crate::error::ResolutionError;

/// Parsed DNA file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnaFile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub properties: Value,
    #[serde(default)]
    pub zomes: BTreeMap<String, ZomeDef>,
}

impl DnaFile {
    pub fn zome(&self, name: &str) -> Option<&ZomeDef> {
        self.zomes.get(name)
    }
}

/// One zome of a DNA
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ZomeDef {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub entry_types: BTreeMap<String, EntryTypeDef>,
    #[serde(default)]
    pub fn_declarations: Vec<FnDeclaration>,
    #[serde(default)]
    pub traits: BTreeMap<String, TraitDef>,
}

impl ZomeDef {
    pub fn function(&self, name: &str) -> Option<&FnDeclaration> {
        self.fn_declarations.iter().find(|f| f.name == name)
    }

    pub fn entry_type(&self, name: &str) -> Option<&EntryTypeDef> {
        self.entry_types.get(name)
    }

    /// Whether `base_type` declares a link of `link_type` pointing at `target_type`
    pub fn allows_link(&self, base_type: &str, link_type: &str, target_type: &str) -> bool {
        self.entry_type(base_type)
            .map(|def| {
                def.links_to
                    .iter()
                    .any(|l| l.link_type == link_type && l.target_type == target_type)
            })
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntryTypeDef {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sharing: Sharing,
    #[serde(default)]
    pub links_to: Vec<LinkDef>,
}

/// Whether an entry is published to the DHT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sharing {
    #[default]
    Public,
    Private,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkDef {
    pub target_type: String,
    pub link_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FnDeclaration {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<FnParam>,
    #[serde(default)]
    pub outputs: Vec<FnParam>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FnParam {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TraitDef {
    #[serde(default)]
    pub functions: Vec<String>,
}

/// Opaque, cheaply clonable reference to a resolved DNA.
#[derive(Debug, Clone)]
pub struct DnaRef(Arc<DnaInner>);

#[derive(Debug)]
struct DnaInner {
    id: String,
    path: Option<PathBuf>,
    file: DnaFile,
    hash: Address,
}

impl DnaRef {
    /// Resolve a DNA file on disk.
    ///
    /// Fails if the path does not exist, cannot be read, or does not parse.
    pub fn load(path: impl AsRef<Path>, id: impl Into<String>) -> Result<Self, ResolutionError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ResolutionError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let bytes = std::fs::read(path).map_err(|source| ResolutionError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: DnaFile =
            serde_json::from_slice(&bytes).map_err(|source| ResolutionError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let dna = Self(Arc::new(DnaInner {
            id: id.into(),
            path: Some(path.to_path_buf()),
            file,
            hash: Address::from_content(&bytes),
        }));

        tracing::debug!(
            dna = %dna.id(),
            path = %path.display(),
            hash = %dna.hash(),
            zomes = dna.file().zomes.len(),
            "Resolved DNA"
        );

        Ok(dna)
    }

    /// Wrap an in-memory definition.
    pub fn from_file(id: impl Into<String>, file: DnaFile) -> Result<Self, serde_json::Error> {
        let bytes = serde_json::to_vec(&file)?;
        Ok(Self(Arc::new(DnaInner {
            id: id.into(),
            path: None,
            file,
            hash: Address::from_content(&bytes),
        })))
    }

    /// Name this reference was resolved under
    pub fn id(&self) -> &str {
        &self.0.id
    }

    pub fn path(&self) -> Option<&Path> {
        self.0.path.as_deref()
    }

    pub fn file(&self) -> &DnaFile {
        &self.0.file
    }

    /// Hash of the definition; instances with equal hashes share a network.
    pub fn hash(&self) -> &Address {
        &self.0.hash
    }
}

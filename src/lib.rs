//! `my_first_app` scenario suite
//!
//! The native `my_zome` implementation and the scenarios that exercise it.

pub mod scenarios;
pub mod zome;

use std::path::Path;

use diorama_core::ZomeRegistry;
use diorama_scenarios::{Diorama, DioramaConfig};

pub use zome::MyZome;

/// DNA id the instances are registered under
pub const DNA_ID: &str = "my_first_app";

/// Default location of the DNA file, relative to the crate root
pub const DEFAULT_DNA_PATH: &str = "dist/my_first_app.dna.json";

/// Zomes this app provides natively
pub fn zomes() -> ZomeRegistry {
    ZomeRegistry::new().with(MyZome)
}

/// `alice` and `bob`, both running the DNA at `dna_path`.
pub fn config(dna_path: impl AsRef<Path>) -> DioramaConfig {
    let dna = Diorama::dna(dna_path.as_ref(), DNA_ID);
    DioramaConfig::new()
        .instance("alice", dna.clone())
        .instance("bob", dna)
        .zomes(zomes())
}

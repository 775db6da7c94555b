//! Diorama Core Library
//!
//! In-process conductor for scenario tests: resolves DNA files, starts named
//! instances, dispatches zome calls to native zome implementations and
//! returns every outcome in the `{"Ok": …}` / `{"Err": …}` call envelope.
//!
//! ## Quick Start
//!
//! ```ignore
//! use diorama_core::{Conductor, ConductorOptions, DnaRef, ZomeRegistry};
//!
//! let dna = DnaRef::load("dist/my_first_app.dna.json", "my_first_app")?;
//! let zomes = ZomeRegistry::new().with(MyZome);
//! let conductor = Conductor::start(
//!     [("alice".to_string(), dna.clone()), ("bob".to_string(), dna)],
//!     &zomes,
//!     &ConductorOptions::default(),
//! )?;
//!
//! let alice = conductor.instance("alice").unwrap();
//! let result = alice
//!     .call("my_zome", "create_my_entry", json!({"entry": {"content": "hi"}}))
//!     .await;
//! ```

pub mod address;
pub mod chain;
pub mod conductor;
pub mod dna;
pub mod entry;
pub mod envelope;
pub mod error;
pub mod logging;
pub mod network;
pub mod zome;

// Re-exports
pub use address::Address;
pub use chain::{Link, SourceChain};
pub use conductor::{Conductor, ConductorOptions, InstanceHandle};
pub use dna::{DnaFile, DnaRef, ZomeDef};
pub use entry::Entry;
pub use envelope::{CallResult, ZomeApiError, ZomeApiResult};
pub use error::{CoreError, CoreResult, ResolutionError};
pub use network::Network;
pub use zome::{parse_input, to_output, Zome, ZomeApi, ZomeRegistry};

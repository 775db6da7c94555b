//! JSONL run logs.
//!
//! Every `run()` gets an identifier; all events of that run go to one
//! append-only file and a metadata file records what was run:
//!
//! ```text
//! logs/
//! ├── raw/
//! │   └── 2026-10-19_01JAB3….jsonl
//! └── sessions/
//!     └── 01JAB3….json
//! ```
//!
//! ```ignore
//! use diorama_core::logging::JsonlLayer;
//! use tracing_subscriber::prelude::*;
//!
//! let layer = JsonlLayer::new("./logs", run_id)?;
//! tracing_subscriber::registry()
//!     .with(layer)
//!     .with(tracing_subscriber::fmt::layer())
//!     .init();
//! ```
//!
//! Records are plain JSON lines, so `jq 'select(.scenario != null)'` pulls
//! out everything that happened inside scenarios.

pub mod entry;
pub mod layer;
pub mod writer;

pub use entry::{LogRecord, RunMetadata};
pub use layer::{JsonlLayer, SCENARIO_FIELD, SCENARIO_SPAN};
pub use writer::{read_run_records, write_run_metadata, RunLogWriter};

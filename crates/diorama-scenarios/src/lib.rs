//! Diorama Scenario Runner
//!
//! Drives named conductor instances through async scenario handlers and
//! reports every assertion.
//!
//! ```ignore
//! use diorama_scenarios::{Diorama, DioramaConfig};
//! use serde_json::json;
//!
//! let config = DioramaConfig::new()
//!     .instance("alice", Diorama::dna("dist/my_first_app.dna.json", "my_first_app"))
//!     .zomes(zomes);
//! let mut diorama = Diorama::new(config)?;
//!
//! diorama.register_scenario("round trip", |_s, t, instances| async move {
//!     let alice = instances.get("alice")?;
//!     let address = alice
//!         .call("my_zome", "create_my_entry", json!({"entry": {"content": "hi"}}))
//!         .await
//!         .into_result()?;
//!     let entry = alice.call("my_zome", "get_my_entry", json!({"address": address})).await;
//!     t.call_ok(&entry, "entry is readable");
//!     Ok(())
//! });
//!
//! let report = diorama.run().await;
//! println!("{}", report.to_tap());
//! std::process::exit(report.exit_code().into());
//! ```

pub mod api;
pub mod assert;
pub mod config;
pub mod error;
pub mod instance;
pub mod middleware;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod sink;

// Re-exports
pub use api::ScenarioApi;
pub use assert::{Assert, AssertionRecord};
pub use config::{BridgeConfig, DioramaConfig, DnaSpec, ExecutorPolicy, DEFAULT_SCENARIO_TIMEOUT};
pub use error::{ConfigError, ConfigResult, ScenarioError};
pub use instance::{Instances, ScenarioInstance};
pub use middleware::{CallContext, CallLogMiddleware, JsonlCallLog, Middleware};
pub use report::{Counts, Outcome, RunReport, ScenarioReport};
pub use runner::Diorama;
pub use scenario::{Scenario, ScenarioFn, ScenarioFuture};
pub use sink::{ErrorSink, Rejection};

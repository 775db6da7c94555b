//! Run configuration.

use std::path::PathBuf;
use std::time::Duration;

use diorama_core::{DnaRef, ResolutionError, ZomeRegistry};

/// Default per-scenario time budget
pub const DEFAULT_SCENARIO_TIMEOUT: Duration = Duration::from_secs(60);

/// How an instance's DNA is specified: a file still to be resolved, or an
/// already resolved reference.
#[derive(Debug, Clone)]
pub enum DnaSpec {
    Path { path: PathBuf, id: String },
    Resolved(DnaRef),
}

impl DnaSpec {
    pub fn path(path: impl Into<PathBuf>, id: impl Into<String>) -> Self {
        DnaSpec::Path {
            path: path.into(),
            id: id.into(),
        }
    }

    pub fn resolve(&self) -> Result<DnaRef, ResolutionError> {
        match self {
            DnaSpec::Path { path, id } => DnaRef::load(path, id.clone()),
            DnaSpec::Resolved(dna) => Ok(dna.clone()),
        }
    }
}

impl From<DnaRef> for DnaSpec {
    fn from(dna: DnaRef) -> Self {
        DnaSpec::Resolved(dna)
    }
}

/// Declared cross-instance integration point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    pub handle: String,
    pub caller_id: String,
    pub callee_id: String,
}

/// Whether scenarios run one after another or all at once.
///
/// Every scenario gets its own instances either way, so concurrent runs do
/// not share state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutorPolicy {
    #[default]
    Sequential,
    Concurrent,
}

/// Everything needed to build a [`crate::Diorama`]
#[derive(Debug, Clone)]
pub struct DioramaConfig {
    /// Instance name → DNA, in declaration order
    pub instances: Vec<(String, DnaSpec)>,
    pub bridges: Vec<BridgeConfig>,
    /// Log every zome call and its result at debug level
    pub debug_log: bool,
    pub executor: ExecutorPolicy,
    pub scenario_timeout: Duration,
    /// Delay before a publish becomes visible to other instances
    pub gossip_delay: Duration,
    pub zomes: ZomeRegistry,
    /// Write every zome call as a JSONL record under this directory
    pub call_log_dir: Option<PathBuf>,
}

impl Default for DioramaConfig {
    fn default() -> Self {
        Self {
            instances: Vec::new(),
            bridges: Vec::new(),
            debug_log: false,
            executor: ExecutorPolicy::default(),
            scenario_timeout: DEFAULT_SCENARIO_TIMEOUT,
            gossip_delay: Duration::ZERO,
            zomes: ZomeRegistry::new(),
            call_log_dir: None,
        }
    }
}

impl DioramaConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instance(mut self, name: impl Into<String>, dna: impl Into<DnaSpec>) -> Self {
        self.instances.push((name.into(), dna.into()));
        self
    }

    pub fn bridge(
        mut self,
        handle: impl Into<String>,
        caller_id: impl Into<String>,
        callee_id: impl Into<String>,
    ) -> Self {
        self.bridges.push(BridgeConfig {
            handle: handle.into(),
            caller_id: caller_id.into(),
            callee_id: callee_id.into(),
        });
        self
    }

    pub fn debug_log(mut self, enabled: bool) -> Self {
        self.debug_log = enabled;
        self
    }

    pub fn executor(mut self, executor: ExecutorPolicy) -> Self {
        self.executor = executor;
        self
    }

    pub fn scenario_timeout(mut self, timeout: Duration) -> Self {
        self.scenario_timeout = timeout;
        self
    }

    pub fn gossip_delay(mut self, delay: Duration) -> Self {
        self.gossip_delay = delay;
        self
    }

    pub fn zomes(mut self, zomes: ZomeRegistry) -> Self {
        self.zomes = zomes;
        self
    }

    pub fn call_log_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.call_log_dir = dir;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = DioramaConfig::new();
        assert!(config.instances.is_empty());
        assert_eq!(config.executor, ExecutorPolicy::Sequential);
        assert_eq!(config.scenario_timeout, DEFAULT_SCENARIO_TIMEOUT);
        assert!(!config.debug_log);
    }

    #[test]
    fn test_builder_keeps_declaration_order() {
        let config = DioramaConfig::new()
            .instance("bob", DnaSpec::path("app.dna.json", "app"))
            .instance("alice", DnaSpec::path("app.dna.json", "app"))
            .bridge("chat", "alice", "bob");

        let names: Vec<_> = config.instances.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["bob", "alice"]);
        assert_eq!(config.bridges[0].caller_id, "alice");
    }

    #[test]
    fn test_unresolvable_path() {
        let spec = DnaSpec::path("/definitely/not/here.dna.json", "app");
        assert!(matches!(spec.resolve(), Err(ResolutionError::NotFound { .. })));
    }
}

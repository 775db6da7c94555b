//! The scenario runner.
//!
//! A [`Diorama`] is configured once, collects scenarios, and runs them. Each
//! scenario gets a freshly started conductor, so nothing carries over from
//! one scenario to the next and a second `run()` reproduces the first.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use diorama_core::logging::RunLogWriter;
use diorama_core::{Conductor, ConductorOptions, CoreError, DnaRef, ZomeRegistry};
use futures::future::join_all;
use tracing::Instrument;

use crate::api::ScenarioApi;
use crate::assert::Assert;
use crate::config::{BridgeConfig, DioramaConfig, DnaSpec, ExecutorPolicy};
use crate::error::{ConfigError, ConfigResult, ScenarioError};
use crate::instance::{Instances, MiddlewareChain, ScenarioInstance};
use crate::middleware::{CallLogMiddleware, JsonlCallLog, Middleware};
use crate::report::{Outcome, RunReport, ScenarioReport};
use crate::scenario::Scenario;
use crate::sink::{join_error_message, ErrorSink};

pub struct Diorama {
    instances: Vec<(String, DnaRef)>,
    bridges: Vec<BridgeConfig>,
    zomes: ZomeRegistry,
    options: ConductorOptions,
    executor: ExecutorPolicy,
    timeout: Duration,
    call_log_dir: Option<PathBuf>,
    middleware: Vec<Arc<dyn Middleware>>,
    scenarios: Vec<Scenario>,
    sink: ErrorSink,
}

impl Diorama {
    /// Shorthand for [`DnaSpec::path`]
    pub fn dna(path: impl Into<PathBuf>, id: impl Into<String>) -> DnaSpec {
        DnaSpec::path(path, id)
    }

    /// Validate the configuration and resolve every DNA.
    ///
    /// Fails without retrying on the first problem found.
    pub fn new(config: DioramaConfig) -> ConfigResult<Self> {
        if config.instances.is_empty() {
            return Err(ConfigError::NoInstances);
        }
        if config.scenario_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }

        let mut resolved: HashMap<(PathBuf, String), DnaRef> = HashMap::new();
        let mut instances: Vec<(String, DnaRef)> = Vec::with_capacity(config.instances.len());

        for (name, spec) in &config.instances {
            if instances.iter().any(|(existing, _)| existing == name) {
                return Err(CoreError::DuplicateInstance(name.clone()).into());
            }

            let dna = match spec {
                DnaSpec::Path { path, id } => {
                    let key = (path.clone(), id.clone());
                    match resolved.get(&key) {
                        Some(dna) => dna.clone(),
                        None => {
                            let dna = spec.resolve()?;
                            resolved.insert(key, dna.clone());
                            dna
                        }
                    }
                }
                DnaSpec::Resolved(dna) => dna.clone(),
            };

            config.zomes.check_dna(&dna)?;
            tracing::debug!(instance = %name, dna = %dna.id(), hash = %dna.hash(), "Resolved DNA");
            instances.push((name.clone(), dna));
        }

        for bridge in &config.bridges {
            for end in [&bridge.caller_id, &bridge.callee_id] {
                if !instances.iter().any(|(name, _)| name == end) {
                    return Err(ConfigError::UnknownBridgeInstance {
                        handle: bridge.handle.clone(),
                        instance: end.clone(),
                    });
                }
            }
        }

        tracing::info!(
            instances = instances.len(),
            bridges = config.bridges.len(),
            executor = ?config.executor,
            "Diorama configured"
        );

        Ok(Self {
            instances,
            bridges: config.bridges,
            zomes: config.zomes,
            options: ConductorOptions {
                gossip_delay: config.gossip_delay,
            },
            executor: config.executor,
            timeout: config.scenario_timeout,
            call_log_dir: config.call_log_dir,
            middleware: vec![Arc::new(CallLogMiddleware::new(config.debug_log)) as Arc<dyn Middleware>],
            scenarios: Vec::new(),
            sink: ErrorSink::new(),
        })
    }

    pub fn with_middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.add_middleware(middleware);
        self
    }

    pub fn add_middleware(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Queue a scenario. Nothing runs until [`Diorama::run`].
    pub fn register_scenario<F, Fut>(&mut self, description: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(ScenarioApi, Assert, Instances) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.scenarios.push(Scenario::new(description, handler));
        self
    }

    /// Queue a scenario and run it exclusively: once any scenario is
    /// marked, unmarked ones are skipped.
    pub fn register_scenario_only<F, Fut>(&mut self, description: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(ScenarioApi, Assert, Instances) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let mut scenario = Scenario::new(description, handler);
        scenario.only = true;
        self.scenarios.push(scenario);
        self
    }

    /// Mark every scenario whose description contains `pattern` as
    /// exclusive. Returns how many matched.
    pub fn focus(&mut self, pattern: &str) -> usize {
        let mut matched = 0;
        for scenario in &mut self.scenarios {
            if scenario.description.contains(pattern) {
                scenario.only = true;
                matched += 1;
            }
        }
        matched
    }

    pub fn scenario_descriptions(&self) -> Vec<&str> {
        self.scenarios.iter().map(|s| s.description.as_str()).collect()
    }

    pub fn instance_names(&self) -> Vec<&str> {
        self.instances.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn bridges(&self) -> &[BridgeConfig] {
        &self.bridges
    }

    pub fn error_sink(&self) -> &ErrorSink {
        &self.sink
    }

    /// Run every queued scenario under a fresh run id.
    pub async fn run(&self) -> RunReport {
        self.run_with_id(ulid::Ulid::new().to_string()).await
    }

    /// Run every queued scenario, in registration order.
    pub async fn run_with_id(&self, run_id: impl Into<String>) -> RunReport {
        let run_id = run_id.into();
        tracing::info!(run = %run_id, scenarios = self.scenarios.len(), "Starting run");

        self.sink.install();
        let chain = self.middleware_chain(&run_id);
        let exclusive = self.scenarios.iter().any(|s| s.only);

        let mut scenarios = match self.executor {
            ExecutorPolicy::Sequential => {
                let mut reports = Vec::with_capacity(self.scenarios.len());
                for (index, scenario) in self.scenarios.iter().enumerate() {
                    reports.push(self.run_or_skip(index, scenario, exclusive, &chain).await);
                }
                reports
            }
            ExecutorPolicy::Concurrent => {
                join_all(
                    self.scenarios
                        .iter()
                        .enumerate()
                        .map(|(index, scenario)| self.run_or_skip(index, scenario, exclusive, &chain)),
                )
                .await
            }
        };

        let mut unattributed = Vec::new();
        for rejection in self.sink.drain() {
            match rejection
                .scenario
                .and_then(|index| scenarios.get_mut(index))
                .filter(|report| report.outcome != Outcome::Skipped)
            {
                Some(report) => report.errors.push(rejection.error),
                None => unattributed.push(rejection),
            }
        }

        for report in &mut scenarios {
            report.finish();
            match report.outcome {
                Outcome::Passed => tracing::info!(
                    scenario = %report.description,
                    assertions = report.assertions.len(),
                    duration_ms = report.duration_ms,
                    "Scenario passed"
                ),
                Outcome::Failed => tracing::warn!(
                    scenario = %report.description,
                    failed_assertions = report.failed_assertions(),
                    errors = report.errors.len(),
                    "Scenario failed"
                ),
                Outcome::Skipped => tracing::info!(scenario = %report.description, "Scenario skipped"),
            }
        }

        let report = RunReport {
            run_id,
            scenarios,
            unattributed,
        };
        let counts = report.counts();
        tracing::info!(
            run = %report.run_id,
            tests = counts.tests,
            pass = counts.pass,
            fail = counts.fail,
            "Run finished"
        );
        report
    }

    fn middleware_chain(&self, run_id: &str) -> MiddlewareChain {
        let mut chain = self.middleware.clone();
        if let Some(dir) = &self.call_log_dir {
            match RunLogWriter::new(dir, format!("{}-calls", run_id)) {
                Ok(writer) => {
                    tracing::debug!(path = %writer.path().display(), "Writing call log");
                    chain.push(Arc::new(JsonlCallLog::new(writer)));
                }
                Err(e) => tracing::warn!(dir = %dir.display(), error = %e, "Failed to open call log"),
            }
        }
        chain.into()
    }

    async fn run_or_skip(
        &self,
        index: usize,
        scenario: &Scenario,
        exclusive: bool,
        chain: &MiddlewareChain,
    ) -> ScenarioReport {
        if exclusive && !scenario.only {
            return ScenarioReport::skipped(index, scenario.description.clone());
        }
        let span = tracing::info_span!("scenario", description = %scenario.description, index);
        self.run_scenario(index, scenario, chain.clone())
            .instrument(span)
            .await
    }

    async fn run_scenario(&self, index: usize, scenario: &Scenario, chain: MiddlewareChain) -> ScenarioReport {
        let description: Arc<str> = Arc::from(scenario.description.as_str());
        let started = Instant::now();
        tracing::info!("Starting scenario");

        let mut report = ScenarioReport {
            index,
            description: scenario.description.clone(),
            outcome: Outcome::Passed,
            assertions: Vec::new(),
            errors: Vec::new(),
            duration_ms: 0,
        };

        let conductor = match Conductor::start(self.instances.iter().cloned(), &self.zomes, &self.options) {
            Ok(conductor) => Arc::new(conductor),
            Err(e) => {
                self.sink
                    .report_scenario(index, &description, ScenarioError::Startup(e).to_string());
                report.duration_ms = started.elapsed().as_millis() as u64;
                return report;
            }
        };

        let api = ScenarioApi::new(index, description.clone(), conductor.clone(), self.sink.clone());
        let assert = Assert::new();
        let instances = Instances::new(
            conductor
                .instances()
                .map(|handle| ScenarioInstance::new(handle.clone(), description.clone(), chain.clone())),
        );

        let task = tokio::spawn(
            scenario
                .invoke(api.clone(), assert.clone(), instances)
                .instrument(tracing::Span::current()),
        );
        let abort = task.abort_handle();

        let mut timed_out = false;
        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => self.sink.report_scenario(index, &description, format!("{:#}", e)),
            Ok(Err(e)) => self.sink.report_scenario(
                index,
                &description,
                ScenarioError::Panicked(join_error_message(e)).to_string(),
            ),
            Err(_) => {
                abort.abort();
                timed_out = true;
            }
        }

        if !timed_out {
            let remaining = self.timeout.saturating_sub(started.elapsed());
            timed_out = tokio::time::timeout(remaining, api.join_spawned()).await.is_err();
        }
        if timed_out {
            api.abort_spawned();
            self.sink
                .report_scenario(index, &description, ScenarioError::TimedOut(self.timeout).to_string());
        }

        conductor.shutdown();

        report.assertions = assert.records();
        report.duration_ms = started.elapsed().as_millis() as u64;
        report
    }
}

impl std::fmt::Debug for Diorama {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diorama")
            .field("instances", &self.instance_names())
            .field("scenarios", &self.scenario_descriptions())
            .field("executor", &self.executor)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diorama_core::dna::{DnaFile, FnDeclaration, ZomeDef};
    use diorama_core::{Zome, ZomeApi, ZomeApiError, ZomeApiResult};
    use serde_json::{json, Value};

    struct Echo;

    impl Zome for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn call(&self, _api: &ZomeApi<'_>, function: &str, payload: Value) -> ZomeApiResult<Value> {
            match function {
                "echo" => Ok(payload),
                other => Err(ZomeApiError::FunctionNotImplemented(other.to_string())),
            }
        }
    }

    fn echo_dna() -> DnaRef {
        let mut zome = ZomeDef::default();
        zome.fn_declarations.push(FnDeclaration {
            name: "echo".into(),
            inputs: vec![],
            outputs: vec![],
        });
        let mut file = DnaFile {
            name: "echo".into(),
            description: String::new(),
            version: String::new(),
            uuid: String::new(),
            properties: Value::Null,
            zomes: Default::default(),
        };
        file.zomes.insert("echo".into(), zome);
        DnaRef::from_file("echo", file).unwrap()
    }

    fn config() -> DioramaConfig {
        DioramaConfig::new()
            .instance("alice", echo_dna())
            .zomes(ZomeRegistry::new().with(Echo))
    }

    #[test]
    fn test_new_rejects_empty_instances() {
        let err = Diorama::new(DioramaConfig::new()).unwrap_err();
        assert!(matches!(err, ConfigError::NoInstances));
    }

    #[test]
    fn test_new_rejects_missing_zome() {
        let err = Diorama::new(DioramaConfig::new().instance("alice", echo_dna())).unwrap_err();
        assert!(matches!(err, ConfigError::Core(CoreError::ZomeNotRegistered { .. })));
    }

    #[test]
    fn test_new_rejects_unknown_bridge_end() {
        let err = Diorama::new(config().bridge("chat", "alice", "carol")).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnknownBridgeInstance { ref instance, .. } if instance == "carol"
        ));
    }

    #[test]
    fn test_new_rejects_duplicate_instance() {
        let err = Diorama::new(config().instance("alice", echo_dna())).unwrap_err();
        assert!(matches!(err, ConfigError::Core(CoreError::DuplicateInstance(_))));
    }

    #[test]
    fn test_registration_has_no_side_effects() {
        let mut diorama = Diorama::new(config()).unwrap();
        diorama.register_scenario("a", |_s, _t, _i| async { Err::<(), _>(anyhow::anyhow!("must not run")) });
        assert_eq!(diorama.scenario_descriptions(), vec!["a"]);
        assert!(!diorama.error_sink().is_installed());
    }

    #[tokio::test]
    async fn test_handler_error_fails_only_its_scenario() {
        let mut diorama = Diorama::new(config()).unwrap();
        diorama.register_scenario("fails", |_s, _t, _i| async { Err::<(), _>(anyhow::anyhow!("nope")) });
        diorama.register_scenario("passes", |_s, t, instances| async move {
            let alice = instances.get("alice")?;
            let result = alice.call("echo", "echo", json!({"x": 1})).await;
            t.deep_equal(&result, &json!({"Ok": {"x": 1}}), "echo returns its input");
            Ok(())
        });

        let report = diorama.run().await;
        assert_eq!(report.scenarios[0].outcome, Outcome::Failed);
        assert_eq!(report.scenarios[0].errors, vec!["nope".to_string()]);
        assert_eq!(report.scenarios[1].outcome, Outcome::Passed);
        assert_eq!(report.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_focus_skips_the_rest() {
        let mut diorama = Diorama::new(config()).unwrap();
        diorama.register_scenario("first", |_s, t, _i| async move {
            t.pass("ran");
            Ok(())
        });
        diorama.register_scenario("second", |_s, _t, _i| async {
            Err::<(), _>(anyhow::anyhow!("should be skipped"))
        });
        assert_eq!(diorama.focus("first"), 1);

        let report = diorama.run().await;
        assert_eq!(report.scenarios[0].outcome, Outcome::Passed);
        assert_eq!(report.scenarios[1].outcome, Outcome::Skipped);
        assert!(report.success());
    }

    #[tokio::test]
    async fn test_unknown_instance_is_scenario_error() {
        let mut diorama = Diorama::new(config()).unwrap();
        diorama.register_scenario("carol", |_s, _t, instances| async move {
            instances.get("carol")?;
            Ok(())
        });

        let report = diorama.run().await;
        assert_eq!(
            report.scenarios[0].errors,
            vec!["No instance named 'carol' in this scenario".to_string()]
        );
    }
}

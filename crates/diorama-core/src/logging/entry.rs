//! Record types for JSONL run logs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One line of a run log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// RFC 3339 timestamp with milliseconds
    pub ts: String,

    /// trace, debug, info, warn or error
    pub level: String,

    /// Run identifier shared by every record of one `run()`
    pub run: String,

    /// Module path the event came from
    pub target: String,

    pub msg: String,

    /// Scenario description, when the event happened inside one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Value>,

    /// Enclosing span names, outermost first, joined with " > "
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<String>,
}

impl LogRecord {
    pub fn new(
        level: impl Into<String>,
        run: impl Into<String>,
        target: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self {
            ts: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            level: level.into(),
            run: run.into(),
            target: target.into(),
            msg: msg.into(),
            scenario: None,
            fields: None,
            span: None,
        }
    }

    pub fn with_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.scenario = Some(scenario.into());
        self
    }

    pub fn with_fields(mut self, fields: Value) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn with_span(mut self, span: impl Into<String>) -> Self {
        self.span = Some(span.into());
        self
    }

    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// Written once per run next to the raw logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: String,
    pub started_at: String,
    /// Scenario descriptions in registration order
    pub scenarios: Vec<String>,
    /// Configured instance names
    pub instances: Vec<String>,
    pub cwd: Option<String>,
}

impl RunMetadata {
    pub fn new(run_id: impl Into<String>, scenarios: Vec<String>, instances: Vec<String>) -> Self {
        Self {
            run_id: run_id.into(),
            started_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            scenarios,
            instances,
            cwd: std::env::current_dir()
                .ok()
                .map(|p| p.display().to_string()),
        }
    }
}

//! `tracing` layer writing events to a run's JSONL log.
//!
//! Span fields are captured when spans open, so events emitted inside a
//! `scenario` span carry that scenario's `description`.

use std::fmt::Write as FmtWrite;
use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::span::Attributes;
use tracing::{Event, Id, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use super::entry::LogRecord;
use super::writer::RunLogWriter;

/// Name of the span the runner opens around each scenario
pub const SCENARIO_SPAN: &str = "scenario";
/// Field of [`SCENARIO_SPAN`] holding the description
pub const SCENARIO_FIELD: &str = "description";

/// Writes every event it sees to one run log.
pub struct JsonlLayer {
    writer: Arc<RunLogWriter>,
}

impl JsonlLayer {
    pub fn new(logs_dir: impl AsRef<Path>, run: impl Into<String>) -> std::io::Result<Self> {
        Ok(Self {
            writer: Arc::new(RunLogWriter::new(logs_dir, run)?),
        })
    }

    pub fn log_path(&self) -> &Path {
        self.writer.path()
    }

    pub fn run(&self) -> &str {
        self.writer.run()
    }
}

/// Fields recorded when a span was created
struct SpanFields(Map<String, Value>);

impl<S> Layer<S> for JsonlLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = JsonVisitor::default();
        attrs.record(&mut visitor);
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(SpanFields(visitor.fields));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();

        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);

        let mut record = LogRecord::new(
            metadata.level().as_str().to_lowercase(),
            self.writer.run(),
            metadata.target(),
            visitor.message.unwrap_or_default(),
        );
        if !visitor.fields.is_empty() {
            record = record.with_fields(Value::Object(visitor.fields));
        }

        if let Some(scope) = ctx.event_scope(event) {
            let mut names = Vec::new();
            for span in scope.from_root() {
                names.push(span.name().to_string());
                if span.name() == SCENARIO_SPAN {
                    let description = span
                        .extensions()
                        .get::<SpanFields>()
                        .and_then(|f| f.0.get(SCENARIO_FIELD).cloned());
                    if let Some(Value::String(description)) = description {
                        record = record.with_scenario(description);
                    }
                }
            }
            if !names.is_empty() {
                record = record.with_span(names.join(" > "));
            }
        }

        // A failing log write must not take the run down with it.
        let _ = self.writer.write(&record);
    }
}

#[derive(Default)]
struct JsonVisitor {
    message: Option<String>,
    fields: Map<String, Value>,
}

impl JsonVisitor {
    fn put(&mut self, field: &Field, value: Value) {
        if field.name() == "message" {
            let text = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            self.message = Some(text);
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for JsonVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let mut buf = String::new();
        let _ = write!(&mut buf, "{:?}", value);
        self.put(field, Value::String(buf));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, Value::String(value.to_string()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, Value::Number(value.into()));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, Value::Number(value.into()));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, Value::Bool(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        if let Some(n) = serde_json::Number::from_f64(value) {
            self.put(field, Value::Number(n));
        }
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.put(field, Value::String(value.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::writer::read_run_records;
    use tempfile::TempDir;
    use tracing_subscriber::prelude::*;

    #[test]
    fn test_layer_captures_events_and_scenario() {
        let temp = TempDir::new().unwrap();
        let logs_dir = temp.path().join("logs");

        let layer = JsonlLayer::new(&logs_dir, "01RUN").unwrap();
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("outside");
            let span = tracing::info_span!("scenario", description = "round trip");
            let _guard = span.enter();
            tracing::warn!(count = 42, "inside");
        });

        let records = read_run_records(&logs_dir, "01RUN").unwrap();
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].msg, "outside");
        assert!(records[0].scenario.is_none());

        assert_eq!(records[1].level, "warn");
        assert_eq!(records[1].scenario.as_deref(), Some("round trip"));
        assert_eq!(records[1].span.as_deref(), Some("scenario"));
        assert_eq!(
            records[1].fields.as_ref().and_then(|f| f.get("count")).cloned(),
            Some(serde_json::json!(42))
        );
    }
}

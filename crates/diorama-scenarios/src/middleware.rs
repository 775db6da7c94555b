//! Hooks wrapped around every zome call made from a scenario.

use std::time::Duration;

use diorama_core::logging::{LogRecord, RunLogWriter};
use diorama_core::CallResult;
use serde_json::{json, Value};

/// Identifies one call
#[derive(Debug, Clone, Copy)]
pub struct CallContext<'a> {
    pub scenario: &'a str,
    pub instance: &'a str,
    pub zome: &'a str,
    pub function: &'a str,
}

/// Observes, and may rewrite the payload of, zome calls.
///
/// Middleware runs in registration order before the call and in the same
/// order after it.
pub trait Middleware: Send + Sync {
    fn before_call(&self, _ctx: &CallContext<'_>, _payload: &mut Value) {}

    fn after_call(
        &self,
        _ctx: &CallContext<'_>,
        _payload: &Value,
        _result: &CallResult,
        _elapsed: Duration,
    ) {
    }
}

/// Logs calls and results; at debug level when `debug_log` is on, trace
/// level otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallLogMiddleware {
    debug_log: bool,
}

impl CallLogMiddleware {
    pub fn new(debug_log: bool) -> Self {
        Self { debug_log }
    }
}

impl Middleware for CallLogMiddleware {
    fn before_call(&self, ctx: &CallContext<'_>, payload: &mut Value) {
        if self.debug_log {
            tracing::debug!(
                instance = %ctx.instance,
                zome = %ctx.zome,
                function = %ctx.function,
                payload = %payload,
                "Zome call"
            );
        } else {
            tracing::trace!(
                instance = %ctx.instance,
                zome = %ctx.zome,
                function = %ctx.function,
                "Zome call"
            );
        }
    }

    fn after_call(&self, ctx: &CallContext<'_>, _payload: &Value, result: &CallResult, elapsed: Duration) {
        let elapsed_ms = elapsed.as_millis() as u64;
        if self.debug_log {
            tracing::debug!(
                instance = %ctx.instance,
                function = %ctx.function,
                result = %result,
                elapsed_ms,
                "Zome call returned"
            );
        } else {
            tracing::trace!(
                instance = %ctx.instance,
                function = %ctx.function,
                ok = result.is_ok(),
                elapsed_ms,
                "Zome call returned"
            );
        }
    }
}

/// Appends one JSONL record per completed call.
pub struct JsonlCallLog {
    writer: RunLogWriter,
}

impl JsonlCallLog {
    pub fn new(writer: RunLogWriter) -> Self {
        Self { writer }
    }

    pub fn writer(&self) -> &RunLogWriter {
        &self.writer
    }
}

impl Middleware for JsonlCallLog {
    fn after_call(&self, ctx: &CallContext<'_>, payload: &Value, result: &CallResult, elapsed: Duration) {
        let level = if result.is_ok() { "debug" } else { "warn" };
        let record = LogRecord::new(level, self.writer.run(), "diorama::call", "Zome call")
            .with_scenario(ctx.scenario)
            .with_fields(json!({
                "instance": ctx.instance,
                "zome": ctx.zome,
                "function": ctx.function,
                "payload": payload,
                "result": result.to_value(),
                "elapsed_ms": elapsed.as_millis() as u64,
            }));

        if let Err(e) = self.writer.write(&record) {
            tracing::warn!(path = %self.writer.path().display(), error = %e, "Failed to write call log");
        }
    }
}

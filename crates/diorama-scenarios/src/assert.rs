//! Assertion context handed to scenario handlers.
//!
//! Assertions record their outcome and return it; they never abort the
//! handler. A scenario fails if any of its records failed.

use std::fmt::Debug;
use std::sync::Arc;

use diorama_core::CallResult;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

/// One recorded check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssertionRecord {
    pub ok: bool,
    /// Kind of check, e.g. `deepEqual`
    pub operator: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<Value>,
}

/// Cheap to clone; clones share one record list.
#[derive(Clone, Default)]
pub struct Assert {
    records: Arc<Mutex<Vec<AssertionRecord>>>,
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| format!("<unserializable: {}>", e))
}

impl Assert {
    pub fn new() -> Self {
        Self::default()
    }

    /// Structural equality of the JSON form of both sides.
    pub fn deep_equal<A, E>(&self, actual: &A, expected: &E, message: impl Into<String>) -> bool
    where
        A: Serialize + ?Sized,
        E: Serialize + ?Sized,
    {
        self.compare("deepEqual", actual, expected, message.into(), true)
    }

    pub fn not_deep_equal<A, E>(&self, actual: &A, expected: &E, message: impl Into<String>) -> bool
    where
        A: Serialize + ?Sized,
        E: Serialize + ?Sized,
    {
        self.compare("notDeepEqual", actual, expected, message.into(), false)
    }

    /// `==` on Rust values
    pub fn equal<T: PartialEq + Debug>(&self, actual: T, expected: T, message: impl Into<String>) -> bool {
        let ok = actual == expected;
        self.push(AssertionRecord {
            ok,
            operator: "equal",
            message: message.into(),
            actual: (!ok).then(|| Value::String(format!("{:?}", actual))),
            expected: (!ok).then(|| Value::String(format!("{:?}", expected))),
        })
    }

    pub fn ok(&self, value: bool, message: impl Into<String>) -> bool {
        self.boolean("ok", value, true, message.into())
    }

    pub fn not_ok(&self, value: bool, message: impl Into<String>) -> bool {
        self.boolean("notOk", value, false, message.into())
    }

    pub fn pass(&self, message: impl Into<String>) {
        self.push(AssertionRecord {
            ok: true,
            operator: "pass",
            message: message.into(),
            actual: None,
            expected: None,
        });
    }

    pub fn fail(&self, message: impl Into<String>) {
        self.push(AssertionRecord {
            ok: false,
            operator: "fail",
            message: message.into(),
            actual: None,
            expected: None,
        });
    }

    /// The call came back on the `Ok` branch.
    pub fn call_ok(&self, result: &CallResult, message: impl Into<String>) -> bool {
        self.branch("callOk", result, true, message.into())
    }

    /// The call came back on the `Err` branch.
    pub fn call_err(&self, result: &CallResult, message: impl Into<String>) -> bool {
        self.branch("callErr", result, false, message.into())
    }

    /// Snapshot of everything recorded so far
    pub fn records(&self) -> Vec<AssertionRecord> {
        self.records.lock().clone()
    }

    pub fn passed(&self) -> bool {
        self.records.lock().iter().all(|r| r.ok)
    }

    fn compare<A, E>(
        &self,
        operator: &'static str,
        actual: &A,
        expected: &E,
        message: String,
        want_equal: bool,
    ) -> bool
    where
        A: Serialize + ?Sized,
        E: Serialize + ?Sized,
    {
        let (ok, actual, expected) = match (to_json(actual), to_json(expected)) {
            (Ok(a), Ok(e)) => ((a == e) == want_equal, a, e),
            (a, e) => (
                false,
                a.unwrap_or_else(Value::String),
                e.unwrap_or_else(Value::String),
            ),
        };
        self.push(AssertionRecord {
            ok,
            operator,
            message,
            actual: (!ok).then_some(actual),
            expected: (!ok).then_some(expected),
        })
    }

    fn boolean(&self, operator: &'static str, value: bool, want: bool, message: String) -> bool {
        let ok = value == want;
        self.push(AssertionRecord {
            ok,
            operator,
            message,
            actual: (!ok).then_some(Value::Bool(value)),
            expected: (!ok).then_some(Value::Bool(want)),
        })
    }

    fn branch(&self, operator: &'static str, result: &CallResult, want_ok: bool, message: String) -> bool {
        let ok = result.is_ok() == want_ok;
        let expected = if want_ok { "Ok" } else { "Err" };
        self.push(AssertionRecord {
            ok,
            operator,
            message,
            actual: (!ok).then(|| result.to_value()),
            expected: (!ok).then(|| Value::String(expected.to_string())),
        })
    }

    fn push(&self, record: AssertionRecord) -> bool {
        let ok = record.ok;
        if !ok {
            tracing::warn!(
                operator = record.operator,
                message = %record.message,
                actual = ?record.actual,
                expected = ?record.expected,
                "Assertion failed"
            );
        }
        self.records.lock().push(record);
        ok
    }
}

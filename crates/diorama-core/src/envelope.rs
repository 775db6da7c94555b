//! The call result envelope returned by every zome call.
//!
//! On the wire a result is either `{"Ok": <value>}` or `{"Err": <detail>}`,
//! where `<detail>` is a single-key object naming the error kind, for
//! example `{"Err": {"ValidationFailed": "base for link not found"}}`.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Error branch of the call envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ZomeApiError {
    #[error("Internal error: {0}")]
    Internal(String),

    /// Unknown zome or function
    #[error("Function not implemented: {0}")]
    FunctionNotImplemented(String),

    /// Payload did not match the function's inputs
    #[error("Argument deserialization failed: {0}")]
    ArgumentDeserializationFailed(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Address did not resolve to an entry
    #[error("Hash not found: {0}")]
    HashNotFound(String),
}

impl ZomeApiError {
    /// Name of the variant as it appears on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            ZomeApiError::Internal(_) => "Internal",
            ZomeApiError::FunctionNotImplemented(_) => "FunctionNotImplemented",
            ZomeApiError::ArgumentDeserializationFailed(_) => "ArgumentDeserializationFailed",
            ZomeApiError::ValidationFailed(_) => "ValidationFailed",
            ZomeApiError::HashNotFound(_) => "HashNotFound",
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            ZomeApiError::Internal(d)
            | ZomeApiError::FunctionNotImplemented(d)
            | ZomeApiError::ArgumentDeserializationFailed(d)
            | ZomeApiError::ValidationFailed(d)
            | ZomeApiError::HashNotFound(d) => d,
        }
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert(self.kind().to_string(), Value::String(self.detail().to_string()));
        Value::Object(map)
    }
}

impl From<serde_json::Error> for ZomeApiError {
    fn from(err: serde_json::Error) -> Self {
        ZomeApiError::Internal(err.to_string())
    }
}

/// Result type used by zome code
pub type ZomeApiResult<T> = Result<T, ZomeApiError>;

/// Outcome of a zome call. Exactly one branch is populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CallResult {
    Ok(Value),
    Err(ZomeApiError),
}

impl CallResult {
    pub fn ok(&self) -> Option<&Value> {
        match self {
            CallResult::Ok(value) => Some(value),
            CallResult::Err(_) => None,
        }
    }

    pub fn err(&self) -> Option<&ZomeApiError> {
        match self {
            CallResult::Ok(_) => None,
            CallResult::Err(err) => Some(err),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, CallResult::Ok(_))
    }

    pub fn is_err(&self) -> bool {
        !self.is_ok()
    }

    /// Turn the envelope into a `Result` so callers can use `?`.
    pub fn into_result(self) -> ZomeApiResult<Value> {
        match self {
            CallResult::Ok(value) => Ok(value),
            CallResult::Err(err) => Err(err),
        }
    }

    /// Like [`CallResult::into_result`], decoding the success value.
    pub fn into_result_as<T: DeserializeOwned>(self) -> ZomeApiResult<T> {
        let value = self.into_result()?;
        serde_json::from_value(value).map_err(|e| ZomeApiError::Internal(e.to_string()))
    }

    /// The envelope as a JSON value, in its wire shape.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        match self {
            CallResult::Ok(value) => map.insert("Ok".to_string(), value.clone()),
            CallResult::Err(err) => map.insert("Err".to_string(), err.to_value()),
        };
        Value::Object(map)
    }

    pub fn into_value(self) -> Value {
        match self {
            CallResult::Ok(value) => serde_json::json!({ "Ok": value }),
            CallResult::Err(err) => serde_json::json!({ "Err": err.to_value() }),
        }
    }
}

impl From<ZomeApiResult<Value>> for CallResult {
    fn from(result: ZomeApiResult<Value>) -> Self {
        match result {
            Ok(value) => CallResult::Ok(value),
            Err(err) => CallResult::Err(err),
        }
    }
}

impl fmt::Display for CallResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

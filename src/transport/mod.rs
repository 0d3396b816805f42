//! Transport collaborator seam.
//!
//! The cloud client that fetches snapshots and sends control commands lives
//! outside this crate. Implement [`ThinqTransport`] to connect it; the
//! [`simulated`] transport is an in-memory stand-in for tests and the demo
//! binary.

pub mod simulated;

pub use simulated::{ControlMode, SimulatedTransport};

use crate::device::Snapshot;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Failure reported by the transport collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("request timed out")]
    Timeout,

    #[error("unknown device {0}")]
    UnknownDevice(String),
}

/// A control request for one device.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPayload {
    /// One value at a dot-path (e.g. `airState.operation`). Patched into the
    /// local snapshot when the transport accepts it.
    Value { key: String, value: Value },
    /// Structured multi-field set request. Never patched locally.
    SetList {
        set: Map<String, Value>,
        get: Option<Map<String, Value>>,
    },
}

impl ControlPayload {
    pub fn value(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Value {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Build a set request from a JSON object; other values give an empty set.
    pub fn set_list(set: Value) -> Self {
        let set = match set {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::SetList { set, get: None }
    }

    /// Key/value form, if this is one.
    pub fn as_value(&self) -> Option<(&str, &Value)> {
        match self {
            Self::Value { key, value } => Some((key.as_str(), value)),
            Self::SetList { .. } => None,
        }
    }

    pub fn to_request(&self) -> ControlRequest {
        match self {
            Self::Value { key, value } => ControlRequest {
                data_key: Some(key.clone()),
                data_value: value.clone(),
                data_set_list: None,
                data_get_list: None,
            },
            Self::SetList { set, get } => ControlRequest {
                data_key: None,
                data_value: Value::Null,
                data_set_list: Some(Value::Object(set.clone())),
                data_get_list: get.clone().map(Value::Object),
            },
        }
    }
}

/// Control request body as the cloud client forwards it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlRequest {
    pub data_key: Option<String>,
    pub data_value: Value,
    pub data_set_list: Option<Value>,
    pub data_get_list: Option<Value>,
}

/// Cloud client used by device controllers.
#[async_trait]
pub trait ThinqTransport: Send + Sync {
    /// Latest full snapshot of a device.
    async fn fetch_snapshot(&self, device_id: &str) -> Result<Snapshot, TransportError>;

    /// Send a control request. `Ok(true)` means the cloud accepted it.
    async fn send_control(
        &self,
        device_id: &str,
        payload: &ControlPayload,
    ) -> Result<bool, TransportError>;
}

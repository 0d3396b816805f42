//! In-memory transport.
//!
//! Holds one snapshot per device and applies accepted key/value controls to
//! it, so a following fetch reflects the change like the real cloud would.
//! Every control request is recorded for inspection.

use super::{ControlPayload, ThinqTransport, TransportError};
use crate::device::{Snapshot, patch_snapshot};
use async_trait::async_trait;
use log::{debug, info};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use tokio::time::{Duration, sleep};

/// How the simulated cloud answers control requests.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ControlMode {
    /// Accept and apply
    #[default]
    Accept,
    /// Answer "not accepted" without error
    Reject,
    /// Fail every request
    Fail(TransportError),
}

#[derive(Debug, Default)]
pub struct SimulatedTransport {
    snapshots: RwLock<HashMap<String, Snapshot>>,
    sent: Mutex<Vec<(String, ControlPayload)>>,
    mode: RwLock<ControlMode>,
    latency: Option<Duration>,
}

impl SimulatedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every request by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn insert_device(&self, device_id: impl Into<String>, snapshot: Snapshot) {
        self.snapshots.write().insert(device_id.into(), snapshot);
    }

    /// Change a value as if the appliance had reported it.
    pub fn set_value(&self, device_id: &str, path: &str, value: Value) -> bool {
        match self.snapshots.write().get_mut(device_id) {
            Some(snapshot) => {
                patch_snapshot(snapshot, path, value);
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self, device_id: &str) -> Option<Snapshot> {
        self.snapshots.read().get(device_id).cloned()
    }

    pub fn set_mode(&self, mode: ControlMode) {
        *self.mode.write() = mode;
    }

    /// Control requests received so far, oldest first.
    pub fn sent(&self) -> Vec<(String, ControlPayload)> {
        self.sent.lock().clone()
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            sleep(latency).await;
        }
    }
}

#[async_trait]
impl ThinqTransport for SimulatedTransport {
    async fn fetch_snapshot(&self, device_id: &str) -> Result<Snapshot, TransportError> {
        self.delay().await;
        self.snapshot(device_id)
            .ok_or_else(|| TransportError::UnknownDevice(device_id.to_string()))
    }

    async fn send_control(
        &self,
        device_id: &str,
        payload: &ControlPayload,
    ) -> Result<bool, TransportError> {
        self.delay().await;
        self.sent
            .lock()
            .push((device_id.to_string(), payload.clone()));

        let mode = self.mode.read().clone();
        match mode {
            ControlMode::Fail(error) => return Err(error),
            ControlMode::Reject => {
                debug!("[Sim] Rejecting control for {}", device_id);
                return Ok(false);
            }
            ControlMode::Accept => {}
        }

        let mut snapshots = self.snapshots.write();
        let snapshot = snapshots
            .get_mut(device_id)
            .ok_or_else(|| TransportError::UnknownDevice(device_id.to_string()))?;

        match payload {
            ControlPayload::Value { key, value } => {
                info!("[Sim] {} <- {} = {}", device_id, key, value);
                patch_snapshot(snapshot, key, value.clone());
            }
            ControlPayload::SetList { set, .. } => {
                for (key, value) in set {
                    info!("[Sim] {} <- {} = {}", device_id, key, value);
                    merge_value(snapshot, key, value);
                }
            }
        }
        Ok(true)
    }
}

/// Deep-merge an object value into the snapshot; scalars replace.
fn merge_value(target: &mut Snapshot, key: &str, value: &Value) {
    match (target.get_mut(key), value) {
        (Some(Value::Object(existing)), Value::Object(incoming)) => {
            for (k, v) in incoming {
                merge_value(existing, k, v);
            }
        }
        _ => {
            target.insert(key.to_string(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    fn transport() -> SimulatedTransport {
        let transport = SimulatedTransport::new();
        transport.insert_device(
            "hood",
            json!({"hoodState": {"ventLevel": 0, "lampLevel": 1}})
                .as_object()
                .cloned()
                .unwrap(),
        );
        transport
    }

    #[tokio::test]
    async fn test_fetch_unknown_device() {
        let transport = transport();
        let result = transport.fetch_snapshot("nope").await;
        assert_eq!(result, Err(TransportError::UnknownDevice("nope".into())));
    }

    #[tokio::test]
    async fn test_value_control_is_applied() {
        let transport = transport();
        let accepted = assert_ok!(
            transport
                .send_control("hood", &ControlPayload::value("hoodState.ventLevel", 3))
                .await
        );
        assert!(accepted);

        let snapshot = assert_ok!(transport.fetch_snapshot("hood").await);
        assert_eq!(snapshot["hoodState"]["ventLevel"], json!(3));
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_set_list_merges() {
        let transport = transport();
        let payload = ControlPayload::set_list(json!({"hoodState": {"ventLevel": 2}}));
        assert_ok!(transport.send_control("hood", &payload).await);

        let snapshot = transport.snapshot("hood").unwrap();
        assert_eq!(snapshot["hoodState"], json!({"ventLevel": 2, "lampLevel": 1}));
    }

    #[tokio::test]
    async fn test_reject_and_fail_modes() {
        let transport = transport();
        let payload = ControlPayload::value("hoodState.ventLevel", 3);

        transport.set_mode(ControlMode::Reject);
        assert_eq!(transport.send_control("hood", &payload).await, Ok(false));

        transport.set_mode(ControlMode::Fail(TransportError::Timeout));
        assert_err!(transport.send_control("hood", &payload).await);

        let snapshot = transport.snapshot("hood").unwrap();
        assert_eq!(snapshot["hoodState"]["ventLevel"], json!(0));
        assert_eq!(transport.sent().len(), 2);
    }
}

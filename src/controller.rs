//! Device controller: owns one appliance's snapshot, the versioned status
//! cache, and the control-dispatch path.
//!
//! Every mutation of the snapshot (remote attach, push merge, optimistic
//! patch) bumps the snapshot version. Cached status views are tagged with the
//! version they were built at and are never handed out once it moves on.

use crate::accessory::{Characteristic, ServiceKind, ServiceState};
use crate::category::AccessoryCategory;
use crate::config::{EffectiveConfig, SharedConfig};
use crate::device::{Device, Snapshot, patch_snapshot};
use crate::error::{BridgeError, Result};
use crate::registry::{DeviceRegistry, ModelFeature};
use crate::status::{StatusData, StatusScope, StatusView, coerce_bool};
use crate::temperature::{TemperatureConverter, TemperatureUnit};
use crate::transport::{ControlPayload, ThinqTransport};
use chrono::{DateTime, Utc};
use log::{debug, error};
use parking_lot::Mutex;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Snapshot version of a freshly created controller.
pub const INITIAL_VERSION: u64 = 0;

const MANUFACTURER: &str = "LG";

struct CachedView {
    version: u64,
    type_id: TypeId,
    key: Option<String>,
    view: Arc<dyn Any + Send + Sync>,
}

pub struct DeviceController {
    device: Device,
    transport: Arc<dyn ThinqTransport>,
    config: SharedConfig,
    version: u64,
    cache: Mutex<Vec<CachedView>>,
    updated_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for DeviceController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceController")
            .field("device", &self.device.id)
            .field("device_type", &self.device.device_type)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl DeviceController {
    pub fn new(device: Device, transport: Arc<dyn ThinqTransport>, config: SharedConfig) -> Self {
        Self {
            device,
            transport,
            config,
            version: INITIAL_VERSION,
            cache: Mutex::new(Vec::new()),
            updated_at: None,
        }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn id(&self) -> &str {
        &self.device.id
    }

    pub fn name(&self) -> &str {
        &self.device.name
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Time of the last snapshot change, local patches included.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn category(&self) -> AccessoryCategory {
        DeviceRegistry::category(&self.device)
    }

    fn bump_version(&mut self) {
        self.version += 1;
        self.updated_at = Some(Utc::now());
        let version = self.version;
        self.cache.lock().retain(|c| c.version == version);
    }

    /// Replace the held device and snapshot wholesale.
    pub fn attach_snapshot(&mut self, device: Device) {
        debug!(
            "[Controller] [{}] Received snapshot: {}",
            device.name,
            Value::Object(device.snapshot.clone())
        );
        self.device = device;
        self.bump_version();
    }

    /// Shallow-merge a partial push update into the held snapshot.
    pub fn merge_snapshot(&mut self, partial: Snapshot) {
        debug!(
            "[Controller] [{}] Received partial snapshot: {}",
            self.device.name,
            Value::Object(partial.clone())
        );
        self.device.snapshot.extend(partial);
        self.bump_version();
    }

    /// Status view built from the view's default scope.
    pub fn status<S: StatusView>(&self) -> Arc<S> {
        self.status_at(None)
    }

    /// Status view over `snapshot[key]`, or the view's default scope when no
    /// key is given. Reuses the cached view while the version is unchanged.
    pub fn status_at<S: StatusView>(&self, key: Option<&str>) -> Arc<S> {
        let key = match (key, S::SCOPE) {
            (Some(key), _) => Some(key.to_string()),
            (None, StatusScope::Root) => None,
            (None, StatusScope::Registry) => {
                DeviceRegistry::snapshot_key(&self.device.device_type).map(str::to_string)
            }
        };
        let type_id = TypeId::of::<S>();

        let mut cache = self.cache.lock();
        let version = self.version;
        cache.retain(|c| c.version == version);
        if let Some(hit) = cache.iter().find(|c| c.type_id == type_id && c.key == key)
            && let Ok(view) = Arc::clone(&hit.view).downcast::<S>()
        {
            return view;
        }

        let data = match &key {
            Some(key) => self.device.snapshot.get(key).cloned(),
            None => Some(Value::Object(self.device.snapshot.clone())),
        };
        let view = Arc::new(S::from_data(StatusData::new(
            data,
            Arc::clone(&self.device.schema),
        )));
        cache.push(CachedView {
            version,
            type_id,
            key,
            view: view.clone(),
        });
        view
    }

    /// Drop cached views so the next read rebuilds them. The version stays.
    pub fn invalidate_status_cache(&self) {
        self.cache.lock().clear();
    }

    /// Send a control payload to the transport.
    ///
    /// On acceptance a key/value payload is patched into the local snapshot
    /// and the version bumps; nothing is re-fetched. A transport failure
    /// leaves snapshot and version untouched and surfaces as
    /// [`BridgeError::CommunicationFailure`].
    pub async fn dispatch_control(&mut self, payload: ControlPayload) -> Result<bool> {
        debug!("[Controller] [{}] Dispatching {:?}", self.device.name, payload);

        match self.transport.send_control(&self.device.id, &payload).await {
            Ok(true) => {
                if let ControlPayload::Value { key, value } = payload {
                    patch_snapshot(&mut self.device.snapshot, &key, value);
                    self.bump_version();
                }
                Ok(true)
            }
            Ok(false) => {
                debug!("[Controller] [{}] Control not accepted", self.device.name);
                Ok(false)
            }
            Err(source) => {
                error!(
                    "[Controller] [{}] Device control failed: {}",
                    self.device.name, source
                );
                Err(BridgeError::CommunicationFailure {
                    device: self.device.name.clone(),
                    source,
                })
            }
        }
    }

    pub async fn set_control(&mut self, key: &str, value: impl Into<Value>) -> Result<bool> {
        self.dispatch_control(ControlPayload::value(key, value)).await
    }

    /// Send a flag using the device's `0`/`1` convention.
    pub async fn set_boolean_control(&mut self, key: &str, value: impl Into<Value>) -> Result<bool> {
        let flag = i64::from(coerce_bool(&value.into()));
        self.set_control(key, flag).await
    }

    /// Whether this hardware model supports an optional capability.
    pub fn has_model_feature(&self, feature: ModelFeature) -> bool {
        DeviceRegistry::model_supports(&self.device.device_type, &self.device.model, feature)
    }

    /// Registry defaults merged with the current user override.
    pub fn effective_config(&self) -> EffectiveConfig {
        let defaults = DeviceRegistry::config_defaults(&self.device.device_type);
        let config = self.config.read();
        EffectiveConfig::merge(defaults, config.device_override(&self.device.id))
    }

    pub fn temperature_converter(&self, unit: TemperatureUnit) -> TemperatureConverter {
        TemperatureConverter::new(unit, Some(Arc::clone(&self.device.schema)))
    }

    /// Accessory information service (manufacturer, model, serial).
    pub fn information_service(&self) -> ServiceState {
        let serial = self
            .effective_config()
            .get("serial_number")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| self.device.serial_number.clone())
            .unwrap_or_else(|| "Unknown".to_string());

        ServiceState::new(ServiceKind::AccessoryInformation, self.device.name.clone())
            .with(Characteristic::Name, self.device.name.clone())
            .with(Characteristic::Manufacturer, MANUFACTURER)
            .with(Characteristic::Model, self.device.display_model())
            .with(Characteristic::SerialNumber, serial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DeviceOverride, PlatformConfig};
    use crate::device::Platform;
    use crate::transport::{ControlMode, SimulatedTransport, TransportError};
    use serde_json::json;
    use tokio::time::{Duration, timeout};
    use tokio_test::{assert_err, assert_ok};

    struct OperationStatus {
        data: StatusData,
    }

    impl StatusView for OperationStatus {
        const SCOPE: StatusScope = StatusScope::Root;

        fn from_data(data: StatusData) -> Self {
            Self { data }
        }
    }

    impl OperationStatus {
        fn is_power_on(&self) -> bool {
            self.data.get_boolean("airState.operation", false)
        }
    }

    struct KeyedStatus {
        data: StatusData,
    }

    impl StatusView for KeyedStatus {
        fn from_data(data: StatusData) -> Self {
            Self { data }
        }
    }

    fn snapshot(value: Value) -> Snapshot {
        value.as_object().cloned().unwrap()
    }

    fn controller_with(
        device_type: &str,
        value: Value,
    ) -> (DeviceController, Arc<SimulatedTransport>, SharedConfig) {
        let transport = Arc::new(SimulatedTransport::new());
        transport.insert_device("dev-1", snapshot(value.clone()));
        let config = PlatformConfig::default().into_shared();
        let device = Device::new("dev-1", device_type, Platform::ThinQ2)
            .with_name("Test")
            .with_model("RAC_056905")
            .with_snapshot_value(value);
        let controller = DeviceController::new(device, transport.clone(), config.clone());
        (controller, transport, config)
    }

    #[test]
    fn test_cached_view_reused_until_attach() {
        let (mut controller, _, _) = controller_with("AC", json!({"airState": {"operation": 1}}));
        let first = controller.status::<OperationStatus>();
        let second = controller.status::<OperationStatus>();
        assert!(Arc::ptr_eq(&first, &second));

        let device = controller.device().clone();
        controller.attach_snapshot(device);
        let third = controller.status::<OperationStatus>();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(controller.version(), INITIAL_VERSION + 1);
        assert!(controller.updated_at().is_some());
    }

    #[test]
    fn test_invalidate_rebuilds_without_version_bump() {
        let (controller, _, _) = controller_with("AC", json!({"airState": {"operation": 1}}));
        let first = controller.status::<OperationStatus>();
        controller.invalidate_status_cache();
        let second = controller.status::<OperationStatus>();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(controller.version(), INITIAL_VERSION);
    }

    #[test]
    fn test_status_key_resolution() {
        let (controller, _, _) = controller_with(
            "HOOD",
            json!({"hoodState": {"ventLevel": 2}, "other": {"ventLevel": 5}}),
        );
        // registry key for HOOD is hoodState
        assert_eq!(controller.status::<KeyedStatus>().data.get_int("ventLevel", 0), 2);
        assert_eq!(
            controller
                .status_at::<KeyedStatus>(Some("other"))
                .data
                .get_int("ventLevel", 0),
            5
        );
        // distinct keys keep distinct views
        let hood = controller.status::<KeyedStatus>();
        assert!(Arc::ptr_eq(&hood, &controller.status::<KeyedStatus>()));
    }

    #[test]
    fn test_unknown_type_reads_whole_snapshot() {
        let (controller, _, _) = controller_with("TV", json!({"power": 1}));
        assert_eq!(controller.status::<KeyedStatus>().data.get_int("power", 0), 1);
    }

    #[test]
    fn test_missing_sub_tree_degrades_to_defaults() {
        let (controller, _, _) = controller_with("HOOD", json!({}));
        assert_eq!(controller.status::<KeyedStatus>().data.get_int("ventLevel", 7), 7);
    }

    #[tokio::test]
    async fn test_dispatch_patches_and_bumps_version() {
        let (mut controller, transport, _) =
            controller_with("AC", json!({"airState": {"operation": 1}}));
        assert!(controller.status::<OperationStatus>().is_power_on());

        let accepted = assert_ok!(
            controller
                .dispatch_control(ControlPayload::value("airState.operation", 0))
                .await
        );
        assert!(accepted);
        assert_eq!(controller.version(), INITIAL_VERSION + 1);
        assert_eq!(
            Value::Object(controller.device().snapshot.clone()),
            json!({"airState": {"operation": 0}})
        );
        assert!(!controller.status::<OperationStatus>().is_power_on());
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_creates_intermediate_objects() {
        let (mut controller, _, _) = controller_with("AC", json!({}));
        assert_ok!(controller.set_control("airState.wDir.vStep", "100").await);
        assert_eq!(controller.device().snapshot["airState"]["wDir"]["vStep"], json!("100"));
    }

    #[tokio::test]
    async fn test_failed_dispatch_leaves_state_untouched() {
        let (mut controller, transport, _) =
            controller_with("AC", json!({"airState": {"operation": 1}}));
        transport.set_mode(ControlMode::Fail(TransportError::Network("offline".into())));
        let before = controller.device().snapshot.clone();

        let error = assert_err!(
            controller
                .dispatch_control(ControlPayload::value("airState.operation", 0))
                .await
        );
        assert!(error.is_communication_failure());
        assert_eq!(controller.device().snapshot, before);
        assert_eq!(controller.version(), INITIAL_VERSION);

        // still usable afterwards
        transport.set_mode(ControlMode::Accept);
        assert!(assert_ok!(controller.set_control("airState.operation", 0).await));
    }

    #[tokio::test]
    async fn test_rejected_dispatch_changes_nothing() {
        let (mut controller, transport, _) =
            controller_with("AC", json!({"airState": {"operation": 1}}));
        transport.set_mode(ControlMode::Reject);
        assert!(!assert_ok!(controller.set_control("airState.operation", 0).await));
        assert_eq!(controller.version(), INITIAL_VERSION);
        assert_eq!(controller.device().snapshot["airState"]["operation"], json!(1));
    }

    #[tokio::test]
    async fn test_abandoned_dispatch_changes_nothing() {
        let value = json!({"airState": {"operation": 1}});
        let transport = Arc::new(SimulatedTransport::new().with_latency(Duration::from_millis(200)));
        transport.insert_device("dev-1", snapshot(value.clone()));
        let device = Device::new("dev-1", "AC", Platform::ThinQ2).with_snapshot_value(value.clone());
        let mut controller =
            DeviceController::new(device, transport, PlatformConfig::default().into_shared());

        let pending = controller.dispatch_control(ControlPayload::value("airState.operation", 0));
        assert_err!(timeout(Duration::from_millis(10), pending).await);

        assert_eq!(controller.version(), INITIAL_VERSION);
        assert_eq!(Value::Object(controller.device().snapshot.clone()), value);
        assert!(controller.status::<OperationStatus>().is_power_on());
    }

    #[tokio::test]
    async fn test_set_list_is_not_patched_locally() {
        let (mut controller, transport, _) = controller_with("HOOD", json!({"hoodState": {"ventLevel": 0}}));
        let payload = ControlPayload::set_list(json!({"hoodState": {"ventLevel": 3}}));
        assert!(assert_ok!(controller.dispatch_control(payload).await));
        assert_eq!(controller.version(), INITIAL_VERSION);
        assert_eq!(controller.device().snapshot["hoodState"]["ventLevel"], json!(0));
        assert_eq!(transport.snapshot("dev-1").unwrap()["hoodState"]["ventLevel"], json!(3));
    }

    #[tokio::test]
    async fn test_boolean_control_coercion() {
        let (mut controller, transport, _) = controller_with("AC", json!({}));
        assert_ok!(controller.set_boolean_control("airState.lightingState.displayControl", true).await);
        assert_ok!(controller.set_boolean_control("airState.wMode.jet", 0).await);
        assert_ok!(controller.set_boolean_control("airState.powerSave.basic", "true").await);

        let values: Vec<Value> = transport
            .sent()
            .into_iter()
            .filter_map(|(_, p)| p.as_value().map(|(_, v)| v.clone()))
            .collect();
        assert_eq!(values, vec![json!(1), json!(0), json!(1)]);
    }

    #[test]
    fn test_merge_snapshot() {
        let (mut controller, _, _) =
            controller_with("AC", json!({"airState": {"operation": 1}, "online": true}));
        controller.merge_snapshot(snapshot(json!({"airState": {"opMode": 0}})));
        assert_eq!(controller.version(), INITIAL_VERSION + 1);
        assert_eq!(controller.device().snapshot["airState"], json!({"opMode": 0}));
        assert_eq!(controller.device().snapshot["online"], json!(true));
    }

    #[test]
    fn test_effective_config_is_live() {
        let (controller, _, config) = controller_with("AC", json!({}));
        let effective = controller.effective_config();
        assert_eq!(effective.get_string("ac_temperature_unit", ""), "C");
        assert!(effective.get_bool("ac_air_clean", false));

        config.write().devices.push(DeviceOverride {
            id: "dev-1".into(),
            settings: snapshot(json!({"ac_temperature_unit": "F", "serial_number": "SN-9"})),
        });
        assert_eq!(controller.effective_config().get_string("ac_temperature_unit", ""), "F");
        let info = controller.information_service();
        assert_eq!(
            info.get(Characteristic::SerialNumber).cloned(),
            Some("SN-9".into())
        );
        assert_eq!(info.get(Characteristic::Model).cloned(), Some("RAC_056905".into()));
    }

    #[test]
    fn test_model_features() {
        let (controller, _, _) = controller_with("AC", json!({}));
        assert!(controller.has_model_feature(ModelFeature::JetMode));
        assert!(controller.has_model_feature(ModelFeature::EnergySaveMode));
        assert!(!controller.has_model_feature(ModelFeature::QuietMode));

        let (controller, _, _) = controller_with("HOOD", json!({}));
        assert!(!controller.has_model_feature(ModelFeature::JetMode));
    }
}

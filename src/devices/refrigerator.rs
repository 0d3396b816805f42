//! Refrigerator (current generation).

use super::{ApplianceDevice, base_state, unsupported};
use crate::accessory::{AccessoryState, Characteristic, Command, ServiceKind, ServiceState};
use crate::controller::DeviceController;
use crate::error::Result;
use crate::status::{StatusData, StatusView};
use crate::temperature::{TemperatureConverter, TemperatureUnit};
use async_trait::async_trait;
use std::str::FromStr;
use std::sync::Arc;

const SNAPSHOT_KEY: &str = "refState";

const SWITCH_EXPRESS_FREEZER: &str = "ExpressFreezer";
const SWITCH_EXPRESS_FRIDGE: &str = "ExpressFridge";
const SWITCH_ECO_FRIENDLY: &str = "EcoFriendly";

/// Switch subtype, config gate, status field and display label.
const SWITCHES: &[(&str, &str, &str, &str)] = &[
    (SWITCH_EXPRESS_FREEZER, "ref_express_freezer", "expressMode", "Express Freezer"),
    (SWITCH_EXPRESS_FRIDGE, "ref_express_fridge", "expressFridge", "Express Fridge"),
    (SWITCH_ECO_FRIENDLY, "ref_eco_friendly", "ecoFriendly", "Eco Friendly"),
];

pub struct RefrigeratorStatus {
    data: StatusData,
}

impl StatusView for RefrigeratorStatus {
    fn from_data(data: StatusData) -> Self {
        Self { data }
    }
}

impl RefrigeratorStatus {
    pub fn unit(&self) -> TemperatureUnit {
        TemperatureUnit::from_str(&self.data.get_string("tempUnit", "CELSIUS")).unwrap_or_default()
    }

    /// Fridge compartment temperature in the device's native unit.
    pub fn fridge_temperature(&self) -> f64 {
        self.data.get_float("fridgeTemp", 0.0)
    }

    pub fn freezer_temperature(&self) -> f64 {
        self.data.get_float("freezerTemp", 0.0)
    }

    pub fn is_door_open(&self) -> bool {
        self.data.get_string("atLeastOneDoorOpen", "CLOSE") == "OPEN"
    }

    /// `ON`/`OFF` flag reported under `field`.
    pub fn is_flag_on(&self, field: &str) -> bool {
        self.data.get_string(field, "OFF") == "ON"
    }
}

pub struct Refrigerator {
    controller: DeviceController,
}

impl Refrigerator {
    pub fn new(controller: DeviceController) -> Self {
        Self { controller }
    }

    pub fn status(&self) -> Arc<RefrigeratorStatus> {
        self.controller.status()
    }

    fn converter(&self, status: &RefrigeratorStatus) -> TemperatureConverter {
        self.controller.temperature_converter(status.unit())
    }

    fn sensor(&self, subtype: &str, temperature: f64) -> ServiceState {
        ServiceState::new(
            ServiceKind::TemperatureSensor,
            format!("{} {}", self.controller.name(), subtype),
        )
        .with_subtype(subtype)
        .with(Characteristic::CurrentTemperature, temperature)
    }
}

#[async_trait]
impl ApplianceDevice for Refrigerator {
    fn controller(&self) -> &DeviceController {
        &self.controller
    }

    fn controller_mut(&mut self) -> &mut DeviceController {
        &mut self.controller
    }

    fn accessory_state(&self) -> AccessoryState {
        let status = self.status();
        let converter = self.converter(&status);
        let config = self.controller.effective_config();
        let name = self.controller.name();

        let state = base_state(&self.controller)
            .with_service(self.sensor("Fridge", converter.to_universal(status.fridge_temperature())))
            .with_service(
                self.sensor("Freezer", converter.to_universal(status.freezer_temperature())),
            )
            .with_service(
                ServiceState::new(ServiceKind::ContactSensor, format!("{} Door", name))
                    .with_subtype("Door")
                    .with(Characteristic::ContactSensorState, i64::from(status.is_door_open())),
            );

        SWITCHES
            .iter()
            .fold(state, |state, &(subtype, gate, field, label)| {
                state.with_service_if(config.get_bool(gate, false), || {
                    ServiceState::new(ServiceKind::Switch, format!("{} {}", name, label))
                        .with_subtype(subtype)
                        .with(Characteristic::On, status.is_flag_on(field))
                })
            })
    }

    async fn handle_command(&mut self, command: Command) -> Result<bool> {
        let field = match (command.service, command.characteristic) {
            (ServiceKind::Switch, Characteristic::On) => SWITCHES
                .iter()
                .find(|(subtype, ..)| command.subtype.as_deref() == Some(*subtype))
                .map(|&(_, _, field, _)| field),
            _ => None,
        };
        let Some(field) = field else {
            return Err(unsupported(&self.controller, &command));
        };

        let value = if command.value.as_bool() { "ON" } else { "OFF" };
        self.controller
            .set_control(&format!("{}.{}", SNAPSHOT_KEY, field), value)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessory::CharacteristicValue;
    use crate::config::{DeviceOverride, PlatformConfig};
    use crate::device::{Device, Platform};
    use crate::error::BridgeError;
    use crate::transport::{ControlPayload, SimulatedTransport};
    use serde_json::{Value, json};
    use tokio_test::assert_ok;

    fn fridge(snapshot: Value, settings: Value) -> (Refrigerator, Arc<SimulatedTransport>) {
        let config = PlatformConfig {
            devices: vec![DeviceOverride {
                id: "ref-1".into(),
                settings: settings.as_object().cloned().unwrap_or_default(),
            }],
            ..Default::default()
        }
        .into_shared();
        let transport = Arc::new(SimulatedTransport::new());
        transport.insert_device("ref-1", snapshot.as_object().cloned().unwrap_or_default());
        let device = Device::new("ref-1", "REFRIGERATOR", Platform::ThinQ2)
            .with_name("Fridge")
            .with_snapshot_value(snapshot);
        let controller = DeviceController::new(device, transport.clone(), config);
        (Refrigerator::new(controller), transport)
    }

    #[test]
    fn test_fahrenheit_temperatures() {
        let (fridge, _) = fridge(
            json!({"refState": {"fridgeTemp": 38, "freezerTemp": 0, "tempUnit": "FAHRENHEIT"}}),
            json!({}),
        );
        let state = fridge.accessory_state();
        let sensor = state.service(ServiceKind::TemperatureSensor, Some("Fridge")).unwrap();
        assert_eq!(
            sensor.get(Characteristic::CurrentTemperature),
            Some(&CharacteristicValue::Float(3.33))
        );
        let sensor = state.service(ServiceKind::TemperatureSensor, Some("Freezer")).unwrap();
        assert_eq!(
            sensor.get(Characteristic::CurrentTemperature),
            Some(&CharacteristicValue::Float(-17.78))
        );
    }

    #[test]
    fn test_switches_follow_config() {
        let snapshot = json!({"refState": {"expressMode": "ON", "atLeastOneDoorOpen": "OPEN"}});
        let (plain, _) = fridge(snapshot.clone(), json!({}));
        assert!(!plain.accessory_state().has_service(ServiceKind::Switch, Some(SWITCH_EXPRESS_FREEZER)));

        let (fridge, _) = fridge(snapshot, json!({"ref_express_freezer": true, "ref_eco_friendly": true}));
        let state = fridge.accessory_state();
        let express = state.service(ServiceKind::Switch, Some(SWITCH_EXPRESS_FREEZER)).unwrap();
        assert_eq!(express.get(Characteristic::On), Some(&CharacteristicValue::Bool(true)));
        assert!(state.has_service(ServiceKind::Switch, Some(SWITCH_ECO_FRIENDLY)));
        assert!(!state.has_service(ServiceKind::Switch, Some(SWITCH_EXPRESS_FRIDGE)));
        let door = state.service(ServiceKind::ContactSensor, Some("Door")).unwrap();
        assert_eq!(door.get(Characteristic::ContactSensorState), Some(&CharacteristicValue::Int(1)));
    }

    #[tokio::test]
    async fn test_switch_command_patches_snapshot() {
        let (mut fridge, transport) = fridge(json!({"refState": {"expressFridge": "OFF"}}), json!({}));
        let accepted = assert_ok!(
            fridge
                .handle_command(
                    Command::new(ServiceKind::Switch, Characteristic::On, true)
                        .with_subtype(SWITCH_EXPRESS_FRIDGE)
                )
                .await
        );
        assert!(accepted);
        assert_eq!(
            transport.sent()[0].1,
            ControlPayload::value("refState.expressFridge", "ON")
        );
        assert!(fridge.status().is_flag_on("expressFridge"));

        let result = fridge
            .handle_command(Command::new(ServiceKind::Switch, Characteristic::On, true))
            .await;
        assert!(matches!(result, Err(BridgeError::UnsupportedCommand { .. })));
    }
}

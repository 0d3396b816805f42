//! Legacy-generation implementations.
//!
//! Legacy devices report flat, capitalised monitor fields (`TempCur`,
//! `Remain_Time_H`) under the registry snapshot key. Coded states are
//! resolved through the model schema rather than compared as raw strings,
//! and every control value is sent as a string.

use super::{ApplianceDevice, base_state, cycle_valve, decline_valve_write, unsupported};
use crate::accessory::{
    AccessoryState, Characteristic, Command, ServiceKind, ServiceState, ValueRange,
};
use crate::controller::DeviceController;
use crate::error::Result;
use crate::status::{ApplianceStatus, StatusData, StatusView, number_key};
use crate::temperature::{HOMEKIT_TEMP_MAX, HOMEKIT_TEMP_MIN, TemperatureConverter, TemperatureUnit};
use async_trait::async_trait;
use std::str::FromStr;
use std::sync::Arc;

const WASHER_RUNNING_LABEL: &str = "@WM_STATE_RUNNING_W";
const WASHER_POWER_OFF_LABEL: &str = "@WM_STATE_POWER_OFF_W";

/// Legacy operation-mode codes.
mod op_mode {
    pub const COOL: i64 = 0;
    pub const HEAT: i64 = 4;
    pub const AUTO: i64 = 6;
}

/// Flat legacy monitor fields of one device.
pub struct LegacyStatus {
    data: StatusData,
}

impl StatusView for LegacyStatus {
    fn from_data(data: StatusData) -> Self {
        Self { data }
    }
}

impl LegacyStatus {
    /// Legacy devices send `"1"`/`"0"` for the power flag.
    pub fn is_operating(&self) -> bool {
        self.data.get_string("Operation", "0") != "0"
    }

    pub fn int(&self, field: &str) -> i64 {
        self.data.get_int(field, 0)
    }

    pub fn float(&self, field: &str) -> f64 {
        self.data.get_float(field, 0.0)
    }

    /// Schema label of a coded field, or the raw value when the schema has none.
    pub fn label(&self, field: &str) -> String {
        self.data
            .enum_label(field, field)
            .unwrap_or_else(|| self.data.get_string(field, ""))
    }
}

/// Legacy washer and dryer status; remaining time uses the legacy field names.
pub struct LegacyWasherStatus {
    data: StatusData,
}

impl StatusView for LegacyWasherStatus {
    fn from_data(data: StatusData) -> Self {
        Self { data }
    }
}

impl ApplianceStatus for LegacyWasherStatus {
    const REMAIN_HOUR_KEY: &'static str = "Remain_Time_H";
    const REMAIN_MINUTE_KEY: &'static str = "Remain_Time_M";

    fn data(&self) -> &StatusData {
        &self.data
    }

    fn is_power_on(&self) -> bool {
        self.state_label().is_some_and(|label| label != WASHER_POWER_OFF_LABEL)
    }

    fn is_running(&self) -> bool {
        self.state_label().as_deref() == Some(WASHER_RUNNING_LABEL)
    }
}

impl LegacyWasherStatus {
    pub fn state_label(&self) -> Option<String> {
        self.data.enum_label("State", "State")
    }
}

fn level_command_value(command: &Command) -> String {
    command.value.as_i64().unwrap_or(0).to_string()
}

fn flag(on: bool) -> &'static str {
    if on { "1" } else { "0" }
}

pub struct LegacyAirConditioner {
    controller: DeviceController,
}

impl LegacyAirConditioner {
    pub fn new(controller: DeviceController) -> Self {
        Self { controller }
    }

    pub fn status(&self) -> Arc<LegacyStatus> {
        self.controller.status()
    }

    fn converter(&self) -> TemperatureConverter {
        let config = self.controller.effective_config();
        let unit = TemperatureUnit::from_str(&config.get_string("ac_temperature_unit", "C"))
            .unwrap_or_default();
        self.controller.temperature_converter(unit)
    }

    fn target_state(status: &LegacyStatus) -> i64 {
        match status.int("OpMode") {
            op_mode::HEAT => 1,
            op_mode::COOL => 2,
            _ => 0,
        }
    }
}

#[async_trait]
impl ApplianceDevice for LegacyAirConditioner {
    fn controller(&self) -> &DeviceController {
        &self.controller
    }

    fn controller_mut(&mut self) -> &mut DeviceController {
        &mut self.controller
    }

    fn accessory_state(&self) -> AccessoryState {
        let status = self.status();
        let converter = self.converter();
        let target = converter
            .to_universal(status.float("TempCfg"))
            .clamp(HOMEKIT_TEMP_MIN, HOMEKIT_TEMP_MAX);
        let thresholds = ValueRange::new(HOMEKIT_TEMP_MIN, HOMEKIT_TEMP_MAX, 1.0);
        let current_state = match (status.is_operating(), status.int("OpMode")) {
            (false, _) => 0,
            (true, op_mode::HEAT) => 2,
            (true, _) => 3,
        };

        base_state(&self.controller).with_service(
            ServiceState::new(ServiceKind::HeaterCooler, self.controller.name())
                .with(Characteristic::Active, status.is_operating())
                .with(Characteristic::CurrentHeaterCoolerState, current_state)
                .with(Characteristic::TargetHeaterCoolerState, Self::target_state(&status))
                .with(
                    Characteristic::CurrentTemperature,
                    converter.to_universal(status.float("TempCur")),
                )
                .with(Characteristic::CoolingThresholdTemperature, target)
                .with_range(Characteristic::CoolingThresholdTemperature, thresholds)
                .with(Characteristic::HeatingThresholdTemperature, target)
                .with_range(Characteristic::HeatingThresholdTemperature, thresholds)
                .with(Characteristic::RotationSpeed, status.int("WindStrength")),
        )
    }

    async fn handle_command(&mut self, command: Command) -> Result<bool> {
        if command.service != ServiceKind::HeaterCooler {
            return Err(unsupported(&self.controller, &command));
        }

        match command.characteristic {
            Characteristic::Active => {
                self.controller
                    .set_control("airState.Operation", flag(command.value.as_bool()))
                    .await
            }
            Characteristic::CoolingThresholdTemperature
            | Characteristic::HeatingThresholdTemperature => {
                let celsius = command
                    .value
                    .as_f64()
                    .unwrap_or(HOMEKIT_TEMP_MIN)
                    .clamp(HOMEKIT_TEMP_MIN, HOMEKIT_TEMP_MAX);
                let native = self.converter().to_native(celsius);
                self.controller
                    .set_control("airState.TempCfg", number_key(native))
                    .await
            }
            Characteristic::TargetHeaterCoolerState => {
                let mode = match command.value.as_i64() {
                    Some(1) => op_mode::HEAT,
                    Some(2) => op_mode::COOL,
                    _ => op_mode::AUTO,
                };
                self.controller
                    .set_control("airState.OpMode", mode.to_string())
                    .await
            }
            Characteristic::RotationSpeed => {
                self.controller
                    .set_control("airState.WindStrength", level_command_value(&command))
                    .await
            }
            _ => Err(unsupported(&self.controller, &command)),
        }
    }
}

pub struct LegacyAirPurifier {
    controller: DeviceController,
}

impl LegacyAirPurifier {
    pub fn new(controller: DeviceController) -> Self {
        Self { controller }
    }

    pub fn status(&self) -> Arc<LegacyStatus> {
        self.controller.status()
    }
}

#[async_trait]
impl ApplianceDevice for LegacyAirPurifier {
    fn controller(&self) -> &DeviceController {
        &self.controller
    }

    fn controller_mut(&mut self) -> &mut DeviceController {
        &mut self.controller
    }

    fn accessory_state(&self) -> AccessoryState {
        let status = self.status();
        let on = status.is_operating();
        base_state(&self.controller).with_service(
            ServiceState::new(ServiceKind::AirPurifier, self.controller.name())
                .with(Characteristic::Active, on)
                .with(Characteristic::CurrentAirPurifierState, if on { 2i64 } else { 0 })
                .with(Characteristic::TargetAirPurifierState, 1i64)
                .with(Characteristic::RotationSpeed, status.int("WindStrength")),
        )
    }

    async fn handle_command(&mut self, command: Command) -> Result<bool> {
        match (command.service, command.characteristic) {
            (ServiceKind::AirPurifier, Characteristic::Active) => {
                self.controller
                    .set_control("airState.Operation", flag(command.value.as_bool()))
                    .await
            }
            (ServiceKind::AirPurifier, Characteristic::RotationSpeed) => {
                self.controller
                    .set_control("airState.WindStrength", level_command_value(&command))
                    .await
            }
            _ => Err(unsupported(&self.controller, &command)),
        }
    }
}

pub struct LegacyRefrigerator {
    controller: DeviceController,
}

impl LegacyRefrigerator {
    pub fn new(controller: DeviceController) -> Self {
        Self { controller }
    }

    pub fn status(&self) -> Arc<LegacyStatus> {
        self.controller.status()
    }

    fn unit(status: &LegacyStatus) -> TemperatureUnit {
        let label = status.label("TempUnit").to_ascii_uppercase();
        if label == "F" || label.contains("FAHRENHEIT") {
            TemperatureUnit::Fahrenheit
        } else {
            TemperatureUnit::Celsius
        }
    }

    fn is_door_open(status: &LegacyStatus) -> bool {
        let label = status.label("DoorOpenState");
        label == "OPEN" || label.ends_with("_OPEN_W")
    }
}

#[async_trait]
impl ApplianceDevice for LegacyRefrigerator {
    fn controller(&self) -> &DeviceController {
        &self.controller
    }

    fn controller_mut(&mut self) -> &mut DeviceController {
        &mut self.controller
    }

    fn accessory_state(&self) -> AccessoryState {
        let status = self.status();
        let converter = self.controller.temperature_converter(Self::unit(&status));
        let name = self.controller.name();
        let sensor = |subtype: &str, field: &str| {
            ServiceState::new(ServiceKind::TemperatureSensor, format!("{} {}", name, subtype))
                .with_subtype(subtype)
                .with(
                    Characteristic::CurrentTemperature,
                    converter.to_universal(status.float(field)),
                )
        };

        base_state(&self.controller)
            .with_service(sensor("Fridge", "TempRefrigerator"))
            .with_service(sensor("Freezer", "TempFreezer"))
            .with_service(
                ServiceState::new(ServiceKind::ContactSensor, format!("{} Door", name))
                    .with_subtype("Door")
                    .with(
                        Characteristic::ContactSensorState,
                        i64::from(Self::is_door_open(&status)),
                    ),
            )
    }

    async fn handle_command(&mut self, command: Command) -> Result<bool> {
        Err(unsupported(&self.controller, &command))
    }
}

pub struct LegacyWasher {
    controller: DeviceController,
}

impl LegacyWasher {
    pub fn new(controller: DeviceController) -> Self {
        Self { controller }
    }

    pub fn status(&self) -> Arc<LegacyWasherStatus> {
        self.controller.status()
    }
}

#[async_trait]
impl ApplianceDevice for LegacyWasher {
    fn controller(&self) -> &DeviceController {
        &self.controller
    }

    fn controller_mut(&mut self) -> &mut DeviceController {
        &mut self.controller
    }

    fn accessory_state(&self) -> AccessoryState {
        let status = self.status();
        base_state(&self.controller).with_service(cycle_valve(self.controller.name(), &*status))
    }

    async fn handle_command(&mut self, command: Command) -> Result<bool> {
        decline_valve_write(&self.controller, &command)
    }
}

pub struct LegacyRangeHood {
    controller: DeviceController,
}

impl LegacyRangeHood {
    pub fn new(controller: DeviceController) -> Self {
        Self { controller }
    }

    pub fn status(&self) -> Arc<LegacyStatus> {
        self.controller.status()
    }
}

#[async_trait]
impl ApplianceDevice for LegacyRangeHood {
    fn controller(&self) -> &DeviceController {
        &self.controller
    }

    fn controller_mut(&mut self) -> &mut DeviceController {
        &mut self.controller
    }

    fn accessory_state(&self) -> AccessoryState {
        let status = self.status();
        let name = self.controller.name();
        let vent = status.int("VentLevel");
        let lamp = status.int("LampLevel");

        base_state(&self.controller)
            .with_service(
                ServiceState::new(ServiceKind::Fan, name)
                    .with(Characteristic::On, vent > 0)
                    .with(Characteristic::RotationSpeed, vent),
            )
            .with_service(
                ServiceState::new(ServiceKind::Lightbulb, format!("{} - Light", name))
                    .with_subtype("Light")
                    .with(Characteristic::On, lamp > 0)
                    .with(Characteristic::Brightness, lamp),
            )
    }

    async fn handle_command(&mut self, command: Command) -> Result<bool> {
        let value = match command.characteristic {
            Characteristic::On => flag(command.value.as_bool()).to_string(),
            _ => level_command_value(&command),
        };

        match (command.service, command.characteristic) {
            (ServiceKind::Fan, Characteristic::On | Characteristic::RotationSpeed) => {
                self.controller.set_control("hoodState.VentLevel", value).await
            }
            (ServiceKind::Lightbulb, Characteristic::On | Characteristic::Brightness) => {
                self.controller.set_control("hoodState.LampLevel", value).await
            }
            _ => Err(unsupported(&self.controller, &command)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessory::CharacteristicValue;
    use crate::config::{DeviceOverride, PlatformConfig};
    use crate::device::{Device, DeviceModel, DeviceSchema, Platform};
    use crate::transport::{ControlPayload, SimulatedTransport};
    use serde_json::{Value, json};
    use tokio_test::assert_ok;

    fn controller(
        device_type: &str,
        snapshot: Value,
        schema: Arc<dyn DeviceSchema>,
        settings: Value,
    ) -> (DeviceController, Arc<SimulatedTransport>) {
        let transport = Arc::new(SimulatedTransport::new());
        transport.insert_device("v1-1", snapshot.as_object().cloned().unwrap_or_default());
        let config = PlatformConfig {
            devices: vec![DeviceOverride {
                id: "v1-1".into(),
                settings: settings.as_object().cloned().unwrap_or_default(),
            }],
            ..Default::default()
        }
        .into_shared();
        let device = Device::new("v1-1", device_type, Platform::ThinQ1)
            .with_name("Legacy")
            .with_snapshot_value(snapshot)
            .with_schema(schema);
        (DeviceController::new(device, transport.clone(), config), transport)
    }

    fn empty_schema() -> Arc<dyn DeviceSchema> {
        Arc::new(DeviceModel::empty())
    }

    #[test]
    fn test_washer_states_resolve_through_schema() {
        let schema: Arc<dyn DeviceSchema> = Arc::new(DeviceModel::new(json!({
            "Value": {"State": {"type": "Enum", "option": {
                "0": "@WM_STATE_POWER_OFF_W",
                "1": "@WM_STATE_INITIAL_W",
                "6": "@WM_STATE_RUNNING_W"
            }}}
        })));
        let washer = |state: &str| {
            let snapshot = json!({"washerDryer": {
                "State": state, "Remain_Time_H": "1", "Remain_Time_M": "10"
            }});
            LegacyWasher::new(controller("WASHER", snapshot, schema.clone(), json!({})).0)
        };

        let running = washer("6");
        assert!(running.status().is_running());
        assert_eq!(running.status().remain_duration(), 4200);

        let initial = washer("1");
        assert!(initial.status().is_power_on());
        assert!(!initial.status().is_running());
        assert_eq!(initial.status().remain_duration(), 0);

        assert!(!washer("0").status().is_power_on());
        // unknown code: no label, treated as off
        assert!(!washer("99").status().is_power_on());
    }

    #[tokio::test]
    async fn test_air_conditioner_sends_strings() {
        let (controller, transport) = controller(
            "AC",
            json!({"airState": {"Operation": "0", "OpMode": "0", "TempCur": "24", "TempCfg": "22"}}),
            empty_schema(),
            json!({}),
        );
        let mut ac = LegacyAirConditioner::new(controller);
        assert!(!ac.status().is_operating());

        assert_ok!(
            ac.handle_command(Command::new(ServiceKind::HeaterCooler, Characteristic::Active, true))
                .await
        );
        assert_ok!(
            ac.handle_command(Command::new(
                ServiceKind::HeaterCooler,
                Characteristic::CoolingThresholdTemperature,
                21.0
            ))
            .await
        );

        let sent = transport.sent();
        assert_eq!(sent[0].1, ControlPayload::value("airState.Operation", "1"));
        assert_eq!(sent[1].1, ControlPayload::value("airState.TempCfg", "21"));

        let state = ac.accessory_state();
        let service = state.service(ServiceKind::HeaterCooler, None).unwrap();
        assert_eq!(service.get(Characteristic::Active), Some(&CharacteristicValue::Bool(true)));
        assert_eq!(
            service.get(Characteristic::CurrentHeaterCoolerState),
            Some(&CharacteristicValue::Int(3))
        );
        assert_eq!(
            service.get(Characteristic::TargetHeaterCoolerState),
            Some(&CharacteristicValue::Int(2))
        );
    }

    #[tokio::test]
    async fn test_air_conditioner_fahrenheit_setpoint() {
        let (controller, transport) = controller(
            "AC",
            json!({"airState": {"Operation": "1", "TempCfg": "72"}}),
            empty_schema(),
            json!({"ac_temperature_unit": "F"}),
        );
        let mut ac = LegacyAirConditioner::new(controller);
        let state = ac.accessory_state();
        let service = state.service(ServiceKind::HeaterCooler, None).unwrap();
        assert_eq!(
            service.get(Characteristic::CoolingThresholdTemperature),
            Some(&CharacteristicValue::Float(22.22))
        );

        assert_ok!(
            ac.handle_command(Command::new(
                ServiceKind::HeaterCooler,
                Characteristic::HeatingThresholdTemperature,
                25.0
            ))
            .await
        );
        assert_eq!(transport.sent()[0].1, ControlPayload::value("airState.TempCfg", "77"));
    }

    #[test]
    fn test_refrigerator_labels() {
        let schema: Arc<dyn DeviceSchema> = Arc::new(DeviceModel::new(json!({
            "Value": {
                "DoorOpenState": {"type": "Enum", "option": {"0": "@RE_STATE_CLOSE_W", "1": "@RE_STATE_OPEN_W"}},
                "TempUnit": {"type": "Enum", "option": {"0": "@RE_TERM_CELSIUS_W", "1": "@RE_TERM_FAHRENHEIT_W"}}
            }
        })));
        let (controller, _) = controller(
            "REFRIGERATOR",
            json!({"refState": {
                "DoorOpenState": "1", "TempUnit": "1", "TempRefrigerator": "41", "TempFreezer": "5"
            }}),
            schema,
            json!({}),
        );
        let fridge = LegacyRefrigerator::new(controller);
        let state = fridge.accessory_state();
        let door = state.service(ServiceKind::ContactSensor, Some("Door")).unwrap();
        assert_eq!(door.get(Characteristic::ContactSensorState), Some(&CharacteristicValue::Int(1)));
        let sensor = state.service(ServiceKind::TemperatureSensor, Some("Fridge")).unwrap();
        assert_eq!(
            sensor.get(Characteristic::CurrentTemperature),
            Some(&CharacteristicValue::Float(5.0))
        );
    }

    #[tokio::test]
    async fn test_range_hood_levels() {
        let (controller, transport) = controller(
            "HOOD",
            json!({"hoodState": {"VentLevel": "0", "LampLevel": "2"}}),
            empty_schema(),
            json!({}),
        );
        let mut hood = LegacyRangeHood::new(controller);
        let state = hood.accessory_state();
        let light = state.service(ServiceKind::Lightbulb, Some("Light")).unwrap();
        assert_eq!(light.get(Characteristic::On), Some(&CharacteristicValue::Bool(true)));

        assert_ok!(
            hood.handle_command(Command::new(ServiceKind::Fan, Characteristic::RotationSpeed, 3i64))
                .await
        );
        assert_eq!(transport.sent()[0].1, ControlPayload::value("hoodState.VentLevel", "3"));
        assert_eq!(hood.status().int("VentLevel"), 3);
    }
}

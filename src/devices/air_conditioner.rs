//! Air conditioner (current generation).
//!
//! Current-generation AC snapshots report flat `airState.*` keys at the root,
//! so the status view reads the whole snapshot. Optional services are gated by
//! the user configuration and, for model-specific switches, by the registry's
//! model feature tables.

use super::{ApplianceDevice, base_state, filter_service, unsupported};
use crate::accessory::{
    AccessoryState, Characteristic, Command, ServiceKind, ServiceState, ValueRange,
};
use crate::config::EffectiveConfig;
use crate::controller::DeviceController;
use crate::error::Result;
use crate::registry::ModelFeature;
use crate::status::{AirQuality, StatusData, StatusScope, StatusView, round_half_up};
use crate::temperature::{HOMEKIT_TEMP_MAX, HOMEKIT_TEMP_MIN, TemperatureConverter, TemperatureUnit};
use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use strum::FromRepr;

pub const FAN_SPEED_MIN: i64 = 2;
pub const FAN_SPEED_MAX: i64 = 6;
pub const HUMIDITY_MAX: f64 = 100.0;
pub const HUMIDITY_DIVISOR: f64 = 10.0;
pub const SWING_MODE_ON: &str = "100";
pub const SWING_MODE_OFF: &str = "0";
pub const AC_MONITOR_TIMEOUT_VALUE: &str = "70";
/// Reported when the device omits `opMode`.
pub const UNDEFINED_OP_MODE: i64 = -1;

const KEY_OPERATION: &str = "airState.operation";
const KEY_OP_MODE: &str = "airState.opMode";
const KEY_TEMP_CURRENT: &str = "airState.tempState.current";
const KEY_TEMP_TARGET: &str = "airState.tempState.target";
const KEY_WIND_STRENGTH: &str = "airState.windStrength";
const KEY_SWING_VERTICAL: &str = "airState.wDir.vStep";
const KEY_SWING_HORIZONTAL: &str = "airState.wDir.hStep";
const KEY_HUMIDITY: &str = "airState.humidity.current";
const KEY_JET: &str = "airState.wMode.jet";
const KEY_QUIET: &str = "airState.miscFuncState.silentAWHP";
const KEY_LIGHT: &str = "airState.lightingState.displayControl";
const KEY_ENERGY_SAVE: &str = "airState.powerSave.basic";
const KEY_AIR_CLEAN: &str = "airState.wMode.airClean";
const KEY_FILTER_USED: &str = "airState.filterMngStates.useTime";
const KEY_FILTER_MAX: &str = "airState.filterMngStates.maxTime";
const KEY_MONITOR_TIMEOUT: &str = "airState.mon.timeout";

const SWITCH_JET: &str = "Jet";
const SWITCH_QUIET: &str = "Quiet";
const SWITCH_LIGHT: &str = "Light";
const SWITCH_ENERGY_SAVE: &str = "EnergySave";
const SWITCH_AIR_CLEAN: &str = "AirClean";
const BUTTON_PREFIX: &str = "button-";

/// Operation modes reported in `airState.opMode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(i64)]
pub enum OperationMode {
    Cool = 0,
    Dry = 1,
    Fan = 2,
    Ai = 3,
    Heat = 4,
    AirClean = 5,
    Auto = 6,
}

/// HomeKit heater-cooler current states.
mod current_state {
    pub const INACTIVE: i64 = 0;
    pub const IDLE: i64 = 1;
    pub const HEATING: i64 = 2;
    pub const COOLING: i64 = 3;
}

/// HomeKit heater-cooler target states.
mod target_state {
    pub const AUTO: i64 = 0;
    pub const HEAT: i64 = 1;
    pub const COOL: i64 = 2;
}

pub struct AirConditionerStatus {
    data: StatusData,
}

impl StatusView for AirConditionerStatus {
    const SCOPE: StatusScope = StatusScope::Root;

    fn from_data(data: StatusData) -> Self {
        Self { data }
    }
}

impl AirConditionerStatus {
    pub fn is_power_on(&self) -> bool {
        self.data.get_boolean(KEY_OPERATION, false)
    }

    pub fn op_mode(&self) -> Option<OperationMode> {
        OperationMode::from_repr(self.data.get_int(KEY_OP_MODE, UNDEFINED_OP_MODE))
    }

    /// Room temperature in the device's native unit.
    pub fn current_temperature(&self) -> f64 {
        self.data.get_float(KEY_TEMP_CURRENT, 0.0)
    }

    /// Set point in the device's native unit.
    pub fn target_temperature(&self) -> f64 {
        self.data.get_float(KEY_TEMP_TARGET, 0.0)
    }

    pub fn wind_strength(&self) -> i64 {
        self.data
            .get_int(KEY_WIND_STRENGTH, FAN_SPEED_MIN)
            .clamp(FAN_SPEED_MIN, FAN_SPEED_MAX)
    }

    pub fn is_vertical_swing_on(&self) -> bool {
        self.data.get_string(KEY_SWING_VERTICAL, SWING_MODE_OFF) == SWING_MODE_ON
    }

    pub fn is_horizontal_swing_on(&self) -> bool {
        self.data.get_string(KEY_SWING_HORIZONTAL, SWING_MODE_OFF) == SWING_MODE_ON
    }

    /// Relative humidity in percent, if reported.
    pub fn humidity(&self) -> Option<f64> {
        self.data
            .get_value(KEY_HUMIDITY)
            .map(|_| (self.data.get_float(KEY_HUMIDITY, 0.0) / HUMIDITY_DIVISOR).min(HUMIDITY_MAX))
    }

    pub fn air_quality(&self) -> Option<AirQuality> {
        self.data.get_air_quality_data(self.is_power_on())
    }

    pub fn is_jet_on(&self) -> bool {
        self.data.get_boolean(KEY_JET, false)
    }

    pub fn is_quiet_on(&self) -> bool {
        self.data.get_boolean(KEY_QUIET, false)
    }

    pub fn is_light_on(&self) -> bool {
        self.data.get_boolean(KEY_LIGHT, false)
    }

    pub fn is_energy_save_on(&self) -> bool {
        self.data.get_boolean(KEY_ENERGY_SAVE, false)
    }

    pub fn is_air_clean_on(&self) -> bool {
        self.data.get_boolean(KEY_AIR_CLEAN, false)
    }

    pub fn filter_life(&self) -> Option<i64> {
        self.data
            .has_property(KEY_FILTER_MAX)
            .then(|| self.data.get_filter_life_percent(KEY_FILTER_USED, KEY_FILTER_MAX))
    }

    fn current_heater_cooler_state(&self) -> i64 {
        if !self.is_power_on() {
            return current_state::INACTIVE;
        }
        match self.op_mode() {
            Some(OperationMode::Heat) => current_state::HEATING,
            Some(OperationMode::Cool | OperationMode::Dry) => current_state::COOLING,
            Some(OperationMode::Auto | OperationMode::Ai) => {
                if self.current_temperature() < self.target_temperature() {
                    current_state::HEATING
                } else {
                    current_state::COOLING
                }
            }
            _ => current_state::IDLE,
        }
    }

    fn target_heater_cooler_state(&self, mode: AcModeSetting) -> i64 {
        match mode {
            AcModeSetting::Cooling => target_state::COOL,
            AcModeSetting::Heating => target_state::HEAT,
            AcModeSetting::Both => match self.op_mode() {
                Some(OperationMode::Heat) => target_state::HEAT,
                Some(OperationMode::Cool) => target_state::COOL,
                _ => target_state::AUTO,
            },
        }
    }
}

/// `ac_mode`: which target states the thermostat offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AcModeSetting {
    Both,
    Cooling,
    Heating,
}

impl AcModeSetting {
    fn from_config(config: &EffectiveConfig) -> Self {
        match config.get_string("ac_mode", "BOTH").to_ascii_uppercase().as_str() {
            "COOLING" => Self::Cooling,
            "HEATING" => Self::Heating,
            _ => Self::Both,
        }
    }

    fn range(self) -> ValueRange {
        match self {
            Self::Both => ValueRange::new(target_state::AUTO as f64, target_state::COOL as f64, 1.0),
            Self::Cooling => ValueRange::new(target_state::COOL as f64, target_state::COOL as f64, 1.0),
            Self::Heating => ValueRange::new(target_state::HEAT as f64, target_state::HEAT as f64, 1.0),
        }
    }
}

/// User-defined mode button (`ac_buttons` entry).
#[derive(Debug, Clone, PartialEq)]
struct ModeButton {
    name: String,
    op_mode: i64,
}

impl ModeButton {
    fn subtype(&self) -> String {
        format!("{}{}", BUTTON_PREFIX, self.op_mode)
    }
}

fn mode_buttons(config: &EffectiveConfig) -> Vec<ModeButton> {
    config
        .get_list("ac_buttons")
        .iter()
        .filter_map(|entry| {
            let name = entry.get("name")?.as_str()?.to_string();
            let op_mode = entry.get("op_mode")?.as_i64()?;
            Some(ModeButton { name, op_mode })
        })
        .collect()
}

/// Whole numbers are sent as integers, the rest as floats.
fn numeric(value: f64) -> Value {
    if value.fract() == 0.0 {
        Value::from(value as i64)
    } else {
        Value::from(value)
    }
}

pub struct AirConditioner {
    controller: DeviceController,
}

impl AirConditioner {
    pub fn new(controller: DeviceController) -> Self {
        Self { controller }
    }

    pub fn status(&self) -> Arc<AirConditionerStatus> {
        self.controller.status()
    }

    fn converter(&self, config: &EffectiveConfig) -> TemperatureConverter {
        let unit = TemperatureUnit::from_str(&config.get_string("ac_temperature_unit", "C"))
            .unwrap_or_default();
        self.controller.temperature_converter(unit)
    }

    fn switch(&self, subtype: &str, name: &str, on: bool) -> ServiceState {
        ServiceState::new(ServiceKind::Switch, format!("{} {}", self.controller.name(), name))
            .with_subtype(subtype)
            .with(Characteristic::On, on)
    }

    fn heater_cooler(&self, status: &AirConditionerStatus, config: &EffectiveConfig) -> ServiceState {
        let converter = self.converter(config);
        let mode = AcModeSetting::from_config(config);
        let target = converter
            .to_universal(status.target_temperature())
            .clamp(HOMEKIT_TEMP_MIN, HOMEKIT_TEMP_MAX);
        let thresholds = ValueRange::new(HOMEKIT_TEMP_MIN, HOMEKIT_TEMP_MAX, 0.5);
        let swing = match config.get_string("ac_swing_mode", "BOTH").to_ascii_uppercase().as_str() {
            "VERTICAL" => status.is_vertical_swing_on(),
            "HORIZONTAL" => status.is_horizontal_swing_on(),
            _ => status.is_vertical_swing_on() || status.is_horizontal_swing_on(),
        };

        ServiceState::new(ServiceKind::HeaterCooler, self.controller.name())
            .with(Characteristic::Active, status.is_power_on())
            .with(Characteristic::CurrentHeaterCoolerState, status.current_heater_cooler_state())
            .with(Characteristic::TargetHeaterCoolerState, status.target_heater_cooler_state(mode))
            .with_range(Characteristic::TargetHeaterCoolerState, mode.range())
            .with(
                Characteristic::CurrentTemperature,
                converter.to_universal(status.current_temperature()),
            )
            .with(Characteristic::CoolingThresholdTemperature, target)
            .with_range(Characteristic::CoolingThresholdTemperature, thresholds)
            .with(Characteristic::HeatingThresholdTemperature, target)
            .with_range(Characteristic::HeatingThresholdTemperature, thresholds)
            .with(Characteristic::RotationSpeed, status.wind_strength())
            .with_range(
                Characteristic::RotationSpeed,
                ValueRange::new(FAN_SPEED_MIN as f64, FAN_SPEED_MAX as f64, 1.0),
            )
            .with(Characteristic::SwingMode, i64::from(swing))
            .with(
                Characteristic::TemperatureDisplayUnits,
                i64::from(converter.is_fahrenheit()),
            )
    }

    async fn set_target_temperature(&mut self, celsius: f64) -> Result<bool> {
        let config = self.controller.effective_config();
        let native = self
            .converter(&config)
            .to_native(celsius.clamp(HOMEKIT_TEMP_MIN, HOMEKIT_TEMP_MAX));
        self.controller.set_control(KEY_TEMP_TARGET, numeric(native)).await
    }

    async fn set_target_state(&mut self, state: i64) -> Result<bool> {
        let mode = match state {
            target_state::HEAT => OperationMode::Heat,
            target_state::COOL => OperationMode::Cool,
            _ => OperationMode::Auto,
        };
        self.controller.set_control(KEY_OP_MODE, mode as i64).await
    }

    async fn set_wind_strength(&mut self, speed: i64) -> Result<bool> {
        let speed = speed.clamp(FAN_SPEED_MIN, FAN_SPEED_MAX);
        self.controller.set_control(KEY_WIND_STRENGTH, speed).await
    }

    async fn set_swing(&mut self, on: bool) -> Result<bool> {
        let value = if on { SWING_MODE_ON } else { SWING_MODE_OFF };
        let setting = self
            .controller
            .effective_config()
            .get_string("ac_swing_mode", "BOTH")
            .to_ascii_uppercase();

        let mut accepted = true;
        if setting != "HORIZONTAL" {
            accepted &= self.controller.set_control(KEY_SWING_VERTICAL, value).await?;
        }
        if setting != "VERTICAL" {
            accepted &= self.controller.set_control(KEY_SWING_HORIZONTAL, value).await?;
        }
        Ok(accepted)
    }

    async fn set_mode_button(&mut self, command: &Command, subtype: &str) -> Result<bool> {
        let config = self.controller.effective_config();
        let Some(button) = mode_buttons(&config)
            .into_iter()
            .find(|b| b.subtype() == subtype)
        else {
            return Err(unsupported(&self.controller, command));
        };

        if !command.value.as_bool() {
            return self
                .controller
                .set_control(KEY_OP_MODE, OperationMode::Cool as i64)
                .await;
        }
        if !self.status().is_power_on() {
            self.controller.set_boolean_control(KEY_OPERATION, true).await?;
        }
        self.controller.set_control(KEY_OP_MODE, button.op_mode).await
    }

    /// Key written by a feature switch, if the switch is enabled.
    fn switch_key(&self, subtype: &str, config: &EffectiveConfig) -> Option<&'static str> {
        match subtype {
            SWITCH_JET if self.jet_enabled(config) => Some(KEY_JET),
            SWITCH_QUIET if self.controller.has_model_feature(ModelFeature::QuietMode) => {
                Some(KEY_QUIET)
            }
            SWITCH_LIGHT if config.get_bool("ac_led_control", false) => Some(KEY_LIGHT),
            SWITCH_ENERGY_SAVE if self.energy_save_enabled(config) => Some(KEY_ENERGY_SAVE),
            SWITCH_AIR_CLEAN if self.air_clean_enabled(config) => Some(KEY_AIR_CLEAN),
            _ => None,
        }
    }

    fn jet_enabled(&self, config: &EffectiveConfig) -> bool {
        config.get_bool("ac_jet_control", false)
            && self.controller.has_model_feature(ModelFeature::JetMode)
    }

    fn energy_save_enabled(&self, config: &EffectiveConfig) -> bool {
        config.get_bool("ac_energy_save", true)
            && self.controller.has_model_feature(ModelFeature::EnergySaveMode)
    }

    fn air_clean_enabled(&self, config: &EffectiveConfig) -> bool {
        config.get_bool("ac_air_clean", true)
            && self.controller.has_model_feature(ModelFeature::AirClean)
    }
}

#[async_trait]
impl ApplianceDevice for AirConditioner {
    fn controller(&self) -> &DeviceController {
        &self.controller
    }

    fn controller_mut(&mut self) -> &mut DeviceController {
        &mut self.controller
    }

    fn accessory_state(&self) -> AccessoryState {
        let status = self.status();
        let config = self.controller.effective_config();
        let converter = self.converter(&config);
        let name = self.controller.name();
        let quality = status.air_quality();
        let humidity = status.humidity();

        let mut state = base_state(&self.controller)
            .with_service(self.heater_cooler(&status, &config))
            .with_service_if(config.get_bool("ac_temperature_sensor", false), || {
                ServiceState::new(ServiceKind::TemperatureSensor, format!("{} Temperature", name))
                    .with(
                        Characteristic::CurrentTemperature,
                        converter.to_universal(status.current_temperature()),
                    )
            })
            .with_service_if(
                config.get_bool("ac_humidity_sensor", false) && humidity.is_some(),
                || {
                    ServiceState::new(ServiceKind::HumiditySensor, format!("{} Humidity", name))
                        .with(
                            Characteristic::CurrentRelativeHumidity,
                            humidity.unwrap_or_default(),
                        )
                },
            )
            .with_service_if(config.get_bool("ac_fan_control", false), || {
                ServiceState::new(ServiceKind::Fanv2, format!("{} Fan", name))
                    .with(Characteristic::Active, status.is_power_on())
                    .with(Characteristic::RotationSpeed, status.wind_strength())
                    .with_range(
                        Characteristic::RotationSpeed,
                        ValueRange::new(FAN_SPEED_MIN as f64, FAN_SPEED_MAX as f64, 1.0),
                    )
            })
            .with_service_if(self.jet_enabled(&config), || {
                self.switch(SWITCH_JET, "Jet Mode", status.is_jet_on())
            })
            .with_service_if(self.controller.has_model_feature(ModelFeature::QuietMode), || {
                self.switch(SWITCH_QUIET, "Quiet Mode", status.is_quiet_on())
            })
            .with_service_if(config.get_bool("ac_led_control", false), || {
                self.switch(SWITCH_LIGHT, "Light", status.is_light_on())
            })
            .with_service_if(self.energy_save_enabled(&config), || {
                self.switch(SWITCH_ENERGY_SAVE, "Energy Save", status.is_energy_save_on())
            })
            .with_service_if(self.air_clean_enabled(&config), || {
                self.switch(SWITCH_AIR_CLEAN, "Air Purify", status.is_air_clean_on())
            });

        if let Some(quality) = quality.filter(|_| config.get_bool("ac_air_quality", false)) {
            state = state.with_service(
                ServiceState::new(ServiceKind::AirQualitySensor, format!("{} Air Quality", name))
                    .with(Characteristic::StatusFault, !quality.is_on)
                    .with(Characteristic::AirQuality, quality.overall)
                    .with(Characteristic::Pm25Density, quality.pm2)
                    .with(Characteristic::Pm10Density, quality.pm10),
            );
        }

        if let Some(life) = status.filter_life() {
            state = state.with_service(filter_service(&format!("{} Filter", name), life));
        }

        let mode = status.op_mode().map(|m| m as i64);
        for button in mode_buttons(&config) {
            let on = status.is_power_on() && mode == Some(button.op_mode);
            state = state.with_service(
                ServiceState::new(ServiceKind::Switch, button.name.clone())
                    .with_subtype(button.subtype())
                    .with(Characteristic::On, on),
            );
        }

        state
    }

    /// Ask the cloud to keep streaming monitoring data, unless the model
    /// rejects that command.
    async fn keep_alive(&mut self) -> Result<()> {
        if self.controller.has_model_feature(ModelFeature::NoMonitorTimeout)
            || !self.status().is_power_on()
        {
            return Ok(());
        }
        debug!("[Controller] [{}] Refreshing monitor timeout", self.controller.name());
        self.controller
            .set_control(KEY_MONITOR_TIMEOUT, AC_MONITOR_TIMEOUT_VALUE)
            .await?;
        Ok(())
    }

    async fn handle_command(&mut self, command: Command) -> Result<bool> {
        let value = command.value.clone();
        let subtype = command.subtype.clone();

        match (command.service, command.characteristic) {
            (ServiceKind::HeaterCooler | ServiceKind::Fanv2, Characteristic::Active) => {
                self.controller
                    .set_boolean_control(KEY_OPERATION, value.as_bool())
                    .await
            }
            (ServiceKind::HeaterCooler, Characteristic::TargetHeaterCoolerState) => {
                self.set_target_state(value.as_i64().unwrap_or(target_state::AUTO))
                    .await
            }
            (
                ServiceKind::HeaterCooler,
                Characteristic::CoolingThresholdTemperature
                | Characteristic::HeatingThresholdTemperature,
            ) => match value.as_f64() {
                Some(celsius) => self.set_target_temperature(round_half_up(celsius * 2.0) / 2.0).await,
                None => Err(unsupported(&self.controller, &command)),
            },
            (ServiceKind::HeaterCooler | ServiceKind::Fanv2, Characteristic::RotationSpeed) => {
                self.set_wind_strength(value.as_i64().unwrap_or(FAN_SPEED_MIN))
                    .await
            }
            (ServiceKind::HeaterCooler, Characteristic::SwingMode) => {
                self.set_swing(value.as_bool()).await
            }
            (ServiceKind::Switch, Characteristic::On) => {
                let subtype = subtype.unwrap_or_default();
                if subtype.starts_with(BUTTON_PREFIX) {
                    return self.set_mode_button(&command, &subtype).await;
                }
                let config = self.controller.effective_config();
                match self.switch_key(&subtype, &config) {
                    Some(key) => self.controller.set_boolean_control(key, value.as_bool()).await,
                    None => Err(unsupported(&self.controller, &command)),
                }
            }
            _ => Err(unsupported(&self.controller, &command)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessory::CharacteristicValue;
    use crate::config::{DeviceOverride, PlatformConfig, SharedConfig};
    use crate::device::{Device, Platform, Snapshot};
    use crate::error::BridgeError;
    use crate::transport::{ControlPayload, SimulatedTransport};
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    fn object(value: Value) -> Snapshot {
        value.as_object().cloned().unwrap_or_default()
    }

    fn ac_with(
        model: &str,
        snapshot: Value,
        settings: Value,
    ) -> (AirConditioner, Arc<SimulatedTransport>, SharedConfig) {
        let transport = Arc::new(SimulatedTransport::new());
        transport.insert_device("ac-1", object(snapshot.clone()));
        let config = PlatformConfig {
            devices: vec![DeviceOverride {
                id: "ac-1".into(),
                settings: object(settings),
            }],
            ..Default::default()
        }
        .into_shared();
        let device = Device::new("ac-1", "AC", Platform::ThinQ2)
            .with_name("Bedroom AC")
            .with_model(model)
            .with_snapshot_value(snapshot);
        let controller = DeviceController::new(device, transport.clone(), config.clone());
        (AirConditioner::new(controller), transport, config)
    }

    fn sent_values(transport: &SimulatedTransport) -> Vec<(String, Value)> {
        transport
            .sent()
            .into_iter()
            .filter_map(|(_, p)| p.as_value().map(|(k, v)| (k.to_string(), v.clone())))
            .collect()
    }

    #[tokio::test]
    async fn test_power_scenario() {
        let (mut ac, _, _) = ac_with("RAC_056905", json!({"airState": {"operation": 1}}), json!({}));
        assert!(ac.status().is_power_on());

        let version = ac.controller().version();
        let accepted = assert_ok!(
            ac.controller_mut()
                .dispatch_control(ControlPayload::value("airState.operation", 0))
                .await
        );
        assert!(accepted);
        assert_eq!(ac.controller().version(), version + 1);
        assert_eq!(
            Value::Object(ac.controller().device().snapshot.clone()),
            json!({"airState": {"operation": 0}})
        );
        assert!(!ac.status().is_power_on());
    }

    #[test]
    fn test_flat_snapshot_keys() {
        let (ac, _, _) = ac_with(
            "RAC_056905",
            json!({
                "airState.operation": 1,
                "airState.opMode": 4,
                "airState.tempState.current": 20,
                "airState.tempState.target": 24,
                "airState.windStrength": 9
            }),
            json!({}),
        );
        let status = ac.status();
        assert!(status.is_power_on());
        assert_eq!(status.op_mode(), Some(OperationMode::Heat));
        assert_eq!(status.wind_strength(), FAN_SPEED_MAX);

        let state = ac.accessory_state();
        let service = state.service(ServiceKind::HeaterCooler, None).unwrap();
        assert_eq!(
            service.get(Characteristic::CurrentHeaterCoolerState),
            Some(&CharacteristicValue::Int(current_state::HEATING))
        );
        assert_eq!(
            service.get(Characteristic::TargetHeaterCoolerState),
            Some(&CharacteristicValue::Int(target_state::HEAT))
        );
        assert_eq!(
            service.get(Characteristic::CoolingThresholdTemperature),
            Some(&CharacteristicValue::Float(24.0))
        );
    }

    #[test]
    fn test_missing_op_mode() {
        let (ac, _, _) = ac_with("X", json!({"airState": {"operation": 1}}), json!({}));
        assert_eq!(ac.status().op_mode(), None);
        let state = ac.accessory_state();
        let service = state.service(ServiceKind::HeaterCooler, None).unwrap();
        assert_eq!(
            service.get(Characteristic::CurrentHeaterCoolerState),
            Some(&CharacteristicValue::Int(current_state::IDLE))
        );
    }

    #[test]
    fn test_cooling_only_mode() {
        let (ac, _, _) = ac_with(
            "X",
            json!({"airState": {"operation": 1, "opMode": 6}}),
            json!({"ac_mode": "COOLING"}),
        );
        let state = ac.accessory_state();
        let service = state.service(ServiceKind::HeaterCooler, None).unwrap();
        assert_eq!(
            service.get(Characteristic::TargetHeaterCoolerState),
            Some(&CharacteristicValue::Int(target_state::COOL))
        );
        assert_eq!(
            service.range(Characteristic::TargetHeaterCoolerState),
            Some(ValueRange::new(2.0, 2.0, 1.0))
        );
    }

    #[tokio::test]
    async fn test_fahrenheit_conversion() {
        let (mut ac, transport, _) = ac_with(
            "X",
            json!({"airState": {"tempState": {"current": 72, "target": 70}}}),
            json!({"ac_temperature_unit": "F"}),
        );
        let state = ac.accessory_state();
        let service = state.service(ServiceKind::HeaterCooler, None).unwrap();
        assert_eq!(
            service.get(Characteristic::CurrentTemperature),
            Some(&CharacteristicValue::Float(22.22))
        );
        assert_eq!(
            service.get(Characteristic::TemperatureDisplayUnits),
            Some(&CharacteristicValue::Int(1))
        );

        assert_ok!(
            ac.handle_command(Command::new(
                ServiceKind::HeaterCooler,
                Characteristic::CoolingThresholdTemperature,
                22.0
            ))
            .await
        );
        assert_eq!(
            sent_values(&transport),
            vec![("airState.tempState.target".to_string(), json!(72))]
        );
    }

    #[test]
    fn test_feature_gated_switches() {
        let settings = json!({"ac_jet_control": true, "ac_led_control": true});

        let (ac, _, _) = ac_with("RAC_056905", json!({}), settings.clone());
        let state = ac.accessory_state();
        assert!(state.has_service(ServiceKind::Switch, Some(SWITCH_JET)));
        assert!(state.has_service(ServiceKind::Switch, Some(SWITCH_LIGHT)));
        assert!(state.has_service(ServiceKind::Switch, Some(SWITCH_AIR_CLEAN)));
        assert!(state.has_service(ServiceKind::Switch, Some(SWITCH_ENERGY_SAVE)));
        assert!(!state.has_service(ServiceKind::Switch, Some(SWITCH_QUIET)));

        let (ac, _, _) = ac_with("WINF_056905", json!({}), settings);
        let state = ac.accessory_state();
        assert!(!state.has_service(ServiceKind::Switch, Some(SWITCH_JET)));
        assert!(state.has_service(ServiceKind::Switch, Some(SWITCH_QUIET)));
        assert!(state.has_service(ServiceKind::Switch, Some(SWITCH_ENERGY_SAVE)));
        assert!(!state.has_service(ServiceKind::Switch, Some(SWITCH_AIR_CLEAN)));
    }

    #[test]
    fn test_config_changes_layout() {
        let (ac, _, config) = ac_with(
            "X",
            json!({"airState": {"humidity": {"current": 455}, "quality": {"overall": 1}}}),
            json!({}),
        );
        let before = ac.accessory_state();
        assert!(!before.has_service(ServiceKind::HumiditySensor, None));
        assert!(!before.has_service(ServiceKind::AirQualitySensor, None));

        config.write().devices[0].settings = object(json!({
            "ac_humidity_sensor": true,
            "ac_air_quality": true,
            "ac_temperature_sensor": true
        }));
        let after = ac.accessory_state();
        let humidity = after.service(ServiceKind::HumiditySensor, None).unwrap();
        assert_eq!(
            humidity.get(Characteristic::CurrentRelativeHumidity),
            Some(&CharacteristicValue::Float(45.5))
        );
        assert!(after.has_service(ServiceKind::AirQualitySensor, None));
        assert!(after.has_service(ServiceKind::TemperatureSensor, None));
        assert_ne!(before.layout_hash(), after.layout_hash());
    }

    #[tokio::test]
    async fn test_switch_commands() {
        let (mut ac, transport, _) =
            ac_with("RAC_056905", json!({}), json!({"ac_jet_control": true}));
        assert_ok!(
            ac.handle_command(
                Command::new(ServiceKind::Switch, Characteristic::On, true).with_subtype(SWITCH_JET)
            )
            .await
        );
        let error = assert_err!(
            ac.handle_command(
                Command::new(ServiceKind::Switch, Characteristic::On, true)
                    .with_subtype(SWITCH_QUIET)
            )
            .await
        );
        assert!(matches!(error, BridgeError::UnsupportedCommand { .. }));
        assert_eq!(
            sent_values(&transport),
            vec![("airState.wMode.jet".to_string(), json!(1))]
        );
        assert!(ac.status().is_jet_on());
    }

    #[tokio::test]
    async fn test_swing_follows_setting() {
        let (mut ac, transport, config) = ac_with("X", json!({}), json!({}));
        assert_ok!(
            ac.handle_command(Command::new(ServiceKind::HeaterCooler, Characteristic::SwingMode, 1i64))
                .await
        );
        assert_eq!(
            sent_values(&transport),
            vec![
                ("airState.wDir.vStep".to_string(), json!("100")),
                ("airState.wDir.hStep".to_string(), json!("100")),
            ]
        );
        assert!(ac.status().is_vertical_swing_on());

        config.write().devices[0].settings = object(json!({"ac_swing_mode": "VERTICAL"}));
        assert_ok!(
            ac.handle_command(Command::new(ServiceKind::HeaterCooler, Characteristic::SwingMode, 0i64))
                .await
        );
        assert_eq!(sent_values(&transport).len(), 3);
    }

    #[tokio::test]
    async fn test_mode_buttons() {
        let (mut ac, transport, _) = ac_with(
            "X",
            json!({"airState": {"operation": 0, "opMode": 0}}),
            json!({"ac_buttons": [{"name": "Dry", "op_mode": 1}, {"broken": true}]}),
        );
        let state = ac.accessory_state();
        let button = state.service(ServiceKind::Switch, Some("button-1")).unwrap();
        assert_eq!(button.name, "Dry");

        assert_ok!(
            ac.handle_command(
                Command::new(ServiceKind::Switch, Characteristic::On, true).with_subtype("button-1")
            )
            .await
        );
        assert_eq!(
            sent_values(&transport),
            vec![
                ("airState.operation".to_string(), json!(1)),
                ("airState.opMode".to_string(), json!(1)),
            ]
        );
        let state = ac.accessory_state();
        let button = state.service(ServiceKind::Switch, Some("button-1")).unwrap();
        assert_eq!(button.get(Characteristic::On), Some(&CharacteristicValue::Bool(true)));
    }

    #[tokio::test]
    async fn test_keep_alive_respects_model_table() {
        let (mut ac, transport, _) = ac_with("RAC_056905", json!({"airState": {"operation": 1}}), json!({}));
        assert_ok!(ac.keep_alive().await);
        assert!(transport.sent().is_empty());

        let (mut ac, transport, _) = ac_with("OTHER", json!({"airState": {"operation": 1}}), json!({}));
        assert_ok!(ac.keep_alive().await);
        assert_eq!(
            sent_values(&transport),
            vec![("airState.mon.timeout".to_string(), json!("70"))]
        );
    }
}

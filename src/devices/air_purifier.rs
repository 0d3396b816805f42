//! Air purifier and the AeroTower purifier/fan combination.

use super::{ApplianceDevice, base_state, filter_service, unsupported};
use crate::accessory::{
    AccessoryState, Characteristic, Command, ServiceKind, ServiceState, ValueRange,
};
use crate::controller::DeviceController;
use crate::error::Result;
use crate::status::{AirQuality, StatusData, StatusScope, StatusView};
use async_trait::async_trait;
use std::sync::Arc;

pub const AIR_PURIFIER_NORMAL_MODE: i64 = 14;
pub const AIR_PURIFIER_AUTO_MODE: i64 = 16;

const KEY_OPERATION: &str = "airState.operation";
const KEY_OP_MODE: &str = "airState.opMode";
const KEY_WIND_STRENGTH: &str = "airState.windStrength";
const KEY_AIR_FAST: &str = "airState.wMode.airFast";
const KEY_FILTER_USED: &str = "airState.filterMngStates.useTime";
const KEY_FILTER_MAX: &str = "airState.filterMngStates.maxTime";
const KEY_LIGHT: &str = "airState.lightingState.displayControl";
const KEY_TEMPERATURE: &str = "airState.tempState.current";
const KEY_HUMIDITY: &str = "airState.humidity.current";

const SWITCH_AIR_FAST: &str = "AirFast";

/// Purifier wind strengths span 1 (low) to 8 (turbo).
const WIND_STRENGTH_RANGE: ValueRange = ValueRange {
    min: 1.0,
    max: 8.0,
    step: 1.0,
};

pub struct AirPurifierStatus {
    data: StatusData,
}

impl StatusView for AirPurifierStatus {
    const SCOPE: StatusScope = StatusScope::Root;

    fn from_data(data: StatusData) -> Self {
        Self { data }
    }
}

impl AirPurifierStatus {
    pub fn is_power_on(&self) -> bool {
        self.data.get_boolean(KEY_OPERATION, false)
    }

    pub fn is_auto_mode(&self) -> bool {
        self.data.get_int(KEY_OP_MODE, AIR_PURIFIER_NORMAL_MODE) == AIR_PURIFIER_AUTO_MODE
    }

    pub fn wind_strength(&self) -> i64 {
        self.data.get_int(KEY_WIND_STRENGTH, 1)
    }

    pub fn is_air_fast_on(&self) -> bool {
        self.data.get_boolean(KEY_AIR_FAST, false)
    }

    pub fn air_quality(&self) -> Option<AirQuality> {
        self.data.get_air_quality_data(self.is_power_on())
    }

    pub fn filter_life(&self) -> Option<i64> {
        self.data
            .has_property(KEY_FILTER_MAX)
            .then(|| self.data.get_filter_life_percent(KEY_FILTER_USED, KEY_FILTER_MAX))
    }

    pub fn is_light_on(&self) -> bool {
        self.data.get_boolean(KEY_LIGHT, false)
    }

    pub fn temperature(&self) -> Option<f64> {
        self.data
            .get_value(KEY_TEMPERATURE)
            .map(|_| self.data.get_float(KEY_TEMPERATURE, 0.0))
    }

    pub fn humidity(&self) -> Option<f64> {
        self.data
            .get_value(KEY_HUMIDITY)
            .map(|_| self.data.get_float(KEY_HUMIDITY, 0.0))
    }
}

pub struct AirPurifier {
    controller: DeviceController,
}

impl AirPurifier {
    pub fn new(controller: DeviceController) -> Self {
        Self { controller }
    }

    pub fn status(&self) -> Arc<AirPurifierStatus> {
        self.controller.status()
    }
}

fn purifier_state(controller: &DeviceController, status: &AirPurifierStatus) -> AccessoryState {
    let name = controller.name();
    let config = controller.effective_config();

    let mut state = base_state(controller)
        .with_service(
            ServiceState::new(ServiceKind::AirPurifier, name)
                .with(Characteristic::Active, status.is_power_on())
                .with(
                    Characteristic::CurrentAirPurifierState,
                    if status.is_power_on() { 2i64 } else { 0 },
                )
                .with(Characteristic::TargetAirPurifierState, i64::from(status.is_auto_mode()))
                .with(Characteristic::RotationSpeed, status.wind_strength())
                .with_range(Characteristic::RotationSpeed, WIND_STRENGTH_RANGE),
        )
        .with_service_if(config.get_bool("air_fast_mode", false), || {
            ServiceState::new(ServiceKind::Switch, format!("{} Air Fast", name))
                .with_subtype(SWITCH_AIR_FAST)
                .with(Characteristic::On, status.is_air_fast_on())
        });

    if let Some(life) = status.filter_life() {
        state = state.with_service(filter_service(&format!("{} Filter", name), life));
    }
    if let Some(quality) = status.air_quality() {
        state = state.with_service(
            ServiceState::new(ServiceKind::AirQualitySensor, format!("{} Air Quality", name))
                .with(Characteristic::StatusFault, !quality.is_on)
                .with(Characteristic::AirQuality, quality.overall)
                .with(Characteristic::Pm25Density, quality.pm2)
                .with(Characteristic::Pm10Density, quality.pm10),
        );
    }
    state
}

async fn purifier_command(controller: &mut DeviceController, command: &Command) -> Result<bool> {
    let value = &command.value;
    match (command.service, command.characteristic, command.subtype.as_deref()) {
        (ServiceKind::AirPurifier, Characteristic::Active, _) => {
            controller.set_boolean_control(KEY_OPERATION, value.as_bool()).await
        }
        (ServiceKind::AirPurifier, Characteristic::TargetAirPurifierState, _) => {
            let mode = if value.as_bool() {
                AIR_PURIFIER_AUTO_MODE
            } else {
                AIR_PURIFIER_NORMAL_MODE
            };
            controller.set_control(KEY_OP_MODE, mode).await
        }
        (ServiceKind::AirPurifier, Characteristic::RotationSpeed, _) => {
            let speed = value
                .as_i64()
                .unwrap_or(1)
                .clamp(WIND_STRENGTH_RANGE.min as i64, WIND_STRENGTH_RANGE.max as i64);
            controller.set_control(KEY_WIND_STRENGTH, speed).await
        }
        (ServiceKind::Switch, Characteristic::On, Some(SWITCH_AIR_FAST))
            if controller.effective_config().get_bool("air_fast_mode", false) =>
        {
            controller.set_boolean_control(KEY_AIR_FAST, value.as_bool()).await
        }
        _ => Err(unsupported(controller, command)),
    }
}

#[async_trait]
impl ApplianceDevice for AirPurifier {
    fn controller(&self) -> &DeviceController {
        &self.controller
    }

    fn controller_mut(&mut self) -> &mut DeviceController {
        &mut self.controller
    }

    fn accessory_state(&self) -> AccessoryState {
        purifier_state(&self.controller, &self.status())
    }

    async fn handle_command(&mut self, command: Command) -> Result<bool> {
        purifier_command(&mut self.controller, &command).await
    }
}

/// Purifier tower with a display light and climate sensors.
pub struct AeroTower {
    controller: DeviceController,
}

impl AeroTower {
    pub fn new(controller: DeviceController) -> Self {
        Self { controller }
    }

    pub fn status(&self) -> Arc<AirPurifierStatus> {
        self.controller.status()
    }
}

#[async_trait]
impl ApplianceDevice for AeroTower {
    fn controller(&self) -> &DeviceController {
        &self.controller
    }

    fn controller_mut(&mut self) -> &mut DeviceController {
        &mut self.controller
    }

    fn accessory_state(&self) -> AccessoryState {
        let status = self.status();
        let name = self.controller.name();

        let mut state = purifier_state(&self.controller, &status).with_service(
            ServiceState::new(ServiceKind::Lightbulb, format!("{} Light", name))
                .with_subtype("Light")
                .with(Characteristic::On, status.is_light_on()),
        );
        if let Some(temperature) = status.temperature() {
            state = state.with_service(
                ServiceState::new(ServiceKind::TemperatureSensor, format!("{} Temperature", name))
                    .with(Characteristic::CurrentTemperature, temperature),
            );
        }
        if let Some(humidity) = status.humidity() {
            state = state.with_service(
                ServiceState::new(ServiceKind::HumiditySensor, format!("{} Humidity", name))
                    .with(Characteristic::CurrentRelativeHumidity, humidity),
            );
        }
        state
    }

    async fn handle_command(&mut self, command: Command) -> Result<bool> {
        if command.service == ServiceKind::Lightbulb && command.characteristic == Characteristic::On {
            return self
                .controller
                .set_boolean_control(KEY_LIGHT, command.value.as_bool())
                .await;
        }
        purifier_command(&mut self.controller, &command).await
    }
}

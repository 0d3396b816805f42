//! Ovens and over-the-range microwaves.
//!
//! Cooking cannot be started or adjusted remotely, so the thermostat service
//! is read-only. Microwaves additionally expose the vent fan and cooktop lamp,
//! which are controllable.

use super::{ApplianceDevice, base_state, unsupported};
use crate::accessory::{
    AccessoryState, Characteristic, Command, ServiceKind, ServiceState, ValueRange,
};
use crate::controller::DeviceController;
use crate::error::Result;
use crate::status::{ApplianceStatus, StatusData, StatusView};
use crate::temperature::TemperatureUnit;
use async_trait::async_trait;
use log::debug;
use std::str::FromStr;
use std::sync::Arc;

const COOKING_STATES: &[&str] = &["COOKING", "PREHEATING", "PREHEAT_COMPLETE"];
const IDLE_STATES: &[&str] = &["POWEROFF", "INITIAL"];

/// Oven cavity range exposed to the host, in Celsius.
const CAVITY_RANGE: ValueRange = ValueRange {
    min: 0.0,
    max: 300.0,
    step: 1.0,
};

const MICROWAVE_KEY: &str = "microwaveState";
const VENT_MAX: i64 = 5;
const LAMP_MAX: i64 = 2;

pub struct CookingStatus {
    data: StatusData,
}

impl StatusView for CookingStatus {
    fn from_data(data: StatusData) -> Self {
        Self { data }
    }
}

impl ApplianceStatus for CookingStatus {
    fn data(&self) -> &StatusData {
        &self.data
    }

    fn is_power_on(&self) -> bool {
        !IDLE_STATES.contains(&self.state().as_str())
    }

    fn is_running(&self) -> bool {
        COOKING_STATES.contains(&self.state().as_str())
    }
}

impl CookingStatus {
    pub fn state(&self) -> String {
        self.data.get_string("state", "POWEROFF")
    }

    pub fn unit(&self) -> TemperatureUnit {
        TemperatureUnit::from_str(&self.data.get_string("tempUnit", "CELSIUS")).unwrap_or_default()
    }

    pub fn current_temperature(&self) -> f64 {
        self.data.get_float("currentTemperatureValue", 0.0)
    }

    pub fn target_temperature(&self) -> f64 {
        self.data.get_float("targetTemperatureValue", 0.0)
    }

    pub fn vent_speed(&self) -> i64 {
        self.data.get_int("ventSpeed", 0)
    }

    pub fn lamp_level(&self) -> i64 {
        self.data.get_int("lampLevel", 0)
    }
}

fn thermostat(controller: &DeviceController, status: &CookingStatus) -> ServiceState {
    let converter = controller.temperature_converter(status.unit());
    let heating = i64::from(status.is_running());
    let target = converter
        .to_universal(status.target_temperature())
        .clamp(CAVITY_RANGE.min, CAVITY_RANGE.max);

    ServiceState::new(ServiceKind::Thermostat, controller.name())
        .with(Characteristic::CurrentHeatingCoolingState, heating)
        .with(Characteristic::TargetHeatingCoolingState, i64::from(status.is_power_on()))
        .with(
            Characteristic::CurrentTemperature,
            converter.to_universal(status.current_temperature()),
        )
        .with(Characteristic::TargetTemperature, target)
        .with_range(Characteristic::TargetTemperature, CAVITY_RANGE)
        .with(Characteristic::TemperatureDisplayUnits, i64::from(converter.is_fahrenheit()))
}

fn decline_thermostat_write(controller: &DeviceController, command: &Command) -> Result<bool> {
    if command.service == ServiceKind::Thermostat {
        debug!(
            "[Controller] [{}] Cooking is read-only, ignoring {}",
            controller.name(),
            command.describe()
        );
        return Ok(false);
    }
    Err(unsupported(controller, command))
}

pub struct Oven {
    controller: DeviceController,
}

impl Oven {
    pub fn new(controller: DeviceController) -> Self {
        Self { controller }
    }

    pub fn status(&self) -> Arc<CookingStatus> {
        self.controller.status()
    }
}

#[async_trait]
impl ApplianceDevice for Oven {
    fn controller(&self) -> &DeviceController {
        &self.controller
    }

    fn controller_mut(&mut self) -> &mut DeviceController {
        &mut self.controller
    }

    fn accessory_state(&self) -> AccessoryState {
        base_state(&self.controller).with_service(thermostat(&self.controller, &self.status()))
    }

    async fn handle_command(&mut self, command: Command) -> Result<bool> {
        decline_thermostat_write(&self.controller, &command)
    }
}

pub struct Microwave {
    controller: DeviceController,
}

impl Microwave {
    pub fn new(controller: DeviceController) -> Self {
        Self { controller }
    }

    pub fn status(&self) -> Arc<CookingStatus> {
        self.controller.status()
    }

    async fn set_level(&mut self, field: &str, level: i64, max: i64) -> Result<bool> {
        let key = format!("{}.{}", MICROWAVE_KEY, field);
        self.controller.set_control(&key, level.clamp(0, max)).await
    }
}

#[async_trait]
impl ApplianceDevice for Microwave {
    fn controller(&self) -> &DeviceController {
        &self.controller
    }

    fn controller_mut(&mut self) -> &mut DeviceController {
        &mut self.controller
    }

    fn accessory_state(&self) -> AccessoryState {
        let status = self.status();
        let name = self.controller.name();

        base_state(&self.controller)
            .with_service(thermostat(&self.controller, &status))
            .with_service(
                ServiceState::new(ServiceKind::Fan, format!("{} Vent", name))
                    .with_subtype("Vent")
                    .with(Characteristic::On, status.vent_speed() > 0)
                    .with(Characteristic::RotationSpeed, status.vent_speed())
                    .with_range(
                        Characteristic::RotationSpeed,
                        ValueRange::new(0.0, VENT_MAX as f64, 1.0),
                    ),
            )
            .with_service(
                ServiceState::new(ServiceKind::Lightbulb, format!("{} Lamp", name))
                    .with_subtype("Lamp")
                    .with(Characteristic::On, status.lamp_level() > 0)
                    .with(Characteristic::Brightness, status.lamp_level())
                    .with_range(
                        Characteristic::Brightness,
                        ValueRange::new(0.0, LAMP_MAX as f64, 1.0),
                    ),
            )
    }

    async fn handle_command(&mut self, command: Command) -> Result<bool> {
        let on = i64::from(command.value.as_bool());
        let level = command.value.as_i64().unwrap_or(0);

        match (command.service, command.characteristic) {
            (ServiceKind::Fan, Characteristic::On) => self.set_level("ventSpeed", on, VENT_MAX).await,
            (ServiceKind::Fan, Characteristic::RotationSpeed) => {
                self.set_level("ventSpeed", level, VENT_MAX).await
            }
            (ServiceKind::Lightbulb, Characteristic::On) => {
                self.set_level("lampLevel", on, LAMP_MAX).await
            }
            (ServiceKind::Lightbulb, Characteristic::Brightness) => {
                self.set_level("lampLevel", level, LAMP_MAX).await
            }
            _ => decline_thermostat_write(&self.controller, &command),
        }
    }
}

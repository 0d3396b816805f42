//! Dehumidifier.

use super::{ApplianceDevice, base_state, unsupported};
use crate::accessory::{
    AccessoryState, Characteristic, Command, ServiceKind, ServiceState, ValueRange,
};
use crate::controller::DeviceController;
use crate::error::Result;
use crate::status::{StatusData, StatusView};
use async_trait::async_trait;
use std::sync::Arc;

const KEY_OPERATION: &str = "dehumidifierState.operation";
const KEY_TARGET_HUMIDITY: &str = "dehumidifierState.humidity.desired";
const KEY_WIND_STRENGTH: &str = "dehumidifierState.windStrength";

/// Model-info field describing the target humidity range.
const FIELD_TARGET_HUMIDITY: &str = "humidity.desired";

/// HomeKit dehumidifier states.
mod dehumidifier_state {
    pub const INACTIVE: i64 = 0;
    pub const IDLE: i64 = 1;
    pub const DEHUMIDIFYING: i64 = 3;
    /// Target state: dehumidifier only.
    pub const TARGET_DEHUMIDIFIER: i64 = 2;
}

const DEFAULT_HUMIDITY_RANGE: ValueRange = ValueRange {
    min: 30.0,
    max: 70.0,
    step: 5.0,
};

pub struct DehumidifierStatus {
    data: StatusData,
}

impl StatusView for DehumidifierStatus {
    fn from_data(data: StatusData) -> Self {
        Self { data }
    }
}

impl DehumidifierStatus {
    pub fn is_power_on(&self) -> bool {
        self.data.get_boolean("operation", false)
    }

    pub fn current_humidity(&self) -> i64 {
        self.data.get_int("humidity.current", 0)
    }

    pub fn target_humidity(&self) -> i64 {
        self.data.get_int("humidity.desired", 0)
    }

    pub fn wind_strength(&self) -> i64 {
        self.data.get_int("windStrength", 0)
    }

    pub fn is_water_tank_full(&self) -> bool {
        self.data.get_boolean("waterTankFull", false)
    }

    pub fn current_state(&self) -> i64 {
        if !self.is_power_on() {
            dehumidifier_state::INACTIVE
        } else if self.current_humidity() > self.target_humidity() {
            dehumidifier_state::DEHUMIDIFYING
        } else {
            dehumidifier_state::IDLE
        }
    }
}

pub struct Dehumidifier {
    controller: DeviceController,
}

impl Dehumidifier {
    pub fn new(controller: DeviceController) -> Self {
        Self { controller }
    }

    pub fn status(&self) -> Arc<DehumidifierStatus> {
        self.controller.status()
    }

    fn humidity_range(&self) -> ValueRange {
        self.controller
            .device()
            .schema
            .value(FIELD_TARGET_HUMIDITY)
            .as_ref()
            .and_then(ValueRange::from_spec)
            .unwrap_or(DEFAULT_HUMIDITY_RANGE)
    }
}

#[async_trait]
impl ApplianceDevice for Dehumidifier {
    fn controller(&self) -> &DeviceController {
        &self.controller
    }

    fn controller_mut(&mut self) -> &mut DeviceController {
        &mut self.controller
    }

    fn accessory_state(&self) -> AccessoryState {
        let status = self.status();
        base_state(&self.controller).with_service(
            ServiceState::new(ServiceKind::HumidifierDehumidifier, self.controller.name())
                .with(Characteristic::Active, status.is_power_on())
                .with(Characteristic::CurrentHumidifierDehumidifierState, status.current_state())
                .with(
                    Characteristic::TargetHumidifierDehumidifierState,
                    dehumidifier_state::TARGET_DEHUMIDIFIER,
                )
                .with(Characteristic::CurrentRelativeHumidity, status.current_humidity())
                .with(
                    Characteristic::RelativeHumidityDehumidifierThreshold,
                    status.target_humidity(),
                )
                .with_range(
                    Characteristic::RelativeHumidityDehumidifierThreshold,
                    self.humidity_range(),
                )
                .with(Characteristic::RotationSpeed, status.wind_strength())
                .with(
                    Characteristic::WaterLevel,
                    if status.is_water_tank_full() { 100i64 } else { 0 },
                ),
        )
    }

    async fn handle_command(&mut self, command: Command) -> Result<bool> {
        if command.service != ServiceKind::HumidifierDehumidifier {
            return Err(unsupported(&self.controller, &command));
        }

        match command.characteristic {
            Characteristic::Active => {
                self.controller
                    .set_boolean_control(KEY_OPERATION, command.value.as_bool())
                    .await
            }
            Characteristic::RelativeHumidityDehumidifierThreshold => {
                let range = self.humidity_range();
                let target = command
                    .value
                    .as_f64()
                    .unwrap_or(range.min)
                    .clamp(range.min, range.max);
                self.controller
                    .set_control(KEY_TARGET_HUMIDITY, target.round() as i64)
                    .await
            }
            Characteristic::RotationSpeed => {
                let speed = command.value.as_i64().unwrap_or(0);
                self.controller.set_control(KEY_WIND_STRENGTH, speed).await
            }
            // Only dehumidify mode exists; nothing to send.
            Characteristic::TargetHumidifierDehumidifierState => Ok(true),
            _ => Err(unsupported(&self.controller, &command)),
        }
    }
}

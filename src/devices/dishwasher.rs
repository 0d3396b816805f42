//! Dishwasher.

use super::{ApplianceDevice, base_state, cycle_valve, decline_valve_write, filter_service};
use crate::accessory::{AccessoryState, Characteristic, Command, ServiceKind, ServiceState};
use crate::controller::DeviceController;
use crate::error::Result;
use crate::status::{ApplianceStatus, StatusData, StatusView};
use async_trait::async_trait;
use std::sync::Arc;

/// Rinse aid reservoir levels reported as filter life.
pub const RINSE_LEVEL_EMPTY: i64 = 0;
pub const RINSE_LEVEL_LOW: i64 = 50;
pub const RINSE_LEVEL_FULL: i64 = 100;

pub struct DishwasherStatus {
    data: StatusData,
}

impl StatusView for DishwasherStatus {
    fn from_data(data: StatusData) -> Self {
        Self { data }
    }
}

impl ApplianceStatus for DishwasherStatus {
    fn data(&self) -> &StatusData {
        &self.data
    }

    fn is_power_on(&self) -> bool {
        self.state() != "POWEROFF"
    }

    fn is_running(&self) -> bool {
        self.state() == "RUNNING"
    }
}

impl DishwasherStatus {
    pub fn state(&self) -> String {
        self.data.get_string("state", "POWEROFF")
    }

    pub fn is_door_open(&self) -> bool {
        self.data.get_string("door", "CLOSE") == "OPEN"
    }

    pub fn is_finished(&self) -> bool {
        self.state() == "END"
    }

    pub fn rinse_level(&self) -> i64 {
        match self.data.get_string("rinseLevel", "LEVEL_2").as_str() {
            "LEVEL_0" => RINSE_LEVEL_EMPTY,
            "LEVEL_1" => RINSE_LEVEL_LOW,
            _ => RINSE_LEVEL_FULL,
        }
    }
}

pub struct Dishwasher {
    controller: DeviceController,
}

impl Dishwasher {
    pub fn new(controller: DeviceController) -> Self {
        Self { controller }
    }

    pub fn status(&self) -> Arc<DishwasherStatus> {
        self.controller.status()
    }
}

#[async_trait]
impl ApplianceDevice for Dishwasher {
    fn controller(&self) -> &DeviceController {
        &self.controller
    }

    fn controller_mut(&mut self) -> &mut DeviceController {
        &mut self.controller
    }

    fn accessory_state(&self) -> AccessoryState {
        let status = self.status();
        let name = self.controller.name();
        let config = self.controller.effective_config();

        base_state(&self.controller)
            .with_service(cycle_valve(name, &*status))
            .with_service(
                ServiceState::new(ServiceKind::ContactSensor, format!("{} Door", name))
                    .with_subtype("Door")
                    .with(Characteristic::ContactSensorState, i64::from(status.is_door_open())),
            )
            .with_service(filter_service(
                &format!("{} Rinse Aid", name),
                status.rinse_level(),
            ))
            .with_service_if(config.get_bool("dishwasher_trigger", false), || {
                ServiceState::new(ServiceKind::OccupancySensor, format!("{} Finished", name))
                    .with_subtype("Finished")
                    .with(Characteristic::OccupancyDetected, status.is_finished())
            })
    }

    async fn handle_command(&mut self, command: Command) -> Result<bool> {
        decline_valve_write(&self.controller, &command)
    }
}

//! Range hood: vent fan plus lamp.

use super::{ApplianceDevice, base_state, unsupported};
use crate::accessory::{
    AccessoryState, Characteristic, Command, ServiceKind, ServiceState, ValueRange,
};
use crate::controller::DeviceController;
use crate::error::Result;
use crate::status::{StatusData, StatusView};
use crate::transport::ControlPayload;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

pub const LAMP_OFF: i64 = 0;
pub const LAMP_LOW: i64 = 1;
pub const LAMP_HIGH: i64 = 2;

const ENABLED_LABEL: &str = "@CP_ENABLE_W";

/// Status of the `hoodState` sub-tree.
pub struct RangeHoodStatus {
    data: StatusData,
}

impl StatusView for RangeHoodStatus {
    fn from_data(data: StatusData) -> Self {
        Self { data }
    }
}

impl RangeHoodStatus {
    pub fn is_vent_on(&self) -> bool {
        self.data.matches_monitor_name("ventSet", "VentSet", ENABLED_LABEL)
    }

    pub fn is_lamp_on(&self) -> bool {
        self.data.matches_monitor_name("lampSet", "LampSet", ENABLED_LABEL)
    }

    pub fn vent_level(&self) -> i64 {
        self.data.get_int("ventLevel", 0)
    }

    pub fn lamp_level(&self) -> i64 {
        self.data.get_int("lampLevel", 0)
    }
}

pub struct RangeHood {
    controller: DeviceController,
}

impl RangeHood {
    pub fn new(controller: DeviceController) -> Self {
        Self { controller }
    }

    pub fn status(&self) -> Arc<RangeHoodStatus> {
        self.controller.status()
    }

    fn range(&self, field: &str) -> Option<ValueRange> {
        self.controller
            .device()
            .schema
            .value(field)
            .as_ref()
            .and_then(ValueRange::from_spec)
    }

    async fn set_hood_state(&mut self, field: &str, level: i64) -> Result<bool> {
        let payload = ControlPayload::set_list(json!({ "hoodState": { field: level } }));
        self.controller.dispatch_control(payload).await
    }
}

#[async_trait]
impl ApplianceDevice for RangeHood {
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
            .with_service(
                ServiceState::new(ServiceKind::Fan, name)
                    .with(Characteristic::On, status.is_vent_on())
                    .with(Characteristic::RotationSpeed, status.vent_level())
                    .with_optional_range(Characteristic::RotationSpeed, self.range("VentLevel")),
            )
            .with_service(
                ServiceState::new(ServiceKind::Lightbulb, format!("{} - Light", name))
                    .with_subtype("Light")
                    .with(Characteristic::On, status.is_lamp_on())
                    .with(Characteristic::Brightness, status.lamp_level())
                    .with_optional_range(Characteristic::Brightness, self.range("LampLevel")),
            )
    }

    async fn handle_command(&mut self, command: Command) -> Result<bool> {
        let level = command.value.as_i64().unwrap_or(0);
        let on = if command.value.as_bool() { LAMP_LOW } else { LAMP_OFF };

        match (command.service, command.characteristic) {
            (ServiceKind::Fan, Characteristic::On) => self.set_hood_state("ventLevel", on).await,
            (ServiceKind::Fan, Characteristic::RotationSpeed) => {
                self.set_hood_state("ventLevel", level).await
            }
            (ServiceKind::Lightbulb, Characteristic::On) => {
                self.set_hood_state("lampLevel", on).await
            }
            (ServiceKind::Lightbulb, Characteristic::Brightness) => {
                self.set_hood_state("lampLevel", level.clamp(LAMP_OFF, LAMP_HIGH)).await
            }
            _ => Err(unsupported(&self.controller, &command)),
        }
    }
}

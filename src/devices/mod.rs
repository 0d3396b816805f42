//! Appliance implementations.
//!
//! Each implementation wraps a [`DeviceController`], projects its status views
//! into an [`AccessoryState`] and turns host [`Command`]s into control
//! dispatches. Which implementation serves a device is decided by the registry.

mod air_conditioner;
mod air_purifier;
mod cooking;
mod dehumidifier;
mod dishwasher;
pub mod legacy;
mod range_hood;
mod refrigerator;
mod styler;
mod washer_dryer;

pub use air_conditioner::{AirConditioner, AirConditionerStatus};
pub use air_purifier::{AeroTower, AirPurifier, AirPurifierStatus};
pub use cooking::{CookingStatus, Microwave, Oven};
pub use dehumidifier::{Dehumidifier, DehumidifierStatus};
pub use dishwasher::{Dishwasher, DishwasherStatus};
pub use range_hood::{RangeHood, RangeHoodStatus};
pub use refrigerator::{Refrigerator, RefrigeratorStatus};
pub use styler::{Styler, StylerStatus};
pub use washer_dryer::{WasherDryer, WasherDryer2, WasherDryerStatus};

use crate::accessory::{AccessoryState, Characteristic, Command, ServiceKind, ServiceState};
use crate::controller::DeviceController;
use crate::device::Device;
use crate::error::{BridgeError, Result};
use crate::status::ApplianceStatus;
use async_trait::async_trait;
use log::debug;

/// Used filter share (percent) at which a filter change is requested.
pub const FILTER_CHANGE_THRESHOLD_PERCENT: i64 = 95;

/// One appliance as seen by the host.
#[async_trait]
pub trait ApplianceDevice: Send + Sync {
    fn controller(&self) -> &DeviceController;

    fn controller_mut(&mut self) -> &mut DeviceController;

    /// Current accessory projection.
    fn accessory_state(&self) -> AccessoryState;

    /// Remote snapshot refresh.
    fn update(&mut self, device: Device) {
        self.controller_mut().attach_snapshot(device);
    }

    /// Periodic housekeeping after a refresh.
    async fn keep_alive(&mut self) -> Result<()> {
        Ok(())
    }

    /// Apply a host write. `Ok(false)` means the device did not take it.
    async fn handle_command(&mut self, command: Command) -> Result<bool>;
}

/// Error for a command the device does not expose.
pub(crate) fn unsupported(controller: &DeviceController, command: &Command) -> BridgeError {
    BridgeError::UnsupportedCommand {
        device: controller.name().to_string(),
        command: command.describe(),
    }
}

/// Accessory skeleton: name, category and the information service.
pub(crate) fn base_state(controller: &DeviceController) -> AccessoryState {
    AccessoryState::new(controller.name(), controller.category())
        .with_service(controller.information_service())
}

/// Valve service used by cycle appliances (washers, dryers, stylers, dishwashers).
pub(crate) fn cycle_valve(name: &str, status: &impl ApplianceStatus) -> ServiceState {
    ServiceState::new(ServiceKind::Valve, name)
        .with(Characteristic::Active, status.is_power_on())
        .with(Characteristic::InUse, status.is_running())
        .with(Characteristic::ValveType, 0i64)
        .with(Characteristic::RemainingDuration, status.remain_duration())
}

/// Cycle appliances cannot be started remotely; power writes are declined.
pub(crate) fn decline_valve_write(controller: &DeviceController, command: &Command) -> Result<bool> {
    match (command.service, command.characteristic) {
        (ServiceKind::Valve, Characteristic::Active) => {
            debug!(
                "[Controller] [{}] Ignoring remote {} write",
                controller.name(),
                command.describe()
            );
            Ok(false)
        }
        _ => Err(unsupported(controller, command)),
    }
}

/// Percentage filter life reported as a filter maintenance service.
pub(crate) fn filter_service(name: &str, life_percent: i64) -> ServiceState {
    let life_percent = life_percent.clamp(0, 100);
    let used = 100 - life_percent;
    ServiceState::new(ServiceKind::FilterMaintenance, name)
        .with_subtype("Filter")
        .with(Characteristic::FilterLifeLevel, life_percent)
        .with(
            Characteristic::FilterChangeIndication,
            i64::from(used >= FILTER_CHANGE_THRESHOLD_PERCENT),
        )
}

//! Washers, dryers and wash towers.

use super::{ApplianceDevice, base_state, cycle_valve, decline_valve_write};
use crate::accessory::{AccessoryState, Characteristic, Command, ServiceKind, ServiceState};
use crate::config::EffectiveConfig;
use crate::controller::DeviceController;
use crate::error::Result;
use crate::status::{ApplianceStatus, StatusData, StatusView, duration_secs};
use async_trait::async_trait;
use std::sync::Arc;

/// States in which the drum is not actively running a cycle.
pub const WASHER_NOT_RUNNING_STATUS: &[&str] = &[
    "COOLDOWN",
    "POWEROFF",
    "POWERFAIL",
    "INITIAL",
    "PAUSE",
    "AUDIBLE_DIAGNOSIS",
    "FIRMWARE",
    "COURSE_DOWNLOAD",
    "ERROR",
    "END",
];

/// Cycles since the last tub clean at which a clean is due.
pub const TCL_MAINTENANCE_THRESHOLD: i64 = 30;

const WASHER_KEY: &str = "washer";
const DRYER_KEY: &str = "dryer";

pub struct WasherDryerStatus {
    data: StatusData,
}

impl StatusView for WasherDryerStatus {
    fn from_data(data: StatusData) -> Self {
        Self { data }
    }
}

impl ApplianceStatus for WasherDryerStatus {
    fn data(&self) -> &StatusData {
        &self.data
    }

    fn is_power_on(&self) -> bool {
        self.state() != "POWEROFF"
    }

    fn is_running(&self) -> bool {
        self.is_power_on() && !WASHER_NOT_RUNNING_STATUS.contains(&self.state().as_str())
    }
}

impl WasherDryerStatus {
    pub fn state(&self) -> String {
        self.data.get_string("state", "POWEROFF")
    }

    pub fn is_finished(&self) -> bool {
        self.state() == "END"
    }

    pub fn is_error(&self) -> bool {
        self.state() == "ERROR"
    }

    pub fn is_door_locked(&self) -> bool {
        self.data.get_string("doorLock", "") == "DOORLOCK_ON"
    }

    pub fn tub_clean_count(&self) -> i64 {
        self.data.get_int("TCLCount", 0)
    }

    pub fn needs_tub_clean(&self) -> bool {
        self.tub_clean_count() >= TCL_MAINTENANCE_THRESHOLD
    }

    /// Programmed cycle length in seconds.
    pub fn initial_duration(&self) -> i64 {
        duration_secs(
            self.data.get_int("initialTimeHour", 0),
            self.data.get_int("initialTimeMinute", 0),
        )
    }
}

/// Services for one drum; `label` distinguishes the halves of a wash tower.
fn drum_services(
    name: &str,
    label: Option<&str>,
    status: &WasherDryerStatus,
    config: &EffectiveConfig,
) -> Vec<ServiceState> {
    let display = match label {
        Some(label) => format!("{} {}", name, label),
        None => name.to_string(),
    };
    let subtype = |suffix: &str| match label {
        Some(label) => format!("{}{}", label, suffix),
        None => suffix.to_string(),
    };

    let mut valve = cycle_valve(&display, status)
        .with(Characteristic::StatusFault, status.is_error())
        .with(Characteristic::SetDuration, status.initial_duration());
    if let Some(label) = label {
        valve = valve.with_subtype(label);
    }

    let mut services = vec![valve];
    if config.get_bool("washer_trigger", false) {
        services.push(
            ServiceState::new(ServiceKind::OccupancySensor, format!("{} Finished", display))
                .with_subtype(subtype("Finished"))
                .with(Characteristic::OccupancyDetected, status.is_finished()),
        );
    }
    if config.get_bool("washer_door_lock", false) {
        services.push(
            ServiceState::new(ServiceKind::ContactSensor, format!("{} Door Lock", display))
                .with_subtype(subtype("DoorLock"))
                .with(Characteristic::ContactSensorState, i64::from(!status.is_door_locked())),
        );
    }
    if config.get_bool("washer_tub_clean", false) {
        services.push(
            ServiceState::new(ServiceKind::OccupancySensor, format!("{} Tub Clean", display))
                .with_subtype(subtype("TubClean"))
                .with(Characteristic::OccupancyDetected, status.needs_tub_clean()),
        );
    }
    services
}

pub struct WasherDryer {
    controller: DeviceController,
}

impl WasherDryer {
    pub fn new(controller: DeviceController) -> Self {
        Self { controller }
    }

    pub fn status(&self) -> Arc<WasherDryerStatus> {
        self.controller.status()
    }
}

#[async_trait]
impl ApplianceDevice for WasherDryer {
    fn controller(&self) -> &DeviceController {
        &self.controller
    }

    fn controller_mut(&mut self) -> &mut DeviceController {
        &mut self.controller
    }

    fn accessory_state(&self) -> AccessoryState {
        let config = self.controller.effective_config();
        drum_services(self.controller.name(), None, &self.status(), &config)
            .into_iter()
            .fold(base_state(&self.controller), AccessoryState::with_service)
    }

    async fn handle_command(&mut self, command: Command) -> Result<bool> {
        decline_valve_write(&self.controller, &command)
    }
}

/// Wash tower reporting separate `washer` and `dryer` sub-trees.
pub struct WasherDryer2 {
    controller: DeviceController,
}

impl WasherDryer2 {
    pub fn new(controller: DeviceController) -> Self {
        Self { controller }
    }

    pub fn washer_status(&self) -> Arc<WasherDryerStatus> {
        self.controller.status_at(Some(WASHER_KEY))
    }

    pub fn dryer_status(&self) -> Arc<WasherDryerStatus> {
        self.controller.status_at(Some(DRYER_KEY))
    }
}

#[async_trait]
impl ApplianceDevice for WasherDryer2 {
    fn controller(&self) -> &DeviceController {
        &self.controller
    }

    fn controller_mut(&mut self) -> &mut DeviceController {
        &mut self.controller
    }

    fn accessory_state(&self) -> AccessoryState {
        let config = self.controller.effective_config();
        let name = self.controller.name();
        let washer = drum_services(name, Some("Washer"), &self.washer_status(), &config);
        let dryer = drum_services(name, Some("Dryer"), &self.dryer_status(), &config);

        washer
            .into_iter()
            .chain(dryer)
            .fold(base_state(&self.controller), AccessoryState::with_service)
    }

    async fn handle_command(&mut self, command: Command) -> Result<bool> {
        decline_valve_write(&self.controller, &command)
    }
}

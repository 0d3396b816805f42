//! Clothing styler.

use super::{ApplianceDevice, base_state, cycle_valve, decline_valve_write};
use crate::accessory::{AccessoryState, Characteristic, Command};
use crate::controller::DeviceController;
use crate::error::Result;
use crate::status::{ApplianceStatus, StatusData, StatusView};
use async_trait::async_trait;
use std::sync::Arc;

/// States in which no styling cycle is in progress.
pub const STYLER_NOT_RUNNING_STATUS: &[&str] = &[
    "POWEROFF",
    "INITIAL",
    "PAUSE",
    "COMPLETE",
    "ERROR",
    "DIAGNOSIS",
    "RESERVED",
    "SLEEP",
    "FOTA",
];

pub struct StylerStatus {
    data: StatusData,
}

impl StatusView for StylerStatus {
    fn from_data(data: StatusData) -> Self {
        Self { data }
    }
}

impl ApplianceStatus for StylerStatus {
    fn data(&self) -> &StatusData {
        &self.data
    }

    fn is_power_on(&self) -> bool {
        self.state() != "POWEROFF"
    }

    fn is_running(&self) -> bool {
        self.is_power_on() && !STYLER_NOT_RUNNING_STATUS.contains(&self.state().as_str())
    }
}

impl StylerStatus {
    pub fn state(&self) -> String {
        self.data.get_string("state", "POWEROFF")
    }

    pub fn is_error(&self) -> bool {
        self.state() == "ERROR"
    }
}

pub struct Styler {
    controller: DeviceController,
}

impl Styler {
    pub fn new(controller: DeviceController) -> Self {
        Self { controller }
    }

    pub fn status(&self) -> Arc<StylerStatus> {
        self.controller.status()
    }
}

#[async_trait]
impl ApplianceDevice for Styler {
    fn controller(&self) -> &DeviceController {
        &self.controller
    }

    fn controller_mut(&mut self) -> &mut DeviceController {
        &mut self.controller
    }

    fn accessory_state(&self) -> AccessoryState {
        let status = self.status();
        base_state(&self.controller).with_service(
            cycle_valve(self.controller.name(), &*status)
                .with(Characteristic::StatusFault, status.is_error()),
        )
    }

    async fn handle_command(&mut self, command: Command) -> Result<bool> {
        decline_valve_write(&self.controller, &command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessory::{CharacteristicValue, ServiceKind};
    use crate::config::PlatformConfig;
    use crate::device::{Device, Platform};
    use crate::transport::SimulatedTransport;
    use serde_json::json;

    fn styler(state: &str) -> Styler {
        let device = Device::new("st-1", "STYLER", Platform::ThinQ2)
            .with_name("Styler")
            .with_snapshot_value(json!({"styler": {
                "state": state, "remainTimeHour": 0, "remainTimeMinute": 25
            }}));
        Styler::new(DeviceController::new(
            device,
            Arc::new(SimulatedTransport::new()),
            PlatformConfig::default().into_shared(),
        ))
    }

    #[test]
    fn test_not_running_states() {
        for &state in STYLER_NOT_RUNNING_STATUS {
            let styler = styler(state);
            assert!(!styler.status().is_running(), "{} must not count as running", state);
            assert_eq!(styler.status().remain_duration(), 0);
        }
        let running = styler("RUNNING");
        assert!(running.status().is_running());
        assert_eq!(running.status().remain_duration(), 1500);
    }

    #[test]
    fn test_valve_reports_fault() {
        let state = styler("ERROR").accessory_state();
        let valve = state.service(ServiceKind::Valve, None).unwrap();
        assert_eq!(valve.get(Characteristic::StatusFault), Some(&CharacteristicValue::Bool(true)));
        assert_eq!(valve.get(Characteristic::Active), Some(&CharacteristicValue::Bool(true)));
    }

    #[tokio::test]
    async fn test_power_write_declined() {
        let mut styler = styler("RUNNING");
        let accepted = styler
            .handle_command(Command::new(ServiceKind::Valve, Characteristic::Active, false))
            .await;
        assert!(matches!(accepted, Ok(false)));
    }
}

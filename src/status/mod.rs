//! Status views: typed, read-only projections over one snapshot sub-tree.
//!
//! A view never touches raw JSON itself; every read goes through
//! [`StatusData`]. Views are rebuilt by the device controller whenever the
//! snapshot version changes and are never persisted.

mod accessor;

pub use accessor::{StatusData, coerce_bool, number_key, round_half_up};
pub(crate) use accessor::{coerce_int, coerce_string};

/// Which part of the snapshot a view is built from when the caller does not
/// name a key explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusScope {
    /// The snapshot key registered for the device type.
    Registry,
    /// The whole snapshot (devices reporting flat `airState.*` keys).
    Root,
}

/// A status view that can be built from snapshot data.
pub trait StatusView: Send + Sync + 'static {
    const SCOPE: StatusScope = StatusScope::Registry;

    fn from_data(data: StatusData) -> Self;
}

/// Air quality readings shared by purifiers and air conditioners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AirQuality {
    pub is_on: bool,
    pub overall: i64,
    pub pm2: i64,
    pub pm10: i64,
}

/// `hours:minutes` in seconds, saturating on nonsense readings.
pub fn duration_secs(hours: i64, minutes: i64) -> i64 {
    hours
        .saturating_mul(3600)
        .saturating_add(minutes.saturating_mul(60))
}

/// Time semantics shared by washers, dryers, stylers, dishwashers and ovens.
pub trait ApplianceStatus {
    const REMAIN_HOUR_KEY: &'static str = "remainTimeHour";
    const REMAIN_MINUTE_KEY: &'static str = "remainTimeMinute";

    fn data(&self) -> &StatusData;

    fn is_power_on(&self) -> bool;

    fn is_running(&self) -> bool;

    /// Remaining time in seconds; 0 while idle, whatever the device reports.
    fn remain_duration(&self) -> i64 {
        if !self.is_running() {
            return 0;
        }
        let hours = self.data().get_int(Self::REMAIN_HOUR_KEY, 0);
        let minutes = self.data().get_int(Self::REMAIN_MINUTE_KEY, 0);
        duration_secs(hours, minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceModel;
    use serde_json::json;
    use std::sync::Arc;

    struct TimerStatus {
        data: StatusData,
    }

    impl ApplianceStatus for TimerStatus {
        fn data(&self) -> &StatusData {
            &self.data
        }

        fn is_power_on(&self) -> bool {
            self.data.get_string("state", "POWEROFF") != "POWEROFF"
        }

        fn is_running(&self) -> bool {
            self.data.get_string("state", "") == "RUNNING"
        }
    }

    fn timer(state: &str) -> TimerStatus {
        TimerStatus {
            data: StatusData::new(
                Some(json!({"state": state, "remainTimeHour": 1, "remainTimeMinute": "30"})),
                Arc::new(DeviceModel::empty()),
            ),
        }
    }

    #[test]
    fn test_remain_duration_only_while_running() {
        assert_eq!(timer("RUNNING").remain_duration(), 5400);
        assert_eq!(timer("PAUSE").remain_duration(), 0);
        assert!(timer("PAUSE").is_power_on());
        assert!(!timer("POWEROFF").is_power_on());
    }

    #[test]
    fn test_remain_duration_saturates() {
        let status = TimerStatus {
            data: StatusData::new(
                Some(json!({
                    "state": "RUNNING",
                    "remainTimeHour": "9999999999999999",
                    "remainTimeMinute": i64::MAX
                })),
                Arc::new(DeviceModel::empty()),
            ),
        };
        assert_eq!(status.remain_duration(), i64::MAX);
        assert_eq!(duration_secs(i64::MIN, 0), i64::MIN);
    }
}

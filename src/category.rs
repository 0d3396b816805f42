//! HomeKit accessory categories.
//!
//! The category decides which icon and grouping a controller shows for a
//! bridged accessory. Codes follow the HomeKit Accessory Protocol.

use strum::{Display, FromRepr};

/// HomeKit accessory category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, FromRepr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum AccessoryCategory {
    /// Generic accessory, used for anything without a dedicated category
    #[default]
    Other = 1,
    Bridge = 2,
    Fan = 3,
    GarageDoorOpener = 4,
    Lightbulb = 5,
    DoorLock = 6,
    Outlet = 7,
    Switch = 8,
    /// Also used for ovens and microwaves (air heater look)
    Thermostat = 9,
    Sensor = 10,
    SecuritySystem = 11,
    Door = 12,
    Window = 13,
    WindowCovering = 14,
    ProgrammableSwitch = 15,
    RangeExtender = 16,
    Camera = 17,
    VideoDoorbell = 18,
    AirPurifier = 19,
    AirHeater = 20,
    AirConditioner = 21,
    AirHumidifier = 22,
    AirDehumidifier = 23,
    AppleTv = 24,
    Homepod = 25,
    Speaker = 26,
    Airport = 27,
    Sprinkler = 28,
    Faucet = 29,
    ShowerHead = 30,
    Television = 31,
    TargetController = 32,
    Router = 33,
    AudioReceiver = 34,
    TvSetTopBox = 35,
    TvStreamingStick = 36,
}

impl AccessoryCategory {
    /// Numeric HomeKit category code.
    pub const fn code(self) -> u8 {
        self as u8
    }
}

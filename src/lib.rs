//! ThinQ bridge library.
//!
//! This library provides the device abstraction and snapshot synchronization
//! core for exposing LG ThinQ appliances as HomeKit accessories.

pub mod accessory;
pub mod bridge;
pub mod category;
pub mod config;
pub mod controller;
pub mod device;
pub mod devices;
pub mod error;
pub mod registry;
pub mod status;
pub mod temperature;
pub mod transport;

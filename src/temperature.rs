//! Temperature conversion between HomeKit (always Celsius) and the unit a
//! device works in natively.
//!
//! Fahrenheit models can ship calibration tables (`TempFahToCel`,
//! `TempCelToFah`) in their model info; when present they win over the
//! formula. A broken table must never break temperature display, so lookup
//! faults are logged and the formula is used instead.

use crate::device::DeviceSchema;
use crate::status::round_half_up;
use log::warn;
use serde_json::Value;
use std::sync::Arc;
use strum::EnumString;

/// Table consulted when converting towards the device.
const NATIVE_TABLE: &str = "TempFahToCel";
/// Table consulted when converting towards HomeKit.
const UNIVERSAL_TABLE: &str = "TempCelToFah";

/// HomeKit temperature characteristic bounds in Celsius.
pub const HOMEKIT_TEMP_MIN: f64 = 10.0;
pub const HOMEKIT_TEMP_MAX: f64 = 38.0;

/// Convert Celsius to whole degrees Fahrenheit.
pub fn c_to_f(celsius: f64) -> f64 {
    round_half_up(celsius * 9.0 / 5.0 + 32.0)
}

/// Convert Fahrenheit to Celsius with two decimals.
pub fn f_to_c(fahrenheit: f64) -> f64 {
    round_half_up((fahrenheit - 32.0) * 5.0 / 9.0 * 100.0) / 100.0
}

/// Native temperature unit of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum TemperatureUnit {
    #[default]
    #[strum(serialize = "C", serialize = "CELSIUS")]
    Celsius,
    #[strum(serialize = "F", serialize = "FAHRENHEIT")]
    Fahrenheit,
}

/// Bidirectional converter for one device.
#[derive(Debug, Clone)]
pub struct TemperatureConverter {
    unit: TemperatureUnit,
    schema: Option<Arc<dyn DeviceSchema>>,
}

impl TemperatureConverter {
    pub fn new(unit: TemperatureUnit, schema: Option<Arc<dyn DeviceSchema>>) -> Self {
        Self { unit, schema }
    }

    pub fn unit(&self) -> TemperatureUnit {
        self.unit
    }

    pub fn is_fahrenheit(&self) -> bool {
        self.unit == TemperatureUnit::Fahrenheit
    }

    /// HomeKit Celsius -> device value.
    pub fn to_native(&self, celsius: f64) -> f64 {
        if !self.is_fahrenheit() {
            return celsius;
        }
        let fahrenheit = c_to_f(celsius);
        self.lookup(NATIVE_TABLE, fahrenheit).unwrap_or(fahrenheit)
    }

    /// Device value -> HomeKit Celsius.
    pub fn to_universal(&self, temperature: f64) -> f64 {
        if !self.is_fahrenheit() {
            return temperature;
        }
        let fahrenheit = self
            .lookup(UNIVERSAL_TABLE, temperature)
            .unwrap_or(temperature);
        f_to_c(fahrenheit)
    }

    fn lookup(&self, table: &str, key: f64) -> Option<f64> {
        let schema = self.schema.as_ref()?;
        let key = crate::status::number_key(key);
        match schema.lookup_monitor_value(table, &key) {
            Ok(Some(Value::Number(n))) => n.as_f64(),
            Ok(Some(Value::String(s))) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            Ok(_) => None,
            Err(e) => {
                warn!(
                    "[Temperature] {} lookup for {} failed, using direct conversion: {}",
                    table, key, e
                );
                None
            }
        }
    }
}

//! Typed accessory projection handed to the host.
//!
//! An appliance is exposed as an [`AccessoryState`]: a list of services, each
//! carrying typed characteristic values and optional value ranges. The host
//! writes back through [`Command`]s. Services gated by configuration or model
//! features are simply absent from the list when disabled.

use crate::category::AccessoryCategory;
use crate::device::ValueSpec;
use std::hash::{DefaultHasher, Hash, Hasher};
use strum::Display;

/// Kind of service (determines how the host renders it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ServiceKind {
    AccessoryInformation,
    HeaterCooler,
    AirPurifier,
    AirQualitySensor,
    FilterMaintenance,
    TemperatureSensor,
    HumiditySensor,
    HumidifierDehumidifier,
    Thermostat,
    Fan,
    Fanv2,
    Lightbulb,
    Switch,
    Valve,
    ContactSensor,
    OccupancySensor,
    LeakSensor,
    StatelessProgrammableSwitch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Characteristic {
    Name,
    Manufacturer,
    Model,
    SerialNumber,
    Active,
    On,
    InUse,
    StatusFault,
    ValveType,
    RemainingDuration,
    SetDuration,
    CurrentTemperature,
    TargetTemperature,
    CoolingThresholdTemperature,
    HeatingThresholdTemperature,
    TemperatureDisplayUnits,
    CurrentHeaterCoolerState,
    TargetHeaterCoolerState,
    CurrentHeatingCoolingState,
    TargetHeatingCoolingState,
    CurrentAirPurifierState,
    TargetAirPurifierState,
    CurrentRelativeHumidity,
    RelativeHumidityDehumidifierThreshold,
    CurrentHumidifierDehumidifierState,
    TargetHumidifierDehumidifierState,
    WaterLevel,
    RotationSpeed,
    SwingMode,
    LockPhysicalControls,
    FilterLifeLevel,
    FilterChangeIndication,
    AirQuality,
    Pm25Density,
    Pm10Density,
    Brightness,
    ContactSensorState,
    OccupancyDetected,
    LeakDetected,
    ProgrammableSwitchEvent,
}

/// Value of one characteristic.
#[derive(Debug, Clone, PartialEq)]
pub enum CharacteristicValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl CharacteristicValue {
    /// Truthiness as HomeKit treats it: non-zero numbers are true.
    pub fn as_bool(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Text(s) => s == "1" || s.eq_ignore_ascii_case("true"),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Bool(b) => Some(f64::from(u8::from(*b))),
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Float(f) => Some(f.round() as i64),
            Self::Text(s) => s.trim().parse().ok(),
            other => other.as_f64().map(|f| f as i64),
        }
    }
}

impl From<bool> for CharacteristicValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for CharacteristicValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for CharacteristicValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for CharacteristicValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CharacteristicValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Allowed range of a numeric characteristic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl ValueRange {
    pub fn new(min: f64, max: f64, step: f64) -> Self {
        Self { min, max, step }
    }

    /// Range from a schema field, if the field is a range with both bounds.
    pub fn from_spec(spec: &ValueSpec) -> Option<Self> {
        if !spec.is_range() {
            return None;
        }
        Some(Self {
            min: spec.min?,
            max: spec.max?,
            step: spec.step.unwrap_or(1.0),
        })
    }
}

/// One service of an accessory.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceState {
    pub kind: ServiceKind,
    /// Display name
    pub name: String,
    /// Distinguishes several services of the same kind
    pub subtype: Option<String>,
    pub characteristics: Vec<(Characteristic, CharacteristicValue)>,
    pub ranges: Vec<(Characteristic, ValueRange)>,
}

impl ServiceState {
    pub fn new(kind: ServiceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            subtype: None,
            characteristics: Vec::new(),
            ranges: Vec::new(),
        }
    }

    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }

    pub fn with(mut self, characteristic: Characteristic, value: impl Into<CharacteristicValue>) -> Self {
        self.characteristics.push((characteristic, value.into()));
        self
    }

    pub fn with_range(mut self, characteristic: Characteristic, range: ValueRange) -> Self {
        self.ranges.push((characteristic, range));
        self
    }

    /// Attach a range only when one is known.
    pub fn with_optional_range(
        self,
        characteristic: Characteristic,
        range: Option<ValueRange>,
    ) -> Self {
        match range {
            Some(range) => self.with_range(characteristic, range),
            None => self,
        }
    }

    pub fn get(&self, characteristic: Characteristic) -> Option<&CharacteristicValue> {
        self.characteristics
            .iter()
            .find(|(c, _)| *c == characteristic)
            .map(|(_, v)| v)
    }

    pub fn range(&self, characteristic: Characteristic) -> Option<ValueRange> {
        self.ranges
            .iter()
            .find(|(c, _)| *c == characteristic)
            .map(|(_, r)| *r)
    }

    fn matches(&self, kind: ServiceKind, subtype: Option<&str>) -> bool {
        self.kind == kind && (subtype.is_none() || self.subtype.as_deref() == subtype)
    }
}

/// Everything the host needs to render one appliance.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessoryState {
    pub name: String,
    pub category: AccessoryCategory,
    pub services: Vec<ServiceState>,
}

impl AccessoryState {
    pub fn new(name: impl Into<String>, category: AccessoryCategory) -> Self {
        Self {
            name: name.into(),
            category,
            services: Vec::new(),
        }
    }

    pub fn with_service(mut self, service: ServiceState) -> Self {
        self.services.push(service);
        self
    }

    /// Add the service only when `enabled`.
    pub fn with_service_if(self, enabled: bool, service: impl FnOnce() -> ServiceState) -> Self {
        if enabled {
            self.with_service(service())
        } else {
            self
        }
    }

    /// First service of `kind`; with a subtype, the service carrying it.
    pub fn service(&self, kind: ServiceKind, subtype: Option<&str>) -> Option<&ServiceState> {
        self.services.iter().find(|s| s.matches(kind, subtype))
    }

    pub fn has_service(&self, kind: ServiceKind, subtype: Option<&str>) -> bool {
        self.service(kind, subtype).is_some()
    }

    /// Hash of the service layout (kinds, subtypes, characteristic set).
    ///
    /// Changes when a configuration toggle adds or removes a service, so the
    /// host knows to rebuild the accessory instead of only updating values.
    pub fn layout_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.category.hash(&mut hasher);
        self.services.len().hash(&mut hasher);
        for service in &self.services {
            service.kind.hash(&mut hasher);
            service.subtype.hash(&mut hasher);
            for (characteristic, _) in &service.characteristics {
                characteristic.hash(&mut hasher);
            }
        }
        hasher.finish()
    }
}

/// A host write to one characteristic.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub service: ServiceKind,
    pub subtype: Option<String>,
    pub characteristic: Characteristic,
    pub value: CharacteristicValue,
}

impl Command {
    pub fn new(
        service: ServiceKind,
        characteristic: Characteristic,
        value: impl Into<CharacteristicValue>,
    ) -> Self {
        Self {
            service,
            subtype: None,
            characteristic,
            value: value.into(),
        }
    }

    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }

    /// Short description for logs and errors.
    pub fn describe(&self) -> String {
        match &self.subtype {
            Some(subtype) => format!("{}[{}].{}", self.service, subtype, self.characteristic),
            None => format!("{}.{}", self.service, self.characteristic),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::ValueType;

    #[test]
    fn test_characteristic_value_coercion() {
        assert!(CharacteristicValue::Int(1).as_bool());
        assert!(!CharacteristicValue::Float(0.0).as_bool());
        assert_eq!(CharacteristicValue::Bool(true).as_i64(), Some(1));
        assert_eq!(CharacteristicValue::Float(2.6).as_i64(), Some(3));
        assert_eq!(CharacteristicValue::from("21.5").as_f64(), Some(21.5));
        assert_eq!(CharacteristicValue::from("x").as_i64(), None);
    }

    #[test]
    fn test_range_from_spec() {
        let spec = ValueSpec {
            value_type: ValueType::Range,
            min: Some(0.0),
            max: Some(5.0),
            step: None,
            options: Default::default(),
        };
        assert_eq!(ValueRange::from_spec(&spec), Some(ValueRange::new(0.0, 5.0, 1.0)));

        let spec = ValueSpec {
            value_type: ValueType::Enum,
            ..spec
        };
        assert_eq!(ValueRange::from_spec(&spec), None);
    }

    #[test]
    fn test_service_lookup() {
        let state = AccessoryState::new("Hood", AccessoryCategory::Other)
            .with_service(ServiceState::new(ServiceKind::Fan, "Hood").with(Characteristic::On, true))
            .with_service(
                ServiceState::new(ServiceKind::Lightbulb, "Hood - Light")
                    .with_subtype("Light")
                    .with(Characteristic::Brightness, 2i64),
            )
            .with_service_if(false, || ServiceState::new(ServiceKind::Switch, "Unused"));

        assert!(state.has_service(ServiceKind::Fan, None));
        assert!(state.has_service(ServiceKind::Lightbulb, Some("Light")));
        assert!(!state.has_service(ServiceKind::Lightbulb, Some("Other")));
        assert!(!state.has_service(ServiceKind::Switch, None));
        let light = state.service(ServiceKind::Lightbulb, None).unwrap();
        assert_eq!(light.get(Characteristic::Brightness), Some(&CharacteristicValue::Int(2)));
    }

    #[test]
    fn test_layout_hash_tracks_structure_only() {
        let build = |on: bool, extra: bool| {
            AccessoryState::new("AC", AccessoryCategory::AirConditioner)
                .with_service(ServiceState::new(ServiceKind::HeaterCooler, "AC").with(Characteristic::Active, on))
                .with_service_if(extra, || ServiceState::new(ServiceKind::Fanv2, "Fan"))
        };
        assert_eq!(build(true, false).layout_hash(), build(false, false).layout_hash());
        assert_ne!(build(true, false).layout_hash(), build(true, true).layout_hash());
    }

    #[test]
    fn test_command_describe() {
        let command = Command::new(ServiceKind::Switch, Characteristic::On, true).with_subtype("Jet");
        assert_eq!(command.describe(), "Switch[Jet].On");
    }
}

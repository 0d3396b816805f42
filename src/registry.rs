//! Device registry: the single table mapping a device-type key to its
//! accessory category, snapshot sub-key, configuration defaults, model
//! feature tables and the implementation serving each protocol generation.
//!
//! Adding an appliance type is a table edit here; protocol-generation
//! branching happens only in [`DeviceRegistry::resolve_implementation`].

use crate::category::AccessoryCategory;
use crate::controller::DeviceController;
use crate::device::{Device, DeviceType};
use crate::devices::legacy::{
    LegacyAirConditioner, LegacyAirPurifier, LegacyRangeHood, LegacyRefrigerator, LegacyWasher,
};
use crate::devices::{
    AeroTower, AirConditioner, AirPurifier, ApplianceDevice, Dehumidifier, Dishwasher, Microwave,
    Oven, RangeHood, Refrigerator, Styler, WasherDryer, WasherDryer2,
};
use log::debug;
use serde_json::{Map, Value, json};
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;
use strum::{Display, EnumIter, EnumString};

/// Optional capabilities only present on some hardware models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "camelCase")]
pub enum ModelFeature {
    JetMode,
    QuietMode,
    EnergySaveMode,
    AirClean,
    /// Model rejects the monitoring keep-alive command
    NoMonitorTimeout,
}

type ModelTable = &'static [(ModelFeature, &'static [&'static str])];

const AC_MODEL_FEATURES: ModelTable = &[
    (ModelFeature::JetMode, &["RAC_056905"]),
    (ModelFeature::QuietMode, &["WINF_056905"]),
    (ModelFeature::EnergySaveMode, &["WINF_056905", "RAC_056905"]),
    (ModelFeature::AirClean, &["RAC_056905"]),
    (ModelFeature::NoMonitorTimeout, &["RAC_056905"]),
];

type Factory = fn(DeviceController) -> Box<dyn ApplianceDevice>;

/// Constructor for one device implementation.
#[derive(Clone, Copy)]
pub struct Implementation {
    pub name: &'static str,
    factory: Factory,
}

impl std::fmt::Debug for Implementation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Implementation").field(&self.name).finish()
    }
}

impl Implementation {
    const fn new(name: &'static str, factory: Factory) -> Self {
        Self { name, factory }
    }

    pub fn instantiate(&self, controller: DeviceController) -> Box<dyn ApplianceDevice> {
        (self.factory)(controller)
    }
}

/// Registry entry for one device type.
#[derive(Debug)]
pub struct DeviceDescriptor {
    pub device_type: &'static str,
    pub category: AccessoryCategory,
    pub snapshot_key: Option<&'static str>,
    pub config_defaults: Map<String, Value>,
    /// Legacy generation
    pub v1: Option<Implementation>,
    /// Current generation
    pub v2: Option<Implementation>,
    pub model_features: ModelTable,
}

impl DeviceDescriptor {
    fn new(device_type: DeviceType, category: AccessoryCategory, snapshot_key: &'static str) -> Self {
        Self {
            device_type: device_type.key(),
            category,
            snapshot_key: Some(snapshot_key),
            config_defaults: Map::new(),
            v1: None,
            v2: None,
            model_features: &[],
        }
    }

    fn defaults(mut self, defaults: Value) -> Self {
        if let Value::Object(map) = defaults {
            self.config_defaults = map;
        }
        self
    }

    fn v1(mut self, implementation: Implementation) -> Self {
        self.v1 = Some(implementation);
        self
    }

    fn v2(mut self, implementation: Implementation) -> Self {
        self.v2 = Some(implementation);
        self
    }

    fn features(mut self, table: ModelTable) -> Self {
        self.model_features = table;
        self
    }
}

const AIR_PURIFIER: Implementation =
    Implementation::new("AirPurifier", |c| Box::new(AirPurifier::new(c)));
const AERO_TOWER: Implementation =
    Implementation::new("AeroTower", |c| Box::new(AeroTower::new(c)));
const REFRIGERATOR: Implementation =
    Implementation::new("Refrigerator", |c| Box::new(Refrigerator::new(c)));
const WASHER_DRYER: Implementation =
    Implementation::new("WasherDryer", |c| Box::new(WasherDryer::new(c)));
const WASHER_DRYER_2: Implementation =
    Implementation::new("WasherDryer2", |c| Box::new(WasherDryer2::new(c)));
const DISHWASHER: Implementation =
    Implementation::new("Dishwasher", |c| Box::new(Dishwasher::new(c)));
const DEHUMIDIFIER: Implementation =
    Implementation::new("Dehumidifier", |c| Box::new(Dehumidifier::new(c)));
const AIR_CONDITIONER: Implementation =
    Implementation::new("AirConditioner", |c| Box::new(AirConditioner::new(c)));
const STYLER: Implementation = Implementation::new("Styler", |c| Box::new(Styler::new(c)));
const RANGE_HOOD: Implementation = Implementation::new("RangeHood", |c| Box::new(RangeHood::new(c)));
const MICROWAVE: Implementation = Implementation::new("Microwave", |c| Box::new(Microwave::new(c)));
const OVEN: Implementation = Implementation::new("Oven", |c| Box::new(Oven::new(c)));

const LEGACY_AIR_CONDITIONER: Implementation =
    Implementation::new("LegacyAirConditioner", |c| Box::new(LegacyAirConditioner::new(c)));
const LEGACY_AIR_PURIFIER: Implementation =
    Implementation::new("LegacyAirPurifier", |c| Box::new(LegacyAirPurifier::new(c)));
const LEGACY_REFRIGERATOR: Implementation =
    Implementation::new("LegacyRefrigerator", |c| Box::new(LegacyRefrigerator::new(c)));
const LEGACY_WASHER: Implementation =
    Implementation::new("LegacyWasher", |c| Box::new(LegacyWasher::new(c)));
const LEGACY_RANGE_HOOD: Implementation =
    Implementation::new("LegacyRangeHood", |c| Box::new(LegacyRangeHood::new(c)));

/// Known device types deliberately left without an implementation.
pub const EXCLUDED_TYPES: &[(DeviceType, &str)] = &[
    (DeviceType::KimchiRefrigerator, "no monitoring data exposed by the cloud API"),
    (DeviceType::WaterPurifier, "no controllable or monitorable state"),
    (DeviceType::Cooktop, "remote control of cooktops is not permitted"),
    (DeviceType::RobotKing, "robot vacuums have no matching accessory model"),
    (DeviceType::Tv, "televisions are served by a separate integration"),
    (DeviceType::Boiler, "not offered in supported regions"),
    (DeviceType::Speaker, "audio devices have no matching accessory model"),
    (DeviceType::Homevu, "camera hub, no snapshot state"),
    (DeviceType::Arch, "gateway device"),
    (DeviceType::Missg, "gateway device"),
    (DeviceType::Sensor, "generic sensor without a stable snapshot layout"),
    (DeviceType::IotLighting, "Zigbee accessory, paired directly with the host"),
    (DeviceType::IotMotionSensor, "Zigbee accessory, paired directly with the host"),
    (DeviceType::IotSmartPlug, "Zigbee accessory, paired directly with the host"),
    (DeviceType::IotDustSensor, "Zigbee accessory, paired directly with the host"),
    (DeviceType::SolarSensor, "energy monitor without accessory counterpart"),
    (DeviceType::EmsAirStation, "energy monitor without accessory counterpart"),
    (DeviceType::AirSensor, "generic sensor without a stable snapshot layout"),
    (DeviceType::PuricareAirDetector, "generic sensor without a stable snapshot layout"),
    (DeviceType::V2Phone, "phone registration, not an appliance"),
    (DeviceType::Homerobot, "robot platform without accessory counterpart"),
];

fn washer_defaults() -> Value {
    json!({
        "washer_trigger": false,
        "washer_door_lock": false,
        "washer_tub_clean": false
    })
}

fn purifier_defaults() -> Value {
    json!({ "air_fast_mode": false })
}

fn build_table() -> HashMap<&'static str, DeviceDescriptor> {
    use AccessoryCategory as Category;

    let descriptors = [
        DeviceDescriptor::new(DeviceType::AeroTower, Category::AirPurifier, "airState")
            .defaults(purifier_defaults())
            .v2(AERO_TOWER),
        DeviceDescriptor::new(DeviceType::AirPurifier, Category::AirPurifier, "airState")
            .defaults(purifier_defaults())
            .v1(LEGACY_AIR_PURIFIER)
            .v2(AIR_PURIFIER),
        DeviceDescriptor::new(DeviceType::Refrigerator, Category::Other, "refState")
            .defaults(json!({
                "ref_express_freezer": false,
                "ref_express_fridge": false,
                "ref_eco_friendly": false
            }))
            .v1(LEGACY_REFRIGERATOR)
            .v2(REFRIGERATOR),
        DeviceDescriptor::new(DeviceType::Washer, Category::Other, "washerDryer")
            .defaults(washer_defaults())
            .v1(LEGACY_WASHER)
            .v2(WASHER_DRYER),
        DeviceDescriptor::new(DeviceType::WasherNew, Category::Other, "washerDryer")
            .defaults(washer_defaults())
            .v2(WASHER_DRYER),
        DeviceDescriptor::new(DeviceType::WashTower, Category::Other, "washerDryer")
            .defaults(washer_defaults())
            .v2(WASHER_DRYER),
        DeviceDescriptor::new(DeviceType::WashTower2, Category::Other, "washerDryer")
            .defaults(washer_defaults())
            .v2(WASHER_DRYER_2),
        DeviceDescriptor::new(DeviceType::Dryer, Category::Other, "washerDryer")
            .defaults(washer_defaults())
            .v1(LEGACY_WASHER)
            .v2(WASHER_DRYER),
        DeviceDescriptor::new(DeviceType::Dishwasher, Category::Other, "dishwasher")
            .defaults(json!({ "dishwasher_trigger": false }))
            .v2(DISHWASHER),
        DeviceDescriptor::new(
            DeviceType::Dehumidifier,
            Category::AirDehumidifier,
            "dehumidifierState",
        )
        .v2(DEHUMIDIFIER),
        DeviceDescriptor::new(DeviceType::Ac, Category::AirConditioner, "airState")
            .defaults(json!({
                "ac_swing_mode": "BOTH",
                "ac_air_quality": false,
                "ac_mode": "BOTH",
                "ac_temperature_sensor": false,
                "ac_humidity_sensor": false,
                "ac_led_control": false,
                "ac_fan_control": false,
                "ac_jet_control": false,
                "ac_temperature_unit": "C",
                "ac_buttons": [],
                "ac_air_clean": true,
                "ac_energy_save": true
            }))
            .v1(LEGACY_AIR_CONDITIONER)
            .v2(AIR_CONDITIONER)
            .features(AC_MODEL_FEATURES),
        DeviceDescriptor::new(DeviceType::Styler, Category::Other, "styler").v2(STYLER),
        DeviceDescriptor::new(DeviceType::Hood, Category::Other, "hoodState")
            .v1(LEGACY_RANGE_HOOD)
            .v2(RANGE_HOOD),
        DeviceDescriptor::new(DeviceType::Microwave, Category::Thermostat, "microwaveState")
            .v2(MICROWAVE),
        DeviceDescriptor::new(DeviceType::Oven, Category::Thermostat, "ovenState").v2(OVEN),
    ];

    descriptors
        .into_iter()
        .map(|d| (d.device_type, d))
        .collect()
}

static DESCRIPTORS: LazyLock<HashMap<&'static str, DeviceDescriptor>> = LazyLock::new(build_table);

/// Lookups over the descriptor table.
pub struct DeviceRegistry;

impl DeviceRegistry {
    pub fn descriptor(device_type: &str) -> Option<&'static DeviceDescriptor> {
        DESCRIPTORS.get(device_type)
    }

    /// Implementation serving `device`, or `None` when the device is unsupported.
    ///
    /// Legacy-generation devices use the v1 slot when it is filled and the v2
    /// slot otherwise.
    pub fn resolve_implementation(device: &Device) -> Option<Implementation> {
        let descriptor = Self::descriptor(&device.device_type)?;
        let implementation = match descriptor.v1 {
            Some(v1) if device.platform.is_legacy() => Some(v1),
            _ => descriptor.v2,
        };
        debug!(
            "[Registry] {} ({} on {}) -> {:?}",
            device.name, device.device_type, device.platform, implementation
        );
        implementation
    }

    /// Accessory category; generic "other" for unknown types.
    pub fn category(device: &Device) -> AccessoryCategory {
        Self::descriptor(&device.device_type)
            .map(|d| d.category)
            .unwrap_or_default()
    }

    /// Type-level configuration defaults; empty for unknown types.
    pub fn config_defaults(device_type: &str) -> Map<String, Value> {
        Self::descriptor(device_type)
            .map(|d| d.config_defaults.clone())
            .unwrap_or_default()
    }

    pub fn snapshot_key(device_type: &str) -> Option<&'static str> {
        Self::descriptor(device_type).and_then(|d| d.snapshot_key)
    }

    pub fn is_supported(device_type: &str) -> bool {
        DESCRIPTORS.contains_key(device_type)
    }

    pub fn supported_types() -> BTreeSet<&'static str> {
        DESCRIPTORS.keys().copied().collect()
    }

    /// Whether `model` of `device_type` is listed for `feature`.
    pub fn model_supports(device_type: &str, model: &str, feature: ModelFeature) -> bool {
        Self::descriptor(device_type).is_some_and(|d| {
            d.model_features
                .iter()
                .any(|(f, models)| *f == feature && models.contains(&model))
        })
    }
}

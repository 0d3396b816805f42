//! Physical appliance identity and raw state.
//!
//! A [`Device`] carries the opaque snapshot reported by the cloud API plus the
//! schema object for its hardware model. Nothing here interprets the snapshot;
//! that is the job of the status views.

pub mod model;

pub use model::{DeviceModel, DeviceSchema, ValueSpec, ValueType};

use crate::error::Result;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use strum::{Display, EnumIter, EnumString, FromRepr, IntoStaticStr};

/// Latest known full state of one device, as untyped nested JSON.
pub type Snapshot = serde_json::Map<String, Value>;

/// Vendor protocol generation serving a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString)]
pub enum Platform {
    /// Legacy generation
    #[strum(serialize = "thinq1")]
    ThinQ1,
    /// Current generation
    #[default]
    #[strum(serialize = "thinq2")]
    ThinQ2,
}

impl Platform {
    pub fn is_legacy(self) -> bool {
        self == Self::ThinQ1
    }

    /// Parse a platform string; anything unrecognised is treated as current.
    pub fn parse(s: &str) -> Self {
        Self::from_str(s).unwrap_or_default()
    }
}

/// Device type codes reported by the cloud API.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, IntoStaticStr, FromRepr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u16)]
pub enum DeviceType {
    Refrigerator = 101,
    KimchiRefrigerator = 102,
    WaterPurifier = 103,
    Washer = 201,
    Dryer = 202,
    Styler = 203,
    Dishwasher = 204,
    WasherNew = 221,
    WashTower = 222,
    #[strum(serialize = "WASH_TOWER_2")]
    WashTower2 = 223,
    Oven = 301,
    Microwave = 302,
    Cooktop = 303,
    Hood = 304,
    Ac = 401,
    AirPurifier = 402,
    Dehumidifier = 403,
    AeroTower = 410,
    RobotKing = 501,
    Tv = 701,
    Boiler = 801,
    Speaker = 901,
    Homevu = 902,
    Arch = 1001,
    Missg = 3001,
    Sensor = 3002,
    IotLighting = 3003,
    IotMotionSensor = 3004,
    IotSmartPlug = 3005,
    IotDustSensor = 3006,
    SolarSensor = 3102,
    EmsAirStation = 4001,
    AirSensor = 4003,
    PuricareAirDetector = 4004,
    #[strum(serialize = "V2PHONE")]
    V2Phone = 6001,
    Homerobot = 9000,
}

impl DeviceType {
    /// Registry key for this type (e.g. `"AC"`, `"WASH_TOWER_2"`).
    pub fn key(self) -> &'static str {
        self.into()
    }

    pub fn code(self) -> u16 {
        self as u16
    }
}

/// One physical appliance.
#[derive(Debug, Clone)]
pub struct Device {
    /// Stable external identifier
    pub id: String,
    /// User-facing alias
    pub name: String,
    /// Registry key (matches a descriptor)
    pub device_type: String,
    pub platform: Platform,
    pub model: String,
    pub sales_model: Option<String>,
    pub serial_number: Option<String>,
    /// Current raw state
    pub snapshot: Snapshot,
    /// Schema for this hardware model
    pub schema: Arc<dyn DeviceSchema>,
}

impl Device {
    pub fn new(id: impl Into<String>, device_type: impl Into<String>, platform: Platform) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            device_type: device_type.into(),
            platform,
            model: String::new(),
            sales_model: None,
            serial_number: None,
            snapshot: Snapshot::new(),
            schema: Arc::new(DeviceModel::empty()),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_snapshot(mut self, snapshot: Snapshot) -> Self {
        self.snapshot = snapshot;
        self
    }

    /// Use a JSON value as snapshot; non-object values give an empty snapshot.
    pub fn with_snapshot_value(self, snapshot: Value) -> Self {
        match snapshot {
            Value::Object(map) => self.with_snapshot(map),
            _ => self.with_snapshot(Snapshot::new()),
        }
    }

    pub fn with_schema(mut self, schema: Arc<dyn DeviceSchema>) -> Self {
        self.schema = schema;
        self
    }

    /// Model name shown to the host: sales model, then model, then "Unknown".
    pub fn display_model(&self) -> &str {
        self.sales_model
            .as_deref()
            .filter(|m| !m.is_empty())
            .or(Some(self.model.as_str()).filter(|m| !m.is_empty()))
            .unwrap_or("Unknown")
    }
}

/// Write `value` at a dotted path.
///
/// A literal flat root key equal to `path` is overwritten in place, so reads
/// (which prefer the flat key) see the new value. Otherwise the nested path is
/// created, replacing non-object intermediates.
pub fn patch_snapshot(snapshot: &mut Snapshot, path: &str, value: Value) {
    if let Some(slot) = snapshot.get_mut(path) {
        *slot = value;
        return;
    }

    let mut segments = path.split('.').peekable();
    let mut current = snapshot;
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_string(), value);
            return;
        }
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Snapshot::new()));
        if !entry.is_object() {
            *entry = Value::Object(Snapshot::new());
        }
        current = match entry {
            Value::Object(map) => map,
            _ => return,
        };
    }
}

/// Device entry as returned by the device list API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub device_id: String,
    #[serde(default)]
    pub alias: Option<String>,
    /// Numeric code or registry key
    pub device_type: Value,
    #[serde(default)]
    pub platform_type: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub sales_model: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub snapshot: Option<Value>,
    /// Model-info document
    #[serde(default)]
    pub model_info: Option<Value>,
}

impl DeviceRecord {
    /// Registry key for the reported type; unknown numeric codes keep their digits.
    pub fn type_key(&self) -> String {
        match &self.device_type {
            Value::Number(n) => n
                .as_u64()
                .and_then(|code| u16::try_from(code).ok())
                .and_then(DeviceType::from_repr)
                .map(|t| t.key().to_string())
                .unwrap_or_else(|| n.to_string()),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl From<DeviceRecord> for Device {
    fn from(record: DeviceRecord) -> Self {
        let platform = record
            .platform_type
            .as_deref()
            .map(Platform::parse)
            .unwrap_or_default();
        let mut device = Device::new(record.device_id.clone(), record.type_key(), platform)
            .with_snapshot_value(record.snapshot.unwrap_or(Value::Null));
        if let Some(alias) = record.alias {
            device.name = alias;
        }
        if let Some(model) = record.model_name {
            device.model = model;
        }
        device.sales_model = record.sales_model;
        device.serial_number = record.serial_number;
        if let Some(info) = record.model_info {
            device.schema = Arc::new(DeviceModel::new(info));
        }
        device
    }
}

/// Parse a device list (a JSON array of [`DeviceRecord`]s).
pub fn parse_fleet(json: &str) -> Result<Vec<Device>> {
    let records: Vec<DeviceRecord> = serde_json::from_str(json)?;
    Ok(records.into_iter().map(Device::from).collect())
}

pub fn load_fleet(path: &Path) -> Result<Vec<Device>> {
    parse_fleet(&fs::read_to_string(path)?)
}

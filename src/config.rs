//! Platform configuration.
//!
//! The platform block lists per-device user overrides matched by device id.
//! It is shared behind a lock so overrides can change while the bridge runs;
//! controllers merge it with registry defaults on every access.

use crate::error::{BridgeError, Result};
use crate::status::{coerce_bool, coerce_int, coerce_string};
use log::warn;
use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Platform identifier in a Homebridge `config.json`.
pub const PLATFORM_NAME: &str = "LGThinQ";

pub const DEFAULT_REFRESH_SECS: u64 = 60;

/// Configuration shared between the bridge and its controllers.
pub type SharedConfig = Arc<RwLock<PlatformConfig>>;

/// User settings for one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceOverride {
    pub id: String,
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default, deserialize_with = "lenient_overrides")]
    pub devices: Vec<DeviceOverride>,
    #[serde(default = "default_refresh_secs")]
    pub refresh_interval: u64,
}

fn default_refresh_secs() -> u64 {
    DEFAULT_REFRESH_SECS
}

/// Keep every well-formed override; entries without a string id are skipped.
fn lenient_overrides<'de, D>(deserializer: D) -> std::result::Result<Vec<DeviceOverride>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<DeviceOverride>(entry.clone()) {
            Ok(device) => Some(device),
            Err(e) => {
                warn!("[Config] Ignoring device entry {}: {}", entry, e);
                None
            }
        })
        .collect())
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            devices: Vec::new(),
            refresh_interval: DEFAULT_REFRESH_SECS,
        }
    }
}

impl PlatformConfig {
    /// Parse either a bare platform block or a full Homebridge config.
    pub fn from_value(value: Value) -> Result<Self> {
        let block = match value.get("platforms") {
            Some(Value::Array(platforms)) => platforms
                .iter()
                .find(|p| p.get("platform").and_then(Value::as_str) == Some(PLATFORM_NAME))
                .cloned()
                .ok_or_else(|| {
                    BridgeError::Config(format!("no {} platform block found", PLATFORM_NAME))
                })?,
            _ => value,
        };
        Ok(serde_json::from_value(block)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_value(serde_json::from_str(&content)?)
    }

    /// Default location, `~/.homebridge/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".homebridge").join("config.json"))
    }

    pub fn device_override(&self, id: &str) -> Option<&DeviceOverride> {
        self.devices.iter().find(|d| d.id == id)
    }

    pub fn into_shared(self) -> SharedConfig {
        Arc::new(RwLock::new(self))
    }
}

/// Registry defaults merged with the user override for one device.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectiveConfig {
    values: Map<String, Value>,
}

impl EffectiveConfig {
    /// User values win over defaults.
    pub fn merge(defaults: Map<String, Value>, user: Option<&DeviceOverride>) -> Self {
        let mut values = defaults;
        if let Some(user) = user {
            values.insert("id".to_string(), Value::String(user.id.clone()));
            values.extend(user.settings.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|v| !v.is_null())
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get(key).map(coerce_bool).unwrap_or(default)
    }

    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.get(key)
            .map(coerce_string)
            .unwrap_or_else(|| default.to_string())
    }

    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.get(key).and_then(coerce_int).unwrap_or(default)
    }

    /// Array setting; anything else reads as empty.
    pub fn get_list(&self, key: &str) -> Vec<Value> {
        match self.get(key) {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        }
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }
}

//! Typed, defaulted reads over one snapshot sub-tree.
//!
//! The snapshot shape is not contractually guaranteed, so every read here
//! degrades to the caller's default instead of failing. A malformed field
//! costs one property, never the whole device.

use super::AirQuality;
use crate::device::DeviceSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Round half up, matching how the cloud app rounds displayed values.
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Render a number the way the vendor API keys its lookup tables
/// (`72` rather than `72.0`).
pub fn number_key(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Leading integer of a string (`"12abc"` -> 12, `" -3"` -> -3).
fn parse_int_prefix(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let sign_len = usize::from(s.starts_with(['+', '-']));
    let digits = s[sign_len..]
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len() - sign_len);
    if digits == 0 {
        return None;
    }
    s[..sign_len + digits].parse().ok()
}

/// Leading decimal literal of a string (`"21.5C"` -> 21.5).
fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = usize::from(s.starts_with(['+', '-']));
    let mut mantissa_digits = 0;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
        mantissa_digits += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
            mantissa_digits += 1;
        }
    }
    if mantissa_digits == 0 {
        return None;
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_start {
            end = exp_end;
        }
    }
    s[..end].trim_end_matches('.').parse().ok()
}

/// Permissive truthiness: `1`, `true`, `"1"`, `"true"` (any case) are true.
pub fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => s == "1" || s.eq_ignore_ascii_case("true"),
        Value::Array(_) | Value::Object(_) => true,
    }
}

pub(crate) fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => parse_int_prefix(s),
        _ => None,
    }
}

fn coerce_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_float_prefix(s),
        _ => None,
    }
}

pub(crate) fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.to_string(),
            None => n.as_f64().map(number_key).unwrap_or_else(|| n.to_string()),
        },
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Resolve a dotted path: literal flat key first, then nested segments.
///
/// Returns the raw value, `null` included, so callers can tell "present but
/// null" from "absent".
fn resolve<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    if let Value::Object(map) = data
        && let Some(value) = map.get(path)
    {
        return Some(value);
    }

    let mut current = data;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Snapshot sub-tree plus the schema of the device it came from.
#[derive(Debug, Clone)]
pub struct StatusData {
    data: Option<Value>,
    schema: Arc<dyn DeviceSchema>,
}

impl StatusData {
    pub fn new(data: Option<Value>, schema: Arc<dyn DeviceSchema>) -> Self {
        Self { data, schema }
    }

    pub fn schema(&self) -> &dyn DeviceSchema {
        self.schema.as_ref()
    }

    fn root(&self) -> Option<&Value> {
        self.data.as_ref().filter(|v| !v.is_null())
    }

    /// Non-null value at `path`.
    pub fn get_value(&self, path: &str) -> Option<&Value> {
        self.root()
            .and_then(|root| resolve(root, path))
            .filter(|v| !v.is_null())
    }

    /// Deserialize the value at `path`, falling back to `default` when it is
    /// absent or has the wrong shape.
    pub fn get_as<T: DeserializeOwned>(&self, path: &str, default: T) -> T {
        self.get_value(path)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or(default)
    }

    pub fn get_boolean(&self, path: &str, default: bool) -> bool {
        self.get_value(path).map(coerce_bool).unwrap_or(default)
    }

    pub fn get_int(&self, path: &str, default: i64) -> i64 {
        self.get_value(path).and_then(coerce_int).unwrap_or(default)
    }

    pub fn get_float(&self, path: &str, default: f64) -> f64 {
        self.get_value(path).and_then(coerce_float).unwrap_or(default)
    }

    pub fn get_string(&self, path: &str, default: &str) -> String {
        self.get_value(path)
            .map(coerce_string)
            .unwrap_or_else(|| default.to_string())
    }

    /// Structural existence, `null` values included.
    pub fn has_property(&self, path: &str) -> bool {
        self.root().and_then(|root| resolve(root, path)).is_some()
    }

    /// Air quality readings, if the device reports any.
    pub fn get_air_quality_data(&self, is_power_on: bool) -> Option<AirQuality> {
        let reported = [
            "airState.quality.overall",
            "airState.quality.PM2",
            "airState.quality.PM10",
        ]
        .iter()
        .any(|path| self.has_property(path));

        if !reported {
            return None;
        }

        Some(AirQuality {
            is_on: is_power_on || self.get_boolean("airState.quality.sensorMon", false),
            overall: self.get_int("airState.quality.overall", 0),
            pm2: self.get_int("airState.quality.PM2", 0),
            pm10: self.get_int("airState.quality.PM10", 0),
        })
    }

    /// Remaining filter life in percent; 0 when the maximum is unknown or zero.
    pub fn get_filter_life_percent(&self, current_key: &str, max_key: &str) -> i64 {
        let max_time = self.get_int(max_key, 0);
        if max_time == 0 {
            return 0;
        }
        let current_time = self.get_int(current_key, 0);
        round_half_up((1.0 - current_time as f64 / max_time as f64) * 100.0) as i64
    }

    /// True when the coded value at `path` is the schema code labelled `label`.
    pub fn matches_monitor_name(&self, path: &str, field: &str, label: &str) -> bool {
        match (self.get_value(path), self.schema.lookup_monitor_name(field, label)) {
            (Some(value), Some(code)) => coerce_string(value) == code,
            _ => false,
        }
    }

    /// Schema label of the coded value at `path` (e.g. `"1"` -> `"@WM_STATE_RUNNING_W"`).
    pub fn enum_label(&self, path: &str, field: &str) -> Option<String> {
        let code = coerce_string(self.get_value(path)?);
        self.schema.value(field)?.label(&code).map(str::to_string)
    }
}

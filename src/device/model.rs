//! Device model schema.
//!
//! Every hardware model ships a model-info document describing the valid
//! range, enumeration codes and lookup tables of each monitored field. Two
//! dialects exist:
//!
//! - legacy: `{"Value": {"TempCfg": {"type": "Range", "option": {"min": 18, ...}}}}`
//! - current: `{"MonitoringValue": {"ventLevel": {"dataType": "range", "valueMapping": {...}}}}`
//!
//! The document is owned by the cloud API and read-only here.

use crate::error::{BridgeError, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumString};

/// Schema collaborator answering range, enumeration and lookup-table queries.
pub trait DeviceSchema: fmt::Debug + Send + Sync {
    /// Describe the valid values of a monitored field.
    fn value(&self, field: &str) -> Option<ValueSpec>;

    /// Raw code of `field` whose label is `label` (e.g. `"@CP_ENABLE_W"` -> `"ENABLE"`).
    fn lookup_monitor_name(&self, field: &str, label: &str) -> Option<String>;

    /// Entry `key` of lookup table `table`.
    ///
    /// `Ok(None)` when the table or key is absent; an error when the table
    /// itself is malformed.
    fn lookup_monitor_value(&self, table: &str, key: &str) -> Result<Option<Value>>;
}

/// Kind of a monitored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum ValueType {
    Enum,
    Range,
    Bit,
    Reference,
    String,
    Number,
    Boolean,
    #[strum(disabled)]
    Unknown,
}

/// Valid values of one monitored field.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueSpec {
    pub value_type: ValueType,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
    /// Enumeration code -> label
    pub options: BTreeMap<String, String>,
}

impl ValueSpec {
    pub fn is_range(&self) -> bool {
        self.value_type == ValueType::Range
    }

    pub fn is_enum(&self) -> bool {
        self.value_type == ValueType::Enum
    }

    /// Label for an enumeration code.
    pub fn label(&self, code: &str) -> Option<&str> {
        self.options.get(code).map(String::as_str)
    }
}

/// Model-info document backed schema.
#[derive(Debug, Clone, Default)]
pub struct DeviceModel {
    data: Value,
}

impl DeviceModel {
    pub fn new(data: Value) -> Self {
        Self { data }
    }

    /// Schema with no fields; every query misses.
    pub fn empty() -> Self {
        Self::default()
    }

    fn raw_spec(&self, field: &str) -> Option<&Value> {
        self.data
            .get("MonitoringValue")
            .and_then(|values| values.get(field))
            .or_else(|| self.data.get("Value").and_then(|values| values.get(field)))
    }

    fn mapping(spec: &Value) -> Option<&Value> {
        spec.get("valueMapping").or_else(|| spec.get("option"))
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn option_label(code: &str, entry: &Value) -> String {
    match entry {
        Value::String(label) => label.clone(),
        Value::Object(obj) => obj
            .get("label")
            .and_then(Value::as_str)
            .unwrap_or(code)
            .to_string(),
        other => other.to_string(),
    }
}

fn parse_options(mapping: &Map<String, Value>) -> BTreeMap<String, String> {
    mapping
        .iter()
        .map(|(code, entry)| (code.clone(), option_label(code, entry)))
        .collect()
}

impl DeviceSchema for DeviceModel {
    fn value(&self, field: &str) -> Option<ValueSpec> {
        let spec = self.raw_spec(field)?;
        let value_type = spec
            .get("dataType")
            .or_else(|| spec.get("type"))
            .and_then(Value::as_str)
            .and_then(|t| ValueType::from_str(t).ok())
            .unwrap_or(ValueType::Unknown);

        let mut result = ValueSpec {
            value_type,
            min: None,
            max: None,
            step: None,
            options: BTreeMap::new(),
        };

        match (value_type, Self::mapping(spec)) {
            (ValueType::Range, Some(mapping)) => {
                result.min = mapping.get("min").and_then(as_number);
                result.max = mapping.get("max").and_then(as_number);
                result.step = mapping.get("step").and_then(as_number);
            }
            (_, Some(Value::Object(mapping))) => {
                result.options = parse_options(mapping);
            }
            _ => {}
        }

        Some(result)
    }

    fn lookup_monitor_name(&self, field: &str, label: &str) -> Option<String> {
        let spec = self.value(field)?;
        spec.options
            .into_iter()
            .find(|(_, option)| option == label)
            .map(|(code, _)| code)
    }

    fn lookup_monitor_value(&self, table: &str, key: &str) -> Result<Option<Value>> {
        let Some(spec) = self.raw_spec(table) else {
            return Ok(None);
        };
        match Self::mapping(spec) {
            None => Ok(None),
            Some(Value::Object(mapping)) => Ok(mapping.get(key).map(|entry| match entry {
                Value::Object(obj) => obj.get("label").cloned().unwrap_or_else(|| entry.clone()),
                other => other.clone(),
            })),
            Some(other) => Err(BridgeError::Schema(format!(
                "lookup table {} is not an object: {}",
                table, other
            ))),
        }
    }
}

//! # Decoded Field Storage
//!
//! Drivers publish their readings through the [`FieldSink`] trait as named
//! values, either numeric-with-unit or plain text. [`FieldStore`] is the
//! standard sink: it keeps the latest value per name and exports the set as a
//! JSON object in the shape consumers of meter readings expect (numeric keys
//! suffixed with the unit, e.g. `voltage_v`, `backflow_m3`).
//!
//! A field that was never set is simply absent; absence means the meter did
//! not report that quantity, not that it was zero.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::json;
use std::collections::HashMap;

/// Physical unit of a numeric field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    /// Cubic meters
    M3,
    /// Kilowatt hours
    KWh,
    /// Volts
    Volt,
    /// Degrees Celsius
    Celsius,
}

impl Unit {
    /// Suffix appended to the field name in JSON exports
    pub fn suffix(&self) -> &'static str {
        match self {
            Unit::M3 => "m3",
            Unit::KWh => "kwh",
            Unit::Volt => "v",
            Unit::Celsius => "c",
        }
    }

    /// Human readable unit symbol for log output
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::M3 => "m3",
            Unit::KWh => "kWh",
            Unit::Volt => "V",
            Unit::Celsius => "°C",
        }
    }
}

/// One decoded value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Numeric { value: f64, unit: Unit },
    Text(String),
}

/// Where drivers publish decoded values
///
/// Implementations decide what storage or forwarding means; drivers only
/// name the field and hand over the value. Writing the same name twice in
/// one decode keeps the later value.
pub trait FieldSink {
    fn set_string_value(&mut self, name: &str, value: &str);
    fn set_numeric_value(&mut self, name: &str, unit: Unit, value: f64);
}

/// Accumulates the fields of one decoded telegram
#[derive(Debug, Clone, Default)]
pub struct FieldStore {
    fields: HashMap<String, FieldValue>,
}

impl FieldStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Numeric value of a field, if present and numeric
    pub fn numeric(&self, name: &str) -> Option<f64> {
        match self.fields.get(name)? {
            FieldValue::Numeric { value, .. } => Some(*value),
            FieldValue::Text(_) => None,
        }
    }

    /// Text value of a field, if present and textual
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.fields.get(name)? {
            FieldValue::Text(s) => Some(s.as_str()),
            FieldValue::Numeric { .. } => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    /// Export as a JSON object with the given reading timestamp
    ///
    /// Keys are sorted; numeric fields are keyed `name_{unit}` so the unit
    /// survives into systems that only see the JSON.
    pub fn to_json_at(&self, timestamp: DateTime<Utc>) -> serde_json::Value {
        let mut map = serde_json::Map::new();

        let mut names: Vec<&String> = self.fields.keys().collect();
        names.sort();

        for name in names {
            match &self.fields[name] {
                FieldValue::Numeric { value, unit } => {
                    map.insert(format!("{}_{}", name, unit.suffix()), json!(value));
                }
                FieldValue::Text(s) => {
                    map.insert(name.clone(), json!(s));
                }
            }
        }

        map.insert(
            "timestamp".to_string(),
            json!(timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)),
        );

        serde_json::Value::Object(map)
    }

    /// Export as a JSON object timestamped with the current time
    pub fn to_json(&self) -> serde_json::Value {
        self.to_json_at(Utc::now())
    }
}

impl FieldSink for FieldStore {
    fn set_string_value(&mut self, name: &str, value: &str) {
        self.fields
            .insert(name.to_string(), FieldValue::Text(value.to_string()));
    }

    fn set_numeric_value(&mut self, name: &str, unit: Unit, value: f64) {
        self.fields
            .insert(name.to_string(), FieldValue::Numeric { value, unit });
    }
}

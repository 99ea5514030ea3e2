use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{RecordError, Result};

/// The payload a worker produced for one run.
///
/// Workers may return a single scalar or a set of named sub-metrics
/// (e.g. a combined temperature/humidity sensor). A bare scalar is
/// normalized into a single-entry map keyed `VALUE` before storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reading {
    Scalar(f64),
    Fields(IndexMap<String, f64>),
}

/// One produced measurement, keyed to the job's *scheduled* run time.
///
/// `timestamp` is the nominal cron occurrence, not the wall clock at
/// completion; `offset` records how far behind schedule the run actually
/// finished, so scheduler drift stays observable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub timestamp: i64,
    pub offset: f64,
    pub sensor: String,
    pub value: Reading,
}

impl Record {
    /// Validate and normalize into the flat form the storage layer writes.
    ///
    /// A scalar value becomes `{"VALUE": x}`. Fails when the sensor id is
    /// empty, the timestamp is unset, or the value map has no entries.
    pub fn flatten(&self) -> Result<FlatRecord> {
        if self.sensor.is_empty() {
            return Err(RecordError::MissingField("SENSOR"));
        }
        if self.timestamp <= 0 {
            return Err(RecordError::MissingField("TIMESTAMP"));
        }
        let values = match &self.value {
            Reading::Scalar(v) => {
                let mut map = IndexMap::with_capacity(1);
                map.insert("VALUE".to_string(), *v);
                map
            }
            Reading::Fields(map) => {
                if map.is_empty() {
                    return Err(RecordError::EmptyValue {
                        sensor: self.sensor.clone(),
                    });
                }
                map.clone()
            }
        };
        Ok(FlatRecord {
            timestamp: self.timestamp,
            offset: self.offset,
            sensor: self.sensor.clone(),
            values,
        })
    }
}

/// Normalized record: fixed columns plus an order-preserving value map.
///
/// The value keys of the first record seen for a sensor define that
/// sensor's table columns; later records must use the same keys.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRecord {
    pub timestamp: i64,
    pub offset: f64,
    pub sensor: String,
    pub values: IndexMap<String, f64>,
}

/// Most recent successful [`Record`] per sensor id.
///
/// Shared across all jobs within a tick (config order) and across ticks.
/// Entries are never pruned; a failing worker leaves the old value standing.
pub type LastValues = HashMap<String, Record>;

/// Storage table for a sensor: `{prefix}_{sensor}`, lower-cased.
pub fn table_name(prefix: &str, sensor: &str) -> String {
    format!("{prefix}_{sensor}").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_normalizes_to_value_key() {
        let record = Record {
            timestamp: 1_700_000_000,
            offset: 0.2,
            sensor: "box1".into(),
            value: Reading::Scalar(42.0),
        };
        let flat = record.flatten().unwrap();
        assert_eq!(flat.values.len(), 1);
        assert_eq!(flat.values["VALUE"], 42.0);
    }

    #[test]
    fn fields_preserve_key_order() {
        let mut map = IndexMap::new();
        map.insert("TEMP".to_string(), 21.5);
        map.insert("HUM".to_string(), 55.0);
        let record = Record {
            timestamp: 1_700_000_000,
            offset: 0.0,
            sensor: "bme".into(),
            value: Reading::Fields(map),
        };
        let flat = record.flatten().unwrap();
        let keys: Vec<_> = flat.values.keys().cloned().collect();
        assert_eq!(keys, vec!["TEMP", "HUM"]);
    }

    #[test]
    fn empty_sensor_is_rejected() {
        let record = Record {
            timestamp: 1,
            offset: 0.0,
            sensor: String::new(),
            value: Reading::Scalar(1.0),
        };
        assert!(matches!(
            record.flatten(),
            Err(RecordError::MissingField("SENSOR"))
        ));
    }

    #[test]
    fn empty_field_map_is_rejected() {
        let record = Record {
            timestamp: 1,
            offset: 0.0,
            sensor: "x".into(),
            value: Reading::Fields(IndexMap::new()),
        };
        assert!(matches!(record.flatten(), Err(RecordError::EmptyValue { .. })));
    }

    #[test]
    fn table_name_is_prefixed_and_lowercased() {
        assert_eq!(table_name("data", "BME280"), "data_bme280");
    }
}

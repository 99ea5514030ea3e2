//! Built-in drivers. Hardware-specific drivers (I²C sensors, GPIO relays)
//! live out of tree and register themselves on the [`WorkerRegistry`];
//! these three need nothing beyond the standard filesystem.

use std::path::PathBuf;

use verdant_core::{LastValues, Reading};

use crate::error::{Result, WorkerError};
use crate::registry::{Params, Worker};

const DEFAULT_THERMAL_PATH: &str = "/sys/class/thermal/thermal_zone0/temp";

/// Reads a sysfs thermal zone (millidegrees Celsius) and emits °C.
pub struct ThermalZone {
    path: PathBuf,
}

pub fn thermal_zone(params: &Params) -> Result<Box<dyn Worker>> {
    let path = match params.get("path") {
        None => PathBuf::from(DEFAULT_THERMAL_PATH),
        Some(v) => PathBuf::from(v.as_str().ok_or_else(|| WorkerError::InvalidParam {
            param: "path",
            reason: "expected a string".to_string(),
        })?),
    };
    Ok(Box::new(ThermalZone { path }))
}

impl Worker for ThermalZone {
    fn acquire(&mut self) -> Result<()> {
        if !self.path.exists() {
            return Err(WorkerError::Failed(format!(
                "thermal zone {} not present",
                self.path.display()
            )));
        }
        Ok(())
    }

    fn do_work(&mut self, _last_values: &LastValues) -> Result<Option<Reading>> {
        let raw = std::fs::read_to_string(&self.path)?;
        let millideg: f64 = raw
            .trim()
            .parse()
            .map_err(|e| WorkerError::Failed(format!("bad thermal reading: {e}")))?;
        Ok(Some(Reading::Scalar(round1(millideg / 1000.0))))
    }
}

/// Derives the dew point from another sensor's TEMP/HUM reading.
///
/// Demonstrates the cross-job contract: schedule this after the source
/// sensor and it sees the value produced earlier in the same tick.
pub struct Dewpoint {
    source: String,
}

pub fn dewpoint(params: &Params) -> Result<Box<dyn Worker>> {
    let source = params
        .get("source")
        .and_then(|v| v.as_str())
        .ok_or_else(|| WorkerError::InvalidParam {
            param: "source",
            reason: "required string naming the TEMP/HUM sensor".to_string(),
        })?;
    Ok(Box::new(Dewpoint {
        source: source.to_string(),
    }))
}

impl Worker for Dewpoint {
    fn do_work(&mut self, last_values: &LastValues) -> Result<Option<Reading>> {
        let Some(record) = last_values.get(&self.source) else {
            // Source sensor has not produced anything yet.
            return Ok(None);
        };
        let Reading::Fields(fields) = &record.value else {
            return Ok(None);
        };
        match (fields.get("TEMP"), fields.get("HUM")) {
            (Some(&temp), Some(&hum)) => Ok(Some(Reading::Scalar(round1(calc_dewp(temp, hum))))),
            _ => Ok(None),
        }
    }
}

/// Magnus approximation over the liquid-water range.
fn calc_dewp(temp: f64, hum: f64) -> f64 {
    const A: f64 = 17.08085;
    const B: f64 = 234.175;
    const E0: f64 = 6.1078;
    let e_sat = E0 * (A * temp / (B + temp)).exp();
    let e = hum / 100.0 * e_sat;
    B * (e / E0).ln() / (A - (e / E0).ln())
}

/// Emits a constant reading from params. Useful for wiring tests and for
/// exercising a fresh install without hardware.
pub struct Fixed {
    reading: Reading,
}

pub fn fixed(params: &Params) -> Result<Box<dyn Worker>> {
    let value = params.get("value").ok_or_else(|| WorkerError::InvalidParam {
        param: "value",
        reason: "required number or object of numbers".to_string(),
    })?;
    let reading: Reading =
        serde_json::from_value(value.clone()).map_err(|e| WorkerError::InvalidParam {
            param: "value",
            reason: e.to_string(),
        })?;
    Ok(Box::new(Fixed { reading }))
}

impl Worker for Fixed {
    fn do_work(&mut self, _last_values: &LastValues) -> Result<Option<Reading>> {
        Ok(Some(self.reading.clone()))
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

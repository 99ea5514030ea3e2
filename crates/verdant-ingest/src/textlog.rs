//! Plain-text duplicate of the record stream, one pair of files per sensor:
//! `{table}.txt` is a tab-separated append log (header written on first
//! creation), `{table}_latest.txt` always holds only the most recent row.
//! Best-effort: failures are logged and never propagate to the scheduler.

use std::io::Write;
use std::path::Path;

use tracing::warn;
use verdant_core::{table_name, FlatRecord, Record};

/// Write `record` into the per-sensor text files under `dir`.
pub fn write_line(dir: &Path, prefix: &str, record: &Record) {
    let flat = match record.flatten() {
        Ok(flat) => flat,
        Err(e) => {
            warn!(error = %e, "text log: record dropped");
            return;
        }
    };
    if let Err(e) = write_files(dir, prefix, &flat) {
        warn!(error = %e, sensor = %flat.sensor, "text log write failed");
    }
}

fn write_files(dir: &Path, prefix: &str, flat: &FlatRecord) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let table = table_name(prefix, &flat.sensor);

    let header = header_line(flat);
    let row = row_line(flat);

    let append_path = dir.join(format!("{table}.txt"));
    let fresh = !append_path.exists();
    let mut log = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&append_path)?;
    if fresh {
        log.write_all(header.as_bytes())?;
    }
    log.write_all(row.as_bytes())?;

    std::fs::write(dir.join(format!("{table}_latest.txt")), header + &row)?;
    Ok(())
}

fn header_line(flat: &FlatRecord) -> String {
    let mut cols = vec!["TIMESTAMP", "OFFSET", "SENSOR"];
    cols.extend(flat.values.keys().map(String::as_str));
    cols.join("\t") + "\r\n"
}

fn row_line(flat: &FlatRecord) -> String {
    let mut cells = vec![
        flat.timestamp.to_string(),
        flat.offset.to_string(),
        flat.sensor.clone(),
    ];
    cells.extend(flat.values.values().map(|v| v.to_string()));
    cells.join("\t") + "\r\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdant_core::Reading;

    fn record(timestamp: i64, value: f64) -> Record {
        Record {
            timestamp,
            offset: 0.2,
            sensor: "soil".to_string(),
            value: Reading::Scalar(value),
        }
    }

    #[test]
    fn append_log_gets_header_once() {
        let dir = tempfile::tempdir().unwrap();
        write_line(dir.path(), "data", &record(100, 1.0));
        write_line(dir.path(), "data", &record(160, 2.0));

        let log = std::fs::read_to_string(dir.path().join("data_soil.txt")).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "TIMESTAMP\tOFFSET\tSENSOR\tVALUE");
        assert!(lines[1].starts_with("100\t"));
        assert!(lines[2].starts_with("160\t"));
    }

    #[test]
    fn latest_file_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        write_line(dir.path(), "data", &record(100, 1.0));
        write_line(dir.path(), "data", &record(160, 2.0));

        let latest =
            std::fs::read_to_string(dir.path().join("data_soil_latest.txt")).unwrap();
        let lines: Vec<&str> = latest.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("160\t"));
        assert!(lines[1].ends_with("\t2"));
    }
}

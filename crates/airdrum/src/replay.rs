//! Recorded session input
//!
//! A recording is a JSON-lines file. Each line is either a pose frame
//!
//! ```json
//! {"timestamp": 0.033, "joints": {"right_wrist": [0.75, 0.5, 0.0]}}
//! ```
//!
//! or a batch of non-visual sensor readings
//!
//! ```json
//! {"timestamp": 0.040, "sensors": {"foot_g": 1.8, "mic_amplitude": 0.4}}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use airdrum_core::{PoseFrame, SensorReadings};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One line of a recording
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Record {
    /// Joint positions from the pose provider
    Pose(PoseFrame),
    /// Scalar sensor readings
    Sensors {
        /// Seconds
        timestamp: f64,
        /// Readings present at this instant
        sensors: SensorReadings,
    },
}

impl Record {
    /// Timestamp in seconds
    pub fn timestamp(&self) -> f64 {
        match self {
            Record::Pose(frame) => frame.timestamp,
            Record::Sensors { timestamp, .. } => *timestamp,
        }
    }
}

/// Parse a single line; `None` for blank and comment lines
pub fn parse_line(line: &str) -> Result<Option<Record>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(line)?))
}

/// Read a whole recording, failing on the first malformed line
pub fn read_records(path: &Path) -> Result<Vec<Record>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open recording {:?}", path))?;

    let mut records = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {:?}", path))?;
        if let Some(record) =
            parse_line(&line).with_context(|| format!("{:?}:{}: invalid record", path, index + 1))?
        {
            records.push(record);
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use airdrum_core::{JointId, Vec3};
    use std::io::Write;

    #[test]
    fn test_parse_pose_and_sensor_lines() {
        let pose = parse_line(r#"{"timestamp": 0.5, "joints": {"left_knee": [0.5, 0.8, 0.1]}}"#)
            .unwrap()
            .unwrap();
        match pose {
            Record::Pose(frame) => {
                assert_eq!(frame.timestamp, 0.5);
                assert_eq!(frame.position(JointId::LeftKnee), Some(Vec3::new(0.5, 0.8, 0.1)));
            }
            other => panic!("expected pose, got {:?}", other),
        }

        let sensors = parse_line(r#"{"timestamp": 1.0, "sensors": {"mic_amplitude": 0.3}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            sensors,
            Record::Sensors {
                timestamp: 1.0,
                sensors: SensorReadings {
                    mic_amplitude: Some(0.3),
                    ..Default::default()
                },
            }
        );
        assert_eq!(sensors.timestamp(), 1.0);
    }

    #[test]
    fn test_untracked_landmarks_do_not_reject_line() {
        let line = r#"{"timestamp": 0.1, "joints": {"left_elbow": [0.3, 0.4, 0.0], "left_knee": [0.5, 0.8, 0.0]}}"#;
        match parse_line(line).unwrap().unwrap() {
            Record::Pose(frame) => {
                assert_eq!(frame.len(), 1);
                assert!(frame.position(JointId::LeftKnee).is_some());
            }
            other => panic!("expected pose, got {:?}", other),
        }
    }

    #[test]
    fn test_skips_comments_and_reports_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# session 1").unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"timestamp": 0.0, "joints": {{}}}}"#).unwrap();
        writeln!(file, "not json").unwrap();

        let err = read_records(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains(":4:"));
    }
}

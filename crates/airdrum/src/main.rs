//! Airdrum host
//!
//! Replays a recorded session through the trigger engine and forwards every
//! hit to the log and to the configured MIDI/OSC outputs.
//!
//! ```text
//! airdrum [--config <file>] [--calibrate] <recording.jsonl>
//! ```

use airdrum_core::sink::{HitSink, LogSink};
use airdrum_core::{
    dispatch, DrumPipeline, EngineConfig, HeightCalibrator, PositionSmoother,
    UnifiedTriggerSystem, ZoneMapHandle,
};
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use tracing::{info, warn};

mod logging_setup;
mod replay;

use replay::Record;

const USAGE: &str = "usage: airdrum [--config <file>] [--calibrate] <recording.jsonl>";

#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    calibrate: bool,
    recording: PathBuf,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut config = None;
    let mut calibrate = false;
    let mut recording = None;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => {
                let path = args.next().context("--config needs a file")?;
                config = Some(PathBuf::from(path));
            }
            "--calibrate" => calibrate = true,
            "-h" | "--help" => bail!(USAGE),
            other if other.starts_with('-') => bail!("unknown option {}\n{}", other, USAGE),
            other => {
                if recording.replace(PathBuf::from(other)).is_some() {
                    bail!("more than one recording given\n{}", USAGE);
                }
            }
        }
    }

    Ok(Args {
        config,
        calibrate,
        recording: recording.context(USAGE)?,
    })
}

fn build_sinks(config: &EngineConfig) -> Vec<Box<dyn HitSink>> {
    let mut sinks: Vec<Box<dyn HitSink>> = vec![Box::new(LogSink)];

    #[cfg(feature = "midi")]
    if config.forwarding.midi.enabled {
        use airdrum_control::{MidiForwarder, MidirPort};
        let midi = &config.forwarding.midi;
        match MidirPort::open(midi.port_name.as_deref())
            .and_then(|port| MidiForwarder::from_config(port, midi))
        {
            Ok(forwarder) => sinks.push(Box::new(forwarder)),
            Err(e) => warn!("MIDI forwarding disabled: {}", e),
        }
    }

    #[cfg(feature = "osc")]
    if config.forwarding.osc.enabled {
        match airdrum_control::OscForwarder::from_config(&config.forwarding.osc) {
            Ok(forwarder) => sinks.push(Box::new(forwarder)),
            Err(e) => warn!("OSC forwarding disabled: {}", e),
        }
    }

    sinks
}

fn main() -> Result<()> {
    let args = parse_args(std::env::args().skip(1))?;

    let config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load configuration {:?}", path))?,
        None => EngineConfig::default(),
    };

    let _log_guard = logging_setup::init(&config.log)?;

    info!("==========================================");
    info!("===       Airdrum Session Started      ===");
    info!("==========================================");

    let records = replay::read_records(&args.recording)?;
    info!("Loaded {} records from {:?}", records.len(), args.recording);

    let zones = ZoneMapHandle::from_zones(config.zones.clone())?;
    let mut pipeline = DrumPipeline::new(zones.clone(), config.detector, config.intensity);
    let mut smoother = PositionSmoother::new(config.smoothing_window);
    let mut unified = UnifiedTriggerSystem::new(config.unified.clone());
    let mut sinks = build_sinks(&config);

    let mut calibrator = if args.calibrate {
        let mut calibrator = HeightCalibrator::new(config.calibration);
        calibrator.start(records.first().map(Record::timestamp).unwrap_or(0.0));
        Some(calibrator)
    } else {
        None
    };

    let mut delivered = 0;
    let mut sounds = 0;
    for record in &records {
        match record {
            Record::Pose(raw) => {
                let frame = smoother.smooth_frame(raw);

                if let Some(cal) = calibrator.as_mut().filter(|c| c.is_running()) {
                    if let Some(result) = cal.update(&frame) {
                        zones
                            .recalibrate(result.zones)
                            .context("Calibrated zone table was rejected")?;
                    }
                    continue;
                }

                let events = pipeline.process_frame(&frame);
                delivered += dispatch(&events, &mut sinks);
            }
            Record::Sensors { timestamp, sensors } => {
                let result = unified.process_unified(*sensors, *timestamp);
                for sound in &result.sounds {
                    info!(
                        "{:>8.3}s  {:<6} {:.2} ({:?})",
                        sound.timestamp, sound.sound_id, sound.volume, sound.source
                    );
                }
                sounds += result.sounds.len();
            }
        }
    }

    if let Some(cal) = calibrator.as_mut().filter(|c| c.is_running()) {
        warn!("Recording ended during calibration; finishing with collected samples");
        zones.recalibrate(cal.finish().zones)?;
    }

    info!(
        "Session finished: {} hits ({} deliveries), {} sensor sounds",
        pipeline.stats().total_hits(),
        delivered,
        sounds
    );

    let summary = serde_json::json!({
        "pipeline": pipeline.stats(),
        "unified": unified.statistics(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_args() {
        let parsed = args(&["--config", "kit.toml", "--calibrate", "take1.jsonl"]).unwrap();
        assert_eq!(
            parsed,
            Args {
                config: Some(PathBuf::from("kit.toml")),
                calibrate: true,
                recording: PathBuf::from("take1.jsonl"),
            }
        );
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(args(&[]).is_err());
        assert!(args(&["--config"]).is_err());
        assert!(args(&["--verbose", "a.jsonl"]).is_err());
        assert!(args(&["a.jsonl", "b.jsonl"]).is_err());
    }

    #[test]
    fn test_default_sinks_log_only() {
        let sinks = build_sinks(&EngineConfig::default());
        assert_eq!(sinks.len(), 1);
        assert_eq!(sinks[0].name(), "log");
    }
}

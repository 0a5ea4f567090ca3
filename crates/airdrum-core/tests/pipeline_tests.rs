use airdrum_core::calibration::default_height_kit;
use airdrum_core::{
    dispatch, seated_kit, DetectorConfig, DrumPipeline, HitSink, IntensityConfig, JointId,
    PoseFrame, PositionSmoother, RecordingSink, Vec3, ZoneMapHandle,
};

fn pipeline() -> DrumPipeline {
    DrumPipeline::new(
        ZoneMapHandle::from_zones(seated_kit()).unwrap(),
        DetectorConfig::default(),
        IntensityConfig::default(),
    )
}

/// Right wrist swings from above the snare down into it every `period` frames
fn snare_roll(frames: usize, fps: f64) -> Vec<PoseFrame> {
    (0..frames)
        .map(|i| {
            let y = if i % 2 == 0 { 0.2 } else { 0.5 };
            PoseFrame::new(i as f64 / fps).with_joint(JointId::RightWrist, Vec3::new(0.75, y, 0.0))
        })
        .collect()
}

#[test]
fn test_cooldown_limits_hit_rate() {
    let mut p = pipeline();
    // 30 fps: a strike every 2 frames is 66 ms apart, inside the 100 ms window
    let mut hits = Vec::new();
    for frame in snare_roll(30, 30.0) {
        hits.extend(p.process_frame(&frame));
    }
    assert!(!hits.is_empty());
    for pair in hits.windows(2) {
        assert!(pair[1].timestamp - pair[0].timestamp >= 0.1);
    }
    assert!(p.stats().suppressed > 0);
}

#[test]
fn test_kick_from_knee() {
    let mut p = pipeline();
    p.process_frame(&PoseFrame::new(0.0).with_joint(JointId::RightKnee, Vec3::new(0.5, 0.6, 0.0)));
    let events =
        p.process_frame(&PoseFrame::new(0.033).with_joint(JointId::RightKnee, Vec3::new(0.5, 0.85, 0.0)));
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].zone_id, "kick");
    assert_eq!(events[0].source_joint, JointId::RightKnee);
    assert!(events[0].intensity >= 0.3 && events[0].intensity <= 1.0);
}

#[test]
fn test_recalibration_visible_on_next_frame() {
    let mut p = pipeline();
    let handle = p.zones().clone();
    assert_eq!(p.stats().zone_generation, 0);

    p.process_frame(&PoseFrame::new(0.0).with_joint(JointId::LeftWrist, Vec3::new(0.5, 0.4, 0.0)));

    // Stacked layout: y 0.15 is the crash band, which the seated kit lacks
    let generation = handle.recalibrate(default_height_kit()).unwrap();
    assert_eq!(generation, 1);

    let events =
        p.process_frame(&PoseFrame::new(0.1).with_joint(JointId::LeftWrist, Vec3::new(0.5, 0.15, 0.0)));
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].zone_id, "crash");
    assert_eq!(p.stats().zone_generation, 1);
}

#[test]
fn test_smoothing_then_dispatch() {
    let mut smoother = PositionSmoother::new(2);
    let mut p = pipeline();
    let mut recorder: Vec<Box<dyn HitSink>> = vec![Box::new(RecordingSink::new())];

    let raw = [
        PoseFrame::new(0.0).with_joint(JointId::LeftWrist, Vec3::new(0.25, 0.1, 0.0)),
        PoseFrame::new(0.1).with_joint(JointId::LeftWrist, Vec3::new(0.25, 0.1, 0.0)),
        PoseFrame::new(0.2).with_joint(JointId::LeftWrist, Vec3::new(0.25, 0.7, 0.0)),
        PoseFrame::new(0.3).with_joint(JointId::LeftWrist, Vec3::new(0.25, 0.7, 0.0)),
    ];

    let mut delivered = 0;
    for frame in &raw {
        let smoothed = smoother.smooth_frame(frame);
        let events = p.process_frame(&smoothed);
        delivered += dispatch(&events, &mut recorder);
    }

    // Smoothed y: 0.1, 0.1, 0.4, 0.7 -> enters the hihat box (0.33..0.67) at 0.2s
    assert_eq!(delivered, 1);
    assert_eq!(p.stats().hits_per_zone.get("hihat"), Some(&1));
}

#[test]
fn test_missing_joint_keeps_stale_cache() {
    let mut p = pipeline();
    p.process_frame(&PoseFrame::new(0.0).with_joint(JointId::RightWrist, Vec3::new(0.75, 0.2, 0.0)));
    // Wrist absent for a while
    p.process_frame(&PoseFrame::new(0.5));
    let events =
        p.process_frame(&PoseFrame::new(1.0).with_joint(JointId::RightWrist, Vec3::new(0.75, 0.5, 0.0)));
    // 0.3 over 1.0s = 0.3 >= 0.2, still a hit
    assert_eq!(events.len(), 1);
    assert_eq!(p.stats().frames, 3);
}

use airdrum_core::trigger_system::{dynamic_volume, LatencyBudget};
use airdrum_core::{
    IntensityResolver, JointId, TriggerZone, Vec3, VelocityEstimator, ZoneShape,
};
use proptest::prelude::*;

fn coord() -> impl Strategy<Value = f32> {
    0.0f32..=1.0
}

fn position() -> impl Strategy<Value = Vec3> {
    (coord(), coord(), -1.0f32..=1.0).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

fn shape() -> impl Strategy<Value = ZoneShape> {
    prop_oneof![
        (position(), 0.01f32..0.5).prop_map(|(center, trigger_radius)| ZoneShape::Radial {
            center,
            trigger_radius
        }),
        (coord(), coord()).prop_map(|(a, b)| ZoneShape::HeightBand {
            y_min: a.min(b),
            y_max: a.max(b),
        }),
        (coord(), coord(), coord(), coord()).prop_map(|(a, b, c, d)| ZoneShape::Box {
            x_min: a.min(b),
            x_max: a.max(b),
            y_min: c.min(d),
            y_max: c.max(d),
        }),
    ]
}

proptest! {
    #[test]
    fn first_sample_has_zero_velocity(pos in position(), t in 0.0f64..1e6) {
        let mut estimator = VelocityEstimator::new();
        prop_assert_eq!(estimator.velocity(JointId::LeftWrist, pos, t), 0.0);
    }

    #[test]
    fn velocity_scales_inversely_with_dt(
        start in position(),
        offset in 0.01f32..0.5,
        dt1 in 0.001f64..0.5,
        extra in 0.001f64..0.5,
    ) {
        let end = start + Vec3::new(offset, 0.0, 0.0);
        let dt2 = dt1 + extra;

        let mut a = VelocityEstimator::new();
        a.velocity(JointId::RightWrist, start, 0.0);
        let v1 = a.velocity(JointId::RightWrist, end, dt1);

        let mut b = VelocityEstimator::new();
        b.velocity(JointId::RightWrist, start, 0.0);
        let v2 = b.velocity(JointId::RightWrist, end, dt2);

        prop_assert!(v1 > v2, "v1={} v2={}", v1, v2);
    }

    #[test]
    fn intensity_stays_within_floor_and_ceiling(
        shape in shape(),
        pos in position(),
        velocity in prop_oneof![0.0f32..100.0, Just(f32::NAN), Just(f32::INFINITY)],
        foot in any::<bool>(),
    ) {
        let zone = if foot {
            TriggerZone::foot("kick", shape)
        } else {
            TriggerZone::hand("snare", shape)
        };
        let resolver = IntensityResolver::default();
        let intensity = resolver.intensity(&zone, pos, velocity);
        prop_assert!((0.3..=1.0).contains(&intensity), "intensity={}", intensity);
    }

    #[test]
    fn dynamic_volume_is_monotonic(a in 0.0f32..=1.0, b in 0.0f32..=1.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(dynamic_volume(lo, 0.2, 1.0) <= dynamic_volume(hi, 0.2, 1.0));
    }

    #[test]
    fn latency_budget_is_additive(
        a in 0.0f32..1000.0,
        b in 0.0f32..1000.0,
        c in 0.0f32..1000.0,
        d in 0.0f32..1000.0,
        e in 0.0f32..1000.0,
    ) {
        prop_assert_eq!(LatencyBudget::new(a, b, c, d, e).total_ms(), a + b + c + d + e);
    }
}

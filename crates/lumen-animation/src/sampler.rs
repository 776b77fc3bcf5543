//! Pure keyframe evaluation — binary search + interpolation

use crate::clip::{Animation, AnimationKey, AnimationValue, Interpolation};

/// Sample an animation at a given frame.
///
/// Frames before the first key clamp to the first value, frames after the
/// last key clamp to the last value. Returns `None` when there are no keys.
pub fn sample(animation: &Animation, frame: f32) -> Option<AnimationValue> {
    let keys = &animation.keys;
    let first = keys.first()?;

    if frame <= first.frame {
        return Some(first.value);
    }

    let last = &keys[keys.len() - 1];
    if frame >= last.frame {
        return Some(last.value);
    }

    // Binary search for the interval containing `frame`
    let idx = match keys.binary_search_by(|k| k.frame.total_cmp(&frame)) {
        Ok(i) => return Some(keys[i].value),
        Err(i) => i,
    };

    let prev = &keys[idx - 1];
    let next = &keys[idx];

    let span = next.frame - prev.frame;
    if span <= 0.0 {
        return Some(prev.value);
    }
    let t = (frame - prev.frame) / span;

    Some(match animation.interpolation {
        Interpolation::Step => prev.value,
        Interpolation::Linear => prev.value.lerp(&next.value, t),
        Interpolation::CubicSpline => hermite_keys(prev, next, span, t),
    })
}

fn hermite_keys(prev: &AnimationKey, next: &AnimationKey, span: f32, t: f32) -> AnimationValue {
    match (prev.value, next.value) {
        (AnimationValue::Float(p0), AnimationValue::Float(p1)) => {
            let m0 = prev.out_tangent.and_then(|v| v.as_float()).unwrap_or(0.0);
            let m1 = next.in_tangent.and_then(|v| v.as_float()).unwrap_or(0.0);
            AnimationValue::Float(cubic_hermite(p0, m0 * span, p1, m1 * span, t))
        }
        (AnimationValue::Vector3(p0), AnimationValue::Vector3(p1)) => {
            let m0 = prev.out_tangent.and_then(|v| v.as_vector3()).unwrap_or_default() * span;
            let m1 = next.in_tangent.and_then(|v| v.as_vector3()).unwrap_or_default() * span;
            AnimationValue::Vector3(glam::Vec3::new(
                cubic_hermite(p0.x, m0.x, p1.x, m1.x, t),
                cubic_hermite(p0.y, m0.y, p1.y, m1.y, t),
                cubic_hermite(p0.z, m0.z, p1.z, m1.z, t),
            ))
        }
        // Quaternions have no meaningful hermite form here; fall back to slerp
        (a, b) => a.lerp(&b, t),
    }
}

/// Cubic Hermite spline interpolation on one component.
///
/// `p0`, `m0`: start value and outgoing tangent (already scaled by the span)
/// `p1`, `m1`: end value and incoming tangent (already scaled by the span)
/// `t`: normalized [0..1] parameter
pub fn cubic_hermite(p0: f32, m0: f32, p1: f32, m1: f32, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;

    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + t;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;

    h00 * p0 + h10 * m0 + h01 * p1 + h11 * m1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::LoopMode;
    use glam::Vec3;

    fn float_anim(interp: Interpolation, keys: &[(f32, f32)]) -> Animation {
        Animation::new("test", "visibility", 30.0, LoopMode::Cycle)
            .with_interpolation(interp)
            .with_keys(
                keys.iter()
                    .map(|&(f, v)| AnimationKey::new(f, AnimationValue::Float(v)))
                    .collect(),
            )
    }

    #[test]
    fn sample_empty_animation_returns_none() {
        let anim = float_anim(Interpolation::Linear, &[]);
        assert!(sample(&anim, 0.5).is_none());
    }

    #[test]
    fn sample_clamps_outside_key_range() {
        let anim = float_anim(Interpolation::Linear, &[(10.0, 1.0), (20.0, 3.0)]);
        assert_eq!(sample(&anim, 0.0), Some(AnimationValue::Float(1.0)));
        assert_eq!(sample(&anim, 50.0), Some(AnimationValue::Float(3.0)));
    }

    #[test]
    fn sample_linear_midpoint() {
        let anim = float_anim(Interpolation::Linear, &[(0.0, 0.0), (10.0, 10.0)]);
        assert_eq!(sample(&anim, 2.5), Some(AnimationValue::Float(2.5)));
    }

    #[test]
    fn sample_exact_key() {
        let anim = float_anim(Interpolation::Linear, &[(0.0, 0.0), (5.0, 7.0), (10.0, 0.0)]);
        assert_eq!(sample(&anim, 5.0), Some(AnimationValue::Float(7.0)));
    }

    #[test]
    fn sample_step_holds_previous() {
        let anim = float_anim(Interpolation::Step, &[(0.0, 1.0), (10.0, 2.0)]);
        assert_eq!(sample(&anim, 9.9), Some(AnimationValue::Float(1.0)));
    }

    #[test]
    fn hermite_with_flat_tangents_hits_endpoints() {
        assert_eq!(cubic_hermite(1.0, 0.0, 5.0, 0.0, 0.0), 1.0);
        assert_eq!(cubic_hermite(1.0, 0.0, 5.0, 0.0, 1.0), 5.0);
        // symmetric ease at the midpoint
        assert!((cubic_hermite(0.0, 0.0, 2.0, 0.0, 0.5) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn sample_vector_keys() {
        let anim = Animation::new("move", "position", 30.0, LoopMode::Cycle).with_keys(vec![
            AnimationKey::new(0.0, AnimationValue::Vector3(Vec3::ZERO)),
            AnimationKey::new(30.0, AnimationValue::Vector3(Vec3::new(3.0, 0.0, 0.0))),
        ]);
        let v = sample(&anim, 10.0).and_then(|v| v.as_vector3()).unwrap();
        assert!((v - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-6);
    }
}

//! Keyframe reduction
//!
//! Interior samples that lie strictly within epsilon of the line between
//! the last retained sample and a later one are dropped. The greedy pass is
//! repeated until nothing more can be removed, so optimizing an already
//! optimized curve is a no-op.

use super::AnimationCurve;

/// Tolerance for a precision value: 10^-precision
pub fn precision_epsilon(precision: f64) -> f64 {
    10f64.powf(-precision)
}

/// Remove redundant samples from a curve
///
/// The first and last samples are always kept and the order never changes.
pub fn optimize(curve: &AnimationCurve, epsilon: f64) -> AnimationCurve {
    let mut samples = curve.samples.clone();
    loop {
        let reduced = reduce(&samples, epsilon);
        if reduced.len() == samples.len() {
            return AnimationCurve { samples };
        }
        samples = reduced;
    }
}

fn reduce(samples: &[(f64, f64)], epsilon: f64) -> Vec<(f64, f64)> {
    if samples.len() <= 2 {
        return samples.to_vec();
    }

    let mut kept = vec![samples[0]];
    let mut anchor = 0;
    for end in anchor + 2..samples.len() {
        let covered = (anchor + 1..end).all(|k| deviation(samples[anchor], samples[end], samples[k]) < epsilon);
        if !covered {
            anchor = end - 1;
            kept.push(samples[anchor]);
        }
    }
    if let Some(&last) = samples.last() {
        kept.push(last);
    }
    kept
}

/// Distance in value between `point` and the line through `a` and `b`
fn deviation(a: (f64, f64), b: (f64, f64), point: (f64, f64)) -> f64 {
    let span = b.0 - a.0;
    if span.abs() <= f64::EPSILON {
        return (point.1 - a.1).abs();
    }
    let t = (point.0 - a.0) / span;
    (point.1 - (a.1 + (b.1 - a.1) * t)).abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn curve(samples: &[(f64, f64)]) -> AnimationCurve {
        AnimationCurve {
            samples: samples.to_vec(),
        }
    }

    fn frames(curve: &AnimationCurve) -> Vec<f64> {
        curve.samples.iter().map(|s| s.0).collect()
    }

    #[test]
    fn test_precision_epsilon() {
        assert_relative_eq!(precision_epsilon(4.0), 1e-4);
        assert_relative_eq!(precision_epsilon(1.0), 0.1);
    }

    #[test]
    fn test_collinear_reduces_to_endpoints() {
        let input = curve(&[(0.0, 0.0), (10.0, 1.0), (20.0, 2.0), (30.0, 3.0)]);
        assert_eq!(frames(&optimize(&input, 1e-4)), vec![0.0, 30.0]);
    }

    #[test]
    fn test_zero_epsilon_keeps_everything() {
        let input = curve(&[(0.0, 0.0), (10.0, 1.0), (20.0, 2.0), (30.0, 3.0)]);
        assert_eq!(optimize(&input, 0.0), input);
    }

    #[test]
    fn test_corner_is_kept() {
        let input = curve(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 1.0), (4.0, 0.0)]);
        assert_eq!(frames(&optimize(&input, 1e-6)), vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn test_idempotent() {
        let input = curve(
            &(0..40)
                .map(|i| {
                    let f = i as f64;
                    (f, (f * 0.3).sin() + if i % 7 == 0 { 0.01 } else { 0.0 })
                })
                .collect::<Vec<_>>(),
        );
        for epsilon in [0.0, 1e-6, 1e-3, 0.05, 0.5, 10.0] {
            let once = optimize(&input, epsilon);
            assert_eq!(optimize(&once, epsilon), once);
        }
    }

    #[test]
    fn test_endpoints_survive_any_epsilon() {
        let input = curve(&[(1.0, 5.0), (2.0, -3.0), (3.0, 8.0)]);
        for epsilon in [0.0, 1.0, 1e9] {
            let out = optimize(&input, epsilon);
            assert_eq!(out.samples.first(), Some(&(1.0, 5.0)));
            assert_eq!(out.samples.last(), Some(&(3.0, 8.0)));
        }
        let pair = curve(&[(0.0, 1.0), (1.0, 2.0)]);
        assert_eq!(optimize(&pair, 1e9), pair);
    }
}

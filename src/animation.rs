//! `AnimationStack`, `AnimationLayer`, `AnimationCurveNode`, `AnimationCurve`.
//!
//! Grounded on `sfbxAnimation.cpp`'s `AnimationCurve::evaluate` (binary
//! search + linear interpolation) and `AnimationCurveNode::getXXX`/
//! `applyAnimation` (per-kind aggregation of 1 or 3 curves). Tick/second
//! conversion uses the fixed `TICKS_PER_SECOND` constant from `sfbxTypes.h`.

use crate::object::ObjectId;
use crate::tokens::{DEFORM_PERCENT, FOCAL_LENGTH, LCL_ROTATION, LCL_SCALING, LCL_TRANSLATION, TICKS_PER_SECOND};

/// What a curve node drives, inferred from its connected target property
/// name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationKind {
    Position,
    Rotation,
    Scale,
    DeformWeight,
    FocalLength,
    #[default]
    Unknown,
}

impl AnimationKind {
    /// Maps a `Connections` `OP` property name to a kind, mirroring the
    /// original's string comparisons against `"Lcl Translation"` etc.
    pub fn from_property_name(name: &str) -> Self {
        match name {
            LCL_TRANSLATION => AnimationKind::Position,
            LCL_ROTATION => AnimationKind::Rotation,
            LCL_SCALING => AnimationKind::Scale,
            DEFORM_PERCENT => AnimationKind::DeformWeight,
            FOCAL_LENGTH => AnimationKind::FocalLength,
            _ => AnimationKind::Unknown,
        }
    }
}

pub fn seconds_to_ticks(seconds: f64) -> i64 {
    (seconds * TICKS_PER_SECOND as f64).round() as i64
}

pub fn ticks_to_seconds(ticks: i64) -> f64 {
    ticks as f64 / TICKS_PER_SECOND as f64
}

#[derive(Debug, Clone, Default)]
pub struct AnimationStackData {
    pub layers: Vec<ObjectId>,
    pub local_start_secs: f64,
    pub local_stop_secs: f64,
    pub reference_start_secs: f64,
    pub reference_stop_secs: f64,
}

impl AnimationStackData {
    /// Recomputes `local_stop`/`reference_stop` to cover every curve's last
    /// key, expanding (never shrinking) the current bounds. The original has
    /// a bug where it takes the *minimum* last-key time across curves
    /// instead of the maximum, silently truncating playback; this crate
    /// defaults to the corrected expand-to-max behavior unless
    /// `legacy_stop_bug` asks for byte-for-byte parity with that bug.
    pub fn recompute_stop_bounds(&mut self, curve_last_key_secs: impl Iterator<Item = f64>, legacy_stop_bug: bool) {
        let mut chosen: Option<f64> = None;
        for t in curve_last_key_secs {
            chosen = Some(match chosen {
                None => t,
                Some(acc) => {
                    if legacy_stop_bug {
                        acc.min(t)
                    } else {
                        acc.max(t)
                    }
                }
            });
        }
        if let Some(t) = chosen {
            self.local_stop_secs = t;
            self.reference_stop_secs = t;
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnimationLayerData {
    pub curve_nodes: Vec<ObjectId>,
}

#[derive(Debug, Clone, Default)]
pub struct AnimationCurveNodeData {
    pub kind: AnimationKind,
    /// Component curves, X/Y/Z order for 3-component kinds, single entry
    /// otherwise.
    pub curves: Vec<ObjectId>,
    /// Owning `AnimationLayer` (`OO` connection).
    pub layer: Option<ObjectId>,
    /// Animated object/property (`OP` connection) — kept separate from
    /// `layer` rather than conflated into one "parent" field.
    pub target: Option<ObjectId>,
}

#[derive(Debug, Clone, Default)]
pub struct AnimationCurveData {
    pub times: Vec<f32>,
    pub values: Vec<f32>,
    pub default: f32,
}

impl AnimationCurveData {
    /// Linear interpolation with a binary-search bracket and an exact-hit
    /// short-circuit. Returns `default` when there are no keys; clamps to
    /// the first/last value outside the key range.
    pub fn evaluate(&self, t: f32) -> f32 {
        if self.times.is_empty() {
            return self.default;
        }
        if t <= self.times[0] {
            return self.values[0];
        }
        if t >= *self.times.last().unwrap() {
            return *self.values.last().unwrap();
        }

        match self.times.binary_search_by(|probe| probe.partial_cmp(&t).unwrap()) {
            Ok(i) => self.values[i],
            Err(i) => {
                let (t0, t1) = (self.times[i - 1], self.times[i]);
                let (v0, v1) = (self.values[i - 1], self.values[i]);
                let alpha = (t - t0) / (t1 - t0);
                v0 + (v1 - v0) * alpha
            }
        }
    }
}

impl AnimationCurveNodeData {
    /// Evaluates a single-component curve node (DeformWeight/FocalLength).
    pub fn evaluate(&self, t: f32, curves: &[&AnimationCurveData]) -> f32 {
        curves.first().map(|c| c.evaluate(t)).unwrap_or(0.0)
    }

    /// Evaluates a 3-component curve node (Position/Rotation/Scale) as
    /// (x, y, z), falling back to 0.0 for any missing component curve.
    pub fn evaluate3(&self, t: f32, curves: &[Option<&AnimationCurveData>; 3]) -> [f32; 3] {
        [
            curves[0].map(|c| c.evaluate(t)).unwrap_or(0.0),
            curves[1].map(|c| c.evaluate(t)).unwrap_or(0.0),
            curves[2].map(|c| c.evaluate(t)).unwrap_or(0.0),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluate_interpolates_linearly() {
        let curve = AnimationCurveData {
            times: vec![0.0, 1.0, 2.0],
            values: vec![0.0, 10.0, 0.0],
            default: 0.0,
        };
        assert_eq!(curve.evaluate(0.5), 5.0);
        assert_eq!(curve.evaluate(1.5), 5.0);
    }

    #[test]
    fn evaluate_exact_hit_short_circuits() {
        let curve = AnimationCurveData {
            times: vec![0.0, 1.0, 2.0],
            values: vec![0.0, 10.0, 20.0],
            default: 0.0,
        };
        assert_eq!(curve.evaluate(1.0), 10.0);
    }

    #[test]
    fn evaluate_clamps_outside_range() {
        let curve = AnimationCurveData {
            times: vec![1.0, 2.0],
            values: vec![5.0, 9.0],
            default: 0.0,
        };
        assert_eq!(curve.evaluate(0.0), 5.0);
        assert_eq!(curve.evaluate(3.0), 9.0);
    }

    #[test]
    fn evaluate_empty_curve_returns_default() {
        let curve = AnimationCurveData {
            times: Vec::new(),
            values: Vec::new(),
            default: 2.5,
        };
        assert_eq!(curve.evaluate(1.0), 2.5);
    }

    #[test]
    fn tick_second_round_trip() {
        let t = seconds_to_ticks(1.5);
        assert!((ticks_to_seconds(t) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn stop_bounds_expand_to_max_by_default() {
        let mut stack = AnimationStackData::default();
        stack.recompute_stop_bounds([1.0, 3.0, 2.0].into_iter(), false);
        assert_eq!(stack.local_stop_secs, 3.0);
    }

    #[test]
    fn stop_bounds_legacy_takes_min() {
        let mut stack = AnimationStackData::default();
        stack.recompute_stop_bounds([1.0, 3.0, 2.0].into_iter(), true);
        assert_eq!(stack.local_stop_secs, 1.0);
    }
}

//! Arc-length parameterization for constant-speed travel.

use crate::curve::CatmullRomCurve;
use nalgebra::Vector3;

/// Minimum number of samples regardless of waypoint count.
pub const MIN_SAMPLES: usize = 240;

/// Samples per waypoint.
pub const SAMPLES_PER_WAYPOINT: usize = 12;

/// Cumulative-distance table over uniformly spaced curve parameters.
///
/// `distances` is non-decreasing, starts at 0 and ends at the total
/// length. The sampled points are kept for nearest-point lookups.
#[derive(Debug, Clone)]
pub struct ArcLengthTable {
    distances: Vec<f64>,
    params: Vec<f64>,
    samples: Vec<Vector3<f64>>,
    total: f64,
}

impl ArcLengthTable {
    /// Samples `curve` at max(240, 12 per waypoint) parameters.
    pub fn build(curve: &CatmullRomCurve) -> Self {
        let count = MIN_SAMPLES.max(curve.points().len() * SAMPLES_PER_WAYPOINT);
        Self::with_samples(curve, count)
    }

    /// Samples `curve` at exactly `count` (at least 2) parameters.
    pub fn with_samples(curve: &CatmullRomCurve, count: usize) -> Self {
        let count = count.max(2);
        let mut distances = Vec::with_capacity(count);
        let mut params = Vec::with_capacity(count);
        let mut samples = Vec::with_capacity(count);

        let mut s = 0.0;
        let mut prev = curve.point_at(0.0);
        for i in 0..count {
            let t = i as f64 / (count - 1) as f64;
            let p = curve.point_at(t);
            s += (p - prev).norm();
            distances.push(s);
            params.push(t);
            samples.push(p);
            prev = p;
        }

        Self {
            distances,
            params,
            samples,
            total: s,
        }
    }

    /// Total curve length.
    pub fn total_length(&self) -> f64 {
        self.total
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    /// Always false; a table has at least two samples.
    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    /// Cumulative distances, one per sample.
    pub fn distances(&self) -> &[f64] {
        &self.distances
    }

    /// Largest distance between two consecutive samples.
    pub fn max_sample_spacing(&self) -> f64 {
        self.distances
            .windows(2)
            .map(|w| w[1] - w[0])
            .fold(0.0, f64::max)
    }

    /// Curve parameter at arc length `s`.
    ///
    /// Binary search for the bracketing samples, then linear
    /// interpolation between their parameters.
    pub fn t_at_distance(&self, s: f64) -> f64 {
        if !(s > 0.0) {
            return 0.0;
        }
        if s >= self.total {
            return 1.0;
        }
        // First sample with distance >= s; index 0 holds 0 < s.
        let hi = self.distances.partition_point(|&d| d < s).max(1);
        let lo = hi - 1;
        let (s0, s1) = (self.distances[lo], self.distances[hi]);
        let (t0, t1) = (self.params[lo], self.params[hi]);
        let u = (s - s0) / (s1 - s0).max(1e-9);
        t0 + (t1 - t0) * u
    }

    /// Arc length at curve parameter `t`, the inverse of
    /// [`t_at_distance`](Self::t_at_distance).
    pub fn distance_at_t(&self, t: f64) -> f64 {
        if !(t > 0.0) {
            return 0.0;
        }
        if t >= 1.0 {
            return self.total;
        }
        let hi = self.params.partition_point(|&p| p < t).max(1);
        let lo = hi - 1;
        let (t0, t1) = (self.params[lo], self.params[hi]);
        let (s0, s1) = (self.distances[lo], self.distances[hi]);
        let u = (t - t0) / (t1 - t0).max(1e-12);
        s0 + (s1 - s0) * u
    }

    /// Arc length of the sample nearest to `p`.
    pub fn distance_at_closest_point(&self, p: &Vector3<f64>) -> f64 {
        let mut best_i = 0;
        let mut best_d = f64::INFINITY;
        for (i, q) in self.samples.iter().enumerate() {
            let d = (q - p).norm_squared();
            if d < best_d {
                best_d = d;
                best_i = i;
            }
        }
        self.distances[best_i]
    }
}

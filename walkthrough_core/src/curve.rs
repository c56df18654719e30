//! Smooth interpolant through the waypoints.

use nalgebra::Vector3;

/// Tension of the walkthrough curve. Low values keep the curve close to
/// the polyline and only soften the corners.
pub const DEFAULT_TENSION: f64 = 0.08;

/// Uniform Catmull-Rom spline parameterized by `t` in [0, 1].
///
/// Each segment is a cubic Hermite between two waypoints with tangents
/// `tension * (p[i+1] - p[i-1])`; the missing neighbours at both ends are
/// mirrored from the first and last segment.
#[derive(Debug, Clone)]
pub struct CatmullRomCurve {
    points: Vec<Vector3<f64>>,
    tension: f64,
}

impl CatmullRomCurve {
    /// Creates a curve with the default tension.
    pub fn new(points: Vec<Vector3<f64>>) -> Self {
        Self::with_tension(points, DEFAULT_TENSION)
    }

    /// Creates a curve with an explicit tension.
    pub fn with_tension(points: Vec<Vector3<f64>>, tension: f64) -> Self {
        Self { points, tension }
    }

    /// Control points.
    pub fn points(&self) -> &[Vector3<f64>] {
        &self.points
    }

    /// True if there is nothing to interpolate.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Point on the curve at `t` (clamped to [0, 1]).
    ///
    /// An empty curve evaluates to the origin and a one-point curve to
    /// that point.
    pub fn point_at(&self, t: f64) -> Vector3<f64> {
        let l = self.points.len();
        match l {
            0 => return Vector3::zeros(),
            1 => return self.points[0],
            _ => {}
        }

        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        let p = (l - 1) as f64 * t;
        let mut i = p.floor() as usize;
        let mut w = p - i as f64;
        if i >= l - 1 {
            i = l - 2;
            w = 1.0;
        }

        let pts = &self.points;
        let p1 = pts[i];
        let p2 = pts[i + 1];
        let p0 = if i > 0 { pts[i - 1] } else { pts[0] * 2.0 - pts[1] };
        let p3 = if i + 2 < l {
            pts[i + 2]
        } else {
            pts[l - 1] * 2.0 - pts[l - 2]
        };

        let t0 = (p2 - p0) * self.tension;
        let t1 = (p3 - p1) * self.tension;
        hermite(p1, p2, t0, t1, w)
    }
}

fn hermite(
    x0: Vector3<f64>,
    x1: Vector3<f64>,
    t0: Vector3<f64>,
    t1: Vector3<f64>,
    w: f64,
) -> Vector3<f64> {
    let c2 = x0 * -3.0 + x1 * 3.0 - t0 * 2.0 - t1;
    let c3 = x0 * 2.0 - x1 * 2.0 + t0 + t1;
    x0 + t0 * w + c2 * (w * w) + c3 * (w * w * w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_passes_through_control_points() {
        let pts = vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(2.0, 0.0, 1.0),
            Vector3::new(4.0, 1.0, 0.0),
            Vector3::new(5.0, 1.0, 3.0),
        ];
        let curve = CatmullRomCurve::new(pts.clone());
        for (k, p) in pts.iter().enumerate() {
            let t = k as f64 / 3.0;
            assert_relative_eq!(curve.point_at(t), *p, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_two_points_stay_on_segment() {
        let a = Vector3::new(0.0, 1.6, 0.0);
        let b = Vector3::new(3.0, 1.6, 4.0);
        let curve = CatmullRomCurve::new(vec![a, b]);
        for k in 0..=20 {
            let p = curve.point_at(k as f64 / 20.0);
            // Collinear: the cross product with the segment vanishes.
            assert_relative_eq!((p - a).cross(&(b - a)).norm(), 0.0, epsilon = 1e-9);
        }
        assert_relative_eq!(curve.point_at(1.0), b, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_curves() {
        assert_eq!(CatmullRomCurve::new(vec![]).point_at(0.5), Vector3::zeros());
        let p = Vector3::new(1.0, 2.0, 3.0);
        assert_eq!(CatmullRomCurve::new(vec![p]).point_at(0.7), p);
    }

    #[test]
    fn test_parameter_is_clamped() {
        let curve = CatmullRomCurve::new(vec![Vector3::zeros(), Vector3::new(1.0, 0.0, 0.0)]);
        assert_eq!(curve.point_at(-3.0), Vector3::zeros());
        assert_relative_eq!(curve.point_at(7.0), Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
        assert_eq!(curve.point_at(f64::NAN), Vector3::zeros());
    }
}

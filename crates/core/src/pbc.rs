//! Orthorhombic periodic boundary conditions.

use crate::error::{PackingError, PackingResult};
use crate::util::norm_squared;

/// Orthorhombic periodic cell given by its three axis lengths (nm).
///
/// Only constructible through [`PeriodicBox::new`], so every instance has
/// strictly positive, finite axis lengths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodicBox {
    lengths: [f64; 3],
}

impl PeriodicBox {
    pub fn new(lengths: [f64; 3]) -> PackingResult<Self> {
        if lengths.iter().any(|&l| !l.is_finite() || l <= 0.0) {
            return Err(PackingError::config(format!(
                "periodic box axes must be positive, got [{}, {}, {}]",
                lengths[0], lengths[1], lengths[2]
            )));
        }
        Ok(Self { lengths })
    }

    /// Cubic box with side `length`.
    pub fn cubic(length: f64) -> PackingResult<Self> {
        Self::new([length; 3])
    }

    /// Build from a DCD unit cell `[a, b, c, alpha, beta, gamma]` (lengths in nm).
    ///
    /// Angles are ignored apart from a warning when the cell is visibly
    /// non-orthogonal; triclinic cells are treated as their a/b/c box.
    pub fn from_unit_cell(cell: &[f64; 6]) -> PackingResult<Self> {
        let angles = [cell[3], cell[4], cell[5]];
        // Some writers store cosines instead of degrees; 0.0 is a right angle there.
        let orthogonal = angles
            .iter()
            .all(|&a| (a - 90.0).abs() < 1e-3 || a.abs() < 1e-6);
        if !orthogonal {
            log::warn!(
                "Unit cell angles ({:.2}, {:.2}, {:.2}) are not orthogonal; using a/b/c as an orthorhombic box",
                angles[0],
                angles[1],
                angles[2],
            );
        }
        Self::new([cell[0], cell[1], cell[2]])
    }

    pub fn lengths(&self) -> [f64; 3] {
        self.lengths
    }

    pub fn volume(&self) -> f64 {
        self.lengths[0] * self.lengths[1] * self.lengths[2]
    }

    /// Minimum-image displacement `b - a`.
    ///
    /// Per axis: `d - L * round(d / L)`.
    #[inline]
    pub fn minimum_image(&self, a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
        let mut d = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
        for (axis, &length) in d.iter_mut().zip(self.lengths.iter()) {
            *axis -= length * (*axis / length).round();
        }
        d
    }

    #[inline]
    pub fn distance_squared(&self, a: &[f64; 3], b: &[f64; 3]) -> f64 {
        norm_squared(&self.minimum_image(a, b))
    }

    /// Minimum-image Euclidean distance.
    #[inline]
    pub fn distance(&self, a: &[f64; 3], b: &[f64; 3]) -> f64 {
        self.distance_squared(a, b).sqrt()
    }

    /// Wrap a position into the primary cell `[0, L)`.
    #[inline]
    pub fn wrap(&self, p: &[f64; 3]) -> [f64; 3] {
        let mut w = *p;
        for (axis, &length) in w.iter_mut().zip(self.lengths.iter()) {
            *axis = axis.rem_euclid(length);
            // rem_euclid can round up to exactly L for tiny negative inputs
            if *axis >= length {
                *axis = 0.0;
            }
        }
        w
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rejects_degenerate_axes() {
        assert!(PeriodicBox::new([1.0, 0.0, 1.0]).is_err());
        assert!(PeriodicBox::new([1.0, 1.0, -2.0]).is_err());
        assert!(PeriodicBox::new([f64::NAN, 1.0, 1.0]).is_err());
        assert!(matches!(
            PeriodicBox::cubic(0.0),
            Err(PackingError::InvalidConfiguration(_))
        ));
        assert!(PeriodicBox::new([2.0, 3.0, 4.0]).is_ok());
    }

    #[test]
    fn test_minimum_image_wraps_across_boundary() {
        let pbox = PeriodicBox::cubic(1.0).unwrap();
        let a = [0.05, 0.5, 0.5];
        let b = [0.95, 0.5, 0.5];
        assert_relative_eq!(pbox.distance(&a, &b), 0.1, epsilon = 1e-12);

        let d = pbox.minimum_image(&a, &b);
        assert_relative_eq!(d[0], -0.1, epsilon = 1e-12);
        assert_relative_eq!(d[1], 0.0);
    }

    #[test]
    fn test_minimum_image_far_images() {
        let pbox = PeriodicBox::new([2.0, 3.0, 4.0]).unwrap();
        // Raw difference spans several box lengths.
        let a = [0.1, 0.0, 0.0];
        let b = [6.2, 9.1, -7.9];
        let d = pbox.minimum_image(&a, &b);
        assert_relative_eq!(d[0], 0.1, epsilon = 1e-12);
        assert_relative_eq!(d[1], 0.1, epsilon = 1e-12);
        assert_relative_eq!(d[2], 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_wrap_into_primary_cell() {
        let pbox = PeriodicBox::cubic(1.0).unwrap();
        let w = pbox.wrap(&[-0.25, 1.5, 3.0]);
        assert_relative_eq!(w[0], 0.75, epsilon = 1e-12);
        assert_relative_eq!(w[1], 0.5, epsilon = 1e-12);
        assert_relative_eq!(w[2], 0.0, epsilon = 1e-12);
        assert!(w.iter().all(|&x| (0.0..1.0).contains(&x)));
    }

    #[test]
    fn test_from_unit_cell() {
        let pbox = PeriodicBox::from_unit_cell(&[3.1, 3.2, 3.3, 90.0, 90.0, 90.0]).unwrap();
        assert_eq!(pbox.lengths(), [3.1, 3.2, 3.3]);
        assert_relative_eq!(pbox.volume(), 3.1 * 3.2 * 3.3, epsilon = 1e-12);
        assert!(PeriodicBox::from_unit_cell(&[0.0, 3.2, 3.3, 90.0, 90.0, 90.0]).is_err());
    }
}

//! Small geometric helpers shared by the search and selection code.

/// Angstrom to nm conversion factor
pub const ANGSTROM_TO_NM: f64 = 0.1;

/// Squared Euclidean distance between two 3D points.
#[inline(always)]
pub fn distance_squared(p1: &[f64; 3], p2: &[f64; 3]) -> f64 {
    let dx = p1[0] - p2[0];
    let dy = p1[1] - p2[1];
    let dz = p1[2] - p2[2];
    dx * dx + dy * dy + dz * dz
}

/// Squared norm of a displacement given by its components.
#[inline(always)]
pub fn norm_squared(d: &[f64; 3]) -> f64 {
    d[0] * d[0] + d[1] * d[1] + d[2] * d[2]
}

/// Euclidean distance between two 3D points.
#[inline]
pub fn distance(p1: &[f64; 3], p2: &[f64; 3]) -> f64 {
    distance_squared(p1, p2).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_squared() {
        let p1 = [0.0, 0.0, 0.0];
        let p2 = [1.0, 0.0, 0.0];
        assert!((distance_squared(&p1, &p2) - 1.0).abs() < 1e-10);

        let p3 = [1.0, 1.0, 1.0];
        assert!((distance_squared(&p1, &p3) - 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_distance() {
        let p1 = [0.0, 0.0, 0.0];
        let p2 = [0.3, 0.4, 0.0];
        assert!((distance(&p1, &p2) - 0.5).abs() < 1e-12);
        assert!((norm_squared(&[0.3, 0.4, 0.0]) - 0.25).abs() < 1e-12);
    }
}

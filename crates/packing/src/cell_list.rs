//! Periodic cell list and the cutoff-limited nearest-neighbor search built on it.

use rustc_hash::FxHashMap;

use wpt_core::error::{PackingError, PackingResult};
use wpt_core::pbc::PeriodicBox;

use crate::neighbors::{nearest_to, require_box, NeighborSearch};

type CellKey = (i32, i32, i32);

/// Spatial hash of positions wrapped into a periodic box.
///
/// Cells are at least `cutoff` wide on every axis, so all minimum-image
/// partners within the cutoff live in the 27 cells around a query (fewer
/// when an axis holds less than three cells).
#[derive(Debug)]
pub struct PeriodicCellList {
    periodic_box: PeriodicBox,
    n_cells: [i32; 3],
    cell_edge: [f64; 3],
    cells: FxHashMap<CellKey, Vec<usize>>,
}

impl PeriodicCellList {
    pub fn new(positions: &[[f64; 3]], periodic_box: PeriodicBox, cutoff: f64) -> Self {
        let lengths = periodic_box.lengths();
        let mut n_cells = [1i32; 3];
        let mut cell_edge = lengths;
        for axis in 0..3 {
            n_cells[axis] = ((lengths[axis] / cutoff).floor() as i32).max(1);
            cell_edge[axis] = lengths[axis] / n_cells[axis] as f64;
        }

        let mut list = Self {
            periodic_box,
            n_cells,
            cell_edge,
            cells: FxHashMap::default(),
        };
        for (idx, pos) in positions.iter().enumerate() {
            let key = list.cell_of(pos);
            list.cells.entry(key).or_default().push(idx);
        }
        list
    }

    #[inline]
    fn cell_of(&self, pos: &[f64; 3]) -> CellKey {
        let w = self.periodic_box.wrap(pos);
        let index = |axis: usize| {
            ((w[axis] / self.cell_edge[axis]).floor() as i32).clamp(0, self.n_cells[axis] - 1)
        };
        (index(0), index(1), index(2))
    }

    /// Distinct cell indices along one axis adjacent to (and including) `c`.
    fn axis_neighbors(c: i32, n: i32) -> Vec<i32> {
        if n >= 3 {
            vec![(c - 1).rem_euclid(n), c, (c + 1).rem_euclid(n)]
        } else {
            (0..n).collect()
        }
    }

    /// Call `visit` with every atom index stored in the cells around `pos`.
    pub fn for_each_candidate(&self, pos: &[f64; 3], mut visit: impl FnMut(usize)) {
        let (cx, cy, cz) = self.cell_of(pos);
        let xs = Self::axis_neighbors(cx, self.n_cells[0]);
        let ys = Self::axis_neighbors(cy, self.n_cells[1]);
        let zs = Self::axis_neighbors(cz, self.n_cells[2]);
        for &x in &xs {
            for &y in &ys {
                for &z in &zs {
                    if let Some(members) = self.cells.get(&(x, y, z)) {
                        members.iter().copied().for_each(&mut visit);
                    }
                }
            }
        }
    }

    pub fn n_cells(&self) -> [i32; 3] {
        self.n_cells
    }
}

/// Nearest neighbor among the atoms within `cutoff` under the minimum-image
/// convention.
///
/// Atoms with no partner inside the cutoff are dropped from the output
/// unless the full-search fallback is enabled.
#[derive(Debug, Clone, Copy)]
pub struct PeriodicCutoffSearch {
    cutoff: f64,
    fallback_full_search: bool,
}

impl PeriodicCutoffSearch {
    pub fn new(cutoff: f64) -> PackingResult<Self> {
        if !cutoff.is_finite() || cutoff <= 0.0 {
            return Err(PackingError::config(format!(
                "cutoff must be a positive distance, got {}",
                cutoff
            )));
        }
        Ok(Self {
            cutoff,
            fallback_full_search: false,
        })
    }

    pub fn with_fallback(mut self, enabled: bool) -> Self {
        self.fallback_full_search = enabled;
        self
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }
}

impl NeighborSearch for PeriodicCutoffSearch {
    fn name(&self) -> &'static str {
        "periodic-cutoff"
    }

    fn needs_box(&self) -> bool {
        true
    }

    fn nearest_distances(
        &self,
        positions: &[[f64; 3]],
        periodic_box: Option<&PeriodicBox>,
    ) -> PackingResult<Vec<f64>> {
        let pbox = *require_box(periodic_box)?;
        if positions.len() < 2 {
            return Ok(Vec::new());
        }

        let cutoff_sq = self.cutoff * self.cutoff;
        let cells = PeriodicCellList::new(positions, pbox, self.cutoff);
        let mut distances = Vec::with_capacity(positions.len());
        let mut isolated = 0usize;

        for (i, pi) in positions.iter().enumerate() {
            let mut best = f64::INFINITY;
            cells.for_each_candidate(pi, |j| {
                if j == i {
                    return;
                }
                let r_sq = pbox.distance_squared(pi, &positions[j]);
                if r_sq > 0.0 && r_sq <= cutoff_sq && r_sq < best {
                    best = r_sq;
                }
            });

            if best.is_finite() {
                distances.push(best.sqrt());
            } else if self.fallback_full_search {
                if let Some(d) = nearest_to(i, pi, positions, |a, b| pbox.distance_squared(a, b)) {
                    distances.push(d);
                }
            } else {
                isolated += 1;
            }
        }

        if isolated > 0 {
            log::debug!(
                "{} of {} atoms have no neighbor within {} nm and were dropped",
                isolated,
                positions.len(),
                self.cutoff
            );
        }
        Ok(distances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neighbors::nearest_by_scan;
    use approx::assert_relative_eq;

    /// Deterministic pseudo-random positions inside `[0, length)^3`.
    fn scattered_positions(n: usize, length: f64, seed: u64) -> Vec<[f64; 3]> {
        let mut state = seed;
        let mut next = || {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 11) as f64 / (1u64 << 53) as f64 * length
        };
        (0..n).map(|_| [next(), next(), next()]).collect()
    }

    #[test]
    fn test_wraps_across_the_boundary() {
        let pbox = PeriodicBox::cubic(1.0).unwrap();
        let positions = [[0.05, 0.5, 0.5], [0.95, 0.5, 0.5]];
        let d = PeriodicCutoffSearch::new(0.5)
            .unwrap()
            .nearest_distances(&positions, Some(&pbox))
            .unwrap();
        assert_eq!(d.len(), 2);
        assert_relative_eq!(d[0], 0.1, epsilon = 1e-12);
        assert_relative_eq!(d[1], 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_isolated_atoms_are_omitted() {
        let pbox = PeriodicBox::cubic(10.0).unwrap();
        let positions = [
            [1.0, 1.0, 1.0],
            [1.2, 1.0, 1.0],
            [5.0, 5.0, 5.0],
            [8.0, 2.0, 6.0],
        ];
        let search = PeriodicCutoffSearch::new(0.5).unwrap();
        let d = search.nearest_distances(&positions, Some(&pbox)).unwrap();
        assert_eq!(d.len(), positions.len() - 2);
        assert_relative_eq!(d[0], 0.2, epsilon = 1e-12);

        let d = search
            .with_fallback(true)
            .nearest_distances(&positions, Some(&pbox))
            .unwrap();
        assert_eq!(d.len(), positions.len());
        assert!(d[2] > 0.5 && d[3] > 0.5);
    }

    #[test]
    fn test_cutoff_is_inclusive() {
        let pbox = PeriodicBox::cubic(10.0).unwrap();
        let positions = [[0.0, 0.0, 0.0], [0.5, 0.0, 0.0]];
        let d = PeriodicCutoffSearch::new(0.5)
            .unwrap()
            .nearest_distances(&positions, Some(&pbox))
            .unwrap();
        assert_eq!(d, vec![0.5, 0.5]);
    }

    #[test]
    fn test_agrees_with_periodic_all_pairs() {
        let pbox = PeriodicBox::new([3.0, 3.2, 2.9]).unwrap();
        let positions = scattered_positions(400, 2.9, 7);
        let reference = nearest_by_scan(&positions, |a, b| pbox.distance_squared(a, b));

        // At this density every atom has a partner well inside 0.8 nm.
        let d = PeriodicCutoffSearch::new(0.8)
            .unwrap()
            .nearest_distances(&positions, Some(&pbox))
            .unwrap();
        assert_eq!(d.len(), reference.len());
        for (got, want) in d.iter().zip(reference.iter()) {
            assert_relative_eq!(*got, *want, epsilon = 1e-12);
        }

        let d = PeriodicCutoffSearch::new(0.05)
            .unwrap()
            .with_fallback(true)
            .nearest_distances(&positions, Some(&pbox))
            .unwrap();
        assert_eq!(d.len(), reference.len());
        for (got, want) in d.iter().zip(reference.iter()) {
            assert_relative_eq!(*got, *want, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_requires_a_box() {
        let err = PeriodicCutoffSearch::new(0.5)
            .unwrap()
            .nearest_distances(&[[0.0; 3], [0.1, 0.0, 0.0]], None)
            .unwrap_err();
        assert!(matches!(err, PackingError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_rejects_bad_cutoff() {
        assert!(PeriodicCutoffSearch::new(0.0).is_err());
        assert!(PeriodicCutoffSearch::new(-0.5).is_err());
        assert!(PeriodicCutoffSearch::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_cell_counts() {
        let pbox = PeriodicBox::new([3.0, 1.0, 0.3]).unwrap();
        let list = PeriodicCellList::new(&[[0.1, 0.1, 0.1]], pbox, 0.5);
        assert_eq!(list.n_cells(), [6, 2, 1]);

        let mut seen = Vec::new();
        list.for_each_candidate(&[2.9, 0.9, 0.2], |j| seen.push(j));
        // Cell 5 on x wraps to cell 0, where atom 0 lives.
        assert_eq!(seen, vec![0]);
    }
}

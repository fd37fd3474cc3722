//! Per-frame nearest-neighbor distance searches.
//!
//! Both searches take the selected positions of one frame and return, in
//! selection order, one distance per atom that has an eligible neighbor.
//! Coincident atoms (distance exactly zero) are never eligible, so every
//! returned distance is strictly positive.

use wpt_core::error::{PackingError, PackingResult};
use wpt_core::pbc::PeriodicBox;
use wpt_core::util::distance_squared;

use crate::cell_list::PeriodicCutoffSearch;
use crate::config::SearchMode;

/// Computes per-atom nearest-neighbor distances for one frame.
pub trait NeighborSearch {
    /// Short label for logs.
    fn name(&self) -> &'static str;

    /// Whether `nearest_distances` reads the periodic box.
    fn needs_box(&self) -> bool {
        false
    }

    /// Nearest-neighbor distance (nm) of each atom that has one.
    ///
    /// `periodic_box` is the frame's box, if any; searches that need one
    /// fail with `InvalidConfiguration` when it is absent.
    fn nearest_distances(
        &self,
        positions: &[[f64; 3]],
        periodic_box: Option<&PeriodicBox>,
    ) -> PackingResult<Vec<f64>>;
}

/// Exhaustive O(M^2) search with plain Euclidean distances.
#[derive(Debug, Clone, Copy, Default)]
pub struct BruteForceSearch;

impl NeighborSearch for BruteForceSearch {
    fn name(&self) -> &'static str {
        "brute-force"
    }

    fn nearest_distances(
        &self,
        positions: &[[f64; 3]],
        _periodic_box: Option<&PeriodicBox>,
    ) -> PackingResult<Vec<f64>> {
        Ok(nearest_by_scan(positions, distance_squared))
    }
}

/// All-pairs scan under an arbitrary squared metric.
///
/// Atoms whose only partners sit at distance zero are left out.
pub(crate) fn nearest_by_scan(
    positions: &[[f64; 3]],
    metric: impl Fn(&[f64; 3], &[f64; 3]) -> f64,
) -> Vec<f64> {
    if positions.len() < 2 {
        return Vec::new();
    }
    positions
        .iter()
        .enumerate()
        .filter_map(|(i, pi)| nearest_to(i, pi, positions, &metric))
        .collect()
}

/// Nearest eligible partner of atom `i`, as a distance.
pub(crate) fn nearest_to(
    i: usize,
    pi: &[f64; 3],
    positions: &[[f64; 3]],
    metric: impl Fn(&[f64; 3], &[f64; 3]) -> f64,
) -> Option<f64> {
    positions
        .iter()
        .enumerate()
        .filter(|&(j, _)| j != i)
        .map(|(_, pj)| metric(pi, pj))
        .filter(|&r_sq| r_sq > 0.0)
        .min_by(f64::total_cmp)
        .map(f64::sqrt)
}

/// Build the search selected by `mode`.
///
/// The cutoff is validated here as well as in `PackingConfig::validate`, so
/// callers that skip the config still cannot build an unusable search.
pub fn build_search(
    mode: SearchMode,
    fallback_full_search: bool,
) -> PackingResult<Box<dyn NeighborSearch>> {
    match mode {
        SearchMode::BruteForce => Ok(Box::new(BruteForceSearch)),
        SearchMode::Periodic { cutoff } => Ok(Box::new(
            PeriodicCutoffSearch::new(cutoff)?.with_fallback(fallback_full_search),
        )),
    }
}

pub(crate) fn require_box(periodic_box: Option<&PeriodicBox>) -> PackingResult<&PeriodicBox> {
    periodic_box.ok_or_else(|| {
        PackingError::config("periodic search requested but the frame has no periodic box")
    })
}

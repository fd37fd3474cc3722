//! Packing analysis workflow.
//!
//! Frames are visited in increasing index order; for each sampled frame the
//! selected oxygens are gathered, searched for nearest neighbors and the
//! per-atom distances are appended to one owned [`DistanceCollection`].

use std::path::Path;

use wpt_core::error::{PackingError, PackingResult};
use wpt_core::pbc::PeriodicBox;
use wpt_core::selection::{select, AtomSelection};
use wpt_core::trajectory::{Frame, Trajectory};

use crate::aggregate::{DistanceCollection, Histogram, Statistics};
use crate::config::{PackingConfig, SearchMode};
use crate::neighbors::{build_search, NeighborSearch};

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct PackingReport {
    pub distances: DistanceCollection,
    pub statistics: Statistics,
    pub histogram: Histogram,
    /// Indices of the frames that were visited.
    pub sampled_frames: Vec<usize>,
    /// Sampled frames that contributed no distance.
    pub frames_skipped: usize,
    pub n_selected: usize,
    /// Search that produced the distances.
    pub search: SearchMode,
}

impl PackingReport {
    pub fn frames_processed(&self) -> usize {
        self.sampled_frames.len()
    }
}

/// Run one frame through `search` and append its distances.
///
/// Frames with fewer than two selected atoms contribute nothing and are
/// logged, not treated as errors. `box_override`, when set, replaces the
/// frame's own periodic box; the frame's unit cell is only read when the
/// search needs a box and no override is given.
pub fn process_frame(
    mut collection: DistanceCollection,
    frame_index: usize,
    frame: &Frame,
    selection: &AtomSelection,
    search: &dyn NeighborSearch,
    box_override: Option<&PeriodicBox>,
) -> PackingResult<DistanceCollection> {
    let positions = selection.gather(frame)?;
    if positions.len() < 2 {
        log::debug!(
            "Frame {}: {} selected atoms, skipping",
            frame_index,
            positions.len()
        );
        return Ok(collection);
    }

    let frame_box = match box_override {
        None if search.needs_box() => frame.periodic_box().map_err(|e| match e {
            PackingError::InvalidConfiguration(msg) => {
                PackingError::config(format!("frame {}: {}", frame_index, msg))
            }
            other => other,
        })?,
        _ => None,
    };
    let periodic_box = box_override.or(frame_box.as_ref());
    let distances = search.nearest_distances(&positions, periodic_box)?;
    log::debug!(
        "Frame {}: {} atoms, {} distances ({})",
        frame_index,
        positions.len(),
        distances.len(),
        search.name()
    );
    collection.record(&distances);
    Ok(collection)
}

/// Sample `trajectory`, collect nearest-neighbor distances for `selection`
/// and summarize them.
pub fn run_analysis(
    trajectory: &Trajectory,
    selection: &AtomSelection,
    config: &PackingConfig,
) -> PackingResult<PackingReport> {
    config.validate()?;
    let sampler = config.sampler()?;
    let search = build_search(config.search, config.fallback_full_search)?;
    let box_override = config.override_box()?;

    let sampled_frames = sampler.indices(trajectory.n_frames());
    log::info!(
        "Processing {} of {} frames (start={}, stride={}) with {} search over {} atoms",
        sampled_frames.len(),
        trajectory.n_frames(),
        config.start_frame,
        sampler.stride(),
        search.name(),
        selection.len()
    );

    let mut collection = DistanceCollection::new();
    let mut frames_skipped = 0;
    for &idx in &sampled_frames {
        let before = collection.len();
        collection = process_frame(
            collection,
            idx,
            &trajectory.frames[idx],
            selection,
            search.as_ref(),
            box_override.as_ref(),
        )?;
        if collection.len() == before {
            frames_skipped += 1;
        }
    }

    if collection.is_empty() {
        return Err(PackingError::EmptyResultSet(format!(
            "{} sampled frames of '{}' produced no distances",
            sampled_frames.len(),
            selection.expression()
        )));
    }
    if frames_skipped > 0 {
        log::warn!(
            "{} of {} sampled frames contributed no distances",
            frames_skipped,
            sampled_frames.len()
        );
    }

    let statistics = collection.statistics()?;
    let histogram = collection.density_histogram(
        config.histogram.bins,
        config.histogram.range,
        config.histogram.mode,
    )?;

    log::info!(
        "Collected {} distances: mean {:.3} nm, std {:.3} nm, median {:.3} nm",
        statistics.count,
        statistics.mean,
        statistics.std_dev,
        statistics.median
    );

    Ok(PackingReport {
        distances: collection,
        statistics,
        histogram,
        sampled_frames,
        frames_skipped,
        n_selected: selection.len(),
        search: config.search,
    })
}

/// Load a prmtop/DCD pair, evaluate the configured selection and run the analysis.
pub fn analyze_files(
    prmtop: &Path,
    dcd: &Path,
    config: &PackingConfig,
) -> PackingResult<PackingReport> {
    config.validate()?;
    let trajectory = Trajectory::load(prmtop, dcd)?;
    let selection = select(&trajectory.topology, &config.selection)?;
    log::info!(
        "Selected {} atoms with '{}'",
        selection.len(),
        selection.expression()
    );
    run_analysis(&trajectory, &selection, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neighbors::BruteForceSearch;
    use approx::assert_relative_eq;
    use wpt_core::amber::prmtop::AmberTopology;

    /// `n_waters` water residues (O, H1, H2) laid out along x.
    fn water_topology(n_waters: usize) -> AmberTopology {
        let n_atoms = 3 * n_waters;
        let atom_names = (0..n_atoms)
            .map(|i| ["O", "H1", "H2"][i % 3].to_string())
            .collect::<Vec<_>>();
        AmberTopology {
            n_atoms,
            n_residues: n_waters,
            atom_types: atom_names.clone(),
            atom_names,
            charges: vec![0.0; n_atoms],
            masses: (0..n_atoms)
                .map(|i| if i % 3 == 0 { 16.0 } else { 1.008 })
                .collect(),
            residue_labels: vec!["WAT".to_string(); n_waters],
            residue_pointers: (0..n_waters).map(|r| 3 * r).collect(),
        }
    }

    /// Oxygens spaced `spacing` apart on x; hydrogens close to their oxygen.
    fn water_frame(n_waters: usize, spacing: f64, pbox: Option<PeriodicBox>) -> Frame {
        let positions = (0..n_waters)
            .flat_map(|w| {
                let x = w as f64 * spacing;
                [[x, 0.0, 0.0], [x + 0.01, 0.09, 0.0], [x - 0.01, 0.09, 0.0]]
            })
            .collect();
        Frame::new(positions, pbox)
    }

    fn trajectory(n_frames: usize, spacing: f64, pbox: Option<PeriodicBox>) -> Trajectory {
        let frames = (0..n_frames).map(|_| water_frame(4, spacing, pbox)).collect();
        Trajectory::new(water_topology(4), frames).unwrap()
    }

    #[test]
    fn test_process_frame_appends() {
        let traj = trajectory(1, 0.3, None);
        let sel = select(&traj.topology, "name O").unwrap();
        let collection = DistanceCollection::from(vec![0.5]);
        let collection =
            process_frame(collection, 0, &traj.frames[0], &sel, &BruteForceSearch, None).unwrap();
        assert_eq!(collection.len(), 5);
        assert_relative_eq!(collection.samples()[1], 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_single_atom_frames_are_skipped() {
        let traj = trajectory(3, 0.3, None);
        let sel = select(&traj.topology, "name O and resid 1").unwrap();
        let collection = process_frame(
            DistanceCollection::new(),
            0,
            &traj.frames[0],
            &sel,
            &BruteForceSearch,
            None,
        )
        .unwrap();
        assert!(collection.is_empty());

        let config = PackingConfig {
            stride: 1,
            ..Default::default()
        };
        let err = run_analysis(&traj, &sel, &config).unwrap_err();
        assert!(matches!(err, PackingError::EmptyResultSet(_)));
    }

    #[test]
    fn test_run_analysis_brute_force() {
        let traj = trajectory(25, 0.3, None);
        let sel = select(&traj.topology, "name O").unwrap();
        let report = run_analysis(&traj, &sel, &PackingConfig::default()).unwrap();

        assert_eq!(report.sampled_frames, vec![0, 10, 20]);
        assert_eq!(report.frames_processed(), 3);
        assert_eq!(report.frames_skipped, 0);
        assert_eq!(report.n_selected, 4);
        assert_eq!(report.distances.len(), 12);
        assert_relative_eq!(report.statistics.mean, 0.3, epsilon = 1e-12);
        assert_relative_eq!(report.statistics.std_dev, 0.0, epsilon = 1e-12);
        assert_eq!(report.histogram.values.len(), 50);
        assert_eq!(report.search, SearchMode::BruteForce);
    }

    #[test]
    fn test_run_is_deterministic() {
        let traj = trajectory(12, 0.27, None);
        let sel = select(&traj.topology, "name O").unwrap();
        let config = PackingConfig {
            stride: 3,
            ..Default::default()
        };
        let a = run_analysis(&traj, &sel, &config).unwrap();
        let b = run_analysis(&traj, &sel, &config).unwrap();
        assert_eq!(a.distances, b.distances);
        assert_eq!(a.statistics, b.statistics);
    }

    #[test]
    fn test_periodic_mode_uses_frame_box_and_drops_isolated() {
        // Oxygens at x = 0, 0.3, 0.6, 0.9 in a 1.2 nm box: 0.9 and 0 are
        // 0.3 apart through the boundary.
        let pbox = PeriodicBox::cubic(1.2).unwrap();
        let traj = trajectory(2, 0.3, Some(pbox));
        let sel = select(&traj.topology, "name O").unwrap();
        let config = PackingConfig {
            stride: 1,
            search: SearchMode::Periodic { cutoff: 0.5 },
            ..Default::default()
        };
        let report = run_analysis(&traj, &sel, &config).unwrap();
        assert_eq!(report.distances.len(), 8);
        assert!(report
            .distances
            .samples()
            .iter()
            .all(|&d| (d - 0.3).abs() < 1e-12));

        // Spread out so no oxygen has a partner within 0.5 nm.
        let wide = PeriodicBox::cubic(8.0).unwrap();
        let traj = trajectory(2, 1.5, Some(wide));
        let err = run_analysis(&traj, &sel, &config).unwrap_err();
        assert!(matches!(err, PackingError::EmptyResultSet(_)));

        let fallback = PackingConfig {
            fallback_full_search: true,
            ..config
        };
        let report = run_analysis(&traj, &sel, &fallback).unwrap();
        assert_eq!(report.distances.len(), 8);
    }

    #[test]
    fn test_periodic_mode_without_box() {
        let traj = trajectory(2, 0.3, None);
        let sel = select(&traj.topology, "name O").unwrap();
        let config = PackingConfig {
            stride: 1,
            search: SearchMode::Periodic { cutoff: 0.5 },
            ..Default::default()
        };
        assert!(matches!(
            run_analysis(&traj, &sel, &config),
            Err(PackingError::InvalidConfiguration(_))
        ));

        let with_override = PackingConfig {
            box_override: Some([1.2, 1.2, 1.2]),
            ..config
        };
        assert_eq!(
            run_analysis(&traj, &sel, &with_override)
                .unwrap()
                .distances
                .len(),
            8
        );
    }

    #[test]
    fn test_bad_unit_cell_only_matters_to_periodic_search() {
        let mut traj = trajectory(2, 0.3, None);
        for frame in &mut traj.frames {
            frame.unit_cell = Some([-1.0, 1.2, 1.2, 90.0, 90.0, 90.0]);
        }
        let sel = select(&traj.topology, "name O").unwrap();
        let brute = PackingConfig {
            stride: 1,
            ..Default::default()
        };
        assert_eq!(run_analysis(&traj, &sel, &brute).unwrap().distances.len(), 8);

        let periodic = PackingConfig {
            search: SearchMode::Periodic { cutoff: 0.5 },
            ..brute
        };
        let err = run_analysis(&traj, &sel, &periodic).unwrap_err();
        assert!(matches!(err, PackingError::InvalidConfiguration(_)));
        assert!(err.to_string().contains("frame 0"));

        let with_override = PackingConfig {
            box_override: Some([1.2, 1.2, 1.2]),
            ..periodic
        };
        assert_eq!(
            run_analysis(&traj, &sel, &with_override)
                .unwrap()
                .distances
                .len(),
            8
        );
    }

    #[test]
    fn test_invalid_config_fails_before_processing() {
        let traj = trajectory(2, 0.3, None);
        let sel = select(&traj.topology, "name O").unwrap();
        let config = PackingConfig {
            stride: 0,
            ..Default::default()
        };
        assert!(matches!(
            run_analysis(&traj, &sel, &config),
            Err(PackingError::InvalidConfiguration(_))
        ));
    }
}

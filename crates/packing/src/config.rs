//! Analysis configuration.

use wpt_core::error::{PackingError, PackingResult};
use wpt_core::pbc::PeriodicBox;

use crate::aggregate::HistogramMode;
use crate::sampler::FrameSampler;

/// Default periodic search radius (nm).
pub const DEFAULT_CUTOFF: f64 = 0.5;

/// Which nearest-neighbor search runs on each frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SearchMode {
    /// All pairs, plain Euclidean distance.
    #[default]
    BruteForce,
    /// Minimum-image distance, candidates limited to `cutoff` nm.
    Periodic { cutoff: f64 },
}

/// Histogram binning.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramConfig {
    /// Number of equal-width bins. Default: 50.
    pub bins: usize,
    /// Explicit `(low, high)` range; `None` uses the data min/max.
    pub range: Option<(f64, f64)>,
    pub mode: HistogramMode,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            bins: 50,
            range: None,
            mode: HistogramMode::Density,
        }
    }
}

impl HistogramConfig {
    /// Conventional binning for a search mode: 50 density bins for the
    /// brute-force run, 30 frequency bins for the periodic run.
    pub fn for_search(search: &SearchMode) -> Self {
        match search {
            SearchMode::BruteForce => Self::default(),
            SearchMode::Periodic { .. } => Self {
                bins: 30,
                range: None,
                mode: HistogramMode::Frequency,
            },
        }
    }
}

/// Configuration for a packing analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct PackingConfig {
    /// Selection expression. Default: `name O`.
    pub selection: String,
    /// Process every Nth frame. Default: 10.
    pub stride: usize,
    /// First frame to process (0-based). Default: 0.
    pub start_frame: usize,
    /// Last frame to process (exclusive). Default: all frames.
    pub end_frame: Option<usize>,
    pub search: SearchMode,
    /// Box used instead of the per-frame unit cell (nm).
    pub box_override: Option<[f64; 3]>,
    /// Resolve atoms without a neighbor inside the cutoff with a periodic
    /// all-pairs search instead of dropping them.
    pub fallback_full_search: bool,
    pub histogram: HistogramConfig,
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            selection: "name O".to_string(),
            stride: 10,
            start_frame: 0,
            end_frame: None,
            search: SearchMode::BruteForce,
            box_override: None,
            fallback_full_search: false,
            histogram: HistogramConfig::default(),
        }
    }
}

impl PackingConfig {
    /// Check every parameter before any frame is touched.
    pub fn validate(&self) -> PackingResult<()> {
        self.sampler()?;
        if let SearchMode::Periodic { cutoff } = self.search {
            if !cutoff.is_finite() || cutoff <= 0.0 {
                return Err(PackingError::config(format!(
                    "cutoff must be a positive distance, got {}",
                    cutoff
                )));
            }
        }
        self.override_box()?;
        if self.histogram.bins == 0 {
            return Err(PackingError::config("histogram needs at least one bin"));
        }
        if let Some((lo, hi)) = self.histogram.range {
            if !lo.is_finite() || !hi.is_finite() || lo >= hi {
                return Err(PackingError::config(format!(
                    "histogram range ({}, {}) is empty or not finite",
                    lo, hi
                )));
            }
        }
        Ok(())
    }

    pub fn sampler(&self) -> PackingResult<FrameSampler> {
        FrameSampler::with_bounds(self.stride, self.start_frame, self.end_frame)
    }

    pub fn override_box(&self) -> PackingResult<Option<PeriodicBox>> {
        self.box_override.map(PeriodicBox::new).transpose()
    }
}

//! Nearest-neighbor packing analysis for water box trajectories.
//!
//! Samples frames of a trajectory, finds the nearest selected neighbor of
//! every selected atom (typically water oxygens) either by brute force or
//! with a periodic cutoff search, and summarizes the resulting distances as
//! statistics and a histogram.

pub mod aggregate;
pub mod cell_list;
pub mod config;
pub mod neighbors;
pub mod output;
pub mod pipeline;
pub mod plot;
pub mod sampler;

pub use aggregate::{DistanceCollection, Histogram, HistogramMode, Statistics};
pub use cell_list::PeriodicCutoffSearch;
pub use config::{HistogramConfig, PackingConfig, SearchMode};
pub use neighbors::{BruteForceSearch, NeighborSearch};
pub use pipeline::{analyze_files, process_frame, run_analysis, PackingReport};
pub use sampler::FrameSampler;

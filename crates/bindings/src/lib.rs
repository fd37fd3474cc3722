#![allow(clippy::useless_conversion)]
#![allow(clippy::too_many_arguments)]

use ndarray::ArrayView2;
use numpy::{PyArray1, PyReadonlyArray1, PyReadonlyArray2, PyUntypedArrayMethods};
use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use wpt_core::amber::prmtop::parse_prmtop;
use wpt_core::error::PackingError;
use wpt_core::pbc::PeriodicBox;
use wpt_core::selection::select;

use wpt_packing::config::{HistogramConfig, PackingConfig, SearchMode};
use wpt_packing::neighbors::build_search;
use wpt_packing::{analyze_files, DistanceCollection, FrameSampler, HistogramMode, Statistics};

// ============================================================================
// Helpers
// ============================================================================

fn to_py_err(err: PackingError) -> PyErr {
    match err {
        PackingError::LoadFailure(_) | PackingError::Io(_) => PyIOError::new_err(err.to_string()),
        other => PyValueError::new_err(other.to_string()),
    }
}

fn array2_to_positions(arr: &PyReadonlyArray2<'_, f64>) -> PyResult<Vec<[f64; 3]>> {
    if arr.shape()[1] != 3 {
        return Err(PyValueError::new_err(format!(
            "positions must have shape (n_atoms, 3), got {:?}",
            arr.shape()
        )));
    }
    let view: ArrayView2<'_, f64> = arr.as_array();
    Ok(view
        .outer_iter()
        .map(|row| [row[0], row[1], row[2]])
        .collect())
}

fn collection_from(distances: &PyReadonlyArray1<'_, f64>) -> DistanceCollection {
    DistanceCollection::from(distances.as_array().to_vec())
}

fn histogram_mode(density: bool) -> HistogramMode {
    if density {
        HistogramMode::Density
    } else {
        HistogramMode::Frequency
    }
}

fn search_mode(cutoff: Option<f64>) -> SearchMode {
    match cutoff {
        Some(cutoff) => SearchMode::Periodic { cutoff },
        None => SearchMode::BruteForce,
    }
}

fn statistics_dict<'py>(py: Python<'py>, stats: &Statistics) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new_bound(py);
    dict.set_item("mean", stats.mean)?;
    dict.set_item("std_dev", stats.std_dev)?;
    dict.set_item("count", stats.count)?;
    dict.set_item("median", stats.median)?;
    dict.set_item("min", stats.min)?;
    dict.set_item("max", stats.max)?;
    Ok(dict)
}

// ============================================================================
// NEAREST-NEIGHBOR DISTANCES
// ============================================================================

/// Nearest-neighbor distance of each atom in one frame (nm).
///
/// Without `cutoff` every pair is compared with plain Euclidean distances.
/// With `cutoff` the minimum-image search is used and `box_lengths` is
/// required; atoms without a partner inside the cutoff are omitted unless
/// `fallback_full_search` is set.
#[pyfunction]
#[pyo3(
    name = "nearest_distances",
    signature = (positions, box_lengths=None, cutoff=None, fallback_full_search=false)
)]
fn nearest_distances_py<'py>(
    py: Python<'py>,
    positions: PyReadonlyArray2<'py, f64>,
    box_lengths: Option<[f64; 3]>,
    cutoff: Option<f64>,
    fallback_full_search: bool,
) -> PyResult<Bound<'py, PyArray1<f64>>> {
    let positions = array2_to_positions(&positions)?;
    let pbox = box_lengths
        .map(PeriodicBox::new)
        .transpose()
        .map_err(to_py_err)?;
    let search = build_search(search_mode(cutoff), fallback_full_search).map_err(to_py_err)?;
    let distances = search
        .nearest_distances(&positions, pbox.as_ref())
        .map_err(to_py_err)?;
    Ok(PyArray1::from_vec_bound(py, distances))
}

// ============================================================================
// STATISTICS
// ============================================================================

/// Mean, population standard deviation, count, median, min and max.
#[pyfunction]
#[pyo3(name = "distance_statistics", signature = (distances))]
fn distance_statistics_py<'py>(
    py: Python<'py>,
    distances: PyReadonlyArray1<'py, f64>,
) -> PyResult<Bound<'py, PyDict>> {
    let stats = collection_from(&distances)
        .statistics()
        .map_err(to_py_err)?;
    statistics_dict(py, &stats)
}

/// Histogram as `(values, edges)`, numpy `histogram` compatible.
#[pyfunction]
#[pyo3(name = "density_histogram", signature = (distances, bins=50, range=None, density=true))]
fn density_histogram_py<'py>(
    py: Python<'py>,
    distances: PyReadonlyArray1<'py, f64>,
    bins: usize,
    range: Option<(f64, f64)>,
    density: bool,
) -> PyResult<(Bound<'py, PyArray1<f64>>, Bound<'py, PyArray1<f64>>)> {
    let histogram = collection_from(&distances)
        .density_histogram(bins, range, histogram_mode(density))
        .map_err(to_py_err)?;
    Ok((
        PyArray1::from_vec_bound(py, histogram.values),
        PyArray1::from_vec_bound(py, histogram.edges),
    ))
}

// ============================================================================
// TRAJECTORY WORKFLOW
// ============================================================================

/// Full analysis of a prmtop/DCD pair.
///
/// Returns a dict with `distances`, `statistics`, `histogram_values`,
/// `histogram_edges`, `sampled_frames`, `frames_skipped` and `n_selected`.
#[pyfunction]
#[pyo3(
    name = "analyze_trajectory",
    signature = (
        prmtop_path,
        dcd_path,
        selection="name O",
        stride=10,
        start_frame=0,
        end_frame=None,
        cutoff=None,
        box_lengths=None,
        fallback_full_search=false,
        bins=50,
        range=None,
        density=true,
    )
)]
fn analyze_trajectory_py<'py>(
    py: Python<'py>,
    prmtop_path: &str,
    dcd_path: &str,
    selection: &str,
    stride: usize,
    start_frame: usize,
    end_frame: Option<usize>,
    cutoff: Option<f64>,
    box_lengths: Option<[f64; 3]>,
    fallback_full_search: bool,
    bins: usize,
    range: Option<(f64, f64)>,
    density: bool,
) -> PyResult<Bound<'py, PyDict>> {
    let config = PackingConfig {
        selection: selection.to_string(),
        stride,
        start_frame,
        end_frame,
        search: search_mode(cutoff),
        box_override: box_lengths,
        fallback_full_search,
        histogram: HistogramConfig {
            bins,
            range,
            mode: histogram_mode(density),
        },
    };

    let report = py
        .allow_threads(|| {
            analyze_files(
                std::path::Path::new(prmtop_path),
                std::path::Path::new(dcd_path),
                &config,
            )
        })
        .map_err(to_py_err)?;

    let dict = PyDict::new_bound(py);
    dict.set_item(
        "distances",
        PyArray1::from_slice_bound(py, report.distances.samples()),
    )?;
    dict.set_item("statistics", statistics_dict(py, &report.statistics)?)?;
    dict.set_item(
        "histogram_values",
        PyArray1::from_slice_bound(py, &report.histogram.values),
    )?;
    dict.set_item(
        "histogram_edges",
        PyArray1::from_slice_bound(py, &report.histogram.edges),
    )?;
    dict.set_item("sampled_frames", report.sampled_frames.clone())?;
    dict.set_item("frames_skipped", report.frames_skipped)?;
    dict.set_item("n_selected", report.n_selected)?;
    Ok(dict)
}

/// 0-based indices of the atoms matched by `selection` in a prmtop file.
#[pyfunction]
#[pyo3(name = "select_atoms", signature = (prmtop_path, selection))]
fn select_atoms_py<'py>(
    py: Python<'py>,
    prmtop_path: &str,
    selection: &str,
) -> PyResult<Bound<'py, PyArray1<i64>>> {
    let topology = parse_prmtop(prmtop_path).map_err(to_py_err)?;
    let atoms = select(&topology, selection).map_err(to_py_err)?;
    log::debug!("'{}' matched {} atoms", selection, atoms.len());
    let indices: Vec<i64> = atoms.indices().iter().map(|&i| i as i64).collect();
    Ok(PyArray1::from_vec_bound(py, indices))
}

/// Frame indices visited for a trajectory of `n_frames` frames.
#[pyfunction]
#[pyo3(name = "sample_frames", signature = (n_frames, stride, start=0, end=None))]
fn sample_frames_py(
    n_frames: usize,
    stride: usize,
    start: usize,
    end: Option<usize>,
) -> PyResult<Vec<usize>> {
    let sampler = FrameSampler::with_bounds(stride, start, end).map_err(to_py_err)?;
    Ok(sampler.indices(n_frames))
}

// ============================================================================
// MODULE DEFINITION
// ============================================================================

#[pymodule]
fn water_packing_tools(m: &Bound<'_, PyModule>) -> PyResult<()> {
    pyo3_log::init();

    // Per-frame search
    m.add_function(wrap_pyfunction!(nearest_distances_py, m)?)?;

    // Aggregation
    m.add_function(wrap_pyfunction!(distance_statistics_py, m)?)?;
    m.add_function(wrap_pyfunction!(density_histogram_py, m)?)?;

    // Workflow
    m.add_function(wrap_pyfunction!(analyze_trajectory_py, m)?)?;
    m.add_function(wrap_pyfunction!(select_atoms_py, m)?)?;
    m.add_function(wrap_pyfunction!(sample_frames_py, m)?)?;

    Ok(())
}

//! Result files: raw distances, the statistics report, the histogram table
//! and the histogram image.
//!
//! Every file is first written to a temporary sibling. A run renames its
//! files into place only once all of them are complete, so a failed run
//! never leaves a partial set of results behind.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::ImageFormat;
use tempfile::NamedTempFile;

use wpt_core::error::PackingResult;

use crate::aggregate::{DistanceCollection, Histogram, HistogramMode, Statistics};
use crate::config::SearchMode;
use crate::pipeline::PackingReport;
use crate::plot::{render_histogram, PlotLabels};

pub const DEFAULT_DISTANCES_FILE: &str = "nearest_distances_waterbox.txt";
pub const DEFAULT_REPORT_FILE: &str = "stats_box.txt";
pub const DEFAULT_HISTOGRAM_FILE: &str = "nearest_distances_histogram_waterbox.png";
pub const DEFAULT_PBC_HISTOGRAM_FILE: &str = "nearest_distances_histogram_waterbox_pbc.png";

/// Destinations for a finished run. `None` skips that artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPaths {
    pub distances: Option<PathBuf>,
    pub report: Option<PathBuf>,
    pub histogram_png: Option<PathBuf>,
    pub histogram_table: Option<PathBuf>,
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self {
            distances: Some(PathBuf::from(DEFAULT_DISTANCES_FILE)),
            report: Some(PathBuf::from(DEFAULT_REPORT_FILE)),
            histogram_png: Some(PathBuf::from(DEFAULT_HISTOGRAM_FILE)),
            histogram_table: None,
        }
    }
}

/// Conventional image name for a search mode.
pub fn default_histogram_file(search: &SearchMode) -> &'static str {
    match search {
        SearchMode::BruteForce => DEFAULT_HISTOGRAM_FILE,
        SearchMode::Periodic { .. } => DEFAULT_PBC_HISTOGRAM_FILE,
    }
}

/// A complete file waiting next to its destination.
struct Staged {
    file: NamedTempFile,
    path: PathBuf,
}

/// Write every configured artifact of `report`.
///
/// Nothing is renamed into place until every artifact has been written, so
/// an error leaves none of the destinations created by this call.
pub fn write_outputs(report: &PackingReport, paths: &OutputPaths) -> PackingResult<()> {
    let mut staged = Vec::new();
    if let Some(path) = &paths.distances {
        staged.push(stage_distances(path, &report.distances)?);
    }
    if let Some(path) = &paths.report {
        staged.push(stage_report(path, &report.statistics)?);
    }
    if let Some(path) = &paths.histogram_table {
        staged.push(stage_histogram_table(path, &report.histogram, &report.statistics)?);
    }
    if let Some(path) = &paths.histogram_png {
        let labels = PlotLabels::for_run(&report.search, report.histogram.mode);
        staged.push(stage_histogram_png(
            path,
            &report.histogram,
            &report.statistics,
            &labels,
        )?);
    }

    for path in commit(staged)? {
        log::info!("Wrote {}", path.display());
    }
    Ok(())
}

/// Write into a temporary file in the destination's directory.
fn stage(path: &Path, fill: impl FnOnce(&mut File) -> PackingResult<()>) -> PackingResult<Staged> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    fill(file.as_file_mut())?;
    file.as_file().sync_all()?;
    Ok(Staged {
        file,
        path: path.to_path_buf(),
    })
}

/// Rename staged files into place. If a rename fails, the files already
/// renamed by this call are removed again.
fn commit(staged: Vec<Staged>) -> PackingResult<Vec<PathBuf>> {
    let mut done: Vec<PathBuf> = Vec::with_capacity(staged.len());
    for Staged { file, path } in staged {
        if let Err(err) = file.persist(&path) {
            for written in &done {
                if let Err(e) = std::fs::remove_file(written) {
                    log::warn!("Could not remove {}: {}", written.display(), e);
                }
            }
            return Err(err.error.into());
        }
        done.push(path);
    }
    Ok(done)
}

/// Format like numpy's `savetxt` default `%.18e`: two-digit signed exponent.
pub fn format_savetxt(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let raw = format!("{:.18e}", value);
    match raw.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        None => raw,
    }
}

/// One distance per line, in recording order.
pub fn write_distances(path: &Path, distances: &DistanceCollection) -> PackingResult<()> {
    commit(vec![stage_distances(path, distances)?])?;
    Ok(())
}

fn stage_distances(path: &Path, distances: &DistanceCollection) -> PackingResult<Staged> {
    stage(path, |file| {
        let mut out = BufWriter::new(file);
        for &d in distances.samples() {
            writeln!(out, "{}", format_savetxt(d))?;
        }
        out.flush()?;
        Ok(())
    })
}

/// The two-line statistics report.
pub fn format_report(stats: &Statistics) -> String {
    format!(
        "Standard deviation: {:.3} nm\nMean nearest distance: {:.3} nm\n",
        stats.std_dev, stats.mean
    )
}

pub fn write_report(path: &Path, stats: &Statistics) -> PackingResult<()> {
    commit(vec![stage_report(path, stats)?])?;
    Ok(())
}

fn stage_report(path: &Path, stats: &Statistics) -> PackingResult<Staged> {
    stage(path, |file| {
        file.write_all(format_report(stats).as_bytes())?;
        Ok(())
    })
}

/// Tab-separated `bin_start  bin_end  value` rows under a commented summary.
pub fn write_histogram_table(
    path: &Path,
    histogram: &Histogram,
    stats: &Statistics,
) -> PackingResult<()> {
    commit(vec![stage_histogram_table(path, histogram, stats)?])?;
    Ok(())
}

fn stage_histogram_table(
    path: &Path,
    histogram: &Histogram,
    stats: &Statistics,
) -> PackingResult<Staged> {
    let column = match histogram.mode {
        HistogramMode::Density => "density",
        HistogramMode::Frequency => "count",
    };
    stage(path, |file| {
        let mut out = BufWriter::new(file);
        writeln!(
            out,
            "# mean={:.6} median={:.6} std={:.6} count={}",
            stats.mean, stats.median, stats.std_dev, stats.count
        )?;
        writeln!(out, "bin_start\tbin_end\t{}", column)?;
        for (lo, hi, value) in histogram.bins() {
            writeln!(out, "{:.6}\t{:.6}\t{:.6}", lo, hi, value)?;
        }
        out.flush()?;
        Ok(())
    })
}

pub fn write_histogram_png(
    path: &Path,
    histogram: &Histogram,
    stats: &Statistics,
    labels: &PlotLabels,
) -> PackingResult<()> {
    commit(vec![stage_histogram_png(path, histogram, stats, labels)?])?;
    Ok(())
}

fn stage_histogram_png(
    path: &Path,
    histogram: &Histogram,
    stats: &Statistics,
    labels: &PlotLabels,
) -> PackingResult<Staged> {
    let img = render_histogram(histogram, stats, labels);
    stage(path, |file| {
        let mut out = BufWriter::new(file);
        img.write_to(&mut out, ImageFormat::Png)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        out.flush()?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::tests::{histogram, stats};
    use crate::plot::{BAR_FILL, HEIGHT, STATS_BOX, WIDTH};

    fn report(search: SearchMode) -> PackingReport {
        PackingReport {
            distances: DistanceCollection::from(vec![0.26, 0.28, 0.30, 0.275, 0.29]),
            statistics: stats(),
            histogram: histogram(),
            sampled_frames: vec![0, 10],
            frames_skipped: 0,
            n_selected: 3,
            search,
        }
    }

    fn all_paths(dir: &Path, png: PathBuf) -> OutputPaths {
        OutputPaths {
            distances: Some(dir.join("d.txt")),
            report: Some(dir.join("stats.txt")),
            histogram_png: Some(png),
            histogram_table: Some(dir.join("hist.tsv")),
        }
    }

    #[test]
    fn test_savetxt_format() {
        assert_eq!(format_savetxt(0.28), "2.800000000000000266e-01");
        assert_eq!(format_savetxt(1.0), "1.000000000000000000e+00");
        assert_eq!(format_savetxt(123.5), "1.235000000000000000e+02");
        assert_eq!(format_savetxt(f64::NAN), "nan");
    }

    #[test]
    fn test_report_format() {
        assert_eq!(
            format_report(&stats()),
            "Standard deviation: 0.019 nm\nMean nearest distance: 0.281 nm\n"
        );
    }

    #[test]
    fn test_default_histogram_file_per_mode() {
        assert_eq!(default_histogram_file(&SearchMode::BruteForce), DEFAULT_HISTOGRAM_FILE);
        assert_eq!(
            default_histogram_file(&SearchMode::Periodic { cutoff: 0.5 }),
            DEFAULT_PBC_HISTOGRAM_FILE
        );
    }

    #[test]
    fn test_written_files() {
        let dir = tempfile::tempdir().unwrap();
        let distances = dir.path().join("d.txt");
        let report = dir.path().join("stats.txt");
        let table = dir.path().join("hist.tsv");

        write_distances(&distances, &DistanceCollection::from(vec![0.28, 0.3])).unwrap();
        let text = std::fs::read_to_string(&distances).unwrap();
        let values: Vec<f64> = text.lines().map(|l| l.parse().unwrap()).collect();
        assert_eq!(values, vec![0.28, 0.3]);

        write_report(&report, &stats()).unwrap();
        assert!(std::fs::read_to_string(&report)
            .unwrap()
            .starts_with("Standard deviation: 0.019 nm"));

        write_histogram_table(&table, &histogram(), &stats()).unwrap();
        let text = std::fs::read_to_string(&table).unwrap();
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows[1], "bin_start\tbin_end\tdensity");
        assert_eq!(rows.len(), 12);
        assert_eq!(rows[2].split('\t').count(), 3);

        // Only the final files remain; temporaries were renamed away.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 3);
    }

    #[test]
    fn test_histogram_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hist.png");
        let labels = PlotLabels::for_run(&SearchMode::BruteForce, HistogramMode::Density);
        write_histogram_png(&path, &histogram(), &stats(), &labels).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (WIDTH, HEIGHT));
        assert!(img.pixels().any(|p| *p == BAR_FILL));
        assert!(img.pixels().any(|p| *p == STATS_BOX));
    }

    #[test]
    fn test_write_outputs_writes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let paths = all_paths(dir.path(), dir.path().join("h.png"));
        write_outputs(&report(SearchMode::BruteForce), &paths).unwrap();
        let written = [
            &paths.distances,
            &paths.report,
            &paths.histogram_table,
            &paths.histogram_png,
        ];
        for path in written {
            assert!(path.as_ref().unwrap().exists());
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 4);
    }

    #[test]
    fn test_failed_run_publishes_no_results() {
        let dir = tempfile::tempdir().unwrap();
        let paths = all_paths(dir.path(), dir.path().join("missing_dir").join("h.png"));

        assert!(write_outputs(&report(SearchMode::BruteForce), &paths).is_err());
        assert!(!dir.path().join("d.txt").exists());
        assert!(!dir.path().join("stats.txt").exists());
        assert!(!dir.path().join("hist.tsv").exists());
        // Staged temporaries are cleaned up as well.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_failed_stage_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never.txt");
        let result = stage(&path, |_| Err(wpt_core::PackingError::EmptyCollection));
        assert!(result.is_err());
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}

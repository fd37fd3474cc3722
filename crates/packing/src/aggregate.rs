//! Accumulation of nearest-neighbor distances and their summary statistics.

use wpt_core::error::{PackingError, PackingResult};

/// Append-only multiset of distance samples (nm), in recording order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistanceCollection {
    samples: Vec<f64>,
}

/// Summary of a non-empty collection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    pub mean: f64,
    /// Population standard deviation (denominator N).
    pub std_dev: f64,
    pub count: usize,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

/// How histogram bin values are normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistogramMode {
    /// Values integrate to one over the binned range.
    #[default]
    Density,
    /// Raw counts.
    Frequency,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// Bin edges, `values.len() + 1` entries.
    pub edges: Vec<f64>,
    pub values: Vec<f64>,
    pub mode: HistogramMode,
}

impl Histogram {
    pub fn bin_width(&self) -> f64 {
        match (self.edges.first(), self.edges.last()) {
            (Some(lo), Some(hi)) if !self.values.is_empty() => (hi - lo) / self.values.len() as f64,
            _ => 0.0,
        }
    }

    /// `(start, end, value)` for each bin.
    pub fn bins(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.edges
            .windows(2)
            .zip(self.values.iter())
            .map(|(edge, &value)| (edge[0], edge[1], value))
    }

    /// Sum of `value * width`; one for a density histogram.
    pub fn area(&self) -> f64 {
        self.bins().map(|(lo, hi, v)| v * (hi - lo)).sum()
    }
}

impl DistanceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one frame's samples. No deduplication.
    pub fn record(&mut self, frame_samples: &[f64]) {
        self.samples.extend_from_slice(frame_samples);
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn non_empty(&self) -> PackingResult<&[f64]> {
        if self.samples.is_empty() {
            return Err(PackingError::EmptyCollection);
        }
        Ok(&self.samples)
    }

    pub fn mean(&self) -> PackingResult<f64> {
        let s = self.non_empty()?;
        Ok(s.iter().sum::<f64>() / s.len() as f64)
    }

    /// Population standard deviation.
    pub fn std_dev(&self) -> PackingResult<f64> {
        let mean = self.mean()?;
        let s = &self.samples;
        let variance = s.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / s.len() as f64;
        Ok(variance.sqrt())
    }

    pub fn statistics(&self) -> PackingResult<Statistics> {
        let mean = self.mean()?;
        let std_dev = self.std_dev()?;

        let mut sorted = self.samples.clone();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len();
        let median = if n % 2 == 1 {
            sorted[n / 2]
        } else {
            0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
        };

        Ok(Statistics {
            mean,
            std_dev,
            count: n,
            median,
            min: sorted[0],
            max: sorted[n - 1],
        })
    }

    /// Equal-width histogram over `range` (default: data min..max).
    ///
    /// A degenerate default range `min == max` is widened by 0.5 on each
    /// side. The last bin includes its right edge and values outside the
    /// range are ignored.
    pub fn density_histogram(
        &self,
        bin_count: usize,
        range: Option<(f64, f64)>,
        mode: HistogramMode,
    ) -> PackingResult<Histogram> {
        let samples = self.non_empty()?;
        if bin_count == 0 {
            return Err(PackingError::config("histogram needs at least one bin"));
        }

        let (lo, hi) = match range {
            Some((lo, hi)) => {
                if !lo.is_finite() || !hi.is_finite() || lo >= hi {
                    return Err(PackingError::config(format!(
                        "histogram range ({}, {}) is empty or not finite",
                        lo, hi
                    )));
                }
                (lo, hi)
            }
            None => {
                let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
                let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                if min == max {
                    (min - 0.5, max + 0.5)
                } else {
                    (min, max)
                }
            }
        };

        let width = (hi - lo) / bin_count as f64;
        let edges: Vec<f64> = (0..=bin_count)
            .map(|k| if k == bin_count { hi } else { lo + k as f64 * width })
            .collect();

        let mut counts = vec![0usize; bin_count];
        for &v in samples {
            if v < lo || v > hi {
                continue;
            }
            let mut bin = (((v - lo) / width) as usize).min(bin_count - 1);
            // Rounding in the division can land one bin off; the edges decide.
            if bin > 0 && v < edges[bin] {
                bin -= 1;
            } else if bin + 1 < bin_count && v >= edges[bin + 1] {
                bin += 1;
            }
            counts[bin] += 1;
        }

        let in_range: usize = counts.iter().sum();
        let values = match mode {
            HistogramMode::Frequency => counts.iter().map(|&c| c as f64).collect(),
            HistogramMode::Density => {
                if in_range == 0 {
                    return Err(PackingError::config(format!(
                        "no samples fall inside the histogram range ({}, {})",
                        lo, hi
                    )));
                }
                let norm = in_range as f64 * width;
                counts.iter().map(|&c| c as f64 / norm).collect()
            }
        };

        Ok(Histogram {
            edges,
            values,
            mode,
        })
    }
}

impl From<Vec<f64>> for DistanceCollection {
    fn from(samples: Vec<f64>) -> Self {
        Self { samples }
    }
}

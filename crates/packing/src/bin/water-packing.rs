use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use wpt_core::error::PackingResult;
use wpt_packing::config::{HistogramConfig, PackingConfig, SearchMode, DEFAULT_CUTOFF};
use wpt_packing::output::{
    default_histogram_file, write_outputs, OutputPaths, DEFAULT_DISTANCES_FILE,
    DEFAULT_REPORT_FILE,
};
use wpt_packing::{analyze_files, HistogramMode};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    BruteForce,
    Periodic,
}

#[derive(Parser)]
#[command(
    name = "water-packing",
    version,
    about = "Nearest-neighbor oxygen distances in a water box trajectory"
)]
struct Cli {
    #[arg(long, default_value = "waterbox1.prmtop")]
    prmtop: PathBuf,
    #[arg(long, default_value = "trajectory1.dcd")]
    dcd: PathBuf,
    #[arg(short, long, default_value = "name O")]
    selection: String,
    #[arg(long, default_value_t = 10)]
    stride: usize,
    #[arg(long, default_value_t = 0)]
    start: usize,
    #[arg(long)]
    end: Option<usize>,
    #[arg(short, long, value_enum, default_value_t = Mode::BruteForce)]
    mode: Mode,
    /// Search radius in nm for periodic mode
    #[arg(long, default_value_t = DEFAULT_CUTOFF)]
    cutoff: f64,
    /// Box lengths in nm, overriding the trajectory unit cell
    #[arg(long = "box", num_args = 3, value_names = ["LX", "LY", "LZ"])]
    box_lengths: Option<Vec<f64>>,
    /// Resolve atoms with no neighbor inside the cutoff by a full periodic search
    #[arg(long)]
    fallback_full_search: bool,
    /// Histogram bins [default: 50, or 30 in periodic mode]
    #[arg(long)]
    bins: Option<usize>,
    /// Histogram raw counts (default in periodic mode)
    #[arg(long, conflicts_with = "density")]
    frequency: bool,
    /// Histogram a density (default in brute-force mode)
    #[arg(long)]
    density: bool,
    #[arg(long, num_args = 2, value_names = ["LO", "HI"], allow_negative_numbers = true)]
    range: Option<Vec<f64>>,
    #[arg(long, default_value = DEFAULT_DISTANCES_FILE)]
    distances_out: PathBuf,
    #[arg(long, default_value = DEFAULT_REPORT_FILE)]
    stats_out: PathBuf,
    /// Histogram image [default: nearest_distances_histogram_waterbox.png,
    /// or nearest_distances_histogram_waterbox_pbc.png in periodic mode]
    #[arg(long)]
    plot_out: Option<PathBuf>,
    /// Also write the histogram as a tab-separated table
    #[arg(long)]
    table_out: Option<PathBuf>,
    #[arg(long)]
    no_plot: bool,
}

impl Cli {
    fn search(&self) -> SearchMode {
        match self.mode {
            Mode::BruteForce => SearchMode::BruteForce,
            Mode::Periodic => SearchMode::Periodic {
                cutoff: self.cutoff,
            },
        }
    }

    fn config(&self) -> PackingConfig {
        let search = self.search();
        let defaults = HistogramConfig::for_search(&search);
        let mode = if self.frequency {
            HistogramMode::Frequency
        } else if self.density {
            HistogramMode::Density
        } else {
            defaults.mode
        };
        PackingConfig {
            selection: self.selection.clone(),
            stride: self.stride,
            start_frame: self.start,
            end_frame: self.end,
            search,
            box_override: self.box_lengths.as_deref().map(|b| [b[0], b[1], b[2]]),
            fallback_full_search: self.fallback_full_search,
            histogram: HistogramConfig {
                bins: self.bins.unwrap_or(defaults.bins),
                range: self.range.as_deref().map(|r| (r[0], r[1])),
                mode,
            },
        }
    }

    fn outputs(&self) -> OutputPaths {
        OutputPaths {
            distances: Some(self.distances_out.clone()),
            report: Some(self.stats_out.clone()),
            histogram_png: (!self.no_plot).then(|| {
                self.plot_out
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(default_histogram_file(&self.search())))
            }),
            histogram_table: self.table_out.clone(),
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run_cli() {
        log::error!("{}", err);
        std::process::exit(1);
    }
}

fn run_cli() -> PackingResult<()> {
    let cli = Cli::parse();
    let config = cli.config();
    let report = analyze_files(&cli.prmtop, &cli.dcd, &config)?;

    let stats = &report.statistics;
    println!("Mean nearest distance: {:.3} nm", stats.mean);
    println!("Standard deviation: {:.3} nm", stats.std_dev);
    println!("Median: {:.3} nm", stats.median);
    println!("Count: {}", stats.count);

    write_outputs(&report, &cli.outputs())
}

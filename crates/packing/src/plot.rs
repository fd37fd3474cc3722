//! Histogram image rendering.
//!
//! Draws onto an [`RgbImage`]: green bars, dashed mean and median lines, a
//! legend, a statistics box, a title, axis labels and tick values. Text uses
//! the 8x8 bitmap glyphs from `font8x8`, scaled by whole pixels.

use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{Rgb, RgbImage};

use crate::aggregate::{Histogram, HistogramMode, Statistics};
use crate::config::SearchMode;

pub const WIDTH: u32 = 1200;
pub const HEIGHT: u32 = 800;
const MARGIN_LEFT: u32 = 130;
const MARGIN_RIGHT: u32 = 40;
const MARGIN_TOP: u32 = 90;
const MARGIN_BOTTOM: u32 = 100;

/// Glyph magnification for all text.
const TEXT_SCALE: i64 = 2;
const GLYPH: i64 = 8 * TEXT_SCALE;
const LINE_HEIGHT: i64 = GLYPH + 6;

pub const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const GRID: Rgb<u8> = Rgb([225, 225, 225]);
const AXIS: Rgb<u8> = Rgb([40, 40, 40]);
pub const TEXT: Rgb<u8> = Rgb([20, 20, 20]);
pub const STATS_BOX: Rgb<u8> = Rgb([245, 222, 179]);
pub const BAR_FILL: Rgb<u8> = Rgb([0x27, 0xAE, 0x60]);
const BAR_EDGE: Rgb<u8> = Rgb([0x1A, 0x5F, 0x3A]);
pub const MEAN_LINE: Rgb<u8> = Rgb([0xE7, 0x4C, 0x3C]);
pub const MEDIAN_LINE: Rgb<u8> = Rgb([0xF3, 0x9C, 0x12]);

/// Title and axis captions.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotLabels {
    pub title: Vec<String>,
    pub x_label: String,
    pub y_label: String,
}

impl PlotLabels {
    pub fn for_run(search: &SearchMode, mode: HistogramMode) -> Self {
        let title = match search {
            SearchMode::BruteForce => vec![
                "Distribution of Nearest Distances Between Water Molecule Oxygens".to_string(),
                "(TIP3P Water Box Simulation)".to_string(),
            ],
            SearchMode::Periodic { .. } => vec![
                "Histogram of Nearest Distances Between Water Molecule Oxygens".to_string(),
                "(with PBC)".to_string(),
            ],
        };
        let y_label = match mode {
            HistogramMode::Density => "Density",
            HistogramMode::Frequency => "Frequency",
        };
        Self {
            title,
            x_label: "Nearest Distance (nm)".to_string(),
            y_label: y_label.to_string(),
        }
    }
}

/// Lines of the statistics box.
pub fn stats_lines(stats: &Statistics) -> [String; 3] {
    [
        format!("Mean: {:.3} nm", stats.mean),
        format!("Std Dev: {:.3} nm", stats.std_dev),
        format!("Count: {}", stats.count),
    ]
}

/// Render the full histogram figure.
pub fn render_histogram(
    histogram: &Histogram,
    stats: &Statistics,
    labels: &PlotLabels,
) -> RgbImage {
    let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);

    for (k, line) in labels.title.iter().enumerate() {
        let x = (WIDTH as i64 - text_width(line)) / 2;
        draw_text(&mut img, x, 18 + k as i64 * LINE_HEIGHT, line, TEXT);
    }

    let x0 = MARGIN_LEFT as f64;
    let x1 = (WIDTH - MARGIN_RIGHT) as f64;
    let y0 = (HEIGHT - MARGIN_BOTTOM) as f64;
    let y1 = MARGIN_TOP as f64;

    let x_label_x = (x0 + x1) as i64 / 2 - text_width(&labels.x_label) / 2;
    draw_text(&mut img, x_label_x, HEIGHT as i64 - 40, &labels.x_label, TEXT);
    let y_label_bottom = (y0 + y1) as i64 / 2 + text_width(&labels.y_label) / 2;
    draw_text_vertical(&mut img, 16, y_label_bottom, &labels.y_label, TEXT);

    let (lo, hi) = match (histogram.edges.first(), histogram.edges.last()) {
        (Some(&lo), Some(&hi)) if hi > lo => (lo, hi),
        _ => return img,
    };
    let peak = histogram
        .values
        .iter()
        .copied()
        .fold(0.0f64, f64::max)
        .max(f64::MIN_POSITIVE);
    let y_top = peak * 1.05;

    let to_x = |v: f64| x0 + (v - lo) / (hi - lo) * (x1 - x0);
    let to_y = |v: f64| y0 - v / y_top * (y0 - y1);

    for k in 1..=5 {
        let y = to_y(y_top * k as f64 / 5.0);
        hline(&mut img, x0, x1, y, GRID);
    }

    for (start, end, value) in histogram.bins() {
        let (bx0, bx1) = (to_x(start), to_x(end));
        let by = to_y(value);
        fill_rect(&mut img, bx0, bx1, by, y0, BAR_FILL);
        vline(&mut img, bx0, by, y0, BAR_EDGE);
        vline(&mut img, bx1, by, y0, BAR_EDGE);
        hline(&mut img, bx0, bx1, by, BAR_EDGE);
    }

    for (value, color) in [(stats.mean, MEAN_LINE), (stats.median, MEDIAN_LINE)] {
        if (lo..=hi).contains(&value) {
            thick_dashed_vline(&mut img, to_x(value), y1, y0, color);
        }
    }

    hline(&mut img, x0, x1, y0, AXIS);
    hline(&mut img, x0, x1, y0 + 1.0, AXIS);
    vline(&mut img, x0, y1, y0, AXIS);
    vline(&mut img, x0 - 1.0, y1, y0, AXIS);

    // Ticks at every fifth bin edge and the last one.
    let n_bins = histogram.values.len();
    for (k, &edge) in histogram.edges.iter().enumerate() {
        if k % 5 == 0 || k == n_bins {
            let x = to_x(edge);
            vline(&mut img, x, y0, y0 + 8.0, AXIS);
            let label = format!("{:.3}", edge);
            draw_text(&mut img, x as i64 - text_width(&label) / 2, y0 as i64 + 14, &label, TEXT);
        }
    }
    for k in 0..=5 {
        let value = y_top * k as f64 / 5.0;
        let y = to_y(value);
        hline(&mut img, x0 - 8.0, x0, y, AXIS);
        let label = tick_label(value);
        let x = x0 as i64 - 12 - text_width(&label);
        draw_text(&mut img, x, y as i64 - GLYPH / 2, &label, TEXT);
    }

    draw_stats_box(&mut img, x0 as i64 + 14, y1 as i64 + 14, stats);
    draw_legend(&mut img, x1 as i64 - 14, y1 as i64 + 14, stats);

    img
}

fn tick_label(value: f64) -> String {
    if value >= 100.0 {
        format!("{:.0}", value)
    } else if value >= 10.0 {
        format!("{:.1}", value)
    } else {
        format!("{:.2}", value)
    }
}

fn draw_stats_box(img: &mut RgbImage, left: i64, top: i64, stats: &Statistics) {
    let lines = stats_lines(stats);
    let width = lines.iter().map(|l| text_width(l)).max().unwrap_or(0) + 20;
    let height = lines.len() as i64 * LINE_HEIGHT + 14;
    framed_box(img, left, top, width, height, STATS_BOX);
    for (k, line) in lines.iter().enumerate() {
        draw_text(img, left + 10, top + 10 + k as i64 * LINE_HEIGHT, line, TEXT);
    }
}

/// Legend anchored at its top-right corner.
fn draw_legend(img: &mut RgbImage, right: i64, top: i64, stats: &Statistics) {
    let entries = [
        (MEAN_LINE, format!("Mean: {:.3} nm", stats.mean)),
        (MEDIAN_LINE, format!("Median: {:.3} nm", stats.median)),
    ];
    let swatch = 36;
    let width = entries.iter().map(|(_, l)| text_width(l)).max().unwrap_or(0) + swatch + 30;
    let height = entries.len() as i64 * LINE_HEIGHT + 14;
    let left = right - width;
    framed_box(img, left, top, width, height, BACKGROUND);
    for (k, (color, label)) in entries.iter().enumerate() {
        let row = top + 10 + k as i64 * LINE_HEIGHT;
        let mid = row + GLYPH / 2;
        for dy in -1..=1 {
            for x in (left + 10..left + 10 + swatch).filter(|x| (x - left) % 12 < 8) {
                put(img, x, mid + dy, *color);
            }
        }
        draw_text(img, left + 20 + swatch, row, label, TEXT);
    }
}

fn framed_box(img: &mut RgbImage, left: i64, top: i64, width: i64, height: i64, fill: Rgb<u8>) {
    let (l, t) = (left as f64, top as f64);
    let (r, b) = ((left + width) as f64, (top + height) as f64);
    fill_rect(img, l, r, t, b, fill);
    hline(img, l, r, t, AXIS);
    hline(img, l, r, b, AXIS);
    vline(img, l, t, b, AXIS);
    vline(img, r, t, b, AXIS);
}

/// Pixel width of `text` at the figure's text scale.
pub fn text_width(text: &str) -> i64 {
    text.chars().count() as i64 * GLYPH
}

/// Left-to-right text with its top-left corner at `(left, top)`.
/// Characters without a glyph render as blanks.
pub fn draw_text(img: &mut RgbImage, left: i64, top: i64, text: &str, color: Rgb<u8>) {
    for (i, ch) in text.chars().enumerate() {
        let glyph = BASIC_FONTS.get(ch).unwrap_or([0; 8]);
        let origin = left + i as i64 * GLYPH;
        for (row, &bits) in glyph.iter().enumerate() {
            for col in 0..8i64 {
                if (bits >> col) & 1 != 0 {
                    block(img, origin + col * TEXT_SCALE, top + row as i64 * TEXT_SCALE, color);
                }
            }
        }
    }
}

/// Text rotated a quarter turn counter-clockwise, read bottom to top,
/// starting at `(left, bottom)`.
fn draw_text_vertical(img: &mut RgbImage, left: i64, bottom: i64, text: &str, color: Rgb<u8>) {
    for (i, ch) in text.chars().enumerate() {
        let glyph = BASIC_FONTS.get(ch).unwrap_or([0; 8]);
        let origin = bottom - i as i64 * GLYPH;
        for (row, &bits) in glyph.iter().enumerate() {
            for col in 0..8i64 {
                if (bits >> col) & 1 != 0 {
                    let x = left + row as i64 * TEXT_SCALE;
                    let y = origin - (col + 1) * TEXT_SCALE;
                    block(img, x, y, color);
                }
            }
        }
    }
}

fn block(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    for dy in 0..TEXT_SCALE {
        for dx in 0..TEXT_SCALE {
            put(img, x + dx, y + dy, color);
        }
    }
}

fn put(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as u32, y as u32);
    if x < img.width() && y < img.height() {
        img.put_pixel(x, y, color);
    }
}

fn hline(img: &mut RgbImage, xa: f64, xb: f64, y: f64, color: Rgb<u8>) {
    let (start, end) = (xa.min(xb).round() as i64, xa.max(xb).round() as i64);
    let y = y.round() as i64;
    for x in start..=end {
        put(img, x, y, color);
    }
}

fn vline(img: &mut RgbImage, x: f64, ya: f64, yb: f64, color: Rgb<u8>) {
    let (start, end) = (ya.min(yb).round() as i64, ya.max(yb).round() as i64);
    let x = x.round() as i64;
    for y in start..=end {
        put(img, x, y, color);
    }
}

fn thick_dashed_vline(img: &mut RgbImage, x: f64, ya: f64, yb: f64, color: Rgb<u8>) {
    let (start, end) = (ya.min(yb).round() as i64, ya.max(yb).round() as i64);
    let x = x.round() as i64;
    for y in (start..=end).filter(|y| (y - start) % 14 < 9) {
        for dx in -1..=1 {
            put(img, x + dx, y, color);
        }
    }
}

fn fill_rect(img: &mut RgbImage, xa: f64, xb: f64, ya: f64, yb: f64, color: Rgb<u8>) {
    let (top, bottom) = (ya.min(yb).round() as i64, ya.max(yb).round() as i64);
    for y in top..=bottom {
        hline(img, xa, xb, y as f64, color);
    }
}

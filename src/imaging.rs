//! Pixel measurements used by the image risk analyzer.
//!
//! Everything here works on the 8-bit luma plane of the decoded image:
//! - brightness is the mean luma rescaled to 0–100
//! - blur is the variance of a 4-neighbour Laplacian
//! - contours are 8-connected regions of Sobel edge pixels; a contour whose
//!   pixels hug all four sides of its bounding box approximates a
//!   4-vertex polygon and is counted as a rectangular structure

use std::io::Cursor;

use image::{GrayImage, ImageError, ImageReader, Limits};

use crate::models::ImageMetrics;
use crate::Config;

// ---

/// Sobel magnitude above which a pixel is treated as an edge.
pub const EDGE_THRESHOLD: f64 = 100.0;

/// Bounding-box area a contour must exceed to be considered.
pub const MIN_CONTOUR_AREA: u64 = 500;

/// Distance (px) from a bounding-box side that still counts as "on" it.
const SIDE_BAND: u32 = 3;

/// Share of a contour's pixels that must lie on its bounding-box sides.
const MIN_BORDER_SHARE: f64 = 0.8;

/// Share of each bounding-box side that must be traced by the contour.
const MIN_SIDE_COVERAGE: f64 = 0.6;

/// Upper bounds applied while decoding, so a small but highly compressible
/// upload cannot expand into an unbounded pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    pub max_width: u32,
    pub max_height: u32,
    /// Bytes the decoder may allocate for one image.
    pub max_alloc: u64,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_width: 8000,
            max_height: 8000,
            max_alloc: 256 * 1024 * 1024,
        }
    }
}

impl From<&Config> for DecodeLimits {
    fn from(config: &Config) -> Self {
        Self {
            max_width: config.max_image_width,
            max_height: config.max_image_height,
            max_alloc: config.max_decode_bytes,
        }
    }
}

impl DecodeLimits {
    fn to_image_limits(self) -> Limits {
        let mut limits = Limits::default();
        limits.max_image_width = Some(self.max_width);
        limits.max_image_height = Some(self.max_height);
        limits.max_alloc = Some(self.max_alloc);
        limits
    }
}

/// Decode `bytes` within `limits` and measure them.
///
/// Blur and contour figures are only computed when `structure` is set, since
/// they cost a full pass over the image each.
pub fn measure(
    bytes: &[u8],
    structure: bool,
    limits: DecodeLimits,
) -> Result<ImageMetrics, ImageError> {
    // ---
    let mut reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    reader.limits(limits.to_image_limits());
    let luma = reader.decode()?.into_luma8();

    let mut metrics = ImageMetrics::basic(
        luma.width(),
        luma.height(),
        bytes.len() as u64,
        brightness(&luma),
    );

    if structure {
        let edges = edge_map(&luma);
        let contours = find_contours(&edges, luma.width(), luma.height());

        metrics.blur_score = Some(laplacian_variance(&luma));
        metrics.edge_count = Some(edges.iter().filter(|e| **e).count() as u64);
        metrics.contour_count = Some(contours.len() as u32);
        metrics.rectangular_count =
            Some(contours.iter().filter(|c| c.is_rectangular()).count() as u32);
    }

    Ok(metrics)
}

/// Mean luma on a 0–100 scale.
pub fn brightness(luma: &GrayImage) -> f64 {
    // ---
    let pixels = luma.as_raw();
    if pixels.is_empty() {
        return 0.0;
    }
    let sum: u64 = pixels.iter().map(|&p| p as u64).sum();
    (sum as f64 / pixels.len() as f64) / 255.0 * 100.0
}

/// Variance of the Laplacian over the interior pixels.
pub fn laplacian_variance(luma: &GrayImage) -> f64 {
    // ---
    let (w, h) = luma.dimensions();
    if w < 3 || h < 3 {
        return 0.0;
    }

    // Single pass: running sum and sum of squares
    let px = |x: u32, y: u32| luma.get_pixel(x, y)[0] as f64;
    let (mut sum, mut sum_sq) = (0.0f64, 0.0f64);
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let lap =
                px(x, y - 1) + px(x - 1, y) + px(x + 1, y) + px(x, y + 1) - 4.0 * px(x, y);
            sum += lap;
            sum_sq += lap * lap;
        }
    }

    let n = ((w - 2) as f64) * ((h - 2) as f64);
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}

/// Row-major edge mask from the Sobel gradient magnitude.
fn edge_map(luma: &GrayImage) -> Vec<bool> {
    // ---
    let (w, h) = luma.dimensions();
    let mut edges = vec![false; (w as usize) * (h as usize)];
    if w < 3 || h < 3 {
        return edges;
    }

    let px = |x: u32, y: u32| luma.get_pixel(x, y)[0] as f64;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let gx = (px(x + 1, y - 1) + 2.0 * px(x + 1, y) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + 2.0 * px(x - 1, y) + px(x - 1, y + 1));
            let gy = (px(x - 1, y + 1) + 2.0 * px(x, y + 1) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + 2.0 * px(x, y - 1) + px(x + 1, y - 1));
            if (gx * gx + gy * gy).sqrt() > EDGE_THRESHOLD {
                edges[(y * w + x) as usize] = true;
            }
        }
    }
    edges
}

/// One connected region of edge pixels.
#[derive(Debug)]
struct Contour {
    pixels: Vec<(u32, u32)>,
    min_x: u32,
    max_x: u32,
    min_y: u32,
    max_y: u32,
}

impl Contour {
    fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// True when the outline reduces to the four sides of its bounding box.
    fn is_rectangular(&self) -> bool {
        // ---
        let (w, h) = (self.width(), self.height());
        if w <= 2 * SIDE_BAND || h <= 2 * SIDE_BAND {
            return false;
        }

        let mut top = vec![false; w as usize];
        let mut bottom = vec![false; w as usize];
        let mut left = vec![false; h as usize];
        let mut right = vec![false; h as usize];
        let mut on_border = 0usize;

        for &(x, y) in &self.pixels {
            let (dx, dy) = (x - self.min_x, y - self.min_y);
            let mut hit = false;
            if dy < SIDE_BAND {
                top[dx as usize] = true;
                hit = true;
            }
            if self.max_y - y < SIDE_BAND {
                bottom[dx as usize] = true;
                hit = true;
            }
            if dx < SIDE_BAND {
                left[dy as usize] = true;
                hit = true;
            }
            if self.max_x - x < SIDE_BAND {
                right[dy as usize] = true;
                hit = true;
            }
            if hit {
                on_border += 1;
            }
        }

        fn coverage(side: &[bool]) -> f64 {
            side.iter().filter(|s| **s).count() as f64 / side.len() as f64
        }
        let border_share = on_border as f64 / self.pixels.len() as f64;

        border_share >= MIN_BORDER_SHARE
            && [top, bottom, left, right]
                .iter()
                .all(|side| coverage(side) >= MIN_SIDE_COVERAGE)
    }
}

/// Collect 8-connected edge regions whose bounding box exceeds
/// [`MIN_CONTOUR_AREA`].
fn find_contours(edges: &[bool], w: u32, h: u32) -> Vec<Contour> {
    // ---
    let mut visited = vec![false; edges.len()];
    let mut contours = Vec::new();
    let mut stack = Vec::new();

    for start in 0..edges.len() {
        if !edges[start] || visited[start] {
            continue;
        }

        let (sx, sy) = ((start as u32) % w, (start as u32) / w);
        let mut contour = Contour {
            pixels: Vec::new(),
            min_x: sx,
            max_x: sx,
            min_y: sy,
            max_y: sy,
        };

        visited[start] = true;
        stack.push((sx, sy));
        while let Some((x, y)) = stack.pop() {
            contour.pixels.push((x, y));
            contour.min_x = contour.min_x.min(x);
            contour.max_x = contour.max_x.max(x);
            contour.min_y = contour.min_y.min(y);
            contour.max_y = contour.max_y.max(y);

            for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                    let idx = (ny * w + nx) as usize;
                    if edges[idx] && !visited[idx] {
                        visited[idx] = true;
                        stack.push((nx, ny));
                    }
                }
            }
        }

        if contour.area() > MIN_CONTOUR_AREA {
            contours.push(contour);
        }
    }

    contours
}

use image::DynamicImage;
use image::imageops::FilterType;

use crate::model::Detection;

use super::ObjectModel;

const LABELS: [&str; 4] = ["person", "bottle", "cup", "phone"];

/// Contrast-based stand-in for a real model: bright regions of an Otsu-thresholded thumbnail
/// become boxes.
#[derive(Debug, Clone)]
pub struct HeuristicModel {
    pub width: u32,
    pub height: u32,
    /// Smallest bounding-box area, in thumbnail pixels, worth reporting.
    pub min_area: u32,
    pub max_regions: usize,
}

impl Default for HeuristicModel {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            min_area: 200,
            max_regions: 3,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Region {
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    pixels: u32,
}

impl Region {
    fn area(&self) -> u32 {
        (self.max_x - self.min_x + 1) * (self.max_y - self.min_y + 1)
    }
}

impl ObjectModel for HeuristicModel {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn detect(&self, image: &DynamicImage) -> Vec<Detection> {
        let gray = image
            .resize_exact(self.width, self.height, FilterType::Triangle)
            .to_luma8();
        let threshold = otsu_threshold(gray.as_raw());
        let mask: Vec<bool> = gray.as_raw().iter().map(|&v| v > threshold).collect();

        let (w, h) = (self.width as f64, self.height as f64);
        regions(&mask, self.width, self.height)
            .into_iter()
            .take(self.max_regions)
            .enumerate()
            .filter(|(_, r)| r.area() >= self.min_area)
            .map(|(i, r)| {
                let fill = r.pixels as f64 / r.area() as f64;
                Detection {
                    label: LABELS[i % LABELS.len()].to_owned(),
                    score: 0.5 + 0.45 * fill,
                    xmin: r.min_x as f64 / w,
                    ymin: r.min_y as f64 / h,
                    xmax: (r.max_x + 1) as f64 / w,
                    ymax: (r.max_y + 1) as f64 / h,
                }
            })
            .collect()
    }
}

/// Threshold maximising between-class variance over an 8-bit histogram.
fn otsu_threshold(pixels: &[u8]) -> u8 {
    let mut hist = [0u64; 256];
    for &p in pixels {
        hist[p as usize] += 1;
    }
    let total = pixels.len() as f64;
    let sum_all: f64 = hist.iter().enumerate().map(|(i, &c)| i as f64 * c as f64).sum();

    let (mut weight_bg, mut sum_bg) = (0.0, 0.0);
    let (mut best, mut best_var) = (0u8, 0.0);
    for (t, &count) in hist.iter().enumerate() {
        weight_bg += count as f64;
        if weight_bg == 0.0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0.0 {
            break;
        }
        sum_bg += t as f64 * count as f64;
        let mean_bg = sum_bg / weight_bg;
        let mean_fg = (sum_all - sum_bg) / weight_fg;
        let var = weight_bg * weight_fg * (mean_bg - mean_fg).powi(2);
        if var > best_var {
            best_var = var;
            best = t as u8;
        }
    }
    best
}

/// 8-connected foreground components in raster order of their first pixel.
fn regions(mask: &[bool], width: u32, height: u32) -> Vec<Region> {
    let (w, h) = (width as i64, height as i64);
    let mut seen = vec![false; mask.len()];
    let mut out = Vec::new();
    let mut stack = Vec::new();

    for start in 0..mask.len() {
        if !mask[start] || seen[start] {
            continue;
        }
        seen[start] = true;
        stack.push(start);
        let (sx, sy) = ((start as i64 % w) as u32, (start as i64 / w) as u32);
        let mut region = Region {
            min_x: sx,
            min_y: sy,
            max_x: sx,
            max_y: sy,
            pixels: 0,
        };

        while let Some(idx) = stack.pop() {
            let (x, y) = (idx as i64 % w, idx as i64 / w);
            region.pixels += 1;
            region.min_x = region.min_x.min(x as u32);
            region.min_y = region.min_y.min(y as u32);
            region.max_x = region.max_x.max(x as u32);
            region.max_y = region.max_y.max(y as u32);

            for dy in -1..=1 {
                for dx in -1..=1 {
                    let (nx, ny) = (x + dx, y + dy);
                    if nx < 0 || ny < 0 || nx >= w || ny >= h {
                        continue;
                    }
                    let n = (ny * w + nx) as usize;
                    if mask[n] && !seen[n] {
                        seen[n] = true;
                        stack.push(n);
                    }
                }
            }
        }
        out.push(region);
    }
    out
}

//! Image comparison: dimension reconciliation, RMSE metric and heatmap.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, GrayImage};
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::Path;

use crate::error::VergenceError;

/// Resampling filter used whenever the reference has to be rescaled.
/// Bilinear is deterministic and does not introduce the blocky edge
/// aliasing that nearest-neighbour would add to the diff.
pub const RESAMPLE_FILTER: FilterType = FilterType::Triangle;

/// How the reference dimensions related to the rendered dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionNote {
    /// Dimensions were identical.
    Match,
    /// Rendered image was an exact 2x or 3x pixel-density multiple of the
    /// reference on both axes; the reference was upscaled by that factor.
    Scaled(u32),
    /// No integer multiple relationship; the reference was stretched to the
    /// rendered dimensions. Degraded confidence.
    MismatchResized,
}

impl fmt::Display for DimensionNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DimensionNote::Match => write!(f, "match"),
            DimensionNote::Scaled(k) => write!(f, "scaled\u{d7}{k}"),
            DimensionNote::MismatchResized => write!(f, "mismatch-resized"),
        }
    }
}

impl Serialize for DimensionNote {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Result of comparing a rendered candidate against the reference.
#[derive(Debug, Clone)]
pub struct Comparison {
    /// Normalized RMSE over all pixels and channels, as a percentage in
    /// [0, 100], rounded to 2 decimal places.
    pub diff_percent: f64,
    /// Per-pixel absolute luminance difference, contrast stretched so the
    /// observed difference range spans the full grayscale range.
    pub heatmap: GrayImage,
    pub note: DimensionNote,
}

/// Open an image from disk. Any decode failure is an [`VergenceError::ImageRead`],
/// never a diff result.
pub fn load_image(path: &Path) -> Result<DynamicImage, VergenceError> {
    image::open(path).map_err(|e| VergenceError::ImageRead(format!("{}: {e}", path.display())))
}

/// Reconcile the reference to the rendered dimensions before diffing.
fn reconcile(reference: &DynamicImage, rendered: &DynamicImage) -> (DynamicImage, DimensionNote) {
    let (rw, rh) = (reference.width(), reference.height());
    let (cw, ch) = (rendered.width(), rendered.height());
    if (rw, rh) == (cw, ch) {
        return (reference.clone(), DimensionNote::Match);
    }
    for k in [2u32, 3] {
        if rw.checked_mul(k) == Some(cw) && rh.checked_mul(k) == Some(ch) {
            let scaled = reference.resize_exact(cw, ch, RESAMPLE_FILTER);
            return (scaled, DimensionNote::Scaled(k));
        }
    }
    let stretched = reference.resize_exact(cw, ch, RESAMPLE_FILTER);
    (stretched, DimensionNote::MismatchResized)
}

/// Compare a rendered candidate image against the reference.
///
/// Alpha is stripped before diffing; it is compositing metadata, not a
/// visual difference. The diff is the normalized RMSE over all pixels and
/// RGB channels, reported as a percentage rounded to 2 decimal places.
pub fn compare(
    reference: &DynamicImage,
    rendered: &DynamicImage,
) -> Result<Comparison, VergenceError> {
    if reference.width() == 0
        || reference.height() == 0
        || rendered.width() == 0
        || rendered.height() == 0
    {
        return Err(VergenceError::ImageRead(
            "zero-dimension image".to_string(),
        ));
    }

    let (reconciled, note) = reconcile(reference, rendered);
    let a = reconciled.to_rgb8();
    let b = rendered.to_rgb8();

    let mut sum = 0.0f64;
    for (pa, pb) in a.pixels().zip(b.pixels()) {
        for c in 0..3 {
            let d = (pa.0[c] as f64 - pb.0[c] as f64) / 255.0;
            sum += d * d;
        }
    }
    let samples = a.width() as f64 * a.height() as f64 * 3.0;
    let rmse = (sum / samples).sqrt();
    let diff_percent = round2(rmse * 100.0);

    let heatmap = heatmap(&reconciled, rendered);
    Ok(Comparison {
        diff_percent,
        heatmap,
        note,
    })
}

/// Build the contrast-stretched luminance difference heatmap.
///
/// Identical images yield an all-black map. A uniform nonzero difference
/// has no range to stretch and is mapped to full brightness so it stays
/// visible.
fn heatmap(a: &DynamicImage, b: &DynamicImage) -> GrayImage {
    let la = a.to_luma8();
    let lb = b.to_luma8();
    let (w, h) = la.dimensions();

    let mut raw: Vec<u8> = la
        .pixels()
        .zip(lb.pixels())
        .map(|(x, y)| x.0[0].abs_diff(y.0[0]))
        .collect();

    let lo = raw.iter().copied().min().unwrap_or(0);
    let hi = raw.iter().copied().max().unwrap_or(0);
    if hi == 0 {
        // identical luminance everywhere
    } else if hi == lo {
        for v in raw.iter_mut() {
            *v = 255;
        }
    } else {
        let range = (hi - lo) as f64;
        for v in raw.iter_mut() {
            *v = (((*v - lo) as f64) * 255.0 / range).round() as u8;
        }
    }

    GrayImage::from_raw(w, h, raw).expect("buffer length matches dimensions")
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

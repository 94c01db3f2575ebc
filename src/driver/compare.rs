use anyhow::Result;
use image::{DynamicImage, GenericImageView};

/// Per-channel difference below this is treated as noise (anti-aliasing,
/// JPEG-ish rendering jitter).
const CHANNEL_TOLERANCE: i32 = 5;

/// Compare two rendered screenshots and return the percentage of pixels that
/// differ. Images of different dimensions are reported as 100% different.
pub fn diff_percent(current: &DynamicImage, reference: &DynamicImage) -> f64 {
    if current.dimensions() != reference.dimensions() {
        return 100.0;
    }

    let (width, height) = current.dimensions();
    let total = (width as u64) * (height as u64);
    if total == 0 {
        return 0.0;
    }

    let mut diff_pixels = 0u64;
    for y in 0..height {
        for x in 0..width {
            let a = current.get_pixel(x, y);
            let b = reference.get_pixel(x, y);
            let changed = a
                .0
                .iter()
                .zip(b.0.iter())
                .any(|(p, q)| (*p as i32 - *q as i32).abs() > CHANNEL_TOLERANCE);
            if changed {
                diff_pixels += 1;
            }
        }
    }

    (diff_pixels as f64 / total as f64) * 100.0
}

/// Decode a PNG capture and compare it against a reference file on disk.
pub fn diff_against_reference(png_bytes: &[u8], reference_path: &std::path::Path) -> Result<f64> {
    let current = image::load_from_memory(png_bytes)?;
    let reference = image::open(reference_path)?;
    Ok(diff_percent(&current, &reference))
}

//! Writes generated batches as a single JPEG grid for visual inspection.

use std::path::Path;

use image::{ImageFormat, RgbImage};

use crate::error::{GanError, Result};
use crate::math::tensor::Tensor;

/// Images per grid row.
pub const GRID_COLUMNS: usize = 8;
/// Pixels of black border around every image.
pub const GRID_PADDING: usize = 2;

/// File name of the sample grid written after `epoch`.
pub fn sample_file_name(epoch: usize) -> String {
    format!("fake_samples_epoch_{:06}.jpeg", epoch)
}

/// Lays out `[n, c, h, w]` images (c = 1 or 3) in a grid and saves it as JPEG.
///
/// Pixel values are min-max normalized over the whole batch to [0, 255], so
/// any output range is displayable. Grayscale images are replicated into all
/// three channels.
pub fn save_image_grid(images: &Tensor, path: &Path) -> Result<()> {
    let grid = image_grid(images)?;
    grid.save_with_format(path, ImageFormat::Jpeg)?;
    Ok(())
}

fn image_grid(images: &Tensor) -> Result<RgbImage> {
    let (n, c, h, w) = match images.shape() {
        &[n, c, h, w] if n > 0 && (c == 1 || c == 3) => (n, c, h, w),
        other => return Err(GanError::shape("image grid", other, &[0, 3, 0, 0])),
    };

    let cols = n.min(GRID_COLUMNS);
    let rows = (n + cols - 1) / cols;
    let width = cols * (w + GRID_PADDING) + GRID_PADDING;
    let height = rows * (h + GRID_PADDING) + GRID_PADDING;

    let lo = images.min();
    let range = images.max() - lo;
    let to_byte = |v: f64| -> u8 {
        let unit = if range > 0.0 { (v - lo) / range } else { 0.0 };
        (unit * 255.0 + 0.5).clamp(0.0, 255.0) as u8
    };

    let mut grid = RgbImage::new(width as u32, height as u32);
    let plane = h * w;
    for (idx, sample) in images.data().chunks(c * plane).enumerate() {
        let x0 = (idx % cols) * (w + GRID_PADDING) + GRID_PADDING;
        let y0 = (idx / cols) * (h + GRID_PADDING) + GRID_PADDING;
        for y in 0..h {
            for x in 0..w {
                let pixel = y * w + x;
                let rgb = if c == 1 {
                    let v = to_byte(sample[pixel]);
                    [v, v, v]
                } else {
                    [
                        to_byte(sample[pixel]),
                        to_byte(sample[plane + pixel]),
                        to_byte(sample[2 * plane + pixel]),
                    ]
                };
                grid.put_pixel((x0 + x) as u32, (y0 + y) as u32, image::Rgb(rgb));
            }
        }
    }
    Ok(grid)
}

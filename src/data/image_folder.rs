//! Image-folder datasets: one sub-directory per class, any mix of
//! PNG/JPEG/BMP/GIF files inside.
//!
//! Every image is resized to `image_size × image_size`, converted to
//! grayscale or RGB depending on `channels`, scaled from [0, 255] to
//! [-1, 1] (the range of a Tanh generator), and laid out as `[c, h, w]`.

use std::fs;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;

use crate::error::{GanError, Result};
use crate::math::tensor::Tensor;

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "gif"];

pub struct ImageFolder {
    /// Class names in label order (sorted directory names).
    pub classes: Vec<String>,
    pub samples: Vec<(Tensor, usize)>,
}

impl ImageFolder {
    pub fn open(dir: impl AsRef<Path>, image_size: u32, channels: usize) -> Result<ImageFolder> {
        let dir = dir.as_ref();
        if channels != 1 && channels != 3 {
            return Err(GanError::Config(format!("channels must be 1 or 3, got {channels}")));
        }

        let mut class_dirs: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_dir())
            .collect();
        class_dirs.sort();
        if class_dirs.is_empty() {
            return Err(GanError::Config(format!(
                "no class sub-directories found in '{}'",
                dir.display()
            )));
        }

        let mut classes = Vec::with_capacity(class_dirs.len());
        let mut samples = Vec::new();
        for (label, class_dir) in class_dirs.iter().enumerate() {
            classes.push(
                class_dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default(),
            );
            let mut files: Vec<PathBuf> = fs::read_dir(class_dir)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| is_image(p))
                .collect();
            files.sort();
            for file in files {
                samples.push((load_image(&file, image_size, channels)?, label));
            }
        }

        tracing::info!(
            "Loaded {} images in {} classes from '{}'",
            samples.len(),
            classes.len(),
            dir.display()
        );
        Ok(ImageFolder { classes, samples })
    }
}

fn is_image(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
}

/// Decodes one file into a `[channels, size, size]` tensor in [-1, 1].
pub fn load_image(path: &Path, image_size: u32, channels: usize) -> Result<Tensor> {
    let img = image::open(path)?;
    let resized = img.resize_exact(image_size, image_size, FilterType::Lanczos3);
    let plane = (image_size * image_size) as usize;
    let mut data = vec![0.0; channels * plane];

    if channels == 1 {
        for (i, p) in resized.to_luma8().pixels().enumerate() {
            data[i] = to_signed_unit(p.0[0]);
        }
    } else {
        for (i, p) in resized.to_rgb8().pixels().enumerate() {
            for c in 0..3 {
                data[c * plane + i] = to_signed_unit(p.0[c]);
            }
        }
    }
    Tensor::new(vec![channels, image_size as usize, image_size as usize], data)
}

fn to_signed_unit(v: u8) -> f64 {
    v as f64 / 127.5 - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn loads_classes_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        for class in ["b_cats", "a_dogs"] {
            fs::create_dir(dir.path().join(class)).unwrap();
            let img = RgbImage::from_pixel(4, 4, Rgb([255, 0, 0]));
            img.save(dir.path().join(class).join("x.png")).unwrap();
        }
        fs::write(dir.path().join("a_dogs").join("notes.txt"), "skip me").unwrap();

        let folder = ImageFolder::open(dir.path(), 2, 3).unwrap();
        assert_eq!(folder.classes, ["a_dogs", "b_cats"]);
        assert_eq!(folder.samples.len(), 2);

        let (img, label) = &folder.samples[1];
        assert_eq!(*label, 1);
        assert_eq!(img.shape(), &[3, 2, 2]);
        // Red channel saturated, others at the bottom of the range.
        assert!((img.data()[0] - 1.0).abs() < 1e-9);
        assert!((img.data()[4] + 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_directory_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(ImageFolder::open(dir.path(), 8, 1), Err(GanError::Config(_))));
    }
}

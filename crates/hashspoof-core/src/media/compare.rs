use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbImage};
use log::error;

use crate::error::SpoofError;
use crate::result::Result;

/// size each image is scaled to inside the comparison
pub const PREVIEW_TILE: (u32, u32) = (400, 400);

/// original on the left, modified on the right, both scaled to [`PREVIEW_TILE`]
pub fn side_by_side(original: &DynamicImage, modified: &DynamicImage) -> RgbImage {
    let (w, h) = PREVIEW_TILE;
    let left = original.resize_exact(w, h, FilterType::Triangle).to_rgb8();
    let right = modified.resize_exact(w, h, FilterType::Triangle).to_rgb8();

    let mut canvas = RgbImage::new(w * 2, h);
    imageops::replace(&mut canvas, &left, 0, 0);
    imageops::replace(&mut canvas, &right, w as i64, 0);
    canvas
}

/// Loads both images from disk and stores their comparison as PNG at `target`
pub fn save_comparison(original: &Path, modified: &Path, target: &Path) -> Result<()> {
    let load = |path: &Path| {
        image::open(path).map_err(|e| {
            error!("Error loading {path:?} for comparison: {e}");
            SpoofError::InvalidImageMedia
        })
    };
    let canvas = side_by_side(&load(original)?, &load(modified)?);

    canvas
        .save_with_format(target, ImageFormat::Png)
        .map_err(|e| match e {
            image::ImageError::IoError(source) => SpoofError::WriteError { source },
            other => SpoofError::ImageEncodingError(other.to_string()),
        })
}

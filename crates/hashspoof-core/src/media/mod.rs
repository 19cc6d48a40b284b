pub mod compare;
pub mod jpeg;
pub mod png_text;
mod source;

pub use source::SourceImage;

use image::ImageFormat;

/// name of a codec as it shows up in errors and logs
pub fn codec_name(format: ImageFormat) -> String {
    format!("{format:?}").to_uppercase()
}

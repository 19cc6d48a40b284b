//! PNG encoding with an extra `tEXt` chunk.
//!
//! The `image` crate offers no way to attach text chunks, so the pixels are
//! handed to the `png` encoder directly. Colour type and bit depth of the
//! source are kept where PNG supports them.

use std::borrow::Cow;

use image::DynamicImage;
use log::error;
use png::{BitDepth, ColorType, Encoder};

use crate::error::SpoofError;
use crate::result::Result;

/// Encodes `image` as PNG into `out`, carrying `keyword: text` as a `tEXt` chunk
/// in front of the image data.
pub fn encode_with_text(
    image: &DynamicImage,
    keyword: &str,
    text: &str,
    out: &mut Vec<u8>,
) -> Result<()> {
    let (color, depth, data) = png_layout(image);
    let mut encoder = Encoder::new(&mut *out, image.width(), image.height());
    encoder.set_color(color);
    encoder.set_depth(depth);
    encoder
        .add_text_chunk(keyword.to_string(), text.to_string())
        .map_err(encoding_error)?;

    let mut writer = encoder.write_header().map_err(encoding_error)?;
    writer.write_image_data(&data).map_err(encoding_error)?;
    writer.finish().map_err(encoding_error)
}

fn png_layout(image: &DynamicImage) -> (ColorType, BitDepth, Cow<'_, [u8]>) {
    use BitDepth::{Eight, Sixteen};
    use ColorType::{Grayscale, GrayscaleAlpha, Rgb, Rgba};

    match image {
        DynamicImage::ImageLuma8(i) => (Grayscale, Eight, Cow::Borrowed(i.as_raw())),
        DynamicImage::ImageLumaA8(i) => (GrayscaleAlpha, Eight, Cow::Borrowed(i.as_raw())),
        DynamicImage::ImageRgb8(i) => (Rgb, Eight, Cow::Borrowed(i.as_raw())),
        DynamicImage::ImageRgba8(i) => (Rgba, Eight, Cow::Borrowed(i.as_raw())),
        DynamicImage::ImageLuma16(i) => (Grayscale, Sixteen, big_endian(i.as_raw())),
        DynamicImage::ImageLumaA16(i) => (GrayscaleAlpha, Sixteen, big_endian(i.as_raw())),
        DynamicImage::ImageRgb16(i) => (Rgb, Sixteen, big_endian(i.as_raw())),
        DynamicImage::ImageRgba16(i) => (Rgba, Sixteen, big_endian(i.as_raw())),
        other => (Rgba, Eight, Cow::Owned(other.to_rgba8().into_raw())),
    }
}

/// PNG stores 16 bit samples in network byte order
fn big_endian(samples: &[u16]) -> Cow<'static, [u8]> {
    Cow::Owned(samples.iter().flat_map(|s| s.to_be_bytes()).collect())
}

fn encoding_error(e: png::EncodingError) -> SpoofError {
    error!("Error encoding png: {e}");
    SpoofError::ImageEncodingError(e.to_string())
}

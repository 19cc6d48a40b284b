use std::borrow::Cow;
use std::cell::OnceCell;
use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageFormat};
use log::{debug, error};

use super::{codec_name, jpeg};
use crate::error::SpoofError;
use crate::result::Result;

/// a decoded image together with the codec it came from, read-only after loading
#[derive(Debug, Clone)]
pub struct SourceImage {
    pixels: DynamicImage,
    format: ImageFormat,
    exif: Option<Vec<u8>>,
    /// the pixels encoded as JPEG, with the quality used
    jpeg_stream: OnceCell<(u8, Vec<u8>)>,
}

impl SourceImage {
    /// Wraps already decoded pixels. Any codec tag is accepted here, the
    /// mutator decides which ones it can handle.
    pub fn from_image(pixels: DynamicImage, format: ImageFormat) -> Self {
        Self {
            pixels,
            format,
            exif: None,
            jpeg_stream: OnceCell::new(),
        }
    }

    /// Attaches a raw APP1 `Exif` payload that candidates should carry on
    pub fn with_exif(mut self, exif: Vec<u8>) -> Self {
        self.exif = Some(exif);
        self
    }

    /// Loads an image file, the codec is detected from the content first
    /// and from the file extension second.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|source| {
            error!("Error opening image {path:?}: {source}");
            SpoofError::ReadError { source }
        })?;
        let mut reader = image::io::Reader::new(Cursor::new(bytes.as_slice()))
            .with_guessed_format()
            .map_err(|source| SpoofError::ReadError { source })?;

        let format = match reader.format() {
            Some(format) => format,
            None => ImageFormat::from_path(path)
                .map_err(|_e| SpoofError::UnsupportedFormat("unknown".to_string()))?,
        };
        if !matches!(format, ImageFormat::Png | ImageFormat::Jpeg) {
            return Err(SpoofError::UnsupportedFormat(codec_name(format)));
        }
        reader.set_format(format);

        let pixels = reader.decode().map_err(|e| {
            error!("Error decoding image {path:?}: {e}");
            SpoofError::InvalidImageMedia
        })?;
        debug!(
            "Image loaded: {path:?} ({}, {}x{})",
            codec_name(format),
            pixels.width(),
            pixels.height()
        );

        let mut image = Self::from_image(pixels, format);
        if format == ImageFormat::Jpeg {
            if let Some(exif) = jpeg::find_exif(&bytes) {
                debug!("Keeping {} bytes of EXIF data", exif.len());
                image = image.with_exif(exif.to_vec());
            }
        }
        Ok(image)
    }

    pub fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.pixels.width(), self.pixels.height())
    }

    /// the APP1 `Exif` payload of the source, if it had one
    pub fn exif(&self) -> Option<&[u8]> {
        self.exif.as_deref()
    }

    /// The pixels encoded as JPEG at `quality`.
    ///
    /// The first call encodes and keeps the result, later calls with the same
    /// quality borrow it.
    pub fn jpeg_stream(&self, quality: u8) -> Result<Cow<'_, [u8]>> {
        if let Some((cached, stream)) = self.jpeg_stream.get() {
            if *cached == quality {
                return Ok(Cow::Borrowed(stream.as_slice()));
            }
            return jpeg::encode_pixels(&self.pixels, quality).map(Cow::Owned);
        }

        let stream = jpeg::encode_pixels(&self.pixels, quality)?;
        let (_, stream) = self.jpeg_stream.get_or_init(|| (quality, stream));
        Ok(Cow::Borrowed(stream.as_slice()))
    }
}

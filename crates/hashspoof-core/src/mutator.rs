use image::ImageFormat;
use log::trace;

use crate::error::SpoofError;
use crate::media::jpeg::{self, DEFAULT_JPEG_QUALITY};
use crate::media::{codec_name, png_text, SourceImage};
use crate::result::Result;

/// keyword of the PNG `tEXt` chunk that carries the iteration
pub const PNG_TEXT_KEYWORD: &str = "iteration";

/// the encoded candidate of one search iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationAttempt {
    pub iteration: u64,
    pub bytes: Vec<u8>,
}

/// Produces a different encoded byte stream for every iteration without
/// visibly changing the image.
pub trait ImageMutator {
    fn mutate(&self, image: &SourceImage, iteration: u64) -> Result<MutationAttempt>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOptions {
    /// append `padding_<iteration>` after the encoded image
    pub add_padding: bool,

    /// quality of re-encoded JPEG images (1-100)
    pub jpeg_quality: u8,
}

impl Default for MutationOptions {
    fn default() -> Self {
        Self {
            add_padding: true,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl MutationOptions {
    pub fn with_padding(mut self, add_padding: bool) -> Self {
        self.add_padding = add_padding;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }
}

/// Mutates metadata of the image's own codec:
/// - PNG: a `tEXt` chunk `iteration = metadata_<n>`
/// - JPEG: EXIF `UserComment = Iteration <n>`
///
/// optionally followed by `padding_<n>` trailer bytes, which decoders ignore.
#[derive(Debug, Default, Clone)]
pub struct CodecMutator {
    options: MutationOptions,
}

impl CodecMutator {
    pub fn new(options: MutationOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &MutationOptions {
        &self.options
    }
}

impl ImageMutator for CodecMutator {
    fn mutate(&self, image: &SourceImage, iteration: u64) -> Result<MutationAttempt> {
        let mut bytes = Vec::new();
        match image.format() {
            ImageFormat::Png => png_text::encode_with_text(
                image.pixels(),
                PNG_TEXT_KEYWORD,
                &format!("metadata_{iteration}"),
                &mut bytes,
            )?,
            ImageFormat::Jpeg => {
                let stream = image.jpeg_stream(self.options.jpeg_quality)?;
                jpeg::splice_comment(
                    &stream,
                    image.exif(),
                    &format!("Iteration {iteration}"),
                    &mut bytes,
                )?
            }
            other => return Err(SpoofError::UnsupportedFormat(codec_name(other))),
        }

        if self.options.add_padding {
            bytes.extend_from_slice(format!("padding_{iteration}").as_bytes());
        }
        trace!("iteration {iteration}: {} candidate bytes", bytes.len());

        Ok(MutationAttempt { iteration, bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::jpeg::exif;
    use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
    use std::collections::HashSet;
    use std::fs;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn png_source() -> SourceImage {
        let img = RgbaImage::from_fn(9, 6, |x, y| Rgba([x as u8 * 20, y as u8 * 30, 200, 255]));
        SourceImage::from_image(DynamicImage::ImageRgba8(img), ImageFormat::Png)
    }

    fn jpeg_source() -> SourceImage {
        let img = RgbImage::from_fn(17, 11, |x, y| Rgb([x as u8 * 10, y as u8 * 20, 64]));
        SourceImage::from_image(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg)
    }

    fn png_text_of(bytes: &[u8]) -> Vec<(String, String)> {
        let reader = png::Decoder::new(Cursor::new(bytes)).read_info().unwrap();
        reader
            .info()
            .uncompressed_latin1_text
            .iter()
            .map(|c| (c.keyword.clone(), c.text.clone()))
            .collect()
    }

    fn jpeg_comment_of(bytes: &[u8]) -> Option<String> {
        // APP0 (JFIF) comes first, the EXIF segment right after it
        let app0_len = u16::from_be_bytes([bytes[4], bytes[5]]) as usize;
        let app1 = 2 + 2 + app0_len;
        assert_eq!(&bytes[app1..app1 + 2], &[0xFF, 0xE1]);
        let len = u16::from_be_bytes([bytes[app1 + 2], bytes[app1 + 3]]) as usize;
        exif::read_user_comment(&bytes[app1 + 4..app1 + 2 + len])
    }

    #[test]
    fn should_embed_iteration_metadata_in_png() {
        let attempt = CodecMutator::default().mutate(&png_source(), 1).unwrap();

        assert_eq!(attempt.iteration, 1);
        assert_eq!(
            png_text_of(&attempt.bytes),
            vec![("iteration".to_string(), "metadata_1".to_string())]
        );
    }

    #[test]
    fn should_embed_iteration_comment_in_jpeg() {
        let attempt = CodecMutator::default().mutate(&jpeg_source(), 17).unwrap();

        assert_eq!(
            jpeg_comment_of(&attempt.bytes).as_deref(),
            Some("Iteration 17")
        );
    }

    #[test]
    fn should_append_padding_after_the_image() {
        let attempt = CodecMutator::default().mutate(&png_source(), 2).unwrap();

        assert!(attempt.bytes.ends_with(b"padding_2"));
    }

    #[test]
    fn should_skip_padding_when_disabled() {
        let mutator = CodecMutator::new(MutationOptions::default().with_padding(false));

        let png = mutator.mutate(&png_source(), 2).unwrap();
        assert!(png.bytes.ends_with(b"IEND\xAE\x42\x60\x82"));

        let jpeg = mutator.mutate(&jpeg_source(), 2).unwrap();
        assert!(jpeg.bytes.ends_with(&[0xFF, 0xD9]));
    }

    #[test]
    fn should_produce_distinct_bytes_per_iteration() {
        for source in [png_source(), jpeg_source()] {
            for options in [
                MutationOptions::default(),
                MutationOptions::default().with_padding(false),
            ] {
                let mutator = CodecMutator::new(options);
                let distinct: HashSet<Vec<u8>> = (0..50)
                    .map(|i| mutator.mutate(&source, i).unwrap().bytes)
                    .collect();

                assert_eq!(distinct.len(), 50, "{:?}", source.format());
            }
        }
    }

    #[test]
    fn should_be_deterministic_per_iteration() {
        let mutator = CodecMutator::default();
        for source in [png_source(), jpeg_source()] {
            assert_eq!(
                mutator.mutate(&source, 99).unwrap(),
                mutator.mutate(&source, 99).unwrap()
            );
        }
    }

    #[test]
    fn should_decode_to_the_original_dimensions() {
        let mutator = CodecMutator::default();
        for source in [png_source(), jpeg_source()] {
            for iteration in [0, 1, 12345] {
                let attempt = mutator.mutate(&source, iteration).unwrap();
                let format = image::guess_format(&attempt.bytes).unwrap();
                let decoded = image::load_from_memory(&attempt.bytes).unwrap();

                assert_eq!(format, source.format());
                assert_eq!((decoded.width(), decoded.height()), source.dimensions());
            }
        }
    }

    #[test]
    fn should_keep_png_pixels_lossless() {
        let source = png_source();
        let attempt = CodecMutator::default().mutate(&source, 7).unwrap();
        let decoded = image::load_from_memory(&attempt.bytes).unwrap();

        assert_eq!(decoded.to_rgba8(), source.pixels().to_rgba8());
    }

    #[test]
    fn should_fail_for_unsupported_codecs() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(100, 100));
        let source = SourceImage::from_image(img, ImageFormat::Gif);

        match CodecMutator::default().mutate(&source, 1) {
            Err(SpoofError::UnsupportedFormat(codec)) => assert_eq!(codec, "GIF"),
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
    }

    #[test]
    fn should_keep_the_camera_orientation_of_a_loaded_jpeg() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("camera.jpg");
        let mut file = Vec::new();
        jpeg::insert_segment(
            &jpeg::encode_pixels(jpeg_source().pixels(), 90).unwrap(),
            jpeg::marker::Marker::APP(1),
            &exif::camera_block(6),
            &mut file,
        )
        .unwrap();
        fs::write(&path, file).unwrap();
        let source = SourceImage::from_file(&path).unwrap();

        let attempt = CodecMutator::default().mutate(&source, 1).unwrap();

        let block = jpeg::find_exif(&attempt.bytes).unwrap();
        assert_eq!(exif::read_ifd0_short(block, 0x0112), Some(6));
        assert_eq!(jpeg_comment_of(&attempt.bytes).as_deref(), Some("Iteration 1"));
    }

    #[test]
    fn should_splice_into_the_same_stream_a_fresh_encode_gives() {
        let source = jpeg_source();
        let mutator = CodecMutator::new(MutationOptions::default().with_padding(false));
        // fills the cached stream
        mutator.mutate(&source, 0).unwrap();

        let attempt = mutator.mutate(&source, 3).unwrap();

        let mut expected = Vec::new();
        jpeg::splice_comment(
            &jpeg::encode_pixels(source.pixels(), DEFAULT_JPEG_QUALITY).unwrap(),
            None,
            "Iteration 3",
            &mut expected,
        )
        .unwrap();
        assert_eq!(attempt.bytes, expected);
    }
}

//! JPEG encoding with an EXIF `UserComment`.
//!
//! The pixels are encoded once by the `image` crate. Each candidate is that
//! stream with an APP1 segment spliced in right after the SOI marker and any
//! APP0 (JFIF) segment.

pub mod exif;
pub mod marker;

use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage};
use log::error;

use crate::error::SpoofError;
use crate::result::Result;
use marker::Marker;

/// Quality used when nothing else is configured, same as the usual encoder default
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// length field of a segment counts itself
const MAX_SEGMENT_PAYLOAD: usize = u16::MAX as usize - 2;

/// Encodes `image` as baseline JPEG. Greyscale stays greyscale, everything else becomes RGB.
pub fn encode_pixels(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let mut encoded = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut encoded, quality.clamp(1, 100));
        let result = match image {
            DynamicImage::ImageLuma8(gray) => {
                encoder.encode(gray.as_raw(), gray.width(), gray.height(), ColorType::L8)
            }
            other => {
                let rgb = other.to_rgb8();
                encoder.encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
            }
        };
        result.map_err(|e| {
            error!("Error encoding jpeg: {e}");
            SpoofError::ImageEncodingError(e.to_string())
        })?;
    }

    Ok(encoded)
}

/// Copies the `encoded` stream into `out` with `comment` stored as EXIF `UserComment`.
///
/// `exif` is the APP1 payload of the source image, its other tags are kept.
pub fn splice_comment(
    encoded: &[u8],
    exif: Option<&[u8]>,
    comment: &str,
    out: &mut Vec<u8>,
) -> Result<()> {
    let block = exif::with_user_comment(exif, comment)
        .map_err(|e| SpoofError::ImageEncodingError(e.to_string()))?;
    insert_segment(encoded, Marker::APP(1), &block, out)
}

/// The payload of the first APP1 `Exif` segment in the header of `jpeg`.
pub fn find_exif(jpeg: &[u8]) -> Option<&[u8]> {
    if jpeg.get(..2) != Some(&[0xFF, Marker::SOI.to_u8()][..]) {
        return None;
    }

    let mut position = 2;
    while let Some(&[0xFF, m, ..]) = jpeg.get(position..) {
        let Some(marker) = Marker::from_u8(m) else {
            // fill byte
            position += 1;
            continue;
        };
        if matches!(marker, Marker::SOS | Marker::EOI) {
            break;
        }
        if !marker.has_length() {
            position += 2;
            continue;
        }

        let &[hi, lo] = jpeg.get(position + 2..position + 4)? else {
            return None;
        };
        let end = position + 2 + u16::from_be_bytes([hi, lo]) as usize;
        let payload = jpeg.get(position + 4..end)?;
        if marker == Marker::APP(1) && payload.starts_with(exif::EXIF_HEADER) {
            return Some(payload);
        }
        position = end;
    }
    None
}

/// Copies `jpeg` into `out` with a new segment placed after SOI and leading APP0 segments.
pub fn insert_segment(
    jpeg: &[u8],
    marker: Marker,
    payload: &[u8],
    out: &mut Vec<u8>,
) -> Result<()> {
    if payload.len() > MAX_SEGMENT_PAYLOAD {
        return Err(SpoofError::ImageEncodingError(format!(
            "segment payload of {} bytes exceeds {MAX_SEGMENT_PAYLOAD}",
            payload.len()
        )));
    }
    if jpeg.get(..2) != Some(&[0xFF, Marker::SOI.to_u8()][..]) {
        return Err(SpoofError::ImageEncodingError(
            "jpeg stream does not start with SOI".to_string(),
        ));
    }

    let mut position = 2;
    while let Some(&[0xFF, m, hi, lo, ..]) = jpeg.get(position..) {
        if Marker::from_u8(m) != Some(Marker::APP(0)) {
            break;
        }
        position += 2 + u16::from_be_bytes([hi, lo]) as usize;
    }
    let position = position.min(jpeg.len());

    out.reserve(jpeg.len() + payload.len() + 4);
    out.extend_from_slice(&jpeg[..position]);
    out.push(0xFF);
    out.push(marker.to_u8());
    out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(payload);
    out.extend_from_slice(&jpeg[position..]);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    /// walks the header segments up to SOS and returns (marker, payload) pairs
    fn header_segments(jpeg: &[u8]) -> Vec<(Marker, Vec<u8>)> {
        let mut segments = Vec::new();
        let mut position = 2;
        while let Some(&[0xFF, m, hi, lo, ..]) = jpeg.get(position..) {
            let marker = Marker::from_u8(m).unwrap();
            let len = u16::from_be_bytes([hi, lo]) as usize;
            segments.push((marker, jpeg[position + 4..position + 2 + len].to_vec()));
            if marker == Marker::SOS {
                break;
            }
            position += 2 + len;
        }
        segments
    }

    fn sample_rgb() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(16, 9, |x, y| {
            Rgb([(x * 15) as u8, (y * 28) as u8, 128])
        }))
    }

    fn encode_with_comment(image: &DynamicImage, quality: u8, comment: &str, out: &mut Vec<u8>) {
        let encoded = encode_pixels(image, quality).unwrap();
        splice_comment(&encoded, None, comment, out).unwrap();
    }

    #[test]
    fn should_place_exif_right_after_jfif() {
        let mut out = Vec::new();
        encode_with_comment(&sample_rgb(), 75, "Iteration 3", &mut out);

        let segments = header_segments(&out);
        assert_eq!(segments[0].0, Marker::APP(0), "JFIF header first");
        assert_eq!(segments[1].0, Marker::APP(1), "EXIF second");
        assert_eq!(
            exif::read_user_comment(&segments[1].1).as_deref(),
            Some("Iteration 3")
        );
        assert!(out.ends_with(&[0xFF, Marker::EOI.to_u8()]));
    }

    #[test]
    fn should_stay_decodable_with_same_dimensions() {
        let mut out = Vec::new();
        encode_with_comment(&sample_rgb(), 90, "Iteration 0", &mut out);

        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 9));
    }

    #[test]
    fn should_keep_grayscale_images_grayscale() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([77])));
        let mut out = Vec::new();
        encode_with_comment(&gray, 75, "Iteration 1", &mut out);

        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(decoded.color(), ColorType::L8);
    }

    #[test]
    fn should_insert_after_soi_without_jfif() {
        let bare = [0xFF, 0xD8, 0xFF, 0xD9];
        let mut out = Vec::new();

        insert_segment(&bare, Marker::COM, b"hi", &mut out).unwrap();

        assert_eq!(out, [0xFF, 0xD8, 0xFF, 0xFE, 0x00, 0x04, b'h', b'i', 0xFF, 0xD9]);
    }

    #[test]
    fn should_reject_streams_without_soi() {
        let mut out = Vec::new();
        let result = insert_segment(b"\x89PNG", Marker::APP(1), b"", &mut out);

        assert!(matches!(result, Err(SpoofError::ImageEncodingError(_))));
        assert!(out.is_empty());
    }

    #[test]
    fn should_reject_oversized_payloads() {
        let payload = vec![0u8; MAX_SEGMENT_PAYLOAD + 1];
        let mut out = Vec::new();

        let result = insert_segment(&[0xFF, 0xD8, 0xFF, 0xD9], Marker::APP(1), &payload, &mut out);
        assert!(matches!(result, Err(SpoofError::ImageEncodingError(_))));
    }

    #[test]
    fn should_find_the_exif_payload_of_a_camera_jpeg() {
        let mut plain = Vec::new();
        encode_with_comment(&sample_rgb(), 75, "Iteration 0", &mut plain);
        let camera_exif = exif::camera_block(6);
        let mut camera = Vec::new();
        let encoded = encode_pixels(&sample_rgb(), 75).unwrap();
        insert_segment(&encoded, Marker::APP(1), &camera_exif, &mut camera).unwrap();

        assert_eq!(find_exif(&camera), Some(camera_exif.as_slice()));
        assert_eq!(
            find_exif(&plain).and_then(exif::read_user_comment).as_deref(),
            Some("Iteration 0")
        );
        assert_eq!(find_exif(&encoded), None);
        assert_eq!(find_exif(b"\x89PNG"), None);
    }

    #[test]
    fn should_carry_the_source_exif_into_the_candidate() {
        let encoded = encode_pixels(&sample_rgb(), 75).unwrap();
        let camera_exif = exif::camera_block(6);
        let mut out = Vec::new();

        splice_comment(&encoded, Some(&camera_exif[..]), "Iteration 4", &mut out).unwrap();

        let block = find_exif(&out).unwrap();
        assert_eq!(exif::read_user_comment(block).as_deref(), Some("Iteration 4"));
        assert_eq!(exif::read_ifd0_short(block, 0x0112), Some(6));
    }

    #[test]
    fn should_not_walk_past_a_truncated_segment() {
        let truncated = [0xFF, 0xD8, 0xFF, 0xE1, 0x00, 0x40, b'E', b'x'];

        assert_eq!(find_exif(&truncated), None);
    }
}

//! EXIF blocks carrying the iteration as `UserComment`.
//!
//! Without EXIF in the source a minimal block is written (big endian TIFF):
//!
//! ```text
//! "Exif\0\0"
//! 0  : "MM" 0x002A, offset of IFD0 = 8
//! 8  : IFD0, 1 entry: ExifIFDPointer (0x8769) -> 26
//! 26 : Exif IFD, 1 entry: UserComment (0x9286), UNDEFINED, -> 44
//! 44 : "ASCII\0\0\0" + comment
//! ```
//!
//! An existing block is kept byte for byte. The comment, a copy of the Exif
//! IFD and a copy of IFD0 are appended behind it and the header is pointed at
//! the new IFD0, so every offset into the old data stays valid.

use std::io::Write;

use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};
use log::warn;

pub const EXIF_HEADER: &[u8; 6] = b"Exif\0\0";
pub const TAG_EXIF_IFD_POINTER: u16 = 0x8769;
pub const TAG_USER_COMMENT: u16 = 0x9286;

const TYPE_LONG: u16 = 4;
const TYPE_UNDEFINED: u16 = 7;
const ASCII_CHARSET: &[u8; 8] = b"ASCII\0\0\0";

const TIFF_HEADER_LEN: u32 = 8;
const IFD_ENTRY_LEN: usize = 12;
/// entry count + one 12 byte entry + next IFD offset
const SINGLE_ENTRY_IFD_LEN: u32 = 2 + IFD_ENTRY_LEN as u32 + 4;
const EXIF_IFD_OFFSET: u32 = TIFF_HEADER_LEN + SINGLE_ENTRY_IFD_LEN;
const USER_COMMENT_OFFSET: u32 = EXIF_IFD_OFFSET + SINGLE_ENTRY_IFD_LEN;

/// Builds the payload of an APP1 segment holding `comment` as EXIF `UserComment`.
pub fn user_comment_block(comment: &str) -> std::io::Result<Vec<u8>> {
    let value_len = (ASCII_CHARSET.len() + comment.len()) as u32;
    let mut out =
        Vec::with_capacity(EXIF_HEADER.len() + USER_COMMENT_OFFSET as usize + value_len as usize);
    out.write_all(EXIF_HEADER)?;

    out.write_all(b"MM")?;
    out.write_u16::<BigEndian>(42)?;
    out.write_u32::<BigEndian>(TIFF_HEADER_LEN)?;

    // IFD0
    out.write_u16::<BigEndian>(1)?;
    write_entry::<BigEndian, _>(&mut out, TAG_EXIF_IFD_POINTER, TYPE_LONG, 1, EXIF_IFD_OFFSET)?;
    out.write_u32::<BigEndian>(0)?;

    // Exif IFD
    out.write_u16::<BigEndian>(1)?;
    write_entry::<BigEndian, _>(
        &mut out,
        TAG_USER_COMMENT,
        TYPE_UNDEFINED,
        value_len,
        USER_COMMENT_OFFSET,
    )?;
    out.write_u32::<BigEndian>(0)?;

    out.write_all(ASCII_CHARSET)?;
    out.write_all(comment.as_bytes())?;

    Ok(out)
}

/// Sets `UserComment` inside `existing`, an APP1 payload starting with [`EXIF_HEADER`].
///
/// All other tags survive. Falls back to [`user_comment_block`] if there is
/// nothing to keep or the block cannot be parsed.
pub fn with_user_comment(existing: Option<&[u8]>, comment: &str) -> std::io::Result<Vec<u8>> {
    let Some(tiff) = existing.and_then(|block| block.strip_prefix(&EXIF_HEADER[..])) else {
        return user_comment_block(comment);
    };

    let rewritten = match tiff.get(..2) {
        Some(b"MM") => rewrite::<BigEndian>(tiff, comment)?,
        Some(b"II") => rewrite::<LittleEndian>(tiff, comment)?,
        _ => None,
    };
    match rewritten {
        Some(rewritten) => {
            let mut out = Vec::with_capacity(EXIF_HEADER.len() + rewritten.len());
            out.extend_from_slice(EXIF_HEADER);
            out.extend_from_slice(&rewritten);
            Ok(out)
        }
        None => {
            warn!("Existing EXIF data is malformed, replacing it");
            user_comment_block(comment)
        }
    }
}

/// raw 12 byte entries of one IFD plus the offset of the next IFD
struct Ifd {
    entries: Vec<[u8; IFD_ENTRY_LEN]>,
    next: u32,
}

fn tag_of<B: ByteOrder>(entry: &[u8; IFD_ENTRY_LEN]) -> u16 {
    B::read_u16(&entry[..2])
}

fn read_ifd<B: ByteOrder>(tiff: &[u8], offset: u32) -> Option<Ifd> {
    let offset = offset as usize;
    let count = B::read_u16(tiff.get(offset..offset + 2)?) as usize;
    let mut entries = Vec::with_capacity(count);
    for i in 0..count {
        let at = offset + 2 + i * IFD_ENTRY_LEN;
        entries.push(tiff.get(at..at + IFD_ENTRY_LEN)?.try_into().ok()?);
    }
    let at = offset + 2 + count * IFD_ENTRY_LEN;
    let next = B::read_u32(tiff.get(at..at + 4)?);
    Some(Ifd { entries, next })
}

/// `Ok(None)` if `tiff` is not a readable TIFF structure
fn rewrite<B: ByteOrder>(tiff: &[u8], comment: &str) -> std::io::Result<Option<Vec<u8>>> {
    let Some(ifd0_offset) = tiff.get(4..8).map(B::read_u32) else {
        return Ok(None);
    };
    let Some(mut ifd0) = read_ifd::<B>(tiff, ifd0_offset) else {
        return Ok(None);
    };

    let mut exif_entries = Vec::new();
    if let Some(pointer) = ifd0
        .entries
        .iter()
        .find(|e| tag_of::<B>(e) == TAG_EXIF_IFD_POINTER)
    {
        let Some(exif_ifd) = read_ifd::<B>(tiff, B::read_u32(&pointer[8..])) else {
            return Ok(None);
        };
        exif_entries = exif_ifd.entries;
    }
    exif_entries.retain(|e| tag_of::<B>(e) != TAG_USER_COMMENT);
    ifd0.entries.retain(|e| tag_of::<B>(e) != TAG_EXIF_IFD_POINTER);

    let mut out = tiff.to_vec();
    pad_to_word(&mut out);

    let comment_offset = out.len() as u32;
    let comment_len = (ASCII_CHARSET.len() + comment.len()) as u32;
    out.write_all(ASCII_CHARSET)?;
    out.write_all(comment.as_bytes())?;
    pad_to_word(&mut out);

    let exif_offset = out.len() as u32;
    exif_entries.push(entry::<B>(
        TAG_USER_COMMENT,
        TYPE_UNDEFINED,
        comment_len,
        comment_offset,
    )?);
    write_ifd::<B>(&mut out, exif_entries, 0)?;

    let new_ifd0_offset = out.len() as u32;
    ifd0.entries
        .push(entry::<B>(TAG_EXIF_IFD_POINTER, TYPE_LONG, 1, exif_offset)?);
    write_ifd::<B>(&mut out, ifd0.entries, ifd0.next)?;

    B::write_u32(&mut out[4..8], new_ifd0_offset);
    Ok(Some(out))
}

/// TIFF offsets have to be even
fn pad_to_word(out: &mut Vec<u8>) {
    if out.len() % 2 == 1 {
        out.push(0);
    }
}

fn entry<B: ByteOrder>(
    tag: u16,
    kind: u16,
    count: u32,
    value: u32,
) -> std::io::Result<[u8; IFD_ENTRY_LEN]> {
    let mut raw = [0u8; IFD_ENTRY_LEN];
    write_entry::<B, _>(&mut &mut raw[..], tag, kind, count, value)?;
    Ok(raw)
}

/// entries are written sorted by tag, as TIFF requires
fn write_ifd<B: ByteOrder>(
    out: &mut Vec<u8>,
    mut entries: Vec<[u8; IFD_ENTRY_LEN]>,
    next: u32,
) -> std::io::Result<()> {
    entries.sort_by_key(|e| tag_of::<B>(e));
    out.write_u16::<B>(entries.len() as u16)?;
    for e in &entries {
        out.write_all(e)?;
    }
    out.write_u32::<B>(next)
}

fn write_entry<B: ByteOrder, W: Write>(
    w: &mut W,
    tag: u16,
    kind: u16,
    count: u32,
    value: u32,
) -> std::io::Result<()> {
    w.write_u16::<B>(tag)?;
    w.write_u16::<B>(kind)?;
    w.write_u32::<B>(count)?;
    w.write_u32::<B>(value)
}

/// raw entry of `tag` in the IFD at `ifd_offset`
#[cfg(test)]
fn find_entry<B: ByteOrder>(tiff: &[u8], ifd_offset: u32, tag: u16) -> Option<[u8; 12]> {
    read_ifd::<B>(tiff, ifd_offset)?
        .entries
        .into_iter()
        .find(|e| tag_of::<B>(e) == tag)
}

#[cfg(test)]
fn read_user_comment_with<B: ByteOrder>(tiff: &[u8]) -> Option<String> {
    let ifd0 = B::read_u32(tiff.get(4..8)?);
    let pointer = find_entry::<B>(tiff, ifd0, TAG_EXIF_IFD_POINTER)?;
    let comment = find_entry::<B>(tiff, B::read_u32(&pointer[8..]), TAG_USER_COMMENT)?;

    let count = B::read_u32(&comment[4..8]) as usize;
    let offset = B::read_u32(&comment[8..]) as usize;
    let value = tiff.get(offset..offset + count)?;
    let text = value.strip_prefix(&ASCII_CHARSET[..])?;
    String::from_utf8(text.to_vec()).ok()
}

/// Reads the `UserComment` back out of an EXIF block
#[cfg(test)]
pub(crate) fn read_user_comment(block: &[u8]) -> Option<String> {
    let tiff = block.strip_prefix(&EXIF_HEADER[..])?;
    match tiff.get(..2)? {
        b"MM" => read_user_comment_with::<BigEndian>(tiff),
        b"II" => read_user_comment_with::<LittleEndian>(tiff),
        _ => None,
    }
}

/// Reads a SHORT value stored inline in IFD0, e.g. the orientation
#[cfg(test)]
pub(crate) fn read_ifd0_short(block: &[u8], tag: u16) -> Option<u16> {
    fn read<B: ByteOrder>(tiff: &[u8], tag: u16) -> Option<u16> {
        let entry = find_entry::<B>(tiff, B::read_u32(tiff.get(4..8)?), tag)?;
        Some(B::read_u16(&entry[8..10]))
    }

    let tiff = block.strip_prefix(&EXIF_HEADER[..])?;
    match tiff.get(..2)? {
        b"MM" => read::<BigEndian>(tiff, tag),
        b"II" => read::<LittleEndian>(tiff, tag),
        _ => None,
    }
}

/// Little endian EXIF block as a camera writes it: IFD0 with Make, Orientation
/// and an Exif IFD holding an old UserComment and ExposureTime.
#[cfg(test)]
pub(crate) fn camera_block(orientation: u16) -> Vec<u8> {
    type L = LittleEndian;
    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"II");
    tiff.write_u16::<L>(42).unwrap();
    tiff.write_u32::<L>(8).unwrap();

    // IFD0 at 8: 3 entries -> 8 + 2 + 36 + 4 = 50
    tiff.write_u16::<L>(3).unwrap();
    write_entry::<L, _>(&mut tiff, 0x010F, 2, 6, 86).unwrap(); // Make -> 86
    tiff.write_u16::<L>(0x0112).unwrap(); // Orientation, SHORT, inline
    tiff.write_u16::<L>(3).unwrap();
    tiff.write_u32::<L>(1).unwrap();
    tiff.write_u16::<L>(orientation).unwrap();
    tiff.write_u16::<L>(0).unwrap();
    write_entry::<L, _>(&mut tiff, TAG_EXIF_IFD_POINTER, TYPE_LONG, 1, 50).unwrap();
    tiff.write_u32::<L>(0).unwrap();

    // Exif IFD at 50: 2 entries -> 50 + 2 + 24 + 4 = 80
    tiff.write_u16::<L>(2).unwrap();
    write_entry::<L, _>(&mut tiff, 0x829A, 5, 1, 92).unwrap(); // ExposureTime -> 92
    write_entry::<L, _>(&mut tiff, TAG_USER_COMMENT, TYPE_UNDEFINED, 14, 100).unwrap();
    tiff.write_u32::<L>(0).unwrap();

    tiff.extend_from_slice(&[0; 6]); // 80..86
    tiff.extend_from_slice(b"Canon\0"); // 86..92
    tiff.write_u32::<L>(1).unwrap(); // 92..100, 1/250
    tiff.write_u32::<L>(250).unwrap();
    tiff.extend_from_slice(b"ASCII\0\0\0camera"); // 100..114

    let mut block = EXIF_HEADER.to_vec();
    block.extend_from_slice(&tiff);
    block
}

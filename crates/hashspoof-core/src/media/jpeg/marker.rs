//! The JPEG markers needed to walk the header of an encoded stream.

/// JPEG marker types (ITU T.81 Table B.1), reduced to what header splicing needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
pub enum Marker {
    /// Start of Image.
    SOI,
    /// End of Image.
    EOI,
    /// Start of Scan.
    SOS,
    /// Application segment (0-15).
    APP(u8),
    /// Comment.
    COM,
    /// Any other marker, raw byte kept.
    Other(u8),
}

impl Marker {
    /// Returns true if this marker has a length field following it.
    pub fn has_length(self) -> bool {
        match self {
            Marker::SOI | Marker::EOI => false,
            // RSTn and TEM stand alone as well
            Marker::Other(n) => !matches!(n, 0x01 | 0xD0..=0xD7),
            _ => true,
        }
    }

    /// Convert a byte to a Marker.
    ///
    /// Returns None for 0x00 (stuffed byte) and 0xFF (fill byte).
    pub fn from_u8(n: u8) -> Option<Marker> {
        match n {
            0x00 | 0xFF => None,
            0xD8 => Some(Marker::SOI),
            0xD9 => Some(Marker::EOI),
            0xDA => Some(Marker::SOS),
            0xE0..=0xEF => Some(Marker::APP(n - 0xE0)),
            0xFE => Some(Marker::COM),
            n => Some(Marker::Other(n)),
        }
    }

    /// Convert a Marker to its byte value.
    pub fn to_u8(self) -> u8 {
        match self {
            Marker::SOI => 0xD8,
            Marker::EOI => 0xD9,
            Marker::SOS => 0xDA,
            Marker::APP(n) => 0xE0 + n,
            Marker::COM => 0xFE,
            Marker::Other(n) => n,
        }
    }
}

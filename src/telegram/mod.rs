//! # Telegram Parsing
//!
//! This module parses wM-Bus telegrams as they look after link-layer
//! processing: CRCs removed and, for encrypted meters, the payload already
//! deciphered. Transport and decryption are outside this crate; a telegram
//! enters as one clean byte buffer.
//!
//! ## Frame layout
//!
//! ```text
//! L | C | M (2, LE) | A (4, LE) | version | type | CI | ...
//! ```
//!
//! The CI byte selects what follows: an optional extended link layer
//! (CI `0x8C`), then a transport layer header (short `0x7A`, long `0x72`,
//! or none `0x78`), then the data records. The record walker in
//! [`records`] locates the manufacturer-specific block that meter drivers
//! decode.

pub mod records;

use log::debug;
use nom::number::complete::{be_u8, le_u16, le_u32};
use nom::sequence::tuple;
use nom::IResult;

use crate::analysis::{Annotation, AnnotationKind, AnnotationSink, Confidence};
use crate::constants::{
    CI_ELL_SHORT, CI_TPL_LONG, CI_TPL_NONE, CI_TPL_SHORT, DLL_HEADER_AFTER_L, MIN_FRAME_LENGTH,
};
use crate::error::MetersError;
use crate::manufacturer::{id_to_manufacturer, is_soft_address};
use crate::util::hex::{encode_hex, parse_hex_lenient};

/// Transport layer header fields, when the CI carries one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TplHeader {
    pub access_number: u8,
    pub status: u8,
    pub configuration: u16,
}

/// One parsed telegram
#[derive(Debug, Clone)]
pub struct Telegram {
    /// The complete frame, starting at the L-field
    pub frame: Vec<u8>,
    /// L-field: number of bytes after the L-field itself
    pub length: u8,
    pub control: u8,
    /// Raw manufacturer field (may carry the soft-address MSB)
    pub manufacturer_id: u16,
    /// Device address as a little-endian 32-bit value
    pub device_address: u32,
    pub version: u8,
    pub device_type: u8,
    /// Final CI, after any extended link layer
    pub ci: u8,
    /// Extended link layer bytes (CC, ACC) when CI 0x8C was present
    pub ell: Option<(u8, u8)>,
    pub tpl: Option<TplHeader>,
    ci_offset: usize,
    header_size: usize,
    manufacturer_index: Option<usize>,
}

fn dll_header(input: &[u8]) -> IResult<&[u8], (u8, u16, u32, u8, u8)> {
    tuple((be_u8, le_u16, le_u32, be_u8, be_u8))(input)
}

fn truncated(what: &str) -> MetersError {
    MetersError::FrameParseError(format!("{what} truncated"))
}

impl Telegram {
    /// Parse a frame captured after link-layer processing
    pub fn parse(frame: &[u8]) -> Result<Telegram, MetersError> {
        if frame.len() < MIN_FRAME_LENGTH {
            return Err(MetersError::FrameParseError(format!(
                "frame too short: {} bytes",
                frame.len()
            )));
        }

        let length = frame[0];
        if length as usize != frame.len() - 1 {
            return Err(MetersError::FrameParseError(format!(
                "L-field says {} bytes, frame carries {}",
                length,
                frame.len() - 1
            )));
        }

        let (_, (control, manufacturer_id, device_address, version, device_type)) =
            dll_header(&frame[1..]).map_err(|_| truncated("data link layer header"))?;

        let mut pos = 1 + DLL_HEADER_AFTER_L;
        let mut ci = frame[pos];
        pos += 1;

        let mut ell = None;
        if ci == CI_ELL_SHORT {
            let bytes = frame
                .get(pos..pos + 2)
                .ok_or_else(|| truncated("extended link layer"))?;
            ell = Some((bytes[0], bytes[1]));
            pos += 2;
            ci = *frame
                .get(pos)
                .ok_or_else(|| truncated("control information"))?;
            pos += 1;
        }
        let ci_offset = pos - 1;

        let tpl = match ci {
            CI_TPL_SHORT => {
                let bytes = frame
                    .get(pos..pos + 4)
                    .ok_or_else(|| truncated("transport layer header"))?;
                pos += 4;
                Some(TplHeader {
                    access_number: bytes[0],
                    status: bytes[1],
                    configuration: u16::from_le_bytes([bytes[2], bytes[3]]),
                })
            }
            CI_TPL_LONG => {
                let bytes = frame
                    .get(pos..pos + 12)
                    .ok_or_else(|| truncated("transport layer header"))?;
                pos += 12;
                Some(TplHeader {
                    access_number: bytes[8],
                    status: bytes[9],
                    configuration: u16::from_le_bytes([bytes[10], bytes[11]]),
                })
            }
            CI_TPL_NONE => None,
            other => {
                debug!("unhandled CI 0x{other:02X}, assuming records follow directly");
                None
            }
        };

        let header_size = pos;
        let manufacturer_index =
            records::find_manufacturer_data(&frame[header_size..]).map(|i| header_size + i);

        Ok(Telegram {
            frame: frame.to_vec(),
            length,
            control,
            manufacturer_id,
            device_address,
            version,
            device_type,
            ci,
            ell,
            tpl,
            ci_offset,
            header_size,
            manufacturer_index,
        })
    }

    /// Parse a telegram given as a hex dump (separators tolerated)
    pub fn from_hex(hex: &str) -> Result<Telegram, MetersError> {
        let frame = parse_hex_lenient(hex)?;
        Telegram::parse(&frame)
    }

    /// Device id as printed on the meter: 8 hex digits
    pub fn id_string(&self) -> String {
        format!("{:08X}", self.device_address)
    }

    /// 3-letter manufacturer code decoded from the manufacturer field
    pub fn manufacturer_code(&self) -> String {
        id_to_manufacturer(self.manufacturer_id)
    }

    /// Human readable medium of the device-type byte
    pub fn media_name(&self) -> &'static str {
        media_name(self.device_type)
    }

    /// Offset where the data records begin
    pub fn header_size(&self) -> usize {
        self.header_size
    }

    /// The application payload: all data records after the header
    pub fn records(&self) -> &[u8] {
        &self.frame[self.header_size..]
    }

    /// Manufacturer-specific data and its absolute frame offset
    ///
    /// `None` when the telegram carries no manufacturer-specific block;
    /// drivers must then leave their sinks untouched.
    pub fn manufacturer_data(&self) -> Option<(&[u8], usize)> {
        self.manufacturer_index
            .map(|index| (&self.frame[index..], index))
    }

    /// Annotate the fixed header fields for the analyze view
    pub fn explain_header(&self, analysis: &mut dyn AnnotationSink) {
        let mut note = |offset: usize, length: usize, message: String| {
            analysis.annotate(Annotation::new(
                offset,
                length,
                AnnotationKind::Protocol,
                Confidence::Full,
                message,
            ));
        };

        note(0, 1, format!("{:02x} length ({} bytes)", self.length, self.length));
        note(
            1,
            1,
            format!("{:02x} dll-c ({})", self.control, control_name(self.control)),
        );

        let soft = if is_soft_address(self.manufacturer_id) {
            ", soft address"
        } else {
            ""
        };
        note(
            2,
            2,
            format!(
                "{} dll-mfct ({}{})",
                encode_hex(&self.frame[2..4]),
                self.manufacturer_code(),
                soft
            ),
        );
        note(
            4,
            4,
            format!("{} dll-id ({})", encode_hex(&self.frame[4..8]), self.id_string()),
        );
        note(8, 1, format!("{:02x} dll-version", self.version));
        note(
            9,
            1,
            format!("{:02x} dll-type ({})", self.device_type, self.media_name()),
        );

        if let Some((cc, acc)) = self.ell {
            note(10, 1, format!("{CI_ELL_SHORT:02x} ell-ci (extended link layer)"));
            note(11, 1, format!("{cc:02x} ell-cc"));
            note(12, 1, format!("{acc:02x} ell-acc"));
        }

        note(
            self.ci_offset,
            1,
            format!("{:02x} tpl-ci ({})", self.ci, ci_name(self.ci)),
        );

        if let Some(tpl) = self.tpl {
            let base = match self.ci {
                CI_TPL_LONG => {
                    note(
                        self.ci_offset + 1,
                        8,
                        format!(
                            "{} tpl-secondary-address",
                            encode_hex(&self.frame[self.ci_offset + 1..self.ci_offset + 9])
                        ),
                    );
                    self.ci_offset + 9
                }
                _ => self.ci_offset + 1,
            };
            note(base, 1, format!("{:02x} tpl-acc", tpl.access_number));
            note(base + 1, 1, format!("{:02x} tpl-status", tpl.status));
            note(
                base + 2,
                2,
                format!("{:04x} tpl-config", tpl.configuration),
            );
        }
    }
}

/// Name of the C-field, for frames sent by meters
pub fn control_name(control: u8) -> &'static str {
    match control {
        0x44 => "SND_NR",
        0x46 => "SND_IR",
        0x48 => "RSP_UD",
        _ => "unknown",
    }
}

/// Name of a CI value as far as this crate understands it
pub fn ci_name(ci: u8) -> &'static str {
    match ci {
        CI_ELL_SHORT => "extended link layer",
        CI_TPL_NONE => "no header",
        CI_TPL_SHORT => "short header",
        CI_TPL_LONG => "long header",
        _ => "unknown",
    }
}

/// Human readable medium for a device-type byte, per EN 13757-3
pub fn media_name(device_type: u8) -> &'static str {
    match device_type {
        0x00 => "other",
        0x01 => "oil",
        0x02 => "electricity",
        0x03 => "gas",
        0x04 => "heat",
        0x05 => "steam",
        0x06 => "warm water",
        0x07 => "water",
        0x08 => "heat cost allocator",
        0x09 => "compressed air",
        0x0A | 0x0B => "cooling load",
        0x0C => "heat (inlet)",
        0x0D => "heat/cooling load",
        0x0E => "bus/system component",
        0x15 => "hot water",
        0x16 => "cold water",
        0x17 => "dual water",
        0x18 => "pressure",
        0x1A => "smoke detector",
        0x1B => "room sensor",
        0x1C => "gas detector",
        0x21 => "valve",
        0x25 => "customer unit",
        0x28 => "waste water",
        _ => "unknown",
    }
}

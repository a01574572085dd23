//! # Data-Record Walking
//!
//! The application payload of a telegram is a sequence of data records, each
//! a DIF/DIFE chain, a VIF/VIFE chain and the data bytes. This walker does
//! not interpret record values; its job is to step over standard records and
//! find the DIF `0x0F`/`0x1F` marker, after which every remaining byte of the
//! frame belongs to the manufacturer.

use log::{debug, trace};

use crate::constants::{
    DIF_EXTENSION_BIT, DIF_IDLE_FILLER, DIF_MANUFACTURER_SPECIFIC, DIF_MASK_DATA,
    DIF_MORE_RECORDS_FOLLOW, VIF_EXTENSION_BIT, VIF_PLAIN_TEXT,
};

/// Number of data bytes implied by the DIF data-field nibble
pub fn dif_data_length(dif: u8) -> usize {
    match dif & DIF_MASK_DATA {
        0x0 => 0,
        0x1 => 1,
        0x2 => 2,
        0x3 => 3,
        0x4 => 4,
        0x5 => 4, // 32-bit real
        0x6 => 6,
        0x7 => 8,
        0x8 => 0, // selection for readout
        0x9 => 1,
        0xA => 2,
        0xB => 3,
        0xC => 4,
        0xD => 0, // variable length, LVAR byte precedes the data
        0xE => 6,
        _ => 0, // 0xF is handled as manufacturer specific before lookup
    }
}

/// Data length of a variable-length record given its LVAR byte
///
/// Reserved LVAR ranges yield `None`; the walker then gives up on the
/// payload rather than guessing.
fn variable_data_length(lvar: u8) -> Option<usize> {
    match lvar {
        0x00..=0xBF => Some(lvar as usize),
        // BCD number, two digits per byte
        0xC0..=0xCF | 0xD0..=0xDF => Some((lvar & 0x0F) as usize),
        // Binary number
        0xE0..=0xEF => Some((lvar & 0x0F) as usize),
        _ => None,
    }
}

/// Locate manufacturer-specific data among the records
///
/// Returns the index of the first byte after the `0x0F`/`0x1F` DIF, relative
/// to `records`. `None` when the records end, or become unparseable, without
/// a manufacturer-specific block.
pub fn find_manufacturer_data(records: &[u8]) -> Option<usize> {
    let mut pos = 0;

    while pos < records.len() {
        let dif = records[pos];

        if dif == DIF_IDLE_FILLER {
            pos += 1;
            continue;
        }

        if dif == DIF_MANUFACTURER_SPECIFIC || dif == DIF_MORE_RECORDS_FOLLOW {
            trace!("manufacturer data marker 0x{dif:02X} at record offset {pos}");
            return Some(pos + 1);
        }

        pos = skip_record(records, pos)?;
    }

    None
}

/// Step over one standard record starting at `pos`
///
/// Returns the offset just past the record, or `None` when the record runs
/// off the end of the payload.
fn skip_record(records: &[u8], pos: usize) -> Option<usize> {
    let dif = records[pos];
    let mut p = pos + 1;

    // DIFE chain, each extension bit announces another byte
    let mut ext = dif & DIF_EXTENSION_BIT != 0;
    while ext {
        let dife = *records.get(p)?;
        ext = dife & DIF_EXTENSION_BIT != 0;
        p += 1;
    }

    let vif = *records.get(p)?;
    p += 1;

    // Plain-text VIF carries its unit as a length-prefixed string
    if vif & !VIF_EXTENSION_BIT == VIF_PLAIN_TEXT {
        let len = *records.get(p)? as usize;
        p += 1 + len;
    }

    let mut ext = vif & VIF_EXTENSION_BIT != 0;
    while ext {
        let vife = *records.get(p)?;
        ext = vife & VIF_EXTENSION_BIT != 0;
        p += 1;
    }

    let data_len = if dif & DIF_MASK_DATA == 0x0D {
        let lvar = *records.get(p)?;
        p += 1;
        variable_data_length(lvar)?
    } else {
        dif_data_length(dif)
    };

    p += data_len;
    if p > records.len() {
        debug!("record at offset {pos} runs past the end of the payload");
        return None;
    }
    Some(p)
}

//! # Hydrodigit Water Meter Driver (B METERS)
//!
//! Hydrodigit meters transmit their interesting readings in the
//! manufacturer-specific block rather than as standard data records. The
//! block layout is self-describing: a leading identifier byte announces,
//! bit by bit, which optional sections follow, and the sections are simply
//! concatenated with no per-section length fields.
//!
//! ## Block layout
//!
//! ```text
//! identifier | [voltage 1] [fraud date 3] [leak date 3] [backflow 4] [monthly 36] | [unknown 1]
//! ```
//!
//! Sections appear in the fixed order above, which is not the numeric order
//! of their identifier bits (leak date sits on bit 7 but decodes third).
//! The format is still being mapped out from live meters; the decoder is
//! deliberately permissive: a block that ends early simply stops the decode
//! and keeps the fields read so far, and identifier bits this driver does
//! not recognize are ignored.

use bitflags::bitflags;
use log::debug;

use crate::analysis::{Annotation, AnnotationKind, AnnotationSink, Confidence};
use crate::drivers::{
    DriverDetect, DriverInfo, LinkMode, MeterDriver, MeterType, PayloadCursor,
};
use crate::fields::{FieldSink, Unit};
use crate::manufacturer::MANUFACTURER_BMT;
use crate::util::hex::format_hex_compact;

bitflags! {
    /// Identifier bits announcing which sections the block carries
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FrameContent: u8 {
        const BATTERY_VOLTAGE = 1 << 0;
        const FRAUD_DATE = 1 << 1;
        const BACKFLOW = 1 << 2;
        const MONTHLY_DATA = 1 << 4;
        const LEAK_DATE = 1 << 7;
    }
}

bitflags! {
    /// Flag bits overlaid on the high bits of the fraud month byte
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FraudFlags: u8 {
        const MAGNETIC = 0x80;
        const SENSOR = 0x40;
        const MODULE_REMOVED = 0x20;
    }
}

/// One optional section of the block
struct Section {
    flag: FrameContent,
    label: &'static str,
    decode: fn(&mut PayloadCursor, &mut dyn FieldSink, &mut dyn AnnotationSink) -> bool,
}

/// Sections in decode order; insertion order here is the wire order
const SECTIONS: [Section; 5] = [
    Section {
        flag: FrameContent::BATTERY_VOLTAGE,
        label: "BATTERY_VOLTAGE",
        decode: decode_battery_voltage,
    },
    Section {
        flag: FrameContent::FRAUD_DATE,
        label: "FRAUD_DATE",
        decode: decode_fraud_date,
    },
    Section {
        flag: FrameContent::LEAK_DATE,
        label: "LEAK_DATE",
        decode: decode_leak_date,
    },
    Section {
        flag: FrameContent::BACKFLOW,
        label: "BACKFLOW",
        decode: decode_backflow,
    },
    Section {
        flag: FrameContent::MONTHLY_DATA,
        label: "MONTHLY_DATA",
        decode: decode_monthly_history,
    },
];

/// Detection triples observed on live Hydrodigit meters
const DETECTS: [DriverDetect; 5] = [
    DriverDetect::new(MANUFACTURER_BMT, 0x06, 0x13),
    DriverDetect::new(MANUFACTURER_BMT, 0x06, 0x17),
    DriverDetect::new(MANUFACTURER_BMT, 0x07, 0x13),
    DriverDetect::new(MANUFACTURER_BMT, 0x07, 0x15),
    DriverDetect::new(MANUFACTURER_BMT, 0x07, 0x17),
];

pub struct HydrodigitDriver {
    info: DriverInfo,
}

impl HydrodigitDriver {
    pub fn new() -> Self {
        Self {
            info: DriverInfo {
                name: "hydrodigit",
                meter_type: MeterType::WaterMeter,
                link_modes: &[LinkMode::T1],
                default_fields: "name,id,total_m3,meter_datetime,timestamp",
                detects: &DETECTS,
            },
        }
    }
}

impl Default for HydrodigitDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MeterDriver for HydrodigitDriver {
    fn info(&self) -> &DriverInfo {
        &self.info
    }

    fn decode_manufacturer_data(
        &self,
        payload: &[u8],
        base_offset: usize,
        fields: &mut dyn FieldSink,
        analysis: &mut dyn AnnotationSink,
    ) {
        decode_payload(payload, base_offset, fields, analysis);
    }
}

fn decode_payload(
    payload: &[u8],
    base_offset: usize,
    fields: &mut dyn FieldSink,
    analysis: &mut dyn AnnotationSink,
) {
    let mut cursor = PayloadCursor::new(payload, base_offset);

    debug!("(hydrodigit mfct) {}", format_hex_compact(payload));

    let identifier = match cursor.peek() {
        Some(byte) => byte,
        None => return,
    };

    analysis.annotate(Annotation::new(
        cursor.offset(),
        1,
        AnnotationKind::Protocol,
        Confidence::Full,
        format!("{identifier:02X} frame content"),
    ));

    // 0x00 marks a deliberately empty block
    if identifier == 0x00 {
        fields.set_string_value("contents", "");
        return;
    }

    cursor.skip(1);
    if cursor.is_empty() {
        return;
    }

    let content = FrameContent::from_bits_truncate(identifier);
    let mut executed: Vec<&'static str> = Vec::new();

    for section in &SECTIONS {
        if !content.contains(section.flag) {
            continue;
        }
        executed.push(section.label);
        if !(section.decode)(&mut cursor, fields, analysis) {
            // The block ended inside this section. Fields decoded so far
            // stay valid; nothing after this point is attempted.
            return;
        }
    }

    if !executed.is_empty() {
        let contents = executed.join(" ");
        analysis.annotate(Annotation::new(
            cursor.offset(),
            1,
            AnnotationKind::Protocol,
            Confidence::Full,
            format!("frame content: {contents}"),
        ));
        fields.set_string_value("contents", &contents);
    }

    if let Some(unknown) = cursor.peek() {
        // Always 00 on the meters seen so far; flipping it changes nothing
        analysis.annotate(Annotation::new(
            cursor.offset(),
            1,
            AnnotationKind::Content,
            Confidence::None,
            format!("{unknown:02X} unknown data"),
        ));
        cursor.skip(1);
    }
}

fn decode_battery_voltage(
    cursor: &mut PayloadCursor,
    fields: &mut dyn FieldSink,
    analysis: &mut dyn AnnotationSink,
) -> bool {
    let offset = cursor.offset();
    let bytes = match cursor.take(1) {
        Some(bytes) => bytes,
        None => return false,
    };
    let raw = bytes[0];

    let voltage = battery_voltage(raw);
    analysis.annotate(Annotation::new(
        offset,
        1,
        AnnotationKind::Content,
        Confidence::Full,
        format!("{raw:02X} voltage of battery {voltage:.2} V"),
    ));
    fields.set_numeric_value("voltage", Unit::Volt, voltage);
    true
}

fn decode_fraud_date(
    cursor: &mut PayloadCursor,
    fields: &mut dyn FieldSink,
    analysis: &mut dyn AnnotationSink,
) -> bool {
    let offset = cursor.offset();
    let bytes = match cursor.take(3) {
        Some(bytes) => bytes,
        None => return false,
    };
    let (year, raw_month, day) = (bytes[0], bytes[1], bytes[2]);

    let month = raw_month & 0x0F;
    let fraud_type = fraud_type_string(FraudFlags::from_bits_truncate(raw_month));

    analysis.annotate(Annotation::new(
        offset,
        3,
        AnnotationKind::Content,
        Confidence::Full,
        format!(
            "{year:02X}{raw_month:02X}{day:02X} fraud date: {day:02X}.{month:02X}.20{year:02X} [{fraud_type}]"
        ),
    ));
    fields.set_string_value("fraud_date", &bcd_date_string(year, month, day));
    fields.set_string_value("fraud_type", &fraud_type);
    true
}

fn decode_leak_date(
    cursor: &mut PayloadCursor,
    fields: &mut dyn FieldSink,
    analysis: &mut dyn AnnotationSink,
) -> bool {
    let offset = cursor.offset();
    let bytes = match cursor.take(3) {
        Some(bytes) => bytes,
        None => return false,
    };
    let (year, month, day) = (bytes[0], bytes[1], bytes[2]);

    analysis.annotate(Annotation::new(
        offset,
        3,
        AnnotationKind::Content,
        Confidence::Full,
        format!("{year:02X}{month:02X}{day:02X} date of leakage: {day:02X}.{month:02X}.20{year:02X}"),
    ));
    fields.set_string_value("leak_date", &bcd_date_string(year, month, day));
    true
}

fn decode_backflow(
    cursor: &mut PayloadCursor,
    fields: &mut dyn FieldSink,
    analysis: &mut dyn AnnotationSink,
) -> bool {
    let offset = cursor.offset();
    let bytes = match cursor.take(4) {
        Some(bytes) => bytes,
        None => return false,
    };

    // Higher precision than the standard volume records
    let backflow = backflow_m3([bytes[0], bytes[1], bytes[2], bytes[3]]);
    analysis.annotate(Annotation::new(
        offset,
        4,
        AnnotationKind::Content,
        Confidence::Full,
        format!(
            "{:02X}{:02X}{:02X}{:02X} backflow: {backflow:.3} m3",
            bytes[0], bytes[1], bytes[2], bytes[3]
        ),
    ));
    fields.set_numeric_value("backflow", Unit::M3, backflow);
    true
}

fn decode_monthly_history(
    cursor: &mut PayloadCursor,
    fields: &mut dyn FieldSink,
    analysis: &mut dyn AnnotationSink,
) -> bool {
    for month in 1..=12u32 {
        let offset = cursor.offset();
        let bytes = match cursor.take(3) {
            Some(bytes) => bytes,
            None => return false,
        };

        let name = month_name(month);
        let total = monthly_total_m3([bytes[0], bytes[1], bytes[2]]);
        analysis.annotate(Annotation::new(
            offset,
            3,
            AnnotationKind::Content,
            Confidence::Full,
            format!(
                "{:02X}{:02X}{:02X} total consumption at the end of {name}: {total:.2} m3",
                bytes[0], bytes[1], bytes[2]
            ),
        ));
        fields.set_numeric_value(&format!("{name}_total"), Unit::M3, total);
    }
    true
}

/// Battery voltage from the status byte
///
/// Only the low nibble selects the voltage; the high nibble varies between
/// meters without changing the reading, so it is ignored here.
pub fn battery_voltage(byte: u8) -> f64 {
    match byte & 0x0F {
        0x01 => 1.9,
        0x02 => 2.1,
        0x03 => 2.2,
        0x04 => 2.3,
        0x05 => 2.4,
        0x06 => 2.5,
        0x07 => 2.65,
        0x08 => 2.8,
        0x09 => 2.9,
        0x0A => 3.05,
        0x0B => 3.2,
        0x0C => 3.35,
        0x0D => 3.5,
        _ => 3.7, // 0x0, 0xE and 0xF
    }
}

/// Date string from raw BCD bytes, hex digits printed as they are
///
/// Nothing validates the nibbles: an uninitialized date renders as
/// "2000-00-00", which is exactly what the meter means by it.
pub fn bcd_date_string(year: u8, month: u8, day: u8) -> String {
    format!("20{year:02X}-{month:02X}-{day:02X}")
}

/// Fraud flag labels joined in fixed bit order
pub fn fraud_type_string(flags: FraudFlags) -> String {
    let mut parts = Vec::new();
    if flags.contains(FraudFlags::MAGNETIC) {
        parts.push("Magnetic fraud attempt");
    }
    if flags.contains(FraudFlags::SENSOR) {
        parts.push("Sensor fraud attempt");
    }
    if flags.contains(FraudFlags::MODULE_REMOVED) {
        parts.push("Module removed");
    }

    if parts.is_empty() {
        "no type info".to_string()
    } else {
        parts.join(", ")
    }
}

/// Backflow volume from 4 little-endian bytes, in thousandths of a m3
pub fn backflow_m3(bytes: [u8; 4]) -> f64 {
    u32::from_le_bytes(bytes) as f64 / 1000.0
}

/// Monthly total from 3 little-endian bytes, in hundredths of a m3
///
/// The register caps at 99999.99, so any larger value cannot be a reading.
/// 0xFFFFFF is what meters report for months before module installation;
/// both collapse to zero.
pub fn monthly_total_m3(bytes: [u8; 3]) -> f64 {
    let raw = u32::from(bytes[0]) | u32::from(bytes[1]) << 8 | u32::from(bytes[2]) << 16;
    let value = raw as f64 / 100.0;
    if value >= 100000.0 {
        0.0
    } else {
        value
    }
}

/// English month name for 1..=12
pub fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        12 => "December",
        _ => "unknown",
    }
}

//! # wmbus-meters - A Rust Crate for Decoding wM-Bus Utility Meter Telegrams
//!
//! The wmbus-meters crate decodes wireless M-Bus (EN 13757) telegrams from
//! utility meters, with a focus on the manufacturer-specific payloads that
//! carry the readings many meters do not expose as standard data records.
//!
//! ## Features
//!
//! - Parse wM-Bus data-link, extended-link and transport layer headers
//! - Locate manufacturer-specific data blocks inside the record area
//! - Decode vendor payloads through per-meter drivers (B METERS Hydrodigit)
//! - Match telegrams to drivers by manufacturer, device type and version
//! - Collect decoded readings into named fields with JSON output
//! - Produce byte-by-byte annotations of a telegram for protocol analysis
//! - Support for logging and error handling
//!
//! ## Usage
//!
//! To use the wmbus-meters crate in your Rust project, add the following to
//! your Cargo.toml file:
//!
//! ```toml
//! [dependencies]
//! wmbus-meters = "0.3.0"
//! ```
//!
//! Decoding a captured telegram takes a registry and one call:
//!
//! ```rust
//! use wmbus_meters::{decode_telegram_hex, DriverRegistry};
//!
//! let registry = DriverRegistry::with_defaults().unwrap();
//! let decoded = decode_telegram_hex(
//!     "2144B4099163742315077A400000000C1399999999046D092A30340F050B01000000",
//!     &registry,
//! )
//! .unwrap();
//!
//! assert_eq!(decoded.telegram.id_string(), "23746391");
//! assert_eq!(decoded.fields.numeric("voltage"), Some(3.2));
//! assert_eq!(decoded.fields.numeric("backflow"), Some(0.001));
//! ```

pub mod analysis;
pub mod constants;
pub mod drivers;
pub mod error;
pub mod fields;
pub mod logging;
pub mod manufacturer;
pub mod telegram;
pub mod util;

pub use crate::error::MetersError;
pub use crate::logging::{init_logger, log_info};

// Core telegram types
pub use telegram::{Telegram, TplHeader};

// Field and analysis collaborators
pub use analysis::{Annotation, AnnotationKind, AnnotationSink, Confidence, TelegramAnalysis};
pub use fields::{FieldSink, FieldStore, FieldValue, Unit};

// Driver registry and driver seams
pub use drivers::{
    DriverDetect, DriverInfo, DriverRegistry, LinkMode, MeterDriver, MeterType, PayloadCursor,
};

// Meter drivers
pub use drivers::hydrodigit::HydrodigitDriver;

// Manufacturer database
pub use manufacturer::{
    get_manufacturer_info, id_to_manufacturer, manufacturer_to_id, ManufacturerInfo,
};

use crate::logging::log_warn;
use crate::util::hex::decode_hex;

/// Everything one telegram decodes to.
#[derive(Debug)]
pub struct DecodedTelegram {
    /// Parsed frame headers and record area
    pub telegram: Telegram,
    /// Named readings collected from the payload
    pub fields: FieldStore,
    /// Byte-by-byte protocol annotations
    pub analysis: TelegramAnalysis,
    /// Name of the driver that handled the telegram, when one matched
    pub driver: Option<String>,
}

/// Decode one wM-Bus frame end to end.
///
/// Parses the headers, annotates them, matches a driver from the registry
/// and lets it decode the manufacturer-specific block. A telegram without a
/// matching driver still yields its header fields; the mismatch is logged,
/// not an error.
///
/// # Arguments
/// * `frame` - Complete frame starting at the L-field, without CRCs
/// * `registry` - Driver registry used for manufacturer/type/version lookup
///
/// # Returns
/// * `Ok(DecodedTelegram)` - Parsed telegram with fields and annotations
/// * `Err(MetersError)` - Frame too short or structurally invalid
pub fn decode_telegram(
    frame: &[u8],
    registry: &DriverRegistry,
) -> Result<DecodedTelegram, MetersError> {
    let telegram = Telegram::parse(frame)?;
    let mut fields = FieldStore::new();
    let mut analysis = TelegramAnalysis::new();

    telegram.explain_header(&mut analysis);

    fields.set_string_value("id", &telegram.id_string());
    fields.set_string_value("media", telegram.media_name());

    let driver = registry.driver_for_telegram(&telegram);
    match &driver {
        Some(driver) => {
            fields.set_string_value("meter", driver.info().name);
            if let Some((payload, base_offset)) = telegram.manufacturer_data() {
                driver.decode_manufacturer_data(payload, base_offset, &mut fields, &mut analysis);
            }
        }
        None => {
            log_warn(&format!(
                "no driver for manufacturer {} device type {:02X} version {:02X}",
                telegram.manufacturer_code(),
                telegram.device_type,
                telegram.version
            ));
        }
    }

    Ok(DecodedTelegram {
        driver: driver.map(|driver| driver.info().name.to_string()),
        telegram,
        fields,
        analysis,
    })
}

/// Decode one wM-Bus frame given as a hex string.
///
/// # Arguments
/// * `hex` - Frame bytes in hex, whitespace allowed
/// * `registry` - Driver registry used for manufacturer/type/version lookup
///
/// # Returns
/// * `Ok(DecodedTelegram)` - Parsed telegram with fields and annotations
/// * `Err(MetersError)` - Invalid hex or structurally invalid frame
pub fn decode_telegram_hex(
    hex: &str,
    registry: &DriverRegistry,
) -> Result<DecodedTelegram, MetersError> {
    let frame = decode_hex(hex)?;
    decode_telegram(&frame, registry)
}

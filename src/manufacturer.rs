//! Manufacturer ID Database and Conversion
//!
//! This module handles the manufacturer field of wM-Bus telegrams,
//! implementing the standard FLAG Association algorithm for 3-letter codes
//! and maintaining a database of manufacturers this crate knows about.
//!
//! ## Standard Algorithm
//!
//! Manufacturer IDs are calculated from 3-letter ASCII codes using:
//! ```text
//! id = (char1 - 64) * 32² + (char2 - 64) * 32 + (char3 - 64)
//! ```
//!
//! Valid range: 0x0421 (AAA) to 0x6B5A (ZZZ)
//!
//! ## Usage Example
//!
//! ```rust
//! use wmbus_meters::manufacturer::{manufacturer_to_id, id_to_manufacturer, get_manufacturer_info};
//!
//! // Convert manufacturer code to ID
//! let id = manufacturer_to_id("BMT").unwrap();
//! assert_eq!(id, 0x09B4);
//!
//! // Convert ID back to code
//! assert_eq!(id_to_manufacturer(0x09B4), "BMT");
//!
//! // Get manufacturer info
//! let info = get_manufacturer_info(0x09B4).unwrap();
//! assert_eq!(info.name, "B METERS s.r.l.");
//! ```

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// FLAG id of B METERS s.r.l., the Hydrodigit vendor
pub const MANUFACTURER_BMT: u16 = 0x09B4;

/// Information about a known manufacturer
#[derive(Debug, Clone, PartialEq)]
pub struct ManufacturerInfo {
    /// 3-letter manufacturer code (e.g., "BMT")
    pub code: &'static str,
    /// Full manufacturer name (e.g., "B METERS s.r.l.")
    pub name: &'static str,
    /// Optional description or notes
    pub description: Option<&'static str>,
}

impl ManufacturerInfo {
    pub const fn new(code: &'static str, name: &'static str) -> Self {
        Self {
            code,
            name,
            description: None,
        }
    }

    pub const fn with_description(
        code: &'static str,
        name: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            code,
            name,
            description: Some(description),
        }
    }
}

/// Database of manufacturers seen in the field by this crate
pub static KNOWN_MANUFACTURERS: Lazy<HashMap<u16, ManufacturerInfo>> = Lazy::new(|| {
    let mut map = HashMap::new();

    // ===== WATER METER MANUFACTURERS =====

    map.insert(
        0x09B4,
        ManufacturerInfo::with_description(
            "BMT",
            "B METERS s.r.l.",
            "Hydrodigit series places readings in a manufacturer data block after DIF 0x0F",
        ),
    );
    map.insert(0x3424, ManufacturerInfo::new("MAD", "Maddalena S.p.A."));
    map.insert(0x0709, ManufacturerInfo::new("AXI", "Axioma Metering"));
    map.insert(0x0601, ManufacturerInfo::new("APA", "Apator SA"));
    map.insert(0x2324, ManufacturerInfo::new("HYD", "Diehl Metering (Hydrometer)"));
    map.insert(0x68AE, ManufacturerInfo::new("ZEN", "Zenner International"));
    map.insert(0x05B4, ManufacturerInfo::new("AMT", "Aquametro AG"));

    // ===== MULTI-UTILITY MANUFACTURERS =====

    map.insert(0x2C2D, ManufacturerInfo::new("KAM", "Kamstrup"));
    map.insert(0x2697, ManufacturerInfo::new("ITW", "Itron"));
    map.insert(0x4CAE, ManufacturerInfo::new("SEN", "Sensus Metering Systems"));
    map.insert(0x1593, ManufacturerInfo::new("ELS", "Elster (Honeywell)"));
    map.insert(0x3B52, ManufacturerInfo::new("NZR", "Neue Zählerwerke"));

    // ===== HEAT / HCA MANUFACTURERS =====

    map.insert(0x4493, ManufacturerInfo::new("QDS", "Qundis GmbH"));
    map.insert(0x5068, ManufacturerInfo::new("TCH", "Techem GmbH"));

    // ===== REFERENCE/TEST MANUFACTURERS =====

    // CEN is used as example in M-Bus documentation
    map.insert(0x0CAE, ManufacturerInfo::new("CEN", "Example Manufacturer"));

    map
});

/// Convert a 3-letter manufacturer code to its FLAG id
///
/// Implements the standard manufacturer ID encoding as per EN 13757-3.
/// Formula: (char1 - 64) * 32² + (char2 - 64) * 32 + (char3 - 64)
///
/// # Arguments
/// * `manufacturer` - 3-letter ASCII code (case insensitive)
///
/// # Returns
/// * `Some(id)` - Valid manufacturer ID (15-bit value, MSB not set)
/// * `None` - Invalid input
///
/// # Examples
/// ```rust
/// use wmbus_meters::manufacturer::manufacturer_to_id;
///
/// assert_eq!(manufacturer_to_id("BMT"), Some(0x09B4));
/// assert_eq!(manufacturer_to_id("bmt"), Some(0x09B4)); // Case insensitive
/// assert_eq!(manufacturer_to_id("123"), None);
/// ```
pub fn manufacturer_to_id(manufacturer: &str) -> Option<u16> {
    if manufacturer.len() != 3 {
        return None;
    }

    let code = manufacturer.to_uppercase();
    let chars: Vec<char> = code.chars().collect();

    if !chars.iter().all(|c| c.is_ascii_uppercase()) {
        return None;
    }

    // Each character is mapped: A=1, B=2, ..., Z=26
    let val1 = (chars[0] as u16) - 64;
    let val2 = (chars[1] as u16) - 64;
    let val3 = (chars[2] as u16) - 64;

    Some((val1 * 1024) + (val2 * 32) + val3)
}

/// Convert a FLAG manufacturer id to its 3-letter code
///
/// The MSB (bit 15) indicates hard/soft address and is masked before decoding.
///
/// # Arguments
/// * `id` - Manufacturer ID (with or without MSB set)
///
/// # Returns
/// * 3-letter code for valid IDs
/// * `"UNK"` for invalid/unknown IDs
///
/// # Examples
/// ```rust
/// use wmbus_meters::manufacturer::id_to_manufacturer;
///
/// assert_eq!(id_to_manufacturer(0x09B4), "BMT");
/// assert_eq!(id_to_manufacturer(0x89B4), "BMT"); // With MSB set (soft address)
/// assert_eq!(id_to_manufacturer(0x0000), "UNK"); // Invalid
/// ```
pub fn id_to_manufacturer(id: u16) -> String {
    // Mask out the MSB (bit 15) which indicates hard/soft address
    let id_val = id & 0x7FFF;

    let val3 = id_val % 32;
    let val2 = (id_val / 32) % 32;
    let val1 = id_val / 1024;

    if val1 == 0 || val1 > 26 || val2 == 0 || val2 > 26 || val3 == 0 || val3 > 26 {
        return "UNK".to_string();
    }

    let char1 = ((val1 + 64) as u8) as char;
    let char2 = ((val2 + 64) as u8) as char;
    let char3 = ((val3 + 64) as u8) as char;

    format!("{}{}{}", char1, char2, char3)
}

/// Get detailed information about a manufacturer
///
/// # Returns
/// * `Some(info)` - Detailed manufacturer information
/// * `None` - Unknown manufacturer
pub fn get_manufacturer_info(id: u16) -> Option<&'static ManufacturerInfo> {
    KNOWN_MANUFACTURERS.get(&(id & 0x7FFF))
}

/// Get manufacturer name with fallback to the generated code
///
/// Returns the full manufacturer name if known, otherwise
/// the 3-letter code decoded from the ID.
pub fn get_manufacturer_name(id: u16) -> String {
    get_manufacturer_info(id)
        .map(|info| info.name.to_string())
        .unwrap_or_else(|| id_to_manufacturer(id))
}

/// Get all known manufacturers
pub fn all_manufacturers() -> impl Iterator<Item = (&'static u16, &'static ManufacturerInfo)> {
    KNOWN_MANUFACTURERS.iter()
}

/// Validate manufacturer ID range
///
/// Checks if the given ID falls within the valid FLAG Association range.
/// This checks the 15-bit value, ignoring the MSB.
pub fn is_valid_id(id: u16) -> bool {
    let id_val = id & 0x7FFF;
    // Minimum valid: AAA = 0x0421, maximum valid: ZZZ = 0x6B5A
    (0x0421..=0x6B5A).contains(&id_val)
}

/// Check if a manufacturer ID has the MSB set (soft address)
///
/// The MSB (bit 15) indicates whether the device address is:
/// - 0: Globally unique ("hard address") - manufacturer guarantees uniqueness
/// - 1: Locally unique ("soft address") - unique only within installation
pub fn is_soft_address(id: u16) -> bool {
    (id & 0x8000) != 0
}

//! Wireless M-Bus Protocol Constants
//!
//! Constants used when parsing telegram headers and walking data records,
//! based on the EN 13757 standard.

/// DIF mask for the data field (length/encoding nibble)
pub const DIF_MASK_DATA: u8 = 0x0F;

/// DIF idle filler, skipped between records
pub const DIF_IDLE_FILLER: u8 = 0x2F;

/// DIF marking the start of manufacturer specific data
pub const DIF_MANUFACTURER_SPECIFIC: u8 = 0x0F;

/// DIF marking manufacturer specific data with more records following
pub const DIF_MORE_RECORDS_FOLLOW: u8 = 0x1F;

/// Extension bit in DIF/DIFE bytes
pub const DIF_EXTENSION_BIT: u8 = 0x80;

/// Extension bit in VIF/VIFE bytes
pub const VIF_EXTENSION_BIT: u8 = 0x80;

/// VIF value (extension bit masked) introducing a length-prefixed plain-text unit
pub const VIF_PLAIN_TEXT: u8 = 0x7C;

// ----------------------------------------------------------------------------
// CI (control information) codes seen after the wM-Bus link layer
// ----------------------------------------------------------------------------

/// Extended link layer with 2 additional bytes (CC, ACC); another CI follows
pub const CI_ELL_SHORT: u8 = 0x8C;

/// Transport layer, no header
pub const CI_TPL_NONE: u8 = 0x78;

/// Transport layer, short header (ACC, STATUS, CONFIG)
pub const CI_TPL_SHORT: u8 = 0x7A;

/// Transport layer, long header (secondary address, ACC, STATUS, CONFIG)
pub const CI_TPL_LONG: u8 = 0x72;

// ----------------------------------------------------------------------------
// Frame geometry
// ----------------------------------------------------------------------------

/// Bytes of the data link layer after the L-field: C, M(2), A(4), version, type
pub const DLL_HEADER_AFTER_L: usize = 9;

/// Smallest parseable frame: L-field plus DLL header plus CI
pub const MIN_FRAME_LENGTH: usize = 1 + DLL_HEADER_AFTER_L + 1;

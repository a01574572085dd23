//! # Error Handling
//!
//! This module defines the MetersError enum, which represents the different
//! error types that can occur in the wmbus-meters crate.

use thiserror::Error;

use crate::util::hex::HexError;

/// Represents the different error types that can occur in this crate.
#[derive(Debug, Error)]
pub enum MetersError {
    /// Indicates an error when parsing a wM-Bus telegram.
    #[error("Error parsing telegram: {0}")]
    FrameParseError(String),

    /// Indicates an invalid hexadecimal string was provided.
    #[error("Invalid hexadecimal string: {0}")]
    InvalidHexString(#[from] HexError),

    /// Indicates a driver name collision during registration.
    #[error("Driver already registered: {0}")]
    DriverAlreadyRegistered(String),
}

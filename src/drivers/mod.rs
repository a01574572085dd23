//! # Meter Driver System
//!
//! Manufacturer-specific telegram content is opaque to the generic protocol
//! layer: after the DIF `0x0F` marker the bytes mean whatever the vendor
//! decided. This module provides the pluggable driver system that turns
//! those bytes into readings.
//!
//! A driver declares which (manufacturer, device type, version) triples it
//! understands and decodes the manufacturer data of matching telegrams into
//! named fields and diagnostic annotations. The [`DriverRegistry`] is
//! populated explicitly at startup; no static-initialization ordering is
//! involved.

pub mod hydrodigit;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::analysis::AnnotationSink;
use crate::error::MetersError;
use crate::fields::FieldSink;
use crate::telegram::Telegram;

/// Kind of meter a driver understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeterType {
    WaterMeter,
    HeatMeter,
    ElectricityMeter,
    GasMeter,
    HeatCostAllocator,
    Unknown,
}

impl MeterType {
    pub fn name(&self) -> &'static str {
        match self {
            MeterType::WaterMeter => "water meter",
            MeterType::HeatMeter => "heat meter",
            MeterType::ElectricityMeter => "electricity meter",
            MeterType::GasMeter => "gas meter",
            MeterType::HeatCostAllocator => "heat cost allocator",
            MeterType::Unknown => "unknown",
        }
    }
}

/// wM-Bus link modes a meter transmits in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    S1,
    T1,
    C1,
    N1,
}

impl LinkMode {
    pub fn name(&self) -> &'static str {
        match self {
            LinkMode::S1 => "S1",
            LinkMode::T1 => "T1",
            LinkMode::C1 => "C1",
            LinkMode::N1 => "N1",
        }
    }
}

/// One (manufacturer, device type, version) triple a driver claims
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverDetect {
    pub manufacturer: u16,
    pub device_type: u8,
    pub version: u8,
}

impl DriverDetect {
    pub const fn new(manufacturer: u16, device_type: u8, version: u8) -> Self {
        Self {
            manufacturer,
            device_type,
            version,
        }
    }
}

/// Static metadata describing a driver
#[derive(Debug, Clone)]
pub struct DriverInfo {
    /// Registry key, lowercase by convention
    pub name: &'static str,
    pub meter_type: MeterType,
    pub link_modes: &'static [LinkMode],
    /// Comma-separated field selection consumers usually want from this meter
    pub default_fields: &'static str,
    pub detects: &'static [DriverDetect],
}

/// Trait for manufacturer-specific meter drivers
pub trait MeterDriver: Send + Sync {
    /// Static driver metadata: name, detection triples, defaults
    fn info(&self) -> &DriverInfo;

    /// Decode the manufacturer-specific data of one telegram
    ///
    /// `base_offset` is the absolute frame offset of `payload[0]` and
    /// anchors annotation addressing. Drivers publish through the sinks and
    /// never fail: bytes they cannot interpret are reported as annotations,
    /// and a payload that ends early simply stops the decode, keeping the
    /// fields published so far.
    fn decode_manufacturer_data(
        &self,
        payload: &[u8],
        base_offset: usize,
        fields: &mut dyn FieldSink,
        analysis: &mut dyn AnnotationSink,
    );
}

/// Exclusive forward-only cursor over one manufacturer payload
///
/// [`take`](PayloadCursor::take) hands out a section's bytes only when they
/// are all present; a refusal leaves the cursor untouched and means the
/// payload ended early, so the decode must stop.
#[derive(Debug)]
pub struct PayloadCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> PayloadCursor<'a> {
    pub fn new(bytes: &'a [u8], base: usize) -> Self {
        Self { bytes, pos: 0, base }
    }

    /// Absolute frame offset of the next byte
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Next byte without advancing
    pub fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    /// The next `n` bytes, advancing past them; `None` if fewer remain
    pub fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.remaining() < n {
            return None;
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Some(slice)
    }

    /// Advance past `n` bytes, clamped to the end of the payload
    pub fn skip(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.bytes.len());
    }
}

/// Registry of meter drivers, shared and internally synchronized
#[derive(Default, Clone)]
pub struct DriverRegistry {
    inner: Arc<Mutex<HashMap<String, Arc<dyn MeterDriver>>>>,
}

impl DriverRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver under its declared name
    pub fn register(&self, driver: Arc<dyn MeterDriver>) -> Result<(), MetersError> {
        let mut inner = self.inner.lock().unwrap();
        let name = driver.info().name.to_string();

        if inner.contains_key(&name) {
            return Err(MetersError::DriverAlreadyRegistered(name));
        }

        inner.insert(name, driver);
        Ok(())
    }

    /// Look up a driver by name
    pub fn by_name(&self, name: &str) -> Option<Arc<dyn MeterDriver>> {
        let inner = self.inner.lock().unwrap();
        inner.get(name).cloned()
    }

    /// Driver claiming the (manufacturer, device type, version) triple
    ///
    /// The manufacturer's soft-address bit is ignored for matching.
    pub fn driver_for(
        &self,
        manufacturer: u16,
        device_type: u8,
        version: u8,
    ) -> Option<Arc<dyn MeterDriver>> {
        let inner = self.inner.lock().unwrap();
        inner
            .values()
            .find(|driver| {
                driver.info().detects.iter().any(|detect| {
                    detect.manufacturer == (manufacturer & 0x7FFF)
                        && detect.device_type == device_type
                        && detect.version == version
                })
            })
            .cloned()
    }

    /// Driver matching a parsed telegram's header fields
    pub fn driver_for_telegram(&self, telegram: &Telegram) -> Option<Arc<dyn MeterDriver>> {
        self.driver_for(
            telegram.manufacturer_id,
            telegram.device_type,
            telegram.version,
        )
    }

    /// Names of all registered drivers, sorted
    pub fn registered_drivers(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        let mut names: Vec<String> = inner.keys().cloned().collect();
        names.sort();
        names
    }

    /// Create a new registry with the built-in drivers registered
    pub fn with_defaults() -> Result<Self, MetersError> {
        let registry = Self::new();

        registry.register(Arc::new(hydrodigit::HydrodigitDriver::new()))?;

        // Future drivers are added here
        Ok(registry)
    }
}

//! End-to-end tests for the Hydrodigit driver over captured telegrams.

use chrono::{TimeZone, Utc};
use serde_json::json;

use wmbus_meters::util::hex::hex_to_bytes;
use wmbus_meters::{decode_telegram, Confidence, DriverRegistry};

/// Water meter with voltage, backflow and a full 12-month history,
/// followed by idle fillers after the trailing unknown byte.
const MONTHLY_HISTORY_HEX: &str = "4E44B4098686868613077AF00040052F2F0C1366380000046D27287E2A0F150E00000000C10000D10000E60000FD00000C01002F0100410100540100680100890000A00000B30000002F2F2F2F2F2F";

/// Warm water meter behind an extended link layer, reporting a fraud date
/// that was never set.
const WARM_WATER_ELL_HEX: &str =
    "2444B4090155240317068C00487AC00000000C1335670000046D172EEA280F030000000000";

/// Meter with a non-zero backflow register.
const BACKFLOW_SHOWCASE_HEX: &str = "4644B4092143658713077A9C0000000C1364390400046D212F16350F152A0F000000440F00C00F00511000D51000B20B00180C007C0C00E60C00560D00D10D00400E00C60E0000";

/// Meter reporting a leak date, with months before module installation
/// still at the 0xFFFFFF sentinel.
const LEAK_AND_SENTINEL_HEX: &str = "4944B4092243658713077A7F0000000C1363020400046D242C12360F950A24042507000000A405006E0700850900CA0B004A0E00FFFFFFFFFFFF020000020000250000B3010095030000";

/// Meter sending voltage and backflow but no monthly history.
const NO_HISTORY_HEX: &str =
    "2144B4099163742315077A400000000C1399999999046D092A30340F050B01000000";

/// Meter with every date section zeroed and an identifier bit this driver
/// does not recognize, followed by a long run of unexplained zeros.
const ALL_ZERO_DATES_HEX: &str = "4C44B4096120120317077AB90000000C1330000000046D132E3E360F8F000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000";

fn registry() -> DriverRegistry {
    DriverRegistry::with_defaults().unwrap()
}

#[test]
fn test_water_meter_with_monthly_history() {
    let frame = hex_to_bytes(MONTHLY_HISTORY_HEX);
    let decoded = decode_telegram(&frame, &registry()).unwrap();

    assert_eq!(decoded.driver.as_deref(), Some("hydrodigit"));
    assert_eq!(decoded.fields.text("id"), Some("86868686"));
    assert_eq!(decoded.fields.text("media"), Some("water"));
    assert_eq!(decoded.fields.text("meter"), Some("hydrodigit"));

    assert_eq!(decoded.fields.numeric("voltage"), Some(3.7));
    assert_eq!(decoded.fields.numeric("backflow"), Some(0.0));
    assert_eq!(
        decoded.fields.text("contents"),
        Some("BATTERY_VOLTAGE BACKFLOW MONTHLY_DATA")
    );

    assert_eq!(decoded.fields.numeric("January_total"), Some(1.93));
    assert_eq!(decoded.fields.numeric("February_total"), Some(2.09));
    assert_eq!(decoded.fields.numeric("March_total"), Some(2.3));
    assert_eq!(decoded.fields.numeric("April_total"), Some(2.53));
    assert_eq!(decoded.fields.numeric("May_total"), Some(2.68));
    assert_eq!(decoded.fields.numeric("June_total"), Some(3.03));
    assert_eq!(decoded.fields.numeric("July_total"), Some(3.21));
    assert_eq!(decoded.fields.numeric("August_total"), Some(3.4));
    assert_eq!(decoded.fields.numeric("September_total"), Some(3.6));
    assert_eq!(decoded.fields.numeric("October_total"), Some(1.37));
    assert_eq!(decoded.fields.numeric("November_total"), Some(1.6));
    assert_eq!(decoded.fields.numeric("December_total"), Some(1.79));

    // 10 header notes, identifier, voltage, backflow, 12 months, the
    // contents summary and one unknown byte
    assert_eq!(decoded.analysis.len(), 27);

    // The idle fillers after the unknown byte stay unexplained
    let max_offset = decoded
        .analysis
        .notes()
        .iter()
        .map(|note| note.offset)
        .max()
        .unwrap();
    assert_eq!(max_offset, 72);
}

#[test]
fn test_warm_water_meter_behind_ell() {
    let frame = hex_to_bytes(WARM_WATER_ELL_HEX);
    let decoded = decode_telegram(&frame, &registry()).unwrap();

    assert_eq!(decoded.telegram.ell, Some((0x00, 0x48)));
    assert_eq!(decoded.fields.text("id"), Some("03245501"));
    assert_eq!(decoded.fields.text("media"), Some("warm water"));

    assert_eq!(decoded.fields.numeric("voltage"), Some(3.7));
    assert_eq!(decoded.fields.text("fraud_date"), Some("2000-00-00"));
    assert_eq!(decoded.fields.text("fraud_type"), Some("no type info"));
    assert_eq!(
        decoded.fields.text("contents"),
        Some("BATTERY_VOLTAGE FRAUD_DATE")
    );
    assert!(!decoded.fields.contains("backflow"));
}

#[test]
fn test_backflow_encoding() {
    let frame = hex_to_bytes(BACKFLOW_SHOWCASE_HEX);
    let decoded = decode_telegram(&frame, &registry()).unwrap();

    assert_eq!(decoded.fields.text("id"), Some("87654321"));
    assert_eq!(decoded.fields.numeric("voltage"), Some(3.05));
    assert_eq!(decoded.fields.numeric("backflow"), Some(0.015));
    assert_eq!(decoded.fields.numeric("January_total"), Some(39.08));
    assert_eq!(decoded.fields.numeric("April_total"), Some(43.09));
    assert_eq!(decoded.fields.numeric("December_total"), Some(37.82));
    assert_eq!(
        decoded.fields.text("contents"),
        Some("BATTERY_VOLTAGE BACKFLOW MONTHLY_DATA")
    );
}

#[test]
fn test_leak_date_and_installation_sentinel() {
    let frame = hex_to_bytes(LEAK_AND_SENTINEL_HEX);
    let decoded = decode_telegram(&frame, &registry()).unwrap();

    assert_eq!(decoded.fields.text("id"), Some("87654322"));
    assert_eq!(decoded.fields.numeric("voltage"), Some(3.05));
    assert_eq!(decoded.fields.text("leak_date"), Some("2024-04-25"));
    assert_eq!(decoded.fields.numeric("backflow"), Some(0.007));
    assert_eq!(
        decoded.fields.text("contents"),
        Some("BATTERY_VOLTAGE LEAK_DATE BACKFLOW MONTHLY_DATA")
    );

    // No fraud section on this meter
    assert!(!decoded.fields.contains("fraud_date"));
    assert!(!decoded.fields.contains("fraud_type"));

    // Months before module installation read as zero
    assert_eq!(decoded.fields.numeric("May_total"), Some(36.58));
    assert_eq!(decoded.fields.numeric("June_total"), Some(0.0));
    assert_eq!(decoded.fields.numeric("July_total"), Some(0.0));
    assert_eq!(decoded.fields.numeric("August_total"), Some(0.02));
    assert_eq!(decoded.fields.numeric("December_total"), Some(9.17));
}

#[test]
fn test_no_monthly_history() {
    let frame = hex_to_bytes(NO_HISTORY_HEX);
    let decoded = decode_telegram(&frame, &registry()).unwrap();

    assert_eq!(decoded.fields.numeric("voltage"), Some(3.2));
    assert_eq!(decoded.fields.numeric("backflow"), Some(0.001));
    assert_eq!(decoded.fields.text("contents"), Some("BATTERY_VOLTAGE BACKFLOW"));

    // id, media, meter, voltage, backflow, contents
    assert_eq!(decoded.fields.len(), 6);

    let timestamp = Utc.with_ymd_and_hms(1111, 11, 11, 11, 11, 11).unwrap();
    assert_eq!(
        decoded.fields.to_json_at(timestamp),
        json!({
            "backflow_m3": 0.001,
            "contents": "BATTERY_VOLTAGE BACKFLOW",
            "id": "23746391",
            "media": "water",
            "meter": "hydrodigit",
            "timestamp": "1111-11-11T11:11:11Z",
            "voltage_v": 3.2,
        })
    );
}

#[test]
fn test_inert_identifier_bits_and_zero_dates() {
    let frame = hex_to_bytes(ALL_ZERO_DATES_HEX);
    let decoded = decode_telegram(&frame, &registry()).unwrap();

    assert_eq!(decoded.fields.text("id"), Some("03122061"));
    assert_eq!(decoded.fields.numeric("voltage"), Some(3.7));
    assert_eq!(decoded.fields.text("fraud_date"), Some("2000-00-00"));
    assert_eq!(decoded.fields.text("fraud_type"), Some("no type info"));
    assert_eq!(decoded.fields.text("leak_date"), Some("2000-00-00"));
    assert_eq!(decoded.fields.numeric("backflow"), Some(0.0));

    // Bit 3 of the identifier is set but means nothing to this driver
    assert_eq!(
        decoded.fields.text("contents"),
        Some("BATTERY_VOLTAGE FRAUD_DATE LEAK_DATE BACKFLOW")
    );
    assert!(!decoded.fields.contains("January_total"));

    // Exactly one byte is flagged unknown; the zeros after it are ignored
    let unknown: Vec<_> = decoded
        .analysis
        .notes()
        .iter()
        .filter(|note| note.confidence == Confidence::None)
        .collect();
    assert_eq!(unknown.len(), 1);
    assert!(unknown[0].message.contains("unknown data"));
}

#[test]
fn test_truncated_history_keeps_established_fields() {
    // Cut the monthly-history telegram two bytes into June and fix up
    // the L-field to keep the frame self-consistent
    let mut frame = hex_to_bytes(MONTHLY_HISTORY_HEX);
    frame.truncate(53);
    frame[0] = 52;

    let decoded = decode_telegram(&frame, &registry()).unwrap();

    assert_eq!(decoded.fields.numeric("voltage"), Some(3.7));
    assert_eq!(decoded.fields.numeric("January_total"), Some(1.93));
    assert_eq!(decoded.fields.numeric("May_total"), Some(2.68));

    // The incomplete June group and everything after it vanish silently
    assert!(!decoded.fields.contains("June_total"));
    assert!(!decoded.fields.contains("contents"));
}

#[test]
fn test_unknown_manufacturer_keeps_header_fields() {
    let mut frame = hex_to_bytes(NO_HISTORY_HEX);
    // Swap the manufacturer for one no registered driver claims
    frame[2] = 0x24;
    frame[3] = 0x34;

    let decoded = decode_telegram(&frame, &registry()).unwrap();

    assert_eq!(decoded.driver, None);
    assert_eq!(decoded.fields.text("id"), Some("23746391"));
    assert_eq!(decoded.fields.text("media"), Some("water"));
    assert!(!decoded.fields.contains("meter"));
    assert!(!decoded.fields.contains("voltage"));

    // Header annotations only
    assert_eq!(decoded.analysis.len(), 10);
}

mod prop_tests {
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    use wmbus_meters::{
        FieldStore, HydrodigitDriver, MeterDriver, TelegramAnalysis,
    };

    proptest! {
        #[test]
        fn prop_decoder_never_panics(
            payload in proptest::collection::vec(any::<u8>(), 0..64),
            base in 0usize..256,
        ) {
            let driver = HydrodigitDriver::new();
            let mut fields = FieldStore::new();
            let mut analysis = TelegramAnalysis::new();
            driver.decode_manufacturer_data(&payload, base, &mut fields, &mut analysis);

            // At most one field per section plus the contents summary
            prop_assert!(fields.len() <= 17);
        }

        #[test]
        fn prop_decoding_is_deterministic(
            payload in proptest::collection::vec(any::<u8>(), 0..64),
        ) {
            let driver = HydrodigitDriver::new();

            let mut fields_a = FieldStore::new();
            let mut analysis_a = TelegramAnalysis::new();
            driver.decode_manufacturer_data(&payload, 28, &mut fields_a, &mut analysis_a);

            let mut fields_b = FieldStore::new();
            let mut analysis_b = TelegramAnalysis::new();
            driver.decode_manufacturer_data(&payload, 28, &mut fields_b, &mut analysis_b);

            let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
            prop_assert_eq!(analysis_a.notes(), analysis_b.notes());
            prop_assert_eq!(fields_a.to_json_at(at), fields_b.to_json_at(at));
        }

        #[test]
        fn prop_annotations_advance_with_the_cursor(
            payload in proptest::collection::vec(any::<u8>(), 0..64),
            base in 0usize..256,
        ) {
            let driver = HydrodigitDriver::new();
            let mut fields = FieldStore::new();
            let mut analysis = TelegramAnalysis::new();
            driver.decode_manufacturer_data(&payload, base, &mut fields, &mut analysis);

            // Sections decode front to back, so arrival order never moves
            // backwards and nothing is annotated outside the payload
            for pair in analysis.notes().windows(2) {
                prop_assert!(pair[0].offset <= pair[1].offset);
            }
            for note in analysis.notes() {
                prop_assert!(note.offset >= base);
                prop_assert!(note.offset <= base + payload.len());
            }
        }
    }
}

//! Fuzz test for shipment status parsing
//!
//! Status strings come back from storage; parsing must never panic, and an
//! accepted string must map onto its canonical lowercase form.
//!
//! Run with: cargo +nightly fuzz run status_fuzz -- -max_total_time=60

#![no_main]

use lading_core::ShipmentStatus;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(status) = ShipmentStatus::from_db_str(input) {
            assert_eq!(status.as_db_str(), input.to_lowercase());
        }
    }
});

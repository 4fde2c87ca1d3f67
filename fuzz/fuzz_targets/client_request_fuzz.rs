//! Fuzz test for inbound channel request parsing
//!
//! Client frames are attacker-controlled bytes; parsing them must never
//! panic, and an accepted request must survive a serialize/parse cycle.
//!
//! Run with: cargo +nightly fuzz run client_request_fuzz -- -max_total_time=60

#![no_main]

use lading_api::ClientRequest;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(request) = serde_json::from_str::<ClientRequest>(input) {
            let json = serde_json::to_string(&request).expect("accepted request must serialize");
            let reparsed: ClientRequest =
                serde_json::from_str(&json).expect("serialized request must parse");
            assert_eq!(reparsed, request);
        }
    }
});

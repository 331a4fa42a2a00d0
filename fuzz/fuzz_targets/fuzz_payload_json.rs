#![no_main]

use libfuzzer_sys::fuzz_target;
use nodestate_core::Payload;

fuzz_target!(|data: &[u8]| {
    let Ok(json) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    let Ok(payload) = Payload::from_json(json) else {
        return;
    };
    // Accepted payloads survive a trip through their own JSON form.
    let again = Payload::from_json(payload.to_json()).expect("re-decode accepted payload");
    assert_eq!(again.len(), payload.len());
    for key in payload.keys() {
        assert!(again.contains(key));
    }
});

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = serde_json::from_slice::<cinemoji_client::protocol::ClientRequest>(data);

    if let Ok(s) = std::str::from_utf8(data) {
        let _ = serde_json::from_str::<cinemoji_client::protocol::ClientRequest>(s);
    }
});

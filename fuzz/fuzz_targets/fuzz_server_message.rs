#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Raw-byte path, including serde_json's UTF-8 validation.
    let _ = serde_json::from_slice::<bunnyhop_client::protocol::ServerMessage>(data);

    // Frame classification used by the connection loop.
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = bunnyhop_client::protocol::InboundFrame::parse(s);
    }
});

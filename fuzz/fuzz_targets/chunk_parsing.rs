#![no_main]

use libfuzzer_sys::fuzz_target;
use ssesource::shared::sse_parser::{parse_event_chunk, split_event_chunks};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let (chunks, rest) = split_event_chunks(text);
    for chunk in chunks.iter().chain(std::iter::once(&rest)) {
        let Some(event) = parse_event_chunk(chunk) else {
            continue;
        };
        assert!(!event.is_empty());

        // Re-serialized records parse back to themselves.
        let wire = event.to_string();
        assert_eq!(parse_event_chunk(wire.trim_end_matches('\n')), Some(event));
    }
});

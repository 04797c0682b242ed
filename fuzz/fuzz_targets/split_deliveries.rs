#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use ssesource::shared::sse_parser::{parse_event_chunk, ChunkBuffer, SseEvent};

#[derive(Debug, Arbitrary)]
struct Deliveries {
    text: String,
    cuts: Vec<usize>,
}

fn parse(pieces: &[&str]) -> Vec<SseEvent> {
    let mut buffer = ChunkBuffer::new();
    let mut chunks = Vec::new();
    for piece in pieces {
        chunks.extend(buffer.push(piece));
    }
    chunks.push(buffer.finish());
    chunks.iter().filter_map(|c| parse_event_chunk(c)).collect()
}

fuzz_target!(|input: Deliveries| {
    let text = input.text.as_str();
    let mut cuts: Vec<usize> = input
        .cuts
        .iter()
        .map(|c| c % (text.len() + 1))
        .filter(|c| text.is_char_boundary(*c))
        .collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut pieces = Vec::new();
    let mut start = 0;
    for cut in cuts {
        pieces.push(&text[start..cut]);
        start = cut;
    }
    pieces.push(&text[start..]);

    assert_eq!(parse(&pieces), parse(&[text]));
});

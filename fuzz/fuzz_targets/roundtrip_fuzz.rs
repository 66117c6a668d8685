#![no_main]
use libfuzzer_sys::fuzz_target;
use textrle::codec::{decoder, encoder};

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // Use first byte as control flags.
    let multi = data[0] & 1 != 0;

    // Map the payload onto a small alphabet of non-reserved characters so
    // runs and repeated chunks are common.
    const ALPHABET: [char; 6] = ['#', '$', '@', '.', ' ', 'x'];
    let text: String = data[1..]
        .iter()
        .take(512)
        .map(|b| ALPHABET[*b as usize % ALPHABET.len()])
        .collect();

    let encoded = if multi {
        encoder::multi_pass_compress(&text)
    } else {
        encoder::compress(&text)
    };
    let decoded = decoder::decompress(&encoded).unwrap();
    assert_eq!(decoded, text);
});

#![no_main]
use libfuzzer_sys::fuzz_target;
use textrle::codec::decoder::{self, DecodeOptions};
use textrle::grammar;

fuzz_target!(|data: &[u8]| {
    // The decoder and the tokenizer must never panic, only return errors.
    let text = String::from_utf8_lossy(data);
    let opts = DecodeOptions {
        max_output: Some(1 << 20),
        max_depth: 256,
    };
    let decoded = decoder::decode(&text, &opts);
    let parsed = grammar::parse(&text, opts.max_depth);

    // Whatever the decoder accepts, the tokenizer accepts too.
    if let Ok(plain) = decoded {
        let tokens = parsed.expect("tokenizer rejected decodable input");
        assert_eq!(grammar::expanded_len(&tokens), plain.chars().count());
    }
});

//! Fuzz target for frame splitting and message decoding.
//!
//! Run with: cargo +nightly fuzz run fuzz_decode
//!
//! Whatever arrives on the pipe, decoding must return an error rather than
//! panic, and a split frame never claims more bytes than it was given.

#![no_main]

use libfuzzer_sys::fuzz_target;
use ndg_core::comm::codec;

fuzz_target!(|data: &[u8]| {
    let _ = codec::decode_bytes(data);

    let mut rest = data;
    while let Ok(Some((frame, used))) = codec::split_frame(rest) {
        assert!(used <= rest.len());
        let _ = codec::decode(frame);
        rest = &rest[used..];
    }
});

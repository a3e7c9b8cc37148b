//! Fuzz test for the domain-scoped key codec
//!
//! Decoding must handle arbitrary byte sequences without panicking, and any
//! buffer it accepts must re-encode to the same bytes.
//!
//! Run with: cargo +nightly fuzz run domain_key_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use ratchet_storage::DomainScopedKey;

fuzz_target!(|data: &[u8]| {
    if let Some(key) = DomainScopedKey::decode(data) {
        // An accepted buffer must round-trip byte for byte.
        assert_eq!(
            key.encode(),
            data,
            "decode/encode round-trip changed the key bytes"
        );

        // And the domain prefix must cover the encoded key.
        let prefix = DomainScopedKey::domain_prefix(key.domain());
        assert!(key.encode().starts_with(&prefix));
    }
});

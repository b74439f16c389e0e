//! Shared helpers for the cmsenvelope integration tests

#![allow(dead_code)]

use cmsenvelope::KeyPair;
use std::sync::Once;

pub const TEST_PLAINTEXT: &[u8] = b"this string will be encrypted";

pub const BOB_ID: &[u8] = b"2e8176ba-34db-4c65-b977-c5eac687c4ac";
pub const JOHN_ID: &[u8] = b"8a4b6e51-3c2a-4fd9-a7e0-2b9f1c0d5e61";
pub const ALICE_PASSWORD: &[u8] = b"alice's secret password";

static INIT: Once = Once::new();

/// Route tracing output to the test harness, filtered by `RUST_LOG`
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub struct Recipients {
    pub bob: KeyPair,
    pub john: KeyPair,
}

pub fn recipients() -> Recipients {
    Recipients {
        bob: KeyPair::generate(),
        john: KeyPair::generate(),
    }
}

/// Deterministic payload of `len` bytes
pub fn test_data(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

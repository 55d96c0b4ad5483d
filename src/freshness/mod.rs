//! Freshness detection: blake3 content hashes for source images and render inputs.

mod hash;

pub use hash::{ContentHash, Fingerprint};

//! Cryptographic utilities
//!
//! Only hashing is needed: contract addresses are derived from
//! SHA-256 of the deployer and its nonce.

pub mod hash;

pub use hash::{creation_hash, sha256};

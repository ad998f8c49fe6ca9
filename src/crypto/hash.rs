//! Hashing utilities
//!
//! SHA-256 helpers used to derive contract addresses.

use sha2::{Digest, Sha256};

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Hash a deployer/nonce pair into the seed for a new contract address
pub fn creation_hash(deployer: &str, nonce: u64) -> Vec<u8> {
    let input = format!("{}:{}", deployer, nonce);
    sha256(input.as_bytes())
}

//! Storage module for devnet persistence

pub mod persistence;

pub use persistence::{Snapshot, Storage, StorageConfig, StorageError};

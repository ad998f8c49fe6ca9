//! Core chain components
//!
//! This module contains the pieces every contract runs against:
//! - Addresses (20-byte, hex encoded, deterministic contract derivation)
//! - Native value amounts in wei
//! - Events and the event log
//! - Chain state (balances, block clock, external calls, checkpoints)

pub mod address;
pub mod amount;
pub mod event;
pub mod state;

pub use address::{Address, AddressError, ADDRESS_LENGTH};
pub use amount::{
    ether, format_ether, parse_ether, AmountError, Wei, ETHER_DECIMALS, WEI_PER_ETHER,
};
pub use event::{Event, LogEntry, TransactionId};
pub use state::{
    unix_now, CallError, CallReceiver, ChainState, Checkpoint, IncomingCall, StateError,
};

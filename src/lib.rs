//! GSN Multisig: multi-signature wallets with a daily withdrawal limit
//!
//! This crate provides:
//! - M-of-N owner wallets with confirmation, revocation and execution
//! - A daily allowance that lets plain withdrawals execute on one confirmation
//! - Owner and policy management through the wallet's own transactions
//! - A factory that deploys wallets and tracks them per creator
//! - Relayed-call admission for meta transactions
//! - A devnet host with balances, a controllable clock and an event log
//! - JSON persistence, a CLI and a REST/WebSocket API
//!
//! # Example
//!
//! ```rust
//! use gsn_multisig::core::{ether, Address, ChainState};
//! use gsn_multisig::multisig::{ExecutionOutcome, MultisigConfig, Payload, WalletFactory};
//!
//! let alice = Address::from_seed("alice");
//! let bob = Address::from_seed("bob");
//! let carol = Address::from_seed("carol");
//!
//! let mut state = ChainState::new();
//! state.mint(&alice, ether(10)).unwrap();
//!
//! // Deploy a 2-of-2 wallet with a 3 ether daily limit
//! let mut factory = WalletFactory::new(Address::from_seed("factory"), "Factory", "MSF");
//! let config = MultisigConfig::new(vec![alice, bob], 2, Some(ether(3)));
//! let address = factory.create(&mut state, alice, config).unwrap();
//!
//! let wallet = factory.wallet_mut(&address).unwrap();
//! wallet.deposit(&mut state, alice, ether(5)).unwrap();
//!
//! // Within the daily limit: one confirmation is enough
//! let (_, outcome) = wallet
//!     .submit_transaction(&mut state, bob, carol, ether(1), Payload::None)
//!     .unwrap();
//! assert_eq!(outcome, ExecutionOutcome::Executed);
//! assert_eq!(state.balance_of(&carol), ether(1));
//! ```

pub mod api;
pub mod cli;
pub mod core;
pub mod crypto;
pub mod multisig;
pub mod storage;

// Re-export commonly used types
pub use api::{create_router, ApiState};
pub use core::{Address, ChainState, Event, LogEntry, Wei};
pub use multisig::{
    ExecutionOutcome, MultisigConfig, MultisigError, MultisigWallet, Payload, WalletCommand,
    WalletFactory,
};
pub use storage::{Storage, StorageConfig};

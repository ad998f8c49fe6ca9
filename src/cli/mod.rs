//! Command-line interface
//!
//! Handlers behind the `multisig` binary. Accounts and wallets can be named
//! by hex address or by a seed name such as `alice`.

pub mod commands;

pub use commands::*;

//! Multi-signature wallets with a daily limit
//!
//! Provides M-of-N wallets where M confirmations from N owners are
//! required to execute a transaction. Plain value transfers within the
//! wallet's daily allowance execute on a single confirmation.
//!
//! # Example
//!
//! ```ignore
//! use gsn_multisig::core::{ether, ChainState};
//! use gsn_multisig::multisig::{MultisigConfig, Payload, WalletFactory};
//!
//! // Deploy a 2-of-2 wallet with a 3 ether daily limit
//! let config = MultisigConfig::new(vec![alice, bob], 2, Some(ether(3)));
//! let address = factory.create(&mut state, alice, config)?;
//! let wallet = factory.wallet_mut(&address)?;
//!
//! // Fund it and withdraw within the limit: executes immediately
//! wallet.deposit(&mut state, alice, ether(10))?;
//! let (id, outcome) = wallet.submit_transaction(&mut state, bob, carol, ether(1), Payload::None)?;
//!
//! // Anything larger waits for the second owner
//! let (id, _) = wallet.submit_transaction(&mut state, alice, carol, ether(5), Payload::None)?;
//! wallet.confirm_transaction(&mut state, bob, id)?;
//! ```

pub mod command;
pub mod daily_limit;
pub mod factory;
pub mod owners;
pub mod relay;
pub mod transaction;
pub mod wallet;

pub use command::{Payload, WalletCommand};
pub use daily_limit::{DailyLimitTracker, ONE_DAY};
pub use factory::WalletFactory;
pub use owners::{OwnerSet, MAX_OWNER_COUNT};
pub use relay::{
    CallOrigin, RelayAcceptance, RelayRecipient, RelayRequest, DEFAULT_RELAY_HUB, RELAY_ACCEPTED,
};
pub use transaction::{Transaction, TransactionLedger, TransactionStatus};
pub use wallet::{ExecutionOutcome, MultisigConfig, MultisigError, MultisigWallet};

//! Chain state hosting the wallets
//!
//! Holds native balances, the block clock, the event log and the code
//! registered at external addresses. Wallets run against a `ChainState`
//! the way contracts run against the ledger of the chain they live on.

use crate::core::address::Address;
use crate::core::amount::Wei;
use crate::core::event::{Event, LogEntry};
use crate::multisig::MultisigWallet;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use thiserror::Error;

/// Current system time in unix seconds
pub fn unix_now() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or_default()
}

/// Errors raised by balance and clock operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("Insufficient balance for {address}: have {have}, need {need}")]
    InsufficientBalance {
        address: Address,
        have: Wei,
        need: Wei,
    },
    #[error("Balance overflow for {0}")]
    BalanceOverflow(Address),
    #[error("Clock cannot move backwards: now {current}, requested {requested}")]
    ClockWentBackwards { current: u64, requested: u64 },
}

/// Why an outgoing call from a wallet failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    #[error("Transfer failed: {0}")]
    Transfer(#[from] StateError),
    #[error("Call reverted: {0}")]
    Reverted(String),
}

/// A value transfer or call arriving at an external address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingCall {
    pub from: Address,
    pub to: Address,
    pub value: Wei,
    pub data: Vec<u8>,
}

/// Code deployed at an external address
///
/// Runs after the value of the call has been credited. Returning an error
/// reverts the call. The calling wallet is handed over so the receiver can
/// call back into it.
pub trait CallReceiver: Send + Sync {
    fn on_call(
        &mut self,
        state: &mut ChainState,
        wallet: &mut MultisigWallet,
        call: &IncomingCall,
    ) -> Result<(), String>;
}

/// Saved balances and log position used to roll back a failed call
#[derive(Debug, Clone)]
pub struct Checkpoint {
    balances: BTreeMap<Address, Wei>,
    nonces: BTreeMap<Address, u64>,
    events_len: usize,
}

/// Balances, clock, nonces and event log
#[derive(Default, Serialize, Deserialize)]
pub struct ChainState {
    /// Native balances by address
    balances: BTreeMap<Address, Wei>,
    /// Contract creation nonces by deployer
    nonces: BTreeMap<Address, u64>,
    /// Current block timestamp (seconds)
    timestamp: u64,
    /// Total time added on top of the system clock
    time_offset: u64,
    /// Every event emitted so far
    events: Vec<LogEntry>,
    /// Receivers are process-local and not persisted
    #[serde(skip)]
    receivers: HashMap<Address, Box<dyn CallReceiver>>,
}

impl fmt::Debug for ChainState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainState")
            .field("accounts", &self.balances.len())
            .field("timestamp", &self.timestamp)
            .field("time_offset", &self.time_offset)
            .field("events", &self.events.len())
            .field("receivers", &self.receivers.len())
            .finish()
    }
}

impl ChainState {
    /// Create an empty state at timestamp zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty state starting at `timestamp`
    pub fn with_timestamp(timestamp: u64) -> Self {
        Self {
            timestamp,
            ..Self::default()
        }
    }

    // =========================================================================
    // Clock
    // =========================================================================

    /// Current block timestamp
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Seconds added through [`ChainState::advance_time`]
    pub fn time_offset(&self) -> u64 {
        self.time_offset
    }

    /// Move the clock forward
    pub fn advance_time(&mut self, seconds: u64) {
        self.timestamp = self.timestamp.saturating_add(seconds);
        self.time_offset = self.time_offset.saturating_add(seconds);
    }

    /// Jump the clock to an absolute timestamp
    pub fn set_timestamp(&mut self, timestamp: u64) -> Result<(), StateError> {
        if timestamp < self.timestamp {
            return Err(StateError::ClockWentBackwards {
                current: self.timestamp,
                requested: timestamp,
            });
        }
        self.timestamp = timestamp;
        Ok(())
    }

    /// The timestamp [`ChainState::sync_clock`] would move to, without moving it
    pub fn synced_timestamp(&self, system_now: u64) -> u64 {
        self.timestamp
            .max(system_now.saturating_add(self.time_offset))
    }

    /// Catch up with the system clock, keeping any advanced time
    pub fn sync_clock(&mut self, system_now: u64) {
        self.timestamp = self.synced_timestamp(system_now);
    }

    // =========================================================================
    // Balances
    // =========================================================================

    /// Balance of an address
    pub fn balance_of(&self, address: &Address) -> Wei {
        self.balances.get(address).copied().unwrap_or(0)
    }

    /// Credit new value to an address
    pub fn mint(&mut self, address: &Address, amount: Wei) -> Result<Wei, StateError> {
        let balance = self
            .balance_of(address)
            .checked_add(amount)
            .ok_or(StateError::BalanceOverflow(*address))?;
        self.balances.insert(*address, balance);
        Ok(balance)
    }

    /// Move value between two addresses
    pub fn transfer(&mut self, from: &Address, to: &Address, amount: Wei) -> Result<(), StateError> {
        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return Err(StateError::InsufficientBalance {
                address: *from,
                have: from_balance,
                need: amount,
            });
        }
        if from == to || amount == 0 {
            return Ok(());
        }

        let to_balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(StateError::BalanceOverflow(*to))?;
        self.balances.insert(*from, from_balance - amount);
        self.balances.insert(*to, to_balance);
        Ok(())
    }

    /// All addresses with a non-zero balance
    pub fn accounts(&self) -> Vec<(Address, Wei)> {
        self.balances
            .iter()
            .filter(|(_, &balance)| balance > 0)
            .map(|(address, balance)| (*address, *balance))
            .collect()
    }

    // =========================================================================
    // Contract creation
    // =========================================================================

    /// Derive the next contract address for `deployer` and bump its nonce
    pub fn create_address(&mut self, deployer: &Address) -> Address {
        let nonce = self.nonces.entry(*deployer).or_insert(0);
        let address = Address::derive(deployer, *nonce);
        *nonce += 1;
        address
    }

    // =========================================================================
    // Event log
    // =========================================================================

    /// Append an event to the log
    pub fn emit(&mut self, emitter: Address, event: Event) {
        log::debug!("{} emitted {}", emitter.short(), event.name());
        self.events.push(LogEntry {
            emitter,
            timestamp: self.timestamp,
            event,
        });
    }

    /// The full event log
    pub fn events(&self) -> &[LogEntry] {
        &self.events
    }

    /// Entries appended after position `mark`
    pub fn events_since(&self, mark: usize) -> &[LogEntry] {
        &self.events[mark.min(self.events.len())..]
    }

    /// Entries emitted by one contract
    pub fn events_for(&self, emitter: &Address) -> Vec<&LogEntry> {
        self.events
            .iter()
            .filter(|entry| entry.emitter == *emitter)
            .collect()
    }

    // =========================================================================
    // External calls
    // =========================================================================

    /// Install code at an address
    pub fn register_receiver(&mut self, address: Address, receiver: Box<dyn CallReceiver>) {
        self.receivers.insert(address, receiver);
    }

    /// Whether code is installed at an address
    pub fn has_receiver(&self, address: &Address) -> bool {
        self.receivers.contains_key(address)
    }

    /// Capture balances and log position
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            balances: self.balances.clone(),
            nonces: self.nonces.clone(),
            events_len: self.events.len(),
        }
    }

    /// Restore balances and truncate the log to a checkpoint
    pub fn revert_to(&mut self, checkpoint: Checkpoint) {
        self.balances = checkpoint.balances;
        self.nonces = checkpoint.nonces;
        self.events.truncate(checkpoint.events_len);
    }

    /// Send value and data from a wallet to an external address
    ///
    /// The receiver at the destination is taken out for the duration of its
    /// own call, so a nested call to the same address is a plain transfer.
    /// The caller is responsible for reverting to a checkpoint on failure.
    pub fn call(&mut self, wallet: &mut MultisigWallet, call: IncomingCall) -> Result<(), CallError> {
        self.transfer(&call.from, &call.to, call.value)?;

        if let Some(mut receiver) = self.receivers.remove(&call.to) {
            let result = receiver.on_call(self, wallet, &call);
            self.receivers.entry(call.to).or_insert(receiver);
            result.map_err(CallError::Reverted)?;
        }

        Ok(())
    }
}

//! Multi-signature wallet implementation
//!
//! Owners submit transactions which execute once enough owners have
//! confirmed them. A wallet may carry a daily limit: plain value transfers
//! that fit in the remaining allowance execute on the first confirmation.

use crate::core::{
    Address, CallError, ChainState, Event, IncomingCall, StateError, TransactionId, Wei,
};
use crate::multisig::command::{Payload, WalletCommand};
use crate::multisig::daily_limit::DailyLimitTracker;
use crate::multisig::owners::OwnerSet;
use crate::multisig::relay::DEFAULT_RELAY_HUB;
use crate::multisig::transaction::{Transaction, TransactionLedger, TransactionStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors related to multisig operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MultisigError {
    #[error("Not an owner: {0}")]
    NotOwner(Address),
    #[error("Only the wallet itself may call this, not {0}")]
    OnlyWallet(Address),
    #[error("Only the relay hub may call this, not {0}")]
    NotRelayHub(Address),
    #[error("Relayed call rejected with status {0}")]
    RelayRejected(u64),
    #[error("Unknown transaction: {0}")]
    UnknownTransaction(TransactionId),
    #[error("Transaction ledger is full")]
    LedgerFull,
    #[error("Transaction {0} already confirmed by this owner")]
    AlreadyConfirmed(TransactionId),
    #[error("Transaction {0} not confirmed by this owner")]
    NotConfirmed(TransactionId),
    #[error("Transaction {0} already executed")]
    AlreadyExecuted(TransactionId),
    #[error("Invalid requirement: {required} of {owner_count} owners")]
    InvalidRequirement { required: usize, owner_count: usize },
    #[error("Duplicate owner: {0}")]
    DuplicateOwner(Address),
    #[error("Null address not allowed")]
    NullAddress,
    #[error("Daily limit exceeded: requested {requested}, available {available}")]
    LimitExceeded { requested: Wei, available: Wei },
    #[error("External call failed: {0}")]
    ExternalCallFailed(#[from] CallError),
    #[error("Wallet has no daily limit")]
    NoDailyLimit,
    #[error("Invalid command: {0}")]
    InvalidCommand(String),
    #[error("Invalid range: {from}..{to}")]
    InvalidRange { from: usize, to: usize },
    #[error("State error: {0}")]
    State(#[from] StateError),
    #[error("Wallet not found: {0}")]
    WalletNotFound(Address),
}

/// Configuration for a multisig wallet
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MultisigConfig {
    /// Initial owners
    pub owners: Vec<Address>,
    /// Confirmations required to execute
    pub required: usize,
    /// Daily allowance, `None` for a plain multisig
    pub daily_limit: Option<Wei>,
    /// Optional human-readable label
    pub label: Option<String>,
}

impl MultisigConfig {
    pub fn new(owners: Vec<Address>, required: usize, daily_limit: Option<Wei>) -> Self {
        Self {
            owners,
            required,
            daily_limit,
            label: None,
        }
    }

    /// Attach a label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Get description like "2-of-3"
    pub fn description(&self) -> String {
        format!("{}-of-{}", self.required, self.owners.len())
    }
}

/// Result of an execution attempt
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum ExecutionOutcome {
    /// The transaction executed
    Executed,
    /// Not enough confirmations and not covered by the daily limit
    Pending,
    /// The call failed and was rolled back; the transaction stays unexecuted
    Failed(String),
}

impl ExecutionOutcome {
    pub fn is_executed(&self) -> bool {
        matches!(self, ExecutionOutcome::Executed)
    }
}

/// A multi-signature wallet
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MultisigWallet {
    address: Address,
    owners: OwnerSet,
    ledger: TransactionLedger,
    daily_limit: Option<DailyLimitTracker>,
    relay_hub: Address,
    label: Option<String>,
    created_at: DateTime<Utc>,
}

impl MultisigWallet {
    /// Create a wallet living at `address`
    ///
    /// # Errors
    /// Returns error if the owner list or requirement is invalid
    pub fn new(address: Address, config: MultisigConfig) -> Result<Self, MultisigError> {
        if address.is_zero() {
            return Err(MultisigError::NullAddress);
        }
        let owners = OwnerSet::new(config.owners, config.required)?;

        Ok(Self {
            address,
            owners,
            ledger: TransactionLedger::new(),
            daily_limit: config.daily_limit.map(DailyLimitTracker::new),
            relay_hub: DEFAULT_RELAY_HUB,
            label: config.label,
            created_at: Utc::now(),
        })
    }

    /// Trust a different relay hub
    pub fn with_relay_hub(mut self, hub: Address) -> Self {
        self.relay_hub = hub;
        self
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The relay hub whose forwarded calls act as the original signer
    pub fn relay_hub(&self) -> Address {
        self.relay_hub
    }

    // =========================================================================
    // Owners
    // =========================================================================

    pub fn owners(&self) -> &[Address] {
        self.owners.owners()
    }

    pub fn is_owner(&self, address: &Address) -> bool {
        self.owners.is_owner(address)
    }

    /// Confirmations required to execute
    pub fn required(&self) -> usize {
        self.owners.required()
    }

    /// Get human-readable description
    pub fn description(&self) -> String {
        self.owners.description()
    }

    // =========================================================================
    // Daily limit
    // =========================================================================

    /// Configured daily limit, `None` for a plain multisig
    pub fn daily_limit(&self) -> Option<Wei> {
        self.daily_limit.as_ref().map(DailyLimitTracker::limit)
    }

    pub fn daily_limit_tracker(&self) -> Option<&DailyLimitTracker> {
        self.daily_limit.as_ref()
    }

    /// Amount withdrawable today without further confirmations
    pub fn calc_max_withdraw(&self, now: u64) -> Wei {
        self.daily_limit
            .as_ref()
            .map_or(0, |tracker| tracker.calc_max_withdraw(now))
    }

    // =========================================================================
    // Deposits
    // =========================================================================

    /// Receive native value from `sender`
    pub fn deposit(
        &self,
        state: &mut ChainState,
        sender: Address,
        value: Wei,
    ) -> Result<(), MultisigError> {
        state.transfer(&sender, &self.address, value)?;
        if value > 0 {
            state.emit(self.address, Event::Deposit { sender, value });
        }
        Ok(())
    }

    // =========================================================================
    // Transaction lifecycle
    // =========================================================================

    /// Submit a transaction and confirm it on behalf of the submitter
    ///
    /// Execution is attempted right away; its outcome never fails the submission.
    pub fn submit_transaction(
        &mut self,
        state: &mut ChainState,
        caller: Address,
        destination: Address,
        value: Wei,
        payload: Payload,
    ) -> Result<(TransactionId, ExecutionOutcome), MultisigError> {
        self.only_owner(caller)?;
        if destination.is_zero() {
            return Err(MultisigError::NullAddress);
        }

        let id = self.ledger.add(Transaction::new(
            destination,
            value,
            payload,
            state.timestamp(),
        ))?;
        state.emit(self.address, Event::Submission { transaction_id: id });
        log::info!(
            "Wallet {}: transaction {} submitted by {} ({} wei to {})",
            self.address.short(),
            id,
            caller.short(),
            value,
            destination.short()
        );

        let outcome = self.confirm_transaction(state, caller, id)?;
        Ok((id, outcome))
    }

    /// Confirm a transaction and execute it if possible
    pub fn confirm_transaction(
        &mut self,
        state: &mut ChainState,
        caller: Address,
        id: TransactionId,
    ) -> Result<ExecutionOutcome, MultisigError> {
        self.only_owner(caller)?;
        let executed = self.ledger.get(id)?.executed;
        if self.ledger.is_confirmed_by(id, &caller) {
            return Err(MultisigError::AlreadyConfirmed(id));
        }
        if executed {
            return Err(MultisigError::AlreadyExecuted(id));
        }

        self.ledger.confirm(id, caller)?;
        state.emit(
            self.address,
            Event::Confirmation {
                sender: caller,
                transaction_id: id,
            },
        );
        log::debug!(
            "Wallet {}: transaction {} confirmed by {}",
            self.address.short(),
            id,
            caller.short()
        );

        self.try_execute(state, id)
    }

    /// Withdraw a confirmation from a transaction that has not executed
    pub fn revoke_confirmation(
        &mut self,
        state: &mut ChainState,
        caller: Address,
        id: TransactionId,
    ) -> Result<(), MultisigError> {
        self.only_owner(caller)?;
        let executed = self.ledger.get(id)?.executed;
        if !self.ledger.is_confirmed_by(id, &caller) {
            return Err(MultisigError::NotConfirmed(id));
        }
        if executed {
            return Err(MultisigError::AlreadyExecuted(id));
        }

        self.ledger.revoke(id, &caller)?;
        state.emit(
            self.address,
            Event::Revocation {
                sender: caller,
                transaction_id: id,
            },
        );
        log::debug!(
            "Wallet {}: {} revoked confirmation of transaction {}",
            self.address.short(),
            caller.short(),
            id
        );
        Ok(())
    }

    /// Retry execution of a transaction the caller has confirmed
    pub fn execute_transaction(
        &mut self,
        state: &mut ChainState,
        caller: Address,
        id: TransactionId,
    ) -> Result<ExecutionOutcome, MultisigError> {
        self.only_owner(caller)?;
        let executed = self.ledger.get(id)?.executed;
        if !self.ledger.is_confirmed_by(id, &caller) {
            return Err(MultisigError::NotConfirmed(id));
        }
        if executed {
            return Err(MultisigError::AlreadyExecuted(id));
        }

        self.try_execute(state, id)
    }

    /// Execute if confirmed, or if a plain transfer fits the daily limit
    fn try_execute(
        &mut self,
        state: &mut ChainState,
        id: TransactionId,
    ) -> Result<ExecutionOutcome, MultisigError> {
        let transaction = self.ledger.get(id)?.clone();
        if transaction.executed {
            return Err(MultisigError::AlreadyExecuted(id));
        }

        let now = state.timestamp();
        let confirmed = self.is_confirmed(id);
        let under_limit = transaction.payload.is_empty()
            && self
                .daily_limit
                .as_ref()
                .is_some_and(|tracker| tracker.is_under_limit(transaction.value, now));
        if !confirmed && !under_limit {
            return Ok(ExecutionOutcome::Pending);
        }

        let data = transaction.payload.to_bytes()?;
        let snapshot = self.clone();
        let checkpoint = state.checkpoint();

        // Commit before any external effect so a re-entrant call sees the
        // transaction as executed
        if !confirmed {
            if let Some(tracker) = self.daily_limit.as_mut() {
                tracker.record_spend(transaction.value, now)?;
            }
        }
        self.ledger.set_executed(id, true)?;

        let result = if transaction.destination == self.address {
            self.apply_internal(state, &transaction)
        } else {
            let call = IncomingCall {
                from: self.address,
                to: transaction.destination,
                value: transaction.value,
                data,
            };
            state.call(self, call).map_err(MultisigError::from)
        };

        match result {
            Ok(()) => {
                state.emit(self.address, Event::Execution { transaction_id: id });
                log::info!(
                    "Wallet {}: transaction {} executed",
                    self.address.short(),
                    id
                );
                Ok(ExecutionOutcome::Executed)
            }
            Err(err) => {
                *self = snapshot;
                state.revert_to(checkpoint);
                state.emit(self.address, Event::ExecutionFailure { transaction_id: id });
                log::warn!(
                    "Wallet {}: transaction {} failed: {}",
                    self.address.short(),
                    id,
                    err
                );
                Ok(ExecutionOutcome::Failed(err.to_string()))
            }
        }
    }

    /// Run a transaction addressed to the wallet itself
    fn apply_internal(
        &mut self,
        state: &mut ChainState,
        transaction: &Transaction,
    ) -> Result<(), MultisigError> {
        state.transfer(&self.address, &self.address, transaction.value)?;

        if transaction.payload.is_empty() {
            if transaction.value > 0 {
                state.emit(
                    self.address,
                    Event::Deposit {
                        sender: self.address,
                        value: transaction.value,
                    },
                );
            }
            return Ok(());
        }

        let command = transaction.payload.command()?;
        log::debug!(
            "Wallet {}: dispatching {}",
            self.address.short(),
            command.name()
        );
        self.apply_command(state, command)
    }

    fn apply_command(
        &mut self,
        state: &mut ChainState,
        command: WalletCommand,
    ) -> Result<(), MultisigError> {
        let caller = self.address;
        match command {
            WalletCommand::AddOwner { owner } => self.add_owner(state, caller, owner),
            WalletCommand::RemoveOwner { owner } => self.remove_owner(state, caller, owner),
            WalletCommand::ReplaceOwner { owner, new_owner } => {
                self.replace_owner(state, caller, owner, new_owner)
            }
            WalletCommand::ChangeRequirement { required } => {
                self.change_requirement(state, caller, required)
            }
            WalletCommand::ChangeDailyLimit { daily_limit } => {
                self.change_daily_limit(state, caller, daily_limit)
            }
        }
    }

    // =========================================================================
    // Self-management (callable only by the wallet)
    // =========================================================================

    pub fn add_owner(
        &mut self,
        state: &mut ChainState,
        caller: Address,
        owner: Address,
    ) -> Result<(), MultisigError> {
        self.only_wallet(caller)?;
        self.owners.add(owner)?;
        state.emit(self.address, Event::OwnerAddition { owner });
        log::info!("Wallet {}: owner {} added", self.address.short(), owner);
        Ok(())
    }

    /// Remove an owner, lowering the requirement if it no longer fits
    pub fn remove_owner(
        &mut self,
        state: &mut ChainState,
        caller: Address,
        owner: Address,
    ) -> Result<(), MultisigError> {
        self.only_wallet(caller)?;
        if let Some(required) = self.owners.remove(&owner)? {
            state.emit(self.address, Event::RequirementChange { required });
        }
        state.emit(self.address, Event::OwnerRemoval { owner });
        log::info!("Wallet {}: owner {} removed", self.address.short(), owner);
        Ok(())
    }

    pub fn replace_owner(
        &mut self,
        state: &mut ChainState,
        caller: Address,
        owner: Address,
        new_owner: Address,
    ) -> Result<(), MultisigError> {
        self.only_wallet(caller)?;
        self.owners.replace(&owner, new_owner)?;
        state.emit(self.address, Event::OwnerRemoval { owner });
        state.emit(self.address, Event::OwnerAddition { owner: new_owner });
        log::info!(
            "Wallet {}: owner {} replaced by {}",
            self.address.short(),
            owner,
            new_owner
        );
        Ok(())
    }

    pub fn change_requirement(
        &mut self,
        state: &mut ChainState,
        caller: Address,
        required: usize,
    ) -> Result<(), MultisigError> {
        self.only_wallet(caller)?;
        self.owners.change_requirement(required)?;
        state.emit(self.address, Event::RequirementChange { required });
        log::info!(
            "Wallet {}: requirement changed to {}",
            self.address.short(),
            self.owners.description()
        );
        Ok(())
    }

    /// Change the daily limit; what was spent today still counts
    pub fn change_daily_limit(
        &mut self,
        state: &mut ChainState,
        caller: Address,
        daily_limit: Wei,
    ) -> Result<(), MultisigError> {
        self.only_wallet(caller)?;
        let tracker = self
            .daily_limit
            .as_mut()
            .ok_or(MultisigError::NoDailyLimit)?;
        tracker.change_limit(daily_limit);
        state.emit(self.address, Event::DailyLimitChange { daily_limit });
        log::info!(
            "Wallet {}: daily limit changed to {} wei",
            self.address.short(),
            daily_limit
        );
        Ok(())
    }

    // =========================================================================
    // Views
    // =========================================================================

    pub fn transaction(&self, id: TransactionId) -> Result<&Transaction, MultisigError> {
        self.ledger.get(id)
    }

    /// All transactions with their ids
    pub fn transactions(&self) -> impl Iterator<Item = (TransactionId, &Transaction)> {
        self.ledger.iter()
    }

    pub fn status(&self, id: TransactionId) -> Result<TransactionStatus, MultisigError> {
        let transaction = self.ledger.get(id)?;
        Ok(if transaction.executed {
            TransactionStatus::Executed
        } else if self.is_confirmed(id) {
            TransactionStatus::Confirmed
        } else {
            TransactionStatus::Pending
        })
    }

    /// Whether enough current owners confirmed
    pub fn is_confirmed(&self, id: TransactionId) -> bool {
        self.ledger
            .confirmation_count(id, &self.owners)
            .is_ok_and(|count| count >= self.owners.required())
    }

    pub fn confirmation_count(&self, id: TransactionId) -> Result<usize, MultisigError> {
        self.ledger.confirmation_count(id, &self.owners)
    }

    /// Current owners that confirmed, in owner order
    pub fn confirmations(&self, id: TransactionId) -> Result<Vec<Address>, MultisigError> {
        self.ledger.confirmations(id, &self.owners)
    }

    pub fn transaction_count(&self, pending: bool, executed: bool) -> usize {
        self.ledger.count(pending, executed)
    }

    /// Ids at positions `[from, to)` of the transactions matching the filter
    pub fn transaction_ids(
        &self,
        from: usize,
        to: usize,
        pending: bool,
        executed: bool,
    ) -> Result<Vec<TransactionId>, MultisigError> {
        self.ledger.ids(from, to, pending, executed)
    }

    // =========================================================================
    // Guards
    // =========================================================================

    fn only_owner(&self, caller: Address) -> Result<(), MultisigError> {
        if !self.owners.is_owner(&caller) {
            return Err(MultisigError::NotOwner(caller));
        }
        Ok(())
    }

    fn only_wallet(&self, caller: Address) -> Result<(), MultisigError> {
        if caller != self.address {
            return Err(MultisigError::OnlyWallet(caller));
        }
        Ok(())
    }

    pub(crate) fn only_relay_hub(&self, caller: Address) -> Result<(), MultisigError> {
        if caller != self.relay_hub {
            return Err(MultisigError::NotRelayHub(caller));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ether, CallReceiver, WEI_PER_ETHER};
    use crate::multisig::daily_limit::ONE_DAY;
    use std::sync::{Arc, Mutex};

    const START: u64 = 1_700_000_000;

    struct Setup {
        state: ChainState,
        wallet: MultisigWallet,
        owners: Vec<Address>,
    }

    fn setup(owner_count: usize, required: usize, daily_limit: Option<Wei>, deposit: Wei) -> Setup {
        let mut state = ChainState::with_timestamp(START);
        let owners: Vec<Address> = (0..owner_count)
            .map(|i| Address::from_seed(&format!("account-{}", i)))
            .collect();
        for owner in &owners {
            state.mint(owner, ether(100)).unwrap();
        }

        let config = MultisigConfig::new(owners.clone(), required, daily_limit);
        let wallet = MultisigWallet::new(Address::from_seed("wallet"), config).unwrap();
        wallet.deposit(&mut state, owners[0], deposit).unwrap();

        Setup {
            state,
            wallet,
            owners,
        }
    }

    fn event_names(state: &ChainState, wallet: &MultisigWallet) -> Vec<&'static str> {
        state
            .events_for(&wallet.address())
            .iter()
            .map(|entry| entry.event.name())
            .collect()
    }

    fn command(command: WalletCommand) -> Payload {
        Payload::Command(command)
    }

    // =========================================================================
    // Construction and deposits
    // =========================================================================

    #[test]
    fn test_create_wallet_with_daily_limit() {
        let s = setup(2, 2, Some(ether(3)), ether(10));

        assert_eq!(s.wallet.daily_limit(), Some(ether(3)));
        assert_eq!(s.wallet.calc_max_withdraw(s.state.timestamp()), ether(3));
        assert_eq!(s.wallet.required(), 2);
        assert_eq!(s.wallet.description(), "2-of-2");
        assert_eq!(s.wallet.relay_hub(), DEFAULT_RELAY_HUB);
    }

    #[test]
    fn test_create_wallet_validation() {
        let owners = vec![Address::from_seed("a"), Address::from_seed("b")];
        let wallet = Address::from_seed("wallet");

        assert!(MultisigWallet::new(wallet, MultisigConfig::new(owners.clone(), 3, None)).is_err());
        assert!(MultisigWallet::new(wallet, MultisigConfig::new(owners.clone(), 0, None)).is_err());
        assert!(MultisigWallet::new(wallet, MultisigConfig::new(vec![], 1, None)).is_err());
        assert!(matches!(
            MultisigWallet::new(Address::ZERO, MultisigConfig::new(owners, 1, None)),
            Err(MultisigError::NullAddress)
        ));
    }

    #[test]
    fn test_receive_deposits() {
        let s = setup(2, 2, Some(ether(3)), ether(10));

        assert_eq!(s.state.balance_of(&s.wallet.address()), ether(10));
        assert_eq!(s.state.balance_of(&s.owners[0]), ether(90));
        assert_eq!(event_names(&s.state, &s.wallet), vec!["Deposit"]);
    }

    #[test]
    fn test_zero_deposit_emits_nothing() {
        let mut s = setup(2, 1, None, 0);
        s.wallet.deposit(&mut s.state, s.owners[1], 0).unwrap();
        assert!(s.state.events().is_empty());
    }

    #[test]
    fn test_deposit_more_than_balance_fails() {
        let mut s = setup(2, 1, None, 0);
        assert!(matches!(
            s.wallet.deposit(&mut s.state, s.owners[1], ether(1000)),
            Err(MultisigError::State(StateError::InsufficientBalance { .. }))
        ));
    }

    // =========================================================================
    // Plain multisig
    // =========================================================================

    #[test]
    fn test_fail_execution_of_transaction() {
        let mut s = setup(2, 1, None, ether(1));
        let recipient = Address::from_seed("account-4");

        let (id, outcome) = s
            .wallet
            .submit_transaction(&mut s.state, s.owners[0], recipient, ether(1000), Payload::None)
            .unwrap();

        assert!(matches!(outcome, ExecutionOutcome::Failed(_)));
        assert!(!s.wallet.transaction(id).unwrap().executed);
        assert_eq!(s.wallet.status(id).unwrap(), TransactionStatus::Confirmed);
        assert_eq!(s.state.balance_of(&s.wallet.address()), ether(1));
        assert_eq!(s.state.balance_of(&recipient), 0);
        assert_eq!(
            event_names(&s.state, &s.wallet),
            vec!["Deposit", "Submission", "Confirmation", "ExecutionFailure"]
        );
    }

    #[test]
    fn test_execute_transaction() {
        let mut s = setup(2, 1, None, ether(1));
        let recipient = Address::from_seed("account-4");

        let (id, outcome) = s
            .wallet
            .submit_transaction(
                &mut s.state,
                s.owners[0],
                recipient,
                WEI_PER_ETHER / 10,
                Payload::None,
            )
            .unwrap();

        assert_eq!(outcome, ExecutionOutcome::Executed);
        assert!(s.wallet.transaction(id).unwrap().executed);
        assert_eq!(s.state.balance_of(&recipient), WEI_PER_ETHER / 10);
        assert_eq!(
            event_names(&s.state, &s.wallet),
            vec!["Deposit", "Submission", "Confirmation", "Execution"]
        );
    }

    #[test]
    fn test_failed_transaction_can_be_retried() {
        let mut s = setup(2, 1, None, ether(1));
        let recipient = Address::from_seed("account-4");

        let (id, _) = s
            .wallet
            .submit_transaction(&mut s.state, s.owners[0], recipient, ether(5), Payload::None)
            .unwrap();
        assert!(!s.wallet.transaction(id).unwrap().executed);

        s.wallet.deposit(&mut s.state, s.owners[1], ether(10)).unwrap();
        let outcome = s
            .wallet
            .execute_transaction(&mut s.state, s.owners[0], id)
            .unwrap();

        assert_eq!(outcome, ExecutionOutcome::Executed);
        assert_eq!(s.state.balance_of(&recipient), ether(5));
        assert_eq!(s.state.balance_of(&s.wallet.address()), ether(6));
    }

    #[test]
    fn test_without_daily_limit_transfers_need_threshold() {
        let mut s = setup(2, 2, None, ether(10));
        let recipient = Address::from_seed("recipient");

        assert_eq!(s.wallet.daily_limit(), None);
        assert_eq!(s.wallet.calc_max_withdraw(s.state.timestamp()), 0);

        let (id, outcome) = s
            .wallet
            .submit_transaction(&mut s.state, s.owners[0], recipient, 1, Payload::None)
            .unwrap();
        assert_eq!(outcome, ExecutionOutcome::Pending);
        assert_eq!(s.wallet.status(id).unwrap(), TransactionStatus::Pending);

        let outcome = s
            .wallet
            .confirm_transaction(&mut s.state, s.owners[1], id)
            .unwrap();
        assert_eq!(outcome, ExecutionOutcome::Executed);
        assert_eq!(s.wallet.status(id).unwrap(), TransactionStatus::Executed);
    }

    // =========================================================================
    // Daily limit
    // =========================================================================

    #[test]
    fn test_withdraw_below_daily_limit() {
        let mut s = setup(2, 2, Some(ether(3)), ether(10));
        let wallet = s.wallet.address();

        let (id, outcome) = s
            .wallet
            .submit_transaction(&mut s.state, s.owners[1], s.owners[0], ether(1), Payload::None)
            .unwrap();

        assert_eq!(outcome, ExecutionOutcome::Executed);
        assert_eq!(s.wallet.confirmation_count(id).unwrap(), 1);
        assert_eq!(s.state.balance_of(&s.owners[0]), ether(91));
        assert_eq!(s.state.balance_of(&wallet), ether(9));
        assert_eq!(s.wallet.calc_max_withdraw(s.state.timestamp()), ether(2));
    }

    #[test]
    fn test_update_daily_limit() {
        let mut s = setup(2, 2, Some(ether(3)), ether(10));
        let wallet = s.wallet.address();

        s.wallet
            .submit_transaction(&mut s.state, s.owners[1], s.owners[0], ether(2), Payload::None)
            .unwrap();

        let payload = command(WalletCommand::ChangeDailyLimit {
            daily_limit: ether(2),
        });
        let (id, outcome) = s
            .wallet
            .submit_transaction(&mut s.state, s.owners[0], wallet, 0, payload)
            .unwrap();
        assert_eq!(outcome, ExecutionOutcome::Pending);

        let outcome = s
            .wallet
            .confirm_transaction(&mut s.state, s.owners[1], id)
            .unwrap();
        assert_eq!(outcome, ExecutionOutcome::Executed);
        assert_eq!(s.wallet.daily_limit(), Some(ether(2)));
        assert_eq!(s.wallet.calc_max_withdraw(s.state.timestamp()), 0);

        s.state.advance_time(ONE_DAY + 1);
        assert_eq!(s.wallet.calc_max_withdraw(s.state.timestamp()), ether(2));
        assert!(event_names(&s.state, &s.wallet).contains(&"DailyLimitChange"));
    }

    #[test]
    fn test_withdrawal_with_call_data_waits_for_second_confirmation() {
        let mut s = setup(2, 2, Some(ether(3)), ether(10));
        let recipient = Address::from_seed("recipient");

        let (id, outcome) = s
            .wallet
            .submit_transaction(
                &mut s.state,
                s.owners[0],
                recipient,
                ether(2),
                Payload::Data(vec![0x01]),
            )
            .unwrap();
        assert_eq!(outcome, ExecutionOutcome::Pending);
        assert_eq!(s.state.balance_of(&recipient), 0);

        let outcome = s
            .wallet
            .confirm_transaction(&mut s.state, s.owners[1], id)
            .unwrap();
        assert_eq!(outcome, ExecutionOutcome::Executed);
        assert_eq!(s.state.balance_of(&recipient), ether(2));

        // Confirmed executions are not charged against the allowance
        let tracker = s.wallet.daily_limit_tracker().unwrap();
        assert_eq!(tracker.spent_today(), 0);
    }

    #[test]
    fn test_over_allowance_waits_for_second_confirmation() {
        let mut s = setup(2, 2, Some(ether(3)), ether(10));
        let recipient = Address::from_seed("recipient");

        let (id, outcome) = s
            .wallet
            .submit_transaction(&mut s.state, s.owners[0], recipient, ether(4), Payload::None)
            .unwrap();
        assert_eq!(outcome, ExecutionOutcome::Pending);

        s.wallet
            .confirm_transaction(&mut s.state, s.owners[1], id)
            .unwrap();
        assert!(s.wallet.transaction(id).unwrap().executed);
        assert_eq!(s.state.balance_of(&recipient), ether(4));
        assert_eq!(s.wallet.calc_max_withdraw(s.state.timestamp()), ether(3));
    }

    #[test]
    fn test_spent_limit_blocks_until_next_day() {
        let mut s = setup(2, 2, Some(ether(3)), ether(10));
        let recipient = Address::from_seed("recipient");
        let wallet = s.wallet.address();

        s.wallet
            .submit_transaction(&mut s.state, s.owners[0], recipient, ether(3), Payload::None)
            .unwrap();
        assert_eq!(s.wallet.calc_max_withdraw(s.state.timestamp()), 0);

        let (id, outcome) = s
            .wallet
            .submit_transaction(&mut s.state, s.owners[0], recipient, ether(1), Payload::None)
            .unwrap();
        assert_eq!(outcome, ExecutionOutcome::Pending);
        assert_eq!(s.state.balance_of(&wallet), ether(7));
        assert_eq!(s.state.balance_of(&recipient), ether(3));
        assert_eq!(s.wallet.calc_max_withdraw(s.state.timestamp()), 0);

        s.state.advance_time(ONE_DAY + 1);
        assert_eq!(s.wallet.calc_max_withdraw(s.state.timestamp()), ether(3));

        let outcome = s
            .wallet
            .execute_transaction(&mut s.state, s.owners[0], id)
            .unwrap();
        assert_eq!(outcome, ExecutionOutcome::Executed);
        assert_eq!(s.state.balance_of(&recipient), ether(4));
        assert_eq!(s.wallet.calc_max_withdraw(s.state.timestamp()), ether(2));
    }

    #[test]
    fn test_spent_never_exceeds_limit_within_window() {
        let mut s = setup(2, 2, Some(ether(3)), ether(10));
        let recipient = Address::from_seed("recipient");

        for _ in 0..5 {
            s.wallet
                .submit_transaction(&mut s.state, s.owners[0], recipient, ether(1), Payload::None)
                .unwrap();
            let tracker = s.wallet.daily_limit_tracker().unwrap();
            assert!(tracker.spent_today() <= tracker.limit());
        }

        assert_eq!(s.state.balance_of(&recipient), ether(3));
        assert_eq!(s.wallet.transaction_count(true, false), 2);
        assert_eq!(s.wallet.transaction_count(false, true), 3);
    }

    #[test]
    fn test_calc_max_withdraw_has_no_side_effects() {
        let mut s = setup(2, 2, Some(ether(3)), ether(10));
        s.wallet
            .submit_transaction(&mut s.state, s.owners[0], s.owners[1], ether(2), Payload::None)
            .unwrap();
        s.state.advance_time(ONE_DAY + 1);

        let before = s.wallet.daily_limit_tracker().cloned();
        for _ in 0..3 {
            assert_eq!(s.wallet.calc_max_withdraw(s.state.timestamp()), ether(3));
        }
        assert_eq!(s.wallet.daily_limit_tracker().cloned(), before);
    }

    // =========================================================================
    // Guards
    // =========================================================================

    #[test]
    fn test_submit_requires_owner() {
        let mut s = setup(2, 1, None, ether(1));
        let stranger = Address::from_seed("stranger");
        s.state.mint(&stranger, ether(1)).unwrap();

        assert!(matches!(
            s.wallet
                .submit_transaction(&mut s.state, stranger, stranger, 1, Payload::None),
            Err(MultisigError::NotOwner(_))
        ));
        assert!(matches!(
            s.wallet
                .submit_transaction(&mut s.state, s.owners[0], Address::ZERO, 1, Payload::None),
            Err(MultisigError::NullAddress)
        ));
        assert_eq!(s.wallet.transaction_count(true, true), 0);
    }

    #[test]
    fn test_confirm_guards() {
        let mut s = setup(3, 3, None, ether(1));
        let (id, _) = s
            .wallet
            .submit_transaction(&mut s.state, s.owners[0], s.owners[1], 1, Payload::None)
            .unwrap();

        assert!(matches!(
            s.wallet
                .confirm_transaction(&mut s.state, Address::from_seed("stranger"), id),
            Err(MultisigError::NotOwner(_))
        ));
        assert!(matches!(
            s.wallet.confirm_transaction(&mut s.state, s.owners[1], 99),
            Err(MultisigError::UnknownTransaction(99))
        ));
        assert!(matches!(
            s.wallet.confirm_transaction(&mut s.state, s.owners[0], id),
            Err(MultisigError::AlreadyConfirmed(_))
        ));
        assert_eq!(s.wallet.confirmation_count(id).unwrap(), 1);
    }

    #[test]
    fn test_confirm_executed_transaction_fails() {
        let mut s = setup(2, 1, None, ether(1));
        let (id, outcome) = s
            .wallet
            .submit_transaction(&mut s.state, s.owners[0], s.owners[1], 1, Payload::None)
            .unwrap();
        assert!(outcome.is_executed());

        assert!(matches!(
            s.wallet.confirm_transaction(&mut s.state, s.owners[1], id),
            Err(MultisigError::AlreadyExecuted(_))
        ));
        assert_eq!(s.wallet.confirmation_count(id).unwrap(), 1);
    }

    #[test]
    fn test_execute_requires_owner_and_own_confirmation() {
        let mut s = setup(2, 2, None, ether(1));
        let (id, _) = s
            .wallet
            .submit_transaction(&mut s.state, s.owners[0], s.owners[1], 1, Payload::None)
            .unwrap();

        assert!(matches!(
            s.wallet
                .execute_transaction(&mut s.state, Address::from_seed("stranger"), id),
            Err(MultisigError::NotOwner(_))
        ));
        assert!(matches!(
            s.wallet.execute_transaction(&mut s.state, s.owners[1], id),
            Err(MultisigError::NotConfirmed(_))
        ));
        assert!(matches!(
            s.wallet.execute_transaction(&mut s.state, s.owners[0], 7),
            Err(MultisigError::UnknownTransaction(7))
        ));

        // Confirmed by the caller but below threshold
        assert_eq!(
            s.wallet
                .execute_transaction(&mut s.state, s.owners[0], id)
                .unwrap(),
            ExecutionOutcome::Pending
        );
        assert!(!s.wallet.transaction(id).unwrap().executed);
    }

    #[test]
    fn test_revoke_confirmation() {
        let mut s = setup(2, 2, None, ether(1));
        let (id, _) = s
            .wallet
            .submit_transaction(&mut s.state, s.owners[0], s.owners[1], 1, Payload::None)
            .unwrap();

        s.wallet
            .revoke_confirmation(&mut s.state, s.owners[0], id)
            .unwrap();
        assert_eq!(s.wallet.confirmation_count(id).unwrap(), 0);
        assert!(matches!(
            s.wallet.revoke_confirmation(&mut s.state, s.owners[0], id),
            Err(MultisigError::NotConfirmed(_))
        ));

        // Re-confirming after a revocation is allowed
        s.wallet
            .confirm_transaction(&mut s.state, s.owners[0], id)
            .unwrap();
        s.wallet
            .confirm_transaction(&mut s.state, s.owners[1], id)
            .unwrap();
        assert!(s.wallet.transaction(id).unwrap().executed);
        assert!(matches!(
            s.wallet.revoke_confirmation(&mut s.state, s.owners[0], id),
            Err(MultisigError::AlreadyExecuted(_))
        ));
        assert!(event_names(&s.state, &s.wallet).contains(&"Revocation"));
    }

    // =========================================================================
    // Self-management
    // =========================================================================

    #[test]
    fn test_owner_methods_require_wallet_caller() {
        let mut s = setup(2, 1, Some(ether(1)), 0);
        let newcomer = Address::from_seed("newcomer");

        assert!(matches!(
            s.wallet.add_owner(&mut s.state, s.owners[0], newcomer),
            Err(MultisigError::OnlyWallet(_))
        ));
        assert!(matches!(
            s.wallet.change_requirement(&mut s.state, s.owners[0], 2),
            Err(MultisigError::OnlyWallet(_))
        ));
        assert!(matches!(
            s.wallet.change_daily_limit(&mut s.state, s.owners[0], 0),
            Err(MultisigError::OnlyWallet(_))
        ));
        assert!(!s.wallet.is_owner(&newcomer));
    }

    #[test]
    fn test_add_owner_through_transaction() {
        let mut s = setup(2, 2, None, 0);
        let wallet = s.wallet.address();
        let newcomer = Address::from_seed("newcomer");

        let (id, _) = s
            .wallet
            .submit_transaction(
                &mut s.state,
                s.owners[0],
                wallet,
                0,
                command(WalletCommand::AddOwner { owner: newcomer }),
            )
            .unwrap();
        assert!(!s.wallet.is_owner(&newcomer));

        s.wallet
            .confirm_transaction(&mut s.state, s.owners[1], id)
            .unwrap();
        assert!(s.wallet.is_owner(&newcomer));
        assert_eq!(s.wallet.owners().len(), 3);

        let names = event_names(&s.state, &s.wallet);
        assert_eq!(&names[names.len() - 2..], &["OwnerAddition", "Execution"]);
    }

    #[test]
    fn test_remove_owner_clamps_requirement() {
        let mut s = setup(2, 2, None, 0);
        let wallet = s.wallet.address();
        let removed = s.owners[1];

        let (id, _) = s
            .wallet
            .submit_transaction(
                &mut s.state,
                s.owners[0],
                wallet,
                0,
                command(WalletCommand::RemoveOwner { owner: removed }),
            )
            .unwrap();
        s.wallet
            .confirm_transaction(&mut s.state, s.owners[1], id)
            .unwrap();

        assert!(!s.wallet.is_owner(&removed));
        assert_eq!(s.wallet.required(), 1);
        assert!(s.wallet.required() <= s.wallet.owners().len());

        let names = event_names(&s.state, &s.wallet);
        assert_eq!(
            &names[names.len() - 3..],
            &["RequirementChange", "OwnerRemoval", "Execution"]
        );
    }

    #[test]
    fn test_removing_only_owner_fails_execution() {
        let mut s = setup(1, 1, None, 0);
        let wallet = s.wallet.address();
        let only = s.owners[0];

        let (id, outcome) = s
            .wallet
            .submit_transaction(
                &mut s.state,
                only,
                wallet,
                0,
                command(WalletCommand::RemoveOwner { owner: only }),
            )
            .unwrap();

        assert!(matches!(outcome, ExecutionOutcome::Failed(_)));
        assert!(s.wallet.is_owner(&only));
        assert!(!s.wallet.transaction(id).unwrap().executed);
    }

    #[test]
    fn test_replace_owner_through_transaction() {
        let mut s = setup(2, 1, None, 0);
        let wallet = s.wallet.address();
        let replacement = Address::from_seed("replacement");

        let (_, outcome) = s
            .wallet
            .submit_transaction(
                &mut s.state,
                s.owners[0],
                wallet,
                0,
                command(WalletCommand::ReplaceOwner {
                    owner: s.owners[1],
                    new_owner: replacement,
                }),
            )
            .unwrap();

        assert_eq!(outcome, ExecutionOutcome::Executed);
        assert_eq!(s.wallet.owners(), &[s.owners[0], replacement]);
    }

    #[test]
    fn test_invalid_requirement_leaves_transaction_unexecuted() {
        let mut s = setup(2, 2, None, 0);
        let wallet = s.wallet.address();

        let (id, _) = s
            .wallet
            .submit_transaction(
                &mut s.state,
                s.owners[0],
                wallet,
                0,
                command(WalletCommand::ChangeRequirement { required: 3 }),
            )
            .unwrap();
        let outcome = s
            .wallet
            .confirm_transaction(&mut s.state, s.owners[1], id)
            .unwrap();

        assert!(matches!(outcome, ExecutionOutcome::Failed(_)));
        assert_eq!(s.wallet.required(), 2);
        assert!(!s.wallet.transaction(id).unwrap().executed);
        assert_eq!(s.wallet.status(id).unwrap(), TransactionStatus::Confirmed);
        assert_eq!(event_names(&s.state, &s.wallet).last(), Some(&"ExecutionFailure"));
    }

    #[test]
    fn test_change_daily_limit_without_limit_fails() {
        let mut s = setup(2, 1, None, 0);
        let wallet = s.wallet.address();

        let (_, outcome) = s
            .wallet
            .submit_transaction(
                &mut s.state,
                s.owners[0],
                wallet,
                0,
                command(WalletCommand::ChangeDailyLimit { daily_limit: 10 }),
            )
            .unwrap();

        assert_eq!(
            outcome,
            ExecutionOutcome::Failed(MultisigError::NoDailyLimit.to_string())
        );
    }

    #[test]
    fn test_opaque_call_data_to_wallet_is_dispatched() {
        let mut s = setup(2, 1, None, 0);
        let wallet = s.wallet.address();
        let data = WalletCommand::ChangeRequirement { required: 2 }
            .encode()
            .unwrap();

        let (_, outcome) = s
            .wallet
            .submit_transaction(&mut s.state, s.owners[0], wallet, 0, Payload::Data(data))
            .unwrap();

        assert_eq!(outcome, ExecutionOutcome::Executed);
        assert_eq!(s.wallet.required(), 2);

        let (_, outcome) = s
            .wallet
            .submit_transaction(
                &mut s.state,
                s.owners[0],
                wallet,
                0,
                Payload::Data(b"not a command".to_vec()),
            )
            .unwrap();
        // Pending: the requirement is now 2
        assert_eq!(outcome, ExecutionOutcome::Pending);
    }

    #[test]
    fn test_confirmations_count_only_current_owners() {
        let mut s = setup(3, 3, None, ether(1));
        let wallet = s.wallet.address();
        let recipient = Address::from_seed("recipient");

        let (transfer, _) = s
            .wallet
            .submit_transaction(&mut s.state, s.owners[0], recipient, 1, Payload::None)
            .unwrap();
        s.wallet
            .confirm_transaction(&mut s.state, s.owners[1], transfer)
            .unwrap();
        assert_eq!(s.wallet.confirmation_count(transfer).unwrap(), 2);

        let (removal, _) = s
            .wallet
            .submit_transaction(
                &mut s.state,
                s.owners[0],
                wallet,
                0,
                command(WalletCommand::RemoveOwner { owner: s.owners[1] }),
            )
            .unwrap();
        s.wallet
            .confirm_transaction(&mut s.state, s.owners[1], removal)
            .unwrap();
        s.wallet
            .confirm_transaction(&mut s.state, s.owners[2], removal)
            .unwrap();

        assert_eq!(s.wallet.required(), 2);
        assert_eq!(s.wallet.confirmations(transfer).unwrap(), vec![s.owners[0]]);
        assert!(!s.wallet.is_confirmed(transfer));
    }

    // =========================================================================
    // External calls
    // =========================================================================

    struct Reverter;

    impl CallReceiver for Reverter {
        fn on_call(
            &mut self,
            _state: &mut ChainState,
            _wallet: &mut MultisigWallet,
            _call: &IncomingCall,
        ) -> Result<(), String> {
            Err("rejected".to_string())
        }
    }

    struct Reentrant {
        owner: Address,
        id: TransactionId,
        seen: Arc<Mutex<Vec<MultisigError>>>,
    }

    impl CallReceiver for Reentrant {
        fn on_call(
            &mut self,
            state: &mut ChainState,
            wallet: &mut MultisigWallet,
            _call: &IncomingCall,
        ) -> Result<(), String> {
            if let Err(err) = wallet.execute_transaction(state, self.owner, self.id) {
                self.seen.lock().unwrap().push(err);
            }
            Ok(())
        }
    }

    #[test]
    fn test_reverting_receiver_rolls_back() {
        let mut s = setup(2, 2, Some(ether(3)), ether(10));
        let wallet = s.wallet.address();
        let contract = Address::from_seed("contract");
        s.state.register_receiver(contract, Box::new(Reverter));

        let (id, outcome) = s
            .wallet
            .submit_transaction(&mut s.state, s.owners[0], contract, ether(1), Payload::None)
            .unwrap();

        assert_eq!(
            outcome,
            ExecutionOutcome::Failed("External call failed: Call reverted: rejected".to_string())
        );
        assert!(!s.wallet.transaction(id).unwrap().executed);
        assert_eq!(s.state.balance_of(&wallet), ether(10));
        assert_eq!(s.state.balance_of(&contract), 0);
        assert_eq!(s.wallet.calc_max_withdraw(s.state.timestamp()), ether(3));
        assert!(s.state.has_receiver(&contract));
    }

    #[test]
    fn test_reentrant_execution_is_rejected() {
        let mut s = setup(2, 1, None, ether(5));
        let contract = Address::from_seed("contract");
        let seen = Arc::new(Mutex::new(Vec::new()));
        s.state.register_receiver(
            contract,
            Box::new(Reentrant {
                owner: s.owners[0],
                id: 0,
                seen: seen.clone(),
            }),
        );

        let (id, outcome) = s
            .wallet
            .submit_transaction(&mut s.state, s.owners[0], contract, ether(2), Payload::None)
            .unwrap();

        assert_eq!(id, 0);
        assert_eq!(outcome, ExecutionOutcome::Executed);
        assert_eq!(s.state.balance_of(&contract), ether(2));
        assert_eq!(s.state.balance_of(&s.wallet.address()), ether(3));
        assert_eq!(*seen.lock().unwrap(), vec![MultisigError::AlreadyExecuted(0)]);
    }

    // =========================================================================
    // Views
    // =========================================================================

    #[test]
    fn test_transaction_filters() {
        let mut s = setup(2, 2, None, ether(10));
        let recipient = Address::from_seed("recipient");

        for _ in 0..4 {
            s.wallet
                .submit_transaction(&mut s.state, s.owners[0], recipient, 1, Payload::None)
                .unwrap();
        }
        s.wallet
            .confirm_transaction(&mut s.state, s.owners[1], 2)
            .unwrap();

        assert_eq!(s.wallet.transaction_count(true, false), 3);
        assert_eq!(s.wallet.transaction_count(false, true), 1);
        assert_eq!(s.wallet.transaction_ids(0, 10, true, false).unwrap(), vec![0, 1, 3]);
        assert_eq!(s.wallet.transaction_ids(0, 1, false, true).unwrap(), vec![2]);
        assert!(s.wallet.transaction_ids(5, 10, true, true).is_err());
        assert_eq!(s.wallet.transactions().count(), 4);
    }

    #[test]
    fn test_wallet_serialization() {
        let mut s = setup(2, 2, Some(ether(3)), ether(10));
        s.wallet
            .submit_transaction(&mut s.state, s.owners[0], s.owners[1], ether(1), Payload::None)
            .unwrap();

        let json = serde_json::to_string(&s.wallet).unwrap();
        let back: MultisigWallet = serde_json::from_str(&json).unwrap();

        assert_eq!(back.address(), s.wallet.address());
        assert_eq!(back.owners(), s.wallet.owners());
        assert_eq!(back.daily_limit_tracker(), s.wallet.daily_limit_tracker());
        assert_eq!(back.transaction(0).unwrap(), s.wallet.transaction(0).unwrap());
    }
}

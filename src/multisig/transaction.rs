//! Submitted wallet transactions and their confirmations

use crate::core::amount::{wei_string, Wei};
use crate::core::{Address, TransactionId};
use crate::multisig::command::Payload;
use crate::multisig::owners::OwnerSet;
use crate::multisig::wallet::MultisigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A transaction proposed by an owner
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    /// Recipient, or the wallet itself for management commands
    pub destination: Address,
    /// Native value to send
    #[serde(with = "wei_string")]
    pub value: Wei,
    /// Call data
    pub payload: Payload,
    /// Set once the transaction has executed
    pub executed: bool,
    /// Block timestamp at submission
    pub submitted_at: u64,
}

impl Transaction {
    pub fn new(destination: Address, value: Wei, payload: Payload, submitted_at: u64) -> Self {
        Self {
            destination,
            value,
            payload,
            executed: false,
            submitted_at,
        }
    }
}

/// Lifecycle state of a transaction
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Waiting for confirmations
    Pending,
    /// Enough confirmations but not executed yet
    Confirmed,
    /// Executed (terminal)
    Executed,
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "pending"),
            TransactionStatus::Confirmed => write!(f, "confirmed"),
            TransactionStatus::Executed => write!(f, "executed"),
        }
    }
}

/// Append-only list of transactions with per-transaction confirmations
///
/// Ids are positions in the list, starting at 0.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionLedger {
    transactions: Vec<Transaction>,
    confirmations: Vec<BTreeSet<Address>>,
}

impl TransactionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a transaction and return its id
    pub fn add(&mut self, transaction: Transaction) -> Result<TransactionId, MultisigError> {
        let id = TransactionId::try_from(self.transactions.len())
            .map_err(|_| MultisigError::LedgerFull)?;
        self.transactions.push(transaction);
        self.confirmations.push(BTreeSet::new());
        Ok(id)
    }

    pub fn get(&self, id: TransactionId) -> Result<&Transaction, MultisigError> {
        self.transactions
            .get(position(id)?)
            .ok_or(MultisigError::UnknownTransaction(id))
    }

    pub fn exists(&self, id: TransactionId) -> bool {
        position(id).is_ok_and(|index| index < self.transactions.len())
    }

    pub(crate) fn set_executed(
        &mut self,
        id: TransactionId,
        executed: bool,
    ) -> Result<(), MultisigError> {
        let transaction = self
            .transactions
            .get_mut(position(id)?)
            .ok_or(MultisigError::UnknownTransaction(id))?;
        transaction.executed = executed;
        Ok(())
    }

    /// Record a confirmation
    pub fn confirm(&mut self, id: TransactionId, owner: Address) -> Result<(), MultisigError> {
        let confirmations = self.confirmations_mut(id)?;
        if !confirmations.insert(owner) {
            return Err(MultisigError::AlreadyConfirmed(id));
        }
        Ok(())
    }

    /// Withdraw a confirmation
    pub fn revoke(&mut self, id: TransactionId, owner: &Address) -> Result<(), MultisigError> {
        let confirmations = self.confirmations_mut(id)?;
        if !confirmations.remove(owner) {
            return Err(MultisigError::NotConfirmed(id));
        }
        Ok(())
    }

    pub fn is_confirmed_by(&self, id: TransactionId, owner: &Address) -> bool {
        position(id)
            .ok()
            .and_then(|index| self.confirmations.get(index))
            .is_some_and(|set| set.contains(owner))
    }

    /// Current owners that confirmed, in owner order
    pub fn confirmations(
        &self,
        id: TransactionId,
        owners: &OwnerSet,
    ) -> Result<Vec<Address>, MultisigError> {
        let confirmed = self
            .confirmations
            .get(position(id)?)
            .ok_or(MultisigError::UnknownTransaction(id))?;

        Ok(owners
            .owners()
            .iter()
            .filter(|owner| confirmed.contains(*owner))
            .copied()
            .collect())
    }

    /// Number of current owners that confirmed
    pub fn confirmation_count(
        &self,
        id: TransactionId,
        owners: &OwnerSet,
    ) -> Result<usize, MultisigError> {
        Ok(self.confirmations(id, owners)?.len())
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Iterate over `(id, transaction)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (TransactionId, &Transaction)> {
        self.transactions
            .iter()
            .enumerate()
            .filter_map(|(i, tx)| TransactionId::try_from(i).ok().map(|id| (id, tx)))
    }

    fn selected(
        &self,
        pending: bool,
        executed: bool,
    ) -> impl Iterator<Item = (TransactionId, &Transaction)> {
        self.iter()
            .filter(move |(_, tx)| (pending && !tx.executed) || (executed && tx.executed))
    }

    /// Count transactions by executed state
    pub fn count(&self, pending: bool, executed: bool) -> usize {
        self.selected(pending, executed).count()
    }

    /// Ids at positions `[from, to)` of the filtered list
    ///
    /// `to` is clamped to the number of matching transactions.
    pub fn ids(
        &self,
        from: usize,
        to: usize,
        pending: bool,
        executed: bool,
    ) -> Result<Vec<TransactionId>, MultisigError> {
        let matching: Vec<TransactionId> =
            self.selected(pending, executed).map(|(id, _)| id).collect();
        let to = to.min(matching.len());
        if from > to {
            return Err(MultisigError::InvalidRange { from, to });
        }
        Ok(matching[from..to].to_vec())
    }

    fn confirmations_mut(
        &mut self,
        id: TransactionId,
    ) -> Result<&mut BTreeSet<Address>, MultisigError> {
        self.confirmations
            .get_mut(position(id)?)
            .ok_or(MultisigError::UnknownTransaction(id))
    }
}

/// Vector index of a transaction id
fn position(id: TransactionId) -> Result<usize, MultisigError> {
    usize::try_from(id).map_err(|_| MultisigError::UnknownTransaction(id))
}

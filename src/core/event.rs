//! Contract events
//!
//! Every state transition of a wallet or factory is recorded as an
//! [`Event`] in the chain state's log.

use crate::core::address::Address;
use crate::core::amount::{wei_string, Wei};
use serde::{Deserialize, Serialize};

/// Index of a transaction inside a wallet's ledger
pub type TransactionId = u64;

/// Events emitted by wallets and the factory
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    /// Native value received by a wallet
    Deposit {
        sender: Address,
        #[serde(with = "wei_string")]
        value: Wei,
    },
    /// A transaction was added to the ledger
    Submission { transaction_id: TransactionId },
    /// An owner confirmed a transaction
    Confirmation {
        sender: Address,
        transaction_id: TransactionId,
    },
    /// An owner withdrew a confirmation
    Revocation {
        sender: Address,
        transaction_id: TransactionId,
    },
    /// A transaction executed successfully
    Execution { transaction_id: TransactionId },
    /// An execution attempt failed; the transaction stays unexecuted
    ExecutionFailure { transaction_id: TransactionId },
    OwnerAddition { owner: Address },
    OwnerRemoval { owner: Address },
    RequirementChange { required: usize },
    DailyLimitChange {
        #[serde(with = "wei_string")]
        daily_limit: Wei,
    },
    /// The factory deployed a wallet
    ContractInstantiation {
        sender: Address,
        instantiation: Address,
    },
}

impl Event {
    /// Event name as it appears in logs
    pub fn name(&self) -> &'static str {
        match self {
            Event::Deposit { .. } => "Deposit",
            Event::Submission { .. } => "Submission",
            Event::Confirmation { .. } => "Confirmation",
            Event::Revocation { .. } => "Revocation",
            Event::Execution { .. } => "Execution",
            Event::ExecutionFailure { .. } => "ExecutionFailure",
            Event::OwnerAddition { .. } => "OwnerAddition",
            Event::OwnerRemoval { .. } => "OwnerRemoval",
            Event::RequirementChange { .. } => "RequirementChange",
            Event::DailyLimitChange { .. } => "DailyLimitChange",
            Event::ContractInstantiation { .. } => "ContractInstantiation",
        }
    }

    /// Transaction id carried by the event, if any
    pub fn transaction_id(&self) -> Option<TransactionId> {
        match self {
            Event::Submission { transaction_id }
            | Event::Confirmation { transaction_id, .. }
            | Event::Revocation { transaction_id, .. }
            | Event::Execution { transaction_id }
            | Event::ExecutionFailure { transaction_id } => Some(*transaction_id),
            _ => None,
        }
    }
}

/// An event together with the contract that emitted it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Emitting contract
    pub emitter: Address,
    /// Block timestamp at emission
    pub timestamp: u64,
    pub event: Event,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::amount::ether;

    #[test]
    fn test_event_serialization() {
        let event = Event::Deposit {
            sender: Address::from_seed("alice"),
            value: ether(1000),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Deposit\""));
        assert!(json.contains("\"1000000000000000000000\""));

        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_transaction_id_accessor() {
        assert_eq!(Event::Submission { transaction_id: 4 }.transaction_id(), Some(4));
        assert_eq!(
            Event::RequirementChange { required: 2 }.transaction_id(),
            None
        );
        assert_eq!(Event::ExecutionFailure { transaction_id: 1 }.name(), "ExecutionFailure");
    }
}

//! Wallet self-management commands and transaction payloads
//!
//! Owner, requirement and daily-limit changes are submitted as ordinary
//! transactions addressed to the wallet itself. Their payload carries a
//! [`WalletCommand`] which is dispatched once the transaction executes.

use crate::core::amount::{wei_string, Wei};
use crate::core::Address;
use crate::multisig::wallet::MultisigError;
use serde::{Deserialize, Serialize};

/// A management call routed back into the wallet
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "camelCase")]
pub enum WalletCommand {
    AddOwner {
        owner: Address,
    },
    RemoveOwner {
        owner: Address,
    },
    ReplaceOwner {
        owner: Address,
        new_owner: Address,
    },
    ChangeRequirement {
        required: usize,
    },
    ChangeDailyLimit {
        #[serde(with = "wei_string")]
        daily_limit: Wei,
    },
}

impl WalletCommand {
    /// Encode as call data
    pub fn encode(&self) -> Result<Vec<u8>, MultisigError> {
        serde_json::to_vec(self).map_err(|e| MultisigError::InvalidCommand(e.to_string()))
    }

    /// Decode call data addressed to the wallet
    pub fn decode(data: &[u8]) -> Result<Self, MultisigError> {
        serde_json::from_slice(data).map_err(|e| MultisigError::InvalidCommand(e.to_string()))
    }

    /// Method name as it appears in encoded call data
    pub fn name(&self) -> &'static str {
        match self {
            WalletCommand::AddOwner { .. } => "addOwner",
            WalletCommand::RemoveOwner { .. } => "removeOwner",
            WalletCommand::ReplaceOwner { .. } => "replaceOwner",
            WalletCommand::ChangeRequirement { .. } => "changeRequirement",
            WalletCommand::ChangeDailyLimit { .. } => "changeDailyLimit",
        }
    }
}

/// Call data attached to a transaction
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Payload {
    /// Plain value transfer
    #[default]
    None,
    /// Opaque bytes handed to the destination
    Data(#[serde(with = "hex")] Vec<u8>),
    /// Structured wallet command
    Command(WalletCommand),
}

impl Payload {
    /// Build a payload from raw bytes, empty bytes meaning no payload
    pub fn from_bytes(data: Vec<u8>) -> Self {
        if data.is_empty() {
            Payload::None
        } else {
            Payload::Data(data)
        }
    }

    /// Parse hex call data, with or without a `0x` prefix
    pub fn from_hex(input: &str) -> Result<Self, MultisigError> {
        let digits = input.trim().trim_start_matches("0x");
        let data = hex::decode(digits).map_err(|e| MultisigError::InvalidCommand(e.to_string()))?;
        Ok(Self::from_bytes(data))
    }

    /// Whether the transaction is a plain value transfer
    pub fn is_empty(&self) -> bool {
        match self {
            Payload::None => true,
            Payload::Data(data) => data.is_empty(),
            Payload::Command(_) => false,
        }
    }

    /// Raw call data sent to an external destination
    pub fn to_bytes(&self) -> Result<Vec<u8>, MultisigError> {
        match self {
            Payload::None => Ok(Vec::new()),
            Payload::Data(data) => Ok(data.clone()),
            Payload::Command(command) => command.encode(),
        }
    }

    /// The wallet command carried by this payload
    pub fn command(&self) -> Result<WalletCommand, MultisigError> {
        match self {
            Payload::None => Err(MultisigError::InvalidCommand("empty call data".to_string())),
            Payload::Data(data) => WalletCommand::decode(data),
            Payload::Command(command) => Ok(command.clone()),
        }
    }
}

impl From<WalletCommand> for Payload {
    fn from(command: WalletCommand) -> Self {
        Payload::Command(command)
    }
}

//! Relayed (gas-station-network) calls
//!
//! A relay hub forwards calls signed by a user and pays their gas. The
//! recipient decides whether to accept a relayed call and sees the original
//! signer as the effective sender.

use crate::core::amount::{wei_string, Wei};
use crate::core::Address;
use crate::multisig::wallet::{MultisigError, MultisigWallet};
use serde::{Deserialize, Serialize};

/// Relay hub trusted by newly deployed wallets
pub const DEFAULT_RELAY_HUB: Address = Address::new([
    0xd2, 0x16, 0x15, 0x3c, 0x06, 0xe8, 0x57, 0xcd, 0x7f, 0x72, 0x66, 0x5e, 0x0a, 0xf1, 0xd7,
    0xd8, 0x21, 0x72, 0xf4, 0x94,
]);

/// Status code of an accepted relayed call
pub const RELAY_ACCEPTED: u64 = 0;

/// A call offered by a relay for acceptance
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelayRequest {
    pub relay: Address,
    pub from: Address,
    #[serde(with = "hex", default)]
    pub encoded_function: Vec<u8>,
    /// Relay fee as a percentage on top of gas cost
    pub transaction_fee: u64,
    #[serde(with = "wei_string")]
    pub gas_price: Wei,
    pub gas_limit: u64,
    pub nonce: u64,
    #[serde(with = "hex", default)]
    pub approval_data: Vec<u8>,
    #[serde(with = "wei_string")]
    pub max_possible_charge: Wei,
}

impl RelayRequest {
    /// Request for a call `hub` forwards on behalf of `from`, with no fee terms
    pub fn forwarded(hub: Address, from: Address) -> Self {
        Self {
            relay: hub,
            from,
            encoded_function: Vec::new(),
            transaction_fee: 0,
            gas_price: 0,
            gas_limit: 0,
            nonce: 0,
            approval_data: Vec::new(),
            max_possible_charge: 0,
        }
    }
}

/// Answer to a relay request
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelayAcceptance {
    pub status: u64,
    /// Data passed on to the pre/post hooks
    #[serde(with = "hex")]
    pub context: Vec<u8>,
}

impl RelayAcceptance {
    pub fn accepted() -> Self {
        Self {
            status: RELAY_ACCEPTED,
            context: Vec::new(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.status == RELAY_ACCEPTED
    }
}

/// How a call reached the wallet
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CallOrigin {
    /// Sent by the caller itself
    Direct { sender: Address },
    /// Forwarded by a relay hub on behalf of `from`
    Relayed { hub: Address, from: Address },
}

impl CallOrigin {
    /// Effective sender given the hub the recipient trusts
    ///
    /// Calls forwarded by any other hub act as the hub itself.
    pub fn sender(&self, trusted_hub: &Address) -> Address {
        match self {
            CallOrigin::Direct { sender } => *sender,
            CallOrigin::Relayed { hub, from } if hub == trusted_hub => *from,
            CallOrigin::Relayed { hub, .. } => *hub,
        }
    }
}

/// A contract that can receive relayed calls
pub trait RelayRecipient {
    /// The hub this recipient trusts
    fn relay_hub(&self) -> Address;

    /// Decide whether to accept a relayed call
    fn accept_relayed_call(&self, request: &RelayRequest) -> RelayAcceptance;

    /// Hook run by the hub before the relayed call
    fn pre_relayed_call(&mut self, caller: Address, context: &[u8]) -> Result<(), MultisigError>;

    /// Hook run by the hub after the relayed call
    fn post_relayed_call(
        &mut self,
        caller: Address,
        context: &[u8],
        success: bool,
        actual_charge: Wei,
    ) -> Result<(), MultisigError>;

    /// Resolve the effective sender of a call
    fn msg_sender(&self, origin: &CallOrigin) -> Address {
        origin.sender(&self.relay_hub())
    }

    /// Run `op` as the effective sender of `origin`
    ///
    /// A relayed call must be accepted first and runs between the pre and
    /// post hooks, so a hub other than the trusted one is turned away.
    fn relay_call<T, F>(&mut self, origin: CallOrigin, op: F) -> Result<T, MultisigError>
    where
        Self: Sized,
        F: FnOnce(&mut Self, Address) -> Result<T, MultisigError>,
    {
        let (hub, from) = match origin {
            CallOrigin::Direct { sender } => return op(self, sender),
            CallOrigin::Relayed { hub, from } => (hub, from),
        };

        let acceptance = self.accept_relayed_call(&RelayRequest::forwarded(hub, from));
        if !acceptance.is_accepted() {
            return Err(MultisigError::RelayRejected(acceptance.status));
        }
        self.pre_relayed_call(hub, &acceptance.context)?;

        let sender = self.msg_sender(&origin);
        let result = op(self, sender);
        self.post_relayed_call(hub, &acceptance.context, result.is_ok(), 0)?;
        result
    }
}

impl RelayRecipient for MultisigWallet {
    fn relay_hub(&self) -> Address {
        MultisigWallet::relay_hub(self)
    }

    fn accept_relayed_call(&self, request: &RelayRequest) -> RelayAcceptance {
        log::debug!(
            "Wallet {} accepting relayed call from {} via {}",
            self.address().short(),
            request.from.short(),
            request.relay.short()
        );
        RelayAcceptance::accepted()
    }

    fn pre_relayed_call(&mut self, caller: Address, _context: &[u8]) -> Result<(), MultisigError> {
        self.only_relay_hub(caller)
    }

    fn post_relayed_call(
        &mut self,
        caller: Address,
        _context: &[u8],
        _success: bool,
        _actual_charge: Wei,
    ) -> Result<(), MultisigError> {
        self.only_relay_hub(caller)
    }
}

//! Wallet factory
//!
//! Deploys daily-limit multisig wallets and keeps a registry of which
//! creator deployed which wallet.

use crate::core::{Address, ChainState, Event};
use crate::multisig::wallet::{MultisigConfig, MultisigError, MultisigWallet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Factory owning every wallet it deployed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletFactory {
    /// Factory contract address, the deployer of every wallet
    address: Address,
    name: String,
    symbol: String,
    /// Wallets by address
    wallets: BTreeMap<Address, MultisigWallet>,
    /// Deployed wallet addresses by creator, in deployment order
    deployed: BTreeMap<Address, Vec<Address>>,
}

impl WalletFactory {
    /// Create a factory living at `address`
    pub fn new(address: Address, name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            address,
            name: name.into(),
            symbol: symbol.into(),
            wallets: BTreeMap::new(),
            deployed: BTreeMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Deploy a new wallet on behalf of `creator`
    ///
    /// # Errors
    /// Returns error if the configuration is invalid; nothing is registered then
    pub fn create(
        &mut self,
        state: &mut ChainState,
        creator: Address,
        config: MultisigConfig,
    ) -> Result<Address, MultisigError> {
        let checkpoint = state.checkpoint();
        let address = state.create_address(&self.address);

        let wallet = match MultisigWallet::new(address, config) {
            Ok(wallet) => wallet,
            Err(err) => {
                state.revert_to(checkpoint);
                return Err(err);
            }
        };

        self.wallets.insert(address, wallet);
        self.deployed.entry(creator).or_default().push(address);
        state.emit(
            self.address,
            Event::ContractInstantiation {
                sender: creator,
                instantiation: address,
            },
        );

        log::info!(
            "Factory {} deployed wallet {} for {}",
            self.address.short(),
            address,
            creator.short()
        );
        Ok(address)
    }

    /// Number of wallets `creator` deployed
    pub fn deployed_wallets_count(&self, creator: &Address) -> usize {
        self.deployed.get(creator).map_or(0, Vec::len)
    }

    /// The `index`-th wallet deployed by `creator`
    pub fn deployed_wallet(&self, creator: &Address, index: usize) -> Option<Address> {
        self.deployed
            .get(creator)
            .and_then(|wallets| wallets.get(index))
            .copied()
    }

    /// All wallets deployed by `creator`
    pub fn deployed_wallets(&self, creator: &Address) -> &[Address] {
        self.deployed
            .get(creator)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether this factory deployed the wallet at `address`
    pub fn is_multisig_wallet(&self, address: &Address) -> bool {
        self.wallets.contains_key(address)
    }

    pub fn get(&self, address: &Address) -> Option<&MultisigWallet> {
        self.wallets.get(address)
    }

    pub fn get_mut(&mut self, address: &Address) -> Option<&mut MultisigWallet> {
        self.wallets.get_mut(address)
    }

    /// Get a wallet or fail with `WalletNotFound`
    pub fn wallet(&self, address: &Address) -> Result<&MultisigWallet, MultisigError> {
        self.get(address)
            .ok_or(MultisigError::WalletNotFound(*address))
    }

    pub fn wallet_mut(&mut self, address: &Address) -> Result<&mut MultisigWallet, MultisigError> {
        self.get_mut(address)
            .ok_or(MultisigError::WalletNotFound(*address))
    }

    /// List all wallets
    pub fn list(&self) -> Vec<&MultisigWallet> {
        self.wallets.values().collect()
    }

    /// Get wallet count
    pub fn count(&self) -> usize {
        self.wallets.len()
    }
}

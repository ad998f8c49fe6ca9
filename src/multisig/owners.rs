//! Wallet owners and the confirmation threshold

use crate::core::Address;
use crate::multisig::wallet::MultisigError;
use serde::{Deserialize, Serialize};

/// Maximum number of owners a wallet may have
pub const MAX_OWNER_COUNT: usize = 50;

/// The owners of a wallet and how many of them must confirm
///
/// Invariant after every operation: `1 <= required <= owners.len() <= MAX_OWNER_COUNT`,
/// no duplicates, no null address.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct OwnerSet {
    owners: Vec<Address>,
    required: usize,
}

impl OwnerSet {
    /// Create an owner set
    ///
    /// # Errors
    /// Returns error on duplicates, the null address, or an invalid requirement
    pub fn new(owners: Vec<Address>, required: usize) -> Result<Self, MultisigError> {
        Self::validate_requirement(owners.len(), required)?;

        for (i, owner) in owners.iter().enumerate() {
            if owner.is_zero() {
                return Err(MultisigError::NullAddress);
            }
            if owners[..i].contains(owner) {
                return Err(MultisigError::DuplicateOwner(*owner));
            }
        }

        Ok(Self { owners, required })
    }

    /// Check `1 <= required <= owner_count <= MAX_OWNER_COUNT`
    pub fn validate_requirement(owner_count: usize, required: usize) -> Result<(), MultisigError> {
        if owner_count == 0
            || owner_count > MAX_OWNER_COUNT
            || required == 0
            || required > owner_count
        {
            return Err(MultisigError::InvalidRequirement {
                required,
                owner_count,
            });
        }
        Ok(())
    }

    pub fn is_owner(&self, address: &Address) -> bool {
        self.owners.contains(address)
    }

    /// Owners in their current order
    pub fn owners(&self) -> &[Address] {
        &self.owners
    }

    /// Number of confirmations required
    pub fn required(&self) -> usize {
        self.required
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Description like "2-of-3"
    pub fn description(&self) -> String {
        format!("{}-of-{}", self.required, self.owners.len())
    }

    /// Add a new owner
    pub fn add(&mut self, owner: Address) -> Result<(), MultisigError> {
        if owner.is_zero() {
            return Err(MultisigError::NullAddress);
        }
        if self.is_owner(&owner) {
            return Err(MultisigError::DuplicateOwner(owner));
        }
        Self::validate_requirement(self.owners.len() + 1, self.required)?;

        self.owners.push(owner);
        Ok(())
    }

    /// Remove an owner
    ///
    /// The last owner takes the removed owner's slot. Returns the new
    /// requirement when it had to be lowered to the remaining owner count.
    pub fn remove(&mut self, owner: &Address) -> Result<Option<usize>, MultisigError> {
        let index = self
            .owners
            .iter()
            .position(|o| o == owner)
            .ok_or(MultisigError::NotOwner(*owner))?;

        let remaining = self.owners.len() - 1;
        if remaining == 0 {
            return Err(MultisigError::InvalidRequirement {
                required: self.required,
                owner_count: remaining,
            });
        }

        self.owners.swap_remove(index);

        if self.required > remaining {
            self.required = remaining;
            return Ok(Some(remaining));
        }
        Ok(None)
    }

    /// Replace an owner in place
    pub fn replace(&mut self, owner: &Address, new_owner: Address) -> Result<(), MultisigError> {
        let index = self
            .owners
            .iter()
            .position(|o| o == owner)
            .ok_or(MultisigError::NotOwner(*owner))?;
        if new_owner.is_zero() {
            return Err(MultisigError::NullAddress);
        }
        if self.is_owner(&new_owner) {
            return Err(MultisigError::DuplicateOwner(new_owner));
        }

        self.owners[index] = new_owner;
        Ok(())
    }

    /// Change the number of required confirmations
    pub fn change_requirement(&mut self, required: usize) -> Result<(), MultisigError> {
        Self::validate_requirement(self.owners.len(), required)?;
        self.required = required;
        Ok(())
    }
}

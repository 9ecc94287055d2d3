//! On-chain state structures for the auction module.

use std::collections::{BTreeMap, HashMap};

use nft_auction_types::{
    verification_key_hash, Address, AuctionData, PackedAuctionState, VerificationKeyRecord,
};

use crate::custody::NftRegistry;
use crate::error::AuctionError;
use crate::genesis::AuctionLimits;
use crate::handlers::HandlerResult;
use crate::upgrade::DesignatedAuthority;

/// Auction module state.
///
/// In a real Sovereign SDK implementation, these would be StateMap/StateValue types.
/// This is a simplified in-memory representation for development.
#[derive(Clone, Debug, Default)]
pub struct AuctionState {
    /// Packed state, one value per auction account
    pub auctions: BTreeMap<Address, PackedAuctionState>,

    /// Verification key bound to each auction account
    pub verification_keys: HashMap<Address, VerificationKeyRecord>,

    /// Ledger balances, auction accounts included
    pub balances: HashMap<Address, u64>,

    /// NFT ownership
    pub nfts: NftRegistry,

    /// Hash of the key every new auction starts with
    pub default_vk_hash: [u8; 32],

    /// Approves verification key upgrades
    pub upgrade_authority: Option<DesignatedAuthority>,

    /// Deploy-time parameter limits
    pub limits: AuctionLimits,
}

impl AuctionState {
    /// Create an empty state with default limits.
    pub fn new() -> Self {
        Self {
            default_vk_hash: verification_key_hash(&[]),
            ..Default::default()
        }
    }

    /// Decode the auction stored at `auction`.
    pub fn load_auction(&self, auction: &Address) -> HandlerResult<AuctionData> {
        let packed = self
            .auctions
            .get(auction)
            .ok_or(AuctionError::AuctionNotFound(*auction))?;
        Ok(packed.unpack()?)
    }

    /// Encode and store `data` at `auction`.
    pub fn store_auction(&mut self, auction: Address, data: &AuctionData) -> HandlerResult<()> {
        let packed = PackedAuctionState::pack(data)?;
        self.auctions.insert(auction, packed);
        Ok(())
    }

    /// Get an account balance.
    pub fn balance_of(&self, address: &Address) -> u64 {
        self.balances.get(address).copied().unwrap_or(0)
    }

    /// Add to an account balance.
    pub fn credit(&mut self, address: Address, amount: u64) -> HandlerResult<()> {
        let balance = self.balances.entry(address).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or(AuctionError::BalanceOverflow)?;
        Ok(())
    }

    /// Subtract from an account balance.
    pub fn debit(&mut self, address: &Address, amount: u64) -> HandlerResult<()> {
        let available = self.balance_of(address);
        if available < amount {
            return Err(AuctionError::InsufficientBalance {
                required: amount,
                available,
            });
        }
        if amount > 0 {
            self.balances.insert(*address, available - amount);
        }
        Ok(())
    }

    /// Move value between accounts.
    pub fn transfer(&mut self, from: &Address, to: Address, amount: u64) -> HandlerResult<()> {
        self.debit(from, amount)?;
        self.credit(to, amount)
    }

    /// Run `f` against a copy of the state and keep the copy only on success.
    pub fn apply_atomically<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> HandlerResult<T>,
    ) -> HandlerResult<T> {
        let mut draft = self.clone();
        let output = f(&mut draft)?;
        *self = draft;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_operations() {
        let mut state = AuctionState::new();
        let alice = [1u8; 32];
        let bob = [2u8; 32];

        assert_eq!(state.balance_of(&alice), 0);

        state.credit(alice, 100).unwrap();
        state.credit(alice, 50).unwrap();
        assert_eq!(state.balance_of(&alice), 150);

        state.transfer(&alice, bob, 75).unwrap();
        assert_eq!(state.balance_of(&alice), 75);
        assert_eq!(state.balance_of(&bob), 75);

        assert!(matches!(
            state.debit(&alice, 100),
            Err(AuctionError::InsufficientBalance {
                required: 100,
                available: 75
            })
        ));
        assert_eq!(state.balance_of(&alice), 75);
    }

    #[test]
    fn test_credit_overflow_rejected() {
        let mut state = AuctionState::new();
        let alice = [1u8; 32];
        state.credit(alice, u64::MAX).unwrap();
        assert!(state.credit(alice, 1).is_err());
        assert_eq!(state.balance_of(&alice), u64::MAX);
    }

    #[test]
    fn test_apply_atomically_discards_on_error() {
        let mut state = AuctionState::new();
        let alice = [1u8; 32];
        let bob = [2u8; 32];
        state.credit(alice, 10).unwrap();

        let result = state.apply_atomically(|draft| {
            draft.transfer(&alice, bob, 4)?;
            draft.transfer(&alice, bob, 7)
        });

        assert!(result.is_err());
        assert_eq!(state.balance_of(&alice), 10);
        assert_eq!(state.balance_of(&bob), 0);
    }

    #[test]
    fn test_load_unknown_auction_is_retryable() {
        let state = AuctionState::new();
        let err = state.load_auction(&[9u8; 32]).unwrap_err();
        assert!(err.is_retryable());
    }
}

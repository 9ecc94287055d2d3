//! Simulated chain: module state plus the slot clock.

use nft_auction_module::{
    handlers, AuctionCall, AuctionGenesisConfig, AuctionState as ModuleState, CallContext,
    CallReceipt, GenesisValidationError, HandlerResult,
};
use nft_auction_types::{Address, Slot};
use thiserror::Error;

/// Errors from chain administration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("Slot overflow")]
    SlotOverflow,

    #[error("Cannot move slot back from {current} to {requested}")]
    SlotRewind { current: Slot, requested: Slot },
}

/// Shared chain state.
#[derive(Debug, Clone)]
pub struct ChainState {
    /// Module state
    pub module: ModuleState,
    /// Current slot; only ever moves forward
    pub slot: Slot,
}

impl ChainState {
    pub fn new() -> Self {
        Self {
            module: ModuleState::new(),
            slot: 0,
        }
    }

    pub fn from_genesis(config: &AuctionGenesisConfig) -> Result<Self, GenesisValidationError> {
        Ok(Self {
            module: config.build_state()?,
            slot: config.initial_slot,
        })
    }

    pub fn advance(&mut self, count: u32) -> Result<Slot, ChainError> {
        self.slot = self
            .slot
            .checked_add(count)
            .ok_or(ChainError::SlotOverflow)?;
        Ok(self.slot)
    }

    pub fn set_slot(&mut self, slot: Slot) -> Result<Slot, ChainError> {
        if slot < self.slot {
            return Err(ChainError::SlotRewind {
                current: self.slot,
                requested: slot,
            });
        }
        self.slot = slot;
        Ok(self.slot)
    }

    /// Apply `calls` from `sender` as one transaction at the current slot.
    pub fn execute(
        &mut self,
        sender: Address,
        calls: Vec<AuctionCall>,
    ) -> HandlerResult<Vec<CallReceipt>> {
        let ctx = CallContext {
            sender,
            slot: self.slot,
        };
        handlers::apply_transaction(&mut self.module, &ctx, calls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nft_auction_module::AuctionError;
    use nft_auction_types::{AuctionMode, AuctionParams, NftId};

    #[test]
    fn test_slot_only_moves_forward() {
        let mut chain = ChainState::new();
        assert_eq!(chain.advance(5).unwrap(), 5);
        assert_eq!(chain.set_slot(9).unwrap(), 9);
        assert_eq!(
            chain.set_slot(3),
            Err(ChainError::SlotRewind {
                current: 9,
                requested: 3
            })
        );
        chain.set_slot(Slot::MAX).unwrap();
        assert_eq!(chain.advance(1), Err(ChainError::SlotOverflow));
    }

    #[test]
    fn test_execute_uses_chain_slot() {
        let mut chain = ChainState::new();
        let seller = [1u8; 32];
        let auction = [9u8; 32];
        let nft = NftId {
            collection: [2u8; 32],
            nft: [3u8; 32],
        };
        chain.module.nfts.mint(nft, seller).unwrap();
        chain.set_slot(50).unwrap();

        let params = AuctionParams {
            collection: nft.collection,
            nft: nft.nft,
            owner: seller,
            minimum_price: 1,
            auction_end_time: 50,
            auctioneer: [4u8; 32],
            transfer_fee: 0,
            sale_fee: 0,
            withdraw_period: 0,
            mode: AuctionMode::Standard,
        };
        let result = chain.execute(
            seller,
            vec![
                AuctionCall::ApproveNft {
                    nft,
                    approved: Some(auction),
                },
                AuctionCall::Deploy { auction, params },
            ],
        );

        assert!(matches!(
            result,
            Err(AuctionError::EndTimeNotInFuture { end: 50, now: 50 })
        ));
        // Rolled back with the deploy
        assert_eq!(chain.module.nfts.record(&nft).unwrap().approved, None);
    }
}

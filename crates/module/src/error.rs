//! Auction module error types.

use thiserror::Error;

use crate::custody::CustodyError;
use nft_auction_types::{Address, AuctionPhase, FeeError, PackError, Slot};

/// Recipient of a settlement payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payee {
    Seller,
    Auctioneer,
}

/// Errors that can occur in the auction module.
///
/// Every error rejects the whole transaction; no partial effects are kept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuctionError {
    // === Resource state (retryable) ===
    #[error("Auction not found: {}", hex::encode(.0))]
    AuctionNotFound(Address),

    #[error("Stale state: caller saw balance {expected}, account holds {actual}")]
    StaleState { expected: u64, actual: u64 },

    // === Deploy ===
    #[error("Auction already deployed at {}", hex::encode(.0))]
    AlreadyDeployed(Address),

    #[error("Auction end time {end} is not after current slot {now}")]
    EndTimeNotInFuture { end: Slot, now: Slot },

    #[error("Auction duration {duration} exceeds limit {max}")]
    DurationTooLong { duration: Slot, max: Slot },

    #[error("Withdraw period {period} exceeds limit {max}")]
    WithdrawPeriodTooLong { period: Slot, max: Slot },

    #[error("Sale fee {fee} bps exceeds limit {max}")]
    InvalidSaleFee { fee: u32, max: u32 },

    #[error("Auction account already holds a balance of {0}")]
    AuctionAccountFunded(u64),

    #[error("Auction account is also a participant of the auction")]
    AuctionAccountIsParticipant,

    #[error("NFT is not in the auction's custody")]
    NftNotInCustody,

    // === Bidding ===
    #[error("Bidding ended at slot {end} (now {now})")]
    BiddingEnded { end: Slot, now: Slot },

    #[error("Bid {bid} below minimum price {minimum}")]
    BelowMinimumPrice { bid: u64, minimum: u64 },

    #[error("Bid {bid} does not exceed highest bid {highest}")]
    BidNotHigher { bid: u64, highest: u64 },

    #[error("Insufficient balance: need {required}, got {available}")]
    InsufficientBalance { required: u64, available: u64 },

    #[error("Balance overflow")]
    BalanceOverflow,

    // === Settlement & withdrawal ===
    #[error("Auction has not ended: ends at slot {end} (now {now})")]
    AuctionNotEnded { end: Slot, now: Slot },

    #[error("Auction already finalized: {0:?}")]
    Finalized(AuctionPhase),

    #[error("Auction is not settled")]
    NotSettled,

    #[error("Auction closed without a sale; nothing to pay out")]
    NoProceeds,

    #[error("{0:?} payment already settled")]
    PaymentAlreadySettled(Payee),

    #[error("Fee split rejected: {0}")]
    Fees(#[from] FeeError),

    #[error("Auction was not deployed in withdraw mode")]
    NotWithdrawMode,

    #[error("Withdraw period not elapsed: opens at slot {opens_at} (now {now})")]
    WithdrawPeriodNotElapsed { opens_at: u64, now: Slot },

    #[error("NFT already returned to seller")]
    NftAlreadyReturned,

    // === Authorization ===
    #[error("Not authorized")]
    NotAuthorized,

    #[error("Invalid upgrade proof")]
    InvalidUpgradeProof,

    #[error("Upgrade authority not configured")]
    UpgradeAuthorityNotSet,

    // === Collaborators ===
    #[error("NFT custody: {0}")]
    Custody(#[from] CustodyError),

    #[error("Corrupt auction state: {0}")]
    CorruptState(#[from] PackError),
}

impl AuctionError {
    /// Whether the caller should refresh its view and resubmit.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AuctionError::AuctionNotFound(_) | AuctionError::StaleState { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(AuctionError::AuctionNotFound([0u8; 32]).is_retryable());
        assert!(AuctionError::StaleState {
            expected: 1,
            actual: 2
        }
        .is_retryable());
        assert!(!AuctionError::BidNotHigher { bid: 1, highest: 1 }.is_retryable());
        assert!(!AuctionError::NotAuthorized.is_retryable());
    }

    #[test]
    fn test_display_names_condition() {
        let err = AuctionError::BiddingEnded { end: 10, now: 10 };
        assert_eq!(err.to_string(), "Bidding ended at slot 10 (now 10)");

        let err = AuctionError::AuctionNotFound([0xAA; 32]);
        assert!(err.to_string().contains(&"aa".repeat(32)));
    }
}

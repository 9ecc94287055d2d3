//! Call message types for the auction module.

use borsh::{BorshDeserialize, BorshSerialize};
use nft_auction_types::{Address, AuctionParams, NftId, UpgradeProof};

/// Call messages for the auction module.
///
/// Every call is addressed to an auction account except the NFT custody
/// calls, which go to the NFT registry and are bundled with `Deploy`.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum AuctionCall {
    // === Auction Lifecycle ===
    /// Create an auction at `auction` bound to one NFT. Signed by the seller.
    Deploy { auction: Address, params: AuctionParams },

    /// Escrow `amount` and become the highest bidder.
    Bid {
        auction: Address,
        amount: u64,
        bidder: Address,
    },

    /// Resolve NFT custody once the end slot is reached (permissionless).
    SettleAuction { auction: Address },

    /// Pay the seller and the transfer fee out of escrow.
    SettlePayment { auction: Address },

    /// Pay the auctioneer its cut. `balance` is the escrow balance the caller
    /// last observed.
    SettleAuctioneerPayment { auction: Address, balance: u64 },

    /// Return the NFT to the seller after the withdraw window.
    WithdrawNft { auction: Address },

    /// Refund the highest bidder after the withdraw window.
    Withdraw { auction: Address },

    // === Governance ===
    /// Replace the auction's verification key.
    UpgradeVerificationKey {
        auction: Address,
        verification_key: Vec<u8>,
        proof: UpgradeProof,
    },

    // === NFT custody ===
    /// Set or clear the approved custodian of an NFT.
    ApproveNft {
        nft: NftId,
        approved: Option<Address>,
    },

    /// Transfer an NFT the sender owns or is approved for.
    TransferNft { nft: NftId, to: Address },
}

impl AuctionCall {
    /// Auction account the call targets, if any.
    pub fn auction(&self) -> Option<&Address> {
        match self {
            AuctionCall::Deploy { auction, .. }
            | AuctionCall::Bid { auction, .. }
            | AuctionCall::SettleAuction { auction }
            | AuctionCall::SettlePayment { auction }
            | AuctionCall::SettleAuctioneerPayment { auction, .. }
            | AuctionCall::WithdrawNft { auction }
            | AuctionCall::Withdraw { auction }
            | AuctionCall::UpgradeVerificationKey { auction, .. } => Some(auction),
            AuctionCall::ApproveNft { .. } | AuctionCall::TransferNft { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_borsh_roundtrip() {
        let call = AuctionCall::SettleAuctioneerPayment {
            auction: [5u8; 32],
            balance: 42,
        };
        let bytes = borsh::to_vec(&call).unwrap();
        let decoded = AuctionCall::try_from_slice(&bytes).unwrap();
        assert_eq!(decoded, call);
        assert_eq!(decoded.auction(), Some(&[5u8; 32]));
    }

    #[test]
    fn test_custody_calls_have_no_auction() {
        let call = AuctionCall::TransferNft {
            nft: NftId {
                collection: [1u8; 32],
                nft: [2u8; 32],
            },
            to: [3u8; 32],
        };
        assert_eq!(call.auction(), None);
    }
}

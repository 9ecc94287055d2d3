//! Core type definitions for NFT auctions.
//!
//! This crate provides the data structures shared across the auction system:
//! the auction state itself, its fixed-layout packed encoding, the fee split
//! arithmetic, and the verification-key upgrade types.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

pub mod fees;
pub mod packed;

pub use fees::{FeeError, FeeSplit, BPS_DENOMINATOR};
pub use packed::{PackError, PackedAuctionState, PACKED_LEN, PACKED_VERSION};

// =========================
// IDENTITIES & TIME
// =========================

/// Generic address type (32 bytes, canonical compressed key form)
pub type Address = [u8; 32];

/// The all-zero address. Never a valid bidder.
pub const EMPTY_ADDRESS: Address = [0u8; 32];

/// Global slot since genesis. The only clock the auction logic reads.
pub type Slot = u32;

/// Identifies a single NFT: its collection contract and its own address.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct NftId {
    pub collection: Address,
    pub nft: Address,
}

// =========================
// AUCTION TYPES
// =========================

/// How the NFT is held while the auction runs.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub enum AuctionMode {
    /// Seller keeps ownership; the auction is the approved custodian.
    /// No withdraw path.
    Standard,
    /// NFT is transferred into the auction account. After the withdraw
    /// window an unsettled auction can be unwound.
    Withdraw,
}

/// Terminal state of an auction. At most one terminal variant is ever reached.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub enum AuctionStatus {
    /// No terminal operation has run yet.
    Active,
    /// Custody resolved by settlement; proceeds are paid out afterwards.
    Settled {
        seller_paid: bool,
        auctioneer_paid: bool,
    },
    /// Unwound through the withdraw path.
    Withdrawn {
        nft_returned: bool,
        bid_refunded: bool,
    },
}

impl AuctionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AuctionStatus::Active)
    }
}

/// Lifecycle phase as observed at a given slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionPhase {
    /// Before `auction_end_time`, accepting bids
    Open,
    /// End time reached, awaiting settlement or withdrawal
    Ended,
    /// Settled (terminal)
    Settled,
    /// Withdrawn (terminal)
    Withdrawn,
}

/// Deploy-time parameters of an auction.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct AuctionParams {
    pub collection: Address,
    pub nft: Address,
    /// The seller; must sign the deploy
    pub owner: Address,
    pub minimum_price: u64,
    pub auction_end_time: Slot,
    pub auctioneer: Address,
    pub transfer_fee: u64,
    /// Basis points out of [`BPS_DENOMINATOR`]
    pub sale_fee: u32,
    pub withdraw_period: Slot,
    pub mode: AuctionMode,
}

/// Full state of one auction instance.
///
/// This is what [`PackedAuctionState`] encodes; the module stores only the
/// packed form.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct AuctionData {
    pub seller: Address,
    pub auctioneer: Address,
    pub nft: NftId,
    pub minimum_price: u64,
    pub auction_end_time: Slot,
    pub withdraw_period: Slot,
    pub transfer_fee: u64,
    pub sale_fee: u32,
    pub mode: AuctionMode,
    pub highest_bid: u64,
    pub highest_bidder: Option<Address>,
    pub status: AuctionStatus,
}

impl AuctionData {
    /// Fresh state for a newly deployed auction.
    pub fn from_params(params: &AuctionParams) -> Self {
        Self {
            seller: params.owner,
            auctioneer: params.auctioneer,
            nft: NftId {
                collection: params.collection,
                nft: params.nft,
            },
            minimum_price: params.minimum_price,
            auction_end_time: params.auction_end_time,
            withdraw_period: params.withdraw_period,
            transfer_fee: params.transfer_fee,
            sale_fee: params.sale_fee,
            mode: params.mode,
            highest_bid: 0,
            highest_bidder: None,
            status: AuctionStatus::Active,
        }
    }

    /// Phase at slot `now`. The end slot itself belongs to `Ended`.
    pub fn phase(&self, now: Slot) -> AuctionPhase {
        match self.status {
            AuctionStatus::Settled { .. } => AuctionPhase::Settled,
            AuctionStatus::Withdrawn { .. } => AuctionPhase::Withdrawn,
            AuctionStatus::Active if now < self.auction_end_time => AuctionPhase::Open,
            AuctionStatus::Active => AuctionPhase::Ended,
        }
    }

    /// First slot at which the withdraw path opens.
    ///
    /// Widened to `u64` so that `end + period` cannot wrap.
    pub fn withdraw_opens_at(&self) -> u64 {
        self.auction_end_time as u64 + self.withdraw_period as u64
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Split of the current highest bid.
    pub fn fee_split(&self) -> Result<FeeSplit, FeeError> {
        FeeSplit::compute(self.highest_bid, self.transfer_fee, self.sale_fee)
    }

    /// Amount the auction account must hold for this state.
    pub fn escrowed(&self) -> u64 {
        if self.highest_bid == 0 {
            return 0;
        }
        match self.status {
            AuctionStatus::Active => self.highest_bid,
            AuctionStatus::Withdrawn { bid_refunded, .. } => {
                if bid_refunded {
                    0
                } else {
                    self.highest_bid
                }
            }
            AuctionStatus::Settled {
                seller_paid,
                auctioneer_paid,
            } => {
                let Ok(split) = self.fee_split() else {
                    return self.highest_bid;
                };
                let mut remaining = self.highest_bid;
                if seller_paid {
                    remaining -= split.seller_proceeds + split.transfer_fee;
                }
                if auctioneer_paid {
                    remaining -= split.auctioneer_cut;
                }
                remaining
            }
        }
    }
}

// =========================
// VERIFICATION KEY UPGRADE
// =========================

/// Verification key currently bound to an auction account.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct VerificationKeyRecord {
    pub hash: [u8; 32],
    pub version: u32,
}

/// Authorization for replacing an auction's verification key.
///
/// Opaque to the auction; interpreted only by the upgrade authority.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct UpgradeProof {
    pub authority: Address,
    pub contract: Address,
    pub new_vk_hash: [u8; 32],
    pub valid_from: Slot,
    pub digest: [u8; 32],
}

// =========================
// HELPER FUNCTIONS
// =========================

/// Hash of a verification key.
pub fn verification_key_hash(vk: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(b"AUCTION_VK_V1:");
    hasher.update(vk);
    hasher.finalize().into()
}

/// Digest an upgrade authority commits to when approving an upgrade.
pub fn upgrade_digest(
    authority: &Address,
    contract: &Address,
    new_vk_hash: &[u8; 32],
    valid_from: Slot,
) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(b"AUCTION_VK_UPGRADE_V1:");
    hasher.update(authority);
    hasher.update(contract);
    hasher.update(new_vk_hash);
    hasher.update(valid_from.to_le_bytes());
    hasher.finalize().into()
}

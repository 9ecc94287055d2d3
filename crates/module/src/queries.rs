//! Query handlers for the auction module.
//!
//! These functions provide read-only access to auction state, plus the
//! keeper planner that decides which permissionless call an auction is
//! waiting for.

use crate::custody::NftRecord;
use crate::state::AuctionState as ModuleState;
use nft_auction_types::{
    Address, AuctionData, AuctionMode, AuctionPhase, AuctionStatus, NftId, PackedAuctionState,
    Slot, VerificationKeyRecord,
};
use serde::{Deserialize, Serialize};

/// Query request types.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum AuctionQuery {
    /// Get decoded auction state.
    GetAuction { auction: Address },

    /// Get the raw packed state.
    GetPackedState { auction: Address },

    /// Get all auctions (paginated).
    ListAuctions { offset: u64, limit: u64 },

    /// Get an account balance.
    GetBalance { address: Address },

    /// Get NFT ownership.
    GetNft { nft: NftId },

    /// Get the verification key bound to an auction.
    GetVerificationKey { auction: Address },

    /// Get auctions waiting on a permissionless call.
    GetPendingActions,
}

/// Query response types.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum AuctionQueryResponse {
    Auction(Option<AuctionData>),
    PackedState(Option<PackedAuctionState>),
    AuctionList(Vec<AuctionSummary>),
    Balance(u64),
    Nft(Option<NftRecord>),
    VerificationKey(Option<VerificationKeyRecord>),
    PendingActions(Vec<PendingAction>),
}

/// Handle a query at slot `now`.
pub fn handle_query(state: &ModuleState, query: AuctionQuery, now: Slot) -> AuctionQueryResponse {
    match query {
        AuctionQuery::GetAuction { auction } => {
            AuctionQueryResponse::Auction(state.load_auction(&auction).ok())
        }

        AuctionQuery::GetPackedState { auction } => {
            AuctionQueryResponse::PackedState(state.auctions.get(&auction).cloned())
        }

        AuctionQuery::ListAuctions { offset, limit } => AuctionQueryResponse::AuctionList(
            get_auction_summaries(state, now, offset as usize, limit as usize),
        ),

        AuctionQuery::GetBalance { address } => {
            AuctionQueryResponse::Balance(state.balance_of(&address))
        }

        AuctionQuery::GetNft { nft } => AuctionQueryResponse::Nft(state.nfts.record(&nft).ok()),

        AuctionQuery::GetVerificationKey { auction } => {
            AuctionQueryResponse::VerificationKey(state.verification_keys.get(&auction).copied())
        }

        AuctionQuery::GetPendingActions => {
            AuctionQueryResponse::PendingActions(get_pending_actions(state, now))
        }
    }
}

/// Summary of an auction for listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionSummary {
    pub auction: Address,
    pub seller: Address,
    pub nft: NftId,
    pub mode: AuctionMode,
    pub phase: AuctionPhase,
    pub minimum_price: u64,
    pub highest_bid: u64,
    pub highest_bidder: Option<Address>,
    pub auction_end_time: Slot,
    pub withdraw_opens_at: u64,
    /// Ledger balance of the auction account
    pub escrow: u64,
}

impl AuctionSummary {
    /// Create summary from decoded state.
    pub fn from_auction(auction: Address, data: &AuctionData, now: Slot, escrow: u64) -> Self {
        Self {
            auction,
            seller: data.seller,
            nft: data.nft,
            mode: data.mode,
            phase: data.phase(now),
            minimum_price: data.minimum_price,
            highest_bid: data.highest_bid,
            highest_bidder: data.highest_bidder,
            auction_end_time: data.auction_end_time,
            withdraw_opens_at: data.withdraw_opens_at(),
            escrow,
        }
    }
}

/// Decode every stored auction, skipping entries that fail to decode.
fn decoded_auctions(state: &ModuleState) -> impl Iterator<Item = (Address, AuctionData)> + '_ {
    state
        .auctions
        .iter()
        .filter_map(|(auction, packed)| packed.unpack().ok().map(|data| (*auction, data)))
}

/// Get auction summaries for listing.
pub fn get_auction_summaries(
    state: &ModuleState,
    now: Slot,
    offset: usize,
    limit: usize,
) -> Vec<AuctionSummary> {
    decoded_auctions(state)
        .skip(offset)
        .take(limit)
        .map(|(auction, data)| {
            AuctionSummary::from_auction(auction, &data, now, state.balance_of(&auction))
        })
        .collect()
}

/// Get auctions currently accepting bids.
pub fn get_open_auctions(state: &ModuleState, now: Slot) -> Vec<AuctionSummary> {
    decoded_auctions(state)
        .filter(|(_, data)| data.phase(now) == AuctionPhase::Open)
        .map(|(auction, data)| {
            AuctionSummary::from_auction(auction, &data, now, state.balance_of(&auction))
        })
        .collect()
}

// =========================
// KEEPER PLANNING
// =========================

/// A permissionless call an auction is ready for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeeperAction {
    SettleAuction,
    SettlePayment,
    SettleAuctioneerPayment,
    WithdrawNft,
    Withdraw,
}

/// A keeper action bound to its auction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    pub auction: Address,
    pub action: KeeperAction,
}

/// Calls `data` is ready for at slot `now`, in submission order.
///
/// Withdraw-mode auctions are never settled by the keeper: between the end
/// slot and the withdraw window settlement is left to the participants, and
/// after the window the keeper unwinds them.
pub fn next_actions(data: &AuctionData, now: Slot) -> Vec<KeeperAction> {
    let mut actions = Vec::new();
    let has_bid = data.highest_bidder.is_some();
    let window_open = now as u64 >= data.withdraw_opens_at();

    match data.status {
        AuctionStatus::Active if now < data.auction_end_time => {}
        AuctionStatus::Active => match data.mode {
            AuctionMode::Standard => actions.push(KeeperAction::SettleAuction),
            AuctionMode::Withdraw if window_open => {
                actions.push(KeeperAction::WithdrawNft);
                if has_bid {
                    actions.push(KeeperAction::Withdraw);
                }
            }
            AuctionMode::Withdraw => {}
        },
        AuctionStatus::Settled {
            seller_paid,
            auctioneer_paid,
        } => {
            if has_bid && !seller_paid {
                actions.push(KeeperAction::SettlePayment);
            }
            if has_bid && !auctioneer_paid {
                actions.push(KeeperAction::SettleAuctioneerPayment);
            }
        }
        AuctionStatus::Withdrawn {
            nft_returned,
            bid_refunded,
        } => {
            if !nft_returned {
                actions.push(KeeperAction::WithdrawNft);
            }
            if has_bid && !bid_refunded {
                actions.push(KeeperAction::Withdraw);
            }
        }
    }

    actions
}

/// Get every auction action a keeper could submit at `now`.
pub fn get_pending_actions(state: &ModuleState, now: Slot) -> Vec<PendingAction> {
    decoded_auctions(state)
        .flat_map(|(auction, data)| {
            next_actions(&data, now)
                .into_iter()
                .map(move |action| PendingAction { auction, action })
        })
        .collect()
}

//! Off-chain auction index.
//!
//! Decodes packed auction state straight from its hex form, without running
//! any contract logic, and answers listing and keeper-planning questions over
//! the decoded set.

use std::collections::BTreeMap;

use nft_auction_module::{next_actions, PendingAction};
use nft_auction_types::{Address, AuctionData, AuctionPhase, PackError, PackedAuctionState, Slot};
use thiserror::Error;

use crate::rpc::{parse_address, parse_hex, PackedStateRpc, ParseError};

/// Errors decoding indexed state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexerError {
    #[error("Malformed field: {0}")]
    Parse(#[from] ParseError),

    #[error("Invalid packed state: {0}")]
    Pack(#[from] PackError),
}

/// Decode hex-encoded packed state.
pub fn decode_packed_hex(packed: &str) -> Result<AuctionData, IndexerError> {
    let bytes = parse_hex("packed", packed)?;
    Ok(PackedAuctionState::from_bytes(&bytes)?.unpack()?)
}

/// Decoded auctions keyed by auction account.
#[derive(Debug, Default, Clone)]
pub struct AuctionIndex {
    auctions: BTreeMap<Address, AuctionData>,
}

impl AuctionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from a full listing, failing on the first bad entry.
    pub fn from_listing(listing: &[PackedStateRpc]) -> Result<Self, IndexerError> {
        let mut index = Self::new();
        for entry in listing {
            index.ingest(entry)?;
        }
        Ok(index)
    }

    /// Insert or replace one auction.
    pub fn ingest(&mut self, entry: &PackedStateRpc) -> Result<(), IndexerError> {
        let auction = parse_address(&entry.auction)?;
        let data = decode_packed_hex(&entry.packed)?;
        self.auctions.insert(auction, data);
        Ok(())
    }

    pub fn get(&self, auction: &Address) -> Option<&AuctionData> {
        self.auctions.get(auction)
    }

    pub fn len(&self) -> usize {
        self.auctions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.auctions.is_empty()
    }

    /// Auctions accepting bids at `now`.
    pub fn open_at(&self, now: Slot) -> Vec<Address> {
        self.auctions
            .iter()
            .filter(|(_, data)| data.phase(now) == AuctionPhase::Open)
            .map(|(auction, _)| *auction)
            .collect()
    }

    /// Auctions listed by `seller`.
    pub fn by_seller(&self, seller: &Address) -> Vec<Address> {
        self.auctions
            .iter()
            .filter(|(_, data)| data.seller == *seller)
            .map(|(auction, _)| *auction)
            .collect()
    }

    /// Keeper actions due at `now`, in auction order.
    pub fn pending_actions(&self, now: Slot) -> Vec<PendingAction> {
        self.auctions
            .iter()
            .flat_map(|(auction, data)| {
                next_actions(data, now)
                    .into_iter()
                    .map(move |action| PendingAction {
                        auction: *auction,
                        action,
                    })
            })
            .collect()
    }
}

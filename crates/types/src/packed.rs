//! Fixed-layout encoding of [`AuctionData`].
//!
//! Each auction account stores exactly one [`PackedAuctionState`]. The layout
//! is stable so that indexers can decode it without running auction logic.
//! Integers are little-endian.
//!
//! | offset | width | field              | notes                                  |
//! |-------:|------:|--------------------|----------------------------------------|
//! |      0 |     1 | layout version     | currently [`PACKED_VERSION`]           |
//! |      1 |    32 | seller             |                                        |
//! |     33 |    32 | auctioneer         |                                        |
//! |     65 |    32 | collection         |                                        |
//! |     97 |    32 | nft                |                                        |
//! |    129 |     8 | minimum_price      | u64                                    |
//! |    137 |     4 | auction_end_time   | u32 slot                               |
//! |    141 |     4 | withdraw_period    | u32 slots                              |
//! |    145 |     8 | transfer_fee       | u64                                    |
//! |    153 |     4 | sale_fee           | u32 bps, at most 10000                 |
//! |    157 |     8 | highest_bid        | u64, 0 when no bid                     |
//! |    165 |    32 | highest_bidder     | all zero when highest_bid is 0         |
//! |    197 |     1 | mode               | 0 standard, 1 withdraw                 |
//! |    198 |     1 | status tag         | 0 active, 1 settled, 2 withdrawn       |
//! |    199 |     1 | status flags       | settled: bit0 seller paid, bit1 auctioneer paid |
//! |        |       |                    | withdrawn: bit0 nft returned, bit1 bid refunded |

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use thiserror::Error;

use crate::{Address, AuctionData, AuctionMode, AuctionStatus, NftId, BPS_DENOMINATOR, EMPTY_ADDRESS};

/// Encoded size in bytes.
pub const PACKED_LEN: usize = 200;

/// Layout version written at offset 0.
pub const PACKED_VERSION: u8 = 1;

const MODE_STANDARD: u8 = 0;
const MODE_WITHDRAW: u8 = 1;

const STATUS_ACTIVE: u8 = 0;
const STATUS_SETTLED: u8 = 1;
const STATUS_WITHDRAWN: u8 = 2;

const FLAG_0: u8 = 0b01;
const FLAG_1: u8 = 0b10;

/// Errors from packing or unpacking auction state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackError {
    #[error("Invalid packed length: expected {expected}, got {got}")]
    Length { expected: usize, got: usize },

    #[error("Malformed packed state: {0}")]
    Encoding(String),

    #[error("Unsupported layout version {0}")]
    UnsupportedVersion(u8),

    #[error("Invalid auction mode tag {0}")]
    InvalidMode(u8),

    #[error("Invalid status tag {0}")]
    InvalidStatus(u8),

    #[error("Invalid flags {flags:#04b} for status tag {tag}")]
    InvalidStatusFlags { tag: u8, flags: u8 },

    #[error("Sale fee {0} bps exceeds 10000")]
    InvalidSaleFee(u32),

    #[error("Highest bid and highest bidder disagree")]
    BidderMismatch,

    #[error("Highest bid {bid} below minimum price {minimum}")]
    BidBelowMinimum { bid: u64, minimum: u64 },

    #[error("Withdrawn status requires withdraw mode")]
    WithdrawnInStandardMode,

    #[error("Payout recorded for an auction without a sale")]
    PayoutWithoutSale,
}

/// Field order and widths of the table above. Borsh writes fixed arrays
/// raw and integers little-endian, so this encodes to exactly [`PACKED_LEN`]
/// bytes.
#[derive(BorshSerialize, BorshDeserialize)]
struct PackedLayout {
    version: u8,
    seller: Address,
    auctioneer: Address,
    collection: Address,
    nft: Address,
    minimum_price: u64,
    auction_end_time: u32,
    withdraw_period: u32,
    transfer_fee: u64,
    sale_fee: u32,
    highest_bid: u64,
    highest_bidder: Address,
    mode: u8,
    status_tag: u8,
    status_flags: u8,
}

/// One auction's persisted state.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct PackedAuctionState(#[serde_as(as = "[_; 200]")] pub [u8; PACKED_LEN]);

impl PackedAuctionState {
    /// Encode `data`. Fails only for states that violate the auction invariants.
    pub fn pack(data: &AuctionData) -> Result<Self, PackError> {
        validate(data)?;

        let (status_tag, status_flags) = encode_status(&data.status);
        let layout = PackedLayout {
            version: PACKED_VERSION,
            seller: data.seller,
            auctioneer: data.auctioneer,
            collection: data.nft.collection,
            nft: data.nft.nft,
            minimum_price: data.minimum_price,
            auction_end_time: data.auction_end_time,
            withdraw_period: data.withdraw_period,
            transfer_fee: data.transfer_fee,
            sale_fee: data.sale_fee,
            highest_bid: data.highest_bid,
            highest_bidder: data.highest_bidder.unwrap_or(EMPTY_ADDRESS),
            mode: match data.mode {
                AuctionMode::Standard => MODE_STANDARD,
                AuctionMode::Withdraw => MODE_WITHDRAW,
            },
            status_tag,
            status_flags,
        };

        let bytes = borsh::to_vec(&layout).map_err(|e| PackError::Encoding(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Decode and validate.
    pub fn unpack(&self) -> Result<AuctionData, PackError> {
        let layout = PackedLayout::try_from_slice(&self.0)
            .map_err(|e| PackError::Encoding(e.to_string()))?;

        if layout.version != PACKED_VERSION {
            return Err(PackError::UnsupportedVersion(layout.version));
        }
        let mode = match layout.mode {
            MODE_STANDARD => AuctionMode::Standard,
            MODE_WITHDRAW => AuctionMode::Withdraw,
            other => return Err(PackError::InvalidMode(other)),
        };
        let status = decode_status(layout.status_tag, layout.status_flags)?;

        let highest_bidder = if layout.highest_bid == 0 {
            if layout.highest_bidder != EMPTY_ADDRESS {
                return Err(PackError::BidderMismatch);
            }
            None
        } else {
            Some(layout.highest_bidder)
        };

        let data = AuctionData {
            seller: layout.seller,
            auctioneer: layout.auctioneer,
            nft: NftId {
                collection: layout.collection,
                nft: layout.nft,
            },
            minimum_price: layout.minimum_price,
            auction_end_time: layout.auction_end_time,
            withdraw_period: layout.withdraw_period,
            transfer_fee: layout.transfer_fee,
            sale_fee: layout.sale_fee,
            mode,
            highest_bid: layout.highest_bid,
            highest_bidder,
            status,
        };
        validate(&data)?;
        Ok(data)
    }

    /// Wrap raw bytes read from an account or an RPC response.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PackError> {
        let array: [u8; PACKED_LEN] = bytes.try_into().map_err(|_| PackError::Length {
            expected: PACKED_LEN,
            got: bytes.len(),
        })?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; PACKED_LEN] {
        &self.0
    }
}

/// Check the invariants every stored auction state satisfies.
pub fn validate(data: &AuctionData) -> Result<(), PackError> {
    if data.sale_fee > BPS_DENOMINATOR {
        return Err(PackError::InvalidSaleFee(data.sale_fee));
    }

    match (data.highest_bid, data.highest_bidder) {
        (0, None) => {}
        (bid, Some(bidder)) if bid > 0 && bidder != EMPTY_ADDRESS => {
            if bid < data.minimum_price {
                return Err(PackError::BidBelowMinimum {
                    bid,
                    minimum: data.minimum_price,
                });
            }
        }
        _ => return Err(PackError::BidderMismatch),
    }

    match data.status {
        AuctionStatus::Active => {}
        AuctionStatus::Settled {
            seller_paid,
            auctioneer_paid,
        } => {
            if data.highest_bid == 0 && (seller_paid || auctioneer_paid) {
                return Err(PackError::PayoutWithoutSale);
            }
        }
        AuctionStatus::Withdrawn {
            nft_returned,
            bid_refunded,
        } => {
            if data.mode != AuctionMode::Withdraw {
                return Err(PackError::WithdrawnInStandardMode);
            }
            if !nft_returned && !bid_refunded {
                return Err(PackError::InvalidStatusFlags {
                    tag: STATUS_WITHDRAWN,
                    flags: 0,
                });
            }
        }
    }

    Ok(())
}

fn encode_status(status: &AuctionStatus) -> (u8, u8) {
    let bits = |a: bool, b: bool| (if a { FLAG_0 } else { 0 }) | (if b { FLAG_1 } else { 0 });
    match *status {
        AuctionStatus::Active => (STATUS_ACTIVE, 0),
        AuctionStatus::Settled {
            seller_paid,
            auctioneer_paid,
        } => (STATUS_SETTLED, bits(seller_paid, auctioneer_paid)),
        AuctionStatus::Withdrawn {
            nft_returned,
            bid_refunded,
        } => (STATUS_WITHDRAWN, bits(nft_returned, bid_refunded)),
    }
}

fn decode_status(tag: u8, flags: u8) -> Result<AuctionStatus, PackError> {
    if flags & !(FLAG_0 | FLAG_1) != 0 {
        return Err(PackError::InvalidStatusFlags { tag, flags });
    }
    let first = flags & FLAG_0 != 0;
    let second = flags & FLAG_1 != 0;
    match tag {
        STATUS_ACTIVE if flags == 0 => Ok(AuctionStatus::Active),
        STATUS_ACTIVE => Err(PackError::InvalidStatusFlags { tag, flags }),
        STATUS_SETTLED => Ok(AuctionStatus::Settled {
            seller_paid: first,
            auctioneer_paid: second,
        }),
        STATUS_WITHDRAWN => Ok(AuctionStatus::Withdrawn {
            nft_returned: first,
            bid_refunded: second,
        }),
        other => Err(PackError::InvalidStatus(other)),
    }
}

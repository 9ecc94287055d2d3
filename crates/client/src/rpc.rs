//! JSON-RPC wire types.
//!
//! These types are JSON-serializable versions of the core auction types, with
//! addresses and hashes hex-encoded. The mock chain serves them; the CLI and
//! the settler consume them.

use nft_auction_module::{CallReceipt, KeeperAction, NftRecord, PendingAction};
use nft_auction_types::{
    Address, AuctionData, AuctionMode, AuctionParams, AuctionStatus, NftId, Slot, UpgradeProof,
    VerificationKeyRecord,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors decoding RPC string fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Invalid hex in {field}: {reason}")]
    InvalidHex { field: &'static str, reason: String },

    #[error("{field} must be {expected} bytes, got {got}")]
    InvalidLength {
        field: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Unknown auction mode: {0}")]
    InvalidMode(String),

    #[error("Unknown keeper action: {0}")]
    InvalidAction(String),
}

/// Decode a hex string (optionally `0x`-prefixed) into exactly 32 bytes.
pub fn parse_bytes32(field: &'static str, s: &str) -> Result<[u8; 32], ParseError> {
    let bytes = parse_hex(field, s)?;
    let got = bytes.len();
    bytes.try_into().map_err(|_| ParseError::InvalidLength {
        field,
        expected: 32,
        got,
    })
}

/// Decode an address.
pub fn parse_address(s: &str) -> Result<Address, ParseError> {
    parse_bytes32("address", s)
}

/// Decode arbitrary hex bytes (optionally `0x`-prefixed).
pub fn parse_hex(field: &'static str, s: &str) -> Result<Vec<u8>, ParseError> {
    hex::decode(s.trim_start_matches("0x")).map_err(|e| ParseError::InvalidHex {
        field,
        reason: e.to_string(),
    })
}

pub fn mode_name(mode: AuctionMode) -> &'static str {
    match mode {
        AuctionMode::Standard => "standard",
        AuctionMode::Withdraw => "withdraw",
    }
}

pub fn parse_mode(s: &str) -> Result<AuctionMode, ParseError> {
    match s {
        "standard" => Ok(AuctionMode::Standard),
        "withdraw" => Ok(AuctionMode::Withdraw),
        other => Err(ParseError::InvalidMode(other.to_string())),
    }
}

pub fn action_name(action: KeeperAction) -> &'static str {
    match action {
        KeeperAction::SettleAuction => "settle_auction",
        KeeperAction::SettlePayment => "settle_payment",
        KeeperAction::SettleAuctioneerPayment => "settle_auctioneer_payment",
        KeeperAction::WithdrawNft => "withdraw_nft",
        KeeperAction::Withdraw => "withdraw",
    }
}

pub fn parse_action(s: &str) -> Result<KeeperAction, ParseError> {
    match s {
        "settle_auction" => Ok(KeeperAction::SettleAuction),
        "settle_payment" => Ok(KeeperAction::SettlePayment),
        "settle_auctioneer_payment" => Ok(KeeperAction::SettleAuctioneerPayment),
        "withdraw_nft" => Ok(KeeperAction::WithdrawNft),
        "withdraw" => Ok(KeeperAction::Withdraw),
        other => Err(ParseError::InvalidAction(other.to_string())),
    }
}

// =========================
// REQUESTS
// =========================

/// Parameters for deploying an auction. The sender is the seller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployParams {
    pub sender: String,
    pub auction: String,
    pub collection: String,
    pub nft: String,
    pub minimum_price: u64,
    pub auction_end_time: Slot,
    pub auctioneer: String,
    pub transfer_fee: u64,
    /// Basis points out of 10000
    pub sale_fee: u32,
    pub withdraw_period: Slot,
    /// "standard" or "withdraw"
    pub mode: String,
}

impl DeployParams {
    /// Decode into `(sender, auction, params)`.
    pub fn decode(&self) -> Result<(Address, Address, AuctionParams), ParseError> {
        let sender = parse_bytes32("sender", &self.sender)?;
        let params = AuctionParams {
            collection: parse_bytes32("collection", &self.collection)?,
            nft: parse_bytes32("nft", &self.nft)?,
            owner: sender,
            minimum_price: self.minimum_price,
            auction_end_time: self.auction_end_time,
            auctioneer: parse_bytes32("auctioneer", &self.auctioneer)?,
            transfer_fee: self.transfer_fee,
            sale_fee: self.sale_fee,
            withdraw_period: self.withdraw_period,
            mode: parse_mode(&self.mode)?,
        };
        Ok((sender, parse_bytes32("auction", &self.auction)?, params))
    }
}

/// Identifies an NFT.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NftParams {
    pub collection: String,
    pub nft: String,
}

impl NftParams {
    pub fn decode(&self) -> Result<NftId, ParseError> {
        Ok(NftId {
            collection: parse_bytes32("collection", &self.collection)?,
            nft: parse_bytes32("nft", &self.nft)?,
        })
    }
}

impl From<&NftId> for NftParams {
    fn from(id: &NftId) -> Self {
        Self {
            collection: hex::encode(id.collection),
            nft: hex::encode(id.nft),
        }
    }
}

/// Upgrade authorization for RPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpgradeProofRpc {
    pub authority: String,
    pub contract: String,
    pub new_vk_hash: String,
    pub valid_from: Slot,
    pub digest: String,
}

impl UpgradeProofRpc {
    pub fn decode(&self) -> Result<UpgradeProof, ParseError> {
        Ok(UpgradeProof {
            authority: parse_bytes32("authority", &self.authority)?,
            contract: parse_bytes32("contract", &self.contract)?,
            new_vk_hash: parse_bytes32("new_vk_hash", &self.new_vk_hash)?,
            valid_from: self.valid_from,
            digest: parse_bytes32("digest", &self.digest)?,
        })
    }
}

impl From<&UpgradeProof> for UpgradeProofRpc {
    fn from(p: &UpgradeProof) -> Self {
        Self {
            authority: hex::encode(p.authority),
            contract: hex::encode(p.contract),
            new_vk_hash: hex::encode(p.new_vk_hash),
            valid_from: p.valid_from,
            digest: hex::encode(p.digest),
        }
    }
}

/// Parameters for a verification key upgrade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpgradeParams {
    pub sender: String,
    pub auction: String,
    /// Hex-encoded verification key
    pub verification_key: String,
    pub proof: UpgradeProofRpc,
}

// =========================
// RESPONSES
// =========================

/// Current chain slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotInfo {
    pub slot: Slot,
}

/// Outcome of one call in a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptRpc {
    /// Receipt kind, e.g. "bid_accepted"
    pub kind: String,
    /// Value moved by the call, if any
    pub amount: Option<u64>,
    /// Account that received the value or the NFT
    pub account: Option<String>,
    pub transfer_fee: Option<u64>,
    pub version: Option<u32>,
}

impl ReceiptRpc {
    fn kind(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            amount: None,
            account: None,
            transfer_fee: None,
            version: None,
        }
    }
}

impl From<&CallReceipt> for ReceiptRpc {
    fn from(receipt: &CallReceipt) -> Self {
        match receipt {
            CallReceipt::Deployed { auction } => Self {
                account: Some(hex::encode(auction)),
                ..Self::kind("deployed")
            },
            CallReceipt::BidAccepted { amount, refund } => Self {
                amount: Some(*amount),
                account: refund.map(|r| hex::encode(r.to)),
                ..Self::kind("bid_accepted")
            },
            CallReceipt::Settled { winner } => Self {
                account: winner.map(hex::encode),
                ..Self::kind("settled")
            },
            CallReceipt::SellerPaid {
                proceeds,
                transfer_fee,
            } => Self {
                amount: Some(*proceeds),
                transfer_fee: Some(*transfer_fee),
                ..Self::kind("seller_paid")
            },
            CallReceipt::AuctioneerPaid { amount } => Self {
                amount: Some(*amount),
                ..Self::kind("auctioneer_paid")
            },
            CallReceipt::NftReturned { to } => Self {
                account: Some(hex::encode(to)),
                ..Self::kind("nft_returned")
            },
            CallReceipt::Withdrawn { refund } => Self {
                amount: Some(refund.map(|r| r.amount).unwrap_or(0)),
                account: refund.map(|r| hex::encode(r.to)),
                ..Self::kind("withdrawn")
            },
            CallReceipt::VerificationKeyUpgraded { record } => Self {
                version: Some(record.version),
                ..Self::kind("verification_key_upgraded")
            },
            CallReceipt::NftApproved => Self::kind("nft_approved"),
            CallReceipt::NftTransferred => Self::kind("nft_transferred"),
        }
    }
}

/// Receipts of an applied transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxReceiptRpc {
    pub slot: Slot,
    pub receipts: Vec<ReceiptRpc>,
}

/// Decoded auction for RPC responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionRpc {
    pub auction: String,
    pub seller: String,
    pub auctioneer: String,
    pub collection: String,
    pub nft: String,
    pub minimum_price: u64,
    pub auction_end_time: Slot,
    pub withdraw_period: Slot,
    pub withdraw_opens_at: u64,
    pub transfer_fee: u64,
    pub sale_fee: u32,
    pub mode: String,
    pub highest_bid: u64,
    pub highest_bidder: Option<String>,
    /// "open", "ended", "settled" or "withdrawn" at the queried slot
    pub phase: String,
    pub seller_paid: bool,
    pub auctioneer_paid: bool,
    pub nft_returned: bool,
    pub bid_refunded: bool,
    /// Ledger balance of the auction account
    pub escrow: u64,
}

impl AuctionRpc {
    pub fn from_data(auction: &Address, data: &AuctionData, now: Slot, escrow: u64) -> Self {
        let (seller_paid, auctioneer_paid, nft_returned, bid_refunded) = match data.status {
            AuctionStatus::Active => (false, false, false, false),
            AuctionStatus::Settled {
                seller_paid,
                auctioneer_paid,
            } => (seller_paid, auctioneer_paid, false, false),
            AuctionStatus::Withdrawn {
                nft_returned,
                bid_refunded,
            } => (false, false, nft_returned, bid_refunded),
        };
        Self {
            auction: hex::encode(auction),
            seller: hex::encode(data.seller),
            auctioneer: hex::encode(data.auctioneer),
            collection: hex::encode(data.nft.collection),
            nft: hex::encode(data.nft.nft),
            minimum_price: data.minimum_price,
            auction_end_time: data.auction_end_time,
            withdraw_period: data.withdraw_period,
            withdraw_opens_at: data.withdraw_opens_at(),
            transfer_fee: data.transfer_fee,
            sale_fee: data.sale_fee,
            mode: mode_name(data.mode).to_string(),
            highest_bid: data.highest_bid,
            highest_bidder: data.highest_bidder.map(hex::encode),
            phase: format!("{:?}", data.phase(now)).to_lowercase(),
            seller_paid,
            auctioneer_paid,
            nft_returned,
            bid_refunded,
            escrow,
        }
    }
}

/// Packed auction state, hex-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedStateRpc {
    pub auction: String,
    pub packed: String,
}

/// NFT ownership for RPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NftRpc {
    pub owner: String,
    pub approved: Option<String>,
    pub locked_by: Option<String>,
}

impl From<&NftRecord> for NftRpc {
    fn from(r: &NftRecord) -> Self {
        Self {
            owner: hex::encode(r.owner),
            approved: r.approved.map(hex::encode),
            locked_by: r.locked_by.map(hex::encode),
        }
    }
}

/// Verification key record for RPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationKeyRpc {
    pub hash: String,
    pub version: u32,
}

impl From<&VerificationKeyRecord> for VerificationKeyRpc {
    fn from(r: &VerificationKeyRecord) -> Self {
        Self {
            hash: hex::encode(r.hash),
            version: r.version,
        }
    }
}

/// Keeper action for RPC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingActionRpc {
    pub auction: String,
    pub action: String,
}

impl From<&PendingAction> for PendingActionRpc {
    fn from(p: &PendingAction) -> Self {
        Self {
            auction: hex::encode(p.auction),
            action: action_name(p.action).to_string(),
        }
    }
}

impl PendingActionRpc {
    pub fn decode(&self) -> Result<PendingAction, ParseError> {
        Ok(PendingAction {
            auction: parse_bytes32("auction", &self.auction)?,
            action: parse_action(&self.action)?,
        })
    }
}

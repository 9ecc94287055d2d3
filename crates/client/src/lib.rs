//! Client SDK for NFT auctions.
//!
//! This crate provides:
//! - JSON-RPC wire types shared with the mock chain (`rpc`)
//! - An off-chain index that decodes packed auction state (`indexer`)
//! - The `auction-cli` binary driving every chain RPC

pub mod indexer;
pub mod rpc;

pub use indexer::{decode_packed_hex, AuctionIndex, IndexerError};
pub use rpc::{parse_address, ParseError};

/// JSON-RPC error code for rejected calls.
pub const RPC_REJECTED: i32 = -32000;

/// JSON-RPC error code for rejections caused by a stale view; refresh and retry.
pub const RPC_RETRYABLE: i32 = -32001;

/// Whether an RPC failure is worth retrying after refreshing state.
pub fn is_retryable(err: &jsonrpsee::core::client::Error) -> bool {
    matches!(err, jsonrpsee::core::client::Error::Call(obj) if obj.code() == RPC_RETRYABLE)
}

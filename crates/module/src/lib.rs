//! Sovereign SDK style module for NFT auctions.
//!
//! This module implements the on-chain logic of a single-NFT English auction:
//!
//! - Deploy bound to one NFT, with custody granted in the same transaction
//! - Strictly increasing bids, escrowed with atomic refund of the outbid party
//! - Permissionless settlement and exact fee-split payouts
//! - Time-gated withdraw path for withdraw-mode auctions
//! - Verification key upgrades approved by an upgrade authority
//!
//! # Architecture
//!
//! The module follows Sovereign SDK patterns:
//! - `call`: Message types for state-changing operations
//! - `handlers`: Business logic for processing calls
//! - `queries`: Read-only state access and keeper planning
//! - `state`: On-chain state structures
//! - `custody`: NFT ownership registry the auction moves NFTs through
//! - `upgrade`: Verification key upgrade authorization
//! - `genesis`: Initial configuration
//! - `error`: Error types
//!
//! # Example
//!
//! ```ignore
//! use nft_auction_module::{handlers, AuctionCall, AuctionState, CallContext};
//!
//! let mut state = AuctionState::new();
//! let ctx = CallContext { sender: seller, slot: 0 };
//!
//! // Approve the auction as custodian and deploy in one transaction
//! handlers::apply_transaction(&mut state, &ctx, vec![
//!     AuctionCall::ApproveNft { nft, approved: Some(auction) },
//!     AuctionCall::Deploy { auction, params },
//! ])?;
//! ```

pub mod call;
pub mod custody;
pub mod error;
pub mod genesis;
pub mod handlers;
pub mod queries;
pub mod state;
pub mod upgrade;

pub use call::AuctionCall;
pub use custody::{CustodyError, NftRecord, NftRegistry};
pub use error::{AuctionError, Payee};
pub use genesis::{AuctionGenesisConfig, AuctionLimits, GenesisValidationError};
pub use handlers::{apply_transaction, CallContext, CallReceipt, HandlerResult, Refund};
pub use queries::{
    next_actions, AuctionQuery, AuctionQueryResponse, AuctionSummary, KeeperAction, PendingAction,
};
pub use state::AuctionState;
pub use upgrade::{DesignatedAuthority, UpgradeAuthority};

//! Permissionless keeper for NFT auctions.
//!
//! The settler service polls the chain for packed auction state, decodes it
//! locally and submits whatever call each auction is ready for:
//! - settlement once bidding has ended
//! - seller and auctioneer payouts after settlement
//! - NFT return and bid refund once a withdraw window has opened
//!
//! Anyone can run this service. Every call it makes is permissionless and
//! rejected calls are harmless, so several keepers may race on one chain.

pub mod service;

pub use service::{SettlementService, SettlerConfig};

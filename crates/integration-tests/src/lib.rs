//! End-to-end integration tests for the NFT auction system.
//!
//! These tests drive whole auction lifecycles through the module's
//! transaction entry point:
//! 1. Custody grant and deployment
//! 2. Bidding with escrow and refunds
//! 3. Settlement and the split payouts
//! 4. The time-gated withdraw path
//! 5. Verification-key upgrades
//! 6. Off-chain decoding of the packed state

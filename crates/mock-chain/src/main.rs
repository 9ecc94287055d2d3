//! Mock chain server for local testing of the NFT auction system.
//!
//! This provides a JSON-RPC server that simulates on-chain state management
//! for the auction module without requiring a real blockchain. Every auction
//! call is applied as an atomic transaction at the current slot.

use anyhow::Result;
use clap::Parser;
use jsonrpsee::core::async_trait;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::server::Server;
use jsonrpsee::types::error::INVALID_PARAMS_CODE;
use jsonrpsee::types::ErrorObjectOwned;
use parking_lot::RwLock;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use nft_auction_client::rpc::{
    parse_address, parse_bytes32, parse_hex, AuctionRpc, DeployParams, NftParams, NftRpc,
    PackedStateRpc, ParseError, PendingActionRpc, ReceiptRpc, SlotInfo, TxReceiptRpc,
    UpgradeParams, VerificationKeyRpc,
};
use nft_auction_client::{RPC_REJECTED, RPC_RETRYABLE};
use nft_auction_module::queries::get_pending_actions;
use nft_auction_module::{AuctionCall, AuctionError, AuctionGenesisConfig};
use nft_auction_types::{Address, AuctionMode, NftId, Slot};

mod chain;
use chain::ChainState;

#[derive(Parser)]
#[command(name = "mock-chain")]
#[command(about = "JSON-RPC mock chain for NFT auctions")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:9944")]
    listen: SocketAddr,

    /// Genesis configuration (JSON)
    #[arg(long)]
    genesis: Option<PathBuf>,
}

/// RPC API definition for the mock chain.
#[rpc(server)]
pub trait MockChainApi {
    // ============ Admin Methods ============

    /// Reset the chain from a genesis config.
    #[method(name = "admin_init")]
    async fn admin_init(&self, config: AuctionGenesisConfig) -> Result<SlotInfo, ErrorObjectOwned>;

    /// Advance the slot clock.
    #[method(name = "admin_advanceSlot")]
    async fn admin_advance_slot(&self, count: u32) -> Result<SlotInfo, ErrorObjectOwned>;

    /// Jump to a later slot (for testing time-dependent logic).
    #[method(name = "admin_setSlot")]
    async fn admin_set_slot(&self, slot: Slot) -> Result<SlotInfo, ErrorObjectOwned>;

    /// Credit an account.
    #[method(name = "admin_fund")]
    async fn admin_fund(&self, address: String, amount: u64) -> Result<u64, ErrorObjectOwned>;

    /// Mint an NFT.
    #[method(name = "admin_mintNft")]
    async fn admin_mint_nft(&self, nft: NftParams, owner: String)
        -> Result<bool, ErrorObjectOwned>;

    // ============ NFT Methods ============

    /// Set or clear the approved custodian of an NFT.
    #[method(name = "nft_approve")]
    async fn nft_approve(
        &self,
        sender: String,
        nft: NftParams,
        approved: Option<String>,
    ) -> Result<TxReceiptRpc, ErrorObjectOwned>;

    /// Transfer an NFT.
    #[method(name = "nft_transfer")]
    async fn nft_transfer(
        &self,
        sender: String,
        nft: NftParams,
        to: String,
    ) -> Result<TxReceiptRpc, ErrorObjectOwned>;

    // ============ Auction Methods ============

    /// Grant custody and deploy an auction in one transaction.
    #[method(name = "auction_deploy")]
    async fn auction_deploy(&self, params: DeployParams) -> Result<TxReceiptRpc, ErrorObjectOwned>;

    /// Place a bid; the sender is the bidder.
    #[method(name = "auction_bid")]
    async fn auction_bid(
        &self,
        sender: String,
        auction: String,
        amount: u64,
    ) -> Result<TxReceiptRpc, ErrorObjectOwned>;

    /// Settle an ended auction.
    #[method(name = "auction_settle")]
    async fn auction_settle(
        &self,
        sender: String,
        auction: String,
    ) -> Result<TxReceiptRpc, ErrorObjectOwned>;

    /// Pay the seller and the transfer fee.
    #[method(name = "auction_settlePayment")]
    async fn auction_settle_payment(
        &self,
        sender: String,
        auction: String,
    ) -> Result<TxReceiptRpc, ErrorObjectOwned>;

    /// Pay the auctioneer, guarded by the caller's view of the escrow balance.
    #[method(name = "auction_settleAuctioneerPayment")]
    async fn auction_settle_auctioneer_payment(
        &self,
        sender: String,
        auction: String,
        balance: u64,
    ) -> Result<TxReceiptRpc, ErrorObjectOwned>;

    /// Return the NFT to the seller after the withdraw window.
    #[method(name = "auction_withdrawNft")]
    async fn auction_withdraw_nft(
        &self,
        sender: String,
        auction: String,
    ) -> Result<TxReceiptRpc, ErrorObjectOwned>;

    /// Refund the highest bidder after the withdraw window.
    #[method(name = "auction_withdraw")]
    async fn auction_withdraw(
        &self,
        sender: String,
        auction: String,
    ) -> Result<TxReceiptRpc, ErrorObjectOwned>;

    /// Replace an auction's verification key.
    #[method(name = "auction_upgradeVerificationKey")]
    async fn auction_upgrade_verification_key(
        &self,
        params: UpgradeParams,
    ) -> Result<TxReceiptRpc, ErrorObjectOwned>;

    // ============ Query Methods ============

    /// Get the current slot.
    #[method(name = "chain_getSlot")]
    async fn chain_get_slot(&self) -> Result<SlotInfo, ErrorObjectOwned>;

    /// Get decoded auction state.
    #[method(name = "query_getAuction")]
    async fn query_get_auction(&self, auction: String)
        -> Result<Option<AuctionRpc>, ErrorObjectOwned>;

    /// Get hex-encoded packed auction state.
    #[method(name = "query_getPackedState")]
    async fn query_get_packed_state(
        &self,
        auction: String,
    ) -> Result<Option<String>, ErrorObjectOwned>;

    /// List all auctions.
    #[method(name = "query_listAuctions")]
    async fn query_list_auctions(&self) -> Result<Vec<AuctionRpc>, ErrorObjectOwned>;

    /// List the packed state of every auction.
    #[method(name = "query_listPackedStates")]
    async fn query_list_packed_states(&self) -> Result<Vec<PackedStateRpc>, ErrorObjectOwned>;

    /// Get an account balance.
    #[method(name = "query_getBalance")]
    async fn query_get_balance(&self, address: String) -> Result<u64, ErrorObjectOwned>;

    /// Get NFT ownership.
    #[method(name = "query_getNft")]
    async fn query_get_nft(&self, nft: NftParams) -> Result<Option<NftRpc>, ErrorObjectOwned>;

    /// Get an auction's verification key record.
    #[method(name = "query_getVerificationKey")]
    async fn query_get_verification_key(
        &self,
        auction: String,
    ) -> Result<Option<VerificationKeyRpc>, ErrorObjectOwned>;

    /// Get auctions ready for a permissionless call.
    #[method(name = "query_getPendingActions")]
    async fn query_get_pending_actions(&self) -> Result<Vec<PendingActionRpc>, ErrorObjectOwned>;
}

/// Implementation of the mock chain RPC server.
struct MockChainServer {
    state: Arc<RwLock<ChainState>>,
}

impl MockChainServer {
    fn new(chain: ChainState) -> Self {
        Self {
            state: Arc::new(RwLock::new(chain)),
        }
    }

    fn rpc_error(msg: impl ToString) -> ErrorObjectOwned {
        ErrorObjectOwned::owned(RPC_REJECTED, msg.to_string(), None::<()>)
    }

    fn call_error(err: &AuctionError) -> ErrorObjectOwned {
        let code = if err.is_retryable() {
            RPC_RETRYABLE
        } else {
            RPC_REJECTED
        };
        ErrorObjectOwned::owned(code, err.to_string(), None::<()>)
    }

    fn invalid_params(err: ParseError) -> ErrorObjectOwned {
        ErrorObjectOwned::owned(INVALID_PARAMS_CODE, err.to_string(), None::<()>)
    }

    fn address(s: &str) -> Result<Address, ErrorObjectOwned> {
        parse_address(s).map_err(Self::invalid_params)
    }

    /// Apply a transaction and render its receipts.
    fn submit(&self, sender: Address, calls: Vec<AuctionCall>) -> Result<TxReceiptRpc, ErrorObjectOwned> {
        let mut state = self.state.write();
        let receipts = state.execute(sender, calls).map_err(|e| {
            warn!(error = %e, retryable = e.is_retryable(), "Transaction rejected");
            Self::call_error(&e)
        })?;
        Ok(TxReceiptRpc {
            slot: state.slot,
            receipts: receipts.iter().map(ReceiptRpc::from).collect(),
        })
    }

    fn submit_one(&self, sender: &str, call: AuctionCall) -> Result<TxReceiptRpc, ErrorObjectOwned> {
        self.submit(Self::address(sender)?, vec![call])
    }
}

#[async_trait]
impl MockChainApiServer for MockChainServer {
    async fn admin_init(&self, config: AuctionGenesisConfig) -> Result<SlotInfo, ErrorObjectOwned> {
        let chain = ChainState::from_genesis(&config).map_err(Self::rpc_error)?;
        let slot = chain.slot;
        *self.state.write() = chain;

        info!("Chain initialized at slot {}", slot);
        Ok(SlotInfo { slot })
    }

    async fn admin_advance_slot(&self, count: u32) -> Result<SlotInfo, ErrorObjectOwned> {
        let slot = self.state.write().advance(count).map_err(Self::rpc_error)?;
        Ok(SlotInfo { slot })
    }

    async fn admin_set_slot(&self, slot: Slot) -> Result<SlotInfo, ErrorObjectOwned> {
        let slot = self.state.write().set_slot(slot).map_err(Self::rpc_error)?;
        info!("Slot set to {}", slot);
        Ok(SlotInfo { slot })
    }

    async fn admin_fund(&self, address: String, amount: u64) -> Result<u64, ErrorObjectOwned> {
        let address = Self::address(&address)?;
        let mut state = self.state.write();
        state
            .module
            .credit(address, amount)
            .map_err(|e| Self::call_error(&e))?;
        Ok(state.module.balance_of(&address))
    }

    async fn admin_mint_nft(
        &self,
        nft: NftParams,
        owner: String,
    ) -> Result<bool, ErrorObjectOwned> {
        let id = nft.decode().map_err(Self::invalid_params)?;
        let owner = Self::address(&owner)?;
        self.state
            .write()
            .module
            .nfts
            .mint(id, owner)
            .map_err(Self::rpc_error)?;

        info!("Minted NFT {} to {}", hex::encode(id.nft), hex::encode(owner));
        Ok(true)
    }

    async fn nft_approve(
        &self,
        sender: String,
        nft: NftParams,
        approved: Option<String>,
    ) -> Result<TxReceiptRpc, ErrorObjectOwned> {
        let nft = nft.decode().map_err(Self::invalid_params)?;
        let approved = approved.as_deref().map(Self::address).transpose()?;
        self.submit_one(&sender, AuctionCall::ApproveNft { nft, approved })
    }

    async fn nft_transfer(
        &self,
        sender: String,
        nft: NftParams,
        to: String,
    ) -> Result<TxReceiptRpc, ErrorObjectOwned> {
        let nft = nft.decode().map_err(Self::invalid_params)?;
        let to = Self::address(&to)?;
        self.submit_one(&sender, AuctionCall::TransferNft { nft, to })
    }

    async fn auction_deploy(&self, params: DeployParams) -> Result<TxReceiptRpc, ErrorObjectOwned> {
        let (sender, auction, params) = params.decode().map_err(Self::invalid_params)?;
        let nft = NftId {
            collection: params.collection,
            nft: params.nft,
        };
        let custody = match params.mode {
            AuctionMode::Standard => AuctionCall::ApproveNft {
                nft,
                approved: Some(auction),
            },
            AuctionMode::Withdraw => AuctionCall::TransferNft { nft, to: auction },
        };

        let receipt = self.submit(sender, vec![custody, AuctionCall::Deploy { auction, params }])?;
        info!("Deployed auction {}", hex::encode(auction));
        Ok(receipt)
    }

    async fn auction_bid(
        &self,
        sender: String,
        auction: String,
        amount: u64,
    ) -> Result<TxReceiptRpc, ErrorObjectOwned> {
        let bidder = Self::address(&sender)?;
        let auction = Self::address(&auction)?;
        let receipt = self.submit(
            bidder,
            vec![AuctionCall::Bid {
                auction,
                amount,
                bidder,
            }],
        )?;

        info!("Bid of {} on {} by {}", amount, hex::encode(auction), sender);
        Ok(receipt)
    }

    async fn auction_settle(
        &self,
        sender: String,
        auction: String,
    ) -> Result<TxReceiptRpc, ErrorObjectOwned> {
        let auction = Self::address(&auction)?;
        let receipt = self.submit_one(&sender, AuctionCall::SettleAuction { auction })?;
        info!("Auction {} settled", hex::encode(auction));
        Ok(receipt)
    }

    async fn auction_settle_payment(
        &self,
        sender: String,
        auction: String,
    ) -> Result<TxReceiptRpc, ErrorObjectOwned> {
        let auction = Self::address(&auction)?;
        self.submit_one(&sender, AuctionCall::SettlePayment { auction })
    }

    async fn auction_settle_auctioneer_payment(
        &self,
        sender: String,
        auction: String,
        balance: u64,
    ) -> Result<TxReceiptRpc, ErrorObjectOwned> {
        let auction = Self::address(&auction)?;
        self.submit_one(
            &sender,
            AuctionCall::SettleAuctioneerPayment { auction, balance },
        )
    }

    async fn auction_withdraw_nft(
        &self,
        sender: String,
        auction: String,
    ) -> Result<TxReceiptRpc, ErrorObjectOwned> {
        let auction = Self::address(&auction)?;
        let receipt = self.submit_one(&sender, AuctionCall::WithdrawNft { auction })?;
        info!("NFT withdrawn from {}", hex::encode(auction));
        Ok(receipt)
    }

    async fn auction_withdraw(
        &self,
        sender: String,
        auction: String,
    ) -> Result<TxReceiptRpc, ErrorObjectOwned> {
        let auction = Self::address(&auction)?;
        self.submit_one(&sender, AuctionCall::Withdraw { auction })
    }

    async fn auction_upgrade_verification_key(
        &self,
        params: UpgradeParams,
    ) -> Result<TxReceiptRpc, ErrorObjectOwned> {
        let auction = parse_bytes32("auction", &params.auction).map_err(Self::invalid_params)?;
        let verification_key =
            parse_hex("verification_key", &params.verification_key).map_err(Self::invalid_params)?;
        let proof = params.proof.decode().map_err(Self::invalid_params)?;

        let receipt = self.submit_one(
            &params.sender,
            AuctionCall::UpgradeVerificationKey {
                auction,
                verification_key,
                proof,
            },
        )?;
        info!("Verification key of {} upgraded", hex::encode(auction));
        Ok(receipt)
    }

    async fn chain_get_slot(&self) -> Result<SlotInfo, ErrorObjectOwned> {
        Ok(SlotInfo {
            slot: self.state.read().slot,
        })
    }

    async fn query_get_auction(
        &self,
        auction: String,
    ) -> Result<Option<AuctionRpc>, ErrorObjectOwned> {
        let auction = Self::address(&auction)?;
        let state = self.state.read();
        Ok(state.module.load_auction(&auction).ok().map(|data| {
            AuctionRpc::from_data(&auction, &data, state.slot, state.module.balance_of(&auction))
        }))
    }

    async fn query_get_packed_state(
        &self,
        auction: String,
    ) -> Result<Option<String>, ErrorObjectOwned> {
        let auction = Self::address(&auction)?;
        let state = self.state.read();
        Ok(state
            .module
            .auctions
            .get(&auction)
            .map(|packed| hex::encode(packed.as_bytes())))
    }

    async fn query_list_auctions(&self) -> Result<Vec<AuctionRpc>, ErrorObjectOwned> {
        let state = self.state.read();
        Ok(state
            .module
            .auctions
            .iter()
            .filter_map(|(auction, packed)| {
                let data = packed.unpack().ok()?;
                Some(AuctionRpc::from_data(
                    auction,
                    &data,
                    state.slot,
                    state.module.balance_of(auction),
                ))
            })
            .collect())
    }

    async fn query_list_packed_states(&self) -> Result<Vec<PackedStateRpc>, ErrorObjectOwned> {
        let state = self.state.read();
        Ok(state
            .module
            .auctions
            .iter()
            .map(|(auction, packed)| PackedStateRpc {
                auction: hex::encode(auction),
                packed: hex::encode(packed.as_bytes()),
            })
            .collect())
    }

    async fn query_get_balance(&self, address: String) -> Result<u64, ErrorObjectOwned> {
        let address = Self::address(&address)?;
        Ok(self.state.read().module.balance_of(&address))
    }

    async fn query_get_nft(&self, nft: NftParams) -> Result<Option<NftRpc>, ErrorObjectOwned> {
        let id = nft.decode().map_err(Self::invalid_params)?;
        Ok(self
            .state
            .read()
            .module
            .nfts
            .record(&id)
            .ok()
            .map(|record| NftRpc::from(&record)))
    }

    async fn query_get_verification_key(
        &self,
        auction: String,
    ) -> Result<Option<VerificationKeyRpc>, ErrorObjectOwned> {
        let auction = Self::address(&auction)?;
        Ok(self
            .state
            .read()
            .module
            .verification_keys
            .get(&auction)
            .map(VerificationKeyRpc::from))
    }

    async fn query_get_pending_actions(&self) -> Result<Vec<PendingActionRpc>, ErrorObjectOwned> {
        let state = self.state.read();
        Ok(get_pending_actions(&state.module, state.slot)
            .iter()
            .map(PendingActionRpc::from)
            .collect())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mock_chain=info".parse()?)
                .add_directive("jsonrpsee=warn".parse()?),
        )
        .init();

    let args = Args::parse();

    let chain = match &args.genesis {
        Some(path) => {
            let config: AuctionGenesisConfig =
                serde_json::from_str(&std::fs::read_to_string(path)?)?;
            info!("Loaded genesis from {:?}", path);
            ChainState::from_genesis(&config)?
        }
        None => ChainState::new(),
    };

    info!("Starting mock chain server on {}", args.listen);

    let server = Server::builder().build(args.listen).await?;
    let handle = server.start(MockChainServer::new(chain).into_rpc());

    info!("Mock chain server running. Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutting down...");
    handle.stop()?;
    handle.stopped().await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nft_auction_types::EMPTY_ADDRESS;

    #[test]
    fn test_retryable_errors_get_distinct_code() {
        let stale = AuctionError::StaleState {
            expected: 1,
            actual: 2,
        };
        assert_eq!(MockChainServer::call_error(&stale).code(), RPC_RETRYABLE);

        let rejected = AuctionError::NotAuthorized;
        assert_eq!(MockChainServer::call_error(&rejected).code(), RPC_REJECTED);
    }

    #[test]
    fn test_submit_reports_slot() {
        let mut chain = ChainState::new();
        chain.set_slot(7).unwrap();
        let server = MockChainServer::new(chain);

        let err = server
            .submit(EMPTY_ADDRESS, vec![AuctionCall::SettleAuction { auction: [1u8; 32] }])
            .unwrap_err();
        assert_eq!(err.code(), RPC_RETRYABLE);

        let receipt = server.submit(EMPTY_ADDRESS, Vec::new()).unwrap();
        assert_eq!(receipt.slot, 7);
        assert!(receipt.receipts.is_empty());
    }
}

//! Settlement service implementation.

use std::time::Duration;

use anyhow::Result;
use jsonrpsee::core::client::{ClientT, Error as ClientError};
use jsonrpsee::core::params::ArrayParams;
use jsonrpsee::core::rpc_params;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use tracing::{debug, info, warn};

use nft_auction_client::rpc::{PackedStateRpc, SlotInfo, TxReceiptRpc};
use nft_auction_client::{is_retryable, parse_address, AuctionIndex};
use nft_auction_module::{KeeperAction, PendingAction};
use nft_auction_types::Slot;

/// Configuration for the settlement service.
#[derive(Debug, Clone)]
pub struct SettlerConfig {
    /// RPC endpoint of the chain
    pub rpc_endpoint: String,
    /// Hex account the keeper submits calls as
    pub sender: String,
    /// Polling interval in seconds
    pub poll_interval_secs: u64,
    /// Upper bound on calls submitted per poll
    pub max_actions_per_tick: usize,
}

impl Default for SettlerConfig {
    fn default() -> Self {
        Self {
            rpc_endpoint: "http://127.0.0.1:9944".to_string(),
            sender: hex::encode([0u8; 32]),
            poll_interval_secs: 10,
            max_actions_per_tick: 64,
        }
    }
}

/// Outcome of a single poll.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub slot: Slot,
    pub submitted: usize,
    /// Rejected because our view was stale or another keeper got there first
    pub skipped: usize,
}

/// RPC method that performs `action`.
pub fn method_for(action: KeeperAction) -> &'static str {
    match action {
        KeeperAction::SettleAuction => "auction_settle",
        KeeperAction::SettlePayment => "auction_settlePayment",
        KeeperAction::SettleAuctioneerPayment => "auction_settleAuctioneerPayment",
        KeeperAction::WithdrawNft => "auction_withdrawNft",
        KeeperAction::Withdraw => "auction_withdraw",
    }
}

/// Decode a packed listing and pick the calls due at `now`.
pub fn plan_actions(
    listing: &[PackedStateRpc],
    now: Slot,
    limit: usize,
) -> Result<Vec<PendingAction>> {
    let index = AuctionIndex::from_listing(listing)?;
    let mut actions = index.pending_actions(now);
    actions.truncate(limit);
    Ok(actions)
}

/// The settlement service.
pub struct SettlementService {
    config: SettlerConfig,
    client: HttpClient,
}

impl SettlementService {
    /// Create a new settlement service.
    pub fn new(config: SettlerConfig) -> Result<Self> {
        parse_address(&config.sender)?;
        let client = HttpClientBuilder::default().build(&config.rpc_endpoint)?;
        Ok(Self { config, client })
    }

    /// Poll until the process is stopped.
    pub async fn run(&self) -> Result<()> {
        info!(
            "Settler polling {} every {}s",
            self.config.rpc_endpoint, self.config.poll_interval_secs
        );

        loop {
            match self.tick().await {
                Ok(report) if report.submitted + report.skipped > 0 => info!(
                    slot = report.slot,
                    submitted = report.submitted,
                    skipped = report.skipped,
                    "Tick complete"
                ),
                Ok(report) => debug!(slot = report.slot, "Nothing to do"),
                Err(e) => warn!(error = %e, "Tick failed"),
            }
            tokio::time::sleep(Duration::from_secs(self.config.poll_interval_secs)).await;
        }
    }

    /// Fetch state once and submit every due call.
    pub async fn tick(&self) -> Result<TickReport> {
        let info: SlotInfo = self.client.request("chain_getSlot", rpc_params![]).await?;
        let listing: Vec<PackedStateRpc> = self
            .client
            .request("query_listPackedStates", rpc_params![])
            .await?;

        let actions = plan_actions(&listing, info.slot, self.config.max_actions_per_tick)?;
        let mut report = TickReport {
            slot: info.slot,
            ..TickReport::default()
        };

        for pending in &actions {
            match self.submit(pending).await {
                Ok(receipt) => {
                    report.submitted += 1;
                    info!(
                        auction = %hex::encode(pending.auction),
                        action = method_for(pending.action),
                        slot = receipt.slot,
                        "Submitted"
                    );
                }
                Err(e @ ClientError::Call(_)) => {
                    report.skipped += 1;
                    warn!(
                        auction = %hex::encode(pending.auction),
                        action = method_for(pending.action),
                        retryable = is_retryable(&e),
                        error = %e,
                        "Call rejected"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(report)
    }

    async fn submit(&self, pending: &PendingAction) -> Result<TxReceiptRpc, ClientError> {
        let auction = hex::encode(pending.auction);
        let sender = self.config.sender.clone();

        let mut params = ArrayParams::new();
        params.insert(sender)?;
        params.insert(auction.clone())?;
        if pending.action == KeeperAction::SettleAuctioneerPayment {
            let balance: u64 = self
                .client
                .request("query_getBalance", rpc_params![auction])
                .await?;
            params.insert(balance)?;
        }

        self.client
            .request(method_for(pending.action), params)
            .await
    }
}

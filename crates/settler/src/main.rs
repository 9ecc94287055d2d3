//! Auction settler binary.

use anyhow::Result;
use clap::Parser;
use nft_auction_settler::{SettlementService, SettlerConfig};
use tracing::info;

#[derive(Parser)]
#[command(name = "auction-settler")]
#[command(about = "Permissionless keeper for NFT auctions")]
struct Args {
    /// RPC endpoint
    #[arg(long, default_value = "http://127.0.0.1:9944")]
    rpc: String,

    /// Account to submit calls as (hex)
    #[arg(long)]
    sender: String,

    /// Seconds between polls
    #[arg(long, default_value_t = 10)]
    poll_interval_secs: u64,

    /// Maximum calls submitted per poll
    #[arg(long, default_value_t = 64)]
    max_actions: usize,

    /// Run a single poll and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("auction_settler=info".parse()?)
                .add_directive("nft_auction_settler=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let service = SettlementService::new(SettlerConfig {
        rpc_endpoint: args.rpc,
        sender: args.sender,
        poll_interval_secs: args.poll_interval_secs,
        max_actions_per_tick: args.max_actions,
    })?;

    if args.once {
        let report = service.tick().await?;
        info!(
            "Slot {}: submitted {}, skipped {}",
            report.slot, report.submitted, report.skipped
        );
        return Ok(());
    }

    tokio::select! {
        result = service.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
            Ok(())
        }
    }
}

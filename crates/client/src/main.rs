//! CLI for interacting with NFT auctions.
//!
//! This binary provides commands for:
//! - Driving the mock chain (genesis, slots, funding, minting)
//! - Deploying auctions and bidding
//! - Settlement, payouts and the withdraw path
//! - Querying and decoding auction state

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use jsonrpsee::core::client::ClientT;
use jsonrpsee::core::rpc_params;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use tracing::info;

use nft_auction_client::rpc::{
    parse_bytes32, parse_hex, AuctionRpc, DeployParams, NftParams, NftRpc, PackedStateRpc,
    PendingActionRpc, SlotInfo, TxReceiptRpc, UpgradeParams, UpgradeProofRpc, VerificationKeyRpc,
};
use nft_auction_client::{decode_packed_hex, is_retryable};
use nft_auction_module::{AuctionGenesisConfig, DesignatedAuthority};
use nft_auction_types::verification_key_hash;

#[derive(Parser)]
#[command(name = "auction-cli")]
#[command(about = "CLI for NFT auctions")]
struct Cli {
    /// Mock chain RPC endpoint
    #[arg(long, default_value = "http://127.0.0.1:9944")]
    rpc: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reset the chain from a genesis JSON file
    Init {
        #[arg(long)]
        genesis: PathBuf,
    },

    /// Advance the chain slot (for testing)
    AdvanceSlot {
        #[arg(long, default_value = "1")]
        count: u32,
    },

    /// Jump to a later slot (for testing)
    SetSlot {
        #[arg(long)]
        slot: u32,
    },

    /// Credit an account (for testing)
    Fund {
        /// Account address (hex)
        #[arg(long)]
        address: String,

        #[arg(long)]
        amount: u64,
    },

    /// Mint an NFT (for testing)
    MintNft {
        /// Collection address (hex)
        #[arg(long)]
        collection: String,

        /// NFT address (hex)
        #[arg(long)]
        nft: String,

        /// Owner address (hex)
        #[arg(long)]
        owner: String,
    },

    /// Set or clear the approved custodian of an NFT
    ApproveNft {
        /// Owner address (hex)
        #[arg(long)]
        sender: String,

        #[arg(long)]
        collection: String,

        #[arg(long)]
        nft: String,

        /// Custodian address (hex); omit to clear
        #[arg(long)]
        approved: Option<String>,
    },

    /// Transfer an NFT as its owner or custodian
    TransferNft {
        #[arg(long)]
        sender: String,

        #[arg(long)]
        collection: String,

        #[arg(long)]
        nft: String,

        /// Recipient address (hex)
        #[arg(long)]
        to: String,
    },

    /// Deploy an auction; custody is granted in the same transaction
    Deploy {
        /// Seller address (hex)
        #[arg(long)]
        sender: String,

        /// Auction account address (hex)
        #[arg(long)]
        auction: String,

        #[arg(long)]
        collection: String,

        #[arg(long)]
        nft: String,

        #[arg(long, default_value = "1")]
        minimum_price: u64,

        /// Slot after which no bids are accepted
        #[arg(long)]
        end: u32,

        /// Auctioneer address (hex)
        #[arg(long)]
        auctioneer: String,

        #[arg(long, default_value = "0")]
        transfer_fee: u64,

        /// Auctioneer fee in basis points
        #[arg(long, default_value = "0")]
        sale_fee: u32,

        /// Slots after the end before withdrawal opens
        #[arg(long, default_value = "0")]
        withdraw_period: u32,

        /// standard or withdraw
        #[arg(long, default_value = "standard")]
        mode: String,
    },

    /// Place a bid
    Bid {
        /// Bidder address (hex)
        #[arg(long)]
        sender: String,

        #[arg(long)]
        auction: String,

        #[arg(long)]
        amount: u64,
    },

    /// Settle an ended auction
    Settle {
        #[arg(long)]
        sender: String,

        #[arg(long)]
        auction: String,
    },

    /// Pay the seller and the transfer fee
    SettlePayment {
        #[arg(long)]
        sender: String,

        #[arg(long)]
        auction: String,
    },

    /// Pay the auctioneer its cut
    SettleAuctioneerPayment {
        #[arg(long)]
        sender: String,

        #[arg(long)]
        auction: String,

        /// Observed escrow balance; fetched from the chain if omitted
        #[arg(long)]
        balance: Option<u64>,
    },

    /// Return the NFT to the seller after the withdraw window
    WithdrawNft {
        #[arg(long)]
        sender: String,

        #[arg(long)]
        auction: String,
    },

    /// Refund the highest bidder after the withdraw window
    Withdraw {
        #[arg(long)]
        sender: String,

        #[arg(long)]
        auction: String,
    },

    /// Replace an auction's verification key, approved by a designated authority
    UpgradeVk {
        #[arg(long)]
        sender: String,

        #[arg(long)]
        auction: String,

        /// New verification key (hex)
        #[arg(long)]
        verification_key: String,

        /// Upgrade authority address (hex)
        #[arg(long)]
        authority: String,
    },

    /// Get auction details
    GetAuction {
        #[arg(long)]
        auction: String,
    },

    /// Get the raw packed state of an auction
    GetPacked {
        #[arg(long)]
        auction: String,
    },

    /// List all auctions
    ListAuctions,

    /// Get an account balance
    Balance {
        #[arg(long)]
        address: String,
    },

    /// Get NFT ownership
    GetNft {
        #[arg(long)]
        collection: String,

        #[arg(long)]
        nft: String,
    },

    /// Get an auction's verification key record
    GetVk {
        #[arg(long)]
        auction: String,
    },

    /// List calls auctions are waiting on
    Pending,

    /// Decode packed state offline
    Decode {
        /// Hex-encoded packed state
        #[arg(long)]
        packed: String,

        /// Slot to evaluate the phase at
        #[arg(long, default_value = "0")]
        slot: u32,
    },
}

fn print_receipt(result: TxReceiptRpc) -> Result<()> {
    println!("Applied at slot {}", result.slot);
    for receipt in result.receipts {
        println!("  {}", serde_json::to_string(&receipt)?);
    }
    Ok(())
}

async fn submit(
    client: &HttpClient,
    method: &str,
    params: jsonrpsee::core::params::ArrayParams,
) -> Result<()> {
    match client.request::<TxReceiptRpc, _>(method, params).await {
        Ok(receipt) => print_receipt(receipt),
        Err(e) if is_retryable(&e) => Err(anyhow!("{e} (state changed, refresh and retry)")),
        Err(e) => Err(e.into()),
    }
}

async fn get_slot(client: &HttpClient) -> Result<u32> {
    let info: SlotInfo = client.request("chain_getSlot", rpc_params![]).await?;
    Ok(info.slot)
}

async fn get_auction_cmd(client: &HttpClient, auction: &str) -> Result<()> {
    let result: Option<AuctionRpc> = client
        .request("query_getAuction", rpc_params![auction])
        .await?;
    match result {
        Some(auction) => println!("{}", serde_json::to_string_pretty(&auction)?),
        None => println!("Auction {} not found", auction),
    }
    Ok(())
}

async fn list_auctions_cmd(client: &HttpClient) -> Result<()> {
    let auctions: Vec<AuctionRpc> = client
        .request("query_listAuctions", rpc_params![])
        .await?;

    if auctions.is_empty() {
        println!("No auctions found");
        return Ok(());
    }

    println!("Auctions:");
    for a in auctions {
        println!(
            "  {} | {} | {} | highest {} | ends {}",
            a.auction, a.mode, a.phase, a.highest_bid, a.auction_end_time
        );
    }
    Ok(())
}

async fn upgrade_vk_cmd(
    client: &HttpClient,
    sender: String,
    auction: String,
    verification_key: String,
    authority: &str,
) -> Result<()> {
    let authority = DesignatedAuthority::new(parse_bytes32("authority", authority)?);
    let contract = parse_bytes32("auction", &auction)?;
    let vk = parse_hex("verification_key", &verification_key)?;
    let slot = get_slot(client).await?;

    let proof = authority.approve(contract, verification_key_hash(&vk), slot);
    let params = UpgradeParams {
        sender,
        auction,
        verification_key,
        proof: UpgradeProofRpc::from(&proof),
    };
    submit(client, "auction_upgradeVerificationKey", rpc_params![params]).await
}

fn decode_cmd(packed: &str, slot: u32) -> Result<()> {
    let data = decode_packed_hex(packed)?;
    let view = serde_json::json!({
        "seller": hex::encode(data.seller),
        "auctioneer": hex::encode(data.auctioneer),
        "collection": hex::encode(data.nft.collection),
        "nft": hex::encode(data.nft.nft),
        "minimum_price": data.minimum_price,
        "auction_end_time": data.auction_end_time,
        "withdraw_period": data.withdraw_period,
        "transfer_fee": data.transfer_fee,
        "sale_fee": data.sale_fee,
        "mode": format!("{:?}", data.mode),
        "highest_bid": data.highest_bid,
        "highest_bidder": data.highest_bidder.map(hex::encode),
        "status": format!("{:?}", data.status),
        "phase": format!("{:?}", data.phase(slot)),
        "expected_escrow": data.escrowed(),
    });
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("auction_cli=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let client = HttpClientBuilder::default().build(&cli.rpc)?;

    match cli.command {
        Commands::Init { genesis } => {
            let config: AuctionGenesisConfig =
                serde_json::from_str(&std::fs::read_to_string(&genesis)?)?;
            let info: SlotInfo = client.request("admin_init", rpc_params![config]).await?;
            info!("Chain initialized from {:?}", genesis);
            println!("Chain reset at slot {}", info.slot);
        }

        Commands::AdvanceSlot { count } => {
            let info: SlotInfo = client
                .request("admin_advanceSlot", rpc_params![count])
                .await?;
            println!("Slot advanced to {}", info.slot);
        }

        Commands::SetSlot { slot } => {
            let info: SlotInfo = client.request("admin_setSlot", rpc_params![slot]).await?;
            println!("Slot set to {}", info.slot);
        }

        Commands::Fund { address, amount } => {
            let balance: u64 = client
                .request("admin_fund", rpc_params![address.clone(), amount])
                .await?;
            println!("{} balance: {}", address, balance);
        }

        Commands::MintNft {
            collection,
            nft,
            owner,
        } => {
            let _: bool = client
                .request(
                    "admin_mintNft",
                    rpc_params![NftParams { collection, nft }, owner],
                )
                .await?;
            println!("NFT minted");
        }

        Commands::ApproveNft {
            sender,
            collection,
            nft,
            approved,
        } => {
            let nft = NftParams { collection, nft };
            submit(&client, "nft_approve", rpc_params![sender, nft, approved]).await?;
        }

        Commands::TransferNft {
            sender,
            collection,
            nft,
            to,
        } => {
            let nft = NftParams { collection, nft };
            submit(&client, "nft_transfer", rpc_params![sender, nft, to]).await?;
        }

        Commands::Deploy {
            sender,
            auction,
            collection,
            nft,
            minimum_price,
            end,
            auctioneer,
            transfer_fee,
            sale_fee,
            withdraw_period,
            mode,
        } => {
            let params = DeployParams {
                sender,
                auction,
                collection,
                nft,
                minimum_price,
                auction_end_time: end,
                auctioneer,
                transfer_fee,
                sale_fee,
                withdraw_period,
                mode,
            };
            // Reject malformed input before it reaches the chain
            params.decode()?;
            submit(&client, "auction_deploy", rpc_params![params]).await?;
        }

        Commands::Bid {
            sender,
            auction,
            amount,
        } => {
            submit(&client, "auction_bid", rpc_params![sender, auction, amount]).await?;
        }

        Commands::Settle { sender, auction } => {
            submit(&client, "auction_settle", rpc_params![sender, auction]).await?;
        }

        Commands::SettlePayment { sender, auction } => {
            submit(&client, "auction_settlePayment", rpc_params![sender, auction]).await?;
        }

        Commands::SettleAuctioneerPayment {
            sender,
            auction,
            balance,
        } => {
            let balance = match balance {
                Some(balance) => balance,
                None => {
                    client
                        .request("query_getBalance", rpc_params![auction.clone()])
                        .await?
                }
            };
            submit(
                &client,
                "auction_settleAuctioneerPayment",
                rpc_params![sender, auction, balance],
            )
            .await?;
        }

        Commands::WithdrawNft { sender, auction } => {
            submit(&client, "auction_withdrawNft", rpc_params![sender, auction]).await?;
        }

        Commands::Withdraw { sender, auction } => {
            submit(&client, "auction_withdraw", rpc_params![sender, auction]).await?;
        }

        Commands::UpgradeVk {
            sender,
            auction,
            verification_key,
            authority,
        } => {
            upgrade_vk_cmd(&client, sender, auction, verification_key, &authority).await?;
        }

        Commands::GetAuction { auction } => {
            get_auction_cmd(&client, &auction).await?;
        }

        Commands::GetPacked { auction } => {
            let packed: Option<String> = client
                .request("query_getPackedState", rpc_params![auction.clone()])
                .await?;
            match packed {
                Some(packed) => println!("{}", packed),
                None => println!("Auction {} not found", auction),
            }
        }

        Commands::ListAuctions => {
            list_auctions_cmd(&client).await?;
        }

        Commands::Balance { address } => {
            let balance: u64 = client
                .request("query_getBalance", rpc_params![address.clone()])
                .await?;
            println!("{} balance: {}", address, balance);
        }

        Commands::GetNft { collection, nft } => {
            let record: Option<NftRpc> = client
                .request("query_getNft", rpc_params![NftParams { collection, nft }])
                .await?;
            match record {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => println!("NFT not found"),
            }
        }

        Commands::GetVk { auction } => {
            let record: Option<VerificationKeyRpc> = client
                .request("query_getVerificationKey", rpc_params![auction])
                .await?;
            match record {
                Some(record) => println!("version {} hash {}", record.version, record.hash),
                None => println!("Auction not found"),
            }
        }

        Commands::Pending => {
            let pending: Vec<PendingActionRpc> = client
                .request("query_getPendingActions", rpc_params![])
                .await?;
            let listing: Vec<PackedStateRpc> = client
                .request("query_listPackedStates", rpc_params![])
                .await?;
            println!("{} auctions, {} pending actions", listing.len(), pending.len());
            for p in pending {
                println!("  {} {}", p.auction, p.action);
            }
        }

        Commands::Decode { packed, slot } => {
            decode_cmd(&packed, slot)?;
        }
    }

    Ok(())
}

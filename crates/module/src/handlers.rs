//! Call handlers for the auction module.
//!
//! These functions implement the business logic for each call type. Every
//! handler runs all of its checks before touching state; [`apply_transaction`]
//! additionally discards the effects of a whole call list if any call fails.

use nft_auction_types::{
    verification_key_hash, Address, AuctionData, AuctionMode, AuctionParams, AuctionPhase,
    AuctionStatus, FeeSplit, NftId, Slot, UpgradeProof, VerificationKeyRecord, EMPTY_ADDRESS,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::call::AuctionCall;
use crate::error::{AuctionError, Payee};
use crate::state::AuctionState as ModuleState;
use crate::upgrade::UpgradeAuthority;

/// Context provided by the runtime for each call.
#[derive(Clone, Copy, Debug)]
pub struct CallContext {
    /// Sender of the transaction
    pub sender: Address,
    /// Current chain slot
    pub slot: Slot,
}

/// Result type for handlers.
pub type HandlerResult<T> = Result<T, AuctionError>;

/// Value returned to a previous bidder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refund {
    pub to: Address,
    pub amount: u64,
}

/// Outcome of a successful call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallReceipt {
    Deployed {
        auction: Address,
    },
    BidAccepted {
        amount: u64,
        refund: Option<Refund>,
    },
    Settled {
        winner: Option<Address>,
    },
    SellerPaid {
        proceeds: u64,
        transfer_fee: u64,
    },
    AuctioneerPaid {
        amount: u64,
    },
    NftReturned {
        to: Address,
    },
    Withdrawn {
        refund: Option<Refund>,
    },
    VerificationKeyUpgraded {
        record: VerificationKeyRecord,
    },
    NftApproved,
    NftTransferred,
}

/// Handle Deploy call.
pub fn handle_deploy(
    state: &mut ModuleState,
    ctx: &CallContext,
    auction: Address,
    params: AuctionParams,
) -> HandlerResult<CallReceipt> {
    if ctx.sender != params.owner || auction == EMPTY_ADDRESS {
        return Err(AuctionError::NotAuthorized);
    }
    if state.auctions.contains_key(&auction) {
        return Err(AuctionError::AlreadyDeployed(auction));
    }
    // Escrow must start empty and never share an account with a payee
    if [params.owner, params.auctioneer, params.collection].contains(&auction) {
        return Err(AuctionError::AuctionAccountIsParticipant);
    }
    let funded = state.balance_of(&auction);
    if funded != 0 {
        return Err(AuctionError::AuctionAccountFunded(funded));
    }

    // Timing
    if params.auction_end_time <= ctx.slot {
        return Err(AuctionError::EndTimeNotInFuture {
            end: params.auction_end_time,
            now: ctx.slot,
        });
    }
    let duration = params.auction_end_time - ctx.slot;
    if duration > state.limits.max_duration {
        return Err(AuctionError::DurationTooLong {
            duration,
            max: state.limits.max_duration,
        });
    }
    if params.withdraw_period > state.limits.max_withdraw_period {
        return Err(AuctionError::WithdrawPeriodTooLong {
            period: params.withdraw_period,
            max: state.limits.max_withdraw_period,
        });
    }

    // Fees: a bid at the minimum price must already cover them
    if params.sale_fee > state.limits.max_sale_fee {
        return Err(AuctionError::InvalidSaleFee {
            fee: params.sale_fee,
            max: state.limits.max_sale_fee,
        });
    }
    FeeSplit::compute(params.minimum_price, params.transfer_fee, params.sale_fee)?;

    // Custody must already be granted in this transaction
    let nft = NftId {
        collection: params.collection,
        nft: params.nft,
    };
    let record = state.nfts.record(&nft)?;
    let in_custody = match params.mode {
        AuctionMode::Standard => {
            record.owner == params.owner && record.approved == Some(auction)
        }
        AuctionMode::Withdraw => record.owner == auction,
    };
    if !in_custody {
        return Err(AuctionError::NftNotInCustody);
    }
    state.nfts.lock(&nft, auction)?;

    let data = AuctionData::from_params(&params);
    state.store_auction(auction, &data)?;
    state.verification_keys.insert(
        auction,
        VerificationKeyRecord {
            hash: state.default_vk_hash,
            version: 0,
        },
    );

    info!(
        auction = %hex::encode(auction),
        end = params.auction_end_time,
        mode = ?params.mode,
        "Auction deployed"
    );
    Ok(CallReceipt::Deployed { auction })
}

/// Handle Bid call.
pub fn handle_bid(
    state: &mut ModuleState,
    ctx: &CallContext,
    auction: Address,
    amount: u64,
    bidder: Address,
) -> HandlerResult<CallReceipt> {
    let mut data = state.load_auction(&auction)?;

    if ctx.sender != bidder || bidder == EMPTY_ADDRESS {
        return Err(AuctionError::NotAuthorized);
    }
    if data.is_terminal() {
        return Err(AuctionError::Finalized(data.phase(ctx.slot)));
    }
    if ctx.slot >= data.auction_end_time {
        return Err(AuctionError::BiddingEnded {
            end: data.auction_end_time,
            now: ctx.slot,
        });
    }
    if amount < data.minimum_price {
        return Err(AuctionError::BelowMinimumPrice {
            bid: amount,
            minimum: data.minimum_price,
        });
    }
    if amount <= data.highest_bid {
        return Err(AuctionError::BidNotHigher {
            bid: amount,
            highest: data.highest_bid,
        });
    }

    // An outbid bidder raising its own bid gets its refund first
    let refund = data.highest_bidder.map(|to| Refund {
        to,
        amount: data.highest_bid,
    });
    let own_refund = match refund {
        Some(refund) if refund.to == bidder => refund.amount,
        _ => 0,
    };
    let available = state.balance_of(&bidder).saturating_add(own_refund);
    if amount > available {
        return Err(AuctionError::InsufficientBalance {
            required: amount,
            available,
        });
    }

    if let Some(refund) = refund {
        state.transfer(&auction, refund.to, refund.amount)?;
    }
    state.transfer(&bidder, auction, amount)?;

    data.highest_bid = amount;
    data.highest_bidder = Some(bidder);
    state.store_auction(auction, &data)?;

    debug!(
        auction = %hex::encode(auction),
        bidder = %hex::encode(bidder),
        amount,
        "Bid accepted"
    );
    Ok(CallReceipt::BidAccepted { amount, refund })
}

/// Handle SettleAuction call (permissionless).
pub fn handle_settle_auction(
    state: &mut ModuleState,
    ctx: &CallContext,
    auction: Address,
) -> HandlerResult<CallReceipt> {
    let mut data = state.load_auction(&auction)?;

    if data.is_terminal() {
        return Err(AuctionError::Finalized(data.phase(ctx.slot)));
    }
    if ctx.slot < data.auction_end_time {
        return Err(AuctionError::AuctionNotEnded {
            end: data.auction_end_time,
            now: ctx.slot,
        });
    }

    let winner = data.highest_bidder;
    let recipient = match winner {
        Some(winner) => {
            // Proceeds must be payable before custody moves
            data.fee_split()?;
            winner
        }
        None => data.seller,
    };
    state.nfts.transfer(&auction, &data.nft, recipient)?;

    data.status = AuctionStatus::Settled {
        seller_paid: false,
        auctioneer_paid: false,
    };
    state.store_auction(auction, &data)?;

    info!(
        auction = %hex::encode(auction),
        sold = winner.is_some(),
        price = data.highest_bid,
        "Auction settled"
    );
    Ok(CallReceipt::Settled { winner })
}

/// Settled auction with a sale, or the reason there is nothing to pay.
fn settled_sale(data: &AuctionData) -> HandlerResult<(bool, bool, FeeSplit)> {
    let AuctionStatus::Settled {
        seller_paid,
        auctioneer_paid,
    } = data.status
    else {
        return Err(AuctionError::NotSettled);
    };
    if data.highest_bid == 0 {
        return Err(AuctionError::NoProceeds);
    }
    Ok((seller_paid, auctioneer_paid, data.fee_split()?))
}

/// Handle SettlePayment call: seller proceeds and transfer fee.
pub fn handle_settle_payment(
    state: &mut ModuleState,
    _ctx: &CallContext,
    auction: Address,
) -> HandlerResult<CallReceipt> {
    let mut data = state.load_auction(&auction)?;
    let (seller_paid, auctioneer_paid, split) = settled_sale(&data)?;
    if seller_paid {
        return Err(AuctionError::PaymentAlreadySettled(Payee::Seller));
    }

    let owed = split.seller_proceeds + split.transfer_fee;
    let escrow = state.balance_of(&auction);
    if escrow < owed {
        return Err(AuctionError::InsufficientBalance {
            required: owed,
            available: escrow,
        });
    }

    state.transfer(&auction, data.seller, split.seller_proceeds)?;
    state.transfer(&auction, data.nft.collection, split.transfer_fee)?;

    data.status = AuctionStatus::Settled {
        seller_paid: true,
        auctioneer_paid,
    };
    state.store_auction(auction, &data)?;

    debug!(
        auction = %hex::encode(auction),
        proceeds = split.seller_proceeds,
        transfer_fee = split.transfer_fee,
        "Seller paid"
    );
    Ok(CallReceipt::SellerPaid {
        proceeds: split.seller_proceeds,
        transfer_fee: split.transfer_fee,
    })
}

/// Handle SettleAuctioneerPayment call.
///
/// `balance` is the escrow balance the caller observed; a mismatch means its
/// view is stale and the call should be retried.
pub fn handle_settle_auctioneer_payment(
    state: &mut ModuleState,
    _ctx: &CallContext,
    auction: Address,
    balance: u64,
) -> HandlerResult<CallReceipt> {
    let mut data = state.load_auction(&auction)?;
    let (seller_paid, auctioneer_paid, split) = settled_sale(&data)?;
    if auctioneer_paid {
        return Err(AuctionError::PaymentAlreadySettled(Payee::Auctioneer));
    }

    let escrow = state.balance_of(&auction);
    if balance != escrow {
        return Err(AuctionError::StaleState {
            expected: balance,
            actual: escrow,
        });
    }
    if escrow < split.auctioneer_cut {
        return Err(AuctionError::InsufficientBalance {
            required: split.auctioneer_cut,
            available: escrow,
        });
    }

    state.transfer(&auction, data.auctioneer, split.auctioneer_cut)?;

    data.status = AuctionStatus::Settled {
        seller_paid,
        auctioneer_paid: true,
    };
    state.store_auction(auction, &data)?;

    debug!(
        auction = %hex::encode(auction),
        amount = split.auctioneer_cut,
        "Auctioneer paid"
    );
    Ok(CallReceipt::AuctioneerPaid {
        amount: split.auctioneer_cut,
    })
}

/// Common gate of the withdraw path.
fn check_withdraw_window(data: &AuctionData, now: Slot) -> HandlerResult<()> {
    if data.mode != AuctionMode::Withdraw {
        return Err(AuctionError::NotWithdrawMode);
    }
    if let AuctionStatus::Settled { .. } = data.status {
        return Err(AuctionError::Finalized(AuctionPhase::Settled));
    }
    let opens_at = data.withdraw_opens_at();
    if (now as u64) < opens_at {
        return Err(AuctionError::WithdrawPeriodNotElapsed { opens_at, now });
    }
    Ok(())
}

/// Handle WithdrawNft call: NFT back to the seller.
pub fn handle_withdraw_nft(
    state: &mut ModuleState,
    ctx: &CallContext,
    auction: Address,
) -> HandlerResult<CallReceipt> {
    let mut data = state.load_auction(&auction)?;
    check_withdraw_window(&data, ctx.slot)?;

    let bid_refunded = match data.status {
        AuctionStatus::Withdrawn {
            nft_returned: true, ..
        } => return Err(AuctionError::NftAlreadyReturned),
        AuctionStatus::Withdrawn { bid_refunded, .. } => bid_refunded,
        _ => false,
    };

    state.nfts.transfer(&auction, &data.nft, data.seller)?;

    data.status = AuctionStatus::Withdrawn {
        nft_returned: true,
        bid_refunded,
    };
    state.store_auction(auction, &data)?;

    info!(auction = %hex::encode(auction), "NFT returned to seller");
    Ok(CallReceipt::NftReturned { to: data.seller })
}

/// Handle Withdraw call: escrowed bid back to the highest bidder.
///
/// Anyone may call it. With nothing left to refund it succeeds without effect.
pub fn handle_withdraw(
    state: &mut ModuleState,
    ctx: &CallContext,
    auction: Address,
) -> HandlerResult<CallReceipt> {
    let mut data = state.load_auction(&auction)?;
    check_withdraw_window(&data, ctx.slot)?;

    let (nft_returned, already_refunded) = match data.status {
        AuctionStatus::Withdrawn {
            nft_returned,
            bid_refunded,
        } => (nft_returned, bid_refunded),
        _ => (false, false),
    };
    let bidder = match data.highest_bidder {
        Some(bidder) if !already_refunded => bidder,
        _ => return Ok(CallReceipt::Withdrawn { refund: None }),
    };

    let refund = Refund {
        to: bidder,
        amount: data.highest_bid,
    };
    state.transfer(&auction, refund.to, refund.amount)?;

    data.status = AuctionStatus::Withdrawn {
        nft_returned,
        bid_refunded: true,
    };
    state.store_auction(auction, &data)?;

    info!(
        auction = %hex::encode(auction),
        bidder = %hex::encode(bidder),
        amount = refund.amount,
        "Bid refunded"
    );
    Ok(CallReceipt::Withdrawn {
        refund: Some(refund),
    })
}

/// Handle UpgradeVerificationKey call.
pub fn handle_upgrade_verification_key<A: UpgradeAuthority>(
    state: &mut ModuleState,
    ctx: &CallContext,
    authority: &A,
    auction: Address,
    verification_key: &[u8],
    proof: &UpgradeProof,
) -> HandlerResult<CallReceipt> {
    if !state.auctions.contains_key(&auction) {
        return Err(AuctionError::AuctionNotFound(auction));
    }

    let hash = verification_key_hash(verification_key);
    if !authority.authorizes(&auction, &hash, proof, ctx.slot) {
        return Err(AuctionError::InvalidUpgradeProof);
    }

    let version = state
        .verification_keys
        .get(&auction)
        .map(|record| record.version + 1)
        .unwrap_or(1);
    let record = VerificationKeyRecord { hash, version };
    state.verification_keys.insert(auction, record);

    info!(
        auction = %hex::encode(auction),
        version,
        "Verification key upgraded"
    );
    Ok(CallReceipt::VerificationKeyUpgraded { record })
}

/// Dispatch a single call.
pub fn dispatch(
    state: &mut ModuleState,
    ctx: &CallContext,
    call: AuctionCall,
) -> HandlerResult<CallReceipt> {
    match call {
        AuctionCall::Deploy { auction, params } => handle_deploy(state, ctx, auction, params),
        AuctionCall::Bid {
            auction,
            amount,
            bidder,
        } => handle_bid(state, ctx, auction, amount, bidder),
        AuctionCall::SettleAuction { auction } => handle_settle_auction(state, ctx, auction),
        AuctionCall::SettlePayment { auction } => handle_settle_payment(state, ctx, auction),
        AuctionCall::SettleAuctioneerPayment { auction, balance } => {
            handle_settle_auctioneer_payment(state, ctx, auction, balance)
        }
        AuctionCall::WithdrawNft { auction } => handle_withdraw_nft(state, ctx, auction),
        AuctionCall::Withdraw { auction } => handle_withdraw(state, ctx, auction),
        AuctionCall::UpgradeVerificationKey {
            auction,
            verification_key,
            proof,
        } => {
            let authority = state
                .upgrade_authority
                .ok_or(AuctionError::UpgradeAuthorityNotSet)?;
            handle_upgrade_verification_key(
                state,
                ctx,
                &authority,
                auction,
                &verification_key,
                &proof,
            )
        }
        AuctionCall::ApproveNft { nft, approved } => {
            state.nfts.approve(&ctx.sender, &nft, approved)?;
            Ok(CallReceipt::NftApproved)
        }
        AuctionCall::TransferNft { nft, to } => {
            state.nfts.transfer(&ctx.sender, &nft, to)?;
            Ok(CallReceipt::NftTransferred)
        }
    }
}

/// Apply a list of calls as one transaction.
///
/// Either every call succeeds and all effects are kept, or the state is left
/// exactly as it was.
pub fn apply_transaction(
    state: &mut ModuleState,
    ctx: &CallContext,
    calls: Vec<AuctionCall>,
) -> HandlerResult<Vec<CallReceipt>> {
    state.apply_atomically(|draft| {
        calls
            .into_iter()
            .map(|call| dispatch(draft, ctx, call))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upgrade::DesignatedAuthority;

    const SELLER: Address = [1u8; 32];
    const AUCTIONEER: Address = [2u8; 32];
    const COLLECTION: Address = [3u8; 32];
    const NFT: Address = [4u8; 32];
    const AUCTION: Address = [5u8; 32];
    const ALICE: Address = [6u8; 32];
    const BOB: Address = [7u8; 32];
    const AUTHORITY: Address = [8u8; 32];

    fn nft_id() -> NftId {
        NftId {
            collection: COLLECTION,
            nft: NFT,
        }
    }

    fn params(mode: AuctionMode) -> AuctionParams {
        AuctionParams {
            collection: COLLECTION,
            nft: NFT,
            owner: SELLER,
            minimum_price: 10,
            auction_end_time: 100,
            auctioneer: AUCTIONEER,
            transfer_fee: 1,
            sale_fee: 1_500,
            withdraw_period: 50,
            mode,
        }
    }

    fn test_context(sender: Address, slot: Slot) -> CallContext {
        CallContext { sender, slot }
    }

    fn setup_state() -> ModuleState {
        let mut state = ModuleState::new();
        state.nfts.mint(nft_id(), SELLER).unwrap();
        state.credit(ALICE, 1_000).unwrap();
        state.credit(BOB, 1_000).unwrap();
        state.upgrade_authority = Some(DesignatedAuthority::new(AUTHORITY));
        state
    }

    fn deploy(state: &mut ModuleState, mode: AuctionMode) {
        let custody = match mode {
            AuctionMode::Standard => AuctionCall::ApproveNft {
                nft: nft_id(),
                approved: Some(AUCTION),
            },
            AuctionMode::Withdraw => AuctionCall::TransferNft {
                nft: nft_id(),
                to: AUCTION,
            },
        };
        apply_transaction(
            state,
            &test_context(SELLER, 0),
            vec![
                custody,
                AuctionCall::Deploy {
                    auction: AUCTION,
                    params: params(mode),
                },
            ],
        )
        .unwrap();
    }

    fn bid(
        state: &mut ModuleState,
        bidder: Address,
        amount: u64,
        slot: Slot,
    ) -> HandlerResult<CallReceipt> {
        handle_bid(state, &test_context(bidder, slot), AUCTION, amount, bidder)
    }

    #[test]
    fn test_deploy_requires_custody() {
        let mut state = setup_state();
        let result = handle_deploy(
            &mut state,
            &test_context(SELLER, 0),
            AUCTION,
            params(AuctionMode::Standard),
        );
        assert!(matches!(result, Err(AuctionError::NftNotInCustody)));
        assert!(state.auctions.is_empty());
    }

    #[test]
    fn test_deploy_rejects_past_end_time() {
        let mut state = setup_state();
        state
            .nfts
            .approve(&SELLER, &nft_id(), Some(AUCTION))
            .unwrap();
        let result = handle_deploy(
            &mut state,
            &test_context(SELLER, 100),
            AUCTION,
            params(AuctionMode::Standard),
        );
        assert!(matches!(
            result,
            Err(AuctionError::EndTimeNotInFuture { end: 100, now: 100 })
        ));
    }

    #[test]
    fn test_deploy_rejects_unpayable_minimum() {
        let mut state = setup_state();
        state
            .nfts
            .approve(&SELLER, &nft_id(), Some(AUCTION))
            .unwrap();
        let mut params = params(AuctionMode::Standard);
        params.transfer_fee = 11;
        let result = handle_deploy(&mut state, &test_context(SELLER, 0), AUCTION, params);
        assert!(matches!(result, Err(AuctionError::Fees(_))));
    }

    #[test]
    fn test_deploy_only_by_owner_and_once() {
        let mut state = setup_state();
        let result = handle_deploy(
            &mut state,
            &test_context(ALICE, 0),
            AUCTION,
            params(AuctionMode::Standard),
        );
        assert!(matches!(result, Err(AuctionError::NotAuthorized)));

        deploy(&mut state, AuctionMode::Standard);
        let result = handle_deploy(
            &mut state,
            &test_context(SELLER, 0),
            AUCTION,
            params(AuctionMode::Standard),
        );
        assert!(matches!(result, Err(AuctionError::AlreadyDeployed(_))));
    }

    #[test]
    fn test_deploy_rejects_shared_or_funded_account() {
        let mut state = setup_state();
        state
            .nfts
            .approve(&SELLER, &nft_id(), Some(ALICE))
            .unwrap();
        let result = handle_deploy(
            &mut state,
            &test_context(SELLER, 0),
            ALICE,
            params(AuctionMode::Standard),
        );
        assert!(matches!(result, Err(AuctionError::AuctionAccountFunded(1_000))));

        for account in [SELLER, AUCTIONEER, COLLECTION] {
            let result = handle_deploy(
                &mut state,
                &test_context(SELLER, 0),
                account,
                params(AuctionMode::Standard),
            );
            assert!(matches!(
                result,
                Err(AuctionError::AuctionAccountIsParticipant)
            ));
        }
        assert!(state.auctions.is_empty());
    }

    #[test]
    fn test_seller_cannot_pull_nft_mid_auction() {
        let mut state = setup_state();
        deploy(&mut state, AuctionMode::Standard);
        bid(&mut state, ALICE, 500, 10).unwrap();

        let seller = test_context(SELLER, 20);
        let moves = [
            AuctionCall::TransferNft {
                nft: nft_id(),
                to: BOB,
            },
            AuctionCall::ApproveNft {
                nft: nft_id(),
                approved: None,
            },
            AuctionCall::ApproveNft {
                nft: nft_id(),
                approved: Some(BOB),
            },
        ];
        for call in moves {
            assert!(matches!(
                apply_transaction(&mut state, &seller, vec![call]),
                Err(AuctionError::Custody(_))
            ));
        }

        // A second auction cannot claim the same NFT either
        assert!(matches!(
            handle_deploy(&mut state, &seller, [9u8; 32], params(AuctionMode::Standard)),
            Err(AuctionError::NftNotInCustody)
        ));

        let record = state.nfts.record(&nft_id()).unwrap();
        assert_eq!(record.owner, SELLER);
        assert_eq!(record.locked_by, Some(AUCTION));

        // Settlement still reaches the winner and releases the lock
        let receipt = handle_settle_auction(&mut state, &test_context(BOB, 100), AUCTION).unwrap();
        assert_eq!(receipt, CallReceipt::Settled { winner: Some(ALICE) });
        let record = state.nfts.record(&nft_id()).unwrap();
        assert_eq!(record.owner, ALICE);
        assert_eq!(record.locked_by, None);
    }

    #[test]
    fn test_failed_bundle_leaves_no_trace() {
        let mut state = setup_state();
        let mut bad = params(AuctionMode::Withdraw);
        bad.auction_end_time = 0;

        let result = apply_transaction(
            &mut state,
            &test_context(SELLER, 0),
            vec![
                AuctionCall::TransferNft {
                    nft: nft_id(),
                    to: AUCTION,
                },
                AuctionCall::Deploy {
                    auction: AUCTION,
                    params: bad,
                },
            ],
        );

        assert!(result.is_err());
        assert_eq!(state.nfts.owner_of(&nft_id()).unwrap(), SELLER);
        assert!(state.auctions.is_empty());
    }

    #[test]
    fn test_bid_escrows_and_refunds() {
        let mut state = setup_state();
        deploy(&mut state, AuctionMode::Standard);

        bid(&mut state, ALICE, 12, 10).unwrap();
        assert_eq!(state.balance_of(&ALICE), 988);
        assert_eq!(state.balance_of(&AUCTION), 12);

        let receipt = bid(&mut state, BOB, 15, 20).unwrap();
        assert_eq!(
            receipt,
            CallReceipt::BidAccepted {
                amount: 15,
                refund: Some(Refund {
                    to: ALICE,
                    amount: 12
                }),
            }
        );
        assert_eq!(state.balance_of(&ALICE), 1_000);
        assert_eq!(state.balance_of(&BOB), 985);
        assert_eq!(state.balance_of(&AUCTION), 15);

        let data = state.load_auction(&AUCTION).unwrap();
        assert_eq!(data.highest_bid, 15);
        assert_eq!(data.highest_bidder, Some(BOB));
    }

    #[test]
    fn test_bid_rules() {
        let mut state = setup_state();
        deploy(&mut state, AuctionMode::Standard);

        assert!(matches!(
            bid(&mut state, ALICE, 9, 10),
            Err(AuctionError::BelowMinimumPrice { bid: 9, minimum: 10 })
        ));
        bid(&mut state, ALICE, 12, 10).unwrap();
        assert!(matches!(
            bid(&mut state, BOB, 12, 10),
            Err(AuctionError::BidNotHigher { bid: 12, highest: 12 })
        ));
        assert!(matches!(
            bid(&mut state, BOB, 20, 100),
            Err(AuctionError::BiddingEnded { end: 100, now: 100 })
        ));
        assert!(matches!(
            bid(&mut state, BOB, 2_000, 10),
            Err(AuctionError::InsufficientBalance { .. })
        ));
        assert!(matches!(
            handle_bid(&mut state, &test_context(ALICE, 10), AUCTION, 20, BOB),
            Err(AuctionError::NotAuthorized)
        ));
    }

    #[test]
    fn test_bidder_can_raise_own_bid_with_refunded_funds() {
        let mut state = setup_state();
        deploy(&mut state, AuctionMode::Standard);

        bid(&mut state, ALICE, 600, 10).unwrap();
        // 400 free plus the 600 refunded
        bid(&mut state, ALICE, 1_000, 11).unwrap();
        assert_eq!(state.balance_of(&ALICE), 0);
        assert_eq!(state.balance_of(&AUCTION), 1_000);
    }

    #[test]
    fn test_settle_before_end_fails() {
        let mut state = setup_state();
        deploy(&mut state, AuctionMode::Standard);
        let result = handle_settle_auction(&mut state, &test_context(ALICE, 99), AUCTION);
        assert!(matches!(result, Err(AuctionError::AuctionNotEnded { .. })));
    }

    #[test]
    fn test_settle_and_pay_out() {
        let mut state = setup_state();
        deploy(&mut state, AuctionMode::Standard);
        bid(&mut state, ALICE, 15, 10).unwrap();

        let ctx = test_context(BOB, 100);
        assert!(matches!(
            handle_settle_payment(&mut state, &ctx, AUCTION),
            Err(AuctionError::NotSettled)
        ));

        let receipt = handle_settle_auction(&mut state, &ctx, AUCTION).unwrap();
        assert_eq!(receipt, CallReceipt::Settled { winner: Some(ALICE) });
        assert_eq!(state.nfts.owner_of(&nft_id()).unwrap(), ALICE);

        let receipt = handle_settle_payment(&mut state, &ctx, AUCTION).unwrap();
        assert_eq!(
            receipt,
            CallReceipt::SellerPaid {
                proceeds: 12,
                transfer_fee: 1
            }
        );
        assert!(matches!(
            handle_settle_payment(&mut state, &ctx, AUCTION),
            Err(AuctionError::PaymentAlreadySettled(Payee::Seller))
        ));

        let receipt = handle_settle_auctioneer_payment(&mut state, &ctx, AUCTION, 2).unwrap();
        assert_eq!(receipt, CallReceipt::AuctioneerPaid { amount: 2 });

        assert_eq!(state.balance_of(&SELLER), 12);
        assert_eq!(state.balance_of(&COLLECTION), 1);
        assert_eq!(state.balance_of(&AUCTIONEER), 2);
        assert_eq!(state.balance_of(&AUCTION), 0);
    }

    #[test]
    fn test_auctioneer_payment_with_stale_balance_is_retryable() {
        let mut state = setup_state();
        deploy(&mut state, AuctionMode::Standard);
        bid(&mut state, ALICE, 15, 10).unwrap();
        let ctx = test_context(BOB, 100);
        handle_settle_auction(&mut state, &ctx, AUCTION).unwrap();

        let err = handle_settle_auctioneer_payment(&mut state, &ctx, AUCTION, 2).unwrap_err();
        assert_eq!(
            err,
            AuctionError::StaleState {
                expected: 2,
                actual: 15
            }
        );
        assert!(err.is_retryable());

        handle_settle_auctioneer_payment(&mut state, &ctx, AUCTION, 15).unwrap();
        assert_eq!(state.balance_of(&AUCTION), 13);
    }

    #[test]
    fn test_zero_bid_settlement_returns_nft() {
        let mut state = setup_state();
        deploy(&mut state, AuctionMode::Standard);

        let ctx = test_context(ALICE, 100);
        let receipt = handle_settle_auction(&mut state, &ctx, AUCTION).unwrap();
        assert_eq!(receipt, CallReceipt::Settled { winner: None });

        let record = state.nfts.record(&nft_id()).unwrap();
        assert_eq!(record.owner, SELLER);
        assert_eq!(record.approved, None);
        assert_eq!(record.locked_by, None);

        assert!(matches!(
            handle_settle_payment(&mut state, &ctx, AUCTION),
            Err(AuctionError::NoProceeds)
        ));
        assert!(matches!(
            handle_settle_auctioneer_payment(&mut state, &ctx, AUCTION, 0),
            Err(AuctionError::NoProceeds)
        ));
    }

    #[test]
    fn test_withdraw_ops_rejected_in_standard_mode() {
        let mut state = setup_state();
        deploy(&mut state, AuctionMode::Standard);
        let ctx = test_context(SELLER, 1_000);
        assert!(matches!(
            handle_withdraw_nft(&mut state, &ctx, AUCTION),
            Err(AuctionError::NotWithdrawMode)
        ));
        assert!(matches!(
            handle_withdraw(&mut state, &ctx, AUCTION),
            Err(AuctionError::NotWithdrawMode)
        ));
    }

    #[test]
    fn test_withdraw_path_with_bid() {
        let mut state = setup_state();
        deploy(&mut state, AuctionMode::Withdraw);
        bid(&mut state, ALICE, 40, 10).unwrap();

        let early = test_context(SELLER, 149);
        assert!(matches!(
            handle_withdraw(&mut state, &early, AUCTION),
            Err(AuctionError::WithdrawPeriodNotElapsed {
                opens_at: 150,
                now: 149
            })
        ));

        let ctx = test_context(BOB, 150);
        let receipt = handle_withdraw(&mut state, &ctx, AUCTION).unwrap();
        assert_eq!(
            receipt,
            CallReceipt::Withdrawn {
                refund: Some(Refund {
                    to: ALICE,
                    amount: 40
                })
            }
        );
        assert_eq!(state.balance_of(&ALICE), 1_000);
        assert_eq!(state.balance_of(&AUCTION), 0);

        // Nothing left: no-op
        let receipt = handle_withdraw(&mut state, &ctx, AUCTION).unwrap();
        assert_eq!(receipt, CallReceipt::Withdrawn { refund: None });

        // Settlement is closed once a withdraw op committed
        assert!(matches!(
            handle_settle_auction(&mut state, &ctx, AUCTION),
            Err(AuctionError::Finalized(AuctionPhase::Withdrawn))
        ));

        handle_withdraw_nft(&mut state, &ctx, AUCTION).unwrap();
        assert_eq!(state.nfts.owner_of(&nft_id()).unwrap(), SELLER);
        assert!(matches!(
            handle_withdraw_nft(&mut state, &ctx, AUCTION),
            Err(AuctionError::NftAlreadyReturned)
        ));

        let data = state.load_auction(&AUCTION).unwrap();
        assert_eq!(
            data.status,
            AuctionStatus::Withdrawn {
                nft_returned: true,
                bid_refunded: true
            }
        );
    }

    #[test]
    fn test_withdraw_after_settlement_rejected() {
        let mut state = setup_state();
        deploy(&mut state, AuctionMode::Withdraw);
        bid(&mut state, ALICE, 40, 10).unwrap();

        let ctx = test_context(BOB, 200);
        handle_settle_auction(&mut state, &ctx, AUCTION).unwrap();
        assert_eq!(state.nfts.owner_of(&nft_id()).unwrap(), ALICE);

        assert!(matches!(
            handle_withdraw_nft(&mut state, &ctx, AUCTION),
            Err(AuctionError::Finalized(AuctionPhase::Settled))
        ));
        assert!(matches!(
            handle_withdraw(&mut state, &ctx, AUCTION),
            Err(AuctionError::Finalized(AuctionPhase::Settled))
        ));
    }

    #[test]
    fn test_upgrade_verification_key() {
        let mut state = setup_state();
        deploy(&mut state, AuctionMode::Standard);
        let authority = DesignatedAuthority::new(AUTHORITY);
        let vk = b"new-key".to_vec();
        let proof = authority.approve(AUCTION, verification_key_hash(&vk), 5);

        let call = AuctionCall::UpgradeVerificationKey {
            auction: AUCTION,
            verification_key: vk.clone(),
            proof: proof.clone(),
        };

        let early = test_context(ALICE, 4);
        assert!(matches!(
            dispatch(&mut state, &early, call.clone()),
            Err(AuctionError::InvalidUpgradeProof)
        ));

        let receipt = dispatch(&mut state, &test_context(ALICE, 5), call).unwrap();
        assert_eq!(
            receipt,
            CallReceipt::VerificationKeyUpgraded {
                record: VerificationKeyRecord {
                    hash: verification_key_hash(&vk),
                    version: 1
                }
            }
        );

        let wrong_key = AuctionCall::UpgradeVerificationKey {
            auction: AUCTION,
            verification_key: b"other".to_vec(),
            proof,
        };
        assert!(matches!(
            dispatch(&mut state, &test_context(ALICE, 6), wrong_key),
            Err(AuctionError::InvalidUpgradeProof)
        ));
    }
}

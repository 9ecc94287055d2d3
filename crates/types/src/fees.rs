//! Sale proceeds split.
//!
//! `auctioneer_cut = floor(price * sale_fee / 10000)` and the seller receives
//! `price - transfer_fee - auctioneer_cut`. The truncation remainder of the
//! cut stays with the seller, so the three parts always sum to `price`.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sale fees are expressed in basis points of this denominator.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Errors from fee computation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeeError {
    #[error("Sale fee {0} bps exceeds 10000")]
    InvalidSaleFee(u32),

    #[error("Fees exceed price: price {price}, transfer fee {transfer_fee}, auctioneer cut {auctioneer_cut}")]
    FeesExceedPrice {
        price: u64,
        transfer_fee: u64,
        auctioneer_cut: u64,
    },
}

/// Exact division of a winning bid.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct FeeSplit {
    pub price: u64,
    pub transfer_fee: u64,
    pub auctioneer_cut: u64,
    pub seller_proceeds: u64,
}

impl FeeSplit {
    /// Split `price`. Rejects when the fees would exceed it.
    pub fn compute(price: u64, transfer_fee: u64, sale_fee: u32) -> Result<Self, FeeError> {
        if sale_fee > BPS_DENOMINATOR {
            return Err(FeeError::InvalidSaleFee(sale_fee));
        }

        // sale_fee <= 10000 keeps the quotient within u64
        let auctioneer_cut =
            (price as u128 * sale_fee as u128 / BPS_DENOMINATOR as u128) as u64;

        let seller_proceeds = transfer_fee
            .checked_add(auctioneer_cut)
            .and_then(|fees| price.checked_sub(fees))
            .ok_or(FeeError::FeesExceedPrice {
                price,
                transfer_fee,
                auctioneer_cut,
            })?;

        Ok(Self {
            price,
            transfer_fee,
            auctioneer_cut,
            seller_proceeds,
        })
    }

    /// Sum of all parts; always equals `price`.
    pub fn total(&self) -> u64 {
        self.seller_proceeds + self.transfer_fee + self.auctioneer_cut
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_is_exact() {
        let split = FeeSplit::compute(15, 1, 1_500).unwrap();
        // 15 * 1500 / 10000 = 2.25 -> 2
        assert_eq!(split.auctioneer_cut, 2);
        assert_eq!(split.seller_proceeds, 12);
        assert_eq!(split.total(), 15);
    }

    #[test]
    fn test_remainder_stays_with_seller() {
        // 999 * 1 / 10000 truncates to zero
        let split = FeeSplit::compute(999, 0, 1).unwrap();
        assert_eq!(split.auctioneer_cut, 0);
        assert_eq!(split.seller_proceeds, 999);
    }

    #[test]
    fn test_fees_exceeding_price_rejected() {
        let result = FeeSplit::compute(10, 9, 2_000);
        assert_eq!(
            result,
            Err(FeeError::FeesExceedPrice {
                price: 10,
                transfer_fee: 9,
                auctioneer_cut: 2,
            })
        );
    }

    #[test]
    fn test_fees_equal_to_price_leave_seller_nothing() {
        let split = FeeSplit::compute(10, 8, 2_000).unwrap();
        assert_eq!(split.seller_proceeds, 0);
        assert_eq!(split.total(), 10);
    }

    #[test]
    fn test_invalid_sale_fee() {
        assert_eq!(
            FeeSplit::compute(100, 0, 10_001),
            Err(FeeError::InvalidSaleFee(10_001))
        );
    }

    #[test]
    fn test_full_sale_fee_on_max_price() {
        let split = FeeSplit::compute(u64::MAX, 0, BPS_DENOMINATOR).unwrap();
        assert_eq!(split.auctioneer_cut, u64::MAX);
        assert_eq!(split.seller_proceeds, 0);
    }

    #[test]
    fn test_transfer_fee_overflow_is_rejected() {
        assert!(FeeSplit::compute(u64::MAX, u64::MAX, 1).is_err());
    }

    #[test]
    fn test_random_splits_are_exact_or_rejected() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..2_000 {
            let price: u64 = rng.gen_range(0..=1_000_000);
            let transfer_fee: u64 = rng.gen_range(0..=price.saturating_add(100));
            let sale_fee: u32 = rng.gen_range(0..=BPS_DENOMINATOR);

            let cut = price * sale_fee as u64 / BPS_DENOMINATOR as u64;
            match FeeSplit::compute(price, transfer_fee, sale_fee) {
                Ok(split) => {
                    assert!(transfer_fee + cut <= price);
                    assert_eq!(split.auctioneer_cut, cut);
                    assert_eq!(split.total(), price);
                }
                Err(e) => {
                    assert!(transfer_fee + cut > price);
                    assert_eq!(
                        e,
                        FeeError::FeesExceedPrice {
                            price,
                            transfer_fee,
                            auctioneer_cut: cut,
                        }
                    );
                }
            }
        }
    }
}

//! Genesis configuration for the auction module.
//!
//! This module defines the initial accounts, NFTs and limits the auction
//! system starts with.

use std::collections::HashSet;

use nft_auction_types::{verification_key_hash, Address, NftId, Slot, BPS_DENOMINATOR};
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};

use crate::state::AuctionState;
use crate::upgrade::DesignatedAuthority;

/// Genesis configuration for the auction module.
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuctionGenesisConfig {
    /// Slot the chain starts at
    #[serde(default)]
    pub initial_slot: Slot,

    /// Funded accounts
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,

    /// NFTs minted at genesis
    #[serde(default)]
    pub nfts: Vec<NftConfig>,

    /// Account that approves verification key upgrades
    #[serde_as(as = "Option<Hex>")]
    pub upgrade_authority: Option<Address>,

    /// Verification key bound to every newly deployed auction
    #[serde_as(as = "Hex")]
    #[serde(default)]
    pub verification_key: Vec<u8>,

    /// Deploy-time parameter limits
    #[serde(default)]
    pub limits: AuctionLimits,
}

/// A funded account.
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccountConfig {
    #[serde_as(as = "Hex")]
    pub address: Address,
    pub balance: u64,
}

/// An NFT and its initial owner.
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NftConfig {
    #[serde_as(as = "Hex")]
    pub collection: Address,
    #[serde_as(as = "Hex")]
    pub nft: Address,
    #[serde_as(as = "Hex")]
    pub owner: Address,
}

impl NftConfig {
    pub fn id(&self) -> NftId {
        NftId {
            collection: self.collection,
            nft: self.nft,
        }
    }
}

/// Limits applied to deploy parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionLimits {
    /// Longest allowed `auction_end_time - now`, in slots
    pub max_duration: Slot,
    /// Longest allowed withdraw period, in slots
    pub max_withdraw_period: Slot,
    /// Highest allowed sale fee, in basis points
    pub max_sale_fee: u32,
}

impl Default for AuctionLimits {
    fn default() -> Self {
        Self {
            max_duration: 100_000,
            max_withdraw_period: 100_000,
            max_sale_fee: BPS_DENOMINATOR,
        }
    }
}

impl Default for AuctionGenesisConfig {
    fn default() -> Self {
        Self {
            initial_slot: 0,
            accounts: Vec::new(),
            nfts: Vec::new(),
            upgrade_authority: None,
            verification_key: Vec::new(),
            limits: AuctionLimits::default(),
        }
    }
}

impl AuctionGenesisConfig {
    /// Validate the genesis configuration.
    pub fn validate(&self) -> Result<(), GenesisValidationError> {
        if self.limits.max_sale_fee > BPS_DENOMINATOR {
            return Err(GenesisValidationError::InvalidLimits(format!(
                "Max sale fee {} exceeds {}",
                self.limits.max_sale_fee, BPS_DENOMINATOR
            )));
        }
        if self.limits.max_duration == 0 {
            return Err(GenesisValidationError::InvalidLimits(
                "Max duration cannot be zero".into(),
            ));
        }

        let mut seen_accounts = HashSet::new();
        for account in &self.accounts {
            if !seen_accounts.insert(account.address) {
                return Err(GenesisValidationError::DuplicateAccount(hex::encode(
                    account.address,
                )));
            }
        }

        let mut seen_nfts = HashSet::new();
        for nft in &self.nfts {
            if !seen_nfts.insert(nft.id()) {
                return Err(GenesisValidationError::DuplicateNft(hex::encode(nft.nft)));
            }
        }

        Ok(())
    }

    /// Validate and build the initial module state.
    pub fn build_state(&self) -> Result<AuctionState, GenesisValidationError> {
        self.validate()?;

        let mut state = AuctionState::new();
        state.limits = self.limits;
        state.default_vk_hash = verification_key_hash(&self.verification_key);
        state.upgrade_authority = self.upgrade_authority.map(DesignatedAuthority::new);

        for account in &self.accounts {
            state.balances.insert(account.address, account.balance);
        }
        for nft in &self.nfts {
            state
                .nfts
                .mint(nft.id(), nft.owner)
                .map_err(|_| GenesisValidationError::DuplicateNft(hex::encode(nft.nft)))?;
        }

        Ok(state)
    }
}

/// Errors that can occur during genesis validation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GenesisValidationError {
    #[error("Invalid limits: {0}")]
    InvalidLimits(String),

    #[error("Duplicate account: {0}")]
    DuplicateAccount(String),

    #[error("Duplicate NFT: {0}")]
    DuplicateNft(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AuctionGenesisConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_max_sale_fee() {
        let mut config = AuctionGenesisConfig::default();
        config.limits.max_sale_fee = 10_001;
        assert!(matches!(
            config.validate(),
            Err(GenesisValidationError::InvalidLimits(_))
        ));
    }

    #[test]
    fn test_duplicate_nft() {
        let nft = NftConfig {
            collection: [1u8; 32],
            nft: [2u8; 32],
            owner: [3u8; 32],
        };
        let config = AuctionGenesisConfig {
            nfts: vec![nft.clone(), nft],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(GenesisValidationError::DuplicateNft(_))
        ));
    }

    #[test]
    fn test_build_state_from_json() {
        let json = format!(
            r#"{{
                "initial_slot": 5,
                "accounts": [{{ "address": "{}", "balance": 100 }}],
                "nfts": [{{ "collection": "{}", "nft": "{}", "owner": "{}" }}],
                "upgrade_authority": "{}",
                "verification_key": "cafe"
            }}"#,
            "11".repeat(32),
            "22".repeat(32),
            "33".repeat(32),
            "11".repeat(32),
            "aa".repeat(32),
        );
        let config: AuctionGenesisConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.initial_slot, 5);
        assert_eq!(config.limits, AuctionLimits::default());

        let state = config.build_state().unwrap();
        assert_eq!(state.balance_of(&[0x11; 32]), 100);
        assert_eq!(state.default_vk_hash, verification_key_hash(&[0xCA, 0xFE]));
        assert_eq!(
            state.upgrade_authority,
            Some(DesignatedAuthority::new([0xAA; 32]))
        );

        let id = NftId {
            collection: [0x22; 32],
            nft: [0x33; 32],
        };
        assert_eq!(state.nfts.owner_of(&id).unwrap(), [0x11; 32]);
    }
}

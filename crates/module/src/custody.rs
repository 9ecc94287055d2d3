//! NFT ownership registry consumed by the auction.
//!
//! Stands in for the NFT contract: it records an owner and at most one
//! approved custodian per NFT. The auction only calls `record`, `lock`,
//! `approve` and `transfer`.
//!
//! A deployed auction locks the NFT it sells. While locked, approvals are
//! frozen and only the locking account can move the NFT; the next transfer
//! releases the lock.

use std::collections::HashMap;

use nft_auction_types::{Address, NftId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the NFT registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CustodyError {
    #[error("Unknown NFT")]
    UnknownNft,

    #[error("NFT already minted")]
    AlreadyMinted,

    #[error("Caller is not the NFT owner")]
    NotOwner,

    #[error("Caller is neither owner nor approved custodian")]
    NotCustodian,

    #[error("NFT is locked by an auction")]
    Locked,
}

/// Ownership record of a single NFT.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftRecord {
    pub owner: Address,
    pub approved: Option<Address>,
    /// Auction holding the NFT until it settles or is withdrawn
    pub locked_by: Option<Address>,
}

impl NftRecord {
    /// Whether `account` may move this NFT.
    pub fn is_custodian(&self, account: &Address) -> bool {
        match self.locked_by {
            Some(lock) => lock == *account,
            None => self.owner == *account || self.approved.as_ref() == Some(account),
        }
    }
}

/// In-memory NFT registry.
#[derive(Clone, Debug, Default)]
pub struct NftRegistry {
    records: HashMap<NftId, NftRecord>,
}

impl NftRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an NFT owned by `owner`.
    pub fn mint(&mut self, nft: NftId, owner: Address) -> Result<(), CustodyError> {
        if self.records.contains_key(&nft) {
            return Err(CustodyError::AlreadyMinted);
        }
        self.records.insert(
            nft,
            NftRecord {
                owner,
                approved: None,
                locked_by: None,
            },
        );
        Ok(())
    }

    pub fn record(&self, nft: &NftId) -> Result<NftRecord, CustodyError> {
        self.records.get(nft).copied().ok_or(CustodyError::UnknownNft)
    }

    pub fn owner_of(&self, nft: &NftId) -> Result<Address, CustodyError> {
        self.record(nft).map(|record| record.owner)
    }

    /// Set or clear the approved custodian. Owner only, and not while locked.
    pub fn approve(
        &mut self,
        caller: &Address,
        nft: &NftId,
        approved: Option<Address>,
    ) -> Result<(), CustodyError> {
        let record = self.records.get_mut(nft).ok_or(CustodyError::UnknownNft)?;
        if record.owner != *caller {
            return Err(CustodyError::NotOwner);
        }
        if record.locked_by.is_some() {
            return Err(CustodyError::Locked);
        }
        record.approved = approved;
        Ok(())
    }

    /// Lock an NFT to `custodian`, which must already be able to move it.
    pub fn lock(&mut self, nft: &NftId, custodian: Address) -> Result<(), CustodyError> {
        let record = self.records.get_mut(nft).ok_or(CustodyError::UnknownNft)?;
        if record.locked_by.is_some() {
            return Err(CustodyError::Locked);
        }
        if !record.is_custodian(&custodian) {
            return Err(CustodyError::NotCustodian);
        }
        record.locked_by = Some(custodian);
        Ok(())
    }

    /// Move an NFT to `to`. Callable by the owner or the approved custodian,
    /// or only by the locking account while locked. Approval and lock are
    /// cleared.
    pub fn transfer(
        &mut self,
        caller: &Address,
        nft: &NftId,
        to: Address,
    ) -> Result<(), CustodyError> {
        let record = self.records.get_mut(nft).ok_or(CustodyError::UnknownNft)?;
        if !record.is_custodian(caller) {
            return Err(CustodyError::NotCustodian);
        }
        record.owner = to;
        record.approved = None;
        record.locked_by = None;
        Ok(())
    }
}

//! Verification-key upgrade authorization.
//!
//! The auction does not decide who may replace its verification key. It asks
//! an [`UpgradeAuthority`] whether a proof authorizes a given key for a given
//! contract at the current slot.

use nft_auction_types::{upgrade_digest, Address, Slot, UpgradeProof};
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};

/// Decides whether a verification-key upgrade is authorized.
pub trait UpgradeAuthority {
    fn authorizes(
        &self,
        contract: &Address,
        new_vk_hash: &[u8; 32],
        proof: &UpgradeProof,
        now: Slot,
    ) -> bool;
}

/// A single designated account approves upgrades.
///
/// A proof is accepted when it names this authority, the target contract and
/// the new key hash, is already valid at `now`, and carries the matching
/// [`upgrade_digest`].
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignatedAuthority {
    #[serde_as(as = "Hex")]
    pub authority: Address,
}

impl DesignatedAuthority {
    pub fn new(authority: Address) -> Self {
        Self { authority }
    }

    /// Build a proof this authority accepts.
    pub fn approve(&self, contract: Address, new_vk_hash: [u8; 32], valid_from: Slot) -> UpgradeProof {
        UpgradeProof {
            authority: self.authority,
            contract,
            new_vk_hash,
            valid_from,
            digest: upgrade_digest(&self.authority, &contract, &new_vk_hash, valid_from),
        }
    }
}

impl UpgradeAuthority for DesignatedAuthority {
    fn authorizes(
        &self,
        contract: &Address,
        new_vk_hash: &[u8; 32],
        proof: &UpgradeProof,
        now: Slot,
    ) -> bool {
        proof.authority == self.authority
            && proof.contract == *contract
            && proof.new_vk_hash == *new_vk_hash
            && proof.valid_from <= now
            && proof.digest
                == upgrade_digest(&proof.authority, &proof.contract, &proof.new_vk_hash, proof.valid_from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nft_auction_types::verification_key_hash;

    const AUTHORITY: Address = [0xA0; 32];
    const CONTRACT: Address = [0xC0; 32];

    #[test]
    fn test_accepts_own_proof() {
        let authority = DesignatedAuthority::new(AUTHORITY);
        let hash = verification_key_hash(b"vk-2");
        let proof = authority.approve(CONTRACT, hash, 10);
        assert!(authority.authorizes(&CONTRACT, &hash, &proof, 10));
    }

    #[test]
    fn test_rejects_future_proof() {
        let authority = DesignatedAuthority::new(AUTHORITY);
        let hash = verification_key_hash(b"vk-2");
        let proof = authority.approve(CONTRACT, hash, 11);
        assert!(!authority.authorizes(&CONTRACT, &hash, &proof, 10));
    }

    #[test]
    fn test_rejects_other_contract_or_key() {
        let authority = DesignatedAuthority::new(AUTHORITY);
        let hash = verification_key_hash(b"vk-2");
        let proof = authority.approve(CONTRACT, hash, 0);

        assert!(!authority.authorizes(&[0xC1; 32], &hash, &proof, 5));
        assert!(!authority.authorizes(&CONTRACT, &verification_key_hash(b"vk-3"), &proof, 5));
    }

    #[test]
    fn test_rejects_foreign_authority_and_tampered_digest() {
        let authority = DesignatedAuthority::new(AUTHORITY);
        let impostor = DesignatedAuthority::new([0xEE; 32]);
        let hash = verification_key_hash(b"vk-2");

        let proof = impostor.approve(CONTRACT, hash, 0);
        assert!(!authority.authorizes(&CONTRACT, &hash, &proof, 5));

        let mut proof = authority.approve(CONTRACT, hash, 0);
        proof.digest[0] ^= 1;
        assert!(!authority.authorizes(&CONTRACT, &hash, &proof, 5));
    }
}

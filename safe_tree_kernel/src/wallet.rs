//! SafeTree v1 - Wallet Host Boundary
//!
//! The module never holds keys or funds. Quorum verification, call
//! execution and owner/guard/module administration belong to the
//! multisig wallets, reached through `WalletHost`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Operation;
use crate::engine::SafeTreeModule;
use crate::primitives::{Address, Hash32};

/// How one owner approved a transaction hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureKind {
    /// Raw 64-byte signature over the hash by the owner's key.
    Eoa(Vec<u8>),
    /// The owner approved the hash on the wallet beforehand.
    ApprovedHash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerSignature {
    pub signer: Address,
    pub kind: SignatureKind,
}

/// Why a signature bundle was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("wallet {0} is unknown to the host")]
    UnknownWallet(Address),
    #[error("signers are not strictly ascending at {0}")]
    UnsortedSigners(Address),
    #[error("{0} is not an owner")]
    NotOwner(Address),
    #[error("invalid signature from {0}")]
    InvalidSignature(Address),
    #[error("{0} has not approved the hash")]
    HashNotApproved(Address),
    #[error("{have} valid signatures, threshold is {need}")]
    BelowThreshold { have: usize, need: usize },
}

/// Call forwarded to a target wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleCall {
    pub to: Address,
    pub value: u128,
    pub data: Vec<u8>,
    pub operation: Operation,
}

/// Administrative call the module performs on a managed wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafeAdminCall {
    AddOwnerWithThreshold { owner: Address, threshold: usize },
    RemoveOwner { owner: Address, threshold: usize },
    SetGuard(Option<Address>),
    DisableModule(Address),
}

pub trait WalletHost {
    fn is_safe(&self, account: Address) -> bool;

    fn owners(&self, safe: Address) -> Vec<Address>;

    fn is_owner(&self, safe: Address, account: Address) -> bool {
        self.owners(safe).contains(&account)
    }

    fn is_module_enabled(&self, safe: Address, module: Address) -> bool;

    fn guard(&self, safe: Address) -> Option<Address>;

    /// Verify that `signatures` reach the quorum of `safe` for `hash`.
    /// `data` is the pre-image of `hash`.
    fn check_signatures(
        &self,
        safe: Address,
        hash: &Hash32,
        data: &[u8],
        signatures: &[OwnerSignature],
    ) -> Result<(), SignatureError>;

    /// Execute `call` from `safe` as a module transaction. The host may
    /// call back into `module`. Returns whether the call succeeded.
    fn exec_transaction_from_module(
        &mut self,
        module: &mut SafeTreeModule,
        safe: Address,
        call: &ModuleCall,
    ) -> bool;

    /// Apply an administrative change to `safe` on behalf of `module`.
    fn exec_admin_from_module(&mut self, module: Address, safe: Address, call: &SafeAdminCall)
        -> bool;
}

/// Drop entries from non-owners and repeated signers, then sort by
/// signer ascending.
pub fn process_and_sort_signatures(
    host: &dyn WalletHost,
    safe: Address,
    signatures: &[OwnerSignature],
) -> Vec<OwnerSignature> {
    let owners = host.owners(safe);
    let mut kept: Vec<OwnerSignature> = Vec::with_capacity(signatures.len());
    for sig in signatures {
        if owners.contains(&sig.signer) && !kept.iter().any(|k| k.signer == sig.signer) {
            kept.push(sig.clone());
        }
    }
    kept.sort_by(|a, b| a.signer.cmp(&b.signer));
    kept
}

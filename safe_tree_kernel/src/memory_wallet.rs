//! SafeTree v1 - In-Memory Wallet Host
//!
//! Reference `WalletHost` used by tests and the runtime CLI. Wallets
//! hold owners, a threshold, enabled modules, an optional guard, a
//! native balance and pre-approved hashes. Owner keys are ed25519; an
//! owner's address is the first 20 bytes of SHA-256 over its public key.

use std::collections::{BTreeMap, BTreeSet};

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use crate::domain::{ModuleConfig, OnBehalfTransaction, Operation};
use crate::engine::SafeTreeModule;
use crate::error::ModuleError;
use crate::hashing::sha256;
use crate::primitives::{Address, Hash32};
use crate::wallet::{ModuleCall, OwnerSignature, SafeAdminCall, SignatureError, SignatureKind, WalletHost};

pub fn owner_address(key: &VerifyingKey) -> Address {
    let digest = sha256(key.as_bytes());
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&digest.as_bytes()[..20]);
    Address::new(bytes)
}

/// Signing key of one wallet owner.
#[derive(Debug, Clone)]
pub struct OwnerKey {
    signing: SigningKey,
}

impl OwnerKey {
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing: SigningKey::from_bytes(&seed),
        }
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing.verifying_key()
    }

    pub fn address(&self) -> Address {
        owner_address(&self.verifying_key())
    }

    pub fn sign(&self, hash: &Hash32) -> OwnerSignature {
        let signature = self.signing.sign(hash.as_bytes());
        OwnerSignature {
            signer: self.address(),
            kind: SignatureKind::Eoa(signature.to_bytes().to_vec()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletState {
    pub owners: Vec<Address>,
    pub threshold: usize,
    pub modules: BTreeSet<Address>,
    pub guard: Option<Address>,
    pub balance: u128,
    approved: BTreeSet<(Address, Hash32)>,
}

/// On-behalf execution the host attempts from inside the next module
/// call it serves.
#[derive(Debug, Clone)]
pub struct ReentryScript {
    pub caller: Address,
    pub tx: OnBehalfTransaction,
    pub signatures: Vec<OwnerSignature>,
}

#[derive(Debug, Default)]
pub struct InMemoryWallets {
    wallets: BTreeMap<Address, WalletState>,
    keys: BTreeMap<Address, VerifyingKey>,
    accounts: BTreeMap<Address, u128>,
    reverting: BTreeSet<Address>,
    reentry: Option<ReentryScript>,
    reentry_results: Vec<Result<(), ModuleError>>,
    executed: Vec<(Address, ModuleCall)>,
}

impl InMemoryWallets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `key` usable as an EOA owner. Returns its address.
    pub fn register_key(&mut self, key: VerifyingKey) -> Address {
        let address = owner_address(&key);
        self.keys.insert(address, key);
        address
    }

    /// Create a wallet. `threshold` should lie in `1..=owners.len()`.
    pub fn create_wallet(&mut self, wallet: Address, owners: Vec<Address>, threshold: usize) {
        self.wallets.insert(
            wallet,
            WalletState {
                owners,
                threshold,
                ..WalletState::default()
            },
        );
    }

    /// Enable the module and install the guard named by `config`.
    pub fn wire_module(&mut self, wallet: Address, config: &ModuleConfig) {
        if let Some(state) = self.wallets.get_mut(&wallet) {
            state.modules.insert(config.module_address);
            state.guard = Some(config.guard_address);
        }
    }

    pub fn wallet(&self, wallet: Address) -> Option<&WalletState> {
        self.wallets.get(&wallet)
    }

    pub fn set_balance(&mut self, account: Address, amount: u128) {
        match self.wallets.get_mut(&account) {
            Some(state) => state.balance = amount,
            None => {
                self.accounts.insert(account, amount);
            }
        }
    }

    pub fn balance_of(&self, account: Address) -> u128 {
        match self.wallets.get(&account) {
            Some(state) => state.balance,
            None => self.accounts.get(&account).copied().unwrap_or(0),
        }
    }

    /// Record that `owner` approved `hash` on `wallet`.
    pub fn approve_hash(&mut self, wallet: Address, owner: Address, hash: Hash32) {
        if let Some(state) = self.wallets.get_mut(&wallet) {
            state.approved.insert((owner, hash));
        }
    }

    /// Every module call targeting `to` fails.
    pub fn set_reverting(&mut self, to: Address) {
        self.reverting.insert(to);
    }

    pub fn script_reentry(&mut self, script: ReentryScript) {
        self.reentry = Some(script);
    }

    pub fn take_reentry_results(&mut self) -> Vec<Result<(), ModuleError>> {
        std::mem::take(&mut self.reentry_results)
    }

    /// Successful module calls, oldest first.
    pub fn executed_calls(&self) -> &[(Address, ModuleCall)] {
        &self.executed
    }

    /// An administrative transaction signed by the wallet's own owners.
    /// The guard runs afterwards and rolls the change back on failure.
    pub fn owner_admin(
        &mut self,
        module: &SafeTreeModule,
        wallet: Address,
        call: &SafeAdminCall,
    ) -> Result<(), ModuleError> {
        let before = self
            .wallets
            .get(&wallet)
            .cloned()
            .ok_or(ModuleError::InvalidSafe(wallet))?;
        let applied = self
            .wallets
            .get_mut(&wallet)
            .is_some_and(|state| apply_admin(state, call));
        if !applied {
            return Err(ModuleError::TxExecutionModuleFailed);
        }
        if let Err(err) = module.check_after_execution(&*self, wallet) {
            self.wallets.insert(wallet, before);
            return Err(err);
        }
        Ok(())
    }

    fn transfer(&mut self, from: Address, to: Address, value: u128) -> bool {
        if value == 0 {
            return true;
        }
        let Some(source) = self.wallets.get(&from) else {
            return false;
        };
        let Some(remaining) = source.balance.checked_sub(value) else {
            return false;
        };
        if from == to {
            return true;
        }
        let credited = match self.wallets.get(&to) {
            Some(dest) => dest.balance.checked_add(value),
            None => self.accounts.get(&to).copied().unwrap_or(0).checked_add(value),
        };
        let Some(credited) = credited else {
            return false;
        };
        if let Some(source) = self.wallets.get_mut(&from) {
            source.balance = remaining;
        }
        self.set_balance(to, credited);
        true
    }
}

fn apply_admin(state: &mut WalletState, call: &SafeAdminCall) -> bool {
    match call {
        SafeAdminCall::AddOwnerWithThreshold { owner, threshold } => {
            if state.owners.contains(owner) || *threshold == 0 || *threshold > state.owners.len() + 1 {
                return false;
            }
            state.owners.push(*owner);
            state.threshold = *threshold;
            true
        }
        SafeAdminCall::RemoveOwner { owner, threshold } => {
            let remaining = state.owners.len().saturating_sub(1);
            if !state.owners.contains(owner) || remaining == 0 || *threshold == 0 || *threshold > remaining {
                return false;
            }
            state.owners.retain(|o| o != owner);
            state.threshold = *threshold;
            true
        }
        SafeAdminCall::SetGuard(guard) => {
            state.guard = *guard;
            true
        }
        SafeAdminCall::DisableModule(module) => state.modules.remove(module),
    }
}

impl WalletHost for InMemoryWallets {
    fn is_safe(&self, account: Address) -> bool {
        self.wallets.contains_key(&account)
    }

    fn owners(&self, safe: Address) -> Vec<Address> {
        self.wallets
            .get(&safe)
            .map(|s| s.owners.clone())
            .unwrap_or_default()
    }

    fn is_module_enabled(&self, safe: Address, module: Address) -> bool {
        self.wallets
            .get(&safe)
            .is_some_and(|s| s.modules.contains(&module))
    }

    fn guard(&self, safe: Address) -> Option<Address> {
        self.wallets.get(&safe).and_then(|s| s.guard)
    }

    fn check_signatures(
        &self,
        safe: Address,
        hash: &Hash32,
        _data: &[u8],
        signatures: &[OwnerSignature],
    ) -> Result<(), SignatureError> {
        let state = self
            .wallets
            .get(&safe)
            .ok_or(SignatureError::UnknownWallet(safe))?;
        let mut last: Option<Address> = None;
        for sig in signatures {
            if last.is_some_and(|prev| sig.signer <= prev) {
                return Err(SignatureError::UnsortedSigners(sig.signer));
            }
            last = Some(sig.signer);
            if !state.owners.contains(&sig.signer) {
                return Err(SignatureError::NotOwner(sig.signer));
            }
            match &sig.kind {
                SignatureKind::Eoa(bytes) => {
                    let invalid = || SignatureError::InvalidSignature(sig.signer);
                    let key = self.keys.get(&sig.signer).ok_or_else(invalid)?;
                    let raw: [u8; 64] = bytes.as_slice().try_into().map_err(|_| invalid())?;
                    key.verify(hash.as_bytes(), &Signature::from_bytes(&raw))
                        .map_err(|_| invalid())?;
                }
                SignatureKind::ApprovedHash => {
                    if !state.approved.contains(&(sig.signer, *hash)) {
                        return Err(SignatureError::HashNotApproved(sig.signer));
                    }
                }
            }
        }
        let need = state.threshold.max(1);
        if signatures.len() < need {
            return Err(SignatureError::BelowThreshold {
                have: signatures.len(),
                need,
            });
        }
        Ok(())
    }

    fn exec_transaction_from_module(
        &mut self,
        module: &mut SafeTreeModule,
        safe: Address,
        call: &ModuleCall,
    ) -> bool {
        if !self.is_module_enabled(safe, module.config().module_address) {
            return false;
        }
        if let Some(script) = self.reentry.take() {
            let outcome =
                module.exec_transaction_on_behalf(self, script.caller, &script.tx, &script.signatures);
            self.reentry_results.push(outcome);
        }
        if self.reverting.contains(&call.to) {
            return false;
        }
        let ok = match call.operation {
            Operation::Call => self.transfer(safe, call.to, call.value),
            Operation::DelegateCall => call.value == 0,
        };
        if ok {
            self.executed.push((safe, call.clone()));
        }
        ok && module.check_after_execution(&*self, safe).is_ok()
    }

    fn exec_admin_from_module(
        &mut self,
        module: Address,
        safe: Address,
        call: &SafeAdminCall,
    ) -> bool {
        match self.wallets.get_mut(&safe) {
            Some(state) if state.modules.contains(&module) => apply_admin(state, call),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::process_and_sort_signatures;

    fn setup() -> (InMemoryWallets, Vec<OwnerKey>, Address) {
        let mut host = InMemoryWallets::new();
        let keys: Vec<OwnerKey> = (1..=3u8).map(|i| OwnerKey::from_seed([i; 32])).collect();
        let owners: Vec<Address> = keys.iter().map(|k| host.register_key(k.verifying_key())).collect();
        let wallet = Address::from_low_u64(0xa11ce);
        host.create_wallet(wallet, owners, 2);
        (host, keys, wallet)
    }

    #[test]
    fn quorum_of_valid_signatures_passes() {
        let (host, keys, wallet) = setup();
        let hash = sha256(b"payload");
        let sigs = process_and_sort_signatures(&host, wallet, &[keys[2].sign(&hash), keys[0].sign(&hash)]);
        assert!(host.check_signatures(wallet, &hash, b"", &sigs).is_ok());
    }

    #[test]
    fn below_threshold_and_wrong_hash_fail() {
        let (host, keys, wallet) = setup();
        let hash = sha256(b"payload");
        let one = vec![keys[0].sign(&hash)];
        assert_eq!(
            host.check_signatures(wallet, &hash, b"", &one),
            Err(SignatureError::BelowThreshold { have: 1, need: 2 })
        );

        let other = sha256(b"other");
        let sigs = process_and_sort_signatures(&host, wallet, &[keys[0].sign(&other), keys[1].sign(&other)]);
        assert!(matches!(
            host.check_signatures(wallet, &hash, b"", &sigs),
            Err(SignatureError::InvalidSignature(_))
        ));
    }

    #[test]
    fn preprocessing_drops_strangers_and_duplicates() {
        let (host, keys, wallet) = setup();
        let hash = sha256(b"payload");
        let stranger = OwnerKey::from_seed([9; 32]);
        let sigs = process_and_sort_signatures(
            &host,
            wallet,
            &[keys[1].sign(&hash), stranger.sign(&hash), keys[1].sign(&hash), keys[0].sign(&hash)],
        );
        assert_eq!(sigs.len(), 2);
        assert!(sigs[0].signer < sigs[1].signer);
        assert!(sigs.iter().all(|s| s.signer != stranger.address()));
    }

    #[test]
    fn approved_hash_counts_toward_quorum() {
        let (mut host, keys, wallet) = setup();
        let hash = sha256(b"payload");
        host.approve_hash(wallet, keys[1].address(), hash);
        let approved = OwnerSignature {
            signer: keys[1].address(),
            kind: SignatureKind::ApprovedHash,
        };
        let sigs = process_and_sort_signatures(&host, wallet, &[keys[0].sign(&hash), approved]);
        assert!(host.check_signatures(wallet, &hash, b"", &sigs).is_ok());
    }

    #[test]
    fn admin_calls_respect_owner_rules() {
        let (mut host, keys, wallet) = setup();
        let module = Address::from_low_u64(0x5afe_0001);
        let add = SafeAdminCall::AddOwnerWithThreshold {
            owner: Address::from_low_u64(77),
            threshold: 2,
        };
        assert!(!host.exec_admin_from_module(module, wallet, &add));

        host.wire_module(wallet, &ModuleConfig::default());
        assert!(host.exec_admin_from_module(module, wallet, &add));
        assert!(!host.exec_admin_from_module(module, wallet, &add));
        assert_eq!(host.owners(wallet).len(), 4);

        let remove = SafeAdminCall::RemoveOwner {
            owner: keys[0].address(),
            threshold: 5,
        };
        assert!(!host.exec_admin_from_module(module, wallet, &remove));
    }
}

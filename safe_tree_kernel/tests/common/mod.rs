#![allow(dead_code)]

use std::collections::BTreeMap;

use safe_tree_kernel::{
    Address, Hash32, InMemoryWallets, ModuleConfig, OnBehalfTransaction, Operation, OrgHash,
    OwnerKey, OwnerSignature, SafeTreeModule,
};

pub const ETHER: u128 = 1_000_000_000_000_000_000;

/// Module plus an in-memory wallet host with signing owners.
pub struct Fixture {
    pub module: SafeTreeModule,
    pub host: InMemoryWallets,
    owners: BTreeMap<Address, Vec<OwnerKey>>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(ModuleConfig::default())
    }

    pub fn with_config(config: ModuleConfig) -> Self {
        Self {
            module: SafeTreeModule::new(config).unwrap(),
            host: InMemoryWallets::new(),
            owners: BTreeMap::new(),
        }
    }

    /// Wallet `n` with two owners, threshold 2, module and guard wired.
    pub fn wallet(&mut self, n: u8) -> Address {
        let address = Address::from_low_u64(0x1000 + n as u64);
        let keys = vec![
            OwnerKey::from_seed([n; 32]),
            OwnerKey::from_seed([n.wrapping_add(100); 32]),
        ];
        let owners: Vec<Address> = keys
            .iter()
            .map(|k| self.host.register_key(k.verifying_key()))
            .collect();
        self.host.create_wallet(address, owners, 2);
        let config = self.module.config().clone();
        self.host.wire_module(address, &config);
        self.owners.insert(address, keys);
        address
    }

    pub fn keys(&self, wallet: Address) -> &[OwnerKey] {
        &self.owners[&wallet]
    }

    /// Full quorum of `wallet` over `hash`.
    pub fn sign(&self, wallet: Address, hash: &Hash32) -> Vec<OwnerSignature> {
        self.keys(wallet).iter().map(|k| k.sign(hash)).collect()
    }

    pub fn register(&mut self, wallet: Address, name: &str) -> u64 {
        self.module.register_org(&self.host, wallet, name).unwrap()
    }

    pub fn add(&mut self, wallet: Address, super_id: u64, name: &str) -> u64 {
        self.module.add_safe(&self.host, wallet, super_id, name).unwrap()
    }

    /// Signed on-behalf execution at the current nonce.
    pub fn exec_signed(
        &mut self,
        caller: Address,
        tx: &OnBehalfTransaction,
    ) -> Result<(), safe_tree_kernel::ModuleError> {
        let nonce = self.module.nonce(&tx.org)?;
        let hash = self.module.get_transaction_hash(tx, nonce);
        let sigs = self.sign(tx.super_safe, &hash);
        self.module
            .exec_transaction_on_behalf(&mut self.host, caller, tx, &sigs)
    }
}

pub fn transfer(org: OrgHash, super_safe: Address, target: Address, to: Address, value: u128) -> OnBehalfTransaction {
    OnBehalfTransaction {
        org,
        super_safe,
        target_safe: target,
        to,
        value,
        data: Vec::new(),
        operation: Operation::Call,
    }
}

pub fn account(n: u64) -> Address {
    Address::from_low_u64(0xe0a_0000 + n)
}

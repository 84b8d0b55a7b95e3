//! SafeTree v1 - State Construction and Lookups

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{ModuleConfig, Organization, Registry, SafeNode};
use crate::error::ModuleError;
use crate::primitives::{Address, OrgHash, SafeId};

/// Create a fresh, empty registry bound to `config`.
pub fn create_initial_registry(config: ModuleConfig) -> Registry {
    Registry {
        config,
        orgs: BTreeMap::new(),
        safes: BTreeMap::new(),
        role_grants: BTreeSet::new(),
        index_id: 0,
        wallet_index: BTreeMap::new(),
    }
}

impl Registry {
    pub fn org(&self, org: &OrgHash) -> Result<&Organization, ModuleError> {
        self.orgs.get(org).ok_or(ModuleError::OrgNotRegistered(*org))
    }

    pub fn org_mut(&mut self, org: &OrgHash) -> Result<&mut Organization, ModuleError> {
        self.orgs
            .get_mut(org)
            .ok_or(ModuleError::OrgNotRegistered(*org))
    }

    pub fn node(&self, id: SafeId) -> Option<&SafeNode> {
        self.safes.get(&id)
    }

    /// Node that exists and is not pending removal.
    pub fn live_node(&self, id: SafeId) -> Result<&SafeNode, ModuleError> {
        match self.safes.get(&id) {
            Some(node) if node.is_live() => Ok(node),
            _ => Err(ModuleError::InvalidSafeId(id)),
        }
    }

    /// Node bound to `wallet`, in any organization.
    pub fn node_by_wallet(&self, wallet: Address) -> Option<&SafeNode> {
        self.wallet_index.get(&wallet).and_then(|id| self.safes.get(id))
    }

    /// Node bound to `wallet` inside `org`.
    pub fn node_in_org(&self, org: &OrgHash, wallet: Address) -> Option<&SafeNode> {
        self.node_by_wallet(wallet).filter(|n| n.org == *org)
    }

    /// Store `node` and index its wallet. Replaces any record with the
    /// same id.
    pub fn insert_safe(&mut self, node: SafeNode) {
        if let Some(old) = self.safes.get(&node.id) {
            self.wallet_index.remove(&old.wallet);
        }
        self.wallet_index.insert(node.wallet, node.id);
        self.safes.insert(node.id, node);
    }

    pub fn remove_safe(&mut self, id: SafeId) -> Option<SafeNode> {
        let node = self.safes.remove(&id)?;
        self.wallet_index.remove(&node.wallet);
        Some(node)
    }

    pub fn next_safe_id(&self) -> SafeId {
        self.index_id + 1
    }
}

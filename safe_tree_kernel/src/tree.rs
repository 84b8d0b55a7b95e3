//! SafeTree v1 - Tree Manager
//!
//! Organization and safe lifecycle. Each operation checks its request
//! against the current registry, then commits events. `caller` is the
//! account that sent the request, normally a registered safe wallet.

use tracing::{debug, error, warn};

use crate::authority::{has_authority, is_root_safe_of};
use crate::domain::{SafeNode, Tier};
use crate::engine::SafeTreeModule;
use crate::error::ModuleError;
use crate::events::ModuleEvent;
use crate::graph::{children_of, depth, is_ancestor, max_realized_depth, subtree_height};
use crate::hashing::org_hash;
use crate::primitives::{validate_account, Address, SafeId};
use crate::wallet::{SafeAdminCall, WalletHost};

fn check_name(name: &str) -> Result<(), ModuleError> {
    if name.trim().is_empty() {
        return Err(ModuleError::EmptyName);
    }
    Ok(())
}

/// Drop the guard, then disable the module. The guard refuses module
/// removal while installed. If the second step fails the previous guard
/// is put back, so the wallet ends either fully wired or fully unhooked.
fn unhook_wallet(host: &mut dyn WalletHost, module: Address, wallet: Address) -> bool {
    if !host.is_module_enabled(wallet, module) {
        return false;
    }
    let previous_guard = host.guard(wallet);
    if !host.exec_admin_from_module(module, wallet, &SafeAdminCall::SetGuard(None)) {
        return false;
    }
    if host.exec_admin_from_module(module, wallet, &SafeAdminCall::DisableModule(module)) {
        return true;
    }
    if previous_guard.is_some()
        && !host.exec_admin_from_module(module, wallet, &SafeAdminCall::SetGuard(previous_guard))
    {
        error!(%wallet, "guard could not be restored after a failed module removal");
    }
    false
}

impl SafeTreeModule {
    /// Live node bound to `caller`.
    pub(crate) fn caller_node(&self, caller: Address) -> Result<SafeNode, ModuleError> {
        self.registry()
            .node_by_wallet(caller)
            .filter(|n| n.is_live())
            .cloned()
            .ok_or(ModuleError::SafeNotRegistered(caller))
    }

    /// Live ROOT-tier node bound to `caller`.
    pub(crate) fn caller_root(&self, caller: Address) -> Result<SafeNode, ModuleError> {
        match self.caller_node(caller) {
            Ok(node) if node.tier == Tier::Root => Ok(node),
            _ => Err(ModuleError::InvalidRootSafe(caller)),
        }
    }

    fn ensure_unregistered(&self, wallet: Address) -> Result<(), ModuleError> {
        if self.registry().node_by_wallet(wallet).is_some() {
            return Err(ModuleError::SafeAlreadyRegistered(wallet));
        }
        Ok(())
    }

    /// Create an organization with `caller` as its first root.
    pub fn register_org(
        &mut self,
        host: &dyn WalletHost,
        caller: Address,
        name: &str,
    ) -> Result<SafeId, ModuleError> {
        check_name(name)?;
        let org = org_hash(name);
        if self.is_org_registered(&org) {
            return Err(ModuleError::OrgAlreadyRegistered(org));
        }
        if !host.is_safe(caller) {
            return Err(ModuleError::InvalidSafe(caller));
        }
        self.ensure_unregistered(caller)?;

        let id = self.registry().next_safe_id();
        let depth_tree_limit = self.config().default_depth_tree_limit;
        self.commit(vec![ModuleEvent::OrganisationCreated {
            org,
            name: name.to_string(),
            creator: caller,
            root_safe_id: id,
            depth_tree_limit,
        }])?;
        debug!(%org, name, safe_id = id, "organisation registered");
        Ok(id)
    }

    /// Onboard an existing wallet as another root of the caller's
    /// organization.
    pub fn create_root_safe(
        &mut self,
        host: &dyn WalletHost,
        caller: Address,
        wallet: Address,
        name: &str,
    ) -> Result<SafeId, ModuleError> {
        validate_account(wallet)?;
        let root = self.caller_root(caller)?;
        if !host.is_safe(wallet) {
            return Err(ModuleError::InvalidSafe(wallet));
        }
        check_name(name)?;
        self.ensure_unregistered(wallet)?;

        let id = self.registry().next_safe_id();
        self.commit(vec![ModuleEvent::RootSafeCreated {
            org: root.org,
            safe_id: id,
            creator: caller,
            wallet,
            name: name.to_string(),
        }])?;
        debug!(org = %root.org, safe_id = id, %wallet, "root safe created");
        Ok(id)
    }

    /// Join the caller's wallet under `super_safe_id`.
    pub fn add_safe(
        &mut self,
        host: &dyn WalletHost,
        caller: Address,
        super_safe_id: SafeId,
        name: &str,
    ) -> Result<SafeId, ModuleError> {
        check_name(name)?;
        if !host.is_safe(caller) {
            return Err(ModuleError::InvalidSafe(caller));
        }
        let parent = self.registry().live_node(super_safe_id)?.clone();
        let limit = self.registry().org(&parent.org)?.depth_tree_limit;
        self.ensure_unregistered(caller)?;
        if depth(self.registry(), super_safe_id) + 1 > limit {
            return Err(ModuleError::TreeDepthLimitReached(limit));
        }

        let id = self.registry().next_safe_id();
        self.commit(vec![ModuleEvent::SafeCreated {
            org: parent.org,
            safe_id: id,
            creator: caller,
            super_safe: super_safe_id,
            name: name.to_string(),
        }])?;
        debug!(org = %parent.org, safe_id = id, super_safe = super_safe_id, "safe added");
        Ok(id)
    }

    fn ensure_leaf(&self, id: SafeId) -> Result<(), ModuleError> {
        let children = children_of(self.registry(), id).len();
        if children > 0 {
            return Err(ModuleError::CannotRemoveSafeBeforeRemoveChild(children));
        }
        Ok(())
    }

    /// Detach a leaf. The record stays, tier REMOVED, until disconnected.
    pub fn remove_safe(&mut self, caller: Address, safe_id: SafeId) -> Result<(), ModuleError> {
        let target = self
            .registry()
            .node(safe_id)
            .cloned()
            .ok_or(ModuleError::SafeIdNotRegistered(safe_id))?;
        if !target.is_live() {
            return Err(ModuleError::SafeAlreadyRemoved(safe_id));
        }
        let caller_node = self.caller_node(caller)?;
        if target.tier == Tier::Root {
            return Err(ModuleError::InvalidRootSafe(target.wallet));
        }
        if !has_authority(self.registry(), caller_node.id, safe_id) {
            return Err(ModuleError::NotAuthorizedAsNotRootOrSuperSafe);
        }
        self.ensure_leaf(safe_id)?;

        self.commit(vec![ModuleEvent::SafeRemoved {
            org: target.org,
            safe_id,
            remover: caller,
            super_safe: target.super_safe,
            name: target.name,
        }])?;
        debug!(org = %target.org, safe_id, "safe removed");
        Ok(())
    }

    /// Delete the record of a leaf (live or pending removal) and unhook
    /// the module and guard from its wallet.
    pub fn disconnect_safe(
        &mut self,
        host: &mut dyn WalletHost,
        caller: Address,
        safe_id: SafeId,
    ) -> Result<(), ModuleError> {
        let target = self
            .registry()
            .node(safe_id)
            .cloned()
            .ok_or(ModuleError::SafeIdNotRegistered(safe_id))?;
        if target.tier == Tier::Root {
            return Err(ModuleError::InvalidRootSafe(target.wallet));
        }
        let caller_node = self
            .caller_node(caller)
            .map_err(|_| ModuleError::NotAuthorizedDisconnectChildrenSafe)?;
        let authorized = if target.is_live() {
            has_authority(self.registry(), caller_node.id, safe_id)
        } else {
            caller_node.tier == Tier::Root && caller_node.org == target.org
        };
        if !authorized {
            return Err(ModuleError::NotAuthorizedDisconnectChildrenSafe);
        }

        let mut events = Vec::with_capacity(2);
        if target.is_live() {
            self.ensure_leaf(safe_id)?;
            events.push(ModuleEvent::SafeRemoved {
                org: target.org,
                safe_id,
                remover: caller,
                super_safe: target.super_safe,
                name: target.name.clone(),
            });
        }
        events.push(ModuleEvent::SafeDisconnected {
            org: target.org,
            safe_id,
            wallet: target.wallet,
            disconnector: caller,
        });
        let staged = self.stage(&events)?;

        if !unhook_wallet(host, self.config().module_address, target.wallet) {
            warn!(org = %target.org, safe_id, wallet = %target.wallet, "wallet refused to unhook module");
            return Err(ModuleError::TxExecutionModuleFailed);
        }

        self.install(staged, events);
        debug!(org = %target.org, safe_id, "safe disconnected");
        Ok(())
    }

    /// Delete every node under the caller's root. The organization goes
    /// with it once no member is left.
    pub fn remove_whole_tree(&mut self, caller: Address) -> Result<(), ModuleError> {
        let root = self.caller_root(caller)?;
        self.commit(vec![ModuleEvent::WholeTreeRemoved {
            org: root.org,
            root_safe_id: root.id,
            remover: caller,
            name: root.name.clone(),
        }])?;
        debug!(org = %root.org, root_safe_id = root.id, "whole tree removed");
        Ok(())
    }

    /// Make a direct child of the caller's root a root of the same
    /// organization. Only that ROOT may do it.
    pub fn promote_root(&mut self, caller: Address, safe_id: SafeId) -> Result<(), ModuleError> {
        let target = self.registry().live_node(safe_id)?.clone();
        if target.tier != Tier::Safe {
            return Err(ModuleError::InvalidSafeId(safe_id));
        }
        let caller_node = self
            .caller_node(caller)
            .map_err(|_| ModuleError::NotAuthorizedAsNotRootOrSuperSafe)?;
        if caller_node.tier != Tier::Root
            || caller_node.id != target.super_safe
            || !is_root_safe_of(self.registry(), caller, safe_id)
        {
            return Err(ModuleError::NotAuthorizedAsNotRootOrSuperSafe);
        }

        self.commit(vec![ModuleEvent::RootSafePromoted {
            org: target.org,
            safe_id,
            updater: caller,
            wallet: target.wallet,
            name: target.name.clone(),
        }])?;
        debug!(org = %target.org, safe_id, "safe promoted to root");
        Ok(())
    }

    /// Re-parent `safe_id` under `new_super_id`. Its subtree follows.
    pub fn update_super(
        &mut self,
        caller: Address,
        safe_id: SafeId,
        new_super_id: SafeId,
    ) -> Result<(), ModuleError> {
        let node = self.registry().live_node(safe_id)?.clone();
        let new_super = self.registry().live_node(new_super_id)?.clone();
        if new_super.org != node.org {
            return Err(ModuleError::NotAuthorizedUpdateSafeToOtherOrg);
        }
        let caller_node = self
            .caller_node(caller)
            .map_err(|_| ModuleError::NotAuthorizedUpdateNonChildrenSafe)?;

        let reg = self.registry();
        let over_node = node.tier != Tier::Root && has_authority(reg, caller_node.id, safe_id);
        let over_super =
            caller_node.id == new_super_id || has_authority(reg, caller_node.id, new_super_id);
        if !over_node || !over_super {
            return Err(ModuleError::NotAuthorizedUpdateNonChildrenSafe);
        }
        if new_super_id == safe_id || is_ancestor(reg, safe_id, new_super_id) {
            return Err(ModuleError::NotAuthorizedUpdateNonSuperSafe);
        }
        if node.super_safe == new_super_id {
            return Ok(());
        }
        let limit = reg.org(&node.org)?.depth_tree_limit;
        if depth(reg, new_super_id) + 1 + subtree_height(reg, safe_id) > limit {
            return Err(ModuleError::TreeDepthLimitReached(limit));
        }

        self.commit(vec![ModuleEvent::SafeSuperUpdated {
            org: node.org,
            safe_id,
            updater: caller,
            old_super: node.super_safe,
            new_super: new_super_id,
        }])?;
        debug!(org = %node.org, safe_id, old_super = node.super_safe, new_super = new_super_id, "super safe updated");
        Ok(())
    }

    pub fn update_depth_tree_limit(
        &mut self,
        caller: Address,
        new_limit: u32,
    ) -> Result<(), ModuleError> {
        let root = self.caller_root(caller)?;
        let old_limit = self.registry().org(&root.org)?.depth_tree_limit;
        let realized = max_realized_depth(self.registry(), &root.org);
        if new_limit == 0
            || new_limit == old_limit
            || new_limit > self.config().max_depth_tree_limit
            || new_limit < realized
        {
            return Err(ModuleError::InvalidLimit);
        }

        self.commit(vec![ModuleEvent::NewLimitLevel {
            org: root.org,
            root_safe_id: root.id,
            updater: caller,
            new_limit,
            old_limit,
        }])?;
        debug!(org = %root.org, old_limit, new_limit, "depth tree limit updated");
        Ok(())
    }
}

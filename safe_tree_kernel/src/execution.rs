//! SafeTree v1 - Execution on Behalf
//!
//! A safe higher in the tree drives a call through a lower safe's
//! wallet. Order of work:
//!
//!   1. resolve organization, signing safe and target
//!   2. allow/deny gate on the call target
//!   3. authenticate: exec-capable lead of the target as sender, or
//!      the signing safe's owners over the hash at the current nonce
//!   4. commit the nonce (`on_behalf_authorized`)
//!   5. ask the target wallet to run the call
//!   6. commit the outcome (`tx_on_behalf_executed`)
//!
//! A failed inner call still consumes the nonce. Any re-entrant
//! execution while one is in flight is rejected.

use tracing::{debug, warn};

use crate::authority::{has_authority, has_not_permission_over_target, lead_can_exec, lead_can_modify_owners};
use crate::domain::OnBehalfTransaction;
use crate::engine::{ExecPhase, SafeTreeModule};
use crate::error::ModuleError;
use crate::events::ModuleEvent;
use crate::hashing::sha256;
use crate::lists;
use crate::primitives::{validate_account, Address, OrgHash, SafeId};
use crate::wallet::{process_and_sort_signatures, ModuleCall, OwnerSignature, SafeAdminCall, WalletHost};

impl SafeTreeModule {
    pub fn exec_transaction_on_behalf(
        &mut self,
        host: &mut dyn WalletHost,
        caller: Address,
        tx: &OnBehalfTransaction,
        signatures: &[OwnerSignature],
    ) -> Result<(), ModuleError> {
        if self.phase != ExecPhase::Idle {
            warn!(org = %tx.org, %caller, "re-entrant execution rejected");
            return Err(ModuleError::ReentrantCall);
        }

        self.phase = ExecPhase::Verifying;
        let nonce = match self.authorize_on_behalf(&*host, caller, tx, signatures) {
            Ok(nonce) => nonce,
            Err(err) => {
                self.phase = ExecPhase::Idle;
                return Err(err);
            }
        };
        if let Err(err) = self.commit(vec![ModuleEvent::OnBehalfAuthorized {
            org: tx.org,
            executor: caller,
            super_safe: tx.super_safe,
            target_safe: tx.target_safe,
            nonce,
        }]) {
            self.phase = ExecPhase::Idle;
            return Err(err);
        }

        self.phase = ExecPhase::Committed;
        let call = ModuleCall {
            to: tx.to,
            value: tx.value,
            data: tx.data.clone(),
            operation: tx.operation,
        };
        let result = host.exec_transaction_from_module(self, tx.target_safe, &call);
        self.phase = ExecPhase::Idle;

        self.commit(vec![ModuleEvent::TxOnBehalfExecuted {
            org: tx.org,
            executor: caller,
            super_safe: tx.super_safe,
            target_safe: tx.target_safe,
            result,
        }])?;
        if !result {
            warn!(org = %tx.org, target = %tx.target_safe, nonce, "inner call failed");
            return Err(ModuleError::TxExecutionModuleFailed);
        }
        debug!(org = %tx.org, target = %tx.target_safe, to = %tx.to, nonce, "executed on behalf");
        Ok(())
    }

    /// Steps 1-3. Returns the nonce the execution consumes.
    fn authorize_on_behalf(
        &self,
        host: &dyn WalletHost,
        caller: Address,
        tx: &OnBehalfTransaction,
        signatures: &[OwnerSignature],
    ) -> Result<u64, ModuleError> {
        let reg = self.registry();
        let org = reg.org(&tx.org)?;
        reg.node_in_org(&tx.org, tx.super_safe)
            .filter(|n| n.is_live())
            .ok_or(ModuleError::SafeNotRegistered(tx.super_safe))?;
        let target = reg
            .node_in_org(&tx.org, tx.target_safe)
            .filter(|n| n.is_live())
            .ok_or(ModuleError::SafeNotRegistered(tx.target_safe))?;
        lists::check_target(org, tx.to)?;

        if lead_can_exec(reg, caller, target.id) {
            return Ok(org.nonce);
        }
        if has_not_permission_over_target(reg, tx.super_safe, &tx.org, tx.target_safe) {
            warn!(org = %tx.org, super_safe = %tx.super_safe, target = %tx.target_safe, "no authority over target");
            return Err(ModuleError::NotAuthorizedExecOnBehalf);
        }

        let data = self.encode_transaction_data(tx, org.nonce);
        let hash = sha256(&data);
        let sorted = process_and_sort_signatures(host, tx.super_safe, signatures);
        if let Err(reason) = host.check_signatures(tx.super_safe, &hash, &data, &sorted) {
            warn!(org = %tx.org, super_safe = %tx.super_safe, %reason, "signature check failed");
            return Err(ModuleError::TxOnBehalfExecutedFailed);
        }
        Ok(org.nonce)
    }

    /// Root of, ancestor of, or owner-managing lead of the target.
    fn may_modify_owners(
        &self,
        caller: Address,
        org: &OrgHash,
        target_safe: Address,
    ) -> Result<(SafeId, bool), ModuleError> {
        let reg = self.registry();
        reg.org(org)?;
        let target = reg
            .node_in_org(org, target_safe)
            .filter(|n| n.is_live())
            .ok_or(ModuleError::SafeNotRegistered(target_safe))?;
        let by_tree = reg
            .node_in_org(org, caller)
            .filter(|n| n.is_live())
            .is_some_and(|c| has_authority(reg, c.id, target.id));
        Ok((target.id, by_tree || lead_can_modify_owners(reg, caller, target.id)))
    }

    pub fn add_owner_with_threshold(
        &mut self,
        host: &mut dyn WalletHost,
        caller: Address,
        org: &OrgHash,
        target_safe: Address,
        owner: Address,
        threshold: usize,
    ) -> Result<(), ModuleError> {
        validate_account(owner)?;
        let (target_id, allowed) = self.may_modify_owners(caller, org, target_safe)?;
        if !allowed {
            return Err(ModuleError::NotAuthorizedAddOwnerWithThreshold);
        }
        if host.is_owner(target_safe, owner) {
            return Err(ModuleError::OwnerAlreadyExists);
        }
        let module = self.config().module_address;
        if !host.exec_admin_from_module(
            module,
            target_safe,
            &SafeAdminCall::AddOwnerWithThreshold { owner, threshold },
        ) {
            warn!(%org, safe_id = target_id, %owner, threshold, "wallet refused new owner");
            return Err(ModuleError::TxExecutionModuleFailed);
        }
        debug!(%org, safe_id = target_id, %owner, threshold, "owner added");
        Ok(())
    }

    pub fn remove_owner(
        &mut self,
        host: &mut dyn WalletHost,
        caller: Address,
        org: &OrgHash,
        target_safe: Address,
        owner: Address,
        threshold: usize,
    ) -> Result<(), ModuleError> {
        validate_account(owner)?;
        let (target_id, allowed) = self.may_modify_owners(caller, org, target_safe)?;
        if !allowed {
            return Err(ModuleError::NotAuthorizedRemoveOwner);
        }
        if !host.is_owner(target_safe, owner) {
            return Err(ModuleError::OwnerNotFound);
        }
        let module = self.config().module_address;
        if !host.exec_admin_from_module(
            module,
            target_safe,
            &SafeAdminCall::RemoveOwner { owner, threshold },
        ) {
            warn!(%org, safe_id = target_id, %owner, threshold, "wallet refused owner removal");
            return Err(ModuleError::TxExecutionModuleFailed);
        }
        debug!(%org, safe_id = target_id, %owner, threshold, "owner removed");
        Ok(())
    }
}

//! SafeTree v1 - Roles and Target Policy
//!
//! Lead-role grants and the per-organization allow/deny list.

use tracing::debug;

use crate::authority::{has_authority, has_role};
use crate::domain::{DenyHelperMode, Role};
use crate::engine::SafeTreeModule;
use crate::error::ModuleError;
use crate::events::ModuleEvent;
use crate::lists;
use crate::primitives::{validate_account, Address, SafeId};

impl SafeTreeModule {
    /// Grant or revoke a lead role on `safe_id`. Repeating the current
    /// state is a no-op and emits nothing.
    pub fn set_role(
        &mut self,
        caller: Address,
        role: Role,
        user: Address,
        safe_id: SafeId,
        enabled: bool,
    ) -> Result<(), ModuleError> {
        if !role.is_lead() {
            return Err(ModuleError::SetRoleForbidden(role));
        }
        validate_account(user)?;
        let target = self.registry().live_node(safe_id)?.clone();
        let caller_node = self.caller_node(caller)?;
        if caller_node.org != target.org {
            return Err(ModuleError::NotAuthorizedSetRoleAnotherTree);
        }
        if !has_authority(self.registry(), caller_node.id, safe_id) {
            return Err(ModuleError::NotAuthorizedAsNotRootOrSuperSafe);
        }
        if has_role(self.registry(), role, user, safe_id) == enabled {
            return Ok(());
        }

        self.commit(vec![ModuleEvent::RoleChanged {
            org: target.org,
            safe_id,
            role,
            user,
            enabled,
            caller,
        }])?;
        debug!(org = %target.org, safe_id, ?role, %user, enabled, "role changed");
        Ok(())
    }

    fn set_deny_helper(&mut self, caller: Address, mode: DenyHelperMode) -> Result<(), ModuleError> {
        let root = self.caller_root(caller)?;
        if self.registry().org(&root.org)?.deny_helper == mode {
            return Ok(());
        }
        self.commit(vec![ModuleEvent::DenyHelperModeChanged {
            org: root.org,
            mode,
            caller,
        }])?;
        debug!(org = %root.org, ?mode, "deny helper mode changed");
        Ok(())
    }

    pub fn enable_allowlist(&mut self, caller: Address) -> Result<(), ModuleError> {
        self.set_deny_helper(caller, DenyHelperMode::Allowlist)
    }

    pub fn enable_denylist(&mut self, caller: Address) -> Result<(), ModuleError> {
        self.set_deny_helper(caller, DenyHelperMode::Denylist)
    }

    pub fn disable_deny_helper(&mut self, caller: Address) -> Result<(), ModuleError> {
        self.set_deny_helper(caller, DenyHelperMode::Disabled)
    }

    pub fn add_to_list(&mut self, caller: Address, users: &[Address]) -> Result<(), ModuleError> {
        let root = self.caller_root(caller)?;
        lists::check_add(self.registry().org(&root.org)?, users)?;
        self.commit(vec![ModuleEvent::AddedToList {
            org: root.org,
            users: users.to_vec(),
        }])?;
        debug!(org = %root.org, added = users.len(), "accounts listed");
        Ok(())
    }

    pub fn drop_from_list(&mut self, caller: Address, user: Address) -> Result<(), ModuleError> {
        let root = self.caller_root(caller)?;
        lists::check_drop(self.registry().org(&root.org)?, user)?;
        self.commit(vec![ModuleEvent::DroppedFromList {
            org: root.org,
            user,
        }])?;
        debug!(org = %root.org, %user, "account unlisted");
        Ok(())
    }
}

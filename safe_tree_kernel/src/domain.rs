//! SafeTree v1 - Core Domain Types
//!
//! Pure data. No authorization and no transition logic.
//! The safe tree is an arena keyed by `SafeId`; parents are ids.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::primitives::{Address, OrgHash, SafeId};

// ── Enumerations ───────────────────────────────────────────────────

/// Position of a node in its organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    Safe,
    Root,
    /// Detached by `remove_safe`, waiting for `disconnect_safe`.
    Removed,
}

/// Permission flags. Only the three lead roles are ever stored;
/// `SuperSafe` and `RootSafe` are read off the tree shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SafeLead,
    SafeLeadExecOnBehalfOnly,
    SafeLeadModifyOwnersOnly,
    SuperSafe,
    RootSafe,
}

impl Role {
    pub const LEAD_ROLES: [Role; 3] = [
        Role::SafeLead,
        Role::SafeLeadExecOnBehalfOnly,
        Role::SafeLeadModifyOwnersOnly,
    ];

    pub fn is_lead(self) -> bool {
        Role::LEAD_ROLES.contains(&self)
    }

    pub fn can_exec_on_behalf(self) -> bool {
        matches!(self, Role::SafeLead | Role::SafeLeadExecOnBehalfOnly)
    }

    pub fn can_modify_owners(self) -> bool {
        matches!(self, Role::SafeLead | Role::SafeLeadModifyOwnersOnly)
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Role::SafeLead => 0,
            Role::SafeLeadExecOnBehalfOnly => 1,
            Role::SafeLeadModifyOwnersOnly => 2,
            Role::SuperSafe => 3,
            Role::RootSafe => 4,
        }
    }

    pub fn from_u8(v: u8) -> Option<Role> {
        match v {
            0 => Some(Role::SafeLead),
            1 => Some(Role::SafeLeadExecOnBehalfOnly),
            2 => Some(Role::SafeLeadModifyOwnersOnly),
            3 => Some(Role::SuperSafe),
            4 => Some(Role::RootSafe),
            _ => None,
        }
    }
}

/// Call kind forwarded to the target wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Call,
    DelegateCall,
}

impl Operation {
    pub fn as_u8(self) -> u8 {
        match self {
            Operation::Call => 0,
            Operation::DelegateCall => 1,
        }
    }

    pub fn from_u8(v: u8) -> Option<Operation> {
        match v {
            0 => Some(Operation::Call),
            1 => Some(Operation::DelegateCall),
            _ => None,
        }
    }
}

/// Target-address policy of an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyHelperMode {
    #[default]
    Disabled,
    Allowlist,
    Denylist,
}

// ── Configuration ──────────────────────────────────────────────────

/// Module-wide settings, injected by the first journal event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleConfig {
    pub chain_id: u64,
    /// Address of this module instance; bound into the domain separator.
    pub module_address: Address,
    /// Guard every registered wallet must keep installed.
    pub guard_address: Address,
    pub default_depth_tree_limit: u32,
    pub max_depth_tree_limit: u32,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            module_address: Address::from_low_u64(0x5afe_0001),
            guard_address: Address::from_low_u64(0x5afe_0002),
            default_depth_tree_limit: 8,
            max_depth_tree_limit: 50,
        }
    }
}

// ── Registry records ───────────────────────────────────────────────

/// One member of an organization tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SafeNode {
    pub id: SafeId,
    pub org: OrgHash,
    pub tier: Tier,
    pub name: String,
    pub lead: Option<Address>,
    pub wallet: Address,
    /// Parent id, `NO_SAFE` for ROOT and REMOVED nodes.
    pub super_safe: SafeId,
}

impl SafeNode {
    pub fn is_live(&self) -> bool {
        self.tier != Tier::Removed
    }
}

/// Sentinel-headed singly linked account list.
///
/// `next[SENTINEL]` is the head; the last member points back to
/// `SENTINEL`. An empty list has no entries at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountList {
    pub next: BTreeMap<Address, Address>,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Organization {
    pub org_hash: OrgHash,
    pub name: String,
    /// First root registered for the organization.
    pub root_safe_id: SafeId,
    pub depth_tree_limit: u32,
    pub nonce: u64,
    pub deny_helper: DenyHelperMode,
    pub listed: AccountList,
}

/// Explicit lead-role grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleGrant {
    pub role: Role,
    pub account: Address,
    pub safe_id: SafeId,
}

/// Complete module state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Registry {
    pub config: ModuleConfig,
    pub orgs: BTreeMap<OrgHash, Organization>,
    pub safes: BTreeMap<SafeId, SafeNode>,
    pub role_grants: BTreeSet<RoleGrant>,
    /// Highest id ever assigned.
    pub index_id: SafeId,
    /// Wallet of every record in `safes`, pending removals included.
    pub wallet_index: BTreeMap<Address, SafeId>,
}

/// Everything a signer commits to, minus the nonce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OnBehalfTransaction {
    pub org: OrgHash,
    /// Wallet whose owners sign: root or ancestor of the target.
    pub super_safe: Address,
    pub target_safe: Address,
    pub to: Address,
    pub value: u128,
    pub data: Vec<u8>,
    pub operation: Operation,
}

/// Read view returned by `get_safe_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SafeInfo {
    pub tier: Tier,
    pub name: String,
    pub lead: Option<Address>,
    pub wallet: Address,
    pub children: Vec<SafeId>,
    pub super_safe: SafeId,
}

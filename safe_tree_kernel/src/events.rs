//! SafeTree v1 - Event Definitions
//!
//! Events are pure data: one variant per state transition. They carry
//! payload only; `transitions::apply_event` holds all mutation logic.
//!
//! Schema version is locked at 1. Envelopes with any other version are
//! rejected on replay.

use serde::{Deserialize, Serialize};

use crate::domain::{DenyHelperMode, ModuleConfig, Role};
use crate::primitives::{Address, OrgHash, SafeId};

/// Schema version for v1 events.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum ModuleEvent {
    /// Always the first journal entry.
    ModuleInitialized { config: ModuleConfig },
    OrganisationCreated {
        org: OrgHash,
        name: String,
        creator: Address,
        root_safe_id: SafeId,
        depth_tree_limit: u32,
    },
    RootSafeCreated {
        org: OrgHash,
        safe_id: SafeId,
        creator: Address,
        wallet: Address,
        name: String,
    },
    SafeCreated {
        org: OrgHash,
        safe_id: SafeId,
        creator: Address,
        super_safe: SafeId,
        name: String,
    },
    SafeRemoved {
        org: OrgHash,
        safe_id: SafeId,
        remover: Address,
        super_safe: SafeId,
        name: String,
    },
    SafeDisconnected {
        org: OrgHash,
        safe_id: SafeId,
        wallet: Address,
        disconnector: Address,
    },
    WholeTreeRemoved {
        org: OrgHash,
        root_safe_id: SafeId,
        remover: Address,
        name: String,
    },
    RootSafePromoted {
        org: OrgHash,
        safe_id: SafeId,
        updater: Address,
        wallet: Address,
        name: String,
    },
    SafeSuperUpdated {
        org: OrgHash,
        safe_id: SafeId,
        updater: Address,
        old_super: SafeId,
        new_super: SafeId,
    },
    RoleChanged {
        org: OrgHash,
        safe_id: SafeId,
        role: Role,
        user: Address,
        enabled: bool,
        caller: Address,
    },
    NewLimitLevel {
        org: OrgHash,
        root_safe_id: SafeId,
        updater: Address,
        new_limit: u32,
        old_limit: u32,
    },
    DenyHelperModeChanged {
        org: OrgHash,
        mode: DenyHelperMode,
        caller: Address,
    },
    AddedToList { org: OrgHash, users: Vec<Address> },
    DroppedFromList { org: OrgHash, user: Address },
    /// Signature check passed; the nonce is consumed.
    OnBehalfAuthorized {
        org: OrgHash,
        executor: Address,
        super_safe: Address,
        target_safe: Address,
        nonce: u64,
    },
    TxOnBehalfExecuted {
        org: OrgHash,
        executor: Address,
        super_safe: Address,
        target_safe: Address,
        result: bool,
    },
}

impl ModuleEvent {
    /// Wire name, identical to the serde tag.
    pub fn event_type(&self) -> &'static str {
        match self {
            ModuleEvent::ModuleInitialized { .. } => "module_initialized",
            ModuleEvent::OrganisationCreated { .. } => "organisation_created",
            ModuleEvent::RootSafeCreated { .. } => "root_safe_created",
            ModuleEvent::SafeCreated { .. } => "safe_created",
            ModuleEvent::SafeRemoved { .. } => "safe_removed",
            ModuleEvent::SafeDisconnected { .. } => "safe_disconnected",
            ModuleEvent::WholeTreeRemoved { .. } => "whole_tree_removed",
            ModuleEvent::RootSafePromoted { .. } => "root_safe_promoted",
            ModuleEvent::SafeSuperUpdated { .. } => "safe_super_updated",
            ModuleEvent::RoleChanged { .. } => "role_changed",
            ModuleEvent::NewLimitLevel { .. } => "new_limit_level",
            ModuleEvent::DenyHelperModeChanged { .. } => "deny_helper_mode_changed",
            ModuleEvent::AddedToList { .. } => "added_to_list",
            ModuleEvent::DroppedFromList { .. } => "dropped_from_list",
            ModuleEvent::OnBehalfAuthorized { .. } => "on_behalf_authorized",
            ModuleEvent::TxOnBehalfExecuted { .. } => "tx_on_behalf_executed",
        }
    }
}

/// Journal entry: one committed event with its position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub sequence: u64,
    pub schema_version: u32,
    pub event: ModuleEvent,
}

impl EventEnvelope {
    pub fn new(sequence: u64, event: ModuleEvent) -> Self {
        Self {
            sequence,
            schema_version: SCHEMA_VERSION,
            event,
        }
    }

    pub fn event_type(&self) -> &'static str {
        self.event.event_type()
    }
}

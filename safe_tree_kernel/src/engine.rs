//! SafeTree v1 - Engine
//!
//! `SafeTreeModule` owns the registry and the journal of committed
//! events. Operations (see `tree`, `policy`, `execution`) validate a
//! request, describe it as events and hand them to `commit`, which is
//! the single path to a new registry:
//!
//!   1. apply each event through `transitions::apply_event`
//!   2. validate invariants on the result
//!   3. swap the registry and append envelopes to the journal
//!
//! Replay enforces schema version, strict sequence and the
//! initialization-first rule.

use tracing::debug;

use crate::authority;
use crate::domain::{ModuleConfig, OnBehalfTransaction, Registry, Role, SafeInfo};
use crate::error::ModuleError;
use crate::events::{EventEnvelope, ModuleEvent, SCHEMA_VERSION};
use crate::graph::{children_of, root_of};
use crate::hashing::{self, domain_separator};
use crate::invariants::try_validate_invariants;
use crate::lists;
use crate::primitives::{Address, Hash32, OrgHash, SafeId};
use crate::state::create_initial_registry;
use crate::transitions::apply_event;

/// Progress of the on-behalf execution currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecPhase {
    #[default]
    Idle,
    /// Signatures are being checked; nothing is committed yet.
    Verifying,
    /// Nonce consumed, inner call in progress.
    Committed,
}

#[derive(Debug, Clone)]
pub struct SafeTreeModule {
    registry: Registry,
    last_sequence: u64,
    journal: Vec<EventEnvelope>,
    pub(crate) phase: ExecPhase,
}

impl SafeTreeModule {
    /// Fresh module. The journal starts with `module_initialized`.
    pub fn new(config: ModuleConfig) -> Result<Self, ModuleError> {
        if config.default_depth_tree_limit == 0
            || config.default_depth_tree_limit > config.max_depth_tree_limit
        {
            return Err(ModuleError::InvalidLimit);
        }
        let mut module = Self {
            registry: create_initial_registry(config.clone()),
            last_sequence: 0,
            journal: Vec::new(),
            phase: ExecPhase::Idle,
        };
        module.commit(vec![ModuleEvent::ModuleInitialized { config }])?;
        Ok(module)
    }

    /// Rebuild from a journal. Nothing is left pending afterwards.
    pub fn from_events(events: &[EventEnvelope]) -> Result<Self, ModuleError> {
        let first = events.first().ok_or(ModuleError::MissingInitialization)?;
        let ModuleEvent::ModuleInitialized { config } = &first.event else {
            return Err(ModuleError::MissingInitialization);
        };
        let mut module = Self {
            registry: create_initial_registry(config.clone()),
            last_sequence: 0,
            journal: Vec::new(),
            phase: ExecPhase::Idle,
        };
        for envelope in events {
            module.replay_envelope(envelope)?;
        }
        Ok(module)
    }

    /// Rebuild from a restored registry positioned at `last_sequence`.
    pub fn from_registry(registry: Registry, last_sequence: u64) -> Result<Self, ModuleError> {
        try_validate_invariants(&registry).map_err(ModuleError::InvariantViolation)?;
        Ok(Self {
            registry,
            last_sequence,
            journal: Vec::new(),
            phase: ExecPhase::Idle,
        })
    }

    /// Apply one persisted envelope.
    pub fn replay_envelope(&mut self, envelope: &EventEnvelope) -> Result<(), ModuleError> {
        if envelope.schema_version != SCHEMA_VERSION {
            return Err(ModuleError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION,
                got: envelope.schema_version,
            });
        }
        let expected = self.last_sequence + 1;
        if envelope.sequence != expected {
            return Err(ModuleError::SequenceViolation {
                expected,
                got: envelope.sequence,
            });
        }
        let is_init = matches!(envelope.event, ModuleEvent::ModuleInitialized { .. });
        if (expected == 1) != is_init {
            return Err(ModuleError::MissingInitialization);
        }
        let next = apply_event(&self.registry, &envelope.event)?;
        try_validate_invariants(&next).map_err(ModuleError::InvariantViolation)?;
        self.registry = next;
        self.last_sequence = envelope.sequence;
        Ok(())
    }

    /// Apply `events` all-or-nothing.
    pub(crate) fn commit(&mut self, events: Vec<ModuleEvent>) -> Result<(), ModuleError> {
        let next = self.stage(&events)?;
        self.install(next, events);
        Ok(())
    }

    /// Registry that `events` would produce, validated but not installed.
    pub(crate) fn stage(&self, events: &[ModuleEvent]) -> Result<Registry, ModuleError> {
        let mut next = self.registry.clone();
        for (i, event) in events.iter().enumerate() {
            let is_init = matches!(event, ModuleEvent::ModuleInitialized { .. });
            if is_init != (self.last_sequence == 0 && i == 0) {
                return Err(ModuleError::MissingInitialization);
            }
            next = apply_event(&next, event)?;
        }
        try_validate_invariants(&next).map_err(ModuleError::InvariantViolation)?;
        Ok(next)
    }

    /// Install a staged registry and journal the events that built it.
    pub(crate) fn install(&mut self, next: Registry, events: Vec<ModuleEvent>) {
        self.registry = next;
        for event in events {
            self.last_sequence += 1;
            debug!(
                sequence = self.last_sequence,
                event_type = event.event_type(),
                "event committed"
            );
            self.journal
                .push(EventEnvelope::new(self.last_sequence, event));
        }
    }

    /// Hand over committed events not yet persisted.
    pub fn drain_events(&mut self) -> Vec<EventEnvelope> {
        std::mem::take(&mut self.journal)
    }

    pub fn pending_events(&self) -> &[EventEnvelope] {
        &self.journal
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.registry.config
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    pub fn phase(&self) -> ExecPhase {
        self.phase
    }

    pub fn canonical_hash(&self) -> String {
        hashing::canonical_hash(&self.registry)
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

impl SafeTreeModule {
    pub fn chain_id(&self) -> u64 {
        self.registry.config.chain_id
    }

    pub fn domain_separator(&self) -> Hash32 {
        domain_separator(self.registry.config.chain_id, self.registry.config.module_address)
    }

    pub fn encode_transaction_data(&self, tx: &OnBehalfTransaction, nonce: u64) -> Vec<u8> {
        hashing::encode_transaction_data(&self.domain_separator(), tx, nonce)
    }

    pub fn get_transaction_hash(&self, tx: &OnBehalfTransaction, nonce: u64) -> Hash32 {
        hashing::get_transaction_hash(&self.domain_separator(), tx, nonce)
    }

    pub fn nonce(&self, org: &OrgHash) -> Result<u64, ModuleError> {
        Ok(self.registry.org(org)?.nonce)
    }

    pub fn depth_tree_limit(&self, org: &OrgHash) -> Result<u32, ModuleError> {
        Ok(self.registry.org(org)?.depth_tree_limit)
    }

    pub fn is_org_registered(&self, org: &OrgHash) -> bool {
        self.registry.orgs.contains_key(org)
    }

    /// Wallet holds a record, live or pending removal.
    pub fn is_safe_registered(&self, wallet: Address) -> bool {
        self.registry.node_by_wallet(wallet).is_some()
    }

    pub fn get_safe_info(&self, id: SafeId) -> Result<SafeInfo, ModuleError> {
        let node = self
            .registry
            .node(id)
            .ok_or(ModuleError::SafeIdNotRegistered(id))?;
        Ok(SafeInfo {
            tier: node.tier,
            name: node.name.clone(),
            lead: node.lead,
            wallet: node.wallet,
            children: children_of(&self.registry, id),
            super_safe: node.super_safe,
        })
    }

    pub fn get_org_hash_by_safe(&self, wallet: Address) -> Result<OrgHash, ModuleError> {
        self.registry
            .node_by_wallet(wallet)
            .map(|n| n.org)
            .ok_or(ModuleError::SafeNotRegistered(wallet))
    }

    pub fn get_org_by_safe(&self, id: SafeId) -> Result<OrgHash, ModuleError> {
        self.registry
            .node(id)
            .map(|n| n.org)
            .ok_or(ModuleError::SafeIdNotRegistered(id))
    }

    pub fn get_safe_id_by_safe(&self, org: &OrgHash, wallet: Address) -> Result<SafeId, ModuleError> {
        self.registry.org(org)?;
        self.registry
            .node_in_org(org, wallet)
            .map(|n| n.id)
            .ok_or(ModuleError::SafeNotRegistered(wallet))
    }

    pub fn get_safe_address(&self, id: SafeId) -> Result<Address, ModuleError> {
        self.registry
            .node(id)
            .map(|n| n.wallet)
            .ok_or(ModuleError::SafeIdNotRegistered(id))
    }

    pub fn get_root_safe(&self, id: SafeId) -> Result<SafeId, ModuleError> {
        self.registry.live_node(id)?;
        Ok(root_of(&self.registry, id))
    }

    /// `wallet` was removed from a tree rooted at `root_id` and awaits
    /// disconnection.
    pub fn is_pending_remove(&self, root_id: SafeId, wallet: Address) -> bool {
        let (Some(root), Some(node)) = (
            self.registry.node(root_id),
            self.registry.node_by_wallet(wallet),
        ) else {
            return false;
        };
        !node.is_live() && root.is_live() && root.org == node.org
    }

    pub fn is_tree_member(&self, a: SafeId, b: SafeId) -> bool {
        authority::is_tree_member(&self.registry, a, b)
    }

    pub fn is_super_safe(&self, a: SafeId, b: SafeId) -> bool {
        authority::is_super_safe(&self.registry, a, b)
    }

    pub fn is_root_safe_of(&self, wallet: Address, id: SafeId) -> bool {
        authority::is_root_safe_of(&self.registry, wallet, id)
    }

    pub fn is_limit_level(&self, id: SafeId) -> bool {
        authority::is_limit_level(&self.registry, id)
    }

    pub fn is_safe_lead(&self, id: SafeId, account: Address) -> bool {
        authority::is_safe_lead(&self.registry, id, account)
    }

    pub fn has_role(&self, role: Role, account: Address, id: SafeId) -> bool {
        authority::has_role(&self.registry, role, account, id)
    }

    pub fn has_not_permission_over_target(
        &self,
        caller: Address,
        org: &OrgHash,
        target: Address,
    ) -> bool {
        authority::has_not_permission_over_target(&self.registry, caller, org, target)
    }

    pub fn is_listed(&self, org: &OrgHash, account: Address) -> Result<bool, ModuleError> {
        Ok(lists::is_listed(&self.registry.org(org)?.listed, account))
    }

    pub fn list_count(&self, org: &OrgHash) -> Result<u64, ModuleError> {
        Ok(self.registry.org(org)?.listed.count)
    }

    pub fn get_prev_user(&self, org: &OrgHash, account: Address) -> Result<Address, ModuleError> {
        Ok(lists::prev_user(&self.registry.org(org)?.listed, account))
    }
}

//! Proto ↔ Kernel conversion bridge.
//!
//! Converts between the protobuf wire types (proto_types.rs) and the
//! kernel's `EventEnvelope`. Encoding never fails; decoding rejects
//! frames whose byte fields or enum codes do not fit the kernel types.

use safe_tree_kernel::events::{EventEnvelope, ModuleEvent};
use safe_tree_kernel::{Address, DenyHelperMode, Hash32, ModuleConfig, Role};
use thiserror::Error;

use crate::proto_types as pb;
use crate::proto_types::{EventKind, ProtoEvent, ProtoEventEnvelope};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("frame {sequence} carries no event")]
    MissingEvent { sequence: u64 },
    #[error("frame {sequence} carries an event without a kind")]
    MissingKind { sequence: u64 },
    #[error("module_initialized without config")]
    MissingConfig,
    #[error("field {field}: expected 20 address bytes, got {len}")]
    BadAddress { field: &'static str, len: usize },
    #[error("field {field}: expected 32 hash bytes, got {len}")]
    BadHash { field: &'static str, len: usize },
    #[error("unknown role code {0}")]
    UnknownRole(u32),
    #[error("unknown deny helper mode {0}")]
    UnknownDenyMode(u32),
}

fn address(field: &'static str, bytes: &[u8]) -> Result<Address, BridgeError> {
    <[u8; 20]>::try_from(bytes)
        .map(Address::new)
        .map_err(|_| BridgeError::BadAddress {
            field,
            len: bytes.len(),
        })
}

fn org_hash(bytes: &[u8]) -> Result<Hash32, BridgeError> {
    <[u8; 32]>::try_from(bytes)
        .map(Hash32::new)
        .map_err(|_| BridgeError::BadHash {
            field: "org",
            len: bytes.len(),
        })
}

fn role(code: u32) -> Result<Role, BridgeError> {
    u8::try_from(code)
        .ok()
        .and_then(Role::from_u8)
        .ok_or(BridgeError::UnknownRole(code))
}

fn mode_code(mode: DenyHelperMode) -> u32 {
    match mode {
        DenyHelperMode::Disabled => 0,
        DenyHelperMode::Allowlist => 1,
        DenyHelperMode::Denylist => 2,
    }
}

fn mode(code: u32) -> Result<DenyHelperMode, BridgeError> {
    match code {
        0 => Ok(DenyHelperMode::Disabled),
        1 => Ok(DenyHelperMode::Allowlist),
        2 => Ok(DenyHelperMode::Denylist),
        other => Err(BridgeError::UnknownDenyMode(other)),
    }
}

fn bytes(a: &Address) -> Vec<u8> {
    a.as_bytes().to_vec()
}

fn hash_bytes(h: &Hash32) -> Vec<u8> {
    h.as_bytes().to_vec()
}

/// Convert a protobuf frame to the kernel's envelope.
pub fn proto_to_kernel(proto: &ProtoEventEnvelope) -> Result<EventEnvelope, BridgeError> {
    let sequence = proto.sequence;
    let kind = proto
        .event
        .as_ref()
        .ok_or(BridgeError::MissingEvent { sequence })?
        .kind
        .as_ref()
        .ok_or(BridgeError::MissingKind { sequence })?;

    let event = match kind {
        EventKind::ModuleInitialized(e) => {
            let c = e.config.as_ref().ok_or(BridgeError::MissingConfig)?;
            ModuleEvent::ModuleInitialized {
                config: ModuleConfig {
                    chain_id: c.chain_id,
                    module_address: address("module_address", &c.module_address)?,
                    guard_address: address("guard_address", &c.guard_address)?,
                    default_depth_tree_limit: c.default_depth_tree_limit,
                    max_depth_tree_limit: c.max_depth_tree_limit,
                },
            }
        }
        EventKind::OrganisationCreated(e) => ModuleEvent::OrganisationCreated {
            org: org_hash(&e.org)?,
            name: e.name.clone(),
            creator: address("creator", &e.creator)?,
            root_safe_id: e.root_safe_id,
            depth_tree_limit: e.depth_tree_limit,
        },
        EventKind::RootSafeCreated(e) => ModuleEvent::RootSafeCreated {
            org: org_hash(&e.org)?,
            safe_id: e.safe_id,
            creator: address("creator", &e.creator)?,
            wallet: address("wallet", &e.wallet)?,
            name: e.name.clone(),
        },
        EventKind::SafeCreated(e) => ModuleEvent::SafeCreated {
            org: org_hash(&e.org)?,
            safe_id: e.safe_id,
            creator: address("creator", &e.creator)?,
            super_safe: e.super_safe,
            name: e.name.clone(),
        },
        EventKind::SafeRemoved(e) => ModuleEvent::SafeRemoved {
            org: org_hash(&e.org)?,
            safe_id: e.safe_id,
            remover: address("remover", &e.remover)?,
            super_safe: e.super_safe,
            name: e.name.clone(),
        },
        EventKind::SafeDisconnected(e) => ModuleEvent::SafeDisconnected {
            org: org_hash(&e.org)?,
            safe_id: e.safe_id,
            wallet: address("wallet", &e.wallet)?,
            disconnector: address("disconnector", &e.disconnector)?,
        },
        EventKind::WholeTreeRemoved(e) => ModuleEvent::WholeTreeRemoved {
            org: org_hash(&e.org)?,
            root_safe_id: e.root_safe_id,
            remover: address("remover", &e.remover)?,
            name: e.name.clone(),
        },
        EventKind::RootSafePromoted(e) => ModuleEvent::RootSafePromoted {
            org: org_hash(&e.org)?,
            safe_id: e.safe_id,
            updater: address("updater", &e.updater)?,
            wallet: address("wallet", &e.wallet)?,
            name: e.name.clone(),
        },
        EventKind::SafeSuperUpdated(e) => ModuleEvent::SafeSuperUpdated {
            org: org_hash(&e.org)?,
            safe_id: e.safe_id,
            updater: address("updater", &e.updater)?,
            old_super: e.old_super,
            new_super: e.new_super,
        },
        EventKind::RoleChanged(e) => ModuleEvent::RoleChanged {
            org: org_hash(&e.org)?,
            safe_id: e.safe_id,
            role: role(e.role)?,
            user: address("user", &e.user)?,
            enabled: e.enabled,
            caller: address("caller", &e.caller)?,
        },
        EventKind::NewLimitLevel(e) => ModuleEvent::NewLimitLevel {
            org: org_hash(&e.org)?,
            root_safe_id: e.root_safe_id,
            updater: address("updater", &e.updater)?,
            new_limit: e.new_limit,
            old_limit: e.old_limit,
        },
        EventKind::DenyHelperModeChanged(e) => ModuleEvent::DenyHelperModeChanged {
            org: org_hash(&e.org)?,
            mode: mode(e.mode)?,
            caller: address("caller", &e.caller)?,
        },
        EventKind::AddedToList(e) => ModuleEvent::AddedToList {
            org: org_hash(&e.org)?,
            users: e
                .users
                .iter()
                .map(|u| address("users", u))
                .collect::<Result<Vec<_>, _>>()?,
        },
        EventKind::DroppedFromList(e) => ModuleEvent::DroppedFromList {
            org: org_hash(&e.org)?,
            user: address("user", &e.user)?,
        },
        EventKind::OnBehalfAuthorized(e) => ModuleEvent::OnBehalfAuthorized {
            org: org_hash(&e.org)?,
            executor: address("executor", &e.executor)?,
            super_safe: address("super_safe", &e.super_safe)?,
            target_safe: address("target_safe", &e.target_safe)?,
            nonce: e.nonce,
        },
        EventKind::TxOnBehalfExecuted(e) => ModuleEvent::TxOnBehalfExecuted {
            org: org_hash(&e.org)?,
            executor: address("executor", &e.executor)?,
            super_safe: address("super_safe", &e.super_safe)?,
            target_safe: address("target_safe", &e.target_safe)?,
            result: e.result,
        },
    };

    Ok(EventEnvelope {
        sequence,
        schema_version: proto.schema_version,
        event,
    })
}

/// Convert a kernel envelope to a protobuf frame for the binary log.
pub fn kernel_to_proto(kernel: &EventEnvelope) -> ProtoEventEnvelope {
    let kind = match &kernel.event {
        ModuleEvent::ModuleInitialized { config } => {
            EventKind::ModuleInitialized(pb::ModuleInitialized {
                config: Some(pb::ProtoModuleConfig {
                    chain_id: config.chain_id,
                    module_address: bytes(&config.module_address),
                    guard_address: bytes(&config.guard_address),
                    default_depth_tree_limit: config.default_depth_tree_limit,
                    max_depth_tree_limit: config.max_depth_tree_limit,
                }),
            })
        }
        ModuleEvent::OrganisationCreated {
            org,
            name,
            creator,
            root_safe_id,
            depth_tree_limit,
        } => EventKind::OrganisationCreated(pb::OrganisationCreated {
            org: hash_bytes(org),
            name: name.clone(),
            creator: bytes(creator),
            root_safe_id: *root_safe_id,
            depth_tree_limit: *depth_tree_limit,
        }),
        ModuleEvent::RootSafeCreated {
            org,
            safe_id,
            creator,
            wallet,
            name,
        } => EventKind::RootSafeCreated(pb::RootSafeCreated {
            org: hash_bytes(org),
            safe_id: *safe_id,
            creator: bytes(creator),
            wallet: bytes(wallet),
            name: name.clone(),
        }),
        ModuleEvent::SafeCreated {
            org,
            safe_id,
            creator,
            super_safe,
            name,
        } => EventKind::SafeCreated(pb::SafeCreated {
            org: hash_bytes(org),
            safe_id: *safe_id,
            creator: bytes(creator),
            super_safe: *super_safe,
            name: name.clone(),
        }),
        ModuleEvent::SafeRemoved {
            org,
            safe_id,
            remover,
            super_safe,
            name,
        } => EventKind::SafeRemoved(pb::SafeRemoved {
            org: hash_bytes(org),
            safe_id: *safe_id,
            remover: bytes(remover),
            super_safe: *super_safe,
            name: name.clone(),
        }),
        ModuleEvent::SafeDisconnected {
            org,
            safe_id,
            wallet,
            disconnector,
        } => EventKind::SafeDisconnected(pb::SafeDisconnected {
            org: hash_bytes(org),
            safe_id: *safe_id,
            wallet: bytes(wallet),
            disconnector: bytes(disconnector),
        }),
        ModuleEvent::WholeTreeRemoved {
            org,
            root_safe_id,
            remover,
            name,
        } => EventKind::WholeTreeRemoved(pb::WholeTreeRemoved {
            org: hash_bytes(org),
            root_safe_id: *root_safe_id,
            remover: bytes(remover),
            name: name.clone(),
        }),
        ModuleEvent::RootSafePromoted {
            org,
            safe_id,
            updater,
            wallet,
            name,
        } => EventKind::RootSafePromoted(pb::RootSafePromoted {
            org: hash_bytes(org),
            safe_id: *safe_id,
            updater: bytes(updater),
            wallet: bytes(wallet),
            name: name.clone(),
        }),
        ModuleEvent::SafeSuperUpdated {
            org,
            safe_id,
            updater,
            old_super,
            new_super,
        } => EventKind::SafeSuperUpdated(pb::SafeSuperUpdated {
            org: hash_bytes(org),
            safe_id: *safe_id,
            updater: bytes(updater),
            old_super: *old_super,
            new_super: *new_super,
        }),
        ModuleEvent::RoleChanged {
            org,
            safe_id,
            role,
            user,
            enabled,
            caller,
        } => EventKind::RoleChanged(pb::RoleChanged {
            org: hash_bytes(org),
            safe_id: *safe_id,
            role: u32::from(role.as_u8()),
            user: bytes(user),
            enabled: *enabled,
            caller: bytes(caller),
        }),
        ModuleEvent::NewLimitLevel {
            org,
            root_safe_id,
            updater,
            new_limit,
            old_limit,
        } => EventKind::NewLimitLevel(pb::NewLimitLevel {
            org: hash_bytes(org),
            root_safe_id: *root_safe_id,
            updater: bytes(updater),
            new_limit: *new_limit,
            old_limit: *old_limit,
        }),
        ModuleEvent::DenyHelperModeChanged { org, mode, caller } => {
            EventKind::DenyHelperModeChanged(pb::DenyHelperModeChanged {
                org: hash_bytes(org),
                mode: mode_code(*mode),
                caller: bytes(caller),
            })
        }
        ModuleEvent::AddedToList { org, users } => EventKind::AddedToList(pb::AddedToList {
            org: hash_bytes(org),
            users: users.iter().map(bytes).collect(),
        }),
        ModuleEvent::DroppedFromList { org, user } => {
            EventKind::DroppedFromList(pb::DroppedFromList {
                org: hash_bytes(org),
                user: bytes(user),
            })
        }
        ModuleEvent::OnBehalfAuthorized {
            org,
            executor,
            super_safe,
            target_safe,
            nonce,
        } => EventKind::OnBehalfAuthorized(pb::OnBehalfAuthorized {
            org: hash_bytes(org),
            executor: bytes(executor),
            super_safe: bytes(super_safe),
            target_safe: bytes(target_safe),
            nonce: *nonce,
        }),
        ModuleEvent::TxOnBehalfExecuted {
            org,
            executor,
            super_safe,
            target_safe,
            result,
        } => EventKind::TxOnBehalfExecuted(pb::TxOnBehalfExecuted {
            org: hash_bytes(org),
            executor: bytes(executor),
            super_safe: bytes(super_safe),
            target_safe: bytes(target_safe),
            result: *result,
        }),
    };

    ProtoEventEnvelope {
        sequence: kernel.sequence,
        schema_version: kernel.schema_version,
        event: Some(ProtoEvent { kind: Some(kind) }),
    }
}

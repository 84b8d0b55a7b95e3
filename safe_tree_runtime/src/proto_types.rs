//! Hand-written protobuf types for the binary event log.
//!
//! Uses prost derive macros for encode/decode without prost-build.
//! Addresses travel as 20 raw bytes, organization hashes as 32, enums
//! as their small integer codes. Tags are frozen for wire version 1.

use prost::Message;

// ── Envelope ───────────────────────────────────────────────────

#[derive(Clone, PartialEq, Message)]
pub struct ProtoEventEnvelope {
    #[prost(uint64, tag = "1")]
    pub sequence: u64,
    #[prost(uint32, tag = "2")]
    pub schema_version: u32,
    #[prost(message, optional, tag = "3")]
    pub event: Option<ProtoEvent>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ProtoEvent {
    #[prost(
        oneof = "EventKind",
        tags = "1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16"
    )]
    pub kind: Option<EventKind>,
}

#[derive(Clone, PartialEq, prost::Oneof)]
pub enum EventKind {
    #[prost(message, tag = "1")]
    ModuleInitialized(ModuleInitialized),
    #[prost(message, tag = "2")]
    OrganisationCreated(OrganisationCreated),
    #[prost(message, tag = "3")]
    RootSafeCreated(RootSafeCreated),
    #[prost(message, tag = "4")]
    SafeCreated(SafeCreated),
    #[prost(message, tag = "5")]
    SafeRemoved(SafeRemoved),
    #[prost(message, tag = "6")]
    SafeDisconnected(SafeDisconnected),
    #[prost(message, tag = "7")]
    WholeTreeRemoved(WholeTreeRemoved),
    #[prost(message, tag = "8")]
    RootSafePromoted(RootSafePromoted),
    #[prost(message, tag = "9")]
    SafeSuperUpdated(SafeSuperUpdated),
    #[prost(message, tag = "10")]
    RoleChanged(RoleChanged),
    #[prost(message, tag = "11")]
    NewLimitLevel(NewLimitLevel),
    #[prost(message, tag = "12")]
    DenyHelperModeChanged(DenyHelperModeChanged),
    #[prost(message, tag = "13")]
    AddedToList(AddedToList),
    #[prost(message, tag = "14")]
    DroppedFromList(DroppedFromList),
    #[prost(message, tag = "15")]
    OnBehalfAuthorized(OnBehalfAuthorized),
    #[prost(message, tag = "16")]
    TxOnBehalfExecuted(TxOnBehalfExecuted),
}

// ── Configuration ──────────────────────────────────────────────

#[derive(Clone, PartialEq, Message)]
pub struct ProtoModuleConfig {
    #[prost(uint64, tag = "1")]
    pub chain_id: u64,
    #[prost(bytes = "vec", tag = "2")]
    pub module_address: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub guard_address: Vec<u8>,
    #[prost(uint32, tag = "4")]
    pub default_depth_tree_limit: u32,
    #[prost(uint32, tag = "5")]
    pub max_depth_tree_limit: u32,
}

// ── Event Types ────────────────────────────────────────────────

#[derive(Clone, PartialEq, Message)]
pub struct ModuleInitialized {
    #[prost(message, optional, tag = "1")]
    pub config: Option<ProtoModuleConfig>,
}

#[derive(Clone, PartialEq, Message)]
pub struct OrganisationCreated {
    #[prost(bytes = "vec", tag = "1")]
    pub org: Vec<u8>,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(bytes = "vec", tag = "3")]
    pub creator: Vec<u8>,
    #[prost(uint64, tag = "4")]
    pub root_safe_id: u64,
    #[prost(uint32, tag = "5")]
    pub depth_tree_limit: u32,
}

#[derive(Clone, PartialEq, Message)]
pub struct RootSafeCreated {
    #[prost(bytes = "vec", tag = "1")]
    pub org: Vec<u8>,
    #[prost(uint64, tag = "2")]
    pub safe_id: u64,
    #[prost(bytes = "vec", tag = "3")]
    pub creator: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub wallet: Vec<u8>,
    #[prost(string, tag = "5")]
    pub name: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct SafeCreated {
    #[prost(bytes = "vec", tag = "1")]
    pub org: Vec<u8>,
    #[prost(uint64, tag = "2")]
    pub safe_id: u64,
    #[prost(bytes = "vec", tag = "3")]
    pub creator: Vec<u8>,
    #[prost(uint64, tag = "4")]
    pub super_safe: u64,
    #[prost(string, tag = "5")]
    pub name: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct SafeRemoved {
    #[prost(bytes = "vec", tag = "1")]
    pub org: Vec<u8>,
    #[prost(uint64, tag = "2")]
    pub safe_id: u64,
    #[prost(bytes = "vec", tag = "3")]
    pub remover: Vec<u8>,
    #[prost(uint64, tag = "4")]
    pub super_safe: u64,
    #[prost(string, tag = "5")]
    pub name: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct SafeDisconnected {
    #[prost(bytes = "vec", tag = "1")]
    pub org: Vec<u8>,
    #[prost(uint64, tag = "2")]
    pub safe_id: u64,
    #[prost(bytes = "vec", tag = "3")]
    pub wallet: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub disconnector: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct WholeTreeRemoved {
    #[prost(bytes = "vec", tag = "1")]
    pub org: Vec<u8>,
    #[prost(uint64, tag = "2")]
    pub root_safe_id: u64,
    #[prost(bytes = "vec", tag = "3")]
    pub remover: Vec<u8>,
    #[prost(string, tag = "4")]
    pub name: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct RootSafePromoted {
    #[prost(bytes = "vec", tag = "1")]
    pub org: Vec<u8>,
    #[prost(uint64, tag = "2")]
    pub safe_id: u64,
    #[prost(bytes = "vec", tag = "3")]
    pub updater: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub wallet: Vec<u8>,
    #[prost(string, tag = "5")]
    pub name: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct SafeSuperUpdated {
    #[prost(bytes = "vec", tag = "1")]
    pub org: Vec<u8>,
    #[prost(uint64, tag = "2")]
    pub safe_id: u64,
    #[prost(bytes = "vec", tag = "3")]
    pub updater: Vec<u8>,
    #[prost(uint64, tag = "4")]
    pub old_super: u64,
    #[prost(uint64, tag = "5")]
    pub new_super: u64,
}

#[derive(Clone, PartialEq, Message)]
pub struct RoleChanged {
    #[prost(bytes = "vec", tag = "1")]
    pub org: Vec<u8>,
    #[prost(uint64, tag = "2")]
    pub safe_id: u64,
    /// `Role::as_u8` code.
    #[prost(uint32, tag = "3")]
    pub role: u32,
    #[prost(bytes = "vec", tag = "4")]
    pub user: Vec<u8>,
    #[prost(bool, tag = "5")]
    pub enabled: bool,
    #[prost(bytes = "vec", tag = "6")]
    pub caller: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct NewLimitLevel {
    #[prost(bytes = "vec", tag = "1")]
    pub org: Vec<u8>,
    #[prost(uint64, tag = "2")]
    pub root_safe_id: u64,
    #[prost(bytes = "vec", tag = "3")]
    pub updater: Vec<u8>,
    #[prost(uint32, tag = "4")]
    pub new_limit: u32,
    #[prost(uint32, tag = "5")]
    pub old_limit: u32,
}

#[derive(Clone, PartialEq, Message)]
pub struct DenyHelperModeChanged {
    #[prost(bytes = "vec", tag = "1")]
    pub org: Vec<u8>,
    /// 0 disabled, 1 allowlist, 2 denylist.
    #[prost(uint32, tag = "2")]
    pub mode: u32,
    #[prost(bytes = "vec", tag = "3")]
    pub caller: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct AddedToList {
    #[prost(bytes = "vec", tag = "1")]
    pub org: Vec<u8>,
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub users: Vec<Vec<u8>>,
}

#[derive(Clone, PartialEq, Message)]
pub struct DroppedFromList {
    #[prost(bytes = "vec", tag = "1")]
    pub org: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub user: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct OnBehalfAuthorized {
    #[prost(bytes = "vec", tag = "1")]
    pub org: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub executor: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub super_safe: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub target_safe: Vec<u8>,
    #[prost(uint64, tag = "5")]
    pub nonce: u64,
}

#[derive(Clone, PartialEq, Message)]
pub struct TxOnBehalfExecuted {
    #[prost(bytes = "vec", tag = "1")]
    pub org: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub executor: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub super_safe: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub target_safe: Vec<u8>,
    #[prost(bool, tag = "5")]
    pub result: bool,
}

#![forbid(unsafe_code)]

//! SafeTree kernel: hierarchical safe organizations and execution on
//! behalf, as a deterministic event-sourced state machine.

pub const MODULE_NAME: &str = "SafeTree Module";
pub const MODULE_VERSION: &str = "1.0.0";

/// Wire format v1. Hash layouts and canonical JSON are frozen per version.
pub const WIRE_VERSION: u32 = 1;

pub mod primitives;
pub mod error;
pub mod domain;
pub mod events;
pub mod state;
pub mod graph;
pub mod lists;
pub mod hashing;
pub mod invariants;
pub mod authority;
pub mod transitions;
pub mod wallet;
pub mod engine;
pub mod tree;
pub mod policy;
pub mod execution;
pub mod guard;
pub mod memory_wallet;

pub use domain::{
    DenyHelperMode, ModuleConfig, OnBehalfTransaction, Operation, Registry, Role, SafeInfo, Tier,
};
pub use engine::{ExecPhase, SafeTreeModule};
pub use error::ModuleError;
pub use events::{EventEnvelope, ModuleEvent, SCHEMA_VERSION};
pub use memory_wallet::{InMemoryWallets, OwnerKey};
pub use primitives::{Address, Hash32, OrgHash, SafeId};
pub use wallet::{OwnerSignature, WalletHost};

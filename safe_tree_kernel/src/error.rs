//! SafeTree v1 - Error Taxonomy
//!
//! Closed set of rejection reasons. Every variant carries only the id or
//! address needed to diagnose it. A rejected operation leaves the
//! registry untouched.

use thiserror::Error;

use crate::domain::Role;
use crate::primitives::{Address, OrgHash, SafeId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModuleError {
    // ── Not found ───────────────────────────────────────────────────
    #[error("organization {0} is not registered")]
    OrgNotRegistered(OrgHash),
    #[error("safe {0} is not registered")]
    SafeNotRegistered(Address),
    #[error("safe id {0} is not registered")]
    SafeIdNotRegistered(SafeId),
    #[error("invalid safe id {0}")]
    InvalidSafeId(SafeId),

    // ── Already exists ──────────────────────────────────────────────
    #[error("organization {0} is already registered")]
    OrgAlreadyRegistered(OrgHash),
    #[error("safe {0} is already registered")]
    SafeAlreadyRegistered(Address),
    #[error("safe id {0} is already removed")]
    SafeAlreadyRemoved(SafeId),
    #[error("owner already exists")]
    OwnerAlreadyExists,
    #[error("account {0} is already on the list")]
    UserAlreadyOnList(Address),

    // ── Authorization ───────────────────────────────────────────────
    #[error("caller is not authorized to execute on behalf of the target")]
    NotAuthorizedExecOnBehalf,
    #[error("caller is neither root nor super safe of the target")]
    NotAuthorizedAsNotRootOrSuperSafe,
    #[error("caller has no authority over the safe being re-parented")]
    NotAuthorizedUpdateNonChildrenSafe,
    #[error("new super safe is the safe itself or one of its descendants")]
    NotAuthorizedUpdateNonSuperSafe,
    #[error("new super safe belongs to another organization")]
    NotAuthorizedUpdateSafeToOtherOrg,
    #[error("caller cannot set roles on another tree")]
    NotAuthorizedSetRoleAnotherTree,
    #[error("caller is not authorized to remove owners of the target")]
    NotAuthorizedRemoveOwner,
    #[error("caller is not authorized to add owners to the target")]
    NotAuthorizedAddOwnerWithThreshold,
    #[error("caller is not authorized to disconnect the safe")]
    NotAuthorizedDisconnectChildrenSafe,
    #[error("role {0:?} cannot be set directly")]
    SetRoleForbidden(Role),

    // ── Structural ──────────────────────────────────────────────────
    #[error("tree depth limit {0} reached")]
    TreeDepthLimitReached(u32),
    #[error("safe still has {0} children")]
    CannotRemoveSafeBeforeRemoveChild(usize),
    #[error("invalid depth tree limit")]
    InvalidLimit,
    #[error("name is empty")]
    EmptyName,
    #[error("invalid address {0}")]
    InvalidAddressProvided(Address),
    #[error("zero address provided")]
    ZeroAddressProvided,
    #[error("{0} is not a root safe")]
    InvalidRootSafe(Address),
    #[error("{0} is not a safe wallet")]
    InvalidSafe(Address),
    #[error("owner not found")]
    OwnerNotFound,
    #[error("registry invariant violated: {0}")]
    InvariantViolation(String),

    // ── Policy ──────────────────────────────────────────────────────
    #[error("address {0} is not on the allowlist")]
    AddresNotAllowed(Address),
    #[error("address {0} is on the denylist")]
    AddressDenied(Address),
    #[error("allow/deny helpers are disabled")]
    DenyHelpersDisabled,
    #[error("list is empty")]
    ListEmpty,

    // ── Underlying capability ───────────────────────────────────────
    #[error("module transaction failed in the target wallet")]
    TxExecutionModuleFailed,
    #[error("signature verification failed for the on-behalf transaction")]
    TxOnBehalfExecutedFailed,
    #[error("re-entrant execution on behalf rejected")]
    ReentrantCall,
    #[error("module cannot be disabled on registered safe {0}")]
    CannotDisableModule(Address),
    #[error("guard cannot be removed from registered safe {0}")]
    CannotDisableGuard(Address),

    // ── Journal ─────────────────────────────────────────────────────
    #[error("schema version mismatch: expected {expected}, got {got}")]
    SchemaVersionMismatch { expected: u32, got: u32 },
    #[error("sequence violation: expected {expected}, got {got}")]
    SequenceViolation { expected: u64, got: u64 },
    #[error("first event must be module_initialized")]
    MissingInitialization,
    #[error("nonce overflow")]
    NonceOverflow,
}

#![forbid(unsafe_code)]

//! SafeTree runtime.
//!
//! Wraps the kernel with persistence, replay, snapshots, session
//! management and drift detection.
//!
//! No domain logic lives here. All transitions and invariants are
//! delegated to the kernel.

pub mod config;
pub mod proto_types;
pub mod proto_bridge;
pub mod event_store;
pub mod replay;
pub mod snapshot;
pub mod snapshot_codec;
pub mod session;
pub mod drift;

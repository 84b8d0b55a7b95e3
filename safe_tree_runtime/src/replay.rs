//! Replay orchestrator: rebuild state from the event log.
//!
//! All domain logic stays in the kernel. The log is decoded through
//! the bridge and handed to `SafeTreeModule::from_events`, which checks
//! schema version, sequence order and the initialization event.

use safe_tree_kernel::events::EventEnvelope;
use safe_tree_kernel::{ModuleError, Registry, SafeTreeModule};

use crate::proto_bridge::{proto_to_kernel, BridgeError};
use crate::proto_types::ProtoEventEnvelope;

/// Decode a whole log. Stops at the first malformed frame.
pub fn decode_log(frames: &[ProtoEventEnvelope]) -> Result<Vec<EventEnvelope>, BridgeError> {
    frames.iter().map(proto_to_kernel).collect()
}

/// Rebuild the registry from a journal and return it with its
/// canonical hash.
pub fn rebuild_state(events: &[EventEnvelope]) -> Result<(Registry, String), ModuleError> {
    let module = SafeTreeModule::from_events(events)?;
    let hash = module.canonical_hash();
    Ok((module.registry().clone(), hash))
}

pub fn rebuild_hash(events: &[EventEnvelope]) -> Result<String, ModuleError> {
    rebuild_state(events).map(|(_, hash)| hash)
}

/// Canonical hash after the first `sequence` events.
pub fn hash_at(events: &[EventEnvelope], sequence: u64) -> Result<String, ModuleError> {
    let prefix: Vec<EventEnvelope> = events
        .iter()
        .take_while(|e| e.sequence <= sequence)
        .cloned()
        .collect();
    rebuild_hash(&prefix)
}

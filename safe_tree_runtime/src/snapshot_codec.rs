//! Snapshot Codec: deterministic Registry encoder/decoder.
//!
//! Pure codec layer. No side-effects, no timestamps, no envelope.
//!
//! - `encode_snapshot`:  Registry → JSON string
//! - `decode_snapshot`:  JSON string → Registry (strict, no defaults)
//! - `restore_snapshot`: decode + invariant validation
//! - `restore_module`:   restore + position the module at a sequence
//! - `export_snapshot_to_file` / `import_snapshot_from_file`: file I/O
//! - `snapshot_hash`:    SHA-256 of the encoded JSON (lowercase hex)

use std::fs;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};
use thiserror::Error;

use safe_tree_kernel::invariants::try_validate_invariants;
use safe_tree_kernel::{Registry, SafeTreeModule};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Malformed JSON, missing fields or unknown fields.
    #[error("deserialization error: {0}")]
    Deserialization(String),
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub fn encode_snapshot(registry: &Registry) -> Result<String, SnapshotError> {
    serde_json::to_string(registry).map_err(|e| SnapshotError::Serialization(e.to_string()))
}

/// Strict decode. `deny_unknown_fields` on every registry type rejects
/// unexpected fields; nothing is defaulted. No invariant validation.
pub fn decode_snapshot(json: &str) -> Result<Registry, SnapshotError> {
    serde_json::from_str::<Registry>(json)
        .map_err(|e| SnapshotError::Deserialization(e.to_string()))
}

/// Decode and validate. Entry point for untrusted input.
pub fn restore_snapshot(json: &str) -> Result<Registry, SnapshotError> {
    let registry = decode_snapshot(json)?;
    try_validate_invariants(&registry).map_err(SnapshotError::InvariantViolation)?;
    Ok(registry)
}

/// Module resuming after `last_sequence` from a snapshot.
pub fn restore_module(json: &str, last_sequence: u64) -> Result<SafeTreeModule, SnapshotError> {
    let registry = restore_snapshot(json)?;
    SafeTreeModule::from_registry(registry, last_sequence)
        .map_err(|e| SnapshotError::InvariantViolation(e.to_string()))
}

/// Byte-for-byte identical across identical registries.
pub fn export_snapshot_to_file(registry: &Registry, path: &Path) -> Result<(), SnapshotError> {
    let json = encode_snapshot(registry)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, json.as_bytes())?;
    Ok(())
}

pub fn import_snapshot_from_file(path: &Path) -> Result<Registry, SnapshotError> {
    let content = fs::read_to_string(path)?;
    restore_snapshot(&content)
}

/// SHA-256 of the serde encoding, for file integrity.
///
/// Not the kernel's canonical hash: that one has its own field layout
/// and carries the wire version.
pub fn snapshot_hash(registry: &Registry) -> Result<String, SnapshotError> {
    let json = encode_snapshot(registry)?;
    let digest = Sha256::digest(json.as_bytes());
    Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
}

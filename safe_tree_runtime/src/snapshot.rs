//! Snapshot layer: deterministic registry snapshots.
//!
//! Snapshots contain canonical JSON + hash for verification.
//! No timestamps in snapshot content.
//!
//! If a snapshot hash doesn't match replay, the caller falls back to a
//! full replay.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use safe_tree_kernel::hashing::{canonical_hash, canonical_serialize};
use safe_tree_kernel::{Registry, WIRE_VERSION};

/// Snapshot on-disk format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Sequence of the last event folded into this snapshot.
    pub sequence: u64,
    /// Canonical JSON of the registry (UTF-8).
    pub canonical_json: String,
    /// SHA-256 of the canonical JSON.
    pub hash: String,
    pub wire_version: u32,
}

fn file_name(sequence: u64) -> String {
    format!("snapshot_{:06}.json", sequence)
}

pub fn save_snapshot(dir: &Path, sequence: u64, registry: &Registry) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;

    let canonical_json = String::from_utf8(canonical_serialize(registry))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let snap = Snapshot {
        sequence,
        canonical_json,
        hash: canonical_hash(registry),
        wire_version: WIRE_VERSION,
    };
    let content = serde_json::to_string(&snap).map_err(io::Error::other)?;

    let path = dir.join(file_name(sequence));
    let mut file = File::create(&path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;

    info!(sequence, hash = %snap.hash, "snapshot saved");
    Ok(path)
}

/// Snapshot taken at exactly `sequence`, if any.
pub fn load_snapshot(dir: &Path, sequence: u64) -> io::Result<Option<Snapshot>> {
    let path = dir.join(file_name(sequence));
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&path)?;
    let snap: Snapshot = serde_json::from_str(&content).map_err(|e| {
        io::Error::new(io::ErrorKind::InvalidData, format!("bad snapshot: {}", e))
    })?;
    Ok(Some(snap))
}

/// Highest-sequence `snapshot_NNNNNN.json` in `dir`.
pub fn load_latest_snapshot(dir: &Path) -> io::Result<Option<Snapshot>> {
    if !dir.exists() {
        return Ok(None);
    }

    let mut best: Option<u64> = None;
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name();
        let seq = name
            .to_string_lossy()
            .strip_prefix("snapshot_")
            .and_then(|s| s.strip_suffix(".json"))
            .and_then(|s| s.parse::<u64>().ok());
        if let Some(seq) = seq {
            best = Some(best.map_or(seq, |b| b.max(seq)));
        }
    }

    match best {
        Some(seq) => load_snapshot(dir, seq),
        None => Ok(None),
    }
}

/// The stored hash matches the stored JSON and the wire version is ours.
pub fn verify_snapshot_hash(snap: &Snapshot) -> bool {
    let digest = Sha256::digest(snap.canonical_json.as_bytes());
    let computed: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    snap.wire_version == WIRE_VERSION && computed == snap.hash
}

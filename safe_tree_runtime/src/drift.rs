//! Drift detection: determinism verification and registry comparison.

use std::collections::BTreeSet;

use safe_tree_kernel::events::EventEnvelope;
use safe_tree_kernel::{ModuleError, OrgHash, Registry, SafeId, Tier};

use crate::replay;

/// Replay the same events twice and compare hashes.
pub fn verify_determinism(events: &[EventEnvelope]) -> Result<bool, ModuleError> {
    let (_, hash1) = replay::rebuild_state(events)?;
    let (_, hash2) = replay::rebuild_state(events)?;
    if hash1 != hash2 {
        tracing::error!(%hash1, %hash2, "two replays produced different hashes");
    }
    Ok(hash1 == hash2)
}

/// Structural differences between two registries.
pub fn compare_registries(a: &Registry, b: &Registry) -> DriftReport {
    let orgs_a: BTreeSet<OrgHash> = a.orgs.keys().copied().collect();
    let orgs_b: BTreeSet<OrgHash> = b.orgs.keys().copied().collect();
    let live_a = live_ids(a);
    let live_b = live_ids(b);

    let mut reparented = Vec::new();
    let mut tier_changes = Vec::new();
    for id in live_a.intersection(&live_b) {
        let (Some(na), Some(nb)) = (a.safes.get(id), b.safes.get(id)) else {
            continue;
        };
        if na.super_safe != nb.super_safe {
            reparented.push((*id, na.super_safe, nb.super_safe));
        }
        if na.tier != nb.tier {
            tier_changes.push((*id, na.tier, nb.tier));
        }
    }

    let nonce_deltas = orgs_a
        .intersection(&orgs_b)
        .filter_map(|org| {
            let before = a.orgs.get(org)?.nonce;
            let after = b.orgs.get(org)?.nonce;
            (before != after).then(|| (*org, after as i64 - before as i64))
        })
        .collect();

    DriftReport {
        org_count_a: a.orgs.len(),
        org_count_b: b.orgs.len(),
        live_safe_count_a: live_a.len(),
        live_safe_count_b: live_b.len(),
        added_orgs: orgs_b.difference(&orgs_a).copied().collect(),
        removed_orgs: orgs_a.difference(&orgs_b).copied().collect(),
        added_safes: live_b.difference(&live_a).copied().collect(),
        removed_safes: live_a.difference(&live_b).copied().collect(),
        reparented,
        tier_changes,
        nonce_deltas,
    }
}

fn live_ids(registry: &Registry) -> BTreeSet<SafeId> {
    registry
        .safes
        .values()
        .filter(|n| n.is_live())
        .map(|n| n.id)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriftReport {
    pub org_count_a: usize,
    pub org_count_b: usize,
    pub live_safe_count_a: usize,
    pub live_safe_count_b: usize,
    pub added_orgs: Vec<OrgHash>,
    pub removed_orgs: Vec<OrgHash>,
    pub added_safes: Vec<SafeId>,
    /// Live in `a`, removed or gone in `b`.
    pub removed_safes: Vec<SafeId>,
    /// `(id, old super, new super)`
    pub reparented: Vec<(SafeId, SafeId, SafeId)>,
    pub tier_changes: Vec<(SafeId, Tier, Tier)>,
    pub nonce_deltas: Vec<(OrgHash, i64)>,
}

impl DriftReport {
    pub fn is_empty(&self) -> bool {
        self.added_orgs.is_empty()
            && self.removed_orgs.is_empty()
            && self.added_safes.is_empty()
            && self.removed_safes.is_empty()
            && self.reparented.is_empty()
            && self.tier_changes.is_empty()
            && self.nonce_deltas.is_empty()
    }
}

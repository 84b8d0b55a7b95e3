//! SafeTree v1 - Tree Utilities
//!
//! Pure walks over the parent-pointer arena. Every walk is bounded by
//! the number of nodes, so a corrupted registry cannot loop forever.

use std::collections::{BTreeMap, VecDeque};

use crate::domain::Registry;
use crate::primitives::{OrgHash, SafeId, NO_SAFE};

// ---------------------------------------------------------------------------
// Ancestor chain
// ---------------------------------------------------------------------------

/// Ancestors of `id`, nearest first. Empty for roots and unknown ids.
pub fn ancestors(registry: &Registry, id: SafeId) -> Vec<SafeId> {
    let bound = registry.safes.len();
    let mut chain = Vec::new();
    let mut current = match registry.node(id) {
        Some(node) => node.super_safe,
        None => return chain,
    };
    while current != NO_SAFE && chain.len() <= bound {
        chain.push(current);
        current = match registry.node(current) {
            Some(node) => node.super_safe,
            None => break,
        };
    }
    chain
}

/// True iff `candidate` appears on the parent chain of `id`.
/// A node is never its own ancestor.
pub fn is_ancestor(registry: &Registry, candidate: SafeId, id: SafeId) -> bool {
    if candidate == NO_SAFE || candidate == id {
        return false;
    }
    ancestors(registry, id).contains(&candidate)
}

/// Ancestor-chain length. Roots sit at depth 0.
pub fn depth(registry: &Registry, id: SafeId) -> u32 {
    ancestors(registry, id).len() as u32
}

/// Top of the chain: the node itself when it has no parent.
pub fn root_of(registry: &Registry, id: SafeId) -> SafeId {
    ancestors(registry, id).last().copied().unwrap_or(id)
}

// ---------------------------------------------------------------------------
// Descendants
// ---------------------------------------------------------------------------

/// Live children of every node that has at least one.
pub fn child_index(registry: &Registry) -> BTreeMap<SafeId, Vec<SafeId>> {
    let mut index: BTreeMap<SafeId, Vec<SafeId>> = BTreeMap::new();
    for node in registry.safes.values() {
        if node.is_live() && node.super_safe != NO_SAFE {
            index.entry(node.super_safe).or_default().push(node.id);
        }
    }
    index
}

/// Direct live children of `id`, ascending.
pub fn children_of(registry: &Registry, id: SafeId) -> Vec<SafeId> {
    registry
        .safes
        .values()
        .filter(|n| n.is_live() && n.super_safe == id && n.id != id)
        .map(|n| n.id)
        .collect()
}

/// `id` followed by all of its descendants, breadth first.
pub fn subtree(registry: &Registry, id: SafeId) -> Vec<SafeId> {
    let index = child_index(registry);
    let mut out = Vec::new();
    let mut queue = VecDeque::from([id]);
    while let Some(next) = queue.pop_front() {
        if out.len() > registry.safes.len() {
            break;
        }
        out.push(next);
        if let Some(children) = index.get(&next) {
            queue.extend(children.iter().copied());
        }
    }
    out
}

/// Longest downward path below `id`, in edges. Leaves have height 0.
pub fn subtree_height(registry: &Registry, id: SafeId) -> u32 {
    let base = depth(registry, id);
    subtree(registry, id)
        .into_iter()
        .map(|n| depth(registry, n).saturating_sub(base))
        .max()
        .unwrap_or(0)
}

/// Deepest live node of an organization.
pub fn max_realized_depth(registry: &Registry, org: &OrgHash) -> u32 {
    registry
        .safes
        .values()
        .filter(|n| n.org == *org && n.is_live())
        .map(|n| depth(registry, n.id))
        .max()
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Cycle detection
// ---------------------------------------------------------------------------

/// First parent cycle found, as the list of ids on it.
/// Sorted traversal for determinism.
pub fn detect_parent_cycle(registry: &Registry) -> Option<Vec<SafeId>> {
    for start in registry.safes.keys() {
        let mut seen: Vec<SafeId> = vec![*start];
        let mut current = registry.safes[start].super_safe;
        while current != NO_SAFE {
            if let Some(pos) = seen.iter().position(|s| *s == current) {
                return Some(seen[pos..].to_vec());
            }
            seen.push(current);
            current = match registry.node(current) {
                Some(node) => node.super_safe,
                None => break,
            };
        }
    }
    None
}

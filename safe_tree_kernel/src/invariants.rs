//! SafeTree v1 - Invariant Checks
//!
//! Run after every committed batch and on snapshot restore. The first
//! failure is reported as a message tagged with the broken invariant.

use std::collections::BTreeSet;

use crate::domain::{Registry, Tier};
use crate::graph::{depth, detect_parent_cycle};
use crate::lists;
use crate::primitives::{Address, NO_SAFE};

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run every check. `Err(message)` on the first failure.
pub fn try_validate_invariants(registry: &Registry) -> Result<(), String> {
    check_config(registry)?;
    check_node_records(registry)?;
    check_parent_links(registry)?;
    check_no_cycles(registry)?;
    check_depth_limits(registry)?;
    check_unique_wallets(registry)?;
    check_wallet_index(registry)?;
    check_organizations(registry)?;
    check_role_grants(registry)?;
    check_lists(registry)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Individual checks (private)
// ---------------------------------------------------------------------------

fn check_config(registry: &Registry) -> Result<(), String> {
    let c = &registry.config;
    if c.default_depth_tree_limit == 0 || c.default_depth_tree_limit > c.max_depth_tree_limit {
        return Err(format!(
            "[INVARIANT:config] default depth limit {} outside 1..={}",
            c.default_depth_tree_limit, c.max_depth_tree_limit
        ));
    }
    Ok(())
}

fn check_node_records(registry: &Registry) -> Result<(), String> {
    for (key, node) in &registry.safes {
        if *key != node.id || node.id == NO_SAFE {
            return Err(format!(
                "[INVARIANT:node_id] record key {} holds node id {}",
                key, node.id
            ));
        }
        if node.id > registry.index_id {
            return Err(format!(
                "[INVARIANT:index_id] node {} above index {}",
                node.id, registry.index_id
            ));
        }
        if !registry.orgs.contains_key(&node.org) {
            return Err(format!(
                "[INVARIANT:node_org] node {} belongs to unknown organization {}",
                node.id, node.org
            ));
        }
        if node.tier == Tier::Removed && node.lead.is_some() {
            return Err(format!("[INVARIANT:removed_lead] removed node {} keeps a lead", node.id));
        }
    }
    Ok(())
}

fn check_parent_links(registry: &Registry) -> Result<(), String> {
    for node in registry.safes.values() {
        match node.tier {
            Tier::Root | Tier::Removed => {
                if node.super_safe != NO_SAFE {
                    return Err(format!(
                        "[INVARIANT:parent] {:?} node {} has parent {}",
                        node.tier, node.id, node.super_safe
                    ));
                }
            }
            Tier::Safe => {
                let parent = registry.node(node.super_safe).ok_or_else(|| {
                    format!(
                        "[INVARIANT:parent] node {} points at missing parent {}",
                        node.id, node.super_safe
                    )
                })?;
                if !parent.is_live() {
                    return Err(format!(
                        "[INVARIANT:parent] node {} hangs under removed node {}",
                        node.id, parent.id
                    ));
                }
                if parent.org != node.org {
                    return Err(format!(
                        "[INVARIANT:parent] node {} and parent {} are in different organizations",
                        node.id, parent.id
                    ));
                }
            }
        }
    }
    Ok(())
}

fn check_no_cycles(registry: &Registry) -> Result<(), String> {
    if let Some(cycle) = detect_parent_cycle(registry) {
        let path: Vec<String> = cycle.iter().map(|id| id.to_string()).collect();
        return Err(format!("[INVARIANT:acyclic] parent cycle {}", path.join(" -> ")));
    }
    Ok(())
}

fn check_depth_limits(registry: &Registry) -> Result<(), String> {
    for node in registry.safes.values().filter(|n| n.is_live()) {
        let Some(org) = registry.orgs.get(&node.org) else {
            continue;
        };
        let d = depth(registry, node.id);
        if d > org.depth_tree_limit {
            return Err(format!(
                "[INVARIANT:depth_limit] node {} at depth {} exceeds limit {}",
                node.id, d, org.depth_tree_limit
            ));
        }
    }
    Ok(())
}

fn check_wallet_index(registry: &Registry) -> Result<(), String> {
    if registry.wallet_index.len() != registry.safes.len() {
        return Err(format!(
            "[INVARIANT:wallet_index] {} index entries for {} records",
            registry.wallet_index.len(),
            registry.safes.len()
        ));
    }
    for node in registry.safes.values() {
        if registry.wallet_index.get(&node.wallet) != Some(&node.id) {
            return Err(format!(
                "[INVARIANT:wallet_index] wallet {} not indexed to node {}",
                node.wallet, node.id
            ));
        }
    }
    Ok(())
}

fn check_unique_wallets(registry: &Registry) -> Result<(), String> {
    let mut seen: BTreeSet<Address> = BTreeSet::new();
    for node in registry.safes.values() {
        if node.wallet.is_zero() || !seen.insert(node.wallet) {
            return Err(format!(
                "[INVARIANT:wallet] wallet {} is zero or bound twice",
                node.wallet
            ));
        }
    }
    Ok(())
}

fn check_organizations(registry: &Registry) -> Result<(), String> {
    let max = registry.config.max_depth_tree_limit;
    for (key, org) in &registry.orgs {
        if *key != org.org_hash {
            return Err(format!("[INVARIANT:org_key] {} stored under {}", org.org_hash, key));
        }
        if org.depth_tree_limit == 0 || org.depth_tree_limit > max {
            return Err(format!(
                "[INVARIANT:org_limit] {} has limit {} outside 1..={}",
                org.name, org.depth_tree_limit, max
            ));
        }
        match registry.node(org.root_safe_id) {
            Some(root) if root.tier == Tier::Root && root.org == *key => {}
            _ => {
                return Err(format!(
                    "[INVARIANT:org_root] {} points at {} which is not one of its roots",
                    org.name, org.root_safe_id
                ))
            }
        }
    }
    Ok(())
}

fn check_role_grants(registry: &Registry) -> Result<(), String> {
    for grant in &registry.role_grants {
        if !grant.role.is_lead() {
            return Err(format!(
                "[INVARIANT:grant_role] derived role {:?} stored as a grant",
                grant.role
            ));
        }
        match registry.node(grant.safe_id) {
            Some(node) if node.is_live() && node.lead == Some(grant.account) => {}
            _ => {
                return Err(format!(
                    "[INVARIANT:grant_lead] grant {:?} for {} does not match the lead of safe {}",
                    grant.role, grant.account, grant.safe_id
                ))
            }
        }
    }
    Ok(())
}

fn check_lists(registry: &Registry) -> Result<(), String> {
    for org in registry.orgs.values() {
        let members = lists::members(&org.listed);
        let expected_links = if members.is_empty() { 0 } else { members.len() + 1 };
        if members.len() as u64 != org.listed.count || org.listed.next.len() != expected_links {
            return Err(format!(
                "[INVARIANT:list] {} list has {} reachable members, count {}, {} links",
                org.name,
                members.len(),
                org.listed.count,
                org.listed.next.len()
            ));
        }
    }
    Ok(())
}

//! SafeTree v1 - Authorization Predicates
//!
//! Read-only questions over the registry: who may act on which node.
//! Every predicate is answered by walking the parent chain of the
//! target, so its cost is bounded by the organization depth limit.
//!
//! Multi-root organizations: a ROOT is authoritative only over nodes
//! that list it, transitively, as an ancestor.

use crate::domain::{Registry, Role, SafeNode, Tier};
use crate::graph::{depth, is_ancestor, root_of};
use crate::primitives::{Address, OrgHash, SafeId};

fn live(registry: &Registry, id: SafeId) -> Option<&SafeNode> {
    registry.node(id).filter(|n| n.is_live())
}

fn live_by_wallet(registry: &Registry, wallet: Address) -> Option<&SafeNode> {
    registry.node_by_wallet(wallet).filter(|n| n.is_live())
}

/// `a == b` or `a` is an ancestor of `b`, both live and in one organization.
pub fn is_tree_member(registry: &Registry, a: SafeId, b: SafeId) -> bool {
    match (live(registry, a), live(registry, b)) {
        (Some(na), Some(nb)) if na.org == nb.org => a == b || is_ancestor(registry, a, b),
        _ => false,
    }
}

pub fn is_super_safe(registry: &Registry, a: SafeId, b: SafeId) -> bool {
    is_ancestor(registry, a, b)
}

/// `wallet` is a ROOT-tier node at the top of `safe_id`'s chain.
pub fn is_root_safe_of(registry: &Registry, wallet: Address, safe_id: SafeId) -> bool {
    let Some(root) = live_by_wallet(registry, wallet) else {
        return false;
    };
    if root.tier != Tier::Root || live(registry, safe_id).is_none() {
        return false;
    }
    root_of(registry, safe_id) == root.id
}

/// The node already sits at the organization depth limit and cannot
/// take children.
pub fn is_limit_level(registry: &Registry, safe_id: SafeId) -> bool {
    let Some(node) = live(registry, safe_id) else {
        return false;
    };
    match registry.orgs.get(&node.org) {
        Some(org) => depth(registry, safe_id) >= org.depth_tree_limit,
        None => false,
    }
}

pub fn is_safe_lead(registry: &Registry, safe_id: SafeId, account: Address) -> bool {
    live(registry, safe_id).is_some_and(|n| n.lead == Some(account))
}

/// Stored grants for lead roles, tree shape for SUPER_SAFE and ROOT_SAFE.
pub fn has_role(registry: &Registry, role: Role, account: Address, safe_id: SafeId) -> bool {
    match role {
        Role::SuperSafe => live_by_wallet(registry, account)
            .is_some_and(|n| is_ancestor(registry, n.id, safe_id)),
        Role::RootSafe => is_root_safe_of(registry, account, safe_id),
        lead => registry
            .role_grants
            .iter()
            .any(|g| g.role == lead && g.account == account && g.safe_id == safe_id),
    }
}

/// Lead grant on exactly `safe_id` that allows execution on behalf.
pub fn lead_can_exec(registry: &Registry, account: Address, safe_id: SafeId) -> bool {
    registry
        .role_grants
        .iter()
        .any(|g| g.account == account && g.safe_id == safe_id && g.role.can_exec_on_behalf())
}

pub fn lead_can_modify_owners(registry: &Registry, account: Address, safe_id: SafeId) -> bool {
    registry
        .role_grants
        .iter()
        .any(|g| g.account == account && g.safe_id == safe_id && g.role.can_modify_owners())
}

/// Root of, or ancestor of, the target. Both must be live.
pub fn has_authority(registry: &Registry, caller_id: SafeId, target_id: SafeId) -> bool {
    let (Some(caller), Some(target)) = (live(registry, caller_id), live(registry, target_id)) else {
        return false;
    };
    if caller.org != target.org {
        return false;
    }
    (caller.tier == Tier::Root && root_of(registry, target_id) == caller_id && caller_id != target_id)
        || is_ancestor(registry, caller_id, target_id)
}

/// Negated gate of the on-behalf protocol.
pub fn has_not_permission_over_target(
    registry: &Registry,
    caller: Address,
    org: &OrgHash,
    target: Address,
) -> bool {
    let Some(target_node) = registry.node_in_org(org, target).filter(|n| n.is_live()) else {
        return true;
    };
    if lead_can_exec(registry, caller, target_node.id) {
        return false;
    }
    match registry.node_in_org(org, caller).filter(|n| n.is_live()) {
        Some(caller_node) => !has_authority(registry, caller_node.id, target_node.id),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ModuleConfig, Organization, RoleGrant};
    use crate::primitives::{Hash32, NO_SAFE};
    use crate::state::create_initial_registry;

    const ORG: Hash32 = Hash32::new([1; 32]);

    fn wallet(id: SafeId) -> Address {
        Address::from_low_u64(100 + id)
    }

    fn node(id: SafeId, super_safe: SafeId, tier: Tier) -> SafeNode {
        SafeNode {
            id,
            org: ORG,
            tier,
            name: format!("safe-{}", id),
            lead: None,
            wallet: wallet(id),
            super_safe,
        }
    }

    /// 1 -> 2 -> 3 and a second root 4 -> 5, limit 2.
    fn sample() -> Registry {
        let mut reg = create_initial_registry(ModuleConfig::default());
        reg.orgs.insert(
            ORG,
            Organization {
                org_hash: ORG,
                name: "Acme".to_string(),
                root_safe_id: 1,
                depth_tree_limit: 2,
                nonce: 0,
                deny_helper: Default::default(),
                listed: Default::default(),
            },
        );
        for n in [
            node(1, NO_SAFE, Tier::Root),
            node(2, 1, Tier::Safe),
            node(3, 2, Tier::Safe),
            node(4, NO_SAFE, Tier::Root),
            node(5, 4, Tier::Safe),
        ] {
            reg.insert_safe(n);
        }
        reg.index_id = 5;
        reg
    }

    #[test]
    fn membership_and_super_safe() {
        let reg = sample();
        assert!(is_tree_member(&reg, 1, 3));
        assert!(is_tree_member(&reg, 2, 2));
        assert!(!is_tree_member(&reg, 3, 1));
        assert!(is_super_safe(&reg, 2, 3));
        assert!(!is_super_safe(&reg, 3, 3));
    }

    #[test]
    fn roots_are_independent() {
        let reg = sample();
        assert!(is_root_safe_of(&reg, wallet(1), 3));
        assert!(!is_root_safe_of(&reg, wallet(1), 5));
        assert!(is_root_safe_of(&reg, wallet(4), 5));
        assert!(!has_authority(&reg, 4, 3));
        assert!(has_authority(&reg, 1, 3));
        assert!(!has_authority(&reg, 1, 1));
    }

    #[test]
    fn limit_level_is_depth_at_limit() {
        let reg = sample();
        assert!(!is_limit_level(&reg, 2));
        assert!(is_limit_level(&reg, 3));
    }

    #[test]
    fn lead_authority_is_exact_target() {
        let mut reg = sample();
        let lead = Address::from_low_u64(0xbeef);
        reg.safes.get_mut(&2).unwrap().lead = Some(lead);
        reg.role_grants.insert(RoleGrant {
            role: Role::SafeLeadExecOnBehalfOnly,
            account: lead,
            safe_id: 2,
        });
        assert!(is_safe_lead(&reg, 2, lead));
        assert!(has_role(&reg, Role::SafeLeadExecOnBehalfOnly, lead, 2));
        assert!(!has_not_permission_over_target(&reg, lead, &ORG, wallet(2)));
        assert!(has_not_permission_over_target(&reg, lead, &ORG, wallet(3)));
        assert!(!lead_can_modify_owners(&reg, lead, 2));
    }

    #[test]
    fn derived_roles() {
        let reg = sample();
        assert!(has_role(&reg, Role::SuperSafe, wallet(2), 3));
        assert!(has_role(&reg, Role::RootSafe, wallet(1), 2));
        assert!(!has_role(&reg, Role::RootSafe, wallet(2), 3));
    }

    #[test]
    fn permission_gate() {
        let reg = sample();
        assert!(!has_not_permission_over_target(&reg, wallet(1), &ORG, wallet(3)));
        assert!(!has_not_permission_over_target(&reg, wallet(2), &ORG, wallet(3)));
        assert!(has_not_permission_over_target(&reg, wallet(3), &ORG, wallet(2)));
        assert!(has_not_permission_over_target(&reg, wallet(4), &ORG, wallet(3)));
        assert!(has_not_permission_over_target(&reg, wallet(1), &Hash32::new([2; 32]), wallet(3)));
    }
}

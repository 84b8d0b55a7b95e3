//! SafeTree v1 - Centralized Transition Logic
//!
//! ALL registry mutation lives here. Command handlers decide *whether*
//! something happens and describe it as an event; this module decides
//! *how* the registry changes. Replay runs the exact same code.
//!
//! The input registry is never mutated: a clone is made first.

use crate::domain::{Organization, Registry, RoleGrant, SafeNode, Tier};
use crate::error::ModuleError;
use crate::events::ModuleEvent;
use crate::graph::subtree;
use crate::lists;
use crate::primitives::{checked_next_nonce, Address, OrgHash, SafeId, NO_SAFE};

// ---------------------------------------------------------------------------
// Public dispatcher
// ---------------------------------------------------------------------------

/// Apply `event` to `registry` and return the new registry.
pub fn apply_event(registry: &Registry, event: &ModuleEvent) -> Result<Registry, ModuleError> {
    let mut next = registry.clone();

    match event {
        ModuleEvent::ModuleInitialized { config } => {
            next.config = config.clone();
        }
        ModuleEvent::OrganisationCreated {
            org,
            name,
            creator,
            root_safe_id,
            depth_tree_limit,
        } => {
            if next.orgs.contains_key(org) {
                return Err(ModuleError::OrgAlreadyRegistered(*org));
            }
            next.orgs.insert(
                *org,
                Organization {
                    org_hash: *org,
                    name: name.clone(),
                    root_safe_id: *root_safe_id,
                    depth_tree_limit: *depth_tree_limit,
                    nonce: 0,
                    deny_helper: Default::default(),
                    listed: Default::default(),
                },
            );
            insert_node(&mut next, *root_safe_id, *org, Tier::Root, name, *creator, NO_SAFE)?;
        }
        ModuleEvent::RootSafeCreated {
            org,
            safe_id,
            wallet,
            name,
            ..
        } => {
            next.org(org)?;
            insert_node(&mut next, *safe_id, *org, Tier::Root, name, *wallet, NO_SAFE)?;
        }
        ModuleEvent::SafeCreated {
            org,
            safe_id,
            creator,
            super_safe,
            name,
        } => {
            next.org(org)?;
            insert_node(&mut next, *safe_id, *org, Tier::Safe, name, *creator, *super_safe)?;
        }
        ModuleEvent::SafeRemoved { safe_id, .. } => {
            let node = node_mut(&mut next, *safe_id)?;
            node.tier = Tier::Removed;
            node.super_safe = NO_SAFE;
            node.lead = None;
            clear_grants(&mut next, *safe_id);
        }
        ModuleEvent::SafeDisconnected { safe_id, .. } => {
            if next.remove_safe(*safe_id).is_none() {
                return Err(ModuleError::SafeIdNotRegistered(*safe_id));
            }
            clear_grants(&mut next, *safe_id);
        }
        ModuleEvent::WholeTreeRemoved {
            org, root_safe_id, ..
        } => {
            next.org(org)?;
            for id in subtree(registry, *root_safe_id) {
                next.remove_safe(id);
                clear_grants(&mut next, id);
            }
            dissolve_or_rehome(&mut next, org, *root_safe_id);
        }
        ModuleEvent::RootSafePromoted { safe_id, .. } => {
            let node = node_mut(&mut next, *safe_id)?;
            node.tier = Tier::Root;
            node.super_safe = NO_SAFE;
        }
        ModuleEvent::SafeSuperUpdated {
            safe_id, new_super, ..
        } => {
            node_mut(&mut next, *safe_id)?.super_safe = *new_super;
        }
        ModuleEvent::RoleChanged {
            safe_id,
            role,
            user,
            enabled,
            ..
        } => {
            let grant = RoleGrant {
                role: *role,
                account: *user,
                safe_id: *safe_id,
            };
            let previous = node_mut(&mut next, *safe_id)?.lead;
            if *enabled {
                if previous.is_some_and(|lead| lead != *user) {
                    clear_grants(&mut next, *safe_id);
                }
                next.role_grants.insert(grant);
                node_mut(&mut next, *safe_id)?.lead = Some(*user);
            } else {
                next.role_grants.remove(&grant);
                let still_lead = next
                    .role_grants
                    .iter()
                    .any(|g| g.safe_id == *safe_id && g.account == *user);
                if !still_lead && previous == Some(*user) {
                    node_mut(&mut next, *safe_id)?.lead = None;
                }
            }
        }
        ModuleEvent::NewLimitLevel { org, new_limit, .. } => {
            next.org_mut(org)?.depth_tree_limit = *new_limit;
        }
        ModuleEvent::DenyHelperModeChanged { org, mode, .. } => {
            next.org_mut(org)?.deny_helper = *mode;
        }
        ModuleEvent::AddedToList { org, users } => {
            let record = next.org_mut(org)?;
            for user in users {
                lists::insert(&mut record.listed, *user);
            }
        }
        ModuleEvent::DroppedFromList { org, user } => {
            lists::remove(&mut next.org_mut(org)?.listed, *user);
        }
        ModuleEvent::OnBehalfAuthorized { org, nonce, .. } => {
            let record = next.org_mut(org)?;
            if record.nonce != *nonce {
                return Err(ModuleError::InvariantViolation(format!(
                    "on_behalf_authorized consumes nonce {} but organization is at {}",
                    nonce, record.nonce
                )));
            }
            record.nonce = checked_next_nonce(record.nonce)?;
        }
        ModuleEvent::TxOnBehalfExecuted { .. } => {}
    }

    Ok(next)
}

// ---------------------------------------------------------------------------
// Helpers (private)
// ---------------------------------------------------------------------------

fn insert_node(
    registry: &mut Registry,
    id: SafeId,
    org: OrgHash,
    tier: Tier,
    name: &str,
    wallet: Address,
    super_safe: SafeId,
) -> Result<(), ModuleError> {
    if id == NO_SAFE || id <= registry.index_id {
        return Err(ModuleError::InvalidSafeId(id));
    }
    if registry.node_by_wallet(wallet).is_some() {
        return Err(ModuleError::SafeAlreadyRegistered(wallet));
    }
    registry.insert_safe(SafeNode {
        id,
        org,
        tier,
        name: name.to_string(),
        lead: None,
        wallet,
        super_safe,
    });
    registry.index_id = id;
    Ok(())
}

fn node_mut(registry: &mut Registry, id: SafeId) -> Result<&mut SafeNode, ModuleError> {
    registry
        .safes
        .get_mut(&id)
        .ok_or(ModuleError::SafeIdNotRegistered(id))
}

fn clear_grants(registry: &mut Registry, id: SafeId) {
    registry.role_grants.retain(|g| g.safe_id != id);
}

/// After a tree is gone: drop the organization when no live member is
/// left, otherwise point it at the lowest remaining root.
fn dissolve_or_rehome(registry: &mut Registry, org: &OrgHash, removed_root: SafeId) {
    let next_root = registry
        .safes
        .values()
        .filter(|n| n.org == *org && n.tier == Tier::Root)
        .map(|n| n.id)
        .min();

    match next_root {
        None => {
            let leftovers: Vec<SafeId> = registry
                .safes
                .values()
                .filter(|n| n.org == *org)
                .map(|n| n.id)
                .collect();
            for id in leftovers {
                registry.remove_safe(id);
                clear_grants(registry, id);
            }
            registry.orgs.remove(org);
        }
        Some(root) => {
            if let Some(record) = registry.orgs.get_mut(org) {
                if record.root_safe_id == removed_root {
                    record.root_safe_id = root;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ModuleConfig, Role};
    use crate::hashing::org_hash;
    use crate::state::create_initial_registry;

    fn w(v: u64) -> Address {
        Address::from_low_u64(v)
    }

    fn base() -> (Registry, OrgHash) {
        let org = org_hash("Acme");
        let reg = create_initial_registry(ModuleConfig::default());
        let reg = apply_event(
            &reg,
            &ModuleEvent::OrganisationCreated {
                org,
                name: "Acme".to_string(),
                creator: w(10),
                root_safe_id: 1,
                depth_tree_limit: 8,
            },
        )
        .unwrap();
        let reg = apply_event(
            &reg,
            &ModuleEvent::SafeCreated {
                org,
                safe_id: 2,
                creator: w(20),
                super_safe: 1,
                name: "Finance".to_string(),
            },
        )
        .unwrap();
        (reg, org)
    }

    #[test]
    fn input_registry_is_untouched() {
        let (reg, org) = base();
        let before = reg.clone();
        let _ = apply_event(
            &reg,
            &ModuleEvent::SafeRemoved {
                org,
                safe_id: 2,
                remover: w(10),
                super_safe: 1,
                name: "Finance".to_string(),
            },
        )
        .unwrap();
        assert_eq!(reg, before);
    }

    #[test]
    fn lead_slot_replaces_previous_lead() {
        let (reg, org) = base();
        let grant = |user, role, enabled| ModuleEvent::RoleChanged {
            org,
            safe_id: 2,
            role,
            user,
            enabled,
            caller: w(10),
        };
        let reg = apply_event(&reg, &grant(w(77), Role::SafeLead, true)).unwrap();
        let reg = apply_event(&reg, &grant(w(77), Role::SafeLeadModifyOwnersOnly, true)).unwrap();
        assert_eq!(reg.role_grants.len(), 2);

        let reg = apply_event(&reg, &grant(w(88), Role::SafeLeadExecOnBehalfOnly, true)).unwrap();
        assert_eq!(reg.safes[&2].lead, Some(w(88)));
        assert_eq!(reg.role_grants.len(), 1);

        let reg = apply_event(&reg, &grant(w(88), Role::SafeLeadExecOnBehalfOnly, false)).unwrap();
        assert_eq!(reg.safes[&2].lead, None);
        assert!(reg.role_grants.is_empty());
    }

    #[test]
    fn nonce_must_match_authorization() {
        let (reg, org) = base();
        let ev = |nonce| ModuleEvent::OnBehalfAuthorized {
            org,
            executor: w(10),
            super_safe: w(10),
            target_safe: w(20),
            nonce,
        };
        let reg = apply_event(&reg, &ev(0)).unwrap();
        assert_eq!(reg.orgs[&org].nonce, 1);
        assert!(matches!(
            apply_event(&reg, &ev(0)),
            Err(ModuleError::InvariantViolation(_))
        ));
    }

    #[test]
    fn whole_tree_removal_dissolves_single_root_org() {
        let (reg, org) = base();
        let reg = apply_event(
            &reg,
            &ModuleEvent::WholeTreeRemoved {
                org,
                root_safe_id: 1,
                remover: w(10),
                name: "Acme".to_string(),
            },
        )
        .unwrap();
        assert!(reg.orgs.is_empty());
        assert!(reg.safes.is_empty());
        assert!(reg.wallet_index.is_empty());
        assert_eq!(reg.index_id, 2);
    }

    #[test]
    fn wallet_lookups_follow_the_index() {
        let (reg, org) = base();
        assert_eq!(reg.node_by_wallet(w(20)).map(|n| n.id), Some(2));
        assert_eq!(reg.node_in_org(&org, w(20)).map(|n| n.id), Some(2));
        assert!(reg.node_in_org(&org_hash("Other"), w(20)).is_none());

        let reg = apply_event(
            &reg,
            &ModuleEvent::SafeDisconnected {
                org,
                safe_id: 2,
                wallet: w(20),
                disconnector: w(10),
            },
        )
        .unwrap();
        assert!(reg.node_by_wallet(w(20)).is_none());
        assert_eq!(reg.wallet_index.len(), 1);

        // the freed wallet can join again under a new id
        let reg = apply_event(
            &reg,
            &ModuleEvent::SafeCreated {
                org,
                safe_id: 3,
                creator: w(20),
                super_safe: 1,
                name: "Back".to_string(),
            },
        )
        .unwrap();
        assert_eq!(reg.node_by_wallet(w(20)).map(|n| n.id), Some(3));
    }

    #[test]
    fn duplicate_wallet_is_rejected() {
        let (reg, org) = base();
        let err = apply_event(
            &reg,
            &ModuleEvent::SafeCreated {
                org,
                safe_id: 3,
                creator: w(20),
                super_safe: 1,
                name: "Again".to_string(),
            },
        )
        .unwrap_err();
        assert_eq!(err, ModuleError::SafeAlreadyRegistered(w(20)));
    }
}

//! Property tests: any sequence of requests, accepted or rejected,
//! leaves the registry consistent.
//!
//! A rejected request must not change the canonical hash, and an
//! organization nonce never moves backwards.

mod common;

use std::collections::BTreeMap;

use common::{account, transfer, Fixture};
use proptest::prelude::*;
use safe_tree_kernel::invariants::try_validate_invariants;
use safe_tree_kernel::{Address, OrgHash, Role};

const WALLETS: u8 = 6;

#[derive(Debug, Clone)]
enum Op {
    Register { wallet: u8, name: u8 },
    CreateRoot { caller: u8, wallet: u8 },
    Add { wallet: u8, super_id: u64 },
    Remove { caller: u8, id: u64 },
    Disconnect { caller: u8, id: u64 },
    Promote { caller: u8, id: u64 },
    UpdateSuper { caller: u8, id: u64, new_super: u64 },
    SetLead { caller: u8, id: u64, lead: u64, enabled: bool },
    SetLimit { caller: u8, limit: u32 },
    RemoveTree { caller: u8 },
    Exec { caller: u8, target: u8 },
}

fn arb_wallet() -> impl Strategy<Value = u8> {
    1..=WALLETS
}

fn arb_id() -> impl Strategy<Value = u64> {
    0u64..10
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (arb_wallet(), 0u8..2).prop_map(|(wallet, name)| Op::Register { wallet, name }),
        (arb_wallet(), arb_wallet()).prop_map(|(caller, wallet)| Op::CreateRoot { caller, wallet }),
        (arb_wallet(), arb_id()).prop_map(|(wallet, super_id)| Op::Add { wallet, super_id }),
        (arb_wallet(), arb_id()).prop_map(|(caller, id)| Op::Remove { caller, id }),
        (arb_wallet(), arb_id()).prop_map(|(caller, id)| Op::Disconnect { caller, id }),
        (arb_wallet(), arb_id()).prop_map(|(caller, id)| Op::Promote { caller, id }),
        (arb_wallet(), arb_id(), arb_id())
            .prop_map(|(caller, id, new_super)| Op::UpdateSuper { caller, id, new_super }),
        (arb_wallet(), arb_id(), 1u64..3, any::<bool>())
            .prop_map(|(caller, id, lead, enabled)| Op::SetLead { caller, id, lead, enabled }),
        (arb_wallet(), 0u32..6).prop_map(|(caller, limit)| Op::SetLimit { caller, limit }),
        arb_wallet().prop_map(|caller| Op::RemoveTree { caller }),
        (arb_wallet(), arb_wallet()).prop_map(|(caller, target)| Op::Exec { caller, target }),
    ]
}

fn run(fx: &mut Fixture, wallets: &[Address], op: &Op) -> bool {
    let w = |n: u8| wallets[n as usize - 1];
    let m = &mut fx.module;
    let outcome = match *op {
        Op::Register { wallet, name } => {
            let name = if name == 0 { "Acme" } else { "Beta" };
            m.register_org(&fx.host, w(wallet), name).map(|_| ())
        }
        Op::CreateRoot { caller, wallet } => {
            m.create_root_safe(&fx.host, w(caller), w(wallet), "Root").map(|_| ())
        }
        Op::Add { wallet, super_id } => m.add_safe(&fx.host, w(wallet), super_id, "Safe").map(|_| ()),
        Op::Remove { caller, id } => m.remove_safe(w(caller), id),
        Op::Disconnect { caller, id } => m.disconnect_safe(&mut fx.host, w(caller), id),
        Op::Promote { caller, id } => m.promote_root(w(caller), id),
        Op::UpdateSuper { caller, id, new_super } => m.update_super(w(caller), id, new_super),
        Op::SetLead { caller, id, lead, enabled } => {
            m.set_role(w(caller), Role::SafeLead, account(lead), id, enabled)
        }
        Op::SetLimit { caller, limit } => m.update_depth_tree_limit(w(caller), limit),
        Op::RemoveTree { caller } => m.remove_whole_tree(w(caller)),
        Op::Exec { caller, target } => {
            let Ok(org) = fx.module.get_org_hash_by_safe(w(caller)) else {
                return false;
            };
            let tx = transfer(org, w(caller), w(target), account(99), 0);
            fx.exec_signed(w(caller), &tx)
        }
    };
    outcome.is_ok()
}

fn nonces(fx: &Fixture) -> BTreeMap<OrgHash, u64> {
    fx.module
        .registry()
        .orgs
        .iter()
        .map(|(hash, org)| (*hash, org.nonce))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn registry_stays_consistent(ops in prop::collection::vec(arb_op(), 1..40)) {
        let mut fx = Fixture::new();
        let wallets: Vec<Address> = (1..=WALLETS).map(|n| fx.wallet(n)).collect();

        for op in &ops {
            let before_hash = fx.module.canonical_hash();
            let before_seq = fx.module.last_sequence();
            let before_nonces = nonces(&fx);

            let accepted = run(&mut fx, &wallets, op);

            prop_assert!(
                try_validate_invariants(fx.module.registry()).is_ok(),
                "invariants broken after {:?}",
                op
            );
            if !accepted && !matches!(op, Op::Exec { .. }) {
                prop_assert_eq!(&fx.module.canonical_hash(), &before_hash, "rejected {:?} mutated state", op);
                prop_assert_eq!(fx.module.last_sequence(), before_seq);
            }
            for (org, nonce) in nonces(&fx) {
                if let Some(old) = before_nonces.get(&org) {
                    prop_assert!(nonce >= *old, "nonce moved backwards for {}", org);
                }
            }
        }
    }
}

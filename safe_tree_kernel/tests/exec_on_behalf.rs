mod common;

use common::{account, transfer, Fixture, ETHER};
use safe_tree_kernel::hashing::org_hash;
use safe_tree_kernel::memory_wallet::ReentryScript;
use safe_tree_kernel::wallet::SignatureKind;
use safe_tree_kernel::{
    Address, ExecPhase, ModuleError, ModuleEvent, OrgHash, OwnerSignature, Role, WalletHost,
};

/// R(1) -> A(2) -> B(3), with B funded.
fn chain() -> (Fixture, OrgHash, Address, Address, Address) {
    let mut fx = Fixture::new();
    let (r, a, b) = (fx.wallet(1), fx.wallet(2), fx.wallet(3));
    fx.register(r, "Acme");
    fx.add(a, 1, "A");
    fx.add(b, 2, "B");
    fx.host.set_balance(b, 5 * ETHER);
    fx.module.drain_events();
    (fx, org_hash("Acme"), r, a, b)
}

#[test]
fn root_executes_on_behalf_of_grandchild() {
    let (mut fx, org, r, _, b) = chain();
    let to = account(50);
    let tx = transfer(org, r, b, to, ETHER);

    fx.exec_signed(r, &tx).unwrap();

    assert_eq!(fx.module.nonce(&org), Ok(1));
    assert_eq!(fx.host.balance_of(b), 4 * ETHER);
    assert_eq!(fx.host.balance_of(to), ETHER);
    assert_eq!(fx.module.phase(), ExecPhase::Idle);

    let types: Vec<&str> = fx.module.drain_events().iter().map(|e| e.event_type()).collect();
    assert_eq!(types, vec!["on_behalf_authorized", "tx_on_behalf_executed"]);
}

#[test]
fn stale_signature_is_rejected() {
    let (mut fx, org, r, _, b) = chain();
    let tx = transfer(org, r, b, account(50), ETHER);
    let hash = fx.module.get_transaction_hash(&tx, 0);
    let stale = fx.sign(r, &hash);

    fx.module
        .exec_transaction_on_behalf(&mut fx.host, r, &tx, &stale)
        .unwrap();
    assert_eq!(
        fx.module.exec_transaction_on_behalf(&mut fx.host, r, &tx, &stale),
        Err(ModuleError::TxOnBehalfExecutedFailed)
    );
    assert_eq!(fx.module.nonce(&org), Ok(1));
    assert_eq!(fx.host.balance_of(b), 4 * ETHER);
}

#[test]
fn signatures_must_come_from_super_safe_owners() {
    let (mut fx, org, r, _, b) = chain();
    let tx = transfer(org, r, b, account(50), ETHER);
    let hash = fx.module.get_transaction_hash(&tx, 0);

    let foreign = fx.sign(b, &hash);
    assert_eq!(
        fx.module.exec_transaction_on_behalf(&mut fx.host, r, &tx, &foreign),
        Err(ModuleError::TxOnBehalfExecutedFailed)
    );

    let mut partial = fx.sign(r, &hash);
    partial.truncate(1);
    assert_eq!(
        fx.module.exec_transaction_on_behalf(&mut fx.host, r, &tx, &partial),
        Err(ModuleError::TxOnBehalfExecutedFailed)
    );

    // order and duplicates do not matter
    let mut shuffled = fx.sign(r, &hash);
    shuffled.reverse();
    shuffled.push(shuffled[0].clone());
    fx.module
        .exec_transaction_on_behalf(&mut fx.host, r, &tx, &shuffled)
        .unwrap();
    assert_eq!(fx.module.nonce(&org), Ok(1));
}

#[test]
fn approved_hash_counts_as_signature() {
    let (mut fx, org, r, _, b) = chain();
    let tx = transfer(org, r, b, account(50), ETHER);
    let hash = fx.module.get_transaction_hash(&tx, 0);

    let keys = fx.keys(r).to_vec();
    fx.host.approve_hash(r, keys[0].address(), hash);
    let sigs = vec![
        OwnerSignature {
            signer: keys[0].address(),
            kind: SignatureKind::ApprovedHash,
        },
        keys[1].sign(&hash),
    ];
    fx.module
        .exec_transaction_on_behalf(&mut fx.host, r, &tx, &sigs)
        .unwrap();
    assert_eq!(fx.module.nonce(&org), Ok(1));
}

#[test]
fn authority_must_cover_target() {
    let (mut fx, org, r, a, b) = chain();
    let q = fx.wallet(9);
    fx.module.create_root_safe(&fx.host, r, q, "Q").unwrap();
    fx.host.set_balance(a, ETHER);

    // upward
    let up = transfer(org, b, a, account(50), 1);
    assert_eq!(fx.exec_signed(b, &up), Err(ModuleError::NotAuthorizedExecOnBehalf));

    // sibling root
    let across = transfer(org, q, b, account(50), 1);
    assert_eq!(fx.exec_signed(q, &across), Err(ModuleError::NotAuthorizedExecOnBehalf));

    // self
    let own = transfer(org, b, b, account(50), 1);
    assert_eq!(fx.exec_signed(b, &own), Err(ModuleError::NotAuthorizedExecOnBehalf));

    let unknown = transfer(org, r, account(3), account(50), 1);
    assert_eq!(
        fx.exec_signed(r, &unknown),
        Err(ModuleError::SafeNotRegistered(account(3)))
    );
    let other_org = transfer(org_hash("Nope"), r, b, account(50), 1);
    assert_eq!(
        fx.exec_signed(r, &other_org),
        Err(ModuleError::OrgNotRegistered(org_hash("Nope")))
    );
    assert_eq!(fx.module.nonce(&org), Ok(0));

    // direct parent is enough
    fx.exec_signed(a, &transfer(org, a, b, account(50), 1)).unwrap();
    assert_eq!(fx.module.nonce(&org), Ok(1));
}

#[test]
fn exec_lead_needs_no_signatures() {
    let (mut fx, org, r, a, b) = chain();
    let lead = account(7);
    fx.module
        .set_role(r, Role::SafeLeadExecOnBehalfOnly, lead, 3, true)
        .unwrap();

    let tx = transfer(org, a, b, account(50), ETHER);
    fx.module
        .exec_transaction_on_behalf(&mut fx.host, lead, &tx, &[])
        .unwrap();
    assert_eq!(fx.module.nonce(&org), Ok(1));
    assert_eq!(fx.host.balance_of(account(50)), ETHER);

    // lead authority stops at the exact target
    fx.host.set_balance(a, ETHER);
    let parent = transfer(org, r, a, account(50), 1);
    assert_eq!(
        fx.module.exec_transaction_on_behalf(&mut fx.host, lead, &parent, &[]),
        Err(ModuleError::TxOnBehalfExecutedFailed)
    );
}

#[test]
fn owner_only_lead_cannot_execute() {
    let (mut fx, org, r, _, b) = chain();
    let lead = account(7);
    fx.module
        .set_role(r, Role::SafeLeadModifyOwnersOnly, lead, 3, true)
        .unwrap();
    let tx = transfer(org, r, b, account(50), ETHER);
    assert_eq!(
        fx.module.exec_transaction_on_behalf(&mut fx.host, lead, &tx, &[]),
        Err(ModuleError::TxOnBehalfExecutedFailed)
    );
    assert_eq!(fx.module.nonce(&org), Ok(0));
}

#[test]
fn allowlist_and_denylist_gate_targets() {
    let (mut fx, org, r, _, b) = chain();
    let to = account(50);
    let tx = transfer(org, r, b, to, ETHER);

    fx.module.enable_allowlist(r).unwrap();
    assert_eq!(fx.exec_signed(r, &tx), Err(ModuleError::AddresNotAllowed(to)));
    fx.module.add_to_list(r, &[to]).unwrap();
    fx.exec_signed(r, &tx).unwrap();

    fx.module.enable_denylist(r).unwrap();
    assert_eq!(fx.exec_signed(r, &tx), Err(ModuleError::AddressDenied(to)));
    fx.module.drop_from_list(r, to).unwrap();
    fx.exec_signed(r, &tx).unwrap();

    fx.module.disable_deny_helper(r).unwrap();
    fx.exec_signed(r, &tx).unwrap();
    assert_eq!(fx.module.nonce(&org), Ok(3));
}

#[test]
fn failed_inner_call_still_consumes_nonce() {
    let (mut fx, org, r, _, b) = chain();
    let to = account(50);
    fx.host.set_reverting(to);

    assert_eq!(
        fx.exec_signed(r, &transfer(org, r, b, to, ETHER)),
        Err(ModuleError::TxExecutionModuleFailed)
    );
    assert_eq!(fx.module.nonce(&org), Ok(1));
    assert_eq!(fx.host.balance_of(b), 5 * ETHER);
    let last = fx.module.drain_events().pop().map(|e| e.event);
    assert!(matches!(
        last,
        Some(ModuleEvent::TxOnBehalfExecuted { result: false, .. })
    ));

    // overdraft fails the same way
    assert_eq!(
        fx.exec_signed(r, &transfer(org, r, b, account(51), 6 * ETHER)),
        Err(ModuleError::TxExecutionModuleFailed)
    );
    assert_eq!(fx.module.nonce(&org), Ok(2));
}

#[test]
fn reentrant_execution_is_rejected() {
    let (mut fx, org, r, a, b) = chain();
    let tx = transfer(org, r, b, account(50), ETHER);
    let inner = transfer(org, r, a, account(51), 0);
    let inner_hash = fx.module.get_transaction_hash(&inner, 1);
    let signatures = fx.sign(r, &inner_hash);
    fx.host.script_reentry(ReentryScript {
        caller: r,
        tx: inner,
        signatures,
    });

    fx.exec_signed(r, &tx).unwrap();
    assert_eq!(fx.host.take_reentry_results(), vec![Err(ModuleError::ReentrantCall)]);
    assert_eq!(fx.module.nonce(&org), Ok(1));
    assert_eq!(fx.module.phase(), ExecPhase::Idle);
    assert_eq!(fx.host.executed_calls().len(), 1);
}

#[test]
fn owners_are_managed_from_above() {
    let (mut fx, org, r, a, b) = chain();
    let newcomer = account(30);
    let seq = fx.module.last_sequence();

    assert_eq!(
        fx.module.add_owner_with_threshold(&mut fx.host, b, &org, a, newcomer, 1),
        Err(ModuleError::NotAuthorizedAddOwnerWithThreshold)
    );
    fx.module
        .add_owner_with_threshold(&mut fx.host, r, &org, b, newcomer, 2)
        .unwrap();
    assert!(fx.host.is_owner(b, newcomer));
    assert_eq!(fx.host.owners(b).len(), 3);
    assert_eq!(
        fx.module.add_owner_with_threshold(&mut fx.host, a, &org, b, newcomer, 2),
        Err(ModuleError::OwnerAlreadyExists)
    );
    assert_eq!(
        fx.module.add_owner_with_threshold(&mut fx.host, a, &org, b, account(31), 9),
        Err(ModuleError::TxExecutionModuleFailed)
    );

    assert_eq!(
        fx.module.remove_owner(&mut fx.host, b, &org, a, newcomer, 1),
        Err(ModuleError::NotAuthorizedRemoveOwner)
    );
    assert_eq!(
        fx.module.remove_owner(&mut fx.host, r, &org, b, account(31), 1),
        Err(ModuleError::OwnerNotFound)
    );
    fx.module
        .remove_owner(&mut fx.host, a, &org, b, newcomer, 2)
        .unwrap();
    assert!(!fx.host.is_owner(b, newcomer));

    assert_eq!(fx.module.last_sequence(), seq);
}

#[test]
fn owner_lead_manages_owners_of_its_safe() {
    let (mut fx, org, r, a, b) = chain();
    let lead = account(7);
    fx.module
        .set_role(r, Role::SafeLeadModifyOwnersOnly, lead, 3, true)
        .unwrap();

    fx.module
        .add_owner_with_threshold(&mut fx.host, lead, &org, b, account(30), 1)
        .unwrap();
    assert_eq!(
        fx.module.add_owner_with_threshold(&mut fx.host, lead, &org, a, account(30), 1),
        Err(ModuleError::NotAuthorizedAddOwnerWithThreshold)
    );
}

//! SafeTree v1 - Allow/Deny List
//!
//! Per-organization target policy backed by a sentinel-headed linked
//! list. New members are inserted at the head.

use crate::domain::{AccountList, DenyHelperMode, Organization};
use crate::error::ModuleError;
use crate::primitives::{validate_account, Address};

pub fn is_listed(list: &AccountList, account: Address) -> bool {
    account != Address::SENTINEL && list.next.contains_key(&account)
}

/// Members in list order (head first).
pub fn members(list: &AccountList) -> Vec<Address> {
    let mut out = Vec::new();
    let mut current = list.next.get(&Address::SENTINEL).copied();
    while let Some(account) = current {
        if account == Address::SENTINEL || out.len() as u64 > list.count {
            break;
        }
        out.push(account);
        current = list.next.get(&account).copied();
    }
    out
}

/// Predecessor of `account`; `SENTINEL` for the head or a non-member.
pub fn prev_user(list: &AccountList, account: Address) -> Address {
    let mut prev = Address::SENTINEL;
    for member in members(list) {
        if member == account {
            return prev;
        }
        prev = member;
    }
    Address::SENTINEL
}

/// Validate a batch insertion without touching the list.
pub fn check_add(org: &Organization, users: &[Address]) -> Result<(), ModuleError> {
    if users.is_empty() {
        return Err(ModuleError::ZeroAddressProvided);
    }
    if org.deny_helper == DenyHelperMode::Disabled {
        return Err(ModuleError::DenyHelpersDisabled);
    }
    for (i, user) in users.iter().enumerate() {
        if user.is_zero() {
            return Err(ModuleError::InvalidAddressProvided(*user));
        }
        validate_account(*user)?;
        if is_listed(&org.listed, *user) || users[..i].contains(user) {
            return Err(ModuleError::UserAlreadyOnList(*user));
        }
    }
    Ok(())
}

/// Validate a removal without touching the list.
pub fn check_drop(org: &Organization, user: Address) -> Result<(), ModuleError> {
    if org.deny_helper == DenyHelperMode::Disabled {
        return Err(ModuleError::DenyHelpersDisabled);
    }
    if org.listed.count == 0 {
        return Err(ModuleError::ListEmpty);
    }
    if !is_listed(&org.listed, user) {
        return Err(ModuleError::InvalidAddressProvided(user));
    }
    Ok(())
}

pub fn insert(list: &mut AccountList, account: Address) {
    let head = list
        .next
        .get(&Address::SENTINEL)
        .copied()
        .unwrap_or(Address::SENTINEL);
    list.next.insert(account, head);
    list.next.insert(Address::SENTINEL, account);
    list.count += 1;
}

pub fn remove(list: &mut AccountList, account: Address) {
    if !is_listed(list, account) {
        return;
    }
    let prev = prev_user(list, account);
    let after = list.next.remove(&account).unwrap_or(Address::SENTINEL);
    list.count = list.count.saturating_sub(1);
    if prev == Address::SENTINEL && after == Address::SENTINEL {
        list.next.remove(&Address::SENTINEL);
    } else {
        list.next.insert(prev, after);
    }
}

/// Target policy gate of the on-behalf protocol.
pub fn check_target(org: &Organization, to: Address) -> Result<(), ModuleError> {
    match org.deny_helper {
        DenyHelperMode::Disabled => Ok(()),
        DenyHelperMode::Allowlist if !is_listed(&org.listed, to) => {
            Err(ModuleError::AddresNotAllowed(to))
        }
        DenyHelperMode::Denylist if is_listed(&org.listed, to) => {
            Err(ModuleError::AddressDenied(to))
        }
        _ => Ok(()),
    }
}

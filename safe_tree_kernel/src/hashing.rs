//! SafeTree v1 - Hashing and Wire Format
//!
//! Two jobs, both byte-exact across implementations:
//!
//!   - the on-behalf transaction hash that signers sign
//!     (typed-data layout, SHA-256 throughout, see `encode_transaction_data`)
//!   - the canonical registry serialization used for replay and snapshot
//!     identity (strict field order, no whitespace, no floats)

use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use crate::domain::{OnBehalfTransaction, Registry};
use crate::lists;
use crate::primitives::{word_u64, word_u128, Address, Hash32, OrgHash};
use crate::WIRE_VERSION;

/// Type string bound into the domain separator.
pub const DOMAIN_SEPARATOR_TYPE: &str =
    "EIP712Domain(uint256 chainId,address verifyingContract)";

/// Type string of the signed on-behalf transaction.
pub const TX_ON_BEHALF_TYPE: &str = "ExecTransactionOnBehalf(bytes32 org,address superSafe,address targetSafe,address to,uint256 value,bytes data,uint8 operation,uint256 _nonce)";

pub fn sha256(bytes: &[u8]) -> Hash32 {
    Hash32::new(Sha256::digest(bytes).into())
}

/// Organization id: SHA-256 over the UTF-8 name bytes.
pub fn org_hash(name: &str) -> OrgHash {
    sha256(name.as_bytes())
}

// ---------------------------------------------------------------------------
// Transaction hash
// ---------------------------------------------------------------------------

/// `SHA256(typeHash || word(chainId) || word(module))`
pub fn domain_separator(chain_id: u64, module: Address) -> Hash32 {
    let type_hash = sha256(DOMAIN_SEPARATOR_TYPE.as_bytes());
    let mut buf = Vec::with_capacity(96);
    buf.extend_from_slice(type_hash.as_bytes());
    buf.extend_from_slice(&word_u64(chain_id));
    buf.extend_from_slice(&module.to_word());
    sha256(&buf)
}

/// Struct hash of one on-behalf transaction at `nonce`.
///
/// Field order: typeHash, org, superSafe, targetSafe, to, value,
/// SHA256(data), operation, nonce. One 32-byte word each.
pub fn transaction_struct_hash(tx: &OnBehalfTransaction, nonce: u64) -> Hash32 {
    let type_hash = sha256(TX_ON_BEHALF_TYPE.as_bytes());
    let mut buf = Vec::with_capacity(32 * 9);
    buf.extend_from_slice(type_hash.as_bytes());
    buf.extend_from_slice(tx.org.as_bytes());
    buf.extend_from_slice(&tx.super_safe.to_word());
    buf.extend_from_slice(&tx.target_safe.to_word());
    buf.extend_from_slice(&tx.to.to_word());
    buf.extend_from_slice(&word_u128(tx.value));
    buf.extend_from_slice(sha256(&tx.data).as_bytes());
    buf.extend_from_slice(&word_u64(tx.operation.as_u8() as u64));
    buf.extend_from_slice(&word_u64(nonce));
    sha256(&buf)
}

/// `0x19 || 0x01 || domainSeparator || structHash` (66 bytes).
pub fn encode_transaction_data(
    domain_separator: &Hash32,
    tx: &OnBehalfTransaction,
    nonce: u64,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(66);
    out.push(0x19);
    out.push(0x01);
    out.extend_from_slice(domain_separator.as_bytes());
    out.extend_from_slice(transaction_struct_hash(tx, nonce).as_bytes());
    out
}

/// The hash signers sign.
pub fn get_transaction_hash(
    domain_separator: &Hash32,
    tx: &OnBehalfTransaction,
    nonce: u64,
) -> Hash32 {
    sha256(&encode_transaction_data(domain_separator, tx, nonce))
}

// ---------------------------------------------------------------------------
// Canonical registry serialization
// ---------------------------------------------------------------------------

/// Canonical UTF-8 JSON of the registry. Deterministic field order,
/// `wire_version` first.
pub fn canonical_serialize(registry: &Registry) -> Vec<u8> {
    build_canonical_value(registry).to_string().into_bytes()
}

/// SHA-256 of the canonical serialization. Lowercase hex, no prefix.
pub fn canonical_hash(registry: &Registry) -> String {
    sha256(&canonical_serialize(registry)).to_hex()
}

/// Field order: wire_version, config, organizations, safes,
///              role_grants, index_id
///
/// `wallet_index` is derived from `safes` and left out.
fn build_canonical_value(registry: &Registry) -> Value {
    let c = &registry.config;
    let config = json!({
        "chain_id": c.chain_id,
        "module_address": c.module_address.to_string(),
        "guard_address": c.guard_address.to_string(),
        "default_depth_tree_limit": c.default_depth_tree_limit,
        "max_depth_tree_limit": c.max_depth_tree_limit,
    });

    // BTreeMap iteration is already sorted by org hash / safe id.
    let orgs: Vec<Value> = registry
        .orgs
        .values()
        .map(|o| {
            let listed: Vec<Value> = lists::members(&o.listed)
                .into_iter()
                .map(|a| Value::String(a.to_string()))
                .collect();
            json!({
                "org_hash": o.org_hash.to_string(),
                "name": o.name,
                "root_safe_id": o.root_safe_id,
                "depth_tree_limit": o.depth_tree_limit,
                "nonce": o.nonce,
                "deny_helper": o.deny_helper,
                "listed": listed,
            })
        })
        .collect();

    let safes: Vec<Value> = registry
        .safes
        .values()
        .map(|n| {
            json!({
                "id": n.id,
                "org": n.org.to_string(),
                "tier": n.tier,
                "name": n.name,
                "lead": n.lead.map(|l| l.to_string()),
                "wallet": n.wallet.to_string(),
                "super_safe": n.super_safe,
            })
        })
        .collect();

    let grants: Vec<Value> = registry
        .role_grants
        .iter()
        .map(|g| {
            json!({
                "role": g.role,
                "account": g.account.to_string(),
                "safe_id": g.safe_id,
            })
        })
        .collect();

    let mut root = Map::new();
    root.insert("wire_version".to_string(), Value::from(WIRE_VERSION));
    root.insert("config".to_string(), config);
    root.insert("organizations".to_string(), Value::Array(orgs));
    root.insert("safes".to_string(), Value::Array(safes));
    root.insert("role_grants".to_string(), Value::Array(grants));
    root.insert("index_id".to_string(), Value::from(registry.index_id));
    Value::Object(root)
}

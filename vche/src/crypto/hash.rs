use sha2::{Digest, Sha256};

use crate::tag::Tag;
use crate::types::Hash;

const KEY_ID_DOMAIN: &[u8] = b"vche_key_id_v1";

/// Identifier of a PRF key: SHA-256("vche_key_id_v1" || k1 || k2).
pub fn hash_key_id(k1: &[u8; 32], k2: &[u8; 32]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(KEY_ID_DOMAIN);
    hasher.update(k1);
    hasher.update(k2);
    hasher.finalize().into()
}

/// Domain-separated tag digest: SHA-256(0x10 || key_id || prf_output).
pub fn hash_tag_digest(key_id: &Hash, prf_output: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update([0x10]);
    hasher.update(key_id);
    hasher.update(prf_output);
    hasher.finalize().into()
}

/// Domain-separated operation step: SHA-256(0x20 || op || operands... || param).
/// Unkeyed: anyone holding the operand digests can recompute it.
pub fn hash_op_step(op_code: u8, operands: &[&Hash], param: u64) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update([0x20, op_code]);
    for operand in operands {
        hasher.update(operand);
    }
    hasher.update(param.to_be_bytes());
    hasher.finalize().into()
}

/// Digest of an index-tag vector: SHA-256(0x30 || key_id || len || (len || label)...).
pub fn hash_index_tags(key_id: &Hash, tags: &[Tag]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update([0x30]);
    hasher.update(key_id);
    hasher.update((tags.len() as u64).to_be_bytes());
    for tag in tags {
        hasher.update((tag.label().len() as u64).to_be_bytes());
        hasher.update(tag.label());
    }
    hasher.finalize().into()
}

//! Hash-committed replication scheme.
//!
//! Every logical slot is replicated λ times. A secret half of the replica
//! positions (the [`DummySet`]) carries PRF values of the slot's tag instead
//! of the message; the server cannot tell which. The verification track
//! evaluates the same circuit over the PRF values alone, so after decryption
//! the dummy replicas must equal the verification values and the remaining
//! replicas must agree with each other.
//!
//! A corrupted result is accepted only if the server changed exactly the
//! message replicas of a slot, which means guessing the dummy set: at most
//! `1 / C(λ, λ/2)`. With λ = 1 there is no dummy at all, so the scheme needs
//! λ ≥ [`MIN_REPLICATIONS`].
//!
//! Both tracks also carry one 32-byte digest per logical slot, replaced on
//! every operation by an unkeyed hash over the operation code, the operand
//! digests and the operation parameter. It flags an honest-but-buggy server
//! that replays a different trace; a malicious server can recompute it, so
//! it adds nothing to the bound above.

use std::collections::BTreeSet;

use rand::seq::index;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::crypto::hash::hash_op_step;
use crate::crypto::prf::{PrfKey, PrfMode};
use crate::error::{Result, VcheError};
use crate::eval::Op;
use crate::params::Parameters;
use crate::types::Hash;

pub mod encoder;
pub mod evaluator;

pub use encoder::{decrypt_tagged, encrypt_tagged, ReplicatedEncoder};
pub use evaluator::{
    ReplicatedCiphertextEvaluator, TaggedCompressed, TaggedCompressedEvaluator, TaggedPoly,
    TaggedPolyEvaluator,
};

/// Fewest replicas per logical slot that leave one dummy to check.
pub const MIN_REPLICATIONS: usize = 2;

/// Secret replica positions holding PRF values rather than the message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DummySet {
    positions: BTreeSet<usize>,
    replications: usize,
}

impl DummySet {
    /// Choose `replications / 2` of the `replications` positions uniformly.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R, replications: usize) -> Result<Self> {
        if replications < MIN_REPLICATIONS {
            return Err(VcheError::InvalidParameters(format!(
                "replicated scheme needs at least {MIN_REPLICATIONS} replications, got {replications}"
            )));
        }
        let positions = index::sample(rng, replications, replications / 2)
            .into_iter()
            .collect();
        Ok(Self {
            positions,
            replications,
        })
    }

    pub fn contains(&self, replica: usize) -> bool {
        self.positions.contains(&replica)
    }

    pub fn replications(&self) -> usize {
        self.replications
    }
}

/// Client secret of the replicated scheme.
#[derive(Clone, Debug)]
pub struct ReplicatedKey {
    pub prf: PrfKey,
    pub dummies: DummySet,
    pub mode: PrfMode,
}

impl ReplicatedKey {
    pub fn generate<R: RngCore + CryptoRng>(
        rng: &mut R,
        params: &Parameters,
        mode: PrfMode,
    ) -> Result<Self> {
        let prf = PrfKey::generate(rng)?;
        let dummies = DummySet::generate(rng, params.replications())?;
        Ok(Self { prf, dummies, mode })
    }
}

/// Physical slot values plus per-logical-slot digests, before encryption or
/// after decryption.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedPlaintext {
    pub slots: Vec<u64>,
    pub digests: Vec<Hash>,
}

/// A backend ciphertext carrying the digest chain of its logical slots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedCiphertext<C> {
    pub ct: C,
    pub digests: Vec<Hash>,
}

/// Advance the digest chain of every logical slot through `op`; records the
/// trace, authenticates nothing.
pub(crate) fn chain_digests(op: Op, operands: &[&[Hash]]) -> Result<Vec<Hash>> {
    let width = operands.first().map(|d| d.len()).unwrap_or(0);
    if let Some(other) = operands.iter().find(|d| d.len() != width) {
        return Err(VcheError::shape(format!(
            "digest vectors of width {width} and {}",
            other.len()
        )));
    }
    Ok((0..width)
        .map(|i| {
            let slot: Vec<&Hash> = operands.iter().map(|d| &d[i]).collect();
            hash_op_step(op.code(), &slot, op.param())
        })
        .collect())
}

//! The homomorphic encryption scheme, consumed as an opaque capability.
//!
//! Follows the backend-trait pattern used for IVC and encryption backends:
//! protocol code is generic over [`HomomorphicBackend`], and a transparent
//! test double ([`toy::ToyBfv`]) lets the whole protocol run without a
//! lattice library.

use std::fmt::Debug;

use rand::{CryptoRng, RngCore};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::params::Parameters;

pub mod toy;

/// A batched, additively and multiplicatively homomorphic scheme over Z_T slots.
///
/// Shape rules every implementation enforces:
/// - `add` needs operands of equal degree and width;
/// - `mul` needs two degree-1 operands and returns degree 2;
/// - rotations need a degree-1 operand and a key generated for the step.
pub trait HomomorphicBackend: Send + Sync {
    type Plaintext: Clone + Debug + Send + Sync;
    type Ciphertext: Clone + Debug + Send + Sync + Serialize + DeserializeOwned;
    type SecretKey: Send + Sync;
    /// Relinearization and rotation keys; safe to hand to the server.
    type EvaluationKey: Send + Sync;

    fn params(&self) -> &Parameters;

    fn keygen<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Self::SecretKey;

    /// Relinearization key plus rotation keys for `column_steps` (physical
    /// steps) and, when `rows` is set, for row rotation.
    fn gen_evaluation_key(
        &self,
        sk: &Self::SecretKey,
        column_steps: &[usize],
        rows: bool,
    ) -> Result<Self::EvaluationKey>;

    /// Encode up to `slots` residues; shorter inputs are zero-padded.
    fn encode(&self, values: &[u64]) -> Result<Self::Plaintext>;

    fn decode(&self, plaintext: &Self::Plaintext) -> Vec<u64>;

    fn encrypt<R: RngCore + CryptoRng>(
        &self,
        plaintext: &Self::Plaintext,
        sk: &Self::SecretKey,
        rng: &mut R,
    ) -> Self::Ciphertext;

    fn decrypt(&self, ct: &Self::Ciphertext, sk: &Self::SecretKey) -> Result<Self::Plaintext>;

    /// Number of key powers a ciphertext needs minus one (1 when canonical).
    fn degree(&self, ct: &Self::Ciphertext) -> usize;

    fn neg(&self, ct: &Self::Ciphertext) -> Self::Ciphertext;

    fn add(&self, a: &Self::Ciphertext, b: &Self::Ciphertext) -> Result<Self::Ciphertext>;

    fn mul(&self, a: &Self::Ciphertext, b: &Self::Ciphertext) -> Result<Self::Ciphertext>;

    fn add_plain(&self, a: &Self::Ciphertext, pt: &Self::Plaintext) -> Result<Self::Ciphertext>;

    fn mul_plain(&self, a: &Self::Ciphertext, pt: &Self::Plaintext) -> Result<Self::Ciphertext>;

    fn mul_scalar(&self, a: &Self::Ciphertext, scalar: u64) -> Self::Ciphertext;

    fn relinearize(
        &self,
        ct: &Self::Ciphertext,
        evk: &Self::EvaluationKey,
    ) -> Result<Self::Ciphertext>;

    /// Rotate both rows left by `step` physical columns.
    fn rotate_columns(
        &self,
        ct: &Self::Ciphertext,
        step: usize,
        evk: &Self::EvaluationKey,
    ) -> Result<Self::Ciphertext>;

    fn rotate_rows(
        &self,
        ct: &Self::Ciphertext,
        evk: &Self::EvaluationKey,
    ) -> Result<Self::Ciphertext>;
}

/// Physical column steps `1, 2, 4, … < slots / 2` used by [`inner_sum`].
pub fn inner_sum_steps(params: &Parameters) -> Vec<usize> {
    let mut steps = Vec::new();
    let mut k = 1;
    while k < params.row_width() {
        steps.push(k);
        k <<= 1;
    }
    steps
}

/// Sum of all physical slots, replicated into every slot.
///
/// Needs rotation keys for [`inner_sum_steps`] and for row rotation.
pub fn inner_sum<B: HomomorphicBackend>(
    backend: &B,
    ct: &B::Ciphertext,
    evk: &B::EvaluationKey,
) -> Result<B::Ciphertext> {
    let mut acc = ct.clone();
    for step in inner_sum_steps(backend.params()) {
        let rotated = backend.rotate_columns(&acc, step, evk)?;
        acc = backend.add(&acc, &rotated)?;
    }
    let swapped = backend.rotate_rows(&acc, evk)?;
    backend.add(&acc, &swapped)
}

#[cfg(test)]
mod tests {
    use super::toy::ToyBfv;
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn inner_sum_steps_cover_row() {
        let params = Parameters::new(16, 65537, 1).unwrap();
        assert_eq!(inner_sum_steps(&params), vec![1, 2, 4]);
        let params = Parameters::new(2, 65537, 1).unwrap();
        assert!(inner_sum_steps(&params).is_empty());
    }

    #[test]
    fn inner_sum_totals_every_slot() {
        let mut rng = StdRng::seed_from_u64(42);
        let params = Parameters::new(16, 65537, 1).unwrap();
        let backend = ToyBfv::new(params);
        let sk = backend.keygen(&mut rng);
        let evk = backend
            .gen_evaluation_key(&sk, &inner_sum_steps(&params), true)
            .unwrap();

        let values: Vec<u64> = (1..=16).collect();
        let ct = backend.encrypt(&backend.encode(&values).unwrap(), &sk, &mut rng);
        let summed = inner_sum(&backend, &ct, &evk).unwrap();
        let out = backend.decode(&backend.decrypt(&summed, &sk).unwrap());
        assert!(out.iter().all(|&x| x == 136));
    }

    #[test]
    fn inner_sum_without_row_key_fails() {
        let mut rng = StdRng::seed_from_u64(42);
        let params = Parameters::new(8, 65537, 1).unwrap();
        let backend = ToyBfv::new(params);
        let sk = backend.keygen(&mut rng);
        let evk = backend
            .gen_evaluation_key(&sk, &inner_sum_steps(&params), false)
            .unwrap();
        let ct = backend.encrypt(&backend.encode(&[1, 2]).unwrap(), &sk, &mut rng);
        assert!(inner_sum(&backend, &ct, &evk).is_err());
    }
}

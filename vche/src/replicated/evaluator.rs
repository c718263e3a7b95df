use serde::{Deserialize, Serialize};

use crate::backend::HomomorphicBackend;
use crate::compressed::{CompressedEvaluator, CompressedVerification};
use crate::crypto::modular;
use crate::error::{Result, VcheError};
use crate::eval::{Evaluator, Op};
use crate::params::Parameters;
use crate::replicated::{chain_digests, TaggedCiphertext};
use crate::slots;
use crate::types::Hash;

/// Ciphertext track: backend operations plus the digest chain.
pub struct ReplicatedCiphertextEvaluator<'a, B: HomomorphicBackend> {
    backend: &'a B,
    evk: &'a B::EvaluationKey,
}

impl<'a, B: HomomorphicBackend> ReplicatedCiphertextEvaluator<'a, B> {
    pub fn new(backend: &'a B, evk: &'a B::EvaluationKey) -> Self {
        Self { backend, evk }
    }

    fn tagged(
        &self,
        op: Op,
        ct: B::Ciphertext,
        operands: &[&TaggedCiphertext<B::Ciphertext>],
    ) -> Result<TaggedCiphertext<B::Ciphertext>> {
        let digests: Vec<&[Hash]> = operands.iter().map(|o| o.digests.as_slice()).collect();
        Ok(TaggedCiphertext {
            ct,
            digests: chain_digests(op, &digests)?,
        })
    }
}

impl<B: HomomorphicBackend> Evaluator for ReplicatedCiphertextEvaluator<'_, B> {
    type Value = TaggedCiphertext<B::Ciphertext>;

    fn neg(&self, a: &Self::Value) -> Result<Self::Value> {
        self.tagged(Op::Neg, self.backend.neg(&a.ct), &[a])
    }

    fn add(&self, a: &Self::Value, b: &Self::Value) -> Result<Self::Value> {
        self.tagged(Op::Add, self.backend.add(&a.ct, &b.ct)?, &[a, b])
    }

    fn mul(&self, a: &Self::Value, b: &Self::Value) -> Result<Self::Value> {
        self.tagged(Op::Mul, self.backend.mul(&a.ct, &b.ct)?, &[a, b])
    }

    fn relinearize(&self, a: &Self::Value) -> Result<Self::Value> {
        self.tagged(
            Op::Relinearize,
            self.backend.relinearize(&a.ct, self.evk)?,
            &[a],
        )
    }

    fn rotate_columns(&self, a: &Self::Value, step: usize) -> Result<Self::Value> {
        let physical = self.backend.params().physical_step(step);
        let ct = self.backend.rotate_columns(&a.ct, physical, self.evk)?;
        self.tagged(Op::RotateColumns(step), ct, &[a])
    }

    fn rotate_rows(&self, a: &Self::Value) -> Result<Self::Value> {
        let ct = self.backend.rotate_rows(&a.ct, self.evk)?;
        self.tagged(Op::RotateRows, ct, &[a])
    }
}

/// Verification track in direct mode: PRF values of every physical slot,
/// evaluated in the clear, plus the digest chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedPoly {
    pub values: Vec<u64>,
    pub digests: Vec<Hash>,
    pub key_id: Hash,
}

pub struct TaggedPolyEvaluator {
    params: Parameters,
}

impl TaggedPolyEvaluator {
    pub fn new(params: Parameters) -> Self {
        Self { params }
    }

    fn check(&self, a: &TaggedPoly) -> Result<()> {
        if a.values.len() != self.params.slots() {
            return Err(VcheError::shape(format!(
                "verification width {} does not match slot count {}",
                a.values.len(),
                self.params.slots()
            )));
        }
        Ok(())
    }

    fn unary(&self, op: Op, a: &TaggedPoly, values: Vec<u64>) -> Result<TaggedPoly> {
        self.check(a)?;
        Ok(TaggedPoly {
            values,
            digests: chain_digests(op, &[a.digests.as_slice()])?,
            key_id: a.key_id,
        })
    }

    fn binary(
        &self,
        op: Op,
        a: &TaggedPoly,
        b: &TaggedPoly,
        f: impl Fn(&[u64], &[u64], u64) -> Vec<u64>,
    ) -> Result<TaggedPoly> {
        self.check(a)?;
        self.check(b)?;
        if a.key_id != b.key_id {
            return Err(VcheError::KeyMismatch);
        }
        Ok(TaggedPoly {
            values: f(&a.values, &b.values, self.params.plaintext_modulus()),
            digests: chain_digests(op, &[a.digests.as_slice(), b.digests.as_slice()])?,
            key_id: a.key_id,
        })
    }
}

impl Evaluator for TaggedPolyEvaluator {
    type Value = TaggedPoly;

    fn neg(&self, a: &TaggedPoly) -> Result<TaggedPoly> {
        let values = modular::neg_slots(&a.values, self.params.plaintext_modulus());
        self.unary(Op::Neg, a, values)
    }

    fn add(&self, a: &TaggedPoly, b: &TaggedPoly) -> Result<TaggedPoly> {
        self.binary(Op::Add, a, b, modular::add_slots)
    }

    fn mul(&self, a: &TaggedPoly, b: &TaggedPoly) -> Result<TaggedPoly> {
        self.binary(Op::Mul, a, b, modular::mul_slots)
    }

    fn relinearize(&self, a: &TaggedPoly) -> Result<TaggedPoly> {
        self.unary(Op::Relinearize, a, a.values.clone())
    }

    fn rotate_columns(&self, a: &TaggedPoly, step: usize) -> Result<TaggedPoly> {
        let values = slots::rotate_columns(&a.values, self.params.physical_step(step));
        self.unary(Op::RotateColumns(step), a, values)
    }

    fn rotate_rows(&self, a: &TaggedPoly) -> Result<TaggedPoly> {
        self.unary(Op::RotateRows, a, slots::rotate_rows(&a.values))
    }
}

/// Verification track in closed-form mode: a slot-count-independent object
/// plus the digest chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedCompressed {
    pub object: CompressedVerification,
    pub digests: Vec<Hash>,
}

pub struct TaggedCompressedEvaluator {
    inner: CompressedEvaluator,
}

impl TaggedCompressedEvaluator {
    pub fn new(params: Parameters) -> Self {
        Self {
            inner: CompressedEvaluator::new(params),
        }
    }

    fn wrap(
        op: Op,
        object: CompressedVerification,
        operands: &[&TaggedCompressed],
    ) -> Result<TaggedCompressed> {
        let digests: Vec<&[Hash]> = operands.iter().map(|o| o.digests.as_slice()).collect();
        Ok(TaggedCompressed {
            object,
            digests: chain_digests(op, &digests)?,
        })
    }
}

impl Evaluator for TaggedCompressedEvaluator {
    type Value = TaggedCompressed;

    fn neg(&self, a: &TaggedCompressed) -> Result<TaggedCompressed> {
        Self::wrap(Op::Neg, self.inner.neg(&a.object)?, &[a])
    }

    fn add(&self, a: &TaggedCompressed, b: &TaggedCompressed) -> Result<TaggedCompressed> {
        Self::wrap(Op::Add, self.inner.add(&a.object, &b.object)?, &[a, b])
    }

    fn mul(&self, a: &TaggedCompressed, b: &TaggedCompressed) -> Result<TaggedCompressed> {
        Self::wrap(Op::Mul, self.inner.mul(&a.object, &b.object)?, &[a, b])
    }

    fn relinearize(&self, a: &TaggedCompressed) -> Result<TaggedCompressed> {
        Self::wrap(Op::Relinearize, self.inner.relinearize(&a.object)?, &[a])
    }

    fn rotate_columns(&self, a: &TaggedCompressed, step: usize) -> Result<TaggedCompressed> {
        Self::wrap(
            Op::RotateColumns(step),
            self.inner.rotate_columns(&a.object, step)?,
            &[a],
        )
    }

    fn rotate_rows(&self, a: &TaggedCompressed) -> Result<TaggedCompressed> {
        Self::wrap(Op::RotateRows, self.inner.rotate_rows(&a.object)?, &[a])
    }
}

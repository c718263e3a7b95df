use crate::backend::HomomorphicBackend;
use crate::crypto::modular;
use crate::error::{Result, VcheError};
use crate::eval::Evaluator;
use crate::params::Parameters;
use crate::polynomial::{PolyCiphertext, PolyVerification};
use crate::slots;

/// Ciphertext track: an outer polynomial of backend ciphertexts.
pub struct PolyCiphertextEvaluator<'a, B: HomomorphicBackend> {
    backend: &'a B,
    evk: &'a B::EvaluationKey,
}

impl<'a, B: HomomorphicBackend> PolyCiphertextEvaluator<'a, B> {
    pub fn new(backend: &'a B, evk: &'a B::EvaluationKey) -> Self {
        Self { backend, evk }
    }

    fn each(
        &self,
        a: &PolyCiphertext<B::Ciphertext>,
        f: impl Fn(&B::Ciphertext) -> Result<B::Ciphertext>,
    ) -> Result<PolyCiphertext<B::Ciphertext>> {
        Ok(PolyCiphertext {
            components: a.components.iter().map(f).collect::<Result<_>>()?,
        })
    }
}

fn check_nonempty<C>(a: &PolyCiphertext<C>) -> Result<()> {
    if a.components.is_empty() {
        return Err(VcheError::shape("outer polynomial has no components"));
    }
    Ok(())
}

impl<B: HomomorphicBackend> Evaluator for PolyCiphertextEvaluator<'_, B> {
    type Value = PolyCiphertext<B::Ciphertext>;

    fn neg(&self, a: &Self::Value) -> Result<Self::Value> {
        self.each(a, |c| Ok(self.backend.neg(c)))
    }

    /// Componentwise; the shorter operand is implicitly zero-padded.
    fn add(&self, a: &Self::Value, b: &Self::Value) -> Result<Self::Value> {
        check_nonempty(a)?;
        check_nonempty(b)?;
        let len = a.components.len().max(b.components.len());
        let components = (0..len)
            .map(|k| match (a.components.get(k), b.components.get(k)) {
                (Some(x), Some(y)) => self.backend.add(x, y),
                (Some(x), None) | (None, Some(x)) => Ok(x.clone()),
                (None, None) => Err(VcheError::shape("outer polynomial index out of range")),
            })
            .collect::<Result<_>>()?;
        Ok(PolyCiphertext { components })
    }

    /// Convolution of the outer polynomials.
    fn mul(&self, a: &Self::Value, b: &Self::Value) -> Result<Self::Value> {
        check_nonempty(a)?;
        check_nonempty(b)?;
        let len = a.components.len() + b.components.len() - 1;
        let mut components: Vec<Option<B::Ciphertext>> = vec![None; len];
        for (i, x) in a.components.iter().enumerate() {
            for (j, y) in b.components.iter().enumerate() {
                let product = self.backend.mul(x, y)?;
                components[i + j] = Some(match components[i + j].take() {
                    Some(acc) => self.backend.add(&acc, &product)?,
                    None => product,
                });
            }
        }
        Ok(PolyCiphertext {
            components: components
                .into_iter()
                .map(|c| c.ok_or_else(|| VcheError::shape("empty convolution term")))
                .collect::<Result<_>>()?,
        })
    }

    fn relinearize(&self, a: &Self::Value) -> Result<Self::Value> {
        self.each(a, |c| self.backend.relinearize(c, self.evk))
    }

    fn rotate_columns(&self, a: &Self::Value, step: usize) -> Result<Self::Value> {
        let physical = self.backend.params().physical_step(step);
        self.each(a, |c| self.backend.rotate_columns(c, physical, self.evk))
    }

    fn rotate_rows(&self, a: &Self::Value) -> Result<Self::Value> {
        self.each(a, |c| self.backend.rotate_rows(c, self.evk))
    }
}

/// Verification track: the PRF values of every slot evaluated in the clear,
/// with the outer degree the ciphertext track should have reached.
pub struct PolyVerificationEvaluator {
    params: Parameters,
}

impl PolyVerificationEvaluator {
    pub fn new(params: Parameters) -> Self {
        Self { params }
    }

    fn check(&self, a: &PolyVerification) -> Result<()> {
        if a.values.len() != self.params.slots() {
            return Err(VcheError::shape(format!(
                "verification width {} does not match slot count {}",
                a.values.len(),
                self.params.slots()
            )));
        }
        Ok(())
    }

    fn check_pair(&self, a: &PolyVerification, b: &PolyVerification) -> Result<()> {
        self.check(a)?;
        self.check(b)?;
        if a.key_id != b.key_id {
            return Err(VcheError::KeyMismatch);
        }
        Ok(())
    }

    fn with_values(a: &PolyVerification, values: Vec<u64>) -> PolyVerification {
        PolyVerification {
            values,
            degree: a.degree,
            key_id: a.key_id,
        }
    }
}

impl Evaluator for PolyVerificationEvaluator {
    type Value = PolyVerification;

    fn neg(&self, a: &PolyVerification) -> Result<PolyVerification> {
        self.check(a)?;
        let t = self.params.plaintext_modulus();
        Ok(Self::with_values(a, modular::neg_slots(&a.values, t)))
    }

    fn add(&self, a: &PolyVerification, b: &PolyVerification) -> Result<PolyVerification> {
        self.check_pair(a, b)?;
        let t = self.params.plaintext_modulus();
        Ok(PolyVerification {
            values: modular::add_slots(&a.values, &b.values, t),
            degree: a.degree.max(b.degree),
            key_id: a.key_id,
        })
    }

    fn mul(&self, a: &PolyVerification, b: &PolyVerification) -> Result<PolyVerification> {
        self.check_pair(a, b)?;
        let t = self.params.plaintext_modulus();
        Ok(PolyVerification {
            values: modular::mul_slots(&a.values, &b.values, t),
            degree: a.degree + b.degree,
            key_id: a.key_id,
        })
    }

    fn relinearize(&self, a: &PolyVerification) -> Result<PolyVerification> {
        Ok(a.clone())
    }

    fn rotate_columns(&self, a: &PolyVerification, step: usize) -> Result<PolyVerification> {
        self.check(a)?;
        let values = slots::rotate_columns(&a.values, self.params.physical_step(step));
        Ok(Self::with_values(a, values))
    }

    fn rotate_rows(&self, a: &PolyVerification) -> Result<PolyVerification> {
        self.check(a)?;
        Ok(Self::with_values(a, slots::rotate_rows(&a.values)))
    }
}

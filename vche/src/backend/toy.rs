//! Transparent stand-in for a BFV-style scheme.
//!
//! A ciphertext is a list of slot vectors `c_0 … c_d` with
//! `m = Σ c_k · s^k (mod T)` slotwise, for a secret scalar `s`. Fresh
//! ciphertexts mask the message with a uniform `c_1`; the evaluation key
//! carries `s²` for relinearization. This offers no security whatsoever and
//! exists only so the verification protocol can be exercised end to end with
//! the same shape rules a lattice scheme imposes.

use std::collections::BTreeSet;

use rand::{CryptoRng, Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::backend::HomomorphicBackend;
use crate::crypto::modular;
use crate::error::{Result, VcheError};
use crate::params::Parameters;
use crate::slots;

pub struct ToyBfv {
    params: Parameters,
}

impl ToyBfv {
    pub fn new(params: Parameters) -> Self {
        Self { params }
    }

    fn t(&self) -> u64 {
        self.params.plaintext_modulus()
    }

    fn check_width(&self, ct: &ToyCiphertext) -> Result<()> {
        if ct.components.is_empty() {
            return Err(VcheError::shape("ciphertext has no components"));
        }
        if let Some(c) = ct.components.iter().find(|c| c.len() != self.params.slots()) {
            return Err(VcheError::shape(format!(
                "ciphertext width {} does not match slot count {}",
                c.len(),
                self.params.slots()
            )));
        }
        Ok(())
    }

    fn check_canonical(&self, ct: &ToyCiphertext, op: &str) -> Result<()> {
        self.check_width(ct)?;
        if ct.components.len() != 2 {
            return Err(VcheError::shape(format!(
                "{op} needs a degree-1 ciphertext, got degree {}",
                ct.components.len() - 1
            )));
        }
        Ok(())
    }

    fn map_components(&self, ct: &ToyCiphertext, f: impl Fn(&[u64]) -> Vec<u64>) -> ToyCiphertext {
        ToyCiphertext {
            components: ct.components.iter().map(|c| f(c)).collect(),
        }
    }
}

#[derive(Clone)]
pub struct ToySecretKey {
    s: u64,
}

pub struct ToyEvaluationKey {
    s_squared: u64,
    column_steps: BTreeSet<usize>,
    rows: bool,
}

impl ToyEvaluationKey {
    pub fn has_column_step(&self, step: usize) -> bool {
        self.column_steps.contains(&step)
    }

    pub fn has_row_rotation(&self) -> bool {
        self.rows
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToyPlaintext {
    slots: Vec<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToyCiphertext {
    /// Slot vectors `c_0 … c_d`. Public so tests can corrupt them.
    pub components: Vec<Vec<u64>>,
}

impl HomomorphicBackend for ToyBfv {
    type Plaintext = ToyPlaintext;
    type Ciphertext = ToyCiphertext;
    type SecretKey = ToySecretKey;
    type EvaluationKey = ToyEvaluationKey;

    fn params(&self) -> &Parameters {
        &self.params
    }

    fn keygen<R: RngCore + CryptoRng>(&self, rng: &mut R) -> ToySecretKey {
        ToySecretKey {
            s: rng.gen_range(1..self.t()),
        }
    }

    fn gen_evaluation_key(
        &self,
        sk: &ToySecretKey,
        column_steps: &[usize],
        rows: bool,
    ) -> Result<ToyEvaluationKey> {
        let width = self.params.row_width();
        let mut steps = BTreeSet::new();
        for &step in column_steps {
            if step % width == 0 {
                continue;
            }
            steps.insert(step % width);
        }
        Ok(ToyEvaluationKey {
            s_squared: modular::mul(sk.s, sk.s, self.t()),
            column_steps: steps,
            rows,
        })
    }

    fn encode(&self, values: &[u64]) -> Result<ToyPlaintext> {
        if values.len() > self.params.slots() {
            return Err(VcheError::LengthMismatch {
                expected: self.params.slots(),
                actual: values.len(),
            });
        }
        let t = self.t();
        let slots = values.iter().map(|&v| modular::reduce(v, t)).collect::<Vec<_>>();
        Ok(ToyPlaintext {
            slots: slots::pad(&slots, self.params.slots()),
        })
    }

    fn decode(&self, plaintext: &ToyPlaintext) -> Vec<u64> {
        plaintext.slots.clone()
    }

    fn encrypt<R: RngCore + CryptoRng>(
        &self,
        plaintext: &ToyPlaintext,
        sk: &ToySecretKey,
        rng: &mut R,
    ) -> ToyCiphertext {
        let t = self.t();
        let c1: Vec<u64> = (0..self.params.slots()).map(|_| rng.gen_range(0..t)).collect();
        let c0 = plaintext
            .slots
            .iter()
            .zip(&c1)
            .map(|(&m, &a)| modular::sub(m, modular::mul(a, sk.s, t), t))
            .collect();
        ToyCiphertext {
            components: vec![c0, c1],
        }
    }

    fn decrypt(&self, ct: &ToyCiphertext, sk: &ToySecretKey) -> Result<ToyPlaintext> {
        self.check_width(ct)?;
        let t = self.t();
        let slots = (0..self.params.slots())
            .map(|i| {
                let coeffs: Vec<u64> = ct.components.iter().map(|c| c[i]).collect();
                modular::horner(&coeffs, sk.s, t)
            })
            .collect();
        Ok(ToyPlaintext { slots })
    }

    fn degree(&self, ct: &ToyCiphertext) -> usize {
        ct.components.len().saturating_sub(1)
    }

    fn neg(&self, ct: &ToyCiphertext) -> ToyCiphertext {
        let t = self.t();
        self.map_components(ct, |c| modular::neg_slots(c, t))
    }

    fn add(&self, a: &ToyCiphertext, b: &ToyCiphertext) -> Result<ToyCiphertext> {
        self.check_width(a)?;
        self.check_width(b)?;
        if a.components.len() != b.components.len() {
            return Err(VcheError::shape(format!(
                "add of degree {} and degree {} ciphertexts",
                self.degree(a),
                self.degree(b)
            )));
        }
        let t = self.t();
        Ok(ToyCiphertext {
            components: a
                .components
                .iter()
                .zip(&b.components)
                .map(|(x, y)| modular::add_slots(x, y, t))
                .collect(),
        })
    }

    fn mul(&self, a: &ToyCiphertext, b: &ToyCiphertext) -> Result<ToyCiphertext> {
        self.check_canonical(a, "mul")?;
        self.check_canonical(b, "mul")?;
        let t = self.t();
        let (a0, a1) = (&a.components[0], &a.components[1]);
        let (b0, b1) = (&b.components[0], &b.components[1]);
        let d0 = modular::mul_slots(a0, b0, t);
        let d1 = modular::add_slots(&modular::mul_slots(a0, b1, t), &modular::mul_slots(a1, b0, t), t);
        let d2 = modular::mul_slots(a1, b1, t);
        Ok(ToyCiphertext {
            components: vec![d0, d1, d2],
        })
    }

    fn add_plain(&self, a: &ToyCiphertext, pt: &ToyPlaintext) -> Result<ToyCiphertext> {
        self.check_width(a)?;
        let mut out = a.clone();
        out.components[0] = modular::add_slots(&a.components[0], &pt.slots, self.t());
        Ok(out)
    }

    fn mul_plain(&self, a: &ToyCiphertext, pt: &ToyPlaintext) -> Result<ToyCiphertext> {
        self.check_width(a)?;
        let t = self.t();
        Ok(self.map_components(a, |c| modular::mul_slots(c, &pt.slots, t)))
    }

    fn mul_scalar(&self, a: &ToyCiphertext, scalar: u64) -> ToyCiphertext {
        let t = self.t();
        let scalar = modular::reduce(scalar, t);
        self.map_components(a, |c| modular::scale_slots(c, scalar, t))
    }

    fn relinearize(&self, ct: &ToyCiphertext, evk: &ToyEvaluationKey) -> Result<ToyCiphertext> {
        self.check_width(ct)?;
        match ct.components.len() {
            2 => Ok(ct.clone()),
            3 => {
                let t = self.t();
                let c0 = modular::add_slots(
                    &ct.components[0],
                    &modular::scale_slots(&ct.components[2], evk.s_squared, t),
                    t,
                );
                Ok(ToyCiphertext {
                    components: vec![c0, ct.components[1].clone()],
                })
            }
            n => Err(VcheError::shape(format!(
                "relinearization supports degree <= 2, got degree {}",
                n - 1
            ))),
        }
    }

    fn rotate_columns(
        &self,
        ct: &ToyCiphertext,
        step: usize,
        evk: &ToyEvaluationKey,
    ) -> Result<ToyCiphertext> {
        self.check_canonical(ct, "column rotation")?;
        let step = step % self.params.row_width();
        if step == 0 {
            return Ok(ct.clone());
        }
        if !evk.has_column_step(step) {
            return Err(VcheError::MissingKey(format!("column rotation by {step}")));
        }
        Ok(self.map_components(ct, |c| slots::rotate_columns(c, step)))
    }

    fn rotate_rows(&self, ct: &ToyCiphertext, evk: &ToyEvaluationKey) -> Result<ToyCiphertext> {
        self.check_canonical(ct, "row rotation")?;
        if !evk.has_row_rotation() {
            return Err(VcheError::MissingKey("row rotation".into()));
        }
        Ok(self.map_components(ct, |c| slots::rotate_rows(c)))
    }
}

//! Delegated verification of α-encoded results.
//!
//! The [`Prover`] holds only the evaluation key. The [`Verifier`] holds the
//! backend secret key and α ([`OutsourcedKey`]) but never the PRF key, so the
//! verification object can be checked by a party other than the data owner.
//! Slot vectors are read as polynomials in the slot index; the verifier picks
//! random points `δ, β` and checks
//!
//! 1. `w_0 = y_0(δ)`,
//! 2. `HH = Σ w_k β^k`,
//! 3. `Σ w_k α^k = ρ(δ)`,
//!
//! where `w_k = y_k(δ)` are computed homomorphically by the prover.

use log::{debug, warn};
use rand::{CryptoRng, Rng, RngCore};

use crate::backend::{inner_sum, HomomorphicBackend};
use crate::crypto::modular;
use crate::error::{reject, Result, VcheError, VerificationFailure};
use crate::params::Parameters;
use crate::polynomial::{OutsourcedKey, PolyCiphertext, PolyVerification};
use crate::verified_type::{SoundnessBound, Verified};

pub struct Prover<'a, B: HomomorphicBackend> {
    backend: &'a B,
    evk: &'a B::EvaluationKey,
}

impl<'a, B: HomomorphicBackend> Prover<'a, B> {
    pub fn new(backend: &'a B, evk: &'a B::EvaluationKey) -> Self {
        Self { backend, evk }
    }

    pub fn params(&self) -> &Parameters {
        self.backend.params()
    }

    /// The claimed result `y_0`.
    pub fn result(&self, ct: &PolyCiphertext<B::Ciphertext>) -> Result<B::Ciphertext> {
        ct.components
            .first()
            .cloned()
            .ok_or_else(|| VcheError::shape("outer polynomial has no components"))
    }

    /// `y_k(x)` for every outer coefficient, replicated into every slot.
    pub fn evaluate_at(
        &self,
        ct: &PolyCiphertext<B::Ciphertext>,
        x: u64,
    ) -> Result<Vec<B::Ciphertext>> {
        let params = self.backend.params();
        let t = params.plaintext_modulus();
        let mut powers = Vec::with_capacity(params.slots());
        let mut acc = 1 % t;
        for _ in 0..params.slots() {
            powers.push(acc);
            acc = modular::mul(acc, x, t);
        }
        let powers = self.backend.encode(&powers)?;
        ct.components
            .iter()
            .map(|c| {
                let weighted = self.backend.mul_plain(c, &powers)?;
                inner_sum(self.backend, &weighted, self.evk)
            })
            .collect()
    }

    /// `Σ ws[k] x^k`, by Horner's rule.
    pub fn linearly_combine(&self, ws: &[B::Ciphertext], x: u64) -> Result<B::Ciphertext> {
        let (last, rest) = ws
            .split_last()
            .ok_or_else(|| VcheError::shape("nothing to combine"))?;
        let mut acc = last.clone();
        for w in rest.iter().rev() {
            acc = self.backend.add(&self.backend.mul_scalar(&acc, x), w)?;
        }
        Ok(acc)
    }

    /// One ciphertext holding `HH` in slot 0, the number of `w_k` in slot 1
    /// and `w_k` in slot `k + 2`.
    pub fn pack(&self, hh: &B::Ciphertext, ws: &[B::Ciphertext]) -> Result<B::Ciphertext> {
        let slots = self.backend.params().slots();
        if ws.len() + 2 > slots {
            return Err(VcheError::shape(format!(
                "cannot pack {} evaluations into {slots} slots",
                ws.len()
            )));
        }
        let unit = |i: usize| {
            let mut v = vec![0u64; slots];
            v[i] = 1;
            self.backend.encode(&v)
        };
        let mut packed = self.backend.mul_plain(hh, &unit(0)?)?;
        for (k, w) in ws.iter().enumerate() {
            let masked = self.backend.mul_plain(w, &unit(k + 2)?)?;
            packed = self.backend.add(&packed, &masked)?;
        }
        let mut count = vec![0u64; slots];
        count[1] = ws.len() as u64;
        self.backend.add_plain(&packed, &self.backend.encode(&count)?)
    }
}

pub struct Verifier<'a, B: HomomorphicBackend> {
    backend: &'a B,
    sk: &'a B::SecretKey,
    key: OutsourcedKey,
}

impl<'a, B: HomomorphicBackend> Verifier<'a, B> {
    pub fn new(backend: &'a B, sk: &'a B::SecretKey, key: OutsourcedKey) -> Self {
        Self { backend, sk, key }
    }

    pub fn params(&self) -> &Parameters {
        self.backend.params()
    }

    pub fn random_point<R: RngCore + CryptoRng>(&self, rng: &mut R) -> u64 {
        rng.gen_range(0..self.params().plaintext_modulus())
    }

    /// `poly[0] + poly[1]·x + …`
    pub fn evaluate_at(&self, poly: &[u64], x: u64) -> u64 {
        modular::horner(poly, x, self.params().plaintext_modulus())
    }

    /// `evals[0] + evals[1]·x + …`
    pub fn linearly_combine(&self, evals: &[u64], x: u64) -> u64 {
        modular::horner(evals, x, self.params().plaintext_modulus())
    }

    /// Split a decrypted [`Prover::pack`] result into `HH` and the `w_k`.
    pub fn unpack(&self, m: &[u64]) -> Result<(u64, Vec<u64>)> {
        if m.len() < 2 {
            return Err(VcheError::shape("packed message too short"));
        }
        let count = usize::try_from(m[1]).unwrap_or(usize::MAX);
        if count == 0 || count > m.len() - 2 {
            return Err(reject(VerificationFailure::shape_mismatch(format!(
                "packed message claims {} evaluations in {} slots",
                m[1],
                m.len()
            ))));
        }
        Ok((m[0], m[2..count + 2].to_vec()))
    }

    pub fn decrypt(&self, ct: &B::Ciphertext) -> Result<Vec<u64>> {
        Ok(self.backend.decode(&self.backend.decrypt(ct, self.sk)?))
    }
}

fn check_equal(lhs: u64, rhs: u64, what: &str) -> Result<()> {
    if lhs != rhs {
        return Err(reject(VerificationFailure::tag_mismatch(format!(
            "{what} check failed"
        ))));
    }
    Ok(())
}

/// Run the interactive check of an α-encoded result against its
/// verification object and return the verified result `y_0`.
pub fn run_polynomial_protocol<B: HomomorphicBackend, R: RngCore + CryptoRng>(
    prover: &Prover<'_, B>,
    verifier: &Verifier<'_, B>,
    ct: &PolyCiphertext<B::Ciphertext>,
    verif: &PolyVerification,
    rng: &mut R,
) -> Result<Verified<Vec<u64>>> {
    let params = *verifier.params();
    if prover.params() != &params {
        return Err(VcheError::InvalidParameters(
            "prover and verifier must agree on parameters".into(),
        ));
    }
    if params.replications() > 1 {
        return Err(VcheError::InvalidParameters(
            "the polynomial protocol does not support replicated slots".into(),
        ));
    }
    if verif.key_id != verifier.key.key_id {
        return Err(reject(VerificationFailure::key_mismatch(
            "verification object was produced under another key",
        )));
    }
    if ct.components.len() != verif.degree + 1 || verif.values.len() != params.slots() {
        warn!(
            "outer degree {} against verification degree {}",
            ct.degree(),
            verif.degree
        );
        return Err(reject(VerificationFailure::shape_mismatch(
            "result shape differs from the verification object",
        )));
    }

    let y0 = verifier.decrypt(&prover.result(ct)?)?;

    let beta = verifier.random_point(rng);
    let delta = verifier.random_point(rng);
    let ws = prover.evaluate_at(ct, delta)?;
    let hh = prover.linearly_combine(&ws, beta)?;
    let packed = prover.pack(&hh, &ws)?;

    let (hh, ws) = verifier.unpack(&verifier.decrypt(&packed)?)?;
    if ws.len() != verif.degree + 1 {
        return Err(reject(VerificationFailure::shape_mismatch(format!(
            "prover returned {} evaluations for degree {}",
            ws.len(),
            verif.degree
        ))));
    }
    check_equal(ws[0], verifier.evaluate_at(&y0, delta), "result evaluation")?;
    check_equal(hh, verifier.linearly_combine(&ws, beta), "linear combination")?;
    check_equal(
        verifier.linearly_combine(&ws, verifier.key.alpha),
        verifier.evaluate_at(&verif.values, delta),
        "verification value",
    )?;
    debug!("outsourced check accepted degree-{} result", verif.degree);

    // Both identity tests are over polynomials of degree < slots + degree.
    let bound = SoundnessBound::probabilistic(params.slots() + verif.degree, params.plaintext_modulus());
    Ok(Verified::new(y0, bound))
}

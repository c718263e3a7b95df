//! α-encoded polynomial scheme.
//!
//! A slot holding message `m` with PRF value `r` is encrypted as the outer
//! polynomial `y(X) = m + ((r - m)·α⁻¹)·X`, one backend ciphertext per
//! coefficient, so that `y(0) = m` and `y(α) = r`. Evaluating a circuit on
//! the outer polynomials commutes with evaluating it at α, hence the client
//! accepts the result `y_0` iff `Σ y_k α^k` equals the circuit applied to the
//! PRF values. A server that does not know α passes a wrong result with
//! probability at most `d / T` for outer degree `d`.

use rand::{CryptoRng, Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::crypto::modular;
use crate::crypto::prf::{PrfKey, PrfMode};
use crate::error::{Result, VcheError};
use crate::params::Parameters;
use crate::types::Hash;

pub mod encoder;
pub mod evaluator;

pub use encoder::{decrypt_poly, encrypt_poly, PolynomialEncoder};
pub use evaluator::{PolyCiphertextEvaluator, PolyVerificationEvaluator};

/// Client secret: the PRF key and the evaluation point α.
#[derive(Clone, Debug)]
pub struct PolynomialKey {
    prf: PrfKey,
    alpha: u64,
    alpha_inv: u64,
    mode: PrfMode,
}

impl PolynomialKey {
    pub fn generate<R: RngCore + CryptoRng>(
        rng: &mut R,
        params: &Parameters,
        mode: PrfMode,
    ) -> Result<Self> {
        let prf = PrfKey::generate(rng)?;
        let alpha = rng.gen_range(1..params.plaintext_modulus());
        Self::new(prf, alpha, params, mode)
    }

    pub fn new(prf: PrfKey, alpha: u64, params: &Parameters, mode: PrfMode) -> Result<Self> {
        let alpha_inv = modular::inv(alpha, params.plaintext_modulus()).ok_or_else(|| {
            VcheError::InvalidParameters(format!("α = {alpha} is not invertible"))
        })?;
        Ok(Self {
            prf,
            alpha,
            alpha_inv,
            mode,
        })
    }

    pub fn prf(&self) -> &PrfKey {
        &self.prf
    }

    pub fn alpha(&self) -> u64 {
        self.alpha
    }

    pub fn alpha_inv(&self) -> u64 {
        self.alpha_inv
    }

    pub fn mode(&self) -> PrfMode {
        self.mode
    }

    pub fn key_id(&self) -> Hash {
        self.prf.key_id()
    }

    /// The part of the key a delegated verifier needs: α but not the PRF key.
    pub fn outsourced(&self) -> OutsourcedKey {
        OutsourcedKey {
            alpha: self.alpha,
            key_id: self.prf.key_id(),
        }
    }
}

/// Verifier-side secret of the outsourced protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutsourcedKey {
    pub alpha: u64,
    pub key_id: Hash,
}

/// Outer polynomial coefficients, each a vector of physical slots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolyPlaintext {
    pub components: Vec<Vec<u64>>,
}

/// One backend ciphertext per outer coefficient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolyCiphertext<C> {
    pub components: Vec<C>,
}

impl<C> PolyCiphertext<C> {
    /// Outer degree.
    pub fn degree(&self) -> usize {
        self.components.len().saturating_sub(1)
    }
}

/// Expected value of the outer polynomial at α, per physical slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolyVerification {
    pub values: Vec<u64>,
    pub degree: usize,
    pub key_id: Hash,
}

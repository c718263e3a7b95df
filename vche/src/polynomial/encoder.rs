use log::debug;
use rand::{CryptoRng, RngCore};

use crate::backend::HomomorphicBackend;
use crate::compressed::{CompressedEncoder, CompressedOpener, CompressedVerification};
use crate::crypto::modular;
use crate::crypto::prf::{PrfMode, TagPrf};
use crate::error::{reject, Result, VcheError, VerificationFailure};
use crate::params::Parameters;
use crate::polynomial::{PolyCiphertext, PolyPlaintext, PolyVerification, PolynomialKey};
use crate::tag::{self, Tag};
use crate::types::Hash;
use crate::verified_type::{SoundnessBound, Verified};

/// Client-side encoder and verifying decoder of the α-encoded scheme.
pub struct PolynomialEncoder {
    prf: TagPrf,
    alpha: u64,
    alpha_inv: u64,
    params: Parameters,
    compressed: CompressedEncoder,
}

impl PolynomialEncoder {
    pub fn new(key: &PolynomialKey, params: Parameters) -> Self {
        Self {
            prf: TagPrf::new(key.prf().clone(), &params, key.mode()),
            alpha: key.alpha(),
            alpha_inv: key.alpha_inv(),
            params,
            compressed: CompressedEncoder::new(key.prf().clone(), params),
        }
    }

    pub fn key_id(&self) -> Hash {
        self.prf.key_id()
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    fn prf_values(&self, tags: &[Tag]) -> Vec<u64> {
        let lambda = self.params.replications();
        tags.iter()
            .flat_map(|t| (0..lambda).map(move |j| (t, j)))
            .map(|(t, j)| self.prf.value(t, self.params.replica_arg(j)))
            .collect()
    }

    /// `(m, (r - m)·α⁻¹)` for every physical slot.
    pub fn encode(&self, values: &[u64], tags: &[Tag]) -> Result<PolyPlaintext> {
        let n = self.params.logical_slots();
        tag::check_len(tags, n)?;
        if values.len() != n {
            return Err(VcheError::LengthMismatch {
                expected: n,
                actual: values.len(),
            });
        }
        let t = self.params.plaintext_modulus();
        let lambda = self.params.replications();
        let rs = self.prf_values(tags);
        let mut m0 = Vec::with_capacity(self.params.slots());
        let mut m1 = Vec::with_capacity(self.params.slots());
        for (idx, &r) in rs.iter().enumerate() {
            let m = modular::reduce(values[idx / lambda], t);
            m0.push(m);
            m1.push(modular::mul(modular::sub(r, m, t), self.alpha_inv, t));
        }
        Ok(PolyPlaintext {
            components: vec![m0, m1],
        })
    }

    /// PRF values of every physical slot, at outer degree 1.
    pub fn encode_verification(&self, tags: &[Tag]) -> Result<PolyVerification> {
        tag::check_len(tags, self.params.logical_slots())?;
        Ok(PolyVerification {
            values: self.prf_values(tags),
            degree: 1,
            key_id: self.key_id(),
        })
    }

    /// Slot-count-independent verification plaintext; closed-form mode only.
    pub fn encode_compressed(&self, tags: &[Tag]) -> Result<CompressedVerification> {
        if self.prf.mode() != PrfMode::ClosedForm {
            return Err(VcheError::InvalidParameters(
                "compressed verification needs the closed-form PRF".into(),
            ));
        }
        self.compressed.encode(tags)
    }

    pub fn opener(&self, index_tags: &[Tag]) -> Result<CompressedOpener> {
        self.compressed.opener(index_tags)
    }

    /// Open a compressed object into the per-slot form, forcing its memo.
    pub fn open_compressed(
        &self,
        object: &CompressedVerification,
        opener: &CompressedOpener,
    ) -> Result<PolyVerification> {
        if object.key_id() != &self.key_id() || opener.key_id() != &self.key_id() {
            return Err(reject(VerificationFailure::key_mismatch(
                "compressed verification plaintext was encoded under another key",
            )));
        }
        if object.index_digest() != opener.index_digest() {
            return Err(reject(VerificationFailure::shape_mismatch(
                "opener was derived from different index tags",
            )));
        }
        let memo = opener.compute_memo(object)?;
        Ok(PolyVerification {
            values: opener.eval(object, &memo)?,
            degree: object.degree(),
            key_id: *object.key_id(),
        })
    }

    /// Accept `y_0` iff `Σ y_k α^k = ρ` in every slot and the outer degree is
    /// the one the verification track accumulated.
    pub fn decode(
        &self,
        pt: &PolyPlaintext,
        verif: &PolyVerification,
        expected_slots: usize,
    ) -> Result<Verified<Vec<u64>>> {
        if verif.key_id != self.key_id() {
            return Err(reject(VerificationFailure::key_mismatch(
                "verification plaintext was encoded under another key",
            )));
        }
        let n = self.params.logical_slots();
        let slots = self.params.slots();
        if pt.components.len() != verif.degree + 1 {
            return Err(reject(VerificationFailure::shape_mismatch(format!(
                "result has outer degree {}, verification expects {}",
                pt.components.len().saturating_sub(1),
                verif.degree
            ))));
        }
        if verif.values.len() != slots
            || pt.components.iter().any(|c| c.len() != slots)
            || expected_slots > n
        {
            return Err(reject(VerificationFailure::shape_mismatch(format!(
                "expected {expected_slots} of {n} logical slots over {slots} physical slots"
            ))));
        }
        let t = self.params.plaintext_modulus();
        let mut ys = vec![0u64; pt.components.len()];
        for (idx, &rho) in verif.values.iter().enumerate() {
            for (y, component) in ys.iter_mut().zip(&pt.components) {
                *y = component[idx];
            }
            if modular::horner(&ys, self.alpha, t) != rho {
                return Err(reject(VerificationFailure::tag_mismatch(format!(
                    "slot {idx} does not open to its verification value"
                ))));
            }
        }
        let lambda = self.params.replications();
        let out = (0..expected_slots)
            .map(|i| pt.components[0][i * lambda])
            .collect();
        debug!("polynomial decode verified {n} logical slots at degree {}", verif.degree);
        Ok(Verified::new(out, SoundnessBound::probabilistic(verif.degree, t)))
    }

    pub fn decode_compressed(
        &self,
        pt: &PolyPlaintext,
        object: &CompressedVerification,
        opener: &CompressedOpener,
        expected_slots: usize,
    ) -> Result<Verified<Vec<u64>>> {
        let verif = self.open_compressed(object, opener)?;
        self.decode(pt, &verif, expected_slots)
    }
}

pub fn encrypt_poly<B: HomomorphicBackend, R: RngCore + CryptoRng>(
    backend: &B,
    pt: &PolyPlaintext,
    sk: &B::SecretKey,
    rng: &mut R,
) -> Result<PolyCiphertext<B::Ciphertext>> {
    let mut components = Vec::with_capacity(pt.components.len());
    for c in &pt.components {
        components.push(backend.encrypt(&backend.encode(c)?, sk, rng));
    }
    Ok(PolyCiphertext { components })
}

pub fn decrypt_poly<B: HomomorphicBackend>(
    backend: &B,
    ct: &PolyCiphertext<B::Ciphertext>,
    sk: &B::SecretKey,
) -> Result<PolyPlaintext> {
    let components = ct
        .components
        .iter()
        .map(|c| Ok(backend.decode(&backend.decrypt(c, sk)?)))
        .collect::<Result<_>>()?;
    Ok(PolyPlaintext { components })
}

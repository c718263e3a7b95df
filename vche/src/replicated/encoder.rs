use log::debug;
use rand::{CryptoRng, RngCore};

use crate::backend::HomomorphicBackend;
use crate::compressed::{CompressedEncoder, CompressedOpener};
use crate::crypto::modular;
use crate::crypto::prf::{PrfMode, TagPrf};
use crate::error::{reject, Result, VcheError, VerificationFailure};
use crate::params::Parameters;
use crate::replicated::{
    DummySet, ReplicatedKey, TaggedCiphertext, TaggedCompressed, TaggedPlaintext, TaggedPoly,
};
use crate::tag::{self, Tag};
use crate::types::Hash;
use crate::verified_type::{SoundnessBound, Verified};

/// Client-side encoder and verifying decoder of the replicated scheme.
pub struct ReplicatedEncoder {
    prf: TagPrf,
    dummies: DummySet,
    params: Parameters,
    compressed: CompressedEncoder,
}

impl ReplicatedEncoder {
    pub fn new(key: &ReplicatedKey, params: Parameters) -> Result<Self> {
        if key.dummies.replications() != params.replications() {
            return Err(VcheError::InvalidParameters(format!(
                "dummy set built for {} replications, parameters use {}",
                key.dummies.replications(),
                params.replications()
            )));
        }
        Ok(Self {
            prf: TagPrf::new(key.prf.clone(), &params, key.mode),
            dummies: key.dummies.clone(),
            params,
            compressed: CompressedEncoder::new(key.prf.clone(), params),
        })
    }

    pub fn key_id(&self) -> Hash {
        self.prf.key_id()
    }

    pub fn mode(&self) -> PrfMode {
        self.prf.mode()
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    fn digests(&self, tags: &[Tag]) -> Vec<Hash> {
        tags.iter().map(|t| self.prf.digest(t)).collect()
    }

    fn prf_values(&self, tags: &[Tag]) -> Vec<u64> {
        let lambda = self.params.replications();
        tags.iter()
            .flat_map(|t| (0..lambda).map(move |j| (t, j)))
            .map(|(t, j)| self.prf.value(t, self.params.replica_arg(j)))
            .collect()
    }

    /// Replicate `values` and overwrite the dummy replicas with PRF values.
    pub fn encode(&self, values: &[u64], tags: &[Tag]) -> Result<TaggedPlaintext> {
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
        let mut slots = Vec::with_capacity(self.params.slots());
        for (tag, &m) in tags.iter().zip(values) {
            for j in 0..lambda {
                slots.push(if self.dummies.contains(j) {
                    self.prf.value(tag, self.params.replica_arg(j))
                } else {
                    modular::reduce(m, t)
                });
            }
        }
        Ok(TaggedPlaintext {
            slots,
            digests: self.digests(tags),
        })
    }

    /// Verification plaintext carrying the PRF value of every replica.
    pub fn encode_verification(&self, tags: &[Tag]) -> Result<TaggedPoly> {
        tag::check_len(tags, self.params.logical_slots())?;
        Ok(TaggedPoly {
            values: self.prf_values(tags),
            digests: self.digests(tags),
            key_id: self.key_id(),
        })
    }

    /// Slot-count-independent verification plaintext; closed-form mode only.
    pub fn encode_compressed(&self, tags: &[Tag]) -> Result<TaggedCompressed> {
        if self.mode() != PrfMode::ClosedForm {
            return Err(VcheError::InvalidParameters(
                "compressed verification needs the closed-form PRF".into(),
            ));
        }
        Ok(TaggedCompressed {
            object: self.compressed.encode(tags)?,
            digests: self.digests(tags),
        })
    }

    pub fn opener(&self, index_tags: &[Tag]) -> Result<CompressedOpener> {
        self.compressed.opener(index_tags)
    }

    /// Check a decrypted result against a direct-mode verification plaintext
    /// and return its first `expected_slots` logical values.
    pub fn decode(
        &self,
        pt: &TaggedPlaintext,
        verif: &TaggedPoly,
        expected_slots: usize,
    ) -> Result<Verified<Vec<u64>>> {
        if verif.key_id != self.key_id() {
            return Err(reject(VerificationFailure::key_mismatch(
                "verification plaintext was encoded under another key",
            )));
        }
        self.verify(pt, &verif.values, &verif.digests, expected_slots)
    }

    /// As [`decode`](Self::decode), opening a compressed verification
    /// plaintext through its memo first.
    pub fn decode_compressed(
        &self,
        pt: &TaggedPlaintext,
        verif: &TaggedCompressed,
        opener: &CompressedOpener,
        expected_slots: usize,
    ) -> Result<Verified<Vec<u64>>> {
        if verif.object.key_id() != &self.key_id() || opener.key_id() != &self.key_id() {
            return Err(reject(VerificationFailure::key_mismatch(
                "compressed verification plaintext was encoded under another key",
            )));
        }
        if verif.object.index_digest() != opener.index_digest() {
            return Err(reject(VerificationFailure::shape_mismatch(
                "opener was derived from different index tags",
            )));
        }
        let memo = opener.compute_memo(&verif.object)?;
        let expected = opener.eval(&verif.object, &memo)?;
        self.verify(pt, &expected, &verif.digests, expected_slots)
    }

    fn verify(
        &self,
        pt: &TaggedPlaintext,
        expected: &[u64],
        digests: &[Hash],
        expected_slots: usize,
    ) -> Result<Verified<Vec<u64>>> {
        let n = self.params.logical_slots();
        let lambda = self.params.replications();
        if pt.slots.len() != self.params.slots() || expected.len() != self.params.slots() {
            return Err(reject(VerificationFailure::shape_mismatch(format!(
                "result has {} slots, verification {}, parameters {}",
                pt.slots.len(),
                expected.len(),
                self.params.slots()
            ))));
        }
        if pt.digests.len() != n || digests.len() != n || expected_slots > n {
            return Err(reject(VerificationFailure::shape_mismatch(format!(
                "expected {expected_slots} of {n} logical slots, got {} and {} digests",
                pt.digests.len(),
                digests.len()
            ))));
        }
        if let Some(i) = (0..n).find(|&i| pt.digests[i] != digests[i]) {
            return Err(reject(VerificationFailure::tag_mismatch(format!(
                "operation chain of slot {i} diverges from the verification track"
            ))));
        }

        let mut out = Vec::with_capacity(expected_slots);
        for i in 0..n {
            let mut value = None;
            for j in 0..lambda {
                let idx = i * lambda + j;
                let got = pt.slots[idx];
                if self.dummies.contains(j) {
                    if got != expected[idx] {
                        return Err(reject(VerificationFailure::tag_mismatch(format!(
                            "dummy replica {j} of slot {i} evaluated incorrectly"
                        ))));
                    }
                } else {
                    match value {
                        None => value = Some(got),
                        Some(v) if v != got => {
                            return Err(reject(VerificationFailure::tag_mismatch(format!(
                                "replicas of slot {i} disagree"
                            ))));
                        }
                        Some(_) => {}
                    }
                }
            }
            if i < expected_slots {
                let v = value.ok_or_else(|| VcheError::shape("slot without a message replica"))?;
                out.push(v);
            }
        }
        debug!("replicated decode verified {n} logical slots (λ = {lambda})");
        Ok(Verified::new(out, SoundnessBound::dummy_guess(lambda)))
    }
}

/// Encrypt a tagged plaintext; digests travel in the clear next to it.
pub fn encrypt_tagged<B: HomomorphicBackend, R: RngCore + CryptoRng>(
    backend: &B,
    pt: &TaggedPlaintext,
    sk: &B::SecretKey,
    rng: &mut R,
) -> Result<TaggedCiphertext<B::Ciphertext>> {
    let encoded = backend.encode(&pt.slots)?;
    Ok(TaggedCiphertext {
        ct: backend.encrypt(&encoded, sk, rng),
        digests: pt.digests.clone(),
    })
}

pub fn decrypt_tagged<B: HomomorphicBackend>(
    backend: &B,
    ct: &TaggedCiphertext<B::Ciphertext>,
    sk: &B::SecretKey,
) -> Result<TaggedPlaintext> {
    let pt = backend.decrypt(&ct.ct, sk)?;
    Ok(TaggedPlaintext {
        slots: backend.decode(&pt),
        digests: ct.digests.clone(),
    })
}

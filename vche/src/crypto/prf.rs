//! Keyed pseudorandom functions mapping tags into Z_T.
//!
//! The PRF is keyed BLAKE2b over length-prefixed inputs followed by a round
//! counter; outputs are masked to the bit length of the modulus and rejected
//! until they fall below it, so the result is uniform in `[0, T)`.
//!
//! Two modes share one key:
//! - [`PrfMode::Direct`]: `PRF_K1(dataset, label, replica)`.
//! - [`PrfMode::ClosedForm`]: `a·u + b·v`, where `(a, b)` depend only on the
//!   dataset identifier (under K2) and `(u, v)` only on the slot label (under K1).
//!   The split lets a verifier aggregate a whole circuit symbolically in `(u, v)`.

use std::fmt;

use blake2b_simd::Params as Blake2bParams;
use hkdf::Hkdf;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::crypto::hash::{hash_key_id, hash_tag_digest};
use crate::crypto::modular;
use crate::error::{Result, VcheError};
use crate::params::Parameters;
use crate::tag::Tag;
use crate::types::Hash;

/// One PRF argument.
#[derive(Clone, Copy, Debug)]
pub enum PrfInput<'a> {
    Bytes(&'a [u8]),
    Index(u64),
}

/// Client secret for tag binding: two independent BLAKE2b keys.
#[derive(Clone)]
pub struct PrfKey {
    k1: [u8; 32],
    k2: [u8; 32],
    id: Hash,
}

impl PrfKey {
    /// Sample a fresh master seed and expand it.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self> {
        let mut seed = [0u8; 32];
        rng.fill_bytes(&mut seed);
        Self::from_seed(&seed)
    }

    /// Expand a master seed into K1 (index PRF) and K2 (dataset PRF) with HKDF-SHA256.
    pub fn from_seed(seed: &[u8]) -> Result<Self> {
        let hk = Hkdf::<Sha256>::new(Some(b"vche_prf_v1"), seed);
        let mut k1 = [0u8; 32];
        let mut k2 = [0u8; 32];
        hk.expand(b"vche_prf_index_key", &mut k1)
            .map_err(|e| VcheError::InvalidParameters(format!("hkdf expand: {e}")))?;
        hk.expand(b"vche_prf_dataset_key", &mut k2)
            .map_err(|e| VcheError::InvalidParameters(format!("hkdf expand: {e}")))?;
        Ok(Self {
            id: hash_key_id(&k1, &k2),
            k1,
            k2,
        })
    }

    /// Public identifier of this key, embedded in every verification object.
    pub fn key_id(&self) -> Hash {
        self.id
    }
}

impl fmt::Debug for PrfKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrfKey")
            .field("key_id", &hex_prefix(&self.id))
            .finish_non_exhaustive()
    }
}

fn hex_prefix(h: &Hash) -> String {
    h[..4].iter().map(|b| format!("{b:02x}")).collect()
}

fn keyed_state(key: &[u8; 32], out_len: usize, inputs: &[PrfInput<'_>]) -> blake2b_simd::State {
    let mut state = Blake2bParams::new()
        .hash_length(out_len)
        .key(key)
        .to_state();
    for input in inputs {
        match input {
            PrfInput::Bytes(bytes) => {
                state.update(&[0x01]);
                state.update(&(bytes.len() as u64).to_be_bytes());
                state.update(bytes);
            }
            PrfInput::Index(i) => {
                state.update(&[0x02]);
                state.update(&i.to_be_bytes());
            }
        }
    }
    state
}

/// Uniform value in `[0, modulus)` keyed by `key`.
pub fn prf(key: &[u8; 32], modulus: u64, inputs: &[PrfInput<'_>]) -> u64 {
    let bits = 64 - modulus.leading_zeros();
    let mask = if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    };
    let base = keyed_state(key, 8, inputs);
    let mut round: u64 = 0;
    loop {
        let mut state = base.clone();
        state.update(&round.to_be_bytes());
        let out = state.finalize();
        let mut word = [0u8; 8];
        word.copy_from_slice(&out.as_bytes()[..8]);
        let r = mask & u64::from_be_bytes(word);
        if r < modulus {
            return r;
        }
        round += 1;
    }
}

/// Which PRF construction binds slot values to tags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrfMode {
    #[default]
    Direct,
    ClosedForm,
}

/// The four components of a closed-form evaluation `a·u + b·v`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClosedForm {
    pub a: u64,
    pub b: u64,
    pub u: u64,
    pub v: u64,
}

impl ClosedForm {
    pub fn value(&self, t: u64) -> u64 {
        modular::add(
            modular::mul(self.a, self.u, t),
            modular::mul(self.b, self.v, t),
            t,
        )
    }
}

/// A [`PrfKey`] specialised to one modulus and mode.
#[derive(Clone, Debug)]
pub struct TagPrf {
    key: PrfKey,
    modulus: u64,
    mode: PrfMode,
}

impl TagPrf {
    pub fn new(key: PrfKey, params: &Parameters, mode: PrfMode) -> Self {
        Self {
            key,
            modulus: params.plaintext_modulus(),
            mode,
        }
    }

    pub fn key_id(&self) -> Hash {
        self.key.key_id()
    }

    pub fn mode(&self) -> PrfMode {
        self.mode
    }

    /// The value bound to `tag` (and replica index, for replicated layouts).
    pub fn value(&self, tag: &Tag, replica: Option<u64>) -> u64 {
        match self.mode {
            PrfMode::Direct => {
                let mut inputs = vec![PrfInput::Bytes(tag.dataset()), PrfInput::Bytes(tag.label())];
                if let Some(j) = replica {
                    inputs.push(PrfInput::Index(j));
                }
                prf(&self.key.k1, self.modulus, &inputs)
            }
            PrfMode::ClosedForm => self.closed_form(tag, replica).value(self.modulus),
        }
    }

    /// Dataset coefficients `(a, b)`, both in Z_T^*.
    pub fn dataset_coefficients(&self, dataset: &[u8]) -> (u64, u64) {
        let t1 = self.modulus - 1;
        let a = prf(&self.key.k2, t1, &[PrfInput::Bytes(dataset), PrfInput::Bytes(b"a")]) + 1;
        let b = prf(&self.key.k2, t1, &[PrfInput::Bytes(dataset), PrfInput::Bytes(b"b")]) + 1;
        (a, b)
    }

    /// Index values `(u, v)` for one slot label.
    pub fn index_values(&self, label: &[u8], replica: Option<u64>) -> (u64, u64) {
        let mut inputs = vec![PrfInput::Bytes(label)];
        if let Some(j) = replica {
            inputs.push(PrfInput::Index(j));
        }
        inputs.push(PrfInput::Bytes(b"u"));
        let u = prf(&self.key.k1, self.modulus, &inputs);
        if let Some(last) = inputs.last_mut() {
            *last = PrfInput::Bytes(b"v");
        }
        let v = prf(&self.key.k1, self.modulus, &inputs);
        (u, v)
    }

    pub fn closed_form(&self, tag: &Tag, replica: Option<u64>) -> ClosedForm {
        let (a, b) = self.dataset_coefficients(tag.dataset());
        let (u, v) = self.index_values(tag.label(), replica);
        ClosedForm { a, b, u, v }
    }

    /// 32-byte digest of a tag, the starting point of its operation hash chain.
    pub fn digest(&self, tag: &Tag) -> Hash {
        let state = keyed_state(
            &self.key.k1,
            32,
            &[
                PrfInput::Bytes(b"digest"),
                PrfInput::Bytes(tag.dataset()),
                PrfInput::Bytes(tag.label()),
            ],
        );
        hash_tag_digest(&self.key.id, state.finalize().as_bytes())
    }
}

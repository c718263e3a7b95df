//! Compressed verification objects for the closed-form PRF.
//!
//! With `r_i = a·u_i + b·v_i`, every value a circuit computes over the `r_i`
//! is a bivariate polynomial in the (rotated) index vectors `u, v` whose
//! coefficients depend only on the dataset coefficients `(a, b)`. The server
//! evolves that polynomial symbolically: a map from accumulated rotation to
//! [`BivariatePoly`], independent of the slot count. The client, who can
//! derive `u, v` from the index tags, opens it in two phases:
//! [`CompressedOpener::compute_memo`] (powers of the rotated `u, v`, reusable
//! for every object of the same shape) and [`CompressedOpener::eval`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::crypto::hash::hash_index_tags;
use crate::crypto::modular;
use crate::crypto::prf::{PrfKey, PrfMode, TagPrf};
use crate::error::{Result, VcheError};
use crate::eval::Evaluator;
use crate::params::Parameters;
use crate::slots;
use crate::tag::{self, Tag};
use crate::types::Hash;

pub mod bivariate;

pub use bivariate::BivariatePoly;

/// Rotation accumulated by a term: physical column step and row swap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RotInfo {
    pub columns: usize,
    pub rows_swapped: bool,
}

impl RotInfo {
    pub const NONE: RotInfo = RotInfo {
        columns: 0,
        rows_swapped: false,
    };

    fn apply(&self, values: &[u64]) -> Vec<u64> {
        let rotated = slots::rotate_columns(values, self.columns);
        if self.rows_swapped {
            slots::rotate_rows(&rotated)
        } else {
            rotated
        }
    }
}

/// A verification object of size independent of the slot count.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressedVerification {
    terms: BTreeMap<RotInfo, BivariatePoly>,
    key_id: Hash,
    index_digest: Hash,
}

impl CompressedVerification {
    pub fn key_id(&self) -> &Hash {
        &self.key_id
    }

    pub fn index_digest(&self) -> &Hash {
        &self.index_digest
    }

    pub fn terms(&self) -> &BTreeMap<RotInfo, BivariatePoly> {
        &self.terms
    }

    /// Highest total degree over all terms.
    pub fn degree(&self) -> usize {
        self.terms.values().map(|p| p.degree()).max().unwrap_or(0)
    }

    fn with_terms(&self, terms: BTreeMap<RotInfo, BivariatePoly>) -> Self {
        Self {
            terms,
            key_id: self.key_id,
            index_digest: self.index_digest,
        }
    }
}

/// Client-side encoder producing compressed objects and openers.
pub struct CompressedEncoder {
    prf: TagPrf,
    params: Parameters,
}

impl CompressedEncoder {
    pub fn new(key: PrfKey, params: Parameters) -> Self {
        Self {
            prf: TagPrf::new(key, &params, PrfMode::ClosedForm),
            params,
        }
    }

    /// `a·u + b·v` for a tag vector sharing one dataset identifier.
    pub fn encode(&self, tags: &[Tag]) -> Result<CompressedVerification> {
        tag::check_len(tags, self.params.logical_slots())?;
        let dataset = tags[0].dataset();
        if let Some(other) = tags.iter().find(|t| t.dataset() != dataset) {
            return Err(VcheError::shape(format!(
                "compressed encoding needs one dataset per vector, found {other:?} next to {:?}",
                tags[0]
            )));
        }
        let (a, b) = self.prf.dataset_coefficients(dataset);
        let mut terms = BTreeMap::new();
        terms.insert(
            RotInfo::NONE,
            BivariatePoly::linear(a, b, self.params.plaintext_modulus()),
        );
        let key_id = self.prf.key_id();
        Ok(CompressedVerification {
            terms,
            key_id,
            index_digest: hash_index_tags(&key_id, tags),
        })
    }

    /// Derive the index vectors `u, v` (one entry per physical slot).
    pub fn opener(&self, index_tags: &[Tag]) -> Result<CompressedOpener> {
        tag::check_len(index_tags, self.params.logical_slots())?;
        let lambda = self.params.replications();
        let mut u = Vec::with_capacity(self.params.slots());
        let mut v = Vec::with_capacity(self.params.slots());
        for t in index_tags {
            for j in 0..lambda {
                let (ui, vi) = self.prf.index_values(t.label(), self.params.replica_arg(j));
                u.push(ui);
                v.push(vi);
            }
        }
        let key_id = self.prf.key_id();
        Ok(CompressedOpener {
            params: self.params,
            u,
            v,
            key_id,
            index_digest: hash_index_tags(&key_id, index_tags),
        })
    }

    pub fn key_id(&self) -> Hash {
        self.prf.key_id()
    }
}

/// Symbolic evaluator over [`CompressedVerification`].
pub struct CompressedEvaluator {
    params: Parameters,
}

impl CompressedEvaluator {
    pub fn new(params: Parameters) -> Self {
        Self { params }
    }

    fn check_pair(a: &CompressedVerification, b: &CompressedVerification) -> Result<()> {
        if a.key_id != b.key_id {
            return Err(VcheError::KeyMismatch);
        }
        if a.index_digest != b.index_digest {
            return Err(VcheError::shape(
                "compressed operands were encoded under different index tags",
            ));
        }
        Ok(())
    }

    fn rekey(
        a: &CompressedVerification,
        f: impl Fn(&RotInfo) -> RotInfo,
    ) -> CompressedVerification {
        let mut terms: BTreeMap<RotInfo, BivariatePoly> = BTreeMap::new();
        for (rot, poly) in &a.terms {
            let key = f(rot);
            let merged = match terms.remove(&key) {
                Some(existing) => existing.add(poly),
                None => poly.clone(),
            };
            terms.insert(key, merged);
        }
        a.with_terms(terms)
    }
}

impl Evaluator for CompressedEvaluator {
    type Value = CompressedVerification;

    fn neg(&self, a: &CompressedVerification) -> Result<CompressedVerification> {
        Ok(a.with_terms(a.terms.iter().map(|(r, p)| (*r, p.neg())).collect()))
    }

    fn add(
        &self,
        a: &CompressedVerification,
        b: &CompressedVerification,
    ) -> Result<CompressedVerification> {
        Self::check_pair(a, b)?;
        let mut terms = a.terms.clone();
        for (rot, poly) in &b.terms {
            let sum = match terms.get(rot) {
                Some(existing) => existing.add(poly),
                None => poly.clone(),
            };
            terms.insert(*rot, sum);
        }
        Ok(a.with_terms(terms))
    }

    /// Defined only for two single-term objects with the same rotation: a
    /// product of sums over different rotations has no closed form in `u, v`.
    fn mul(
        &self,
        a: &CompressedVerification,
        b: &CompressedVerification,
    ) -> Result<CompressedVerification> {
        Self::check_pair(a, b)?;
        let (ra, pa) = single_term(a)?;
        let (rb, pb) = single_term(b)?;
        if ra != rb {
            return Err(VcheError::shape(format!(
                "cannot multiply terms rotated by {ra:?} and {rb:?}"
            )));
        }
        let mut terms = BTreeMap::new();
        terms.insert(ra, pa.mul(pb));
        Ok(a.with_terms(terms))
    }

    fn relinearize(&self, a: &CompressedVerification) -> Result<CompressedVerification> {
        Ok(a.clone())
    }

    fn rotate_columns(
        &self,
        a: &CompressedVerification,
        step: usize,
    ) -> Result<CompressedVerification> {
        let physical = self.params.physical_step(step);
        let width = self.params.row_width();
        Ok(Self::rekey(a, |r| RotInfo {
            columns: (r.columns + physical) % width,
            rows_swapped: r.rows_swapped,
        }))
    }

    fn rotate_rows(&self, a: &CompressedVerification) -> Result<CompressedVerification> {
        Ok(Self::rekey(a, |r| RotInfo {
            columns: r.columns,
            rows_swapped: !r.rows_swapped,
        }))
    }
}

fn single_term(a: &CompressedVerification) -> Result<(RotInfo, &BivariatePoly)> {
    let mut iter = a.terms.iter();
    match (iter.next(), iter.next()) {
        (Some((rot, poly)), None) => Ok((*rot, poly)),
        _ => Err(VcheError::shape(format!(
            "multiplication needs a single rotation term, got {}",
            a.terms.len()
        ))),
    }
}

/// Powers of the rotated index vectors, `[slot][power]`.
#[derive(Clone, Debug)]
struct PowerTable {
    degree: usize,
    u_pows: Vec<Vec<u64>>,
    v_pows: Vec<Vec<u64>>,
}

/// Precomputed state for opening objects of one shape.
#[derive(Clone, Debug)]
pub struct Memo {
    index_digest: Hash,
    tables: BTreeMap<RotInfo, PowerTable>,
}

impl Memo {
    /// Whether this memo can open `obj`.
    pub fn covers(&self, obj: &CompressedVerification) -> bool {
        obj.index_digest == self.index_digest
            && obj.terms.iter().all(|(rot, poly)| {
                self.tables
                    .get(rot)
                    .is_some_and(|table| table.degree >= poly.degree())
            })
    }
}

/// Client-side opener holding the index vectors.
#[derive(Clone, Debug)]
pub struct CompressedOpener {
    params: Parameters,
    u: Vec<u64>,
    v: Vec<u64>,
    key_id: Hash,
    index_digest: Hash,
}

impl CompressedOpener {
    pub fn key_id(&self) -> &Hash {
        &self.key_id
    }

    pub fn index_digest(&self) -> &Hash {
        &self.index_digest
    }

    fn check(&self, obj: &CompressedVerification) -> Result<()> {
        if obj.key_id != self.key_id {
            return Err(VcheError::KeyMismatch);
        }
        if obj.index_digest != self.index_digest {
            return Err(VcheError::shape(
                "verification object was encoded under different index tags",
            ));
        }
        let t = self.params.plaintext_modulus();
        if let Some(poly) = obj.terms.values().find(|p| p.modulus() != t) {
            return Err(VcheError::shape(format!(
                "term over modulus {}, parameters use {t}",
                poly.modulus()
            )));
        }
        Ok(())
    }

    /// Precompute powers for every rotation `obj` uses, up to its degree.
    pub fn compute_memo(&self, obj: &CompressedVerification) -> Result<Memo> {
        self.check(obj)?;
        let t = self.params.plaintext_modulus();
        let tables = obj
            .terms
            .iter()
            .map(|(rot, poly)| {
                let degree = poly.degree();
                let powers = |base: &[u64]| -> Vec<Vec<u64>> {
                    rot.apply(base)
                        .into_iter()
                        .map(|x| {
                            let mut row = Vec::with_capacity(degree + 1);
                            let mut acc = 1 % t;
                            for _ in 0..=degree {
                                row.push(acc);
                                acc = modular::mul(acc, x, t);
                            }
                            row
                        })
                        .collect()
                };
                let table = PowerTable {
                    degree,
                    u_pows: powers(&self.u),
                    v_pows: powers(&self.v),
                };
                (*rot, table)
            })
            .collect();
        Ok(Memo {
            index_digest: self.index_digest,
            tables,
        })
    }

    /// Per-slot verification values from a memo.
    pub fn eval(&self, obj: &CompressedVerification, memo: &Memo) -> Result<Vec<u64>> {
        self.check(obj)?;
        if !memo.covers(obj) {
            return Err(VcheError::shape("memo was computed for a different shape"));
        }
        let t = self.params.plaintext_modulus();
        let mut out = vec![0u64; self.params.slots()];
        for (rot, poly) in &obj.terms {
            let table = memo
                .tables
                .get(rot)
                .ok_or_else(|| VcheError::shape(format!("memo lacks rotation {rot:?}")))?;
            for (s, slot) in out.iter_mut().enumerate() {
                let term = poly.eval_with_powers(&table.u_pows[s], &table.v_pows[s])?;
                *slot = modular::add(*slot, term, t);
            }
        }
        Ok(out)
    }

    /// Per-slot verification values without a memo.
    pub fn eval_direct(&self, obj: &CompressedVerification) -> Result<Vec<u64>> {
        self.check(obj)?;
        let t = self.params.plaintext_modulus();
        let mut out = vec![0u64; self.params.slots()];
        for (rot, poly) in &obj.terms {
            let u = rot.apply(&self.u);
            let v = rot.apply(&self.v);
            for (s, slot) in out.iter_mut().enumerate() {
                *slot = modular::add(*slot, poly.eval(u[s], v[s]), t);
            }
        }
        Ok(out)
    }
}

use serde::{Deserialize, Serialize};

use crate::crypto::modular;
use crate::error::{Result, VcheError};

/// Polynomial in two variables over Z_T; `coeffs[i][j]` multiplies `u^i v^j`.
///
/// Stored as a square table of side `degree + 1`; entries with `i + j > degree`
/// stay zero. Deserialization enforces that shape and reduced coefficients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBivariatePoly")]
pub struct BivariatePoly {
    coeffs: Vec<Vec<u64>>,
    modulus: u64,
}

#[derive(Deserialize)]
struct RawBivariatePoly {
    coeffs: Vec<Vec<u64>>,
    modulus: u64,
}

impl TryFrom<RawBivariatePoly> for BivariatePoly {
    type Error = VcheError;

    fn try_from(raw: RawBivariatePoly) -> Result<Self> {
        let side = raw.coeffs.len();
        if side == 0 {
            return Err(VcheError::shape("bivariate polynomial without coefficients"));
        }
        if raw.modulus < 2 {
            return Err(VcheError::shape(format!("modulus {}", raw.modulus)));
        }
        for (i, row) in raw.coeffs.iter().enumerate() {
            if row.len() != side {
                return Err(VcheError::shape(format!(
                    "coefficient row {i} has {} entries, table side is {side}",
                    row.len()
                )));
            }
            for (j, &c) in row.iter().enumerate() {
                if c >= raw.modulus || (i + j >= side && c != 0) {
                    return Err(VcheError::shape(format!(
                        "coefficient ({i}, {j}) out of range for degree {}",
                        side - 1
                    )));
                }
            }
        }
        Ok(Self {
            coeffs: raw.coeffs,
            modulus: raw.modulus,
        })
    }
}

impl BivariatePoly {
    pub fn zero(degree: usize, modulus: u64) -> Self {
        Self {
            coeffs: vec![vec![0; degree + 1]; degree + 1],
            modulus,
        }
    }

    /// `a·u + b·v`, the closed form of a fresh PRF value.
    pub fn linear(a: u64, b: u64, modulus: u64) -> Self {
        let mut p = Self::zero(1, modulus);
        p.coeffs[1][0] = a % modulus;
        p.coeffs[0][1] = b % modulus;
        p
    }

    /// Side of the coefficient table minus one.
    pub fn degree(&self) -> usize {
        self.coeffs.len().saturating_sub(1)
    }

    pub fn modulus(&self) -> u64 {
        self.modulus
    }

    fn coeff(&self, i: usize, j: usize) -> u64 {
        self.coeffs
            .get(i)
            .and_then(|row| row.get(j))
            .copied()
            .unwrap_or(0)
    }

    fn zip_with(&self, other: &Self, f: impl Fn(u64, u64) -> u64) -> Self {
        let degree = self.degree().max(other.degree());
        let mut out = Self::zero(degree, self.modulus);
        for i in 0..=degree {
            for j in 0..=(degree - i) {
                out.coeffs[i][j] = f(self.coeff(i, j), other.coeff(i, j));
            }
        }
        out
    }

    pub fn add(&self, other: &Self) -> Self {
        let t = self.modulus;
        self.zip_with(other, |x, y| modular::add(x, y, t))
    }

    pub fn neg(&self) -> Self {
        let t = self.modulus;
        Self {
            coeffs: self
                .coeffs
                .iter()
                .map(|row| modular::neg_slots(row, t))
                .collect(),
            modulus: t,
        }
    }

    pub fn mul(&self, other: &Self) -> Self {
        let t = self.modulus;
        let (d0, d1) = (self.degree(), other.degree());
        let mut out = Self::zero(d0 + d1, t);
        for i0 in 0..=d0 {
            for j0 in 0..=(d0 - i0) {
                let x = self.coeffs[i0][j0];
                if x == 0 {
                    continue;
                }
                for i1 in 0..=d1 {
                    for j1 in 0..=(d1 - i1) {
                        let y = other.coeffs[i1][j1];
                        let cell = &mut out.coeffs[i0 + i1][j0 + j1];
                        *cell = modular::add(*cell, modular::mul(x, y, t), t);
                    }
                }
            }
        }
        out
    }

    /// Direct evaluation at one point.
    pub fn eval(&self, u: u64, v: u64) -> u64 {
        let t = self.modulus;
        // Horner in u over rows, each row Horner in v.
        let rows: Vec<u64> = self
            .coeffs
            .iter()
            .map(|row| modular::horner(row, v, t))
            .collect();
        modular::horner(&rows, u, t)
    }

    /// Evaluation from precomputed powers `u_pows[i] = u^i`, `v_pows[j] = v^j`;
    /// both tables need at least `degree + 1` entries.
    pub fn eval_with_powers(&self, u_pows: &[u64], v_pows: &[u64]) -> Result<u64> {
        let side = self.coeffs.len();
        if u_pows.len() < side || v_pows.len() < side {
            return Err(VcheError::shape(format!(
                "{} and {} powers for a polynomial of degree {}",
                u_pows.len(),
                v_pows.len(),
                self.degree()
            )));
        }
        let t = self.modulus;
        let mut acc = 0;
        for (row, &ui) in self.coeffs.iter().zip(u_pows) {
            for (&c, &vj) in row.iter().zip(v_pows) {
                if c != 0 {
                    let term = modular::mul(c, modular::mul(ui, vj, t), t);
                    acc = modular::add(acc, term, t);
                }
            }
        }
        Ok(acc)
    }
}

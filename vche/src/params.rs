//! Explicit protocol parameters, passed to every constructor.

use serde::{Deserialize, Serialize};

use crate::crypto::modular;
use crate::error::{Result, VcheError};

/// The Mersenne prime 2^61 - 1.
pub const DEFAULT_PLAINTEXT_MODULUS: u64 = (1u64 << 61) - 1;

/// Default batching width of the test backend.
pub const DEFAULT_SLOTS: usize = 1024;

/// Largest supported modulus (exclusive). Keeps sums of two residues in u64.
pub const MAX_PLAINTEXT_MODULUS: u64 = 1u64 << 62;

/// Batching and modulus parameters shared by the client, the server and the backend.
///
/// Slots are organised as two rows of `slots / 2` columns. With
/// `replications = λ > 1` every logical slot occupies λ consecutive physical
/// slots, so the logical width is `slots / λ`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawParameters")]
pub struct Parameters {
    slots: usize,
    plaintext_modulus: u64,
    replications: usize,
}

#[derive(Deserialize)]
struct RawParameters {
    slots: usize,
    plaintext_modulus: u64,
    #[serde(default = "one")]
    replications: usize,
}

fn one() -> usize {
    1
}

impl TryFrom<RawParameters> for Parameters {
    type Error = VcheError;

    fn try_from(raw: RawParameters) -> Result<Self> {
        Parameters::new(raw.slots, raw.plaintext_modulus, raw.replications)
    }
}

impl Parameters {
    pub fn new(slots: usize, plaintext_modulus: u64, replications: usize) -> Result<Self> {
        if slots < 2 || !slots.is_power_of_two() {
            return Err(VcheError::InvalidParameters(format!(
                "slot count must be a power of two >= 2, got {slots}"
            )));
        }
        if plaintext_modulus <= 2 || plaintext_modulus >= MAX_PLAINTEXT_MODULUS {
            return Err(VcheError::InvalidParameters(format!(
                "plaintext modulus must lie in (2, 2^62), got {plaintext_modulus}"
            )));
        }
        if !modular::is_prime(plaintext_modulus) {
            return Err(VcheError::InvalidParameters(format!(
                "plaintext modulus {plaintext_modulus} is not prime"
            )));
        }
        if replications == 0 || !replications.is_power_of_two() || replications > slots / 2 {
            return Err(VcheError::InvalidParameters(format!(
                "replications must be a power of two in [1, {}], got {replications}",
                slots / 2
            )));
        }
        Ok(Self {
            slots,
            plaintext_modulus,
            replications,
        })
    }

    /// Same slots and modulus with a different replication factor.
    pub fn with_replications(&self, replications: usize) -> Result<Self> {
        Self::new(self.slots, self.plaintext_modulus, replications)
    }

    /// Physical batching width.
    pub fn slots(&self) -> usize {
        self.slots
    }

    /// The plaintext modulus T.
    pub fn plaintext_modulus(&self) -> u64 {
        self.plaintext_modulus
    }

    pub fn replications(&self) -> usize {
        self.replications
    }

    /// Number of logical values one plaintext carries.
    pub fn logical_slots(&self) -> usize {
        self.slots / self.replications
    }

    /// Physical columns per row.
    pub fn row_width(&self) -> usize {
        self.slots / 2
    }

    /// Logical columns per row.
    pub fn logical_row_width(&self) -> usize {
        self.logical_slots() / 2
    }

    /// Physical column step for a rotation by `logical_step` logical slots.
    pub fn physical_step(&self, logical_step: usize) -> usize {
        (logical_step * self.replications) % self.row_width()
    }

    /// Replica index fed to the PRF for physical replica `j`; absent when
    /// slots are not replicated.
    pub(crate) fn replica_arg(&self, j: usize) -> Option<u64> {
        (self.replications > 1).then_some(j as u64)
    }

    /// Bits of modulus needed so that a degree-`degree` check errs with
    /// probability at most 2^-target_bits.
    pub fn modulus_bits_for(target_bits: u32, degree: usize) -> u32 {
        let degree = degree.max(1) as f64;
        target_bits + degree.log2().ceil() as u32
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            slots: DEFAULT_SLOTS,
            plaintext_modulus: DEFAULT_PLAINTEXT_MODULUS,
            replications: 1,
        }
    }
}

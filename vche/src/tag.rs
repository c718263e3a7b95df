//! Provenance tags bound to plaintext slots.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VcheError};

/// A (dataset-identifier, slot-label) pair naming the logical origin of one slot.
///
/// Equality is byte-wise equality of both components.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
    dataset: Vec<u8>,
    label: Vec<u8>,
}

impl Tag {
    pub fn new(dataset: impl Into<Vec<u8>>, label: impl Into<Vec<u8>>) -> Self {
        Self {
            dataset: dataset.into(),
            label: label.into(),
        }
    }

    pub fn dataset(&self) -> &[u8] {
        &self.dataset
    }

    pub fn label(&self) -> &[u8] {
        &self.label
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tag({}, {})",
            String::from_utf8_lossy(&self.dataset),
            String::from_utf8_lossy(&self.label)
        )
    }
}

/// Tags `(dataset, "0") … (dataset, "slot_count - 1")`.
pub fn derive_index_tags(dataset: &[u8], slot_count: usize) -> Vec<Tag> {
    (0..slot_count)
        .map(|i| Tag::new(dataset, i.to_string()))
        .collect()
}

/// Pair a shared dataset identifier with caller-supplied per-slot labels.
pub fn derive_tags<L: AsRef<[u8]>>(
    dataset: &[u8],
    labels: &[L],
    slot_count: usize,
) -> Result<Vec<Tag>> {
    if labels.len() != slot_count {
        return Err(VcheError::LengthMismatch {
            expected: slot_count,
            actual: labels.len(),
        });
    }
    Ok(labels
        .iter()
        .map(|label| Tag::new(dataset, label.as_ref()))
        .collect())
}

/// Check that a tag vector covers exactly `slot_count` slots.
pub(crate) fn check_len(tags: &[Tag], slot_count: usize) -> Result<()> {
    if tags.len() != slot_count {
        return Err(VcheError::LengthMismatch {
            expected: slot_count,
            actual: tags.len(),
        });
    }
    Ok(())
}

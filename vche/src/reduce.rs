//! Packing long vectors into blocks and the rotate-and-add reduction.
//!
//! Order of a reduction: per-block partial products, then a fold across
//! blocks, then `log2(row width)` column rotations within the block, then a
//! row rotation only when the data reaches the second row of a block.

use log::debug;

use crate::crypto::modular;
use crate::error::{Result, VcheError};
use crate::eval::Trace;
use crate::params::Parameters;
use crate::tag::{derive_index_tags, Tag};

/// How `used` logical values are spread over blocks of `logical_slots`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PackingLayout {
    logical_slots: usize,
    logical_row_width: usize,
    used: usize,
}

impl PackingLayout {
    pub fn new(params: &Parameters, used: usize) -> Result<Self> {
        if used == 0 {
            return Err(VcheError::InvalidParameters(
                "a packing layout needs at least one value".into(),
            ));
        }
        Ok(Self {
            logical_slots: params.logical_slots(),
            logical_row_width: params.logical_row_width(),
            used,
        })
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn logical_slots(&self) -> usize {
        self.logical_slots
    }

    pub fn blocks(&self) -> usize {
        self.used.div_ceil(self.logical_slots)
    }

    /// Meaningful entries in block `block`.
    pub fn used_in_block(&self, block: usize) -> usize {
        let start = block * self.logical_slots;
        self.used.saturating_sub(start).min(self.logical_slots)
    }

    /// Logical column steps `1, 2, 4, … < row width`.
    pub fn column_steps(&self) -> Vec<usize> {
        let mut steps = Vec::new();
        let mut k = 1;
        while k < self.logical_row_width {
            steps.push(k);
            k <<= 1;
        }
        steps
    }

    /// After folding, data occupies the second row of the block iff some
    /// block carries more values than one row holds. Only the first block
    /// can, and it does whenever there is more than one block.
    pub fn needs_row_rotation(&self) -> bool {
        self.used_in_block(0) > self.logical_row_width
    }
}

/// One zero-padded block with its tags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedBlock {
    pub values: Vec<u64>,
    pub tags: Vec<Tag>,
}

/// Dataset identifier of block `block` of `dataset`.
pub fn block_dataset(dataset: &[u8], block: usize) -> Vec<u8> {
    let mut id = dataset.to_vec();
    id.extend_from_slice(format!("/{block}").as_bytes());
    id
}

/// Split `values` into zero-padded blocks. Slots are tagged by in-block index
/// under a per-block dataset identifier, so index tags are shared by every
/// block while each slot still names a unique origin.
pub fn pack(dataset: &[u8], values: &[u64], layout: &PackingLayout) -> Result<Vec<PackedBlock>> {
    if values.len() != layout.used {
        return Err(VcheError::LengthMismatch {
            expected: layout.used,
            actual: values.len(),
        });
    }
    Ok(values
        .chunks(layout.logical_slots)
        .enumerate()
        .map(|(b, chunk)| {
            let mut block = chunk.to_vec();
            block.resize(layout.logical_slots, 0);
            PackedBlock {
                values: block,
                tags: derive_index_tags(&block_dataset(dataset, b), layout.logical_slots),
            }
        })
        .collect())
}

/// Fold `partials` and reduce within the block. Returns the register whose
/// slot 0 holds the total.
pub fn reduce(trace: &mut Trace, partials: &[usize], layout: &PackingLayout) -> Result<usize> {
    let (&first, rest) = partials
        .split_first()
        .ok_or_else(|| VcheError::shape("nothing to reduce"))?;
    if partials.len() != layout.blocks() {
        return Err(VcheError::LengthMismatch {
            expected: layout.blocks(),
            actual: partials.len(),
        });
    }
    let mut acc = first;
    for &p in rest {
        acc = trace.add(acc, p)?;
    }
    for step in layout.column_steps() {
        let rotated = trace.rotate_columns(acc, step)?;
        acc = trace.add(acc, rotated)?;
    }
    let row = layout.needs_row_rotation();
    if row {
        let swapped = trace.rotate_rows(acc)?;
        acc = trace.add(acc, swapped)?;
    }
    debug!(
        "reduction over {} block(s): {} column rotation(s), row rotation: {row}",
        layout.blocks(),
        layout.column_steps().len()
    );
    Ok(acc)
}

/// Append the inner product of the blocks in registers `a` and `b`:
/// per-block product and relinearization, then [`reduce`].
pub fn inner_product(
    trace: &mut Trace,
    a: &[usize],
    b: &[usize],
    layout: &PackingLayout,
) -> Result<usize> {
    if a.len() != b.len() {
        return Err(VcheError::LengthMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    let partials = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| {
            let product = trace.mul(x, y)?;
            trace.relinearize(product)
        })
        .collect::<Result<Vec<_>>>()?;
    reduce(trace, &partials, layout)
}

/// Trace over inputs `a_0 … a_{k-1}, b_0 … b_{k-1}` (k blocks) computing the
/// inner product.
pub fn inner_product_trace(layout: &PackingLayout) -> Result<Trace> {
    let k = layout.blocks();
    let mut trace = Trace::new(2 * k);
    let a: Vec<usize> = (0..k).collect();
    let b: Vec<usize> = (k..2 * k).collect();
    inner_product(&mut trace, &a, &b, layout)?;
    Ok(trace)
}

/// Trace over `k` already-reduced partial products.
pub fn fold_trace(layout: &PackingLayout) -> Result<Trace> {
    let k = layout.blocks();
    let mut trace = Trace::new(k);
    let partials: Vec<usize> = (0..k).collect();
    reduce(&mut trace, &partials, layout)?;
    Ok(trace)
}

/// Physical rotation steps a backend needs keys for to run [`reduce`].
pub fn physical_column_steps(params: &Parameters, layout: &PackingLayout) -> Vec<usize> {
    layout
        .column_steps()
        .into_iter()
        .map(|step| params.physical_step(step))
        .collect()
}

/// Reference: pairwise summation in Z_t.
pub fn naive_sum(values: &[u64], t: u64) -> u64 {
    values.iter().fold(0, |acc, &v| modular::add(acc, v % t, t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{replay, PlainEvaluator};

    fn params() -> Parameters {
        Parameters::new(16, 65537, 1).unwrap()
    }

    fn fold_plain(values: &[u64]) -> u64 {
        let params = params();
        let layout = PackingLayout::new(&params, values.len()).unwrap();
        let blocks: Vec<Vec<u64>> = pack(b"x", values, &layout)
            .unwrap()
            .into_iter()
            .map(|b| b.values)
            .collect();
        let trace = fold_trace(&layout).unwrap();
        replay(&PlainEvaluator::new(params), &trace, &blocks).unwrap()[0]
    }

    #[test]
    fn layout_boundaries() {
        let p = params();
        let single_row = PackingLayout::new(&p, 8).unwrap();
        assert_eq!(single_row.blocks(), 1);
        assert!(!single_row.needs_row_rotation());

        let two_rows = PackingLayout::new(&p, 9).unwrap();
        assert!(two_rows.needs_row_rotation());

        let full = PackingLayout::new(&p, 16).unwrap();
        assert_eq!(full.blocks(), 1);
        assert!(full.needs_row_rotation());

        let spill = PackingLayout::new(&p, 17).unwrap();
        assert_eq!(spill.blocks(), 2);
        assert_eq!(spill.used_in_block(1), 1);
        assert!(spill.needs_row_rotation());

        assert_eq!(full.column_steps(), vec![1, 2, 4]);
        assert!(PackingLayout::new(&p, 0).is_err());
    }

    #[test]
    fn packing_pads_and_tags_blocks() {
        let p = params();
        let layout = PackingLayout::new(&p, 20).unwrap();
        let values: Vec<u64> = (0..20).collect();
        let blocks = pack(b"snp", &values, &layout).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].values[..4], [16, 17, 18, 19]);
        assert!(blocks[1].values[4..].iter().all(|&v| v == 0));
        assert_eq!(blocks[0].tags[3], Tag::new("snp/0", "3"));
        assert_eq!(blocks[1].tags[3], Tag::new("snp/1", "3"));
        assert!(pack(b"snp", &values[..3], &layout).is_err());
    }

    #[test]
    fn fold_matches_naive_sum_at_boundaries() {
        for n in [1usize, 2, 3, 8, 9, 16, 17, 40] {
            let values: Vec<u64> = (1..=n as u64).map(|v| v * 1000 + 7).collect();
            assert_eq!(fold_plain(&values), naive_sum(&values, 65537), "n = {n}");
        }
    }

    #[test]
    fn inner_product_trace_shape() {
        let p = params();
        let layout = PackingLayout::new(&p, 5).unwrap();
        let trace = inner_product_trace(&layout).unwrap();
        // mul, relin, 3 × (rotate, add), no row rotation
        assert_eq!(trace.len(), 8);

        let a = pack(b"a", &[1, 2, 3, 4, 5], &layout).unwrap();
        let b = pack(b"b", &[6, 7, 8, 9, 10], &layout).unwrap();
        let out = replay(
            &PlainEvaluator::new(p),
            &trace,
            &[a[0].values.clone(), b[0].values.clone()],
        )
        .unwrap();
        assert_eq!(out[0], 130);
    }

    #[test]
    fn inner_product_rejects_unpaired_blocks() {
        let p = params();
        let layout = PackingLayout::new(&p, 20).unwrap();
        let mut trace = Trace::new(3);
        assert!(inner_product(&mut trace, &[0, 1], &[2], &layout).is_err());
    }

    #[test]
    fn physical_steps_scale_with_replication() {
        let p = Parameters::new(32, 65537, 4).unwrap();
        let layout = PackingLayout::new(&p, 8).unwrap();
        assert_eq!(layout.column_steps(), vec![1, 2]);
        assert_eq!(physical_column_steps(&p, &layout), vec![4, 8]);
    }
}

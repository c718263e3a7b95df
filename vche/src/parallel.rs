//! Block-parallel evaluation.
//!
//! Packed blocks are independent until the fold, so the per-block products
//! run on the rayon pool; each block still advances both tracks together.
//! The fold and the in-block reduction start only once every block is done.

use log::debug;
use rayon::prelude::*;

use crate::error::{Result, VcheError};
use crate::eval::{replay, Evaluator, Lockstep};
use crate::reduce::{fold_trace, PackingLayout};

/// Lockstep inner product over `k` blocks.
///
/// Inputs are laid out as for [`crate::reduce::inner_product_trace`]:
/// `a_0 … a_{k-1}, b_0 … b_{k-1}` on each track. The result is identical to
/// replaying that trace with [`crate::eval::replay_lockstep`].
pub fn inner_product_blocks<C, V>(
    ciphertext: &C,
    verification: &V,
    ciphertext_inputs: &[C::Value],
    verification_inputs: &[V::Value],
    layout: &PackingLayout,
) -> Result<(C::Value, V::Value)>
where
    C: Evaluator + Sync,
    V: Evaluator + Sync,
    C::Value: Send + Sync,
    V::Value: Send + Sync,
{
    let k = layout.blocks();
    for actual in [ciphertext_inputs.len(), verification_inputs.len()] {
        if actual != 2 * k {
            return Err(VcheError::LengthMismatch {
                expected: 2 * k,
                actual,
            });
        }
    }
    let lockstep = Lockstep::new(ciphertext, verification);

    let partials: Result<Vec<(C::Value, V::Value)>> = (0..k)
        .into_par_iter()
        .map(|b| {
            let a = (ciphertext_inputs[b].clone(), verification_inputs[b].clone());
            let other = (
                ciphertext_inputs[k + b].clone(),
                verification_inputs[k + b].clone(),
            );
            let product = lockstep.mul(&a, &other)?;
            lockstep.relinearize(&product)
        })
        .collect();
    let partials = partials?;
    debug!("{k} block product(s) done, folding");

    replay(&lockstep, &fold_trace(layout)?, &partials)
}

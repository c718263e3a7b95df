//! The shared operation vocabulary of both tracks and the lockstep replay.
//!
//! Every track (real ciphertexts, verification objects, clear reference
//! values) implements [`Evaluator`]. A computation is written once as a
//! [`Trace`] and replayed against each track with [`replay`]; pairing two
//! evaluators in a [`Lockstep`] makes "one verification-track operation per
//! ciphertext-track operation, in the same order" a property of the types.

use log::trace;
use serde::{Deserialize, Serialize};

use crate::crypto::modular;
use crate::error::{Result, VcheError};
use crate::params::Parameters;
use crate::slots;

/// One circuit operation. Rotation steps are in logical slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Op {
    Neg,
    Add,
    Mul,
    Relinearize,
    RotateColumns(usize),
    RotateRows,
}

impl Op {
    pub fn arity(&self) -> usize {
        match self {
            Op::Add | Op::Mul => 2,
            _ => 1,
        }
    }

    /// Stable code hashed into operation chains.
    pub(crate) fn code(&self) -> u8 {
        match self {
            Op::Neg => 0x01,
            Op::Add => 0x02,
            Op::Mul => 0x03,
            Op::Relinearize => 0x04,
            Op::RotateColumns(_) => 0x05,
            Op::RotateRows => 0x06,
        }
    }

    pub(crate) fn param(&self) -> u64 {
        match self {
            Op::RotateColumns(k) => *k as u64,
            _ => 0,
        }
    }
}

/// An evaluator over one track.
pub trait Evaluator {
    type Value: Clone;

    fn neg(&self, a: &Self::Value) -> Result<Self::Value>;

    fn add(&self, a: &Self::Value, b: &Self::Value) -> Result<Self::Value>;

    /// Result has a higher-degree representation until relinearized.
    fn mul(&self, a: &Self::Value, b: &Self::Value) -> Result<Self::Value>;

    fn relinearize(&self, a: &Self::Value) -> Result<Self::Value>;

    /// Cyclic left rotation of each row by `step` logical slots.
    fn rotate_columns(&self, a: &Self::Value, step: usize) -> Result<Self::Value>;

    fn rotate_rows(&self, a: &Self::Value) -> Result<Self::Value>;

    fn sub(&self, a: &Self::Value, b: &Self::Value) -> Result<Self::Value> {
        let negated = self.neg(b)?;
        self.add(a, &negated)
    }

    /// Dispatch one [`Op`] on its operands.
    fn apply(&self, op: Op, operands: &[&Self::Value]) -> Result<Self::Value> {
        if operands.len() != op.arity() {
            return Err(VcheError::LengthMismatch {
                expected: op.arity(),
                actual: operands.len(),
            });
        }
        match op {
            Op::Neg => self.neg(operands[0]),
            Op::Add => self.add(operands[0], operands[1]),
            Op::Mul => self.mul(operands[0], operands[1]),
            Op::Relinearize => self.relinearize(operands[0]),
            Op::RotateColumns(k) => self.rotate_columns(operands[0], k),
            Op::RotateRows => self.rotate_rows(operands[0]),
        }
    }
}

/// One trace instruction: apply `op` to earlier registers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub op: Op,
    pub operands: Vec<usize>,
}

/// A register program. Registers `0..inputs` are the inputs; step `i`
/// writes register `inputs + i`. The last register is the output.
///
/// Deserialization runs every step through [`Trace::push`], so a decoded
/// trace never reads an undefined register.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTrace")]
pub struct Trace {
    inputs: usize,
    steps: Vec<Step>,
}

#[derive(Deserialize)]
struct RawTrace {
    inputs: usize,
    steps: Vec<Step>,
}

impl TryFrom<RawTrace> for Trace {
    type Error = VcheError;

    fn try_from(raw: RawTrace) -> Result<Self> {
        let mut trace = Trace::new(raw.inputs);
        for step in raw.steps {
            trace.push(step.op, &step.operands)?;
        }
        Ok(trace)
    }
}

impl Trace {
    pub fn new(inputs: usize) -> Self {
        Self {
            inputs,
            steps: Vec::new(),
        }
    }

    pub fn inputs(&self) -> usize {
        self.inputs
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of registers defined so far.
    pub fn registers(&self) -> usize {
        self.inputs + self.steps.len()
    }

    /// Register holding the result.
    pub fn output(&self) -> Option<usize> {
        self.registers().checked_sub(1)
    }

    /// Append a step and return its output register.
    pub fn push(&mut self, op: Op, operands: &[usize]) -> Result<usize> {
        if operands.len() != op.arity() {
            return Err(VcheError::LengthMismatch {
                expected: op.arity(),
                actual: operands.len(),
            });
        }
        let defined = self.registers();
        if let Some(&r) = operands.iter().find(|&&r| r >= defined) {
            return Err(VcheError::shape(format!(
                "register {r} used before definition ({defined} defined)"
            )));
        }
        self.steps.push(Step {
            op,
            operands: operands.to_vec(),
        });
        Ok(defined)
    }

    pub fn neg(&mut self, a: usize) -> Result<usize> {
        self.push(Op::Neg, &[a])
    }

    pub fn add(&mut self, a: usize, b: usize) -> Result<usize> {
        self.push(Op::Add, &[a, b])
    }

    pub fn mul(&mut self, a: usize, b: usize) -> Result<usize> {
        self.push(Op::Mul, &[a, b])
    }

    pub fn relinearize(&mut self, a: usize) -> Result<usize> {
        self.push(Op::Relinearize, &[a])
    }

    pub fn rotate_columns(&mut self, a: usize, step: usize) -> Result<usize> {
        self.push(Op::RotateColumns(step), &[a])
    }

    pub fn rotate_rows(&mut self, a: usize) -> Result<usize> {
        self.push(Op::RotateRows, &[a])
    }

    /// Rebuild with step `index` removed; later operands are renumbered so the
    /// removed register reads its first operand instead.
    pub fn without_step(&self, index: usize) -> Result<Trace> {
        let removed = self
            .steps
            .get(index)
            .ok_or_else(|| VcheError::shape(format!("no step {index}")))?;
        let dropped_reg = self.inputs + index;
        let replacement = removed.operands[0];
        let mut out = Trace::new(self.inputs);
        for (i, step) in self.steps.iter().enumerate() {
            if i == index {
                continue;
            }
            let operands: Vec<usize> = step
                .operands
                .iter()
                .map(|&r| match r.cmp(&dropped_reg) {
                    std::cmp::Ordering::Less => r,
                    std::cmp::Ordering::Equal => replacement,
                    std::cmp::Ordering::Greater => r - 1,
                })
                .collect();
            out.push(step.op, &operands)?;
        }
        Ok(out)
    }
}

/// Evaluate `trace` on one track.
pub fn replay<E: Evaluator>(eval: &E, trace: &Trace, inputs: &[E::Value]) -> Result<E::Value> {
    if inputs.len() != trace.inputs {
        return Err(VcheError::LengthMismatch {
            expected: trace.inputs,
            actual: inputs.len(),
        });
    }
    let mut registers: Vec<E::Value> = inputs.to_vec();
    for (i, step) in trace.steps.iter().enumerate() {
        trace!("step {i}: {:?} {:?}", step.op, step.operands);
        let operands = step
            .operands
            .iter()
            .map(|&r| {
                registers.get(r).ok_or_else(|| {
                    VcheError::shape(format!("step {i} reads undefined register {r}"))
                })
            })
            .collect::<Result<Vec<&E::Value>>>()?;
        let value = eval.apply(step.op, &operands)?;
        registers.push(value);
    }
    registers
        .pop()
        .ok_or_else(|| VcheError::shape("empty trace with no inputs"))
}

/// Two evaluators advanced together: each operation runs on the ciphertext
/// track and then on the verification track.
pub struct Lockstep<'a, C, V> {
    ciphertext: &'a C,
    verification: &'a V,
}

impl<'a, C: Evaluator, V: Evaluator> Lockstep<'a, C, V> {
    pub fn new(ciphertext: &'a C, verification: &'a V) -> Self {
        Self {
            ciphertext,
            verification,
        }
    }
}

impl<C: Evaluator, V: Evaluator> Evaluator for Lockstep<'_, C, V> {
    type Value = (C::Value, V::Value);

    fn neg(&self, a: &Self::Value) -> Result<Self::Value> {
        Ok((self.ciphertext.neg(&a.0)?, self.verification.neg(&a.1)?))
    }

    fn add(&self, a: &Self::Value, b: &Self::Value) -> Result<Self::Value> {
        Ok((
            self.ciphertext.add(&a.0, &b.0)?,
            self.verification.add(&a.1, &b.1)?,
        ))
    }

    fn mul(&self, a: &Self::Value, b: &Self::Value) -> Result<Self::Value> {
        Ok((
            self.ciphertext.mul(&a.0, &b.0)?,
            self.verification.mul(&a.1, &b.1)?,
        ))
    }

    fn relinearize(&self, a: &Self::Value) -> Result<Self::Value> {
        Ok((
            self.ciphertext.relinearize(&a.0)?,
            self.verification.relinearize(&a.1)?,
        ))
    }

    fn rotate_columns(&self, a: &Self::Value, step: usize) -> Result<Self::Value> {
        Ok((
            self.ciphertext.rotate_columns(&a.0, step)?,
            self.verification.rotate_columns(&a.1, step)?,
        ))
    }

    fn rotate_rows(&self, a: &Self::Value) -> Result<Self::Value> {
        Ok((
            self.ciphertext.rotate_rows(&a.0)?,
            self.verification.rotate_rows(&a.1)?,
        ))
    }
}

/// Replay one trace on both tracks in lockstep.
pub fn replay_lockstep<C: Evaluator, V: Evaluator>(
    ciphertext: &C,
    verification: &V,
    trace: &Trace,
    ciphertext_inputs: &[C::Value],
    verification_inputs: &[V::Value],
) -> Result<(C::Value, V::Value)> {
    if ciphertext_inputs.len() != verification_inputs.len() {
        return Err(VcheError::LengthMismatch {
            expected: ciphertext_inputs.len(),
            actual: verification_inputs.len(),
        });
    }
    let pairs: Vec<(C::Value, V::Value)> = ciphertext_inputs
        .iter()
        .cloned()
        .zip(verification_inputs.iter().cloned())
        .collect();
    replay(&Lockstep::new(ciphertext, verification), trace, &pairs)
}

/// Non-verifying reference evaluation on clear logical slot vectors.
pub struct PlainEvaluator {
    params: Parameters,
}

impl PlainEvaluator {
    pub fn new(params: Parameters) -> Self {
        Self { params }
    }

    fn check(&self, a: &[u64]) -> Result<()> {
        if a.len() != self.params.logical_slots() {
            return Err(VcheError::LengthMismatch {
                expected: self.params.logical_slots(),
                actual: a.len(),
            });
        }
        Ok(())
    }
}

impl Evaluator for PlainEvaluator {
    type Value = Vec<u64>;

    fn neg(&self, a: &Vec<u64>) -> Result<Vec<u64>> {
        self.check(a)?;
        Ok(modular::neg_slots(a, self.params.plaintext_modulus()))
    }

    fn add(&self, a: &Vec<u64>, b: &Vec<u64>) -> Result<Vec<u64>> {
        self.check(a)?;
        self.check(b)?;
        Ok(modular::add_slots(a, b, self.params.plaintext_modulus()))
    }

    fn mul(&self, a: &Vec<u64>, b: &Vec<u64>) -> Result<Vec<u64>> {
        self.check(a)?;
        self.check(b)?;
        Ok(modular::mul_slots(a, b, self.params.plaintext_modulus()))
    }

    fn relinearize(&self, a: &Vec<u64>) -> Result<Vec<u64>> {
        Ok(a.clone())
    }

    fn rotate_columns(&self, a: &Vec<u64>, step: usize) -> Result<Vec<u64>> {
        self.check(a)?;
        Ok(slots::rotate_columns(a, step))
    }

    fn rotate_rows(&self, a: &Vec<u64>) -> Result<Vec<u64>> {
        self.check(a)?;
        Ok(slots::rotate_rows(a))
    }
}

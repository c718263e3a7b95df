//! One client/server round trip, run in process.
//!
//! The client packs two random vectors, encrypts them together with their
//! verification plaintexts, and hands both tracks to the server half, which
//! replays the blocked inner product in lockstep. The client then decodes
//! slot 0 and either accepts it or reports why it refused.

use std::fmt;

use anyhow::{Context, Result};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use vche::backend::toy::{ToyBfv, ToyEvaluationKey, ToySecretKey};
use vche::backend::{inner_sum_steps, HomomorphicBackend};
use vche::compressed::CompressedEvaluator;
use vche::crypto::prf::PrfMode;
use vche::error::{VcheError, VerificationFailure};
use vche::outsourced::{run_polynomial_protocol, Prover, Verifier};
use vche::parallel::inner_product_blocks;
use vche::params::Parameters;
use vche::polynomial::{
    decrypt_poly, encrypt_poly, PolyCiphertextEvaluator, PolyVerificationEvaluator,
    PolynomialEncoder, PolynomialKey,
};
use vche::reduce::{naive_sum, pack, physical_column_steps, PackedBlock, PackingLayout};
use vche::replicated::{
    decrypt_tagged, encrypt_tagged, ReplicatedCiphertextEvaluator, ReplicatedEncoder,
    ReplicatedKey, TaggedCompressedEvaluator, TaggedPolyEvaluator,
};
use vche::verified_type::{SoundnessBound, Verified};

use crate::config::{DemoConfig, SchemeKind};

/// Largest input value; keeps the clear products readable in logs.
const INPUT_BOUND: u64 = 1 << 16;

/// What the client concluded about the returned result.
#[derive(Clone, Debug, PartialEq)]
pub enum Verdict {
    Accepted {
        value: u64,
        soundness: SoundnessBound,
    },
    Rejected(VerificationFailure),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Outcome {
    pub scheme: SchemeKind,
    /// The inner product computed in the clear.
    pub expected: u64,
    pub verdict: Verdict,
}

impl Outcome {
    /// Accepted and equal to the clear inner product.
    pub fn accepted(&self) -> bool {
        matches!(self.verdict, Verdict::Accepted { value, .. } if value == self.expected)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.verdict {
            Verdict::Accepted { value, soundness } => {
                write!(
                    f,
                    "[{}] accepted {value} (expected {}, {:.1} bits)",
                    self.scheme,
                    self.expected,
                    soundness.security_bits()
                )
            }
            Verdict::Rejected(failure) => write!(f, "[{}] rejected: {failure}", self.scheme),
        }
    }
}

/// Inputs and keys shared by every scheme.
pub struct Session {
    config: DemoConfig,
    params: Parameters,
    layout: PackingLayout,
    a: Vec<u64>,
    b: Vec<u64>,
}

impl Session {
    pub fn new(config: &DemoConfig) -> Result<Self> {
        let params = config.params()?;
        let layout = PackingLayout::new(&params, config.length)?;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let bound = INPUT_BOUND.min(params.plaintext_modulus());
        let a = (0..config.length).map(|_| rng.gen_range(0..bound)).collect();
        let b = (0..config.length).map(|_| rng.gen_range(0..bound)).collect();
        Ok(Self {
            config: config.clone(),
            params,
            layout,
            a,
            b,
        })
    }

    /// Convenience for `Session::new(config)?.execute(tamper)`.
    pub fn run(config: &DemoConfig, tamper: bool) -> Result<Outcome> {
        Self::new(config)?.execute(tamper)
    }

    pub fn inputs(&self) -> (&[u64], &[u64]) {
        (&self.a, &self.b)
    }

    pub fn expected(&self) -> u64 {
        let t = self.params.plaintext_modulus();
        let products: Vec<u64> = self
            .a
            .iter()
            .zip(&self.b)
            .map(|(&x, &y)| ((x as u128 * y as u128) % t as u128) as u64)
            .collect();
        naive_sum(&products, t)
    }

    /// Run the round trip; `tamper` makes the server corrupt one coefficient
    /// of its result before returning it.
    pub fn execute(&self, tamper: bool) -> Result<Outcome> {
        // keys and inputs use separate streams so both are reproducible
        let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(1));
        let backend = ToyBfv::new(self.params);
        let (sk, evk) = self.keys(&backend, &mut rng)?;
        info!(
            "{} session: {} values in {} block(s) of {} logical slots",
            self.config.scheme,
            self.config.length,
            self.layout.blocks(),
            self.layout.logical_slots()
        );

        let decoded = match self.config.scheme {
            SchemeKind::Replicated => self.replicated(&backend, &sk, &evk, &mut rng, tamper)?,
            SchemeKind::Polynomial => self.polynomial(&backend, &sk, &evk, &mut rng, tamper)?,
            SchemeKind::Outsourced => self.outsourced(&backend, &sk, &evk, &mut rng, tamper)?,
        };
        let verdict = match decoded {
            Ok(verified) => {
                let soundness = verified.soundness();
                let value = verified
                    .unwrap_verified()
                    .first()
                    .copied()
                    .context("decoder returned no slots")?;
                Verdict::Accepted { value, soundness }
            }
            Err(failure) => Verdict::Rejected(failure),
        };
        Ok(Outcome {
            scheme: self.config.scheme,
            expected: self.expected(),
            verdict,
        })
    }

    fn keys(
        &self,
        backend: &ToyBfv,
        rng: &mut StdRng,
    ) -> Result<(ToySecretKey, ToyEvaluationKey)> {
        let sk = backend.keygen(rng);
        let mut steps = physical_column_steps(&self.params, &self.layout);
        steps.extend(inner_sum_steps(&self.params));
        steps.sort_unstable();
        steps.dedup();
        let evk = backend
            .gen_evaluation_key(&sk, &steps, true)
            .context("generating evaluation keys")?;
        debug!("evaluation keys for column steps {steps:?} and rows");
        Ok((sk, evk))
    }

    /// Blocks of `a` followed by blocks of `b`, the input order of the inner product.
    fn blocks(&self) -> Result<Vec<PackedBlock>> {
        let mut blocks = pack(b"a", &self.a, &self.layout)?;
        blocks.extend(pack(b"b", &self.b, &self.layout)?);
        Ok(blocks)
    }

    fn mode(&self) -> PrfMode {
        if self.config.closed_form {
            PrfMode::ClosedForm
        } else {
            PrfMode::Direct
        }
    }

    fn tamper_with(&self, coefficient: &mut u64) {
        let t = self.params.plaintext_modulus();
        *coefficient = (*coefficient + 1) % t;
        info!("server corrupted one result coefficient");
    }

    fn replicated(
        &self,
        backend: &ToyBfv,
        sk: &ToySecretKey,
        evk: &ToyEvaluationKey,
        rng: &mut StdRng,
        tamper: bool,
    ) -> Result<Decoded> {
        let key = ReplicatedKey::generate(rng, &self.params, self.mode())?;
        let encoder = ReplicatedEncoder::new(&key, self.params)?;
        let blocks = self.blocks()?;
        let cts = blocks
            .iter()
            .map(|block| {
                let pt = encoder.encode(&block.values, &block.tags)?;
                encrypt_tagged(backend, &pt, sk, rng)
            })
            .collect::<vche::error::Result<Vec<_>>>()?;
        let ce = ReplicatedCiphertextEvaluator::new(backend, evk);

        if self.config.closed_form {
            let verifs = blocks
                .iter()
                .map(|block| encoder.encode_compressed(&block.tags))
                .collect::<vche::error::Result<Vec<_>>>()?;
            let ve = TaggedCompressedEvaluator::new(self.params);
            let (mut ct, verif) = inner_product_blocks(&ce, &ve, &cts, &verifs, &self.layout)?;
            if tamper {
                self.tamper_with(&mut ct.ct.components[0][0]);
            }
            let opener = encoder.opener(&blocks[0].tags)?;
            let pt = decrypt_tagged(backend, &ct, sk)?;
            first_slot(encoder.decode_compressed(&pt, &verif, &opener, 1))
        } else {
            let verifs = blocks
                .iter()
                .map(|block| encoder.encode_verification(&block.tags))
                .collect::<vche::error::Result<Vec<_>>>()?;
            let ve = TaggedPolyEvaluator::new(self.params);
            let (mut ct, verif) = inner_product_blocks(&ce, &ve, &cts, &verifs, &self.layout)?;
            if tamper {
                self.tamper_with(&mut ct.ct.components[0][0]);
            }
            let pt = decrypt_tagged(backend, &ct, sk)?;
            first_slot(encoder.decode(&pt, &verif, 1))
        }
    }

    fn polynomial(
        &self,
        backend: &ToyBfv,
        sk: &ToySecretKey,
        evk: &ToyEvaluationKey,
        rng: &mut StdRng,
        tamper: bool,
    ) -> Result<Decoded> {
        let key = PolynomialKey::generate(rng, &self.params, self.mode())?;
        let encoder = PolynomialEncoder::new(&key, self.params);
        let blocks = self.blocks()?;
        let cts = blocks
            .iter()
            .map(|block| {
                let pt = encoder.encode(&block.values, &block.tags)?;
                encrypt_poly(backend, &pt, sk, rng)
            })
            .collect::<vche::error::Result<Vec<_>>>()?;
        let ce = PolyCiphertextEvaluator::new(backend, evk);

        if self.config.closed_form {
            let verifs = blocks
                .iter()
                .map(|block| encoder.encode_compressed(&block.tags))
                .collect::<vche::error::Result<Vec<_>>>()?;
            let ve = CompressedEvaluator::new(self.params);
            let (mut ct, verif) = inner_product_blocks(&ce, &ve, &cts, &verifs, &self.layout)?;
            if tamper {
                self.tamper_with(&mut ct.components[0].components[0][0]);
            }
            let opener = encoder.opener(&blocks[0].tags)?;
            let pt = decrypt_poly(backend, &ct, sk)?;
            first_slot(encoder.decode_compressed(&pt, &verif, &opener, 1))
        } else {
            let verifs = blocks
                .iter()
                .map(|block| encoder.encode_verification(&block.tags))
                .collect::<vche::error::Result<Vec<_>>>()?;
            let ve = PolyVerificationEvaluator::new(self.params);
            let (mut ct, verif) = inner_product_blocks(&ce, &ve, &cts, &verifs, &self.layout)?;
            if tamper {
                self.tamper_with(&mut ct.components[0].components[0][0]);
            }
            let pt = decrypt_poly(backend, &ct, sk)?;
            first_slot(encoder.decode(&pt, &verif, 1))
        }
    }

    /// The polynomial scheme with the final check delegated to a prover that
    /// holds only the evaluation key.
    fn outsourced(
        &self,
        backend: &ToyBfv,
        sk: &ToySecretKey,
        evk: &ToyEvaluationKey,
        rng: &mut StdRng,
        tamper: bool,
    ) -> Result<Decoded> {
        let key = PolynomialKey::generate(rng, &self.params, PrfMode::Direct)?;
        let encoder = PolynomialEncoder::new(&key, self.params);
        let blocks = self.blocks()?;
        let mut cts = Vec::with_capacity(blocks.len());
        let mut verifs = Vec::with_capacity(blocks.len());
        for block in &blocks {
            let pt = encoder.encode(&block.values, &block.tags)?;
            cts.push(encrypt_poly(backend, &pt, sk, rng)?);
            verifs.push(encoder.encode_verification(&block.tags)?);
        }
        let (mut ct, verif) = inner_product_blocks(
            &PolyCiphertextEvaluator::new(backend, evk),
            &PolyVerificationEvaluator::new(self.params),
            &cts,
            &verifs,
            &self.layout,
        )?;
        if tamper {
            self.tamper_with(&mut ct.components[0].components[0][0]);
        }
        let prover = Prover::new(backend, evk);
        let verifier = Verifier::new(backend, sk, key.outsourced());
        first_slot(run_polynomial_protocol(&prover, &verifier, &ct, &verif, rng))
    }
}

type Decoded = std::result::Result<Verified<Vec<u64>>, VerificationFailure>;

/// Separate a verification refusal from a genuine error.
fn first_slot(result: vche::error::Result<Verified<Vec<u64>>>) -> Result<Decoded> {
    match result {
        Ok(verified) => Ok(Ok(verified)),
        Err(VcheError::Verification(failure)) => Ok(Err(failure)),
        Err(err) => Err(err.into()),
    }
}

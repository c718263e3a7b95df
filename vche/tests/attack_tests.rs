//! Protocol-layer attack tests for vche.
//!
//! A dishonest server deviates from the claimed trace on the ciphertext track
//! (wrong operand, dropped step, reordered steps), corrupts a ciphertext
//! coefficient, or swaps in verification objects bound to another key. Every
//! deviation must surface as a decode-time `VerificationFailure`.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use vche::backend::toy::{ToyBfv, ToyCiphertext, ToyEvaluationKey, ToySecretKey};
use vche::backend::{inner_sum_steps, HomomorphicBackend};
use vche::compressed::{CompressedVerification, RotInfo};
use vche::crypto::prf::PrfMode;
use vche::error::{FailureReason, Result, VcheError};
use vche::eval::{replay, Trace};
use vche::outsourced::{run_polynomial_protocol, Prover, Verifier};
use vche::params::Parameters;
use vche::polynomial::{
    decrypt_poly, encrypt_poly, PolyCiphertext, PolyCiphertextEvaluator, PolyVerification,
    PolyVerificationEvaluator, PolynomialEncoder, PolynomialKey,
};
use vche::replicated::{
    decrypt_tagged, encrypt_tagged, ReplicatedCiphertextEvaluator, ReplicatedEncoder,
    ReplicatedKey, TaggedCiphertext, TaggedCompressedEvaluator, TaggedPoly, TaggedPolyEvaluator,
};
use vche::serialize::{from_bytes, to_bytes};
use vche::tag::{derive_index_tags, derive_tags, Tag};
use vche::types::Hash;
use vche::verified_type::{SoundnessBound, Verified};

const T: u64 = 65537;
const A: [u64; 8] = [1, 2, 3, 4, 5, 6, 7, 8];
const B: [u64; 8] = [10, 20, 30, 40, 50, 60, 70, 80];

// ═══════════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════════

fn reason<V>(result: Result<V>) -> Option<FailureReason> {
    match result {
        Err(err) => err.verification_failure().map(|f| f.reason),
        Ok(_) => None,
    }
}

fn tags() -> (Vec<Tag>, Vec<Tag>) {
    (derive_index_tags(b"a", 8), derive_index_tags(b"b", 8))
}

/// rotate(a + b, 1) · a
fn claimed() -> Trace {
    let mut t = Trace::new(2);
    let s = t.add(0, 1).unwrap();
    let r = t.rotate_columns(s, 1).unwrap();
    let m = t.mul(r, 0).unwrap();
    t.relinearize(m).unwrap();
    t
}

/// rotate(a + a, 1) · a
fn wrong_operand() -> Trace {
    let mut t = Trace::new(2);
    let s = t.add(0, 0).unwrap();
    let r = t.rotate_columns(s, 1).unwrap();
    let m = t.mul(r, 0).unwrap();
    t.relinearize(m).unwrap();
    t
}

/// (a + b) · a, the rotation skipped.
fn dropped_step() -> Trace {
    claimed().without_step(1).unwrap()
}

/// (rotate(a, 1) + b) · a
fn reordered() -> Trace {
    let mut t = Trace::new(2);
    let r = t.rotate_columns(0, 1).unwrap();
    let s = t.add(r, 1).unwrap();
    let m = t.mul(s, 0).unwrap();
    t.relinearize(m).unwrap();
    t
}

fn deviations() -> Vec<(&'static str, Trace)> {
    vec![
        ("wrong operand", wrong_operand()),
        ("dropped step", dropped_step()),
        ("reordered steps", reordered()),
    ]
}

fn all_step_keys(backend: &ToyBfv, rng: &mut StdRng) -> (ToySecretKey, ToyEvaluationKey) {
    let sk = backend.keygen(rng);
    let steps: Vec<usize> = (1..backend.params().row_width()).collect();
    let evk = backend.gen_evaluation_key(&sk, &steps, true).unwrap();
    (sk, evk)
}

struct Replicated {
    params: Parameters,
    backend: ToyBfv,
    sk: ToySecretKey,
    evk: ToyEvaluationKey,
    encoder: ReplicatedEncoder,
    cts: Vec<TaggedCiphertext<ToyCiphertext>>,
    verifs: Vec<TaggedPoly>,
}

fn replicated() -> Replicated {
    let mut rng = StdRng::seed_from_u64(42);
    let params = Parameters::new(32, T, 4).unwrap();
    let backend = ToyBfv::new(params);
    let (sk, evk) = all_step_keys(&backend, &mut rng);
    let key = ReplicatedKey::generate(&mut rng, &params, PrfMode::Direct).unwrap();
    let encoder = ReplicatedEncoder::new(&key, params).unwrap();
    let (ta, tb) = tags();
    let cts = vec![
        encrypt_tagged(&backend, &encoder.encode(&A, &ta).unwrap(), &sk, &mut rng).unwrap(),
        encrypt_tagged(&backend, &encoder.encode(&B, &tb).unwrap(), &sk, &mut rng).unwrap(),
    ];
    let verifs = vec![
        encoder.encode_verification(&ta).unwrap(),
        encoder.encode_verification(&tb).unwrap(),
    ];
    Replicated {
        params,
        backend,
        sk,
        evk,
        encoder,
        cts,
        verifs,
    }
}

impl Replicated {
    fn run(&self, server_trace: &Trace) -> (TaggedCiphertext<ToyCiphertext>, TaggedPoly) {
        let ct = replay(
            &ReplicatedCiphertextEvaluator::new(&self.backend, &self.evk),
            server_trace,
            &self.cts,
        )
        .unwrap();
        let verif =
            replay(&TaggedPolyEvaluator::new(self.params), &claimed(), &self.verifs).unwrap();
        (ct, verif)
    }

    fn decode(
        &self,
        ct: &TaggedCiphertext<ToyCiphertext>,
        verif: &TaggedPoly,
    ) -> Result<Verified<Vec<u64>>> {
        let pt = decrypt_tagged(&self.backend, ct, &self.sk)?;
        self.encoder.decode(&pt, verif, 8)
    }
}

struct Polynomial {
    params: Parameters,
    backend: ToyBfv,
    sk: ToySecretKey,
    evk: ToyEvaluationKey,
    key: PolynomialKey,
    encoder: PolynomialEncoder,
    cts: Vec<PolyCiphertext<ToyCiphertext>>,
    verifs: Vec<PolyVerification>,
}

fn polynomial() -> Polynomial {
    let mut rng = StdRng::seed_from_u64(42);
    let params = Parameters::new(16, T, 1).unwrap();
    let backend = ToyBfv::new(params);
    let (sk, evk) = all_step_keys(&backend, &mut rng);
    let key = PolynomialKey::generate(&mut rng, &params, PrfMode::Direct).unwrap();
    let encoder = PolynomialEncoder::new(&key, params);
    let ta = derive_index_tags(b"a", 16);
    let tb = derive_index_tags(b"b", 16);
    let a: Vec<u64> = A.iter().chain(&B).copied().collect();
    let b: Vec<u64> = B.iter().chain(&A).copied().collect();
    let cts = vec![
        encrypt_poly(&backend, &encoder.encode(&a, &ta).unwrap(), &sk, &mut rng).unwrap(),
        encrypt_poly(&backend, &encoder.encode(&b, &tb).unwrap(), &sk, &mut rng).unwrap(),
    ];
    let verifs = vec![
        encoder.encode_verification(&ta).unwrap(),
        encoder.encode_verification(&tb).unwrap(),
    ];
    Polynomial {
        params,
        backend,
        sk,
        evk,
        key,
        encoder,
        cts,
        verifs,
    }
}

impl Polynomial {
    fn run(&self, server_trace: &Trace) -> (PolyCiphertext<ToyCiphertext>, PolyVerification) {
        let ct = replay(
            &PolyCiphertextEvaluator::new(&self.backend, &self.evk),
            server_trace,
            &self.cts,
        )
        .unwrap();
        let verif =
            replay(&PolyVerificationEvaluator::new(self.params), &claimed(), &self.verifs).unwrap();
        (ct, verif)
    }

    fn decode(
        &self,
        ct: &PolyCiphertext<ToyCiphertext>,
        verif: &PolyVerification,
    ) -> Result<Verified<Vec<u64>>> {
        let pt = decrypt_poly(&self.backend, ct, &self.sk)?;
        self.encoder.decode(&pt, verif, 16)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 1. HONEST BASELINE
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn honest_server_is_accepted_by_every_scheme() {
    let r = replicated();
    let (ct, verif) = r.run(&claimed());
    let out = r.decode(&ct, &verif).unwrap().unwrap_verified();
    // rotate(a + b, 1) · a within rows of 4
    assert_eq!(out, vec![22, 66, 132, 44, 330, 462, 616, 440]);

    let p = polynomial();
    let (ct, verif) = p.run(&claimed());
    assert!(p.decode(&ct, &verif).is_ok());
}

// ═══════════════════════════════════════════════════════════════════════
// 2. TRACE DEVIATION ATTACKS
// ═══════════════════════════════════════════════════════════════════════

/// Attack: the server runs a different circuit than the one it claims.
/// Expected: the digest chain no longer matches the verification track.
#[test]
fn attack_replicated_trace_deviation() {
    let r = replicated();
    for (name, trace) in deviations() {
        let (ct, verif) = r.run(&trace);
        assert_eq!(
            reason(r.decode(&ct, &verif)),
            Some(FailureReason::TagMismatch),
            "VULNERABILITY: {name} passed replicated verification"
        );
    }
}

/// Attack: deviate, then overwrite the digests with the honest chain.
/// Expected: the dummy replicas no longer hold the verification values.
#[test]
fn attack_replicated_forged_digest_chain() {
    let r = replicated();
    for (name, trace) in deviations() {
        let (mut ct, verif) = r.run(&trace);
        ct.digests = verif.digests.clone();
        assert_eq!(
            reason(r.decode(&ct, &verif)),
            Some(FailureReason::TagMismatch),
            "VULNERABILITY: {name} with a forged digest chain passed verification"
        );
    }
}

/// Attack: the server runs a different circuit on α-encoded slots.
/// Expected: the outer polynomial no longer opens to the PRF evaluation.
#[test]
fn attack_polynomial_trace_deviation() {
    let p = polynomial();
    for (name, trace) in deviations() {
        let (ct, verif) = p.run(&trace);
        assert_eq!(
            reason(p.decode(&ct, &verif)),
            Some(FailureReason::TagMismatch),
            "VULNERABILITY: {name} passed polynomial verification"
        );
    }
}

/// Attack: pad or truncate the outer polynomial of the result.
/// Expected: decode sees an outer degree the verification track never reached.
#[test]
fn attack_polynomial_outer_degree() {
    let p = polynomial();
    let (ct, verif) = p.run(&claimed());

    let mut padded = ct.clone();
    padded.components.push(ct.components[0].clone());
    assert_eq!(
        reason(p.decode(&padded, &verif)),
        Some(FailureReason::ShapeMismatch),
        "VULNERABILITY: padded outer polynomial passed verification"
    );

    let mut truncated = ct.clone();
    truncated.components.pop();
    assert_eq!(
        reason(p.decode(&truncated, &verif)),
        Some(FailureReason::ShapeMismatch),
        "VULNERABILITY: truncated outer polynomial passed verification"
    );
}

// ═══════════════════════════════════════════════════════════════════════
// 3. CIPHERTEXT CORRUPTION
// ═══════════════════════════════════════════════════════════════════════

/// Attack: add one to a single coefficient of the returned ciphertext.
/// Expected: every physical slot is covered by a dummy or a sibling replica.
#[test]
fn attack_replicated_corrupted_coefficient() {
    let r = replicated();
    let (ct, verif) = r.run(&claimed());
    for idx in 0..r.params.slots() {
        let mut forged = ct.clone();
        forged.ct.components[0][idx] = (forged.ct.components[0][idx] + 1) % T;
        assert_eq!(
            reason(r.decode(&forged, &verif)),
            Some(FailureReason::TagMismatch),
            "VULNERABILITY: corrupted physical slot {idx} passed verification"
        );
    }
}

/// Attack: corrupt either outer coefficient of the returned result.
#[test]
fn attack_polynomial_corrupted_coefficient() {
    let p = polynomial();
    let (ct, verif) = p.run(&claimed());
    for k in 0..ct.components.len() {
        let mut forged = ct.clone();
        forged.components[k].components[0][3] = (forged.components[k].components[0][3] + 1) % T;
        assert_eq!(
            reason(p.decode(&forged, &verif)),
            Some(FailureReason::TagMismatch),
            "VULNERABILITY: corrupted outer coefficient {k} passed verification"
        );
    }
}

/// Attack: a delegated verifier is handed a forged result.
#[test]
fn attack_outsourced_forged_result() {
    let mut rng = StdRng::seed_from_u64(42);
    let p = polynomial();
    let evk = p
        .backend
        .gen_evaluation_key(&p.sk, &inner_sum_steps(&p.params), true)
        .unwrap();
    let (ct, verif) = p.run(&claimed());
    let prover = Prover::new(&p.backend, &evk);
    let verifier = Verifier::new(&p.backend, &p.sk, p.key.outsourced());
    assert!(run_polynomial_protocol(&prover, &verifier, &ct, &verif, &mut rng).is_ok());

    let mut forged = ct.clone();
    forged.components[0].components[0][0] = (forged.components[0].components[0][0] + 5) % T;
    assert_eq!(
        reason(run_polynomial_protocol(&prover, &verifier, &forged, &verif, &mut rng)),
        Some(FailureReason::TagMismatch),
        "VULNERABILITY: forged result passed the outsourced check"
    );

    let (deviated, _) = p.run(&wrong_operand());
    assert_eq!(
        reason(run_polynomial_protocol(&prover, &verifier, &deviated, &verif, &mut rng)),
        Some(FailureReason::TagMismatch),
        "VULNERABILITY: deviating circuit passed the outsourced check"
    );
}

// ═══════════════════════════════════════════════════════════════════════
// 4. KEY AND SHAPE SUBSTITUTION
// ═══════════════════════════════════════════════════════════════════════

/// Attack: the server substitutes verification objects it encoded itself.
/// Expected: KeyMismatch, never a silent success.
#[test]
fn attack_substituted_verification_key() {
    let mut rng = StdRng::seed_from_u64(7);
    let (ta, _) = tags();

    let r = replicated();
    let other = ReplicatedKey::generate(&mut rng, &r.params, PrfMode::Direct).unwrap();
    let other = ReplicatedEncoder::new(&other, r.params).unwrap();
    let (ct, _) = r.run(&claimed());
    let forged = other.encode_verification(&ta).unwrap();
    assert_eq!(
        reason(r.decode(&ct, &forged)),
        Some(FailureReason::KeyMismatch),
        "VULNERABILITY: verification object under a foreign key was accepted"
    );

    let p = polynomial();
    let other = PolynomialKey::generate(&mut rng, &p.params, PrfMode::Direct).unwrap();
    let forged = PolynomialEncoder::new(&other, p.params)
        .encode_verification(&derive_index_tags(b"a", 16))
        .unwrap();
    let (ct, _) = p.run(&claimed());
    assert_eq!(
        reason(p.decode(&ct, &forged)),
        Some(FailureReason::KeyMismatch),
        "VULNERABILITY: polynomial verification under a foreign key was accepted"
    );

    let evk = p
        .backend
        .gen_evaluation_key(&p.sk, &inner_sum_steps(&p.params), true)
        .unwrap();
    let prover = Prover::new(&p.backend, &evk);
    let verifier = Verifier::new(&p.backend, &p.sk, p.key.outsourced());
    assert_eq!(
        reason(run_polynomial_protocol(&prover, &verifier, &ct, &forged, &mut rng)),
        Some(FailureReason::KeyMismatch),
        "VULNERABILITY: outsourced check accepted a foreign verification object"
    );
}

/// Attack: mixing verification objects from different keys mid-evaluation.
#[test]
fn attack_mixed_keys_during_evaluation() {
    let mut rng = StdRng::seed_from_u64(7);
    let r = replicated();
    let other = ReplicatedKey::generate(&mut rng, &r.params, PrfMode::Direct).unwrap();
    let other = ReplicatedEncoder::new(&other, r.params).unwrap();
    let (_, tb) = tags();
    let verifs = vec![r.verifs[0].clone(), other.encode_verification(&tb).unwrap()];
    let result = replay(&TaggedPolyEvaluator::new(r.params), &claimed(), &verifs);
    assert!(
        matches!(result, Err(VcheError::KeyMismatch)),
        "VULNERABILITY: verification objects under different keys were combined"
    );
}

/// Attack: truncate the digest vector of the result.
#[test]
fn attack_truncated_digests() {
    let r = replicated();
    let (mut ct, verif) = r.run(&claimed());
    ct.digests.pop();
    assert_eq!(
        reason(r.decode(&ct, &verif)),
        Some(FailureReason::ShapeMismatch),
        "VULNERABILITY: truncated digest vector passed verification"
    );
}

/// Attack: open a compressed object with index vectors of another layout,
/// or deviate from a trace the compressed track can follow.
#[test]
fn attack_compressed_foreign_index_tags() {
    // (a + b) · a, rotated: products precede rotations on the compressed track
    let mut claimed = Trace::new(2);
    let s = claimed.add(0, 1).unwrap();
    let m = claimed.mul(s, 0).unwrap();
    let r = claimed.relinearize(m).unwrap();
    claimed.rotate_columns(r, 1).unwrap();

    let mut rng = StdRng::seed_from_u64(42);
    let params = Parameters::new(32, T, 4).unwrap();
    let backend = ToyBfv::new(params);
    let (sk, evk) = all_step_keys(&backend, &mut rng);
    let key = ReplicatedKey::generate(&mut rng, &params, PrfMode::ClosedForm).unwrap();
    let encoder = ReplicatedEncoder::new(&key, params).unwrap();
    let (ta, tb) = tags();
    let cts = vec![
        encrypt_tagged(&backend, &encoder.encode(&A, &ta).unwrap(), &sk, &mut rng).unwrap(),
        encrypt_tagged(&backend, &encoder.encode(&B, &tb).unwrap(), &sk, &mut rng).unwrap(),
    ];
    let verifs = vec![
        encoder.encode_compressed(&ta).unwrap(),
        encoder.encode_compressed(&tb).unwrap(),
    ];
    let server = ReplicatedCiphertextEvaluator::new(&backend, &evk);
    let verif = replay(&TaggedCompressedEvaluator::new(params), &claimed, &verifs).unwrap();
    let honest = encoder.opener(&ta).unwrap();

    let ct = replay(&server, &claimed, &cts).unwrap();
    let pt = decrypt_tagged(&backend, &ct, &sk).unwrap();
    assert!(encoder.decode_compressed(&pt, &verif, &honest, 8).is_ok());

    let labels: Vec<String> = (0..8).map(|i| format!("x{i}")).collect();
    let foreign = encoder
        .opener(&derive_tags(b"a", &labels, 8).unwrap())
        .unwrap();
    assert_eq!(
        reason(encoder.decode_compressed(&pt, &verif, &foreign, 8)),
        Some(FailureReason::ShapeMismatch),
        "VULNERABILITY: compressed object opened with foreign index vectors"
    );

    let deviated = replay(&server, &claimed.without_step(3).unwrap(), &cts).unwrap();
    let pt = decrypt_tagged(&backend, &deviated, &sk).unwrap();
    assert_eq!(
        reason(encoder.decode_compressed(&pt, &verif, &honest, 8)),
        Some(FailureReason::TagMismatch),
        "VULNERABILITY: dropped rotation passed compressed verification"
    );
}

// ═══════════════════════════════════════════════════════════════════════
// 5. DUMMY GUESSING
// ═══════════════════════════════════════════════════════════════════════

const GUESSES: usize = 64;

/// Attack: a replicated key with a single replica has no dummy to check.
/// Expected: the key is refused outright.
#[test]
fn attack_replicated_single_replica_key() {
    let mut rng = StdRng::seed_from_u64(42);
    let params = Parameters::new(32, T, 1).unwrap();
    assert!(
        matches!(
            ReplicatedKey::generate(&mut rng, &params, PrfMode::Direct),
            Err(VcheError::InvalidParameters(_))
        ),
        "VULNERABILITY: replicated key without a dummy replica was issued"
    );
}

/// Attack: shift the replicas of slot 0 the server guesses hold the message,
/// all by the same amount. Passes only when the guess avoids every dummy,
/// which happens with probability `1 / C(λ, λ/2)`.
#[test]
fn attack_replicated_dummy_guessing() {
    // bounds leave room above the expected 32, 10.7 and 0.9 acceptances
    for (lambda, max_accepted) in [(2, 48), (4, 24), (8, 8)] {
        let mut rng = StdRng::seed_from_u64(42);
        let params = Parameters::new(32, T, lambda).unwrap();
        let backend = ToyBfv::new(params);
        let sk = backend.keygen(&mut rng);
        let key = ReplicatedKey::generate(&mut rng, &params, PrfMode::Direct).unwrap();
        let encoder = ReplicatedEncoder::new(&key, params).unwrap();
        let n = params.logical_slots();
        let tags = derive_index_tags(b"a", n);
        let values: Vec<u64> = (1..=n as u64).collect();
        let pt = encoder.encode(&values, &tags).unwrap();
        let ct = encrypt_tagged(&backend, &pt, &sk, &mut rng).unwrap();
        let verif = encoder.encode_verification(&tags).unwrap();
        let decode = |ct: &TaggedCiphertext<ToyCiphertext>| -> Result<Verified<Vec<u64>>> {
            let pt = decrypt_tagged(&backend, ct, &sk)?;
            encoder.decode(&pt, &verif, n)
        };
        assert_eq!(decode(&ct).unwrap().unwrap_verified(), values);

        let mut accepted = 0;
        for _ in 0..GUESSES {
            let delta = rng.gen_range(1..T);
            let mut forged = ct.clone();
            for j in index::sample(&mut rng, lambda, lambda / 2).into_iter() {
                let c = &mut forged.ct.components[0][j];
                *c = (*c + delta) % T;
            }
            match decode(&forged) {
                Ok(out) => {
                    accepted += 1;
                    assert_ne!(out.value()[0], values[0]);
                    // a forgery that gets through carries the bound it beat
                    assert_eq!(out.soundness(), SoundnessBound::dummy_guess(lambda));
                }
                Err(err) => assert_eq!(
                    err.verification_failure().map(|f| f.reason),
                    Some(FailureReason::TagMismatch)
                ),
            }
        }
        assert!(
            accepted <= max_accepted,
            "VULNERABILITY: λ = {lambda} accepted {accepted} of {GUESSES} guesses"
        );
        if lambda == 2 {
            // one dummy in two: a coin flip, and the reported bound says so
            assert!(accepted > 0);
            assert_eq!(SoundnessBound::dummy_guess(lambda).error_probability(), 0.5);
        }

        if lambda >= 4 {
            for idx in 0..params.slots() {
                let mut forged = ct.clone();
                forged.ct.components[0][idx] = (forged.ct.components[0][idx] + 1) % T;
                assert_eq!(
                    reason(decode(&forged)),
                    Some(FailureReason::TagMismatch),
                    "VULNERABILITY: λ = {lambda} missed a corrupted physical slot {idx}"
                );
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 6. MALFORMED ARTIFACTS
// ═══════════════════════════════════════════════════════════════════════

/// Attack: ship a trace whose steps read registers that do not exist.
/// Expected: decoding fails instead of replay indexing out of bounds.
#[test]
fn attack_malformed_trace() {
    let forged = [
        r#"{"inputs":1,"steps":[{"op":"Add","operands":[0,5]}]}"#,
        r#"{"inputs":2,"steps":[{"op":"Add","operands":[0,2]}]}"#,
        r#"{"inputs":1,"steps":[{"op":"Neg","operands":[0,0]}]}"#,
    ];
    for json in forged {
        assert!(
            serde_json::from_str::<Trace>(json).is_err(),
            "VULNERABILITY: malformed trace decoded: {json}"
        );
    }

    let bytes = to_bytes(&claimed()).unwrap();
    assert_eq!(from_bytes::<Trace>(&bytes).unwrap(), claimed());
}

/// Same field order as `BivariatePoly`, without its checks.
#[derive(Serialize)]
struct RawPoly {
    coeffs: Vec<Vec<u64>>,
    modulus: u64,
}

/// Same field order as `CompressedVerification`.
#[derive(Serialize)]
struct RawCompressed {
    terms: BTreeMap<RotInfo, RawPoly>,
    key_id: Hash,
    index_digest: Hash,
}

/// Attack: hand the client a compressed object with a malformed coefficient
/// table. Expected: `Err` on decode or open, never a panic.
#[test]
fn attack_malformed_compressed_verification() {
    let params = Parameters::new(32, T, 4).unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    let key = ReplicatedKey::generate(&mut rng, &params, PrfMode::ClosedForm).unwrap();
    let encoder = ReplicatedEncoder::new(&key, params).unwrap();
    let (ta, _) = tags();
    let honest = encoder.encode_compressed(&ta).unwrap().object;
    let opener = encoder.opener(&ta).unwrap();
    let decoded: CompressedVerification = from_bytes(&to_bytes(&honest).unwrap()).unwrap();
    assert_eq!(decoded, honest);

    let forge = |coeffs: Vec<Vec<u64>>, modulus: u64| RawCompressed {
        terms: BTreeMap::from([(RotInfo::NONE, RawPoly { coeffs, modulus })]),
        key_id: *honest.key_id(),
        index_digest: *honest.index_digest(),
    };

    let well_formed = to_bytes(&forge(vec![vec![1, 2], vec![3, 0]], T)).unwrap();
    let obj: CompressedVerification = from_bytes(&well_formed).unwrap();
    assert!(opener.eval_direct(&obj).is_ok());

    let malformed = [
        ("empty table", vec![]),
        ("ragged table", vec![vec![1, 2], vec![3]]),
        ("coefficient above the modulus", vec![vec![T, 0], vec![0, 0]]),
        ("term past the degree", vec![vec![0, 0], vec![0, 5]]),
    ];
    for (name, coeffs) in malformed {
        let bytes = to_bytes(&forge(coeffs, T)).unwrap();
        assert!(
            from_bytes::<CompressedVerification>(&bytes).is_err(),
            "VULNERABILITY: compressed object with {name} decoded"
        );
    }

    let bytes = to_bytes(&forge(vec![vec![1]], 1)).unwrap();
    assert!(
        from_bytes::<CompressedVerification>(&bytes).is_err(),
        "VULNERABILITY: compressed object over a unit modulus decoded"
    );

    let bytes = to_bytes(&forge(vec![vec![1, 2], vec![3, 0]], 97)).unwrap();
    let foreign: CompressedVerification = from_bytes(&bytes).unwrap();
    let memo = opener.compute_memo(&honest).unwrap();
    assert!(
        matches!(opener.eval(&foreign, &memo), Err(VcheError::ShapeMismatch(_))),
        "VULNERABILITY: compressed object over another modulus was opened"
    );
    assert!(matches!(
        opener.compute_memo(&foreign),
        Err(VcheError::ShapeMismatch(_))
    ));
}

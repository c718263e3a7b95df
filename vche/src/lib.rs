//! # vche: verifiable homomorphic evaluation
//!
//! A client tags every slot it encrypts, hands the ciphertexts to an
//! untrusted server, and gets back a result it can check. The server evolves
//! a verification object over the tags in lockstep with the ciphertext
//! computation; the client's decoder combines the decryption with that object
//! and either returns a [`Verified`](verified_type::Verified) result or a
//! [`VerificationFailure`](error::VerificationFailure).
//!
//! ## Schemes
//!
//! - [`replicated`]: replicated slots with secret dummy positions and a
//!   per-slot hash chain; soundness `1 / C(λ, λ/2)`.
//! - [`polynomial`]: slots encoded as outer polynomials that open to PRF
//!   values at a secret point α; soundness `d / T`.
//! - [`compressed`]: slot-count independent verification objects for the
//!   closed-form PRF, opened in two phases (memo, then eval).
//! - [`outsourced`]: a prover/verifier protocol that checks α-encoded
//!   results without the PRF key.
//!
//! ## Evaluation
//!
//! Computations are written once as a [`Trace`](eval::Trace) and replayed on
//! both tracks with [`replay_lockstep`](eval::replay_lockstep). The encryption
//! scheme itself is consumed through [`HomomorphicBackend`](backend::HomomorphicBackend).

pub mod backend;
pub mod compressed;
pub mod crypto;
pub mod error;
pub mod eval;
pub mod outsourced;
pub mod parallel;
pub mod params;
pub mod polynomial;
pub mod reduce;
pub mod replicated;
pub mod serialize;
pub mod slots;
pub mod tag;
pub mod types;
pub mod verified_type;

/// Prelude: commonly used types for verified evaluation.
pub mod prelude {
    pub use crate::backend::toy::ToyBfv;
    pub use crate::backend::{inner_sum_steps, HomomorphicBackend};
    pub use crate::compressed::{CompressedEncoder, CompressedOpener, CompressedVerification};
    pub use crate::crypto::prf::{PrfKey, PrfMode};
    pub use crate::error::{FailureReason, Result, VcheError, VerificationFailure};
    pub use crate::eval::{replay, replay_lockstep, Evaluator, Op, PlainEvaluator, Trace};
    pub use crate::outsourced::{run_polynomial_protocol, Prover, Verifier};
    pub use crate::params::Parameters;
    pub use crate::polynomial::{
        PolyCiphertextEvaluator, PolyVerificationEvaluator, PolynomialEncoder, PolynomialKey,
    };
    pub use crate::reduce::{inner_product_trace, pack, PackingLayout};
    pub use crate::replicated::{
        ReplicatedCiphertextEvaluator, ReplicatedEncoder, ReplicatedKey, TaggedPolyEvaluator,
    };
    pub use crate::tag::{derive_index_tags, derive_tags, Tag};
    pub use crate::types::Hash;
    pub use crate::verified_type::{SoundnessBound, Verified};
}

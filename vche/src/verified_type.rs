use serde::Serialize;

/// How strongly a successful decode vouches for the result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SoundnessBound {
    /// A forged result passes with probability at most `degree / modulus`.
    Probabilistic { degree: usize, modulus: u64 },
    /// A forged result passes only if the server guesses which `replications / 2`
    /// of the `replications` positions are dummies: `1 / C(λ, λ/2)`.
    DummyGuess { replications: usize },
}

impl SoundnessBound {
    pub fn probabilistic(degree: usize, modulus: u64) -> Self {
        SoundnessBound::Probabilistic {
            degree: degree.max(1),
            modulus,
        }
    }

    pub fn dummy_guess(replications: usize) -> Self {
        SoundnessBound::DummyGuess { replications }
    }

    /// Upper bound on the probability of accepting a corrupted result.
    pub fn error_probability(&self) -> f64 {
        match self {
            SoundnessBound::Probabilistic { degree, modulus } => {
                (*degree as f64 / *modulus as f64).min(1.0)
            }
            SoundnessBound::DummyGuess { replications } => {
                (1.0 / central_binomial(*replications)).min(1.0)
            }
        }
    }

    /// `-log2(error_probability)`.
    pub fn security_bits(&self) -> f64 {
        -self.error_probability().log2()
    }
}

/// `C(n, n/2)` in floating point; saturates to infinity for large `n`.
fn central_binomial(n: usize) -> f64 {
    let k = n / 2;
    (1..=k).fold(1.0, |acc, i| acc * (n - k + i) as f64 / i as f64)
}

/// A decoded value that passed verification.
///
/// Only the decoders in this crate build one, and only after their check
/// succeeded; the attached [`SoundnessBound`] says how likely it is that a
/// corrupted result got through anyway. Not `Deserialize`: bytes read back
/// from elsewhere have not been checked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Verified<T> {
    value: T,
    soundness: SoundnessBound,
}

impl<T> Verified<T> {
    pub(crate) fn new(value: T, soundness: SoundnessBound) -> Self {
        Self { value, soundness }
    }

    /// The checked value; trust it up to [`soundness`](Self::soundness).
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Drop the bound and keep the checked value.
    pub fn unwrap_verified(self) -> T {
        self.value
    }

    pub fn soundness(&self) -> SoundnessBound {
        self.soundness
    }

    /// Transform the checked value; the bound of the decode carries over.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Verified<U> {
        Verified {
            value: f(self.value),
            soundness: self.soundness,
        }
    }
}

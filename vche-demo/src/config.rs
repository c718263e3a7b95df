use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vche::params::{Parameters, DEFAULT_PLAINTEXT_MODULUS};
use vche::replicated::MIN_REPLICATIONS;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("parsing config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown scheme '{0}' (expected replicated, polynomial or outsourced)")]
    UnknownScheme(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Which verification scheme a session runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemeKind {
    /// Replicated slots with dummies and digest chains.
    Replicated,
    /// α-encoded slots, checked by the client.
    Polynomial,
    /// α-encoded slots, checked by a delegated verifier.
    Outsourced,
}

impl FromStr for SchemeKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "replicated" => Ok(SchemeKind::Replicated),
            "polynomial" => Ok(SchemeKind::Polynomial),
            "outsourced" => Ok(SchemeKind::Outsourced),
            _ => Err(ConfigError::UnknownScheme(s.to_string())),
        }
    }
}

impl fmt::Display for SchemeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchemeKind::Replicated => "replicated",
            SchemeKind::Polynomial => "polynomial",
            SchemeKind::Outsourced => "outsourced",
        };
        f.write_str(name)
    }
}

/// Configuration for a demo session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Physical slots per plaintext.
    pub slots: usize,
    /// Plaintext modulus (prime).
    pub modulus: u64,
    /// Physical replicas per logical slot.
    pub replications: usize,
    pub scheme: SchemeKind,
    /// Use the closed-form PRF and the compressed verification track.
    pub closed_form: bool,
    /// Length of the two vectors whose inner product is computed.
    pub length: usize,
    /// Seed for keys and input vectors.
    pub seed: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            slots: 32,
            modulus: DEFAULT_PLAINTEXT_MODULUS,
            replications: 4,
            scheme: SchemeKind::Replicated,
            closed_form: false,
            length: 20,
            seed: 42,
        }
    }
}

impl DemoConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Validated scheme parameters.
    pub fn params(&self) -> Result<Parameters, ConfigError> {
        if self.length == 0 {
            return Err(ConfigError::Invalid("length must be positive".into()));
        }
        if self.scheme == SchemeKind::Replicated && self.replications < MIN_REPLICATIONS {
            return Err(ConfigError::Invalid(format!(
                "the replicated scheme needs at least {MIN_REPLICATIONS} replications"
            )));
        }
        if self.scheme == SchemeKind::Outsourced {
            if self.closed_form {
                return Err(ConfigError::Invalid(
                    "the outsourced check needs per-slot verification values".into(),
                ));
            }
            if self.replications != 1 {
                return Err(ConfigError::Invalid(
                    "the outsourced check runs without replication".into(),
                ));
            }
        }
        Parameters::new(self.slots, self.modulus, self.replications)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

//! Binary encoding of exchanged artifacts (tags, traces, verification
//! objects, tagged ciphertexts).

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

pub fn to_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

pub fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(bincode::deserialize(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compressed::{CompressedEncoder, CompressedVerification};
    use crate::crypto::prf::{PrfKey, PrfMode};
    use crate::error::VcheError;
    use crate::params::Parameters;
    use crate::polynomial::{PolyVerification, PolynomialEncoder, PolynomialKey};
    use crate::tag::{derive_index_tags, Tag};

    fn compressed_len(slots: usize) -> usize {
        let params = Parameters::new(slots, 65537, 1).unwrap();
        let encoder = CompressedEncoder::new(PrfKey::from_seed(b"k").unwrap(), params);
        let obj = encoder.encode(&derive_index_tags(b"a", slots)).unwrap();
        let bytes = to_bytes(&obj).unwrap();
        let back: CompressedVerification = from_bytes(&bytes).unwrap();
        assert_eq!(back, obj);
        bytes.len()
    }

    fn polynomial_len(slots: usize) -> usize {
        let params = Parameters::new(slots, 65537, 1).unwrap();
        let key = PolynomialKey::new(PrfKey::from_seed(b"k").unwrap(), 3, &params, PrfMode::Direct)
            .unwrap();
        let verif = PolynomialEncoder::new(&key, params)
            .encode_verification(&derive_index_tags(b"a", slots))
            .unwrap();
        let bytes = to_bytes(&verif).unwrap();
        let back: PolyVerification = from_bytes(&bytes).unwrap();
        assert_eq!(back, verif);
        bytes.len()
    }

    #[test]
    fn compressed_object_size_is_independent_of_slots() {
        assert_eq!(compressed_len(8), compressed_len(1024));
    }

    #[test]
    fn polynomial_object_grows_with_slots() {
        // one u64 per slot
        assert_eq!(polynomial_len(1024) - polynomial_len(8), (1024 - 8) * 8);
    }

    #[test]
    fn tags_survive_encoding() {
        let tags = vec![Tag::new("snp-vector-3", "slot-17"), Tag::new("points", "x7")];
        let back: Vec<Tag> = from_bytes(&to_bytes(&tags).unwrap()).unwrap();
        assert_eq!(back, tags);
    }

    #[test]
    fn truncated_input_is_a_serialization_error() {
        let bytes = to_bytes(&vec![1u64, 2, 3]).unwrap();
        let result: Result<Vec<u64>> = from_bytes(&bytes[..5]);
        assert!(matches!(result, Err(VcheError::Serialization(_))));
    }
}

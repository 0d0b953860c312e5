use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest as Sha2Digest, Sha224, Sha256, Sha384, Sha512};

use crate::canonicalizer::{CanonicalizationError, Canonicalizer};
use crate::sink::FnSink;
use crate::value::Value;

/// Hash algorithms accepted in metadata `hashes` dictionaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlg {
    /// SHA-224.
    Sha224,
    /// SHA-256.
    Sha256,
    /// SHA-384.
    Sha384,
    /// SHA-512.
    Sha512,
}

impl HashAlg {
    /// Name used as the key of a hash dictionary.
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlg::Sha224 => "sha224",
            HashAlg::Sha256 => "sha256",
            HashAlg::Sha384 => "sha384",
            HashAlg::Sha512 => "sha512",
        }
    }
}

impl fmt::Display for HashAlg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown hash algorithm name.
#[derive(thiserror::Error, Debug)]
#[error("unsupported hash algorithm '{0}'")]
pub struct UnknownHashAlg(String);

impl FromStr for HashAlg {
    type Err = UnknownHashAlg;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha224" => Ok(HashAlg::Sha224),
            "sha256" => Ok(HashAlg::Sha256),
            "sha384" => Ok(HashAlg::Sha384),
            "sha512" => Ok(HashAlg::Sha512),
            other => Err(UnknownHashAlg(other.to_string())),
        }
    }
}

fn hash_with<D: Sha2Digest>(
    value: &Value,
    canonicalizer: &Canonicalizer,
) -> Result<String, CanonicalizationError> {
    let mut hasher = D::new();
    canonicalizer.encode_to(
        value,
        &mut FnSink::new(|fragment: &[u8]| {
            hasher.update(fragment);
            Ok(())
        }),
    )?;
    Ok(hex::encode(hasher.finalize()))
}

/// Lowercase hex digest of the canonical bytes of `value`.
///
/// Fragments are fed straight into the hasher, so nothing is buffered.
pub fn digest_hex(
    value: &Value,
    alg: HashAlg,
    canonicalizer: &Canonicalizer,
) -> Result<String, CanonicalizationError> {
    match alg {
        HashAlg::Sha224 => hash_with::<Sha224>(value, canonicalizer),
        HashAlg::Sha256 => hash_with::<Sha256>(value, canonicalizer),
        HashAlg::Sha384 => hash_with::<Sha384>(value, canonicalizer),
        HashAlg::Sha512 => hash_with::<Sha512>(value, canonicalizer),
    }
}

/// Builds a `{"sha256": "...", ...}` hash dictionary for `value`.
pub fn hashes(
    value: &Value,
    algs: &[HashAlg],
    canonicalizer: &Canonicalizer,
) -> Result<BTreeMap<String, String>, CanonicalizationError> {
    algs.iter()
        .map(|alg| {
            digest_hex(value, *alg, canonicalizer).map(|hex| (alg.as_str().to_string(), hex))
        })
        .collect()
}

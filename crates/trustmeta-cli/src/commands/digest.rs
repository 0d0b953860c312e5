//! Digest command implementation.

use trustmeta_canonical::{digest_hex, Canonicalizer, EncodeLimits, HashAlg};

use crate::input;

pub fn run(
    input: Option<String>,
    alg: HashAlg,
    signed: bool,
    limits: EncodeLimits,
) -> Result<(), Box<dyn std::error::Error>> {
    let value = input::read_payload(input.as_deref(), signed, &limits)?;
    let digest = digest_hex(&value, alg, &Canonicalizer::new(limits))
        .map_err(|e| format!("Canonicalization failed: {}", e))?;
    println!("{}", digest);
    Ok(())
}

//! Sign-append command implementation.

use trustmeta_canonical::EncodeLimits;
use trustmeta_schemas::Signature;

use crate::{input, output};

pub fn run(
    input: Option<String>,
    keyid: String,
    method: String,
    sig: String,
    limits: EncodeLimits,
) -> Result<(), Box<dyn std::error::Error>> {
    let signature =
        Signature::parse(keyid, method, sig).map_err(|e| format!("Invalid signature: {}", e))?;
    let mut envelope = input::read_signable(input.as_deref(), &limits)?;
    envelope.append_signature(signature);
    println!("{}", output::format_envelope(&envelope)?);
    Ok(())
}

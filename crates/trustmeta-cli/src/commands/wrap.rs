//! Wrap command implementation.

use trustmeta_canonical::EncodeLimits;

use crate::{input, output};

pub fn run(input: Option<String>, limits: EncodeLimits) -> Result<(), Box<dyn std::error::Error>> {
    let envelope = input::read_signable(input.as_deref(), &limits)?;
    println!("{}", output::format_envelope(&envelope)?);
    Ok(())
}

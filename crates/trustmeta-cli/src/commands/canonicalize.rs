//! Canonicalize command implementation.

use std::io::{self, BufWriter};

use trustmeta_canonical::{Canonicalizer, EncodeLimits, WriteSink};

use crate::input;

pub fn run(
    input: Option<String>,
    signed: bool,
    limits: EncodeLimits,
) -> Result<(), Box<dyn std::error::Error>> {
    let value = input::read_payload(input.as_deref(), signed, &limits)?;
    let canonicalizer = Canonicalizer::new(limits);

    // Limits are checked before the first byte reaches stdout.
    let stdout = io::stdout();
    let mut sink = WriteSink::new(BufWriter::new(stdout.lock()));
    canonicalizer
        .encode_to(&value, &mut sink)
        .map_err(|e| format!("Canonicalization failed: {}", e))?;
    sink.into_inner()?;
    Ok(())
}

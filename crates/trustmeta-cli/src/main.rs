//! trustmeta CLI - canonicalize, wrap and check signed trust metadata.

use clap::{Args, Parser, Subcommand};
use trustmeta_canonical::{EncodeLimits, HashAlg, DEFAULT_MAX_DEPTH, DEFAULT_MAX_OUTPUT_BYTES};
use trustmeta_schemas::Role;

mod commands;
mod input;
mod output;

use commands::{canonicalize, check, digest, sign_append, wrap};

#[derive(Parser)]
#[command(name = "trustmeta")]
#[command(about = "Canonical encoding and signature envelopes for trust metadata")]
struct Cli {
    #[command(flatten)]
    limits: LimitArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct LimitArgs {
    /// Maximum container nesting accepted in input
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,
    /// Maximum size of canonical output in bytes
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_OUTPUT_BYTES)]
    max_bytes: usize,
}

impl LimitArgs {
    fn limits(&self) -> EncodeLimits {
        EncodeLimits::default()
            .with_max_depth(self.max_depth)
            .with_max_output_bytes(self.max_bytes)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write the canonical bytes of input JSON to stdout
    Canonicalize {
        /// Input JSON file (or stdin if not provided)
        input: Option<String>,
        /// Encode only the `signed` payload of an envelope
        #[arg(long)]
        signed: bool,
    },
    /// Print the hex digest of the canonical bytes
    Digest {
        /// Input JSON file (or stdin if not provided)
        input: Option<String>,
        /// Hash algorithm (sha224, sha256, sha384, sha512)
        #[arg(long, default_value = "sha256")]
        alg: HashAlg,
        /// Digest only the `signed` payload of an envelope
        #[arg(long)]
        signed: bool,
    },
    /// Wrap a payload into a signable envelope
    Wrap {
        /// Input JSON file (or stdin if not provided)
        input: Option<String>,
    },
    /// Append a signature record to an envelope (wrapping the input first)
    SignAppend {
        /// Input JSON file (or stdin if not provided)
        input: Option<String>,
        /// Hex key id of the signing key
        #[arg(long)]
        keyid: String,
        /// Signature method
        #[arg(long)]
        method: String,
        /// Hex signature over the canonical bytes of the payload
        #[arg(long)]
        sig: String,
    },
    /// Check role metadata against its shape and report expiry
    Check {
        /// Input JSON file (or stdin if not provided)
        input: Option<String>,
        /// Expected role (detected from `_type` when omitted)
        #[arg(long)]
        role: Option<Role>,
        /// Input is a signable envelope
        #[arg(long)]
        signable: bool,
        /// Exit with error code if the metadata has expired
        #[arg(long)]
        strict: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let limits = cli.limits.limits();

    let result = match cli.command {
        Commands::Canonicalize { input, signed } => canonicalize::run(input, signed, limits),
        Commands::Digest { input, alg, signed } => digest::run(input, alg, signed, limits),
        Commands::Wrap { input } => wrap::run(input, limits),
        Commands::SignAppend {
            input,
            keyid,
            method,
            sig,
        } => sign_append::run(input, keyid, method, sig, limits),
        Commands::Check {
            input,
            role,
            signable,
            strict,
            json,
        } => check::run(input, role, signable, strict, json, limits),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

//! Canonical encoding for signed trust metadata.
//!
//! A [`Value`] is a closed tree of strings, integers, booleans, nulls,
//! sequences and string-keyed mappings. [`Canonicalizer`] turns it into the
//! one byte sequence every conforming implementation produces for it: mapping
//! keys sorted byte-wise, no whitespace, no floats, and only `"` and `\`
//! escaped inside strings. Those bytes are what gets hashed and signed.
//!
//! ```rust
//! use trustmeta_canonical::{encode, Value};
//! use serde_json::json;
//!
//! let value = Value::from_json(&json!({"y": 2, "x": 3}))?;
//! assert_eq!(encode(&value)?, br#"{"x":3,"y":2}"#);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
#![deny(missing_docs)]

/// Canonical encoder and its error type.
pub mod canonicalizer;
/// Hex digests over canonical bytes.
pub mod digest;
/// Resource bounds for untrusted input.
pub mod limits;
/// Value locations used in diagnostics.
pub mod path;
/// Ordered output sinks.
pub mod sink;
/// The structured value model.
pub mod value;

pub use canonicalizer::{encode, encode_to, CanonicalizationError, Canonicalizer};
pub use digest::{digest_hex, hashes, HashAlg, UnknownHashAlg};
pub use limits::{EncodeLimits, DEFAULT_MAX_DEPTH, DEFAULT_MAX_OUTPUT_BYTES};
pub use path::Path;
pub use sink::{FnSink, Sink, SinkError, WriteSink};
pub use value::{Mapping, Value, ValueKind};

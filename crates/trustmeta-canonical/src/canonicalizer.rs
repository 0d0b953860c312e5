use serde::Serialize;

use crate::limits::EncodeLimits;
use crate::path::Path;
use crate::sink::{Sink, SinkError};
use crate::value::Value;

/// Error returned when canonicalization fails.
///
/// No canonical bytes are returned alongside any of these; a failed encode
/// must be treated as having produced nothing.
#[derive(thiserror::Error, Debug)]
pub enum CanonicalizationError {
    /// A value outside the canonical kind set (e.g. a float) was found.
    #[error("cannot canonicalize value at {path}: {found}")]
    ValueKind {
        /// Location of the offending value.
        path: String,
        /// Description of what was found there.
        found: String,
    },
    /// An integer literal too large for the value model.
    #[error("integer {literal} at {path} is out of range")]
    IntegerOutOfRange {
        /// Location of the literal.
        path: String,
        /// The literal as written.
        literal: String,
    },
    /// Container nesting exceeds the configured bound.
    #[error("nesting at {path} exceeds maximum depth {max}")]
    DepthExceeded {
        /// Location of the first container past the bound.
        path: String,
        /// Configured maximum depth.
        max: usize,
    },
    /// Canonical output would exceed the configured size bound.
    #[error("canonical output exceeds maximum size of {max} bytes")]
    SizeExceeded {
        /// Configured maximum size.
        max: usize,
    },
    /// The output sink refused a fragment.
    #[error(transparent)]
    Sink(#[from] SinkError),
    /// A typed value could not be turned into a structured value.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// Canonicalizer that emits deterministic bytes.
///
/// Encoding is a pure function of the value and the limits; a single
/// canonicalizer can be shared freely across threads.
#[derive(Debug, Clone, Default)]
pub struct Canonicalizer {
    limits: EncodeLimits,
}

impl Canonicalizer {
    /// Creates a canonicalizer enforcing `limits`.
    pub fn new(limits: EncodeLimits) -> Self {
        Self { limits }
    }

    /// The limits this canonicalizer enforces.
    pub fn limits(&self) -> &EncodeLimits {
        &self.limits
    }

    /// Exact number of bytes `value` encodes to, after checking the limits.
    pub fn encoded_len(&self, value: &Value) -> Result<usize, CanonicalizationError> {
        let mut measure = Measure {
            limits: &self.limits,
            total: 0,
        };
        if let Err(err) = measure.value(value, &Path::root()) {
            tracing::debug!(error = %err, "value rejected before encoding");
            return Err(err);
        }
        Ok(measure.total)
    }

    /// Produces the canonical bytes for `value`.
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>, CanonicalizationError> {
        let len = self.encoded_len(value)?;
        let mut out = Vec::with_capacity(len);
        write_value(value, &mut out)?;
        debug_assert_eq!(out.len(), len);
        tracing::trace!(bytes = len, "encoded canonical value");
        Ok(out)
    }

    /// Streams the canonical bytes for `value` into `sink`.
    ///
    /// Limits are checked before the first fragment is emitted, so a limit
    /// violation leaves the sink untouched. A sink error stops the encode at
    /// once; the fragments already accepted must then be discarded.
    pub fn encode_to<S: Sink + ?Sized>(
        &self,
        value: &Value,
        sink: &mut S,
    ) -> Result<(), CanonicalizationError> {
        let len = self.encoded_len(value)?;
        write_value(value, sink)?;
        tracing::trace!(bytes = len, "streamed canonical value");
        Ok(())
    }

    /// Converts parsed JSON and encodes it.
    pub fn encode_json(&self, json: &serde_json::Value) -> Result<Vec<u8>, CanonicalizationError> {
        let value = Value::from_json_with_limits(json, &self.limits)?;
        self.encode(&value)
    }

    /// Converts a serializable type and encodes it.
    pub fn encode_serialize<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, CanonicalizationError> {
        let json = serde_json::to_value(value)
            .map_err(|e| CanonicalizationError::Serialization(e.to_string()))?;
        self.encode_json(&json)
    }
}

/// Encodes `value` with the default limits.
pub fn encode(value: &Value) -> Result<Vec<u8>, CanonicalizationError> {
    Canonicalizer::default().encode(value)
}

/// Streams `value` into `sink` with the default limits.
pub fn encode_to<S: Sink + ?Sized>(value: &Value, sink: &mut S) -> Result<(), CanonicalizationError> {
    Canonicalizer::default().encode_to(value, sink)
}

/// Pre-pass: checks depth and size and computes the exact output length.
struct Measure<'a> {
    limits: &'a EncodeLimits,
    total: usize,
}

impl Measure<'_> {
    fn add(&mut self, n: usize) -> Result<(), CanonicalizationError> {
        self.total = self
            .total
            .checked_add(n)
            .filter(|total| *total <= self.limits.max_output_bytes)
            .ok_or(CanonicalizationError::SizeExceeded {
                max: self.limits.max_output_bytes,
            })?;
        Ok(())
    }

    fn enter(&self, path: &Path) -> Result<(), CanonicalizationError> {
        if path.len() >= self.limits.max_depth {
            return Err(CanonicalizationError::DepthExceeded {
                path: path.to_string(),
                max: self.limits.max_depth,
            });
        }
        Ok(())
    }

    fn value(&mut self, value: &Value, path: &Path) -> Result<(), CanonicalizationError> {
        match value {
            Value::Null => self.add(4),
            Value::Bool(true) => self.add(4),
            Value::Bool(false) => self.add(5),
            Value::Integer(i) => self.add(integer_len(*i)),
            Value::String(s) => self.add(string_len(s)),
            Value::Sequence(items) => {
                self.enter(path)?;
                self.add(2 + items.len().saturating_sub(1))?;
                for (idx, item) in items.iter().enumerate() {
                    self.value(item, &path.push_index(idx))?;
                }
                Ok(())
            }
            Value::Mapping(map) => {
                self.enter(path)?;
                self.add(2 + map.len().saturating_sub(1))?;
                for (key, child) in map {
                    self.add(string_len(key) + 1)?;
                    self.value(child, &path.push_field(key))?;
                }
                Ok(())
            }
        }
    }
}

fn integer_len(i: i128) -> usize {
    let mut n = i.unsigned_abs();
    let mut len = usize::from(i < 0);
    loop {
        len += 1;
        n /= 10;
        if n == 0 {
            return len;
        }
    }
}

fn string_len(s: &str) -> usize {
    2 + s.len() + s.bytes().filter(|b| matches!(b, b'"' | b'\\')).count()
}

fn write_value<S: Sink + ?Sized>(value: &Value, sink: &mut S) -> Result<(), SinkError> {
    match value {
        Value::Null => sink.emit(b"null"),
        Value::Bool(true) => sink.emit(b"true"),
        Value::Bool(false) => sink.emit(b"false"),
        Value::Integer(i) => sink.emit(i.to_string().as_bytes()),
        Value::String(s) => write_string(s, sink),
        Value::Sequence(items) => {
            sink.emit(b"[")?;
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    sink.emit(b",")?;
                }
                write_value(item, sink)?;
            }
            sink.emit(b"]")
        }
        Value::Mapping(map) => {
            sink.emit(b"{")?;
            for (idx, (key, child)) in map.iter().enumerate() {
                if idx > 0 {
                    sink.emit(b",")?;
                }
                write_string(key, sink)?;
                sink.emit(b":")?;
                write_value(child, sink)?;
            }
            sink.emit(b"}")
        }
    }
}

/// Only `"` and `\` are escaped; every other byte passes through untouched.
fn write_string<S: Sink + ?Sized>(s: &str, sink: &mut S) -> Result<(), SinkError> {
    let bytes = s.as_bytes();
    sink.emit(b"\"")?;
    let mut start = 0;
    for (idx, byte) in bytes.iter().enumerate() {
        if matches!(byte, b'"' | b'\\') {
            if start < idx {
                sink.emit(&bytes[start..idx])?;
            }
            sink.emit(b"\\")?;
            start = idx;
        }
    }
    if start < bytes.len() {
        sink.emit(&bytes[start..])?;
    }
    sink.emit(b"\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::FnSink;

    fn sample() -> Value {
        [
            ("z", Value::from(vec![Value::from(-12), Value::Null])),
            ("a\"q", Value::from("tab\there\\")),
            ("m", Value::from(true)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn encoded_len_matches_output() {
        let canonicalizer = Canonicalizer::default();
        let value = sample();
        let bytes = canonicalizer.encode(&value).unwrap();
        assert_eq!(canonicalizer.encoded_len(&value).unwrap(), bytes.len());
        assert_eq!(integer_len(i128::MIN), i128::MIN.to_string().len());
        assert_eq!(integer_len(0), 1);
    }

    #[test]
    fn streamed_fragments_concatenate_to_buffered_output() {
        let value = sample();
        let mut fragments: Vec<Vec<u8>> = Vec::new();
        let mut sink = FnSink::new(|fragment: &[u8]| {
            fragments.push(fragment.to_vec());
            Ok(())
        });
        encode_to(&value, &mut sink).unwrap();
        assert!(fragments.len() > 1);
        assert_eq!(fragments.concat(), encode(&value).unwrap());
    }

    #[test]
    fn size_limit_rejects_before_emitting() {
        let canonicalizer = Canonicalizer::new(EncodeLimits::default().with_max_output_bytes(8));
        let mut sink = Vec::new();
        let err = canonicalizer
            .encode_to(&Value::from("more than eight bytes"), &mut sink)
            .unwrap_err();
        assert!(matches!(err, CanonicalizationError::SizeExceeded { max: 8 }));
        assert!(sink.is_empty());

        let exact = Value::from("123456");
        assert_eq!(canonicalizer.encode(&exact).unwrap(), b"\"123456\"");
    }

    #[test]
    fn sink_errors_propagate_unchanged() {
        let mut sink = FnSink::new(|_: &[u8]| Err(SinkError::Rejected("closed".into())));
        let err = encode_to(&Value::from(1), &mut sink).unwrap_err();
        match err {
            CanonicalizationError::Sink(SinkError::Rejected(reason)) => assert_eq!(reason, "closed"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

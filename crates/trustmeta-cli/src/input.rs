//! Reading JSON input from a file or stdin.

use std::collections::HashSet;
use std::fmt;
use std::io::{self, Read};

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};

use trustmeta_canonical::{CanonicalizationError, EncodeLimits, Value};
use trustmeta_schemas::{wrap, ShapeError, Signable};

/// Failure to turn command input into a structured value.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Failed to read file {path}: {source}")]
    File { path: String, source: io::Error },
    #[error("Failed to read stdin: {0}")]
    Stdin(#[source] io::Error),
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported input: {0}")]
    Unsupported(#[from] CanonicalizationError),
    #[error("Malformed envelope: {0}")]
    Envelope(#[from] ShapeError),
}

/// Reads input JSON and converts it into a structured value.
pub fn read_value(input: Option<&str>, limits: &EncodeLimits) -> Result<Value, InputError> {
    let json_str = if let Some(path) = input {
        std::fs::read_to_string(path).map_err(|source| InputError::File {
            path: path.to_string(),
            source,
        })?
    } else {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(InputError::Stdin)?;
        buffer
    };
    tracing::debug!(bytes = json_str.len(), source = input.unwrap_or("stdin"), "read input");

    // serde_json::Value keeps the last of repeated keys, so reject them first.
    serde_json::from_str::<UniqueKeys>(&json_str)?;
    let json: serde_json::Value = serde_json::from_str(&json_str)?;
    Ok(Value::from_json_with_limits(&json, limits)?)
}

/// Walks a JSON document only to reject mappings that repeat a key.
#[derive(Debug)]
struct UniqueKeys;

impl<'de> Deserialize<'de> for UniqueKeys {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(UniqueKeysVisitor)
    }
}

struct UniqueKeysVisitor;

impl<'de> Visitor<'de> for UniqueKeysVisitor {
    type Value = UniqueKeys;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<UniqueKeys, E> {
        Ok(UniqueKeys)
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<UniqueKeys, E> {
        Ok(UniqueKeys)
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<UniqueKeys, E> {
        Ok(UniqueKeys)
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<UniqueKeys, E> {
        Ok(UniqueKeys)
    }

    fn visit_str<E: de::Error>(self, _: &str) -> Result<UniqueKeys, E> {
        Ok(UniqueKeys)
    }

    fn visit_unit<E: de::Error>(self) -> Result<UniqueKeys, E> {
        Ok(UniqueKeys)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<UniqueKeys, A::Error> {
        while seq.next_element::<UniqueKeys>()?.is_some() {}
        Ok(UniqueKeys)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<UniqueKeys, A::Error> {
        let mut seen = HashSet::new();
        while let Some(key) = map.next_key::<String>()? {
            map.next_value::<UniqueKeys>()?;
            if !seen.insert(key.clone()) {
                return Err(de::Error::custom(format!("duplicate mapping key {:?}", key)));
            }
        }
        Ok(UniqueKeys)
    }
}

/// Reads input and wraps it into an envelope unless it already is one.
pub fn read_signable(input: Option<&str>, limits: &EncodeLimits) -> Result<Signable, InputError> {
    let value = read_value(input, limits)?;
    Ok(wrap(value)?)
}

/// Reads input, optionally narrowing to the signed payload of an envelope.
pub fn read_payload(
    input: Option<&str>,
    signed_only: bool,
    limits: &EncodeLimits,
) -> Result<Value, InputError> {
    if signed_only {
        let (signed, _) = read_signable(input, limits)?.into_parts();
        Ok(signed)
    } else {
        read_value(input, limits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_keys_accepts_nested_documents() {
        serde_json::from_str::<UniqueKeys>(
            r#"{"a": [1, -2, 2.5, 18446744073709551616, null, true, {"a": "x"}], "b": {}}"#,
        )
        .unwrap();
    }

    #[test]
    fn unique_keys_rejects_repeats_at_any_depth() {
        let err = serde_json::from_str::<UniqueKeys>(r#"{"version": 1, "version": 2}"#).unwrap_err();
        assert!(err.to_string().contains("duplicate mapping key \"version\""));
        assert!(serde_json::from_str::<UniqueKeys>(r#"[{"x": {"k": 1, "k": 1}}]"#).is_err());
    }
}

//! Detached signature records.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use trustmeta_canonical::{Path, Value};

use crate::shape::ShapeError;
use crate::validation::ValidationError;

fn hex_pattern() -> &'static Regex {
    static HEX: OnceLock<Regex> = OnceLock::new();
    HEX.get_or_init(|| Regex::new(r"^[a-fA-F0-9]+$").expect("invalid regex"))
}

macro_rules! hex_newtype {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parses a validated hex string.
            pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
                let s = value.into();
                if !hex_pattern().is_match(&s) {
                    return Err(ValidationError::PatternMismatch {
                        field: stringify!($name),
                        value: s,
                    });
                }
                Ok(Self(s))
            }

            /// Borrows the hex text.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

hex_newtype!(KeyId, "Hex identifier of a signing key.");
hex_newtype!(HexSignature, "Hex-encoded signature bytes.");

/// One detached signature over the canonical bytes of a payload.
///
/// Several records may share a `keyid` when one key signs with more than one
/// method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Signature {
    /// Key that produced the signature.
    pub keyid: KeyId,
    /// Signature method (e.g. `ed25519`, `RSASSA-PSS`).
    pub method: String,
    /// Signature bytes, hex encoded.
    pub sig: HexSignature,
}

impl Signature {
    /// Builds a record from already validated parts.
    pub fn new(keyid: KeyId, method: impl Into<String>, sig: HexSignature) -> Self {
        Self {
            keyid,
            method: method.into(),
            sig,
        }
    }

    /// Parses a record from raw strings.
    pub fn parse(
        keyid: impl Into<String>,
        method: impl Into<String>,
        sig: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        Ok(Self::new(KeyId::parse(keyid)?, method, HexSignature::parse(sig)?))
    }

    /// Reads a record from a structured value found at `path`.
    ///
    /// The mapping must hold exactly `keyid`, `method` and `sig`.
    pub fn from_value(value: &Value, path: &Path) -> Result<Self, ShapeError> {
        let map = value
            .as_mapping()
            .ok_or_else(|| ShapeError::mismatch(path, "a signature", value.kind().to_string()))?;
        if let Some(extra) = map
            .keys()
            .find(|k| !matches!(k.as_str(), "keyid" | "method" | "sig"))
        {
            return Err(ShapeError::UnexpectedField {
                path: path.to_string(),
                field: extra.clone(),
            });
        }
        let field = |name: &str| -> Result<String, ShapeError> {
            match map.get(name) {
                Some(Value::String(s)) => Ok(s.clone()),
                Some(other) => Err(ShapeError::mismatch(
                    &path.push_field(name),
                    "a string",
                    other.kind().to_string(),
                )),
                None => Err(ShapeError::MissingField {
                    path: path.to_string(),
                    object: "signature".into(),
                    field: name.into(),
                }),
            }
        };
        let hex = |name: &str, raw: String| {
            ShapeError::mismatch(
                &path.push_field(name),
                "a hex string",
                format!("'{}'", raw),
            )
        };

        let keyid = field("keyid")?;
        let method = field("method")?;
        let sig = field("sig")?;
        Ok(Self {
            keyid: KeyId::parse(keyid.clone()).map_err(|_| hex("keyid", keyid))?,
            method,
            sig: HexSignature::parse(sig.clone()).map_err(|_| hex("sig", sig))?,
        })
    }
}

impl From<&Signature> for Value {
    fn from(signature: &Signature) -> Self {
        [
            ("keyid", Value::from(signature.keyid.as_str())),
            ("method", Value::from(signature.method.as_str())),
            ("sig", Value::from(signature.sig.as_str())),
        ]
        .into_iter()
        .collect()
    }
}

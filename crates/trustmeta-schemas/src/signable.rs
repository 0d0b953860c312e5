//! The signable envelope: a payload plus its detached signatures.

use serde::{Deserialize, Serialize};
use trustmeta_canonical::{CanonicalizationError, Canonicalizer, Mapping, Path, Value};

use crate::shape::ShapeError;
use crate::signature::{KeyId, Signature};

/// Payload and the ordered signatures computed over its canonical bytes.
///
/// `signed` is fixed at construction. `signatures` only grows, in the order
/// signatures are appended; nothing here sorts, deduplicates or checks them
/// cryptographically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Signable {
    signed: Value,
    signatures: Vec<Signature>,
}

impl Signable {
    /// Wraps `payload` with an empty signature list, whatever its shape.
    pub fn new(payload: Value) -> Self {
        Self {
            signed: payload,
            signatures: Vec::new(),
        }
    }

    /// The signed payload.
    pub fn signed(&self) -> &Value {
        &self.signed
    }

    /// Signatures in the order they were appended.
    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    /// Key ids of the attached signatures, in order, duplicates included.
    pub fn keyids(&self) -> impl Iterator<Item = &KeyId> {
        self.signatures.iter().map(|sig| &sig.keyid)
    }

    /// Appends `signature` to the end of the list.
    pub fn append_signature(&mut self, signature: Signature) {
        tracing::debug!(
            keyid = %signature.keyid,
            method = %signature.method,
            position = self.signatures.len(),
            "appending signature"
        );
        self.signatures.push(signature);
    }

    /// The canonical bytes signers sign and verifiers re-derive.
    pub fn signed_bytes(&self, canonicalizer: &Canonicalizer) -> Result<Vec<u8>, CanonicalizationError> {
        canonicalizer.encode(&self.signed)
    }

    /// Splits the envelope into payload and signatures.
    pub fn into_parts(self) -> (Value, Vec<Signature>) {
        (self.signed, self.signatures)
    }

    /// Reads an envelope from a structured value, validating its shape.
    ///
    /// The mapping must hold exactly `signed` and `signatures`, the latter a
    /// sequence of signature records.
    pub fn from_value(value: &Value) -> Result<Self, ShapeError> {
        let root = Path::root();
        let map = value
            .as_mapping()
            .ok_or_else(|| ShapeError::mismatch(&root, "a signable envelope", value.kind().to_string()))?;
        envelope_from_mapping(map, &root)
    }
}

fn envelope_from_mapping(map: &Mapping, path: &Path) -> Result<Signable, ShapeError> {
    if let Some(extra) = map
        .keys()
        .find(|k| !matches!(k.as_str(), "signed" | "signatures"))
    {
        return Err(ShapeError::UnexpectedField {
            path: path.to_string(),
            field: extra.clone(),
        });
    }
    let missing = |field: &str| ShapeError::MissingField {
        path: path.to_string(),
        object: "signable envelope".into(),
        field: field.into(),
    };
    let signed = map.get("signed").ok_or_else(|| missing("signed"))?;
    let raw = map.get("signatures").ok_or_else(|| missing("signatures"))?;

    let sigs_path = path.push_field("signatures");
    let items = raw
        .as_sequence()
        .ok_or_else(|| ShapeError::mismatch(&sigs_path, "a sequence", raw.kind().to_string()))?;
    let signatures = items
        .iter()
        .enumerate()
        .map(|(idx, item)| Signature::from_value(item, &sigs_path.push_index(idx)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Signable {
        signed: signed.clone(),
        signatures,
    })
}

/// Wraps `payload` into an envelope unless it already is one.
///
/// A mapping carrying a `signed` field is taken as already wrapped and
/// returned as-is after its envelope shape is validated; a malformed envelope
/// is an error rather than being wrapped a second time. Anything else becomes
/// `{"signed": payload, "signatures": []}`. Wrapping is idempotent:
/// `wrap(Value::from(wrap(p)?))? == wrap(p)?`.
pub fn wrap(payload: Value) -> Result<Signable, ShapeError> {
    match payload {
        Value::Mapping(ref map) if map.contains_key("signed") => {
            let signable = envelope_from_mapping(map, &Path::root())?;
            tracing::trace!(
                signatures = signable.signatures.len(),
                "payload already wrapped"
            );
            Ok(signable)
        }
        other => Ok(Signable::new(other)),
    }
}

impl From<Signable> for Value {
    fn from(signable: Signable) -> Self {
        let signatures = signable.signatures.iter().map(Value::from).collect();
        [
            ("signed", signable.signed),
            ("signatures", Value::Sequence(signatures)),
        ]
        .into_iter()
        .collect()
    }
}

impl TryFrom<&Value> for Signable {
    type Error = ShapeError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        Signable::from_value(value)
    }
}

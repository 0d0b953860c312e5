//! Signature envelopes and role metadata shapes.
//!
//! This crate provides:
//! - [`Signature`] records and the [`Signable`] envelope that carries them
//! - [`wrap`], the idempotent envelope constructor
//! - [`Shape`] descriptors and the role [`catalog`] used to check metadata
//!   before it is encoded, signed or trusted
//!
//! Signatures are always computed over the canonical bytes of the `signed`
//! payload, never over the envelope:
//!
//! ```rust
//! use trustmeta_canonical::{Canonicalizer, Value};
//! use trustmeta_schemas::{wrap, Signature};
//! use serde_json::json;
//!
//! let payload = Value::from_json(&json!({"_type": "Timestamp", "version": 1}))?;
//! let mut envelope = wrap(payload)?;
//! let bytes = envelope.signed_bytes(&Canonicalizer::default())?;
//! assert_eq!(bytes, br#"{"_type":"Timestamp","version":1}"#);
//!
//! envelope.append_signature(Signature::parse("ab12", "ed25519", "c0ffee")?);
//! assert_eq!(envelope.signatures().len(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(missing_docs)]

pub mod roles;
pub mod shape;
pub mod signable;
pub mod signature;
/// Validation errors for metadata primitives.
pub mod validation;

pub use roles::{
    catalog, check_any_role, check_role, check_signable, expires_at, is_expired, Catalog, Role,
    UnknownRole,
};
pub use shape::{Shape, ShapeError};
pub use signable::{wrap, Signable};
pub use signature::{HexSignature, KeyId, Signature};
pub use validation::ValidationError;

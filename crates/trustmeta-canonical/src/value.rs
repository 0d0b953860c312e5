use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, Serializer};

use crate::canonicalizer::CanonicalizationError;
use crate::limits::EncodeLimits;
use crate::path::Path;

/// Mapping type used by [`Value::Mapping`].
///
/// `BTreeMap<String, _>` iterates in byte-wise key order, which is the
/// canonical order, so no sorting happens at encode time.
pub type Mapping = BTreeMap<String, Value>;

/// Structured value accepted by the canonical encoder.
///
/// The kind set is closed: there is no floating-point variant and mapping
/// keys are always strings. The tree is owned, so it cannot contain cycles.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Value {
    /// `null`.
    #[default]
    Null,
    /// `true` / `false`.
    Bool(bool),
    /// Integer with no fractional part.
    Integer(i128),
    /// UTF-8 text.
    String(String),
    /// Ordered list; order is significant.
    Sequence(Vec<Value>),
    /// String-keyed mapping; insertion order is irrelevant.
    Mapping(Mapping),
}

/// Discriminant of a [`Value`], used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// `null`.
    Null,
    /// Boolean.
    Bool,
    /// Integer.
    Integer,
    /// String.
    String,
    /// Sequence.
    Sequence,
    /// Mapping.
    Mapping,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "boolean",
            ValueKind::Integer => "integer",
            ValueKind::String => "string",
            ValueKind::Sequence => "sequence",
            ValueKind::Mapping => "mapping",
        };
        f.write_str(name)
    }
}

impl Value {
    /// Returns the kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Integer(_) => ValueKind::Integer,
            Value::String(_) => ValueKind::String,
            Value::Sequence(_) => ValueKind::Sequence,
            Value::Mapping(_) => ValueKind::Mapping,
        }
    }

    /// An empty mapping.
    pub fn mapping() -> Self {
        Value::Mapping(Mapping::new())
    }

    /// True for `null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrows the text of a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer, if this is one.
    pub fn as_integer(&self) -> Option<i128> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrows the elements of a sequence.
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Borrows the entries of a mapping.
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up `key` when this is a mapping.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_mapping().and_then(|map| map.get(key))
    }

    /// Converts parsed JSON using the default [`EncodeLimits`].
    pub fn from_json(json: &serde_json::Value) -> Result<Self, CanonicalizationError> {
        Self::from_json_with_limits(json, &EncodeLimits::default())
    }

    /// Converts parsed JSON, rejecting floats and nesting deeper than `limits.max_depth`.
    ///
    /// Errors carry the path of the offending value.
    pub fn from_json_with_limits(
        json: &serde_json::Value,
        limits: &EncodeLimits,
    ) -> Result<Self, CanonicalizationError> {
        convert(json, Path::root(), limits)
    }

    /// Converts any serializable type by way of `serde_json::Value`.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, CanonicalizationError> {
        let json = serde_json::to_value(value)
            .map_err(|e| CanonicalizationError::Serialization(e.to_string()))?;
        Self::from_json(&json)
    }
}

fn convert(
    json: &serde_json::Value,
    path: Path,
    limits: &EncodeLimits,
) -> Result<Value, CanonicalizationError> {
    use serde_json::Value as Json;

    match json {
        Json::Null => Ok(Value::Null),
        Json::Bool(b) => Ok(Value::Bool(*b)),
        Json::Number(n) => match integer_from_literal(n.as_str()) {
            Ok(i) => Ok(Value::Integer(i)),
            Err(NumberError::Fractional) => Err(CanonicalizationError::ValueKind {
                path: path.to_string(),
                found: format!("floating-point number {}", n),
            }),
            Err(NumberError::OutOfRange) => Err(CanonicalizationError::IntegerOutOfRange {
                path: path.to_string(),
                literal: n.to_string(),
            }),
        },
        Json::String(s) => Ok(Value::String(s.clone())),
        Json::Array(items) => {
            ensure_depth(&path, limits)?;
            items
                .iter()
                .enumerate()
                .map(|(idx, item)| convert(item, path.push_index(idx), limits))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Sequence)
        }
        Json::Object(map) => {
            ensure_depth(&path, limits)?;
            let mut out = Mapping::new();
            for (key, child) in map {
                out.insert(key.clone(), convert(child, path.push_field(key), limits)?);
            }
            Ok(Value::Mapping(out))
        }
    }
}

fn ensure_depth(path: &Path, limits: &EncodeLimits) -> Result<(), CanonicalizationError> {
    if path.len() >= limits.max_depth {
        return Err(CanonicalizationError::DepthExceeded {
            path: path.to_string(),
            max: limits.max_depth,
        });
    }
    Ok(())
}

/// Why a JSON number literal is not a canonical integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NumberError {
    Fractional,
    OutOfRange,
}

/// Reads a JSON number literal as an exact integer.
///
/// Any fraction or exponent makes the literal a float, even `1.0` or `1e2`.
fn integer_from_literal(literal: &str) -> Result<i128, NumberError> {
    if literal.contains(|c: char| matches!(c, '.' | 'e' | 'E')) {
        return Err(NumberError::Fractional);
    }
    literal.parse::<i128>().map_err(|_| NumberError::OutOfRange)
}

impl TryFrom<serde_json::Value> for Value {
    type Error = CanonicalizationError;

    fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
        Value::from_json(&json)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(i: $ty) -> Self {
                    Value::Integer(i128::from(i))
                }
            }
        )*
    };
}

from_integer!(i8, i16, i32, i64, i128, u8, u16, u32, u64);

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        // usize is at most 64 bits on every supported target.
        Value::Integer(i as i128)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Sequence(items.into_iter().map(Into::into).collect())
    }
}

impl From<Mapping> for Value {
    fn from(map: Mapping) -> Self {
        Value::Mapping(map)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Mapping(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Integer(i) => serializer.serialize_i128(*i),
            Value::String(s) => serializer.serialize_str(s),
            Value::Sequence(items) => serializer.collect_seq(items),
            Value::Mapping(map) => serializer.collect_map(map),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, integer, boolean, null, sequence or string-keyed mapping")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Integer(i128::from(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::Integer(i128::from(v)))
    }

    fn visit_i128<E: de::Error>(self, v: i128) -> Result<Value, E> {
        Ok(Value::Integer(v))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<Value, E> {
        i128::try_from(v)
            .map(Value::Integer)
            .map_err(|_| E::custom(format!("integer {} is out of range", v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Err(E::custom(format!(
            "floating-point number {} cannot be canonicalized",
            v
        )))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Value::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(4096));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Sequence(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
        let mut map = Mapping::new();
        let mut next = access.next_key::<String>()?;
        if next.as_deref() == Some(NUMBER_TOKEN) {
            let NumberLiteral(literal) = access.next_value()?;
            return match integer_from_literal(&literal) {
                Ok(i) => Ok(Value::Integer(i)),
                Err(NumberError::Fractional) => Err(de::Error::custom(format!(
                    "floating-point number {} cannot be canonicalized",
                    literal
                ))),
                Err(NumberError::OutOfRange) => Err(de::Error::custom(format!(
                    "integer {} is out of range",
                    literal
                ))),
            };
        }
        while let Some(key) = next {
            let value = access.next_value::<Value>()?;
            if map.insert(key.clone(), value).is_some() {
                return Err(de::Error::custom(format!("duplicate mapping key {:?}", key)));
            }
            next = access.next_key()?;
        }
        Ok(Value::Mapping(map))
    }
}

/// Key serde_json uses to hand over numbers that do not fit a machine integer.
const NUMBER_TOKEN: &str = "$serde_json::private::Number";

/// Raw text of a number handed over under [`NUMBER_TOKEN`].
///
/// serde_json passes that text as an owned string, while its text parser
/// hands document strings over borrowed or by reference. Accepting only the
/// owned form keeps a parsed object that happens to use the same key from
/// being read as a number.
struct NumberLiteral(String);

impl<'de> Deserialize<'de> for NumberLiteral {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LiteralVisitor;

        impl<'de> Visitor<'de> for LiteralVisitor {
            type Value = NumberLiteral;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON number literal")
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<NumberLiteral, E> {
                Ok(NumberLiteral(v))
            }
        }

        deserializer.deserialize_any(LiteralVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_json_integers_without_loss() {
        let value = Value::from_json(&json!([u64::MAX, i64::MIN, 0])).unwrap();
        assert_eq!(
            value,
            Value::Sequence(vec![
                Value::Integer(i128::from(u64::MAX)),
                Value::Integer(i128::from(i64::MIN)),
                Value::Integer(0),
            ])
        );
    }

    #[test]
    fn rejects_floats_with_their_path() {
        let err = Value::from_json(&json!({"signed": {"roles": [1, 2.5]}})).unwrap_err();
        match err {
            CanonicalizationError::ValueKind { path, found } => {
                assert_eq!(path, "$.signed.roles[1]");
                assert!(found.contains("2.5"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_nesting_past_the_limit() {
        let limits = EncodeLimits::default().with_max_depth(2);
        assert!(Value::from_json_with_limits(&json!([[1]]), &limits).is_ok());
        let err = Value::from_json_with_limits(&json!([[[1]]]), &limits).unwrap_err();
        assert!(matches!(
            err,
            CanonicalizationError::DepthExceeded { ref path, max: 2 } if path == "$[0][0]"
        ));
    }

    #[test]
    fn deserialize_rejects_floats() {
        let err = serde_json::from_str::<Value>(r#"{"a": 1.0}"#).unwrap_err();
        assert!(err.to_string().contains("floating-point"));
        let ok: Value = serde_json::from_str(r#"{"a": [true, null, "x", -3]}"#).unwrap();
        assert_eq!(
            ok.get("a").and_then(Value::as_sequence).map(<[Value]>::len),
            Some(4)
        );
    }

    #[test]
    fn serializes_back_to_plain_json() {
        let value: Value = [("b", Value::from(1)), ("a", Value::from(vec!["x"]))]
            .into_iter()
            .collect();
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            json!({"a": ["x"], "b": 1})
        );
    }

    #[test]
    fn integers_beyond_u64_keep_their_digits() {
        let json: serde_json::Value = serde_json::from_str("[18446744073709551616, -0]").unwrap();
        assert_eq!(
            Value::from_json(&json).unwrap(),
            Value::from(vec![Value::Integer(1 << 64), Value::Integer(0)])
        );

        let direct: Value = serde_json::from_str("18446744073709551616").unwrap();
        assert_eq!(direct, Value::Integer(1 << 64));
    }

    #[test]
    fn oversized_integers_are_not_reported_as_floats() {
        let json: serde_json::Value =
            serde_json::from_str(r#"{"n": 170141183460469231731687303715884105728}"#).unwrap();
        let err = Value::from_json(&json).unwrap_err();
        assert!(
            matches!(err, CanonicalizationError::IntegerOutOfRange { ref path, .. } if path == "$.n"),
            "{err}"
        );

        let err = serde_json::from_str::<Value>("170141183460469231731687303715884105728")
            .unwrap_err();
        assert!(err.to_string().contains("out of range"), "{err}");
        let err = serde_json::from_str::<Value>("2.5e3").unwrap_err();
        assert!(err.to_string().contains("floating-point"), "{err}");
    }

    #[test]
    fn reserved_number_key_is_rejected_in_documents() {
        assert!(serde_json::from_str::<Value>(r#"{"$serde_json::private::Number": "5"}"#).is_err());
    }

    #[test]
    fn deserialize_rejects_duplicate_keys() {
        let err = serde_json::from_str::<Value>(r#"{"version": 1, "version": 2}"#).unwrap_err();
        assert!(err.to_string().contains("duplicate mapping key"), "{err}");
    }

    #[test]
    fn option_and_kind_helpers() {
        assert!(Value::from(None::<i32>).is_null());
        assert_eq!(Value::from(Some("x")).kind(), ValueKind::String);
        assert_eq!(Value::mapping().kind().to_string(), "mapping");
    }
}

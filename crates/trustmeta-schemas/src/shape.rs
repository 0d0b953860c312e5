//! Declarative shape descriptors for structured values.
//!
//! A [`Shape`] describes what a well-formed value looks like: a fixed string,
//! a string matching a pattern, an integer range, a list of some shape, and so
//! on. Shapes compose into role descriptions (see [`crate::roles`]) and are
//! checked before metadata is encoded or trusted; the encoder itself never
//! consults them.

use std::fmt;

use regex::Regex;
use trustmeta_canonical::{Path, Value};

/// Lower bound used by [`Shape::integer_at_least`] and [`Shape::any_integer`].
pub const DEFAULT_INTEGER_MIN: i128 = i32::MIN as i128;
/// Upper bound used by [`Shape::integer_at_least`] and [`Shape::any_integer`].
pub const DEFAULT_INTEGER_MAX: i128 = i32::MAX as i128;

/// Error raised when a value does not have the expected shape.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    /// The value at `path` is not what the shape expects.
    #[error("{path}: expected {expected}, found {found}")]
    Mismatch {
        /// Location of the offending value.
        path: String,
        /// Human-readable description of the expected shape.
        expected: String,
        /// Human-readable description of what was found.
        found: String,
    },
    /// A required field of an object is absent.
    #[error("{path}: {object} is missing required field '{field}'")]
    MissingField {
        /// Location of the object.
        path: String,
        /// Name of the object shape.
        object: String,
        /// Missing field name.
        field: String,
    },
    /// A field that the shape does not allow is present.
    #[error("{path}: unexpected field '{field}'")]
    UnexpectedField {
        /// Location of the object.
        path: String,
        /// Offending field name.
        field: String,
    },
    /// None of the alternatives of a one-of shape matched.
    #[error("{path}: value matches none of the {alternatives} allowed shapes")]
    NoAlternative {
        /// Location of the offending value.
        path: String,
        /// Number of alternatives tried.
        alternatives: usize,
    },
}

impl ShapeError {
    pub(crate) fn mismatch(
        path: &Path,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        ShapeError::Mismatch {
            path: path.to_string(),
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Shape descriptor.
#[derive(Debug, Clone)]
pub enum Shape {
    /// Anything.
    Any,
    /// Any string.
    AnyString,
    /// Exactly this string.
    Exact(String),
    /// A string fully matching `regex`.
    Pattern {
        /// The pattern as written, for diagnostics.
        source: String,
        /// The anchored regular expression.
        regex: Regex,
    },
    /// An integer in `lo..=hi`.
    Integer {
        /// Inclusive lower bound.
        lo: i128,
        /// Inclusive upper bound.
        hi: i128,
    },
    /// A boolean.
    Boolean,
    /// A sequence whose elements all match `item`.
    ListOf {
        /// Element shape.
        item: Box<Shape>,
        /// Minimum element count.
        min_count: usize,
        /// Maximum element count.
        max_count: usize,
    },
    /// A mapping whose keys and values match the given shapes.
    DictOf {
        /// Shape every key (as a string value) must match.
        key: Box<Shape>,
        /// Shape every value must match.
        value: Box<Shape>,
    },
    /// A mapping with named fields; unlisted extra fields are allowed.
    Object {
        /// Name used in diagnostics.
        name: String,
        /// Field names and their shapes; wrap a shape in [`Shape::Optional`]
        /// to make the field optional.
        fields: Vec<(String, Shape)>,
    },
    /// Matches if any alternative matches.
    OneOf(Vec<Shape>),
    /// An object field that may be absent; when present it must match.
    Optional(Box<Shape>),
}

impl Shape {
    /// Exactly `s`.
    pub fn exact(s: impl Into<String>) -> Self {
        Shape::Exact(s.into())
    }

    /// A string fully matching `pattern`.
    ///
    /// For the fixed patterns of the role catalog; use [`Shape::try_pattern`]
    /// for patterns that come from outside.
    pub fn pattern(pattern: &'static str) -> Self {
        Self::try_pattern(pattern).expect("invalid regex")
    }

    /// A string fully matching `pattern`, or the compile error.
    ///
    /// `$` only matches at the very end, so a trailing newline never matches.
    pub fn try_pattern(pattern: impl Into<String>) -> Result<Self, regex::Error> {
        let source = pattern.into();
        let regex = Regex::new(&format!("^(?:{})$", source))?;
        Ok(Shape::Pattern { source, regex })
    }

    /// An integer in `lo..=hi`.
    pub fn integer(lo: i128, hi: i128) -> Self {
        Shape::Integer { lo, hi }
    }

    /// An integer at least `lo` and at most [`DEFAULT_INTEGER_MAX`].
    pub fn integer_at_least(lo: i128) -> Self {
        Shape::Integer {
            lo,
            hi: DEFAULT_INTEGER_MAX,
        }
    }

    /// An integer within the default 32-bit bounds.
    pub fn any_integer() -> Self {
        Shape::Integer {
            lo: DEFAULT_INTEGER_MIN,
            hi: DEFAULT_INTEGER_MAX,
        }
    }

    /// A sequence of `item` with any number of elements.
    pub fn list_of(item: Shape) -> Self {
        Shape::ListOf {
            item: Box::new(item),
            min_count: 0,
            max_count: usize::MAX,
        }
    }

    /// A sequence of `item` with `min_count..=max_count` elements.
    pub fn list_of_bounded(item: Shape, min_count: usize, max_count: usize) -> Self {
        Shape::ListOf {
            item: Box::new(item),
            min_count,
            max_count,
        }
    }

    /// A mapping from `key` to `value`.
    pub fn dict_of(key: Shape, value: Shape) -> Self {
        Shape::DictOf {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// An object named `name` with `fields`.
    pub fn object<I, K>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Shape)>,
        K: Into<String>,
    {
        Shape::Object {
            name: name.into(),
            fields: fields.into_iter().map(|(k, s)| (k.into(), s)).collect(),
        }
    }

    /// Matches any of `alternatives`.
    pub fn one_of(alternatives: impl IntoIterator<Item = Shape>) -> Self {
        Shape::OneOf(alternatives.into_iter().collect())
    }

    /// An optional object field.
    pub fn optional(inner: Shape) -> Self {
        Shape::Optional(Box::new(inner))
    }

    /// True when `value` has this shape.
    pub fn matches(&self, value: &Value) -> bool {
        self.check_match(value).is_ok()
    }

    /// Checks `value`, reporting the first mismatch.
    pub fn check_match(&self, value: &Value) -> Result<(), ShapeError> {
        self.check_match_at(value, &Path::root())
    }

    /// Checks `value` found at `path` inside a larger tree.
    pub fn check_match_at(&self, value: &Value, path: &Path) -> Result<(), ShapeError> {
        match self {
            Shape::Any => Ok(()),
            Shape::AnyString => expect_str(value, path, "a string").map(drop),
            Shape::Exact(expected) => {
                let s = expect_str(value, path, format!("'{}'", expected))?;
                if s == expected {
                    Ok(())
                } else {
                    Err(ShapeError::mismatch(
                        path,
                        format!("'{}'", expected),
                        format!("'{}'", s),
                    ))
                }
            }
            Shape::Pattern { source, regex } => {
                let expected = format!("a string matching /{}/", source);
                let s = expect_str(value, path, expected.as_str())?;
                if regex.is_match(s) {
                    Ok(())
                } else {
                    Err(ShapeError::mismatch(path, expected, format!("'{}'", s)))
                }
            }
            Shape::Integer { lo, hi } => match value {
                Value::Integer(i) if (*lo..=*hi).contains(i) => Ok(()),
                Value::Integer(i) => Err(ShapeError::mismatch(
                    path,
                    format!("an integer in {}..={}", lo, hi),
                    i.to_string(),
                )),
                other => Err(ShapeError::mismatch(path, "an integer", other.kind().to_string())),
            },
            Shape::Boolean => match value {
                Value::Bool(_) => Ok(()),
                other => Err(ShapeError::mismatch(path, "a boolean", other.kind().to_string())),
            },
            Shape::ListOf {
                item,
                min_count,
                max_count,
            } => {
                let items = value.as_sequence().ok_or_else(|| {
                    ShapeError::mismatch(path, "a sequence", value.kind().to_string())
                })?;
                if items.len() < *min_count || items.len() > *max_count {
                    return Err(ShapeError::mismatch(
                        path,
                        format!("between {} and {} elements", min_count, max_count),
                        format!("{} elements", items.len()),
                    ));
                }
                for (idx, element) in items.iter().enumerate() {
                    item.check_match_at(element, &path.push_index(idx))?;
                }
                Ok(())
            }
            Shape::DictOf { key, value: shape } => {
                let map = expect_mapping(value, path, "a mapping")?;
                for (k, v) in map {
                    let child = path.push_field(k);
                    key.check_match_at(&Value::String(k.clone()), &child)?;
                    shape.check_match_at(v, &child)?;
                }
                Ok(())
            }
            Shape::Object { name, fields } => {
                let map = expect_mapping(value, path, name.as_str())?;
                for (field, shape) in fields {
                    match map.get(field) {
                        Some(v) => shape.check_match_at(v, &path.push_field(field))?,
                        None if shape.is_optional() => {}
                        None => {
                            return Err(ShapeError::MissingField {
                                path: path.to_string(),
                                object: name.clone(),
                                field: field.clone(),
                            })
                        }
                    }
                }
                Ok(())
            }
            Shape::OneOf(alternatives) => {
                if alternatives
                    .iter()
                    .any(|alt| alt.check_match_at(value, path).is_ok())
                {
                    Ok(())
                } else {
                    Err(ShapeError::NoAlternative {
                        path: path.to_string(),
                        alternatives: alternatives.len(),
                    })
                }
            }
            Shape::Optional(inner) => inner.check_match_at(value, path),
        }
    }

    fn is_optional(&self) -> bool {
        matches!(self, Shape::Optional(_))
    }
}

fn expect_str<'v>(
    value: &'v Value,
    path: &Path,
    expected: impl Into<String>,
) -> Result<&'v str, ShapeError> {
    value
        .as_str()
        .ok_or_else(|| ShapeError::mismatch(path, expected, value.kind().to_string()))
}

fn expect_mapping<'v>(
    value: &'v Value,
    path: &Path,
    expected: &str,
) -> Result<&'v trustmeta_canonical::Mapping, ShapeError> {
    value
        .as_mapping()
        .ok_or_else(|| ShapeError::mismatch(path, expected, value.kind().to_string()))
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Any => write!(f, "any"),
            Shape::AnyString => write!(f, "string"),
            Shape::Exact(s) => write!(f, "'{}'", s),
            Shape::Pattern { source, .. } => write!(f, "/{}/", source),
            Shape::Integer { lo, hi } => write!(f, "integer {}..={}", lo, hi),
            Shape::Boolean => write!(f, "boolean"),
            Shape::ListOf { item, .. } => write!(f, "list of {}", item),
            Shape::DictOf { key, value } => write!(f, "dict of {} -> {}", key, value),
            Shape::Object { name, .. } => write!(f, "{}", name),
            Shape::OneOf(alternatives) => {
                write!(f, "one of [")?;
                for (idx, alt) in alternatives.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", alt)?;
                }
                write!(f, "]")
            }
            Shape::Optional(inner) => write!(f, "optional {}", inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn value(json: serde_json::Value) -> Value {
        Value::from_json(&json).unwrap()
    }

    #[test]
    fn patterns_must_match_the_whole_string() {
        let hex = Shape::pattern("[a-fA-F0-9]+");
        assert!(hex.matches(&value(json!("deadBEEF"))));
        assert!(!hex.matches(&value(json!("deadbeefz"))));
        assert!(!hex.matches(&value(json!(""))));
        assert!(!hex.matches(&value(json!(12))));
        assert!(!hex.matches(&value(json!("deadbeef\n"))));
    }

    #[test]
    fn integer_bounds_are_inclusive() {
        let threshold = Shape::integer_at_least(1);
        assert!(threshold.matches(&value(json!(1))));
        assert!(!threshold.matches(&value(json!(0))));
        assert!(!threshold.matches(&value(json!(i64::from(i32::MAX) + 1))));
        assert!(!threshold.matches(&value(json!(true))));
    }

    #[test]
    fn object_reports_missing_and_nested_fields() {
        let shape = Shape::object(
            "ROLE",
            [
                ("keyids", Shape::list_of(Shape::AnyString)),
                ("threshold", Shape::integer_at_least(1)),
                ("name", Shape::optional(Shape::AnyString)),
            ],
        );

        assert!(shape.matches(&value(json!({"keyids": [], "threshold": 1, "extra": 0}))));

        let err = shape.check_match(&value(json!({"keyids": []}))).unwrap_err();
        assert_eq!(
            err,
            ShapeError::MissingField {
                path: "$".into(),
                object: "ROLE".into(),
                field: "threshold".into(),
            }
        );

        let err = shape
            .check_match(&value(json!({"keyids": ["a", 7], "threshold": 2})))
            .unwrap_err();
        assert!(matches!(err, ShapeError::Mismatch { ref path, .. } if path == "$.keyids[1]"));

        let err = shape
            .check_match(&value(json!({"keyids": [], "threshold": 1, "name": null})))
            .unwrap_err();
        assert!(matches!(err, ShapeError::Mismatch { ref path, .. } if path == "$.name"));
    }

    #[test]
    fn dict_of_checks_keys_and_values() {
        let shape = Shape::dict_of(Shape::pattern("[a-f0-9]+"), Shape::Boolean);
        assert!(shape.matches(&value(json!({"ab12": true}))));
        let err = shape.check_match(&value(json!({"xyz": true}))).unwrap_err();
        assert!(matches!(err, ShapeError::Mismatch { ref path, .. } if path == "$.xyz"));
    }

    #[test]
    fn one_of_and_list_bounds() {
        let compression = Shape::one_of([Shape::exact(""), Shape::exact("gz")]);
        assert!(compression.matches(&value(json!("gz"))));
        assert_eq!(
            compression.check_match(&value(json!("bz2"))).unwrap_err(),
            ShapeError::NoAlternative {
                path: "$".into(),
                alternatives: 2,
            }
        );

        let pair = Shape::list_of_bounded(Shape::Any, 2, 2);
        assert!(pair.matches(&value(json!([1, "x"]))));
        assert!(!pair.matches(&value(json!([1]))));
    }

    #[test]
    fn display_names_the_shape() {
        let shape = Shape::list_of(Shape::one_of([Shape::exact("rsa"), Shape::Boolean]));
        assert_eq!(shape.to_string(), "list of one of ['rsa', boolean]");
    }
}

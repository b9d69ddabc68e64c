//! Opaque metadata values and typed conversions.
//!
//! Metadata maps string keys to a [`Value`]: a small tagged union covering
//! scalars, collections, and documents (so that modules like `GroupBy` and
//! `Paginate` can hand member documents to downstream modules through plain
//! metadata).
//!
//! Typed reads go through [`FromValue`], which is deliberately forgiving:
//!
//! | Target | Accepts |
//! |--------|---------|
//! | `bool` | `Bool`, `"true"` / `"false"` |
//! | integers | `Int`, integral `Float`, numeric `String` |
//! | `f64` | `Float`, `Int` (widening), numeric `String` |
//! | `String` | `String`, any other scalar via `Display` |
//! | `Vec<T>` | `List`, or a single value as a one-element vec |
//! | `Option<T>` | `Null` as `None`, anything else through `T` |
//!
//! A failed conversion is a [`ConversionError`], which the metadata layer
//! reports separately from a missing key.

use crate::document::Document;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot convert {found} to {expected}")]
pub struct ConversionError {
    pub expected: &'static str,
    pub found: &'static str,
}

/// A metadata value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Document(Document),
}

impl Value {
    /// Short name of the variant, used in conversion errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Document(_) => "document",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(d) => Some(d),
            _ => None,
        }
    }

    /// Loose truthiness for predicate-style config (`when = "draft"`).
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty() && s != "false",
            Value::List(l) => !l.is_empty(),
            Value::Map(m) => !m.is_empty(),
            Value::Document(_) => true,
        }
    }

    /// Total ordering used by `OrderBy`.
    ///
    /// Numbers compare numerically across `Int`/`Float`, strings lexically,
    /// lists element-wise. Values of unrelated kinds order by variant rank so
    /// sorting a mixed collection is still deterministic.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).total_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.total_cmp(&(*b as f64)),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b) {
                    let ord = x.compare(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (Value::Document(a), Value::Document(b)) => a.source().cmp(b.source()),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 2,
            Value::String(_) => 3,
            Value::List(_) => 4,
            Value::Map(_) => 5,
            Value::Document(_) => 6,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            Value::Document(d) => f.write_str(d.source()),
        }
    }
}

// =============================================================================
// Into Value
// =============================================================================

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

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<Document> for Value {
    fn from(d: Document) -> Self {
        Value::Document(d)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

macro_rules! int_into_value {
    ($($t:ty),*) => {$(
        impl From<$t> for Value {
            fn from(i: $t) -> Self {
                Value::Int(i as i64)
            }
        }
    )*};
}

int_into_value!(i32, i64, u32, u8, usize);

impl From<toml::Value> for Value {
    fn from(value: toml::Value) -> Self {
        match value {
            toml::Value::String(s) => Value::String(s),
            toml::Value::Integer(i) => Value::Int(i),
            toml::Value::Float(x) => Value::Float(x),
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Datetime(dt) => Value::String(dt.to_string()),
            toml::Value::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            toml::Value::Table(table) => {
                Value::Map(table.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<serde_yaml::Value> for Value {
    fn from(value: serde_yaml::Value) -> Self {
        use serde_yaml::Value as Yaml;
        match value {
            Yaml::Null => Value::Null,
            Yaml::Bool(b) => Value::Bool(b),
            Yaml::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            Yaml::String(s) => Value::String(s),
            Yaml::Sequence(items) => Value::List(items.into_iter().map(Value::from).collect()),
            Yaml::Mapping(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (Value::from(k).to_string(), Value::from(v)))
                    .collect(),
            ),
            Yaml::Tagged(tagged) => Value::from(tagged.value),
        }
    }
}

// =============================================================================
// Typed conversion
// =============================================================================

/// Best-effort conversion out of a [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, ConversionError>;
}

fn mismatch<T>(expected: &'static str, value: &Value) -> Result<T, ConversionError> {
    Err(ConversionError {
        expected,
        found: value.type_name(),
    })
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        Ok(value.clone())
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::String(s) => s.trim().parse().or_else(|_| mismatch("bool", value)),
            _ => mismatch("bool", value),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Int(i) => Ok(*i),
            // i64::MAX as f64 is 2^63, one past the range
            Value::Float(x)
                if x.fract() == 0.0 && *x >= i64::MIN as f64 && *x < i64::MAX as f64 =>
            {
                Ok(*x as i64)
            }
            Value::String(s) => s.trim().parse().or_else(|_| mismatch("int", value)),
            _ => mismatch("int", value),
        }
    }
}

macro_rules! narrow_int_from_value {
    ($($t:ty => $name:literal),*) => {$(
        impl FromValue for $t {
            fn from_value(value: &Value) -> Result<Self, ConversionError> {
                let wide = i64::from_value(value).or_else(|_| mismatch($name, value))?;
                <$t>::try_from(wide).or_else(|_| mismatch($name, value))
            }
        }
    )*};
}

narrow_int_from_value!(i32 => "i32", u32 => "u32", u64 => "u64", usize => "usize");

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Float(x) => Ok(*x),
            Value::Int(i) => Ok(*i as f64),
            Value::String(s) => s.trim().parse().or_else(|_| mismatch("float", value)),
            _ => mismatch("float", value),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Bool(_) | Value::Int(_) | Value::Float(_) => Ok(value.to_string()),
            _ => mismatch("string", value),
        }
    }
}

impl FromValue for Document {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Document(d) => Ok(d.clone()),
            _ => mismatch("document", value),
        }
    }
}

impl FromValue for BTreeMap<String, Value> {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Map(m) => Ok(m.clone()),
            _ => mismatch("map", value),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::List(items) => items.iter().map(T::from_value).collect(),
            Value::Null => mismatch("list", value),
            single => Ok(vec![T::from_value(single)?]),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Content, Document};
    use crate::metadata::Metadata;

    #[test]
    fn string_parses_to_int() {
        assert_eq!(i64::from_value(&Value::from("42")), Ok(42));
        assert_eq!(u32::from_value(&Value::from(" 7 ")), Ok(7));
    }

    #[test]
    fn int_widens_to_float() {
        assert_eq!(f64::from_value(&Value::Int(3)), Ok(3.0));
    }

    #[test]
    fn out_of_range_float_does_not_narrow() {
        assert!(i64::from_value(&Value::Float(1e30)).is_err());
        assert!(i64::from_value(&Value::Float(-1e30)).is_err());
        assert!(i64::from_value(&Value::Float(9_223_372_036_854_775_808.0)).is_err());
        assert!(i64::from_value(&Value::Float(f64::INFINITY)).is_err());
        assert!(i64::from_value(&Value::Float(f64::NAN)).is_err());
        assert_eq!(i64::from_value(&Value::Float(-4096.0)), Ok(-4096));
    }

    #[test]
    fn fractional_float_does_not_narrow() {
        let err = i64::from_value(&Value::Float(1.5)).unwrap_err();
        assert_eq!(err.expected, "int");
        assert_eq!(err.found, "float");
    }

    #[test]
    fn negative_int_does_not_fit_u32() {
        assert!(u32::from_value(&Value::Int(-1)).is_err());
    }

    #[test]
    fn scalars_render_as_strings() {
        assert_eq!(String::from_value(&Value::Int(5)), Ok("5".to_string()));
        assert_eq!(String::from_value(&Value::Bool(true)), Ok("true".to_string()));
        assert!(String::from_value(&Value::List(vec![])).is_err());
    }

    #[test]
    fn bool_from_string() {
        assert_eq!(bool::from_value(&Value::from("false")), Ok(false));
        assert!(bool::from_value(&Value::from("nope")).is_err());
    }

    #[test]
    fn single_value_converts_to_one_element_vec() {
        assert_eq!(Vec::<i64>::from_value(&Value::Int(9)), Ok(vec![9]));
        assert_eq!(
            Vec::<String>::from_value(&Value::from(vec!["a", "b"])),
            Ok(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn null_converts_to_none() {
        assert_eq!(Option::<i64>::from_value(&Value::Null), Ok(None));
        assert_eq!(Option::<i64>::from_value(&Value::Int(1)), Ok(Some(1)));
    }

    #[test]
    fn documents_pass_through() {
        let doc = Document::new("a.md", Content::from("x"), Metadata::new());
        let value = Value::from(vec![doc.clone()]);
        let docs = Vec::<Document>::from_value(&value).unwrap();
        assert_eq!(docs, vec![doc]);
    }

    #[test]
    fn compare_mixes_ints_and_floats() {
        assert_eq!(Value::Int(2).compare(&Value::Float(2.5)), Ordering::Less);
        assert_eq!(Value::Float(3.0).compare(&Value::Int(3)), Ordering::Equal);
        assert_eq!(Value::from("b").compare(&Value::from("a")), Ordering::Greater);
        assert_eq!(Value::Null.compare(&Value::Int(0)), Ordering::Less);
    }

    #[test]
    fn toml_tables_become_maps() {
        let table: toml::Value = toml::from_str("a = 1\n[b]\nc = \"x\"").unwrap();
        let value = Value::from(table);
        let Value::Map(map) = value else {
            panic!("expected a map");
        };
        assert_eq!(map["a"], Value::Int(1));
        assert_eq!(map["b"], Value::Map(BTreeMap::from([("c".into(), "x".into())])));
    }

    #[test]
    fn yaml_mappings_become_maps() {
        let yaml: serde_yaml::Value = serde_yaml::from_str("title: Hi\ntags: [a, b]\n1: one\n").unwrap();
        let Value::Map(map) = Value::from(yaml) else {
            panic!("expected a map");
        };
        assert_eq!(map["title"], Value::from("Hi"));
        assert_eq!(map["tags"], Value::from(vec!["a", "b"]));
        assert_eq!(map["1"], Value::from("one"));
    }
}

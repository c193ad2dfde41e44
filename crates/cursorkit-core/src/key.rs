//! Keys, key ranges and key paths.
//!
//! Keys order the same way IndexedDB keys do: every number sorts before every
//! string, strings before binary keys, binary keys before arrays. Arrays
//! compare element by element.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Bound;

use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};

/// A record or index key.
#[derive(Debug, Clone)]
pub enum Key {
    /// Any non-NaN float, including the infinities
    Number(f64),
    String(String),
    Binary(Vec<u8>),
    Array(Vec<Key>),
}

impl Key {
    /// The smallest key there is.
    pub const MIN: Key = Key::Number(f64::NEG_INFINITY);

    /// Build a numeric key, rejecting NaN.
    pub fn number(n: f64) -> StoreResult<Key> {
        if n.is_nan() {
            return Err(StoreError::data("NaN is not a valid key"));
        }
        Ok(Key::Number(n))
    }

    /// Convert a JSON value into a key.
    ///
    /// Numbers, strings and arrays of those are valid keys. Objects, booleans
    /// and null are not.
    pub fn from_json(value: &Value) -> StoreResult<Key> {
        match value {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| StoreError::data(format!("number {} is not representable as a key", n)))
                .and_then(Key::number),
            Value::String(s) => Ok(Key::String(s.clone())),
            Value::Array(items) => items.iter().map(Key::from_json).collect::<StoreResult<Vec<_>>>().map(Key::Array),
            other => Err(StoreError::data(format!("{} is not a valid key", json_kind(other)))),
        }
    }

    /// JSON rendering of the key. Binary keys become arrays of byte values.
    pub fn to_json(&self) -> Value {
        match self {
            Key::Number(n) => {
                if n.fract() == 0.0 && n.abs() < (1u64 << 53) as f64 {
                    Value::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n).map(Value::Number).unwrap_or(Value::Null)
                }
            }
            Key::String(s) => Value::String(s.clone()),
            Key::Binary(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
            Key::Array(items) => Value::Array(items.iter().map(Key::to_json).collect()),
        }
    }

    /// Array nesting depth; scalar keys have depth 0.
    pub fn depth(&self) -> usize {
        match self {
            Key::Array(items) => 1 + items.iter().map(Key::depth).max().unwrap_or(0),
            _ => 0,
        }
    }

    /// Numeric value, if this is a number key.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Key::Number(n) => Some(*n),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Key::Number(_) => 0,
            Key::String(_) => 1,
            Key::Binary(_) => 2,
            Key::Array(_) => 3,
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Object(_) => "an object",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            // 0.0 and -0.0 are the same key
            (Key::Number(a), Key::Number(b)) => a.partial_cmp(b).unwrap_or_else(|| a.total_cmp(b)),
            (Key::String(a), Key::String(b)) => a.cmp(b),
            (Key::Binary(a), Key::Binary(b)) => a.cmp(b),
            (Key::Array(a), Key::Array(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Key {}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Number(n) => write!(f, "{}", n),
            Key::String(s) => write!(f, "{:?}", s),
            Key::Binary(bytes) => {
                write!(f, "0x")?;
                for b in bytes {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
            Key::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

macro_rules! number_key_from {
    ($($t:ty),*) => {
        $(impl From<$t> for Key {
            fn from(n: $t) -> Self { Key::Number(n as f64) }
        })*
    };
}

number_key_from!(i32, i64, u32, u64, usize);

impl From<&str> for Key {
    fn from(s: &str) -> Self { Key::String(s.to_string()) }
}

impl From<String> for Key {
    fn from(s: String) -> Self { Key::String(s) }
}

impl From<Vec<u8>> for Key {
    fn from(bytes: Vec<u8>) -> Self { Key::Binary(bytes) }
}

impl From<Vec<Key>> for Key {
    fn from(items: Vec<Key>) -> Self { Key::Array(items) }
}

// ---------------------------------------------------------------------------
// Key ranges
// ---------------------------------------------------------------------------

/// A contiguous interval of keys. Missing bounds are unbounded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeyRange {
    lower: Option<Key>,
    upper: Option<Key>,
    lower_open: bool,
    upper_open: bool,
}

impl KeyRange {
    /// Every key.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Exactly one key.
    pub fn only(key: Key) -> Self {
        Self {
            lower: Some(key.clone()),
            upper: Some(key),
            lower_open: false,
            upper_open: false,
        }
    }

    /// Keys above `key` (excluding it when `open`).
    pub fn lower_bound(key: Key, open: bool) -> Self {
        Self { lower: Some(key), lower_open: open, ..Self::default() }
    }

    /// Keys below `key` (excluding it when `open`).
    pub fn upper_bound(key: Key, open: bool) -> Self {
        Self { upper: Some(key), upper_open: open, ..Self::default() }
    }

    /// Keys between `lower` and `upper`.
    ///
    /// Fails with `DataError` when the range would be empty by construction.
    pub fn bound(lower: Key, upper: Key, lower_open: bool, upper_open: bool) -> StoreResult<Self> {
        match lower.cmp(&upper) {
            Ordering::Greater => {
                return Err(StoreError::data(format!("lower bound {} is above upper bound {}", lower, upper)));
            }
            Ordering::Equal if lower_open || upper_open => {
                return Err(StoreError::data(format!("open range around {} is empty", lower)));
            }
            _ => {}
        }
        Ok(Self { lower: Some(lower), upper: Some(upper), lower_open, upper_open })
    }

    pub fn lower(&self) -> Option<&Key> {
        self.lower.as_ref()
    }

    pub fn upper(&self) -> Option<&Key> {
        self.upper.as_ref()
    }

    pub fn lower_open(&self) -> bool {
        self.lower_open
    }

    pub fn upper_open(&self) -> bool {
        self.upper_open
    }

    /// Whether `key` lies inside the range.
    pub fn contains(&self, key: &Key) -> bool {
        self.satisfies_lower(key) && self.satisfies_upper(key)
    }

    pub(crate) fn satisfies_lower(&self, key: &Key) -> bool {
        match &self.lower {
            Some(lower) if self.lower_open => key > lower,
            Some(lower) => key >= lower,
            None => true,
        }
    }

    pub(crate) fn satisfies_upper(&self, key: &Key) -> bool {
        match &self.upper {
            Some(upper) if self.upper_open => key < upper,
            Some(upper) => key <= upper,
            None => true,
        }
    }

    pub(crate) fn lower_bound_ref(&self) -> Bound<&Key> {
        match &self.lower {
            Some(lower) if self.lower_open => Bound::Excluded(lower),
            Some(lower) => Bound::Included(lower),
            None => Bound::Unbounded,
        }
    }

    pub(crate) fn upper_bound_ref(&self) -> Bound<&Key> {
        match &self.upper {
            Some(upper) if self.upper_open => Bound::Excluded(upper),
            Some(upper) => Bound::Included(upper),
            None => Bound::Unbounded,
        }
    }
}

impl From<Key> for KeyRange {
    fn from(key: Key) -> Self {
        KeyRange::only(key)
    }
}

// ---------------------------------------------------------------------------
// Key paths
// ---------------------------------------------------------------------------

/// Evaluate a dotted key path (`"author.name"`) against a record.
///
/// The empty path selects the record itself.
pub fn evaluate_key_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.').try_fold(value, |current, part| current.as_object()?.get(part))
}

/// Write `key` into `value` at `path`, creating intermediate objects.
///
/// Used to stamp generated keys into records of auto-increment stores.
pub fn inject_key(value: &mut Value, path: &str, key: &Key) -> StoreResult<()> {
    let mut parts: Vec<&str> = path.split('.').collect();
    let last = match parts.pop() {
        Some(last) if !last.is_empty() => last,
        _ => return Err(StoreError::data("cannot inject a key at an empty key path")),
    };

    let mut current = value;
    for part in parts {
        let object = current
            .as_object_mut()
            .ok_or_else(|| StoreError::data(format!("key path '{}' crosses a non-object value", path)))?;
        current = object.entry(part).or_insert_with(|| Value::Object(Map::new()));
    }

    let object = current
        .as_object_mut()
        .ok_or_else(|| StoreError::data(format!("key path '{}' crosses a non-object value", path)))?;
    object.insert(last.to_string(), key.to_json());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cross_type_ordering() {
        let mut keys = vec![
            Key::Array(vec![Key::from(1)]),
            Key::from(vec![0u8, 1]),
            Key::from("a"),
            Key::from(10),
            Key::MIN,
        ];
        keys.sort();
        assert_eq!(keys[0], Key::MIN);
        assert_eq!(keys[1], Key::from(10));
        assert_eq!(keys[2], Key::from("a"));
        assert_eq!(keys[3], Key::Binary(vec![0, 1]));
        assert_eq!(keys[4], Key::Array(vec![Key::from(1)]));
    }

    #[test]
    fn test_zero_signs_are_equal() {
        assert_eq!(Key::Number(0.0), Key::Number(-0.0));
        assert!(Key::number(f64::NAN).is_err());
    }

    #[test]
    fn test_array_ordering_is_lexicographic() {
        let short = Key::from(vec![Key::from(1)]);
        let long = Key::from(vec![Key::from(1), Key::from(0)]);
        let bigger = Key::from(vec![Key::from(2)]);
        assert!(short < long);
        assert!(long < bigger);
    }

    #[test]
    fn test_json_conversion() {
        assert_eq!(Key::from_json(&json!(3)).unwrap(), Key::from(3));
        assert_eq!(Key::from_json(&json!("x")).unwrap(), Key::from("x"));
        assert_eq!(
            Key::from_json(&json!([1, "a"])).unwrap(),
            Key::Array(vec![Key::from(1), Key::from("a")])
        );
        assert!(Key::from_json(&json!({"a": 1})).is_err());
        assert!(Key::from_json(&json!(null)).is_err());
        assert_eq!(Key::from(7).to_json(), json!(7));
        assert_eq!(Key::Number(1.5).to_json(), json!(1.5));
    }

    #[test]
    fn test_range_contains() {
        let range = KeyRange::bound(Key::from(2), Key::from(5), true, false).unwrap();
        assert!(!range.contains(&Key::from(2)));
        assert!(range.contains(&Key::from(3)));
        assert!(range.contains(&Key::from(5)));
        assert!(!range.contains(&Key::from(6)));

        assert!(KeyRange::only(Key::from("k")).contains(&Key::from("k")));
        assert!(KeyRange::unbounded().contains(&Key::MIN));
        assert!(KeyRange::upper_bound(Key::from(1), true).contains(&Key::from(0)));
        assert!(!KeyRange::lower_bound(Key::from(1), true).contains(&Key::from(1)));
    }

    #[test]
    fn test_invalid_ranges() {
        assert!(KeyRange::bound(Key::from(5), Key::from(2), false, false).is_err());
        assert!(KeyRange::bound(Key::from(2), Key::from(2), true, false).is_err());
        assert!(KeyRange::bound(Key::from(2), Key::from(2), false, false).is_ok());
    }

    #[test]
    fn test_key_path_roundtrip() {
        let mut record = json!({"title": "Dune", "meta": {"isbn": "123"}});
        assert_eq!(evaluate_key_path(&record, "meta.isbn"), Some(&json!("123")));
        assert_eq!(evaluate_key_path(&record, "missing.path"), None);
        assert_eq!(evaluate_key_path(&record, ""), Some(&record.clone()));

        inject_key(&mut record, "ids.local", &Key::from(9)).unwrap();
        assert_eq!(evaluate_key_path(&record, "ids.local"), Some(&json!(9)));

        let mut scalar = json!(4);
        assert!(inject_key(&mut scalar, "id", &Key::from(1)).is_err());
    }
}

//! Runtime values.
//!
//! A `Value` sits in row cells, predicate literals and index keys alike,
//! so its order has to be total and agree with `Eq` and `Hash`. Null is
//! the smallest value. Values of one type compare naturally, with NaN
//! above every other float. Values of different types compare by the
//! rank of their type.

use crate::types::DataType;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};

#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    String(String),
    /// Milliseconds since the Unix epoch.
    DateTime(i64),
    Bytes(Vec<u8>),
}

impl Value {
    /// `None` for null.
    pub fn data_type(&self) -> Option<DataType> {
        Some(match self {
            Value::Null => return None,
            Value::Boolean(_) => DataType::Boolean,
            Value::Int32(_) => DataType::Int32,
            Value::Int64(_) => DataType::Int64,
            Value::Float64(_) => DataType::Float64,
            Value::String(_) => DataType::String,
            Value::DateTime(_) => DataType::DateTime,
            Value::Bytes(_) => DataType::Bytes,
        })
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Either integer type, widened.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int32(v) => Some(i64::from(v)),
            Value::Int64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        if let Value::String(s) = self {
            Some(s)
        } else {
            None
        }
    }

    /// Numeric view used by the aggregates. Datetimes count as numbers.
    pub fn to_f64(&self) -> Option<f64> {
        match *self {
            Value::Float64(v) => Some(v),
            Value::DateTime(v) => Some(v as f64),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    /// Filler for a NOT NULL column a row leaves out. Bytes columns are
    /// always nullable and get null.
    pub fn default_for_type(data_type: DataType) -> Self {
        match data_type {
            DataType::Boolean => Value::Boolean(false),
            DataType::Int32 => Value::Int32(0),
            DataType::Int64 => Value::Int64(0),
            DataType::Float64 => Value::Float64(0.0),
            DataType::String => Value::String(String::new()),
            DataType::DateTime => Value::DateTime(0),
            DataType::Bytes => Value::Null,
        }
    }

    fn rank(&self) -> Option<DataType> {
        self.data_type()
    }
}

/// NaN equals NaN and sits above every other float.
fn total_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b)
        .unwrap_or_else(|| a.is_nan().cmp(&b.is_nan()))
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        use Value::*;
        match (self, other) {
            (Boolean(a), Boolean(b)) => a.cmp(b),
            (Int32(a), Int32(b)) => a.cmp(b),
            (Int64(a), Int64(b)) | (DateTime(a), DateTime(b)) => a.cmp(b),
            (Float64(a), Float64(b)) => total_f64(*a, *b),
            (String(a), String(b)) => a.cmp(b),
            (Bytes(a), Bytes(b)) => a.cmp(b),
            // Null has no type and so ranks below everything.
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(v) => v.hash(state),
            Value::Int32(v) => v.hash(state),
            Value::Int64(v) | Value::DateTime(v) => v.hash(state),
            // 0.0 == -0.0 and NaN == NaN, so those must hash alike.
            Value::Float64(v) if v.is_nan() => u64::MAX.hash(state),
            Value::Float64(v) if *v == 0.0 => 0u64.hash(state),
            Value::Float64(v) => v.to_bits().hash(state),
            Value::String(v) => v.hash(state),
            Value::Bytes(v) => v.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(v) => v.fmt(f),
            Value::Int32(v) => v.fmt(f),
            Value::Int64(v) | Value::DateTime(v) => v.fmt(f),
            Value::Float64(v) => v.fmt(f),
            Value::String(v) => f.write_str(v),
            Value::Bytes(v) => {
                f.write_str("0x")?;
                v.iter().try_for_each(|b| write!(f, "{:02x}", b))
            }
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    bool => Boolean,
    i32 => Int32,
    i64 => Int64,
    f64 => Float64,
    String => String,
    Vec<u8> => Bytes,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_integer_views() {
        assert_eq!(Value::Int32(-3).as_i64(), Some(-3));
        assert_eq!(Value::Int64(100).as_i64(), Some(100));
        assert_eq!(Value::DateTime(5).as_i64(), None);
        assert_eq!(Value::DateTime(5).to_f64(), Some(5.0));
        assert_eq!(Value::Int32(3).to_f64(), Some(3.0));
        assert_eq!(Value::String("x".into()).to_f64(), None);
        assert_eq!(Value::from("hello").as_str(), Some("hello"));
    }

    #[test]
    fn test_null_is_smallest() {
        assert_eq!(Value::Null.data_type(), None);
        assert!(Value::Null < Value::Boolean(false));
        assert!(Value::Null < Value::Int64(i64::MIN));
        assert_eq!(Value::Null, Value::Null);
    }

    #[test]
    fn test_equality_agrees_with_ordering() {
        assert_ne!(Value::Int32(42), Value::Int64(42));
        assert_ne!(Value::Int64(7), Value::DateTime(7));
        assert_eq!(Value::Float64(f64::NAN), Value::Float64(f64::NAN));
        assert_eq!(Value::Float64(0.0), Value::Float64(-0.0));
    }

    #[test]
    fn test_ordering() {
        assert!(Value::Int32(1) < Value::Int32(2));
        assert!(Value::from("a") < Value::from("b"));
        assert!(Value::Float64(1e300) < Value::Float64(f64::NAN));
        assert!(Value::Float64(f64::NEG_INFINITY) < Value::Float64(-1.0));
        assert!(Value::Int64(-5) < Value::String(String::new()));
    }

    #[test]
    fn test_hash_follows_equality() {
        use core::hash::BuildHasher;
        let state = hashbrown::hash_map::DefaultHashBuilder::default();
        let h = |v: &Value| state.hash_one(v);
        assert_eq!(h(&Value::Float64(0.0)), h(&Value::Float64(-0.0)));
        assert_eq!(h(&Value::Float64(f64::NAN)), h(&Value::Float64(-f64::NAN)));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Int64(100).to_string(), "100");
        assert_eq!(Value::from("abc").to_string(), "abc");
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::Bytes(vec![0xab, 0x01]).to_string(), "0xab01");
    }

    #[test]
    fn test_from_option() {
        assert_eq!(Value::from(Some(100i64)), Value::Int64(100));
        assert!(Value::from(None::<i32>).is_null());
    }

    #[test]
    fn test_default_for_type() {
        assert_eq!(Value::default_for_type(DataType::Boolean), Value::Boolean(false));
        assert_eq!(Value::default_for_type(DataType::Int32), Value::Int32(0));
        assert_eq!(Value::default_for_type(DataType::Bytes), Value::Null);
    }
}

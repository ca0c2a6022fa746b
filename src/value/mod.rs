//! # Value Type System
//!
//! Typed constants carried by [`Term::Constant`](crate::ast::Term::Constant).
//!
//! ## Design Decisions
//!
//! - **Datatype tag**: every value knows its [`DataType`]; the tag drives
//!   arithmetic promotion and which values are order-comparable.
//! - **Numeric cross-type equality**: `5` (integer), `5.0` (double), `5.0f`
//!   (float) and `5.0` (decimal) are the same value for unification, relation
//!   membership and hashing. `+0.0` equals `-0.0` for every real type.
//! - **Total order for storage**: [`Ord`] is total so relations can be sorted
//!   deterministically. Builtins that need a *semantic* comparison use
//!   [`Value::compare`], which refuses values of incompatible datatypes.
//!
//! ## Usage
//!
//! ```rust
//! use strata::value::Value;
//!
//! assert_eq!(Value::Integer(5), Value::Double(5.0));
//! assert_eq!(Value::Double(0.0), Value::Double(-0.0));
//! assert_ne!(Value::from("5"), Value::Integer(5));
//! ```

use chrono::{NaiveDate, NaiveDateTime};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Datatype tag of a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataType {
    Boolean,
    Integer,
    Decimal,
    Float,
    Double,
    String,
    Date,
    DateTime,
}

impl DataType {
    /// True for the four numeric datatypes
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            DataType::Integer | DataType::Decimal | DataType::Float | DataType::Double
        )
    }

    /// Promotion rank used by arithmetic: integer < decimal < float < double
    pub(crate) fn numeric_rank(self) -> Option<u8> {
        match self {
            DataType::Integer => Some(0),
            DataType::Decimal => Some(1),
            DataType::Float => Some(2),
            DataType::Double => Some(3),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Boolean => "boolean",
            DataType::Integer => "integer",
            DataType::Decimal => "decimal",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::String => "string",
            DataType::Date => "date",
            DataType::DateTime => "datetime",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed constant
///
/// Decimals are held as binary doubles; the tag is kept so that arithmetic
/// between two decimals produces a decimal.
#[derive(Debug, Clone)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    Float(f32),
    Double(f64),
    String(Arc<str>),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

/// Numeric view of a value used for cross-type comparison
#[derive(Debug, Clone, Copy)]
pub(crate) enum Numeric {
    Int(i64),
    Real(f64),
}

impl Numeric {
    pub(crate) fn as_f64(self) -> f64 {
        match self {
            Numeric::Int(i) => i as f64,
            Numeric::Real(r) => r,
        }
    }
}

/// Exact integer value of an integral, in-range real
/// 2^63 is exactly representable; i64::MAX is not
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

fn real_as_int(r: f64) -> Option<i64> {
    if r.is_finite() && r.fract() == 0.0 && r >= -I64_BOUND && r < I64_BOUND {
        Some(r as i64)
    } else {
        None
    }
}

fn numeric_cmp(a: Numeric, b: Numeric) -> Ordering {
    match (a, b) {
        (Numeric::Int(x), Numeric::Int(y)) => x.cmp(&y),
        (Numeric::Int(x), Numeric::Real(y)) => int_real_cmp(x, y),
        (Numeric::Real(x), Numeric::Int(y)) => int_real_cmp(y, x).reverse(),
        (Numeric::Real(x), Numeric::Real(y)) => match (x.is_nan(), y.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        },
    }
}

fn int_real_cmp(x: i64, y: f64) -> Ordering {
    if y.is_nan() {
        return Ordering::Less;
    }
    if let Some(i) = real_as_int(y) {
        return x.cmp(&i);
    }
    if y >= I64_BOUND {
        return Ordering::Less;
    }
    if y < -I64_BOUND {
        return Ordering::Greater;
    }
    // Non-integral and inside the i64 range: the floor is exact
    if x <= y.floor() as i64 {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

impl Value {
    /// Create a string value
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Arc::from(s.as_ref()))
    }

    /// The datatype tag of this value
    pub fn datatype(&self) -> DataType {
        match self {
            Value::Boolean(_) => DataType::Boolean,
            Value::Integer(_) => DataType::Integer,
            Value::Decimal(_) => DataType::Decimal,
            Value::Float(_) => DataType::Float,
            Value::Double(_) => DataType::Double,
            Value::String(_) => DataType::String,
            Value::Date(_) => DataType::Date,
            Value::DateTime(_) => DataType::DateTime,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.datatype().is_numeric()
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub(crate) fn numeric(&self) -> Option<Numeric> {
        match self {
            Value::Integer(i) => Some(Numeric::Int(*i)),
            Value::Decimal(d) | Value::Double(d) => Some(Numeric::Real(*d)),
            Value::Float(f) => Some(Numeric::Real(f64::from(*f))),
            _ => None,
        }
    }

    /// Semantic comparison between values of compatible datatypes.
    ///
    /// Numeric values compare across their datatypes; every other datatype
    /// only compares with itself. Returns `None` for incompatible values,
    /// which comparison builtins treat as "not satisfied".
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        if let (Some(a), Some(b)) = (self.numeric(), other.numeric()) {
            if a.as_f64().is_nan() || b.as_f64().is_nan() {
                return None;
            }
            return Some(numeric_cmp(a, b));
        }
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Rank of the datatype family in the storage order
    fn family_rank(&self) -> u8 {
        match self {
            Value::Boolean(_) => 0,
            Value::Integer(_) | Value::Decimal(_) | Value::Float(_) | Value::Double(_) => 1,
            Value::Date(_) => 2,
            Value::DateTime(_) => 3,
            Value::String(_) => 4,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

// Numeric values hash through their canonical form so that equal values of
// different datatypes land in the same bucket
impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.family_rank().hash(state);
        match self {
            Value::Boolean(b) => b.hash(state),
            Value::String(s) => s.hash(state),
            Value::Date(d) => d.hash(state),
            Value::DateTime(dt) => dt.hash(state),
            numeric => match numeric.numeric() {
                Some(Numeric::Int(i)) => {
                    0u8.hash(state);
                    i.hash(state);
                }
                Some(Numeric::Real(r)) => match real_as_int(r) {
                    Some(i) => {
                        0u8.hash(state);
                        i.hash(state);
                    }
                    None if r.is_nan() => 2u8.hash(state),
                    None => {
                        1u8.hash(state);
                        r.to_bits().hash(state);
                    }
                },
                None => {}
            },
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.family_rank().cmp(&other.family_rank()) {
            Ordering::Equal => {}
            unequal => return unequal,
        }
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            (a, b) => match (a.numeric(), b.numeric()) {
                (Some(x), Some(y)) => numeric_cmp(x, y),
                _ => Ordering::Equal,
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Decimal(d) => write!(f, "{d:?}d"),
            Value::Float(v) => write!(f, "{v:?}f"),
            Value::Double(v) => write!(f, "{v:?}"),
            Value::String(s) => write!(f, "'{s}'"),
            Value::Date(d) => write!(f, "{d}"),
            Value::DateTime(dt) => write!(f, "{dt}"),
        }
    }
}

// Convenience conversions
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

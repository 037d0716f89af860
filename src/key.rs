//! Key expressions over data rows.
//!
//! A [`KeyExpr`] names a column plus an optional transform and evaluates to a
//! [`KeyValue`]. The same machinery drives dedupe keys, the "latest" recency
//! columns and output sort columns. Null components are legal and compare
//! equal to each other, so rows missing a key column still group together.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::schema::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    None,
    Lowercase,
    Datetime,
}

/// Column reference with an optional value transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyExpr {
    column: String,
    transform: Transform,
}

impl KeyExpr {
    pub fn column(name: impl Into<String>) -> Self {
        Self {
            column: name.into(),
            transform: Transform::None,
        }
    }

    /// Case-insensitive string identity (user names vary in casing between
    /// scrapes).
    pub fn lowercase(name: impl Into<String>) -> Self {
        Self {
            column: name.into(),
            transform: Transform::Lowercase,
        }
    }

    /// Parse the column as a UTC timestamp.
    pub fn datetime(name: impl Into<String>) -> Self {
        Self {
            column: name.into(),
            transform: Transform::Datetime,
        }
    }

    pub fn name(&self) -> &str {
        &self.column
    }

    pub fn eval(&self, row: &Record) -> KeyValue {
        let value = row.get(&self.column).unwrap_or(&Value::Null);
        match self.transform {
            Transform::None => KeyValue::from_json(value),
            Transform::Lowercase => value
                .as_str()
                .map_or(KeyValue::Null, |s| KeyValue::Str(s.to_lowercase())),
            Transform::Datetime => value
                .as_str()
                .and_then(parse_datetime)
                .map_or(KeyValue::Null, KeyValue::Time),
        }
    }
}

/// Evaluate a composite key over a row.
pub fn eval_key(exprs: &[KeyExpr], row: &Record) -> Vec<KeyValue> {
    exprs.iter().map(|expr| expr.eval(row)).collect()
}

/// Scalar key component.
///
/// Values of different kinds order by kind; numbers compare numerically
/// across the integer/float split. Containers never form key identities and
/// evaluate to `Null`.
#[derive(Debug, Clone)]
pub enum KeyValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Time(DateTime<Utc>),
}

impl KeyValue {
    fn from_json(value: &Value) -> Self {
        match value {
            Value::Null | Value::Array(_) | Value::Object(_) => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => n
                .as_i64()
                .map_or_else(|| n.as_f64().map_or(Self::Null, Self::Float), Self::Int),
            Value::String(s) => Self::Str(s.clone()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    fn kind(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) | Self::Float(_) => 2,
            Self::Str(_) => 3,
            Self::Time(_) => 4,
        }
    }
}

impl Ord for KeyValue {
    #[expect(
        clippy::cast_precision_loss,
        reason = "cross-kind numeric keys tolerate f64 rounding"
    )]
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Int(a), Self::Float(b)) => (*a as f64).total_cmp(b),
            (Self::Float(a), Self::Int(b)) => a.total_cmp(&(*b as f64)),
            (Self::Str(a), Self::Str(b)) => a.cmp(b),
            (Self::Time(a), Self::Time(b)) => a.cmp(b),
            _ => self.kind().cmp(&other.kind()),
        }
    }
}

impl PartialOrd for KeyValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for KeyValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for KeyValue {}

impl Hash for KeyValue {
    #[expect(
        clippy::cast_precision_loss,
        reason = "numbers hash through their f64 bits so Int and Float agree with Eq"
    )]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        match self {
            Self::Null => {}
            Self::Bool(b) => b.hash(state),
            Self::Int(i) => (*i as f64).to_bits().hash(state),
            Self::Float(f) => f.to_bits().hash(state),
            Self::Str(s) => s.hash(state),
            Self::Time(t) => t.hash(state),
        }
    }
}

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a scrape timestamp, tolerating the formats the feeds actually carry:
/// RFC 3339 with offset, or a bare datetime assumed to be UTC.
pub(crate) fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

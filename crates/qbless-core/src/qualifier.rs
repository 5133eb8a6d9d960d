//! Qualifier trees
//!
//! A qualifier is one node of a boolean query filter: a compound (`And`, `Or`,
//! `Not`), a comparison leaf (`KeyValue`, `KeyComparison`), a set membership
//! test (`InSet`), or an application-defined `Custom` node. Qualifiers are
//! built by the caller per request and are never mutated by blessing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Comparison operator of a qualifier leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Like,
    CaseInsensitiveLike,
}

impl Selector {
    /// `<` or `<=`
    pub fn is_less(self) -> bool {
        matches!(self, Selector::LessThan | Selector::LessThanOrEqual)
    }

    /// `>` or `>=`
    pub fn is_greater(self) -> bool {
        matches!(self, Selector::GreaterThan | Selector::GreaterThanOrEqual)
    }

    /// `=`, `like` or `caseInsensitiveLike`
    pub fn is_equality_like(self) -> bool {
        matches!(
            self,
            Selector::Equal | Selector::Like | Selector::CaseInsensitiveLike
        )
    }

    pub fn is_not_equal(self) -> bool {
        self == Selector::NotEqual
    }

    /// Operator symbol as it appears in filter expressions
    pub fn symbol(self) -> &'static str {
        match self {
            Selector::Equal => "=",
            Selector::NotEqual => "<>",
            Selector::LessThan => "<",
            Selector::LessThanOrEqual => "<=",
            Selector::GreaterThan => ">",
            Selector::GreaterThanOrEqual => ">=",
            Selector::Like => "like",
            Selector::CaseInsensitiveLike => "caseInsensitiveLike",
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Right-hand side of a qualifier leaf
///
/// `Null` is an explicit comparison against null (`key = nil`). `KeyPath` is
/// the other key of a key-to-key comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    KeyPath(String),
}

impl Value {
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::KeyPath(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "'{}'", s),
            Value::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Value::KeyPath(k) => f.write_str(k),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Value::Timestamp(ts)
    }
}

/// Application-defined qualifier node
///
/// Custom nodes are blessed by the strategy registered for their `kind()`.
/// The strategy recovers the concrete type through `as_any()`.
pub trait CustomQualifier: fmt::Debug + Send + Sync {
    /// Stable name used as the dispatch key
    fn kind(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;
}

/// Dispatch key of a qualifier node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QualifierKind {
    And,
    Or,
    Not,
    KeyValue,
    KeyComparison,
    InSet,
    Custom(&'static str),
}

impl fmt::Display for QualifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualifierKind::And => f.write_str("and"),
            QualifierKind::Or => f.write_str("or"),
            QualifierKind::Not => f.write_str("not"),
            QualifierKind::KeyValue => f.write_str("key_value"),
            QualifierKind::KeyComparison => f.write_str("key_comparison"),
            QualifierKind::InSet => f.write_str("in_set"),
            QualifierKind::Custom(name) => write!(f, "custom:{}", name),
        }
    }
}

/// A node of a boolean query filter
#[derive(Debug, Clone)]
pub enum Qualifier {
    And(Vec<Qualifier>),
    Or(Vec<Qualifier>),
    Not(Box<Qualifier>),
    KeyValue {
        key: String,
        selector: Selector,
        value: Value,
    },
    KeyComparison {
        key: String,
        selector: Selector,
        other_key: String,
    },
    InSet {
        key: String,
        values: Vec<Value>,
    },
    Custom(Arc<dyn CustomQualifier>),
}

impl Qualifier {
    pub fn key_value(key: impl Into<String>, selector: Selector, value: impl Into<Value>) -> Self {
        Qualifier::KeyValue {
            key: key.into(),
            selector,
            value: value.into(),
        }
    }

    pub fn key_comparison(
        key: impl Into<String>,
        selector: Selector,
        other_key: impl Into<String>,
    ) -> Self {
        Qualifier::KeyComparison {
            key: key.into(),
            selector,
            other_key: other_key.into(),
        }
    }

    pub fn in_set<V: Into<Value>>(key: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Qualifier::InSet {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn and(children: impl IntoIterator<Item = Qualifier>) -> Self {
        Qualifier::And(children.into_iter().collect())
    }

    pub fn or(children: impl IntoIterator<Item = Qualifier>) -> Self {
        Qualifier::Or(children.into_iter().collect())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(child: Qualifier) -> Self {
        Qualifier::Not(Box::new(child))
    }

    pub fn custom(node: impl CustomQualifier + 'static) -> Self {
        Qualifier::Custom(Arc::new(node))
    }

    /// Dispatch key for the support registry
    pub fn kind(&self) -> QualifierKind {
        match self {
            Qualifier::And(_) => QualifierKind::And,
            Qualifier::Or(_) => QualifierKind::Or,
            Qualifier::Not(_) => QualifierKind::Not,
            Qualifier::KeyValue { .. } => QualifierKind::KeyValue,
            Qualifier::KeyComparison { .. } => QualifierKind::KeyComparison,
            Qualifier::InSet { .. } => QualifierKind::InSet,
            Qualifier::Custom(node) => QualifierKind::Custom(node.kind()),
        }
    }

    /// Concrete custom node, if this is a `Custom` qualifier of type `T`
    pub fn downcast_custom<T: 'static>(&self) -> Option<&T> {
        match self {
            Qualifier::Custom(node) => node.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, children: &[Qualifier], op: &str) -> fmt::Result {
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            write!(f, " {} ", op)?;
        }
        write!(f, "({})", child)?;
    }
    Ok(())
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Qualifier::And(children) => write_joined(f, children, "and"),
            Qualifier::Or(children) => write_joined(f, children, "or"),
            Qualifier::Not(child) => write!(f, "not ({})", child),
            Qualifier::KeyValue {
                key,
                selector,
                value,
            } => write!(f, "{} {} {}", key, selector, value),
            Qualifier::KeyComparison {
                key,
                selector,
                other_key,
            } => write!(f, "{} {} {}", key, selector, other_key),
            Qualifier::InSet { key, values } => {
                write!(f, "{} in (", key)?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                f.write_str(")")
            }
            Qualifier::Custom(node) => write!(f, "{:?}", node),
        }
    }
}

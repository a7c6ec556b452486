//! Object predicates and ordering, in the store's search wire format.
//!
//! The same predicate is evaluated remotely (serialized into a search body)
//! and locally by [`Predicate::matches`] for the in-memory store. Local
//! evaluation follows the store's observable behaviour closely enough for
//! tests; it is not a reimplementation of its text analysis.

use std::borrow::Cow;
use std::cmp::Ordering;

use serde::Serialize;
use serde_json::Value;

use crate::Record;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Predicate {
    Eq { field: String, value: Value },
    StartsWith { field: String, value: String },
    /// Any whitespace-separated term of `value` occurs in the property.
    ContainsAnyTerm { field: String, value: String },
    /// `value: true` matches records where the property is null or absent.
    IsNull { field: String, value: bool },
    Not { value: Box<Predicate> },
    And { value: Vec<Predicate> },
    Or { value: Vec<Predicate> },
}

impl Predicate {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn starts_with(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::StartsWith {
            field: field.into(),
            value: prefix.into(),
        }
    }

    pub fn contains_any_term(field: impl Into<String>, terms: impl Into<String>) -> Self {
        Self::ContainsAnyTerm {
            field: field.into(),
            value: terms.into(),
        }
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Self::IsNull {
            field: field.into(),
            value: true,
        }
    }

    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not {
            value: Box::new(self),
        }
    }

    /// Equality against any of `values`.
    pub fn any_of<I, V>(field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Or {
            value: values.into_iter().map(|v| Self::eq(field, v)).collect(),
        }
    }

    /// Conjunction, flattening nested `And`s. A single operand is returned
    /// as is; no operand yields `None`.
    pub fn all<I>(predicates: I) -> Option<Self>
    where
        I: IntoIterator<Item = Self>,
    {
        let mut flat = Vec::new();
        for p in predicates {
            match p {
                Self::And { value } => flat.extend(value),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => None,
            1 => flat.pop(),
            _ => Some(Self::And { value: flat }),
        }
    }

    /// Evaluate against a record.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::Eq { field, value } => record
                .get(field)
                .is_some_and(|actual| scalar_eq(actual, value)),
            Self::StartsWith { field, value } => text_of(record, field)
                .is_some_and(|text| text.to_lowercase().starts_with(&value.to_lowercase())),
            Self::ContainsAnyTerm { field, value } => text_of(record, field).is_some_and(|text| {
                let text = text.to_lowercase();
                value
                    .split_whitespace()
                    .any(|term| text.contains(&term.to_lowercase()))
            }),
            Self::IsNull { field, value } => {
                record.get(field).is_none_or(Value::is_null) == *value
            }
            Self::Not { value } => !value.matches(record),
            Self::And { value } => value.iter().all(|p| p.matches(record)),
            Self::Or { value } => value.iter().any(|p| p.matches(record)),
        }
    }
}

fn scalar_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s)),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        _ => None,
    }
}

fn text_of<'a>(record: &'a Record, field: &str) -> Option<Cow<'a, str>> {
    record.get(field).and_then(scalar_text)
}

/// Scalars compare by their text form, so `3` equals `"3"`.
fn scalar_eq(actual: &Value, expected: &Value) -> bool {
    match (scalar_text(actual), scalar_text(expected)) {
        (Some(a), Some(b)) => a == b,
        _ => actual == expected,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }

    /// Ordering of two records. Missing values sort last in either direction.
    #[must_use]
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        let left = a.get(&self.field).filter(|v| !v.is_null());
        let right = b.get(&self.field).filter(|v| !v.is_null());
        match (left, right) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(l), Some(r)) => {
                let ord = compare_values(l, r);
                match self.direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            }
        }
    }
}

fn compare_values(l: &Value, r: &Value) -> Ordering {
    if let (Some(a), Some(b)) = (l.as_f64(), r.as_f64()) {
        return a.partial_cmp(&b).unwrap_or(Ordering::Equal);
    }
    match (scalar_text(l), scalar_text(r)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => Ordering::Equal,
    }
}

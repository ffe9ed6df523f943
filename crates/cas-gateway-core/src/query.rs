//! Structured search predicates over object metadata.
//!
//! A [`Query`] is a predicate tree built either directly in Rust or parsed
//! from its JSON text form with [`Query::parse`]. The text form is
//! externally tagged:
//!
//! ```json
//! {"and": [
//!     {"eq": {"type": "doc"}},
//!     {"range": {"year": {"gte": 2000, "lt": 2010}}},
//!     {"not": {"contains": {"title": "draft"}}}
//! ]}
//! ```
//!
//! Malformed input is always an error. Empty field maps, empty or repeated
//! field names, empty `in` lists, empty `and`/`or` clause lists, and ranges
//! without a bound are rejected during deserialization, so a parsed query
//! never degenerates into an accidental match-all. The only match-all query
//! is the explicit `"all"`.
//!
//! The field constructors ([`Query::eq`] and friends) enforce the same rules
//! and return `None` for an empty field name, so every constructed query
//! survives a trip through its text form.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::{Error as _, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value};
use thiserror::Error;

use crate::models::ObjectMetadata;

/// Textual query could not be parsed.
#[derive(Debug, Error)]
#[error("malformed query: {0}")]
pub struct ParseError(#[from] serde_json::Error);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    /// Matches every object.
    All,
    /// Every listed field equals its value.
    Eq(FieldMap<Value>),
    /// Every listed field is absent or differs from its value.
    Ne(FieldMap<Value>),
    /// Every listed field equals one of its values.
    In(FieldMap<ValueList>),
    /// Every listed field contains its text, case-insensitively.
    Contains(FieldMap<String>),
    /// Every listed field lies within its range.
    Range(FieldMap<Range>),
    And(Clauses),
    Or(Clauses),
    Not(Box<Query>),
}

impl Query {
    /// Parse the JSON text form.
    pub fn parse(text: &str) -> Result<Query, ParseError> {
        Ok(serde_json::from_str(text)?)
    }

    /// `None` when `field` is empty.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Option<Query> {
        FieldMap::single(field, value.into()).map(Query::Eq)
    }

    /// `None` when `field` is empty.
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Option<Query> {
        FieldMap::single(field, value.into()).map(Query::Ne)
    }

    /// `None` when `field` or `values` is empty.
    pub fn one_of<F, V, I>(field: F, values: I) -> Option<Query>
    where
        F: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return None;
        }
        FieldMap::single(field, ValueList(values)).map(Query::In)
    }

    /// `None` when `field` is empty.
    pub fn contains(field: impl Into<String>, text: impl Into<String>) -> Option<Query> {
        FieldMap::single(field, text.into()).map(Query::Contains)
    }

    /// `None` when `field` is empty.
    pub fn range(field: impl Into<String>, range: Range) -> Option<Query> {
        FieldMap::single(field, range).map(Query::Range)
    }

    /// Conjunction, flattening when `self` is already an `And`.
    pub fn and(self, other: Query) -> Query {
        match self {
            Query::And(mut clauses) => {
                clauses.0.push(other);
                Query::And(clauses)
            }
            first => Query::And(Clauses(vec![first, other])),
        }
    }

    /// Disjunction, flattening when `self` is already an `Or`.
    pub fn or(self, other: Query) -> Query {
        match self {
            Query::Or(mut clauses) => {
                clauses.0.push(other);
                Query::Or(clauses)
            }
            first => Query::Or(Clauses(vec![first, other])),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Query {
        Query::Not(Box::new(self))
    }

    /// Evaluate the predicate against one object's metadata.
    pub fn matches(&self, metadata: &ObjectMetadata) -> bool {
        match self {
            Query::All => true,
            Query::Eq(fields) => fields.iter().all(|(name, expected)| {
                metadata
                    .attribute(name)
                    .is_some_and(|actual| attribute_equals(&actual, expected))
            }),
            Query::Ne(fields) => fields.iter().all(|(name, expected)| {
                !metadata
                    .attribute(name)
                    .is_some_and(|actual| attribute_equals(&actual, expected))
            }),
            Query::In(fields) => fields.iter().all(|(name, candidates)| {
                metadata.attribute(name).is_some_and(|actual| {
                    candidates.0.iter().any(|c| attribute_equals(&actual, c))
                })
            }),
            Query::Contains(fields) => fields.iter().all(|(name, needle)| {
                let needle = needle.to_lowercase();
                metadata.attribute(name).is_some_and(|actual| {
                    any_element(&actual, |v| {
                        v.as_str()
                            .is_some_and(|s| s.to_lowercase().contains(&needle))
                    })
                })
            }),
            Query::Range(fields) => fields.iter().all(|(name, range)| {
                metadata
                    .attribute(name)
                    .is_some_and(|actual| any_element(&actual, |v| range.contains(v)))
            }),
            Query::And(clauses) => clauses.0.iter().all(|q| q.matches(metadata)),
            Query::Or(clauses) => clauses.0.iter().any(|q| q.matches(metadata)),
            Query::Not(inner) => !inner.matches(metadata),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

/// Non-empty map from field name to operand.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMap<T>(BTreeMap<String, T>);

impl<T> FieldMap<T> {
    fn single(field: impl Into<String>, value: T) -> Option<Self> {
        let field = field.into();
        if field.is_empty() {
            return None;
        }
        Some(Self(BTreeMap::from([(field, value)])))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &T)> {
        self.0.iter()
    }
}

impl<T: Serialize> Serialize for FieldMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

struct FieldMapVisitor<T>(PhantomData<T>);

impl<'de, T: Deserialize<'de>> Visitor<'de> for FieldMapVisitor<T> {
    type Value = FieldMap<T>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of field names to operands")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = BTreeMap::new();
        while let Some(field) = access.next_key::<String>()? {
            if field.is_empty() {
                return Err(A::Error::custom("field name must not be empty"));
            }
            if map.contains_key(&field) {
                return Err(A::Error::custom(format!("duplicate field '{}'", field)));
            }
            let value = access.next_value()?;
            map.insert(field, value);
        }
        if map.is_empty() {
            return Err(A::Error::custom("operator must name at least one field"));
        }
        Ok(FieldMap(map))
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for FieldMap<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(FieldMapVisitor(PhantomData))
    }
}

/// Non-empty list of candidate values for `in`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValueList(Vec<Value>);

impl<'de> Deserialize<'de> for ValueList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let values = Vec::<Value>::deserialize(deserializer)?;
        if values.is_empty() {
            return Err(D::Error::custom("'in' needs at least one value"));
        }
        Ok(Self(values))
    }
}

/// Non-empty list of sub-queries for `and` / `or`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Clauses(Vec<Query>);

impl<'de> Deserialize<'de> for Clauses {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let clauses = Vec::<Query>::deserialize(deserializer)?;
        if clauses.is_empty() {
            return Err(D::Error::custom("'and'/'or' needs at least one clause"));
        }
        Ok(Self(clauses))
    }
}

/// Ordered comparison bounds. Always has at least one bound.
///
/// A `null` bound is kept as a bound: nothing compares with `null`, so it
/// is never satisfied. The text form `{"gt":null}` parses back to the same.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Range {
    #[serde(skip_serializing_if = "Option::is_none")]
    gt: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gte: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lt: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lte: Option<Value>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RangeRepr {
    #[serde(default, deserialize_with = "present_bound")]
    gt: Option<Value>,
    #[serde(default, deserialize_with = "present_bound")]
    gte: Option<Value>,
    #[serde(default, deserialize_with = "present_bound")]
    lt: Option<Value>,
    #[serde(default, deserialize_with = "present_bound")]
    lte: Option<Value>,
}

/// A listed bound is `Some`, even when it is `null`.
fn present_bound<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl<'de> Deserialize<'de> for Range {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = RangeRepr::deserialize(deserializer)?;
        if repr.gt.is_none() && repr.gte.is_none() && repr.lt.is_none() && repr.lte.is_none() {
            return Err(D::Error::custom(
                "range needs at least one of gt, gte, lt, lte",
            ));
        }
        Ok(Range {
            gt: repr.gt,
            gte: repr.gte,
            lt: repr.lt,
            lte: repr.lte,
        })
    }
}

impl Range {
    fn empty() -> Self {
        Range {
            gt: None,
            gte: None,
            lt: None,
            lte: None,
        }
    }

    pub fn gt(value: impl Into<Value>) -> Self {
        Self::empty().and_gt(value)
    }

    pub fn gte(value: impl Into<Value>) -> Self {
        Self::empty().and_gte(value)
    }

    pub fn lt(value: impl Into<Value>) -> Self {
        Self::empty().and_lt(value)
    }

    pub fn lte(value: impl Into<Value>) -> Self {
        Self::empty().and_lte(value)
    }

    pub fn and_gt(mut self, value: impl Into<Value>) -> Self {
        self.gt = Some(value.into());
        self
    }

    pub fn and_gte(mut self, value: impl Into<Value>) -> Self {
        self.gte = Some(value.into());
        self
    }

    pub fn and_lt(mut self, value: impl Into<Value>) -> Self {
        self.lt = Some(value.into());
        self
    }

    pub fn and_lte(mut self, value: impl Into<Value>) -> Self {
        self.lte = Some(value.into());
        self
    }

    /// Incomparable values (e.g. a string against a numeric bound) never
    /// satisfy a bound.
    fn contains(&self, value: &Value) -> bool {
        let check = |bound: &Option<Value>, ok: fn(Ordering) -> bool| {
            bound
                .as_ref()
                .map_or(true, |b| compare_values(value, b).is_some_and(ok))
        };
        check(&self.gt, |o| o == Ordering::Greater)
            && check(&self.gte, |o| o != Ordering::Less)
            && check(&self.lt, |o| o == Ordering::Less)
            && check(&self.lte, |o| o != Ordering::Greater)
    }
}

/// Equality with numbers compared by value (`1 == 1.0`).
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y) == Some(Ordering::Equal),
        _ => a == b,
    }
}

/// Integers compare exactly; `f64` only when one side is fractional.
fn compare_numbers(x: &Number, y: &Number) -> Option<Ordering> {
    let integer = |n: &Number| {
        n.as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from))
    };
    match (integer(x), integer(y)) {
        (Some(a), Some(b)) => Some(a.cmp(&b)),
        _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
    }
}

/// Natural ordering between two values of the same scalar type.
///
/// Returns `None` for mixed types, nulls, arrays, and objects.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Multi-valued attributes match when any element matches.
fn attribute_equals(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Array(_), Value::Array(_)) => values_equal(actual, expected),
        (Value::Array(items), _) => items.iter().any(|v| values_equal(v, expected)),
        _ => values_equal(actual, expected),
    }
}

fn any_element(actual: &Value, pred: impl Fn(&Value) -> bool) -> bool {
    match actual {
        Value::Array(items) => items.iter().any(pred),
        other => pred(other),
    }
}

use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// A document map: one stored document's named fields.
pub type JsonMap = serde_json::Map<String, JsonValue>;

/// The test closure behind the store's generic field-test primitive.
pub type FieldTest = Arc<dyn Fn(&JsonValue) -> bool + Send + Sync>;

/// The document store's native composable query object.
///
/// Conditions are the only query language the store understands; callers
/// combine them with [`Condition::and`] and hand them to
/// `Table::search`/`Table::update_where`/`Table::remove_where`.
///
/// # Primitives
/// - `Eq`/`OneOf`/`NotOneOf`: value tests on a named field. `Eq` and
///   `OneOf` require the field to be present; `NotOneOf` also matches
///   documents where the field is absent.
/// - `Exists`: the field is present *and* non-null. Note this primitive
///   cannot express "absent or null" on its own - negate it.
/// - `Test`: the generic field-test primitive - an arbitrary closure over
///   the field's value, used for everything equality cannot express
///   (ordering, substring, prefix/suffix). Absent fields never pass.
/// - `Not`/`And`/`Noop`: logical composition; `Noop` matches every
///   document.
#[derive(Clone)]
pub enum Condition {
    /// Matches every document.
    Noop,
    /// Field present and equal to the value.
    Eq(String, JsonValue),
    /// Field present and a member of the list.
    OneOf(String, Vec<JsonValue>),
    /// Field absent, or present and not a member of the list.
    NotOneOf(String, Vec<JsonValue>),
    /// Field present and non-null.
    Exists(String),
    /// Logical negation.
    Not(Box<Condition>),
    /// Field present and passing the test closure.
    Test(String, FieldTest),
    /// All conditions match.
    And(Vec<Condition>),
}

impl Condition {
    /// Combines this condition with another using logical AND, flattening
    /// nested AND nodes.
    pub fn and(self, other: Condition) -> Condition {
        match (self, other) {
            (Condition::Noop, other) => other,
            (this, Condition::Noop) => this,
            (Condition::And(mut items), Condition::And(others)) => {
                items.extend(others);
                Condition::And(items)
            }
            (Condition::And(mut items), other) => {
                items.push(other);
                Condition::And(items)
            }
            (this, Condition::And(mut others)) => {
                others.insert(0, this);
                Condition::And(others)
            }
            (this, other) => Condition::And(vec![this, other]),
        }
    }

    /// Builds the generic field-test primitive from a closure.
    pub fn test<F>(field: &str, test: F) -> Condition
    where
        F: Fn(&JsonValue) -> bool + Send + Sync + 'static,
    {
        Condition::Test(field.to_string(), Arc::new(test))
    }

    /// Evaluates this condition against a stored document.
    pub fn matches(&self, doc: &JsonMap) -> bool {
        match self {
            Condition::Noop => true,
            Condition::Eq(field, value) => doc
                .get(field)
                .map_or(false, |actual| json_eq(actual, value)),
            Condition::OneOf(field, values) => doc
                .get(field)
                .map_or(false, |actual| values.iter().any(|v| json_eq(actual, v))),
            Condition::NotOneOf(field, values) => doc
                .get(field)
                .map_or(true, |actual| !values.iter().any(|v| json_eq(actual, v))),
            Condition::Exists(field) => doc.get(field).map_or(false, |v| !v.is_null()),
            Condition::Not(inner) => !inner.matches(doc),
            Condition::Test(field, test) => doc.get(field).map_or(false, |v| test(v)),
            Condition::And(items) => items.iter().all(|c| c.matches(doc)),
        }
    }
}

impl std::fmt::Debug for Condition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Condition({})", self)
    }
}

impl Display for Condition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Condition::Noop => write!(f, "noop"),
            Condition::Eq(field, value) => write!(f, "({} == {})", field, value),
            Condition::OneOf(field, values) => {
                write!(f, "({} one_of {})", field, JsonValue::Array(values.clone()))
            }
            Condition::NotOneOf(field, values) => {
                write!(f, "({} not_one_of {})", field, JsonValue::Array(values.clone()))
            }
            Condition::Exists(field) => write!(f, "exists({})", field),
            Condition::Not(inner) => write!(f, "!{}", inner),
            Condition::Test(field, _) => write!(f, "test({})", field),
            Condition::And(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " & ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// JSON equality with numbers compared numerically, so an integer-typed
/// document value still equals a float-typed query value.
pub(crate) fn json_eq(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => {
            match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            }
        }
        _ => a == b,
    }
}

/// Orders two JSON values of the same comparable kind.
///
/// Numbers compare numerically, strings lexicographically (which keeps
/// ISO-8601 timestamps chronological), booleans false-before-true.
/// Mismatched kinds are incomparable.
pub(crate) fn json_cmp(a: &JsonValue, b: &JsonValue) -> Option<Ordering> {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => {
            x.as_f64()?.partial_cmp(&y.as_f64()?)
        }
        (JsonValue::String(x), JsonValue::String(y)) => Some(x.cmp(y)),
        (JsonValue::Bool(x), JsonValue::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

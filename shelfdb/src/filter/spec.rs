use std::fmt::{Display, Formatter};

use crate::common::Value;
use crate::errors::ShelfResult;
use crate::filter::CompareOp;

/// A single match condition: a target field, a comparison operator, and a
/// comparison value.
///
/// The comparison value may be `Value::Null` for existence checks - `Eq`
/// and `Neq` against null are defined to behave exactly like `IsNull` and
/// its negation, across every backend.
#[derive(Clone, Debug, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub op: CompareOp,
    pub value: Value,
}

impl Predicate {
    /// Creates a predicate from its parts.
    pub fn new<V: Into<Value>>(field: &str, op: CompareOp, value: V) -> Self {
        Predicate {
            field: field.to_string(),
            op,
            value: value.into(),
        }
    }
}

impl Display for Predicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} {} {})", self.field, self.op, self.value)
    }
}

/// A backend-neutral description of match conditions.
///
/// A specification is an unordered set of independent predicates combined
/// with an implicit AND. An empty specification matches every record.
/// Unknown field names are not rejected - whether a missing field fails
/// softly to "no match" is the evaluator's concern, not the constructor's.
///
/// # Construction
///
/// Either from explicit predicates:
///
/// ```rust,ignore
/// use shelfdb::filter::{field, FilterSpec};
///
/// let spec = FilterSpec::new()
///     .with(field("score").gt(20i64))
///     .with(field("status").eq("playing"));
/// ```
///
/// or from a flat mapping whose keys optionally carry an operator token
/// after a double underscore (`"score__gt"`); a bare key means equality:
///
/// ```rust,ignore
/// let spec = FilterSpec::from_map(vec![
///     ("score__gt".to_string(), 20i64.into()),
///     ("title".to_string(), "Alpha".into()),
/// ])?;
/// ```
///
/// Both forms normalize to the same internal representation before
/// reaching any backend.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterSpec {
    predicates: Vec<Predicate>,
}

impl FilterSpec {
    /// Creates an empty specification, which matches every record.
    pub fn new() -> Self {
        FilterSpec { predicates: vec![] }
    }

    /// Adds a predicate and returns the specification, for fluent
    /// construction.
    pub fn with(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Adds a predicate in place.
    pub fn push(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }

    /// Builds a specification from explicit (field, operator, value)
    /// triples.
    pub fn from_triples<I>(triples: I) -> Self
    where
        I: IntoIterator<Item = (String, CompareOp, Value)>,
    {
        FilterSpec {
            predicates: triples
                .into_iter()
                .map(|(field, op, value)| Predicate { field, op, value })
                .collect(),
        }
    }

    /// Builds a specification from a flat mapping.
    ///
    /// Keys are split on the last `"__"`: the prefix names the field, the
    /// suffix is the operator token. A key without a separator defaults to
    /// equality. An unknown operator token fails with
    /// `UnsupportedOperator` - this is the first compile step of the
    /// specification, and the failure is never silently ignored.
    pub fn from_map<I>(entries: I) -> ShelfResult<FilterSpec>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut predicates = vec![];
        for (key, value) in entries {
            let (field, op) = match key.rsplit_once("__") {
                Some((field, token)) => (field.to_string(), CompareOp::parse_token(token)?),
                None => (key, CompareOp::Eq),
            };
            predicates.push(Predicate { field, op, value });
        }
        Ok(FilterSpec { predicates })
    }

    /// The normalized predicates of this specification.
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Returns `true` when the specification has no predicates.
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

impl Display for FilterSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.predicates.is_empty() {
            return write!(f, "(all)");
        }
        for (i, predicate) in self.predicates.iter().enumerate() {
            if i > 0 {
                write!(f, " && ")?;
            }
            write!(f, "{}", predicate)?;
        }
        Ok(())
    }
}

impl FromIterator<Predicate> for FilterSpec {
    fn from_iter<I: IntoIterator<Item = Predicate>>(iter: I) -> Self {
        FilterSpec {
            predicates: iter.into_iter().collect(),
        }
    }
}

use crate::common::Value;
use crate::filter::{CompareOp, Predicate};

/// Creates a fluent predicate builder for the specified field name.
///
/// # Examples
///
/// ```rust,ignore
/// use shelfdb::filter::{field, FilterSpec};
///
/// let spec = FilterSpec::new()
///     .with(field("score").gt(20i64))
///     .with(field("title").icontains("alp"))
///     .with(field("deleted_at").is_null(true));
/// ```
pub fn field(field_name: &str) -> FieldExpr {
    FieldExpr {
        field_name: field_name.to_string(),
    }
}

/// A fluent builder for constructing predicates on a specific field.
///
/// Each method consumes the builder and returns a [`Predicate`] carrying
/// the field name, the chosen comparison operator, and the comparison
/// value.
pub struct FieldExpr {
    field_name: String,
}

impl FieldExpr {
    /// Field equals the value. With `Value::Null` this behaves exactly
    /// like `is_null(true)`.
    #[inline]
    pub fn eq<V: Into<Value>>(self, value: V) -> Predicate {
        Predicate::new(&self.field_name, CompareOp::Eq, value)
    }

    /// Field does not equal the value. With `Value::Null` this behaves
    /// exactly like `is_null(false)`.
    #[inline]
    pub fn neq<V: Into<Value>>(self, value: V) -> Predicate {
        Predicate::new(&self.field_name, CompareOp::Neq, value)
    }

    /// Field is strictly less than the value.
    #[inline]
    pub fn lt<V: Into<Value>>(self, value: V) -> Predicate {
        Predicate::new(&self.field_name, CompareOp::Lt, value)
    }

    /// Field is less than or equal to the value.
    #[inline]
    pub fn lte<V: Into<Value>>(self, value: V) -> Predicate {
        Predicate::new(&self.field_name, CompareOp::Lte, value)
    }

    /// Field is strictly greater than the value.
    #[inline]
    pub fn gt<V: Into<Value>>(self, value: V) -> Predicate {
        Predicate::new(&self.field_name, CompareOp::Gt, value)
    }

    /// Field is greater than or equal to the value.
    #[inline]
    pub fn gte<V: Into<Value>>(self, value: V) -> Predicate {
        Predicate::new(&self.field_name, CompareOp::Gte, value)
    }

    /// Field value is a member of the list.
    #[inline]
    pub fn one_of<V: Into<Value>>(self, values: Vec<V>) -> Predicate {
        let list = values.into_iter().map(Into::into).collect::<Vec<Value>>();
        Predicate::new(&self.field_name, CompareOp::In, Value::List(list))
    }

    /// Field value is not a member of the list.
    #[inline]
    pub fn not_one_of<V: Into<Value>>(self, values: Vec<V>) -> Predicate {
        let list = values.into_iter().map(Into::into).collect::<Vec<Value>>();
        Predicate::new(&self.field_name, CompareOp::NotIn, Value::List(list))
    }

    /// String field contains the value as a substring; list field contains
    /// the value as a member.
    #[inline]
    pub fn contains<V: Into<Value>>(self, value: V) -> Predicate {
        Predicate::new(&self.field_name, CompareOp::Contains, value)
    }

    /// Case-insensitive substring test on a string field.
    #[inline]
    pub fn icontains(self, value: &str) -> Predicate {
        Predicate::new(&self.field_name, CompareOp::IContains, value)
    }

    /// String field starts with the value.
    #[inline]
    pub fn starts_with(self, value: &str) -> Predicate {
        Predicate::new(&self.field_name, CompareOp::StartsWith, value)
    }

    /// Case-insensitive prefix test on a string field.
    #[inline]
    pub fn istarts_with(self, value: &str) -> Predicate {
        Predicate::new(&self.field_name, CompareOp::IStartsWith, value)
    }

    /// String field ends with the value.
    #[inline]
    pub fn ends_with(self, value: &str) -> Predicate {
        Predicate::new(&self.field_name, CompareOp::EndsWith, value)
    }

    /// Case-insensitive suffix test on a string field.
    #[inline]
    pub fn iends_with(self, value: &str) -> Predicate {
        Predicate::new(&self.field_name, CompareOp::IEndsWith, value)
    }

    /// Existence check: `is_null(true)` matches records where the field is
    /// absent or null, `is_null(false)` matches records where it is
    /// present and non-null.
    #[inline]
    pub fn is_null(self, expected: bool) -> Predicate {
        Predicate::new(&self.field_name, CompareOp::IsNull, expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_eq() {
        let predicate = field("title").eq("Alpha");
        assert_eq!(predicate.field, "title");
        assert_eq!(predicate.op, CompareOp::Eq);
        assert_eq!(predicate.value, Value::from("Alpha"));
    }

    #[test]
    fn test_field_one_of_builds_list() {
        let predicate = field("status").one_of(vec!["playing", "paused"]);
        assert_eq!(predicate.op, CompareOp::In);
        assert_eq!(
            predicate.value,
            Value::List(vec![Value::from("playing"), Value::from("paused")])
        );
    }

    #[test]
    fn test_field_is_null_carries_bool() {
        let predicate = field("deleted_at").is_null(true);
        assert_eq!(predicate.op, CompareOp::IsNull);
        assert_eq!(predicate.value, Value::Bool(true));
    }

    #[test]
    fn test_ordering_builders() {
        assert_eq!(field("score").lt(1i64).op, CompareOp::Lt);
        assert_eq!(field("score").lte(1i64).op, CompareOp::Lte);
        assert_eq!(field("score").gt(1i64).op, CompareOp::Gt);
        assert_eq!(field("score").gte(1i64).op, CompareOp::Gte);
    }

    #[test]
    fn test_pattern_builders() {
        assert_eq!(field("t").contains("x").op, CompareOp::Contains);
        assert_eq!(field("t").icontains("x").op, CompareOp::IContains);
        assert_eq!(field("t").starts_with("x").op, CompareOp::StartsWith);
        assert_eq!(field("t").istarts_with("x").op, CompareOp::IStartsWith);
        assert_eq!(field("t").ends_with("x").op, CompareOp::EndsWith);
        assert_eq!(field("t").iends_with("x").op, CompareOp::IEndsWith);
    }
}

use std::cmp::Ordering;

use crate::common::{Record, Value};
use crate::errors::{ErrorKind, ShelfError, ShelfResult};
use crate::filter::{CompareOp, FilterSpec};

/// Tests a filter specification directly against an in-memory record.
///
/// This is the reference implementation of the comparison operator
/// semantics: the in-memory and per-record-file backends call it for every
/// record, and the document-store backend falls back to it when native
/// query compilation fails. All predicates must match (implicit AND); an
/// empty specification matches every record.
pub fn matches(record: &Record, spec: &FilterSpec) -> ShelfResult<bool> {
    for predicate in spec.predicates() {
        let actual = record.get(&predicate.field);
        if !compare(&actual, &predicate.value, predicate.op)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Applies a single comparison operator to an actual and expected value.
///
/// Null handling rules, shared by every backend:
/// - `Eq`/`Neq` with a null expected value degrade to the null check
/// - ordering operators on a null actual value never match and never error
/// - pattern operators on a non-string actual value never match
pub(crate) fn compare(actual: &Value, expected: &Value, op: CompareOp) -> ShelfResult<bool> {
    match op {
        CompareOp::Eq => {
            if expected.is_null() {
                Ok(actual.is_null())
            } else {
                Ok(actual == expected)
            }
        }
        CompareOp::Neq => {
            if expected.is_null() {
                Ok(!actual.is_null())
            } else {
                Ok(actual != expected)
            }
        }
        CompareOp::Lt => Ok(ordering_matches(actual, expected, |o| o == Ordering::Less)),
        CompareOp::Lte => Ok(ordering_matches(actual, expected, |o| o != Ordering::Greater)),
        CompareOp::Gt => Ok(ordering_matches(actual, expected, |o| {
            o == Ordering::Greater
        })),
        CompareOp::Gte => Ok(ordering_matches(actual, expected, |o| o != Ordering::Less)),
        CompareOp::In => Ok(membership(actual, expected)?),
        CompareOp::NotIn => Ok(!membership(actual, expected)?),
        CompareOp::Contains => match actual {
            Value::List(items) => Ok(items.contains(expected)),
            Value::Str(text) | Value::Enum(text) => match expected.text_form() {
                Some(needle) => Ok(text.contains(&needle)),
                None => Ok(false),
            },
            _ => Ok(false),
        },
        CompareOp::IContains => string_test(actual, expected, |actual, expected| {
            actual.to_lowercase().contains(&expected.to_lowercase())
        }),
        CompareOp::StartsWith => {
            string_test(actual, expected, |actual, expected| {
                actual.starts_with(expected)
            })
        }
        CompareOp::IStartsWith => string_test(actual, expected, |actual, expected| {
            actual.to_lowercase().starts_with(&expected.to_lowercase())
        }),
        CompareOp::EndsWith => {
            string_test(actual, expected, |actual, expected| actual.ends_with(expected))
        }
        CompareOp::IEndsWith => string_test(actual, expected, |actual, expected| {
            actual.to_lowercase().ends_with(&expected.to_lowercase())
        }),
        CompareOp::IsNull => {
            let wants_null = null_check_flag(expected)?;
            Ok(if wants_null {
                actual.is_null()
            } else {
                !actual.is_null()
            })
        }
    }
}

/// Ordering comparison with null and cross-type guards: a null operand or
/// incomparable pair is "no match", never an error.
fn ordering_matches<F>(actual: &Value, expected: &Value, check: F) -> bool
where
    F: Fn(Ordering) -> bool,
{
    if actual.is_null() || expected.is_null() {
        return false;
    }
    match actual.try_cmp(expected) {
        Some(ordering) => check(ordering),
        None => false,
    }
}

/// Membership test for `In`/`NotIn`. The expected value must be a list.
fn membership(actual: &Value, expected: &Value) -> ShelfResult<bool> {
    match expected.as_list() {
        Some(items) => Ok(items.contains(actual)),
        None => {
            log::error!(
                "Membership operator requires a list comparison value, got: {}",
                expected
            );
            Err(ShelfError::new(
                "Membership operator requires a list comparison value",
                ErrorKind::FilterError,
            ))
        }
    }
}

/// Pattern test on string actuals; non-string actuals never match.
fn string_test<F>(actual: &Value, expected: &Value, test: F) -> ShelfResult<bool>
where
    F: Fn(&str, &str) -> bool,
{
    let actual_text = match actual {
        Value::Str(text) | Value::Enum(text) => text.clone(),
        _ => return Ok(false),
    };
    match expected.text_form() {
        Some(expected_text) => Ok(test(&actual_text, &expected_text)),
        None => Ok(false),
    }
}

/// Interprets the comparison value of an `IsNull` predicate: a boolean, or
/// null (which reads as "check for null").
fn null_check_flag(expected: &Value) -> ShelfResult<bool> {
    match expected {
        Value::Bool(flag) => Ok(*flag),
        Value::Null => Ok(true),
        other => {
            log::error!("isnull operator requires a boolean comparison value, got: {}", other);
            Err(ShelfError::new(
                "isnull operator requires a boolean comparison value",
                ErrorKind::FilterError,
            ))
        }
    }
}

use std::cmp::Ordering;

use crate::common::Value;
use crate::docstore::condition::{json_cmp, json_eq, Condition};
use crate::errors::{ErrorKind, ShelfError, ShelfResult};
use crate::filter::{CompareOp, FilterSpec, Predicate};

/// Compiles a filter specification into the document store's native query
/// object.
///
/// Each predicate becomes exactly one native condition, and predicates are
/// combined with the store's logical AND. The store's equality primitive
/// cannot express ordering or pattern operators, so those compile to the
/// generic field-test primitive with a null-guarded closure.
///
/// Expected `DateTime` and `Enum` values normalize to their string forms
/// before comparison, because documents store plain JSON.
///
/// `IsNull` deserves a note: the store's native `Exists` only covers
/// "present and non-null", so "is null" is compiled as its logical
/// negation - field absent OR present with a null value.
pub fn compile(spec: &FilterSpec) -> ShelfResult<Condition> {
    let mut condition = Condition::Noop;
    for predicate in spec.predicates() {
        condition = condition.and(compile_predicate(predicate)?);
    }
    Ok(condition)
}

fn compile_predicate(predicate: &Predicate) -> ShelfResult<Condition> {
    let field = predicate.field.clone();
    let expected = predicate.value.to_json();

    match predicate.op {
        CompareOp::Eq => {
            if predicate.value.is_null() {
                Ok(Condition::Not(Box::new(Condition::Exists(field))))
            } else {
                Ok(Condition::Eq(field, expected))
            }
        }
        CompareOp::Neq => {
            if predicate.value.is_null() {
                Ok(Condition::Exists(field))
            } else {
                Ok(Condition::Not(Box::new(Condition::Eq(field, expected))))
            }
        }
        CompareOp::Lt => Ok(ordering_condition(&field, expected, |o| o == Ordering::Less)),
        CompareOp::Lte => Ok(ordering_condition(&field, expected, |o| {
            o != Ordering::Greater
        })),
        CompareOp::Gt => Ok(ordering_condition(&field, expected, |o| {
            o == Ordering::Greater
        })),
        CompareOp::Gte => Ok(ordering_condition(&field, expected, |o| o != Ordering::Less)),
        CompareOp::In => Ok(Condition::OneOf(field, membership_list(predicate)?)),
        CompareOp::NotIn => Ok(Condition::NotOneOf(field, membership_list(predicate)?)),
        CompareOp::Contains => {
            let needle_text = predicate.value.text_form();
            Ok(Condition::test(&field, move |actual| match actual {
                serde_json::Value::String(text) => needle_text
                    .as_ref()
                    .map_or(false, |needle| text.contains(needle)),
                serde_json::Value::Array(items) => {
                    items.iter().any(|item| json_eq(item, &expected))
                }
                _ => false,
            }))
        }
        CompareOp::IContains => {
            let needle = text_value(predicate)?.to_lowercase();
            Ok(Condition::test(&field, move |actual| {
                actual
                    .as_str()
                    .map_or(false, |text| text.to_lowercase().contains(&needle))
            }))
        }
        CompareOp::StartsWith => {
            let prefix = text_value(predicate)?;
            Ok(Condition::test(&field, move |actual| {
                actual.as_str().map_or(false, |text| text.starts_with(&prefix))
            }))
        }
        CompareOp::IStartsWith => {
            let prefix = text_value(predicate)?.to_lowercase();
            Ok(Condition::test(&field, move |actual| {
                actual
                    .as_str()
                    .map_or(false, |text| text.to_lowercase().starts_with(&prefix))
            }))
        }
        CompareOp::EndsWith => {
            let suffix = text_value(predicate)?;
            Ok(Condition::test(&field, move |actual| {
                actual.as_str().map_or(false, |text| text.ends_with(&suffix))
            }))
        }
        CompareOp::IEndsWith => {
            let suffix = text_value(predicate)?.to_lowercase();
            Ok(Condition::test(&field, move |actual| {
                actual
                    .as_str()
                    .map_or(false, |text| text.to_lowercase().ends_with(&suffix))
            }))
        }
        CompareOp::IsNull => {
            let wants_null = match &predicate.value {
                Value::Bool(flag) => *flag,
                Value::Null => true,
                other => {
                    log::error!(
                        "isnull operator requires a boolean comparison value, got: {}",
                        other
                    );
                    return Err(ShelfError::new(
                        "isnull operator requires a boolean comparison value",
                        ErrorKind::FilterError,
                    ));
                }
            };
            if wants_null {
                Ok(Condition::Not(Box::new(Condition::Exists(field))))
            } else {
                Ok(Condition::Exists(field))
            }
        }
    }
}

/// Ordering operators need the generic test primitive: the null guard
/// keeps "null never matches an ordering comparison" true inside the
/// store as well.
fn ordering_condition<F>(field: &str, expected: serde_json::Value, check: F) -> Condition
where
    F: Fn(Ordering) -> bool + Send + Sync + 'static,
{
    Condition::test(field, move |actual| {
        if actual.is_null() {
            return false;
        }
        json_cmp(actual, &expected).map_or(false, &check)
    })
}

fn membership_list(predicate: &Predicate) -> ShelfResult<Vec<serde_json::Value>> {
    match predicate.value.as_list() {
        Some(items) => Ok(items.iter().map(Value::to_json).collect()),
        None => {
            log::error!(
                "Membership operator requires a list comparison value, got: {}",
                predicate.value
            );
            Err(ShelfError::new(
                "Membership operator requires a list comparison value",
                ErrorKind::FilterError,
            ))
        }
    }
}

fn text_value(predicate: &Predicate) -> ShelfResult<String> {
    predicate.value.text_form().ok_or_else(|| {
        log::error!(
            "Pattern operator {} requires a text comparison value, got: {}",
            predicate.op,
            predicate.value
        );
        ShelfError::new(
            "Pattern operator requires a text comparison value",
            ErrorKind::FilterError,
        )
    })
}

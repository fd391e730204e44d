use std::fmt::{Display, Formatter};

use crate::errors::{ErrorKind, ShelfError, ShelfResult};

/// The closed set of predicate behaviors shared by every backend.
///
/// Every backend - the in-memory evaluator, the document-store query
/// compiler, and the SQL expression compiler - implements exactly this
/// enumeration, which is what makes cross-backend equivalence checkable.
///
/// # Variants
/// - `Eq`/`Neq`: equality and inequality; a null comparison value makes
///   them equivalent to `IsNull`/is-not-null
/// - `Lt`/`Lte`/`Gt`/`Gte`: ordering comparisons; a null actual value
///   never matches and never errors
/// - `In`/`NotIn`: set membership against a list comparison value
/// - `Contains`/`IContains`: substring on strings, membership on lists;
///   the `I` variant lowercases both strings
/// - `StartsWith`/`IStartsWith`/`EndsWith`/`IEndsWith`: string prefix and
///   suffix tests
/// - `IsNull`: existence check; takes a boolean comparison value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    NotIn,
    Contains,
    IContains,
    StartsWith,
    IStartsWith,
    EndsWith,
    IEndsWith,
    IsNull,
}

impl CompareOp {
    /// Parses an operator token as used in flat-mapping filter keys
    /// (`"score__gt"`, `"title__icontains"`, ...).
    ///
    /// Token parsing is the first compile step for a specification: an
    /// unknown token raises `UnsupportedOperator` here, and the closed
    /// enum makes unsupported operators unrepresentable downstream.
    pub fn parse_token(token: &str) -> ShelfResult<CompareOp> {
        match token {
            "eq" => Ok(CompareOp::Eq),
            "neq" => Ok(CompareOp::Neq),
            "lt" => Ok(CompareOp::Lt),
            "lte" => Ok(CompareOp::Lte),
            "gt" => Ok(CompareOp::Gt),
            "gte" => Ok(CompareOp::Gte),
            "in" => Ok(CompareOp::In),
            "notin" => Ok(CompareOp::NotIn),
            "contains" => Ok(CompareOp::Contains),
            "icontains" => Ok(CompareOp::IContains),
            "startswith" => Ok(CompareOp::StartsWith),
            "istartswith" => Ok(CompareOp::IStartsWith),
            "endswith" => Ok(CompareOp::EndsWith),
            "iendswith" => Ok(CompareOp::IEndsWith),
            "isnull" => Ok(CompareOp::IsNull),
            _ => {
                log::error!("Unsupported filter operator token: {}", token);
                Err(ShelfError::new(
                    &format!("Unsupported filter operator: {}", token),
                    ErrorKind::UnsupportedOperator,
                ))
            }
        }
    }

    /// The canonical token for this operator.
    pub fn token(&self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Neq => "neq",
            CompareOp::Lt => "lt",
            CompareOp::Lte => "lte",
            CompareOp::Gt => "gt",
            CompareOp::Gte => "gte",
            CompareOp::In => "in",
            CompareOp::NotIn => "notin",
            CompareOp::Contains => "contains",
            CompareOp::IContains => "icontains",
            CompareOp::StartsWith => "startswith",
            CompareOp::IStartsWith => "istartswith",
            CompareOp::EndsWith => "endswith",
            CompareOp::IEndsWith => "iendswith",
            CompareOp::IsNull => "isnull",
        }
    }

    /// Returns `true` for the ordering operators (`Lt`..`Gte`).
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            CompareOp::Lt | CompareOp::Lte | CompareOp::Gt | CompareOp::Gte
        )
    }
}

impl Display for CompareOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_tokens() {
        let tokens = [
            "eq",
            "neq",
            "lt",
            "lte",
            "gt",
            "gte",
            "in",
            "notin",
            "contains",
            "icontains",
            "startswith",
            "istartswith",
            "endswith",
            "iendswith",
            "isnull",
        ];
        for token in tokens {
            let op = CompareOp::parse_token(token).unwrap();
            assert_eq!(op.token(), token);
        }
    }

    #[test]
    fn test_parse_unknown_token_is_unsupported_operator() {
        let result = CompareOp::parse_token("regex");
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), &ErrorKind::UnsupportedOperator);
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert!(CompareOp::parse_token("EQ").is_err());
    }

    #[test]
    fn test_is_ordering() {
        assert!(CompareOp::Lt.is_ordering());
        assert!(CompareOp::Gte.is_ordering());
        assert!(!CompareOp::Eq.is_ordering());
        assert!(!CompareOp::Contains.is_ordering());
    }
}

//! The backend-neutral filter specification and its in-memory evaluator.
//!
//! A [`FilterSpec`] is an AND-combination of field/operator/value
//! predicates. Backends either interpret it directly through
//! [`evaluator::matches`] or compile it into their native query form (see
//! the `docstore` and `sql` modules).

pub mod evaluator;
mod fluent;
mod op;
mod spec;

pub use evaluator::matches;
pub use fluent::{field, FieldExpr};
pub use op::CompareOp;
pub use spec::{FilterSpec, Predicate};

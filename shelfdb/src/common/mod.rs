//! Common types shared by every backend: field values, records, sort
//! order, and timestamp text helpers.

pub mod record;
pub mod sort_order;
pub mod time;
pub mod value;

pub use record::{Record, FIELD_CREATED_AT, FIELD_DELETED_AT, FIELD_ID, FIELD_UPDATED_AT};
pub use sort_order::SortOrder;
pub use value::Value;

/// Specifies the direction for ordering filtered records.
///
/// # Purpose
/// Defines whether records should be sorted in ascending (low to high) or
/// descending (high to low) order. Used in find options to control result
/// ordering.
///
/// # Variants
/// - `Ascending`: Sort from smallest to largest value (A to Z, 0 to 9, oldest to newest)
/// - `Descending`: Sort from largest to smallest value (Z to A, 9 to 0, newest to oldest)
///
/// # Usage
/// Used with `FindOptions::order_by` when filtering a repository:
/// ```text
/// let options = FindOptions::new().order_by("score", SortOrder::Descending);
/// let page = repository.filter(&spec, &options)?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SortOrder {
    /// Sort in ascending order (smallest to largest, A-Z, oldest to newest)
    Ascending,
    /// Sort in descending order (largest to smallest, Z-A, newest to oldest)
    Descending,
}

impl SortOrder {
    /// Returns the SQL keyword for this order.
    pub(crate) fn sql_keyword(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

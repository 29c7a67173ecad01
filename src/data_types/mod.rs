
/// Comparison categories and the per-position comparison result
pub mod comparison;
/// Wrapper for coordinates with some additional functionalities
pub mod coordinates;
/// Contains the nested category/type counts and accuracy reduction
pub mod summary_metrics;
/// Contains variant record definitions and checks
pub mod variants;

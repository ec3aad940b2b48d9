pub mod granularity;
pub mod segment;

pub use granularity::{infer_unit, select_group_by};
pub use segment::segment;

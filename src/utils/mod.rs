//! Shared utilities: post-allocation consistency checks.

pub mod validation;

pub use validation::{validate_link_plan, validate_placement};

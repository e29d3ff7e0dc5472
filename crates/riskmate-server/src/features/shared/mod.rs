//! Shared utilities for feature modules
//!
//! - **pagination**: page/per_page parameters and response metadata
//! - **validation**: text field checks used by commands

pub mod pagination;
pub mod validation;

#[cfg(test)]
pub(crate) mod fixtures;

pub use pagination::{PaginationMetadata, PaginationParams};
pub use validation::{
    normalize_optional, validate_optional_text, validate_text, TextValidationError,
};

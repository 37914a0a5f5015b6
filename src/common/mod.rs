//! Common utilities shared across the formsmap codebase.
//!
//! Key components:
//! - **Source masking**: blank comments and literals while keeping offsets
//! - **Line index**: map byte offsets back to source line numbers

pub mod text;

pub use text::{code_only, contains_keyword, mask_source, strip_comments, LineIndex, Mask};

//! Structural element classification and field schemas

mod element_type;
mod schema;

pub use element_type::{ElementKey, ElementType, SourceLayout, SubmissionCategory};
pub use schema::{FieldSchema, FieldSpec};

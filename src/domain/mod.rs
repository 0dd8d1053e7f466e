//! Domain layer types and invariants.

pub mod content;

pub use content::{ContentClass, ContentItem, ContentStatus};

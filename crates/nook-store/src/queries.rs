//! Relational core primitives, organized by row shape.

pub mod documents;
pub mod profile;

//! Core data types for Trellis

pub mod collection;
pub mod document;
pub mod value;

// Re-export SharedStr for use in other modules
pub use value::SharedStr;

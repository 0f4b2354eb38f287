//! Data model shared by the builder crates: component items, event actions,
//! task records and the persisted JSON shape.

pub mod domain;
pub mod error;
pub mod protocol;
pub mod task;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

//! Configuration for the regionlock command line.
//!
//! Settings come from an optional `regionlock.yaml`. Parsing is
//! forward-compatible (unknown fields are ignored), every field has a
//! default, and values are validated after loading.

mod model;
mod operations;
pub mod types;

#[cfg(test)]
mod tests;

pub use model::Config;
pub use types::{CONFIG_FILE_NAME, ObserveMode};

//! Request handlers for record operations.

mod items;
mod query;

pub use items::*;
pub use query::*;

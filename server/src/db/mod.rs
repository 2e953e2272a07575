//! PostgreSQL persistence for flat attribute pairs.

mod attributes;
mod pool;

pub use attributes::*;
pub use pool::*;

//! Remote data model: directory entries, tables, variables and values

pub mod index;
pub mod table;
pub mod variable;

pub use index::IndexEntry;
pub use table::Table;
pub use variable::{Value, Variable};

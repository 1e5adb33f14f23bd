#![warn(clippy::uninlined_format_args)]

pub mod json_store;
pub mod memory_store;

pub use json_store::JsonFileExpenseStore;
pub use memory_store::InMemoryExpenseStore;

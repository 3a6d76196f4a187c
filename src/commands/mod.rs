//! CLI command implementations.

pub mod history;
pub mod search;

pub use history::HistoryCommand;
pub use search::{SearchCommand, SearchOutcome};

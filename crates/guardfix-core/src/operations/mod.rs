pub mod file_operations;
pub mod patcher;

pub use patcher::{apply_rules, Applied, Patcher};

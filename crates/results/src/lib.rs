//! Persisted hunt results: the YAML document model, its load/save contract and
//! the printers used by `hunter print`.

mod models;
mod open;
mod report;

pub use models::*;
pub use open::{load, save, write_skeleton, DEFAULT_FILE};
pub use report::{write_csv, write_json, write_jsonl, write_text};

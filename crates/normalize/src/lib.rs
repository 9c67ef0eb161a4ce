//! `acctbook-normalize`: account book normalization engine.
//!
//! Pure engine crate: receives a loaded assignment table, returns a new one
//! with account families consolidated under single owners where the
//! per-owner ceiling allows. CSV helpers live in `table`; no CLI code.

pub mod book;
pub mod config;
pub mod engine;
pub mod error;
pub mod family;
pub mod model;
pub mod summary;
pub mod table;

pub use config::NormalizeConfig;
pub use engine::{normalize, normalize_assignments};
pub use error::NormalizeError;
pub use model::{AccountRow, AssignmentTable, NormalizeResult, NormalizedRow, Outcome};
pub use table::{load_csv_table, write_csv_table};

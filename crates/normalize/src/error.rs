use std::fmt;

#[derive(Debug)]
pub enum NormalizeError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad ceiling, empty column name, etc.).
    ConfigValidation(String),
    /// Ceiling must be a positive integer.
    InvalidCeiling(i64),
    /// Missing required column in the input table.
    MissingColumn { column: String },
    /// Row with an empty account id.
    EmptyAccountId { row: usize },
    /// Same account id on more than one row.
    DuplicateAccount { account_id: String, first_row: usize, row: usize },
    /// Row whose cell count doesn't cover the owner column.
    RowWidth { row: usize, expected: usize, found: usize },
    /// CSV read/write error.
    Csv(String),
}

impl fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::InvalidCeiling(value) => {
                write!(f, "max_accounts_per_csm must be a positive integer, got {value}")
            }
            Self::MissingColumn { column } => write!(f, "input table: missing column '{column}'"),
            Self::EmptyAccountId { row } => write!(f, "row {row}: empty account id"),
            Self::DuplicateAccount { account_id, first_row, row } => {
                write!(f, "row {row}: account '{account_id}' already appears on row {first_row}")
            }
            Self::RowWidth { row, expected, found } => {
                write!(f, "row {row}: expected at least {expected} cells, found {found}")
            }
            Self::Csv(msg) => write!(f, "CSV error: {msg}"),
        }
    }
}

impl std::error::Error for NormalizeError {}

impl From<csv::Error> for NormalizeError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e.to_string())
    }
}

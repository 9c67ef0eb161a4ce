//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 3       | Universal        | File read error                          |
//! | 60-69   | normalize        | Book normalization codes                 |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

// =============================================================================
// Universal (0, 2, 3)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Cannot read an input file (config or CSV).
pub const EXIT_IO: u8 = 3;

// =============================================================================
// Normalize (60-69)
// =============================================================================

/// Config or input table failed validation. Nothing was written.
pub const EXIT_NORMALIZE_INVALID: u8 = 60;

/// Run completed but some accounts have no owner: every owner is at the
/// ceiling. Output files are still written.
pub const EXIT_NORMALIZE_UNASSIGNED: u8 = 61;

/// Cannot write the output CSV or JSON report.
pub const EXIT_NORMALIZE_WRITE: u8 = 62;

//! CLI Exit Code Registry
//!
//! Single source of truth for all CLI exit codes. Exit codes are part of
//! the shell contract — month-close scripts branch on them.
//!
//! | Code | Meaning                                                   |
//! |------|-----------------------------------------------------------|
//! | 0    | Success                                                   |
//! | 1    | General error (unspecified)                               |
//! | 2    | Usage error (bad args, unparseable month)                 |
//! | 3    | Invalid config (TOML parse or validation)                 |
//! | 4    | Run aborted on fatal findings (conflicts, mismatches)     |
//! | 5    | Runtime error (unreadable input, unwritable output)       |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Config file failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// The engine aborted on fatal findings; no output was written.
pub const EXIT_VALIDATION_FAILURE: u8 = 4;

/// Runtime error: unreadable input table, unwritable output, bad CSV.
pub const EXIT_RUNTIME: u8 = 5;

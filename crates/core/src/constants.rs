//! Constants used throughout the rota core crate.
//!
//! Defaults for the patient table layout and the two appended output columns live here so the
//! CLI and the library agree on them.

/// Default 1-based column holding the patient identifier.
pub const DEFAULT_ID_COLUMN: usize = 3;

/// Default field delimiter for patient tables.
pub const DEFAULT_DELIMITER: u8 = b',';

/// Default quote character for patient tables.
pub const DEFAULT_QUOTE: u8 = b'"';

/// Header appended for the round-1 doctor when the patient table has a header row.
pub const ROUND1_COLUMN_NAME: &str = "assigned_doctor_round1";

/// Header appended for the round-2 doctor when the patient table has a header row.
pub const ROUND2_COLUMN_NAME: &str = "assigned_doctor_round2";

/// Suffix of the sibling file the writer fills before renaming it over the output path.
pub const PARTIAL_OUTPUT_SUFFIX: &str = ".partial";

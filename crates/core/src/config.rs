//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup (command line, environment, `.env`) and
//! then passed into the loader, assigner and writer. Nothing in the core reads environment
//! variables itself.

use crate::assigner::SecondRound;
use crate::constants::{
    DEFAULT_DELIMITER, DEFAULT_ID_COLUMN, DEFAULT_QUOTE, ROUND1_COLUMN_NAME, ROUND2_COLUMN_NAME,
};
use crate::{NonEmptyText, RotaError, RotaResult};

/// Core configuration resolved at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoreConfig {
    id_column: usize,
    has_header: bool,
    delimiter: u8,
    quote: u8,
    round1_column: NonEmptyText,
    round2_column: NonEmptyText,
    second_round: SecondRound,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// `id_column` is 1-based, matching how people count spreadsheet columns.
    ///
    /// # Errors
    ///
    /// Returns `RotaError::InvalidConfig` if:
    /// - `id_column` is zero,
    /// - the delimiter or quote is not a single ASCII character, or they are equal,
    /// - either output column name is blank or the two names are equal.
    pub fn new(
        id_column: usize,
        has_header: bool,
        delimiter: char,
        quote: char,
        round1_column: &str,
        round2_column: &str,
        second_round: SecondRound,
    ) -> RotaResult<Self> {
        if id_column == 0 {
            return Err(RotaError::InvalidConfig(
                "id column is 1-based and must be at least 1".into(),
            ));
        }

        let delimiter = ascii_byte(delimiter, "delimiter")?;
        let quote = ascii_byte(quote, "quote")?;
        if delimiter == quote {
            return Err(RotaError::InvalidConfig(
                "delimiter and quote must be different characters".into(),
            ));
        }

        let round1_column = NonEmptyText::new(round1_column)
            .map_err(|_| RotaError::InvalidConfig("round 1 column name cannot be empty".into()))?;
        let round2_column = NonEmptyText::new(round2_column)
            .map_err(|_| RotaError::InvalidConfig("round 2 column name cannot be empty".into()))?;
        if round1_column == round2_column {
            return Err(RotaError::InvalidConfig(
                "round 1 and round 2 column names must differ".into(),
            ));
        }

        Ok(Self {
            id_column,
            has_header,
            delimiter,
            quote,
            round1_column,
            round2_column,
            second_round,
        })
    }

    /// 1-based identifier column.
    pub fn id_column(&self) -> usize {
        self.id_column
    }

    /// 0-based identifier field index within a record.
    pub fn id_index(&self) -> usize {
        self.id_column - 1
    }

    pub fn has_header(&self) -> bool {
        self.has_header
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    pub fn quote(&self) -> u8 {
        self.quote
    }

    pub fn round1_column(&self) -> &NonEmptyText {
        &self.round1_column
    }

    pub fn round2_column(&self) -> &NonEmptyText {
        &self.round2_column
    }

    pub fn second_round(&self) -> SecondRound {
        self.second_round
    }

    /// Returns a copy with a different header mode.
    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Returns a copy with a different round-2 strategy.
    pub fn with_second_round(mut self, second_round: SecondRound) -> Self {
        self.second_round = second_round;
        self
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            id_column: DEFAULT_ID_COLUMN,
            has_header: false,
            delimiter: DEFAULT_DELIMITER,
            quote: DEFAULT_QUOTE,
            round1_column: NonEmptyText::new(ROUND1_COLUMN_NAME)
                .expect("constant column name is non-empty"),
            round2_column: NonEmptyText::new(ROUND2_COLUMN_NAME)
                .expect("constant column name is non-empty"),
            second_round: SecondRound::default(),
        }
    }
}

fn ascii_byte(value: char, what: &str) -> RotaResult<u8> {
    if !value.is_ascii() {
        return Err(RotaError::InvalidConfig(format!(
            "{what} must be a single ASCII character, got {value:?}"
        )));
    }
    if value == '\n' || value == '\r' {
        return Err(RotaError::InvalidConfig(format!(
            "{what} cannot be a line break"
        )));
    }
    Ok(value as u8)
}

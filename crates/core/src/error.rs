use std::path::PathBuf;

/// Which of the two input rosters an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Patients,
    Doctors,
}

impl std::fmt::Display for InputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputKind::Patients => f.write_str("patient"),
            InputKind::Doctors => f.write_str("doctor"),
        }
    }
}

fn join_lines(lines: &[usize]) -> String {
    lines
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, thiserror::Error)]
pub enum RotaError {
    #[error("patient {id} found more than once (lines: {})", join_lines(.lines))]
    DuplicateIdentifier { id: String, lines: Vec<usize> },
    #[error("doctor {name} found more than once (lines: {})", join_lines(.lines))]
    DuplicateName { name: String, lines: Vec<usize> },
    #[error("{0} list is empty")]
    EmptyInput(InputKind),
    #[error("at least two doctors are required so every patient can get a different second doctor")]
    SingleDoctor,
    #[error("line {line}: expected at least {expected} field(s), found {found}")]
    MalformedInput {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: patient identifier is blank")]
    BlankIdentifier { line: usize },
    #[error("balanced second round found no doctor to swap patients of {doctor} with")]
    SecondRoundInfeasible { doctor: String },
    #[error("failed to parse patient table: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to read {path}: {source}", path = path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read doctor list: {0}")]
    DoctorRead(#[source] std::io::Error),
    #[error("failed to write {path}: {source}", path = path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type RotaResult<T> = std::result::Result<T, RotaError>;

/// Stable classification of a [`RotaError`] for scripted callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    DuplicateIdentifier,
    DuplicateName,
    EmptyInput,
    SingleDoctor,
    SecondRoundInfeasible,
    MalformedInput,
    Read,
    Write,
    InvalidConfig,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::DuplicateIdentifier => "duplicate_identifier",
            ErrorKind::DuplicateName => "duplicate_name",
            ErrorKind::EmptyInput => "empty_input",
            ErrorKind::SingleDoctor => "single_doctor",
            ErrorKind::SecondRoundInfeasible => "second_round_infeasible",
            ErrorKind::MalformedInput => "malformed_input",
            ErrorKind::Read => "read",
            ErrorKind::Write => "write",
            ErrorKind::InvalidConfig => "invalid_config",
        }
    }

    /// Process exit status reported by the `rota` binary.
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::InvalidConfig => 2,
            ErrorKind::DuplicateIdentifier => 3,
            ErrorKind::DuplicateName => 4,
            ErrorKind::EmptyInput => 5,
            ErrorKind::SingleDoctor => 6,
            ErrorKind::MalformedInput => 7,
            ErrorKind::Write => 8,
            ErrorKind::Read => 9,
            ErrorKind::SecondRoundInfeasible => 10,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RotaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RotaError::DuplicateIdentifier { .. } => ErrorKind::DuplicateIdentifier,
            RotaError::DuplicateName { .. } => ErrorKind::DuplicateName,
            RotaError::EmptyInput(_) => ErrorKind::EmptyInput,
            RotaError::SingleDoctor => ErrorKind::SingleDoctor,
            RotaError::SecondRoundInfeasible { .. } => ErrorKind::SecondRoundInfeasible,
            RotaError::MalformedInput { .. } | RotaError::BlankIdentifier { .. } => {
                ErrorKind::MalformedInput
            }
            // An I/O failure surfacing through the csv reader is a read failure, not bad data.
            RotaError::Csv(err) if err.is_io_error() => ErrorKind::Read,
            RotaError::Csv(_) => ErrorKind::MalformedInput,
            RotaError::FileRead { .. } | RotaError::DoctorRead(_) => ErrorKind::Read,
            RotaError::Write { .. } => ErrorKind::Write,
            RotaError::InvalidConfig(_) => ErrorKind::InvalidConfig,
        }
    }
}

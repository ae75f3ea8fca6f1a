//! Patient and doctor roster loading.
//!
//! Patients come from a delimited table where one configured column holds a unique identifier;
//! every other field is carried through untouched. Doctors come from a plain list with one name
//! per line. Both loaders reject duplicates and empty rosters before any assignment happens.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use csv::StringRecord;

use crate::{CoreConfig, InputKind, NonEmptyText, PatientId, RotaError, RotaResult};

/// A patient row as read from the input table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patient {
    /// Identifier taken from the configured column.
    pub id: PatientId,
    /// All original fields, unchanged.
    pub record: StringRecord,
    /// 1-based line of the row in the source.
    pub line: usize,
}

/// Validated patient table in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientRoster {
    header: Option<StringRecord>,
    patients: Vec<Patient>,
}

impl PatientRoster {
    pub fn header(&self) -> Option<&StringRecord> {
        self.header.as_ref()
    }

    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Doctor {
    pub name: NonEmptyText,
    /// 1-based line of the name in the source.
    pub line: usize,
}

/// Validated doctor list in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctorRoster {
    doctors: Vec<Doctor>,
}

impl DoctorRoster {
    pub fn doctors(&self) -> &[Doctor] {
        &self.doctors
    }

    pub fn len(&self) -> usize {
        self.doctors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doctors.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &NonEmptyText> {
        self.doctors.iter().map(|d| &d.name)
    }
}

/// Reads and validates the patient table from `reader`.
///
/// # Errors
///
/// - `MalformedInput` if a row has no field at the identifier column,
/// - `BlankIdentifier` if that field is blank,
/// - `DuplicateIdentifier` for the first identifier that occurs more than once,
/// - `EmptyInput(Patients)` if no data rows remain,
/// - `Csv` for unparseable input.
pub fn load_patients<R: Read>(reader: R, cfg: &CoreConfig) -> RotaResult<PatientRoster> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(cfg.has_header())
        .delimiter(cfg.delimiter())
        .quote(cfg.quote())
        .flexible(true)
        .from_reader(reader);

    let header = if cfg.has_header() {
        let header = csv_reader.headers()?.clone();
        if header.is_empty() {
            return Err(RotaError::EmptyInput(InputKind::Patients));
        }
        check_width(&header, cfg, 1)?;
        Some(header)
    } else {
        None
    };

    let id_index = cfg.id_index();
    let mut patients = Vec::new();
    for result in csv_reader.records() {
        let record = result?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(patients.len() + 1);
        check_width(&record, cfg, line)?;

        let id = PatientId::new(&record[id_index])
            .map_err(|_| RotaError::BlankIdentifier { line })?;
        patients.push(Patient { id, record, line });
    }

    if patients.is_empty() {
        return Err(RotaError::EmptyInput(InputKind::Patients));
    }

    let mut duplicates = duplicates(patients.iter().map(|p| (p.id.as_str(), p.line)));
    for (id, lines) in &duplicates {
        tracing::warn!("Patient {} appears on lines {:?}", id, lines);
    }
    if !duplicates.is_empty() {
        let (id, lines) = duplicates.swap_remove(0);
        return Err(RotaError::DuplicateIdentifier { id, lines });
    }

    tracing::debug!("Loaded {} patient rows", patients.len());
    Ok(PatientRoster { header, patients })
}

/// Opens `path` and loads the patient table from it.
pub fn load_patients_from_path(path: &Path, cfg: &CoreConfig) -> RotaResult<PatientRoster> {
    let file = File::open(path).map_err(|source| RotaError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    load_patients(BufReader::new(file), cfg)
}

/// Reads and validates the doctor list from `reader`.
///
/// Names are trimmed and blank lines skipped.
///
/// # Errors
///
/// - `DuplicateName` for the first name listed more than once,
/// - `EmptyInput(Doctors)` if the list has no names,
/// - `DoctorRead` if `reader` fails.
pub fn load_doctors<R: BufRead>(reader: R) -> RotaResult<DoctorRoster> {
    let mut doctors = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(RotaError::DoctorRead)?;
        // Blank lines are the only lines NonEmptyText rejects.
        if let Ok(name) = NonEmptyText::new(&line) {
            doctors.push(Doctor {
                name,
                line: idx + 1,
            });
        }
    }

    if doctors.is_empty() {
        return Err(RotaError::EmptyInput(InputKind::Doctors));
    }

    let mut duplicates = duplicates(doctors.iter().map(|d| (d.name.as_str(), d.line)));
    for (name, lines) in &duplicates {
        tracing::warn!("Doctor {} appears on lines {:?}", name, lines);
    }
    if !duplicates.is_empty() {
        let (name, lines) = duplicates.swap_remove(0);
        return Err(RotaError::DuplicateName { name, lines });
    }

    tracing::debug!("Loaded {} doctors", doctors.len());
    Ok(DoctorRoster { doctors })
}

/// Opens `path` and loads the doctor list from it.
pub fn load_doctors_from_path(path: &Path) -> RotaResult<DoctorRoster> {
    let file = File::open(path).map_err(|source| RotaError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    load_doctors(BufReader::new(file)).map_err(|err| match err {
        RotaError::DoctorRead(source) => RotaError::FileRead {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })
}

fn check_width(record: &StringRecord, cfg: &CoreConfig, line: usize) -> RotaResult<()> {
    if record.len() < cfg.id_column() {
        return Err(RotaError::MalformedInput {
            line,
            expected: cfg.id_column(),
            found: record.len(),
        });
    }
    Ok(())
}

/// Every key that occurs more than once, with all its lines, ordered by first occurrence.
fn duplicates<'a>(
    entries: impl Iterator<Item = (&'a str, usize)>,
) -> Vec<(String, Vec<usize>)> {
    let mut order: Vec<&str> = Vec::new();
    let mut lines_by_key: HashMap<&str, Vec<usize>> = HashMap::new();
    for (key, line) in entries {
        let lines = lines_by_key.entry(key).or_default();
        if lines.is_empty() {
            order.push(key);
        }
        lines.push(line);
    }

    order
        .into_iter()
        .filter_map(|key| {
            let lines = &lines_by_key[key];
            (lines.len() > 1).then(|| (key.to_string(), lines.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn load(input: &str) -> RotaResult<PatientRoster> {
        load_patients(input.as_bytes(), &CoreConfig::default())
    }

    #[test]
    fn loads_rows_in_input_order() {
        let roster = load("Ada,Lovelace,P1\nAlan,Turing,P2,extra\nGrace,Hopper,P3\n").unwrap();

        let ids: Vec<&str> = roster.patients().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["P1", "P2", "P3"]);
        assert_eq!(roster.patients()[1].record.len(), 4);
        assert_eq!(roster.patients()[2].line, 3);
        assert!(roster.header().is_none());
    }

    #[test]
    fn header_row_is_kept_out_of_patients() {
        let cfg = CoreConfig::default().with_header(true);
        let roster = load_patients("first,last,id\nAda,Lovelace,P1\n".as_bytes(), &cfg).unwrap();

        assert_eq!(roster.len(), 1);
        assert_eq!(roster.header().unwrap().get(2), Some("id"));
        assert_eq!(roster.patients()[0].line, 2);
    }

    #[test]
    fn duplicate_identifier_names_value_and_lines() {
        let result = load("a,b,P1\nc,d,P2\ne,f,P1\ng,h,P2\n");

        match result {
            Err(RotaError::DuplicateIdentifier { id, lines }) => {
                assert_eq!(id, "P1");
                assert_eq!(lines, vec![1, 3]);
            }
            other => panic!("expected DuplicateIdentifier, got {other:?}"),
        }
    }

    #[test]
    fn every_duplicated_key_is_collected() {
        let entries = [("P1", 1), ("P2", 2), ("P1", 3), ("P3", 4), ("P2", 5), ("P2", 6)];

        let found = duplicates(entries.into_iter());

        assert_eq!(
            found,
            vec![
                ("P1".to_string(), vec![1, 3]),
                ("P2".to_string(), vec![2, 5, 6]),
            ]
        );
        assert!(duplicates([("P1", 1), ("P2", 2)].into_iter()).is_empty());
    }

    #[test]
    fn identifiers_are_compared_after_trimming() {
        let result = load("a,b,P1\nc,d, P1 \n");
        assert!(matches!(result, Err(RotaError::DuplicateIdentifier { .. })));
    }

    #[test]
    fn short_row_is_malformed() {
        let result = load("a,b,P1\nc,d\n");
        assert!(matches!(
            result,
            Err(RotaError::MalformedInput {
                line: 2,
                expected: 3,
                found: 2
            })
        ));
    }

    #[test]
    fn blank_identifier_is_rejected() {
        let result = load("a,b,P1\nc,d,  \n");
        assert!(matches!(result, Err(RotaError::BlankIdentifier { line: 2 })));
    }

    #[test]
    fn empty_patient_table_is_rejected() {
        assert!(matches!(
            load(""),
            Err(RotaError::EmptyInput(InputKind::Patients))
        ));

        let cfg = CoreConfig::default().with_header(true);
        let header_only = load_patients("first,last,id\n".as_bytes(), &cfg);
        assert!(matches!(
            header_only,
            Err(RotaError::EmptyInput(InputKind::Patients))
        ));
    }

    #[test]
    fn quoted_fields_keep_embedded_delimiters() {
        let roster = load("\"Lovelace, Ada\",x,P1\n").unwrap();
        assert_eq!(roster.patients()[0].record.get(0), Some("Lovelace, Ada"));
    }

    #[test]
    fn doctors_are_trimmed_and_blank_lines_skipped() {
        let roster = load_doctors("  Dr. A \n\n\t\nDr. B\r\n".as_bytes()).unwrap();

        let names: Vec<&str> = roster.names().map(NonEmptyText::as_str).collect();
        assert_eq!(names, ["Dr. A", "Dr. B"]);
        assert_eq!(roster.doctors()[1].line, 4);
    }

    #[test]
    fn duplicate_doctor_is_rejected() {
        let result = load_doctors("Dr. A\nDr. B\n Dr. A\n".as_bytes());

        match result {
            Err(RotaError::DuplicateName { name, lines }) => {
                assert_eq!(name, "Dr. A");
                assert_eq!(lines, vec![1, 3]);
            }
            other => panic!("expected DuplicateName, got {other:?}"),
        }
    }

    #[test]
    fn empty_doctor_list_is_rejected() {
        let result = load_doctors("\n  \n".as_bytes());
        assert!(matches!(result, Err(RotaError::EmptyInput(InputKind::Doctors))));
    }

    #[test]
    fn loading_twice_yields_equal_rosters() {
        let temp = TempDir::new().unwrap();
        let patients = temp.path().join("patients.csv");
        let doctors = temp.path().join("doctors.txt");
        fs::write(&patients, "a,b,P1\nc,d,P2\n").unwrap();
        fs::write(&doctors, "Dr. A\nDr. B\n").unwrap();

        let cfg = CoreConfig::default();
        assert_eq!(
            load_patients_from_path(&patients, &cfg).unwrap(),
            load_patients_from_path(&patients, &cfg).unwrap()
        );
        assert_eq!(
            load_doctors_from_path(&doctors).unwrap(),
            load_doctors_from_path(&doctors).unwrap()
        );
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk went away"))
        }
    }

    #[test]
    fn reader_failure_is_a_doctor_read_error() {
        let result = load_doctors(BufReader::new(FailingReader));

        let err = result.unwrap_err();
        assert!(matches!(err, RotaError::DoctorRead(_)));
        assert_eq!(err.kind(), crate::ErrorKind::Read);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let temp = TempDir::new().unwrap();
        let result = load_doctors_from_path(&temp.path().join("nope.txt"));
        assert!(matches!(result, Err(RotaError::FileRead { .. })));
    }
}

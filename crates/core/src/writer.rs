//! Output of the augmented patient table.
//!
//! Each patient row is written back unchanged, in input order, followed by the round-1 and the
//! round-2 doctor. The output uses the input's delimiter and quote character.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::constants::PARTIAL_OUTPUT_SUFFIX;
use crate::roster::PatientRoster;
use crate::{CoreConfig, RotaAssignment, RotaError, RotaResult};

/// Writes the augmented table to `writer`.
///
/// `path` is only used to label errors.
///
/// # Errors
///
/// Returns `RotaError::Write` if writing or flushing fails, or if a patient has no assignment.
pub fn write_rota<W: Write>(
    writer: W,
    path: &Path,
    roster: &PatientRoster,
    assignment: &RotaAssignment,
    cfg: &CoreConfig,
) -> RotaResult<()> {
    let write_err = |source: std::io::Error| RotaError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(cfg.delimiter())
        .quote(cfg.quote())
        .flexible(true)
        .from_writer(writer);

    if let Some(header) = roster.header() {
        let mut row = header.clone();
        row.push_field(cfg.round1_column().as_str());
        row.push_field(cfg.round2_column().as_str());
        csv_writer.write_record(&row).map_err(|e| write_err(e.into()))?;
    }

    for patient in roster.patients() {
        let (first, second) = assignment.doctors_for(&patient.id).ok_or_else(|| {
            write_err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("patient {} has no assignment", patient.id),
            ))
        })?;

        let mut row = patient.record.clone();
        row.push_field(first.as_str());
        row.push_field(second.as_str());
        csv_writer.write_record(&row).map_err(|e| write_err(e.into()))?;
    }

    csv_writer.flush().map_err(write_err)?;
    Ok(())
}

/// Writes the augmented table to `path`.
///
/// Rows go to a sibling `<name>.partial` file which is renamed over `path` only after every
/// row is flushed, so a failed run never leaves a truncated table behind.
pub fn write_rota_to_path(
    path: &Path,
    roster: &PatientRoster,
    assignment: &RotaAssignment,
    cfg: &CoreConfig,
) -> RotaResult<()> {
    let partial = partial_path(path);
    let result = write_partial(&partial, path, roster, assignment, cfg).and_then(|()| {
        fs::rename(&partial, path).map_err(|source| RotaError::Write {
            path: path.to_path_buf(),
            source,
        })
    });

    if result.is_err() {
        if let Err(cleanup) = fs::remove_file(&partial) {
            if cleanup.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    "Could not remove partial output {}: {}",
                    partial.display(),
                    cleanup
                );
            }
        }
    }
    result
}

fn write_partial(
    partial: &Path,
    path: &Path,
    roster: &PatientRoster,
    assignment: &RotaAssignment,
    cfg: &CoreConfig,
) -> RotaResult<()> {
    let file = File::create(partial).map_err(|source| RotaError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    write_rota(&mut writer, path, roster, assignment, cfg)?;
    let file = writer.into_inner().map_err(|e| RotaError::Write {
        path: path.to_path_buf(),
        source: e.into_error(),
    })?;
    file.sync_all().map_err(|source| RotaError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("rota"));
    name.push(PARTIAL_OUTPUT_SUFFIX);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assigner::{assign, SecondRound};
    use crate::roster::load_patients;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    fn doctors() -> Vec<crate::roster::Doctor> {
        crate::roster::load_doctors("Dr. A\nDr. B\nDr. C\n".as_bytes())
            .unwrap()
            .doctors()
            .to_vec()
    }

    fn rota_for(input: &str, cfg: &CoreConfig) -> (PatientRoster, RotaAssignment) {
        let roster = load_patients(input.as_bytes(), cfg).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let rota =
            assign(roster.patients(), &doctors(), SecondRound::Independent, &mut rng).unwrap();
        (roster, rota)
    }

    fn render(roster: &PatientRoster, rota: &RotaAssignment, cfg: &CoreConfig) -> String {
        let mut out = Vec::new();
        write_rota(&mut out, Path::new("memory"), roster, rota, cfg).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn appends_two_columns_in_input_order() {
        let cfg = CoreConfig::default();
        let (roster, rota) = rota_for("Ada,Lovelace,P1\nAlan,Turing,P2\nGrace,Hopper,P3\n", &cfg);

        let output = render(&roster, &rota, &cfg);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);

        for (line, patient) in lines.iter().zip(roster.patients()) {
            let fields: Vec<&str> = line.split(',').collect();
            assert_eq!(fields.len(), 5);
            assert_eq!(&fields[..3], patient.record.iter().collect::<Vec<_>>().as_slice());
            let (first, second) = rota.doctors_for(&patient.id).unwrap();
            assert_eq!(fields[3], first.as_str());
            assert_eq!(fields[4], second.as_str());
        }
    }

    #[test]
    fn header_gets_column_names() {
        let cfg = CoreConfig::default().with_header(true);
        let (roster, rota) = rota_for("first,last,id\nAda,Lovelace,P1\n", &cfg);

        let output = render(&roster, &rota, &cfg);
        assert_eq!(
            output.lines().next(),
            Some("first,last,id,assigned_doctor_round1,assigned_doctor_round2")
        );
    }

    #[test]
    fn keeps_delimiter_and_quoting() {
        let cfg = CoreConfig::new(1, false, ';', '"', "d1", "d2", SecondRound::Independent).unwrap();
        let (roster, rota) = rota_for("P1;\"Lovelace; Ada\"\n", &cfg);

        let output = render(&roster, &rota, &cfg);
        assert!(output.starts_with("P1;\"Lovelace; Ada\";Dr. "));
    }

    #[test]
    fn write_to_path_replaces_file_atomically() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("rota.csv");
        fs::write(&out, "stale").unwrap();

        let cfg = CoreConfig::default();
        let (roster, rota) = rota_for("a,b,P1\nc,d,P2\n", &cfg);
        write_rota_to_path(&out, &roster, &rota, &cfg).unwrap();

        let written = fs::read_to_string(&out).unwrap();
        assert_eq!(written.lines().count(), 2);
        assert!(!temp.path().join("rota.csv.partial").exists());
    }

    #[test]
    fn unwritable_destination_is_a_write_error() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("missing-dir").join("rota.csv");

        let cfg = CoreConfig::default();
        let (roster, rota) = rota_for("a,b,P1\n", &cfg);
        let result = write_rota_to_path(&out, &roster, &rota, &cfg);

        assert!(matches!(result, Err(RotaError::Write { .. })));
        assert!(!out.exists());
    }

    #[test]
    fn partial_path_is_a_sibling() {
        assert_eq!(
            partial_path(Path::new("/tmp/out/rota.csv")),
            PathBuf::from("/tmp/out/rota.csv.partial")
        );
    }
}

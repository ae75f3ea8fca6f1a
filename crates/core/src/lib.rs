//! # Rota Core
//!
//! Core logic for distributing patients over doctors twice.
//!
//! This crate contains the whole batch pipeline:
//! - [`roster`]: loading and validating the patient table and the doctor list
//! - [`assigner`]: the two-round assignment (even round 1, no-repeat round 2)
//! - [`writer`]: writing the patient table back with two doctor columns appended
//!
//! **No CLI concerns**: argument parsing, environment lookups and logging setup belong in the
//! `rota` binary. The core only receives a resolved [`CoreConfig`] and an explicit random
//! number generator.

pub mod assigner;
pub mod config;
pub mod constants;
pub mod error;
pub mod roster;
pub mod writer;

use std::path::Path;

use rand::Rng;

pub use assigner::{assign, DistributionReport, DoctorLoad, RotaAssignment, SecondRound};
pub use config::CoreConfig;
pub use error::{ErrorKind, InputKind, RotaError, RotaResult};
pub use roster::{Doctor, DoctorRoster, Patient, PatientRoster};
pub use rota_types::{NonEmptyText, PatientId, TextError};

/// Result of a completed run.
#[derive(Debug)]
pub struct RotaOutcome {
    pub patients: PatientRoster,
    pub doctors: DoctorRoster,
    pub assignment: RotaAssignment,
}

impl RotaOutcome {
    pub fn report(&self) -> DistributionReport {
        self.assignment.report(self.doctors.doctors())
    }
}

/// Runs the load, assign and write steps with one configuration.
#[derive(Clone, Debug)]
pub struct RotaService {
    cfg: std::sync::Arc<CoreConfig>,
}

impl RotaService {
    /// Creates a new `RotaService` bound to a resolved configuration.
    pub fn new(cfg: std::sync::Arc<CoreConfig>) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    /// Loads both rosters, assigns both rounds and writes the augmented table to `output`.
    ///
    /// The output file is only created once every step has succeeded.
    ///
    /// # Errors
    ///
    /// Any [`RotaError`]; nothing is written when an error is returned.
    pub fn run<R: Rng>(
        &self,
        patients_path: &Path,
        doctors_path: &Path,
        output_path: &Path,
        rng: &mut R,
    ) -> RotaResult<RotaOutcome> {
        let doctors = roster::load_doctors_from_path(doctors_path)?;
        let patients = roster::load_patients_from_path(patients_path, &self.cfg)?;
        tracing::info!(
            "Loaded {} patients from {} and {} doctors from {}",
            patients.len(),
            patients_path.display(),
            doctors.len(),
            doctors_path.display()
        );

        let assignment = assign(
            patients.patients(),
            doctors.doctors(),
            self.cfg.second_round(),
            rng,
        )?;

        let outcome = RotaOutcome {
            patients,
            doctors,
            assignment,
        };
        for load in outcome.report().doctors {
            tracing::info!(
                "{}: {} patient(s) in round 1, {} in round 2",
                load.doctor,
                load.round1,
                load.round2
            );
        }

        writer::write_rota_to_path(
            output_path,
            &outcome.patients,
            &outcome.assignment,
            &self.cfg,
        )?;
        tracing::info!("Wrote {}", output_path.display());

        Ok(outcome)
    }
}

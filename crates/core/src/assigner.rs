//! Two-round patient to doctor assignment.
//!
//! Round 1 spreads patients as evenly as possible: every doctor gets `floor(N/D)` or
//! `ceil(N/D)` patients, which doctors get the extra patient is drawn at random, and the patient
//! order is shuffled before slots are handed out.
//!
//! Round 2 moves every patient to a doctor other than their round-1 doctor. By default each
//! patient draws uniformly from the remaining doctors; [`SecondRound::Balanced`] additionally
//! keeps round 2 as even as round 1.
//!
//! All randomness comes from the caller's generator, so a seeded generator gives a reproducible
//! rota.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::roster::{Doctor, Patient};
use crate::{InputKind, NonEmptyText, PatientId, RotaError, RotaResult};

/// How the second round picks a new doctor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SecondRound {
    /// Each patient independently draws one of the other doctors.
    #[default]
    Independent,
    /// Round 2 counts are also `floor(N/D)` or `ceil(N/D)` per doctor.
    Balanced,
}

/// Both rounds of a rota, keyed by patient identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotaAssignment {
    first: BTreeMap<PatientId, NonEmptyText>,
    second: BTreeMap<PatientId, NonEmptyText>,
}

impl RotaAssignment {
    pub fn first(&self) -> &BTreeMap<PatientId, NonEmptyText> {
        &self.first
    }

    pub fn second(&self) -> &BTreeMap<PatientId, NonEmptyText> {
        &self.second
    }

    pub fn len(&self) -> usize {
        self.first.len()
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_empty()
    }

    /// Round 1 and round 2 doctor for a patient.
    pub fn doctors_for(&self, id: &PatientId) -> Option<(&NonEmptyText, &NonEmptyText)> {
        Some((self.first.get(id)?, self.second.get(id)?))
    }

    /// Per-doctor patient counts for both rounds, in doctor list order.
    pub fn report(&self, doctors: &[Doctor]) -> DistributionReport {
        let mut loads: Vec<DoctorLoad> = doctors
            .iter()
            .map(|d| DoctorLoad {
                doctor: d.name.clone(),
                round1: 0,
                round2: 0,
            })
            .collect();
        let position: BTreeMap<&str, usize> = doctors
            .iter()
            .enumerate()
            .map(|(idx, d)| (d.name.as_str(), idx))
            .collect();

        for name in self.first.values() {
            if let Some(&idx) = position.get(name.as_str()) {
                loads[idx].round1 += 1;
            }
        }
        for name in self.second.values() {
            if let Some(&idx) = position.get(name.as_str()) {
                loads[idx].round2 += 1;
            }
        }

        DistributionReport {
            patients: self.len(),
            doctors: loads,
        }
    }
}

/// Patient counts per doctor, as printed by `rota --summary`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistributionReport {
    pub patients: usize,
    pub doctors: Vec<DoctorLoad>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoctorLoad {
    pub doctor: NonEmptyText,
    pub round1: usize,
    pub round2: usize,
}

impl DistributionReport {
    /// Largest minus smallest round-1 count.
    pub fn round1_spread(&self) -> usize {
        spread(self.doctors.iter().map(|d| d.round1))
    }

    /// Largest minus smallest round-2 count.
    pub fn round2_spread(&self) -> usize {
        spread(self.doctors.iter().map(|d| d.round2))
    }
}

fn spread(counts: impl Iterator<Item = usize> + Clone) -> usize {
    let max = counts.clone().max().unwrap_or(0);
    let min = counts.min().unwrap_or(0);
    max - min
}

/// Assigns every patient a round-1 and a round-2 doctor.
///
/// # Errors
///
/// - `EmptyInput` if there are no patients or no doctors,
/// - `SingleDoctor` if only one doctor is listed, since round 2 could not differ from round 1.
/// - `SecondRoundInfeasible` if the balanced round cannot move a patient off their doctor.
pub fn assign<R: Rng>(
    patients: &[Patient],
    doctors: &[Doctor],
    second_round: SecondRound,
    rng: &mut R,
) -> RotaResult<RotaAssignment> {
    if patients.is_empty() {
        return Err(RotaError::EmptyInput(InputKind::Patients));
    }
    match doctors.len() {
        0 => return Err(RotaError::EmptyInput(InputKind::Doctors)),
        1 => return Err(RotaError::SingleDoctor),
        _ => {}
    }

    let (first, first_counts) = first_round(patients.len(), doctors.len(), rng);
    let second = match second_round {
        SecondRound::Independent => independent_second_round(&first, doctors.len(), rng),
        SecondRound::Balanced => balanced_second_round(&first, &first_counts, rng)
            .map_err(|doctor| RotaError::SecondRoundInfeasible {
                doctor: doctors[doctor].name.to_string(),
            })?,
    };
    tracing::debug!(
        "Assigned {} patients to {} doctors ({:?} second round)",
        patients.len(),
        doctors.len(),
        second_round
    );

    let name_of = |idx: usize| doctors[idx].name.clone();
    Ok(RotaAssignment {
        first: patients
            .iter()
            .zip(&first)
            .map(|(p, &d)| (p.id.clone(), name_of(d)))
            .collect(),
        second: patients
            .iter()
            .zip(&second)
            .map(|(p, &d)| (p.id.clone(), name_of(d)))
            .collect(),
    })
}

/// Returns the doctor index for each patient (input order) and the per-doctor counts.
fn first_round<R: Rng>(
    patients: usize,
    doctors: usize,
    rng: &mut R,
) -> (Vec<usize>, Vec<usize>) {
    let counts = even_counts(patients, doctors, None, rng);
    let slots = slot_sequence(&counts);

    let mut order: Vec<usize> = (0..patients).collect();
    order.shuffle(rng);

    let mut assigned = vec![0; patients];
    for (&patient, &doctor) in order.iter().zip(&slots) {
        assigned[patient] = doctor;
    }
    (assigned, counts)
}

fn independent_second_round<R: Rng>(first: &[usize], doctors: usize, rng: &mut R) -> Vec<usize> {
    first
        .iter()
        .map(|&excluded| {
            // Draw from the D - 1 other doctors, skipping over the excluded index.
            let pick = rng.gen_range(0..doctors - 1);
            if pick >= excluded {
                pick + 1
            } else {
                pick
            }
        })
        .collect()
}

/// Even second round with no patient kept on their round-1 doctor.
///
/// A repeat can always be swapped away as long as every doctor `a` satisfies
/// `round1[a] + round2[a] <= N`; handing the round-2 extras to doctors without a round-1 extra
/// guarantees that for any `D >= 2`. A repeat with no partner is returned as `Err(doctor)`.
fn balanced_second_round<R: Rng>(
    first: &[usize],
    first_counts: &[usize],
    rng: &mut R,
) -> Result<Vec<usize>, usize> {
    let patients = first.len();
    let counts = even_counts(patients, first_counts.len(), Some(first_counts), rng);
    let mut second = slot_sequence(&counts);
    second.shuffle(rng);

    for p in 0..patients {
        let own = first[p];
        if second[p] != own {
            continue;
        }
        // Scan from a random offset; most patients qualify, so the scan is short.
        let start = rng.gen_range(0..patients);
        let q = (0..patients)
            .map(|k| (start + k) % patients)
            .find(|&q| second[q] != own && first[q] != own)
            .ok_or(own)?;
        second.swap(p, q);
    }
    Ok(second)
}

/// `floor(N/D)` per doctor plus one extra for `N mod D` randomly chosen doctors.
///
/// With `avoid_extra`, doctors whose count there exceeds the base are only chosen for an extra
/// once every other doctor already has one.
fn even_counts<R: Rng>(
    patients: usize,
    doctors: usize,
    avoid_extra: Option<&[usize]>,
    rng: &mut R,
) -> Vec<usize> {
    let base = patients / doctors;
    let extra = patients % doctors;

    let mut order: Vec<usize> = (0..doctors).collect();
    order.shuffle(rng);
    if let Some(previous) = avoid_extra {
        // Stable sort keeps the shuffled order within each group.
        order.sort_by_key(|&d| previous[d] > base);
    }

    let mut counts = vec![base; doctors];
    for &d in order.iter().take(extra) {
        counts[d] += 1;
    }
    counts
}

fn slot_sequence(counts: &[usize]) -> Vec<usize> {
    counts
        .iter()
        .enumerate()
        .flat_map(|(doctor, &count)| std::iter::repeat(doctor).take(count))
        .collect()
}

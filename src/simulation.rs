//! Simulation Module
//!
//! Seeded synthetic data for demos and tests:
//! - Heart-disease style cohort tables (Typical, Athletic, Diver)
//! - Heart-rate streams with an optional mean shift

use crate::core::{Error, Result};
use crate::data::{CohortDataset, Column, DataTable, FeatureSchema};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Target column written by [`cohort_table`].
pub const TARGET_COLUMN: &str = "num";

/// Synthetic population a cohort is drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CohortProfile {
    Typical,
    Athletic,
    Diver,
}

/// Per-profile feature distributions as (mean, sd).
struct Vitals {
    age: (f64, f64),
    trestbps: (f64, f64),
    chol: (f64, f64),
    thalch: (f64, f64),
    male_rate: f64,
    risk_offset: f64,
}

impl CohortProfile {
    /// All profiles in canonical order.
    pub fn all() -> [CohortProfile; 3] {
        [CohortProfile::Typical, CohortProfile::Athletic, CohortProfile::Diver]
    }

    /// Cohort name.
    pub fn name(&self) -> &'static str {
        match self {
            CohortProfile::Typical => "Typical",
            CohortProfile::Athletic => "Athletic",
            CohortProfile::Diver => "Diver",
        }
    }

    fn vitals(&self) -> Vitals {
        match self {
            CohortProfile::Typical => Vitals {
                age: (55.0, 9.0),
                trestbps: (132.0, 17.0),
                chol: (245.0, 50.0),
                thalch: (140.0, 22.0),
                male_rate: 0.65,
                risk_offset: 0.3,
            },
            CohortProfile::Athletic => Vitals {
                age: (40.0, 10.0),
                trestbps: (120.0, 12.0),
                chol: (200.0, 35.0),
                thalch: (165.0, 15.0),
                male_rate: 0.55,
                risk_offset: -0.4,
            },
            CohortProfile::Diver => Vitals {
                age: (45.0, 8.0),
                trestbps: (128.0, 14.0),
                chol: (225.0, 40.0),
                thalch: (150.0, 18.0),
                male_rate: 0.7,
                risk_offset: 0.0,
            },
        }
    }
}

impl std::fmt::Display for CohortProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CohortProfile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CohortProfile::all()
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnknownCohort(s.to_string()))
    }
}

/// Schema of the simulated cohort tables, with the sex vocabulary pinned so
/// every cohort encodes to the same width.
pub fn heart_schema() -> FeatureSchema {
    FeatureSchema::new(&["age", "trestbps", "chol", "thalch"], &["sex"])
        .with_categories("sex", &["Female", "Male"])
}

/// One standard-normal draw (Box-Muller).
pub fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

struct Draw {
    age: Vec<f64>,
    sex: Vec<&'static str>,
    trestbps: Vec<f64>,
    chol: Vec<f64>,
    thalch: Vec<f64>,
    severity: Vec<f64>,
}

fn draw(profile: CohortProfile, rows: usize, seed: u64) -> Result<Draw> {
    if rows < 2 {
        return Err(Error::Config(format!(
            "a simulated cohort needs at least 2 rows, got {}",
            rows
        )));
    }

    let v = profile.vitals();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Draw {
        age: Vec::with_capacity(rows),
        sex: Vec::with_capacity(rows),
        trestbps: Vec::with_capacity(rows),
        chol: Vec::with_capacity(rows),
        thalch: Vec::with_capacity(rows),
        severity: Vec::with_capacity(rows),
    };

    for i in 0..rows {
        let age = (v.age.0 + v.age.1 * gaussian(&mut rng)).round().clamp(18.0, 90.0);
        let trestbps = (v.trestbps.0 + v.trestbps.1 * gaussian(&mut rng)).round();
        let chol = (v.chol.0 + v.chol.1 * gaussian(&mut rng)).round().max(100.0);
        let thalch = (v.thalch.0 + v.thalch.1 * gaussian(&mut rng)).round();
        // Both sexes and both classes are always present.
        let male = match i {
            0 => true,
            1 => false,
            _ => rng.gen::<f64>() < v.male_rate,
        };

        let logit = 0.06 * (age - 50.0) + 0.02 * (trestbps - 130.0) + 0.01 * (chol - 230.0)
            - 0.04 * (thalch - 150.0)
            + if male { 0.5 } else { 0.0 }
            + v.risk_offset;
        let positive = match i {
            0 => true,
            1 => false,
            _ => rng.gen::<f64>() < sigmoid(logit),
        };
        let severity = if positive { rng.gen_range(1..=4) as f64 } else { 0.0 };

        out.age.push(age);
        out.sex.push(if male { "Male" } else { "Female" });
        out.trestbps.push(trestbps);
        out.chol.push(chol);
        out.thalch.push(thalch);
        out.severity.push(severity);
    }

    Ok(out)
}

/// Raw cohort table including the `num` severity target (0 means healthy).
pub fn cohort_table(profile: CohortProfile, rows: usize, seed: u64) -> Result<DataTable> {
    let d = draw(profile, rows, seed)?;
    DataTable::new(vec![
        Column::numeric("age", d.age),
        Column::categorical("sex", d.sex),
        Column::numeric("trestbps", d.trestbps),
        Column::numeric("chol", d.chol),
        Column::numeric("thalch", d.thalch),
        Column::numeric(TARGET_COLUMN, d.severity),
    ])
}

/// Cohort dataset with binary labels derived from the target.
pub fn cohort_dataset(profile: CohortProfile, rows: usize, seed: u64) -> Result<CohortDataset> {
    let table = cohort_table(profile, rows, seed)?;
    CohortDataset::from_table(profile.name(), table, TARGET_COLUMN)
}

/// Heart-rate readings drawn from N(mean, sd), with `shift` added to every
/// reading from index `shift_at` on.
pub fn heart_rate_stream(
    len: usize,
    mean: f64,
    sd: f64,
    shift_at: usize,
    shift: f64,
    seed: u64,
) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len)
        .map(|i| {
            let base = mean + sd * gaussian(&mut rng);
            if i >= shift_at {
                base + shift
            } else {
                base
            }
        })
        .collect()
}

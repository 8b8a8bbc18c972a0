//! Seeded synthetic pregnancy vitals with rule-based risk labels.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::Serialize;
use tracing::info;

use crate::DataError;

/// One set of unrounded vital-sign measurements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vitals {
    pub age: f64,
    pub systolic_bp: f64,
    pub diastolic_bp: f64,
    pub blood_sugar: f64,
    pub body_temp: f64,
    pub heart_rate: f64,
}

/// Scores vitals with the fixed point rule.
///
/// | Condition | Points |
/// |-----------|--------|
/// | age outside [20, 35] | 1 |
/// | systolic > 140 or diastolic > 90 | 2 |
/// | blood sugar > 125 | 2 |
/// | body temperature outside [97, 100.4] | 1 |
/// | heart rate outside [60, 100] | 1 |
pub fn risk_points(v: &Vitals) -> u32 {
    let mut points = 0;
    if v.age < 20.0 || v.age > 35.0 {
        points += 1;
    }
    if v.systolic_bp > 140.0 || v.diastolic_bp > 90.0 {
        points += 2;
    }
    if v.blood_sugar > 125.0 {
        points += 2;
    }
    if v.body_temp > 100.4 || v.body_temp < 97.0 {
        points += 1;
    }
    if v.heart_rate > 100.0 || v.heart_rate < 60.0 {
        points += 1;
    }
    points
}

/// Label for a point total: 4+ is high, 2+ is mid, otherwise low.
pub fn risk_label(points: u32) -> &'static str {
    match points {
        p if p >= 4 => "high risk",
        p if p >= 2 => "mid risk",
        _ => "low risk",
    }
}

/// A persisted synthetic row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyntheticRow {
    #[serde(rename = "Age")]
    pub age: i64,
    #[serde(rename = "SystolicBP")]
    pub systolic_bp: i64,
    #[serde(rename = "DiastolicBP")]
    pub diastolic_bp: i64,
    #[serde(rename = "BS")]
    pub blood_sugar: f64,
    #[serde(rename = "BodyTemp")]
    pub body_temp: f64,
    #[serde(rename = "HeartRate")]
    pub heart_rate: i64,
    #[serde(rename = "RiskLevel")]
    pub risk_level: &'static str,
}

impl SyntheticRow {
    fn from_vitals(v: &Vitals) -> Self {
        Self {
            age: v.age.round() as i64,
            systolic_bp: v.systolic_bp.round() as i64,
            diastolic_bp: v.diastolic_bp.round() as i64,
            blood_sugar: round1(v.blood_sugar),
            body_temp: round1(v.body_temp),
            heart_rate: v.heart_rate.round() as i64,
            risk_level: risk_label(risk_points(v)),
        }
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

struct VitalsSampler {
    age: Normal<f64>,
    systolic_bp: Normal<f64>,
    diastolic_bp: Normal<f64>,
    blood_sugar: Normal<f64>,
    body_temp: Normal<f64>,
    heart_rate: Normal<f64>,
}

impl VitalsSampler {
    fn new() -> Result<Self, DataError> {
        Ok(Self {
            age: Normal::new(28.0, 6.0)?,
            systolic_bp: Normal::new(125.0, 15.0)?,
            diastolic_bp: Normal::new(82.0, 10.0)?,
            blood_sugar: Normal::new(95.0, 20.0)?,
            body_temp: Normal::new(98.6, 0.8)?,
            heart_rate: Normal::new(85.0, 12.0)?,
        })
    }

    fn sample(&self, rng: &mut StdRng) -> Vitals {
        Vitals {
            age: self.age.sample(rng).clamp(15.0, 45.0),
            systolic_bp: self.systolic_bp.sample(rng),
            diastolic_bp: self.diastolic_bp.sample(rng),
            blood_sugar: self.blood_sugar.sample(rng),
            body_temp: self.body_temp.sample(rng),
            heart_rate: self.heart_rate.sample(rng),
        }
    }
}

/// Generates `samples` labeled rows from a fixed seed.
pub fn generate(seed: u64, samples: usize) -> Result<Vec<SyntheticRow>, DataError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let sampler = VitalsSampler::new()?;
    Ok((0..samples)
        .map(|_| SyntheticRow::from_vitals(&sampler.sample(&mut rng)))
        .collect())
}

/// Counts rows per risk label.
pub fn label_distribution(rows: &[SyntheticRow]) -> BTreeMap<&'static str, usize> {
    rows.iter().fold(BTreeMap::new(), |mut acc, row| {
        *acc.entry(row.risk_level).or_insert(0) += 1;
        acc
    })
}

/// Writes rows as CSV with a header, creating parent directories.
pub fn write_csv(path: &Path, rows: &[SyntheticRow]) -> Result<(), DataError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| DataError::io(parent, e))?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(|e| DataError::io(path, e))?;
    Ok(())
}

/// Creates the synthetic dataset at `path` unless a file already exists.
///
/// Returns `true` when a new file was written.
pub fn ensure_sample_data(path: &Path, seed: u64, samples: usize) -> Result<bool, DataError> {
    if path.exists() {
        return Ok(false);
    }

    info!("Creating sample pregnancy data...");
    let rows = generate(seed, samples)?;
    write_csv(path, &rows)?;

    info!("Sample data created with {} records", rows.len());
    for (label, count) in label_distribution(&rows) {
        info!("  - {}: {}", label, count);
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Dataset, TARGET_COLUMN};

    fn vitals() -> Vitals {
        Vitals {
            age: 28.0,
            systolic_bp: 120.0,
            diastolic_bp: 80.0,
            blood_sugar: 90.0,
            body_temp: 98.6,
            heart_rate: 80.0,
        }
    }

    #[test]
    fn elevated_bp_and_sugar_is_high_risk() {
        let v = Vitals {
            age: 30.0,
            systolic_bp: 150.0,
            diastolic_bp: 95.0,
            blood_sugar: 130.0,
            ..vitals()
        };
        assert_eq!(risk_points(&v), 4);
        assert_eq!(risk_label(risk_points(&v)), "high risk");
    }

    #[test]
    fn rule_boundaries_are_exclusive() {
        let v = Vitals {
            age: 35.0,
            systolic_bp: 140.0,
            diastolic_bp: 90.0,
            blood_sugar: 125.0,
            body_temp: 100.4,
            heart_rate: 100.0,
        };
        assert_eq!(risk_points(&v), 0);

        let v = Vitals { age: 19.9, heart_rate: 59.0, ..vitals() };
        assert_eq!(risk_points(&v), 2);
        assert_eq!(risk_label(2), "mid risk");
        assert_eq!(risk_label(1), "low risk");
    }

    #[test]
    fn generation_is_deterministic_and_bounded() {
        let a = generate(42, 200).unwrap();
        let b = generate(42, 200).unwrap();
        assert_eq!(a, b);
        assert!(a.iter().all(|r| (15..=45).contains(&r.age)));
        assert_ne!(a, generate(7, 200).unwrap());
    }

    #[test]
    fn same_seed_writes_identical_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("one/pregnancy_data.csv");
        let second = dir.path().join("two/pregnancy_data.csv");

        assert!(ensure_sample_data(&first, 42, 1000).unwrap());
        assert!(ensure_sample_data(&second, 42, 1000).unwrap());

        assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
    }

    #[test]
    fn existing_file_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "keep me").unwrap();

        assert!(!ensure_sample_data(&path, 42, 10).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "keep me");
    }

    #[test]
    fn written_file_has_expected_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        ensure_sample_data(&path, 42, 50).unwrap();

        let ds = Dataset::from_csv(&path).unwrap();
        assert_eq!(
            ds.columns,
            ["Age", "SystolicBP", "DiastolicBP", "BS", "BodyTemp", "HeartRate", "RiskLevel"]
        );
        assert_eq!(ds.len(), 50);
        assert!(ds
            .column(TARGET_COLUMN)
            .unwrap()
            .iter()
            .all(|l| ["low risk", "mid risk", "high risk"].contains(l)));
    }
}

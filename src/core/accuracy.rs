/*!
 * Accuracy assessment of point-month water verdicts against ground truth.
 *
 * Classes are indexed 0 = not water, 1 = water. Rows of the confusion
 * matrix are the ground truth (ACTUAL), columns the classifier (PREDICTION).
 *
 * Based on:
 * - Congalton, R. G. (1991). A review of assessing the accuracy of
 *   classifications of remotely sensed data. Remote Sens. Environ.
 */

use crate::types::{SampleRecord, WofsError, WofsResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const NOT_WATER: usize = 0;
pub const WATER: usize = 1;

/// 2x2 contingency table, `cells[actual][predicted]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub cells: [[u64; 2]; 2],
}

impl ConfusionMatrix {
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (bool, bool)>,
    {
        let mut matrix = Self::default();
        for (actual, predicted) in pairs {
            matrix.add(actual, predicted);
        }
        matrix
    }

    pub fn add(&mut self, actual: bool, predicted: bool) {
        self.cells[actual as usize][predicted as usize] += 1;
    }

    pub fn cell(&self, actual: usize, predicted: usize) -> u64 {
        self.cells[actual][predicted]
    }

    pub fn row_total(&self, class: usize) -> u64 {
        self.cells[class].iter().sum()
    }

    pub fn col_total(&self, class: usize) -> u64 {
        self.cells[0][class] + self.cells[1][class]
    }

    pub fn grand_total(&self) -> u64 {
        self.row_total(NOT_WATER) + self.row_total(WATER)
    }

    /// Correct / ground-truth total for the class, in percent (NaN if no such truth)
    pub fn producers_accuracy(&self, class: usize) -> f64 {
        percent(self.cells[class][class], self.row_total(class))
    }

    /// Correct / predicted total for the class, in percent (NaN if never predicted)
    pub fn users_accuracy(&self, class: usize) -> f64 {
        percent(self.cells[class][class], self.col_total(class))
    }

    pub fn overall_accuracy(&self) -> f64 {
        percent(self.cells[0][0] + self.cells[1][1], self.grand_total())
    }

    /// Harmonic mean of user's and producer's accuracy for one class, as a fraction
    pub fn accuracy_f1(&self, class: usize) -> f64 {
        let users = self.users_accuracy(class);
        let producers = self.producers_accuracy(class);
        2.0 * users * producers / (users + producers) / 100.0
    }
}

fn percent(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        f64::NAN
    } else {
        numerator as f64 / denominator as f64 * 100.0
    }
}

/// Standard binary F1 score with water as the positive class.
///
/// Returns 0.0 when there are no true positives, false positives or false
/// negatives at all.
pub fn binary_f1_score(pairs: &[(bool, bool)]) -> f64 {
    let mut tp = 0u64;
    let mut fp = 0u64;
    let mut fn_ = 0u64;
    for &(actual, predicted) in pairs {
        match (actual, predicted) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => {}
        }
    }

    let denominator = 2 * tp + fp + fn_;
    if denominator == 0 {
        0.0
    } else {
        (2 * tp) as f64 / denominator as f64
    }
}

/// A named set of calendar months
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    pub name: String,
    pub months: BTreeSet<u32>,
}

impl Season {
    pub fn new<I>(name: &str, months: I) -> WofsResult<Self>
    where
        I: IntoIterator<Item = u32>,
    {
        let months: BTreeSet<u32> = months.into_iter().collect();
        if let Some(bad) = months.iter().find(|m| !(1..=12).contains(*m)) {
            return Err(WofsError::Config(format!("season '{}' has invalid month {}", name, bad)));
        }
        Ok(Self { name: name.to_string(), months })
    }

    pub fn contains(&self, month: u32) -> bool {
        self.months.contains(&month)
    }
}

/// Wet season and its complement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonPartition {
    pub wet: Season,
    pub dry: Season,
}

impl SeasonPartition {
    pub fn new<I>(wet_months: I) -> WofsResult<Self>
    where
        I: IntoIterator<Item = u32>,
    {
        let wet = Season::new("wet", wet_months)?;
        let dry = Season::new("dry", (1..=12).filter(|m| !wet.contains(*m)))?;
        Ok(Self { wet, dry })
    }

    pub fn seasons(&self) -> [&Season; 2] {
        [&self.wet, &self.dry]
    }
}

/// Accuracy metrics for one season
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccuracyReport {
    pub season: String,
    pub matrix: ConfusionMatrix,
    /// Indexed by class (0 = not water, 1 = water), percent
    pub producers_accuracy: [f64; 2],
    /// Indexed by class, percent
    pub users_accuracy: [f64; 2],
    /// Percent
    pub overall_accuracy: f64,
    /// Not-water F1 from the matrix's user's/producer's accuracies
    pub f1_not_water_from_matrix: f64,
    /// Standard F1 over the raw label pairs, water positive
    pub f1_water: f64,
    pub samples: usize,
}

impl AccuracyReport {
    pub fn from_pairs(season: &str, pairs: &[(bool, bool)]) -> Self {
        let matrix = ConfusionMatrix::from_pairs(pairs.iter().copied());
        Self {
            season: season.to_string(),
            matrix,
            producers_accuracy: [matrix.producers_accuracy(NOT_WATER), matrix.producers_accuracy(WATER)],
            users_accuracy: [matrix.users_accuracy(NOT_WATER), matrix.users_accuracy(WATER)],
            overall_accuracy: matrix.overall_accuracy(),
            f1_not_water_from_matrix: matrix.accuracy_f1(NOT_WATER),
            f1_water: binary_f1_score(pairs),
            samples: pairs.len(),
        }
    }
}

/// Builds seasonal accuracy reports from the merged point-month table
pub struct AccuracyEngine;

impl AccuracyEngine {
    /// (ACTUAL, PREDICTION) pairs for the season; rows without a prediction are skipped
    pub fn season_pairs(records: &[SampleRecord], season: &Season) -> Vec<(bool, bool)> {
        records
            .iter()
            .filter(|r| season.contains(r.month))
            .filter_map(|r| r.class_wet.map(|predicted| (r.actual, predicted)))
            .collect()
    }

    pub fn assess(records: &[SampleRecord], season: &Season) -> AccuracyReport {
        let pairs = Self::season_pairs(records, season);
        if pairs.is_empty() {
            log::warn!("No sampled point-months fall in the {} season", season.name);
        }

        let report = AccuracyReport::from_pairs(&season.name, &pairs);
        log::debug!("{} season matrix: {:?}", season.name, report.matrix.cells);
        log::info!(
            "{} season: {} samples, overall accuracy {:.2}%, water F1 {:.4}",
            season.name,
            report.samples,
            report.overall_accuracy,
            report.f1_water
        );
        report
    }

    pub fn assess_partition(records: &[SampleRecord], partition: &SeasonPartition) -> Vec<AccuracyReport> {
        partition
            .seasons()
            .iter()
            .map(|season| Self::assess(records, season))
            .collect()
    }
}

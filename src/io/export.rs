use crate::core::accuracy::{AccuracyReport, NOT_WATER, WATER};
use crate::core::sampler::SamplingResults;
use crate::io::delimited::{quote_field, split_fields};
use crate::types::{SampleRecord, ValidationPoint, WofsError, WofsResult};
use std::fmt::Write as _;
use std::path::Path;

const SAMPLE_HEADER: [&str; 5] = ["PLOT_ID", "MONTH", "ACTUAL", "CLASS_WET", "CLEAR_OBS"];

/// Outer join of the catalog with sampler output: one record per catalog row
pub fn merge_with_catalog(points: &[ValidationPoint], results: &SamplingResults) -> Vec<SampleRecord> {
    points
        .iter()
        .map(|point| {
            let key = point.key().to_string();
            SampleRecord {
                plot_id: point.plot_id.clone(),
                month: point.month,
                actual: point.water,
                class_wet: results.wet.get(&key).copied(),
                clear_obs: results.clear_count.get(&key).copied(),
            }
        })
        .collect()
}

/// Comma-delimited sample table; absent values are left empty
pub fn render_sample_table(records: &[SampleRecord]) -> String {
    let mut out = SAMPLE_HEADER.join(",");
    out.push('\n');
    for r in records {
        let _ = writeln!(
            out,
            "{},{},{},{},{}",
            quote_field(&r.plot_id, ','),
            r.month,
            u8::from(r.actual),
            r.class_wet.map(|w| u8::from(w).to_string()).unwrap_or_default(),
            r.clear_obs.map(|c| c.to_string()).unwrap_or_default()
        );
    }
    out
}

pub fn write_sample_table<P: AsRef<Path>>(path: P, records: &[SampleRecord]) -> WofsResult<()> {
    std::fs::write(path.as_ref(), render_sample_table(records))?;
    log::info!("Wrote {} point-months to {}", records.len(), path.as_ref().display());
    Ok(())
}

/// Parse a table written by [`write_sample_table`]. Empty or `NaN` cells
/// read back as absent.
pub fn parse_sample_table(content: &str) -> WofsResult<Vec<SampleRecord>> {
    let mut lines = content.lines().filter(|l| !l.trim().is_empty());
    let header = split_fields(
        lines
            .next()
            .ok_or_else(|| WofsError::InvalidFormat("sample table is empty".to_string()))?,
        ',',
    )?;
    if header != SAMPLE_HEADER {
        return Err(WofsError::InvalidFormat(format!("unexpected sample table header {:?}", header)));
    }

    lines
        .enumerate()
        .map(|(i, line)| -> WofsResult<SampleRecord> {
            let fields = split_fields(line, ',')?;
            if fields.len() != SAMPLE_HEADER.len() {
                return Err(WofsError::InvalidFormat(format!(
                    "row {}: expected {} fields, found {}",
                    i + 1,
                    SAMPLE_HEADER.len(),
                    fields.len()
                )));
            }
            let bad = |name: &str| WofsError::InvalidFormat(format!("row {}: invalid {}", i + 1, name));

            Ok(SampleRecord {
                plot_id: fields[0].clone(),
                month: fields[1].parse().map_err(|_| bad("MONTH"))?,
                actual: parse_flag(&fields[2]).ok_or_else(|| bad("ACTUAL"))?,
                class_wet: optional(&fields[3], parse_flag).map_err(|_| bad("CLASS_WET"))?,
                clear_obs: optional(&fields[4], parse_count).map_err(|_| bad("CLEAR_OBS"))?,
            })
        })
        .collect()
}

pub fn read_sample_table<P: AsRef<Path>>(path: P) -> WofsResult<Vec<SampleRecord>> {
    parse_sample_table(&std::fs::read_to_string(path.as_ref())?)
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.parse::<f64>().ok()? {
        v if v == 0.0 => Some(false),
        v if v == 1.0 => Some(true),
        _ => None,
    }
}

/// Non-negative whole number; `3` and `3.0` are accepted, `-1` and `2.7` are not
fn parse_count(raw: &str) -> Option<u32> {
    let value = raw.parse::<f64>().ok()?;
    if value.fract() != 0.0 || !(0.0..=f64::from(u32::MAX)).contains(&value) {
        return None;
    }
    Some(value as u32)
}

fn optional<T>(raw: &str, parse: impl Fn(&str) -> Option<T>) -> Result<Option<T>, ()> {
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    parse(raw).map(Some).ok_or(())
}

fn cell(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

/// Confusion table with derived accuracy rows and columns.
///
/// Rows: NoWater, Water, Total, User's, F-score.
/// Columns: NoWater, Water, Total, Producer's.
/// The User's x Producer's cell holds the overall accuracy; the F-score row
/// holds the matrix-derived not-water F1 and the standard water F1.
pub fn render_confusion_table(report: &AccuracyReport) -> String {
    let m = &report.matrix;
    let mut out = String::from(",NoWater,Water,Total,Producer's\n");
    let _ = writeln!(
        out,
        "NoWater,{},{},{},{}",
        m.cell(0, 0),
        m.cell(0, 1),
        m.row_total(NOT_WATER),
        cell(report.producers_accuracy[NOT_WATER])
    );
    let _ = writeln!(
        out,
        "Water,{},{},{},{}",
        m.cell(1, 0),
        m.cell(1, 1),
        m.row_total(WATER),
        cell(report.producers_accuracy[WATER])
    );
    let _ = writeln!(
        out,
        "Total,{},{},{},",
        m.col_total(NOT_WATER),
        m.col_total(WATER),
        m.grand_total()
    );
    let _ = writeln!(
        out,
        "User's,{},{},,{}",
        cell(report.users_accuracy[NOT_WATER]),
        cell(report.users_accuracy[WATER]),
        cell(report.overall_accuracy)
    );
    let _ = writeln!(
        out,
        "F-score,{},{},,",
        cell(report.f1_not_water_from_matrix),
        cell(report.f1_water)
    );
    out
}

pub fn write_confusion_table<P: AsRef<Path>>(path: P, report: &AccuracyReport) -> WofsResult<()> {
    std::fs::write(path.as_ref(), render_confusion_table(report))?;
    log::info!("Wrote {} season confusion table to {}", report.season, path.as_ref().display());
    Ok(())
}

/// All season reports as pretty JSON; undefined accuracies become `null`
pub fn write_report_json<P: AsRef<Path>>(path: P, reports: &[AccuracyReport]) -> WofsResult<()> {
    let json = serde_json::to_string_pretty(reports)?;
    std::fs::write(path.as_ref(), json)?;
    Ok(())
}

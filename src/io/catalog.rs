use crate::io::delimited::split_fields;
use crate::types::{ValidationPoint, WofsError, WofsResult};
use std::collections::HashMap;
use std::path::Path;

/// Reader for the ground-truth point catalog.
///
/// Expects a header row with at least `PLOT_ID, LON, LAT, X, Y, MONTH, WATER`
/// (case-insensitive). `X`/`Y` must already be in the analysis CRS.
/// Optional columns: `INSTITUTION`, and `FLAG` holding `;`-separated flags.
/// Fields may be double-quoted, which lets them contain the delimiter.
#[derive(Debug, Clone)]
pub struct CatalogReader {
    delimiter: char,
}

impl Default for CatalogReader {
    fn default() -> Self {
        Self { delimiter: ',' }
    }
}

const REQUIRED_COLUMNS: [&str; 7] = ["PLOT_ID", "LON", "LAT", "X", "Y", "MONTH", "WATER"];

impl CatalogReader {
    pub fn new(delimiter: char) -> Self {
        Self { delimiter }
    }

    pub fn read_path<P: AsRef<Path>>(&self, path: P) -> WofsResult<Vec<ValidationPoint>> {
        log::info!("Reading validation catalog: {}", path.as_ref().display());
        let content = std::fs::read_to_string(path.as_ref())?;
        let points = self.parse_str(&content)?;
        log::info!("Loaded {} validation points", points.len());
        Ok(points)
    }

    pub fn parse_str(&self, content: &str) -> WofsResult<Vec<ValidationPoint>> {
        let mut lines = content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty());

        let (header_index, header) = lines
            .next()
            .ok_or_else(|| WofsError::InvalidFormat("catalog is empty".to_string()))?;
        let columns: HashMap<String, usize> = self
            .split(header, header_index + 1)?
            .into_iter()
            .enumerate()
            .map(|(i, name)| (name.to_uppercase(), i))
            .collect();

        for required in REQUIRED_COLUMNS {
            if !columns.contains_key(required) {
                return Err(WofsError::InvalidFormat(format!("catalog is missing column {}", required)));
            }
        }

        lines
            .map(|(index, line)| self.parse_row(&columns, index + 1, line))
            .collect()
    }

    fn split(&self, line: &str, line_no: usize) -> WofsResult<Vec<String>> {
        split_fields(line, self.delimiter)
            .map_err(|e| WofsError::InvalidFormat(format!("line {}: {}", line_no, e)))
    }

    fn parse_row(
        &self,
        columns: &HashMap<String, usize>,
        line_no: usize,
        line: &str,
    ) -> WofsResult<ValidationPoint> {
        let fields = self.split(line, line_no)?;
        let field = |name: &str| -> Option<&str> {
            columns
                .get(name)
                .and_then(|&i| fields.get(i).map(String::as_str))
                .filter(|value| !value.is_empty())
        };
        let required = |name: &str| -> WofsResult<&str> {
            field(name).ok_or_else(|| {
                WofsError::InvalidFormat(format!("line {}: missing value for {}", line_no, name))
            })
        };
        let number = |name: &str| -> WofsResult<f64> {
            let raw = required(name)?;
            raw.parse::<f64>().map_err(|_| {
                WofsError::InvalidFormat(format!("line {}: {} is not a number: '{}'", line_no, name, raw))
            })
        };

        let month_value = number("MONTH")?;
        if month_value.fract() != 0.0 || !(1.0..=12.0).contains(&month_value) {
            return Err(WofsError::InvalidFormat(format!(
                "line {}: MONTH must be 1-12, got {}",
                line_no, month_value
            )));
        }

        let water = parse_label(required("WATER")?).ok_or_else(|| {
            WofsError::InvalidFormat(format!("line {}: WATER must be 0/1 or true/false", line_no))
        })?;

        Ok(ValidationPoint {
            plot_id: required("PLOT_ID")?.to_string(),
            longitude: number("LON")?,
            latitude: number("LAT")?,
            x: number("X")?,
            y: number("Y")?,
            month: month_value as u32,
            water,
            institution: field("INSTITUTION").map(str::to_string),
            flags: field("FLAG")
                .map(|raw| {
                    raw.split(';')
                        .map(str::trim)
                        .filter(|f| !f.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}

fn parse_label(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" | "yes" => Some(true),
        "0" | "0.0" | "false" | "no" => Some(false),
        _ => None,
    }
}

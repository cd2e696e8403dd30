use crate::core::classifier::PixelClassifier;
use crate::core::clean_mask::{CleanMaskBuilder, CLEAR_SCL_CODES};
use crate::io::provider::{GroupBy, ProviderResponse, Resampling, SceneProvider, SceneQuery};
use crate::types::{PointMonthKey, PointMonthResult, Scene, ValidationPoint, WofsError, WofsResult};
use chrono::{Duration, NaiveDate};
use num_traits::Float;
use serde::{Deserialize, Serialize};

/// Longest observation window accepted from configuration
pub const MAX_WINDOW_DAYS: u32 = 366;

/// Query and reduction parameters shared by every point-month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingParams {
    /// Year the assigned months are resolved in
    pub analysis_year: i32,
    /// Days after the first of the month covered by the window (inclusive)
    pub window_days: u32,
    /// Output pixel size in CRS units
    pub resolution: f64,
    /// Footprint side length in pixels
    pub footprint_pixels: usize,
    pub output_crs: String,
    pub group_by: GroupBy,
    pub resampling: Resampling,
    /// SCL codes treated as clear
    pub clear_codes: Vec<u8>,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            analysis_year: 2019,
            window_days: 5,
            resolution: 10.0,
            footprint_pixels: 1,
            output_crs: "EPSG:3577".to_string(),
            group_by: GroupBy::SolarDay,
            resampling: Resampling::Nearest,
            clear_codes: CLEAR_SCL_CODES.to_vec(),
        }
    }
}

impl SamplingParams {
    pub fn validate(&self) -> WofsResult<()> {
        if !(self.resolution > 0.0) {
            return Err(WofsError::Config(format!("resolution must be positive, got {}", self.resolution)));
        }
        if self.window_days > MAX_WINDOW_DAYS {
            return Err(WofsError::Config(format!(
                "window of {} days exceeds the {}-day limit",
                self.window_days, MAX_WINDOW_DAYS
            )));
        }
        if self.footprint_pixels == 0 {
            return Err(WofsError::Config("footprint must cover at least one pixel".to_string()));
        }
        if self.clear_codes.is_empty() {
            log::warn!("No clear SCL codes configured; every scene will be treated as cloudy");
        }
        Ok(())
    }
}

/// Inclusive date range searched for one point-month
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservationWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ObservationWindow {
    /// `[first of month, first of month + days]`
    pub fn for_month(year: i32, month: u32, days: u32) -> WofsResult<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| WofsError::InvalidFormat(format!("invalid month {} in {}", month, year)))?;
        let end = start
            .checked_add_signed(Duration::days(i64::from(days)))
            .ok_or_else(|| WofsError::Config(format!("window of {} days from {} is out of range", days, start)))?;
        Ok(Self { start, end })
    }
}

/// Per-scene verdict at the point footprint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneVerdict {
    /// Every footprint pixel classified (none masked)
    pub clear: bool,
    /// At least one footprint pixel classified as water
    pub any_water: bool,
}

/// Samples and reduces the observation window of one validation point
#[derive(Debug, Clone)]
pub struct PointMonthAggregator {
    params: SamplingParams,
    mask_builder: CleanMaskBuilder,
}

impl PointMonthAggregator {
    pub fn new(params: SamplingParams) -> Self {
        let mask_builder = CleanMaskBuilder::new(params.clear_codes.clone());
        Self { params, mask_builder }
    }

    pub fn params(&self) -> &SamplingParams {
        &self.params
    }

    pub fn window_for(&self, point: &ValidationPoint) -> WofsResult<ObservationWindow> {
        ObservationWindow::for_month(self.params.analysis_year, point.month, self.params.window_days)
    }

    /// Provider query covering the point footprint over its window
    pub fn query_for(&self, point: &ValidationPoint) -> WofsResult<SceneQuery> {
        let window = self.window_for(point)?;
        Ok(SceneQuery {
            x: point.x,
            y: point.y,
            longitude: point.longitude,
            crs: self.params.output_crs.clone(),
            start: window.start,
            end: window.end,
            resolution: self.params.resolution,
            footprint_pixels: self.params.footprint_pixels,
            group_by: self.params.group_by,
            resampling: self.params.resampling,
        })
    }

    /// Fetch, classify and reduce one point-month.
    ///
    /// Returns `Ok(None)` when the provider has no usable scene for the window.
    pub fn sample<P: SceneProvider>(
        &self,
        provider: &P,
        point: &ValidationPoint,
    ) -> WofsResult<Option<PointMonthResult>> {
        let query = self.query_for(point)?;
        log::debug!(
            "Querying {} at ({:.1}, {:.1}) for {}..={}",
            point.key(),
            query.x,
            query.y,
            query.start,
            query.end
        );

        let scenes = match provider.load(&query)? {
            ProviderResponse::Scenes(scenes) if !scenes.is_empty() => scenes,
            ProviderResponse::Scenes(_) => {
                log::debug!("No scenes for {}", point.key());
                return Ok(None);
            }
            ProviderResponse::BandsUnavailable => {
                log::debug!("Reflectance bands unavailable for {}", point.key());
                return Ok(None);
            }
        };

        self.reduce(point.key(), &scenes).map(Some)
    }

    /// Classify one scene and summarise it over the footprint
    pub fn scene_verdict<F>(&self, scene: &Scene<F>) -> WofsResult<SceneVerdict>
    where
        F: Float + Send + Sync,
    {
        let mask = self.mask_builder.build(&scene.scl);
        let classified = PixelClassifier::classify(&scene.bands, &mask)?;

        let clear = !classified.is_empty() && classified.iter().all(|v| !v.is_nan());
        let any_water = classified.iter().any(|v| *v == F::one());
        Ok(SceneVerdict { clear, any_water })
    }

    /// Reduce a time series of scenes to one wet/clear verdict.
    ///
    /// Only clear scenes vote; with no clear scene the point-month is dry.
    pub fn reduce<F>(&self, key: PointMonthKey, scenes: &[Scene<F>]) -> WofsResult<PointMonthResult>
    where
        F: Float + Send + Sync,
    {
        let mut clear_count = 0u32;
        let mut wet = false;

        for scene in scenes {
            let verdict = self.scene_verdict(scene)?;
            log::debug!(
                "{} @ {}: clear={} water={}",
                key,
                scene.acquired,
                verdict.clear,
                verdict.any_water
            );
            if verdict.clear {
                clear_count += 1;
                wet |= verdict.any_water;
            }
        }

        Ok(PointMonthResult { key, wet, clear_count })
    }
}

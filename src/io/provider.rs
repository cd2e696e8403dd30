use crate::types::{Scene, WofsError, WofsResult};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use num_traits::Float;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// SCL code for pixels outside the sensor swath
pub const SCL_NO_DATA: u8 = 0;

/// How same-day acquisitions are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupBy {
    /// One scene per local solar day; overlapping granules are fused
    SolarDay,
    /// Every acquisition is returned as-is
    Acquisition,
}

/// Resampling applied when the provider reprojects to the output grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resampling {
    Nearest,
    Bilinear,
}

/// A space-time request for the scenes covering one point footprint
#[derive(Debug, Clone, PartialEq)]
pub struct SceneQuery {
    /// Footprint centre in the output CRS
    pub x: f64,
    pub y: f64,
    /// Geographic longitude of the centre, used for solar-day grouping
    pub longitude: f64,
    pub crs: String,
    /// First day of the window (inclusive)
    pub start: NaiveDate,
    /// Last day of the window (inclusive)
    pub end: NaiveDate,
    /// Output pixel size in CRS units
    pub resolution: f64,
    /// Footprint side length in pixels
    pub footprint_pixels: usize,
    pub group_by: GroupBy,
    pub resampling: Resampling,
}

impl SceneQuery {
    /// Footprint bounds as (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let half = self.resolution * self.footprint_pixels as f64 / 2.0;
        (self.x - half, self.y - half, self.x + half, self.y + half)
    }

    /// Expected (rows, cols) of every returned scene
    pub fn shape(&self) -> (usize, usize) {
        (self.footprint_pixels, self.footprint_pixels)
    }

    pub fn contains_time(&self, acquired: DateTime<Utc>) -> bool {
        let day = acquired.date_naive();
        day >= self.start && day <= self.end
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        let (min_x, min_y, max_x, max_y) = self.bounds();
        x >= min_x && x <= max_x && y >= min_y && y <= max_y
    }
}

/// What a provider returns for a query
#[derive(Debug, Clone)]
pub enum ProviderResponse<F> {
    /// Zero or more scenes, ordered by acquisition time
    Scenes(Vec<Scene<F>>),
    /// The product holds no reflectance bands for this query
    BandsUnavailable,
}

/// Source of surface reflectance scenes
pub trait SceneProvider: Send + Sync {
    /// Float width of every reflectance grid this provider emits
    type Float: Float + Send + Sync;

    fn load(&self, query: &SceneQuery) -> WofsResult<ProviderResponse<Self::Float>>;
}

/// Local solar date of an acquisition at the given longitude
pub fn solar_date(acquired: DateTime<Utc>, longitude: f64) -> NaiveDate {
    let offset = Duration::seconds((longitude / 15.0 * 3600.0).round() as i64);
    (acquired + offset).date_naive()
}

/// Group scenes by local solar day and fuse each group into one scene.
///
/// Within a group, every pixel is taken from the earliest acquisition whose
/// SCL code is not no-data. The fused scene keeps the earliest timestamp.
pub fn group_by_solar_day<F: Float>(scenes: Vec<Scene<F>>, longitude: f64) -> WofsResult<Vec<Scene<F>>> {
    let mut groups: BTreeMap<NaiveDate, Vec<Scene<F>>> = BTreeMap::new();
    let mut ordered = scenes;
    ordered.sort_by_key(|s| s.acquired);
    for scene in ordered {
        groups.entry(solar_date(scene.acquired, longitude)).or_default().push(scene);
    }

    groups
        .into_values()
        .map(|group| -> WofsResult<Scene<F>> {
            let mut members = group.into_iter();
            let mut fused = members
                .next()
                .ok_or_else(|| WofsError::Processing("empty solar-day group".to_string()))?;
            for other in members {
                fuse_into(&mut fused, &other)?;
            }
            Ok(fused)
        })
        .collect()
}

fn fuse_into<F: Float>(fused: &mut Scene<F>, other: &Scene<F>) -> WofsResult<()> {
    if fused.dim() != other.dim() {
        return Err(WofsError::ShapeMismatch(format!(
            "cannot fuse scenes of shape {:?} and {:?}",
            fused.dim(),
            other.dim()
        )));
    }

    let (rows, cols) = fused.dim();
    for row in 0..rows {
        for col in 0..cols {
            if fused.scl[[row, col]] != SCL_NO_DATA || other.scl[[row, col]] == SCL_NO_DATA {
                continue;
            }
            fused.scl[[row, col]] = other.scl[[row, col]];
            for (dst, src) in fused.bands.grids_mut().into_iter().zip(other.bands.grids()) {
                dst[[row, col]] = src[[row, col]];
            }
        }
    }
    Ok(())
}

/// A stack of scenes at one location
#[derive(Debug, Clone)]
struct SceneStack<F> {
    x: f64,
    y: f64,
    scenes: Option<Vec<Scene<F>>>,
}

/// Provider backed by scene stacks held in memory
#[derive(Debug, Clone)]
pub struct MemoryProvider<F> {
    stacks: Vec<SceneStack<F>>,
}

impl<F: Float> Default for MemoryProvider<F> {
    fn default() -> Self {
        Self { stacks: Vec::new() }
    }
}

impl<F: Float> MemoryProvider<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register scenes centred on (x, y)
    pub fn insert(&mut self, x: f64, y: f64, scenes: Vec<Scene<F>>) {
        self.stacks.push(SceneStack { x, y, scenes: Some(scenes) });
    }

    /// Register a location for which the product has no reflectance bands
    pub fn insert_unavailable(&mut self, x: f64, y: f64) {
        self.stacks.push(SceneStack { x, y, scenes: None });
    }

    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }
}

impl<F: Float + Send + Sync> SceneProvider for MemoryProvider<F> {
    type Float = F;

    fn load(&self, query: &SceneQuery) -> WofsResult<ProviderResponse<F>> {
        let stack = match self.stacks.iter().find(|s| query.contains_point(s.x, s.y)) {
            Some(stack) => stack,
            None => return Ok(ProviderResponse::Scenes(Vec::new())),
        };
        let scenes = match &stack.scenes {
            Some(scenes) => scenes,
            None => return Ok(ProviderResponse::BandsUnavailable),
        };

        let mut selected: Vec<Scene<F>> = scenes
            .iter()
            .filter(|s| query.contains_time(s.acquired))
            .cloned()
            .collect();
        selected.sort_by_key(|s| s.acquired);

        if query.group_by == GroupBy::SolarDay {
            selected = group_by_solar_day(selected, query.longitude)?;
        }

        log::debug!(
            "Memory provider: {} scene(s) at ({:.1}, {:.1}) for {}..={}",
            selected.len(),
            query.x,
            query.y,
            query.start,
            query.end
        );
        Ok(ProviderResponse::Scenes(selected))
    }
}

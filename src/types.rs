use chrono::{DateTime, Utc};
use ndarray::Array2;
use num_traits::Float;
use serde::{Deserialize, Serialize};

/// Per-pixel validity derived from the scene classification layer (true = clear)
pub type ValidityMask = Array2<bool>;

/// Scene classification layer (Sentinel-2 SCL codes)
pub type SclGrid = Array2<u8>;

/// Classifier output for a single pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelClass {
    NotWater,
    Water,
    /// Pixel excluded by the validity mask
    NoData,
}

impl PixelClass {
    /// Decode a classified grid value (0, 1 or NaN)
    pub fn from_value<F: Float>(value: F) -> Self {
        if value.is_nan() {
            PixelClass::NoData
        } else if value == F::one() {
            PixelClass::Water
        } else {
            PixelClass::NotWater
        }
    }

    /// Encode as a grid value; no-data becomes NaN
    pub fn to_value<F: Float>(self) -> F {
        match self {
            PixelClass::NotWater => F::zero(),
            PixelClass::Water => F::one(),
            PixelClass::NoData => F::nan(),
        }
    }
}

impl std::fmt::Display for PixelClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PixelClass::NotWater => write!(f, "NotWater"),
            PixelClass::Water => write!(f, "Water"),
            PixelClass::NoData => write!(f, "NoData"),
        }
    }
}

/// The six co-registered reflectance grids the water classifier consumes.
///
/// All grids share one shape and one float width `F`; mixing 32- and 64-bit
/// grids is not representable.
#[derive(Debug, Clone)]
pub struct ReflectanceBands<F> {
    pub blue: Array2<F>,
    pub green: Array2<F>,
    pub red: Array2<F>,
    pub nir: Array2<F>,
    pub swir1: Array2<F>,
    pub swir2: Array2<F>,
}

impl<F: Float> ReflectanceBands<F> {
    /// Bundle six grids, rejecting any shape disagreement
    pub fn new(
        blue: Array2<F>,
        green: Array2<F>,
        red: Array2<F>,
        nir: Array2<F>,
        swir1: Array2<F>,
        swir2: Array2<F>,
    ) -> WofsResult<Self> {
        let bands = Self { blue, green, red, nir, swir1, swir2 };
        bands.check_shape()?;
        Ok(bands)
    }

    /// Fail unless all six grids have the blue band's shape.
    ///
    /// The fields are public, so bands assembled without [`ReflectanceBands::new`]
    /// are checked again before any per-pixel indexing.
    pub fn check_shape(&self) -> WofsResult<()> {
        let shape = self.blue.dim();
        let others = [
            ("green", self.green.dim()),
            ("red", self.red.dim()),
            ("nir", self.nir.dim()),
            ("swir1", self.swir1.dim()),
            ("swir2", self.swir2.dim()),
        ];
        for (name, dim) in others {
            if dim != shape {
                return Err(WofsError::ShapeMismatch(format!(
                    "{} band is {:?}, blue band is {:?}",
                    name, dim, shape
                )));
            }
        }
        Ok(())
    }

    /// Uniform-value bands, mostly useful for synthetic scenes
    pub fn filled(shape: (usize, usize), values: [F; 6]) -> Self {
        let [b1, b2, b3, b4, b5, b7] = values;
        Self {
            blue: Array2::from_elem(shape, b1),
            green: Array2::from_elem(shape, b2),
            red: Array2::from_elem(shape, b3),
            nir: Array2::from_elem(shape, b4),
            swir1: Array2::from_elem(shape, b5),
            swir2: Array2::from_elem(shape, b7),
        }
    }

    pub fn dim(&self) -> (usize, usize) {
        self.blue.dim()
    }

    /// Grids in band order: blue, green, red, nir, swir1, swir2
    pub fn grids(&self) -> [&Array2<F>; 6] {
        [&self.blue, &self.green, &self.red, &self.nir, &self.swir1, &self.swir2]
    }

    pub fn grids_mut(&mut self) -> [&mut Array2<F>; 6] {
        [
            &mut self.blue,
            &mut self.green,
            &mut self.red,
            &mut self.nir,
            &mut self.swir1,
            &mut self.swir2,
        ]
    }
}

impl ReflectanceBands<f32> {
    /// Widen every grid to 64-bit so it can be combined with f64 data
    pub fn to_f64(&self) -> ReflectanceBands<f64> {
        let widen = |a: &Array2<f32>| a.mapv(f64::from);
        ReflectanceBands {
            blue: widen(&self.blue),
            green: widen(&self.green),
            red: widen(&self.red),
            nir: widen(&self.nir),
            swir1: widen(&self.swir1),
            swir2: widen(&self.swir2),
        }
    }
}

/// One acquisition: reflectance bands plus the scene classification layer
#[derive(Debug, Clone)]
pub struct Scene<F> {
    pub acquired: DateTime<Utc>,
    pub bands: ReflectanceBands<F>,
    pub scl: SclGrid,
}

impl<F: Float> Scene<F> {
    pub fn new(acquired: DateTime<Utc>, bands: ReflectanceBands<F>, scl: SclGrid) -> WofsResult<Self> {
        if scl.dim() != bands.dim() {
            return Err(WofsError::ShapeMismatch(format!(
                "SCL layer is {:?}, reflectance bands are {:?}",
                scl.dim(),
                bands.dim()
            )));
        }
        Ok(Self { acquired, bands, scl })
    }

    pub fn dim(&self) -> (usize, usize) {
        self.bands.dim()
    }
}

/// Ground-truth validation point with its assigned month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationPoint {
    pub plot_id: String,
    pub longitude: f64,
    pub latitude: f64,
    /// Easting in the analysis CRS (metres)
    pub x: f64,
    /// Northing in the analysis CRS (metres)
    pub y: f64,
    /// Calendar month, 1-12
    pub month: u32,
    /// Human label: true = water
    pub water: bool,
    pub institution: Option<String>,
    pub flags: Vec<String>,
}

impl ValidationPoint {
    pub fn key(&self) -> PointMonthKey {
        PointMonthKey::new(&self.plot_id, self.month)
    }
}

/// Identity of a point-month, rendered as `{plot_id}_{month}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PointMonthKey {
    pub plot_id: String,
    pub month: u32,
}

impl PointMonthKey {
    pub fn new(plot_id: &str, month: u32) -> Self {
        Self { plot_id: plot_id.to_string(), month }
    }
}

impl std::fmt::Display for PointMonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.plot_id, self.month)
    }
}

/// Aggregated classifier verdict for one point-month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointMonthResult {
    pub key: PointMonthKey,
    pub wet: bool,
    pub clear_count: u32,
}

/// One row of the merged point-month table: ground truth joined with the
/// sampler's verdict. `class_wet` and `clear_obs` are `None` where no
/// usable scene was found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub plot_id: String,
    pub month: u32,
    pub actual: bool,
    pub class_wet: Option<bool>,
    pub clear_obs: Option<u32>,
}

/// Error types for validation runs
#[derive(Debug, thiserror::Error)]
pub enum WofsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Data provider error: {0}")]
    Provider(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Duplicate point-month key: {0}")]
    KeyCollision(String),
}

/// Result type for validation operations
pub type WofsResult<T> = Result<T, WofsError>;

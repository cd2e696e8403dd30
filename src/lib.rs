//! wofs-validation: point-month validation of a Sentinel-2 surface water classifier
//!
//! This library samples a fixed water decision tree at ground-truth points over
//! short monthly windows, reduces each window to a wet/clear verdict, and scores
//! the verdicts against human labels with seasonal confusion matrices.

pub mod types;
pub mod io;
pub mod core;

#[cfg(feature = "python")]
mod python;

// Re-export main types and functions for easier access
pub use self::types::{
    PixelClass, PointMonthKey, PointMonthResult, ReflectanceBands, SampleRecord, Scene,
    ValidationPoint, ValidityMask, WofsError, WofsResult,
};

pub use self::core::{
    AccuracyEngine, AccuracyReport, CleanMaskBuilder, ConfusionMatrix, ParallelSampler,
    PixelClassifier, PointMonthAggregator, SamplingParams, SamplerConfig, SeasonPartition,
};

pub use self::io::{CatalogReader, MemoryProvider, SceneProvider, ValidationConfig};

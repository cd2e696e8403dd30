//! Core classification, sampling and accuracy modules

pub mod clean_mask;
pub mod classifier;
pub mod aggregate;
pub mod sampler;
pub mod accuracy;

// Re-export main types
pub use clean_mask::{CleanMaskBuilder, CLEAR_SCL_CODES};
pub use classifier::{classify_features, PixelClassifier, TreeFeatures, TreeLeaf};
pub use aggregate::{ObservationWindow, PointMonthAggregator, SamplingParams, SceneVerdict};
pub use sampler::{CollisionPolicy, ParallelSampler, ProgressCounter, SamplerConfig, SamplingResults};
pub use accuracy::{binary_f1_score, AccuracyEngine, AccuracyReport, ConfusionMatrix, Season, SeasonPartition};

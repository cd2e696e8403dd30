use crate::core::accuracy::SeasonPartition;
use crate::core::aggregate::SamplingParams;
use crate::core::sampler::SamplerConfig;
use crate::types::WofsResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete configuration of a validation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub sampling: SamplingParams,
    pub sampler: SamplerConfig,
    /// Months forming the wet season; the rest are the dry season
    pub wet_season_months: Vec<u32>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            sampling: SamplingParams::default(),
            sampler: SamplerConfig::default(),
            wet_season_months: vec![11, 12, 1, 2, 3, 4],
        }
    }
}

impl ValidationConfig {
    pub fn from_json_str(json: &str) -> WofsResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> WofsResult<Self> {
        log::info!("Loading configuration from {}", path.as_ref().display());
        Self::from_json_str(&std::fs::read_to_string(path.as_ref())?)
    }

    pub fn to_json(&self) -> WofsResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> WofsResult<()> {
        self.sampling.validate()?;
        self.sampler.validate()?;
        self.season_partition()?;
        Ok(())
    }

    pub fn season_partition(&self) -> WofsResult<SeasonPartition> {
        SeasonPartition::new(self.wet_season_months.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sampler::CollisionPolicy;
    use crate::io::provider::GroupBy;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = ValidationConfig::from_json_str(
            r#"{
                "sampling": { "analysis_year": 2020, "footprint_pixels": 3 },
                "sampler": { "workers": 8, "collision_policy": "Reject" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.sampling.analysis_year, 2020);
        assert_eq!(config.sampling.footprint_pixels, 3);
        assert_eq!(config.sampling.window_days, 5);
        assert_eq!(config.sampling.group_by, GroupBy::SolarDay);
        assert_eq!(config.sampler.workers, 8);
        assert_eq!(config.sampler.collision_policy, CollisionPolicy::Reject);
        assert_eq!(config.wet_season_months, vec![11, 12, 1, 2, 3, 4]);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(ValidationConfig::from_json_str(r#"{ "sampler": { "workers": 0 } }"#).is_err());
        assert!(ValidationConfig::from_json_str(r#"{ "wet_season_months": [0, 5] }"#).is_err());
        assert!(ValidationConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let config = ValidationConfig::default();
        let parsed = ValidationConfig::from_json_str(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }
}

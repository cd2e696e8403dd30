use chrono::{TimeZone, Utc};
use wofs_validation::core::{CollisionPolicy, ParallelSampler, PointMonthAggregator, SamplerConfig, SamplingParams};
use wofs_validation::io::merge_with_catalog;
use wofs_validation::io::provider::{GroupBy, MemoryProvider, ProviderResponse, SceneProvider, SceneQuery};
use wofs_validation::types::{PointMonthKey, ReflectanceBands, Scene, SclGrid, ValidationPoint, WofsError, WofsResult};

const WATER: [f64; 6] = [100.0, 400.0, 300.0, 200.0, 150.0, 100.0];
const DRY: [f64; 6] = [200.0, 200.0, 200.0, 2000.0, 3000.0, 100.0];
const CLEAR: u8 = 4;
const CLOUD: u8 = 9;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn scene(month: u32, day: u32, hour: u32, values: [f64; 6], scl: u8) -> Scene<f64> {
    let acquired = Utc.with_ymd_and_hms(2019, month, day, hour, 0, 0).unwrap();
    Scene::new(acquired, ReflectanceBands::filled((1, 1), values), SclGrid::from_elem((1, 1), scl)).unwrap()
}

fn point(plot_id: &str, x: f64, month: u32) -> ValidationPoint {
    ValidationPoint {
        plot_id: plot_id.to_string(),
        longitude: 145.0,
        latitude: -37.0,
        x,
        y: -3_800_000.0,
        month,
        water: true,
        institution: Some("test".to_string()),
        flags: Vec::new(),
    }
}

fn sampler<P: SceneProvider>(provider: P, group_by: GroupBy) -> ParallelSampler<P> {
    let aggregator = PointMonthAggregator::new(SamplingParams { group_by, ..SamplingParams::default() });
    let config = SamplerConfig {
        workers: 4,
        collision_policy: CollisionPolicy::LastWriteWins,
        progress_interval: 10,
    };
    ParallelSampler::new(provider, aggregator, config)
}

#[test]
fn test_bright_swir_scene_is_dry() {
    init_logging();

    let mut provider = MemoryProvider::new();
    provider.insert(1000.0, -3_800_000.0, vec![scene(5, 3, 0, DRY, CLEAR)]);
    let points = vec![point("1", 1000.0, 5)];

    let results = sampler(provider, GroupBy::SolarDay).run(&points).unwrap();
    let result = results.get(&PointMonthKey::new("1", 5)).unwrap();
    assert!(!result.wet);
    assert_eq!(result.clear_count, 1);
}

#[test]
fn test_point_without_scenes_is_absent() {
    init_logging();

    let mut provider = MemoryProvider::new();
    provider.insert(1000.0, -3_800_000.0, vec![scene(6, 2, 0, WATER, CLEAR)]);
    // second point has scenes only outside its window, third has no stack at all
    provider.insert(2000.0, -3_800_000.0, vec![scene(6, 20, 0, WATER, CLEAR)]);
    let points = vec![point("1", 1000.0, 6), point("2", 2000.0, 6), point("3", 3000.0, 6)];

    let results = sampler(provider, GroupBy::SolarDay).run(&points).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results.missing.len(), 2);
    assert_eq!(results.completed, 3);

    let table = merge_with_catalog(&points, &results);
    assert_eq!(table.len(), 3);
    assert_eq!(table[0].class_wet, Some(true));
    assert_eq!(table[1].class_wet, None);
    assert_eq!(table[1].clear_obs, None);
    assert_eq!(table[2].clear_obs, None);
}

#[test]
fn test_clear_count_monotone_in_scene_count() {
    init_logging();

    let series = vec![
        scene(2, 1, 0, DRY, CLOUD),
        scene(2, 2, 0, DRY, CLEAR),
        scene(2, 3, 0, WATER, CLOUD),
        scene(2, 4, 0, WATER, CLEAR),
        scene(2, 5, 0, DRY, CLEAR),
        scene(2, 6, 0, WATER, 8),
    ];
    let aggregator = PointMonthAggregator::new(SamplingParams {
        group_by: GroupBy::Acquisition,
        ..SamplingParams::default()
    });

    let mut previous = 0;
    for n in 0..=series.len() {
        let result = aggregator.reduce(PointMonthKey::new("m", 2), &series[..n]).unwrap();
        assert!(result.clear_count >= previous, "clear count dropped at {} scenes", n);
        assert!(result.clear_count as usize <= n);
        if result.wet {
            assert!(result.clear_count >= 1);
        }
        previous = result.clear_count;
    }
    assert_eq!(previous, 3);
}

#[test]
fn test_solar_day_grouping_dedupes_overlapping_granules() {
    init_logging();

    // two granules of the same pass, minutes apart
    let scenes = vec![scene(3, 2, 0, WATER, CLEAR), scene(3, 2, 1, WATER, CLEAR)];

    let mut grouped = MemoryProvider::new();
    grouped.insert(1000.0, -3_800_000.0, scenes.clone());
    let mut ungrouped = MemoryProvider::new();
    ungrouped.insert(1000.0, -3_800_000.0, scenes);
    let points = vec![point("9", 1000.0, 3)];

    let solar = sampler(grouped, GroupBy::SolarDay).run(&points).unwrap();
    let raw = sampler(ungrouped, GroupBy::Acquisition).run(&points).unwrap();
    assert_eq!(solar.clear_count.get("9_3"), Some(&1));
    assert_eq!(raw.clear_count.get("9_3"), Some(&2));
    assert_eq!(solar.wet.get("9_3"), Some(&true));
}

/// Provider that fails for points east of a cut-off
struct FlakyProvider {
    inner: MemoryProvider<f64>,
    fail_east_of: f64,
}

impl SceneProvider for FlakyProvider {
    type Float = f64;

    fn load(&self, query: &SceneQuery) -> WofsResult<ProviderResponse<f64>> {
        if query.x > self.fail_east_of {
            return Err(WofsError::Provider("connection reset".to_string()));
        }
        self.inner.load(query)
    }
}

#[test]
fn test_failed_task_does_not_abort_run() {
    init_logging();

    let mut inner = MemoryProvider::new();
    for i in 0..20 {
        inner.insert(1000.0 * i as f64, -3_800_000.0, vec![scene(1, 2, 0, WATER, CLEAR)]);
    }
    let provider = FlakyProvider { inner, fail_east_of: 14_500.0 };
    let points: Vec<_> = (0..20).map(|i| point(&i.to_string(), 1000.0 * i as f64, 1)).collect();

    let sampler = sampler(provider, GroupBy::SolarDay);
    let results = sampler.run(&points).unwrap();

    assert_eq!(results.len(), 15);
    assert_eq!(results.failed.len(), 5);
    assert!(results.failed.contains(&"19_1".to_string()));
    assert!(results.wet.values().all(|&wet| wet));
    assert_eq!(sampler.progress().completed(), 20);
}

#[test]
fn test_single_precision_provider() {
    init_logging();

    let mut provider = MemoryProvider::<f32>::new();
    let acquired = Utc.with_ymd_and_hms(2019, 9, 4, 0, 0, 0).unwrap();
    let bands = ReflectanceBands::filled((1, 1), [100.0f32, 400.0, 300.0, 200.0, 150.0, 100.0]);
    provider.insert(0.0, 0.0, vec![Scene::new(acquired, bands, SclGrid::from_elem((1, 1), 6)).unwrap()]);

    let mut p = point("f32", 0.0, 9);
    p.y = 0.0;
    let results = sampler(provider, GroupBy::SolarDay).run(&[p]).unwrap();
    assert_eq!(results.wet.get("f32_9"), Some(&true));
}

use approx::assert_abs_diff_eq;
use chrono::{TimeZone, Utc};
use wofs_validation::core::accuracy::{NOT_WATER, WATER};
use wofs_validation::core::{AccuracyEngine, ParallelSampler, PointMonthAggregator, SeasonPartition};
use wofs_validation::io::{merge_with_catalog, CatalogReader, MemoryProvider, ValidationConfig};
use wofs_validation::types::{ReflectanceBands, SampleRecord, Scene, SclGrid};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn records(month: u32, counts: [[usize; 2]; 2]) -> Vec<SampleRecord> {
    let mut out = Vec::new();
    for (actual, row) in counts.iter().enumerate() {
        for (predicted, &n) in row.iter().enumerate() {
            for i in 0..n {
                out.push(SampleRecord {
                    plot_id: format!("{}{}{}", actual, predicted, i),
                    month,
                    actual: actual == 1,
                    class_wet: Some(predicted == 1),
                    clear_obs: Some(1),
                });
            }
        }
    }
    out
}

#[test]
fn test_reference_confusion_matrix() {
    init_logging();

    let mut table = records(1, [[40, 5], [3, 52]]);
    // dry-season rows and unsampled rows must not leak into the wet season
    table.extend(records(7, [[0, 9], [9, 0]]));
    table.push(SampleRecord {
        plot_id: "gap".to_string(),
        month: 2,
        actual: true,
        class_wet: None,
        clear_obs: None,
    });

    let partition = SeasonPartition::new(vec![11, 12, 1, 2, 3, 4]).unwrap();
    let wet = AccuracyEngine::assess(&table, &partition.wet);

    assert_eq!(wet.samples, 100);
    assert_abs_diff_eq!(wet.overall_accuracy, 92.0, epsilon = 1e-9);
    assert_abs_diff_eq!(wet.producers_accuracy[WATER], 94.545, epsilon = 1e-3);
    assert_abs_diff_eq!(wet.users_accuracy[WATER], 91.228, epsilon = 1e-3);
    assert_abs_diff_eq!(wet.producers_accuracy[NOT_WATER], 88.889, epsilon = 1e-3);

    let m = wet.matrix;
    assert_eq!(m.row_total(0) + m.row_total(1), m.grand_total());
    assert_eq!(m.col_total(0) + m.col_total(1), m.grand_total());

    let dry = AccuracyEngine::assess(&table, &partition.dry);
    assert_eq!(dry.samples, 18);
    assert_abs_diff_eq!(dry.overall_accuracy, 0.0);
    assert_eq!(dry.f1_water, 0.0);
}

#[test]
fn test_accuracies_bounded() {
    for counts in [[[1, 0], [0, 0]], [[3, 4], [5, 6]], [[0, 2], [2, 0]], [[10, 0], [0, 10]]] {
        let table = records(3, counts);
        let season = SeasonPartition::new(vec![3]).unwrap().wet;
        let report = AccuracyEngine::assess(&table, &season);

        assert!((0.0..=100.0).contains(&report.overall_accuracy));
        for value in report.producers_accuracy.iter().chain(report.users_accuracy.iter()) {
            assert!(value.is_nan() || (0.0..=100.0).contains(value));
        }
        assert!((0.0..=1.0).contains(&report.f1_water));
    }
}

#[test]
fn test_catalog_to_seasonal_reports() {
    init_logging();

    let catalog = "\
PLOT_ID,LON,LAT,X,Y,MONTH,WATER
1,145.0,-37.0,0,0,1,1
2,145.0,-37.0,100,0,1,0
3,145.0,-37.0,200,0,7,1
4,145.0,-37.0,300,0,7,0
5,145.0,-37.0,400,0,8,1
";
    let points = CatalogReader::default().parse_str(catalog).unwrap();

    let water = [100.0, 400.0, 300.0, 200.0, 150.0, 100.0];
    let dry = [200.0, 200.0, 200.0, 2000.0, 3000.0, 100.0];
    let scene = |month: u32, values: [f64; 6]| {
        let acquired = Utc.with_ymd_and_hms(2019, month, 3, 0, 0, 0).unwrap();
        Scene::new(acquired, ReflectanceBands::filled((1, 1), values), SclGrid::from_elem((1, 1), 4)).unwrap()
    };

    let mut provider = MemoryProvider::new();
    provider.insert(0.0, 0.0, vec![scene(1, water)]);
    provider.insert(100.0, 0.0, vec![scene(1, water)]);
    provider.insert(200.0, 0.0, vec![scene(7, dry)]);
    provider.insert(300.0, 0.0, vec![scene(7, dry)]);
    // plot 5 has no imagery

    let config = ValidationConfig::from_json_str(r#"{ "sampler": { "workers": 2 } }"#).unwrap();
    let aggregator = PointMonthAggregator::new(config.sampling.clone());
    let sampler = ParallelSampler::new(provider, aggregator, config.sampler.clone());
    let results = sampler.run(&points).unwrap();

    let table = merge_with_catalog(&points, &results);
    assert_eq!(table.len(), 5);
    assert_eq!(table[4].class_wet, None);

    let reports = AccuracyEngine::assess_partition(&table, &config.season_partition().unwrap());
    assert_eq!(reports[0].season, "wet");
    assert_eq!(reports[0].samples, 2);
    assert_abs_diff_eq!(reports[0].overall_accuracy, 50.0);
    assert_eq!(reports[0].matrix.cell(0, 1), 1);

    assert_eq!(reports[1].season, "dry");
    assert_eq!(reports[1].samples, 2);
    assert_eq!(reports[1].matrix.cell(1, 0), 1);
    assert_eq!(reports[1].matrix.cell(0, 0), 1);
}

//! End-to-end sweeps through the public API

use categorical_bench::device::{FixedMemory, MemoryInfo};
use categorical_bench::pool::POOL_ALIGNMENT;
use categorical_bench::results::{self, ResultTable};
use categorical_bench::workload;
use categorical_bench::{
    Engine, EngineError, Harness, LabelType, PoolConfig, Scenario, Shape, Sweep, MISSING_CODE,
};
use std::collections::HashSet;

fn pool_from(source: &dyn MemoryInfo) -> PoolConfig {
    PoolConfig::from_free_memory(source.free_memory().unwrap(), 0.95).unwrap()
}

#[test]
fn test_end_to_end_fillna_at_100_by_100000() {
    let shape = Shape::new(100, 100_000).unwrap();
    let column = workload::categorical_column(&shape).unwrap();
    assert_eq!(column.len(), 100_000);
    assert_eq!(column.distinct_codes(), 100);
    assert!(column.codes().chunks(100).all(|chunk| chunk == &column.codes()[..100]));

    let engine = Engine::new(pool_from(&FixedMemory(1 << 30)));
    engine.warm_up().unwrap();
    let harness = Harness::new(&engine, 3).unwrap();
    let sweep = Sweep::new(vec![100_000], vec![100]).unwrap();

    let outcome = harness.run(Scenario::Fillna, &sweep).unwrap();
    assert_eq!(outcome.table.len(), 1);
    let mean = outcome.table.get(100_000, 100).unwrap();
    assert!(mean >= 0.0);
    assert_eq!(engine.pool().in_use(), 0);
}

#[test]
fn test_skipped_configurations_are_null_in_json() {
    let engine = Engine::default();
    let harness = Harness::new(&engine, 1).unwrap();
    let sweep = Sweep::new(vec![100, 1_000], vec![100, 1_000]).unwrap();

    for scenario in Scenario::ALL {
        let outcome = harness.run(scenario, &sweep).unwrap();
        assert_eq!(outcome.table.len(), 3, "{scenario}");
        assert_eq!(outcome.table.get(100, 1_000), None, "{scenario}");
        assert_eq!(outcome.skipped, vec![(100, 1_000)]);
    }

    let outcome = harness.run(Scenario::Concat, &sweep).unwrap();
    let json: serde_json::Value = serde_json::from_str(&outcome.table.to_json().unwrap()).unwrap();
    assert!(json["1000"]["100"].is_null());
    assert!(json["1000"]["1000"].as_f64().unwrap() >= 0.0);
    assert!(json["100"]["100"].as_f64().unwrap() >= 0.0);
}

#[test]
fn test_results_written_under_label() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::default();
    let harness = Harness::new(&engine, 2).unwrap();
    let sweep = Sweep::new(vec![10, 100], vec![10]).unwrap();

    let outcome = harness.run(Scenario::SetCategoriesWorst, &sweep).unwrap();
    let path = results::output_path(dir.path(), "before");
    outcome.table.save(&path).unwrap();

    assert!(dir.path().join("categorical_bench_before.json").exists());
    let loaded = ResultTable::load(&path).unwrap();
    assert_eq!(loaded, outcome.table);

    let report = results::generate_report(
        Scenario::SetCategoriesWorst.name(),
        "before",
        "test",
        &outcome.table,
        &outcome.summaries,
    );
    let report_path = results::report_path(dir.path(), "before");
    results::save_report(&report, &report_path).unwrap();
    let written = std::fs::read_to_string(report_path).unwrap();
    assert!(written.contains("set_categories_worst"));
}

#[test]
fn test_undersized_pool_aborts_sweep() {
    let engine = Engine::new(pool_from(&FixedMemory(4_096)));
    let harness = Harness::new(&engine, 1).unwrap();
    let sweep = Sweep::new(vec![100_000], vec![100]).unwrap();

    let err = harness.run(Scenario::Join, &sweep).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::OutOfMemory { .. })
    ));
}

#[test]
fn test_pool_sizing_bounds() {
    for free in [0u64, 255, 10_000, 8 << 30, 24_000_000_000, 1 << 40] {
        let config = pool_from(&FixedMemory(free));
        assert!(config.pool);
        assert_eq!(config.initial_pool_size % POOL_ALIGNMENT, 0);
        assert!(config.initial_pool_size as f64 <= 0.95 * free as f64);
    }
}

#[test]
fn test_pool_fraction_other_than_default() {
    let free = 8u64 << 30;
    for fraction in [0.5, 0.25, 0.000_000_5, 0.333_333_333_3, 1.0] {
        let config = PoolConfig::from_free_memory(free, fraction).unwrap();
        assert_eq!(config.initial_pool_size % POOL_ALIGNMENT, 0);
        assert!(config.initial_pool_size as f64 <= fraction * free as f64);
        assert!(config.initial_pool_size as f64 > fraction * free as f64 - POOL_ALIGNMENT as f64);
    }
    assert_eq!(
        PoolConfig::from_free_memory(free, 0.5).unwrap().initial_pool_size,
        4u64 << 30
    );
}

#[test]
fn test_remap_past_f32_precision() {
    // New labels [6M, 18M) cross 2^24, where f32 can no longer hold every integer
    let shape = Shape::new(12_000_000, 12_000_000).unwrap();
    let engine = Engine::default();

    let worst = workload::remap_worst_case(&shape).unwrap();
    let remapped = engine
        .set_categories(&worst.column, &worst.new_categories)
        .unwrap();
    assert_eq!(remapped.categories().label_type(), LabelType::Float32);
    assert!(remapped.cardinality() < 12_000_000);
    // old labels [0, 12M) all sit below 2^24, so exactly half still match
    assert_eq!(remapped.null_count(), 6_000_000);
    assert_eq!(remapped.codes()[6_000_000], 0);

    let average = workload::remap_average_case(&shape).unwrap();
    let remapped = engine
        .set_categories(&average.column, &average.new_categories)
        .unwrap();
    assert_eq!(remapped.cardinality(), 12_000_000);
    assert_eq!(remapped.null_count(), 6_000_000);
}

#[test]
fn test_fillna_narrowing_marks_upper_half_missing() {
    let shape = Shape::new(10, 100).unwrap();
    let original = workload::categorical_column(&shape).unwrap();
    let input = workload::fillna_input(&shape).unwrap();

    assert_eq!(input.column.cardinality(), 5);
    let expected: HashSet<usize> = original
        .codes()
        .iter()
        .enumerate()
        .filter(|(_, &code)| code >= 5)
        .map(|(row, _)| row)
        .collect();
    let missing: HashSet<usize> = input
        .column
        .codes()
        .iter()
        .enumerate()
        .filter(|(_, &code)| code == MISSING_CODE)
        .map(|(row, _)| row)
        .collect();
    assert_eq!(missing, expected);
    assert_eq!(missing.len(), 50);

    let filled = Engine::default()
        .fillna(&input.column, &input.replacement)
        .unwrap();
    assert_eq!(filled.null_count(), 0);
}

#[test]
fn test_shapes_are_deterministic() {
    let shape = Shape::new(10, 1_000).unwrap();
    for scenario in Scenario::ALL {
        let first = format!("{:?}", scenario.prepare(&shape).unwrap());
        let second = format!("{:?}", scenario.prepare(&shape).unwrap());
        assert_eq!(first, second, "{scenario}");
    }
}

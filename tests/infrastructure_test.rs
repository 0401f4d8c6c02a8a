//! Tests for the ambient infrastructure: configuration, logging, snapshots

mod common;

use common::builders::{sparse_blocks, CompositeBuilder};
use vispipe::config::{ExecutiveConfig, ExecutiveKindConfig, LoggingConfig, PipelineConfig};
use vispipe::data::CompositeDataSet;
use vispipe::pipeline::{DataSource, ExecutiveKind, OutputPort, Passthrough, Pipeline};
use vispipe::{init_logging, VisPipeError};

#[test]
fn test_infrastructure_setup() {
    let blocks = CompositeBuilder::new().leaf("a").empty().build();
    assert_eq!(blocks.number_of_leaves(), 2);
}

#[test]
fn test_float_comparison() {
    common::assert_float_eq(1.0, 1.0000001, 0.001);
}

#[test]
#[should_panic]
fn test_float_comparison_fails() {
    common::assert_float_eq(1.0, 2.0, 0.001);
}

fn sample_config() -> PipelineConfig {
    PipelineConfig {
        executive: ExecutiveConfig {
            default_kind: ExecutiveKindConfig::ParallelComposite,
            worker_threads: 3,
        },
        logging: LoggingConfig {
            filter: "warn".to_string(),
            log_file: Some("logs/vispipe.log".into()),
            ansi: false,
        },
        ..PipelineConfig::default()
    }
}

#[test]
fn test_config_round_trip_json_and_toml() {
    let dir = tempfile::tempdir().unwrap();
    let config = sample_config();

    for name in ["pipeline.json", "nested/pipeline.toml"] {
        let path = dir.path().join(name);
        config.save(&path).unwrap();
        assert_eq!(PipelineConfig::load(&path).unwrap(), config, "{}", name);
    }

    let toml_text = std::fs::read_to_string(dir.path().join("nested/pipeline.toml")).unwrap();
    assert!(toml_text.contains("default_kind = \"parallel_composite\""));
}

#[test]
fn test_broken_config_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(matches!(
        PipelineConfig::load(&path),
        Err(VisPipeError::WithContext { .. })
    ));
    assert_eq!(PipelineConfig::load_or_default(&path), PipelineConfig::default());
    assert_eq!(
        PipelineConfig::load_or_default(dir.path().join("missing.json")),
        PipelineConfig::default()
    );
}

#[test]
fn test_pipeline_from_config_uses_configured_executive() {
    let mut pipeline = Pipeline::from_config(&sample_config()).unwrap();
    let source = pipeline.add_algorithm(DataSource::new("blocks", sparse_blocks()));
    let filter = pipeline.add_algorithm(Passthrough::new("copy"));
    pipeline
        .set_input_connection(filter, 0, OutputPort::new(source, 0))
        .unwrap();

    match pipeline.executive(filter).unwrap().kind() {
        ExecutiveKind::ParallelComposite(pool) => assert_eq!(pool.threads(), 3),
        other => panic!("expected a parallel executive, got {:?}", other),
    }
    pipeline.update(filter).unwrap();

    let demand = PipelineConfig {
        executive: ExecutiveConfig {
            default_kind: ExecutiveKindConfig::DemandDriven,
            worker_threads: 0,
        },
        ..PipelineConfig::default()
    };
    let mut pipeline = Pipeline::from_config(&demand).unwrap();
    let id = pipeline.add_algorithm(Passthrough::new("copy"));
    assert!(!pipeline.executive(id).unwrap().kind().is_composite());
}

#[test]
fn test_topology_snapshot_serializes() {
    let mut pipeline = Pipeline::new();
    let source = pipeline.add_algorithm(DataSource::new("blocks", sparse_blocks()));
    let filter = pipeline.add_algorithm(Passthrough::new("copy"));
    pipeline
        .set_input_connection(filter, 0, OutputPort::new(source, 0))
        .unwrap();

    let json = pipeline.topology_snapshot().to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["algorithms"].as_array().unwrap().len(), 2);
    assert_eq!(value["algorithms"][1]["name"], "copy");
    assert_eq!(value["algorithms"][1]["executive"], "sequential_composite");
    assert_eq!(value["connections"][0]["consumer_port"], 0);
}

#[test]
fn test_logging_writes_to_file_once() {
    let dir = tempfile::tempdir().unwrap();
    let log_file = dir.path().join("logs").join("vispipe.log");
    let config = LoggingConfig {
        filter: "info".to_string(),
        log_file: Some(log_file.clone()),
        ansi: false,
    };

    let guard = init_logging(&config).unwrap();
    assert!(guard.is_some());
    tracing::warn!("written to the log file");
    drop(guard);

    let content = std::fs::read_to_string(&log_file).unwrap();
    assert!(content.contains("written to the log file"));

    // A second subscriber cannot be installed
    assert!(matches!(
        init_logging(&LoggingConfig::default()),
        Err(VisPipeError::Config(_))
    ));
}

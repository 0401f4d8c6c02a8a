//! Integration tests for composite iteration
//!
//! These tests validate how composite executives treat composite inputs:
//! - The iterate-or-not decision
//! - Output structure and leaf order of the sequential executive
//! - Output container selection for box hierarchies
//! - Block failures, aborts and composite-index bookkeeping

mod common;

use common::builders::{
    box_hierarchy, numbered_blocks, source_filter_merge, source_to_filter, sparse_blocks,
    CompositeBuilder,
};
use common::mock_helpers::{AliasingFilter, GridShift, SlowMeshFilter, WorkDuration};
use common::{leaf_contents, mesh, mesh_point_count, shape_of, total_points};
use proptest::prelude::*;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use vispipe::data::{types, CompositeDataSet, DataObjectRef, FlatIndex, Mesh, UniformGrid};
use vispipe::pipeline::{
    keys, should_iterate_over_input, ExecutiveKind, InformationVector, MergeBlocks, OutputPort,
    Passthrough, PipelineError, PipelineEvent, PortInfo, RequestKind,
};

fn single_input(object: DataObjectRef) -> Vec<InformationVector> {
    let vector = InformationVector::with_len(1);
    vector.get(0).unwrap().set_data_object(Some(object));
    vec![vector]
}

#[test]
fn test_iteration_decision() {
    let ports = [PortInfo::requiring(types::MESH)];

    let composite = single_input(sparse_blocks());
    assert_eq!(should_iterate_over_input(&ports, &composite), Some(0));

    let leaf = single_input(mesh("m", &[0.0]));
    assert_eq!(should_iterate_over_input(&ports, &leaf), None);

    // A port that accepts composites gets the whole dataset
    let aware = [PortInfo::requiring(types::COMPOSITE_DATA_SET)];
    assert_eq!(should_iterate_over_input(&aware, &composite), None);

    // Empty requirements never iterate
    assert_eq!(should_iterate_over_input(&[PortInfo::new()], &composite), None);
}

#[test]
fn test_first_matching_port_wins() {
    let ports = [
        PortInfo::requiring(types::MESH),
        PortInfo::requiring(types::MESH),
    ];
    let inputs = vec![
        single_input(mesh("m", &[0.0])).remove(0),
        single_input(sparse_blocks()).remove(0),
    ];
    assert_eq!(should_iterate_over_input(&ports, &inputs), Some(1));

    let both = vec![
        single_input(sparse_blocks()).remove(0),
        single_input(sparse_blocks()).remove(0),
    ];
    assert_eq!(should_iterate_over_input(&ports, &both), Some(0));
}

#[test]
fn test_sequential_output_keeps_leaf_positions() {
    let input = sparse_blocks();
    let (pipeline, _, filter) = source_to_filter(
        input.clone(),
        Passthrough::new("copy"),
        ExecutiveKind::SequentialComposite,
    );
    pipeline.update(filter).unwrap();

    let output = pipeline.output_data(filter, 0).unwrap().unwrap();
    assert_eq!(output.type_name(), types::MULTI_BLOCK_DATA_SET);
    let leaves = leaf_contents(&output);
    assert_eq!(leaves.len(), 4);
    assert_eq!(leaves[0].as_ref().map(|l| l.0.as_str()), Some("A"));
    assert!(leaves[1].is_none());
    assert_eq!(leaves[2].as_ref().map(|l| l.0.as_str()), Some("B"));
    assert_eq!(leaves[3].as_ref().map(|l| l.0.as_str()), Some("C"));
    assert_eq!(leaf_contents(&output), leaf_contents(&input));
}

#[test]
fn test_passthrough_over_nested_composite() {
    let input = CompositeBuilder::new()
        .leaf("a")
        .nested(CompositeBuilder::new().leaf("bb").leaf("ccc"))
        .build_ref();
    let (pipeline, _, filter) = source_to_filter(
        input.clone(),
        Passthrough::new("copy"),
        ExecutiveKind::SequentialComposite,
    );
    pipeline.update(filter).unwrap();

    let output = pipeline.output_data(filter, 0).unwrap().unwrap();
    assert!(!output.ptr_eq(&input));
    assert_eq!(output.type_name(), types::MULTI_BLOCK_DATA_SET);
    assert_eq!(shape_of(&output), shape_of(&input));

    let out_guard = output.read();
    let in_guard = input.read();
    let out_leaves = out_guard.as_composite().unwrap().leaves();
    let in_leaves = in_guard.as_composite().unwrap().leaves();
    assert_eq!(out_leaves.len(), 3);
    for (out, inp) in out_leaves.iter().zip(&in_leaves) {
        let (out, inp) = (out.object.as_ref().unwrap(), inp.object.as_ref().unwrap());
        assert!(!out.ptr_eq(inp), "leaf must be a copy, not the input object");
        let shared = out
            .with(|o: &Mesh| inp.with(|i: &Mesh| o.shares_points_with(i)))
            .flatten();
        assert_eq!(shared, Some(true), "leaf copy must share the input payload");
    }
}

#[test]
fn test_demand_driven_executive_does_not_iterate() {
    let (pipeline, _, filter) = source_to_filter(
        sparse_blocks(),
        Passthrough::new("copy"),
        ExecutiveKind::DemandDriven,
    );
    assert!(matches!(
        pipeline.update(filter),
        Err(PipelineError::AlgorithmFailure {
            request: RequestKind::Data,
            ..
        })
    ));
}

#[test]
fn test_composite_aware_consumer_receives_iterated_output() {
    let (mut pipeline, _, filter) = source_to_filter(
        sparse_blocks(),
        Passthrough::new("copy"),
        ExecutiveKind::SequentialComposite,
    );
    let merge = pipeline.add_algorithm(MergeBlocks::new("merge"));
    pipeline
        .set_input_connection(merge, 0, OutputPort::new(filter, 0))
        .unwrap();
    pipeline.update(merge).unwrap();

    let merged = pipeline.output_data(merge, 0).unwrap().unwrap();
    assert_eq!(merged.with(|m: &Mesh| m.points().len()), Some(3));
}

#[test]
fn test_box_hierarchy_output_keeps_its_type() {
    let input = box_hierarchy(&[vec![true], vec![true, false, true]]);
    let (pipeline, source, filter) = source_to_filter(
        input.clone(),
        GridShift::new(10.0),
        ExecutiveKind::SequentialComposite,
    );
    pipeline.update(filter).unwrap();

    let output = pipeline.output_data(filter, 0).unwrap().unwrap();
    assert_eq!(output.type_name(), types::HIERARCHICAL_BOX_DATA_SET);
    assert_eq!(shape_of(&output), shape_of(&input));

    let guard = output.read();
    let leaves = guard.as_composite().unwrap().leaves();
    let scalars: Vec<Option<f64>> = leaves
        .iter()
        .map(|slot| {
            slot.object
                .as_ref()
                .and_then(|o| o.with(|g: &UniformGrid| g.scalars()[0]))
        })
        .collect();
    assert_eq!(scalars, vec![Some(10.0), Some(11.0), None, Some(11.0)]);

    // The trial call never touched the real input
    let upstream = pipeline.output_data(source, 0).unwrap().unwrap();
    assert!(upstream.ptr_eq(&input));
}

#[test]
fn test_output_container_follows_input_kind() {
    let input = box_hierarchy(&[vec![true, true]]);
    let (pipeline, _, filter) = source_to_filter(
        input,
        Passthrough::accepting("copy", &[types::MESH, types::UNIFORM_GRID]),
        ExecutiveKind::SequentialComposite,
    );
    pipeline.update(filter).unwrap();
    // The passthrough turns a grid into a grid, so the hierarchy is kept
    let output = pipeline.output_data(filter, 0).unwrap().unwrap();
    assert_eq!(output.type_name(), types::HIERARCHICAL_BOX_DATA_SET);

    let meshes = CompositeBuilder::new().leaf("a").build_ref();
    let (pipeline, _, filter) = source_to_filter(
        meshes,
        Passthrough::new("copy"),
        ExecutiveKind::SequentialComposite,
    );
    pipeline.update(filter).unwrap();
    let output = pipeline.output_data(filter, 0).unwrap().unwrap();
    assert_eq!(output.type_name(), types::MULTI_BLOCK_DATA_SET);
}

#[test]
fn test_failed_block_leaves_slot_empty() {
    let filter = SlowMeshFilter::new(WorkDuration::Fixed(Duration::ZERO)).failing_on("B");
    let (mut pipeline, _, id) =
        source_to_filter(sparse_blocks(), filter, ExecutiveKind::SequentialComposite);
    let events = pipeline.subscribe();

    let err = pipeline.update(id).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::AlgorithmFailure {
            request: RequestKind::Data,
            ..
        }
    ));

    let output = pipeline.output_data(id, 0).unwrap().unwrap();
    let labels: Vec<Option<String>> = leaf_contents(&output)
        .into_iter()
        .map(|leaf| leaf.map(|(label, _)| label))
        .collect();
    assert_eq!(
        labels,
        vec![Some("A".to_string()), None, None, Some("C".to_string())]
    );
    assert!(events
        .try_iter()
        .any(|e| e == PipelineEvent::BlockFailed { algorithm: id, block: FlatIndex(2) }));
}

#[test]
fn test_composite_indices_drive_re_execution() {
    let (pipeline, _, filter) = source_to_filter(
        sparse_blocks(),
        Passthrough::new("copy"),
        ExecutiveKind::SequentialComposite,
    );
    pipeline.set_update_composite_indices(filter, 0, &[2, 0]).unwrap();
    pipeline.update(filter).unwrap();

    let info = pipeline.output_information(filter, 0).unwrap();
    assert_eq!(
        info.get_integer_vector(keys::DATA_COMPOSITE_INDICES),
        Some(vec![0, 2])
    );
    let first = info.get_integer(keys::DATA_UPDATE_TIME);

    // A subset of what was delivered is already up to date
    pipeline.set_update_composite_indices(filter, 0, &[0]).unwrap();
    pipeline.update(filter).unwrap();
    assert_eq!(info.get_integer(keys::DATA_UPDATE_TIME), first);

    pipeline.set_update_composite_indices(filter, 0, &[0, 3]).unwrap();
    pipeline.update(filter).unwrap();
    assert!(info.get_integer(keys::DATA_UPDATE_TIME) > first);
}

#[test]
fn test_sequential_abort_stops_before_next_block() {
    let filter = SlowMeshFilter::new(WorkDuration::Fixed(Duration::from_millis(2)));
    let started = Arc::clone(&filter.started);
    let finished = Arc::clone(&filter.finished);
    let (pipeline, _, id) =
        source_to_filter(numbered_blocks(40), filter, ExecutiveKind::SequentialComposite);
    let abort = pipeline.abort_handle(id).unwrap();

    let result = std::thread::scope(|scope| {
        scope.spawn(|| {
            while started.load(Ordering::SeqCst) < 5 {
                std::thread::yield_now();
            }
            abort.abort();
        });
        pipeline.update(id)
    });

    assert!(matches!(result, Err(PipelineError::Aborted { .. })));
    let done = finished.load(Ordering::SeqCst);
    assert_eq!(started.load(Ordering::SeqCst), done);
    assert!(done < 40);

    let info = pipeline.output_information(id, 0).unwrap().snapshot();
    assert!(info.get_flag(keys::DATA_ABORTED));
    assert!(!info.get_flag(keys::DATA_GENERATED));
}

#[test]
fn test_aliased_output_does_not_write_into_input() {
    let input = sparse_blocks();
    let before = leaf_contents(&input);
    let (pipeline, source, filter) =
        source_to_filter(input.clone(), AliasingFilter, ExecutiveKind::SequentialComposite);
    pipeline.update(filter).unwrap();

    let output = pipeline.output_data(filter, 0).unwrap().unwrap();
    assert!(!output.ptr_eq(&input));
    assert_eq!(shape_of(&output), shape_of(&input));
    assert_eq!(leaf_contents(&output), before);

    // The input composite still holds its own leaves
    assert_eq!(leaf_contents(&input), before);
    assert!(pipeline.output_data(source, 0).unwrap().unwrap().ptr_eq(&input));
}

#[test]
fn test_pending_upstream_abort_does_not_block_consumers() {
    let input = numbered_blocks(12);
    let expected = total_points(&input);
    let slow = SlowMeshFilter::new(WorkDuration::Fixed(Duration::ZERO));
    let finished = Arc::clone(&slow.finished);
    let (pipeline, filter, merge) =
        source_filter_merge(input, slow, ExecutiveKind::SequentialComposite);

    // Aborting an idle filter only affects the run it would interrupt
    pipeline.abort_handle(filter).unwrap().abort();

    for round in 1..=3 {
        pipeline.modified(filter).unwrap();
        pipeline.update(merge).unwrap();
        assert_eq!(finished.load(Ordering::SeqCst), 12 * round);

        let info = pipeline.output_information(filter, 0).unwrap().snapshot();
        assert!(info.get_flag(keys::DATA_GENERATED));
        assert!(!info.get_flag(keys::DATA_ABORTED));
        let merged = pipeline.output_data(merge, 0).unwrap().unwrap();
        assert_eq!(mesh_point_count(&merged), Some(expected));
    }
}

#[test]
fn test_upstream_abort_is_reported_through_sink() {
    let input = numbered_blocks(40);
    let expected = total_points(&input);
    let slow = SlowMeshFilter::new(WorkDuration::Fixed(Duration::from_millis(2)));
    let started = Arc::clone(&slow.started);
    let finished = Arc::clone(&slow.finished);
    let (pipeline, filter, merge) =
        source_filter_merge(input, slow, ExecutiveKind::SequentialComposite);
    let abort = pipeline.abort_handle(filter).unwrap();

    let result = std::thread::scope(|scope| {
        scope.spawn(|| {
            while started.load(Ordering::SeqCst) < 5 {
                std::thread::yield_now();
            }
            abort.abort();
        });
        pipeline.update(merge)
    });

    assert!(
        matches!(result, Err(PipelineError::Aborted { ref algorithm }) if algorithm == "SlowMeshFilter"),
        "expected the filter's abort, got {:?}",
        result
    );
    let dispatched = finished.load(Ordering::SeqCst);
    assert!(dispatched < 40);
    let filter_info = pipeline.output_information(filter, 0).unwrap().snapshot();
    assert!(filter_info.get_flag(keys::DATA_ABORTED));
    let merge_info = pipeline.output_information(merge, 0).unwrap().snapshot();
    assert!(merge_info.get_flag(keys::DATA_ABORTED));
    assert!(!merge_info.get_flag(keys::DATA_GENERATED));

    // The next update through the sink runs the filter to completion
    pipeline.update(merge).unwrap();
    assert_eq!(finished.load(Ordering::SeqCst), dispatched + 40);
    let filter_info = pipeline.output_information(filter, 0).unwrap().snapshot();
    assert!(filter_info.get_flag(keys::DATA_GENERATED));
    assert!(!filter_info.get_flag(keys::DATA_ABORTED));
    let merged = pipeline.output_data(merge, 0).unwrap().unwrap();
    assert_eq!(mesh_point_count(&merged), Some(expected));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_box_iteration_preserves_structure(
        levels in prop::collection::vec(prop::collection::vec(any::<bool>(), 1..4), 1..4)
    ) {
        let input = box_hierarchy(&levels);
        let before = leaf_scalars(&input);
        let (pipeline, source, filter) = source_to_filter(
            input.clone(),
            GridShift::new(1.0),
            ExecutiveKind::SequentialComposite,
        );
        pipeline.update(filter).unwrap();

        let output = pipeline.output_data(filter, 0).unwrap().unwrap();
        prop_assert_eq!(output.type_name(), types::HIERARCHICAL_BOX_DATA_SET);
        prop_assert_eq!(shape_of(&output), shape_of(&input));

        let shifted: Vec<Option<f64>> = before.iter().map(|s| s.map(|v| v + 1.0)).collect();
        prop_assert_eq!(leaf_scalars(&output), shifted);
        // Nothing from the trial call leaked upstream
        prop_assert_eq!(leaf_scalars(&input), before);
        prop_assert!(pipeline.output_data(source, 0).unwrap().unwrap().ptr_eq(&input));
        let upstream = pipeline.output_information(source, 0).unwrap().snapshot();
        prop_assert!(upstream.get_extent(keys::WHOLE_EXTENT).is_none());
    }
}

fn leaf_scalars(object: &DataObjectRef) -> Vec<Option<f64>> {
    let guard = object.read();
    guard
        .as_composite()
        .map(|composite| composite.leaves())
        .unwrap_or_default()
        .iter()
        .map(|slot| {
            slot.object
                .as_ref()
                .and_then(|o| o.with(|g: &UniformGrid| g.scalars()[0]))
        })
        .collect()
}

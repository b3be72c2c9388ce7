//! Graph construction tests
//!
//! Scheduling, link resolution, cycle handling and connection callbacks,
//! observed through the active graph and rendered output.

use crate::helpers::tolerances::{FLOAT_EPSILON, SILENCE_THRESHOLD};
use crate::helpers::*;
use audionodes::core::ResolvedLink;
use audionodes::prelude::*;

fn position(order: &[NodeId], id: NodeId) -> usize {
    order.iter().position(|&n| n == id).unwrap()
}

/// A feeding sink B: A is evaluated first and B reads A's output.
#[test]
fn test_two_node_chain() {
    let engine = test_engine();
    let log = process_log();
    let (a, _) = Tap::source("A").value(0.5).log(&log).create(&engine);
    let (b, _) = Tap::sink("B").log(&log).create(&engine);

    let report = engine.update(|batch| batch.add_link(a, 0, b, 0)).unwrap();
    assert_eq!(report.scheduled, vec![a, b]);
    assert_eq!(engine.evaluation_order(), vec![a, b]);

    let graph = engine.active_graph().unwrap();
    assert_eq!(
        graph.links(1),
        &[ResolvedLink::Present {
            source_position: 0,
            source_socket: 0
        }]
    );
    assert_eq!(graph.links(0), &[ResolvedLink::Absent]);

    let block = render_block(&engine);
    assert!(block.iter().all(|&s| (s - 0.5).abs() < FLOAT_EPSILON));
    assert_eq!(*log.lock().unwrap(), vec!["A", "B"]);
}

/// A lone sink is scheduled and renders silence.
#[test]
fn test_lone_sink_is_silent() {
    let engine = test_engine();
    let sink = engine.create_node("SinkNode").unwrap();

    engine.update(|_| Ok(())).unwrap();

    assert_eq!(engine.evaluation_order(), vec![sink]);
    assert!(engine.node_state(sink).unwrap().connected);
    assert_silence(&render_block(&engine), SILENCE_THRESHOLD);
    assert_eq!(engine.render_stats().blocks_rendered, 1);
}

/// A cycle nothing listens to is simply unreachable.
#[test]
fn test_cycle_without_sink_is_empty() {
    let engine = test_engine();
    let (a, a_counters) = Tap::source("A").create(&engine);
    let (b, _) = Tap::source("B").create(&engine);

    let report = engine
        .update(|batch| {
            batch.add_link(a, 0, b, 0)?;
            batch.add_link(b, 0, a, 0)
        })
        .unwrap();

    assert!(report.scheduled.is_empty());
    assert!(report.connected.is_empty());
    assert_silence(&render_block(&engine), SILENCE_THRESHOLD);
    assert_eq!(a_counters.processed(), 0);
}

/// A cycle feeding a sink fails the rebuild and keeps the previous graph.
#[test]
fn test_cycle_keeps_previous_graph() {
    let engine = test_engine();
    let (a, _) = Tap::source("A").value(0.25).create(&engine);
    let (b, _) = Tap::source("B").create(&engine);
    let (sink, _) = Tap::sink("sink").create(&engine);

    engine.update(|batch| batch.add_link(a, 0, sink, 0)).unwrap();
    let before = engine.evaluation_order();

    let result = engine.update(|batch| {
        batch.add_link(a, 0, b, 0)?;
        batch.add_link(b, 0, a, 0)?;
        batch.add_link(b, 0, sink, 0)
    });

    assert!(matches!(
        result,
        Err(Error::CycleDetected {
            scheduled: 1,
            required: 3
        })
    ));
    assert_eq!(engine.evaluation_order(), before);
    assert!(!engine.node_state(b).unwrap().connected);

    let block = render_block(&engine);
    assert!(block.iter().all(|&s| (s - 0.25).abs() < FLOAT_EPSILON));
}

/// Nodes with no path to a sink are neither scheduled nor processed.
#[test]
fn test_unreachable_nodes_excluded() {
    let engine = test_engine();
    let (a, _) = Tap::source("A").create(&engine);
    let (orphan, orphan_counters) = Tap::source("orphan").create(&engine);
    let (dangling, _) = Tap::source("dangling").create(&engine);
    let (sink, _) = Tap::sink("sink").create(&engine);

    engine
        .update(|batch| {
            batch.add_link(a, 0, sink, 0)?;
            batch.add_link(orphan, 0, dangling, 0)
        })
        .unwrap();

    let order = engine.evaluation_order();
    assert_eq!(order, vec![a, sink]);
    assert!(!engine.node_state(orphan).unwrap().connected);

    render_blocks(&engine, 3);
    assert_eq!(orphan_counters.processed(), 0);
}

/// Every node runs after all of its sources.
#[test]
fn test_diamond_ordering() {
    let engine = test_engine();
    let (a, _) = Tap::source("A").value(0.1).create(&engine);
    let (b, _) = Tap::source("B").create(&engine);
    let (c, _) = Tap::source("C").create(&engine);
    let (d, _) = Tap::source("D").inputs(2).create(&engine);
    let (sink, _) = Tap::sink("sink").create(&engine);

    engine
        .update(|batch| {
            batch.add_link(a, 0, b, 0)?;
            batch.add_link(a, 0, c, 0)?;
            batch.add_link(b, 0, d, 0)?;
            batch.add_link(c, 0, d, 1)?;
            batch.add_link(d, 0, sink, 0)
        })
        .unwrap();

    let order = engine.evaluation_order();
    assert_eq!(order.len(), 5);
    assert!(position(&order, a) < position(&order, b));
    assert!(position(&order, a) < position(&order, c));
    assert!(position(&order, b) < position(&order, d));
    assert!(position(&order, c) < position(&order, d));
    assert!(position(&order, d) < position(&order, sink));

    // Both paths carry A's constant into D.
    let block = render_block(&engine);
    assert!(block.iter().all(|&s| (s - 0.2).abs() < 1e-5));
}

/// The last link into a socket wins.
#[test]
fn test_last_link_into_socket_wins() {
    let engine = test_engine();
    let (first, _) = Tap::source("first").value(0.1).create(&engine);
    let (second, _) = Tap::source("second").value(0.3).create(&engine);
    let (sink, _) = Tap::sink("sink").create(&engine);

    engine
        .update(|batch| {
            batch.add_link(first, 0, sink, 0)?;
            batch.add_link(second, 0, sink, 0)
        })
        .unwrap();

    let block = render_block(&engine);
    assert!(block.iter().all(|&s| (s - 0.3).abs() < FLOAT_EPSILON));
}

/// Outputs of every sink are mixed.
#[test]
fn test_sinks_are_mixed() {
    let engine = test_engine();
    let (left, _) = Tap::source("left").value(0.2).create(&engine);
    let (right, _) = Tap::source("right").value(0.3).create(&engine);
    let (sink_l, _) = Tap::sink("sink_l").create(&engine);
    let (sink_r, _) = Tap::sink("sink_r").create(&engine);

    engine
        .update(|batch| {
            batch.add_link(left, 0, sink_l, 0)?;
            batch.add_link(right, 0, sink_r, 0)
        })
        .unwrap();

    let block = render_block(&engine);
    assert!(block.iter().all(|&s| (s - 0.5).abs() < 1e-5));
}

/// Connect and disconnect callbacks fire once per transition.
#[test]
fn test_callbacks_once_per_transition() {
    let engine = test_engine();
    let (source, counters) = Tap::source("source").create(&engine);
    let (sink, _) = Tap::sink("sink").create(&engine);

    let report = engine
        .update(|batch| batch.add_link(source, 0, sink, 0))
        .unwrap();
    assert!(report.connected.contains(&source));
    assert_eq!(counters.connects(), 1);

    // Staying connected across a rebuild is not a transition.
    let report = engine
        .update(|batch| batch.add_link(source, 0, sink, 0))
        .unwrap();
    assert!(report.connected.is_empty());
    assert_eq!(counters.connects(), 1);
    assert_eq!(counters.disconnects(), 0);

    let report = engine.update(|_| Ok(())).unwrap();
    assert_eq!(report.disconnected, vec![source]);
    assert_eq!(counters.disconnects(), 1);
    assert!(!engine.node_state(source).unwrap().connected);

    engine
        .update(|batch| batch.add_link(source, 0, sink, 0))
        .unwrap();
    assert_eq!(counters.connects(), 2);
    assert_eq!(counters.disconnects(), 1);
}

/// Mismatched socket types and out-of-range sockets are rejected without
/// aborting the rest of the batch.
#[test]
fn test_rejected_links_do_not_abort_batch() {
    let engine = test_engine();
    let midi = engine.create_node("MidiInputNode").unwrap();
    let osc = engine.create_node("OscillatorNode").unwrap();
    let sink = engine.create_node("SinkNode").unwrap();

    let mut batch = engine.begin_update();
    assert!(matches!(
        batch.add_link(midi, 0, sink, 0),
        Err(Error::SocketTypeMismatch { .. })
    ));
    assert!(matches!(
        batch.add_link(osc, 3, sink, 0),
        Err(Error::InvalidSlot { .. })
    ));
    assert!(matches!(
        batch.add_link(osc, 0, sink, 7),
        Err(Error::InvalidSlot { .. })
    ));
    batch.add_link(osc, 0, sink, 0).unwrap();
    assert_eq!(batch.rejected(), 3);
    assert_eq!(batch.links().len(), 1);

    let report = batch.finish().unwrap();
    assert_eq!(report.scheduled, vec![osc, sink]);
    assert!(!engine.node_state(midi).unwrap().connected);
}

//! Integration Tests for the Graph Core
//!
//! These tests drive the public API end to end: collections, graph edits
//! across nested subgraphs, ordering and schedules.

use std::cell::RefCell;
use std::rc::Rc;

use trellis_core::collect::{BinaryHeap, Heap, Keyed, KeyedPriorityQueue, SkipSet};
use trellis_core::graph::{
    EventLog, Factor, FactorFunction, FactorGraph, GraphEvent, NodeKey, Variable, VariableKey, FLAT, TOP,
};
use trellis_core::schedule::{
    FloodingScheduler, PendingUpdates, ScheduleCache, Scheduler, SequentialDirectedScheduler, TreeScheduler,
};
use trellis_core::{Error, GraphOptions};

fn bits(graph: &mut FactorGraph, n: usize) -> Vec<VariableKey> {
    let root = graph.root();
    graph
        .add_variables(root, (0..n).map(|_| Variable::discrete(2)))
        .unwrap()
}

/// A connected variable cannot be removed until its factor is gone.
#[test]
fn ternary_factor_blocks_variable_removal() {
    let mut graph = FactorGraph::new();
    let root = graph.root();
    let v = bits(&mut graph, 3);
    let f1 = graph
        .add_factor(root, Factor::new(FactorFunction::named("f1")), &v)
        .unwrap();

    let err = graph.remove_variable(root, v[0]).unwrap_err();
    assert!(matches!(err, Error::VariableStillConnected { .. }));
    assert_eq!(graph.variable_count(root, FLAT).unwrap(), 3);

    graph.remove_factor(root, f1).unwrap();
    for &variable in &v {
        graph.remove_variable(root, variable).unwrap();
    }
    assert_eq!(graph.variable_count(root, FLAT).unwrap(), 0);
    assert_eq!(graph.factor_count(root, FLAT).unwrap(), 0);
}

/// The skip list and the heap agree on ascending order.
#[test]
fn skip_list_and_heap_sort_the_same_keys() {
    let keys = [5, 3, 8, 1, 4];

    let set: SkipSet<i32> = keys.iter().copied().collect();
    let from_set: Vec<i32> = set.iter().copied().collect();

    let mut heap = BinaryHeap::new();
    for key in keys {
        heap.offer(key, f64::from(key)).unwrap();
    }
    let from_heap: Vec<i32> = std::iter::from_fn(|| heap.poll()).collect();

    assert_eq!(from_set, vec![1, 3, 4, 5, 8]);
    assert_eq!(from_heap, from_set);
}

#[derive(Debug, Clone, PartialEq)]
struct Job {
    id: u32,
    cost: u32,
}

impl Keyed for Job {
    type Key = u32;

    fn key(&self) -> u32 {
        self.id
    }
}

/// Offering a second element with the same key keeps the first.
#[test]
fn keyed_queue_keeps_first_writer() {
    let mut queue = KeyedPriorityQueue::with_comparator(|a: &Job, b: &Job| a.cost.cmp(&b.cost));
    assert!(queue.offer(Job { id: 1, cost: 10 }));
    assert!(!queue.offer(Job { id: 1, cost: 0 }));
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.peek(), Some(&Job { id: 1, cost: 10 }));

    queue.remove_key(&1);
    assert!(queue.offer(Job { id: 1, cost: 0 }));
    assert_eq!(queue.poll().map(|job| job.cost), Some(0));
    assert_eq!(queue.element(), Err(Error::Empty));
}

/// Joining one factor over its own variables leaves the graph alone.
#[test]
fn trivial_join_is_a_no_op() {
    let mut graph = FactorGraph::new();
    let root = graph.root();
    let v = bits(&mut graph, 2);
    let f = graph
        .add_factor(root, Factor::new(FactorFunction::named("pair")), &v)
        .unwrap();
    let version = graph.global_structure_version();

    assert_eq!(graph.join_factors_with_variables(&v, &[f]).unwrap(), f);
    assert_eq!(graph.join_factors(&[f]).unwrap(), f);
    assert_eq!(graph.global_structure_version(), version);
}

/// Nodes on a directed cycle are left out of the order; the rest is ordered.
#[test]
fn directed_cycle_is_omitted() {
    let mut graph = FactorGraph::new();
    let root = graph.root();
    let v = bits(&mut graph, 3);
    let step = |graph: &mut FactorGraph, from: VariableKey, to: VariableKey| {
        let f = graph
            .add_factor(root, Factor::new(FactorFunction::named("step")), &[from, to])
            .unwrap();
        graph.set_directed_to(f, &[to]).unwrap();
        f
    };
    let f = step(&mut graph, v[0], v[1]);
    let g = step(&mut graph, v[1], v[2]);
    let h = step(&mut graph, v[2], v[1]);

    let order = graph.directed_node_order(root).unwrap();
    let ordered: Vec<NodeKey> = order.keys().copied().collect();
    assert_eq!(ordered, vec![v[0].node(), f.node()]);
    for node in [v[1].node(), v[2].node(), g.node(), h.node()] {
        assert!(!order.contains_key(&node));
    }
}

/// Absorbing moves a subgraph's contents up; removing takes them away.
#[test]
fn nested_absorb_and_remove() {
    let log = Rc::new(RefCell::new(EventLog::new()));
    let mut graph = FactorGraph::new();
    graph.set_event_sink(Some(Box::new(Rc::clone(&log))));
    let root = graph.root();
    let a = graph.add_variable(root, Variable::discrete(2)).unwrap();

    let sub = graph.add_subgraph(root).unwrap();
    let b = graph.add_variable(sub, Variable::discrete(3)).unwrap();
    let f = graph
        .add_factor(sub, Factor::new(FactorFunction::named("link")), &[a, b])
        .unwrap();
    assert!(graph.is_boundary_variable(sub, a).unwrap());
    assert_eq!(graph.factor_count(root, TOP).unwrap(), 0);
    assert_eq!(graph.factor_count(root, FLAT).unwrap(), 1);

    graph.absorb_subgraph(root, sub).unwrap();
    assert!(!graph.contains(sub.node()));
    assert_eq!(graph.parent_graph(f.node()).unwrap(), Some(root));
    assert_eq!(graph.factor_variables(f).unwrap(), vec![a, b]);
    assert_eq!(graph.subgraphs(root, FLAT).unwrap(), vec![]);

    let events = log.borrow_mut().drain();
    assert!(events.contains(&GraphEvent::FactorAdded { graph: root, factor: f, absorbed: true }));
    assert!(events.contains(&GraphEvent::SubgraphRemoved { graph: root, subgraph: sub, absorbed: true }));

    let inner = graph.add_subgraph(root).unwrap();
    let c = graph.add_variable(inner, Variable::discrete(2)).unwrap();
    graph
        .add_factor(inner, Factor::new(FactorFunction::named("tie")), &[b, c])
        .unwrap();
    graph.remove_subgraph(root, inner).unwrap();
    assert!(!graph.contains(c.node()));
    // b is still used by f, so it stays.
    assert!(graph.contains(b.node()));
    assert_eq!(graph.variable_factors(b).unwrap(), vec![f]);
}

/// A cached schedule is reused until the structure changes.
#[test]
fn schedules_go_stale_on_edits() {
    let mut graph = FactorGraph::new();
    let root = graph.root();
    let v = bits(&mut graph, 3);
    graph
        .add_factor(root, Factor::new(FactorFunction::named("pair")), &v[..2])
        .unwrap();

    let mut cache = ScheduleCache::new(FloodingScheduler);
    let first = cache.schedule(&graph, root).unwrap().clone();
    assert!(!first.is_stale(&graph));

    graph
        .add_factor(root, Factor::new(FactorFunction::named("pair")), &v[1..])
        .unwrap();
    assert!(first.is_stale(&graph));
    let second = cache.schedule(&graph, root).unwrap();
    assert_eq!(second.len(), first.len() + 1);
    assert_eq!(cache.rebuilds(), 2);
}

/// Tree schedules touch each edge twice; pending work follows the schedule.
#[test]
fn tree_schedule_drives_pending_updates() {
    let mut graph = FactorGraph::new();
    let root = graph.root();
    let v = bits(&mut graph, 3);
    let f = graph
        .add_factor(root, Factor::new(FactorFunction::named("pair")), &v[..2])
        .unwrap();
    graph
        .add_factor(root, Factor::new(FactorFunction::named("pair")), &v[1..])
        .unwrap();

    let schedule = TreeScheduler.create_schedule(&graph, root).unwrap();
    assert_eq!(schedule.len(), 2 * graph.edge_count(root).unwrap());

    let mut pending = PendingUpdates::new();
    assert_eq!(pending.mark_changed(&graph, &schedule, f.node()).unwrap(), 2);
    let first = pending.pop().unwrap();
    let second = pending.pop().unwrap();
    assert!(first.rank <= second.rank);
    assert!(pending.is_empty());
}

/// The directed scheduler honours the configured seed and is repeatable.
#[test]
fn seeded_directed_schedules_repeat() {
    let options = GraphOptions::from_json(r#"{ "schedule_seed": 11 }"#).unwrap();
    let mut graph = FactorGraph::with_options(options);
    let root = graph.root();
    let v = bits(&mut graph, 4);
    for pair in v.windows(2) {
        let f = graph
            .add_factor(root, Factor::new(FactorFunction::named("step")), pair)
            .unwrap();
        graph.set_directed_to(f, &[pair[1]]).unwrap();
    }
    let a = SequentialDirectedScheduler::new().create_schedule(&graph, root).unwrap();
    let b = SequentialDirectedScheduler::new().create_schedule(&graph, root).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.len(), 3);
}

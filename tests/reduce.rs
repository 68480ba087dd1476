//! Tests for common-subexpression elimination over values and nodes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lazy_flow::{
    computation, tactics, Computation, Graph, Inputs, Node, NodeId, NodeStatus, Outputs, Port,
    Process, ValueId,
};

/// Multiplies its inputs and counts how often it was started.
#[derive(Default)]
struct Multiply {
    executions: AtomicUsize,
}

impl Process<i64> for Multiply {
    fn inputs(&self) -> &[Port] {
        const INPUTS: &[Port] = &[Port::new("first"), Port::new("second")];
        INPUTS
    }

    fn outputs(&self) -> &[Port] {
        const OUTPUTS: &[Port] = &[Port::new("result")];
        OUTPUTS
    }

    fn execute(&self, inputs: Inputs<i64>) -> Box<dyn Computation<i64>> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        let product = inputs["first"] * inputs["second"];
        Box::new(computation::delayed(
            1,
            Outputs::new().with("result", product),
        ))
    }
}

fn multiply(
    graph: &mut Graph<i64>,
    process: &Arc<Multiply>,
    first: ValueId,
    second: ValueId,
) -> NodeId {
    let node = Node::new(process.clone())
        .bind("first", first)
        .bind("second", second);
    graph.add_node(node).unwrap().unwrap()
}

/// Four `1 * 1` nodes, each over its own pair of constants.
fn four_products(graph: &mut Graph<i64>, process: &Arc<Multiply>) -> Vec<ValueId> {
    (0..4)
        .map(|_| {
            let first = graph.constant(1);
            let second = graph.constant(1);
            let node = multiply(graph, process, first, second);
            graph.output(node, "result").unwrap()
        })
        .collect()
}

// =============================================================================
// Value reduction
// =============================================================================

#[test]
fn test_reduce_values_merges_equal_constants() {
    let mut graph = Graph::new();
    let one = graph.constant(1);
    let two = graph.constant(2);
    let another_one = graph.constant(1);
    let another_two = graph.constant(2);

    assert!(tactics::reduce_values(&mut graph));
    assert_eq!(graph.value_ids(), vec![one, two]);
    assert_eq!(graph.resolve_value(another_one), Some(one));
    assert_eq!(graph.resolve_value(another_two), Some(two));
    assert_eq!(graph.value(another_two), Some(&2));

    assert!(!tactics::reduce_values(&mut graph));
}

#[test]
fn test_reduce_values_leaves_pending_outputs() {
    let mut graph = Graph::new();
    let process = Arc::new(Multiply::default());
    let results = four_products(&mut graph, &process);

    assert!(tactics::reduce_values(&mut graph));
    // Eight constants collapse into one; the four pending outputs stay.
    assert_eq!(graph.value_count(), 5);
    assert!(results.iter().all(|r| graph.resolve_value(*r) == Some(*r)));
}

#[test]
fn test_reduce_values_before_and_after_execution() {
    let mut graph = Graph::new();
    let process = Arc::new(Multiply::default());
    let first = graph.constant(1);
    let second = graph.constant(1);
    let node = multiply(&mut graph, &process, first, second);
    let result = graph.output(node, "result").unwrap();

    tactics::reduce_values(&mut graph);
    assert_eq!(graph.value_count(), 2);

    while tactics::execute(&mut graph).unwrap() {}
    assert_eq!(graph.value(result), Some(&1));

    tactics::reduce_values(&mut graph);
    assert_eq!(graph.value_count(), 1);
    assert_eq!(graph.resolve_value(result), Some(first));
}

// =============================================================================
// Node reduction
// =============================================================================

#[test]
fn test_identical_nodes_are_rejected_on_add() {
    let mut graph = Graph::new();
    let process = Arc::new(Multiply::default());
    let first = graph.constant(1);
    let second = graph.constant(1);
    let node = multiply(&mut graph, &process, first, second);

    for _ in 0..3 {
        let duplicate = Node::new(process.clone())
            .bind("first", first)
            .bind("second", second);
        assert_eq!(graph.add_node(duplicate), Ok(None));
    }
    assert_eq!(graph.node_ids(), vec![node]);
    assert!(!tactics::reduce_nodes(&mut graph));
}

#[test]
fn test_reduce_nodes_needs_shared_inputs() {
    let mut graph = Graph::new();
    let process = Arc::new(Multiply::default());
    four_products(&mut graph, &process);

    // Distinct constant cells keep the nodes apart until values are merged.
    assert!(!tactics::reduce_nodes(&mut graph));
    assert_eq!(graph.node_count(), 4);

    tactics::reduce_values(&mut graph);
    assert!(tactics::reduce_nodes(&mut graph));
    assert_eq!(graph.node_count(), 1);
}

#[test]
fn test_reduce_nodes_respects_process_identity() {
    let mut graph = Graph::new();
    let one = graph.constant(1);
    let left = multiply(&mut graph, &Arc::new(Multiply::default()), one, one);
    let right = multiply(&mut graph, &Arc::new(Multiply::default()), one, one);

    assert!(!tactics::reduce_nodes(&mut graph));
    assert_eq!(graph.node_ids(), vec![left, right]);
}

#[test]
fn test_reduce_to_fixpoint() {
    let mut graph = Graph::new();
    let process = Arc::new(Multiply::default());
    let results = four_products(&mut graph, &process);
    assert_eq!(graph.node_count(), 4);
    assert_eq!(graph.value_count(), 12);

    assert!(tactics::reduce(&mut graph));
    assert_eq!(graph.node_count(), 1);
    assert_eq!(graph.value_count(), 2);
    assert!(!tactics::reduce(&mut graph));

    let survivor = graph.resolve_value(results[0]);
    assert!(results.iter().all(|r| graph.resolve_value(*r) == survivor));

    while tactics::execute(&mut graph).unwrap() {}
    assert_eq!(process.executions.load(Ordering::SeqCst), 1);
    assert!(results.iter().all(|r| graph.value(*r) == Some(&1)));

    // The product equals the shared constant, so it folds into it.
    assert!(tactics::reduce(&mut graph));
    assert_eq!(graph.node_count(), 1);
    assert_eq!(graph.value_count(), 1);
    assert!(results.iter().all(|r| graph.value(*r) == Some(&1)));
}

#[test]
fn test_chained_duplicates_collapse() {
    // Two copies of (2 * 3) * 4 built from separate cells.
    let mut graph = Graph::new();
    let process = Arc::new(Multiply::default());
    let mut totals = Vec::new();
    for _ in 0..2 {
        let two = graph.constant(2);
        let three = graph.constant(3);
        let four = graph.constant(4);
        let inner = multiply(&mut graph, &process, two, three);
        let six = graph.output(inner, "result").unwrap();
        let outer = multiply(&mut graph, &process, six, four);
        totals.push(graph.output(outer, "result").unwrap());
    }

    assert!(tactics::reduce(&mut graph));
    assert_eq!(graph.node_count(), 2);

    assert!(tactics::run(&mut graph).is_empty());
    assert_eq!(process.executions.load(Ordering::SeqCst), 2);
    assert_eq!(graph.value(totals[0]), Some(&24));
    assert_eq!(graph.value(totals[1]), Some(&24));
}

// =============================================================================
// Survivor selection
// =============================================================================

#[test]
fn test_running_node_survives_merge() {
    let mut graph = Graph::new();
    let process = Arc::new(Multiply::default());
    let one = graph.constant(1);
    let first_two = graph.constant(2);
    let second_two = graph.constant(2);
    let orig = multiply(&mut graph, &process, one, first_two);
    let copy = multiply(&mut graph, &process, one, second_two);

    // Only the copy gets started.
    graph.drive(copy).unwrap();
    assert_eq!(graph.node_status(orig), Some(NodeStatus::NotStarted));
    assert_eq!(graph.node_status(copy), Some(NodeStatus::Running));

    assert!(tactics::reduce(&mut graph));
    assert_eq!(graph.node_ids(), vec![copy]);
    assert_eq!(graph.resolve_node(orig), Some(copy));

    while tactics::execute(&mut graph).unwrap() {}
    assert_eq!(process.executions.load(Ordering::SeqCst), 1);
    assert_eq!(graph.value(graph.output(orig, "result").unwrap()), Some(&2));
}

#[test]
fn test_done_node_survives_merge() {
    let mut graph = Graph::new();
    let process = Arc::new(Multiply::default());
    let three = graph.constant(3);
    let orig_input = graph.constant(5);
    let orig = multiply(&mut graph, &process, three, orig_input);
    let orig_result = graph.output(orig, "result").unwrap();

    let copy_input = graph.constant(5);
    let copy = multiply(&mut graph, &process, three, copy_input);
    graph.drive(copy).unwrap();
    graph.drive(copy).unwrap();
    assert_eq!(graph.node_status(copy), Some(NodeStatus::Done));

    tactics::reduce(&mut graph);
    assert_eq!(graph.resolve_node(orig), Some(copy));
    assert_eq!(graph.node_status(orig), Some(NodeStatus::Done));
    assert_eq!(graph.value(orig_result), Some(&15));
    assert!(!graph.ready());
    assert_eq!(process.executions.load(Ordering::SeqCst), 1);
}

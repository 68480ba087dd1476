//! Tests for driving arithmetic graphs to completion.

use std::sync::Arc;

use lazy_flow::{
    computation, tactics, Computation, Graph, Inputs, Node, NodeId, NodeStatus, Outputs, Port,
    Process, Step, ValueId,
};

// =============================================================================
// Processes
// =============================================================================

struct Add;

impl Process<i64> for Add {
    fn name(&self) -> &str {
        "add"
    }

    fn inputs(&self) -> &[Port] {
        const INPUTS: &[Port] = &[Port::new("first"), Port::new("second")];
        INPUTS
    }

    fn outputs(&self) -> &[Port] {
        const OUTPUTS: &[Port] = &[Port::new("result")];
        OUTPUTS
    }

    fn execute(&self, inputs: Inputs<i64>) -> Box<dyn Computation<i64>> {
        let sum = inputs["first"] + inputs["second"];
        Box::new(computation::ready(Outputs::new().with("result", sum)))
    }
}

struct Multiply;

impl Process<i64> for Multiply {
    fn name(&self) -> &str {
        "multiply"
    }

    fn inputs(&self) -> &[Port] {
        const INPUTS: &[Port] = &[Port::new("first"), Port::new("second")];
        INPUTS
    }

    fn outputs(&self) -> &[Port] {
        const OUTPUTS: &[Port] = &[Port::new("result")];
        OUTPUTS
    }

    fn execute(&self, inputs: Inputs<i64>) -> Box<dyn Computation<i64>> {
        let product = inputs["first"] * inputs["second"];
        Box::new(computation::ready(Outputs::new().with("result", product)))
    }
}

/// Counts down from its input, one step per poll.
struct Countdown;

impl Process<i64> for Countdown {
    fn inputs(&self) -> &[Port] {
        const INPUTS: &[Port] = &[Port::new("from")];
        INPUTS
    }

    fn outputs(&self) -> &[Port] {
        const OUTPUTS: &[Port] = &[Port::new("steps")];
        OUTPUTS
    }

    fn execute(&self, inputs: Inputs<i64>) -> Box<dyn Computation<i64>> {
        let mut remaining = inputs["from"];
        let mut steps: i64 = 0;
        Box::new(computation::from_fn(move || -> anyhow::Result<Step<i64>> {
            if remaining == 0 {
                return Ok(Step::Ready(Outputs::new().with("steps", steps)));
            }
            remaining -= 1;
            steps += 1;
            Ok(Step::Pending)
        }))
    }
}

fn binary(
    graph: &mut Graph<i64>,
    process: Arc<dyn Process<i64>>,
    first: ValueId,
    second: ValueId,
) -> NodeId {
    let node = Node::from_shared(process)
        .bind("first", first)
        .bind("second", second);
    graph.add_node(node).unwrap().unwrap()
}

fn run_to_end(graph: &mut Graph<i64>) -> usize {
    let mut ticks = 0;
    while tactics::execute(graph).unwrap() {
        ticks += 1;
    }
    ticks
}

// =============================================================================
// Single node
// =============================================================================

#[test]
fn test_add() {
    let mut graph = Graph::new();
    let one = graph.constant(1);
    let two = graph.constant(2);
    let add = binary(&mut graph, Arc::new(Add), one, two);
    let result = graph.output(add, "result").unwrap();

    assert!(graph.ready());
    assert_eq!(run_to_end(&mut graph), 1);
    assert_eq!(graph.value(result), Some(&3));
    assert!(graph.done());
    assert!(!graph.error());
}

#[test]
fn test_multiply() {
    let mut graph = Graph::new();
    let first = graph.constant(1);
    let second = graph.constant(1);
    let multiply = binary(&mut graph, Arc::new(Multiply), first, second);
    let result = graph.output(multiply, "result").unwrap();

    run_to_end(&mut graph);
    assert_eq!(graph.value(result), Some(&1));
    assert_eq!(graph.process_name(multiply), Some("multiply"));
}

// =============================================================================
// Chains
// =============================================================================

#[test]
fn test_chain_runs_one_level_per_tick() {
    // (2 + 3) * (2 + 3) + 1
    let mut graph = Graph::new();
    let add: Arc<dyn Process<i64>> = Arc::new(Add);
    let multiply: Arc<dyn Process<i64>> = Arc::new(Multiply);
    let two = graph.constant(2);
    let three = graph.constant(3);
    let one = graph.constant(1);

    let sum = binary(&mut graph, add.clone(), two, three);
    let sum = graph.output(sum, "result").unwrap();
    let square = binary(&mut graph, multiply, sum, sum);
    let square = graph.output(square, "result").unwrap();
    let total = binary(&mut graph, add, square, one);
    let total = graph.output(total, "result").unwrap();

    assert_eq!(graph.value(total), None);
    assert_eq!(run_to_end(&mut graph), 3);
    assert_eq!(graph.value(sum), Some(&5));
    assert_eq!(graph.value(square), Some(&25));
    assert_eq!(graph.value(total), Some(&26));
}

#[test]
fn test_run_collects_no_failures() {
    let mut graph = Graph::new();
    let add: Arc<dyn Process<i64>> = Arc::new(Add);
    let one = graph.constant(1);
    let first = binary(&mut graph, add.clone(), one, one);
    let first = graph.output(first, "result").unwrap();
    let second = binary(&mut graph, add, first, first);
    let second = graph.output(second, "result").unwrap();

    assert!(tactics::run(&mut graph).is_empty());
    assert_eq!(graph.value(second), Some(&4));
}

// =============================================================================
// Resumable computations
// =============================================================================

#[test]
fn test_pending_computation_is_polled_each_tick() {
    let mut graph = Graph::new();
    let three = graph.constant(3);
    let countdown = graph
        .add_node(Node::new(Arc::new(Countdown)).bind("from", three))
        .unwrap()
        .unwrap();
    let steps = graph.output(countdown, "steps").unwrap();

    for _ in 0..3 {
        assert!(tactics::execute(&mut graph).unwrap());
        assert_eq!(graph.node_status(countdown), Some(NodeStatus::Running));
        assert!(graph.running());
        assert!(!graph.ready());
        assert_eq!(graph.value(steps), None);
    }

    assert!(tactics::execute(&mut graph).unwrap());
    assert_eq!(graph.node_status(countdown), Some(NodeStatus::Done));
    assert_eq!(graph.value(steps), Some(&3));
    assert!(!tactics::execute(&mut graph).unwrap());
}

#[test]
fn test_dependent_waits_for_running_producer() {
    let mut graph = Graph::new();
    let two = graph.constant(2);
    let countdown = graph
        .add_node(Node::new(Arc::new(Countdown)).bind("from", two))
        .unwrap()
        .unwrap();
    let steps = graph.output(countdown, "steps").unwrap();
    let add = binary(&mut graph, Arc::new(Add), steps, two);
    let result = graph.output(add, "result").unwrap();

    tactics::execute(&mut graph).unwrap();
    tactics::execute(&mut graph).unwrap();
    assert_eq!(graph.node_status(add), Some(NodeStatus::NotStarted));
    assert!(!graph.is_node_ready(add));

    run_to_end(&mut graph);
    assert_eq!(graph.value(result), Some(&4));
}

#[cfg(feature = "async-process")]
mod future {
    use std::future::Future;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use super::*;

    struct YieldNow(bool);

    impl Future for YieldNow {
        type Output = ();

        fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
            if self.0 {
                Poll::Ready(())
            } else {
                self.0 = true;
                Poll::Pending
            }
        }
    }

    struct AsyncDouble;

    impl Process<i64> for AsyncDouble {
        fn inputs(&self) -> &[Port] {
            const INPUTS: &[Port] = &[Port::new("value")];
            INPUTS
        }

        fn outputs(&self) -> &[Port] {
            const OUTPUTS: &[Port] = &[Port::new("result")];
            OUTPUTS
        }

        fn execute(&self, inputs: Inputs<i64>) -> Box<dyn Computation<i64>> {
            let value = inputs["value"];
            Box::new(computation::from_future(async move {
                YieldNow(false).await;
                Ok::<_, anyhow::Error>(Outputs::new().with("result", value * 2))
            }))
        }
    }

    #[test]
    fn test_future_computation_resumes_across_ticks() {
        let mut graph = Graph::new();
        let value = graph.constant(21);
        let double = graph
            .add_node(Node::new(Arc::new(AsyncDouble)).bind("value", value))
            .unwrap()
            .unwrap();
        let result = graph.output(double, "result").unwrap();

        assert!(tactics::execute(&mut graph).unwrap());
        assert_eq!(graph.node_status(double), Some(NodeStatus::Running));

        assert!(tactics::execute(&mut graph).unwrap());
        assert_eq!(graph.value(result), Some(&42));
    }
}

//! Lazy-Flow: a lazy dataflow engine with common-subexpression elimination.
//!
//! Computations are bound into a [`Graph`] of nodes that read and write
//! single-assignment value cells. Nodes are driven by cooperative polling, one
//! step per engine tick, and duplicate work can be collapsed before or during
//! execution.
//!
//! # Key Features
//!
//! - **Resumable computations**: a [`Process`] starts a [`Computation`] that is
//!   polled until it yields its outputs, so long work never blocks a tick
//! - **Permanent outcomes**: a node that finished or failed is never run again
//! - **Value CSE**: ready cells holding equal values are merged
//! - **Node CSE**: nodes running the same process instance on the same inputs
//!   are merged, keeping the one that is further along
//! - **Stable handles**: handles of merged-away cells and nodes keep resolving
//!   to the survivor
//! - **Observability**: a [`Tracer`] receives lifecycle and merge events
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use lazy_flow::{computation, tactics, Computation, Graph, Inputs, Node, Outputs, Port, Process};
//!
//! struct Add;
//!
//! impl Process<i64> for Add {
//!     fn inputs(&self) -> &[Port] {
//!         const INPUTS: &[Port] = &[Port::new("first"), Port::new("second")];
//!         INPUTS
//!     }
//!
//!     fn outputs(&self) -> &[Port] {
//!         const OUTPUTS: &[Port] = &[Port::new("result")];
//!         OUTPUTS
//!     }
//!
//!     fn execute(&self, inputs: Inputs<i64>) -> Box<dyn Computation<i64>> {
//!         let sum = inputs["first"] + inputs["second"];
//!         Box::new(computation::ready(Outputs::new().with("result", sum)))
//!     }
//! }
//!
//! let mut graph = Graph::new();
//! let one = graph.constant(1);
//! let two = graph.constant(2);
//! let add = graph
//!     .add_node(Node::new(Arc::new(Add)).bind("first", one).bind("second", two))?
//!     .expect("not a duplicate");
//! let result = graph.output(add, "result").unwrap();
//!
//! while tactics::execute(&mut graph)? {}
//! assert_eq!(graph.value(result), Some(&3));
//! ```
//!
//! # Features
//!
//! - `async-process` (default): [`computation::from_future`] drives a `Future`
//! - `recording-tracer` (default): [`RecordingTracer`] keeps events in memory

#![deny(missing_docs)]

pub mod computation;
mod error;
mod graph;
mod node;
mod process;
pub mod tactics;
pub mod tracer;
mod value;

pub use error::{BindError, ExecuteError, NodeError};
pub use graph::{Graph, GraphBuilder};
pub use node::{Node, NodeId, NodeStatus};
pub use process::{Computation, Inputs, Outputs, Port, Process, Step};
pub use tracer::{LogTracer, NoopTracer, Tracer};
#[cfg(feature = "recording-tracer")]
pub use tracer::{RecordingTracer, TraceEvent};
pub use value::{Datum, TypeTag, ValueId};

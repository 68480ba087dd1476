//! Node bindings and the per-node execution state machine.

use std::fmt;
use std::sync::Arc;

use crate::error::NodeError;
use crate::process::{Computation, Outputs, Process};
use crate::value::{Datum, ValueId};

/// Handle to a node owned by a [`Graph`](crate::Graph).
///
/// A handle whose node was merged into a structural duplicate resolves to the
/// surviving node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A process instance together with its input bindings, ready to be added to a graph.
///
/// Output values are allocated by [`Graph::add_node`](crate::Graph::add_node).
///
/// # Example
///
/// ```ignore
/// let add = Arc::new(Add);
/// let node = Node::new(add).bind("first", one).bind("second", two);
/// let id = graph.add_node(node)?.expect("not a duplicate");
/// let result = graph.output(id, "result").unwrap();
/// ```
pub struct Node<T> {
    pub(crate) process: Arc<dyn Process<T>>,
    pub(crate) bindings: Vec<(String, ValueId)>,
}

impl<T> Node<T> {
    /// Start binding a process.
    pub fn new<P: Process<T>>(process: Arc<P>) -> Self {
        Self::from_shared(process)
    }

    /// Start binding an already type-erased process.
    pub fn from_shared(process: Arc<dyn Process<T>>) -> Self {
        Self {
            process,
            bindings: Vec::new(),
        }
    }

    /// Bind an input to a value.
    #[must_use]
    pub fn bind(mut self, input: impl Into<String>, value: ValueId) -> Self {
        self.bindings.push((input.into(), value));
        self
    }
}

impl<T: 'static> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("process", &self.process.name())
            .field("bindings", &self.bindings)
            .finish()
    }
}

/// Coarse execution state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeStatus {
    /// Waiting for its inputs.
    NotStarted,
    /// Computation started and not yet finished.
    Running,
    /// Finished; outputs are written.
    Done,
    /// Failed permanently.
    Error,
}

impl NodeStatus {
    /// Returns true for `Done` and `Error`, which a node never leaves.
    pub fn is_settled(&self) -> bool {
        matches!(self, NodeStatus::Done | NodeStatus::Error)
    }
}

pub(crate) enum NodeState<T> {
    NotStarted,
    Running(Box<dyn Computation<T>>),
    Done(Outputs<T>),
    Error,
}

impl<T> NodeState<T> {
    pub(crate) fn status(&self) -> NodeStatus {
        match self {
            NodeState::NotStarted => NodeStatus::NotStarted,
            NodeState::Running(_) => NodeStatus::Running,
            NodeState::Done(_) => NodeStatus::Done,
            NodeState::Error => NodeStatus::Error,
        }
    }
}

/// A node registered in a graph.
pub(crate) struct BoundNode<T> {
    pub(crate) process: Arc<dyn Process<T>>,
    /// Inputs in the process's declared order.
    pub(crate) inputs: Vec<(&'static str, ValueId)>,
    pub(crate) outputs: Vec<(String, ValueId)>,
    pub(crate) state: NodeState<T>,
}

impl<T> BoundNode<T> {
    pub(crate) fn status(&self) -> NodeStatus {
        self.state.status()
    }

    pub(crate) fn output(&self, name: &str) -> Option<ValueId> {
        self.outputs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// Identity of the shared process instance.
    fn process_key(&self) -> *const () {
        Arc::as_ptr(&self.process) as *const ()
    }

    /// Same process instance and the same ordered input values.
    pub(crate) fn same_structure(&self, other: &Self) -> bool {
        self.process_key() == other.process_key()
            && self.inputs.len() == other.inputs.len()
            && self
                .inputs
                .iter()
                .zip(&other.inputs)
                .all(|((_, a), (_, b))| a == b)
    }

    /// Rewrite every input and output reference to `from` so it points at `to`.
    pub(crate) fn redirect(&mut self, from: ValueId, to: ValueId) {
        let inputs = self.inputs.iter_mut().map(|(_, value)| value);
        let outputs = self.outputs.iter_mut().map(|(_, value)| value);
        for value in inputs.chain(outputs).filter(|value| **value == from) {
            *value = to;
        }
    }
}

impl<T: Datum> BoundNode<T> {
    /// Check a final result against the declared outputs.
    pub(crate) fn validate(&self, outputs: &Outputs<T>, check_types: bool) -> Result<(), NodeError> {
        let process = self.process.name();
        if let Some(name) = outputs.repeated_name() {
            return Err(NodeError::MalformedResult {
                process: process.to_string(),
                name: name.to_string(),
            });
        }

        let missing: Vec<String> = self
            .process
            .outputs()
            .iter()
            .filter(|port| !outputs.contains(port.name()))
            .map(|port| port.name().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(NodeError::MissingOutputs {
                process: process.to_string(),
                missing,
            });
        }

        if check_types {
            for port in self.process.outputs() {
                let (Some(expected), Some(value)) = (port.ty(), outputs.get(port.name())) else {
                    continue;
                };
                let found = value.type_tag();
                if found != expected {
                    return Err(NodeError::OutputTypeMismatch {
                        process: process.to_string(),
                        output: port.name().to_string(),
                        expected,
                        found,
                    });
                }
            }
        }
        Ok(())
    }
}

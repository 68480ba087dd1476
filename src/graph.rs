//! The graph: an arena of nodes and value cells plus the merge primitives.

use std::marker::PhantomData;
use std::sync::Arc;

use slab::Slab;

use crate::error::{BindError, NodeError};
use crate::node::{BoundNode, Node, NodeId, NodeState, NodeStatus};
use crate::process::{Inputs, Outputs, Step};
use crate::tracer::{NoopTracer, Tracer};
use crate::value::{Cell, Datum, ValueId};

/// An arena entry. Merged-away entries stay behind as forwarding tombstones so
/// that handles held by the driver keep resolving to the survivor.
enum Slot<E, I> {
    Live(E),
    Forwarded(I),
}

impl<E, I> Slot<E, I> {
    fn live(&self) -> Option<&E> {
        match self {
            Slot::Live(entry) => Some(entry),
            Slot::Forwarded(_) => None,
        }
    }

    fn live_mut(&mut self) -> Option<&mut E> {
        match self {
            Slot::Live(entry) => Some(entry),
            Slot::Forwarded(_) => None,
        }
    }
}

/// Owner of every node and value cell of a dataflow computation.
///
/// Handles are never reused: merged-away entries leave a forwarding tombstone
/// behind, so arena keys stay in insertion order.
///
/// # Example
///
/// ```ignore
/// let mut graph = Graph::new();
/// let one = graph.constant(1);
/// let two = graph.constant(2);
/// let add = graph
///     .add_node(Node::new(Arc::new(Add)).bind("first", one).bind("second", two))?
///     .expect("not a duplicate");
/// let result = graph.output(add, "result").unwrap();
///
/// tactics::reduce(&mut graph);
/// while tactics::execute(&mut graph)? {}
/// assert_eq!(graph.value(result), Some(&3));
/// ```
pub struct Graph<T> {
    nodes: Slab<Slot<BoundNode<T>, NodeId>>,
    values: Slab<Slot<Cell<T>, ValueId>>,
    check_output_types: bool,
    tracer: Box<dyn Tracer>,
}

impl<T: Datum> Default for Graph<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Datum> Graph<T> {
    /// Create an empty graph with default settings.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a builder for customizing the graph.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let graph: Graph<i64> = Graph::builder()
    ///     .check_output_types(true)
    ///     .tracer(LogTracer)
    ///     .build();
    /// ```
    pub fn builder() -> GraphBuilder<T> {
        GraphBuilder::new()
    }

    /// Whether finished nodes have their outputs type checked.
    pub fn checks_output_types(&self) -> bool {
        self.check_output_types
    }

    pub(crate) fn tracer(&self) -> &dyn Tracer {
        self.tracer.as_ref()
    }

    // ==================================================================
    // Values
    // ==================================================================

    /// Add an externally supplied value. Constants are always ready.
    pub fn constant(&mut self, value: T) -> ValueId {
        ValueId(self.values.insert(Slot::Live(Cell::constant(value))))
    }

    /// Follow forwarding to the live value a handle refers to.
    pub fn resolve_value(&self, id: ValueId) -> Option<ValueId> {
        let mut current = id;
        loop {
            match self.values.get(current.0)? {
                Slot::Live(_) => return Some(current),
                Slot::Forwarded(next) => current = *next,
            }
        }
    }

    fn cell(&self, id: ValueId) -> Option<&Cell<T>> {
        let id = self.resolve_value(id)?;
        self.values.get(id.0).and_then(Slot::live)
    }

    /// The concrete value of a cell, or `None` while it is not yet known.
    pub fn value(&self, id: ValueId) -> Option<&T> {
        self.cell(id).and_then(|cell| cell.value.as_ref())
    }

    /// The node that writes this value, if any.
    pub fn producer(&self, id: ValueId) -> Option<NodeId> {
        self.cell(id).and_then(|cell| cell.producer)
    }

    /// A value is ready if it has no producer, or its producer is done and
    /// wrote it.
    ///
    /// A cell adopted by a finished node whose result lacks that name stays
    /// unready for good.
    pub fn is_value_ready(&self, id: ValueId) -> bool {
        match self.cell(id) {
            None => false,
            Some(Cell { producer: None, .. }) => true,
            Some(Cell {
                value,
                producer: Some(node),
            }) => value.is_some() && self.node_status(*node) == Some(NodeStatus::Done),
        }
    }

    /// Live values, in insertion order.
    pub fn value_ids(&self) -> Vec<ValueId> {
        self.values
            .iter()
            .filter(|(_, slot)| slot.live().is_some())
            .map(|(key, _)| ValueId(key))
            .collect()
    }

    /// Number of live values.
    pub fn value_count(&self) -> usize {
        self.values
            .iter()
            .filter(|(_, slot)| slot.live().is_some())
            .count()
    }

    // ==================================================================
    // Nodes
    // ==================================================================

    /// Register a node, allocating one value per declared output.
    ///
    /// Returns `Ok(None)` without touching the graph when a node with the same
    /// process instance and the same ordered inputs is already present.
    ///
    /// # Errors
    ///
    /// Returns a [`BindError`] if the bindings do not match the declared inputs
    /// or refer to values outside this graph.
    pub fn add_node(&mut self, node: Node<T>) -> Result<Option<NodeId>, BindError> {
        let Node { process, bindings } = node;
        let name = process.name().to_string();

        if let Some((input, _)) = bindings
            .iter()
            .find(|(input, _)| !process.inputs().iter().any(|port| port.name() == input))
        {
            return Err(BindError::UnknownInput {
                process: name,
                input: input.clone(),
            });
        }

        let mut inputs = Vec::with_capacity(process.inputs().len());
        for port in process.inputs() {
            let mut bound = bindings.iter().filter(|(input, _)| input == port.name());
            let Some((_, value)) = bound.next() else {
                return Err(BindError::MissingInput {
                    process: name,
                    input: port.name().to_string(),
                });
            };
            if bound.next().is_some() {
                return Err(BindError::DuplicateInput {
                    process: name,
                    input: port.name().to_string(),
                });
            }
            let value = self
                .resolve_value(*value)
                .ok_or(BindError::UnknownValue { value: *value })?;
            inputs.push((port.name(), value));
        }

        let candidate = BoundNode {
            process,
            inputs,
            outputs: Vec::new(),
            state: NodeState::NotStarted,
        };
        if let Some(existing) = self.find_structural_duplicate(&candidate) {
            self.tracer.on_node_rejected(existing, &name);
            return Ok(None);
        }

        let id = NodeId(self.nodes.vacant_key());
        let outputs = candidate
            .process
            .outputs()
            .iter()
            .map(|port| {
                let value = ValueId(self.values.insert(Slot::Live(Cell::pending(id))));
                (port.name().to_string(), value)
            })
            .collect();
        let key = self.nodes.insert(Slot::Live(BoundNode {
            outputs,
            ..candidate
        }));
        debug_assert_eq!(key, id.0);

        self.tracer.on_node_added(id, &name);
        Ok(Some(id))
    }

    fn find_structural_duplicate(&self, candidate: &BoundNode<T>) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, slot)| slot.live().is_some_and(|node| node.same_structure(candidate)))
            .map(|(key, _)| NodeId(key))
    }

    /// Follow forwarding to the live node a handle refers to.
    pub fn resolve_node(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            match self.nodes.get(current.0)? {
                Slot::Live(_) => return Some(current),
                Slot::Forwarded(next) => current = *next,
            }
        }
    }

    fn node(&self, id: NodeId) -> Option<&BoundNode<T>> {
        let id = self.resolve_node(id)?;
        self.nodes.get(id.0).and_then(Slot::live)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut BoundNode<T>> {
        let id = self.resolve_node(id)?;
        self.nodes.get_mut(id.0).and_then(Slot::live_mut)
    }

    /// Execution state of a node.
    pub fn node_status(&self, id: NodeId) -> Option<NodeStatus> {
        self.node(id).map(BoundNode::status)
    }

    /// Name of the process a node runs.
    pub fn process_name(&self, id: NodeId) -> Option<&str> {
        self.node(id).map(|node| node.process.name())
    }

    /// The value a node writes under `name`.
    pub fn output(&self, id: NodeId, name: &str) -> Option<ValueId> {
        self.node(id).and_then(|node| node.output(name))
    }

    /// The values a node reads, in declared input order.
    pub fn inputs(&self, id: NodeId) -> Option<Vec<ValueId>> {
        self.node(id)
            .map(|node| node.inputs.iter().map(|(_, value)| *value).collect())
    }

    /// The full result mapping of a finished node, including undeclared entries.
    pub fn result(&self, id: NodeId) -> Option<&Outputs<T>> {
        match &self.node(id)?.state {
            NodeState::Done(outputs) => Some(outputs),
            _ => None,
        }
    }

    /// A node is ready when it has not started and all of its inputs are ready.
    pub fn is_node_ready(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|node| {
            matches!(node.state, NodeState::NotStarted)
                && node.inputs.iter().all(|(_, value)| self.is_value_ready(*value))
        })
    }

    /// Returns true if two nodes run the same process instance on the same ordered inputs.
    pub fn structurally_equal(&self, a: NodeId, b: NodeId) -> bool {
        match (self.node(a), self.node(b)) {
            (Some(a), Some(b)) => a.same_structure(b),
            _ => false,
        }
    }

    /// Live nodes, in insertion order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, slot)| slot.live().is_some())
            .map(|(key, _)| NodeId(key))
            .collect()
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|(_, slot)| slot.live().is_some())
            .count()
    }

    fn live_nodes(&self) -> impl Iterator<Item = &BoundNode<T>> + '_ {
        self.nodes.iter().filter_map(|(_, slot)| slot.live())
    }

    // ==================================================================
    // Aggregate predicates
    // ==================================================================

    /// Returns true if any node is ready to start.
    pub fn ready(&self) -> bool {
        self.node_ids().into_iter().any(|id| self.is_node_ready(id))
    }

    /// Returns true if every node is done or failed.
    pub fn done(&self) -> bool {
        self.live_nodes().all(|node| node.status().is_settled())
    }

    /// Returns true if any node failed.
    pub fn error(&self) -> bool {
        self.live_nodes()
            .any(|node| node.status() == NodeStatus::Error)
    }

    /// Returns true if any node is running.
    pub fn running(&self) -> bool {
        self.live_nodes()
            .any(|node| node.status() == NodeStatus::Running)
    }

    // ==================================================================
    // Driving
    // ==================================================================

    /// Advance one node by a single step.
    ///
    /// - Done: returns `Ok(true)` without touching the computation.
    /// - Error, unknown, or not ready: returns `Ok(false)`.
    /// - Not started and ready: starts the computation and polls it right away,
    ///   so a computation that resolves immediately finishes in one call.
    /// - Running: polls once. `Ok(true)` means still working or just finished.
    ///
    /// # Errors
    ///
    /// The poll that observes a failure returns it and moves the node into its
    /// permanent error state.
    pub fn drive(&mut self, id: NodeId) -> Result<bool, NodeError> {
        let Some(id) = self.resolve_node(id) else {
            return Ok(false);
        };
        let status = match self.node(id) {
            Some(node) => node.status(),
            None => return Ok(false),
        };
        match status {
            NodeStatus::Done => return Ok(true),
            NodeStatus::Error => return Ok(false),
            NodeStatus::Running => {}
            NodeStatus::NotStarted => {
                if !self.is_node_ready(id) || !self.start(id) {
                    return Ok(false);
                }
            }
        }
        self.poll(id)
    }

    /// Gather input values and start the computation.
    fn start(&mut self, id: NodeId) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        let mut values = Vec::with_capacity(node.inputs.len());
        for (name, value) in &node.inputs {
            let Some(value) = self.value(*value) else {
                return false;
            };
            values.push((*name, value.clone()));
        }
        let process = Arc::clone(&node.process);

        let computation = process.execute(Inputs::new(values));
        if let Some(node) = self.node_mut(id) {
            node.state = NodeState::Running(computation);
        }
        self.tracer.on_node_started(id, process.name());
        true
    }

    fn poll(&mut self, id: NodeId) -> Result<bool, NodeError> {
        let check_types = self.check_output_types;
        let Some(Slot::Live(node)) = self.nodes.get_mut(id.0) else {
            return Ok(false);
        };
        let NodeState::Running(computation) = &mut node.state else {
            return Ok(false);
        };

        let outputs = match computation.poll() {
            Ok(Step::Pending) => {
                self.tracer.on_node_pending(id);
                return Ok(true);
            }
            Ok(Step::Ready(outputs)) => outputs,
            Err(error) => {
                node.state = NodeState::Error;
                let error = NodeError::ComputationFailure {
                    process: node.process.name().to_string(),
                    error: Arc::new(error),
                };
                self.tracer.on_node_failed(id, &error);
                return Err(error);
            }
        };

        if let Err(error) = node.validate(&outputs, check_types) {
            node.state = NodeState::Error;
            self.tracer.on_node_failed(id, &error);
            return Err(error);
        }

        for (name, value) in &node.outputs {
            if let Some(Slot::Live(cell)) = self.values.get_mut(value.0) {
                cell.value = outputs.get(name).cloned();
            }
        }
        node.state = NodeState::Done(outputs);
        self.tracer.on_node_done(id);
        Ok(true)
    }

    // ==================================================================
    // Merging
    // ==================================================================

    /// Replace every reference to `copy` with `orig` and drop `copy`.
    ///
    /// Callers establish that the two values are interchangeable; no equality
    /// check is performed. Handles to `copy` resolve to `orig` afterwards.
    pub fn merge_values(&mut self, orig: ValueId, copy: ValueId) {
        let (Some(orig), Some(copy)) = (self.resolve_value(orig), self.resolve_value(copy)) else {
            return;
        };
        if orig == copy {
            return;
        }
        for (_, slot) in self.nodes.iter_mut() {
            if let Slot::Live(node) = slot {
                node.redirect(copy, orig);
            }
        }
        self.values[copy.0] = Slot::Forwarded(orig);
        self.tracer.on_values_merged(orig, copy);
    }

    /// Merge two structurally equal nodes, keeping the one that is further along.
    ///
    /// `copy` replaces `orig` as the survivor when `orig` is not done and `copy`
    /// is either done, or running while `orig` is not. Outputs of the merged-away
    /// node are folded into the survivor's outputs of the same name; outputs the
    /// survivor lacks are adopted, and filled in right away if it is done.
    ///
    /// Returns the survivor.
    pub fn merge_nodes(&mut self, orig: NodeId, copy: NodeId) -> NodeId {
        let (Some(mut orig), Some(mut copy)) = (self.resolve_node(orig), self.resolve_node(copy))
        else {
            return orig;
        };
        if orig == copy {
            return orig;
        }

        let orig_status = self.node_status(orig);
        let copy_status = self.node_status(copy);
        if orig_status != Some(NodeStatus::Done)
            && (copy_status == Some(NodeStatus::Done)
                || (copy_status == Some(NodeStatus::Running)
                    && orig_status != Some(NodeStatus::Running)))
        {
            std::mem::swap(&mut orig, &mut copy);
        }

        let copied = self
            .node(copy)
            .map(|node| node.outputs.clone())
            .unwrap_or_default();
        for (name, value) in copied {
            match self.output(orig, &name) {
                Some(existing) => self.merge_values(existing, value),
                None => self.adopt_output(orig, name, value),
            }
        }

        self.nodes[copy.0] = Slot::Forwarded(orig);
        self.tracer.on_nodes_merged(orig, copy);
        orig
    }

    fn adopt_output(&mut self, node_id: NodeId, name: String, value: ValueId) {
        let Some(value) = self.resolve_value(value) else {
            return;
        };
        let Some(Slot::Live(node)) = self.nodes.get_mut(node_id.0) else {
            return;
        };
        if let Some(Slot::Live(cell)) = self.values.get_mut(value.0) {
            cell.producer = Some(node_id);
            if let NodeState::Done(result) = &node.state {
                cell.value = result.get(&name).cloned();
            }
        }
        node.outputs.push((name, value));
    }
}

/// Builder for [`Graph`] with customizable settings.
///
/// # Example
///
/// ```ignore
/// let recorder = Arc::new(RecordingTracer::new());
/// let graph: Graph<i64> = Graph::builder()
///     .check_output_types(true)
///     .tracer(recorder.clone())
///     .build();
/// ```
pub struct GraphBuilder<T> {
    check_output_types: bool,
    tracer: Box<dyn Tracer>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Datum> Default for GraphBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Datum> GraphBuilder<T> {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            check_output_types: false,
            tracer: Box::new(NoopTracer),
            _marker: PhantomData,
        }
    }

    /// Check finished outputs against the types declared by output ports.
    ///
    /// Off by default. When on, a node whose output value does not carry the
    /// declared [`TypeTag`](crate::TypeTag) fails with
    /// [`NodeError::OutputTypeMismatch`].
    pub fn check_output_types(mut self, enabled: bool) -> Self {
        self.check_output_types = enabled;
        self
    }

    /// Set the tracer that observes graph events.
    pub fn tracer(mut self, tracer: impl Tracer) -> Self {
        self.tracer = Box::new(tracer);
        self
    }

    /// Build the graph.
    pub fn build(self) -> Graph<T> {
        Graph {
            nodes: Slab::new(),
            values: Slab::new(),
            check_output_types: self.check_output_types,
            tracer: self.tracer,
        }
    }
}

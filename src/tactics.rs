//! Stateless algorithms over a [`Graph`]: engine ticks and common-subexpression elimination.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::error::{ExecuteError, NodeError};
use crate::graph::Graph;
use crate::node::{NodeId, NodeStatus};
use crate::value::{Datum, ValueId};

/// Run one engine tick.
///
/// Every node that is ready when the tick begins is driven once, and every
/// running node is polled once. Nodes that become ready during the tick wait
/// for the next one.
///
/// Returns `Ok(false)` when nothing could be advanced. This is a loop
/// termination signal, not a success report: check [`Graph::done`] and
/// [`Graph::error`] for the final status.
///
/// # Errors
///
/// A failing node does not stop the tick. All failures of the tick are
/// returned together once every node has been driven; an error implies that
/// at least one node was advanced.
pub fn execute<T: Datum>(graph: &mut Graph<T>) -> Result<bool, ExecuteError> {
    let active: Vec<NodeId> = graph
        .node_ids()
        .into_iter()
        .filter(|id| {
            graph.is_node_ready(*id) || graph.node_status(*id) == Some(NodeStatus::Running)
        })
        .collect();
    if active.is_empty() {
        return Ok(false);
    }

    let mut failures = Vec::new();
    for id in &active {
        if let Err(error) = graph.drive(*id) {
            failures.push((*id, error));
        }
    }
    graph.tracer().on_tick(active.len(), failures.len());

    if failures.is_empty() {
        Ok(true)
    } else {
        Err(ExecuteError { failures })
    }
}

/// Tick until nothing can be advanced, collecting every failure on the way.
///
/// Does not return while some computation keeps reporting that it is still
/// working.
pub fn run<T: Datum>(graph: &mut Graph<T>) -> Vec<(NodeId, NodeError)> {
    let mut failures = Vec::new();
    loop {
        match execute(graph) {
            Ok(true) => {}
            Ok(false) => break,
            Err(error) => failures.extend(error.failures),
        }
    }
    failures
}

/// Merge ready values that hold equal concrete values.
///
/// Each group of equal values collapses into its first member in insertion
/// order. Values that are not ready yet are left alone.
///
/// Returns true if any value was merged.
pub fn reduce_values<T: Datum>(graph: &mut Graph<T>) -> bool {
    let mut canonical: HashMap<T, ValueId> = HashMap::new();
    let mut repeats: Vec<(ValueId, ValueId)> = Vec::new();
    for id in graph.value_ids() {
        if !graph.is_value_ready(id) {
            continue;
        }
        let Some(value) = graph.value(id) else {
            continue;
        };
        match canonical.entry(value.clone()) {
            Entry::Occupied(orig) => repeats.push((*orig.get(), id)),
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }
    }

    for (orig, copy) in &repeats {
        graph.merge_values(*orig, *copy);
    }
    !repeats.is_empty()
}

/// Merge structurally equal nodes.
///
/// Nodes are scanned in insertion order against the nodes kept so far. A node
/// equal to a kept one is merged into it, and the survivor of the merge takes
/// the kept slot.
///
/// Returns true if any node was merged.
pub fn reduce_nodes<T: Datum>(graph: &mut Graph<T>) -> bool {
    let ids = graph.node_ids();
    let before = ids.len();
    let mut kept: Vec<NodeId> = Vec::with_capacity(before);
    for id in ids {
        match kept
            .iter()
            .position(|existing| graph.structurally_equal(*existing, id))
        {
            Some(slot) => kept[slot] = graph.merge_nodes(kept[slot], id),
            None => kept.push(id),
        }
    }
    kept.len() < before
}

/// Alternate value and node reduction until neither changes the graph.
///
/// Every merge removes a value or a node, so this terminates.
///
/// Returns true if anything was merged.
pub fn reduce<T: Datum>(graph: &mut Graph<T>) -> bool {
    let mut reduced = false;
    loop {
        let values = reduce_values(graph);
        let nodes = reduce_nodes(graph);
        if !(values || nodes) {
            return reduced;
        }
        reduced = true;
    }
}

//! Tracer trait for observing graph execution and reduction.
//!
//! The default [`NoopTracer`] discards every event. [`LogTracer`] forwards
//! events to the [`log`] facade, and `RecordingTracer` (feature
//! `recording-tracer`) keeps them in memory for assertions.
//!
//! # Example
//!
//! ```ignore
//! use lazy_flow::{Graph, LogTracer};
//!
//! let graph: Graph<i64> = Graph::builder().tracer(LogTracer).build();
//! ```

use std::sync::Arc;

use crate::error::NodeError;
use crate::node::NodeId;
use crate::value::ValueId;

/// Observer of graph events.
///
/// All methods have empty default implementations, so implementations only
/// override the events they care about.
pub trait Tracer: Send + Sync + 'static {
    /// A node was registered.
    #[inline]
    fn on_node_added(&self, _node: NodeId, _process: &str) {}

    /// A node was rejected because `existing` has the same structure.
    #[inline]
    fn on_node_rejected(&self, _existing: NodeId, _process: &str) {}

    /// A node started its computation.
    #[inline]
    fn on_node_started(&self, _node: NodeId, _process: &str) {}

    /// A node was polled and is still working.
    #[inline]
    fn on_node_pending(&self, _node: NodeId) {}

    /// A node finished and wrote its outputs.
    #[inline]
    fn on_node_done(&self, _node: NodeId) {}

    /// A node failed permanently.
    #[inline]
    fn on_node_failed(&self, _node: NodeId, _error: &NodeError) {}

    /// `copy` was merged into `orig`.
    #[inline]
    fn on_values_merged(&self, _orig: ValueId, _copy: ValueId) {}

    /// `removed` was merged into `survivor`.
    #[inline]
    fn on_nodes_merged(&self, _survivor: NodeId, _removed: NodeId) {}

    /// An engine tick advanced `driven` nodes, `failed` of which failed.
    #[inline]
    fn on_tick(&self, _driven: usize, _failed: usize) {}
}

impl<T: Tracer> Tracer for Arc<T> {
    fn on_node_added(&self, node: NodeId, process: &str) {
        (**self).on_node_added(node, process)
    }

    fn on_node_rejected(&self, existing: NodeId, process: &str) {
        (**self).on_node_rejected(existing, process)
    }

    fn on_node_started(&self, node: NodeId, process: &str) {
        (**self).on_node_started(node, process)
    }

    fn on_node_pending(&self, node: NodeId) {
        (**self).on_node_pending(node)
    }

    fn on_node_done(&self, node: NodeId) {
        (**self).on_node_done(node)
    }

    fn on_node_failed(&self, node: NodeId, error: &NodeError) {
        (**self).on_node_failed(node, error)
    }

    fn on_values_merged(&self, orig: ValueId, copy: ValueId) {
        (**self).on_values_merged(orig, copy)
    }

    fn on_nodes_merged(&self, survivor: NodeId, removed: NodeId) {
        (**self).on_nodes_merged(survivor, removed)
    }

    fn on_tick(&self, driven: usize, failed: usize) {
        (**self).on_tick(driven, failed)
    }
}

/// Zero-cost tracer that discards all events.
///
/// This is the default tracer for [`Graph`](crate::Graph).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {}

/// Forwards events to the `log` facade under the `lazy_flow` target.
///
/// Lifecycle and merge events are logged at `debug`, polls and ticks at
/// `trace`, failures at `warn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTracer;

const TARGET: &str = "lazy_flow";

impl Tracer for LogTracer {
    fn on_node_added(&self, node: NodeId, process: &str) {
        log::debug!(target: TARGET, "added {node} ({process})");
    }

    fn on_node_rejected(&self, existing: NodeId, process: &str) {
        log::debug!(target: TARGET, "rejected duplicate of {existing} ({process})");
    }

    fn on_node_started(&self, node: NodeId, process: &str) {
        log::debug!(target: TARGET, "started {node} ({process})");
    }

    fn on_node_pending(&self, node: NodeId) {
        log::trace!(target: TARGET, "{node} still running");
    }

    fn on_node_done(&self, node: NodeId) {
        log::debug!(target: TARGET, "{node} done");
    }

    fn on_node_failed(&self, node: NodeId, error: &NodeError) {
        log::warn!(target: TARGET, "{node} failed: {error}");
    }

    fn on_values_merged(&self, orig: ValueId, copy: ValueId) {
        log::debug!(target: TARGET, "merged value {copy} into {orig}");
    }

    fn on_nodes_merged(&self, survivor: NodeId, removed: NodeId) {
        log::debug!(target: TARGET, "merged node {removed} into {survivor}");
    }

    fn on_tick(&self, driven: usize, failed: usize) {
        log::trace!(target: TARGET, "tick drove {driven} node(s), {failed} failed");
    }
}

#[cfg(feature = "recording-tracer")]
pub use self::recording::{RecordingTracer, TraceEvent};

#[cfg(feature = "recording-tracer")]
mod recording {
    use parking_lot::Mutex;

    use super::Tracer;
    use crate::error::NodeError;
    use crate::node::NodeId;
    use crate::value::ValueId;

    /// An event captured by [`RecordingTracer`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum TraceEvent {
        /// See [`Tracer::on_node_added`].
        NodeAdded {
            /// The new node.
            node: NodeId,
            /// Its process name.
            process: String,
        },
        /// See [`Tracer::on_node_rejected`].
        NodeRejected {
            /// The node already present.
            existing: NodeId,
            /// Its process name.
            process: String,
        },
        /// See [`Tracer::on_node_started`].
        NodeStarted {
            /// The started node.
            node: NodeId,
            /// Its process name.
            process: String,
        },
        /// See [`Tracer::on_node_pending`].
        NodePending {
            /// The polled node.
            node: NodeId,
        },
        /// See [`Tracer::on_node_done`].
        NodeDone {
            /// The finished node.
            node: NodeId,
        },
        /// See [`Tracer::on_node_failed`].
        NodeFailed {
            /// The failed node.
            node: NodeId,
            /// Rendered error.
            message: String,
        },
        /// See [`Tracer::on_values_merged`].
        ValuesMerged {
            /// The surviving value.
            orig: ValueId,
            /// The merged-away value.
            copy: ValueId,
        },
        /// See [`Tracer::on_nodes_merged`].
        NodesMerged {
            /// The surviving node.
            survivor: NodeId,
            /// The merged-away node.
            removed: NodeId,
        },
        /// See [`Tracer::on_tick`].
        Tick {
            /// Nodes advanced during the tick.
            driven: usize,
            /// Nodes that failed during the tick.
            failed: usize,
        },
    }

    /// Tracer that accumulates events for later inspection.
    ///
    /// Share it with the graph through an `Arc` to read events afterwards.
    ///
    /// ```ignore
    /// let recorder = Arc::new(RecordingTracer::new());
    /// let mut graph: Graph<i64> = Graph::builder().tracer(recorder.clone()).build();
    /// // build and run the graph
    /// assert!(!recorder.is_empty());
    /// ```
    #[derive(Debug, Default)]
    pub struct RecordingTracer {
        events: Mutex<Vec<TraceEvent>>,
    }

    impl RecordingTracer {
        /// Create a new empty recorder.
        pub fn new() -> Self {
            Self::default()
        }

        /// Get the recorded events.
        pub fn events(&self) -> Vec<TraceEvent> {
            self.events.lock().clone()
        }

        /// Take the recorded events, clearing the recorder.
        pub fn take(&self) -> Vec<TraceEvent> {
            std::mem::take(&mut *self.events.lock())
        }

        /// Clear all recorded events.
        pub fn clear(&self) {
            self.events.lock().clear();
        }

        /// Number of recorded events.
        pub fn len(&self) -> usize {
            self.events.lock().len()
        }

        /// Returns true if nothing was recorded.
        pub fn is_empty(&self) -> bool {
            self.events.lock().is_empty()
        }

        fn push(&self, event: TraceEvent) {
            self.events.lock().push(event);
        }
    }

    impl Tracer for RecordingTracer {
        fn on_node_added(&self, node: NodeId, process: &str) {
            self.push(TraceEvent::NodeAdded {
                node,
                process: process.to_string(),
            });
        }

        fn on_node_rejected(&self, existing: NodeId, process: &str) {
            self.push(TraceEvent::NodeRejected {
                existing,
                process: process.to_string(),
            });
        }

        fn on_node_started(&self, node: NodeId, process: &str) {
            self.push(TraceEvent::NodeStarted {
                node,
                process: process.to_string(),
            });
        }

        fn on_node_pending(&self, node: NodeId) {
            self.push(TraceEvent::NodePending { node });
        }

        fn on_node_done(&self, node: NodeId) {
            self.push(TraceEvent::NodeDone { node });
        }

        fn on_node_failed(&self, node: NodeId, error: &NodeError) {
            self.push(TraceEvent::NodeFailed {
                node,
                message: error.to_string(),
            });
        }

        fn on_values_merged(&self, orig: ValueId, copy: ValueId) {
            self.push(TraceEvent::ValuesMerged { orig, copy });
        }

        fn on_nodes_merged(&self, survivor: NodeId, removed: NodeId) {
            self.push(TraceEvent::NodesMerged { survivor, removed });
        }

        fn on_tick(&self, driven: usize, failed: usize) {
            self.push(TraceEvent::Tick { driven, failed });
        }
    }
}

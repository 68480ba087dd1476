//! Error types for binding and driving nodes.

use std::sync::Arc;

use thiserror::Error;

use crate::node::NodeId;
use crate::value::{TypeTag, ValueId};

/// Terminal failures of a single node.
///
/// Every variant moves the node into its permanent error state. The error is
/// returned once, to the caller of the poll that observed it; later calls to
/// [`Graph::drive`](crate::Graph::drive) only report that the node cannot proceed.
#[derive(Debug, Clone, Error)]
pub enum NodeError {
    /// The computation returned an error while being polled.
    ///
    /// Computations report failures with `anyhow`, so any error type can be
    /// propagated from `poll` using the `?` operator.
    #[error("process `{process}` failed: {error}")]
    ComputationFailure {
        /// Name of the failing process.
        process: String,
        /// The error raised by the computation.
        error: Arc<anyhow::Error>,
    },

    /// The final result is not a mapping because it binds a name more than once.
    #[error("process `{process}` produced a result that binds `{name}` more than once")]
    MalformedResult {
        /// Name of the offending process.
        process: String,
        /// The output name that appeared repeatedly.
        name: String,
    },

    /// The final result omits one or more declared outputs.
    #[error("process `{process}` did not produce declared outputs: {}", .missing.join(", "))]
    MissingOutputs {
        /// Name of the offending process.
        process: String,
        /// Declared output names absent from the result.
        missing: Vec<String>,
    },

    /// A declared output failed the type check.
    ///
    /// Only raised when output type checking is enabled with
    /// [`GraphBuilder::check_output_types`](crate::GraphBuilder::check_output_types).
    #[error("output `{output}` of process `{process}` should be {expected}, got {found}")]
    OutputTypeMismatch {
        /// Name of the offending process.
        process: String,
        /// The output whose value had the wrong type.
        output: String,
        /// The type declared by the output port.
        expected: TypeTag,
        /// The type of the produced value.
        found: TypeTag,
    },
}

impl NodeError {
    /// Name of the process that failed.
    pub fn process(&self) -> &str {
        match self {
            NodeError::ComputationFailure { process, .. }
            | NodeError::MalformedResult { process, .. }
            | NodeError::MissingOutputs { process, .. }
            | NodeError::OutputTypeMismatch { process, .. } => process,
        }
    }

    /// Returns the error raised by the computation, if this is a `ComputationFailure`.
    pub fn computation_error(&self) -> Option<&anyhow::Error> {
        match self {
            NodeError::ComputationFailure { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Attempts to downcast the computation error to a specific type.
    pub fn downcast_ref<E: std::error::Error + Send + Sync + 'static>(&self) -> Option<&E> {
        self.computation_error().and_then(|e| e.downcast_ref::<E>())
    }
}

/// Errors raised while binding a node to the values of a graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// A declared input has no binding.
    #[error("input `{input}` of process `{process}` is not bound")]
    MissingInput {
        /// Name of the process being bound.
        process: String,
        /// The unbound input.
        input: String,
    },

    /// A declared input is bound more than once.
    #[error("input `{input}` of process `{process}` is bound more than once")]
    DuplicateInput {
        /// Name of the process being bound.
        process: String,
        /// The input bound repeatedly.
        input: String,
    },

    /// A binding names an input the process does not declare.
    #[error("process `{process}` has no input named `{input}`")]
    UnknownInput {
        /// Name of the process being bound.
        process: String,
        /// The undeclared input name.
        input: String,
    },

    /// A binding refers to a value that does not belong to this graph.
    #[error("value {value} does not belong to this graph")]
    UnknownValue {
        /// The unknown handle.
        value: ValueId,
    },
}

/// Failures observed during one engine tick.
///
/// A tick keeps driving the remaining nodes after one of them fails, so this
/// carries every failure of the tick. Returning it implies that at least one
/// node was advanced.
#[derive(Debug, Clone, Error)]
#[error("{} node(s) failed during the tick", .failures.len())]
pub struct ExecuteError {
    /// Each failed node with the error it raised.
    pub failures: Vec<(NodeId, NodeError)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Overflow;

    impl std::fmt::Display for Overflow {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "overflow")
        }
    }

    impl std::error::Error for Overflow {}

    #[test]
    fn test_computation_failure_downcast() {
        let err = NodeError::ComputationFailure {
            process: "Add".to_string(),
            error: Arc::new(anyhow::Error::new(Overflow)),
        };
        assert!(err.downcast_ref::<Overflow>().is_some());
        assert_eq!(err.process(), "Add");
        assert_eq!(err.to_string(), "process `Add` failed: overflow");
    }

    #[test]
    fn test_missing_outputs_message() {
        let err = NodeError::MissingOutputs {
            process: "DivMod".to_string(),
            missing: vec!["quotient".to_string(), "remainder".to_string()],
        };
        assert!(err.computation_error().is_none());
        assert_eq!(
            err.to_string(),
            "process `DivMod` did not produce declared outputs: quotient, remainder"
        );
    }
}

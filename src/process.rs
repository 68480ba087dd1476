//! The process capability: named ports plus a resumable computation.

use crate::value::TypeTag;

/// A named input or output of a [`Process`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Port {
    name: &'static str,
    ty: Option<TypeTag>,
}

impl Port {
    /// An untyped port.
    pub const fn new(name: &'static str) -> Self {
        Self { name, ty: None }
    }

    /// A port whose values are expected to carry `ty`.
    ///
    /// On output ports the expectation is enforced only when the graph checks
    /// output types.
    pub const fn typed(name: &'static str, ty: TypeTag) -> Self {
        Self { name, ty: Some(ty) }
    }

    /// Port name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Expected type, if declared.
    pub fn ty(&self) -> Option<TypeTag> {
        self.ty
    }
}

/// A pluggable computation with fixed, named inputs and outputs.
///
/// Nodes bind a shared process instance to concrete values. Two nodes are
/// structural duplicates when they share the same process instance and the
/// same ordered input values.
///
/// # Example
///
/// ```ignore
/// struct Add;
///
/// impl Process<i64> for Add {
///     fn inputs(&self) -> &[Port] {
///         const INPUTS: &[Port] = &[Port::new("first"), Port::new("second")];
///         INPUTS
///     }
///
///     fn outputs(&self) -> &[Port] {
///         const OUTPUTS: &[Port] = &[Port::new("result")];
///         OUTPUTS
///     }
///
///     fn execute(&self, inputs: Inputs<i64>) -> Box<dyn Computation<i64>> {
///         let sum = inputs["first"] + inputs["second"];
///         Box::new(computation::ready(Outputs::new().with("result", sum)))
///     }
/// }
/// ```
pub trait Process<T>: 'static {
    /// Name used in errors and traces.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Declared inputs, in binding order.
    fn inputs(&self) -> &[Port];

    /// Declared outputs.
    fn outputs(&self) -> &[Port];

    /// Start a computation over the current input values.
    ///
    /// Called at most once per node, and only after every declared input is
    /// available.
    fn execute(&self, inputs: Inputs<T>) -> Box<dyn Computation<T>>;
}

/// A resumable computation created by [`Process::execute`].
pub trait Computation<T> {
    /// Advance the computation by one step.
    ///
    /// Never called again once it has returned `Ok(Step::Ready(_))` or an error.
    fn poll(&mut self) -> anyhow::Result<Step<T>>;
}

/// Outcome of one [`Computation::poll`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<T> {
    /// Still working.
    Pending,
    /// Finished with the final output mapping.
    Ready(Outputs<T>),
}

/// Input values handed to [`Process::execute`], in declared order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inputs<T> {
    entries: Vec<(&'static str, T)>,
}

impl<T> Inputs<T> {
    pub(crate) fn new(entries: Vec<(&'static str, T)>) -> Self {
        Self { entries }
    }

    /// Get the value bound to an input.
    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    /// Take the value bound to an input out of the mapping.
    pub fn take(&mut self, name: &str) -> Option<T> {
        let position = self.entries.iter().position(|(n, _)| *n == name)?;
        Some(self.entries.remove(position).1)
    }

    /// Number of inputs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no inputs.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, value)` pairs in declared order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &T)> + '_ {
        self.entries.iter().map(|(n, v)| (*n, v))
    }
}

impl<T> std::ops::Index<&str> for Inputs<T> {
    type Output = T;

    /// Panics if the input is not part of the mapping. Every declared input is
    /// present when a process is executed.
    fn index(&self, name: &str) -> &T {
        match self.get(name) {
            Some(value) => value,
            None => panic!("no input named `{name}`"),
        }
    }
}

/// The final output mapping of a computation.
///
/// Entries are kept as produced. Binding the same name twice makes the result
/// malformed, and the node that receives it fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outputs<T> {
    entries: Vec<(String, T)>,
}

impl<T> Default for Outputs<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> Outputs<T> {
    /// An empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, builder style.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: T) -> Self {
        self.insert(name, value);
        self
    }

    /// Add an entry.
    pub fn insert(&mut self, name: impl Into<String>, value: T) {
        self.entries.push((name.into(), value));
    }

    /// Get the first value produced under `name`.
    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Returns true if `name` was produced.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, value)` pairs in production order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> + '_ {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// The first name bound more than once, if any.
    pub(crate) fn repeated_name(&self) -> Option<&str> {
        self.entries
            .iter()
            .enumerate()
            .find(|(i, (name, _))| self.entries[..*i].iter().any(|(n, _)| n == name))
            .map(|(_, (name, _))| name.as_str())
    }
}

impl<T, N: Into<String>> FromIterator<(N, T)> for Outputs<T> {
    fn from_iter<I: IntoIterator<Item = (N, T)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(n, v)| (n.into(), v)).collect(),
        }
    }
}

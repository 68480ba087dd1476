use std::fmt;
use std::hash::Hash;

use crate::node::NodeId;

/// Handle to a value cell owned by a [`Graph`](crate::Graph).
///
/// Handles stay usable after reduction: a handle whose cell was merged away
/// resolves to the surviving cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub(crate) usize);

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Runtime type tag of a [`Datum`], compared by the optional output type check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeTag(&'static str);

impl TypeTag {
    /// Create a tag from a type name.
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// The type name.
    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Payload stored in value cells.
///
/// `Eq + Hash` is required because value-level reduction groups ready cells
/// by their concrete value.
///
/// # Example
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// enum Scalar {
///     Int(i64),
///     Text(String),
/// }
///
/// impl Datum for Scalar {
///     fn type_tag(&self) -> TypeTag {
///         match self {
///             Scalar::Int(_) => TypeTag::new("int"),
///             Scalar::Text(_) => TypeTag::new("text"),
///         }
///     }
/// }
/// ```
pub trait Datum: Clone + Eq + Hash + fmt::Debug + 'static {
    /// Tag describing the runtime type of this value.
    fn type_tag(&self) -> TypeTag;
}

macro_rules! impl_datum {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Datum for $ty {
                fn type_tag(&self) -> TypeTag {
                    TypeTag::new(stringify!($ty))
                }
            }
        )*
    };
}

impl_datum!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, bool, char, String, ());

impl<T: Datum> Datum for Vec<T> {
    fn type_tag(&self) -> TypeTag {
        TypeTag::new("Vec")
    }
}

/// A single-writer memory cell.
///
/// Cells without a producer are constants supplied by the driver. Cells with a
/// producer stay empty until that node finishes successfully.
#[derive(Debug, Clone)]
pub(crate) struct Cell<T> {
    pub(crate) value: Option<T>,
    pub(crate) producer: Option<NodeId>,
}

impl<T> Cell<T> {
    pub(crate) fn constant(value: T) -> Self {
        Self {
            value: Some(value),
            producer: None,
        }
    }

    pub(crate) fn pending(producer: NodeId) -> Self {
        Self {
            value: None,
            producer: Some(producer),
        }
    }
}

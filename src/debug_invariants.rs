//! Structural self-checks for partitions, renumber maps and local graphs.

use crate::graph_error::GraphError;

/// Implemented by structures whose construction can be cross-checked.
pub trait DebugInvariants {
    /// Panic on a broken invariant in debug builds or with `check-invariants`.
    fn debug_assert_invariants(&self);
    /// Validate invariants and return the first error encountered.
    fn validate_invariants(&self) -> Result<(), GraphError>;
}

/// Validate a sequence of structures, stopping at the first failure.
pub fn validate_each<'a, T, I>(items: I) -> Result<(), GraphError>
where
    T: DebugInvariants + 'a,
    I: IntoIterator<Item = &'a T>,
{
    items.into_iter().try_for_each(DebugInvariants::validate_invariants)
}

/// Run a fallible check and panic with context when invariant checking is
/// compiled in; expands to nothing otherwise.
#[macro_export]
macro_rules! assert_invariants {
    ($expr:expr, $($ctx:tt)*) => {
        #[cfg(any(debug_assertions, feature = "strict-invariants", feature = "check-invariants"))]
        if let Err(e) = $expr {
            panic!(concat!("[invariants] ", $($ctx)*, ": {}"), e);
        }
    };
}

//! The operation algebra seam.
//!
//! The reconciliation engine never inspects operations — it only composes,
//! rebases, applies, and serializes them. [`OtAlgebra`] captures exactly that
//! contract, so the engine can run against a full third-party OT library or
//! against the built-in minimal [`SpliceAlgebra`] without change.
//!
//! # Contract
//!
//! For a base document `D`, local operation `L`, and remote operation `R`:
//!
//! - `apply` is pure: it returns a new document and never mutates its input.
//! - `compose(a, b)` applied to `D` equals applying `a` then `b`.
//! - `rebase(L, R)` transforms `L` to apply after `R` has landed; it returns
//!   `None` when `L` is fully subsumed by `R`.
//! - `deserialize(serialize(op))` round-trips.
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`OtAlgebra`] | The algebra trait consumed by the engine |
//! | [`SpliceAlgebra`] | Built-in cell-splice algebra over [`Notebook`](crate::types::Notebook) |
//! | [`SpliceOp`] | Operation value of the built-in algebra |

pub mod splice;

pub use splice::{Splice, SpliceAlgebra, SpliceOp};

use crate::error::Result;

/// An operational-transformation algebra over an opaque document type.
///
/// Implementations must be cheap to share (`Send + Sync`); the engine holds one
/// instance behind an `Arc` and calls it from a single task.
pub trait OtAlgebra: Send + Sync + 'static {
    /// The document value operations transform.
    type Doc: Clone + Send + 'static;

    /// An immutable edit operation.
    type Op: Clone + Send + 'static;

    /// Sequential composition: the single operation equivalent to applying
    /// `first` and then `second`.
    fn compose(&self, first: Self::Op, second: Self::Op) -> Self::Op;

    /// Transform `op` so it applies correctly after `over` has already been
    /// applied. Returns `None` when the edit is subsumed and becomes a no-op.
    fn rebase(&self, op: Self::Op, over: &Self::Op) -> Option<Self::Op>;

    /// Apply `op` to `doc`, producing a new document value.
    fn apply(&self, op: &Self::Op, doc: &Self::Doc) -> Self::Doc;

    /// Serialize an operation for the wire.
    fn serialize(&self, op: &Self::Op) -> String;

    /// Decode an operation from its wire form.
    fn deserialize(&self, raw: &str) -> Result<Self::Op>;

    /// Construct the operation "replace chars `[start, end)` of the `source`
    /// field of the cell at `cell` with `text`".
    fn splice(&self, cell: usize, start: usize, end: usize, text: &str) -> Self::Op;
}

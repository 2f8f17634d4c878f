//! Minimal cell-splice algebra over notebooks.
//!
//! An operation is an ordered list of [`Splice`]s, each replacing a char range
//! of one cell's source. Composition is sequencing; rebase shifts and clamps
//! positions against a concurrent operation. Positions are char offsets, so the
//! algebra behaves identically for ASCII and multi-byte text.
//!
//! This is intentionally a *minimal* algebra — enough to drive and test the
//! reconciliation engine against realistic concurrent-edit scenarios. It is not
//! a general OT library: rebasing two operations that each carry long chains of
//! interdependent splices transforms splice-by-splice, which is exact for the
//! single-edit-per-tick batches the engine produces.
//!
//! # Rebase Rules
//!
//! For a local splice `L` rebased over a remote splice `R` in the same cell:
//!
//! - `L` entirely before `R`: unchanged.
//! - `L` entirely after `R`: shifted by `R`'s length delta.
//! - Concurrent inserts at the same position: the remote insert wins the spot;
//!   the local insert lands after it (the hub committed `R` first).
//! - `L`'s deletion overlapping `R`'s deletion: the already-deleted span is
//!   dropped from `L`.
//! - A pure deletion fully inside `R`'s deletion: subsumed, rebases to nothing.
//!
//! # Examples
//!
//! ```
//! use collab_sync::algebra::{OtAlgebra, SpliceAlgebra};
//! use collab_sync::types::Notebook;
//!
//! let alg = SpliceAlgebra;
//! let nb = Notebook::with_cells(1);
//!
//! let insert = alg.splice(0, 0, 0, "hello");
//! let nb = alg.apply(&insert, &nb);
//! assert_eq!(nb.cell_source(0), Some("hello"));
//!
//! let shout = alg.splice(0, 5, 5, "!");
//! let nb = alg.apply(&shout, &nb);
//! assert_eq!(nb.cell_source(0), Some("hello!"));
//! ```

use crate::algebra::OtAlgebra;
use crate::error::{Result, SyncError};
use crate::types::Notebook;
use serde::{Deserialize, Serialize};

/// Replace chars `[start, start + remove)` of cell `cell`'s source with
/// `insert`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Splice {
    /// Index of the cell this splice edits.
    pub cell: usize,
    /// Char offset the replacement starts at.
    pub start: usize,
    /// Number of chars removed.
    pub remove: usize,
    /// Replacement text.
    pub insert: String,
}

impl Splice {
    fn insert_len(&self) -> usize {
        self.insert.chars().count()
    }

    fn end(&self) -> usize {
        self.start + self.remove
    }

    fn is_noop(&self) -> bool {
        self.remove == 0 && self.insert.is_empty()
    }
}

/// An ordered list of splices, applied in sequence. Each splice is expressed
/// against the document produced by the splices before it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpliceOp {
    /// The splices, in application order.
    pub splices: Vec<Splice>,
}

impl SpliceOp {
    /// An operation containing a single splice.
    pub fn single(splice: Splice) -> Self {
        SpliceOp {
            splices: vec![splice],
        }
    }
}

/// The built-in cell-splice algebra.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpliceAlgebra;

impl SpliceAlgebra {
    fn apply_splice(splice: &Splice, doc: &Notebook) -> Notebook {
        let mut doc = doc.clone();
        let Some(cell) = doc.cells.get_mut(splice.cell) else {
            tracing::warn!(cell = splice.cell, "splice targets missing cell, skipped");
            return doc;
        };
        let chars: Vec<char> = cell.source.chars().collect();
        let start = splice.start.min(chars.len());
        let end = splice.end().min(chars.len());
        if start != splice.start || end != splice.end() {
            tracing::warn!(
                start = splice.start,
                remove = splice.remove,
                len = chars.len(),
                "splice range clamped to cell bounds"
            );
        }
        let mut source = String::with_capacity(cell.source.len() + splice.insert.len());
        source.extend(&chars[..start]);
        source.push_str(&splice.insert);
        source.extend(&chars[end..]);
        cell.source = source;
        doc
    }

    /// Transform `l` to apply after `r` has landed. `None` means subsumed.
    fn transform(l: Splice, r: &Splice) -> Option<Splice> {
        if l.cell != r.cell {
            return Some(l);
        }

        let delta = r.insert_len() as i64 - r.remove as i64;
        let (l0, l1) = (l.start, l.end());
        let (r0, r1) = (r.start, r.end());

        // Entirely before the remote edit. A pure insert exactly at the remote
        // insert's position ties, and the remote edit (committed first) wins
        // the spot.
        if l1 < r0 || (l1 == r0 && (l.remove > 0 || l0 < r0)) {
            return Some(l);
        }

        // At or after the remote edit's end: shift by its length delta. This
        // covers the insert-insert tie, which shifts past the remote insert.
        if l0 >= r1 {
            let start = (l0 as i64 + delta).max(0) as usize;
            return Some(Splice { start, ..l });
        }

        // Pure insert inside (or tied with the start of) the remote edit:
        // reposition after the remote replacement text.
        if l.remove == 0 {
            let start = r0 + r.insert_len();
            let splice = Splice { start, ..l };
            return if splice.is_noop() { None } else { Some(splice) };
        }

        // Overlapping deletions: drop the span the remote edit already
        // removed. A deletion that straddles the remote edit entirely also
        // swallows the remote replacement text.
        let overlap = l1.min(r1) - l0.max(r0);
        let swallows = if l0 < r0 && l1 > r1 { r.insert_len() } else { 0 };
        let remove = l.remove - overlap + swallows;
        let start = if l0 < r0 {
            l0
        } else {
            r0 + r.insert_len() + l0.saturating_sub(r1)
        };
        let splice = Splice {
            start,
            remove,
            ..l
        };
        if splice.is_noop() {
            None
        } else {
            Some(splice)
        }
    }
}

impl OtAlgebra for SpliceAlgebra {
    type Doc = Notebook;
    type Op = SpliceOp;

    fn compose(&self, first: SpliceOp, second: SpliceOp) -> SpliceOp {
        let mut splices = first.splices;
        splices.extend(second.splices);
        SpliceOp { splices }
    }

    fn rebase(&self, op: SpliceOp, over: &SpliceOp) -> Option<SpliceOp> {
        let mut rebased = Vec::with_capacity(op.splices.len());
        for mut splice in op.splices {
            let mut alive = true;
            for remote in &over.splices {
                match Self::transform(splice.clone(), remote) {
                    Some(next) => splice = next,
                    None => {
                        alive = false;
                        break;
                    }
                }
            }
            if alive {
                rebased.push(splice);
            }
        }
        if rebased.is_empty() {
            None
        } else {
            Some(SpliceOp { splices: rebased })
        }
    }

    fn apply(&self, op: &SpliceOp, doc: &Notebook) -> Notebook {
        op.splices
            .iter()
            .fold(doc.clone(), |doc, splice| Self::apply_splice(splice, &doc))
    }

    fn serialize(&self, op: &SpliceOp) -> String {
        serde_json::to_string(op).unwrap_or_default()
    }

    fn deserialize(&self, raw: &str) -> Result<SpliceOp> {
        serde_json::from_str(raw).map_err(|e| SyncError::OpDeserialize(e.to_string()))
    }

    fn splice(&self, cell: usize, start: usize, end: usize, text: &str) -> SpliceOp {
        SpliceOp::single(Splice {
            cell,
            start,
            remove: end.saturating_sub(start),
            insert: text.to_string(),
        })
    }
}

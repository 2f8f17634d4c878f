//! Core document types.
//!
//! The shared document is a *notebook*: an ordered sequence of cells, each
//! holding a text source. Documents are plain values — the engine never mutates
//! a document in place. Every state transition produces a new value through the
//! operation algebra's `apply`.
//!
//! # Examples
//!
//! ```
//! use collab_sync::types::{Cell, Notebook};
//!
//! let nb = Notebook::with_cells(3);
//! assert_eq!(nb.cells.len(), 3);
//! assert_eq!(nb.cell_source(0), Some(""));
//!
//! let nb = Notebook {
//!     cells: vec![Cell::new("print('hi')")],
//! };
//! assert_eq!(nb.cell_source(0), Some("print('hi')"));
//! ```

use serde::{Deserialize, Serialize};

/// A single notebook cell holding a text source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// The cell's text content.
    pub source: String,
}

impl Cell {
    /// Create a cell with the given source text.
    pub fn new(source: impl Into<String>) -> Self {
        Cell {
            source: source.into(),
        }
    }
}

/// An ordered sequence of text cells — the document value synchronized between
/// clients.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notebook {
    /// The notebook's cells, in display order.
    pub cells: Vec<Cell>,
}

impl Notebook {
    /// Create a notebook with `count` empty cells.
    pub fn with_cells(count: usize) -> Self {
        Notebook {
            cells: vec![Cell::default(); count],
        }
    }

    /// The source text of the cell at `index`, if it exists.
    pub fn cell_source(&self, index: usize) -> Option<&str> {
        self.cells.get(index).map(|c| c.source.as_str())
    }
}

//! Atom selection language.
//!
//! A small VMD-style query language evaluated against an AMBER topology:
//!
//! ```ignore
//! use wpt_core::selection::select;
//!
//! let oxygens = select(&topology, "name O")?;
//! let solvent_heavy = select(&topology, "water and not hydrogen")?;
//! ```

pub mod ast;
pub mod error;
pub mod eval;
pub mod parser;
pub mod token;

pub use error::SelectionError;
pub use eval::SelectionContext;
pub use parser::parse;

use crate::amber::prmtop::AmberTopology;
use crate::error::{PackingError, PackingResult};
use crate::trajectory::Frame;

/// The atoms taking part in an analysis: unique indices in ascending order,
/// fixed for the whole run.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomSelection {
    expression: String,
    indices: Vec<usize>,
}

impl AtomSelection {
    /// Build from explicit indices; duplicates are removed.
    pub fn from_indices(expression: impl Into<String>, mut indices: Vec<usize>) -> PackingResult<Self> {
        let expression = expression.into();
        indices.sort_unstable();
        indices.dedup();
        if indices.is_empty() {
            return Err(PackingError::EmptySelection(expression));
        }
        Ok(Self {
            expression,
            indices,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Positions of the selected atoms in `frame`, in selection order.
    pub fn gather(&self, frame: &Frame) -> PackingResult<Vec<[f64; 3]>> {
        self.indices
            .iter()
            .map(|&i| {
                frame.positions.get(i).copied().ok_or_else(|| {
                    PackingError::config(format!(
                        "selected atom {} is outside a frame of {} atoms",
                        i,
                        frame.n_atoms()
                    ))
                })
            })
            .collect()
    }
}

/// Evaluate `expression` against `topology`.
///
/// A malformed expression is a [`PackingError::Selection`]; a well-formed one
/// that matches nothing is [`PackingError::EmptySelection`].
pub fn select(topology: &AmberTopology, expression: &str) -> PackingResult<AtomSelection> {
    let expr = parse(expression)?;
    let indices = SelectionContext::new(topology).evaluate(&expr);
    log::debug!("Selection '{}' matched {} atoms", expression, indices.len());
    AtomSelection::from_indices(expression, indices)
}

//! Core library for water-packing-tools.
//!
//! Pure Rust implementations with no Python dependencies.
//! Provides the AMBER topology parser, the DCD trajectory reader, the atom
//! selection language, periodic boundary helpers and the shared error type.

pub mod amber;
pub mod error;
pub mod pbc;
pub mod selection;
pub mod trajectory;
pub mod util;

pub use error::{PackingError, PackingResult};
pub use pbc::PeriodicBox;
pub use selection::{select, AtomSelection};
pub use trajectory::{Frame, Trajectory};

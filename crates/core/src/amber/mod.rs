//! AMBER file format parsers.
//!
//! - PRMTOP: topology files (atom names, types, residues, masses, charges)

pub mod prmtop;

//! Evaluation of selection trees against an AMBER topology.

use crate::amber::prmtop::AmberTopology;
use crate::selection::ast::*;

/// Residue names treated as water by the `water` keyword.
pub const WATER_RESIDUES: &[&str] = &[
    "WAT", "HOH", "H2O", "TIP3", "TP3", "T3P", "SPC", "SPCE", "TIP4", "TP4", "T4P", "TIP5", "T5P",
    "OPC",
];

pub fn is_water_residue(name: &str) -> bool {
    let name = name.trim();
    WATER_RESIDUES.iter().any(|w| w.eq_ignore_ascii_case(name))
}

/// Per-atom lookups built once per topology.
pub struct SelectionContext<'a> {
    topology: &'a AmberTopology,
    residue_of: Vec<usize>,
}

impl<'a> SelectionContext<'a> {
    pub fn new(topology: &'a AmberTopology) -> Self {
        Self {
            topology,
            residue_of: topology.atom_residue_indices(),
        }
    }

    /// Indices of matching atoms, ascending.
    pub fn evaluate(&self, expr: &Expr) -> Vec<usize> {
        self.mask(expr)
            .iter()
            .enumerate()
            .filter_map(|(i, &hit)| hit.then_some(i))
            .collect()
    }

    fn mask(&self, expr: &Expr) -> Vec<bool> {
        match expr {
            Expr::And(a, b) => zip_with(self.mask(a), &self.mask(b), |x, y| x && y),
            Expr::Or(a, b) => zip_with(self.mask(a), &self.mask(b), |x, y| x || y),
            Expr::Not(inner) => self.mask(inner).into_iter().map(|x| !x).collect(),
            Expr::Text { field, patterns } => self.per_atom(|i| {
                let value = self.text_field(*field, i);
                patterns.iter().any(|p| p.matches(value))
            }),
            Expr::Compare { field, op, value } => self.per_atom(|i| {
                let lhs = match field {
                    NumericField::Mass => self.topology.masses.get(i).copied(),
                    NumericField::Charge => self.topology.charges.get(i).copied(),
                };
                lhs.map_or(false, |lhs| op.apply(lhs, *value))
            }),
            Expr::Ranges { field, ranges } => self.per_atom(|i| {
                let key = match field {
                    RangeField::Resid => self.residue_of[i] as i64 + 1,
                    RangeField::Index => i as i64,
                };
                ranges.iter().any(|&(lo, hi)| (lo..=hi).contains(&key))
            }),
            Expr::Keyword(keyword) => self.keyword(*keyword),
        }
    }

    fn per_atom(&self, pred: impl Fn(usize) -> bool) -> Vec<bool> {
        (0..self.topology.n_atoms).map(pred).collect()
    }

    fn text_field(&self, field: TextField, atom: usize) -> &str {
        match field {
            TextField::Name => &self.topology.atom_names[atom],
            TextField::Type => &self.topology.atom_types[atom],
            TextField::Resname => &self.topology.residue_labels[self.residue_of[atom]],
        }
    }

    fn keyword(&self, keyword: Keyword) -> Vec<bool> {
        match keyword {
            Keyword::All => vec![true; self.topology.n_atoms],
            Keyword::None => vec![false; self.topology.n_atoms],
            Keyword::Water => self.per_atom(|i| {
                is_water_residue(&self.topology.residue_labels[self.residue_of[i]])
            }),
            // Mass when the topology has one, else the leading letter of the name.
            Keyword::Hydrogen => self.per_atom(|i| match self.topology.masses.get(i) {
                Some(&m) if m > 0.0 => m < 1.1,
                _ => self.topology.atom_names[i].starts_with('H'),
            }),
        }
    }
}

fn zip_with(mut a: Vec<bool>, b: &[bool], f: impl Fn(bool, bool) -> bool) -> Vec<bool> {
    for (x, &y) in a.iter_mut().zip(b) {
        *x = f(*x, y);
    }
    a
}

//! AMBER prmtop (topology) file parser.
//!
//! Only the sections needed to select atoms are read:
//! - POINTERS (atom and residue counts)
//! - ATOM_NAME, AMBER_ATOM_TYPE
//! - RESIDUE_LABEL, RESIDUE_POINTER
//! - MASS, CHARGE (converted to elementary charge units)

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{PackingError, PackingResult};

/// AMBER charge to elementary charge: q_e = q_amber / 18.2223
pub const AMBER_CHARGE_FACTOR: f64 = 18.2223;

// ============================================================================
// Data Structures
// ============================================================================

/// Per-atom and per-residue metadata from an AMBER topology.
#[derive(Debug, Clone, Default)]
pub struct AmberTopology {
    /// Number of atoms
    pub n_atoms: usize,
    /// Number of residues
    pub n_residues: usize,
    /// Atom names (4-char strings, trimmed)
    pub atom_names: Vec<String>,
    /// AMBER atom types; falls back to atom names when the section is absent
    pub atom_types: Vec<String>,
    /// Partial charges in elementary charge units
    pub charges: Vec<f64>,
    /// Atomic masses (amu)
    pub masses: Vec<f64>,
    /// Residue labels
    pub residue_labels: Vec<String>,
    /// Residue pointers: first atom index (0-based) for each residue
    pub residue_pointers: Vec<usize>,
}

impl AmberTopology {
    /// Get the residue index for each atom.
    pub fn atom_residue_indices(&self) -> Vec<usize> {
        let mut result = vec![0usize; self.n_atoms];
        for res_idx in 0..self.n_residues {
            let (start, end) = self.residue_range(res_idx);
            result[start..end].fill(res_idx);
        }
        result
    }

    /// Atom index range `[start, end)` of a residue.
    pub fn residue_range(&self, res_idx: usize) -> (usize, usize) {
        let start = self.residue_pointers[res_idx];
        let end = if res_idx + 1 < self.n_residues {
            self.residue_pointers[res_idx + 1]
        } else {
            self.n_atoms
        };
        (start, end.max(start))
    }

    /// Residue label of the residue containing each atom.
    pub fn atom_residue_labels(&self) -> Vec<&str> {
        self.atom_residue_indices()
            .into_iter()
            .map(|r| self.residue_labels[r].as_str())
            .collect()
    }
}

// ============================================================================
// Parser Implementation
// ============================================================================

/// Internal parser state for reading FLAG/FORMAT sections.
struct PrmtopParser {
    sections: HashMap<String, Vec<String>>,
}

impl PrmtopParser {
    fn new() -> Self {
        Self {
            sections: HashMap::new(),
        }
    }

    /// Split the file into `%FLAG` sections.
    fn parse_reader<R: BufRead>(&mut self, reader: R) -> PackingResult<()> {
        let mut current_flag: Option<String> = None;
        let mut current_data: Vec<String> = Vec::new();

        for line in reader.lines() {
            let line =
                line.map_err(|e| PackingError::load(format!("Failed to read prmtop line: {}", e)))?;

            if let Some(flag_content) = line.strip_prefix("%FLAG") {
                if let Some(flag) = current_flag.take() {
                    self.sections
                        .insert(flag, std::mem::take(&mut current_data));
                }
                current_flag = Some(flag_content.trim().to_string());
            } else if line.starts_with("%FORMAT")
                || line.starts_with("%VERSION")
                || line.starts_with("%COMMENT")
            {
                continue;
            } else if current_flag.is_some() {
                current_data.push(line);
            }
        }

        if let Some(flag) = current_flag {
            self.sections.insert(flag, current_data);
        }

        if self.sections.is_empty() {
            return Err(PackingError::load("prmtop contains no %FLAG sections"));
        }
        Ok(())
    }

    fn section(&self, flag: &str) -> PackingResult<&[String]> {
        self.sections
            .get(flag)
            .map(|v| v.as_slice())
            .ok_or_else(|| PackingError::load(format!("Missing prmtop section: {}", flag)))
    }

    fn parse_integers(&self, flag: &str) -> PackingResult<Vec<i64>> {
        let mut values = Vec::new();
        for line in self.section(flag)? {
            for word in line.split_whitespace() {
                let val: i64 = word.parse().map_err(|e| {
                    PackingError::load(format!("Failed to parse integer in {}: {}", flag, e))
                })?;
                values.push(val);
            }
        }
        Ok(values)
    }

    fn parse_floats(&self, flag: &str) -> PackingResult<Vec<f64>> {
        let mut values = Vec::new();
        for line in self.section(flag)? {
            for word in line.split_whitespace() {
                let val: f64 = word.parse().map_err(|e| {
                    PackingError::load(format!("Failed to parse float in {}: {}", flag, e))
                })?;
                values.push(val);
            }
        }
        Ok(values)
    }

    /// Parse fixed-width string values (atom names, residue labels).
    fn parse_strings(&self, flag: &str, width: usize) -> PackingResult<Vec<String>> {
        let mut values = Vec::new();
        for line in self.section(flag)? {
            let chars: Vec<char> = line.chars().collect();
            for field in chars.chunks(width) {
                let s: String = field.iter().collect();
                let s = s.trim();
                // Trailing partial fields are padding unless they carry text
                if field.len() == width || !s.is_empty() {
                    values.push(s.to_string());
                }
            }
        }
        Ok(values)
    }
}

/// Parse an AMBER prmtop file.
///
/// Missing required sections, short sections or unreadable files are
/// reported as [`PackingError::LoadFailure`].
pub fn parse_prmtop<P: AsRef<Path>>(path: P) -> PackingResult<AmberTopology> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        PackingError::load(format!(
            "Failed to open prmtop file {}: {}",
            path.display(),
            e
        ))
    })?;
    parse_prmtop_reader(BufReader::new(file))
}

/// Parse prmtop content from any buffered reader.
pub fn parse_prmtop_reader<R: BufRead>(reader: R) -> PackingResult<AmberTopology> {
    let mut parser = PrmtopParser::new();
    parser.parse_reader(reader)?;

    let pointers = parser.parse_integers("POINTERS")?;
    if pointers.len() < 12 {
        return Err(PackingError::load("POINTERS section too short"));
    }
    if pointers[0] < 0 || pointers[11] < 0 {
        return Err(PackingError::load(format!(
            "POINTERS contains negative values: n_atoms={}, n_residues={}",
            pointers[0], pointers[11]
        )));
    }
    let n_atoms = pointers[0] as usize;
    let n_residues = pointers[11] as usize;

    let mut atom_names = parser.parse_strings("ATOM_NAME", 4)?;
    if atom_names.len() < n_atoms {
        return Err(PackingError::load(format!(
            "ATOM_NAME has {} entries, expected {}",
            atom_names.len(),
            n_atoms
        )));
    }
    atom_names.truncate(n_atoms);

    let atom_types = match parser.parse_strings("AMBER_ATOM_TYPE", 4) {
        Ok(mut types) if types.len() >= n_atoms => {
            types.truncate(n_atoms);
            types
        }
        _ => atom_names.clone(),
    };

    let mut residue_labels = parser.parse_strings("RESIDUE_LABEL", 4)?;
    if residue_labels.len() < n_residues {
        return Err(PackingError::load(format!(
            "RESIDUE_LABEL has {} entries, expected {}",
            residue_labels.len(),
            n_residues
        )));
    }
    residue_labels.truncate(n_residues);

    // 1-based in file
    let res_ptr_raw = parser.parse_integers("RESIDUE_POINTER")?;
    if res_ptr_raw.len() < n_residues {
        return Err(PackingError::load(format!(
            "RESIDUE_POINTER has {} entries, expected {}",
            res_ptr_raw.len(),
            n_residues
        )));
    }
    let mut residue_pointers = Vec::with_capacity(n_residues);
    for (i, &x) in res_ptr_raw.iter().take(n_residues).enumerate() {
        if x < 1 || (x - 1) as usize > n_atoms {
            return Err(PackingError::load(format!(
                "Invalid RESIDUE_POINTER at position {}: {}",
                i, x
            )));
        }
        residue_pointers.push((x - 1) as usize);
    }

    let charges = parser
        .parse_floats("CHARGE")
        .map(|raw| {
            raw.iter()
                .take(n_atoms)
                .map(|&q| q / AMBER_CHARGE_FACTOR)
                .collect()
        })
        .unwrap_or_else(|_| vec![0.0; n_atoms]);
    let masses = parser
        .parse_floats("MASS")
        .map(|raw| raw.into_iter().take(n_atoms).collect())
        .unwrap_or_else(|_| vec![0.0; n_atoms]);

    if charges.len() != n_atoms || masses.len() != n_atoms {
        return Err(PackingError::load(format!(
            "CHARGE/MASS sections have {}/{} entries, expected {}",
            charges.len(),
            masses.len(),
            n_atoms
        )));
    }

    log::debug!(
        "Parsed prmtop: {} atoms, {} residues",
        n_atoms,
        n_residues
    );

    Ok(AmberTopology {
        n_atoms,
        n_residues,
        atom_names,
        atom_types,
        charges,
        masses,
        residue_labels,
        residue_pointers,
    })
}

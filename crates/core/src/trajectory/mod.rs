//! Trajectory loading.
//!
//! A [`Trajectory`] pairs an AMBER topology with the frames of a DCD file:
//! positions in nm plus the per-frame periodic box when the file carries one.

pub mod dcd;

use std::path::Path;

use crate::amber::prmtop::{parse_prmtop, AmberTopology};
use crate::error::{PackingError, PackingResult};
use crate::pbc::PeriodicBox;

use self::dcd::{DcdFrame, DcdReader};

/// One snapshot of the system.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Positions in nm, ordered like the topology atoms.
    pub positions: Vec<[f64; 3]>,
    /// Unit cell `[a, b, c, alpha, beta, gamma]` as stored in the file,
    /// lengths in nm. Validated only when a box is actually needed.
    pub unit_cell: Option<[f64; 6]>,
}

impl Frame {
    pub fn new(positions: Vec<[f64; 3]>, periodic_box: Option<PeriodicBox>) -> Self {
        let unit_cell = periodic_box.map(|pbox| {
            let [a, b, c] = pbox.lengths();
            [a, b, c, 90.0, 90.0, 90.0]
        });
        Self::with_unit_cell(positions, unit_cell)
    }

    pub fn with_unit_cell(positions: Vec<[f64; 3]>, unit_cell: Option<[f64; 6]>) -> Self {
        Self {
            positions,
            unit_cell,
        }
    }

    pub fn n_atoms(&self) -> usize {
        self.positions.len()
    }

    /// The frame's periodic box.
    ///
    /// An absent or all-zero cell is `None`; any other cell that does not
    /// describe a valid box is `InvalidConfiguration`.
    pub fn periodic_box(&self) -> PackingResult<Option<PeriodicBox>> {
        match &self.unit_cell {
            // Writers without a box often store an all-zero cell.
            Some(cell) if cell[..3].iter().all(|&l| l == 0.0) => Ok(None),
            Some(cell) => PeriodicBox::from_unit_cell(cell)
                .map(Some)
                .map_err(|e| match e {
                    PackingError::InvalidConfiguration(msg) => {
                        PackingError::config(format!("unusable unit cell: {}", msg))
                    }
                    other => other,
                }),
            None => Ok(None),
        }
    }

    fn from_dcd((positions, cell): DcdFrame) -> Self {
        Self::with_unit_cell(positions, cell)
    }
}

/// Topology plus an ordered, in-memory sequence of frames.
#[derive(Debug, Clone)]
pub struct Trajectory {
    pub topology: AmberTopology,
    pub frames: Vec<Frame>,
}

impl Trajectory {
    /// Build a trajectory from parts, checking that every frame matches the
    /// topology atom count.
    pub fn new(topology: AmberTopology, frames: Vec<Frame>) -> PackingResult<Self> {
        if frames.is_empty() {
            return Err(PackingError::load("trajectory contains no frames"));
        }
        if let Some((i, frame)) = frames
            .iter()
            .enumerate()
            .find(|(_, f)| f.n_atoms() != topology.n_atoms)
        {
            return Err(PackingError::load(format!(
                "frame {} has {} atoms but the topology defines {}",
                i,
                frame.n_atoms(),
                topology.n_atoms
            )));
        }
        Ok(Self { topology, frames })
    }

    /// Load a prmtop topology and a DCD trajectory.
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(prmtop: P, dcd: Q) -> PackingResult<Self> {
        let topology = parse_prmtop(prmtop.as_ref())?;
        let mut reader = DcdReader::open(dcd.as_ref())?;

        if reader.n_atoms() != topology.n_atoms {
            return Err(PackingError::load(format!(
                "{} has {} atoms but {} defines {}",
                dcd.as_ref().display(),
                reader.n_atoms(),
                prmtop.as_ref().display(),
                topology.n_atoms
            )));
        }

        let frames: Vec<Frame> = reader
            .read_all_frames()?
            .into_iter()
            .map(Frame::from_dcd)
            .collect();

        log::info!(
            "Loaded {} frames of {} atoms from {}",
            frames.len(),
            topology.n_atoms,
            dcd.as_ref().display()
        );
        Self::new(topology, frames)
    }

    pub fn n_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn n_atoms(&self) -> usize {
        self.topology.n_atoms
    }
}

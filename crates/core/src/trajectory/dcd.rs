//! DCD trajectory file reader.
//!
//! Reads CHARMM/NAMD/OpenMM DCD binary trajectories of either endianness.
//! Coordinates and unit cell lengths are converted from Angstrom to nm.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::{PackingError, PackingResult};
use crate::util::ANGSTROM_TO_NM;

/// Raw frame as stored on disk: positions (nm) and the optional unit cell
/// `[a, b, c, alpha, beta, gamma]` (lengths in nm, angles as written).
pub type DcdFrame = (Vec<[f64; 3]>, Option<[f64; 6]>);

// ============================================================================
// Data Structures
// ============================================================================

/// DCD file header information.
#[derive(Debug, Clone)]
pub struct DcdHeader {
    /// Number of frames in trajectory
    pub n_frames: usize,
    /// Number of atoms
    pub n_atoms: usize,
    /// Starting timestep
    pub start_timestep: i32,
    /// Timestep interval between frames
    pub timestep_interval: i32,
    /// Integration timestep in AKMA units
    pub timestep: f32,
    /// Whether unit cell information is present
    pub has_unit_cell: bool,
    /// Whether this is a CHARMM format DCD
    pub is_charmm: bool,
    /// Whether the file is big-endian
    pub is_big_endian: bool,
    /// Title strings from header
    pub titles: Vec<String>,
    /// File byte offset where frame data begins
    pub first_frame_offset: u64,
    /// Size in bytes of each frame (for seeking)
    pub frame_size: usize,
}

/// DCD trajectory reader with streaming capability.
pub struct DcdReader {
    reader: BufReader<File>,
    header: DcdHeader,
    current_frame: usize,
}

impl DcdReader {
    /// Open a DCD file for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> PackingResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            PackingError::load(format!("Failed to open DCD file {}: {}", path.display(), e))
        })?;
        let file_len = file
            .metadata()
            .map_err(|e| PackingError::load(format!("Failed to stat DCD file: {}", e)))?
            .len();
        let mut reader = BufReader::new(file);
        let mut header = read_dcd_header_internal(&mut reader)?;
        reconcile_frame_count(&mut header, file_len);

        Ok(Self {
            reader,
            header,
            current_frame: 0,
        })
    }

    pub fn header(&self) -> &DcdHeader {
        &self.header
    }

    pub fn n_frames(&self) -> usize {
        self.header.n_frames
    }

    pub fn n_atoms(&self) -> usize {
        self.header.n_atoms
    }

    /// Read the next frame, returning positions in nm.
    /// Returns None if at end of trajectory.
    pub fn read_frame(&mut self) -> PackingResult<Option<DcdFrame>> {
        if self.current_frame >= self.header.n_frames {
            return Ok(None);
        }

        let frame = read_frame_internal(&mut self.reader, &self.header).map_err(|e| {
            PackingError::load(format!("frame {}: {}", self.current_frame, e))
        })?;
        self.current_frame += 1;
        Ok(Some(frame))
    }

    /// Seek to a specific frame.
    pub fn seek_frame(&mut self, frame: usize) -> PackingResult<()> {
        if frame >= self.header.n_frames {
            return Err(PackingError::load(format!(
                "Frame {} out of range (trajectory has {} frames)",
                frame, self.header.n_frames
            )));
        }

        let offset =
            self.header.first_frame_offset + (frame as u64) * (self.header.frame_size as u64);
        self.reader
            .seek(SeekFrom::Start(offset))
            .map_err(|e| PackingError::load(format!("Seek failed: {}", e)))?;
        self.current_frame = frame;
        Ok(())
    }

    /// Read all remaining frames into memory, starting from frame 0.
    pub fn read_all_frames(&mut self) -> PackingResult<Vec<DcdFrame>> {
        if self.header.n_frames == 0 {
            return Ok(Vec::new());
        }
        self.seek_frame(0)?;

        let mut frames = Vec::with_capacity(self.header.n_frames);
        while let Some(frame) = self.read_frame()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    pub fn current_frame(&self) -> usize {
        self.current_frame
    }
}

// ============================================================================
// Internal Implementation
// ============================================================================

/// Endian-aware primitive reads. Internal errors are plain strings and get
/// wrapped into `LoadFailure` at the public boundary.
struct Endian {
    big: bool,
}

impl Endian {
    fn read_4<R: Read>(&self, reader: &mut R) -> Result<[u8; 4], String> {
        let mut buf = [0u8; 4];
        reader
            .read_exact(&mut buf)
            .map_err(|e| format!("unexpected end of DCD data: {}", e))?;
        Ok(buf)
    }

    fn i32<R: Read>(&self, reader: &mut R) -> Result<i32, String> {
        let buf = self.read_4(reader)?;
        Ok(if self.big {
            i32::from_be_bytes(buf)
        } else {
            i32::from_le_bytes(buf)
        })
    }

    fn f32<R: Read>(&self, reader: &mut R) -> Result<f32, String> {
        let buf = self.read_4(reader)?;
        Ok(if self.big {
            f32::from_be_bytes(buf)
        } else {
            f32::from_le_bytes(buf)
        })
    }

    fn f64<R: Read>(&self, reader: &mut R) -> Result<f64, String> {
        let mut buf = [0u8; 8];
        reader
            .read_exact(&mut buf)
            .map_err(|e| format!("unexpected end of DCD data: {}", e))?;
        Ok(if self.big {
            f64::from_be_bytes(buf)
        } else {
            f64::from_le_bytes(buf)
        })
    }

    /// Read a Fortran record marker and check it against the expected size.
    fn expect_marker<R: Read>(&self, reader: &mut R, expected: usize) -> Result<(), String> {
        let marker = self.i32(reader)?;
        if marker < 0 || marker as usize != expected {
            return Err(format!(
                "record marker {} does not match expected size {}",
                marker, expected
            ));
        }
        Ok(())
    }
}

/// Detect endianness from the first record marker, which must be 84.
fn detect_endianness<R: Read + Seek>(reader: &mut R) -> Result<bool, String> {
    let mut buf = [0u8; 4];
    reader
        .read_exact(&mut buf)
        .map_err(|e| format!("Failed to read block size: {}", e))?;
    reader
        .seek(SeekFrom::Current(-4))
        .map_err(|e| format!("Failed to seek: {}", e))?;

    let le_val = i32::from_le_bytes(buf);
    let be_val = i32::from_be_bytes(buf);
    if le_val == 84 {
        Ok(false)
    } else if be_val == 84 {
        Ok(true)
    } else {
        Err(format!(
            "Invalid DCD header: first block size is {} (LE) or {} (BE), expected 84",
            le_val, be_val
        ))
    }
}

fn read_dcd_header_internal<R: Read + Seek>(reader: &mut R) -> PackingResult<DcdHeader> {
    read_header_fields(reader).map_err(PackingError::load)
}

fn read_header_fields<R: Read + Seek>(reader: &mut R) -> Result<DcdHeader, String> {
    let is_big_endian = detect_endianness(reader)?;
    let en = Endian { big: is_big_endian };

    // First block: 84 bytes of control words
    en.expect_marker(reader, 84)?;
    let mut magic = [0u8; 4];
    reader
        .read_exact(&mut magic)
        .map_err(|e| format!("Failed to read magic: {}", e))?;
    if &magic != b"CORD" {
        return Err(format!("Invalid DCD magic: {:?}", magic));
    }

    let mut icntrl = [0i32; 20];
    for slot in icntrl.iter_mut().take(9) {
        *slot = en.i32(reader)?;
    }
    let n_frames_i32 = icntrl[0];
    if n_frames_i32 < 0 {
        return Err(format!("Invalid number of frames: {}", n_frames_i32));
    }
    let start_timestep = icntrl[1];
    let timestep_interval = icntrl[2];
    let n_fixed = icntrl[8];

    let timestep = en.f32(reader)?;
    for slot in icntrl.iter_mut().skip(10) {
        *slot = en.i32(reader)?;
    }
    // icntrl[10] = unit cell flag, icntrl[19] = CHARMM version
    let is_charmm = icntrl[19] != 0;
    let has_unit_cell = is_charmm && icntrl[10] != 0;
    en.expect_marker(reader, 84)?;

    if n_fixed != 0 {
        return Err(format!(
            "DCD files with fixed atoms are not supported ({} fixed)",
            n_fixed
        ));
    }

    // Second block: titles
    let block2_size = en.i32(reader)?;
    if block2_size < 4 {
        return Err(format!("Invalid title block size: {}", block2_size));
    }
    let n_titles = en.i32(reader)?;
    if n_titles < 0 || 4 + n_titles as i64 * 80 > block2_size as i64 {
        return Err(format!(
            "Title block size mismatch: block says {} bytes for {} titles",
            block2_size, n_titles
        ));
    }
    let mut titles = Vec::with_capacity(n_titles as usize);
    for _ in 0..n_titles {
        let mut title_buf = [0u8; 80];
        reader
            .read_exact(&mut title_buf)
            .map_err(|e| format!("Failed to read title: {}", e))?;
        titles.push(String::from_utf8_lossy(&title_buf).trim().to_string());
    }
    let remaining = block2_size as i64 - (4 + n_titles as i64 * 80);
    if remaining > 0 {
        reader
            .seek(SeekFrom::Current(remaining))
            .map_err(|e| format!("Failed to skip title padding: {}", e))?;
    }
    en.expect_marker(reader, block2_size as usize)?;

    // Third block: number of atoms
    en.expect_marker(reader, 4)?;
    let n_atoms_i32 = en.i32(reader)?;
    if n_atoms_i32 < 0 {
        return Err(format!("Invalid number of atoms: {}", n_atoms_i32));
    }
    let n_atoms = n_atoms_i32 as usize;
    if n_atoms > 100_000_000 {
        return Err(format!(
            "Atom count {} exceeds maximum supported (100,000,000)",
            n_atoms
        ));
    }
    en.expect_marker(reader, 4)?;

    let first_frame_offset = reader
        .stream_position()
        .map_err(|e| format!("Failed to get position: {}", e))?;

    let coord_block_size = n_atoms
        .checked_mul(4)
        .and_then(|v| v.checked_add(8))
        .ok_or_else(|| format!("Frame size overflow: n_atoms={}", n_atoms))?;
    let unit_cell_size = if has_unit_cell { 4 + 48 + 4 } else { 0 };
    let frame_size = coord_block_size
        .checked_mul(3)
        .and_then(|v| v.checked_add(unit_cell_size))
        .ok_or_else(|| format!("Frame size overflow: coord_block_size={}", coord_block_size))?;

    Ok(DcdHeader {
        n_frames: n_frames_i32 as usize,
        n_atoms,
        start_timestep,
        timestep_interval,
        timestep,
        has_unit_cell,
        is_charmm,
        is_big_endian,
        titles,
        first_frame_offset,
        frame_size,
    })
}

/// Writers that crash or stream (OpenMM) can leave a stale frame count in
/// the header; trust the file size when the two disagree.
fn reconcile_frame_count(header: &mut DcdHeader, file_len: u64) {
    if header.frame_size == 0 || file_len < header.first_frame_offset {
        return;
    }
    let from_size = ((file_len - header.first_frame_offset) / header.frame_size as u64) as usize;
    if from_size != header.n_frames {
        log::warn!(
            "DCD header reports {} frames but file size implies {}; using {}",
            header.n_frames,
            from_size,
            from_size
        );
        header.n_frames = from_size;
    }
}

fn read_frame_internal<R: Read>(reader: &mut R, header: &DcdHeader) -> Result<DcdFrame, String> {
    let n_atoms = header.n_atoms;
    let en = Endian {
        big: header.is_big_endian,
    };

    let box_info = if header.has_unit_cell {
        en.expect_marker(reader, 48)?;
        let a = en.f64(reader)?;
        let gamma = en.f64(reader)?;
        let b = en.f64(reader)?;
        let beta = en.f64(reader)?;
        let alpha = en.f64(reader)?;
        let c = en.f64(reader)?;
        en.expect_marker(reader, 48)?;

        Some([
            a * ANGSTROM_TO_NM,
            b * ANGSTROM_TO_NM,
            c * ANGSTROM_TO_NM,
            alpha,
            beta,
            gamma,
        ])
    } else {
        None
    };

    let mut axes: [Vec<f32>; 3] = [Vec::new(), Vec::new(), Vec::new()];
    for axis in axes.iter_mut() {
        en.expect_marker(reader, n_atoms * 4)?;
        *axis = (0..n_atoms)
            .map(|_| en.f32(reader))
            .collect::<Result<Vec<_>, _>>()?;
        en.expect_marker(reader, n_atoms * 4)?;
    }

    let positions: Vec<[f64; 3]> = (0..n_atoms)
        .map(|i| {
            [
                axes[0][i] as f64 * ANGSTROM_TO_NM,
                axes[1][i] as f64 * ANGSTROM_TO_NM,
                axes[2][i] as f64 * ANGSTROM_TO_NM,
            ]
        })
        .collect();

    Ok((positions, box_info))
}

// ============================================================================
// Public API
// ============================================================================

/// Read the header from a DCD file.
pub fn read_dcd_header<P: AsRef<Path>>(path: P) -> PackingResult<DcdHeader> {
    Ok(DcdReader::open(path)?.header().clone())
}

/// Read a specific frame from a DCD file.
pub fn read_dcd_frame<P: AsRef<Path>>(path: P, frame: usize) -> PackingResult<DcdFrame> {
    let mut reader = DcdReader::open(path)?;
    reader.seek_frame(frame)?;
    reader
        .read_frame()?
        .ok_or_else(|| PackingError::load(format!("Frame {} not found", frame)))
}

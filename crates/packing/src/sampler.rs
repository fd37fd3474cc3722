//! Frame subsampling.

use wpt_core::error::{PackingError, PackingResult};

/// Picks every `stride`-th frame, optionally inside `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSampler {
    stride: usize,
    start: usize,
    end: Option<usize>,
}

impl FrameSampler {
    /// Sampler over all frames. A stride of zero is rejected.
    pub fn new(stride: usize) -> PackingResult<Self> {
        Self::with_bounds(stride, 0, None)
    }

    /// Sampler restricted to frames `start..end` (exclusive; `None` = to the end).
    pub fn with_bounds(stride: usize, start: usize, end: Option<usize>) -> PackingResult<Self> {
        if stride == 0 {
            return Err(PackingError::config("stride must be at least 1"));
        }
        if let Some(end) = end {
            if end <= start {
                return Err(PackingError::config(format!(
                    "end frame {} must be greater than start frame {}",
                    end, start
                )));
            }
        }
        Ok(Self { stride, start, end })
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Ascending frame indices `start, start + stride, ...` below `min(end, n_frames)`.
    pub fn indices(&self, n_frames: usize) -> Vec<usize> {
        let stop = self.end.map_or(n_frames, |end| end.min(n_frames));
        (self.start..stop).step_by(self.stride).collect()
    }
}

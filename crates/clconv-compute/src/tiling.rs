//! Work-group tiling for 2D dispatch.
//!
//! The global range is each image dimension rounded up to a whole number of
//! work-groups, so every pixel gets a work-item. Work-items past the image
//! edge exist only to fill the last group; kernels skip their writes.
//!
//! ```rust
//! use clconv_compute::tiling::compute_work_size;
//!
//! let work = compute_work_size(17, 9);
//! assert_eq!(work.local, [16, 16]);
//! assert_eq!(work.global, [32, 16]);
//! ```

/// Default local work-group size.
pub const DEFAULT_LOCAL: [usize; 2] = [16, 16];

/// Local and global work sizes of a 2D dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkSize {
    /// Work-group dimensions.
    pub local: [usize; 2],
    /// Total work-items per axis, a multiple of `local`.
    pub global: [usize; 2],
}

impl WorkSize {
    /// Tiles a `width` x `height` image with `local` groups. Zero local
    /// dimensions are treated as 1.
    pub fn new(width: u32, height: u32, local: [usize; 2]) -> Self {
        let local = [local[0].max(1), local[1].max(1)];
        Self {
            local,
            global: [round_up(width as usize, local[0]), round_up(height as usize, local[1])],
        }
    }

    /// Number of work-groups per axis.
    pub fn groups(&self) -> [usize; 2] {
        [self.global[0] / self.local[0], self.global[1] / self.local[1]]
    }

    /// True if the range covers `width` x `height` in whole groups.
    pub fn covers(&self, width: u32, height: u32) -> bool {
        self.global[0] % self.local[0] == 0
            && self.global[1] % self.local[1] == 0
            && self.global[0] >= width as usize
            && self.global[1] >= height as usize
    }
}

/// Work size with [`DEFAULT_LOCAL`].
pub fn compute_work_size(width: u32, height: u32) -> WorkSize {
    WorkSize::new(width, height, DEFAULT_LOCAL)
}

/// Smallest multiple of `multiple` that is `>= value`.
#[inline]
pub fn round_up(value: usize, multiple: usize) -> usize {
    value.div_ceil(multiple) * multiple
}

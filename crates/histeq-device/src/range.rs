use crate::{device::DeviceInfo, error::DeviceError};

/// The index space of a kernel launch.
///
/// `global` is the total number of work items; `local` optionally fixes the
/// number of work items per work group. When `local` is absent the queue
/// picks the largest power of two accepted by the device that divides
/// `global`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NdRange {
    /// Total number of work items.
    pub global: usize,
    /// Number of work items per work group.
    pub local: Option<usize>,
}

impl NdRange {
    /// Create a range of `global` work items with a device chosen group size.
    pub fn new(global: usize) -> Self {
        Self {
            global,
            local: None,
        }
    }

    /// Fix the work group size.
    pub fn with_local(mut self, local: usize) -> Self {
        self.local = Some(local);
        self
    }

    /// Create a range with `local` work items per group, rounding `global` up
    /// to the next multiple of `local`.
    ///
    /// The extra work items must be neutral in the launched kernel.
    ///
    /// # Example
    ///
    /// ```
    /// use histeq_device::NdRange;
    ///
    /// let range = NdRange::padded(10, 4);
    /// assert_eq!(range.global, 12);
    /// assert_eq!(range.local, Some(4));
    /// ```
    pub fn padded(global: usize, local: usize) -> Self {
        let global = match local {
            0 => global,
            _ => global.div_ceil(local) * local,
        };
        Self::new(global).with_local(local)
    }

    /// Validate the range against the device and return `(global, local)`.
    pub(crate) fn resolve(&self, info: &DeviceInfo) -> Result<(usize, usize), DeviceError> {
        if self.global == 0 {
            return Err(DeviceError::EmptyRange);
        }

        let max = info.max_work_group_size.max(1);

        let local = match self.local {
            Some(0) => return Err(DeviceError::InvalidWorkGroupSize(self.global, 0)),
            Some(local) if local > max => {
                return Err(DeviceError::WorkGroupTooLarge(local, max));
            }
            Some(local) => local,
            None => {
                let max_pow2 = 1usize << (usize::BITS - 1 - max.leading_zeros());
                let global_pow2 = 1usize << self.global.trailing_zeros();
                max_pow2.min(global_pow2)
            }
        };

        if self.global % local != 0 {
            return Err(DeviceError::InvalidWorkGroupSize(self.global, local));
        }

        Ok((self.global, local))
    }
}

/// The position of one work item inside a launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkItem {
    global_id: usize,
    local_id: usize,
    group_id: usize,
    local_size: usize,
    global_size: usize,
}

impl WorkItem {
    pub(crate) fn new(global_id: usize, local_size: usize, global_size: usize) -> Self {
        Self {
            global_id,
            local_id: global_id % local_size,
            group_id: global_id / local_size,
            local_size,
            global_size,
        }
    }

    /// Index of the work item in the whole launch.
    #[inline]
    pub fn global_id(&self) -> usize {
        self.global_id
    }

    /// Index of the work item inside its work group.
    #[inline]
    pub fn local_id(&self) -> usize {
        self.local_id
    }

    /// Index of the work group the item belongs to.
    #[inline]
    pub fn group_id(&self) -> usize {
        self.group_id
    }

    /// Number of work items per work group.
    #[inline]
    pub fn local_size(&self) -> usize {
        self.local_size
    }

    /// Total number of work items in the launch.
    #[inline]
    pub fn global_size(&self) -> usize {
        self.global_size
    }
}

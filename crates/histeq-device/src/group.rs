use std::cell::Cell;
use std::ops::Deref;
use std::sync::atomic::{fence, AtomicU32, Ordering};

use rayon::prelude::*;

use crate::{error::DeviceError, range::WorkItem};

/// Pattern freshly allocated local memory is filled with.
///
/// Local memory carries no zeroing guarantee; kernels initialise it before
/// the first read.
pub const LOCAL_MEM_POISON: u32 = 0xDEAD_BEEF;

/// Group-local scratch memory of 4-byte counters.
///
/// Owned by one work group for the duration of one launch.
#[derive(Debug)]
pub struct LocalBuffer {
    data: Vec<AtomicU32>,
}

impl Deref for LocalBuffer {
    type Target = [AtomicU32];

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

/// One work group of a launch.
///
/// The kernel body drives the work items of the group through phases: each
/// call to [`WorkGroup::for_each_item`] runs the closure once per work item,
/// and [`WorkGroup::barrier`] separates two phases. No work item starts a
/// phase before every work item of the group finished the previous one.
pub struct WorkGroup {
    group_id: usize,
    local_size: usize,
    global_size: usize,
    parallel: bool,
    local_mem_size: usize,
    local_mem_used: Cell<usize>,
    unsynchronized: Cell<bool>,
}

impl WorkGroup {
    pub(crate) fn new(
        group_id: usize,
        local_size: usize,
        global_size: usize,
        local_mem_size: usize,
        parallel: bool,
    ) -> Self {
        Self {
            group_id,
            local_size,
            global_size,
            parallel,
            local_mem_size,
            local_mem_used: Cell::new(0),
            unsynchronized: Cell::new(false),
        }
    }

    /// Index of the work group in the launch.
    pub fn group_id(&self) -> usize {
        self.group_id
    }

    /// Number of work items in the group.
    pub fn local_size(&self) -> usize {
        self.local_size
    }

    /// Total number of work items in the launch.
    pub fn global_size(&self) -> usize {
        self.global_size
    }

    /// Allocate `len` counters of group-local memory.
    ///
    /// The memory is not zeroed.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::OutOfLocalMemory`] when the group's allocations
    /// would exceed the device's local memory size.
    pub fn local_buffer(&self, len: usize) -> Result<LocalBuffer, DeviceError> {
        let bytes = len.saturating_mul(std::mem::size_of::<u32>());
        let used = self.local_mem_used.get().saturating_add(bytes);
        if used > self.local_mem_size {
            return Err(DeviceError::OutOfLocalMemory(used, self.local_mem_size));
        }
        self.local_mem_used.set(used);

        let data = (0..len).map(|_| AtomicU32::new(LOCAL_MEM_POISON)).collect();
        Ok(LocalBuffer { data })
    }

    /// Run one phase of the kernel: `f` is called once for every work item of
    /// the group, and the call returns when all of them have finished.
    pub fn for_each_item<F>(&self, f: F)
    where
        F: Fn(WorkItem) + Send + Sync,
    {
        debug_assert!(
            !self.unsynchronized.get(),
            "work group {} started a phase without a barrier after the previous one",
            self.group_id
        );

        let (local_size, global_size) = (self.local_size, self.global_size);
        let first = self.group_id * local_size;
        let item = move |local_id: usize| WorkItem::new(first + local_id, local_size, global_size);

        if self.parallel {
            (0..local_size)
                .into_par_iter()
                .for_each(|local_id| f(item(local_id)));
        } else {
            (0..local_size).for_each(|local_id| f(item(local_id)));
        }

        self.unsynchronized.set(true);
    }

    /// Group barrier: every memory effect of the previous phase is visible to
    /// every work item of the next phase.
    pub fn barrier(&self) {
        fence(Ordering::SeqCst);
        self.unsynchronized.set(false);
    }
}

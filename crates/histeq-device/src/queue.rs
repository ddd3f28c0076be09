use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    buffer::{AtomicBuffer, Buffer},
    device::Device,
    error::DeviceError,
    group::WorkGroup,
    range::{NdRange, WorkItem},
};

/// Controls how the work items of a launch are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    /// Use the global rayon thread pool to run work items in parallel.
    #[default]
    Parallel,

    /// Run every work item sequentially on the calling thread.
    ///
    /// Useful for debugging, or when the launch overhead outweighs the work.
    Serial,

    /// Run on a dedicated thread pool with `n` threads, built once per queue.
    Fixed(usize),
}

/// Completion record of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    kernel: &'static str,
    global: usize,
    local: usize,
    duration: Duration,
}

impl Event {
    /// Name of the kernel or command.
    pub fn kernel(&self) -> &'static str {
        self.kernel
    }

    /// Number of work items launched.
    pub fn global_size(&self) -> usize {
        self.global
    }

    /// Number of work items per work group.
    pub fn local_size(&self) -> usize {
        self.local
    }

    /// Wall-clock time between submission and completion.
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

/// An in-order command queue bound to one device.
///
/// Every `enqueue_*` call blocks until all of its work items have completed,
/// so a command observes every effect of the commands issued before it. The
/// end of a launch is the only barrier spanning more than one work group.
pub struct CommandQueue {
    device: Device,
    strategy: ExecutionStrategy,
    pool: Option<rayon::ThreadPool>,
    profiling: bool,
}

impl CommandQueue {
    /// Create a queue executing on the global rayon pool.
    pub fn new(device: Device) -> Self {
        Self {
            device,
            strategy: ExecutionStrategy::Parallel,
            pool: None,
            profiling: false,
        }
    }

    /// Create a queue with the given execution strategy.
    ///
    /// # Errors
    ///
    /// Returns an error if a [`ExecutionStrategy::Fixed`] pool cannot be built.
    pub fn with_strategy(device: Device, strategy: ExecutionStrategy) -> Result<Self, DeviceError> {
        let pool = match strategy {
            ExecutionStrategy::Fixed(0) => return Err(DeviceError::InvalidThreadCount(0)),
            ExecutionStrategy::Fixed(n) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| DeviceError::ThreadPool(e.to_string()))?,
            ),
            _ => None,
        };

        Ok(Self {
            device,
            strategy,
            pool,
            profiling: false,
        })
    }

    /// Log the duration of every command at debug level.
    pub fn with_profiling(mut self, profiling: bool) -> Self {
        self.profiling = profiling;
        self
    }

    /// The device the queue submits to.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// The execution strategy of the queue.
    pub fn strategy(&self) -> ExecutionStrategy {
        self.strategy
    }

    fn parallel(&self) -> bool {
        self.strategy != ExecutionStrategy::Serial
    }

    fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }

    fn complete(&self, kernel: &'static str, global: usize, local: usize, start: Instant) -> Event {
        let event = Event {
            kernel,
            global,
            local,
            duration: start.elapsed(),
        };
        if self.profiling {
            log::debug!(
                "kernel `{}` global={} local={} took {:?}",
                kernel,
                global,
                local,
                event.duration
            );
        }
        event
    }

    /// Set every counter of `buffer` to `value`.
    pub fn enqueue_fill(&self, buffer: &AtomicBuffer, value: u32) -> Event {
        let start = Instant::now();
        buffer.fill(value);
        self.complete("fill_buffer", buffer.len(), 1, start)
    }

    /// Copy the counters of `src` into `dst`.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffers differ in length.
    pub fn enqueue_copy(&self, src: &AtomicBuffer, dst: &AtomicBuffer) -> Result<Event, DeviceError> {
        let start = Instant::now();
        dst.copy_from(src)?;
        Ok(self.complete("copy_buffer", dst.len(), 1, start))
    }

    /// Launch a kernel whose work items only read shared inputs and update
    /// shared atomic buffers.
    ///
    /// # Arguments
    ///
    /// * `kernel` - The kernel name, used for diagnostics.
    /// * `range` - The launch range.
    /// * `f` - The kernel body, run once per work item.
    pub fn enqueue_items<F>(
        &self,
        kernel: &'static str,
        range: NdRange,
        f: F,
    ) -> Result<Event, DeviceError>
    where
        F: Fn(WorkItem) + Send + Sync,
    {
        let (global, local) = range.resolve(self.device.info())?;
        let start = Instant::now();

        let item = move |gid: usize| WorkItem::new(gid, local, global);
        if self.parallel() {
            self.install(|| (0..global).into_par_iter().for_each(|gid| f(item(gid))));
        } else {
            (0..global).for_each(|gid| f(item(gid)));
        }

        Ok(self.complete(kernel, global, local, start))
    }

    /// Launch a kernel where work item `i` exclusively owns the elements
    /// `i * chunk .. (i + 1) * chunk` of `dst`.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::BufferSizeMismatch`] unless `dst` holds exactly
    /// `range.global * chunk` elements.
    pub fn enqueue_chunks<T, F>(
        &self,
        kernel: &'static str,
        range: NdRange,
        dst: &mut Buffer<T>,
        chunk: usize,
        f: F,
    ) -> Result<Event, DeviceError>
    where
        T: Copy + Send,
        F: Fn(WorkItem, &mut [T]) + Send + Sync,
    {
        let (global, local) = range.resolve(self.device.info())?;
        if chunk == 0 || dst.len() != global * chunk {
            return Err(DeviceError::BufferSizeMismatch(global * chunk, dst.len()));
        }
        let start = Instant::now();

        let item = move |gid: usize| WorkItem::new(gid, local, global);
        let data = dst.as_mut_slice();
        if self.parallel() {
            self.install(|| {
                data.par_chunks_exact_mut(chunk)
                    .enumerate()
                    .for_each(|(gid, out)| f(item(gid), out))
            });
        } else {
            data.chunks_exact_mut(chunk)
                .enumerate()
                .for_each(|(gid, out)| f(item(gid), out));
        }

        Ok(self.complete(kernel, global, local, start))
    }

    /// Launch a kernel that runs once per work group and drives its work
    /// items through barrier separated phases.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by any work group, e.g. when the group
    /// asks for more local memory than the device offers.
    pub fn enqueue_groups<F>(
        &self,
        kernel: &'static str,
        range: NdRange,
        f: F,
    ) -> Result<Event, DeviceError>
    where
        F: Fn(&WorkGroup) -> Result<(), DeviceError> + Send + Sync,
    {
        let (global, local) = range.resolve(self.device.info())?;
        let local_mem_size = self.device.info().local_mem_size;
        let parallel = self.parallel();
        let start = Instant::now();

        let run_group = |group_id: usize| {
            let group = WorkGroup::new(group_id, local, global, local_mem_size, parallel);
            f(&group)
        };
        let num_groups = global / local;
        if parallel {
            self.install(|| (0..num_groups).into_par_iter().try_for_each(run_group))?;
        } else {
            (0..num_groups).try_for_each(run_group)?;
        }

        Ok(self.complete(kernel, global, local, start))
    }
}

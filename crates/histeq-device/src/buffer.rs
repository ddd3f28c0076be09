use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::DeviceError;

fn try_alloc<T>(len: usize) -> Result<Vec<T>, DeviceError> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| DeviceError::OutOfMemory(len.saturating_mul(std::mem::size_of::<T>())))?;
    Ok(data)
}

/// A global device buffer of plain values.
///
/// Kernels read it through [`Buffer::as_slice`]; writes happen either from the
/// host or from a chunked launch where every work item owns a disjoint chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct Buffer<T> {
    data: Vec<T>,
}

impl<T: Copy> Buffer<T> {
    /// Allocate a buffer holding `len` copies of `val`.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::OutOfMemory`] if the allocation fails.
    pub fn filled(len: usize, val: T) -> Result<Self, DeviceError> {
        let mut data = try_alloc(len)?;
        data.resize(len, val);
        Ok(Self { data })
    }

    /// Allocate a buffer and copy `src` into it.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::OutOfMemory`] if the allocation fails.
    pub fn from_slice(src: &[T]) -> Result<Self, DeviceError> {
        let mut data = try_alloc(src.len())?;
        data.extend_from_slice(src);
        Ok(Self { data })
    }

    /// Overwrite the buffer contents from the host.
    pub fn write(&mut self, src: &[T]) -> Result<(), DeviceError> {
        if src.len() != self.data.len() {
            return Err(DeviceError::BufferSizeMismatch(self.data.len(), src.len()));
        }
        self.data.copy_from_slice(src);
        Ok(())
    }

    /// Number of elements in the buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read access to the buffer contents.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Copy the buffer back to the host.
    pub fn to_vec(&self) -> Vec<T> {
        self.data.clone()
    }

    /// Consume the buffer and return its contents.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

/// A global buffer of 4-byte unsigned counters shared by all work items.
///
/// Every access goes through an atomic operation, so any number of work items
/// may update the same element concurrently.
#[derive(Debug)]
pub struct AtomicBuffer {
    data: Vec<AtomicU32>,
}

impl AtomicBuffer {
    /// Allocate a buffer of `len` zeroed counters.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::OutOfMemory`] if the allocation fails.
    pub fn zeroed(len: usize) -> Result<Self, DeviceError> {
        let mut data = try_alloc(len)?;
        data.extend((0..len).map(|_| AtomicU32::new(0)));
        Ok(Self { data })
    }

    /// Allocate a buffer initialized from `src`.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::OutOfMemory`] if the allocation fails.
    pub fn from_slice(src: &[u32]) -> Result<Self, DeviceError> {
        let mut data = try_alloc(src.len())?;
        data.extend(src.iter().map(|&v| AtomicU32::new(v)));
        Ok(Self { data })
    }

    /// Number of counters in the buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the buffer holds no counters.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Shared access to the counters for kernels.
    pub fn as_slice(&self) -> &[AtomicU32] {
        &self.data
    }

    /// Read a single counter back to the host.
    pub fn get(&self, index: usize) -> Option<u32> {
        self.data.get(index).map(|v| v.load(Ordering::Relaxed))
    }

    /// Copy the counters back to the host.
    pub fn to_vec(&self) -> Vec<u32> {
        self.data.iter().map(|v| v.load(Ordering::Relaxed)).collect()
    }

    pub(crate) fn fill(&self, val: u32) {
        self.data.iter().for_each(|v| v.store(val, Ordering::Relaxed));
    }

    pub(crate) fn copy_from(&self, src: &AtomicBuffer) -> Result<(), DeviceError> {
        if src.len() != self.len() {
            return Err(DeviceError::BufferSizeMismatch(self.len(), src.len()));
        }
        self.data
            .iter()
            .zip(src.data.iter())
            .for_each(|(d, s)| d.store(s.load(Ordering::Relaxed), Ordering::Relaxed));
        Ok(())
    }
}

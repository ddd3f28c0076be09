/// Largest work group a default device accepts.
pub const DEFAULT_MAX_WORK_GROUP_SIZE: usize = 256;

/// Bytes of group-local memory a default device offers to each work group.
pub const DEFAULT_LOCAL_MEM_SIZE: usize = 32 * 1024;

/// Capabilities of a compute device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Human readable device name.
    pub name: String,
    /// Number of hardware threads executing work items.
    pub compute_units: usize,
    /// Maximum number of work items in one work group.
    pub max_work_group_size: usize,
    /// Bytes of local memory available to a single work group.
    pub local_mem_size: usize,
}

/// A compute device kernels are launched on.
///
/// Work items are executed by the rayon thread pool of the host, so the
/// device is always available and never needs platform enumeration.
///
/// # Example
///
/// ```
/// use histeq_device::Device;
///
/// let device = Device::cpu();
/// assert!(device.info().compute_units > 0);
/// assert_eq!(device.info().max_work_group_size, 256);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    info: DeviceInfo,
}

impl Device {
    /// Create the host CPU device with the default limits.
    pub fn cpu() -> Self {
        let compute_units = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            info: DeviceInfo {
                name: "cpu".to_string(),
                compute_units,
                max_work_group_size: DEFAULT_MAX_WORK_GROUP_SIZE,
                local_mem_size: DEFAULT_LOCAL_MEM_SIZE,
            },
        }
    }

    /// Create a device with custom limits.
    pub fn with_info(info: DeviceInfo) -> Self {
        Self { info }
    }

    /// Returns the capabilities of the device.
    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }
}

impl Default for Device {
    fn default() -> Self {
        Device::cpu()
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} compute units, max work group {}, {} B local memory)",
            self.info.name,
            self.info.compute_units,
            self.info.max_work_group_size,
            self.info.local_mem_size
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_cpu() {
        let device = Device::cpu();
        assert_eq!(device.info().name, "cpu");
        assert_eq!(device.info().local_mem_size, DEFAULT_LOCAL_MEM_SIZE);
        assert_eq!(device, Device::default());
    }

    #[test]
    fn test_device_display() {
        let device = Device::with_info(DeviceInfo {
            name: "test".to_string(),
            compute_units: 2,
            max_work_group_size: 64,
            local_mem_size: 1024,
        });
        assert_eq!(
            format!("{device}"),
            "test (2 compute units, max work group 64, 1024 B local memory)"
        );
    }
}

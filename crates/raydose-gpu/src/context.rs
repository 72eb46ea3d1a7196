//! wgpu device acquisition for the dose assembly back end.
//!
//! Acquiring an adapter is expensive and the dose pipeline is stateless
//! between dispatches, so one device is shared per process. The context
//! also records how many matrix cells a single dispatch can hold, derived
//! from the device's storage-binding limit; callers check a requested
//! `(points, beamlets)` shape against it before uploading anything.

use std::sync::OnceLock;
use thiserror::Error;

/// Errors from the GPU back end.
#[derive(Debug, Clone, Error)]
pub enum GpuError {
    /// No adapter on this machine can run the dose assembly shaders.
    #[error("no GPU adapter available for dose assembly")]
    NoAdapter,

    /// The adapter refused a device.
    #[error("requesting a GPU device failed: {0}")]
    Device(String),

    /// A requested matrix exceeds what one dispatch can address.
    #[error("dose matrix of {cells} cells exceeds the device storage limit of {max_cells}")]
    MatrixTooLarge {
        /// Cells requested (`points * beamlets`).
        cells: usize,
        /// Largest cell count the device can bind.
        max_cells: usize,
    },

    /// Reading the assembled matrix back from the device failed.
    #[error("reading the dose matrix back from the GPU failed")]
    Readback,
}

static SHARED: OnceLock<Result<GpuContext, GpuError>> = OnceLock::new();

/// Process-wide device, queue, and the dose-matrix capacity they imply.
pub struct GpuContext {
    /// The wgpu device for creating resources and pipelines.
    pub device: wgpu::Device,
    /// The command queue for submitting work.
    pub queue: wgpu::Queue,
    /// Largest `points * beamlets` product one output buffer can hold.
    max_cells: usize,
}

impl GpuContext {
    /// The shared context, acquired on first use.
    ///
    /// Acquisition failure is sticky: once the process fails to find an
    /// adapter, every later call reports the same error.
    pub fn shared() -> Result<&'static Self, GpuError> {
        SHARED
            .get_or_init(Self::acquire)
            .as_ref()
            .map_err(Clone::clone)
    }

    fn acquire() -> Result<Self, GpuError> {
        pollster::block_on(async {
            let instance = wgpu::Instance::default();
            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::HighPerformance,
                    ..Default::default()
                })
                .await
                .ok_or(GpuError::NoAdapter)?;
            let (device, queue) = adapter
                .request_device(&wgpu::DeviceDescriptor::default(), None)
                .await
                .map_err(|e| GpuError::Device(e.to_string()))?;

            let max_cells = device.limits().max_storage_buffer_binding_size as usize
                / std::mem::size_of::<f32>();
            Ok(Self {
                device,
                queue,
                max_cells,
            })
        })
    }

    /// Largest `points * beamlets` product one dispatch can produce.
    pub fn max_matrix_cells(&self) -> usize {
        self.max_cells
    }

    /// Check a requested matrix size against the device limit.
    pub fn check_capacity(&self, cells: usize) -> Result<(), GpuError> {
        if cells > self.max_cells {
            return Err(GpuError::MatrixTooLarge {
                cells,
                max_cells: self.max_cells,
            });
        }
        Ok(())
    }
}

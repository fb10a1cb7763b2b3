//! Buffer creation with device-limit checks, and blocking readback.

use bytemuck::Pod;
use wgpu::util::DeviceExt;

use crate::context::GpuContext;

/// Buffer creation and readback failures.
///
/// Creation errors mean the device cannot hold the requested mesh; they are
/// not retried.
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    /// Zero-sized buffers cannot be bound as storage.
    #[error("buffer '{label}' would be empty")]
    Empty { label: String },

    /// The request exceeds a device limit.
    #[error("buffer '{label}' needs {size} bytes but the device allows at most {max}")]
    TooLarge { label: String, size: u64, max: u64 },

    /// Mapping a readback buffer failed.
    #[error("failed to map buffer for readback: {0}")]
    MapFailed(#[from] wgpu::BufferAsyncError),

    /// The map callback was dropped before it reported a result.
    #[error("readback callback was dropped")]
    MapCallbackDropped,
}

/// Creates GPU buffers after checking them against the device limits.
pub struct BufferAllocator<'a> {
    device: &'a wgpu::Device,
    limits: wgpu::Limits,
}

impl<'a> BufferAllocator<'a> {
    /// Create a new buffer allocator with the given device.
    pub fn new(device: &'a wgpu::Device) -> Self {
        Self {
            device,
            limits: device.limits(),
        }
    }

    /// Create a buffer that compute kernels bind as storage.
    ///
    /// `extra` is OR-ed into `STORAGE | COPY_SRC | COPY_DST`, e.g. `VERTEX` for
    /// buffers that are also drawn from.
    pub fn create_storage_buffer(
        &self,
        label: &str,
        contents: &[u8],
        extra: wgpu::BufferUsages,
    ) -> Result<wgpu::Buffer, BufferError> {
        self.check(label, contents.len() as u64, true)?;
        Ok(self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC
                    | wgpu::BufferUsages::COPY_DST
                    | extra,
            }))
    }

    /// Create a vertex buffer from raw byte data.
    pub fn create_vertex_buffer(
        &self,
        label: &str,
        contents: &[u8],
    ) -> Result<wgpu::Buffer, BufferError> {
        self.check(label, contents.len() as u64, false)?;
        Ok(self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            }))
    }

    /// Create a u32 index buffer.
    pub fn create_index_buffer_u32(
        &self,
        label: &str,
        data: &[u32],
    ) -> Result<wgpu::Buffer, BufferError> {
        let contents: &[u8] = bytemuck::cast_slice(data);
        self.check(label, contents.len() as u64, false)?;
        Ok(self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            }))
    }

    /// Create a small uniform buffer.
    pub fn create_uniform_buffer<T: Pod>(&self, label: &str, value: &T) -> wgpu::Buffer {
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::bytes_of(value),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            })
    }

    fn check(&self, label: &str, size: u64, storage: bool) -> Result<(), BufferError> {
        if size == 0 {
            return Err(BufferError::Empty {
                label: label.to_string(),
            });
        }
        let mut max = self.limits.max_buffer_size;
        if storage {
            max = max.min(self.limits.max_storage_buffer_binding_size as u64);
        }
        if size > max {
            return Err(BufferError::TooLarge {
                label: label.to_string(),
                size,
                max,
            });
        }
        Ok(())
    }
}

/// Copy `buffer` into a staging buffer and read it back as `T`s.
///
/// Blocks until the GPU has finished all work submitted so far. Intended for
/// tests, diagnostics and CPU-side queries, not per-frame use.
pub fn read_buffer<T: Pod>(ctx: &GpuContext, buffer: &wgpu::Buffer) -> Result<Vec<T>, BufferError> {
    let size = buffer.size();
    let staging = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("terra-readback"),
        size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("terra-readback-encoder"),
        });
    encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);
    ctx.queue.submit(Some(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    ctx.wait_idle();

    match rx.recv() {
        Ok(result) => result?,
        Err(_) => return Err(BufferError::MapCallbackDropped),
    }

    let values = {
        let mapped = slice.get_mapped_range();
        bytemuck::cast_slice::<u8, T>(&mapped).to_vec()
    };
    staging.unmap();
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::test_context;

    #[test]
    fn test_empty_storage_buffer_rejected() {
        let Some(ctx) = test_context() else {
            return;
        };
        let allocator = BufferAllocator::new(&ctx.device);
        let result = allocator.create_storage_buffer("empty", &[], wgpu::BufferUsages::empty());
        assert!(matches!(result, Err(BufferError::Empty { .. })));
    }

    #[test]
    fn test_oversized_buffer_rejected_before_allocation() {
        let Some(ctx) = test_context() else {
            return;
        };
        let allocator = BufferAllocator::new(&ctx.device);
        let max = ctx.limits().max_buffer_size;
        // check() runs before any allocation, so the size is never materialized.
        let result = allocator.check("huge", max + 4, false);
        assert!(matches!(result, Err(BufferError::TooLarge { size, .. }) if size == max + 4));
    }

    #[test]
    fn test_storage_roundtrip_through_readback() {
        let Some(ctx) = test_context() else {
            return;
        };
        let allocator = BufferAllocator::new(&ctx.device);
        let data: Vec<[f32; 3]> = vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let buffer = allocator
            .create_storage_buffer(
                "positions",
                bytemuck::cast_slice(&data),
                wgpu::BufferUsages::VERTEX,
            )
            .unwrap();
        assert_eq!(buffer.size(), 24);

        let back: Vec<[f32; 3]> = read_buffer(&ctx, &buffer).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn test_index_buffer_size() {
        let Some(ctx) = test_context() else {
            return;
        };
        let allocator = BufferAllocator::new(&ctx.device);
        let indices: Vec<u32> = (0..6).collect();
        let buffer = allocator.create_index_buffer_u32("indices", &indices).unwrap();
        assert_eq!(buffer.size(), 24);
        assert!(buffer.usage().contains(wgpu::BufferUsages::INDEX));
    }
}

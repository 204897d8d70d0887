/// Buffer - GPU-backed linear memory
///
/// Host-visible buffers (uniforms) stay persistently mapped through
/// gpu-allocator; device-local buffers (vertex/index data) are filled once
/// through a staging buffer and a one-shot transfer.

use ember_3d_engine::ember3d::{Error, Result};
use ember_3d_engine::{engine_bail, engine_err};
use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use slotmap::new_key_type;
use std::sync::Arc;

use crate::vulkan_command_buffer::{begin_single_time_commands, end_single_time_commands};
use crate::vulkan_context::GpuContext;

new_key_type! {
    /// Stable handle into the context's buffer registry
    pub struct BufferKey;
}

/// Creation parameters for a buffer
#[derive(Debug, Clone, Copy)]
pub struct BufferSettings {
    pub size: vk::DeviceSize,
    pub usage: vk::BufferUsageFlags,
    pub location: MemoryLocation,
}

impl BufferSettings {
    /// Host-visible, persistently mapped uniform buffer
    pub fn uniform(size: vk::DeviceSize) -> Self {
        Self {
            size,
            usage: vk::BufferUsageFlags::UNIFORM_BUFFER,
            location: MemoryLocation::CpuToGpu,
        }
    }

    /// Device-local buffer filled through a staging copy
    pub fn staged(size: vk::DeviceSize, usage: vk::BufferUsageFlags) -> Self {
        Self {
            size,
            usage: usage | vk::BufferUsageFlags::TRANSFER_DST,
            location: MemoryLocation::GpuOnly,
        }
    }
}

/// Vulkan buffer with its memory allocation
pub struct Buffer {
    ctx: Arc<GpuContext>,
    pub(crate) buffer: vk::Buffer,
    allocation: Option<Allocation>,
    pub settings: BufferSettings,
}

impl Buffer {
    pub(crate) fn new(ctx: Arc<GpuContext>, settings: BufferSettings) -> Result<Self> {
        let (buffer, allocation) =
            create_buffer(&ctx, settings.size, settings.usage, settings.location, "buffer")?;

        Ok(Self {
            ctx,
            buffer,
            allocation: Some(allocation),
            settings,
        })
    }

    /// Copy bytes into a host-visible buffer through its persistent mapping
    pub fn set_data(&self, data: &[u8]) -> Result<()> {
        if data.len() as vk::DeviceSize > self.settings.size {
            engine_bail!(
                "ember3d::vulkan",
                "Buffer write of {} bytes exceeds buffer size {}",
                data.len(),
                self.settings.size
            );
        }

        let allocation = self
            .allocation
            .as_ref()
            .ok_or_else(|| Error::InvalidResource("Buffer has no allocation".to_string()))?;

        let mapped_ptr = allocation
            .mapped_ptr()
            .ok_or_else(|| {
                engine_err!("ember3d::vulkan", "Buffer is not CPU-accessible")
            })?
            .as_ptr() as *mut u8;

        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped_ptr, data.len());
        }

        Ok(())
    }

    /// Fill a device-local buffer: staging buffer, map, copy, one-shot blit
    pub fn set_staged_data(&self, data: &[u8]) -> Result<()> {
        if data.len() as vk::DeviceSize > self.settings.size {
            engine_bail!(
                "ember3d::vulkan",
                "Staged write of {} bytes exceeds buffer size {}",
                data.len(),
                self.settings.size
            );
        }

        let (staging_buffer, staging_allocation) = create_buffer(
            &self.ctx,
            self.settings.size,
            vk::BufferUsageFlags::TRANSFER_SRC,
            MemoryLocation::CpuToGpu,
            "staging buffer",
        )?;

        let result = (|| -> Result<()> {
            let mapped_ptr = staging_allocation
                .mapped_ptr()
                .ok_or_else(|| {
                    engine_err!("ember3d::vulkan", "Staging buffer is not CPU-accessible")
                })?
                .as_ptr() as *mut u8;

            unsafe {
                std::ptr::copy_nonoverlapping(data.as_ptr(), mapped_ptr, data.len());
            }

            self.copy_from(staging_buffer, data.len() as vk::DeviceSize)
        })();

        unsafe {
            self.ctx.device.destroy_buffer(staging_buffer, None);
        }
        if let Ok(mut allocator) = self.ctx.allocator.lock() {
            allocator.free(staging_allocation).ok();
        }

        result
    }

    fn copy_from(&self, src: vk::Buffer, size: vk::DeviceSize) -> Result<()> {
        let pool = *self
            .ctx
            .upload_command_pool
            .lock()
            .map_err(|_| Error::BackendError("Upload command pool lock poisoned".to_string()))?;

        let command_buffer = begin_single_time_commands(&self.ctx.device, pool)?;

        let copy_region = vk::BufferCopy::default().size(size);
        unsafe {
            self.ctx
                .device
                .cmd_copy_buffer(command_buffer, src, self.buffer, &[copy_region]);
        }

        end_single_time_commands(
            &self.ctx.device,
            pool,
            command_buffer,
            self.ctx.graphics_queue,
        )
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            if let Some(allocation) = self.allocation.take() {
                // Don't panic if the lock fails - the buffer still has to go
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }
            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}

/// Create a raw buffer + allocation pair
fn create_buffer(
    ctx: &GpuContext,
    size: vk::DeviceSize,
    usage: vk::BufferUsageFlags,
    location: MemoryLocation,
    name: &str,
) -> Result<(vk::Buffer, Allocation)> {
    let create_info = vk::BufferCreateInfo::default()
        .size(size)
        .usage(usage)
        .sharing_mode(vk::SharingMode::EXCLUSIVE);

    let buffer = unsafe { ctx.device.create_buffer(&create_info, None) }
        .map_err(|e| engine_err!("ember3d::vulkan", "Failed to create buffer: {:?}", e))?;

    let requirements = unsafe { ctx.device.get_buffer_memory_requirements(buffer) };

    let allocation = ctx
        .allocator
        .lock()
        .map_err(|_| Error::BackendError("Allocator lock poisoned".to_string()))?
        .allocate(&AllocationCreateDesc {
            name,
            requirements,
            location,
            linear: true,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        })
        .map_err(|e| {
            unsafe { ctx.device.destroy_buffer(buffer, None) };
            engine_err!("ember3d::vulkan", "Failed to allocate buffer memory: {:?}", e)
        })?;

    let bind_result = unsafe {
        ctx.device
            .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
    };
    if let Err(e) = bind_result {
        if let Ok(mut allocator) = ctx.allocator.lock() {
            allocator.free(allocation).ok();
        }
        unsafe { ctx.device.destroy_buffer(buffer, None) };
        return Err(engine_err!(
            "ember3d::vulkan",
            "Failed to bind buffer memory: {:?}",
            e
        ));
    }

    Ok((buffer, allocation))
}

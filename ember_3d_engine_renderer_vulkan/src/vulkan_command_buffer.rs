/// Command buffers - per-frame primary buffers and one-shot transfer helpers

use ember_3d_engine::ember3d::{Error, Result};
use ember_3d_engine::engine_err;
use ash::vk;

use crate::vulkan_frame::MAX_FRAMES_IN_FLIGHT;

/// One primary command buffer per frame-in-flight slot
///
/// The buffers are allocated from the context's frame command pool (created
/// with RESET_COMMAND_BUFFER) and freed together with that pool.
pub struct FrameCommandBuffers {
    pub(crate) command_buffers: Vec<vk::CommandBuffer>,
}

impl FrameCommandBuffers {
    pub(crate) fn new(device: &ash::Device, command_pool: vk::CommandPool) -> Result<Self> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(MAX_FRAMES_IN_FLIGHT as u32);

        let command_buffers =
            unsafe { device.allocate_command_buffers(&alloc_info) }.map_err(|e| {
                Error::InitializationFailed(format!("Failed to allocate command buffers: {:?}", e))
            })?;

        Ok(Self { command_buffers })
    }

    pub(crate) fn get(&self, frame: usize) -> vk::CommandBuffer {
        self.command_buffers[frame]
    }
}

/// Begin a throwaway command buffer for a transfer/transition operation
pub(crate) fn begin_single_time_commands(
    device: &ash::Device,
    command_pool: vk::CommandPool,
) -> Result<vk::CommandBuffer> {
    let alloc_info = vk::CommandBufferAllocateInfo::default()
        .command_pool(command_pool)
        .level(vk::CommandBufferLevel::PRIMARY)
        .command_buffer_count(1);

    let command_buffer = unsafe { device.allocate_command_buffers(&alloc_info) }
        .map_err(|e| {
            engine_err!(
                "ember3d::vulkan",
                "Failed to allocate one-shot command buffer: {:?}",
                e
            )
        })?
        .remove(0);

    let begin_info =
        vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

    unsafe { device.begin_command_buffer(command_buffer, &begin_info) }.map_err(|e| {
        engine_err!(
            "ember3d::vulkan",
            "Failed to begin one-shot command buffer: {:?}",
            e
        )
    })?;

    Ok(command_buffer)
}

/// Submit the one-shot buffer, wait for the queue and free it
pub(crate) fn end_single_time_commands(
    device: &ash::Device,
    command_pool: vk::CommandPool,
    command_buffer: vk::CommandBuffer,
    queue: vk::Queue,
) -> Result<()> {
    unsafe {
        device.end_command_buffer(command_buffer).map_err(|e| {
            engine_err!(
                "ember3d::vulkan",
                "Failed to end one-shot command buffer: {:?}",
                e
            )
        })?;

        let command_buffers = [command_buffer];
        let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);

        device
            .queue_submit(queue, &[submit_info], vk::Fence::null())
            .map_err(|e| {
                engine_err!("ember3d::vulkan", "Failed to submit one-shot commands: {:?}", e)
            })?;
        device.queue_wait_idle(queue).map_err(|e| {
            engine_err!("ember3d::vulkan", "Failed to wait for transfer queue: {:?}", e)
        })?;

        device.free_command_buffers(command_pool, &command_buffers);
    }

    Ok(())
}

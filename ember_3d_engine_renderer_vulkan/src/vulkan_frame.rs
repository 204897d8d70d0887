/// Frame loop primitives - sync objects, frame cursor, recording context
///
/// Each frame-in-flight slot owns a fence (CPU back-pressure), an
/// image-available semaphore and a render-finished semaphore (GPU-to-GPU
/// ordering). The `RecordContext` is the explicit interface handed to the
/// draw callback: it carries the active pipeline and descriptor-pool
/// indices instead of global mutable render state, and guards command
/// ordering (recording, inside-render-pass) so misuse fails with an error
/// instead of undefined behavior on the GPU.

use ember_3d_engine::ember3d::{Error, Result};
use ember_3d_engine::engine_error;
use ash::vk;
use slotmap::SlotMap;

use crate::vulkan_buffer::{Buffer, BufferKey};
use crate::vulkan_descriptor_pool::DescriptorPool;
use crate::vulkan_pipeline::GraphicsPipeline;
use crate::vulkan_render_pass::RenderPass;

/// Number of frames allowed to be mid-execution on the GPU simultaneously
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Per-slot synchronization primitives
pub(crate) struct FrameSync {
    device: ash::Device,
    pub image_available: Vec<vk::Semaphore>,
    pub render_finished: Vec<vk::Semaphore>,
    pub in_flight: Vec<vk::Fence>,
}

impl FrameSync {
    pub(crate) fn new(device: &ash::Device) -> Result<Self> {
        let semaphore_info = vk::SemaphoreCreateInfo::default();
        // Fences start signaled so the first wait on each slot passes
        let fence_info = vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);

        let mut sync = Self {
            device: device.clone(),
            image_available: Vec::with_capacity(MAX_FRAMES_IN_FLIGHT),
            render_finished: Vec::with_capacity(MAX_FRAMES_IN_FLIGHT),
            in_flight: Vec::with_capacity(MAX_FRAMES_IN_FLIGHT),
        };

        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            unsafe {
                sync.image_available.push(
                    device.create_semaphore(&semaphore_info, None).map_err(|e| {
                        engine_error!("ember3d::vulkan", "Failed to create semaphore: {:?}", e);
                        Error::InitializationFailed(format!("Failed to create semaphore: {:?}", e))
                    })?,
                );
                sync.render_finished.push(
                    device.create_semaphore(&semaphore_info, None).map_err(|e| {
                        engine_error!("ember3d::vulkan", "Failed to create semaphore: {:?}", e);
                        Error::InitializationFailed(format!("Failed to create semaphore: {:?}", e))
                    })?,
                );
                sync.in_flight.push(
                    device.create_fence(&fence_info, None).map_err(|e| {
                        engine_error!("ember3d::vulkan", "Failed to create fence: {:?}", e);
                        Error::InitializationFailed(format!("Failed to create fence: {:?}", e))
                    })?,
                );
            }
        }

        Ok(sync)
    }
}

impl Drop for FrameSync {
    fn drop(&mut self) {
        unsafe {
            for &semaphore in self
                .image_available
                .iter()
                .chain(self.render_finished.iter())
            {
                self.device.destroy_semaphore(semaphore, None);
            }
            for &fence in &self.in_flight {
                self.device.destroy_fence(fence, None);
            }
        }
    }
}

/// Strictly cycling frame-in-flight index
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCursor {
    current: usize,
}

impl FrameCursor {
    pub fn current(&self) -> usize {
        self.current
    }

    /// Post-increment modulo MAX_FRAMES_IN_FLIGHT; returns the new slot
    pub fn advance(&mut self) -> usize {
        self.current = (self.current + 1) % MAX_FRAMES_IN_FLIGHT;
        self.current
    }
}

/// What one call to the frame driver did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Frame recorded, submitted and presented (the swap chain may have
    /// been recreated after presenting)
    Rendered,
    /// Acquisition reported out-of-date; the swap chain was recreated and
    /// the frame skipped without submission
    SkippedOutOfDate,
    /// Zero-area framebuffer (minimized window); nothing was acquired
    SkippedMinimized,
}

/// Explicit per-recording state handed to the draw callback
///
/// Everything the callback may touch travels through this context: the
/// command buffer, the frame slot, the acquired image index and the
/// resource registries. The active pipeline index replaces any global
/// "current pipeline" pointer.
pub struct RecordContext<'a> {
    pub(crate) device: &'a ash::Device,
    pub(crate) command_buffer: vk::CommandBuffer,
    pub(crate) frame: usize,
    pub(crate) image_index: u32,
    pub(crate) extent: vk::Extent2D,
    pub(crate) render_passes: &'a [RenderPass],
    pub(crate) pipelines: &'a [GraphicsPipeline],
    pub(crate) descriptor_pools: &'a [DescriptorPool],
    pub(crate) buffers: &'a SlotMap<BufferKey, Buffer>,
    pub(crate) active_pipeline: Option<usize>,
    pub(crate) in_render_pass: bool,
}

impl<'a> RecordContext<'a> {
    /// Frame-in-flight slot being recorded
    pub fn frame(&self) -> usize {
        self.frame
    }

    /// Swap-chain image index acquired for this frame
    pub fn image_index(&self) -> u32 {
        self.image_index
    }

    /// Current swap-chain extent
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Write bytes into a host-visible buffer for this frame
    ///
    /// Safe against in-flight overwrites because the slot's fence wait
    /// completed before recording started.
    pub fn write_buffer(&self, key: BufferKey, data: &[u8]) -> Result<()> {
        let buffer = self
            .buffers
            .get(key)
            .ok_or_else(|| Error::InvalidResource("Unknown buffer key".to_string()))?;
        buffer.set_data(data)
    }

    /// Begin a render pass on one of its framebuffers
    ///
    /// Sets viewport and scissor to the framebuffer's dimensions (dynamic
    /// state is always enabled), so non-resizeable passes rasterize at
    /// their fixed size without caller bookkeeping.
    pub fn begin_render_pass(
        &mut self,
        pass_index: usize,
        framebuffer_index: usize,
        clear_values: &[vk::ClearValue],
    ) -> Result<()> {
        if self.in_render_pass {
            return Err(Error::BackendError(
                "Already inside a render pass".to_string(),
            ));
        }

        let pass = self
            .render_passes
            .get(pass_index)
            .ok_or_else(|| Error::InvalidResource(format!("No render pass {}", pass_index)))?;
        let framebuffer = pass.framebuffers.get(framebuffer_index).ok_or_else(|| {
            Error::InvalidResource(format!(
                "Render pass {} has no framebuffer {}",
                pass_index, framebuffer_index
            ))
        })?;

        let render_area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: vk::Extent2D {
                width: framebuffer.width,
                height: framebuffer.height,
            },
        };

        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(pass.render_pass)
            .framebuffer(framebuffer.framebuffer)
            .render_area(render_area)
            .clear_values(clear_values);

        unsafe {
            self.device.cmd_begin_render_pass(
                self.command_buffer,
                &begin_info,
                vk::SubpassContents::INLINE,
            );
        }
        self.in_render_pass = true;

        self.set_viewport(vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: framebuffer.width as f32,
            height: framebuffer.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        });
        self.set_scissor(render_area);

        Ok(())
    }

    /// Move to the next subpass of a multi-subpass render pass
    pub fn next_subpass(&mut self) -> Result<()> {
        if !self.in_render_pass {
            return Err(Error::BackendError("Not inside a render pass".to_string()));
        }
        unsafe {
            self.device
                .cmd_next_subpass(self.command_buffer, vk::SubpassContents::INLINE);
        }
        Ok(())
    }

    pub fn end_render_pass(&mut self) -> Result<()> {
        if !self.in_render_pass {
            return Err(Error::BackendError("Not inside a render pass".to_string()));
        }
        unsafe {
            self.device.cmd_end_render_pass(self.command_buffer);
        }
        self.in_render_pass = false;
        Ok(())
    }

    /// Bind a graphics pipeline by registry index
    pub fn bind_pipeline(&mut self, pipeline_index: usize) -> Result<()> {
        let pipeline = self
            .pipelines
            .get(pipeline_index)
            .ok_or_else(|| Error::InvalidResource(format!("No pipeline {}", pipeline_index)))?;

        unsafe {
            self.device.cmd_bind_pipeline(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline.pipeline,
            );
        }
        self.active_pipeline = Some(pipeline_index);
        Ok(())
    }

    /// Bind this frame's descriptor set of the given pool to the active
    /// pipeline's layout
    pub fn bind_descriptor_sets(&mut self, pool_index: usize, first_set: u32) -> Result<()> {
        let pipeline_index = self
            .active_pipeline
            .ok_or_else(|| Error::BackendError("No pipeline bound".to_string()))?;
        let pipeline = &self.pipelines[pipeline_index];
        let pool = self
            .descriptor_pools
            .get(pool_index)
            .ok_or_else(|| Error::InvalidResource(format!("No descriptor pool {}", pool_index)))?;

        let sets = [pool.sets[self.frame]];
        unsafe {
            self.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline.pipeline_layout,
                first_set,
                &sets,
                &[],
            );
        }
        Ok(())
    }

    pub fn bind_vertex_buffer(&mut self, key: BufferKey, offset: vk::DeviceSize) -> Result<()> {
        let buffer = self
            .buffers
            .get(key)
            .ok_or_else(|| Error::InvalidResource("Unknown vertex buffer key".to_string()))?;
        unsafe {
            self.device
                .cmd_bind_vertex_buffers(self.command_buffer, 0, &[buffer.buffer], &[offset]);
        }
        Ok(())
    }

    pub fn bind_index_buffer(
        &mut self,
        key: BufferKey,
        offset: vk::DeviceSize,
        index_type: vk::IndexType,
    ) -> Result<()> {
        let buffer = self
            .buffers
            .get(key)
            .ok_or_else(|| Error::InvalidResource("Unknown index buffer key".to_string()))?;
        unsafe {
            self.device.cmd_bind_index_buffer(
                self.command_buffer,
                buffer.buffer,
                offset,
                index_type,
            );
        }
        Ok(())
    }

    /// Push bytes through the active pipeline's push-constant ranges
    pub fn push_constants(
        &mut self,
        stages: vk::ShaderStageFlags,
        offset: u32,
        data: &[u8],
    ) -> Result<()> {
        let pipeline_index = self
            .active_pipeline
            .ok_or_else(|| Error::BackendError("No pipeline bound".to_string()))?;
        let pipeline = &self.pipelines[pipeline_index];
        unsafe {
            self.device.cmd_push_constants(
                self.command_buffer,
                pipeline.pipeline_layout,
                stages,
                offset,
                data,
            );
        }
        Ok(())
    }

    pub fn set_viewport(&mut self, viewport: vk::Viewport) {
        unsafe {
            self.device
                .cmd_set_viewport(self.command_buffer, 0, &[viewport]);
        }
    }

    pub fn set_scissor(&mut self, scissor: vk::Rect2D) {
        unsafe {
            self.device
                .cmd_set_scissor(self.command_buffer, 0, &[scissor]);
        }
    }

    pub fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) -> Result<()> {
        if !self.in_render_pass {
            return Err(Error::BackendError("Not inside a render pass".to_string()));
        }
        unsafe {
            self.device.cmd_draw(
                self.command_buffer,
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            );
        }
        Ok(())
    }

    pub fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) -> Result<()> {
        if !self.in_render_pass {
            return Err(Error::BackendError("Not inside a render pass".to_string()));
        }
        unsafe {
            self.device.cmd_draw_indexed(
                self.command_buffer,
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            );
        }
        Ok(())
    }
}

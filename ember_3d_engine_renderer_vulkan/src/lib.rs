/*!
# Ember 3D Engine - Vulkan Renderer

Vulkan layer of the Ember 3D rendering scaffold, built on the Ash bindings
and gpu-allocator for memory management.

The central object is [`VulkanContext`]: it selects a device, negotiates a
swap chain, owns every GPU resource through stable-handle registries, and
drives the double-buffered frame loop. Render passes are described
declaratively through [`RenderPassSettings`] before a one-shot compile;
per-frame recording happens through the [`RecordContext`] handed to the
draw callback of [`VulkanContext::draw_frame`].
*/

// Vulkan implementation modules
mod vulkan;
mod vulkan_buffer;
mod vulkan_command_buffer;
mod vulkan_context;
mod vulkan_descriptor_pool;
mod vulkan_device;
mod vulkan_frame;
mod vulkan_image;
mod vulkan_pipeline;
mod vulkan_render_pass;
mod vulkan_swapchain;
mod vulkan_vertex;

#[cfg(feature = "vulkan-validation")]
mod vulkan_debug;

#[cfg(test)]
mod vulkan_descriptor_pool_tests;
#[cfg(test)]
mod vulkan_device_tests;
#[cfg(test)]
mod vulkan_frame_tests;
#[cfg(test)]
mod vulkan_pipeline_tests;
#[cfg(test)]
mod vulkan_render_pass_tests;
#[cfg(test)]
mod vulkan_swapchain_tests;

pub use vulkan::{OffscreenExtent, VulkanContext};
pub use vulkan_buffer::{Buffer, BufferKey, BufferSettings};
pub use vulkan_descriptor_pool::{DescriptorBinding, DescriptorPool, DescriptorResource};
pub use vulkan_device::PhysicalDeviceInfo;
pub use vulkan_frame::{FrameOutcome, RecordContext, MAX_FRAMES_IN_FLIGHT};
pub use vulkan_image::{
    find_depth_format, find_supported_format, Image, ImageKey, ImageSettings, SamplerSettings,
};
pub use vulkan_pipeline::{GraphicsPipeline, PipelineSettings, PipelineShaderPaths};
pub use vulkan_render_pass::{
    FramebufferAttachment, RenderPass, RenderPassSettings, SubpassSettings,
};
pub use vulkan_swapchain::{SwapChain, SwapChainSupport};
pub use vulkan_vertex::Vertex;

// Re-export the Vulkan types that appear in this crate's public API so
// applications do not need their own ash dependency pinned to our version.
pub use ash::vk;

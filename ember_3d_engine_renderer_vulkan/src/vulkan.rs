/// VulkanContext - instance/device bootstrap, resource registries, frame loop
///
/// Central object of the Vulkan layer. Construction walks the classic
/// bootstrap chain (instance, surface, scored device pick, logical device,
/// allocator, swap chain, sync objects); afterwards the context owns every
/// GPU resource through registries and drives the double-buffered frame
/// loop, including the swap-chain recreation protocol.

use ember_3d_engine::ember3d::{Error, Result};
use ember_3d_engine::{engine_bail, engine_err, engine_error, engine_info};
use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use slotmap::SlotMap;
use std::ffi::CString;
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex};

use crate::vulkan_buffer::{Buffer, BufferKey, BufferSettings};
use crate::vulkan_command_buffer::FrameCommandBuffers;
use crate::vulkan_context::GpuContext;
use crate::vulkan_descriptor_pool::{DescriptorBinding, DescriptorPool};
use crate::vulkan_device::{
    pick_physical_device, LogicalDevice, PhysicalDeviceInfo, QueueFamilyIndices,
};
use crate::vulkan_frame::{FrameCursor, FrameOutcome, FrameSync, RecordContext};
use crate::vulkan_image::{Image, ImageKey, ImageSettings, SamplerSettings};
use crate::vulkan_pipeline::{GraphicsPipeline, PipelineSettings, PipelineShaderPaths};
use crate::vulkan_render_pass::{FramebufferAttachment, RenderPass, RenderPassSettings};
use crate::vulkan_swapchain::{SwapChain, SwapChainSupport};

#[cfg(feature = "vulkan-validation")]
use crate::vulkan_debug::{check_validation_layer_support, DebugMessenger, VALIDATION_LAYER};

/// Sizing policy for an offscreen buffer across swap-chain recreation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffscreenExtent {
    /// Track the swap-chain extent (G-buffers, depth buffers)
    SwapChain,
    /// Keep this size forever (shadow maps)
    Fixed { width: u32, height: u32 },
}

impl OffscreenExtent {
    fn resolve(&self, swap_extent: vk::Extent2D) -> vk::Extent2D {
        match *self {
            OffscreenExtent::SwapChain => swap_extent,
            OffscreenExtent::Fixed { width, height } => vk::Extent2D { width, height },
        }
    }
}

/// Registry record for an auto-recreated offscreen buffer
#[derive(Clone, Copy)]
struct OffscreenBuffer {
    key: ImageKey,
    extent: OffscreenExtent,
    sampler: Option<SamplerSettings>,
}

/// Owner of the instance, device, surface and allocator
///
/// Declared as the LAST field of `VulkanContext` so it drops after every
/// resource wrapper: its Drop tears down allocator -> device -> debug
/// messenger -> surface -> instance, in that order.
struct ContextCore {
    gpu: Arc<GpuContext>,
    logical: LogicalDevice,
    present_queue: vk::Queue,
    surface: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,
    physical_device: vk::PhysicalDevice,
    instance: ash::Instance,
    #[cfg(feature = "vulkan-validation")]
    debug_messenger: Option<DebugMessenger>,
    _entry: ash::Entry,
}

impl Drop for ContextCore {
    fn drop(&mut self) {
        unsafe {
            if let Ok(pool) = self.gpu.upload_command_pool.lock() {
                self.gpu.device.destroy_command_pool(*pool, None);
            }

            // All resource Arcs are gone by now; the allocator must drop
            // before the device it allocates from.
            if let Some(gpu) = Arc::get_mut(&mut self.gpu) {
                ManuallyDrop::drop(&mut gpu.allocator);
            }

            self.gpu.device.destroy_device(None);

            #[cfg(feature = "vulkan-validation")]
            if let Some(debug) = self.debug_messenger.take() {
                debug.destroy();
            }

            self.surface_loader.destroy_surface(self.surface, None);
            self.instance.destroy_instance(None);
        }
    }
}

/// The Vulkan rendering context
///
/// Field order is teardown order: resource registries first, sync and swap
/// chain next, `core` (device/instance owner) last.
pub struct VulkanContext {
    buffers: SlotMap<BufferKey, Buffer>,
    images: SlotMap<ImageKey, Image>,
    color_buffers: Vec<OffscreenBuffer>,
    depth_buffers: Vec<OffscreenBuffer>,
    descriptor_pools: Vec<DescriptorPool>,
    descriptor_set_layouts: Vec<vk::DescriptorSetLayout>,
    graphics_pipelines: Vec<GraphicsPipeline>,
    render_passes: Vec<RenderPass>,
    command_buffers: FrameCommandBuffers,
    frame_command_pool: vk::CommandPool,
    sync: FrameSync,
    cursor: FrameCursor,
    swap_chain: SwapChain,
    framebuffer_size: vk::Extent2D,
    framebuffer_resized: bool,
    device_info: PhysicalDeviceInfo,
    core: ContextCore,
}

impl VulkanContext {
    /// Bootstrap the full Vulkan stack against a window
    ///
    /// `width`/`height` is the window's framebuffer pixel size, used for
    /// swap-chain extent negotiation when the surface does not fix it.
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(
        window: &W,
        app_name: &str,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let entry = unsafe { ash::Entry::load() }.map_err(|e| {
            engine_error!("ember3d::vulkan", "Failed to load Vulkan library: {:?}", e);
            Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
        })?;

        #[cfg(feature = "vulkan-validation")]
        if !check_validation_layer_support(&entry) {
            engine_error!("ember3d::vulkan", "Validation layers requested, but not available");
            return Err(Error::InitializationFailed(
                "Validation layers not available".to_string(),
            ));
        }

        let app_name_c = CString::new(app_name).map_err(|_| {
            Error::InitializationFailed("Application name contains a NUL byte".to_string())
        })?;

        let app_info = vk::ApplicationInfo::default()
            .application_name(app_name_c.as_c_str())
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(c"Ember3D")
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_3);

        let display_handle = window.display_handle().map_err(|e| {
            engine_error!("ember3d::vulkan", "Failed to get display handle: {}", e);
            Error::InitializationFailed(format!("Failed to get display handle: {}", e))
        })?;
        let window_handle = window.window_handle().map_err(|e| {
            engine_error!("ember3d::vulkan", "Failed to get window handle: {}", e);
            Error::InitializationFailed(format!("Failed to get window handle: {}", e))
        })?;

        #[allow(unused_mut)]
        let mut extension_names =
            ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| {
                    engine_error!(
                        "ember3d::vulkan",
                        "Failed to get required instance extensions: {}",
                        e
                    );
                    Error::InitializationFailed(format!(
                        "Failed to get required extensions: {}",
                        e
                    ))
                })?
                .to_vec();

        #[cfg(feature = "vulkan-validation")]
        extension_names.push(ash::ext::debug_utils::NAME.as_ptr());

        #[cfg(feature = "vulkan-validation")]
        let layer_names = vec![VALIDATION_LAYER.as_ptr()];
        #[cfg(not(feature = "vulkan-validation"))]
        let layer_names: Vec<*const std::ffi::c_char> = Vec::new();

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&layer_names)
            .enabled_extension_names(&extension_names);

        let instance = unsafe { entry.create_instance(&create_info, None) }.map_err(|e| {
            engine_error!("ember3d::vulkan", "Failed to create Vulkan instance: {:?}", e);
            Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
        })?;

        #[cfg(feature = "vulkan-validation")]
        let debug_messenger = Some(DebugMessenger::new(&entry, &instance)?);

        let surface = unsafe {
            ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
        }
        .map_err(|e| {
            engine_error!("ember3d::vulkan", "Failed to create window surface: {:?}", e);
            Error::InitializationFailed(format!("Failed to create surface: {:?}", e))
        })?;

        let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

        let (physical_device, device_info) =
            pick_physical_device(&instance, surface, &surface_loader)?;

        let indices =
            QueueFamilyIndices::new(&instance, physical_device, surface, &surface_loader);
        let logical = LogicalDevice::new(&instance, physical_device, indices)?;
        let present_queue = logical.present_queue;

        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: instance.clone(),
            device: logical.device.clone(),
            physical_device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        })
        .map_err(|e| {
            engine_error!("ember3d::vulkan", "Failed to create GPU allocator: {:?}", e);
            Error::InitializationFailed(format!("Failed to create allocator: {:?}", e))
        })?;
        let allocator = Arc::new(Mutex::new(allocator));

        let upload_pool_info = vk::CommandPoolCreateInfo::default()
            .flags(
                vk::CommandPoolCreateFlags::TRANSIENT
                    | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
            )
            .queue_family_index(logical.graphics_family);
        let upload_command_pool =
            unsafe { logical.device.create_command_pool(&upload_pool_info, None) }.map_err(
                |e| {
                    engine_error!("ember3d::vulkan", "Failed to create upload command pool: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create command pool: {:?}", e))
                },
            )?;

        let gpu = Arc::new(GpuContext::new(
            logical.device.clone(),
            allocator,
            logical.graphics_queue,
            logical.graphics_family,
            upload_command_pool,
            instance.clone(),
            physical_device,
        ));

        let swap_chain = SwapChain::new(
            &instance,
            &logical,
            physical_device,
            surface,
            &surface_loader,
            width,
            height,
            None,
        )?;

        let frame_pool_info = vk::CommandPoolCreateInfo::default()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(logical.graphics_family);
        let frame_command_pool =
            unsafe { logical.device.create_command_pool(&frame_pool_info, None) }.map_err(|e| {
                engine_error!("ember3d::vulkan", "Failed to create frame command pool: {:?}", e);
                Error::InitializationFailed(format!("Failed to create command pool: {:?}", e))
            })?;

        let command_buffers = FrameCommandBuffers::new(&logical.device, frame_command_pool)?;
        let sync = FrameSync::new(&logical.device)?;

        engine_info!(
            "ember3d::vulkan",
            "Vulkan context ready: {} ({}x{}, {} swap chain images)",
            device_info.name,
            swap_chain.extent.width,
            swap_chain.extent.height,
            swap_chain.image_count()
        );

        Ok(Self {
            buffers: SlotMap::with_key(),
            images: SlotMap::with_key(),
            color_buffers: Vec::new(),
            depth_buffers: Vec::new(),
            descriptor_pools: Vec::new(),
            descriptor_set_layouts: Vec::new(),
            graphics_pipelines: Vec::new(),
            render_passes: Vec::new(),
            command_buffers,
            frame_command_pool,
            sync,
            cursor: FrameCursor::default(),
            swap_chain,
            framebuffer_size: vk::Extent2D { width, height },
            framebuffer_resized: false,
            device_info,
            core: ContextCore {
                gpu,
                logical,
                present_queue,
                surface,
                surface_loader,
                physical_device,
                instance,
                #[cfg(feature = "vulkan-validation")]
                debug_messenger,
                _entry: entry,
            },
        })
    }

    // ===== ACCESSORS =====

    pub fn device_info(&self) -> &PhysicalDeviceInfo {
        &self.device_info
    }

    pub fn swap_chain_extent(&self) -> vk::Extent2D {
        self.swap_chain.extent
    }

    pub fn swap_chain_format(&self) -> vk::Format {
        self.swap_chain.format.format
    }

    pub fn swap_chain_image_count(&self) -> usize {
        self.swap_chain.image_count()
    }

    /// Frame-in-flight slot the next `draw_frame` call will use
    pub fn current_frame(&self) -> usize {
        self.cursor.current()
    }

    pub fn descriptor_set_layout(&self, index: usize) -> Option<vk::DescriptorSetLayout> {
        self.descriptor_set_layouts.get(index).copied()
    }

    pub fn image(&self, key: ImageKey) -> Option<&Image> {
        self.images.get(key)
    }

    pub fn buffer(&self, key: BufferKey) -> Option<&Buffer> {
        self.buffers.get(key)
    }

    /// Record a window resize; consumed at the next present
    pub fn handle_resize(&mut self, width: u32, height: u32) {
        self.framebuffer_size = vk::Extent2D { width, height };
        self.framebuffer_resized = true;
    }

    /// Block until the device finished all submitted work
    pub fn wait_idle(&self) -> Result<()> {
        unsafe { self.core.gpu.device.device_wait_idle() }
            .map_err(|e| engine_err!("ember3d::vulkan", "Failed to wait for device idle: {:?}", e))
    }

    // ===== RESOURCE CREATION =====

    /// Compile a render pass from its settings; returns its index
    pub fn add_render_pass(
        &mut self,
        settings: &RenderPassSettings,
        resizeable: bool,
    ) -> Result<usize> {
        let pass = RenderPass::new(settings, &self.core.gpu.device, resizeable)?;
        self.render_passes.push(pass);
        Ok(self.render_passes.len() - 1)
    }

    /// Add a framebuffer to a render pass, resolving attachments now
    pub fn add_framebuffer(
        &mut self,
        pass_index: usize,
        width: u32,
        height: u32,
        attachments: Vec<FramebufferAttachment>,
    ) -> Result<()> {
        let pass = self
            .render_passes
            .get_mut(pass_index)
            .ok_or_else(|| Error::InvalidResource(format!("No render pass {}", pass_index)))?;
        pass.add_framebuffer(width, height, attachments, &self.images, &self.swap_chain)
    }

    /// Destroy and rebuild one framebuffer (honors the non-resizeable flag)
    pub fn recreate_framebuffer(
        &mut self,
        pass_index: usize,
        framebuffer_index: usize,
        width: u32,
        height: u32,
    ) -> Result<()> {
        let pass = self
            .render_passes
            .get_mut(pass_index)
            .ok_or_else(|| Error::InvalidResource(format!("No render pass {}", pass_index)))?;
        pass.recreate_framebuffer(
            framebuffer_index,
            width,
            height,
            &self.images,
            &self.swap_chain,
        )
    }

    /// Create a descriptor-set layout and its pool; returns their shared index
    pub fn add_descriptor_set_layout(
        &mut self,
        bindings: &[vk::DescriptorSetLayoutBinding],
    ) -> Result<usize> {
        let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(bindings);
        let layout = unsafe {
            self.core
                .gpu
                .device
                .create_descriptor_set_layout(&create_info, None)
        }
        .map_err(|e| {
            engine_error!("ember3d::vulkan", "Failed to create descriptor set layout: {:?}", e);
            Error::InitializationFailed(format!(
                "Failed to create descriptor set layout: {:?}",
                e
            ))
        })?;

        let types: Vec<vk::DescriptorType> = bindings.iter().map(|b| b.descriptor_type).collect();
        let pool = match DescriptorPool::new(&self.core.gpu.device, layout, &types) {
            Ok(pool) => pool,
            Err(e) => {
                unsafe {
                    self.core
                        .gpu
                        .device
                        .destroy_descriptor_set_layout(layout, None)
                };
                return Err(e);
            }
        };

        self.descriptor_set_layouts.push(layout);
        self.descriptor_pools.push(pool);
        Ok(self.descriptor_set_layouts.len() - 1)
    }

    /// Bind a declarative resource list into the pool's per-frame sets
    pub fn configure_descriptors(
        &mut self,
        pool_index: usize,
        bindings: Vec<DescriptorBinding>,
    ) -> Result<()> {
        let pool = self
            .descriptor_pools
            .get_mut(pool_index)
            .ok_or_else(|| Error::InvalidResource(format!("No descriptor pool {}", pool_index)))?;
        pool.configure_descriptors(bindings, &self.images, &self.buffers)
    }

    /// Compile a graphics pipeline; returns its index
    pub fn add_pipeline(
        &mut self,
        shaders: &PipelineShaderPaths,
        settings: &PipelineSettings,
    ) -> Result<usize> {
        let render_pass = self
            .render_passes
            .get(settings.render_pass)
            .ok_or_else(|| {
                Error::InvalidResource(format!("No render pass {}", settings.render_pass))
            })?
            .render_pass;

        let pipeline =
            GraphicsPipeline::new(&self.core.gpu.device, shaders, settings, render_pass)?;
        self.graphics_pipelines.push(pipeline);
        Ok(self.graphics_pipelines.len() - 1)
    }

    /// Create a buffer; returns its stable registry key
    pub fn add_buffer(&mut self, settings: BufferSettings) -> Result<BufferKey> {
        let buffer = Buffer::new(self.core.gpu.clone(), settings)?;
        Ok(self.buffers.insert(buffer))
    }

    /// Write bytes into a host-visible buffer
    pub fn write_buffer(&self, key: BufferKey, data: &[u8]) -> Result<()> {
        self.buffers
            .get(key)
            .ok_or_else(|| Error::InvalidResource("Unknown buffer key".to_string()))?
            .set_data(data)
    }

    /// Upload bytes into a device-local buffer through a staging copy
    pub fn write_buffer_staged(&self, key: BufferKey, data: &[u8]) -> Result<()> {
        self.buffers
            .get(key)
            .ok_or_else(|| Error::InvalidResource("Unknown buffer key".to_string()))?
            .set_staged_data(data)
    }

    /// Create a sampled texture from decoded RGBA8 pixels
    pub fn add_texture(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        settings: ImageSettings,
        sampler_settings: SamplerSettings,
    ) -> Result<ImageKey> {
        let image = Image::new_texture(
            self.core.gpu.clone(),
            pixels,
            width,
            height,
            settings,
            sampler_settings,
        )?;
        Ok(self.images.insert(image))
    }

    /// Create an offscreen color buffer, transitioned for sampling
    ///
    /// The buffer is re-created automatically on swap-chain recreation,
    /// at the new swap extent or its fixed size depending on `extent`.
    pub fn add_color_buffer(
        &mut self,
        settings: ImageSettings,
        extent: OffscreenExtent,
        sampler: Option<SamplerSettings>,
    ) -> Result<ImageKey> {
        let target = extent.resolve(self.swap_chain.extent);
        let mut image = Image::new_color_buffer(self.core.gpu.clone(), settings, target, sampler)?;
        image.transition_image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)?;

        let key = self.images.insert(image);
        self.color_buffers.push(OffscreenBuffer {
            key,
            extent,
            sampler,
        });
        Ok(key)
    }

    /// Create an offscreen depth buffer using the adapter's depth format
    pub fn add_depth_buffer(
        &mut self,
        mut settings: ImageSettings,
        extent: OffscreenExtent,
    ) -> Result<ImageKey> {
        settings.format = self.device_info.depth_format;

        let target = extent.resolve(self.swap_chain.extent);
        let image = Image::new_depth_buffer(self.core.gpu.clone(), settings, target)?;

        let key = self.images.insert(image);
        self.depth_buffers.push(OffscreenBuffer {
            key,
            extent,
            sampler: None,
        });
        Ok(key)
    }

    // ===== FRAME LOOP =====

    /// Drive one frame: fence wait, acquire, record, submit, present
    ///
    /// The injected callback records all render passes for this frame
    /// through the `RecordContext`. A callback error skips submission
    /// entirely and propagates. Out-of-date acquisition recreates the swap
    /// chain and skips the frame; out-of-date/suboptimal presentation (or a
    /// pending resize) recreates after presenting.
    pub fn draw_frame<F>(&mut self, mut record: F) -> Result<FrameOutcome>
    where
        F: FnMut(&mut RecordContext) -> Result<()>,
    {
        if self.framebuffer_size.width == 0 || self.framebuffer_size.height == 0 {
            return Ok(FrameOutcome::SkippedMinimized);
        }

        let frame = self.cursor.current();
        let fence = self.sync.in_flight[frame];
        let device = &self.core.gpu.device;

        unsafe { device.wait_for_fences(&[fence], true, u64::MAX) }.map_err(|e| {
            engine_err!("ember3d::vulkan", "Failed to wait for in-flight fence: {:?}", e)
        })?;

        let acquire_result = unsafe {
            self.swap_chain.loader.acquire_next_image(
                self.swap_chain.swap_chain,
                u64::MAX,
                self.sync.image_available[frame],
                vk::Fence::null(),
            )
        };

        let image_index = match acquire_result {
            Ok((index, _suboptimal)) => index,
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                self.recreate_swap_chain()?;
                return Ok(FrameOutcome::SkippedOutOfDate);
            }
            Err(e) => {
                engine_bail!("ember3d::vulkan", "Failed to acquire swap chain image: {:?}", e);
            }
        };

        unsafe { device.reset_fences(&[fence]) }
            .map_err(|e| engine_err!("ember3d::vulkan", "Failed to reset fence: {:?}", e))?;

        let command_buffer = self.command_buffers.get(frame);
        unsafe { device.reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty()) }
            .map_err(|e| {
                engine_err!("ember3d::vulkan", "Failed to reset command buffer: {:?}", e)
            })?;

        let begin_info = vk::CommandBufferBeginInfo::default();
        unsafe { device.begin_command_buffer(command_buffer, &begin_info) }.map_err(|e| {
            engine_err!("ember3d::vulkan", "Failed to begin command buffer: {:?}", e)
        })?;

        let mut record_ctx = RecordContext {
            device,
            command_buffer,
            frame,
            image_index,
            extent: self.swap_chain.extent,
            render_passes: &self.render_passes,
            pipelines: &self.graphics_pipelines,
            descriptor_pools: &self.descriptor_pools,
            buffers: &self.buffers,
            active_pipeline: None,
            in_render_pass: false,
        };

        // A failing draw callback aborts this frame before submission
        record(&mut record_ctx)?;
        drop(record_ctx);

        unsafe { device.end_command_buffer(command_buffer) }
            .map_err(|e| engine_err!("ember3d::vulkan", "Failed to end command buffer: {:?}", e))?;

        let wait_semaphores = [self.sync.image_available[frame]];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [command_buffer];
        let signal_semaphores = [self.sync.render_finished[frame]];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            device.queue_submit(self.core.gpu.graphics_queue, &[submit_info], fence)
        }
        .map_err(|e| {
            engine_err!("ember3d::vulkan", "Failed to submit draw command buffer: {:?}", e)
        })?;

        let swapchains = [self.swap_chain.swap_chain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&signal_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let present_result = unsafe {
            self.swap_chain
                .loader
                .queue_present(self.core.present_queue, &present_info)
        };

        let needs_recreate = match present_result {
            Ok(suboptimal) => suboptimal || self.framebuffer_resized,
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => true,
            Err(e) => {
                engine_bail!("ember3d::vulkan", "Failed to present swap chain image: {:?}", e);
            }
        };

        if needs_recreate {
            self.framebuffer_resized = false;
            self.recreate_swap_chain()?;
        }

        self.cursor.advance();

        Ok(FrameOutcome::Rendered)
    }

    /// Swap-chain recreation protocol
    ///
    /// Strict order: framebuffer handles and offscreen buffers are torn
    /// down before the swap chain is replaced (live view handles must never
    /// outlast their images), then everything is rebuilt and every
    /// descriptor pool replays its configuration against the new views.
    pub fn recreate_swap_chain(&mut self) -> Result<()> {
        unsafe { self.core.gpu.device.device_wait_idle() }.map_err(|e| {
            engine_err!("ember3d::vulkan", "Failed to wait idle before recreation: {:?}", e)
        })?;

        // 1. framebuffers referencing the old views go first
        for pass in &mut self.render_passes {
            pass.release_framebuffers();
        }

        // 2. the new extent is known before the swap chain is touched
        let support = SwapChainSupport::query(
            self.core.physical_device,
            self.core.surface,
            &self.core.surface_loader,
        )?;
        let new_extent =
            support.choose_extent(self.framebuffer_size.width, self.framebuffer_size.height);

        // 3. offscreen buffers are rebuilt in place; their registry keys
        // stay stable so framebuffer attachment lists and descriptor
        // configurations keep resolving
        let color_records = self.color_buffers.clone();
        for record in color_records {
            let settings = self.images[record.key].settings;
            let target = record.extent.resolve(new_extent);
            let mut image =
                Image::new_color_buffer(self.core.gpu.clone(), settings, target, record.sampler)?;
            image.transition_image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)?;
            self.images[record.key] = image;
        }

        let depth_records = self.depth_buffers.clone();
        for record in depth_records {
            let settings = self.images[record.key].settings;
            let target = record.extent.resolve(new_extent);
            let image = Image::new_depth_buffer(self.core.gpu.clone(), settings, target)?;
            self.images[record.key] = image;
        }

        // 4. swap chain rebuild, retiring the old handle through old_swapchain
        let new_chain = SwapChain::new(
            &self.core.instance,
            &self.core.logical,
            self.core.physical_device,
            self.core.surface,
            &self.core.surface_loader,
            self.framebuffer_size.width,
            self.framebuffer_size.height,
            Some(self.swap_chain.swap_chain),
        )?;
        let old_chain = std::mem::replace(&mut self.swap_chain, new_chain);
        drop(old_chain);

        // 5. framebuffers re-resolve their attachment views
        let extent = self.swap_chain.extent;
        for pass in &mut self.render_passes {
            pass.rebuild_framebuffers(extent.width, extent.height, &self.images, &self.swap_chain)?;
        }

        // 6. descriptor pools replay their configuration intent
        for pool in &mut self.descriptor_pools {
            pool.reconfigure(&self.images, &self.buffers)?;
        }

        engine_info!(
            "ember3d::vulkan",
            "Swap chain recreated at {}x{}",
            extent.width,
            extent.height
        );

        Ok(())
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        unsafe {
            self.core.gpu.device.device_wait_idle().ok();

            for layout in self.descriptor_set_layouts.drain(..) {
                self.core
                    .gpu
                    .device
                    .destroy_descriptor_set_layout(layout, None);
            }
            self.core
                .gpu
                .device
                .destroy_command_pool(self.frame_command_pool, None);
        }
        // Remaining fields drop in declaration order; `core` goes last and
        // tears down allocator, device, debug messenger, surface, instance.
    }
}

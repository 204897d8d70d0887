/// Image - GPU-backed 2D/cube images with views, samplers and layout tracking
///
/// Three construction paths mirror the three lifecycles: sampled textures
/// (staged upload + mipmap chain + sampler), offscreen color buffers
/// (framebuffer targets, optionally sampled later) and depth buffers. Every
/// image tracks its current layout so barrier transitions are computed from
/// real state instead of guesses.

use ember_3d_engine::ember3d::{Error, Result};
use ember_3d_engine::engine_err;
use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use slotmap::new_key_type;
use std::sync::Arc;

use crate::vulkan_buffer::{Buffer, BufferSettings};
use crate::vulkan_command_buffer::{begin_single_time_commands, end_single_time_commands};
use crate::vulkan_context::GpuContext;

new_key_type! {
    /// Stable handle into the context's image registry
    pub struct ImageKey;
}

/// Creation parameters for an image
#[derive(Debug, Clone, Copy)]
pub struct ImageSettings {
    pub image_type: vk::ImageType,
    pub view_type: vk::ImageViewType,
    pub format: vk::Format,
    pub tiling: vk::ImageTiling,
    pub usage: vk::ImageUsageFlags,
    pub mip_levels: u32,
    pub layer_count: u32,
    pub layout: vk::ImageLayout,
    pub sample_count: vk::SampleCountFlags,
    pub sharing_mode: vk::SharingMode,
    pub flags: vk::ImageCreateFlags,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            image_type: vk::ImageType::TYPE_2D,
            view_type: vk::ImageViewType::TYPE_2D,
            format: vk::Format::R8G8B8A8_SRGB,
            tiling: vk::ImageTiling::OPTIMAL,
            usage: vk::ImageUsageFlags::TRANSFER_SRC
                | vk::ImageUsageFlags::TRANSFER_DST
                | vk::ImageUsageFlags::SAMPLED,
            mip_levels: 1,
            layer_count: 1,
            layout: vk::ImageLayout::UNDEFINED,
            sample_count: vk::SampleCountFlags::TYPE_1,
            sharing_mode: vk::SharingMode::EXCLUSIVE,
            flags: vk::ImageCreateFlags::empty(),
        }
    }
}

/// Creation parameters for an image sampler
#[derive(Debug, Clone, Copy)]
pub struct SamplerSettings {
    pub mag_filter: vk::Filter,
    pub min_filter: vk::Filter,
    pub address_mode: vk::SamplerAddressMode,
    pub anisotropy_enable: bool,
    pub border_color: vk::BorderColor,
    pub compare_enable: bool,
    pub compare_op: vk::CompareOp,
    pub mipmap_mode: vk::SamplerMipmapMode,
    pub min_lod: f32,
    pub max_lod: f32,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            mag_filter: vk::Filter::LINEAR,
            min_filter: vk::Filter::LINEAR,
            address_mode: vk::SamplerAddressMode::REPEAT,
            anisotropy_enable: true,
            border_color: vk::BorderColor::INT_OPAQUE_BLACK,
            compare_enable: false,
            compare_op: vk::CompareOp::ALWAYS,
            mipmap_mode: vk::SamplerMipmapMode::LINEAR,
            min_lod: 0.0,
            max_lod: 0.0,
        }
    }
}

fn has_stencil_component(format: vk::Format) -> bool {
    format == vk::Format::D32_SFLOAT_S8_UINT || format == vk::Format::D24_UNORM_S8_UINT
}

/// First candidate format supporting the requested features with the given tiling
pub fn find_supported_format(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    candidates: &[vk::Format],
    tiling: vk::ImageTiling,
    features: vk::FormatFeatureFlags,
) -> Option<vk::Format> {
    candidates.iter().copied().find(|&format| {
        let props =
            unsafe { instance.get_physical_device_format_properties(physical_device, format) };
        match tiling {
            vk::ImageTiling::LINEAR => props.linear_tiling_features.contains(features),
            vk::ImageTiling::OPTIMAL => props.optimal_tiling_features.contains(features),
            _ => false,
        }
    })
}

/// Preferred depth-stencil attachment format for this adapter
pub fn find_depth_format(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
) -> Option<vk::Format> {
    find_supported_format(
        instance,
        physical_device,
        &[
            vk::Format::D32_SFLOAT,
            vk::Format::D32_SFLOAT_S8_UINT,
            vk::Format::D24_UNORM_S8_UINT,
        ],
        vk::ImageTiling::OPTIMAL,
        vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
    )
}

/// Vulkan image with memory, views, optional sampler and tracked layout
pub struct Image {
    ctx: Arc<GpuContext>,
    pub(crate) image: vk::Image,
    allocation: Option<Allocation>,
    pub view: vk::ImageView,
    /// Per-layer 2D views for cube/array images (empty for single-layer images)
    pub secondary_views: Vec<vk::ImageView>,
    /// Null when the image is never sampled
    pub sampler: vk::Sampler,
    pub layout: vk::ImageLayout,
    pub format: vk::Format,
    pub width: u32,
    pub height: u32,
    pub settings: ImageSettings,
}

impl Image {
    /// Create a sampled texture from decoded pixels
    ///
    /// Expects tightly packed RGBA8 pixels. The full chain runs here:
    /// staging upload, mip generation (which leaves every level in
    /// SHADER_READ_ONLY_OPTIMAL), view and sampler creation.
    pub(crate) fn new_texture(
        ctx: Arc<GpuContext>,
        pixels: &[u8],
        width: u32,
        height: u32,
        mut settings: ImageSettings,
        sampler_settings: SamplerSettings,
    ) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(Error::ResourceLoadFailed(format!(
                "Texture pixel buffer is {} bytes, expected {}",
                pixels.len(),
                expected
            )));
        }

        settings.mip_levels = (width.max(height) as f32).log2().floor() as u32 + 1;

        let mut image = Self::create(ctx, settings, width, height)?;

        let staging = Buffer::new(
            image.ctx.clone(),
            BufferSettings {
                size: expected as vk::DeviceSize,
                usage: vk::BufferUsageFlags::TRANSFER_SRC,
                location: MemoryLocation::CpuToGpu,
            },
        )?;
        staging.set_data(pixels)?;

        image.transition_image_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)?;
        image.copy_buffer_to_image(&staging)?;
        image.generate_mipmaps()?;

        image.view = image.create_view(
            image.settings.view_type,
            image.settings.mip_levels,
            0,
            image.settings.layer_count,
            vk::ImageAspectFlags::COLOR,
        )?;

        let mut sampler_settings = sampler_settings;
        sampler_settings.max_lod = image.settings.mip_levels as f32;
        image.sampler = image.create_sampler(&sampler_settings)?;

        Ok(image)
    }

    /// Create an offscreen color buffer (framebuffer target)
    ///
    /// The caller decides whether it is later transitioned for sampling.
    /// A sampler is attached when `sampler_settings` is provided.
    pub(crate) fn new_color_buffer(
        ctx: Arc<GpuContext>,
        settings: ImageSettings,
        extent: vk::Extent2D,
        sampler_settings: Option<SamplerSettings>,
    ) -> Result<Self> {
        let mut image = Self::create(ctx, settings, extent.width, extent.height)?;

        image.view = image.create_view(
            image.settings.view_type,
            image.settings.mip_levels,
            0,
            image.settings.layer_count,
            vk::ImageAspectFlags::COLOR,
        )?;

        // Cube and array images additionally get one 2D view per layer so
        // framebuffers can target individual faces.
        if image.settings.layer_count > 1 {
            for layer in 0..image.settings.layer_count {
                let view = image.create_view(
                    vk::ImageViewType::TYPE_2D,
                    1,
                    layer,
                    1,
                    vk::ImageAspectFlags::COLOR,
                )?;
                image.secondary_views.push(view);
            }
        }

        if let Some(sampler_settings) = sampler_settings {
            image.sampler = image.create_sampler(&sampler_settings)?;
        }

        Ok(image)
    }

    /// Create a depth buffer, transitioned to DEPTH_STENCIL_ATTACHMENT_OPTIMAL
    pub(crate) fn new_depth_buffer(
        ctx: Arc<GpuContext>,
        settings: ImageSettings,
        extent: vk::Extent2D,
    ) -> Result<Self> {
        let mut image = Self::create(ctx, settings, extent.width, extent.height)?;

        image.view = image.create_view(
            image.settings.view_type,
            image.settings.mip_levels,
            0,
            image.settings.layer_count,
            vk::ImageAspectFlags::DEPTH,
        )?;
        image.transition_image_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)?;

        Ok(image)
    }

    fn create(
        ctx: Arc<GpuContext>,
        settings: ImageSettings,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let create_info = vk::ImageCreateInfo::default()
            .image_type(settings.image_type)
            .extent(vk::Extent3D {
                width,
                height,
                depth: 1,
            })
            .mip_levels(settings.mip_levels)
            .array_layers(settings.layer_count)
            .format(settings.format)
            .tiling(settings.tiling)
            .initial_layout(settings.layout)
            .usage(settings.usage)
            .samples(settings.sample_count)
            .sharing_mode(settings.sharing_mode)
            .flags(settings.flags);

        let image = unsafe { ctx.device.create_image(&create_info, None) }
            .map_err(|e| engine_err!("ember3d::vulkan", "Failed to create image: {:?}", e))?;

        let requirements = unsafe { ctx.device.get_image_memory_requirements(image) };

        let allocation = ctx
            .allocator
            .lock()
            .map_err(|_| Error::BackendError("Allocator lock poisoned".to_string()))?
            .allocate(&AllocationCreateDesc {
                name: "image",
                requirements,
                location: MemoryLocation::GpuOnly,
                linear: false,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|e| {
                unsafe { ctx.device.destroy_image(image, None) };
                engine_err!("ember3d::vulkan", "Failed to allocate image memory: {:?}", e)
            })?;

        let bind_result =
            unsafe { ctx.device.bind_image_memory(image, allocation.memory(), allocation.offset()) };
        if let Err(e) = bind_result {
            if let Ok(mut allocator) = ctx.allocator.lock() {
                allocator.free(allocation).ok();
            }
            unsafe { ctx.device.destroy_image(image, None) };
            return Err(engine_err!(
                "ember3d::vulkan",
                "Failed to bind image memory: {:?}",
                e
            ));
        }

        Ok(Self {
            ctx,
            image,
            allocation: Some(allocation),
            view: vk::ImageView::null(),
            secondary_views: Vec::new(),
            sampler: vk::Sampler::null(),
            layout: settings.layout,
            format: settings.format,
            width,
            height,
            settings,
        })
    }

    fn create_view(
        &self,
        view_type: vk::ImageViewType,
        mip_levels: u32,
        base_array_layer: u32,
        layer_count: u32,
        aspect_mask: vk::ImageAspectFlags,
    ) -> Result<vk::ImageView> {
        let create_info = vk::ImageViewCreateInfo::default()
            .image(self.image)
            .view_type(view_type)
            .format(self.format)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask,
                base_mip_level: 0,
                level_count: mip_levels,
                base_array_layer,
                layer_count,
            });

        unsafe { self.ctx.device.create_image_view(&create_info, None) }
            .map_err(|e| engine_err!("ember3d::vulkan", "Failed to create image view: {:?}", e))
    }

    fn create_sampler(&self, settings: &SamplerSettings) -> Result<vk::Sampler> {
        let properties = unsafe {
            self.ctx
                .instance
                .get_physical_device_properties(self.ctx.physical_device)
        };

        let create_info = vk::SamplerCreateInfo::default()
            .mag_filter(settings.mag_filter)
            .min_filter(settings.min_filter)
            .address_mode_u(settings.address_mode)
            .address_mode_v(settings.address_mode)
            .address_mode_w(settings.address_mode)
            .anisotropy_enable(settings.anisotropy_enable)
            .max_anisotropy(properties.limits.max_sampler_anisotropy)
            .border_color(settings.border_color)
            .unnormalized_coordinates(false)
            .compare_enable(settings.compare_enable)
            .compare_op(settings.compare_op)
            .mipmap_mode(settings.mipmap_mode)
            .mip_lod_bias(0.0)
            .min_lod(settings.min_lod)
            .max_lod(settings.max_lod);

        unsafe { self.ctx.device.create_sampler(&create_info, None) }
            .map_err(|e| engine_err!("ember3d::vulkan", "Failed to create sampler: {:?}", e))
    }

    /// Record a pipeline barrier moving the whole image to `target_layout`
    ///
    /// Only the transition pairs the renderer actually performs are
    /// supported; anything else is a resource-load-fatal error.
    pub fn transition_image_layout(&mut self, target_layout: vk::ImageLayout) -> Result<()> {
        let aspect_mask = if target_layout == vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL {
            if has_stencil_component(self.format) {
                vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
            } else {
                vk::ImageAspectFlags::DEPTH
            }
        } else {
            vk::ImageAspectFlags::COLOR
        };

        let (src_access, dst_access, src_stage, dst_stage) = match (self.layout, target_layout) {
            (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL) => (
                vk::AccessFlags::empty(),
                vk::AccessFlags::TRANSFER_WRITE,
                vk::PipelineStageFlags::TOP_OF_PIPE,
                vk::PipelineStageFlags::TRANSFER,
            ),
            (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL) => (
                vk::AccessFlags::TRANSFER_WRITE,
                vk::AccessFlags::SHADER_READ,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
            ),
            (vk::ImageLayout::UNDEFINED, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL) => (
                vk::AccessFlags::empty(),
                vk::AccessFlags::SHADER_READ,
                vk::PipelineStageFlags::TOP_OF_PIPE,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
            ),
            (vk::ImageLayout::UNDEFINED, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL) => (
                vk::AccessFlags::empty(),
                vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
                    | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
                vk::PipelineStageFlags::TOP_OF_PIPE,
                vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            ),
            (_, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL) => (
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
                vk::AccessFlags::SHADER_READ,
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
            ),
            (from, to) => {
                return Err(Error::ResourceLoadFailed(format!(
                    "Unsupported layout transition {:?} -> {:?}",
                    from, to
                )));
            }
        };

        let pool = *self
            .ctx
            .upload_command_pool
            .lock()
            .map_err(|_| Error::BackendError("Upload command pool lock poisoned".to_string()))?;
        let command_buffer = begin_single_time_commands(&self.ctx.device, pool)?;

        let barrier = vk::ImageMemoryBarrier::default()
            .old_layout(self.layout)
            .new_layout(target_layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(self.image)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask,
                base_mip_level: 0,
                level_count: self.settings.mip_levels,
                base_array_layer: 0,
                layer_count: self.settings.layer_count,
            })
            .src_access_mask(src_access)
            .dst_access_mask(dst_access);

        unsafe {
            self.ctx.device.cmd_pipeline_barrier(
                command_buffer,
                src_stage,
                dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );
        }

        self.layout = target_layout;

        end_single_time_commands(
            &self.ctx.device,
            pool,
            command_buffer,
            self.ctx.graphics_queue,
        )
    }

    fn copy_buffer_to_image(&self, staging: &Buffer) -> Result<()> {
        let pool = *self
            .ctx
            .upload_command_pool
            .lock()
            .map_err(|_| Error::BackendError("Upload command pool lock poisoned".to_string()))?;
        let command_buffer = begin_single_time_commands(&self.ctx.device, pool)?;

        let region = vk::BufferImageCopy::default()
            .buffer_offset(0)
            .buffer_row_length(0)
            .buffer_image_height(0)
            .image_subresource(vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            })
            .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
            .image_extent(vk::Extent3D {
                width: self.width,
                height: self.height,
                depth: 1,
            });

        unsafe {
            self.ctx.device.cmd_copy_buffer_to_image(
                command_buffer,
                staging.buffer,
                self.image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );
        }

        end_single_time_commands(
            &self.ctx.device,
            pool,
            command_buffer,
            self.ctx.graphics_queue,
        )
    }

    /// Blit each mip level from the previous one, finishing the whole chain
    /// in SHADER_READ_ONLY_OPTIMAL
    fn generate_mipmaps(&mut self) -> Result<()> {
        let format_properties = unsafe {
            self.ctx
                .instance
                .get_physical_device_format_properties(self.ctx.physical_device, self.format)
        };
        if !format_properties
            .optimal_tiling_features
            .contains(vk::FormatFeatureFlags::SAMPLED_IMAGE_FILTER_LINEAR)
        {
            return Err(Error::ResourceLoadFailed(format!(
                "Format {:?} does not support linear blitting",
                self.format
            )));
        }

        let pool = *self
            .ctx
            .upload_command_pool
            .lock()
            .map_err(|_| Error::BackendError("Upload command pool lock poisoned".to_string()))?;
        let command_buffer = begin_single_time_commands(&self.ctx.device, pool)?;

        let mut mip_width = self.width as i32;
        let mut mip_height = self.height as i32;

        for level in 1..self.settings.mip_levels {
            let src_barrier = vk::ImageMemoryBarrier::default()
                .image(self.image)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: level - 1,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                })
                .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .new_layout(vk::ImageLayout::TRANSFER_SRC_OPTIMAL)
                .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
                .dst_access_mask(vk::AccessFlags::TRANSFER_READ);

            unsafe {
                self.ctx.device.cmd_pipeline_barrier(
                    command_buffer,
                    vk::PipelineStageFlags::TRANSFER,
                    vk::PipelineStageFlags::TRANSFER,
                    vk::DependencyFlags::empty(),
                    &[],
                    &[],
                    &[src_barrier],
                );
            }

            let blit = vk::ImageBlit {
                src_subresource: vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: level - 1,
                    base_array_layer: 0,
                    layer_count: 1,
                },
                src_offsets: [
                    vk::Offset3D { x: 0, y: 0, z: 0 },
                    vk::Offset3D {
                        x: mip_width,
                        y: mip_height,
                        z: 1,
                    },
                ],
                dst_subresource: vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: level,
                    base_array_layer: 0,
                    layer_count: 1,
                },
                dst_offsets: [
                    vk::Offset3D { x: 0, y: 0, z: 0 },
                    vk::Offset3D {
                        x: if mip_width > 1 { mip_width / 2 } else { 1 },
                        y: if mip_height > 1 { mip_height / 2 } else { 1 },
                        z: 1,
                    },
                ],
            };

            unsafe {
                self.ctx.device.cmd_blit_image(
                    command_buffer,
                    self.image,
                    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    self.image,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[blit],
                    vk::Filter::LINEAR,
                );
            }

            let read_barrier = vk::ImageMemoryBarrier::default()
                .image(self.image)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: level - 1,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                })
                .old_layout(vk::ImageLayout::TRANSFER_SRC_OPTIMAL)
                .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                .src_access_mask(vk::AccessFlags::TRANSFER_READ)
                .dst_access_mask(vk::AccessFlags::SHADER_READ);

            unsafe {
                self.ctx.device.cmd_pipeline_barrier(
                    command_buffer,
                    vk::PipelineStageFlags::TRANSFER,
                    vk::PipelineStageFlags::FRAGMENT_SHADER,
                    vk::DependencyFlags::empty(),
                    &[],
                    &[],
                    &[read_barrier],
                );
            }

            if mip_width > 1 {
                mip_width /= 2;
            }
            if mip_height > 1 {
                mip_height /= 2;
            }
        }

        // The last level was only ever a blit destination
        let last_barrier = vk::ImageMemoryBarrier::default()
            .image(self.image)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: self.settings.mip_levels - 1,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            })
            .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
            .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
            .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
            .dst_access_mask(vk::AccessFlags::SHADER_READ);

        unsafe {
            self.ctx.device.cmd_pipeline_barrier(
                command_buffer,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[last_barrier],
            );
        }

        self.layout = vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL;

        end_single_time_commands(
            &self.ctx.device,
            pool,
            command_buffer,
            self.ctx.graphics_queue,
        )
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        unsafe {
            if self.sampler != vk::Sampler::null() {
                self.ctx.device.destroy_sampler(self.sampler, None);
            }
            if self.view != vk::ImageView::null() {
                self.ctx.device.destroy_image_view(self.view, None);
            }
            for &view in &self.secondary_views {
                self.ctx.device.destroy_image_view(view, None);
            }
            if let Some(allocation) = self.allocation.take() {
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }
            self.ctx.device.destroy_image(self.image, None);
        }
    }
}

/// DescriptorPool - declarative binding of resources to per-frame sets
///
/// One pool owns one descriptor set per frame-in-flight slot, all sharing a
/// single layout. `configure_descriptors` turns a declarative binding list
/// into batched descriptor writes; the list itself is remembered so
/// `reconfigure` can replay it after a swap-chain recreation, when
/// offscreen image views have changed identity under their stable keys.

use ember_3d_engine::ember3d::{Error, Result};
use ember_3d_engine::engine_error;
use ash::vk;
use slotmap::SlotMap;

use crate::vulkan_buffer::{Buffer, BufferKey};
use crate::vulkan_frame::MAX_FRAMES_IN_FLIGHT;
use crate::vulkan_image::{Image, ImageKey};

/// Resource bound at one descriptor binding
///
/// A one-element key list is shared by every frame slot; a list with one
/// key per frame-in-flight slot is indexed by the slot (per-frame uniform
/// buffers). Anything else is rejected at configure time.
#[derive(Debug, Clone)]
pub enum DescriptorResource {
    UniformBuffer {
        buffers: Vec<BufferKey>,
        range: vk::DeviceSize,
    },
    CombinedImageSampler {
        images: Vec<ImageKey>,
    },
    InputAttachment {
        image: ImageKey,
    },
}

/// One (binding index, resource) pair of a declarative configuration
#[derive(Debug, Clone)]
pub struct DescriptorBinding {
    pub binding: u32,
    pub resource: DescriptorResource,
}

/// Which element of a per-binding key list serves a given frame slot
pub(crate) fn frame_resource_index(len: usize, frame: usize) -> usize {
    if len <= 1 {
        0
    } else {
        frame
    }
}

/// A key list is valid when shared (1) or strided per frame slot
pub(crate) fn validate_resource_len(len: usize, frames: usize) -> bool {
    len == 1 || len == frames
}

enum ResolvedInfo {
    Buffer(usize),
    Image(usize),
}

/// Descriptor pool with one set per frame-in-flight slot
pub struct DescriptorPool {
    device: ash::Device,
    pool: vk::DescriptorPool,
    pub sets: Vec<vk::DescriptorSet>,
    /// Last applied configuration, replayed by `reconfigure`
    config: Vec<DescriptorBinding>,
}

impl DescriptorPool {
    /// Create the pool and allocate its per-frame sets
    ///
    /// `types` lists the descriptor type of each binding in the layout;
    /// pool sizes are derived from it.
    pub(crate) fn new(
        device: &ash::Device,
        layout: vk::DescriptorSetLayout,
        types: &[vk::DescriptorType],
    ) -> Result<Self> {
        let sizes: Vec<vk::DescriptorPoolSize> = types
            .iter()
            .map(|&ty| vk::DescriptorPoolSize {
                ty,
                descriptor_count: MAX_FRAMES_IN_FLIGHT as u32,
            })
            .collect();

        let create_info = vk::DescriptorPoolCreateInfo::default()
            .pool_sizes(&sizes)
            .max_sets(MAX_FRAMES_IN_FLIGHT as u32);

        let pool = unsafe { device.create_descriptor_pool(&create_info, None) }.map_err(|e| {
            engine_error!("ember3d::vulkan", "Failed to create descriptor pool: {:?}", e);
            Error::InitializationFailed(format!("Failed to create descriptor pool: {:?}", e))
        })?;

        let layouts = [layout; MAX_FRAMES_IN_FLIGHT];
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(pool)
            .set_layouts(&layouts);

        let sets = unsafe { device.allocate_descriptor_sets(&alloc_info) }.map_err(|e| {
            engine_error!("ember3d::vulkan", "Failed to allocate descriptor sets: {:?}", e);
            unsafe { device.destroy_descriptor_pool(pool, None) };
            Error::InitializationFailed(format!("Failed to allocate descriptor sets: {:?}", e))
        })?;

        Ok(Self {
            device: device.clone(),
            pool,
            sets,
            config: Vec::new(),
        })
    }

    /// Apply a declarative binding list and remember it for `reconfigure`
    pub(crate) fn configure_descriptors(
        &mut self,
        bindings: Vec<DescriptorBinding>,
        images: &SlotMap<ImageKey, Image>,
        buffers: &SlotMap<BufferKey, Buffer>,
    ) -> Result<()> {
        self.config = bindings;
        self.apply(images, buffers)
    }

    /// Replay the remembered configuration against current registry contents
    ///
    /// Offscreen images recreated during a swap-chain rebuild keep their
    /// keys but change view identity; replaying re-resolves every key.
    pub(crate) fn reconfigure(
        &mut self,
        images: &SlotMap<ImageKey, Image>,
        buffers: &SlotMap<BufferKey, Buffer>,
    ) -> Result<()> {
        self.apply(images, buffers)
    }

    fn apply(
        &self,
        images: &SlotMap<ImageKey, Image>,
        buffers: &SlotMap<BufferKey, Buffer>,
    ) -> Result<()> {
        for binding in &self.config {
            let len = match &binding.resource {
                DescriptorResource::UniformBuffer { buffers, .. } => buffers.len(),
                DescriptorResource::CombinedImageSampler { images } => images.len(),
                DescriptorResource::InputAttachment { .. } => 1,
            };
            if !validate_resource_len(len, self.sets.len()) {
                return Err(Error::InvalidResource(format!(
                    "Binding {} has {} resources for {} frame slots",
                    binding.binding,
                    len,
                    self.sets.len()
                )));
            }
        }

        for (frame, &set) in self.sets.iter().enumerate() {
            let mut buffer_infos: Vec<vk::DescriptorBufferInfo> =
                Vec::with_capacity(self.config.len());
            let mut image_infos: Vec<vk::DescriptorImageInfo> =
                Vec::with_capacity(self.config.len());
            let mut resolved: Vec<ResolvedInfo> = Vec::with_capacity(self.config.len());

            for binding in &self.config {
                match &binding.resource {
                    DescriptorResource::UniformBuffer { buffers: keys, range } => {
                        let key = keys[frame_resource_index(keys.len(), frame)];
                        let buffer = buffers.get(key).ok_or_else(|| {
                            Error::InvalidResource(format!(
                                "Unknown buffer key at binding {}",
                                binding.binding
                            ))
                        })?;
                        buffer_infos.push(
                            vk::DescriptorBufferInfo::default()
                                .buffer(buffer.buffer)
                                .offset(0)
                                .range(*range),
                        );
                        resolved.push(ResolvedInfo::Buffer(buffer_infos.len() - 1));
                    }
                    DescriptorResource::CombinedImageSampler { images: keys } => {
                        let key = keys[frame_resource_index(keys.len(), frame)];
                        let image = images.get(key).ok_or_else(|| {
                            Error::InvalidResource(format!(
                                "Unknown image key at binding {}",
                                binding.binding
                            ))
                        })?;
                        image_infos.push(
                            vk::DescriptorImageInfo::default()
                                .sampler(image.sampler)
                                .image_view(image.view)
                                .image_layout(image.layout),
                        );
                        resolved.push(ResolvedInfo::Image(image_infos.len() - 1));
                    }
                    DescriptorResource::InputAttachment { image: key } => {
                        let image = images.get(*key).ok_or_else(|| {
                            Error::InvalidResource(format!(
                                "Unknown image key at binding {}",
                                binding.binding
                            ))
                        })?;
                        image_infos.push(
                            vk::DescriptorImageInfo::default()
                                .image_view(image.view)
                                .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
                        );
                        resolved.push(ResolvedInfo::Image(image_infos.len() - 1));
                    }
                }
            }

            let writes: Vec<vk::WriteDescriptorSet> = self
                .config
                .iter()
                .zip(resolved.iter())
                .map(|(binding, info)| {
                    let write = vk::WriteDescriptorSet::default()
                        .dst_set(set)
                        .dst_binding(binding.binding)
                        .dst_array_element(0);
                    match (&binding.resource, info) {
                        (DescriptorResource::UniformBuffer { .. }, ResolvedInfo::Buffer(i)) => {
                            write
                                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                                .buffer_info(std::slice::from_ref(&buffer_infos[*i]))
                        }
                        (
                            DescriptorResource::CombinedImageSampler { .. },
                            ResolvedInfo::Image(i),
                        ) => write
                            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                            .image_info(std::slice::from_ref(&image_infos[*i])),
                        (DescriptorResource::InputAttachment { .. }, ResolvedInfo::Image(i)) => {
                            write
                                .descriptor_type(vk::DescriptorType::INPUT_ATTACHMENT)
                                .image_info(std::slice::from_ref(&image_infos[*i]))
                        }
                        // resolved is built in lockstep with config
                        _ => unreachable!("descriptor info kind mismatch"),
                    }
                })
                .collect();

            unsafe {
                self.device.update_descriptor_sets(&writes, &[]);
            }
        }

        Ok(())
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_pool(self.pool, None);
        }
    }
}

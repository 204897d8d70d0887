/// Device selection - queue family discovery, adapter scoring, logical device
///
/// Enumerates physical devices, scores each candidate (discrete GPU bonus +
/// max 2D image dimension) and hard-disqualifies adapters missing required
/// features, queue families, extensions or swap-chain support. The winning
/// adapter's invariant properties (max MSAA sample count, supported depth
/// format) are cached in `PhysicalDeviceInfo` so later subsystems never
/// re-query the device.

use ember_3d_engine::ember3d::{Error, Result};
use ember_3d_engine::{engine_debug, engine_error, engine_info};
use ash::vk;
use std::ffi::CStr;

use crate::vulkan_image::find_depth_format;
use crate::vulkan_swapchain::SwapChainSupport;

/// Device extensions every candidate must expose
pub(crate) const REQUIRED_DEVICE_EXTENSIONS: [&CStr; 1] = [ash::khr::swapchain::NAME];

/// Queue family indices for the graphics and present queues
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueFamilyIndices {
    pub graphics_family: Option<u32>,
    pub present_family: Option<u32>,
}

impl QueueFamilyIndices {
    /// Discover the graphics and present queue families of a device
    pub fn new(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: &ash::khr::surface::Instance,
    ) -> Self {
        let queue_families =
            unsafe { instance.get_physical_device_queue_family_properties(physical_device) };

        let graphics_family = queue_families
            .iter()
            .enumerate()
            .find(|(_, qf)| qf.queue_flags.contains(vk::QueueFlags::GRAPHICS))
            .map(|(i, _)| i as u32);

        let present_family = (0..queue_families.len() as u32).find(|&i| {
            unsafe {
                surface_loader.get_physical_device_surface_support(physical_device, i, surface)
            }
            .unwrap_or(false)
        });

        Self {
            graphics_family,
            present_family,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.graphics_family.is_some() && self.present_family.is_some()
    }
}

/// Facts about one candidate adapter, gathered once and fed to the scorer
#[derive(Debug, Clone, Copy)]
pub(crate) struct DeviceRating {
    pub discrete: bool,
    pub max_image_dimension2d: u32,
    pub has_required_features: bool,
    pub queues_complete: bool,
    pub extensions_supported: bool,
    pub swap_chain_adequate: bool,
}

/// Score a candidate adapter. Zero means disqualified.
pub(crate) fn rate_device(rating: &DeviceRating) -> u32 {
    if !rating.has_required_features
        || !rating.queues_complete
        || !rating.extensions_supported
        || !rating.swap_chain_adequate
    {
        return 0;
    }

    let mut score = 0;
    if rating.discrete {
        score += 1000;
    }
    score += rating.max_image_dimension2d;
    score
}

/// Invariant properties of the chosen physical device, cached at selection
/// time so the render-pass builder and pipeline construction never need a
/// device handle for format queries.
#[derive(Debug, Clone)]
pub struct PhysicalDeviceInfo {
    /// Adapter name as reported by the driver
    pub name: String,
    /// Highest sample count usable for both color and depth attachments
    pub msaa_samples: vk::SampleCountFlags,
    /// Depth-stencil format supported with optimal tiling
    pub depth_format: vk::Format,
    /// Largest supported 2D image dimension
    pub max_image_dimension2d: u32,
}

fn check_extension_support(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> bool {
    let available = match unsafe { instance.enumerate_device_extension_properties(physical_device) }
    {
        Ok(exts) => exts,
        Err(_) => return false,
    };

    REQUIRED_DEVICE_EXTENSIONS.iter().all(|required| {
        available.iter().any(|ext| {
            let name = unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) };
            name == *required
        })
    })
}

fn max_sample_count(properties: &vk::PhysicalDeviceProperties) -> vk::SampleCountFlags {
    let counts = properties.limits.framebuffer_color_sample_counts
        & properties.limits.framebuffer_depth_sample_counts;

    for candidate in [
        vk::SampleCountFlags::TYPE_64,
        vk::SampleCountFlags::TYPE_32,
        vk::SampleCountFlags::TYPE_16,
        vk::SampleCountFlags::TYPE_8,
        vk::SampleCountFlags::TYPE_4,
        vk::SampleCountFlags::TYPE_2,
    ] {
        if counts.contains(candidate) {
            return candidate;
        }
    }
    vk::SampleCountFlags::TYPE_1
}

fn rate_device_suitability(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> u32 {
    let properties = unsafe { instance.get_physical_device_properties(physical_device) };
    let features = unsafe { instance.get_physical_device_features(physical_device) };

    let name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()) };
    engine_debug!(
        "ember3d::vulkan",
        "Candidate adapter: {:?} (type {:?})",
        name,
        properties.device_type
    );

    let indices = QueueFamilyIndices::new(instance, physical_device, surface, surface_loader);

    let swap_chain_adequate =
        SwapChainSupport::query(physical_device, surface, surface_loader)
            .map(|support| support.is_adequate())
            .unwrap_or(false);

    let rating = DeviceRating {
        discrete: properties.device_type == vk::PhysicalDeviceType::DISCRETE_GPU,
        max_image_dimension2d: properties.limits.max_image_dimension2_d,
        has_required_features: features.sampler_anisotropy == vk::TRUE
            && features.geometry_shader == vk::TRUE,
        queues_complete: indices.is_complete(),
        extensions_supported: check_extension_support(instance, physical_device),
        swap_chain_adequate,
    };

    rate_device(&rating)
}

/// Pick the highest-scoring adapter and cache its invariant properties
pub(crate) fn pick_physical_device(
    instance: &ash::Instance,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> Result<(vk::PhysicalDevice, PhysicalDeviceInfo)> {
    let physical_devices = unsafe { instance.enumerate_physical_devices() }.map_err(|e| {
        engine_error!("ember3d::vulkan", "Failed to enumerate physical devices: {:?}", e);
        Error::InitializationFailed(format!("Failed to enumerate physical devices: {:?}", e))
    })?;

    if physical_devices.is_empty() {
        engine_error!("ember3d::vulkan", "No Vulkan-capable GPU found");
        return Err(Error::InitializationFailed(
            "No Vulkan-capable GPU found".to_string(),
        ));
    }

    let (best, score) = physical_devices
        .into_iter()
        .map(|pd| {
            let score = rate_device_suitability(instance, pd, surface, surface_loader);
            (pd, score)
        })
        .max_by_key(|(_, score)| *score)
        .ok_or_else(|| {
            Error::InitializationFailed("No Vulkan-capable GPU found".to_string())
        })?;

    if score == 0 {
        engine_error!("ember3d::vulkan", "Failed to find a suitable GPU");
        return Err(Error::InitializationFailed(
            "Failed to find a suitable GPU".to_string(),
        ));
    }

    let properties = unsafe { instance.get_physical_device_properties(best) };
    let name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }
        .to_string_lossy()
        .into_owned();

    let depth_format = find_depth_format(instance, best).ok_or_else(|| {
        engine_error!("ember3d::vulkan", "No supported depth format on chosen GPU");
        Error::InitializationFailed("No supported depth format".to_string())
    })?;

    let info = PhysicalDeviceInfo {
        name: name.clone(),
        msaa_samples: max_sample_count(&properties),
        depth_format,
        max_image_dimension2d: properties.limits.max_image_dimension2_d,
    };

    engine_info!(
        "ember3d::vulkan",
        "Chosen GPU: {} (score {}, max MSAA {:?})",
        name,
        score,
        info.msaa_samples
    );

    Ok((best, info))
}

/// Logical device plus its resolved queues
pub struct LogicalDevice {
    pub device: ash::Device,
    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,
    pub graphics_family: u32,
    pub present_family: u32,
}

impl LogicalDevice {
    /// Create the logical device with the features device scoring required
    pub(crate) fn new(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        indices: QueueFamilyIndices,
    ) -> Result<Self> {
        let graphics_family = indices.graphics_family.ok_or_else(|| {
            Error::InitializationFailed("No graphics queue family".to_string())
        })?;
        let present_family = indices.present_family.ok_or_else(|| {
            Error::InitializationFailed("No present queue family".to_string())
        })?;

        let queue_priorities = [1.0];
        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = if graphics_family
            == present_family
        {
            vec![vk::DeviceQueueCreateInfo::default()
                .queue_family_index(graphics_family)
                .queue_priorities(&queue_priorities)]
        } else {
            vec![
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(graphics_family)
                    .queue_priorities(&queue_priorities),
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(present_family)
                    .queue_priorities(&queue_priorities),
            ]
        };

        let extension_names: Vec<*const std::ffi::c_char> = REQUIRED_DEVICE_EXTENSIONS
            .iter()
            .map(|ext| ext.as_ptr())
            .collect();

        let device_features = vk::PhysicalDeviceFeatures::default()
            .sampler_anisotropy(true)
            .geometry_shader(true)
            .sample_rate_shading(true);

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_names)
            .enabled_features(&device_features);

        let device = unsafe { instance.create_device(physical_device, &create_info, None) }
            .map_err(|e| {
                engine_error!("ember3d::vulkan", "Failed to create logical device: {:?}", e);
                Error::InitializationFailed(format!("Failed to create device: {:?}", e))
            })?;

        let graphics_queue = unsafe { device.get_device_queue(graphics_family, 0) };
        let present_queue = unsafe { device.get_device_queue(present_family, 0) };

        Ok(Self {
            device,
            graphics_queue,
            present_queue,
            graphics_family,
            present_family,
        })
    }
}

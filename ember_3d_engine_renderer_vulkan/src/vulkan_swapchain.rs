/// SwapChain - presentation images and parameter negotiation
///
/// `SwapChainSupport` captures what the surface offers (capabilities,
/// formats, present modes); `SwapChain` owns the negotiated swap chain and
/// its per-image views. Recreation builds a new `SwapChain` with the old
/// handle passed through `old_swapchain`, so the retired chain is destroyed
/// only after its replacement exists.

use ember_3d_engine::ember3d::{Error, Result};
use ember_3d_engine::engine_error;
use ash::vk;

use crate::vulkan_device::LogicalDevice;

/// Surface capabilities relevant to swap-chain negotiation
pub struct SwapChainSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapChainSupport {
    /// Query what the surface supports on this adapter
    pub fn query(
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: &ash::khr::surface::Instance,
    ) -> Result<Self> {
        unsafe {
            let capabilities = surface_loader
                .get_physical_device_surface_capabilities(physical_device, surface)
                .map_err(|e| {
                    Error::InitializationFailed(format!(
                        "Failed to get surface capabilities: {:?}",
                        e
                    ))
                })?;
            let formats = surface_loader
                .get_physical_device_surface_formats(physical_device, surface)
                .map_err(|e| {
                    Error::InitializationFailed(format!("Failed to get surface formats: {:?}", e))
                })?;
            let present_modes = surface_loader
                .get_physical_device_surface_present_modes(physical_device, surface)
                .map_err(|e| {
                    Error::InitializationFailed(format!("Failed to get present modes: {:?}", e))
                })?;

            Ok(Self {
                capabilities,
                formats,
                present_modes,
            })
        }
    }

    /// A surface with no formats or no present modes cannot host a swap chain
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }

    /// Prefer (B8G8R8A8_SRGB, SRGB_NONLINEAR), fall back to the first format
    pub(crate) fn choose_format(&self) -> vk::SurfaceFormatKHR {
        self.formats
            .iter()
            .find(|fmt| {
                fmt.format == vk::Format::B8G8R8A8_SRGB
                    && fmt.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
            })
            .copied()
            .unwrap_or(self.formats[0])
    }

    /// Prefer MAILBOX, fall back to FIFO (always available)
    pub(crate) fn choose_present_mode(&self) -> vk::PresentModeKHR {
        self.present_modes
            .iter()
            .find(|&&pm| pm == vk::PresentModeKHR::MAILBOX)
            .copied()
            .unwrap_or(vk::PresentModeKHR::FIFO)
    }

    /// Surface-fixed extent when reported, otherwise the framebuffer pixel
    /// size clamped to the surface's min/max image extent
    pub(crate) fn choose_extent(&self, width: u32, height: u32) -> vk::Extent2D {
        if self.capabilities.current_extent.width != u32::MAX {
            return self.capabilities.current_extent;
        }

        vk::Extent2D {
            width: width.clamp(
                self.capabilities.min_image_extent.width,
                self.capabilities.max_image_extent.width,
            ),
            height: height.clamp(
                self.capabilities.min_image_extent.height,
                self.capabilities.max_image_extent.height,
            ),
        }
    }

    /// min+1 images, clamped to the maximum when one is reported
    pub(crate) fn choose_image_count(&self) -> u32 {
        let count = self.capabilities.min_image_count + 1;
        if self.capabilities.max_image_count > 0 {
            count.min(self.capabilities.max_image_count)
        } else {
            count
        }
    }
}

/// Negotiated swap chain with its present images and views
pub struct SwapChain {
    device: ash::Device,
    pub(crate) loader: ash::khr::swapchain::Device,
    pub(crate) swap_chain: vk::SwapchainKHR,
    pub(crate) images: Vec<vk::Image>,
    pub(crate) image_views: Vec<vk::ImageView>,
    pub format: vk::SurfaceFormatKHR,
    pub extent: vk::Extent2D,
}

impl SwapChain {
    /// Negotiate parameters and create the swap chain
    ///
    /// `width`/`height` is the framebuffer pixel size used when the surface
    /// does not fix the extent. `old_swapchain` carries the retired handle
    /// during recreation.
    pub(crate) fn new(
        instance: &ash::Instance,
        device: &LogicalDevice,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: &ash::khr::surface::Instance,
        width: u32,
        height: u32,
        old_swapchain: Option<vk::SwapchainKHR>,
    ) -> Result<Self> {
        let support = SwapChainSupport::query(physical_device, surface, surface_loader)?;
        if !support.is_adequate() {
            engine_error!("ember3d::vulkan", "Surface offers no formats or present modes");
            return Err(Error::InitializationFailed(
                "Inadequate swap chain support".to_string(),
            ));
        }

        let format = support.choose_format();
        let present_mode = support.choose_present_mode();
        let extent = support.choose_extent(width, height);
        let image_count = support.choose_image_count();

        let queue_family_indices = [device.graphics_family, device.present_family];
        let mut create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(format.format)
            .image_color_space(format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(support.capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain.unwrap_or(vk::SwapchainKHR::null()));

        if device.graphics_family != device.present_family {
            create_info = create_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&queue_family_indices);
        } else {
            create_info = create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE);
        }

        let loader = ash::khr::swapchain::Device::new(instance, &device.device);
        let swap_chain = unsafe { loader.create_swapchain(&create_info, None) }.map_err(|e| {
            engine_error!("ember3d::vulkan", "Failed to create swap chain: {:?}", e);
            Error::InitializationFailed(format!("Failed to create swap chain: {:?}", e))
        })?;

        let images = unsafe { loader.get_swapchain_images(swap_chain) }.map_err(|e| {
            engine_error!("ember3d::vulkan", "Failed to get swap chain images: {:?}", e);
            Error::InitializationFailed(format!("Failed to get swap chain images: {:?}", e))
        })?;

        let mut image_views = Vec::with_capacity(images.len());
        for &image in &images {
            let view_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format.format)
                .components(vk::ComponentMapping {
                    r: vk::ComponentSwizzle::IDENTITY,
                    g: vk::ComponentSwizzle::IDENTITY,
                    b: vk::ComponentSwizzle::IDENTITY,
                    a: vk::ComponentSwizzle::IDENTITY,
                })
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });

            let view = unsafe { device.device.create_image_view(&view_info, None) }.map_err(
                |e| {
                    engine_error!(
                        "ember3d::vulkan",
                        "Failed to create swap chain image view: {:?}",
                        e
                    );
                    Error::InitializationFailed(format!("Failed to create image view: {:?}", e))
                },
            )?;
            image_views.push(view);
        }

        Ok(Self {
            device: device.device.clone(),
            loader,
            swap_chain,
            images,
            image_views,
            format,
            extent,
        })
    }

    /// Number of presentable images in the chain
    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}

impl Drop for SwapChain {
    fn drop(&mut self) {
        unsafe {
            for &view in &self.image_views {
                self.device.destroy_image_view(view, None);
            }
            self.loader.destroy_swapchain(self.swap_chain, None);
        }
    }
}

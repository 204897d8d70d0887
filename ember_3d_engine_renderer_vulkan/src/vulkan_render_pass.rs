/// RenderPass - declarative subpass/attachment composition
///
/// `RenderPassSettings` accumulates attachments, subpasses and dependencies
/// before a one-shot compile into a `vk::RenderPass`. Framebuffers bind the
/// pass's attachment slots to concrete image views; the binding is by
/// logical reference (registry key or swap-chain index) and re-resolved
/// whenever a framebuffer is (re)built, which is what makes swap-chain
/// recreation possible without recompiling the pass.

use ember_3d_engine::ember3d::{Error, Result};
use ember_3d_engine::engine_error;
use ash::vk;
use slotmap::SlotMap;

use crate::vulkan_image::{Image, ImageKey};
use crate::vulkan_swapchain::SwapChain;

/// Attachment references owned by one subpass, grouped by role
#[derive(Debug, Clone, Default)]
pub struct SubpassSettings {
    pub color_attachment_references: Vec<vk::AttachmentReference>,
    /// Parallel to the color references when non-empty (MSAA resolve targets)
    pub resolve_attachment_references: Vec<vk::AttachmentReference>,
    pub depth_attachment_reference: Option<vk::AttachmentReference>,
    pub input_attachment_references: Vec<vk::AttachmentReference>,
}

/// Declarative description of a whole render pass
#[derive(Debug, Clone, Default)]
pub struct RenderPassSettings {
    pub attachments: Vec<vk::AttachmentDescription>,
    pub subpasses: Vec<SubpassSettings>,
    pub dependencies: Vec<vk::SubpassDependency>,
}

impl RenderPassSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one subpass and the attachments it introduces
    ///
    /// `color_attachment_count` fresh color attachments (clear-on-load,
    /// stored, UNDEFINED -> COLOR_ATTACHMENT_OPTIMAL) are appended to the
    /// shared attachment list and the subpass's color references point at
    /// exactly those new indices. `depth_format` adds one depth attachment;
    /// `resolve_attachment_count` (0 or 1) adds a single-sampled resolve
    /// target. `input_attachments` lists the indices of already-described
    /// attachments this subpass reads; earlier subpasses must have
    /// introduced them.
    ///
    /// Returns the index of the new subpass.
    pub fn add_subpass(
        &mut self,
        format: vk::Format,
        sample_count: vk::SampleCountFlags,
        depth_format: Option<vk::Format>,
        color_attachment_count: u32,
        resolve_attachment_count: u32,
        input_attachments: &[u32],
    ) -> usize {
        let subpass_index = self.subpasses.len() as u32;
        let mut subpass = SubpassSettings::default();

        for _ in 0..color_attachment_count {
            let index = self.attachments.len() as u32;
            self.attachments.push(
                vk::AttachmentDescription::default()
                    .format(format)
                    .samples(sample_count)
                    .load_op(vk::AttachmentLoadOp::CLEAR)
                    .store_op(vk::AttachmentStoreOp::STORE)
                    .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                    .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                    .initial_layout(vk::ImageLayout::UNDEFINED)
                    .final_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
            );
            subpass.color_attachment_references.push(
                vk::AttachmentReference::default()
                    .attachment(index)
                    .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
            );
        }

        if let Some(depth_format) = depth_format {
            let index = self.attachments.len() as u32;
            self.attachments.push(
                vk::AttachmentDescription::default()
                    .format(depth_format)
                    .samples(sample_count)
                    .load_op(vk::AttachmentLoadOp::CLEAR)
                    .store_op(vk::AttachmentStoreOp::DONT_CARE)
                    .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                    .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                    .initial_layout(vk::ImageLayout::UNDEFINED)
                    .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
            );
            subpass.depth_attachment_reference = Some(
                vk::AttachmentReference::default()
                    .attachment(index)
                    .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
            );
        }

        if resolve_attachment_count > 0 {
            let index = self.attachments.len() as u32;
            self.attachments.push(
                vk::AttachmentDescription::default()
                    .format(format)
                    .samples(vk::SampleCountFlags::TYPE_1)
                    .load_op(vk::AttachmentLoadOp::DONT_CARE)
                    .store_op(vk::AttachmentStoreOp::STORE)
                    .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                    .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                    .initial_layout(vk::ImageLayout::UNDEFINED)
                    .final_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
            );
            subpass.resolve_attachment_references.push(
                vk::AttachmentReference::default()
                    .attachment(index)
                    .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
            );
        }

        for &input in input_attachments {
            subpass.input_attachment_references.push(
                vk::AttachmentReference::default()
                    .attachment(input)
                    .layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
            );
        }

        // Default external dependency covering the color/depth write hazards
        // of this subpass.
        self.dependencies.push(
            vk::SubpassDependency::default()
                .src_subpass(vk::SUBPASS_EXTERNAL)
                .dst_subpass(subpass_index)
                .src_stage_mask(
                    vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                        | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
                )
                .src_access_mask(vk::AccessFlags::empty())
                .dst_stage_mask(
                    vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                        | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
                )
                .dst_access_mask(
                    vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                        | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
                ),
        );

        // A subpass reading input attachments waits on the previous
        // subpass's color writes at per-region granularity.
        if !input_attachments.is_empty() && subpass_index > 0 {
            self.dependencies.push(
                vk::SubpassDependency::default()
                    .src_subpass(subpass_index - 1)
                    .dst_subpass(subpass_index)
                    .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
                    .src_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
                    .dst_stage_mask(vk::PipelineStageFlags::FRAGMENT_SHADER)
                    .dst_access_mask(vk::AccessFlags::INPUT_ATTACHMENT_READ)
                    .dependency_flags(vk::DependencyFlags::BY_REGION),
            );
        }

        self.subpasses.push(subpass);
        subpass_index as usize
    }

    /// Every attachment index referenced by any subpass must exist
    pub fn validate(&self) -> bool {
        let count = self.attachments.len() as u32;
        self.subpasses.iter().all(|sp| {
            sp.color_attachment_references
                .iter()
                .chain(sp.resolve_attachment_references.iter())
                .chain(sp.input_attachment_references.iter())
                .chain(sp.depth_attachment_reference.iter())
                .all(|r| r.attachment < count)
        })
    }
}

/// Which dimensions a framebuffer keeps when its pass is recreated
pub(crate) fn framebuffer_dimensions(
    resizeable: bool,
    original: (u32, u32),
    requested: (u32, u32),
) -> (u32, u32) {
    if resizeable {
        requested
    } else {
        original
    }
}

/// Logical source of one framebuffer attachment, resolved to a view at
/// (re)build time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramebufferAttachment {
    /// An offscreen image in the context's registry
    Image(ImageKey),
    /// The swap chain's presentable image at this index
    SwapChain(u32),
}

impl FramebufferAttachment {
    fn resolve(
        &self,
        images: &SlotMap<ImageKey, Image>,
        swap_chain: &SwapChain,
    ) -> Result<vk::ImageView> {
        match *self {
            FramebufferAttachment::Image(key) => images
                .get(key)
                .map(|img| img.view)
                .ok_or_else(|| Error::InvalidResource("Unknown image key".to_string())),
            FramebufferAttachment::SwapChain(index) => swap_chain
                .image_views
                .get(index as usize)
                .copied()
                .ok_or_else(|| {
                    Error::InvalidResource(format!("Swap chain image {} out of range", index))
                }),
        }
    }
}

/// One concrete binding of the pass's attachment slots to image views
pub struct Framebuffer {
    pub width: u32,
    pub height: u32,
    pub(crate) framebuffer: vk::Framebuffer,
    pub attachments: Vec<FramebufferAttachment>,
}

/// Compiled render pass owning its framebuffers
pub struct RenderPass {
    /// Non-resizeable passes (fixed-resolution shadow maps) keep their
    /// framebuffer dimensions across swap-chain recreation
    pub resizeable: bool,
    pub(crate) render_pass: vk::RenderPass,
    pub framebuffers: Vec<Framebuffer>,
    device: ash::Device,
}

impl RenderPass {
    /// Flatten the settings into create-info and compile the pass
    pub(crate) fn new(
        settings: &RenderPassSettings,
        device: &ash::Device,
        resizeable: bool,
    ) -> Result<Self> {
        if !settings.validate() {
            engine_error!(
                "ember3d::vulkan",
                "Render pass references an attachment index out of range"
            );
            return Err(Error::InitializationFailed(
                "Render pass attachment reference out of range".to_string(),
            ));
        }

        let subpass_descriptions: Vec<vk::SubpassDescription> = settings
            .subpasses
            .iter()
            .map(|sp| {
                let mut description = vk::SubpassDescription::default()
                    .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
                    .color_attachments(&sp.color_attachment_references)
                    .input_attachments(&sp.input_attachment_references);
                if !sp.resolve_attachment_references.is_empty() {
                    description =
                        description.resolve_attachments(&sp.resolve_attachment_references);
                }
                if let Some(depth) = &sp.depth_attachment_reference {
                    description = description.depth_stencil_attachment(depth);
                }
                description
            })
            .collect();

        let create_info = vk::RenderPassCreateInfo::default()
            .attachments(&settings.attachments)
            .subpasses(&subpass_descriptions)
            .dependencies(&settings.dependencies);

        let render_pass = unsafe { device.create_render_pass(&create_info, None) }.map_err(
            |e| {
                engine_error!("ember3d::vulkan", "Failed to create render pass: {:?}", e);
                Error::InitializationFailed(format!("Failed to create render pass: {:?}", e))
            },
        )?;

        Ok(Self {
            resizeable,
            render_pass,
            framebuffers: Vec::new(),
            device: device.clone(),
        })
    }

    /// Bind attachment references to concrete views in a new framebuffer
    ///
    /// Views are resolved at call time, so the same logical attachment list
    /// can be re-resolved after a swap-chain recreation.
    pub(crate) fn add_framebuffer(
        &mut self,
        width: u32,
        height: u32,
        attachments: Vec<FramebufferAttachment>,
        images: &SlotMap<ImageKey, Image>,
        swap_chain: &SwapChain,
    ) -> Result<()> {
        let framebuffer = self.create_framebuffer(width, height, &attachments, images, swap_chain)?;
        self.framebuffers.push(Framebuffer {
            width,
            height,
            framebuffer,
            attachments,
        });
        Ok(())
    }

    /// Destroy and rebuild one framebuffer, re-resolving attachment views
    ///
    /// Non-resizeable passes ignore the requested dimensions and keep the
    /// framebuffer's original size.
    pub(crate) fn recreate_framebuffer(
        &mut self,
        index: usize,
        width: u32,
        height: u32,
        images: &SlotMap<ImageKey, Image>,
        swap_chain: &SwapChain,
    ) -> Result<()> {
        let fb = self
            .framebuffers
            .get(index)
            .ok_or_else(|| Error::InvalidResource(format!("No framebuffer {}", index)))?;

        let (width, height) =
            framebuffer_dimensions(self.resizeable, (fb.width, fb.height), (width, height));

        if fb.framebuffer != vk::Framebuffer::null() {
            unsafe { self.device.destroy_framebuffer(fb.framebuffer, None) };
        }

        let attachments = fb.attachments.clone();
        let framebuffer = self.create_framebuffer(width, height, &attachments, images, swap_chain)?;

        let fb = &mut self.framebuffers[index];
        fb.framebuffer = framebuffer;
        fb.width = width;
        fb.height = height;
        Ok(())
    }

    /// Destroy every framebuffer handle, keeping the attachment lists
    ///
    /// Used by the recreation protocol: handles referencing soon-to-die
    /// views must be gone before the swap chain and offscreen buffers are
    /// torn down.
    pub(crate) fn release_framebuffers(&mut self) {
        for fb in &mut self.framebuffers {
            if fb.framebuffer != vk::Framebuffer::null() {
                unsafe { self.device.destroy_framebuffer(fb.framebuffer, None) };
                fb.framebuffer = vk::Framebuffer::null();
            }
        }
    }

    /// Rebuild every framebuffer after a swap-chain recreation
    pub(crate) fn rebuild_framebuffers(
        &mut self,
        width: u32,
        height: u32,
        images: &SlotMap<ImageKey, Image>,
        swap_chain: &SwapChain,
    ) -> Result<()> {
        for index in 0..self.framebuffers.len() {
            self.recreate_framebuffer(index, width, height, images, swap_chain)?;
        }
        Ok(())
    }

    fn create_framebuffer(
        &self,
        width: u32,
        height: u32,
        attachments: &[FramebufferAttachment],
        images: &SlotMap<ImageKey, Image>,
        swap_chain: &SwapChain,
    ) -> Result<vk::Framebuffer> {
        let views: Vec<vk::ImageView> = attachments
            .iter()
            .map(|a| a.resolve(images, swap_chain))
            .collect::<Result<_>>()?;

        let create_info = vk::FramebufferCreateInfo::default()
            .render_pass(self.render_pass)
            .attachments(&views)
            .width(width)
            .height(height)
            .layers(1);

        unsafe { self.device.create_framebuffer(&create_info, None) }.map_err(|e| {
            engine_error!("ember3d::vulkan", "Failed to create framebuffer: {:?}", e);
            Error::InitializationFailed(format!("Failed to create framebuffer: {:?}", e))
        })
    }
}

impl Drop for RenderPass {
    fn drop(&mut self) {
        unsafe {
            for fb in &self.framebuffers {
                if fb.framebuffer != vk::Framebuffer::null() {
                    self.device.destroy_framebuffer(fb.framebuffer, None);
                }
            }
            self.device.destroy_render_pass(self.render_pass, None);
        }
    }
}

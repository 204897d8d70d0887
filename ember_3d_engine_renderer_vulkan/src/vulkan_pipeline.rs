/// GraphicsPipeline - shader stages + fixed-function state for one subpass
///
/// Shader stages are independently optional; present stages are loaded from
/// SPIR-V files on disk, wrapped in transient modules and destroyed right
/// after the pipeline links. Viewport and scissor are always dynamic so one
/// pipeline serves any swap extent without recompilation.

use ember_3d_engine::ember3d::{Error, Result};
use ember_3d_engine::{engine_err, engine_error};
use ash::vk;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::vulkan_vertex::Vertex;

/// SPIR-V file paths for the optional shader stages
#[derive(Debug, Clone, Default)]
pub struct PipelineShaderPaths {
    pub vertex: Option<PathBuf>,
    pub geometry: Option<PathBuf>,
    pub fragment: Option<PathBuf>,
}

/// Fixed-function state for pipeline construction
///
/// Plain data, patched field-by-field after `populate_defaults` when a
/// pipeline deviates from the defaults (the way a fullscreen lighting pass
/// clears the vertex input, for example).
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub vertex_binding_descriptions: Vec<vk::VertexInputBindingDescription>,
    pub vertex_attribute_descriptions: Vec<vk::VertexInputAttributeDescription>,
    pub topology: vk::PrimitiveTopology,
    pub polygon_mode: vk::PolygonMode,
    pub cull_mode: vk::CullModeFlags,
    pub front_face: vk::FrontFace,
    pub sample_count: vk::SampleCountFlags,
    pub sample_shading_enable: bool,
    pub min_sample_shading: f32,
    pub color_blend_attachments: Vec<vk::PipelineColorBlendAttachmentState>,
    pub depth_test_enable: bool,
    pub depth_write_enable: bool,
    pub depth_compare_op: vk::CompareOp,
    pub descriptor_set_layouts: Vec<vk::DescriptorSetLayout>,
    pub push_constant_ranges: Vec<vk::PushConstantRange>,
    /// Index of the target render pass in the context's registry
    pub render_pass: usize,
    /// Subpass index within that render pass
    pub subpass: u32,
}

impl PipelineSettings {
    /// Defaults for an opaque mesh pipeline
    ///
    /// `color_attachment_count` must be the same count used to build the
    /// target subpass; the blend-state array is sized from it so the two
    /// can never drift apart.
    pub fn populate_defaults(
        descriptor_set_layouts: Vec<vk::DescriptorSetLayout>,
        render_pass: usize,
        subpass: u32,
        color_attachment_count: u32,
    ) -> Self {
        let color_blend_attachments = (0..color_attachment_count)
            .map(|_| {
                vk::PipelineColorBlendAttachmentState::default()
                    .color_write_mask(vk::ColorComponentFlags::RGBA)
                    .blend_enable(false)
            })
            .collect();

        Self {
            vertex_binding_descriptions: vec![Vertex::binding_description()],
            vertex_attribute_descriptions: Vertex::attribute_descriptions().to_vec(),
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            polygon_mode: vk::PolygonMode::FILL,
            cull_mode: vk::CullModeFlags::BACK,
            front_face: vk::FrontFace::COUNTER_CLOCKWISE,
            sample_count: vk::SampleCountFlags::TYPE_1,
            sample_shading_enable: true,
            min_sample_shading: 0.2,
            color_blend_attachments,
            depth_test_enable: true,
            depth_write_enable: true,
            depth_compare_op: vk::CompareOp::LESS,
            descriptor_set_layouts,
            push_constant_ranges: Vec::new(),
            render_pass,
            subpass,
        }
    }
}

pub(crate) fn load_shader_code(path: &Path) -> Result<Vec<u32>> {
    let mut file = File::open(path).map_err(|e| {
        engine_error!("ember3d::vulkan", "Failed to open shader {:?}: {}", path, e);
        Error::ResourceLoadFailed(format!("Failed to open shader {:?}: {}", path, e))
    })?;

    ash::util::read_spv(&mut file).map_err(|e| {
        engine_error!("ember3d::vulkan", "Failed to read SPIR-V {:?}: {}", path, e);
        Error::ResourceLoadFailed(format!("Invalid SPIR-V {:?}: {}", path, e))
    })
}

/// Compiled pipeline bound to one (render pass, subpass) pair
pub struct GraphicsPipeline {
    device: ash::Device,
    pub(crate) pipeline_layout: vk::PipelineLayout,
    pub(crate) pipeline: vk::Pipeline,
    pub render_pass: usize,
    pub subpass: u32,
}

impl GraphicsPipeline {
    pub(crate) fn new(
        device: &ash::Device,
        shaders: &PipelineShaderPaths,
        settings: &PipelineSettings,
        render_pass: vk::RenderPass,
    ) -> Result<Self> {
        let stage_sources = [
            (&shaders.vertex, vk::ShaderStageFlags::VERTEX),
            (&shaders.geometry, vk::ShaderStageFlags::GEOMETRY),
            (&shaders.fragment, vk::ShaderStageFlags::FRAGMENT),
        ];

        // Transient modules: referenced by the pipeline create call and
        // destroyed immediately after linking, success or not.
        let mut modules: Vec<(vk::ShaderModule, vk::ShaderStageFlags)> = Vec::new();
        let mut load = || -> Result<()> {
            for (path, stage) in &stage_sources {
                if let Some(path) = path {
                    let code = load_shader_code(path)?;
                    let create_info = vk::ShaderModuleCreateInfo::default().code(&code);
                    let module = unsafe { device.create_shader_module(&create_info, None) }
                        .map_err(|e| {
                            engine_err!(
                                "ember3d::vulkan",
                                "Failed to create shader module for {:?}: {:?}",
                                path,
                                e
                            )
                        })?;
                    modules.push((module, *stage));
                }
            }
            Ok(())
        };
        if let Err(e) = load() {
            for (module, _) in &modules {
                unsafe { device.destroy_shader_module(*module, None) };
            }
            return Err(e);
        }

        let result = Self::link(device, &modules, settings, render_pass);

        for (module, _) in &modules {
            unsafe { device.destroy_shader_module(*module, None) };
        }

        result
    }

    fn link(
        device: &ash::Device,
        modules: &[(vk::ShaderModule, vk::ShaderStageFlags)],
        settings: &PipelineSettings,
        render_pass: vk::RenderPass,
    ) -> Result<Self> {
        let shader_stages: Vec<vk::PipelineShaderStageCreateInfo> = modules
            .iter()
            .map(|&(module, stage)| {
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(stage)
                    .module(module)
                    .name(c"main")
            })
            .collect();

        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&settings.vertex_binding_descriptions)
            .vertex_attribute_descriptions(&settings.vertex_attribute_descriptions);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(settings.topology)
            .primitive_restart_enable(false);

        // Actual viewport/scissor values are recorded per draw call
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let rasterizer = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(settings.polygon_mode)
            .line_width(1.0)
            .cull_mode(settings.cull_mode)
            .front_face(settings.front_face)
            .depth_bias_enable(false);

        let multisampling = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(settings.sample_shading_enable)
            .min_sample_shading(settings.min_sample_shading)
            .rasterization_samples(settings.sample_count);

        let color_blending = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&settings.color_blend_attachments);

        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(settings.depth_test_enable)
            .depth_write_enable(settings.depth_write_enable)
            .depth_compare_op(settings.depth_compare_op)
            .depth_bounds_test_enable(false)
            .min_depth_bounds(0.0)
            .max_depth_bounds(1.0)
            .stencil_test_enable(false);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let layout_info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(&settings.descriptor_set_layouts)
            .push_constant_ranges(&settings.push_constant_ranges);

        let pipeline_layout = unsafe { device.create_pipeline_layout(&layout_info, None) }
            .map_err(|e| {
                engine_error!("ember3d::vulkan", "Failed to create pipeline layout: {:?}", e);
                Error::InitializationFailed(format!("Failed to create pipeline layout: {:?}", e))
            })?;

        let create_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisampling)
            .color_blend_state(&color_blending)
            .depth_stencil_state(&depth_stencil)
            .dynamic_state(&dynamic_state)
            .layout(pipeline_layout)
            .render_pass(render_pass)
            .subpass(settings.subpass);

        let pipeline = unsafe {
            device.create_graphics_pipelines(vk::PipelineCache::null(), &[create_info], None)
        }
        .map_err(|(_, e)| {
            unsafe { device.destroy_pipeline_layout(pipeline_layout, None) };
            engine_error!("ember3d::vulkan", "Failed to create graphics pipeline: {:?}", e);
            Error::InitializationFailed(format!("Failed to create graphics pipeline: {:?}", e))
        })?[0];

        Ok(Self {
            device: device.clone(),
            pipeline_layout,
            pipeline,
            render_pass: settings.render_pass,
            subpass: settings.subpass,
        })
    }
}

impl Drop for GraphicsPipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
            self.device.destroy_pipeline_layout(self.pipeline_layout, None);
        }
    }
}

//! Deferred-shading demo scene
//!
//! Two render passes drive the whole frame:
//! - a fixed 1024x1024 shadow pass (non-resizeable) rendering
//!   light-space depth into a sampled R32 color target,
//! - the main pass with a G-buffer subpass (position/normal/albedo/
//!   material + depth) and a lighting subpass that reads the four
//!   G-buffer attachments as input attachments and samples the shadow map.

use ember_3d_engine::ember3d::{Error, Result};
use ember_3d_engine::engine_info;
use ember_3d_engine_renderer_vulkan::{
    vk, BufferKey, BufferSettings, DescriptorBinding, DescriptorResource, FrameOutcome, ImageKey,
    ImageSettings, OffscreenExtent, PipelineSettings, PipelineShaderPaths, RenderPassSettings,
    SamplerSettings, Vertex, VulkanContext, FramebufferAttachment, MAX_FRAMES_IN_FLIGHT,
};
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use std::path::{Path, PathBuf};
use std::time::Instant;
use winit::window::Window;

use crate::camera::Camera;
use crate::obj;
use crate::options::Options;

const SHADOW_MAP_SIZE: u32 = 1024;
const GBUFFER_FORMAT: vk::Format = vk::Format::R16G16B16A16_SFLOAT;
const SHADOW_FORMAT: vk::Format = vk::Format::R32_SFLOAT;

/// Per-frame scene uniforms (G-buffer subpass)
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct SceneUbo {
    model: [[f32; 4]; 4],
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
}

/// Per-frame lighting uniforms (lighting subpass)
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct LightUbo {
    light_space: [[f32; 4]; 4],
    light_position: [f32; 4],
    view_position: [f32; 4],
}

/// Per-frame shadow-pass uniforms
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct ShadowUbo {
    light_space: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
}

/// Everything the frame callback needs, held by index/key
pub struct DemoScene {
    ctx: VulkanContext,
    camera: Camera,
    start: Instant,

    vertex_buffer: BufferKey,
    index_buffer: BufferKey,
    index_count: u32,

    scene_ubos: Vec<BufferKey>,
    light_ubos: Vec<BufferKey>,
    shadow_ubos: Vec<BufferKey>,

    main_pass: usize,
    shadow_pass: usize,

    gbuffer_pipeline: usize,
    lighting_pipeline: usize,
    shadow_pipeline: usize,

    scene_pool: usize,
    lighting_pool: usize,
    shadow_pool: usize,
}

impl DemoScene {
    pub fn new(window: &Window, options: &Options) -> Result<Self> {
        let size = window.inner_size();
        let mut ctx = VulkanContext::new(window, "Ember3D Demo", size.width, size.height)?;

        // Mesh and texture come from the external collaborators (OBJ
        // loader, image decoder); the renderer only sees byte buffers.
        let (vertices, indices) = load_mesh(options)?;
        let (pixels, tex_width, tex_height) = load_texture_pixels(options)?;

        let vertex_buffer = ctx.add_buffer(BufferSettings::staged(
            (vertices.len() * std::mem::size_of::<Vertex>()) as vk::DeviceSize,
            vk::BufferUsageFlags::VERTEX_BUFFER,
        ))?;
        ctx.write_buffer_staged(vertex_buffer, bytemuck::cast_slice(&vertices))?;

        let index_buffer = ctx.add_buffer(BufferSettings::staged(
            (indices.len() * std::mem::size_of::<u32>()) as vk::DeviceSize,
            vk::BufferUsageFlags::INDEX_BUFFER,
        ))?;
        ctx.write_buffer_staged(index_buffer, bytemuck::cast_slice(&indices))?;

        // One uniform buffer per frame-in-flight slot, never shared
        let mut scene_ubos = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
        let mut light_ubos = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
        let mut shadow_ubos = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            scene_ubos.push(ctx.add_buffer(BufferSettings::uniform(
                std::mem::size_of::<SceneUbo>() as vk::DeviceSize,
            ))?);
            light_ubos.push(ctx.add_buffer(BufferSettings::uniform(
                std::mem::size_of::<LightUbo>() as vk::DeviceSize,
            ))?);
            shadow_ubos.push(ctx.add_buffer(BufferSettings::uniform(
                std::mem::size_of::<ShadowUbo>() as vk::DeviceSize,
            ))?);
        }

        let texture = ctx.add_texture(
            &pixels,
            tex_width,
            tex_height,
            ImageSettings::default(),
            SamplerSettings::default(),
        )?;

        // G-buffer: four color targets + depth, tracking the swap extent
        let gbuffer_settings = ImageSettings {
            format: GBUFFER_FORMAT,
            usage: vk::ImageUsageFlags::COLOR_ATTACHMENT
                | vk::ImageUsageFlags::INPUT_ATTACHMENT
                | vk::ImageUsageFlags::SAMPLED,
            ..ImageSettings::default()
        };
        let mut gbuffer: Vec<ImageKey> = Vec::with_capacity(4);
        for _ in 0..4 {
            gbuffer.push(ctx.add_color_buffer(
                gbuffer_settings,
                OffscreenExtent::SwapChain,
                None,
            )?);
        }
        let depth_buffer = ctx.add_depth_buffer(
            ImageSettings {
                usage: vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
                ..ImageSettings::default()
            },
            OffscreenExtent::SwapChain,
        )?;

        // Shadow map: fixed-size sampled color target + its own depth
        let shadow_extent = OffscreenExtent::Fixed {
            width: SHADOW_MAP_SIZE,
            height: SHADOW_MAP_SIZE,
        };
        let shadow_map = ctx.add_color_buffer(
            ImageSettings {
                format: SHADOW_FORMAT,
                usage: vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::SAMPLED,
                ..ImageSettings::default()
            },
            shadow_extent,
            Some(SamplerSettings {
                address_mode: vk::SamplerAddressMode::CLAMP_TO_EDGE,
                anisotropy_enable: false,
                border_color: vk::BorderColor::FLOAT_OPAQUE_WHITE,
                ..SamplerSettings::default()
            }),
        )?;
        let shadow_depth = ctx.add_depth_buffer(
            ImageSettings {
                usage: vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
                ..ImageSettings::default()
            },
            shadow_extent,
        )?;

        let depth_format = ctx.device_info().depth_format;
        let swap_format = ctx.swap_chain_format();

        // Main pass: G-buffer subpass (attachments 0..3 color, 4 depth)
        // then lighting subpass reading {0,1,2,3} and writing the swap
        // image (attachment 5).
        let mut main_settings = RenderPassSettings::new();
        main_settings.add_subpass(
            GBUFFER_FORMAT,
            vk::SampleCountFlags::TYPE_1,
            Some(depth_format),
            4,
            0,
            &[],
        );
        main_settings.add_subpass(
            swap_format,
            vk::SampleCountFlags::TYPE_1,
            None,
            1,
            0,
            &[0, 1, 2, 3],
        );
        // The lighting target is presented, not sampled
        main_settings.attachments[5].final_layout = vk::ImageLayout::PRESENT_SRC_KHR;
        let main_pass = ctx.add_render_pass(&main_settings, true)?;

        let extent = ctx.swap_chain_extent();
        for image_index in 0..ctx.swap_chain_image_count() {
            ctx.add_framebuffer(
                main_pass,
                extent.width,
                extent.height,
                vec![
                    FramebufferAttachment::Image(gbuffer[0]),
                    FramebufferAttachment::Image(gbuffer[1]),
                    FramebufferAttachment::Image(gbuffer[2]),
                    FramebufferAttachment::Image(gbuffer[3]),
                    FramebufferAttachment::Image(depth_buffer),
                    FramebufferAttachment::SwapChain(image_index as u32),
                ],
            )?;
        }

        // Shadow pass: fixed size, never resized with the window
        let mut shadow_settings = RenderPassSettings::new();
        shadow_settings.add_subpass(
            SHADOW_FORMAT,
            vk::SampleCountFlags::TYPE_1,
            Some(depth_format),
            1,
            0,
            &[],
        );
        // Sampled by the lighting subpass afterwards
        shadow_settings.attachments[0].final_layout = vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL;
        let shadow_pass = ctx.add_render_pass(&shadow_settings, false)?;
        ctx.add_framebuffer(
            shadow_pass,
            SHADOW_MAP_SIZE,
            SHADOW_MAP_SIZE,
            vec![
                FramebufferAttachment::Image(shadow_map),
                FramebufferAttachment::Image(shadow_depth),
            ],
        )?;

        // Descriptor-set layouts; each index doubles as its pool index
        let scene_pool = ctx.add_descriptor_set_layout(&[
            vk::DescriptorSetLayoutBinding::default()
                .binding(0)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::VERTEX),
            vk::DescriptorSetLayoutBinding::default()
                .binding(1)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::FRAGMENT),
        ])?;

        let lighting_pool = ctx.add_descriptor_set_layout(&[
            vk::DescriptorSetLayoutBinding::default()
                .binding(0)
                .descriptor_type(vk::DescriptorType::INPUT_ATTACHMENT)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::FRAGMENT),
            vk::DescriptorSetLayoutBinding::default()
                .binding(1)
                .descriptor_type(vk::DescriptorType::INPUT_ATTACHMENT)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::FRAGMENT),
            vk::DescriptorSetLayoutBinding::default()
                .binding(2)
                .descriptor_type(vk::DescriptorType::INPUT_ATTACHMENT)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::FRAGMENT),
            vk::DescriptorSetLayoutBinding::default()
                .binding(3)
                .descriptor_type(vk::DescriptorType::INPUT_ATTACHMENT)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::FRAGMENT),
            vk::DescriptorSetLayoutBinding::default()
                .binding(4)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::FRAGMENT),
            vk::DescriptorSetLayoutBinding::default()
                .binding(5)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::FRAGMENT),
        ])?;

        let shadow_pool = ctx.add_descriptor_set_layout(&[
            vk::DescriptorSetLayoutBinding::default()
                .binding(0)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::VERTEX),
        ])?;

        ctx.configure_descriptors(
            scene_pool,
            vec![
                DescriptorBinding {
                    binding: 0,
                    resource: DescriptorResource::UniformBuffer {
                        buffers: scene_ubos.clone(),
                        range: std::mem::size_of::<SceneUbo>() as vk::DeviceSize,
                    },
                },
                DescriptorBinding {
                    binding: 1,
                    resource: DescriptorResource::CombinedImageSampler {
                        images: vec![texture],
                    },
                },
            ],
        )?;

        ctx.configure_descriptors(
            lighting_pool,
            vec![
                DescriptorBinding {
                    binding: 0,
                    resource: DescriptorResource::InputAttachment { image: gbuffer[0] },
                },
                DescriptorBinding {
                    binding: 1,
                    resource: DescriptorResource::InputAttachment { image: gbuffer[1] },
                },
                DescriptorBinding {
                    binding: 2,
                    resource: DescriptorResource::InputAttachment { image: gbuffer[2] },
                },
                DescriptorBinding {
                    binding: 3,
                    resource: DescriptorResource::InputAttachment { image: gbuffer[3] },
                },
                DescriptorBinding {
                    binding: 4,
                    resource: DescriptorResource::UniformBuffer {
                        buffers: light_ubos.clone(),
                        range: std::mem::size_of::<LightUbo>() as vk::DeviceSize,
                    },
                },
                DescriptorBinding {
                    binding: 5,
                    resource: DescriptorResource::CombinedImageSampler {
                        images: vec![shadow_map],
                    },
                },
            ],
        )?;

        ctx.configure_descriptors(
            shadow_pool,
            vec![DescriptorBinding {
                binding: 0,
                resource: DescriptorResource::UniformBuffer {
                    buffers: shadow_ubos.clone(),
                    range: std::mem::size_of::<ShadowUbo>() as vk::DeviceSize,
                },
            }],
        )?;

        // Pipelines: one per subpass; blend-state arrays sized by the same
        // counts that built the subpasses.
        let scene_layout = ctx
            .descriptor_set_layout(scene_pool)
            .ok_or_else(|| Error::InvalidResource("scene layout".to_string()))?;
        let lighting_layout = ctx
            .descriptor_set_layout(lighting_pool)
            .ok_or_else(|| Error::InvalidResource("lighting layout".to_string()))?;
        let shadow_layout = ctx
            .descriptor_set_layout(shadow_pool)
            .ok_or_else(|| Error::InvalidResource("shadow layout".to_string()))?;

        let gbuffer_pipeline = ctx.add_pipeline(
            &shader_paths("gbuffer.vert.spv", Some("gbuffer.frag.spv")),
            &PipelineSettings::populate_defaults(vec![scene_layout], main_pass, 0, 4),
        )?;

        let mut lighting_settings =
            PipelineSettings::populate_defaults(vec![lighting_layout], main_pass, 1, 1);
        // Fullscreen triangle generated in the vertex shader
        lighting_settings.vertex_binding_descriptions.clear();
        lighting_settings.vertex_attribute_descriptions.clear();
        lighting_settings.depth_test_enable = false;
        lighting_settings.depth_write_enable = false;
        lighting_settings.cull_mode = vk::CullModeFlags::NONE;
        let lighting_pipeline = ctx.add_pipeline(
            &shader_paths("lighting.vert.spv", Some("lighting.frag.spv")),
            &lighting_settings,
        )?;

        let shadow_pipeline = ctx.add_pipeline(
            &shader_paths("shadow.vert.spv", Some("shadow.frag.spv")),
            &PipelineSettings::populate_defaults(vec![shadow_layout], shadow_pass, 0, 1),
        )?;

        engine_info!(
            "ember3d::demo",
            "Scene ready: {} vertices, {} indices",
            vertices.len(),
            indices.len()
        );

        Ok(Self {
            ctx,
            camera: Camera::default(),
            start: Instant::now(),
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            scene_ubos,
            light_ubos,
            shadow_ubos,
            main_pass,
            shadow_pass,
            gbuffer_pipeline,
            lighting_pipeline,
            shadow_pipeline,
            scene_pool,
            lighting_pool,
            shadow_pool,
        })
    }

    pub fn handle_resize(&mut self, width: u32, height: u32) {
        self.ctx.handle_resize(width, height);
    }

    /// Record and submit one frame
    pub fn render(&mut self) -> Result<FrameOutcome> {
        let elapsed = self.start.elapsed().as_secs_f32();

        let extent = self.ctx.swap_chain_extent();
        let aspect = extent.width as f32 / extent.height.max(1) as f32;

        let model = Mat4::from_rotation_y(elapsed * 0.5);
        let view = self.camera.view_matrix();
        let projection = self.camera.projection_matrix(aspect);

        // Orbiting point light with a perspective shadow frustum
        let light_position = Vec3::new(3.0 * (elapsed * 0.3).cos(), 4.0, 3.0 * (elapsed * 0.3).sin());
        let mut light_projection =
            Mat4::perspective_rh(std::f32::consts::FRAC_PI_3, 1.0, 0.5, 20.0);
        light_projection.y_axis.y *= -1.0;
        let light_view = Mat4::look_at_rh(light_position, Vec3::ZERO, Vec3::Y);
        let light_space = light_projection * light_view;

        let scene_ubo = SceneUbo {
            model: model.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
        };
        let light_ubo = LightUbo {
            light_space: light_space.to_cols_array_2d(),
            light_position: light_position.extend(1.0).to_array(),
            view_position: self.camera.position.extend(1.0).to_array(),
        };
        let shadow_ubo = ShadowUbo {
            light_space: light_space.to_cols_array_2d(),
            model: model.to_cols_array_2d(),
        };

        let shadow_clears = [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: [1.0, 1.0, 1.0, 1.0],
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: 1.0,
                    stencil: 0,
                },
            },
        ];
        let clear_color = vk::ClearValue {
            color: vk::ClearColorValue {
                float32: [0.0, 0.0, 0.0, 1.0],
            },
        };
        let main_clears = [
            clear_color,
            clear_color,
            clear_color,
            clear_color,
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: 1.0,
                    stencil: 0,
                },
            },
            clear_color,
        ];

        let scene_ubos = self.scene_ubos.clone();
        let light_ubos = self.light_ubos.clone();
        let shadow_ubos = self.shadow_ubos.clone();
        let vertex_buffer = self.vertex_buffer;
        let index_buffer = self.index_buffer;
        let index_count = self.index_count;
        let main_pass = self.main_pass;
        let shadow_pass = self.shadow_pass;
        let gbuffer_pipeline = self.gbuffer_pipeline;
        let lighting_pipeline = self.lighting_pipeline;
        let shadow_pipeline = self.shadow_pipeline;
        let scene_pool = self.scene_pool;
        let lighting_pool = self.lighting_pool;
        let shadow_pool = self.shadow_pool;

        self.ctx.draw_frame(|rc| {
            let frame = rc.frame();

            // Uniform writes are safe here: this slot's fence wait is done
            rc.write_buffer(scene_ubos[frame], bytemuck::bytes_of(&scene_ubo))?;
            rc.write_buffer(light_ubos[frame], bytemuck::bytes_of(&light_ubo))?;
            rc.write_buffer(shadow_ubos[frame], bytemuck::bytes_of(&shadow_ubo))?;

            // Shadow pass
            rc.begin_render_pass(shadow_pass, 0, &shadow_clears)?;
            rc.bind_pipeline(shadow_pipeline)?;
            rc.bind_descriptor_sets(shadow_pool, 0)?;
            rc.bind_vertex_buffer(vertex_buffer, 0)?;
            rc.bind_index_buffer(index_buffer, 0, vk::IndexType::UINT32)?;
            rc.draw_indexed(index_count, 1, 0, 0, 0)?;
            rc.end_render_pass()?;

            // Main pass: G-buffer fill, then deferred lighting
            rc.begin_render_pass(main_pass, rc.image_index() as usize, &main_clears)?;
            rc.bind_pipeline(gbuffer_pipeline)?;
            rc.bind_descriptor_sets(scene_pool, 0)?;
            rc.bind_vertex_buffer(vertex_buffer, 0)?;
            rc.bind_index_buffer(index_buffer, 0, vk::IndexType::UINT32)?;
            rc.draw_indexed(index_count, 1, 0, 0, 0)?;

            rc.next_subpass()?;
            rc.bind_pipeline(lighting_pipeline)?;
            rc.bind_descriptor_sets(lighting_pool, 0)?;
            rc.draw(3, 1, 0, 0)?;
            rc.end_render_pass()?;

            Ok(())
        })
    }

    pub fn wait_idle(&self) -> Result<()> {
        self.ctx.wait_idle()
    }
}

fn shader_paths(vertex: &str, fragment: Option<&str>) -> PipelineShaderPaths {
    let base = Path::new("shaders");
    PipelineShaderPaths {
        vertex: Some(base.join(vertex)),
        geometry: None,
        fragment: fragment.map(|f| base.join(f)),
    }
}

fn load_mesh(options: &Options) -> Result<(Vec<Vertex>, Vec<u32>)> {
    match &options.model {
        Some(path) => obj::load_obj(path).map_err(Error::ResourceLoadFailed),
        None => Ok(cube_mesh()),
    }
}

fn load_texture_pixels(options: &Options) -> Result<(Vec<u8>, u32, u32)> {
    match &options.texture {
        Some(path) => decode_texture(path, options.flip_texture),
        None => Ok(checkerboard_pixels()),
    }
}

fn decode_texture(path: &PathBuf, flip: bool) -> Result<(Vec<u8>, u32, u32)> {
    let decoded = image::open(path)
        .map_err(|e| Error::ResourceLoadFailed(format!("Failed to load {:?}: {}", path, e)))?;
    let decoded = if flip { decoded.flipv() } else { decoded };
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok((rgba.into_raw(), width, height))
}

/// 64x64 two-tone checkerboard used when no texture is supplied
fn checkerboard_pixels() -> (Vec<u8>, u32, u32) {
    const SIZE: u32 = 64;
    const CELL: u32 = 8;
    let mut pixels = Vec::with_capacity((SIZE * SIZE * 4) as usize);
    for y in 0..SIZE {
        for x in 0..SIZE {
            let even = ((x / CELL) + (y / CELL)) % 2 == 0;
            let value = if even { 220 } else { 80 };
            pixels.extend_from_slice(&[value, value, value, 255]);
        }
    }
    (pixels, SIZE, SIZE)
}

/// Unit cube with per-face normals, used when no model is supplied
pub fn cube_mesh() -> (Vec<Vertex>, Vec<u32>) {
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        // (normal, tangent u, tangent v) per face
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (face, &(normal, u, v)) in faces.iter().enumerate() {
        let n = Vec3::from(normal);
        let u = Vec3::from(u);
        let v = Vec3::from(v);
        let base = (face * 4) as u32;

        for (du, dv, uv) in [
            (-0.5, -0.5, [0.0, 0.0]),
            (0.5, -0.5, [1.0, 0.0]),
            (0.5, 0.5, [1.0, 1.0]),
            (-0.5, 0.5, [0.0, 1.0]),
        ] {
            let position = n * 0.5 + u * du + v * dv;
            vertices.push(Vertex {
                position: position.to_array(),
                normal,
                color: [1.0, 1.0, 1.0],
                uv,
            });
        }

        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }

    (vertices, indices)
}

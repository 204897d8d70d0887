//! Unit tests for pipeline settings and shader loading

use crate::vulkan_pipeline::{load_shader_code, PipelineSettings, PipelineShaderPaths};
use ember_3d_engine::ember3d::Error;
use ash::vk;
use std::path::Path;

#[test]
fn test_blend_state_array_matches_color_attachment_count() {
    // The same count that sized the subpass must size the blend array
    for count in [1u32, 2, 4, 8] {
        let settings = PipelineSettings::populate_defaults(Vec::new(), 0, 0, count);
        assert_eq!(settings.color_blend_attachments.len(), count as usize);
    }
}

#[test]
fn test_populate_defaults_fixed_function_state() {
    let settings = PipelineSettings::populate_defaults(Vec::new(), 2, 1, 1);

    assert_eq!(settings.render_pass, 2);
    assert_eq!(settings.subpass, 1);
    assert_eq!(settings.topology, vk::PrimitiveTopology::TRIANGLE_LIST);
    assert_eq!(settings.polygon_mode, vk::PolygonMode::FILL);
    assert_eq!(settings.cull_mode, vk::CullModeFlags::BACK);
    assert_eq!(settings.front_face, vk::FrontFace::COUNTER_CLOCKWISE);
    assert!(settings.depth_test_enable);
    assert!(settings.depth_write_enable);
    assert_eq!(settings.depth_compare_op, vk::CompareOp::LESS);
    assert_eq!(settings.vertex_binding_descriptions.len(), 1);
    assert_eq!(settings.vertex_attribute_descriptions.len(), 4);
}

#[test]
fn test_blend_attachments_write_all_channels_without_blending() {
    let settings = PipelineSettings::populate_defaults(Vec::new(), 0, 0, 4);
    for blend in &settings.color_blend_attachments {
        assert_eq!(blend.color_write_mask, vk::ColorComponentFlags::RGBA);
        assert_eq!(blend.blend_enable, vk::FALSE);
    }
}

#[test]
fn test_shader_paths_default_to_no_stages() {
    let shaders = PipelineShaderPaths::default();
    assert!(shaders.vertex.is_none());
    assert!(shaders.geometry.is_none());
    assert!(shaders.fragment.is_none());
}

#[test]
fn test_missing_shader_file_is_resource_load_failure() {
    let result = load_shader_code(Path::new("does/not/exist.spv"));
    match result {
        Err(Error::ResourceLoadFailed(_)) => {}
        other => panic!("expected ResourceLoadFailed, got {:?}", other.map(|_| ())),
    }
}

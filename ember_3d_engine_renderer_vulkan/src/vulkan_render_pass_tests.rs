//! Unit tests for the render-pass builder
//!
//! Pure settings-level tests; no GPU required.

use crate::vulkan_render_pass::{framebuffer_dimensions, RenderPassSettings};
use ash::vk;

#[test]
fn test_add_subpass_appends_color_attachments() {
    let mut settings = RenderPassSettings::new();
    let index = settings.add_subpass(
        vk::Format::B8G8R8A8_SRGB,
        vk::SampleCountFlags::TYPE_1,
        None,
        2,
        0,
        &[],
    );

    assert_eq!(index, 0);
    assert_eq!(settings.attachments.len(), 2);
    assert_eq!(settings.subpasses.len(), 1);

    let subpass = &settings.subpasses[0];
    assert_eq!(subpass.color_attachment_references.len(), 2);
    assert_eq!(subpass.color_attachment_references[0].attachment, 0);
    assert_eq!(subpass.color_attachment_references[1].attachment, 1);
    for reference in &subpass.color_attachment_references {
        assert_eq!(reference.layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
    }
    assert!(subpass.depth_attachment_reference.is_none());
    assert!(subpass.input_attachment_references.is_empty());
}

#[test]
fn test_add_subpass_color_attachment_description_defaults() {
    let mut settings = RenderPassSettings::new();
    settings.add_subpass(
        vk::Format::R16G16B16A16_SFLOAT,
        vk::SampleCountFlags::TYPE_1,
        None,
        1,
        0,
        &[],
    );

    let attachment = &settings.attachments[0];
    assert_eq!(attachment.format, vk::Format::R16G16B16A16_SFLOAT);
    assert_eq!(attachment.load_op, vk::AttachmentLoadOp::CLEAR);
    assert_eq!(attachment.store_op, vk::AttachmentStoreOp::STORE);
    assert_eq!(attachment.initial_layout, vk::ImageLayout::UNDEFINED);
    assert_eq!(
        attachment.final_layout,
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
    );
}

#[test]
fn test_add_subpass_depth_attachment_follows_colors() {
    let mut settings = RenderPassSettings::new();
    settings.add_subpass(
        vk::Format::B8G8R8A8_SRGB,
        vk::SampleCountFlags::TYPE_1,
        Some(vk::Format::D32_SFLOAT),
        3,
        0,
        &[],
    );

    assert_eq!(settings.attachments.len(), 4);
    assert_eq!(settings.attachments[3].format, vk::Format::D32_SFLOAT);
    assert_eq!(
        settings.attachments[3].final_layout,
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
    );

    let depth = settings.subpasses[0]
        .depth_attachment_reference
        .expect("depth reference");
    assert_eq!(depth.attachment, 3);
    assert_eq!(
        depth.layout,
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
    );
}

#[test]
fn test_add_subpass_resolve_attachment_is_single_sampled() {
    let mut settings = RenderPassSettings::new();
    settings.add_subpass(
        vk::Format::B8G8R8A8_SRGB,
        vk::SampleCountFlags::TYPE_4,
        Some(vk::Format::D32_SFLOAT),
        1,
        1,
        &[],
    );

    // color(4x), depth(4x), resolve(1x)
    assert_eq!(settings.attachments.len(), 3);
    assert_eq!(settings.attachments[0].samples, vk::SampleCountFlags::TYPE_4);
    assert_eq!(settings.attachments[1].samples, vk::SampleCountFlags::TYPE_4);
    assert_eq!(settings.attachments[2].samples, vk::SampleCountFlags::TYPE_1);

    let subpass = &settings.subpasses[0];
    assert_eq!(subpass.resolve_attachment_references.len(), 1);
    assert_eq!(subpass.resolve_attachment_references[0].attachment, 2);
}

#[test]
fn test_deferred_composition_input_attachment_indices() {
    // G-buffer subpass introduces color attachments 0..3 and depth 4; the
    // lighting subpass must read exactly {0,1,2,3} as input attachments.
    let mut settings = RenderPassSettings::new();
    settings.add_subpass(
        vk::Format::R16G16B16A16_SFLOAT,
        vk::SampleCountFlags::TYPE_1,
        Some(vk::Format::D32_SFLOAT),
        4,
        0,
        &[],
    );
    let lighting = settings.add_subpass(
        vk::Format::B8G8R8A8_SRGB,
        vk::SampleCountFlags::TYPE_1,
        None,
        1,
        0,
        &[0, 1, 2, 3],
    );

    assert_eq!(lighting, 1);
    // 4 color + 1 depth + 1 lighting color
    assert_eq!(settings.attachments.len(), 6);

    let inputs: Vec<u32> = settings.subpasses[1]
        .input_attachment_references
        .iter()
        .map(|r| r.attachment)
        .collect();
    assert_eq!(inputs, vec![0, 1, 2, 3]);
    for reference in &settings.subpasses[1].input_attachment_references {
        assert_eq!(reference.layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
    }

    // The lighting subpass's own color target is the attachment appended
    // after the G-buffer's five.
    assert_eq!(
        settings.subpasses[1].color_attachment_references[0].attachment,
        5
    );
}

#[test]
fn test_input_attachments_are_not_limited_to_a_prefix_range() {
    let mut settings = RenderPassSettings::new();
    settings.add_subpass(
        vk::Format::R16G16B16A16_SFLOAT,
        vk::SampleCountFlags::TYPE_1,
        Some(vk::Format::D32_SFLOAT),
        3,
        0,
        &[],
    );
    // Read only the second and third color attachments, out of order
    settings.add_subpass(
        vk::Format::B8G8R8A8_SRGB,
        vk::SampleCountFlags::TYPE_1,
        None,
        1,
        0,
        &[2, 1],
    );

    let inputs: Vec<u32> = settings.subpasses[1]
        .input_attachment_references
        .iter()
        .map(|r| r.attachment)
        .collect();
    assert_eq!(inputs, vec![2, 1]);
}

#[test]
fn test_every_subpass_gets_an_external_dependency() {
    let mut settings = RenderPassSettings::new();
    settings.add_subpass(
        vk::Format::B8G8R8A8_SRGB,
        vk::SampleCountFlags::TYPE_1,
        None,
        1,
        0,
        &[],
    );
    settings.add_subpass(
        vk::Format::B8G8R8A8_SRGB,
        vk::SampleCountFlags::TYPE_1,
        None,
        1,
        0,
        &[],
    );

    assert_eq!(settings.dependencies.len(), 2);
    assert_eq!(settings.dependencies[0].src_subpass, vk::SUBPASS_EXTERNAL);
    assert_eq!(settings.dependencies[0].dst_subpass, 0);
    assert_eq!(settings.dependencies[1].dst_subpass, 1);
}

#[test]
fn test_input_reader_gets_by_region_dependency_on_previous_subpass() {
    let mut settings = RenderPassSettings::new();
    settings.add_subpass(
        vk::Format::R16G16B16A16_SFLOAT,
        vk::SampleCountFlags::TYPE_1,
        None,
        2,
        0,
        &[],
    );
    settings.add_subpass(
        vk::Format::B8G8R8A8_SRGB,
        vk::SampleCountFlags::TYPE_1,
        None,
        1,
        0,
        &[0, 1],
    );

    // external(0), external(1), 0 -> 1 by-region
    assert_eq!(settings.dependencies.len(), 3);
    let transition = &settings.dependencies[2];
    assert_eq!(transition.src_subpass, 0);
    assert_eq!(transition.dst_subpass, 1);
    assert_eq!(transition.dependency_flags, vk::DependencyFlags::BY_REGION);
    assert_eq!(
        transition.dst_access_mask,
        vk::AccessFlags::INPUT_ATTACHMENT_READ
    );
}

#[test]
fn test_validate_accepts_in_range_references() {
    let mut settings = RenderPassSettings::new();
    settings.add_subpass(
        vk::Format::B8G8R8A8_SRGB,
        vk::SampleCountFlags::TYPE_1,
        Some(vk::Format::D32_SFLOAT),
        4,
        0,
        &[],
    );
    settings.add_subpass(
        vk::Format::B8G8R8A8_SRGB,
        vk::SampleCountFlags::TYPE_1,
        None,
        1,
        0,
        &[0, 1, 2, 3],
    );
    assert!(settings.validate());
}

#[test]
fn test_validate_rejects_out_of_range_input_reference() {
    let mut settings = RenderPassSettings::new();
    settings.add_subpass(
        vk::Format::B8G8R8A8_SRGB,
        vk::SampleCountFlags::TYPE_1,
        None,
        1,
        0,
        // Attachment 7 does not exist
        &[7],
    );
    assert!(!settings.validate());
}

#[test]
fn test_framebuffer_dimensions_resizeable_follows_request() {
    assert_eq!(
        framebuffer_dimensions(true, (800, 600), (1920, 1080)),
        (1920, 1080)
    );
}

#[test]
fn test_framebuffer_dimensions_fixed_pass_keeps_size_across_cycles() {
    // A 1024x1024 shadow pass must survive any number of resize cycles
    let mut dims = (1024, 1024);
    for requested in [(640, 480), (1920, 1080), (333, 777), (1, 1), (4096, 4096)] {
        dims = framebuffer_dimensions(false, dims, requested);
        assert_eq!(dims, (1024, 1024));
    }
}

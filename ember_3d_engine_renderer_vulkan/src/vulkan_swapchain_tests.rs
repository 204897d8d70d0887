//! Unit tests for swap-chain parameter negotiation
//!
//! SwapChainSupport's choices are pure functions of the queried data, so
//! they are tested against hand-built capability sets without a GPU.

use crate::vulkan_swapchain::SwapChainSupport;
use ash::vk;

fn support_with_capabilities(capabilities: vk::SurfaceCapabilitiesKHR) -> SwapChainSupport {
    SwapChainSupport {
        capabilities,
        formats: vec![vk::SurfaceFormatKHR {
            format: vk::Format::B8G8R8A8_SRGB,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }],
        present_modes: vec![vk::PresentModeKHR::FIFO],
    }
}

fn flexible_capabilities(
    min: (u32, u32),
    max: (u32, u32),
) -> vk::SurfaceCapabilitiesKHR {
    vk::SurfaceCapabilitiesKHR {
        current_extent: vk::Extent2D {
            width: u32::MAX,
            height: u32::MAX,
        },
        min_image_extent: vk::Extent2D {
            width: min.0,
            height: min.1,
        },
        max_image_extent: vk::Extent2D {
            width: max.0,
            height: max.1,
        },
        min_image_count: 2,
        max_image_count: 0,
        ..Default::default()
    }
}

#[test]
fn test_choose_extent_uses_fixed_current_extent() {
    let mut capabilities = flexible_capabilities((1, 1), (4096, 4096));
    capabilities.current_extent = vk::Extent2D {
        width: 1280,
        height: 720,
    };
    let support = support_with_capabilities(capabilities);

    let extent = support.choose_extent(1920, 1080);
    assert_eq!(extent.width, 1280);
    assert_eq!(extent.height, 720);
}

#[test]
fn test_choose_extent_clamps_to_surface_limits() {
    let support = support_with_capabilities(flexible_capabilities((200, 150), (2000, 1500)));

    let small = support.choose_extent(1, 1);
    assert_eq!((small.width, small.height), (200, 150));

    let large = support.choose_extent(10_000, 10_000);
    assert_eq!((large.width, large.height), (2000, 1500));

    let inside = support.choose_extent(800, 600);
    assert_eq!((inside.width, inside.height), (800, 600));
}

#[test]
fn test_choose_extent_always_within_limits() {
    let support = support_with_capabilities(flexible_capabilities((16, 16), (3840, 2160)));

    for (w, h) in [(1, 1), (16, 16), (640, 480), (3840, 2160), (9999, 1)] {
        let extent = support.choose_extent(w, h);
        assert!(extent.width >= 16 && extent.width <= 3840);
        assert!(extent.height >= 16 && extent.height <= 2160);
    }
}

#[test]
fn test_choose_format_prefers_bgra_srgb() {
    let mut support = support_with_capabilities(flexible_capabilities((1, 1), (4096, 4096)));
    support.formats = vec![
        vk::SurfaceFormatKHR {
            format: vk::Format::R8G8B8A8_UNORM,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        },
        vk::SurfaceFormatKHR {
            format: vk::Format::B8G8R8A8_SRGB,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        },
    ];

    let format = support.choose_format();
    assert_eq!(format.format, vk::Format::B8G8R8A8_SRGB);
    assert_eq!(format.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
}

#[test]
fn test_choose_format_falls_back_to_first_available() {
    let mut support = support_with_capabilities(flexible_capabilities((1, 1), (4096, 4096)));
    support.formats = vec![
        vk::SurfaceFormatKHR {
            format: vk::Format::R8G8B8A8_UNORM,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        },
        vk::SurfaceFormatKHR {
            format: vk::Format::R8G8B8A8_SRGB,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        },
    ];

    assert_eq!(support.choose_format().format, vk::Format::R8G8B8A8_UNORM);
}

#[test]
fn test_choose_present_mode_prefers_mailbox() {
    let mut support = support_with_capabilities(flexible_capabilities((1, 1), (4096, 4096)));
    support.present_modes = vec![
        vk::PresentModeKHR::FIFO,
        vk::PresentModeKHR::MAILBOX,
        vk::PresentModeKHR::IMMEDIATE,
    ];

    assert_eq!(support.choose_present_mode(), vk::PresentModeKHR::MAILBOX);
}

#[test]
fn test_choose_present_mode_falls_back_to_fifo() {
    let mut support = support_with_capabilities(flexible_capabilities((1, 1), (4096, 4096)));
    support.present_modes = vec![vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO_RELAXED];

    assert_eq!(support.choose_present_mode(), vk::PresentModeKHR::FIFO);
}

#[test]
fn test_is_adequate_requires_formats_and_present_modes() {
    let mut support = support_with_capabilities(flexible_capabilities((1, 1), (4096, 4096)));
    assert!(support.is_adequate());

    support.formats.clear();
    assert!(!support.is_adequate());

    support.formats = vec![vk::SurfaceFormatKHR {
        format: vk::Format::B8G8R8A8_SRGB,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    }];
    support.present_modes.clear();
    assert!(!support.is_adequate());
}

#[test]
fn test_choose_image_count_is_min_plus_one() {
    let support = support_with_capabilities(flexible_capabilities((1, 1), (4096, 4096)));
    assert_eq!(support.choose_image_count(), 3);
}

#[test]
fn test_choose_image_count_clamped_by_max() {
    let mut capabilities = flexible_capabilities((1, 1), (4096, 4096));
    capabilities.min_image_count = 3;
    capabilities.max_image_count = 3;
    let support = support_with_capabilities(capabilities);

    assert_eq!(support.choose_image_count(), 3);
}

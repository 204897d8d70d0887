//! Unit tests for adapter scoring

use crate::vulkan_device::{rate_device, DeviceRating};

fn capable_device() -> DeviceRating {
    DeviceRating {
        discrete: false,
        max_image_dimension2d: 8192,
        has_required_features: true,
        queues_complete: true,
        extensions_supported: true,
        swap_chain_adequate: true,
    }
}

#[test]
fn test_discrete_gpu_outranks_integrated() {
    let integrated = capable_device();
    let discrete = DeviceRating {
        discrete: true,
        ..capable_device()
    };

    assert!(rate_device(&discrete) > rate_device(&integrated));
    assert_eq!(rate_device(&discrete) - rate_device(&integrated), 1000);
}

#[test]
fn test_image_dimension_breaks_ties() {
    let small = DeviceRating {
        max_image_dimension2d: 4096,
        ..capable_device()
    };
    let large = DeviceRating {
        max_image_dimension2d: 16384,
        ..capable_device()
    };

    assert!(rate_device(&large) > rate_device(&small));
}

#[test]
fn test_missing_features_disqualify() {
    let rating = DeviceRating {
        has_required_features: false,
        discrete: true,
        ..capable_device()
    };
    assert_eq!(rate_device(&rating), 0);
}

#[test]
fn test_incomplete_queues_disqualify() {
    let rating = DeviceRating {
        queues_complete: false,
        discrete: true,
        ..capable_device()
    };
    assert_eq!(rate_device(&rating), 0);
}

#[test]
fn test_missing_extensions_disqualify() {
    let rating = DeviceRating {
        extensions_supported: false,
        discrete: true,
        ..capable_device()
    };
    assert_eq!(rate_device(&rating), 0);
}

#[test]
fn test_inadequate_swap_chain_disqualifies() {
    let rating = DeviceRating {
        swap_chain_adequate: false,
        discrete: true,
        ..capable_device()
    };
    assert_eq!(rate_device(&rating), 0);
}

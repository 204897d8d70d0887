//! Unit tests for declarative descriptor binding resolution

use crate::vulkan_descriptor_pool::{frame_resource_index, validate_resource_len};
use crate::vulkan_frame::MAX_FRAMES_IN_FLIGHT;

#[test]
fn test_shared_resource_serves_every_frame_slot() {
    // One key -> the same resource for every frame in flight
    for frame in 0..MAX_FRAMES_IN_FLIGHT {
        assert_eq!(frame_resource_index(1, frame), 0);
    }
}

#[test]
fn test_per_frame_resource_is_indexed_by_slot() {
    for frame in 0..MAX_FRAMES_IN_FLIGHT {
        assert_eq!(frame_resource_index(MAX_FRAMES_IN_FLIGHT, frame), frame);
    }
}

#[test]
fn test_resource_len_must_be_shared_or_strided() {
    assert!(validate_resource_len(1, MAX_FRAMES_IN_FLIGHT));
    assert!(validate_resource_len(MAX_FRAMES_IN_FLIGHT, MAX_FRAMES_IN_FLIGHT));
    assert!(!validate_resource_len(0, MAX_FRAMES_IN_FLIGHT));
    assert!(!validate_resource_len(3, MAX_FRAMES_IN_FLIGHT));
}

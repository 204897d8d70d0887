//! Unit tests for frame-in-flight bookkeeping

use crate::vulkan_frame::{FrameCursor, FrameOutcome, MAX_FRAMES_IN_FLIGHT};

#[test]
fn test_two_frames_in_flight() {
    assert_eq!(MAX_FRAMES_IN_FLIGHT, 2);
}

#[test]
fn test_cursor_starts_at_zero() {
    let cursor = FrameCursor::default();
    assert_eq!(cursor.current(), 0);
}

#[test]
fn test_cursor_advance_sequence() {
    // Five frames from slot 0 must walk 1,0,1,0,1
    let mut cursor = FrameCursor::default();
    let sequence: Vec<usize> = (0..5).map(|_| cursor.advance()).collect();
    assert_eq!(sequence, vec![1, 0, 1, 0, 1]);
}

#[test]
fn test_cursor_never_leaves_range() {
    let mut cursor = FrameCursor::default();
    for _ in 0..1000 {
        let slot = cursor.advance();
        assert!(slot < MAX_FRAMES_IN_FLIGHT);
        assert_eq!(slot, cursor.current());
    }
}

#[test]
fn test_frame_outcome_equality() {
    assert_eq!(FrameOutcome::Rendered, FrameOutcome::Rendered);
    assert_ne!(FrameOutcome::Rendered, FrameOutcome::SkippedOutOfDate);
    assert_ne!(FrameOutcome::SkippedOutOfDate, FrameOutcome::SkippedMinimized);
}

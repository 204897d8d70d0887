use crate::camera::Camera;
use glam::{Vec3, Vec4};

#[test]
fn test_forward_is_unit_length() {
    for (yaw, pitch) in [(0.0, 0.0), (1.2, -0.4), (-2.0, 0.9), (3.1, -1.2)] {
        let camera = Camera {
            yaw,
            pitch,
            ..Camera::default()
        };
        let length = camera.forward().length();
        assert!((length - 1.0).abs() < 1e-5);
    }
}

#[test]
fn test_zero_yaw_pitch_looks_down_negative_z() {
    let camera = Camera {
        yaw: 0.0,
        pitch: 0.0,
        ..Camera::default()
    };
    let forward = camera.forward();
    assert!((forward - Vec3::NEG_Z).length() < 1e-5);
}

#[test]
fn test_view_matrix_moves_camera_to_origin() {
    let camera = Camera {
        position: Vec3::new(2.0, 3.0, 4.0),
        yaw: 0.0,
        pitch: 0.0,
        ..Camera::default()
    };
    let eye = camera.view_matrix() * Vec4::new(2.0, 3.0, 4.0, 1.0);
    assert!(eye.truncate().length() < 1e-4);
}

#[test]
fn test_projection_flips_y_for_vulkan() {
    let camera = Camera::default();
    let projection = camera.projection_matrix(16.0 / 9.0);
    assert!(projection.y_axis.y < 0.0);
}

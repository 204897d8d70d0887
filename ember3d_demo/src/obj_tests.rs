use crate::obj::parse_obj;

const TRIANGLE: &str = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 0.0 1.0
vn 0.0 0.0 1.0
f 1/1/1 2/2/1 3/3/1
";

#[test]
fn test_parse_triangle() {
    let (vertices, indices) = parse_obj(TRIANGLE).unwrap();
    assert_eq!(vertices.len(), 3);
    assert_eq!(indices, vec![0, 1, 2]);
    assert_eq!(vertices[1].position, [1.0, 0.0, 0.0]);
    assert_eq!(vertices[1].uv, [1.0, 0.0]);
    assert_eq!(vertices[1].normal, [0.0, 0.0, 1.0]);
}

#[test]
fn test_quad_is_fan_triangulated() {
    let source = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 1.0 1.0 0.0
v 0.0 1.0 0.0
f 1 2 3 4
";
    let (vertices, indices) = parse_obj(source).unwrap();
    assert_eq!(vertices.len(), 4);
    assert_eq!(indices, vec![0, 1, 2, 0, 2, 3]);
}

#[test]
fn test_shared_corners_are_deduplicated() {
    let source = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 1.0 1.0 0.0
v 0.0 1.0 0.0
f 1 2 3
f 1 3 4
";
    let (vertices, indices) = parse_obj(source).unwrap();
    // Corners 1 and 3 are shared between the two triangles
    assert_eq!(vertices.len(), 4);
    assert_eq!(indices.len(), 6);
}

#[test]
fn test_position_only_and_v_vn_forms() {
    let source = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
vn 0.0 1.0 0.0
f 1//1 2//1 3//1
";
    let (vertices, _) = parse_obj(source).unwrap();
    assert_eq!(vertices[0].normal, [0.0, 1.0, 0.0]);
    assert_eq!(vertices[0].uv, [0.0, 0.0]);
}

#[test]
fn test_negative_indices_resolve_from_the_end() {
    let source = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
f -3 -2 -1
";
    let (vertices, indices) = parse_obj(source).unwrap();
    assert_eq!(vertices.len(), 3);
    assert_eq!(indices, vec![0, 1, 2]);
}

#[test]
fn test_out_of_range_index_is_an_error() {
    let source = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
f 1 2 9
";
    assert!(parse_obj(source).is_err());
}

#[test]
fn test_model_without_faces_is_an_error() {
    assert!(parse_obj("v 0.0 0.0 0.0\n").is_err());
}

#[test]
fn test_comments_and_unknown_records_are_ignored() {
    let source = "\
# a comment
o triangle
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
s off
usemtl none
f 1 2 3
";
    assert!(parse_obj(source).is_ok());
}

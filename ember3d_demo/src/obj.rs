//! Minimal Wavefront OBJ loader
//!
//! Supports v / vt / vn records and faces in the v, v/vt, v//vn and
//! v/vt/vn forms, with fan triangulation for polygons and de-duplication
//! of repeated index triples. Enough for the demo models; anything
//! fancier belongs to a real asset pipeline.

use ember_3d_engine_renderer_vulkan::Vertex;
use std::collections::HashMap;
use std::path::Path;

type IndexTriple = (usize, Option<usize>, Option<usize>);

fn parse_float(token: &str, line_number: usize) -> Result<f32, String> {
    token
        .parse()
        .map_err(|_| format!("Line {}: invalid number '{}'", line_number, token))
}

/// Resolve a 1-based (or negative, relative) OBJ index
fn resolve_index(token: &str, count: usize, line_number: usize) -> Result<usize, String> {
    let value: i64 = token
        .parse()
        .map_err(|_| format!("Line {}: invalid index '{}'", line_number, token))?;

    let resolved = if value > 0 {
        value as usize - 1
    } else if value < 0 {
        let back = (-value) as usize;
        if back > count {
            return Err(format!("Line {}: index '{}' out of range", line_number, token));
        }
        count - back
    } else {
        return Err(format!("Line {}: index 0 is not valid", line_number));
    };

    if resolved >= count {
        return Err(format!("Line {}: index '{}' out of range", line_number, token));
    }
    Ok(resolved)
}

fn parse_face_corner(
    token: &str,
    positions: usize,
    uvs: usize,
    normals: usize,
    line_number: usize,
) -> Result<IndexTriple, String> {
    let mut parts = token.split('/');

    let position = parts
        .next()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| format!("Line {}: malformed face corner '{}'", line_number, token))?;
    let position = resolve_index(position, positions, line_number)?;

    let uv = match parts.next() {
        Some("") | None => None,
        Some(token) => Some(resolve_index(token, uvs, line_number)?),
    };
    let normal = match parts.next() {
        Some("") | None => None,
        Some(token) => Some(resolve_index(token, normals, line_number)?),
    };

    Ok((position, uv, normal))
}

/// Parse OBJ source text into interleaved vertices and triangle indices
pub fn parse_obj(source: &str) -> Result<(Vec<Vertex>, Vec<u32>), String> {
    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut uvs: Vec<[f32; 2]> = Vec::new();
    let mut normals: Vec<[f32; 3]> = Vec::new();

    let mut vertices: Vec<Vertex> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();
    let mut dedup: HashMap<IndexTriple, u32> = HashMap::new();

    for (line_index, line) in source.lines().enumerate() {
        let line_number = line_index + 1;
        let mut tokens = line.split_whitespace();
        let Some(record) = tokens.next() else { continue };

        match record {
            "v" => {
                let mut coords = [0.0f32; 3];
                for coord in &mut coords {
                    let token = tokens
                        .next()
                        .ok_or_else(|| format!("Line {}: incomplete vertex", line_number))?;
                    *coord = parse_float(token, line_number)?;
                }
                positions.push(coords);
            }
            "vt" => {
                let mut coords = [0.0f32; 2];
                for coord in &mut coords {
                    let token = tokens
                        .next()
                        .ok_or_else(|| format!("Line {}: incomplete texcoord", line_number))?;
                    *coord = parse_float(token, line_number)?;
                }
                uvs.push(coords);
            }
            "vn" => {
                let mut coords = [0.0f32; 3];
                for coord in &mut coords {
                    let token = tokens
                        .next()
                        .ok_or_else(|| format!("Line {}: incomplete normal", line_number))?;
                    *coord = parse_float(token, line_number)?;
                }
                normals.push(coords);
            }
            "f" => {
                let corners: Vec<IndexTriple> = tokens
                    .map(|token| {
                        parse_face_corner(
                            token,
                            positions.len(),
                            uvs.len(),
                            normals.len(),
                            line_number,
                        )
                    })
                    .collect::<Result<_, _>>()?;
                if corners.len() < 3 {
                    return Err(format!("Line {}: face needs at least 3 corners", line_number));
                }

                let mut emit = |triple: IndexTriple| -> u32 {
                    *dedup.entry(triple).or_insert_with(|| {
                        let (position, uv, normal) = triple;
                        vertices.push(Vertex {
                            position: positions[position],
                            normal: normal.map(|n| normals[n]).unwrap_or([0.0, 0.0, 1.0]),
                            color: [1.0, 1.0, 1.0],
                            uv: uv.map(|t| uvs[t]).unwrap_or([0.0, 0.0]),
                        });
                        (vertices.len() - 1) as u32
                    })
                };

                // Fan triangulation for quads and larger polygons
                for corner in 1..corners.len() - 1 {
                    indices.push(emit(corners[0]));
                    indices.push(emit(corners[corner]));
                    indices.push(emit(corners[corner + 1]));
                }
            }
            // Comments, groups, materials and the rest are ignored
            _ => {}
        }
    }

    if indices.is_empty() {
        return Err("Model contains no faces".to_string());
    }

    Ok((vertices, indices))
}

/// Load and parse an OBJ file from disk
pub fn load_obj(path: &Path) -> Result<(Vec<Vertex>, Vec<u32>), String> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {:?}: {}", path, e))?;
    parse_obj(&source)
}

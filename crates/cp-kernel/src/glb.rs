//! Binary glTF 2.0 (GLB) writer and reader
//!
//! Supports exactly what the export path produces: one mesh with one
//! triangle primitive (POSITION, NORMAL, u32 indices) and one material.
//! The reader also accepts u8/u16 indices and non-indexed primitives.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mesh::TriangleMesh;

const GLB_MAGIC: u32 = 0x4654_6C67; // "glTF"
const GLB_VERSION: u32 = 2;
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;
const HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;

const COMPONENT_U8: u32 = 5121;
const COMPONENT_U16: u32 = 5123;
const COMPONENT_U32: u32 = 5125;
const COMPONENT_F32: u32 = 5126;
const TARGET_ARRAY_BUFFER: u32 = 34962;
const TARGET_ELEMENT_ARRAY_BUFFER: u32 = 34963;
const MODE_TRIANGLES: u32 = 4;

/// Error type for GLB encoding and decoding
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GlbError {
    #[error("Not a GLB file")]
    InvalidHeader,

    #[error("Unsupported glTF version: {0}")]
    UnsupportedVersion(u32),

    #[error("Missing {0} chunk")]
    MissingChunk(&'static str),

    #[error("Invalid glTF JSON: {0}")]
    Json(String),

    #[error("Invalid accessor: {0}")]
    InvalidAccessor(String),

    #[error("GLB contains no mesh")]
    NoMesh,
}

/// Material applied to the whole mesh
#[derive(Debug, Clone, PartialEq)]
pub struct GlbMaterial {
    /// Material name
    pub name: String,
    /// Linear RGBA base color factor
    pub base_color: [f32; 4],
}

impl Default for GlbMaterial {
    fn default() -> Self {
        Self {
            name: "default".into(),
            base_color: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

/// A decoded GLB model
#[derive(Debug, Clone, PartialEq)]
pub struct GlbModel {
    /// Geometry of the first primitive
    pub mesh: TriangleMesh,
    /// Material of the first primitive (default if none)
    pub material: GlbMaterial,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Root {
    asset: Asset,
    #[serde(default)]
    scene: Option<usize>,
    #[serde(default)]
    scenes: Vec<Scene>,
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    meshes: Vec<Mesh>,
    #[serde(default)]
    materials: Vec<Material>,
    #[serde(default)]
    accessors: Vec<Accessor>,
    #[serde(default)]
    buffer_views: Vec<BufferView>,
    #[serde(default)]
    buffers: Vec<Buffer>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Asset {
    version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    generator: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Scene {
    nodes: Vec<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Node {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mesh: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Mesh {
    primitives: Vec<Primitive>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Primitive {
    attributes: BTreeMap<String, usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    indices: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    material: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mode: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Material {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pbr_metallic_roughness: Option<PbrMetallicRoughness>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    double_sided: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PbrMetallicRoughness {
    #[serde(default = "white")]
    base_color_factor: [f32; 4],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metallic_factor: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    roughness_factor: Option<f32>,
}

fn white() -> [f32; 4] {
    [1.0, 1.0, 1.0, 1.0]
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Accessor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    buffer_view: Option<usize>,
    #[serde(default)]
    byte_offset: usize,
    component_type: u32,
    count: usize,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max: Option<Vec<f32>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BufferView {
    buffer: usize,
    #[serde(default)]
    byte_offset: usize,
    byte_length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    byte_stride: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Buffer {
    byte_length: usize,
}

/// Encode a mesh and its material as a GLB file
pub fn write_glb(mesh: &TriangleMesh, material: &GlbMaterial) -> Result<Vec<u8>, GlbError> {
    let mesh = if mesh.normals.len() == mesh.positions.len() {
        Cow::Borrowed(mesh)
    } else {
        let mut owned = mesh.clone();
        owned.compute_normals();
        Cow::Owned(owned)
    };

    let positions: &[u8] = bytemuck::cast_slice(&mesh.positions);
    let normals: &[u8] = bytemuck::cast_slice(&mesh.normals);
    let indices: &[u8] = bytemuck::cast_slice(&mesh.indices);

    let mut bin = Vec::with_capacity(positions.len() + normals.len() + indices.len());
    let mut views = Vec::new();
    for (data, target) in [
        (positions, TARGET_ARRAY_BUFFER),
        (normals, TARGET_ARRAY_BUFFER),
        (indices, TARGET_ELEMENT_ARRAY_BUFFER),
    ] {
        views.push(BufferView {
            buffer: 0,
            byte_offset: bin.len(),
            byte_length: data.len(),
            byte_stride: None,
            target: Some(target),
        });
        bin.extend_from_slice(data);
    }

    let (min, max) = match mesh.bounds() {
        Some(bounds) => (
            Some(bounds.min.to_array().to_vec()),
            Some(bounds.max.to_array().to_vec()),
        ),
        None => (None, None),
    };

    let root = Root {
        asset: Asset {
            version: "2.0".into(),
            generator: Some(concat!("cadprompt ", env!("CARGO_PKG_VERSION")).into()),
        },
        scene: Some(0),
        scenes: vec![Scene { nodes: vec![0] }],
        nodes: vec![Node { mesh: Some(0) }],
        meshes: vec![Mesh {
            primitives: vec![Primitive {
                attributes: BTreeMap::from([("POSITION".into(), 0), ("NORMAL".into(), 1)]),
                indices: Some(2),
                material: Some(0),
                mode: Some(MODE_TRIANGLES),
            }],
        }],
        materials: vec![Material {
            name: Some(material.name.clone()),
            pbr_metallic_roughness: Some(PbrMetallicRoughness {
                base_color_factor: material.base_color,
                metallic_factor: Some(0.0),
                roughness_factor: Some(0.5),
            }),
            double_sided: true,
        }],
        accessors: vec![
            Accessor {
                buffer_view: Some(0),
                byte_offset: 0,
                component_type: COMPONENT_F32,
                count: mesh.positions.len(),
                kind: "VEC3".into(),
                min,
                max,
            },
            Accessor {
                buffer_view: Some(1),
                byte_offset: 0,
                component_type: COMPONENT_F32,
                count: mesh.normals.len(),
                kind: "VEC3".into(),
                min: None,
                max: None,
            },
            Accessor {
                buffer_view: Some(2),
                byte_offset: 0,
                component_type: COMPONENT_U32,
                count: mesh.indices.len(),
                kind: "SCALAR".into(),
                min: None,
                max: None,
            },
        ],
        buffer_views: views,
        buffers: vec![Buffer {
            byte_length: bin.len(),
        }],
    };

    let mut json = serde_json::to_vec(&root).map_err(|e| GlbError::Json(e.to_string()))?;
    pad_to_four(&mut json, b' ');
    pad_to_four(&mut bin, 0);

    let total = HEADER_LEN + CHUNK_HEADER_LEN * 2 + json.len() + bin.len();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&GLB_VERSION.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(&json);
    out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
    out.extend_from_slice(&bin);
    Ok(out)
}

fn pad_to_four(data: &mut Vec<u8>, fill: u8) {
    while data.len() % 4 != 0 {
        data.push(fill);
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let word = bytes.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([word[0], word[1], word[2], word[3]]))
}

/// Decode the first mesh primitive of a GLB file
pub fn read_glb(bytes: &[u8]) -> Result<GlbModel, GlbError> {
    if read_u32(bytes, 0) != Some(GLB_MAGIC) {
        return Err(GlbError::InvalidHeader);
    }
    let version = read_u32(bytes, 4).ok_or(GlbError::InvalidHeader)?;
    if version != GLB_VERSION {
        return Err(GlbError::UnsupportedVersion(version));
    }
    let total = read_u32(bytes, 8).ok_or(GlbError::InvalidHeader)? as usize;
    let bytes = bytes.get(..total).ok_or(GlbError::InvalidHeader)?;

    let mut json = None;
    let mut bin: &[u8] = &[];
    let mut offset = HEADER_LEN;
    while offset + CHUNK_HEADER_LEN <= bytes.len() {
        let len = read_u32(bytes, offset).ok_or(GlbError::InvalidHeader)? as usize;
        let kind = read_u32(bytes, offset + 4).ok_or(GlbError::InvalidHeader)?;
        let start = offset + CHUNK_HEADER_LEN;
        let data = bytes
            .get(start..start + len)
            .ok_or(GlbError::InvalidHeader)?;
        match kind {
            CHUNK_JSON => json = Some(data),
            CHUNK_BIN => bin = data,
            _ => {}
        }
        offset = start + len;
    }

    let json = json.ok_or(GlbError::MissingChunk("JSON"))?;
    let root: Root = serde_json::from_slice(json).map_err(|e| GlbError::Json(e.to_string()))?;
    if !root.asset.version.starts_with('2') {
        return Err(GlbError::Json(format!(
            "unsupported asset version {}",
            root.asset.version
        )));
    }

    let primitive = root
        .meshes
        .first()
        .and_then(|mesh| mesh.primitives.first())
        .ok_or(GlbError::NoMesh)?;
    if primitive.mode.is_some_and(|mode| mode != MODE_TRIANGLES) {
        return Err(GlbError::InvalidAccessor(
            "only triangle primitives are supported".into(),
        ));
    }

    let position_index = *primitive
        .attributes
        .get("POSITION")
        .ok_or_else(|| GlbError::InvalidAccessor("primitive has no POSITION".into()))?;
    let positions = read_vec3(&root, bin, position_index)?;

    let mut mesh = TriangleMesh {
        indices: match primitive.indices {
            Some(index) => read_indices(&root, bin, index)?,
            None => (0..positions.len() as u32).collect(),
        },
        normals: match primitive.attributes.get("NORMAL") {
            Some(&index) => read_vec3(&root, bin, index)?,
            None => Vec::new(),
        },
        positions,
    };

    if let Some(&bad) = mesh
        .indices
        .iter()
        .find(|&&i| i as usize >= mesh.positions.len())
    {
        return Err(GlbError::InvalidAccessor(format!(
            "index {bad} out of range"
        )));
    }
    if mesh.normals.len() != mesh.positions.len() {
        mesh.compute_normals();
    }

    let material = primitive
        .material
        .and_then(|index| root.materials.get(index))
        .map(|material| GlbMaterial {
            name: material.name.clone().unwrap_or_default(),
            base_color: material
                .pbr_metallic_roughness
                .as_ref()
                .map_or_else(white, |pbr| pbr.base_color_factor),
        })
        .unwrap_or_default();

    Ok(GlbModel { mesh, material })
}

fn accessor_bytes<'a, 'r>(
    root: &'r Root,
    bin: &'a [u8],
    index: usize,
    element_size: usize,
) -> Result<(&'a [u8], &'r Accessor, usize), GlbError> {
    let accessor = root
        .accessors
        .get(index)
        .ok_or_else(|| GlbError::InvalidAccessor(format!("accessor {index} missing")))?;
    let view = accessor
        .buffer_view
        .and_then(|view| root.buffer_views.get(view))
        .ok_or_else(|| GlbError::InvalidAccessor(format!("accessor {index} has no buffer view")))?;
    let stride = view.byte_stride.unwrap_or(element_size);
    if stride < element_size {
        return Err(GlbError::InvalidAccessor(format!(
            "accessor {index} stride {stride} is too small"
        )));
    }
    let start = view.byte_offset + accessor.byte_offset;
    let needed = match accessor.count {
        0 => 0,
        count => stride * (count - 1) + element_size,
    };
    let view_end = view.byte_offset + view.byte_length;
    if start + needed > view_end {
        return Err(GlbError::InvalidAccessor(format!(
            "accessor {index} overruns its buffer view"
        )));
    }
    let data = bin
        .get(start..start + needed)
        .ok_or_else(|| GlbError::InvalidAccessor(format!("accessor {index} overruns BIN chunk")))?;
    Ok((data, accessor, stride))
}

fn read_vec3(root: &Root, bin: &[u8], index: usize) -> Result<Vec<[f32; 3]>, GlbError> {
    let (data, accessor, stride) = accessor_bytes(root, bin, index, 12)?;
    if accessor.component_type != COMPONENT_F32 || accessor.kind != "VEC3" {
        return Err(GlbError::InvalidAccessor(format!(
            "accessor {index} is not a float VEC3"
        )));
    }
    Ok((0..accessor.count)
        .map(|i| bytemuck::pod_read_unaligned::<[f32; 3]>(&data[i * stride..i * stride + 12]))
        .collect())
}

fn read_indices(root: &Root, bin: &[u8], index: usize) -> Result<Vec<u32>, GlbError> {
    let component_type = root
        .accessors
        .get(index)
        .map(|accessor| accessor.component_type)
        .ok_or_else(|| GlbError::InvalidAccessor(format!("accessor {index} missing")))?;
    let size = match component_type {
        COMPONENT_U8 => 1,
        COMPONENT_U16 => 2,
        COMPONENT_U32 => 4,
        other => {
            return Err(GlbError::InvalidAccessor(format!(
                "unsupported index component type {other}"
            )));
        }
    };
    let (data, accessor, stride) = accessor_bytes(root, bin, index, size)?;
    if accessor.kind != "SCALAR" {
        return Err(GlbError::InvalidAccessor(format!(
            "accessor {index} is not SCALAR"
        )));
    }
    Ok((0..accessor.count)
        .map(|i| {
            let at = &data[i * stride..i * stride + size];
            match size {
                1 => at[0] as u32,
                2 => u16::from_le_bytes([at[0], at[1]]) as u32,
                _ => u32::from_le_bytes([at[0], at[1], at[2], at[3]]),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> TriangleMesh {
        TriangleMesh {
            positions: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            normals: vec![[0.0, 0.0, 1.0]; 4],
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }

    #[test]
    fn test_header_and_chunk_alignment() {
        let bytes = write_glb(&quad(), &GlbMaterial::default()).unwrap();
        assert_eq!(&bytes[0..4], b"glTF");
        assert_eq!(read_u32(&bytes, 4), Some(2));
        assert_eq!(read_u32(&bytes, 8), Some(bytes.len() as u32));

        let json_len = read_u32(&bytes, 12).unwrap() as usize;
        assert_eq!(json_len % 4, 0);
        assert_eq!(read_u32(&bytes, 16), Some(CHUNK_JSON));

        let bin_header = HEADER_LEN + CHUNK_HEADER_LEN + json_len;
        let bin_len = read_u32(&bytes, bin_header).unwrap() as usize;
        assert_eq!(bin_len % 4, 0);
        assert_eq!(read_u32(&bytes, bin_header + 4), Some(CHUNK_BIN));
        assert_eq!(bytes.len(), bin_header + CHUNK_HEADER_LEN + bin_len);
    }

    #[test]
    fn test_decoded_model_matches_input() {
        let material = GlbMaterial {
            name: "part".into(),
            base_color: [0.8, 0.2, 0.1, 1.0],
        };
        let bytes = write_glb(&quad(), &material).unwrap();
        let model = read_glb(&bytes).unwrap();
        assert_eq!(model.mesh.triangle_count(), 2);
        assert_eq!(model.mesh, quad());
        assert_eq!(model.material, material);
    }

    #[test]
    fn test_rejects_non_glb() {
        assert_eq!(read_glb(b"not a glb file"), Err(GlbError::InvalidHeader));
        assert_eq!(read_glb(&[]), Err(GlbError::InvalidHeader));
    }

    #[test]
    fn test_rejects_other_versions() {
        let mut bytes = write_glb(&quad(), &GlbMaterial::default()).unwrap();
        bytes[4] = 1;
        assert_eq!(read_glb(&bytes), Err(GlbError::UnsupportedVersion(1)));
    }

    #[test]
    fn test_truncated_file_is_rejected() {
        let bytes = write_glb(&quad(), &GlbMaterial::default()).unwrap();
        assert!(read_glb(&bytes[..bytes.len() - 8]).is_err());
    }

    #[test]
    fn test_missing_normals_are_computed() {
        let mut mesh = quad();
        mesh.normals.clear();
        let bytes = write_glb(&mesh, &GlbMaterial::default()).unwrap();
        let model = read_glb(&bytes).unwrap();
        assert_eq!(model.mesh.normals.len(), 4);
        assert!(model.mesh.normals.iter().all(|n| n[2] > 0.99));
    }
}

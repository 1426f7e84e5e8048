//! Indexed triangle meshes produced by tessellation

use glam::Vec3;

/// Axis-aligned bounding box of a mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Bounds {
    /// Center of the box
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Radius of the bounding sphere around the center
    pub fn radius(&self) -> f32 {
        (self.max - self.min).length() * 0.5
    }
}

/// A tessellated triangle mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleMesh {
    /// Vertex positions
    pub positions: Vec<[f32; 3]>,
    /// Vertex normals (same length as positions)
    pub normals: Vec<[f32; 3]>,
    /// Triangle indices (3 per triangle)
    pub indices: Vec<u32>,
}

impl TriangleMesh {
    /// Create an empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the mesh has no triangles
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Get the number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Append another mesh, offsetting its indices
    pub fn append(&mut self, other: &TriangleMesh) {
        let offset = self.positions.len() as u32;
        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        self.indices.extend(other.indices.iter().map(|i| i + offset));
    }

    /// Recompute smooth vertex normals from face normals
    pub fn compute_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];

        for tri in self.indices.chunks_exact(3) {
            let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            let v0 = Vec3::from(self.positions[i0]);
            let v1 = Vec3::from(self.positions[i1]);
            let v2 = Vec3::from(self.positions[i2]);

            // Area-weighted face normal
            let face_normal = (v1 - v0).cross(v2 - v0);
            normals[i0] += face_normal;
            normals[i1] += face_normal;
            normals[i2] += face_normal;
        }

        self.normals = normals
            .into_iter()
            .map(|n| n.try_normalize().unwrap_or(Vec3::Z).to_array())
            .collect();
    }

    /// Compute the axis-aligned bounds, `None` for an empty mesh
    pub fn bounds(&self) -> Option<Bounds> {
        let first = Vec3::from(*self.positions.first()?);
        let (min, max) = self
            .positions
            .iter()
            .skip(1)
            .fold((first, first), |(min, max), p| {
                let p = Vec3::from(*p);
                (min.min(p), max.max(p))
            });
        Some(Bounds { min, max })
    }

    /// Convert from a Z-up frame (STEP) to a Y-up frame (glTF).
    ///
    /// This is a rotation of -90 degrees around X, so winding is preserved.
    pub fn z_up_to_y_up(&self) -> TriangleMesh {
        let rotate = |[x, y, z]: [f32; 3]| [x, z, -y];
        TriangleMesh {
            positions: self.positions.iter().copied().map(rotate).collect(),
            normals: self.normals.iter().copied().map(rotate).collect(),
            indices: self.indices.clone(),
        }
    }
}

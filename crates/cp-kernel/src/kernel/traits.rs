//! Geometry kernel trait definitions
//!
//! These traits define the interface that all geometry kernels must implement.
//! A kernel reads STEP files from its virtual filesystem into solids, groups
//! solids into documents, meshes them and writes documents out as GLB.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::vfs::VirtualFs;

/// Error type for geometry kernel operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KernelError {
    #[error("STEP read failed: {0}")]
    ReadFailed(String),

    #[error("Shape not found: {0}")]
    ShapeNotFound(Uuid),

    #[error("Document not found: {0}")]
    DocumentNotFound(Uuid),

    #[error("Tessellation failed: {0}")]
    Tessellation(String),

    #[error("GLB write failed: {0}")]
    WriteFailed(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Kernel not available: {0}")]
    NotAvailable(String),
}

/// Result type for kernel operations
pub type KernelResult<T> = Result<T, KernelError>;

/// A solid read from a STEP file
///
/// The geometry itself is stored in the kernel; this is only a handle.
/// A null solid means the file parsed but contained no usable shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Solid {
    /// Unique identifier
    pub id: Uuid,
    null: bool,
}

impl Solid {
    /// Create a handle to stored geometry
    pub fn new(id: Uuid) -> Self {
        Self { id, null: false }
    }

    /// Create the "no valid shape" handle
    pub fn null() -> Self {
        Self {
            id: Uuid::nil(),
            null: true,
        }
    }

    /// Check if this is the "no valid shape" handle
    pub fn is_null(&self) -> bool {
        self.null
    }
}

/// Handle to a kernel document (a container of shapes to export)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(pub Uuid);

/// Tessellation tolerances
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeshTolerance {
    /// Linear deflection in model units
    pub linear: f64,
    /// Angular deflection in radians
    pub angular: f64,
}

impl Default for MeshTolerance {
    fn default() -> Self {
        Self {
            linear: 0.1,
            angular: 0.1,
        }
    }
}

/// Options for writing a document as GLB
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlbWriteOptions {
    /// RGB color applied to every face
    pub base_color: [f32; 3],
}

impl Default for GlbWriteOptions {
    fn default() -> Self {
        Self {
            base_color: [1.0, 1.0, 1.0],
        }
    }
}

/// Geometry kernel trait
///
/// All geometry kernels must implement this trait to provide STEP import,
/// meshing and GLB export.
pub trait GeometryKernel: Send + Sync {
    /// Get the name of this kernel
    fn name(&self) -> &str;

    /// Check if this kernel is available
    fn is_available(&self) -> bool;

    /// The virtual filesystem this kernel reads from and writes to
    fn fs(&self) -> &VirtualFs;

    /// Read a STEP file from the virtual filesystem.
    ///
    /// Returns a null solid when the file contains no shape.
    fn read_step(&self, path: &str) -> KernelResult<Solid>;

    /// Create an empty document
    fn new_document(&self) -> DocumentId;

    /// Add a solid to a document
    fn add_shape(&self, document: DocumentId, solid: &Solid) -> KernelResult<()>;

    /// Mesh a solid in place so later writers can use the triangulation
    fn incremental_mesh(&self, solid: &Solid, tolerance: MeshTolerance) -> KernelResult<()>;

    /// Write every shape of a document as a GLB file into the virtual filesystem
    fn write_glb(
        &self,
        document: DocumentId,
        path: &str,
        options: &GlbWriteOptions,
    ) -> KernelResult<()>;

    /// Close a document. Shapes added to it stay alive.
    fn close_document(&self, document: DocumentId);

    /// Release a solid's stored geometry
    fn release(&self, solid: &Solid);
}

/// Null kernel that returns errors for all operations
///
/// Used when no kernel backend is compiled in.
#[derive(Debug, Default)]
pub struct NullKernel {
    fs: VirtualFs,
}

impl NullKernel {
    fn unavailable<T>() -> KernelResult<T> {
        Err(KernelError::NotAvailable(
            "No geometry kernel available".into(),
        ))
    }
}

impl GeometryKernel for NullKernel {
    fn name(&self) -> &str {
        "null"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn fs(&self) -> &VirtualFs {
        &self.fs
    }

    fn read_step(&self, _path: &str) -> KernelResult<Solid> {
        Self::unavailable()
    }

    fn new_document(&self) -> DocumentId {
        DocumentId(Uuid::nil())
    }

    fn add_shape(&self, _document: DocumentId, _solid: &Solid) -> KernelResult<()> {
        Self::unavailable()
    }

    fn incremental_mesh(&self, _solid: &Solid, _tolerance: MeshTolerance) -> KernelResult<()> {
        Self::unavailable()
    }

    fn write_glb(
        &self,
        _document: DocumentId,
        _path: &str,
        _options: &GlbWriteOptions,
    ) -> KernelResult<()> {
        Self::unavailable()
    }

    fn close_document(&self, _document: DocumentId) {}

    fn release(&self, _solid: &Solid) {}
}

/// Get the default geometry kernel based on available features
pub fn default_kernel() -> Box<dyn GeometryKernel> {
    #[cfg(feature = "truck")]
    {
        Box::new(super::TruckKernel::new())
    }

    #[cfg(not(feature = "truck"))]
    {
        Box::new(NullKernel::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_solid() {
        assert!(Solid::null().is_null());
        assert!(!Solid::new(Uuid::new_v4()).is_null());
    }

    #[test]
    fn test_default_tolerance() {
        let tolerance = MeshTolerance::default();
        assert_eq!(tolerance.linear, 0.1);
        assert_eq!(tolerance.angular, 0.1);
    }

    #[test]
    fn test_null_kernel_is_unavailable() {
        let kernel = NullKernel::default();
        assert!(!kernel.is_available());
        assert!(matches!(
            kernel.read_step("/stage/a.step"),
            Err(KernelError::NotAvailable(_))
        ));
    }
}

//! Geometry Kernel Abstraction
//!
//! This crate provides:
//! - The `GeometryKernel` trait: STEP reading, documents, meshing, GLB writing
//! - An in-memory virtual filesystem the kernel reads from and writes to
//! - A pure Rust kernel backed by the Truck B-Rep stack
//! - A minimal binary glTF (GLB) codec

pub mod glb;
pub mod kernel;
pub mod mesh;
pub mod vfs;

// Re-exports for convenience
pub use glb::{GlbError, GlbMaterial, GlbModel, read_glb, write_glb};
pub use kernel::{
    DocumentId, GeometryKernel, GlbWriteOptions, KernelError, KernelResult, MeshTolerance,
    NullKernel, Solid, default_kernel,
};
#[cfg(feature = "truck")]
pub use kernel::TruckKernel;
pub use mesh::{Bounds, TriangleMesh};
pub use vfs::{StagedFile, VirtualFs, unique_path};

//! Mesh export adapter: solid to a registered GLB resource

use cp_kernel::{
    DocumentId, GeometryKernel, GlbWriteOptions, KernelResult, MeshTolerance, Solid, StagedFile,
    unique_path,
};

use crate::error::LoadError;
use crate::resource::{GLB_MIME, ResourceRegistry};

use super::MeshResource;

/// How a solid is meshed and colored on export
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportOptions {
    pub color: [f32; 3],
    pub tolerance: MeshTolerance,
}

/// Mesh `solid`, write it as GLB and register the bytes.
///
/// The document is closed and the export file unlinked whether or not
/// this succeeds.
pub fn export_mesh(
    kernel: &dyn GeometryKernel,
    registry: &ResourceRegistry,
    solid: &Solid,
    options: &ExportOptions,
) -> Result<MeshResource, LoadError> {
    let document = kernel.new_document();
    let written = write_document(kernel, document, solid, options);
    kernel.close_document(document);

    let bytes = written.map_err(|e| LoadError::Export(e.to_string()))?;
    if bytes.is_empty() {
        return Err(LoadError::Export("GLB writer produced no data".into()));
    }

    let byte_len = bytes.len();
    let url = registry.create_object_url(bytes, GLB_MIME);
    tracing::info!(%url, byte_len, "Exported mesh");
    Ok(MeshResource { url, byte_len })
}

fn write_document(
    kernel: &dyn GeometryKernel,
    document: DocumentId,
    solid: &Solid,
    options: &ExportOptions,
) -> KernelResult<Vec<u8>> {
    kernel.add_shape(document, solid)?;
    kernel.incremental_mesh(solid, options.tolerance)?;

    let output = StagedFile::reserve(kernel.fs(), unique_path("export", "glb"));
    kernel.write_glb(
        document,
        output.path(),
        &GlbWriteOptions {
            base_color: options.color,
        },
    )?;
    output.read()
}

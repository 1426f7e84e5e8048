//! Geometry kernel adapter: raw STEP bytes to a solid

use cp_kernel::{GeometryKernel, Solid, StagedFile, unique_path};

use crate::error::LoadError;

/// Stage `bytes` in the kernel's filesystem and read them as a STEP model.
///
/// The staged file is unlinked on every exit path. A null solid is released
/// and reported as [`LoadError::InvalidGeometry`].
pub fn read_solid(kernel: &dyn GeometryKernel, bytes: Vec<u8>) -> Result<Solid, LoadError> {
    let staged = StagedFile::create(kernel.fs(), unique_path("stage", "step"), bytes);
    tracing::debug!(path = staged.path(), "Staged STEP file");

    let solid = kernel
        .read_step(staged.path())
        .map_err(|e| LoadError::Parse(e.to_string()))?;

    if solid.is_null() {
        kernel.release(&solid);
        return Err(LoadError::InvalidGeometry);
    }
    Ok(solid)
}

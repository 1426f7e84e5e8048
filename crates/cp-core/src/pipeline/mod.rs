//! STEP-to-GLB load pipeline
//!
//! fetch → stage + read (kernel adapter) → mesh + write GLB (export adapter)
//! → register as a resource URL. Cancellation and the deadline are checked
//! between stages; kernel calls themselves run to completion.

mod export;
mod stage;

pub use export::{ExportOptions, export_mesh};
pub use stage::read_solid;

use cp_kernel::MeshTolerance;

use crate::cancel::LoadToken;
use crate::command::Command;
use crate::context::KernelContext;
use crate::error::LoadError;
use crate::fetch::ResourceFetcher;
use crate::resource::{ResourceRegistry, ResourceUrl};

/// A model to load
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    /// Static resource path of the STEP file
    pub path: String,
    /// RGB color applied to the whole model
    pub color: [f32; 3],
    /// Tessellation tolerance
    pub tolerance: MeshTolerance,
}

impl LoadRequest {
    /// Request for a `LoadStep` command, `None` for other commands
    pub fn from_command(command: &Command, tolerance: MeshTolerance) -> Option<Self> {
        match command {
            Command::LoadStep { path, color } => Some(Self {
                path: path.clone(),
                color: *color,
                tolerance,
            }),
        }
    }
}

/// A registered GLB ready for the viewer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshResource {
    pub url: ResourceUrl,
    pub byte_len: usize,
}

/// Run the whole pipeline for one request.
///
/// The solid is released whatever happens after it was read. If the load is
/// cancelled after export, the new resource is revoked before returning.
pub async fn load_model<F: ResourceFetcher>(
    context: &KernelContext,
    fetcher: &F,
    registry: &ResourceRegistry,
    request: &LoadRequest,
    token: &LoadToken,
) -> Result<MeshResource, LoadError> {
    let kernel = context.kernel()?;
    token.check()?;

    tracing::info!(path = %request.path, kernel = kernel.name(), "Loading STEP file");
    let bytes = fetcher.fetch(&request.path).await?;
    tracing::debug!(path = %request.path, bytes = bytes.len(), "Fetched STEP file");
    token.check()?;

    let solid = read_solid(kernel.as_ref(), bytes)?;
    let exported = token.check().and_then(|()| {
        export_mesh(
            kernel.as_ref(),
            registry,
            &solid,
            &ExportOptions {
                color: request.color,
                tolerance: request.tolerance,
            },
        )
    });
    kernel.release(&solid);
    let resource = exported?;

    if let Err(e) = token.check() {
        registry.revoke(&resource.url);
        return Err(e);
    }
    Ok(resource)
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use cp_kernel::{
        DocumentId, GeometryKernel, GlbMaterial, GlbWriteOptions, KernelError, KernelResult,
        Solid, TriangleMesh, VirtualFs, read_glb, write_glb,
    };
    use parking_lot::Mutex;
    use uuid::Uuid;

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    enum Behavior {
        #[default]
        Succeed,
        ParseError,
        NullShape,
        MeshError,
        EmptyOutput,
    }

    /// Kernel that records its calls and fails on demand
    #[derive(Default)]
    struct MockKernel {
        fs: VirtualFs,
        behavior: Behavior,
        solids: Mutex<HashSet<Uuid>>,
        documents: Mutex<HashSet<Uuid>>,
        calls: Mutex<Vec<&'static str>>,
        read_paths: Mutex<Vec<String>>,
        cancel_on_write: Option<LoadToken>,
    }

    impl MockKernel {
        fn with(behavior: Behavior) -> Self {
            Self {
                behavior,
                ..Default::default()
            }
        }

        fn called(&self, name: &str) -> bool {
            self.calls.lock().iter().any(|call| *call == name)
        }
    }

    impl GeometryKernel for MockKernel {
        fn name(&self) -> &str {
            "mock"
        }

        fn is_available(&self) -> bool {
            true
        }

        fn fs(&self) -> &VirtualFs {
            &self.fs
        }

        fn read_step(&self, path: &str) -> KernelResult<Solid> {
            self.calls.lock().push("read_step");
            self.read_paths.lock().push(path.to_string());
            self.fs.read_file(path)?;
            match self.behavior {
                Behavior::ParseError => Err(KernelError::ReadFailed("bad header".into())),
                Behavior::NullShape => Ok(Solid::null()),
                _ => {
                    let id = Uuid::new_v4();
                    self.solids.lock().insert(id);
                    Ok(Solid::new(id))
                }
            }
        }

        fn new_document(&self) -> DocumentId {
            self.calls.lock().push("new_document");
            let id = Uuid::new_v4();
            self.documents.lock().insert(id);
            DocumentId(id)
        }

        fn add_shape(&self, document: DocumentId, solid: &Solid) -> KernelResult<()> {
            self.calls.lock().push("add_shape");
            if !self.documents.lock().contains(&document.0) {
                return Err(KernelError::DocumentNotFound(document.0));
            }
            if !self.solids.lock().contains(&solid.id) {
                return Err(KernelError::ShapeNotFound(solid.id));
            }
            Ok(())
        }

        fn incremental_mesh(&self, _solid: &Solid, tolerance: MeshTolerance) -> KernelResult<()> {
            self.calls.lock().push("incremental_mesh");
            assert_eq!(tolerance, MeshTolerance::default());
            match self.behavior {
                Behavior::MeshError => Err(KernelError::Tessellation("degenerate face".into())),
                _ => Ok(()),
            }
        }

        fn write_glb(
            &self,
            _document: DocumentId,
            path: &str,
            options: &GlbWriteOptions,
        ) -> KernelResult<()> {
            self.calls.lock().push("write_glb");
            if let Some(token) = &self.cancel_on_write {
                token.cancel();
            }
            let bytes = match self.behavior {
                Behavior::EmptyOutput => Vec::new(),
                _ => {
                    let [r, g, b] = options.base_color;
                    let mesh = TriangleMesh {
                        positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                        normals: vec![[0.0, 0.0, 1.0]; 3],
                        indices: vec![0, 1, 2],
                    };
                    let material = GlbMaterial {
                        name: "mock".into(),
                        base_color: [r, g, b, 1.0],
                    };
                    write_glb(&mesh, &material)
                        .map_err(|e| KernelError::WriteFailed(e.to_string()))?
                }
            };
            self.fs.write_file(path, bytes);
            Ok(())
        }

        fn close_document(&self, document: DocumentId) {
            self.calls.lock().push("close_document");
            self.documents.lock().remove(&document.0);
        }

        fn release(&self, solid: &Solid) {
            self.calls.lock().push("release");
            self.solids.lock().remove(&solid.id);
        }
    }

    /// Serves files from memory
    #[derive(Default)]
    struct MemoryFetcher {
        files: HashMap<String, Vec<u8>>,
        fetches: AtomicUsize,
        cancel_on_fetch: Option<LoadToken>,
    }

    impl MemoryFetcher {
        fn with_file(path: &str) -> Self {
            Self {
                files: HashMap::from([(path.to_string(), b"ISO-10303-21;".to_vec())]),
                ..Default::default()
            }
        }
    }

    impl ResourceFetcher for MemoryFetcher {
        async fn fetch(&self, path: &str) -> Result<Vec<u8>, LoadError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if let Some(token) = &self.cancel_on_fetch {
                token.cancel();
            }
            self.files.get(path).cloned().ok_or_else(|| LoadError::Fetch {
                path: path.to_string(),
                status: 404,
            })
        }
    }

    const PATH: &str = "/gear.step";

    fn request() -> LoadRequest {
        LoadRequest {
            path: PATH.into(),
            color: [0.25, 0.5, 0.75],
            tolerance: MeshTolerance::default(),
        }
    }

    fn run(
        kernel: &Arc<MockKernel>,
        fetcher: &MemoryFetcher,
        registry: &ResourceRegistry,
        token: &LoadToken,
    ) -> Result<MeshResource, LoadError> {
        let context = KernelContext::ready(kernel.clone());
        pollster::block_on(load_model(&context, fetcher, registry, &request(), token))
    }

    fn assert_clean(kernel: &MockKernel) {
        assert!(kernel.fs.is_empty(), "virtual filesystem not cleaned up");
        assert!(kernel.solids.lock().is_empty(), "solid not released");
        assert!(kernel.documents.lock().is_empty(), "document not closed");
    }

    #[test]
    fn test_successful_load_registers_colored_glb() {
        let kernel = Arc::new(MockKernel::default());
        let registry = ResourceRegistry::new();
        let resource = run(
            &kernel,
            &MemoryFetcher::with_file(PATH),
            &registry,
            &LoadToken::unbounded(),
        )
        .unwrap();

        let blob = registry.resolve(&resource.url).unwrap();
        assert_eq!(blob.bytes.len(), resource.byte_len);
        let model = read_glb(&blob.bytes).unwrap();
        assert_eq!(model.material.base_color, [0.25, 0.5, 0.75, 1.0]);
        assert_eq!(model.mesh.triangle_count(), 1);
        assert_clean(&kernel);
    }

    #[test]
    fn test_kernel_stages_follow_adapter_order() {
        let kernel = Arc::new(MockKernel::default());
        run(
            &kernel,
            &MemoryFetcher::with_file(PATH),
            &ResourceRegistry::new(),
            &LoadToken::unbounded(),
        )
        .unwrap();
        assert_eq!(
            *kernel.calls.lock(),
            vec![
                "read_step",
                "new_document",
                "add_shape",
                "incremental_mesh",
                "write_glb",
                "close_document",
                "release",
            ]
        );
    }

    #[test]
    fn test_parse_failure() {
        let kernel = Arc::new(MockKernel::with(Behavior::ParseError));
        let registry = ResourceRegistry::new();
        let err = run(
            &kernel,
            &MemoryFetcher::with_file(PATH),
            &registry,
            &LoadToken::unbounded(),
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::Parse(_)));
        assert!(!kernel.called("new_document"));
        assert!(registry.is_empty());
        assert_clean(&kernel);
    }

    #[test]
    fn test_null_shape_never_reaches_export() {
        let kernel = Arc::new(MockKernel::with(Behavior::NullShape));
        let registry = ResourceRegistry::new();
        let err = run(
            &kernel,
            &MemoryFetcher::with_file(PATH),
            &registry,
            &LoadToken::unbounded(),
        )
        .unwrap_err();
        assert_eq!(err, LoadError::InvalidGeometry);
        assert!(!kernel.called("new_document"));
        assert!(!kernel.called("write_glb"));
        assert!(registry.is_empty());
        assert_clean(&kernel);
    }

    #[test]
    fn test_mesh_failure_cleans_up() {
        let kernel = Arc::new(MockKernel::with(Behavior::MeshError));
        let registry = ResourceRegistry::new();
        let err = run(
            &kernel,
            &MemoryFetcher::with_file(PATH),
            &registry,
            &LoadToken::unbounded(),
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::Export(_)));
        assert!(registry.is_empty());
        assert_clean(&kernel);
    }

    #[test]
    fn test_empty_output_is_export_error() {
        let kernel = Arc::new(MockKernel::with(Behavior::EmptyOutput));
        let registry = ResourceRegistry::new();
        let err = run(
            &kernel,
            &MemoryFetcher::with_file(PATH),
            &registry,
            &LoadToken::unbounded(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            LoadError::Export("GLB writer produced no data".into())
        );
        assert!(registry.is_empty());
        assert_clean(&kernel);
    }

    #[test]
    fn test_kernel_not_ready_skips_fetch() {
        let fetcher = MemoryFetcher::with_file(PATH);
        let err = pollster::block_on(load_model(
            &KernelContext::new(),
            &fetcher,
            &ResourceRegistry::new(),
            &request(),
            &LoadToken::unbounded(),
        ))
        .unwrap_err();
        assert_eq!(err, LoadError::KernelNotReady("uninitialized".into()));
        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_fetch_failure_skips_kernel() {
        let kernel = Arc::new(MockKernel::default());
        let err = run(
            &kernel,
            &MemoryFetcher::default(),
            &ResourceRegistry::new(),
            &LoadToken::unbounded(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            LoadError::Fetch {
                path: PATH.into(),
                status: 404,
            }
        );
        assert!(kernel.calls.lock().is_empty());
    }

    #[test]
    fn test_cancelled_before_start() {
        let kernel = Arc::new(MockKernel::default());
        let fetcher = MemoryFetcher::with_file(PATH);
        let token = LoadToken::unbounded();
        token.cancel();
        let err = run(&kernel, &fetcher, &ResourceRegistry::new(), &token).unwrap_err();
        assert_eq!(err, LoadError::Cancelled);
        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancelled_during_fetch_skips_kernel() {
        let kernel = Arc::new(MockKernel::default());
        let token = LoadToken::unbounded();
        let fetcher = MemoryFetcher {
            cancel_on_fetch: Some(token.clone()),
            ..MemoryFetcher::with_file(PATH)
        };
        let err = run(&kernel, &fetcher, &ResourceRegistry::new(), &token).unwrap_err();
        assert_eq!(err, LoadError::Cancelled);
        assert!(kernel.calls.lock().is_empty());
    }

    #[test]
    fn test_cancelled_during_export_revokes_resource() {
        let token = LoadToken::unbounded();
        let kernel = Arc::new(MockKernel {
            cancel_on_write: Some(token.clone()),
            ..Default::default()
        });
        let registry = ResourceRegistry::new();
        let err = run(&kernel, &MemoryFetcher::with_file(PATH), &registry, &token).unwrap_err();
        assert_eq!(err, LoadError::Cancelled);
        assert!(registry.is_empty());
        assert_clean(&kernel);
    }

    #[test]
    fn test_timed_out_load() {
        let kernel = Arc::new(MockKernel::default());
        let token = LoadToken::new(Some(std::time::Duration::ZERO));
        let err = run(
            &kernel,
            &MemoryFetcher::with_file(PATH),
            &ResourceRegistry::new(),
            &token,
        )
        .unwrap_err();
        assert_eq!(err, LoadError::TimedOut(0));
    }

    #[test]
    fn test_overlapping_loads_use_distinct_staging_names() {
        let kernel = Arc::new(MockKernel::default());
        let fetcher = MemoryFetcher::with_file(PATH);
        let registry = ResourceRegistry::new();
        let first = run(&kernel, &fetcher, &registry, &LoadToken::unbounded()).unwrap();
        let second = run(&kernel, &fetcher, &registry, &LoadToken::unbounded()).unwrap();

        let paths = kernel.read_paths.lock();
        assert_eq!(paths.len(), 2);
        assert_ne!(paths[0], paths[1]);
        assert!(paths.iter().all(|p| p.starts_with("/stage/")));
        assert_ne!(first.url, second.url);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_request_from_command() {
        let command = Command::LoadStep {
            path: PATH.into(),
            color: [1.0, 0.0, 0.0],
        };
        let request = LoadRequest::from_command(&command, MeshTolerance::default()).unwrap();
        assert_eq!(request.path, PATH);
        assert_eq!(request.color, [1.0, 0.0, 0.0]);
    }
}

//! Truck Geometry Kernel Backend
//!
//! Pure Rust B-Rep kernel using the Truck library. STEP files are parsed
//! with `ruststep` and converted through `truck-stepio`; shells are
//! triangulated with `truck-meshalgo`.

use std::collections::HashMap;
use std::sync::Arc;

use glam::DMat4;
use parking_lot::Mutex;
use uuid::Uuid;

use truck_meshalgo::prelude::*;
use truck_stepio::r#in::Table;

use super::placement::shell_placements;
use super::{
    DocumentId, GeometryKernel, GlbWriteOptions, KernelError, KernelResult, MeshTolerance, Solid,
};
use crate::glb::{GlbMaterial, write_glb};
use crate::mesh::TriangleMesh;
use crate::vfs::VirtualFs;

/// One placed occurrence of a shell
#[derive(Debug, Clone, Copy, PartialEq)]
struct ShellInstance {
    shell: u64,
    placement: DMat4,
}

/// A STEP model held by the kernel
struct StepShape {
    table: Arc<Table>,
    /// Placed shells, sorted by shell id
    shells: Vec<ShellInstance>,
    /// Triangulation from the last `incremental_mesh` call
    mesh: Option<TriangleMesh>,
}

/// Truck-based geometry kernel
pub struct TruckKernel {
    fs: VirtualFs,
    /// Storage for shape data (keyed by UUID)
    shapes: Mutex<HashMap<Uuid, StepShape>>,
    /// Open documents and the shapes added to them
    documents: Mutex<HashMap<Uuid, Vec<Uuid>>>,
}

impl TruckKernel {
    /// Create a new Truck kernel
    pub fn new() -> Self {
        Self {
            fs: VirtualFs::new(),
            shapes: Mutex::new(HashMap::new()),
            documents: Mutex::new(HashMap::new()),
        }
    }

    /// Number of shapes currently held
    pub fn shape_count(&self) -> usize {
        self.shapes.lock().len()
    }

    /// Triangulate every placed shell into one mesh (Z-up, model units).
    ///
    /// Each shell is triangulated once and appended for every instance.
    fn triangulate(
        table: &Table,
        shells: &[ShellInstance],
        tolerance: f64,
    ) -> KernelResult<TriangleMesh> {
        let mut mesh = TriangleMesh::new();
        let mut polygons: HashMap<u64, Vec<PolygonMesh>> = HashMap::new();
        for instance in shells {
            if !polygons.contains_key(&instance.shell) {
                let Some(holder) = table.shell.get(&instance.shell) else {
                    continue;
                };
                let compressed = table.to_compressed_shell(holder).map_err(|e| {
                    KernelError::Tessellation(format!(
                        "shell #{} is not valid topology: {e}",
                        instance.shell
                    ))
                })?;
                let poly_shell = compressed.robust_triangulation(tolerance);
                let faces = poly_shell
                    .faces
                    .iter()
                    .filter_map(|face| {
                        let surface = face.surface.as_ref()?;
                        Some(match face.orientation {
                            true => surface.clone(),
                            false => surface.inverse(),
                        })
                    })
                    .collect();
                polygons.insert(instance.shell, faces);
            }

            for polygon in polygons.get(&instance.shell).into_iter().flatten() {
                append_polygon(&mut mesh, polygon, &instance.placement);
            }
        }
        Ok(mesh)
    }
}

impl Default for TruckKernel {
    fn default() -> Self {
        Self::new()
    }
}

/// Append a truck polygon mesh moved by `placement`, splitting quads and fans
/// into triangles
fn append_polygon(mesh: &mut TriangleMesh, polygon: &PolygonMesh, placement: &DMat4) {
    let positions = polygon.positions();
    let normals = polygon.normals();

    let mut corners: Vec<(usize, Option<usize>)> = Vec::new();
    for tri in polygon.tri_faces() {
        corners.extend(tri.iter().map(|v| (v.pos, v.nor)));
    }
    for quad in polygon.quad_faces() {
        corners.extend(
            [quad[0], quad[1], quad[2], quad[0], quad[2], quad[3]]
                .iter()
                .map(|v| (v.pos, v.nor)),
        );
    }
    for face in polygon.other_faces() {
        if face.len() < 3 {
            continue;
        }
        let first = (face[0].pos, face[0].nor);
        for pair in face[1..].windows(2) {
            corners.extend([first, (pair[0].pos, pair[0].nor), (pair[1].pos, pair[1].nor)]);
        }
    }

    let mut remap: HashMap<(usize, Option<usize>), u32> = HashMap::new();
    let mut missing_normals = false;
    for (pos, nor) in corners {
        let index = *remap.entry((pos, nor)).or_insert_with(|| {
            let p = positions[pos];
            let p = placement.transform_point3(glam::DVec3::new(p.x, p.y, p.z));
            mesh.positions.push(p.as_vec3().to_array());
            let normal = nor
                .and_then(|n| normals.get(n))
                .and_then(|n| {
                    placement
                        .transform_vector3(glam::DVec3::new(n.x, n.y, n.z))
                        .try_normalize()
                });
            match normal {
                Some(n) => mesh.normals.push(n.as_vec3().to_array()),
                None => {
                    missing_normals = true;
                    mesh.normals.push([0.0, 0.0, 0.0]);
                }
            }
            (mesh.positions.len() - 1) as u32
        });
        mesh.indices.push(index);
    }

    if missing_normals {
        mesh.compute_normals();
    }
}

impl GeometryKernel for TruckKernel {
    fn name(&self) -> &str {
        "truck"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn fs(&self) -> &VirtualFs {
        &self.fs
    }

    fn read_step(&self, path: &str) -> KernelResult<Solid> {
        let bytes = self.fs.read_file(path)?;
        let raw = String::from_utf8(bytes)
            .map_err(|_| KernelError::ReadFailed(format!("{path} is not a text STEP file")))?;

        let exchange = ruststep::parser::parse(&raw)
            .map_err(|e| KernelError::ReadFailed(format!("{path}: {e}")))?;
        let Some(section) = exchange.data.first() else {
            return Err(KernelError::ReadFailed(format!(
                "{path} has no DATA section"
            )));
        };
        let table = Table::from_data_section(section);

        let mut shell_ids: Vec<u64> = table.shell.keys().copied().collect();
        if shell_ids.is_empty() {
            tracing::warn!(path, "STEP file contains no shells");
            return Ok(Solid::null());
        }
        shell_ids.sort_unstable();

        let mut placements = shell_placements(&raw);
        let shells: Vec<ShellInstance> = shell_ids
            .into_iter()
            .flat_map(|shell| {
                placements
                    .remove(&shell)
                    .unwrap_or_else(|| vec![DMat4::IDENTITY])
                    .into_iter()
                    .map(move |placement| ShellInstance { shell, placement })
            })
            .collect();

        let id = Uuid::new_v4();
        tracing::debug!(path, %id, instances = shells.len(), "Read STEP model");
        self.shapes.lock().insert(
            id,
            StepShape {
                table: Arc::new(table),
                shells,
                mesh: None,
            },
        );
        Ok(Solid::new(id))
    }

    fn new_document(&self) -> DocumentId {
        let id = Uuid::new_v4();
        self.documents.lock().insert(id, Vec::new());
        DocumentId(id)
    }

    fn add_shape(&self, document: DocumentId, solid: &Solid) -> KernelResult<()> {
        if !self.shapes.lock().contains_key(&solid.id) {
            return Err(KernelError::ShapeNotFound(solid.id));
        }
        let mut documents = self.documents.lock();
        let shapes = documents
            .get_mut(&document.0)
            .ok_or(KernelError::DocumentNotFound(document.0))?;
        shapes.push(solid.id);
        Ok(())
    }

    fn incremental_mesh(&self, solid: &Solid, tolerance: MeshTolerance) -> KernelResult<()> {
        // Triangulation can be slow; do it without holding the lock.
        let (table, shells) = {
            let shapes = self.shapes.lock();
            let shape = shapes
                .get(&solid.id)
                .ok_or(KernelError::ShapeNotFound(solid.id))?;
            (Arc::clone(&shape.table), shape.shells.clone())
        };

        if !(tolerance.linear.is_finite() && tolerance.linear > 0.0) {
            return Err(KernelError::Tessellation(format!(
                "invalid linear tolerance {}",
                tolerance.linear
            )));
        }
        let mesh = Self::triangulate(&table, &shells, tolerance.linear)?;
        if mesh.is_empty() {
            return Err(KernelError::Tessellation(
                "triangulation produced no triangles".into(),
            ));
        }
        tracing::debug!(
            id = %solid.id,
            triangles = mesh.triangle_count(),
            linear = tolerance.linear,
            angular = tolerance.angular,
            "Meshed solid"
        );

        let mut shapes = self.shapes.lock();
        let shape = shapes
            .get_mut(&solid.id)
            .ok_or(KernelError::ShapeNotFound(solid.id))?;
        shape.mesh = Some(mesh);
        Ok(())
    }

    fn write_glb(
        &self,
        document: DocumentId,
        path: &str,
        options: &GlbWriteOptions,
    ) -> KernelResult<()> {
        let shape_ids = self
            .documents
            .lock()
            .get(&document.0)
            .cloned()
            .ok_or(KernelError::DocumentNotFound(document.0))?;

        let mut combined = TriangleMesh::new();
        for id in shape_ids {
            let meshed = self
                .shapes
                .lock()
                .get(&id)
                .ok_or(KernelError::ShapeNotFound(id))?
                .mesh
                .clone();
            let mesh = match meshed {
                Some(mesh) => mesh,
                None => {
                    self.incremental_mesh(&Solid::new(id), MeshTolerance::default())?;
                    self.shapes
                        .lock()
                        .get(&id)
                        .and_then(|shape| shape.mesh.clone())
                        .ok_or(KernelError::ShapeNotFound(id))?
                }
            };
            combined.append(&mesh);
        }

        if combined.is_empty() {
            return Err(KernelError::WriteFailed(
                "document has no meshed shapes".into(),
            ));
        }

        let [r, g, b] = options.base_color;
        let material = GlbMaterial {
            name: "shape".into(),
            base_color: [r, g, b, 1.0],
        };
        let bytes = write_glb(&combined.z_up_to_y_up(), &material)
            .map_err(|e| KernelError::WriteFailed(e.to_string()))?;
        tracing::debug!(path, bytes = bytes.len(), "Wrote GLB");
        self.fs.write_file(path, bytes);
        Ok(())
    }

    fn close_document(&self, document: DocumentId) {
        self.documents.lock().remove(&document.0);
    }

    fn release(&self, solid: &Solid) {
        if self.shapes.lock().remove(&solid.id).is_some() {
            tracing::trace!(id = %solid.id, "Released solid");
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::glb::read_glb;

    /// Unit cube [0, 1]^3 with shared edges and outward planar faces
    const CUBE: &str = "
#1=CARTESIAN_POINT('',(0.,0.,0.));
#2=CARTESIAN_POINT('',(1.,0.,0.));
#3=CARTESIAN_POINT('',(1.,1.,0.));
#4=CARTESIAN_POINT('',(0.,1.,0.));
#5=CARTESIAN_POINT('',(0.,0.,1.));
#6=CARTESIAN_POINT('',(1.,0.,1.));
#7=CARTESIAN_POINT('',(1.,1.,1.));
#8=CARTESIAN_POINT('',(0.,1.,1.));
#11=VERTEX_POINT('',#1);
#12=VERTEX_POINT('',#2);
#13=VERTEX_POINT('',#3);
#14=VERTEX_POINT('',#4);
#15=VERTEX_POINT('',#5);
#16=VERTEX_POINT('',#6);
#17=VERTEX_POINT('',#7);
#18=VERTEX_POINT('',#8);
#21=DIRECTION('',(1.,0.,0.));
#22=DIRECTION('',(0.,1.,0.));
#23=DIRECTION('',(0.,0.,1.));
#24=DIRECTION('',(-1.,0.,0.));
#25=DIRECTION('',(0.,-1.,0.));
#26=DIRECTION('',(0.,0.,-1.));
#31=VECTOR('',#21,1.);
#32=VECTOR('',#22,1.);
#33=VECTOR('',#23,1.);
#41=LINE('',#1,#31);
#42=LINE('',#2,#32);
#43=LINE('',#4,#31);
#44=LINE('',#1,#32);
#45=LINE('',#5,#31);
#46=LINE('',#6,#32);
#47=LINE('',#8,#31);
#48=LINE('',#5,#32);
#49=LINE('',#1,#33);
#50=LINE('',#2,#33);
#51=LINE('',#3,#33);
#52=LINE('',#4,#33);
#61=EDGE_CURVE('',#11,#12,#41,.T.);
#62=EDGE_CURVE('',#12,#13,#42,.T.);
#63=EDGE_CURVE('',#14,#13,#43,.T.);
#64=EDGE_CURVE('',#11,#14,#44,.T.);
#65=EDGE_CURVE('',#15,#16,#45,.T.);
#66=EDGE_CURVE('',#16,#17,#46,.T.);
#67=EDGE_CURVE('',#18,#17,#47,.T.);
#68=EDGE_CURVE('',#15,#18,#48,.T.);
#69=EDGE_CURVE('',#11,#15,#49,.T.);
#70=EDGE_CURVE('',#12,#16,#50,.T.);
#71=EDGE_CURVE('',#13,#17,#51,.T.);
#72=EDGE_CURVE('',#14,#18,#52,.T.);
#101=ORIENTED_EDGE('',*,*,#64,.T.);
#102=ORIENTED_EDGE('',*,*,#63,.T.);
#103=ORIENTED_EDGE('',*,*,#62,.F.);
#104=ORIENTED_EDGE('',*,*,#61,.F.);
#105=EDGE_LOOP('',(#101,#102,#103,#104));
#106=FACE_OUTER_BOUND('',#105,.T.);
#107=AXIS2_PLACEMENT_3D('',#1,#26,#21);
#108=PLANE('',#107);
#109=ADVANCED_FACE('',(#106),#108,.T.);
#111=ORIENTED_EDGE('',*,*,#65,.T.);
#112=ORIENTED_EDGE('',*,*,#66,.T.);
#113=ORIENTED_EDGE('',*,*,#67,.F.);
#114=ORIENTED_EDGE('',*,*,#68,.F.);
#115=EDGE_LOOP('',(#111,#112,#113,#114));
#116=FACE_OUTER_BOUND('',#115,.T.);
#117=AXIS2_PLACEMENT_3D('',#5,#23,#21);
#118=PLANE('',#117);
#119=ADVANCED_FACE('',(#116),#118,.T.);
#121=ORIENTED_EDGE('',*,*,#61,.T.);
#122=ORIENTED_EDGE('',*,*,#70,.T.);
#123=ORIENTED_EDGE('',*,*,#65,.F.);
#124=ORIENTED_EDGE('',*,*,#69,.F.);
#125=EDGE_LOOP('',(#121,#122,#123,#124));
#126=FACE_OUTER_BOUND('',#125,.T.);
#127=AXIS2_PLACEMENT_3D('',#1,#25,#21);
#128=PLANE('',#127);
#129=ADVANCED_FACE('',(#126),#128,.T.);
#131=ORIENTED_EDGE('',*,*,#72,.T.);
#132=ORIENTED_EDGE('',*,*,#67,.T.);
#133=ORIENTED_EDGE('',*,*,#71,.F.);
#134=ORIENTED_EDGE('',*,*,#63,.F.);
#135=EDGE_LOOP('',(#131,#132,#133,#134));
#136=FACE_OUTER_BOUND('',#135,.T.);
#137=AXIS2_PLACEMENT_3D('',#4,#22,#21);
#138=PLANE('',#137);
#139=ADVANCED_FACE('',(#136),#138,.T.);
#141=ORIENTED_EDGE('',*,*,#69,.T.);
#142=ORIENTED_EDGE('',*,*,#68,.T.);
#143=ORIENTED_EDGE('',*,*,#72,.F.);
#144=ORIENTED_EDGE('',*,*,#64,.F.);
#145=EDGE_LOOP('',(#141,#142,#143,#144));
#146=FACE_OUTER_BOUND('',#145,.T.);
#147=AXIS2_PLACEMENT_3D('',#1,#24,#22);
#148=PLANE('',#147);
#149=ADVANCED_FACE('',(#146),#148,.T.);
#151=ORIENTED_EDGE('',*,*,#62,.T.);
#152=ORIENTED_EDGE('',*,*,#71,.T.);
#153=ORIENTED_EDGE('',*,*,#66,.F.);
#154=ORIENTED_EDGE('',*,*,#70,.F.);
#155=EDGE_LOOP('',(#151,#152,#153,#154));
#156=FACE_OUTER_BOUND('',#155,.T.);
#157=AXIS2_PLACEMENT_3D('',#2,#21,#22);
#158=PLANE('',#157);
#159=ADVANCED_FACE('',(#156),#158,.T.);
#200=CLOSED_SHELL('',(#109,#119,#129,#139,#149,#159));
#201=MANIFOLD_SOLID_BREP('cube',#200);
";

    /// Places the cube twice, at x = +5 and x = -5
    const TWO_CUBES: &str = "
#300=CARTESIAN_POINT('',(0.,0.,0.));
#301=AXIS2_PLACEMENT_3D('',#300,#23,#21);
#302=ADVANCED_BREP_SHAPE_REPRESENTATION('cube',(#201,#301),$);
#310=SHAPE_REPRESENTATION('assy',(#301,#311,#313),$);
#312=CARTESIAN_POINT('',(5.,0.,0.));
#311=AXIS2_PLACEMENT_3D('',#312,#23,#21);
#314=CARTESIAN_POINT('',(-5.,0.,0.));
#313=AXIS2_PLACEMENT_3D('',#314,#23,#21);
#320=ITEM_DEFINED_TRANSFORMATION('','',#301,#311);
#321=ITEM_DEFINED_TRANSFORMATION('','',#301,#313);
#330=(REPRESENTATION_RELATIONSHIP('','',#302,#310)
REPRESENTATION_RELATIONSHIP_WITH_TRANSFORMATION(#320)
SHAPE_REPRESENTATION_RELATIONSHIP());
#331=(REPRESENTATION_RELATIONSHIP('','',#302,#310)
REPRESENTATION_RELATIONSHIP_WITH_TRANSFORMATION(#321)
SHAPE_REPRESENTATION_RELATIONSHIP());
";

    /// Wrap entity instances in a complete exchange structure
    fn step_file(data: &[&str]) -> Vec<u8> {
        format!(
            "ISO-10303-21;\nHEADER;\nFILE_DESCRIPTION((''),'2;1');\n\
             FILE_NAME('test.step','2024-01-01T00:00:00',(''),(''),'','','');\n\
             FILE_SCHEMA(('AUTOMOTIVE_DESIGN'));\nENDSEC;\nDATA;\n{}\nENDSEC;\n\
             END-ISO-10303-21;\n",
            data.concat()
        )
        .into_bytes()
    }

    fn read_and_mesh(kernel: &TruckKernel, data: &[&str]) -> (Solid, TriangleMesh) {
        kernel.fs().write_file("/stage/model.step", step_file(data));
        let solid = kernel.read_step("/stage/model.step").unwrap();
        assert!(!solid.is_null());
        kernel
            .incremental_mesh(&solid, MeshTolerance::default())
            .unwrap();
        let mesh = kernel.shapes.lock()[&solid.id].mesh.clone().unwrap();
        (solid, mesh)
    }

    #[test]
    fn test_cube_round_trips_to_glb() {
        let kernel = TruckKernel::new();
        let (solid, mesh) = read_and_mesh(&kernel, &[CUBE]);
        assert_eq!(kernel.shape_count(), 1);
        assert!(mesh.triangle_count() >= 12);

        let document = kernel.new_document();
        kernel.add_shape(document, &solid).unwrap();
        kernel
            .write_glb(
                document,
                "/export/cube.glb",
                &GlbWriteOptions {
                    base_color: [1.0, 0.0, 0.0],
                },
            )
            .unwrap();

        let model = read_glb(&kernel.fs().read_file("/export/cube.glb").unwrap()).unwrap();
        assert_eq!(model.mesh.triangle_count(), mesh.triangle_count());
        assert_eq!(model.material.base_color, [1.0, 0.0, 0.0, 1.0]);

        // Z-up [0, 1]^3 becomes Y-up x in [0, 1], y in [0, 1], z in [-1, 0]
        let bounds = model.mesh.bounds().unwrap();
        assert_relative_eq!(bounds.min.x, 0.0, epsilon = 1e-4);
        assert_relative_eq!(bounds.max.x, 1.0, epsilon = 1e-4);
        assert_relative_eq!(bounds.min.y, 0.0, epsilon = 1e-4);
        assert_relative_eq!(bounds.max.y, 1.0, epsilon = 1e-4);
        assert_relative_eq!(bounds.min.z, -1.0, epsilon = 1e-4);
        assert_relative_eq!(bounds.max.z, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_file_without_shells_is_null_solid() {
        let kernel = TruckKernel::new();
        kernel.fs().write_file(
            "/stage/empty.step",
            step_file(&["#1=CARTESIAN_POINT('',(0.,0.,0.));"]),
        );
        let solid = kernel.read_step("/stage/empty.step").unwrap();
        assert!(solid.is_null());
        assert_eq!(kernel.shape_count(), 0);
    }

    #[test]
    fn test_assembly_instances_are_placed() {
        let single = read_and_mesh(&TruckKernel::new(), &[CUBE]).1;
        let (_, assembly) = read_and_mesh(&TruckKernel::new(), &[CUBE, TWO_CUBES]);

        assert_eq!(assembly.triangle_count(), 2 * single.triangle_count());
        let bounds = assembly.bounds().unwrap();
        assert_relative_eq!(bounds.min.x, -5.0, epsilon = 1e-4);
        assert_relative_eq!(bounds.max.x, 6.0, epsilon = 1e-4);
        assert_relative_eq!(bounds.min.z, 0.0, epsilon = 1e-4);
        assert_relative_eq!(bounds.max.z, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_read_missing_file() {
        let kernel = TruckKernel::new();
        assert!(matches!(
            kernel.read_step("/stage/missing.step"),
            Err(KernelError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_read_garbage_fails_to_parse() {
        let kernel = TruckKernel::new();
        kernel
            .fs()
            .write_file("/stage/garbage.step", b"this is not a STEP file".to_vec());
        assert!(matches!(
            kernel.read_step("/stage/garbage.step"),
            Err(KernelError::ReadFailed(_))
        ));
        assert_eq!(kernel.shape_count(), 0);
    }

    #[test]
    fn test_read_binary_is_rejected() {
        let kernel = TruckKernel::new();
        kernel.fs().write_file("/stage/bin.step", vec![0xff, 0xfe, 0x00]);
        assert!(matches!(
            kernel.read_step("/stage/bin.step"),
            Err(KernelError::ReadFailed(_))
        ));
    }

    #[test]
    fn test_document_lifecycle() {
        let kernel = TruckKernel::new();
        let document = kernel.new_document();
        let unknown = Solid::new(Uuid::new_v4());
        assert_eq!(
            kernel.add_shape(document, &unknown),
            Err(KernelError::ShapeNotFound(unknown.id))
        );
        assert_eq!(
            kernel.write_glb(document, "/export/a.glb", &GlbWriteOptions::default()),
            Err(KernelError::WriteFailed(
                "document has no meshed shapes".into()
            ))
        );
        kernel.close_document(document);
        assert_eq!(
            kernel.write_glb(document, "/export/a.glb", &GlbWriteOptions::default()),
            Err(KernelError::DocumentNotFound(document.0))
        );
        assert!(!kernel.fs().exists("/export/a.glb"));
    }

    #[test]
    fn test_mesh_unknown_solid() {
        let kernel = TruckKernel::new();
        let solid = Solid::new(Uuid::new_v4());
        assert_eq!(
            kernel.incremental_mesh(&solid, MeshTolerance::default()),
            Err(KernelError::ShapeNotFound(solid.id))
        );
    }
}

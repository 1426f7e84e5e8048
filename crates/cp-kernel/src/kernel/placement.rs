//! Assembly placements from STEP product structure
//!
//! `truck-stepio` converts shells in their part frame. Assemblies position
//! parts through `REPRESENTATION_RELATIONSHIP_WITH_TRANSFORMATION` records
//! whose `ITEM_DEFINED_TRANSFORMATION` maps one `AXIS2_PLACEMENT_3D` onto
//! another. This module scans those records and returns, for every shell,
//! the world transform of each instance of it.

use std::collections::{HashMap, HashSet};

use glam::{DMat4, DVec3};

/// Nesting limit when walking the assembly tree
const MAX_ASSEMBLY_DEPTH: usize = 64;

/// Entities needed to place shells, keyed by entity id
#[derive(Debug, Default)]
struct AssemblyRecords {
    points: HashMap<u64, DVec3>,
    directions: HashMap<u64, DVec3>,
    /// AXIS2_PLACEMENT_3D: (location, axis, ref_direction)
    axes: HashMap<u64, (u64, Option<u64>, Option<u64>)>,
    /// ITEM_DEFINED_TRANSFORMATION: (from placement, to placement)
    item_transforms: HashMap<u64, (u64, u64)>,
    /// (rep_1, rep_2, transformation)
    placed_relations: Vec<(u64, u64, u64)>,
    /// SHAPE_REPRESENTATION_RELATIONSHIP without a transformation
    same_frame: Vec<(u64, u64)>,
    /// MANIFOLD_SOLID_BREP -> shell
    solid_shells: HashMap<u64, u64>,
    /// Representation -> referenced items
    representations: HashMap<u64, Vec<u64>>,
}

impl AssemblyRecords {
    fn scan(raw: &str) -> Self {
        let mut records = Self::default();
        for (id, body) in entities(raw) {
            let refs = || hash_refs(body);
            if body.contains("REPRESENTATION_RELATIONSHIP_WITH_TRANSFORMATION") {
                if let [rep_1, rep_2, transform, ..] = refs()[..] {
                    records.placed_relations.push((rep_1, rep_2, transform));
                }
            } else if body.starts_with("SHAPE_REPRESENTATION_RELATIONSHIP") {
                if let [rep_1, rep_2, ..] = refs()[..] {
                    records.same_frame.push((rep_1, rep_2));
                }
            } else if body.starts_with("CARTESIAN_POINT") {
                if let Some(point) = coordinates(body) {
                    records.points.insert(id, point);
                }
            } else if body.starts_with("DIRECTION") {
                if let Some(direction) = coordinates(body) {
                    records.directions.insert(id, direction);
                }
            } else if body.starts_with("AXIS2_PLACEMENT_3D") {
                let refs = refs();
                if let Some(&location) = refs.first() {
                    records
                        .axes
                        .insert(id, (location, refs.get(1).copied(), refs.get(2).copied()));
                }
            } else if body.starts_with("ITEM_DEFINED_TRANSFORMATION") {
                if let [from, to, ..] = refs()[..] {
                    records.item_transforms.insert(id, (from, to));
                }
            } else if body.starts_with("MANIFOLD_SOLID_BREP") {
                if let Some(&shell) = refs().first() {
                    records.solid_shells.insert(id, shell);
                }
            } else if body.contains("SHAPE_REPRESENTATION") {
                records.representations.insert(id, refs());
            }
        }
        records
    }

    /// Frame of an AXIS2_PLACEMENT_3D as a rigid transform
    fn axis_frame(&self, id: u64) -> DMat4 {
        let Some(&(location, axis, reference)) = self.axes.get(&id) else {
            return DMat4::IDENTITY;
        };
        let origin = self.points.get(&location).copied().unwrap_or(DVec3::ZERO);
        let z = axis
            .and_then(|d| self.directions.get(&d))
            .and_then(|d| d.try_normalize())
            .unwrap_or(DVec3::Z);
        let reference = reference
            .and_then(|d| self.directions.get(&d))
            .copied()
            .unwrap_or(DVec3::X);
        let x = (reference - z * reference.dot(z))
            .try_normalize()
            .unwrap_or_else(|| z.any_orthonormal_vector());
        let y = z.cross(x);
        DMat4::from_cols(
            x.extend(0.0),
            y.extend(0.0),
            z.extend(0.0),
            origin.extend(1.0),
        )
    }

    /// Transform carrying the child frame into the parent frame
    fn relation_transform(&self, transform: u64) -> DMat4 {
        match self.item_transforms.get(&transform) {
            Some(&(from, to)) => self.axis_frame(to) * self.axis_frame(from).inverse(),
            None => DMat4::IDENTITY,
        }
    }

    /// Parent -> [(child, transform)], with `rep_2` as parent unless `flip`
    fn placement_tree(&self, flip: bool) -> HashMap<u64, Vec<(u64, DMat4)>> {
        let mut tree: HashMap<u64, Vec<(u64, DMat4)>> = HashMap::new();
        for &(rep_1, rep_2, transform) in &self.placed_relations {
            let matrix = self.relation_transform(transform);
            let (parent, child, matrix) = if flip {
                (rep_1, rep_2, matrix.inverse())
            } else {
                (rep_2, rep_1, matrix)
            };
            tree.entry(parent).or_default().push((child, matrix));
        }
        tree
    }
}

/// Parents that are never children, sorted
fn roots(tree: &HashMap<u64, Vec<(u64, DMat4)>>) -> Vec<u64> {
    let children: HashSet<u64> = tree
        .values()
        .flat_map(|edges| edges.iter().map(|(child, _)| *child))
        .collect();
    let mut roots: Vec<u64> = tree
        .keys()
        .filter(|parent| !children.contains(parent))
        .copied()
        .collect();
    roots.sort_unstable();
    roots
}

/// World transforms of every shell instance.
///
/// Shells that no assembly record reaches get a single identity placement.
pub fn shell_placements(raw: &str) -> HashMap<u64, Vec<DMat4>> {
    let records = AssemblyRecords::scan(raw);

    let mut tree = records.placement_tree(false);
    let mut top = roots(&tree);
    // Exporters disagree on which side of the relation is the parent
    if top.len() > 1 {
        let flipped = records.placement_tree(true);
        let flipped_top = roots(&flipped);
        if flipped_top.len() < top.len() {
            tree = flipped;
            top = flipped_top;
        }
    }

    let mut aliases: HashMap<u64, Vec<u64>> = HashMap::new();
    for &(a, b) in &records.same_frame {
        aliases.entry(a).or_default().push(b);
        aliases.entry(b).or_default().push(a);
    }

    // Representation -> world transforms of its instances
    let mut instances: HashMap<u64, Vec<DMat4>> = HashMap::new();
    let mut pending: Vec<(u64, DMat4, usize)> = top
        .into_iter()
        .map(|root| (root, DMat4::IDENTITY, 0))
        .collect();
    while let Some((rep, world, depth)) = pending.pop() {
        if depth > MAX_ASSEMBLY_DEPTH {
            tracing::warn!(rep, "Assembly nesting too deep, ignoring deeper placements");
            continue;
        }

        let mut frame = vec![rep];
        let mut seen = HashSet::from([rep]);
        while let Some(current) = frame.pop() {
            instances.entry(current).or_default().push(world);
            for &alias in aliases.get(&current).into_iter().flatten() {
                if seen.insert(alias) {
                    frame.push(alias);
                }
            }
            for &(child, local) in tree.get(&current).into_iter().flatten() {
                pending.push((child, world * local, depth + 1));
            }
        }
    }

    let mut placements: HashMap<u64, Vec<DMat4>> = HashMap::new();
    for (&solid, &shell) in &records.solid_shells {
        let placed: Vec<DMat4> = records
            .representations
            .iter()
            .filter(|(_, items)| items.contains(&solid))
            .filter_map(|(rep, _)| instances.get(rep))
            .flatten()
            .copied()
            .collect();
        placements.entry(shell).or_default().extend(placed);
    }
    for transforms in placements.values_mut() {
        if transforms.is_empty() {
            transforms.push(DMat4::IDENTITY);
        }
    }

    tracing::debug!(
        shells = placements.len(),
        instances = placements.values().map(Vec::len).sum::<usize>(),
        "Resolved assembly placements"
    );
    placements
}

/// `(id, body)` of every `#id = body;` instance
fn entities(raw: &str) -> impl Iterator<Item = (u64, &str)> {
    raw.split(';').filter_map(|instance| {
        let (id, body) = instance.trim().strip_prefix('#')?.split_once('=')?;
        Some((id.trim().parse().ok()?, body.trim()))
    })
}

/// Every `#id` reference in an entity body, in order
fn hash_refs(body: &str) -> Vec<u64> {
    body.split('#')
        .skip(1)
        .filter_map(|tail| {
            let digits = tail.find(|c: char| !c.is_ascii_digit()).unwrap_or(tail.len());
            tail[..digits].parse().ok()
        })
        .collect()
}

/// The coordinate tuple of a CARTESIAN_POINT or DIRECTION
fn coordinates(body: &str) -> Option<DVec3> {
    let (_, after_name) = body.split_once(',')?;
    let (_, tuple) = after_name.split_once('(')?;
    let (tuple, _) = tuple.split_once(')')?;
    let mut values = tuple.split(',').map(step_real);
    Some(DVec3::new(values.next()??, values.next()??, values.next()??))
}

/// Parse a STEP real, which may omit digits after the point (`1.`, `0.E+000`)
fn step_real(text: &str) -> Option<f64> {
    let text = text.split_whitespace().collect::<String>();
    match text.parse() {
        Ok(value) => Some(value),
        Err(_) => text.replacen(".E", ".0E", 1).parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    /// A part placed twice in an assembly, shifted +5 and -5 along X, the
    /// second copy also turned 90 degrees about Z
    const TWO_INSTANCES: &str = "
        #1=CARTESIAN_POINT('',(0.,0.,0.));
        #2=DIRECTION('',(0.,0.,1.));
        #3=DIRECTION('',(1.,0.,0.));
        #4=AXIS2_PLACEMENT_3D('',#1,#2,#3);
        #10=CLOSED_SHELL('',(#11));
        #12=MANIFOLD_SOLID_BREP('part',#10);
        #13=ADVANCED_BREP_SHAPE_REPRESENTATION('part',(#12,#4),$);
        #20=SHAPE_REPRESENTATION('assy',(#4,#21,#25),$);
        #22=CARTESIAN_POINT('',(5.,0.,0.));
        #21=AXIS2_PLACEMENT_3D('',#22,#2,#3);
        #23=CARTESIAN_POINT('',(-5.,0.,0.));
        #24=DIRECTION('',(0.,1.,0.));
        #25=AXIS2_PLACEMENT_3D('',#23,#2,#24);
        #30=ITEM_DEFINED_TRANSFORMATION('','',#4,#21);
        #31=ITEM_DEFINED_TRANSFORMATION('','',#4,#25);
        #32=(REPRESENTATION_RELATIONSHIP('','',#13,#20)
            REPRESENTATION_RELATIONSHIP_WITH_TRANSFORMATION(#30)
            SHAPE_REPRESENTATION_RELATIONSHIP());
        #33=(REPRESENTATION_RELATIONSHIP('','',#13,#20)
            REPRESENTATION_RELATIONSHIP_WITH_TRANSFORMATION(#31)
            SHAPE_REPRESENTATION_RELATIONSHIP());
    ";

    #[test]
    fn test_each_instance_gets_its_placement() {
        let placements = shell_placements(TWO_INSTANCES);
        let instances = &placements[&10];
        assert_eq!(instances.len(), 2);

        let mut moved: Vec<DVec3> = instances
            .iter()
            .map(|m| m.transform_point3(DVec3::new(1.0, 0.0, 0.0)))
            .collect();
        moved.sort_by(|a, b| a.x.total_cmp(&b.x));
        // Turned copy: +X maps to +Y, then shifted to x = -5
        assert_relative_eq!(moved[0].x, -5.0, epsilon = 1e-9);
        assert_relative_eq!(moved[0].y, 1.0, epsilon = 1e-9);
        assert_relative_eq!(moved[1].x, 6.0, epsilon = 1e-9);
        assert_relative_eq!(moved[1].y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_part_without_assembly_is_identity() {
        let raw = "#10=CLOSED_SHELL('',(#11));\n#12=MANIFOLD_SOLID_BREP('part',#10);";
        let placements = shell_placements(raw);
        assert_eq!(placements[&10], vec![DMat4::IDENTITY]);
    }

    #[test]
    fn test_nested_placements_compose() {
        // part -> sub-assembly at x = 2 -> top assembly at x = 3
        let raw = "
            #1=CARTESIAN_POINT('',(0.,0.,0.));
            #4=AXIS2_PLACEMENT_3D('',#1,$,$);
            #10=CLOSED_SHELL('',(#11));
            #12=MANIFOLD_SOLID_BREP('part',#10);
            #13=ADVANCED_BREP_SHAPE_REPRESENTATION('part',(#12,#4),$);
            #20=SHAPE_REPRESENTATION('sub',(#4,#21),$);
            #21=AXIS2_PLACEMENT_3D('',#22,$,$);
            #22=CARTESIAN_POINT('',(2.,0.,0.));
            #30=SHAPE_REPRESENTATION('top',(#4,#31),$);
            #31=AXIS2_PLACEMENT_3D('',#32,$,$);
            #32=CARTESIAN_POINT('',(3.,0.,0.));
            #40=ITEM_DEFINED_TRANSFORMATION('','',#4,#21);
            #41=ITEM_DEFINED_TRANSFORMATION('','',#4,#31);
            #50=(REPRESENTATION_RELATIONSHIP('','',#13,#20)
                REPRESENTATION_RELATIONSHIP_WITH_TRANSFORMATION(#40)
                SHAPE_REPRESENTATION_RELATIONSHIP());
            #51=(REPRESENTATION_RELATIONSHIP('','',#20,#30)
                REPRESENTATION_RELATIONSHIP_WITH_TRANSFORMATION(#41)
                SHAPE_REPRESENTATION_RELATIONSHIP());
        ";
        let placements = shell_placements(raw);
        let origin = placements[&10][0].transform_point3(DVec3::ZERO);
        assert_relative_eq!(origin.x, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_step_reals() {
        assert_eq!(step_real("1."), Some(1.0));
        assert_eq!(step_real(" -2.5E-1 "), Some(-0.25));
        assert_eq!(step_real("0.E+000"), Some(0.0));
        assert_eq!(step_real("abc"), None);
    }

    #[test]
    fn test_hash_refs_in_order() {
        assert_eq!(
            hash_refs("ITEM_DEFINED_TRANSFORMATION('','',#4,#21)"),
            vec![4, 21]
        );
    }
}

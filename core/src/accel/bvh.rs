//! Binned-SAH BVH, grounded on the teacher's `bvh::BVH` (recursive build
//! over per-primitive bounds/centroid records, then flattened into a
//! depth-first array of `LinearBVHNode`s for cache-friendly iterative
//! traversal) and on the bin count / leaf threshold / traversal cost ratio
//! used by the scene's `original_source` equivalent's binned-SAH builder.

use crate::math::{Axis, Bounds3, Ray};
use crate::primitive::Primitive;
use crate::Float;

use super::{AccelHit, PrimRef};

const NUM_BINS: usize = 32;
const TRAVERSAL_COST: Float = 1.0 / 8.0;
const MAX_PRIMS_PER_LEAF: usize = 8;

struct PrimInfo {
    ref_index: usize,
    bounds: Bounds3,
    centroid: crate::math::Point3,
}

pub(super) enum BuildNode {
    Leaf {
        bounds: Bounds3,
        first: usize,
        count: usize,
    },
    Interior {
        bounds: Bounds3,
        axis: Axis,
        left: Box<BuildNode>,
        right: Box<BuildNode>,
    },
}

impl BuildNode {
    pub(super) fn bounds(&self) -> Bounds3 {
        node_bounds(self)
    }
}

/// Builds the unflattened binary tree plus its reordered primitive-reference
/// array. Shared by `Bvh::build` (which flattens it into a binary linear
/// array) and `Qbvh::build` (which collapses it one more level into 4-wide
/// nodes) so the two traversal layouts stay built from the exact same
/// binned-SAH split decisions.
pub(super) fn build_tree(primitives: &[Primitive]) -> (BuildNode, Vec<PrimRef>) {
    let mut refs = Vec::new();
    for (pi, prim) in primitives.iter().enumerate() {
        for ti in 0..prim.mesh.num_triangles() {
            refs.push(PrimRef { primitive: pi as u32, triangle: ti as u32 });
        }
    }

    let mut infos: Vec<PrimInfo> = refs
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let tri = primitives[r.primitive as usize].mesh.triangle(r.triangle as usize);
            let bounds = tri.bounds();
            PrimInfo { ref_index: i, centroid: bounds.centroid(), bounds }
        })
        .collect();

    let mut ordered_refs = Vec::with_capacity(refs.len());
    if infos.is_empty() {
        return (BuildNode::Leaf { bounds: Bounds3::empty(), first: 0, count: 0 }, ordered_refs);
    }
    let root = recursive_build(&mut infos, &refs, &mut ordered_refs);
    (root, ordered_refs)
}

/// Flattened node for traversal: interior nodes store the offset of their
/// second child (the first child is always the immediately following node);
/// leaf nodes store an offset/count into the reordered `refs` array.
struct LinearNode {
    bounds: Bounds3,
    // >= 0: leaf primitive offset into `refs`, second_child_offset/axis unused.
    // Interior nodes use `second_child_offset` and `axis`, with `n_prims == 0`.
    offset: u32,
    n_prims: u16,
    axis: u8,
}

pub struct Bvh {
    nodes: Vec<LinearNode>,
    refs: Vec<PrimRef>,
    bounds: Bounds3,
}

impl Bvh {
    pub fn build(primitives: &[Primitive]) -> Bvh {
        let (root, ordered_refs) = build_tree(primitives);
        if ordered_refs.is_empty() {
            return Bvh {
                nodes: vec![LinearNode { bounds: Bounds3::empty(), offset: 0, n_prims: 0, axis: 0 }],
                refs: Vec::new(),
                bounds: Bounds3::empty(),
            };
        }

        let mut nodes = Vec::new();
        flatten(&root, &mut nodes);
        let world_bounds = root.bounds();

        Bvh { nodes, refs: ordered_refs, bounds: world_bounds }
    }

    pub fn world_bounds(&self) -> Bounds3 {
        self.bounds
    }

    pub fn intersect(&self, primitives: &[Primitive], ray: &Ray) -> Option<AccelHit> {
        if self.nodes.is_empty() || self.refs.is_empty() {
            return None;
        }
        let inv_d = [1.0 / ray.d.x, 1.0 / ray.d.y, 1.0 / ray.d.z];
        let neg = [inv_d[0] < 0.0, inv_d[1] < 0.0, inv_d[2] < 0.0];

        let mut t_max = ray.t_max;
        let mut best: Option<AccelHit> = None;
        let mut stack = [0u32; 64];
        let mut sp = 0usize;
        let mut current = 0u32;
        loop {
            let node = &self.nodes[current as usize];
            let probe = Ray::new(ray.o, ray.d, t_max);
            if node.bounds.intersect_p(&probe).is_some() {
                if node.n_prims > 0 {
                    let first = node.offset as usize;
                    for r in &self.refs[first..first + node.n_prims as usize] {
                        let tri = primitives[r.primitive as usize].mesh.triangle(r.triangle as usize);
                        let test_ray = Ray::new(ray.o, ray.d, t_max);
                        if let Some(hit) = tri.intersect(&test_ray) {
                            if hit.t < t_max {
                                t_max = hit.t;
                                best = Some(AccelHit { t: hit.t, primitive: r.primitive, triangle: r.triangle });
                            }
                        }
                    }
                    if sp == 0 {
                        break;
                    }
                    sp -= 1;
                    current = stack[sp];
                } else {
                    let axis = node.axis as usize;
                    if neg[axis] {
                        stack[sp] = current + 1;
                        sp += 1;
                        current = node.offset;
                    } else {
                        stack[sp] = node.offset;
                        sp += 1;
                        current += 1;
                    }
                }
            } else {
                if sp == 0 {
                    break;
                }
                sp -= 1;
                current = stack[sp];
            }
        }
        best
    }

    pub fn intersect_p(&self, primitives: &[Primitive], ray: &Ray) -> bool {
        if self.nodes.is_empty() || self.refs.is_empty() {
            return false;
        }
        let neg = [ray.d.x < 0.0, ray.d.y < 0.0, ray.d.z < 0.0];
        let mut stack = [0u32; 64];
        let mut sp = 0usize;
        let mut current = 0u32;
        loop {
            let node = &self.nodes[current as usize];
            if node.bounds.intersect_p(ray).is_some() {
                if node.n_prims > 0 {
                    let first = node.offset as usize;
                    for r in &self.refs[first..first + node.n_prims as usize] {
                        let tri = primitives[r.primitive as usize].mesh.triangle(r.triangle as usize);
                        if tri.intersect(ray).is_some() {
                            return true;
                        }
                    }
                    if sp == 0 {
                        break;
                    }
                    sp -= 1;
                    current = stack[sp];
                } else {
                    let axis = node.axis as usize;
                    if neg[axis] {
                        stack[sp] = current + 1;
                        sp += 1;
                        current = node.offset;
                    } else {
                        stack[sp] = node.offset;
                        sp += 1;
                        current += 1;
                    }
                }
            } else {
                if sp == 0 {
                    break;
                }
                sp -= 1;
                current = stack[sp];
            }
        }
        false
    }
}

fn node_bounds(node: &BuildNode) -> Bounds3 {
    match node {
        BuildNode::Leaf { bounds, .. } => *bounds,
        BuildNode::Interior { bounds, .. } => *bounds,
    }
}

fn make_leaf(infos: &[PrimInfo], refs: &[PrimRef], ordered: &mut Vec<PrimRef>) -> BuildNode {
    let first = ordered.len();
    let mut bounds = Bounds3::empty();
    for info in infos {
        bounds = bounds.union(&info.bounds);
        ordered.push(refs[info.ref_index]);
    }
    BuildNode::Leaf { bounds, first, count: infos.len() }
}

/// Bucket used by the binned-SAH cost evaluation: running bounds + count of
/// the primitive centroids that fall in it.
#[derive(Copy, Clone)]
struct Bucket {
    count: usize,
    bounds: Bounds3,
}

fn recursive_build(infos: &mut [PrimInfo], refs: &[PrimRef], ordered: &mut Vec<PrimRef>) -> BuildNode {
    let mut bounds = Bounds3::empty();
    for info in infos.iter() {
        bounds = bounds.union(&info.bounds);
    }

    if infos.len() <= MAX_PRIMS_PER_LEAF {
        return make_leaf(infos, refs, ordered);
    }

    let mut centroid_bounds = Bounds3::empty();
    for info in infos.iter() {
        centroid_bounds = centroid_bounds.union_point(info.centroid);
    }
    let axis = centroid_bounds.maximum_extent();
    let diag = centroid_bounds.diagonal();
    let extent = match axis {
        Axis::X => diag.x,
        Axis::Y => diag.y,
        Axis::Z => diag.z,
    };
    if extent <= 0.0 {
        return make_leaf(infos, refs, ordered);
    }

    let axis_component = |p: crate::math::Point3| match axis {
        Axis::X => p.x,
        Axis::Y => p.y,
        Axis::Z => p.z,
    };
    let cmin = axis_component(centroid_bounds.p_min);

    let mut buckets = [Bucket { count: 0, bounds: Bounds3::empty() }; NUM_BINS];
    let bucket_of = |c: Float| -> usize {
        let b = (NUM_BINS as Float * (c - cmin) / extent) as usize;
        b.min(NUM_BINS - 1)
    };
    for info in infos.iter() {
        let b = bucket_of(axis_component(info.centroid));
        buckets[b].count += 1;
        buckets[b].bounds = buckets[b].bounds.union(&info.bounds);
    }

    // Cost of splitting after bucket i: SAH cost of the two resulting halves,
    // relative to the parent's surface area, scaled by the traversal/leaf
    // cost ratio.
    let mut costs = [0.0 as Float; NUM_BINS - 1];
    for i in 0..NUM_BINS - 1 {
        let mut b0 = Bounds3::empty();
        let mut c0 = 0usize;
        for bucket in &buckets[0..=i] {
            b0 = b0.union(&bucket.bounds);
            c0 += bucket.count;
        }
        let mut b1 = Bounds3::empty();
        let mut c1 = 0usize;
        for bucket in &buckets[i + 1..] {
            b1 = b1.union(&bucket.bounds);
            c1 += bucket.count;
        }
        costs[i] = TRAVERSAL_COST
            + (c0 as Float * b0.surface_area() + c1 as Float * b1.surface_area()) / bounds.surface_area();
    }

    let mut min_cost = costs[0];
    let mut min_bucket = 0;
    for (i, &c) in costs.iter().enumerate().skip(1) {
        if c < min_cost {
            min_cost = c;
            min_bucket = i;
        }
    }

    let leaf_cost = infos.len() as Float;
    if infos.len() <= MAX_PRIMS_PER_LEAF && min_cost >= leaf_cost {
        return make_leaf(infos, refs, ordered);
    }

    let mid = partition_by_bucket(infos, axis, cmin, extent, min_bucket);
    if mid == 0 || mid == infos.len() {
        return make_leaf(infos, refs, ordered);
    }

    let (left_infos, right_infos) = infos.split_at_mut(mid);
    let left = recursive_build(left_infos, refs, ordered);
    let right = recursive_build(right_infos, refs, ordered);
    BuildNode::Interior {
        bounds,
        axis,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn partition_by_bucket(
    infos: &mut [PrimInfo],
    axis: Axis,
    cmin: Float,
    extent: Float,
    split_bucket: usize,
) -> usize {
    let axis_component = |p: crate::math::Point3| match axis {
        Axis::X => p.x,
        Axis::Y => p.y,
        Axis::Z => p.z,
    };
    let bucket_of = |c: Float| -> usize {
        let b = (NUM_BINS as Float * (c - cmin) / extent) as usize;
        b.min(NUM_BINS - 1)
    };
    let mut i = 0;
    let mut j = infos.len();
    while i < j {
        if bucket_of(axis_component(infos[i].centroid)) <= split_bucket {
            i += 1;
        } else {
            j -= 1;
            infos.swap(i, j);
        }
    }
    i
}

fn flatten(node: &BuildNode, nodes: &mut Vec<LinearNode>) -> u32 {
    let my_index = nodes.len() as u32;
    match node {
        BuildNode::Leaf { bounds, first, count } => {
            nodes.push(LinearNode {
                bounds: *bounds,
                offset: *first as u32,
                n_prims: *count as u16,
                axis: 0,
            });
        }
        BuildNode::Interior { bounds, axis, left, right } => {
            nodes.push(LinearNode { bounds: *bounds, offset: 0, n_prims: 0, axis: *axis as u8 });
            flatten(left, nodes);
            let right_offset = flatten(right, nodes);
            nodes[my_index as usize].offset = right_offset;
        }
    }
    my_index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bsdf::{Bsdf, Diffuse};
    use crate::math::{Normal3, Point3, Vector3};
    use crate::mesh::TriangleMesh;
    use crate::spectrum::Spectrum;
    use std::sync::Arc;

    fn quad_primitive(center: Point3) -> Primitive {
        let n = Normal3::new(0.0, 0.0, 1.0);
        let positions = vec![
            center + Vector3::new(-0.5, -0.5, 0.0),
            center + Vector3::new(0.5, -0.5, 0.0),
            center + Vector3::new(0.5, 0.5, 0.0),
            center + Vector3::new(-0.5, 0.5, 0.0),
        ];
        let mesh = TriangleMesh::new(positions, vec![n, n, n, n], vec![[0, 1, 2], [0, 2, 3]]);
        Primitive::new(Arc::new(mesh), Bsdf::Diffuse(Diffuse { albedo: Spectrum::grey(0.5) }), None)
    }

    #[test]
    fn finds_nearest_of_several_quads() {
        let prims = vec![
            quad_primitive(Point3::new(0.0, 0.0, 5.0)),
            quad_primitive(Point3::new(0.0, 0.0, 2.0)),
            quad_primitive(Point3::new(0.0, 0.0, 8.0)),
        ];
        let bvh = Bvh::build(&prims);
        let ray = Ray::new(Point3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 1.0), Float::INFINITY);
        let hit = bvh.intersect(&prims, &ray).expect("should hit nearest quad");
        assert!((hit.t - 2.0).abs() < 1e-3);
        assert_eq!(hit.primitive, 1);
    }

    #[test]
    fn intersect_p_true_when_blocked() {
        let prims = vec![quad_primitive(Point3::new(0.0, 0.0, 2.0))];
        let bvh = Bvh::build(&prims);
        let ray = Ray::new(Point3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 1.0), 10.0);
        assert!(bvh.intersect_p(&prims, &ray));
    }

    #[test]
    fn misses_when_nothing_in_path() {
        let prims = vec![quad_primitive(Point3::new(5.0, 5.0, 2.0))];
        let bvh = Bvh::build(&prims);
        let ray = Ray::new(Point3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 1.0), Float::INFINITY);
        assert!(bvh.intersect(&prims, &ray).is_none());
    }
}

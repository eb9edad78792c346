//! K-d tree over light-subpath vertices, used by SPPM/VCM to find nearby
//! "photons" (non-delta light-subpath vertices) within a fixed gather
//! radius of an eye-subpath hit. Grounded on `original_source`'s
//! `VCMKdTree` (`include/lightmetrica/detail/vcmutils.h`,
//! `src/liblightmetrica/renderer/vcmutils.cpp`): longest-axis median-ish
//! partition, leaf threshold of a handful of points, `RangeQuery(p, radius,
//! callback)`.

use crate::math::Point3;
use crate::pathspace::{PathVertex, Subpath};
use crate::Float;

const LEAF_THRESHOLD: usize = 10;

struct Entry {
    p: Point3,
    subpath_index: u32,
    vertex_index: u32,
}

enum Node {
    Leaf { entries: Vec<u32> },
    Interior { axis: u8, split: Float, left: Box<Node>, right: Box<Node> },
}

/// An immutable k-d tree over every connectable, finite vertex across a
/// batch of traced light subpaths. Built once per rendering pass (SPPM:
/// once per photon pass; VCM: once per iteration) and queried many times.
pub struct PhotonMap {
    entries: Vec<Entry>,
    root: Option<Node>,
}

impl PhotonMap {
    pub fn build(subpaths: &[Subpath]) -> PhotonMap {
        let mut entries = Vec::new();
        for (si, subpath) in subpaths.iter().enumerate() {
            // Vertex 0 is the emitter position itself, never a valid photon
            // (it has no incident direction to gather with); start at 1.
            for (vi, v) in subpath.vertices.iter().enumerate().skip(1) {
                if !v.is_connectable() || v.geom.degenerate {
                    continue;
                }
                entries.push(Entry { p: v.geom.p, subpath_index: si as u32, vertex_index: vi as u32 });
            }
        }

        let mut indices: Vec<u32> = (0..entries.len() as u32).collect();
        let root = build_node(&entries, &mut indices);
        PhotonMap { entries, root }
    }

    /// Invokes `callback` for every indexed vertex within `radius` of `p`.
    /// `callback` receives `(subpath_index, vertex_index, squared_distance)`.
    pub fn range_query(&self, p: Point3, radius: Float, mut callback: impl FnMut(u32, u32, Float)) {
        if let Some(root) = &self.root {
            self.query_node(root, p, radius * radius, &mut callback);
        }
    }

    fn query_node(&self, node: &Node, p: Point3, radius2: Float, callback: &mut impl FnMut(u32, u32, Float)) {
        match node {
            Node::Leaf { entries } => {
                for &idx in entries {
                    let e = &self.entries[idx as usize];
                    let d2 = (e.p - p).length_squared();
                    if d2 <= radius2 {
                        callback(e.subpath_index, e.vertex_index, d2);
                    }
                }
            }
            Node::Interior { axis, split, left, right } => {
                let delta = p[*axis as usize] - split;
                if delta <= 0.0 {
                    self.query_node(left, p, radius2, callback);
                    if delta * delta <= radius2 {
                        self.query_node(right, p, radius2, callback);
                    }
                } else {
                    self.query_node(right, p, radius2, callback);
                    if delta * delta <= radius2 {
                        self.query_node(left, p, radius2, callback);
                    }
                }
            }
        }
    }
}

fn build_node(entries: &[Entry], indices: &mut [u32]) -> Option<Node> {
    if indices.is_empty() {
        return None;
    }
    if indices.len() <= LEAF_THRESHOLD {
        return Some(Node::Leaf { entries: indices.to_vec() });
    }

    let mut min = entries[indices[0] as usize].p;
    let mut max = min;
    for &i in indices.iter() {
        let p = entries[i as usize].p;
        min = Point3::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z));
        max = Point3::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z));
    }
    let extent = max - min;
    let axis = if extent.x >= extent.y && extent.x >= extent.z {
        0
    } else if extent.y >= extent.z {
        1
    } else {
        2
    };

    indices.sort_unstable_by(|&a, &b| {
        entries[a as usize].p[axis]
            .partial_cmp(&entries[b as usize].p[axis])
            .unwrap()
    });
    let mid = indices.len() / 2;
    let split = entries[indices[mid] as usize].p[axis];
    let (left_idx, right_idx) = indices.split_at_mut(mid);

    Some(Node::Interior {
        axis: axis as u8,
        split,
        left: Box::new(build_node(entries, left_idx).unwrap()),
        right: Box::new(build_node(entries, right_idx).unwrap()),
    })
}

/// The vertex an entry refers to, for strategies that need the full
/// `PathVertex` (throughput, bsdf) rather than just its position.
pub fn vertex_at<'a>(subpaths: &'a [Subpath], subpath_index: u32, vertex_index: u32) -> &'a PathVertex {
    &subpaths[subpath_index as usize].vertices[vertex_index as usize]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bsdf::{Bsdf, Diffuse};
    use crate::emitter::Emitter;
    use crate::math::Normal3;
    use crate::pathspace::VertexType;
    use crate::pdf::{Measure, PDFVal};
    use crate::spectrum::Spectrum;
    use crate::surface_geometry::SurfaceGeometry;

    fn dummy_geom(p: Point3) -> SurfaceGeometry {
        let n = Normal3::new(0.0, 1.0, 0.0);
        SurfaceGeometry { p, n, shading_n: n, u: n.to_vector().coordinate_system().0, v: n.to_vector().coordinate_system().1, degenerate: false }
    }

    fn dummy_vertex(p: Point3) -> PathVertex {
        PathVertex {
            vertex_type: VertexType::CONNECTABLE,
            geom: dummy_geom(p),
            primitive_index: None,
            emitter: None,
            bsdf: Some(Bsdf::Diffuse(Diffuse { albedo: Spectrum::grey(0.5) })),
            throughput: Spectrum::white(),
            pdf_fwd: PDFVal::new(Measure::Area, 1.0),
        }
    }

    #[test]
    fn range_query_finds_nearby_photon_and_skips_far_one() {
        let near = Subpath { vertices: vec![dummy_vertex(Point3::new(0.0, 0.0, 0.0)), dummy_vertex(Point3::new(0.1, 0.0, 0.0))] };
        let far = Subpath { vertices: vec![dummy_vertex(Point3::new(0.0, 0.0, 0.0)), dummy_vertex(Point3::new(50.0, 0.0, 0.0))] };
        let map = PhotonMap::build(&[near, far]);

        let mut found = Vec::new();
        map.range_query(Point3::new(0.0, 0.0, 0.0), 1.0, |si, vi, _d2| found.push((si, vi)));
        assert_eq!(found, vec![(0, 1)]);
    }
}

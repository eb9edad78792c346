//! `PathVertex`: one node of a traced subpath. Generalizes
//! `original_source`'s `SubpathSampler::PathVertex`/`vcmutils.h`'s
//! `PathVertex{type, geom, primitive}` into a Rust struct that also carries
//! the bookkeeping (`pdf_fwd`, running `throughput`) the teacher's
//! callback-based walk recomputes ad hoc at each call site — stored here
//! once so `pathspace::algebra`'s connection/merge/MIS-weight code can
//! index any vertex of either subpath without re-deriving it. `pdf_fwd` is
//! the only cached pdf: every other per-strategy pdf `algebra::path_pdf`
//! needs is recomputed from scratch per candidate split, matching
//! `original_source`'s own stateless `Path::EvaluatePathPDF`.

use std::sync::Arc;

use crate::bsdf::Bsdf;
use crate::emitter::Emitter;
use crate::pdf::PDFVal;
use crate::spectrum::Spectrum;
use crate::surface_geometry::SurfaceGeometry;

bitflags::bitflags! {
    /// Mirrors `original_source`'s `SurfaceInteractionType` bitmask (`L`,
    /// `E`, `D`, `G`, `S`, `BSDF = D|G|S`, `Emitter = L|E`) to the extent the
    /// path-space algebra in this crate actually branches on: which endpoint
    /// class a vertex belongs to, and whether it is connectable (non-delta)
    /// or only reachable through `Bsdf::sample`'s delta lobe.
    pub struct VertexType: u8 {
        /// Index-0 vertex of a light subpath.
        const LIGHT = 1 << 0;
        /// Index-0 vertex of an eye subpath.
        const EYE = 1 << 1;
        /// A non-delta surface/endpoint: legal to deterministically connect to.
        const CONNECTABLE = 1 << 2;
        /// A delta surface/endpoint (specular BSDF, point/directional light,
        /// pinhole sensor): only reachable by sampling through it.
        const SPECULAR = 1 << 3;
    }
}

/// One vertex of a traced subpath.
#[derive(Clone)]
pub struct PathVertex {
    pub vertex_type: VertexType,
    pub geom: SurfaceGeometry,
    /// Scene primitive this vertex lies on, if any (`None` for a vertex on a
    /// delta light/sensor with no backing mesh triangle).
    pub primitive_index: Option<usize>,
    /// Emitter this vertex samples from, set only on light-subpath index 0.
    pub emitter: Option<Arc<Emitter>>,
    /// BSDF at this vertex, set for every surface vertex (index >= 1).
    pub bsdf: Option<Bsdf>,
    /// Path throughput carried up to and including this vertex (already
    /// divided by every sampling pdf along the way, in the subpath's own
    /// forward-sampling measure).
    pub throughput: Spectrum,
    /// Pdf (area measure) of having sampled this vertex from the previous
    /// one, in the subpath's own forward direction.
    pub pdf_fwd: PDFVal,
}

impl PathVertex {
    pub fn is_connectable(&self) -> bool {
        self.vertex_type.contains(VertexType::CONNECTABLE)
    }

    pub fn is_specular(&self) -> bool {
        self.vertex_type.contains(VertexType::SPECULAR)
    }

    pub fn is_light_endpoint(&self) -> bool {
        self.vertex_type.contains(VertexType::LIGHT)
    }

    pub fn is_eye_endpoint(&self) -> bool {
        self.vertex_type.contains(VertexType::EYE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connectable_and_specular_are_mutually_exclusive_in_practice() {
        let vt = VertexType::LIGHT | VertexType::CONNECTABLE;
        assert!(vt.contains(VertexType::CONNECTABLE));
        assert!(!vt.contains(VertexType::SPECULAR));
    }
}

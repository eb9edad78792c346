//! Path-space representation shared by the bidirectional estimators
//! (`estimators::bdpt`, `estimators::vcm`): subpath vertices, the walk that
//! produces them, and the connection/merge algebra that stitches two
//! subpaths into a complete light transport path.

pub mod algebra;
pub mod subpath;
pub mod vertex;

pub use algebra::{connect, connect_to_sensor, mis_weight_connect, mis_weight_vcm, Connection};
pub use subpath::{trace_eye_subpath, trace_eye_subpath_fixed_raster_pos, trace_light_subpath, Subpath, TransportDirection};
pub use vertex::{PathVertex, VertexType};

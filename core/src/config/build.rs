//! Turns a parsed `SceneDocument` into an in-memory `Scene` + `Sensor` pair.
//! Mesh/image loading proper is out of scope (spec.md §1's "asset I/O"
//! non-goal): the only supported `TriangleMesh` asset source is inline
//! `positions`/`normals`/`indices` parameter arrays, and `EnvLight` (which
//! needs a loaded image) is not buildable from a document at all — callers
//! wanting an environment map construct `emitter::EnvLight` directly and
//! hand it to `Scene::new` themselves.

use std::collections::HashMap;
use std::sync::Arc;

use crate::accel::Accel;
use crate::bsdf::{Bsdf, Diffuse, RoughConductor, SpecularDielectric};
use crate::emitter::{AreaLight, DirectionalLight, Emitter, PointLight};
use crate::error::{RenderError, Result};
use crate::math::{Normal3, Point3, Transform, Vector3};
use crate::mesh::TriangleMesh;
use crate::primitive::Primitive;
use crate::scene::Scene;
use crate::sensor::{Pinhole, Sensor, ThinLens};
use crate::spectrum::Spectrum;

use super::document::{AssetSpec, Node, SceneDocument, TransformSpec};
use super::params::Params;

const DEFAULT_RESOLUTION: (u32, u32) = (256, 256);

fn resolve_transform(spec: &Option<TransformSpec>) -> Transform {
    let Some(spec) = spec else { return Transform::identity() };
    if let Some(matrix) = &spec.matrix {
        let values: Vec<f32> = matrix.split_whitespace().filter_map(|t| t.parse().ok()).collect();
        if values.len() == 16 {
            let m = crate::math::Matrix4x4::from_elements(
                values[0], values[1], values[2], values[3], values[4], values[5], values[6], values[7], values[8], values[9],
                values[10], values[11], values[12], values[13], values[14], values[15],
            );
            return Transform::from_matrix(m);
        }
    }
    let mut t = Transform::identity();
    if let Some(scale) = &spec.scale {
        let v: Vec<f32> = scale.split_whitespace().filter_map(|t| t.parse().ok()).collect();
        if v.len() == 3 {
            t = t.then(&Transform::scale(v[0], v[1], v[2]));
        }
    }
    if let Some(rotate) = &spec.rotate {
        let axis: Vec<f32> = rotate.axis.split_whitespace().filter_map(|t| t.parse().ok()).collect();
        if axis.len() == 3 {
            t = t.then(&Transform::rotate(Vector3::new(axis[0], axis[1], axis[2]), rotate.angle));
        }
    }
    if let Some(translate) = &spec.translate {
        let v: Vec<f32> = translate.split_whitespace().filter_map(|t| t.parse().ok()).collect();
        if v.len() == 3 {
            t = t.then(&Transform::translate(Vector3::new(v[0], v[1], v[2])));
        }
    }
    t
}

fn build_mesh(params: &Params, transform: &Transform) -> Arc<TriangleMesh> {
    let raw_positions = params.get_float_array("positions");
    let positions: Vec<Point3> = raw_positions
        .chunks(3)
        .filter(|c| c.len() == 3)
        .map(|c| transform.transform_point(Point3::new(c[0], c[1], c[2])))
        .collect();

    let raw_normals = params.get_float_array("normals");
    let normals: Vec<Normal3> = if raw_normals.len() == raw_positions.len() {
        raw_normals.chunks(3).map(|c| transform.transform_normal(Normal3::new(c[0], c[1], c[2])).normalize()).collect()
    } else {
        // No authored normals: derive a constant per-vertex normal is wrong
        // in general, but a flat `Normal3::new(0,0,1)` placeholder keeps
        // construction total rather than panicking on a malformed asset;
        // real scenes are expected to author normals.
        vec![Normal3::new(0.0, 0.0, 1.0); positions.len()]
    };

    let raw_indices = params.get_int_array("indices");
    let indices: Vec<[u32; 3]> = raw_indices.chunks(3).filter(|c| c.len() == 3).map(|c| [c[0], c[1], c[2]]).collect();

    Arc::new(TriangleMesh::new(positions, normals, indices))
}

fn build_bsdf(interface_type: &str, params: &Params) -> Bsdf {
    match interface_type {
        "rough_conductor" => Bsdf::RoughConductor(RoughConductor::new(
            params.get_spectrum("reflectance", Spectrum::grey(0.9)),
            params.get_float("roughness", 0.1),
            params.get_spectrum("eta", Spectrum::grey(1.5)),
            params.get_spectrum("k", Spectrum::black()),
        )),
        "specular_dielectric" => Bsdf::SpecularDielectric(SpecularDielectric::new(
            params.get_spectrum("reflectance", Spectrum::white()),
            params.get_spectrum("transmittance", Spectrum::white()),
            params.get_float("eta_a", 1.0),
            params.get_float("eta_b", 1.5),
        )),
        _ => Bsdf::Diffuse(Diffuse::new(params.get_spectrum("albedo", Spectrum::grey(0.5)))),
    }
}

fn build_standalone_emitter(interface_type: &str, params: &Params) -> Option<Arc<Emitter>> {
    match interface_type {
        "point" => Some(Arc::new(Emitter::Point(PointLight::new(
            params.get_point3("position", Point3::new(0.0, 0.0, 0.0)),
            params.get_spectrum("intensity", Spectrum::white()),
        )))),
        "directional" => Some(Arc::new(Emitter::Directional(DirectionalLight::new(
            params.get_vector3("direction", Vector3::new(0.0, -1.0, 0.0)).normalize(),
            params.get_spectrum("radiance", Spectrum::white()),
        )))),
        _ => None,
    }
}

fn build_sensor(params: &Params, resolution: (u32, u32), interface_type: &str) -> Sensor {
    let pinhole = Pinhole::new(
        params.get_point3("eye", Point3::new(0.0, 0.0, 0.0)),
        params.get_point3("look_at", Point3::new(0.0, 0.0, 1.0)),
        params.get_vector3("up", Vector3::new(0.0, 1.0, 0.0)),
        params.get_float("fov", 60.0),
        resolution,
    );
    if interface_type == "thin_lens" {
        Sensor::ThinLens(ThinLens::new(pinhole, params.get_float("lens_radius", 0.0), params.get_float("focal_distance", 1.0)))
    } else {
        Sensor::Pinhole(pinhole)
    }
}

struct Built {
    primitives: Vec<Primitive>,
    lights: Vec<Arc<Emitter>>,
    sensor: Option<Sensor>,
}

fn visit(node: &Node, parent: &Transform, assets: &HashMap<String, AssetSpec>, sensor_id: &str, resolution: (u32, u32), out: &mut Built) -> Result<()> {
    let local = resolve_transform(&node.transform);
    let world = parent.then(&local);

    let area_light_asset = node.emitter.as_ref().and_then(|id| assets.get(id)).filter(|a| a.interface == "Emitter");

    if let Some(mesh_id) = &node.mesh {
        let mesh_asset = assets.get(mesh_id).ok_or_else(|| RenderError::UnknownNode(mesh_id.clone()))?;
        let mesh = build_mesh(&mesh_asset.params, &world);

        let bsdf = match &node.bsdf {
            Some(id) => {
                let asset = assets.get(id).ok_or_else(|| RenderError::UnknownNode(id.clone()))?;
                build_bsdf(&asset.type_tag, &asset.params)
            }
            None => Bsdf::Diffuse(Diffuse::new(Spectrum::grey(0.5))),
        };

        let emitter = match area_light_asset {
            Some(asset) => {
                let light = Arc::new(Emitter::Area(AreaLight::new(
                    Arc::clone(&mesh),
                    asset.params.get_spectrum("radiance", Spectrum::white()),
                    asset.params.get_bool("two_sided", false),
                )));
                out.lights.push(Arc::clone(&light));
                Some(light)
            }
            None => None,
        };

        out.primitives.push(Primitive::new(mesh, bsdf, emitter));
    } else if let Some(emitter_id) = &node.emitter {
        let asset = assets.get(emitter_id).ok_or_else(|| RenderError::UnknownNode(emitter_id.clone()))?;
        if asset.interface == "Sensor" && node.id == sensor_id {
            out.sensor = Some(build_sensor(&asset.params, resolution, &asset.type_tag));
        } else if let Some(light) = build_standalone_emitter(&asset.type_tag, &asset.params) {
            out.lights.push(light);
        }
    }

    for child in &node.child {
        visit(child, &world, assets, sensor_id, resolution, out)?;
    }
    Ok(())
}

/// Builds a `Scene` and its `Sensor` from a parsed scene document. The
/// accel `type` tag selects `Accel::build_bvh` (default) vs.
/// `Accel::build_qbvh` (`qbvh`/`sah-qbvh`).
pub fn build_scene(doc: &SceneDocument) -> Result<(Scene, Sensor)> {
    let root = &doc.lightmetrica_scene;

    let resolution = root
        .assets
        .values()
        .find(|a| a.interface == "Film")
        .map(|a| (a.params.get_int("width", DEFAULT_RESOLUTION.0 as i64) as u32, a.params.get_int("height", DEFAULT_RESOLUTION.1 as i64) as u32))
        .unwrap_or(DEFAULT_RESOLUTION);

    let mut built = Built { primitives: Vec::new(), lights: Vec::new(), sensor: None };
    for node in &root.scene.nodes {
        visit(node, &Transform::identity(), &root.assets, &root.scene.sensor, resolution, &mut built)?;
    }

    let sensor = built.sensor.ok_or_else(|| RenderError::InvalidScene(format!("sensor node '{}' not found", root.scene.sensor)))?;
    let accel = if root.scene.accel.type_tag.contains("qbvh") { Accel::build_qbvh(&built.primitives) } else { Accel::build_bvh(&built.primitives) };
    let scene = Scene::new(built.primitives, built.lights, accel);
    Ok((scene, sensor))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> SceneDocument {
        let yaml = r#"
lightmetrica_scene:
  version: "1.0.0"
  assets:
    white:
      interface: BSDF
      type: diffuse
      params: { albedo: "0.7 0.7 0.7" }
    main_sensor_asset:
      interface: Sensor
      type: pinhole
      params:
        eye: "0 1 -4"
        look_at: "0 1 0"
        up: "0 1 0"
        fov: 50
    sun:
      interface: Emitter
      type: directional
      params:
        direction: "0 -1 0"
        radiance: "5 5 5"
  scene:
    sensor: cam
    accel: { type: bvh }
    nodes:
      - id: floor
        bsdf: white
        mesh: floor_mesh
      - id: cam
        emitter: main_sensor_asset
      - id: sun_node
        emitter: sun
"#;
        // floor_mesh asset added separately below to keep the YAML above readable.
        let mut doc: SceneDocument = serde_yaml::from_str(yaml).unwrap();
        let mesh_yaml = r#"
interface: TriangleMesh
type: inline
params:
  positions: [-5.0, 0.0, -5.0, 5.0, 0.0, -5.0, 5.0, 0.0, 5.0, -5.0, 0.0, 5.0]
  normals: [0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0]
  indices: [0, 1, 2, 0, 2, 3]
"#;
        let mesh_asset: super::super::document::AssetSpec = serde_yaml::from_str(mesh_yaml).unwrap();
        doc.lightmetrica_scene.assets.insert("floor_mesh".to_owned(), mesh_asset);
        doc
    }

    #[test]
    fn builds_scene_with_floor_sensor_and_directional_light() {
        let document = doc();
        let (scene, sensor) = build_scene(&document).expect("scene should build");
        assert_eq!(scene.primitives.len(), 1);
        assert_eq!(scene.lights.len(), 1);
        assert_eq!(sensor.resolution(), DEFAULT_RESOLUTION);
    }
}

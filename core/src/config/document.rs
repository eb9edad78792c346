//! Scene/render document schema types, matching spec.md §6 verbatim.
//! Grounded on the teacher's PBRT-text parser's *structure* (a scene is a
//! flat map of named, typed assets plus a node graph referencing them by
//! id) even though the serialization itself is YAML here rather than PBRT's
//! directive stream.

use serde::Deserialize;
use std::collections::HashMap;

use super::params::Params;
use crate::Float;

#[derive(Debug, Deserialize)]
pub struct SceneDocument {
    pub lightmetrica_scene: SceneRoot,
}

#[derive(Debug, Deserialize)]
pub struct SceneRoot {
    pub version: String,
    #[serde(default)]
    pub assets: HashMap<String, AssetSpec>,
    pub scene: SceneGraph,
}

#[derive(Debug, Deserialize)]
pub struct AssetSpec {
    pub interface: String,
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default)]
    pub params: Params,
}

#[derive(Debug, Deserialize)]
pub struct SceneGraph {
    pub sensor: String,
    pub accel: AccelSpec,
    #[serde(default)]
    pub nodes: Vec<Node>,
}

#[derive(Debug, Deserialize)]
pub struct AccelSpec {
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default)]
    pub params: Params,
}

#[derive(Debug, Deserialize, Default)]
pub struct TransformSpec {
    pub matrix: Option<String>,
    pub translate: Option<String>,
    pub rotate: Option<RotateSpec>,
    pub scale: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RotateSpec {
    pub axis: String,
    pub angle: Float,
}

#[derive(Debug, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub transform: Option<TransformSpec>,
    #[serde(default)]
    pub mesh: Option<String>,
    #[serde(default)]
    pub bsdf: Option<String>,
    #[serde(default)]
    pub emitter: Option<String>,
    #[serde(default)]
    pub child: Vec<Node>,
}

#[derive(Debug, Deserialize)]
pub struct RenderDocument {
    pub renderer: RendererSpec,
}

#[derive(Debug, Deserialize)]
pub struct RendererSpec {
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default)]
    pub max_num_vertices: Option<usize>,
    #[serde(default)]
    pub min_num_vertices: Option<usize>,
    #[serde(default)]
    pub num_samples: Option<u64>,
    #[serde(default)]
    pub render_time: Option<Float>,
    #[serde(default)]
    pub grain_size: Option<u32>,
    #[serde(default)]
    pub num_threads: Option<i32>,
    #[serde(default)]
    pub progress_update_interval: Option<Float>,
    #[serde(default)]
    pub progress_image_update_interval: Option<Float>,
    #[serde(default)]
    pub progress_image_update_format: Option<String>,
    #[serde(default)]
    pub seed: Option<u64>,
    pub output_path: String,
    #[serde(default)]
    pub params: Params,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_scene_document() {
        let yaml = r#"
lightmetrica_scene:
  version: "1.0.0"
  assets:
    diffuse_white:
      interface: BSDF
      type: diffuse
      params:
        albedo: "0.8 0.8 0.8"
  scene:
    sensor: main_sensor
    accel: { type: bvh }
    nodes:
      - id: floor
        bsdf: diffuse_white
        mesh: floor_mesh
"#;
        let doc: SceneDocument = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(doc.lightmetrica_scene.version, "1.0.0");
        assert_eq!(doc.lightmetrica_scene.scene.nodes.len(), 1);
        assert_eq!(doc.lightmetrica_scene.scene.nodes[0].id, "floor");
    }

    #[test]
    fn parses_minimal_render_document() {
        let yaml = r#"
renderer:
  type: pt
  max_num_vertices: 10
  num_samples: 64
  output_path: out.png
"#;
        let doc: RenderDocument = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(doc.renderer.type_tag, "pt");
        assert_eq!(doc.renderer.max_num_vertices, Some(10));
    }
}

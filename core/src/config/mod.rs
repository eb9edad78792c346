//! Scene/render document parsing and scene construction. Grounded on the
//! teacher's `paramset.rs` accessor shape and `rustracer-cli`'s `run()`
//! (load documents, build scene, call into the renderer), generalized to
//! the YAML-based configuration spec.md §6 specifies in place of the
//! teacher's PBRT text format.

mod build;
mod document;
mod params;
mod render_settings;

pub use build::build_scene;
pub use document::{AccelSpec, AssetSpec, Node, RenderDocument, RendererSpec, RotateSpec, SceneDocument, SceneGraph, SceneRoot, TransformSpec};
pub use params::Params;
pub use render_settings::{RenderSettings, TerminationCondition};

use crate::error::Result;

pub fn load_scene_document(yaml: &str) -> Result<SceneDocument> {
    Ok(serde_yaml::from_str(yaml)?)
}

pub fn load_render_document(yaml: &str) -> Result<RenderDocument> {
    Ok(serde_yaml::from_str(yaml)?)
}

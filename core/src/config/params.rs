//! Dynamically-typed property bag backed by a `serde_yaml::Value`, resolved
//! on demand. Mirrors the teacher's `ParamSet`/`find_one_*` family
//! (`paramset.rs`) but over a YAML value tree instead of a PBRT token-list,
//! since the external scene format here is YAML (spec.md §6) rather than
//! PBRT text.

use serde::Deserialize;

use crate::Float;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Params(serde_yaml::Value);

impl Params {
    fn field(&self, name: &str) -> Option<&serde_yaml::Value> {
        self.0.as_mapping()?.get(name)
    }

    pub fn get_float(&self, name: &str, default: Float) -> Float {
        self.field(name).and_then(|v| v.as_f64()).map(|v| v as Float).unwrap_or(default)
    }

    pub fn get_int(&self, name: &str, default: i64) -> i64 {
        self.field(name).and_then(|v| v.as_i64()).unwrap_or(default)
    }

    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        self.field(name).and_then(|v| v.as_bool()).unwrap_or(default)
    }

    pub fn get_string(&self, name: &str, default: &str) -> String {
        self.field(name).and_then(|v| v.as_str()).map(|s| s.to_owned()).unwrap_or_else(|| default.to_owned())
    }

    /// Parses a whitespace-separated float list, the scalar encoding spec.md
    /// §6 uses for vectors/matrices (`translate: "x y z"`, `matrix: "m00 …"`).
    pub fn get_floats(&self, name: &str) -> Option<Vec<Float>> {
        let raw = self.field(name)?.as_str()?;
        raw.split_whitespace().map(|tok| tok.parse::<Float>().ok()).collect()
    }

    pub fn get_vector3(&self, name: &str, default: crate::math::Vector3) -> crate::math::Vector3 {
        match self.get_floats(name).as_deref() {
            Some([x, y, z]) => crate::math::Vector3::new(*x, *y, *z),
            _ => default,
        }
    }

    pub fn get_point3(&self, name: &str, default: crate::math::Point3) -> crate::math::Point3 {
        match self.get_floats(name).as_deref() {
            Some([x, y, z]) => crate::math::Point3::new(*x, *y, *z),
            _ => default,
        }
    }

    pub fn get_spectrum(&self, name: &str, default: crate::spectrum::Spectrum) -> crate::spectrum::Spectrum {
        match self.get_floats(name).as_deref() {
            Some([r, g, b]) => crate::spectrum::Spectrum::rgb(*r, *g, *b),
            Some([v]) => crate::spectrum::Spectrum::grey(*v),
            _ => default,
        }
    }

    /// Flat index/position/normal arrays for the inline triangle mesh asset
    /// kind (`positions`/`normals`/`indices`), the only `TriangleMesh` source
    /// this crate supports — loading meshes from an external file format is
    /// explicitly out of scope (spec.md §1's "asset I/O" non-goal).
    pub fn get_float_array(&self, name: &str) -> Vec<Float> {
        self.field(name)
            .and_then(|v| v.as_sequence())
            .map(|seq| seq.iter().filter_map(|v| v.as_f64()).map(|v| v as Float).collect())
            .unwrap_or_default()
    }

    pub fn get_int_array(&self, name: &str) -> Vec<u32> {
        self.field(name)
            .and_then(|v| v.as_sequence())
            .map(|seq| seq.iter().filter_map(|v| v.as_i64()).map(|v| v as u32).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_scalars_and_vector_strings_with_fallback_defaults() {
        let yaml = "radiance: 12.5\nalbedo: \"0.8 0.2 0.1\"\ntwo_sided: true\n";
        let params: Params = serde_yaml::from_str(yaml).unwrap();
        assert!((params.get_float("radiance", 0.0) - 12.5).abs() < 1e-6);
        assert!(params.get_bool("two_sided", false));
        assert!((params.get_float("missing", 3.0) - 3.0).abs() < 1e-6);
        let albedo = params.get_spectrum("albedo", crate::spectrum::Spectrum::black());
        assert!((albedo.r - 0.8).abs() < 1e-6);
    }
}

//! Resolves a parsed `RenderDocument` into the concrete settings
//! `scheduler::render` consumes: estimator choice, termination condition,
//! thread count (the `hardware_concurrency + value` rule for `<= 0` from
//! spec.md §6), and grain/progress cadence.

use crate::Float;

use super::document::RenderDocument;

#[derive(Debug, Clone, Copy)]
pub enum TerminationCondition {
    SampleCount(u64),
    WallClockSeconds(Float),
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub estimator: String,
    pub max_num_vertices: usize,
    pub min_num_vertices: usize,
    pub termination: TerminationCondition,
    pub grain_size: u32,
    pub num_threads: usize,
    pub progress_update_interval: Float,
    pub progress_image_update_interval: Option<Float>,
    pub progress_image_update_format: Option<String>,
    pub seed: u64,
    pub output_path: String,
    // Estimator-specific, defaulted per estimator where unused.
    pub initial_radius: Float,
    pub alpha: Float,
    pub num_photon_trace_samples: u32,
    pub num_iteration_pass: u32,
}

impl RenderSettings {
    pub fn from_document(doc: &RenderDocument) -> RenderSettings {
        let r = &doc.renderer;
        let termination = match r.num_samples {
            Some(n) => TerminationCondition::SampleCount(n),
            None => TerminationCondition::WallClockSeconds(r.render_time.unwrap_or(60.0)),
        };
        let requested_threads = r.num_threads.unwrap_or(-1);
        let num_threads = if requested_threads <= 0 {
            (num_cpus::get() as i32 + requested_threads).max(1) as usize
        } else {
            requested_threads as usize
        };

        RenderSettings {
            estimator: r.type_tag.clone(),
            max_num_vertices: r.max_num_vertices.unwrap_or(10),
            min_num_vertices: r.min_num_vertices.unwrap_or(2),
            termination,
            grain_size: r.grain_size.unwrap_or(16),
            num_threads,
            progress_update_interval: r.progress_update_interval.unwrap_or(5.0),
            progress_image_update_interval: r.progress_image_update_interval,
            progress_image_update_format: r.progress_image_update_format.clone(),
            seed: r.seed.unwrap_or(1),
            output_path: r.output_path.clone(),
            initial_radius: r.params.get_float("initial_radius", 0.1),
            alpha: r.params.get_float("alpha", 0.7),
            num_photon_trace_samples: r.params.get_int("num_photon_trace_samples", 100_000) as u32,
            num_iteration_pass: r.params.get_int("num_iteration_pass", 1) as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_thread_count_is_hardware_concurrency_plus_value() {
        let yaml = "renderer:\n  type: pt\n  num_threads: 0\n  output_path: out.png\n";
        let doc: RenderDocument = serde_yaml::from_str(yaml).unwrap();
        let settings = RenderSettings::from_document(&doc);
        assert_eq!(settings.num_threads, num_cpus::get());
    }

    #[test]
    fn seed_defaults_when_absent_and_is_read_when_present() {
        let yaml = "renderer:\n  type: pt\n  output_path: out.png\n";
        let doc: RenderDocument = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(RenderSettings::from_document(&doc).seed, 1);

        let yaml = "renderer:\n  type: pt\n  seed: 12345\n  output_path: out.png\n";
        let doc: RenderDocument = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(RenderSettings::from_document(&doc).seed, 12345);
    }

    #[test]
    fn num_samples_selects_sample_count_termination() {
        let yaml = "renderer:\n  type: pt\n  num_samples: 128\n  output_path: out.png\n";
        let doc: RenderDocument = serde_yaml::from_str(yaml).unwrap();
        let settings = RenderSettings::from_document(&doc);
        match settings.termination {
            TerminationCondition::SampleCount(n) => assert_eq!(n, 128),
            _ => panic!("expected sample-count termination"),
        }
    }
}

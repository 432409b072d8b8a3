mod heuristic;

pub use heuristic::HeuristicModel;

use image::DynamicImage;
use std::sync::Arc;

use crate::model::Detection;

/// Anything that turns a decoded frame into normalized boxes.
pub trait ObjectModel: Send + Sync {
    fn name(&self) -> &str;

    fn detect(&self, image: &DynamicImage) -> Vec<Detection>;
}

/// The detector a process runs: a loaded model when one is configured, the image heuristic
/// otherwise.
#[derive(Clone)]
pub enum ModelBackend {
    Model(Arc<dyn ObjectModel>),
    Heuristic(HeuristicModel),
}

impl ModelBackend {
    pub fn name(&self) -> &str {
        match self {
            ModelBackend::Model(model) => model.name(),
            ModelBackend::Heuristic(model) => model.name(),
        }
    }

    /// Runs the backend and drops boxes that are degenerate after clamping.
    pub fn detect(&self, image: &DynamicImage) -> Vec<Detection> {
        let raw = match self {
            ModelBackend::Model(model) => model.detect(image),
            ModelBackend::Heuristic(model) => model.detect(image),
        };
        raw.into_iter().filter_map(Detection::clamped).collect()
    }
}

impl Default for ModelBackend {
    fn default() -> Self {
        ModelBackend::Heuristic(HeuristicModel::default())
    }
}

impl std::fmt::Debug for ModelBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ModelBackend").field(&self.name()).finish()
    }
}

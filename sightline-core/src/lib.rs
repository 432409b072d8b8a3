pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod session;
pub mod utils;
pub mod vision;

pub use model::*;

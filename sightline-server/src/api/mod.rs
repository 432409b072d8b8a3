mod inference;
mod metrics;
mod status;

pub use inference::*;
pub use metrics::*;
pub use status::*;

use sightline_core::IceServerConfig;
use sightline_core::utils::default_ice_servers;
use std::time::Duration;

pub const DEFAULT_CONTROL_LABEL: &str = "meta";
pub const DEFAULT_NEGOTIATION_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ice_servers: Vec<IceServerConfig>,
    /// How long a session may stay negotiating before it fails. `None` waits forever.
    pub negotiation_timeout: Option<Duration>,
    /// Label of the side channel carrying frame metadata.
    pub control_label: String,
}

impl SessionConfig {
    /// Host candidates only, for peers on the same machine or network.
    pub fn local() -> Self {
        Self {
            ice_servers: Vec::new(),
            ..Self::default()
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ice_servers: default_ice_servers(),
            negotiation_timeout: Some(DEFAULT_NEGOTIATION_TIMEOUT),
            control_label: DEFAULT_CONTROL_LABEL.to_owned(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Render cadence. Each tick may submit at most one frame.
    pub tick: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(66),
        }
    }
}

use serde::Deserialize;
use sightline_core::metrics::DEFAULT_CAPACITY;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

/// Where detection runs for this deployment. Only reported by `GET /`; `/infer` works in
/// either mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferenceMode {
    #[default]
    Wasm,
    Server,
}

impl InferenceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InferenceMode::Wasm => "wasm",
            InferenceMode::Server => "server",
        }
    }
}

impl fmt::Display for InferenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InferenceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wasm" => Ok(InferenceMode::Wasm),
            "server" => Ok(InferenceMode::Server),
            other => Err(format!("unknown mode '{}', expected 'wasm' or 'server'", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Allowed browser origins. Empty allows any origin.
    pub cors_origins: Vec<String>,
    pub mode: InferenceMode,
    /// Samples kept for `/metrics/summary`; the oldest are dropped first.
    pub metrics_capacity: usize,
    /// Largest accepted `/infer` upload.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
            cors_origins: Vec::new(),
            mode: InferenceMode::default(),
            metrics_capacity: DEFAULT_CAPACITY,
            max_upload_bytes: 8 * 1024 * 1024,
        }
    }
}

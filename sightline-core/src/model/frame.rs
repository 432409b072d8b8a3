use serde::{Deserialize, Serialize};
use std::fmt;

/// Frame identity: a monotonic counter, or an opaque tag supplied by a remote peer.
///
/// Numeric strings deserialize as `Seq`, so `"1"` and `1` name the same frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged, from = "WireFrameId")]
pub enum FrameId {
    Seq(i64),
    Tag(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireFrameId {
    Int(i64),
    Text(String),
}

impl From<WireFrameId> for FrameId {
    fn from(raw: WireFrameId) -> Self {
        match raw {
            WireFrameId::Int(n) => FrameId::Seq(n),
            WireFrameId::Text(s) => FrameId::parse(&s),
        }
    }
}

impl FrameId {
    /// Numeric text becomes `Seq`, so ids survive a trip through form fields.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.parse::<i64>() {
            Ok(n) => FrameId::Seq(n),
            Err(_) => FrameId::Tag(raw.to_owned()),
        }
    }
}

impl From<i64> for FrameId {
    fn from(n: i64) -> Self {
        FrameId::Seq(n)
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameId::Seq(n) => write!(f, "{}", n),
            FrameId::Tag(s) => f.write_str(s),
        }
    }
}

/// Identity and capture time of one frame, carried out of band from the media path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameMeta {
    pub frame_id: FrameId,
    /// Capture-side clock, milliseconds since the Unix epoch.
    pub capture_ts: i64,
}

impl FrameMeta {
    pub fn new(frame_id: impl Into<FrameId>, capture_ts: i64) -> Self {
        Self {
            frame_id: frame_id.into(),
            capture_ts,
        }
    }

    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn decode(data: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(data)
    }
}

use serde::{Deserialize, Serialize};

use crate::model::FrameId;

/// One detected object; box coordinates are normalized to `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub score: f64,
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Detection {
    /// Clamps score and box into range. Returns `None` for a box that is empty after clamping.
    pub fn clamped(self) -> Option<Self> {
        let clamp = |v: f64| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        let out = Detection {
            score: clamp(self.score),
            xmin: clamp(self.xmin),
            ymin: clamp(self.ymin),
            xmax: clamp(self.xmax),
            ymax: clamp(self.ymax),
            label: self.label,
        };
        (out.xmin < out.xmax && out.ymin < out.ymax).then_some(out)
    }
}

/// Per-frame detector output, in the JSON shape served by the inference endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    pub frame_id: FrameId,
    pub capture_ts: i64,
    pub recv_ts: i64,
    pub inference_ts: i64,
    #[serde(default)]
    pub detections: Vec<Detection>,
}

impl InferenceResult {
    /// What `/latest` answers before any frame has been processed.
    pub fn placeholder() -> Self {
        Self {
            frame_id: FrameId::Seq(-1),
            capture_ts: 0,
            recv_ts: 0,
            inference_ts: 0,
            detections: Vec::new(),
        }
    }

    pub fn normalized(mut self) -> Self {
        self.detections = self
            .detections
            .into_iter()
            .filter_map(Detection::clamped)
            .collect();
        self
    }
}

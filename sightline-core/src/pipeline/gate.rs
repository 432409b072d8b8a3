use tracing::debug;

use crate::model::{FrameId, FrameMeta, InferenceResult};

/// Latest-frame-only admission control for the viewer's detection loop.
///
/// At most one submission is outstanding. A tick that arrives while one is outstanding is
/// skipped and its frame discarded; nothing is ever queued. The gate is clock-agnostic: callers
/// pass the current time in milliseconds.
#[derive(Debug)]
pub struct FrameGate {
    outstanding: Option<Outstanding>,
    next_seq: i64,
    stats: GateStats,
}

#[derive(Debug, Clone)]
struct Outstanding {
    meta: FrameMeta,
    submitted_at: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateStats {
    pub submitted: u64,
    pub skipped: u64,
    pub completed: u64,
    pub failed: u64,
    pub ignored: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickDecision {
    Submit(FrameMeta),
    Skip { outstanding: FrameId },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reconciled {
    Accepted { latency_ms: f64, round_trip_ms: i64 },
    Ignored,
}

impl Default for FrameGate {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameGate {
    pub fn new() -> Self {
        Self {
            outstanding: None,
            next_seq: 1,
            stats: GateStats::default(),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.outstanding.is_some()
    }

    pub fn outstanding(&self) -> Option<&FrameMeta> {
        self.outstanding.as_ref().map(|o| &o.meta)
    }

    pub fn stats(&self) -> GateStats {
        self.stats
    }

    /// Decides whether the frame drawn on this tick is submitted.
    ///
    /// `latest_capture_ts` is the capture time from the most recent frame metadata received
    /// from the sender; without it the frame is stamped with `now_ms`.
    pub fn on_tick(&mut self, latest_capture_ts: Option<i64>, now_ms: i64) -> TickDecision {
        if let Some(pending) = &self.outstanding {
            self.stats.skipped += 1;
            return TickDecision::Skip {
                outstanding: pending.meta.frame_id.clone(),
            };
        }

        let meta = FrameMeta::new(self.next_seq, latest_capture_ts.unwrap_or(now_ms));
        self.next_seq += 1;
        self.stats.submitted += 1;
        self.outstanding = Some(Outstanding {
            meta: meta.clone(),
            submitted_at: now_ms,
        });
        TickDecision::Submit(meta)
    }

    /// Matches a result against the outstanding submission.
    ///
    /// A result for any other frame leaves the gate untouched.
    pub fn on_result(&mut self, result: &InferenceResult, now_ms: i64) -> Reconciled {
        let matches = self
            .outstanding
            .as_ref()
            .is_some_and(|o| o.meta.frame_id == result.frame_id);
        if !matches {
            self.stats.ignored += 1;
            debug!("Ignoring result for untracked frame {}", result.frame_id);
            return Reconciled::Ignored;
        }

        let Some(done) = self.outstanding.take() else {
            return Reconciled::Ignored;
        };
        self.stats.completed += 1;
        Reconciled::Accepted {
            latency_ms: e2e_latency_ms(now_ms, done.meta.capture_ts),
            round_trip_ms: (now_ms - done.submitted_at).max(0),
        }
    }

    /// Abandons the outstanding submission for `frame_id` so the next tick can submit.
    pub fn on_failure(&mut self, frame_id: &FrameId) -> bool {
        match &self.outstanding {
            Some(o) if &o.meta.frame_id == frame_id => {
                self.outstanding = None;
                self.stats.failed += 1;
                true
            }
            _ => false,
        }
    }

    /// Drops whatever is outstanding, e.g. when the request task itself was lost.
    pub fn abandon(&mut self) {
        if self.outstanding.take().is_some() {
            self.stats.failed += 1;
        }
    }
}

/// End-to-end latency, clamped at zero when clocks disagree.
pub fn e2e_latency_ms(now_ms: i64, capture_ts: i64) -> f64 {
    let raw = now_ms - capture_ts;
    if raw < 0 {
        debug!("Clock skew: capture_ts {} is {} ms ahead", capture_ts, -raw);
    }
    raw.max(0) as f64
}

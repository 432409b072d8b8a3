mod gate;

pub use gate::{FrameGate, GateStats, Reconciled, TickDecision, e2e_latency_ms};

mod machine;

pub use machine::{
    FailureReason, NegotiationMachine, NegotiationStep, PeerState, Rejected, Role, SessionEffect,
    SessionEvent,
};

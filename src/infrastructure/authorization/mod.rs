//! Authorization infrastructure - the Decision Engine

mod engine;

pub use engine::DecisionEngine;

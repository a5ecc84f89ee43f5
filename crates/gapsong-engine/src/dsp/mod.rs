//! Sample-level building blocks shared by the live and offline paths.
//!
//! Everything in here is a plain per-sample (or per-block) state machine
//! with no knowledge of gaps or scores; the session wires these together.

pub mod convolver;
pub mod envelope;
pub mod filter;
pub mod lfo;
pub mod sampler;

//! `stormfront` - choreographed lightning entrance sequence
//!
//! Plays a fixed, phase-sequenced entrance (darkness, anticipation, impact,
//! settle, ambient) against a stage of role-addressed elements, with a
//! flash engine for the lightning overlay, an adapter over an ambient
//! particle simulation, and a reduced-motion bypass that renders the final
//! state directly.

pub mod chance;
pub mod cli;
pub mod config;
pub mod error;
pub mod flash;
pub mod motion;
pub mod observability;
pub mod particles;
pub mod sequence;
pub mod stage;
pub mod tween;

// src/build/mod.rs

//! Staged build pipeline executed once per untested commit.

pub mod pipeline;

pub use pipeline::{BuildOutcome, Stage, StagedBuild};

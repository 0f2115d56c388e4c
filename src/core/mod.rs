//! Core loop - sampling, state and input

pub mod app;
pub mod events;
pub mod sampler;
pub mod state;

//! Wire models for the vLLM deployment controller HTTP API.

pub mod models;

pub use models::*;

//! vLLM Deployment Controller Library
//!
//! Tracks vLLM serving stacks installed with Helm and derives, for each one,
//! whether it can answer inference requests.

pub mod app;
pub mod errors;
pub mod exec;
pub mod identity;
pub mod inventory;
pub mod logs;
pub mod reconcile;
pub mod registry;
pub mod server;
pub mod services;
pub mod storage;
pub mod telemetry;
pub mod utils;
pub mod workers;

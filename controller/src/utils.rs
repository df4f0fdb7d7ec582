//! Utility functions

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Name reported by the health endpoint and the version output
pub const SERVICE_NAME: &str = "vllm-controller";

/// Build information for the controller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub service: String,
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Version stamped at build time
pub fn version_info() -> VersionInfo {
    VersionInfo {
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// Backoff between retries of a failing cluster call
#[derive(Debug, Clone)]
pub struct CooldownOptions {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for CooldownOptions {
    fn default() -> Self {
        // an unreachable API server usually comes back within a minute
        Self {
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
        }
    }
}

/// Delay before retry number `attempt` (zero-based), capped at `max_delay`
pub fn calc_exp_backoff(options: &CooldownOptions, attempt: u32) -> Duration {
    let exponent = attempt.min(64) as i32;
    let delay_secs = options.base_delay.as_secs_f64() * options.multiplier.powi(exponent);
    let max_secs = options.max_delay.as_secs_f64();
    if !delay_secs.is_finite() || delay_secs >= max_secs {
        return options.max_delay;
    }
    Duration::from_secs_f64(delay_secs)
}

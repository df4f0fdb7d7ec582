//! Warm-start worker: rebuilds tracked deployments from installed releases

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::services::DeploymentService;
use crate::utils::{calc_exp_backoff, CooldownOptions};

/// Warm-start worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Backoff between failed release listings
    pub cooldown: CooldownOptions,

    /// Attempts before giving up
    pub max_attempts: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            cooldown: CooldownOptions::default(),
            max_attempts: 10,
        }
    }
}

/// Run the warm start, retrying with exponential backoff until it succeeds,
/// the attempts run out, or shutdown is signalled
pub async fn run<S, F>(
    options: &Options,
    service: &DeploymentService,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Warm start worker starting...");

    let mut attempt: u32 = 0;
    loop {
        let result = tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Warm start worker shutting down...");
                return;
            }
            result = service.warm_start() => result,
        };

        let wait = match result {
            Ok(count) => {
                info!("Warm start complete, {} deployments tracked", count);
                return;
            }
            Err(e) => {
                attempt += 1;
                if attempt >= options.max_attempts {
                    error!("Warm start failed after {} attempts: {}", attempt, e);
                    return;
                }
                let wait = calc_exp_backoff(&options.cooldown, attempt - 1);
                warn!("Warm start failed (attempt {}), retrying in {:?}: {}", attempt, wait, e);
                wait
            }
        };

        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Warm start worker shutting down...");
                return;
            }
            _ = sleep_fn(wait) => {}
        }
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Ordered load strategies
//!
//! Each model component is provisioned by walking an explicit list of
//! strategies. A strategy either produces the component, declines with a
//! reason so the next one is tried, or aborts the whole chain.

use tracing::{info, warn};

use super::device::DeviceTag;
use super::errors::ModelError;

/// Outcome of a single load attempt
#[derive(Debug)]
pub enum LoadOutcome<T> {
    /// Component loaded
    Ready(T),
    /// Recoverable failure; try the next strategy
    Fallthrough(String),
    /// Unrecoverable failure; stop the chain
    Fatal(ModelError),
}

/// One way of producing a model component
pub trait LoadStrategy<T>: Send + Sync {
    /// Name used in logs and in `ModelError::ModelLoad` attempts
    fn name(&self) -> &'static str;

    fn attempt(&self, device: DeviceTag) -> LoadOutcome<T>;
}

/// Try `strategies` in order and return the first success with its strategy name
///
/// # Errors
/// The first `Fatal` outcome, or `ModelError::ModelLoad` listing every
/// fall-through reason once the list is exhausted.
pub fn run_chain<T>(
    component: &str,
    strategies: &[Box<dyn LoadStrategy<T>>],
    device: DeviceTag,
) -> Result<(T, &'static str), ModelError> {
    let mut attempts = Vec::with_capacity(strategies.len());

    for strategy in strategies {
        match strategy.attempt(device) {
            LoadOutcome::Ready(value) => {
                info!("✅ {} provisioned via {}", component, strategy.name());
                return Ok((value, strategy.name()));
            }
            LoadOutcome::Fallthrough(reason) => {
                warn!(
                    "⚠️ {} strategy {} unavailable: {}",
                    component,
                    strategy.name(),
                    reason
                );
                attempts.push(format!("{}: {}", strategy.name(), reason));
            }
            LoadOutcome::Fatal(err) => {
                tracing::error!("❌ {} strategy {} failed: {}", component, strategy.name(), err);
                return Err(err);
            }
        }
    }

    Err(ModelError::ModelLoad {
        component: component.to_string(),
        attempts,
    })
}

//! Breaker transition monitoring.
//!
//! One task per breaker subscribes to its transition events and turns them
//! into log lines and metrics until shutdown.

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::orchestrator::DependencyBreakers;
use crate::resilience::circuit_breaker::{BreakerEvent, OpenCause, Transition};

pub fn log_event(event: &BreakerEvent) {
    let dependency = event.dependency.display_name();
    match event.transition {
        Transition::Opened(OpenCause::FailureRatio { failures, calls }) => {
            tracing::warn!(failures, calls, "Circuit opened: {} service unavailable", dependency)
        }
        Transition::Opened(OpenCause::ProbeFailed) => {
            tracing::warn!("Circuit opened: {} service probe failed", dependency)
        }
        Transition::Opened(OpenCause::Manual) => {
            tracing::warn!("Circuit opened manually: {} service", dependency)
        }
        Transition::HalfOpened => tracing::info!("Circuit half-open: testing {} service", dependency),
        Transition::Closed => tracing::info!("Circuit closed: {} service recovered", dependency),
    }
    metrics::record_circuit_state(event.dependency.as_str(), event.transition.state());
}

/// Spawn one monitor task per breaker.
pub fn spawn_breaker_monitors(
    breakers: &DependencyBreakers,
    shutdown: &Shutdown,
) -> Vec<JoinHandle<()>> {
    breakers
        .iter()
        .map(|breaker| {
            let mut events = breaker.subscribe();
            let mut stop = shutdown.subscribe();
            let name = breaker.name();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        received = events.recv() => match received {
                            Ok(event) => log_event(&event),
                            Err(RecvError::Lagged(skipped)) => {
                                tracing::warn!(dependency = name, skipped, "Breaker monitor lagged behind");
                            }
                            Err(RecvError::Closed) => break,
                        },
                        _ = stop.recv() => break,
                    }
                }
                tracing::debug!(dependency = name, "Breaker monitor stopped");
            })
        })
        .collect()
}

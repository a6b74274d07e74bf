//! The set of per-dependency circuit breakers.

use serde::Serialize;

use crate::config::CircuitBreakerConfig;
use crate::downstream::Dependency;
use crate::resilience::circuit_breaker::{BreakerStatus, CircuitBreaker};

/// One independent breaker per dependency, created at startup.
pub struct DependencyBreakers {
    payment: CircuitBreaker,
    inventory: CircuitBreaker,
    shipping: CircuitBreaker,
}

/// Combined status, keyed by dependency name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircuitStatusReport {
    pub payment: BreakerStatus,
    pub inventory: BreakerStatus,
    pub shipping: BreakerStatus,
}

impl DependencyBreakers {
    pub fn new(config: &CircuitBreakerConfig) -> Self {
        Self {
            payment: CircuitBreaker::new(Dependency::Payment, config.clone()),
            inventory: CircuitBreaker::new(Dependency::Inventory, config.clone()),
            shipping: CircuitBreaker::new(Dependency::Shipping, config.clone()),
        }
    }

    pub fn get(&self, dependency: Dependency) -> &CircuitBreaker {
        match dependency {
            Dependency::Payment => &self.payment,
            Dependency::Inventory => &self.inventory,
            Dependency::Shipping => &self.shipping,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &CircuitBreaker> {
        Dependency::ALL.into_iter().map(move |d| self.get(d))
    }

    /// Manually open the breaker of `dependency`.
    pub fn trip(&self, dependency: Dependency) {
        self.get(dependency).open();
        tracing::warn!(dependency = %dependency, "Circuit opened manually");
    }

    pub fn status(&self) -> CircuitStatusReport {
        CircuitStatusReport {
            payment: self.payment.status(),
            inventory: self.inventory.status(),
            shipping: self.shipping.status(),
        }
    }
}

//! Order orchestration.
//!
//! Sequences the three dependency calls of one order through their breakers:
//! payment, then inventory, then shipping. Every call is attempted even when
//! an earlier one fell back or failed; fallbacks are not failures here.

use serde::Serialize;
use std::sync::Arc;

use crate::downstream::{Dependency, DependencyCall, Downstream, DownstreamError};
use crate::error::OrderError;
use crate::orchestrator::breakers::DependencyBreakers;
use crate::resilience::fallback::Outcome;

/// Aggregated outcome of one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderResult {
    #[serde(skip)]
    pub order_id: String,
    pub payment: Outcome,
    pub inventory: Outcome,
    pub shipping: Outcome,
}

impl OrderResult {
    pub fn outcome(&self, dependency: Dependency) -> &Outcome {
        match dependency {
            Dependency::Payment => &self.payment,
            Dependency::Inventory => &self.inventory,
            Dependency::Shipping => &self.shipping,
        }
    }

    /// Dependencies that answered with their fallback.
    pub fn degraded(&self) -> Vec<Dependency> {
        Dependency::ALL
            .into_iter()
            .filter(|d| self.outcome(*d).is_fallback())
            .collect()
    }
}

pub struct OrderOrchestrator {
    breakers: Arc<DependencyBreakers>,
    downstream: Arc<dyn Downstream>,
}

impl OrderOrchestrator {
    pub fn new(breakers: Arc<DependencyBreakers>, downstream: Arc<dyn Downstream>) -> Self {
        Self { breakers, downstream }
    }

    pub fn breakers(&self) -> &Arc<DependencyBreakers> {
        &self.breakers
    }

    /// Send one call through the breaker of its target.
    pub async fn fire(&self, call: DependencyCall) -> Result<Outcome, DownstreamError> {
        let breaker = self.breakers.get(call.target);
        breaker.fire(|| self.downstream.call(&call)).await
    }

    pub async fn process_order(&self, order_id: &str, product_id: &str) -> Result<OrderResult, OrderError> {
        let payment = self.fire(DependencyCall::payment(order_id)).await;
        let inventory = self.fire(DependencyCall::inventory(product_id)).await;
        let shipping = self.fire(DependencyCall::shipping(order_id)).await;

        let result = OrderResult {
            order_id: order_id.to_string(),
            payment: payment?,
            inventory: inventory?,
            shipping: shipping?,
        };

        let degraded = result.degraded();
        if degraded.is_empty() {
            tracing::info!(order_id, product_id, "Order processed");
        } else {
            tracing::warn!(order_id, product_id, degraded = ?degraded, "Order processed with fallbacks");
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CircuitBreakerConfig;
    use crate::downstream::Payload;
    use crate::resilience::fallback::{FallbackReason, PAYMENT_FALLBACK};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Clone, Copy)]
    enum Behavior {
        Succeed,
        Fail,
        Invalid,
    }

    #[derive(Default)]
    struct ScriptedDownstream {
        behavior: HashMap<Dependency, Behavior>,
        calls: Mutex<Vec<Dependency>>,
    }

    impl ScriptedDownstream {
        fn with(mut self, dependency: Dependency, behavior: Behavior) -> Self {
            self.behavior.insert(dependency, behavior);
            self
        }

        fn calls_to(&self, dependency: Dependency) -> usize {
            self.calls.lock().unwrap().iter().filter(|d| **d == dependency).count()
        }
    }

    #[async_trait]
    impl Downstream for ScriptedDownstream {
        async fn call(&self, call: &DependencyCall) -> Result<String, DownstreamError> {
            self.calls.lock().unwrap().push(call.target);
            match self.behavior.get(&call.target).copied().unwrap_or(Behavior::Succeed) {
                Behavior::Succeed => Ok(match &call.payload {
                    Payload::Order { order_id } => format!("{} done for order {}", call.target, order_id),
                    Payload::Product { product_id } => format!("{} done for product {}", call.target, product_id),
                }),
                Behavior::Fail => Err(DownstreamError::Status(call.target, 503)),
                Behavior::Invalid => Err(DownstreamError::InvalidRequest(call.target, "invalid uri".into())),
            }
        }
    }

    fn orchestrator(downstream: Arc<ScriptedDownstream>) -> OrderOrchestrator {
        let breakers = Arc::new(DependencyBreakers::new(&CircuitBreakerConfig::default()));
        OrderOrchestrator::new(breakers, downstream)
    }

    #[tokio::test]
    async fn test_all_dependencies_answer() {
        let downstream = Arc::new(ScriptedDownstream::default());
        let result = orchestrator(downstream.clone()).process_order("1", "sku-1").await.unwrap();

        assert_eq!(result.payment.text(), "payment done for order 1");
        assert_eq!(result.inventory.text(), "inventory done for product sku-1");
        assert_eq!(result.shipping.text(), "shipping done for order 1");
        assert!(result.degraded().is_empty());
        assert_eq!(*downstream.calls.lock().unwrap(), Dependency::ALL.to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_payment_opens_breaker_and_falls_back() {
        let downstream = Arc::new(ScriptedDownstream::default().with(Dependency::Payment, Behavior::Fail));
        let orch = orchestrator(downstream.clone());

        for n in 1..=4 {
            let result = orch.process_order(&n.to_string(), "sku-1").await.unwrap();
            assert_eq!(result.payment.text(), PAYMENT_FALLBACK);
            assert_eq!(result.inventory.text(), "inventory done for product sku-1");
            assert_eq!(result.degraded(), vec![Dependency::Payment]);
        }

        assert!(orch.breakers().status().payment.is_open);
        assert_eq!(downstream.calls_to(Dependency::Payment), 2);
        assert_eq!(downstream.calls_to(Dependency::Inventory), 4);
        assert_eq!(downstream.calls_to(Dependency::Shipping), 4);

        let result = orch.process_order("5", "sku-1").await.unwrap();
        assert_eq!(
            result.payment,
            Outcome::Fallback { reason: FallbackReason::CircuitOpen, message: PAYMENT_FALLBACK }
        );
    }

    #[tokio::test]
    async fn test_transport_error_fails_order_after_all_attempts() {
        let downstream = Arc::new(ScriptedDownstream::default().with(Dependency::Inventory, Behavior::Invalid));
        let err = orchestrator(downstream.clone()).process_order("9", "sku-9").await.unwrap_err();

        assert!(matches!(err, OrderError::Transport(DownstreamError::InvalidRequest(Dependency::Inventory, _))));
        assert_eq!(downstream.calls_to(Dependency::Shipping), 1);
    }

    #[tokio::test]
    async fn test_tripped_dependency_is_not_called() {
        let downstream = Arc::new(ScriptedDownstream::default());
        let orch = orchestrator(downstream.clone());
        orch.breakers().trip(Dependency::Shipping);

        let result = orch.process_order("3", "sku-3").await.unwrap();
        assert_eq!(result.degraded(), vec![Dependency::Shipping]);
        assert_eq!(downstream.calls_to(Dependency::Shipping), 0);
    }

    #[tokio::test]
    async fn test_fire_routes_by_target() {
        let downstream = Arc::new(ScriptedDownstream::default());
        let outcome = orchestrator(downstream.clone())
            .fire(DependencyCall::inventory("sku-4"))
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Response("inventory done for product sku-4".into()));
        assert_eq!(*downstream.calls.lock().unwrap(), vec![Dependency::Inventory]);
    }
}

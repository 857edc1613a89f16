//! Policy pipeline.
//!
//! Binds one transport, one classifier and one chosen policy into the
//! callable used by the product service. Policies are alternatives here,
//! never stacked.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::client::transport::Transport;
use crate::config::ResilienceConfig;
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::observer::PolicyObserver;
use crate::resilience::outcome::{Outcome, OutcomeClassifier};
use crate::resilience::retries::RetryPolicy;

/// Which policy wraps the outbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyChoice {
    Retry,
    CircuitBreaker,
    #[default]
    AdvancedCircuitBreaker,
}

impl fmt::Display for PolicyChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PolicyChoice::Retry => "retry",
            PolicyChoice::CircuitBreaker => "circuit_breaker",
            PolicyChoice::AdvancedCircuitBreaker => "advanced_circuit_breaker",
        })
    }
}

enum Policy {
    Retry(RetryPolicy),
    Breaker(Arc<CircuitBreaker>),
}

pub struct Pipeline {
    choice: PolicyChoice,
    policy: Policy,
    classifier: OutcomeClassifier,
    transport: Arc<dyn Transport>,
}

impl Pipeline {
    pub fn build(
        name: &str,
        config: &ResilienceConfig,
        transport: Arc<dyn Transport>,
        observer: Arc<dyn PolicyObserver>,
    ) -> Self {
        let choice = config.policy;
        let policy = match choice {
            PolicyChoice::Retry => Policy::Retry(RetryPolicy::new(&config.retry, observer)),
            PolicyChoice::CircuitBreaker => Policy::Breaker(Arc::new(CircuitBreaker::consecutive(
                name,
                &config.circuit_breaker,
                observer,
            ))),
            PolicyChoice::AdvancedCircuitBreaker => Policy::Breaker(Arc::new(
                CircuitBreaker::advanced(name, &config.advanced_circuit_breaker, observer),
            )),
        };

        tracing::info!(dependency = %name, policy = %choice, "Resilience pipeline built");

        Self {
            choice,
            policy,
            classifier: OutcomeClassifier::new(&config.treat_as_failure),
            transport,
        }
    }

    pub fn choice(&self) -> PolicyChoice {
        self.choice
    }

    /// The breaker guarding this pipeline, if the policy has one.
    pub fn breaker(&self) -> Option<&Arc<CircuitBreaker>> {
        match &self.policy {
            Policy::Breaker(breaker) => Some(breaker),
            Policy::Retry(_) => None,
        }
    }

    /// Perform the guarded GET for `path`.
    pub async fn execute(&self, path: &str, request_id: Option<&str>) -> Outcome {
        let classifier = &self.classifier;
        let transport = &self.transport;
        let attempt = move || async move { classifier.classify(transport.get(path, request_id).await) };

        match &self.policy {
            Policy::Retry(retry) => retry.execute(attempt).await,
            Policy::Breaker(breaker) => breaker.execute(attempt).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::transport::testing::{status, ScriptedTransport};
    use crate::resilience::circuit_breaker::BreakerState;
    use crate::resilience::observer::NoopObserver;
    use crate::resilience::outcome::FailureKind;

    fn build(policy: PolicyChoice, transport: Arc<ScriptedTransport>) -> Pipeline {
        let config = ResilienceConfig {
            policy,
            ..ResilienceConfig::default()
        };
        Pipeline::build("products", &config, transport, Arc::new(NoopObserver))
    }

    #[test]
    fn test_policy_choice_names() {
        let parsed: PolicyChoice = serde_json::from_str("\"advanced_circuit_breaker\"").unwrap();
        assert_eq!(parsed, PolicyChoice::AdvancedCircuitBreaker);
        assert_eq!(PolicyChoice::CircuitBreaker.to_string(), "circuit_breaker");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_pipeline_has_no_breaker() {
        let transport = Arc::new(ScriptedTransport::new(vec![status(500, "")], status(200, "ok")));
        let pipeline = build(PolicyChoice::Retry, transport.clone());

        assert!(pipeline.breaker().is_none());
        assert!(pipeline.execute("7", None).await.is_success());
        assert_eq!(transport.paths(), vec!["7", "7"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_breaker_pipelines_do_not_retry() {
        for choice in [PolicyChoice::CircuitBreaker, PolicyChoice::AdvancedCircuitBreaker] {
            let transport = Arc::new(ScriptedTransport::always(status(404, "")));
            let pipeline = build(choice, transport.clone());

            for _ in 0..3 {
                let outcome = pipeline.execute("1", None).await;
                assert_eq!(outcome.handled().unwrap().kind, FailureKind::TreatedAsFailure);
            }
            assert_eq!(transport.calls(), 3, "{choice}");

            let breaker = pipeline.breaker().unwrap();
            assert_eq!(breaker.state(), BreakerState::Open, "{choice}");
            assert_eq!(
                pipeline.execute("1", None).await.handled().unwrap().kind,
                FailureKind::CircuitOpen
            );
            assert_eq!(transport.calls(), 3);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_classifier_follows_config() {
        let transport = Arc::new(ScriptedTransport::always(status(404, "")));
        let config = ResilienceConfig {
            treat_as_failure: Vec::new(),
            ..ResilienceConfig::default()
        };
        let pipeline = Pipeline::build("products", &config, transport, Arc::new(NoopObserver));
        assert!(pipeline.execute("1", None).await.is_success());
    }
}

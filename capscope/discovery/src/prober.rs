//! Single-probe engine.
//!
//! Issues one deliberately harmless request against a candidate
//! endpoint and classifies the response. Endpoints are supplied only by
//! internal callers (module detector, resource mapper) from provider
//! tables — never by the outer request boundary.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::debug;

use capscope_core::Classification;

use crate::classify::{classify, ClassifyPolicy, ProbeOutcome};
use crate::transport::{ProbeTransport, TransportError, TransportRequest};

pub struct Prober {
    transport: Arc<dyn ProbeTransport>,
    retry_backoff: Duration,
}

impl Prober {
    pub fn new(transport: Arc<dyn ProbeTransport>, retry_backoff: Duration) -> Self {
        Self {
            transport,
            retry_backoff,
        }
    }

    /// Issue one probe and classify it.
    ///
    /// 5xx and transport failures are retried once after a short
    /// backoff, then absorbed into the classification — one unreachable
    /// endpoint must not abort a whole discovery pass.
    pub async fn probe(
        &self,
        request: TransportRequest,
        policy: &ClassifyPolicy,
    ) -> Classification {
        let url = request.url.clone();
        let first = self.attempt(request.clone()).await;
        let outcome = if needs_retry(&first) {
            tokio::time::sleep(self.retry_backoff).await;
            self.attempt(request).await
        } else {
            first
        };

        let classification = classify(outcome, policy);
        debug!(url = %url, ?outcome, ?classification, "probe classified");
        classification
    }

    async fn attempt(&self, request: TransportRequest) -> ProbeOutcome {
        match self.transport.send(request).await {
            Ok(response) => ProbeOutcome::Status(response.status),
            Err(TransportError::Timeout) => ProbeOutcome::TimedOut,
            Err(TransportError::Connect(_)) => ProbeOutcome::TransportFailure,
        }
    }
}

fn needs_retry(outcome: &ProbeOutcome) -> bool {
    match outcome {
        ProbeOutcome::TransportFailure | ProbeOutcome::TimedOut => true,
        ProbeOutcome::Status(status) => *status >= 500,
    }
}

/// Run a probe under the worker-pool bound and the pass deadline.
/// Work still unfinished at the deadline is recorded as inconclusive,
/// never silently dropped.
pub async fn bounded_probe(
    prober: Arc<Prober>,
    limiter: Arc<Semaphore>,
    request: TransportRequest,
    policy: ClassifyPolicy,
    deadline: Instant,
) -> Classification {
    let run = async {
        let _permit = limiter.acquire_owned().await.ok()?;
        Some(prober.probe(request, &policy).await)
    };
    match tokio::time::timeout_at(deadline, run).await {
        Ok(Some(classification)) => classification,
        _ => Classification::Inconclusive,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use crate::transport::build_request;
    use capscope_core::Credential;
    use capscope_providers::{AuthScheme, ProbeMethod};
    use url::Url;

    fn request(path: &str) -> TransportRequest {
        build_request(
            &Url::parse("https://api.example.com").unwrap(),
            path,
            ProbeMethod::Get,
            None,
            &AuthScheme::Bearer,
            &Credential::new("tok"),
        )
        .unwrap()
    }

    fn prober(transport: Arc<MockTransport>) -> Prober {
        Prober::new(transport, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn classifies_success_and_denial() {
        let transport = Arc::new(MockTransport::new(200).route("/denied", 403));
        let prober = prober(transport);
        let policy = ClassifyPolicy::default();

        assert_eq!(
            prober.probe(request("/ok"), &policy).await,
            Classification::Accessible
        );
        assert_eq!(
            prober.probe(request("/denied"), &policy).await,
            Classification::Denied
        );
    }

    #[tokio::test]
    async fn server_error_is_retried_once() {
        let transport = Arc::new(MockTransport::new(500));
        let prober = prober(transport.clone());

        let classification = prober
            .probe(request("/flaky"), &ClassifyPolicy::default())
            .await;
        assert_eq!(classification, Classification::Inconclusive);
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn transport_failure_absorbed_as_inconclusive() {
        let transport = Arc::new(MockTransport::new(200).fail_route("/down"));
        let prober = prober(transport.clone());

        let classification = prober
            .probe(request("/down"), &ClassifyPolicy::default())
            .await;
        assert_eq!(classification, Classification::Inconclusive);
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn decisive_outcomes_are_not_retried() {
        let transport = Arc::new(MockTransport::new(403));
        let prober = prober(transport.clone());

        prober.probe(request("/x"), &ClassifyPolicy::default()).await;
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn past_deadline_probes_are_inconclusive() {
        let transport = Arc::new(MockTransport::new(200));
        let prober = Arc::new(Prober::new(transport, Duration::from_millis(1)));
        let limiter = Arc::new(Semaphore::new(1));
        let deadline = Instant::now() - Duration::from_secs(1);

        let classification = bounded_probe(
            prober,
            limiter,
            request("/late"),
            ClassifyPolicy::default(),
            deadline,
        )
        .await;
        assert_eq!(classification, Classification::Inconclusive);
    }
}

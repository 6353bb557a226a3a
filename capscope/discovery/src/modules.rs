//! Module/feature detector.
//!
//! One probe per optional module against its representative,
//! side-effect-free endpoint, run in parallel under the shared worker
//! bound. Reasons come from each module's static failure signature,
//! never from parsing response bodies.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, warn};

use capscope_core::{Capability, Classification, Credential};
use capscope_providers::ProviderSpec;

use crate::classify::ClassifyPolicy;
use crate::prober::{bounded_probe, Prober};
use crate::transport::build_request;
use url::Url;

pub struct ModuleDetector {
    prober: Arc<Prober>,
    limiter: Arc<Semaphore>,
}

impl ModuleDetector {
    pub fn new(prober: Arc<Prober>, limiter: Arc<Semaphore>) -> Self {
        Self { prober, limiter }
    }

    /// Probe every module in the provider table. Accessible ⇒ available;
    /// anything else ⇒ unavailable with the module's static reason.
    pub async fn detect(
        &self,
        provider: &ProviderSpec,
        base_url: &Url,
        credential: &Credential,
        deadline: Instant,
    ) -> BTreeMap<String, Capability> {
        let policy = ClassifyPolicy::module_probe(provider.forbidden_status);
        let mut probes = JoinSet::new();

        for module in &provider.modules {
            let request = match build_request(
                base_url,
                &module.path,
                module.method,
                module.body.clone(),
                &provider.auth,
                credential,
            ) {
                Ok(request) => request,
                Err(err) => {
                    warn!(module = %module.name, %err, "skipping malformed module probe");
                    continue;
                }
            };

            let prober = self.prober.clone();
            let limiter = self.limiter.clone();
            let name = module.name.clone();
            let failure_reason = module.failure_reason;
            let required = module.required.clone();
            probes.spawn(async move {
                let classification =
                    bounded_probe(prober, limiter, request, policy, deadline).await;
                (name, classification, failure_reason, required)
            });
        }

        let mut modules = BTreeMap::new();
        while let Some(joined) = probes.join_next().await {
            let Ok((name, classification, failure_reason, required)) = joined else {
                continue;
            };
            let capability = match classification {
                Classification::Accessible => Capability {
                    available: true,
                    reason: None,
                    required,
                },
                Classification::Denied | Classification::Inconclusive => Capability {
                    available: false,
                    reason: Some(failure_reason.as_str().to_string()),
                    required,
                },
            };
            debug!(module = %name, available = capability.available, "module detected");
            modules.insert(name, capability);
        }
        modules
    }
}

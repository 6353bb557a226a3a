//! One discovery pass: identity lookup, module detection, resource
//! enumeration, and per-resource permission mapping under a single
//! aggregate deadline.
//!
//! A pass never fails outright — partial failures degrade the profile
//! (absent identity, inconclusive probes) instead of aborting it, and
//! the profile is returned only once every sub-probe has completed or
//! been recorded as inconclusive at the deadline.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info};
use url::Url;

use capscope_core::{Action, CapabilityProfile, CapError, Classification, Credential, IdentitySummary};
use capscope_providers::{ProbeMethod, ProviderSpec, ResourceSpec};

use crate::classify::ClassifyPolicy;
use crate::clock::Clock;
use crate::config::DiscoveryConfig;
use crate::identity::fetch_identity;
use crate::modules::ModuleDetector;
use crate::prober::{bounded_probe, Prober};
use crate::resources::ResourceMapper;
use crate::transport::{build_request, ProbeTransport};

pub struct DiscoveryEngine {
    provider: Arc<ProviderSpec>,
    base_url: Url,
    transport: Arc<dyn ProbeTransport>,
    prober: Arc<Prober>,
    limiter: Arc<Semaphore>,
    config: DiscoveryConfig,
    clock: Arc<dyn Clock>,
}

impl DiscoveryEngine {
    pub fn new(
        provider: ProviderSpec,
        transport: Arc<dyn ProbeTransport>,
        config: DiscoveryConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CapError> {
        let base = config
            .base_url
            .clone()
            .unwrap_or_else(|| provider.default_base_url.clone());
        let base_url = Url::parse(&base)
            .map_err(|err| CapError::ConfigError(format!("invalid base URL {base}: {err}")))?;

        let prober = Arc::new(Prober::new(transport.clone(), config.retry_backoff()));
        let limiter = Arc::new(Semaphore::new(config.max_concurrent_probes.max(1)));

        Ok(Self {
            provider: Arc::new(provider),
            base_url,
            transport,
            prober,
            limiter,
            config,
            clock,
        })
    }

    pub fn provider_name(&self) -> &str {
        &self.provider.name
    }

    /// Run one full discovery pass for a credential.
    pub async fn discover(&self, credential: &Credential) -> CapabilityProfile {
        let started = Instant::now();
        let deadline = started + self.config.aggregate_timeout();
        let mut profile = CapabilityProfile::empty(self.clock.now());

        profile.identity = match tokio::time::timeout_at(
            deadline,
            fetch_identity(&self.transport, &self.base_url, &self.provider, credential),
        )
        .await
        {
            Ok(identity) => identity,
            Err(_) => None,
        };

        if self.probe_admin(credential, deadline).await {
            profile
                .identity
                .get_or_insert_with(IdentitySummary::default)
                .admin = true;
        }

        let detector = ModuleDetector::new(self.prober.clone(), self.limiter.clone());
        profile.modules = detector
            .detect(&self.provider, &self.base_url, credential, deadline)
            .await;

        let mapper = Arc::new(ResourceMapper::new(self.prober.clone(), self.limiter.clone()));
        let mut passes = JoinSet::new();
        for resource in self.provider.resources.iter().cloned() {
            let mapper = mapper.clone();
            let transport = self.transport.clone();
            let base_url = self.base_url.clone();
            let provider = self.provider.clone();
            let credential = credential.clone();
            let max_instances = self.config.max_resources_mapped;
            passes.spawn(async move {
                map_resource(
                    mapper,
                    transport,
                    base_url,
                    provider,
                    resource,
                    credential,
                    max_instances,
                    deadline,
                )
                .await
            });
        }

        while let Some(joined) = passes.join_next().await {
            let Ok((resource_type, instances, granted)) = joined else {
                continue;
            };
            if !instances.is_empty() {
                profile.instances.insert(resource_type.clone(), instances);
            }
            if let Some(granted) = granted {
                profile.resources.insert(resource_type, granted);
            }
        }

        info!(
            provider = %self.provider.name,
            modules = profile.modules.len(),
            available = profile.modules.values().filter(|c| c.available).count(),
            resources = profile.resources.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "discovery pass complete"
        );
        profile
    }

    /// Probe the provider's admin-only endpoint, if it declares one.
    /// Admin is security-sensitive, so an inconclusive probe fails closed.
    async fn probe_admin(&self, credential: &Credential, deadline: Instant) -> bool {
        let Some(path) = &self.provider.admin_probe_path else {
            return false;
        };
        let request = match build_request(
            &self.base_url,
            path,
            ProbeMethod::Get,
            None,
            &self.provider.auth,
            credential,
        ) {
            Ok(request) => request,
            Err(_) => return false,
        };
        let policy = ClassifyPolicy::action_probe(
            self.provider.forbidden_status,
            self.provider.treat_not_found_as_denied,
        );
        let classification = bounded_probe(
            self.prober.clone(),
            self.limiter.clone(),
            request,
            policy,
            deadline,
        )
        .await;
        if classification == Classification::Accessible {
            debug!(provider = %self.provider.name, "admin access detected");
            true
        } else {
            false
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn map_resource(
    mapper: Arc<ResourceMapper>,
    transport: Arc<dyn ProbeTransport>,
    base_url: Url,
    provider: Arc<ProviderSpec>,
    resource: ResourceSpec,
    credential: Credential,
    max_instances: usize,
    deadline: Instant,
) -> (String, BTreeSet<String>, Option<BTreeSet<Action>>) {
    let instances = match tokio::time::timeout_at(
        deadline,
        mapper.enumerate(&transport, &base_url, &provider, &resource, &credential),
    )
    .await
    {
        Ok(instances) => instances,
        Err(_) => BTreeSet::new(),
    };

    // An enumerable type with nothing listed yields no evidence: the
    // filter must not treat the missing data as denial.
    if resource.enumerate.is_some() && instances.is_empty() {
        return (resource.resource_type.clone(), instances, None);
    }
    if resource.actions.is_empty() && resource.enumerate.is_none() {
        return (resource.resource_type.clone(), instances, None);
    }

    let mut granted = BTreeSet::new();
    if instances.is_empty() {
        // Non-enumerable resource: its probe paths carry no instance id.
        granted = mapper
            .map_permissions(&base_url, &provider, &resource, &credential, "", false, deadline)
            .await;
    } else {
        if instances.len() > max_instances {
            debug!(
                resource = %resource.resource_type,
                skipped = instances.len() - max_instances,
                "instance mapping capped"
            );
        }
        for id in instances.iter().take(max_instances) {
            let mapped = mapper
                .map_permissions(&base_url, &provider, &resource, &credential, id, true, deadline)
                .await;
            // Union across instances: the credential can perform the
            // action on at least one instance of this type.
            granted.extend(mapped);
        }
    }

    (resource.resource_type.clone(), instances, Some(granted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::mock::MockTransport;
    use crate::transport::{TransportError, TransportRequest, TransportResponse};
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;
    use std::time::Duration;

    fn engine_with(transport: Arc<MockTransport>, provider: ProviderSpec) -> DiscoveryEngine {
        let mut config = DiscoveryConfig::default();
        config.retry_backoff_ms = 1;
        DiscoveryEngine::new(
            provider,
            transport,
            config,
            Arc::new(ManualClock::new(Utc::now())),
        )
        .expect("engine")
    }

    #[tokio::test]
    async fn pass_composes_identity_modules_and_resources() {
        let transport = Arc::new(
            MockTransport::new(403)
                .route_json(
                    "/artifactory/api/security/apiKey",
                    200,
                    json!({"username": "deployer"}),
                )
                .route("/xray/api/v1/system/version", 200)
                .route_method("POST", "/artifactory/api/repositories/", 403)
                .route_json(
                    "/artifactory/api/repositories",
                    200,
                    json!([{"key": "libs-release"}]),
                )
                .route_method("GET", "/artifactory/api/storage/libs-release", 200)
                .route_method("DELETE", "/artifactory/libs-release/", 200),
        );
        let engine = engine_with(transport, capscope_providers::artifactory::spec());

        let profile = engine.discover(&Credential::new("tok")).await;

        let identity = profile.identity.clone().expect("identity");
        assert_eq!(identity.username.as_deref(), Some("deployer"));
        assert!(!identity.admin); // admin probe got 403

        assert_eq!(profile.module_available("xray"), Some(true));
        assert_eq!(profile.module_available("pipelines"), Some(false));

        assert!(profile.instances["repo"].contains("libs-release"));
        let repo = &profile.resources["repo"];
        // Enumerable: read/list granted without probes.
        assert!(repo.contains(&Action::Read));
        assert!(repo.contains(&Action::List));
        // 200 on the synthetic delete path.
        assert!(repo.contains(&Action::Delete));
        // 403 on create/update/admin probes.
        assert!(!repo.contains(&Action::Create));
        assert!(!repo.contains(&Action::Admin));
    }

    #[tokio::test]
    async fn admin_probe_upgrades_identity() {
        let transport = Arc::new(
            MockTransport::new(404).route("/artifactory/api/system/configuration", 200),
        );
        let engine = engine_with(transport, capscope_providers::artifactory::spec());

        let profile = engine.discover(&Credential::new("tok")).await;
        assert!(profile.is_admin());
    }

    #[tokio::test]
    async fn identity_failure_degrades_profile() {
        let transport = Arc::new(
            MockTransport::new(200).fail_route("/artifactory/api/security/apiKey"),
        );
        let engine = engine_with(transport, capscope_providers::artifactory::spec());

        let profile = engine.discover(&Credential::new("tok")).await;
        // Identity endpoint unreachable, but the admin probe answered
        // 200, so a degraded identity with only the admin flag remains.
        assert!(profile.identity.is_some_and(|id| id.username.is_none()));
        assert!(!profile.modules.is_empty());
    }

    #[tokio::test]
    async fn empty_enumeration_records_no_resource_evidence() {
        let transport = Arc::new(
            MockTransport::new(403).route_json("/artifactory/api/repositories", 200, json!([])),
        );
        let engine = engine_with(transport, capscope_providers::artifactory::spec());

        let profile = engine.discover(&Credential::new("tok")).await;
        assert!(!profile.resources.contains_key("repo"));
        assert!(!profile.instances.contains_key("repo"));
    }

    struct StalledTransport;

    #[async_trait]
    impl crate::transport::ProbeTransport for StalledTransport {
        async fn send(
            &self,
            _request: TransportRequest,
        ) -> Result<TransportResponse, TransportError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(TransportResponse {
                status: 200,
                json: None,
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_records_unfinished_probes_as_inconclusive() {
        let mut config = DiscoveryConfig::default();
        config.aggregate_timeout_ms = 1_000;
        config.retry_backoff_ms = 1;
        let engine = DiscoveryEngine::new(
            capscope_providers::artifactory::spec(),
            Arc::new(StalledTransport),
            config,
            Arc::new(ManualClock::new(Utc::now())),
        )
        .expect("engine");

        let profile = engine.discover(&Credential::new("tok")).await;

        // Every module was recorded, none silently dropped.
        assert_eq!(
            profile.modules.len(),
            capscope_providers::artifactory::spec().modules.len()
        );
        assert!(profile.modules.values().all(|c| !c.available));
        assert!(profile.identity.is_none());
    }
}

//! Resource enumeration and per-action permission mapping.
//!
//! One probe per action per resource instance. Mutating-action probes
//! interpolate a synthetic child identifier so any outcome is harmless;
//! accumulation into a resource's action set is a single-writer fan-in
//! of the parallel probe results.

use std::collections::BTreeSet;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use capscope_core::{Action, Credential};
use capscope_providers::{ProviderSpec, ResourceSpec};

use crate::classify::ClassifyPolicy;
use crate::prober::{bounded_probe, Prober};
use crate::transport::{build_request, ProbeTransport};

/// Identifiers interpolated into probe paths must be plain segments.
static SEGMENT_SAFE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").unwrap());

pub struct ResourceMapper {
    prober: Arc<Prober>,
    limiter: Arc<Semaphore>,
}

impl ResourceMapper {
    pub fn new(prober: Arc<Prober>, limiter: Arc<Semaphore>) -> Self {
        Self { prober, limiter }
    }

    /// List reachable instances of a resource type, best-effort: any
    /// failure yields an empty set.
    pub async fn enumerate(
        &self,
        transport: &Arc<dyn ProbeTransport>,
        base_url: &Url,
        provider: &ProviderSpec,
        resource: &ResourceSpec,
        credential: &Credential,
    ) -> BTreeSet<String> {
        let Some(enumeration) = &resource.enumerate else {
            return BTreeSet::new();
        };

        let request = match build_request(
            base_url,
            &enumeration.path,
            capscope_providers::ProbeMethod::Get,
            None,
            &provider.auth,
            credential,
        ) {
            Ok(request) => request,
            Err(err) => {
                warn!(resource = %resource.resource_type, %err, "skipping malformed enumeration");
                return BTreeSet::new();
            }
        };

        let response = match transport.send(request).await {
            Ok(response) if (200..300).contains(&response.status) => response,
            Ok(response) => {
                debug!(
                    resource = %resource.resource_type,
                    status = response.status,
                    "enumeration endpoint inaccessible"
                );
                return BTreeSet::new();
            }
            Err(err) => {
                debug!(resource = %resource.resource_type, %err, "enumeration failed");
                return BTreeSet::new();
            }
        };

        let instances: BTreeSet<String> = response
            .json
            .as_ref()
            .and_then(|json| json.pointer(&enumeration.items_pointer))
            .and_then(|items| items.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item_id(item, &enumeration.id_field))
                    .collect()
            })
            .unwrap_or_default();

        debug!(
            resource = %resource.resource_type,
            count = instances.len(),
            "instances enumerated"
        );
        instances
    }

    /// Build the permitted-action set for one resource instance.
    ///
    /// Read/list are granted without a probe when the resource was
    /// already enumerated. Inconclusive probes resolve by action bias:
    /// retrieval actions fail open, everything else fails closed.
    #[allow(clippy::too_many_arguments)]
    pub async fn map_permissions(
        &self,
        base_url: &Url,
        provider: &ProviderSpec,
        resource: &ResourceSpec,
        credential: &Credential,
        resource_id: &str,
        enumerable: bool,
        deadline: Instant,
    ) -> BTreeSet<Action> {
        let mut granted = BTreeSet::new();
        if enumerable {
            granted.insert(Action::Read);
            granted.insert(Action::List);
        }

        if !resource_id.is_empty() && !SEGMENT_SAFE.is_match(resource_id) {
            warn!(
                resource = %resource.resource_type,
                "resource identifier rejected, skipping action probes"
            );
            return granted;
        }

        let policy = ClassifyPolicy::action_probe(
            provider.forbidden_status,
            provider.treat_not_found_as_denied,
        );
        let mut probes = JoinSet::new();

        for action_probe in &resource.actions {
            if enumerable && matches!(action_probe.action, Action::Read | Action::List) {
                continue;
            }
            let path = interpolate(&action_probe.path, resource_id);
            let request = match build_request(
                base_url,
                &path,
                action_probe.method,
                action_probe.body.clone(),
                &provider.auth,
                credential,
            ) {
                Ok(request) => request,
                Err(err) => {
                    warn!(resource = %resource.resource_type, %err, "skipping malformed action probe");
                    continue;
                }
            };

            let prober = self.prober.clone();
            let limiter = self.limiter.clone();
            let action = action_probe.action;
            probes.spawn(async move {
                let classification =
                    bounded_probe(prober, limiter, request, policy, deadline).await;
                (action, classification)
            });
        }

        // Fan-in: the joined results are the only writer of the set.
        while let Some(joined) = probes.join_next().await {
            let Ok((action, classification)) = joined else {
                continue;
            };
            if classification.is_granted(action.bias()) {
                granted.insert(action);
            }
        }

        debug!(
            resource = %resource.resource_type,
            id = resource_id,
            actions = granted.len(),
            "resource permissions mapped"
        );
        granted
    }
}

fn item_id(item: &serde_json::Value, id_field: &str) -> Option<String> {
    match item.get(id_field) {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// `{id}` is the resource instance; `{probe}` is a fresh synthetic
/// child identifier so mutating probes never touch a real artifact.
fn interpolate(template: &str, resource_id: &str) -> String {
    let mut path = template.replace("{id}", resource_id);
    if path.contains("{probe}") {
        path = path.replace("{probe}", &format!("capscope-probe-{}", Uuid::new_v4()));
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use serde_json::json;
    use std::time::Duration;

    fn mapper(transport: Arc<MockTransport>) -> ResourceMapper {
        let prober = Arc::new(Prober::new(transport, Duration::from_millis(1)));
        ResourceMapper::new(prober, Arc::new(Semaphore::new(4)))
    }

    fn deadline() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    #[tokio::test]
    async fn denied_delete_and_accessible_read() {
        // 403 on the synthetic delete path excludes delete; 200 on the
        // storage endpoint includes read.
        let transport = Arc::new(
            MockTransport::new(200)
                .route_method("DELETE", "/artifactory/libs-release/", 403)
                .route_method("PUT", "/artifactory/libs-release/", 403)
                .route_method("POST", "/artifactory/api/repositories/libs-release", 403),
        );
        let provider = capscope_providers::artifactory::spec();
        let base = Url::parse(&provider.default_base_url).unwrap();
        let resource = provider.resource("repo").unwrap().clone();

        let granted = mapper(transport)
            .map_permissions(
                &base,
                &provider,
                &resource,
                &Credential::new("tok"),
                "libs-release",
                false,
                deadline(),
            )
            .await;

        assert!(granted.contains(&Action::Read));
        assert!(!granted.contains(&Action::Delete));
        assert!(!granted.contains(&Action::Create));
        assert!(!granted.contains(&Action::Admin));
    }

    #[tokio::test]
    async fn enumerable_resources_skip_read_probes() {
        let transport = Arc::new(MockTransport::new(403));
        let provider = capscope_providers::artifactory::spec();
        let base = Url::parse(&provider.default_base_url).unwrap();
        let resource = provider.resource("repo").unwrap().clone();

        let granted = mapper(transport.clone())
            .map_permissions(
                &base,
                &provider,
                &resource,
                &Credential::new("tok"),
                "libs-release",
                true,
                deadline(),
            )
            .await;

        assert!(granted.contains(&Action::Read));
        assert!(granted.contains(&Action::List));
        // No GET probes were issued for read/list.
        assert!(transport
            .requests()
            .iter()
            .all(|line| !line.starts_with("GET")));
    }

    #[tokio::test]
    async fn inconclusive_resolves_by_action_bias() {
        // Every probe hits a dead transport: mutating actions fail
        // closed, and with enumeration read/list stay granted.
        let transport = Arc::new(MockTransport::new(200).fail_route("/"));
        let provider = capscope_providers::artifactory::spec();
        let base = Url::parse(&provider.default_base_url).unwrap();
        let resource = provider.resource("repo").unwrap().clone();

        let granted = mapper(transport)
            .map_permissions(
                &base,
                &provider,
                &resource,
                &Credential::new("tok"),
                "libs-release",
                true,
                deadline(),
            )
            .await;

        assert_eq!(granted, [Action::Read, Action::List].into());
    }

    #[tokio::test]
    async fn unsafe_identifiers_are_never_interpolated() {
        let transport = Arc::new(MockTransport::new(200));
        let provider = capscope_providers::artifactory::spec();
        let base = Url::parse(&provider.default_base_url).unwrap();
        let resource = provider.resource("repo").unwrap().clone();

        let granted = mapper(transport.clone())
            .map_permissions(
                &base,
                &provider,
                &resource,
                &Credential::new("tok"),
                "../../etc",
                false,
                deadline(),
            )
            .await;

        assert!(granted.is_empty());
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn enumerates_top_level_array() {
        let transport = Arc::new(MockTransport::new(200).route_json(
            "/artifactory/api/repositories",
            200,
            json!([{"key": "libs-release"}, {"key": "docker-local"}, {"type": "no-key"}]),
        ));
        let provider = capscope_providers::artifactory::spec();
        let base = Url::parse(&provider.default_base_url).unwrap();
        let resource = provider.resource("repo").unwrap().clone();
        let mapper = mapper(transport.clone());

        let generic: Arc<dyn ProbeTransport> = transport;
        let instances = mapper
            .enumerate(&generic, &base, &provider, &resource, &Credential::new("tok"))
            .await;

        assert_eq!(
            instances,
            ["libs-release".to_string(), "docker-local".to_string()].into()
        );
    }

    #[test]
    fn numeric_instance_ids_are_stringified() {
        assert_eq!(
            item_id(&json!({"id": 4217}), "id").as_deref(),
            Some("4217")
        );
        assert_eq!(item_id(&json!({"id": null}), "id"), None);
        assert_eq!(item_id(&json!({"other": "x"}), "id"), None);
    }

    #[tokio::test]
    async fn enumerates_nested_array() {
        let transport = Arc::new(MockTransport::new(200).route_json(
            "/orgs",
            200,
            json!({"orgs": [{"identifier": "default"}, {"identifier": "platform"}]}),
        ));
        let provider = capscope_providers::harness::spec();
        let base = Url::parse(&provider.default_base_url).unwrap();
        let resource = provider.resource("org").unwrap().clone();
        let mapper = mapper(transport.clone());

        let generic: Arc<dyn ProbeTransport> = transport;
        let instances = mapper
            .enumerate(&generic, &base, &provider, &resource, &Credential::new("tok"))
            .await;

        assert_eq!(instances, ["default".to_string(), "platform".to_string()].into());
    }

    #[test]
    fn interpolation_generates_fresh_probe_ids() {
        let first = interpolate("/artifactory/{id}/{probe}", "repo1");
        let second = interpolate("/artifactory/{id}/{probe}", "repo1");
        assert!(first.starts_with("/artifactory/repo1/capscope-probe-"));
        assert_ne!(first, second);
    }
}

//! Public facade for the dispatch layer.
//!
//! Cache-first discovery with one pass per credential scope in flight
//! at a time. The pass runs in its own task holding the scope guard, so
//! a caller abandoning its wait never aborts in-flight probes — their
//! results remain useful to the next caller.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

use capscope_core::{
    CapError, CapabilityProfile, CapabilityReport, Credential, OperationCatalog,
    PermissionDecision,
};
use capscope_providers::ProviderSpec;

use crate::cache::ProfileCache;
use crate::clock::{Clock, SystemClock};
use crate::config::DiscoveryConfig;
use crate::engine::DiscoveryEngine;
use crate::filter::{filter_operations, filter_without_profile};
use crate::transport::{HttpTransport, ProbeTransport};

pub struct CapabilityService {
    engine: Arc<DiscoveryEngine>,
    cache: Arc<ProfileCache>,
    config: DiscoveryConfig,
    passes: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CapabilityService {
    pub fn new(provider: ProviderSpec, config: DiscoveryConfig) -> Result<Self, CapError> {
        let transport: Arc<dyn ProbeTransport> =
            Arc::new(HttpTransport::new(config.probe_timeout())?);
        Self::with_parts(provider, transport, config, Arc::new(SystemClock))
    }

    /// Construction seam: tests inject a mock transport and manual clock.
    pub fn with_parts(
        provider: ProviderSpec,
        transport: Arc<dyn ProbeTransport>,
        config: DiscoveryConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CapError> {
        let ttl = chrono::Duration::from_std(config.cache_ttl())
            .map_err(|err| CapError::ConfigError(format!("cache TTL out of range: {err}")))?;
        let cache = Arc::new(ProfileCache::new(clock.clone(), ttl));
        let engine = Arc::new(DiscoveryEngine::new(
            provider,
            transport,
            config.clone(),
            clock,
        )?);
        Ok(Self {
            engine,
            cache,
            config,
            passes: Mutex::new(HashMap::new()),
        })
    }

    /// Cache-first capability discovery for one credential scope.
    ///
    /// Discovery is lazy: a fresh cached profile is returned as-is; on
    /// miss or expiry exactly one pass runs per scope and concurrent
    /// callers receive the identical published profile.
    pub async fn discover_capabilities(
        &self,
        scope: &str,
        credential: &Credential,
    ) -> Result<Arc<CapabilityProfile>, CapError> {
        if let Some(profile) = self.cache.get(scope) {
            debug!(scope, "capability cache hit");
            return Ok(profile);
        }

        let lock = self.pass_lock(scope).await;

        if self.config.serve_stale_while_refreshing {
            match lock.clone().try_lock_owned() {
                Ok(guard) => return self.run_pass(scope, credential, guard).await,
                Err(_) => {
                    // A refresh is in flight; the previous profile is
                    // good enough for this caller.
                    if let Some((stale, _)) = self.cache.get_any(scope) {
                        debug!(scope, "serving stale profile while refresh is in flight");
                        return Ok(stale);
                    }
                }
            }
        }

        let guard = lock.lock_owned().await;
        if let Some(profile) = self.cache.get(scope) {
            // Published while we waited on the in-flight pass.
            return Ok(profile);
        }
        self.run_pass(scope, credential, guard).await
    }

    /// Non-blocking cached read; never triggers discovery.
    pub fn get_cached_profile(&self, scope: &str) -> Option<Arc<CapabilityProfile>> {
        self.cache.get(scope)
    }

    pub fn invalidate_cache(&self, scope: &str) {
        self.cache.invalidate(scope);
        info!(scope, "capability cache invalidated");
    }

    /// Decide every catalog operation against a profile.
    pub fn filter_operations(
        &self,
        catalog: &OperationCatalog,
        profile: &CapabilityProfile,
    ) -> BTreeMap<String, PermissionDecision> {
        filter_operations(catalog, profile)
    }

    /// Decide against the cached profile, falling back to the
    /// no-profile policy (fail-open reads, fail-closed mutations) when
    /// none is available.
    pub fn filter_cached(
        &self,
        scope: &str,
        catalog: &OperationCatalog,
    ) -> BTreeMap<String, PermissionDecision> {
        match self.cache.get(scope) {
            Some(profile) => filter_operations(catalog, &profile),
            None => filter_without_profile(catalog, self.config.fail_open_reads),
        }
    }

    /// Cache-first discovery flattened into the wire report.
    /// `cache_valid` reflects whether the call was served warm.
    pub async fn capability_report(
        &self,
        scope: &str,
        credential: &Credential,
        catalog: &OperationCatalog,
    ) -> Result<CapabilityReport, CapError> {
        let cache_valid = self.cache.get(scope).is_some();
        let profile = self.discover_capabilities(scope, credential).await?;
        let decisions = filter_operations(catalog, &profile);
        Ok(CapabilityReport::assemble(&profile, &decisions, cache_valid))
    }

    /// One pass, run in its own task with the scope guard traveling
    /// along: caller cancellation abandons the wait, never the pass.
    async fn run_pass(
        &self,
        scope: &str,
        credential: &Credential,
        guard: OwnedMutexGuard<()>,
    ) -> Result<Arc<CapabilityProfile>, CapError> {
        let engine = self.engine.clone();
        let cache = self.cache.clone();
        let credential = credential.clone();
        let scope = scope.to_string();
        let handle = tokio::spawn(async move {
            let profile = engine.discover(&credential).await;
            let published = cache.insert(&scope, profile);
            drop(guard);
            published
        });
        handle
            .await
            .map_err(|err| CapError::DiscoveryFailed(format!("discovery task aborted: {err}")))
    }

    async fn pass_lock(&self, scope: &str) -> Arc<Mutex<()>> {
        let mut passes = self.passes.lock().await;
        passes
            .entry(scope.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

//! Flat, JSON-compatible capability report for cache export and telemetry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{Capability, CapabilityProfile, PermissionDecision};

/// The serialized snapshot handed to the dispatch layer and telemetry:
/// `{"features": {...}, "operations": {...}, "timestamp": epoch, "cache_valid": bool}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityReport {
    pub features: BTreeMap<String, Capability>,
    pub operations: BTreeMap<String, Capability>,
    /// Epoch seconds of the underlying discovery pass.
    pub timestamp: i64,
    pub cache_valid: bool,
}

impl CapabilityReport {
    /// Flatten a profile plus a set of filter decisions into the wire shape.
    pub fn assemble(
        profile: &CapabilityProfile,
        decisions: &BTreeMap<String, PermissionDecision>,
        cache_valid: bool,
    ) -> Self {
        let operations = decisions
            .iter()
            .map(|(id, decision)| {
                let capability = if decision.allowed {
                    Capability::available()
                } else {
                    Capability {
                        available: false,
                        reason: decision.reason.clone(),
                        required: decision.required.clone(),
                    }
                };
                (id.clone(), capability)
            })
            .collect();

        Self {
            features: profile.modules.clone(),
            operations,
            timestamp: profile.discovered_at.timestamp(),
            cache_valid,
        }
    }
}

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of classifying a single probe response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Accessible,
    Denied,
    Inconclusive,
}

impl Classification {
    /// Collapse to a grant decision, resolving `Inconclusive` by bias.
    pub fn is_granted(self, bias: Bias) -> bool {
        match self {
            Classification::Accessible => true,
            Classification::Denied => false,
            Classification::Inconclusive => bias == Bias::Open,
        }
    }
}

/// How an inconclusive probe resolves: informational probes fail open,
/// security-sensitive probes fail closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    Open,
    Closed,
}

/// The fixed action vocabulary for resource permissions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,
    List,
    Create,
    Update,
    Delete,
    Execute,
    Admin,
}

impl Action {
    pub const ALL: [Action; 7] = [
        Action::Read,
        Action::List,
        Action::Create,
        Action::Update,
        Action::Delete,
        Action::Execute,
        Action::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::List => "list",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Execute => "execute",
            Action::Admin => "admin",
        }
    }

    /// Bias for resolving an inconclusive probe of this action.
    /// Retrieval actions fail open; anything mutating or privileged
    /// fails closed.
    pub fn bias(&self) -> Bias {
        match self {
            Action::Read | Action::List => Bias::Open,
            _ => Bias::Closed,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Availability of one module or operation, with the denial reason and
/// statically known requirements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capability {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

impl Capability {
    pub fn available() -> Self {
        Self {
            available: true,
            reason: None,
            required: Vec::new(),
        }
    }

    pub fn unavailable(reason: impl Into<String>, required: Vec<String>) -> Self {
        Self {
            available: false,
            reason: Some(reason.into()),
            required,
        }
    }
}

/// Opaque caller-supplied credential for one external account.
///
/// The engine is read-only with respect to it: the secret is applied to
/// probe request headers and never persisted, logged, or serialized.
#[derive(Clone)]
pub struct Credential {
    secret: String,
}

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// The raw secret, for transport-level header construction only.
    pub fn expose(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Best-effort identity metadata for the probed credential.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentitySummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub admin: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
}

/// Discovered permission/feature snapshot for one credential.
///
/// Built to completion off-cache and published atomically; immutable
/// once published (refresh replaces the whole profile).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityProfile {
    /// Absent when the identity endpoint itself was inaccessible.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<IdentitySummary>,
    /// Module name → availability.
    pub modules: BTreeMap<String, Capability>,
    /// Resource type → permitted actions. A missing type means no
    /// resource-level evidence was collected for it.
    pub resources: BTreeMap<String, BTreeSet<Action>>,
    /// Reachable resource instances, grouped by resource type.
    pub instances: BTreeMap<String, BTreeSet<String>>,
    pub discovered_at: DateTime<Utc>,
}

impl CapabilityProfile {
    pub fn empty(discovered_at: DateTime<Utc>) -> Self {
        Self {
            identity: None,
            modules: BTreeMap::new(),
            resources: BTreeMap::new(),
            instances: BTreeMap::new(),
            discovered_at,
        }
    }

    /// Availability of a module, or `None` if the module was never probed.
    pub fn module_available(&self, name: &str) -> Option<bool> {
        self.modules.get(name).map(|c| c.available)
    }

    /// Whether the credential may perform `action` on `resource_type`.
    /// `None` means no resource-level evidence was collected for that
    /// type — absence of negative evidence, not a denial.
    pub fn allows(&self, resource_type: &str, action: Action) -> Option<bool> {
        self.resources
            .get(resource_type)
            .map(|set| set.contains(&action))
    }

    pub fn is_admin(&self) -> bool {
        self.identity.as_ref().is_some_and(|id| id.admin)
    }
}

/// Per-operation filter decision. Ephemeral: recomputed per filter call
/// from a cached profile, never itself cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionDecision {
    pub operation: String,
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

impl PermissionDecision {
    pub fn allow(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            allowed: true,
            reason: None,
            required: Vec::new(),
        }
    }

    pub fn deny(
        operation: impl Into<String>,
        reason: impl Into<String>,
        required: Vec<String>,
    ) -> Self {
        Self {
            operation: operation.into(),
            allowed: false,
            reason: Some(reason.into()),
            required,
        }
    }
}

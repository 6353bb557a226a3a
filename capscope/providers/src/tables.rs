//! Declarative probe-table types.
//!
//! A provider integration contributes one [`ProviderSpec`] — endpoints,
//! methods, placeholder bodies, and reason metadata. The discovery
//! engine is generic over these tables; providers never contribute code.

use capscope_core::Action;
use serde::{Deserialize, Serialize};

/// HTTP method for a probe. A small owned enum so tables stay plain data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProbeMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
}

impl ProbeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeMethod::Get => "GET",
            ProbeMethod::Head => "HEAD",
            ProbeMethod::Post => "POST",
            ProbeMethod::Put => "PUT",
            ProbeMethod::Delete => "DELETE",
        }
    }

    /// Whether probes with this method carry a placeholder body.
    pub fn has_body(&self) -> bool {
        matches!(self, ProbeMethod::Post | ProbeMethod::Put)
    }
}

/// How the credential secret is applied to probe requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum AuthScheme {
    /// `Authorization: Bearer <secret>`.
    Bearer,
    /// Secret in a provider-specific header.
    Header { name: String },
    /// Provider-specific header plus the bearer header, both carrying
    /// the secret (some providers accept either, depending on key type).
    HeaderWithBearer { name: String },
}

/// Fixed vocabulary of reasons a module can be unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    NotInstalled,
    AdminRequired,
    CloudOnly,
    LicenseRequired,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::NotInstalled => "not installed or endpoint not available",
            FailureReason::AdminRequired => "admin permission required",
            FailureReason::CloudOnly => "cloud-only feature",
            FailureReason::LicenseRequired => "license required",
        }
    }
}

/// One representative, side-effect-free probe for an optional module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleProbe {
    pub name: String,
    pub method: ProbeMethod,
    pub path: String,
    /// Minimal schema-valid body for methods that carry one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Reason reported when the probe does not come back accessible,
    /// chosen from this module's static failure signature.
    pub failure_reason: FailureReason,
    /// Statically known requirements (licenses, permissions) echoed
    /// into capability reports.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

impl ModuleProbe {
    pub fn get(name: &str, path: &str, failure_reason: FailureReason) -> Self {
        Self {
            name: name.to_string(),
            method: ProbeMethod::Get,
            path: path.to_string(),
            body: None,
            failure_reason,
            required: Vec::new(),
        }
    }

    pub fn post(name: &str, path: &str, body: &str, failure_reason: FailureReason) -> Self {
        Self {
            name: name.to_string(),
            method: ProbeMethod::Post,
            path: path.to_string(),
            body: Some(body.to_string()),
            failure_reason,
            required: Vec::new(),
        }
    }

    pub fn requiring(mut self, required: &[&str]) -> Self {
        self.required = required.iter().map(|s| s.to_string()).collect();
        self
    }
}

/// One probe per action against an action-appropriate endpoint.
///
/// `{id}` interpolates the resource instance identifier; `{probe}`
/// interpolates a synthetic child identifier so mutating-method probes
/// never touch a real resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionProbe {
    pub action: Action,
    pub method: ProbeMethod,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl ActionProbe {
    pub fn new(action: Action, method: ProbeMethod, path: &str) -> Self {
        Self {
            action,
            method,
            path: path.to_string(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = Some(body.to_string());
        self
    }
}

/// Collection endpoint listing reachable instances of a resource type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enumeration {
    pub path: String,
    /// JSON pointer to the item array in the response (`""` = the
    /// response itself is the array).
    pub items_pointer: String,
    /// Field holding each item's identifier.
    pub id_field: String,
}

/// Probe tables for one resource type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub resource_type: String,
    /// When present, listed instances are recorded in the profile and
    /// read/list are granted without probing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enumerate: Option<Enumeration>,
    pub actions: Vec<ActionProbe>,
}

/// The full declarative table for one external provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSpec {
    pub name: String,
    pub default_base_url: String,
    pub auth: AuthScheme,
    /// Identity endpoint (GET), probed best-effort.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_path: Option<String>,
    /// Admin-only endpoint (GET); accessible ⇒ the credential has
    /// administrative rights.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_probe_path: Option<String>,
    pub modules: Vec<ModuleProbe>,
    pub resources: Vec<ResourceSpec>,
    /// Status this provider uses for authorization denial.
    pub forbidden_status: u16,
    /// Override for deployments where a permission-filtering proxy
    /// answers 404 for forbidden paths. Default keeps the documented
    /// 404 ⇒ accessible heuristic for action probes.
    pub treat_not_found_as_denied: bool,
}

impl ProviderSpec {
    pub fn resource(&self, resource_type: &str) -> Option<&ResourceSpec> {
        self.resources
            .iter()
            .find(|r| r.resource_type == resource_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_reason_vocabulary_is_fixed() {
        assert_eq!(
            FailureReason::NotInstalled.as_str(),
            "not installed or endpoint not available"
        );
        assert_eq!(FailureReason::AdminRequired.as_str(), "admin permission required");
        assert_eq!(FailureReason::CloudOnly.as_str(), "cloud-only feature");
        assert_eq!(FailureReason::LicenseRequired.as_str(), "license required");
    }

    #[test]
    fn body_only_on_mutating_methods() {
        assert!(!ProbeMethod::Get.has_body());
        assert!(!ProbeMethod::Head.has_body());
        assert!(!ProbeMethod::Delete.has_body());
        assert!(ProbeMethod::Post.has_body());
        assert!(ProbeMethod::Put.has_body());
    }

    #[test]
    fn spec_serializes_as_plain_data() {
        let spec = crate::artifactory::spec();
        let json = serde_json::to_string(&spec).unwrap();
        let back: ProviderSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, spec.name);
        assert_eq!(back.modules.len(), spec.modules.len());
    }
}

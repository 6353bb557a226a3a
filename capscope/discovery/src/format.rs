//! Structured error payloads for denied operations.
//!
//! A denial is always surfaced as a payload an agent or human can act
//! on, never a bare boolean.

use serde::{Deserialize, Serialize};

use capscope_core::PermissionDecision;

/// `{error: "operation_unavailable", operation, reason, required, resolution}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnavailableError {
    pub error: String,
    pub operation: String,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    pub resolution: String,
}

/// Render a denial as the structured payload.
pub fn format_unavailable_error(
    operation_id: &str,
    decision: &PermissionDecision,
) -> UnavailableError {
    let reason = decision
        .reason
        .clone()
        .unwrap_or_else(|| "operation not available".to_string());
    let resolution = resolution_for(&reason).to_string();
    UnavailableError {
        error: "operation_unavailable".to_string(),
        operation: operation_id.to_string(),
        reason,
        required: decision.required.clone(),
        resolution,
    }
}

/// Fixed remediation table keyed by reason category.
fn resolution_for(reason: &str) -> &'static str {
    if reason.contains("license") {
        "Upgrade your license to access this feature"
    } else if reason.contains("permission") {
        "Request appropriate permission from an administrator"
    } else if reason.contains("not installed") {
        "Install and configure the required component"
    } else if reason.contains("cloud-only") {
        "This feature is only available in the cloud tier"
    } else {
        "Contact your administrator to enable this operation"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn denial(reason: &str) -> PermissionDecision {
        PermissionDecision::deny("xray/scan", reason, vec!["Xray license".into()])
    }

    #[test]
    fn remediation_table_by_reason_category() {
        let cases = [
            ("license required", "Upgrade your license to access this feature"),
            (
                "delete permission required for repo",
                "Request appropriate permission from an administrator",
            ),
            (
                "not installed or endpoint not available",
                "Install and configure the required component",
            ),
            ("cloud-only feature", "This feature is only available in the cloud tier"),
            ("something else entirely", "Contact your administrator to enable this operation"),
        ];
        for (reason, expected) in cases {
            let payload = format_unavailable_error("xray/scan", &denial(reason));
            assert_eq!(payload.resolution, expected, "reason: {reason}");
        }
    }

    #[test]
    fn payload_shape() {
        let payload = format_unavailable_error("xray/scan", &denial("license required"));
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["error"], "operation_unavailable");
        assert_eq!(json["operation"], "xray/scan");
        assert_eq!(json["reason"], "license required");
        assert_eq!(json["required"][0], "Xray license");
        assert!(json["resolution"].is_string());
    }

    #[test]
    fn missing_reason_gets_generic_text() {
        let decision = PermissionDecision {
            operation: "repo/delete".into(),
            allowed: false,
            reason: None,
            required: Vec::new(),
        };
        let payload = format_unavailable_error("repo/delete", &decision);
        assert_eq!(payload.reason, "operation not available");
        assert_eq!(
            payload.resolution,
            "Contact your administrator to enable this operation"
        );
    }
}

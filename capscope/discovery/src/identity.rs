//! Best-effort identity lookup.
//!
//! Provider identity responses are loosely shaped; every field of
//! interest is extracted with a total-function fallback — a missing
//! field is absent evidence, never an error.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;
use url::Url;

use capscope_core::{Credential, IdentitySummary};
use capscope_providers::{ProbeMethod, ProviderSpec};

use crate::transport::{build_request, ProbeTransport};

const USERNAME_FIELDS: &[&str] = &["username", "user", "principal", "name"];

/// Fetch the identity summary for a credential, or `None` when the
/// identity endpoint is absent or inaccessible. Failure here degrades
/// the profile; it never fails the pass.
pub async fn fetch_identity(
    transport: &Arc<dyn ProbeTransport>,
    base_url: &Url,
    provider: &ProviderSpec,
    credential: &Credential,
) -> Option<IdentitySummary> {
    let path = provider.identity_path.as_deref()?;
    let request = match build_request(
        base_url,
        path,
        ProbeMethod::Get,
        None,
        &provider.auth,
        credential,
    ) {
        Ok(request) => request,
        Err(err) => {
            debug!(provider = %provider.name, %err, "identity request invalid");
            return None;
        }
    };

    match transport.send(request).await {
        Ok(response) if (200..300).contains(&response.status) => {
            let summary = response
                .json
                .as_ref()
                .map(extract_identity)
                .unwrap_or_default();
            debug!(provider = %provider.name, username = ?summary.username, "identity resolved");
            Some(summary)
        }
        Ok(response) => {
            debug!(provider = %provider.name, status = response.status, "identity endpoint inaccessible");
            None
        }
        Err(err) => {
            debug!(provider = %provider.name, %err, "identity lookup failed");
            None
        }
    }
}

/// Pull the fields of interest out of a loosely-shaped identity
/// response. Some providers wrap the payload in a `data` envelope.
fn extract_identity(value: &Value) -> IdentitySummary {
    let body = value.get("data").filter(|v| v.is_object()).unwrap_or(value);

    let username = USERNAME_FIELDS
        .iter()
        .find_map(|field| body.get(field).and_then(Value::as_str))
        .map(str::to_string);

    let email = body.get("email").and_then(Value::as_str).map(str::to_string);

    let admin = body
        .get("admin")
        .or_else(|| body.get("is_admin"))
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let groups = body
        .get("groups")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    IdentitySummary {
        username,
        email,
        admin,
        groups,
    }
}

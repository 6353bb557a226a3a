//! JFrog platform probe tables.
//!
//! Base URL is the platform root; Artifactory-proper endpoints carry the
//! `/artifactory` prefix while sibling products (Xray, Pipelines, ...)
//! live under their own roots.

use capscope_core::Action;

use crate::tables::{
    ActionProbe, AuthScheme, Enumeration, FailureReason, ModuleProbe, ProbeMethod, ProviderSpec,
    ResourceSpec,
};

pub fn spec() -> ProviderSpec {
    ProviderSpec {
        name: "artifactory".to_string(),
        default_base_url: "https://mycompany.jfrog.io".to_string(),
        // API keys go in X-JFrog-Art-Api; access tokens are bearer. Both
        // headers carry the secret so either kind of credential works.
        auth: AuthScheme::HeaderWithBearer {
            name: "X-JFrog-Art-Api".to_string(),
        },
        identity_path: Some("/artifactory/api/security/apiKey".to_string()),
        admin_probe_path: Some("/artifactory/api/system/configuration".to_string()),
        modules: vec![
            ModuleProbe::get(
                "xray",
                "/xray/api/v1/system/version",
                FailureReason::NotInstalled,
            )
            .requiring(&["Xray license", "Xray installation"]),
            ModuleProbe::get(
                "pipelines",
                "/pipelines/api/v1/system/info",
                FailureReason::NotInstalled,
            )
            .requiring(&["Pipelines license"]),
            ModuleProbe::get(
                "mission_control",
                "/mc/api/v1/system/info",
                FailureReason::LicenseRequired,
            )
            .requiring(&["Enterprise license"]),
            ModuleProbe::get(
                "distribution",
                "/distribution/api/v1/system/info",
                FailureReason::LicenseRequired,
            )
            .requiring(&["Distribution license", "Edge nodes"]),
            ModuleProbe::get(
                "access_service",
                "/access/api/v1/system/ping",
                FailureReason::NotInstalled,
            )
            .requiring(&["Access service"]),
            ModuleProbe::get(
                "projects",
                "/access/api/v1/projects",
                FailureReason::LicenseRequired,
            )
            .requiring(&["Platform Pro or Enterprise license"]),
            ModuleProbe::get(
                "federation",
                "/artifactory/api/federation/status",
                FailureReason::LicenseRequired,
            )
            .requiring(&["Enterprise Plus license"]),
        ],
        resources: vec![ResourceSpec {
            resource_type: "repo".to_string(),
            enumerate: Some(Enumeration {
                path: "/artifactory/api/repositories".to_string(),
                items_pointer: String::new(),
                id_field: "key".to_string(),
            }),
            actions: vec![
                ActionProbe::new(
                    Action::Read,
                    ProbeMethod::Get,
                    "/artifactory/api/storage/{id}",
                ),
                ActionProbe::new(
                    Action::List,
                    ProbeMethod::Get,
                    "/artifactory/api/storage/{id}",
                ),
                // Deploy probe against a synthetic child path.
                ActionProbe::new(Action::Create, ProbeMethod::Put, "/artifactory/{id}/{probe}"),
                ActionProbe::new(Action::Update, ProbeMethod::Put, "/artifactory/{id}/{probe}"),
                ActionProbe::new(
                    Action::Delete,
                    ProbeMethod::Delete,
                    "/artifactory/{id}/{probe}",
                ),
                // Repo-config update is the admin signal.
                ActionProbe::new(
                    Action::Admin,
                    ProbeMethod::Post,
                    "/artifactory/api/repositories/{id}",
                )
                .with_body("{}"),
            ],
        }],
        forbidden_status: 403,
        treat_not_found_as_denied: false,
    }
}

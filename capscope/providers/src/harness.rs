//! Harness probe tables.
//!
//! Module list-probes are POSTs carrying the minimal filter body the
//! API's validation layer expects, so a response reflects authorization
//! rather than request shape.

use capscope_core::Action;

use crate::tables::{
    ActionProbe, AuthScheme, Enumeration, FailureReason, ModuleProbe, ProbeMethod, ProviderSpec,
    ResourceSpec,
};

const FILTER_BODY: &str = r#"{"filterType":"All"}"#;
const GRAPHQL_BODY: &str = r#"{"query":"{ __typename }"}"#;

pub fn spec() -> ProviderSpec {
    ProviderSpec {
        name: "harness".to_string(),
        default_base_url: "https://app.harness.io".to_string(),
        auth: AuthScheme::Header {
            name: "x-api-key".to_string(),
        },
        identity_path: Some("/gateway/ng/api/user/currentUser".to_string()),
        admin_probe_path: None,
        modules: vec![
            ModuleProbe::post(
                "pipeline",
                "/pipeline/api/pipelines/list",
                FILTER_BODY,
                FailureReason::NotInstalled,
            ),
            ModuleProbe::get("project", "/v1/orgs", FailureReason::NotInstalled),
            ModuleProbe::post(
                "connector",
                "/ng/api/connectors/listV2",
                FILTER_BODY,
                FailureReason::NotInstalled,
            ),
            ModuleProbe::get("ci", "/ci/api/builds", FailureReason::LicenseRequired)
                .requiring(&["CI module"]),
            ModuleProbe::get("cd", "/ng/api/services", FailureReason::LicenseRequired)
                .requiring(&["CD module"]),
            ModuleProbe::post(
                "ccm",
                "/ccm/api/graphql",
                GRAPHQL_BODY,
                FailureReason::LicenseRequired,
            )
            .requiring(&["Cloud Cost Management module"]),
            ModuleProbe::get("gitops", "/gitops/api/v1/agents", FailureReason::NotInstalled),
            ModuleProbe::post(
                "cv",
                "/cv/api/monitored-service/list",
                FILTER_BODY,
                FailureReason::LicenseRequired,
            )
            .requiring(&["Continuous Verification module"]),
            ModuleProbe::get("sto", "/sto/api/v2/scans", FailureReason::LicenseRequired)
                .requiring(&["Security Testing Orchestration module"]),
            ModuleProbe::get("cf", "/cf/admin/features", FailureReason::LicenseRequired)
                .requiring(&["Feature Flags module"]),
            ModuleProbe::get("iacm", "/iacm/api/workspaces", FailureReason::LicenseRequired)
                .requiring(&["Infrastructure as Code Management module"]),
            ModuleProbe::get("code", "/code/api/v1/repos", FailureReason::NotInstalled),
        ],
        resources: vec![
            ResourceSpec {
                resource_type: "org".to_string(),
                enumerate: Some(Enumeration {
                    path: "/v1/orgs".to_string(),
                    items_pointer: "/orgs".to_string(),
                    id_field: "identifier".to_string(),
                }),
                actions: vec![ActionProbe::new(
                    Action::Create,
                    ProbeMethod::Post,
                    "/v1/orgs",
                )
                .with_body("{}")],
            },
            ResourceSpec {
                resource_type: "project".to_string(),
                enumerate: Some(Enumeration {
                    path: "/v1/orgs/default/projects".to_string(),
                    items_pointer: "/projects".to_string(),
                    id_field: "identifier".to_string(),
                }),
                actions: vec![ActionProbe::new(
                    Action::Create,
                    ProbeMethod::Post,
                    "/v1/orgs/default/projects",
                )
                .with_body("{}")],
            },
            ResourceSpec {
                resource_type: "pipeline".to_string(),
                enumerate: None,
                actions: vec![
                    ActionProbe::new(
                        Action::Create,
                        ProbeMethod::Post,
                        "/v1/orgs/default/projects/default/pipelines",
                    )
                    .with_body("{}"),
                    ActionProbe::new(
                        Action::Execute,
                        ProbeMethod::Post,
                        "/pipeline/api/pipeline/execute/{probe}",
                    )
                    .with_body("{}"),
                ],
            },
            ResourceSpec {
                resource_type: "connector".to_string(),
                enumerate: None,
                actions: vec![ActionProbe::new(
                    Action::Execute,
                    ProbeMethod::Post,
                    "/ng/api/connectors/testConnection",
                )
                .with_body("{}")],
            },
        ],
        forbidden_status: 403,
        treat_not_found_as_denied: false,
    }
}

//! GitLab probe tables.
//!
//! List probes carry `per_page=1` so a positive answer costs the API as
//! little as possible.

use capscope_core::Action;

use crate::tables::{
    ActionProbe, AuthScheme, Enumeration, FailureReason, ModuleProbe, ProbeMethod, ProviderSpec,
    ResourceSpec,
};

pub fn spec() -> ProviderSpec {
    ProviderSpec {
        name: "gitlab".to_string(),
        default_base_url: "https://gitlab.com/api/v4".to_string(),
        auth: AuthScheme::Header {
            name: "PRIVATE-TOKEN".to_string(),
        },
        identity_path: Some("/user".to_string()),
        admin_probe_path: Some("/application/settings".to_string()),
        modules: vec![
            ModuleProbe::get("projects", "/projects?per_page=1", FailureReason::NotInstalled),
            ModuleProbe::get("issues", "/issues?per_page=1", FailureReason::NotInstalled),
            ModuleProbe::get(
                "merge_requests",
                "/merge_requests?per_page=1",
                FailureReason::NotInstalled,
            ),
            ModuleProbe::get("runners", "/runners?per_page=1", FailureReason::AdminRequired),
            ModuleProbe::get("jobs", "/jobs?per_page=1", FailureReason::NotInstalled),
        ],
        resources: vec![
            ResourceSpec {
                resource_type: "project".to_string(),
                enumerate: Some(Enumeration {
                    path: "/projects?membership=true&per_page=100".to_string(),
                    items_pointer: String::new(),
                    id_field: "id".to_string(),
                }),
                actions: vec![
                    ActionProbe::new(Action::Read, ProbeMethod::Get, "/projects/{id}"),
                    ActionProbe::new(
                        Action::List,
                        ProbeMethod::Get,
                        "/projects/{id}/repository/tree?per_page=1",
                    ),
                    ActionProbe::new(
                        Action::Create,
                        ProbeMethod::Post,
                        "/projects/{id}/repository/branches",
                    )
                    .with_body("{}"),
                    ActionProbe::new(
                        Action::Update,
                        ProbeMethod::Put,
                        "/projects/{id}/repository/files/{probe}",
                    )
                    .with_body("{}"),
                    ActionProbe::new(
                        Action::Delete,
                        ProbeMethod::Delete,
                        "/projects/{id}/repository/branches/{probe}",
                    ),
                    ActionProbe::new(
                        Action::Execute,
                        ProbeMethod::Post,
                        "/projects/{id}/pipeline",
                    )
                    .with_body("{}"),
                    ActionProbe::new(Action::Admin, ProbeMethod::Put, "/projects/{id}")
                        .with_body("{}"),
                ],
            },
            ResourceSpec {
                resource_type: "group".to_string(),
                enumerate: Some(Enumeration {
                    path: "/groups?per_page=100".to_string(),
                    items_pointer: String::new(),
                    id_field: "id".to_string(),
                }),
                actions: vec![
                    ActionProbe::new(Action::Read, ProbeMethod::Get, "/groups/{id}"),
                    ActionProbe::new(Action::Update, ProbeMethod::Put, "/groups/{id}")
                        .with_body("{}"),
                ],
            },
        ],
        forbidden_status: 403,
        treat_not_found_as_denied: false,
    }
}

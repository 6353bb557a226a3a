//! Operation filter.
//!
//! Partitions the static operation catalog into allowed/denied against
//! a capability profile. Decisions are recomputed per call and carry a
//! reason per denial; absence of negative evidence never denies.

use std::collections::BTreeMap;

use tracing::debug;

use capscope_core::{
    Action, CapabilityProfile, OperationCatalog, OperationDescriptor, PermissionDecision,
};

/// The action an operation needs, resolved from its id by a fixed
/// keyword table. Ids without a mutating keyword need only retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequiredAction {
    Exact(Action),
    ReadOrList,
}

fn required_action(operation_id: &str) -> RequiredAction {
    const KEYWORDS: [(&str, Action); 4] = [
        ("create", Action::Create),
        ("delete", Action::Delete),
        ("update", Action::Update),
        ("execute", Action::Execute),
    ];
    for (keyword, action) in KEYWORDS {
        if operation_id.contains(keyword) {
            return RequiredAction::Exact(action);
        }
    }
    RequiredAction::ReadOrList
}

/// Decide every operation in the catalog against a profile.
pub fn filter_operations(
    catalog: &OperationCatalog,
    profile: &CapabilityProfile,
) -> BTreeMap<String, PermissionDecision> {
    let mut decisions = BTreeMap::new();
    for operation in catalog.iter() {
        decisions.insert(operation.id.clone(), decide(operation, profile));
    }
    debug!(
        total = decisions.len(),
        allowed = decisions.values().filter(|d| d.allowed).count(),
        "operations filtered"
    );
    decisions
}

fn decide(operation: &OperationDescriptor, profile: &CapabilityProfile) -> PermissionDecision {
    let namespace = operation.namespace();

    if let Some(module) = profile.modules.get(namespace) {
        if !module.available {
            let detail = module
                .reason
                .as_deref()
                .unwrap_or("not available");
            return PermissionDecision::deny(
                &operation.id,
                format!("module {namespace} unavailable: {detail}"),
                module.required.clone(),
            );
        }
    }

    match profile.resources.get(namespace) {
        // No resource-level evidence for this type: allowed.
        None => PermissionDecision::allow(&operation.id),
        Some(granted) => {
            let (satisfied, action_name) = match required_action(&operation.id) {
                RequiredAction::Exact(action) => (granted.contains(&action), action.as_str()),
                RequiredAction::ReadOrList => (
                    granted.contains(&Action::Read) || granted.contains(&Action::List),
                    "read",
                ),
            };
            if satisfied {
                PermissionDecision::allow(&operation.id)
            } else {
                PermissionDecision::deny(
                    &operation.id,
                    format!("{action_name} permission required for {namespace}"),
                    vec![format!("{action_name} permission on {namespace}")],
                )
            }
        }
    }
}

/// Decisions when no profile is available at all: reads follow the
/// caller-configured default, mutating operations always fail closed.
pub fn filter_without_profile(
    catalog: &OperationCatalog,
    fail_open_reads: bool,
) -> BTreeMap<String, PermissionDecision> {
    let mut decisions = BTreeMap::new();
    for operation in catalog.iter() {
        let decision = match required_action(&operation.id) {
            RequiredAction::ReadOrList if fail_open_reads => {
                PermissionDecision::allow(&operation.id)
            }
            _ => PermissionDecision::deny(
                &operation.id,
                "no capability profile available",
                Vec::new(),
            ),
        };
        decisions.insert(operation.id.clone(), decision);
    }
    decisions
}

pub mod artifactory;
pub mod gitlab;
pub mod harness;
pub mod tables;

pub use tables::{
    ActionProbe, AuthScheme, Enumeration, FailureReason, ModuleProbe, ProbeMethod, ProviderSpec,
    ResourceSpec,
};

/// Look up a builtin provider table by name.
pub fn builtin(name: &str) -> Option<ProviderSpec> {
    match name {
        "artifactory" => Some(artifactory::spec()),
        "harness" => Some(harness::spec()),
        "gitlab" => Some(gitlab::spec()),
        _ => None,
    }
}

/// Names of all builtin provider tables.
pub fn builtin_names() -> &'static [&'static str] {
    &["artifactory", "harness", "gitlab"]
}

#[cfg(test)]
mod tests {
    use super::*;
    use capscope_core::Action;

    #[test]
    fn builtin_lookup() {
        for name in builtin_names() {
            let spec = builtin(name).expect("builtin table");
            assert_eq!(spec.name, *name);
            assert!(!spec.modules.is_empty());
        }
        assert!(builtin("unknown").is_none());
    }

    #[test]
    fn mutating_probes_target_synthetic_children() {
        for name in builtin_names() {
            let spec = builtin(name).unwrap();
            for resource in &spec.resources {
                for probe in &resource.actions {
                    if matches!(probe.action, Action::Delete) {
                        assert!(
                            probe.path.contains("{probe}"),
                            "{name}/{}: delete probe must target a synthetic child",
                            resource.resource_type
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn module_probe_bodies_match_method() {
        for name in builtin_names() {
            let spec = builtin(name).unwrap();
            for module in &spec.modules {
                if module.body.is_some() {
                    assert!(
                        module.method.has_body(),
                        "{name}/{}: body on a bodyless method",
                        module.name
                    );
                }
            }
        }
    }
}

//! Status-code classification policy.
//!
//! Kept as one pure, total function so the policy is auditable and
//! adjustable without touching the probing machinery.

use capscope_core::Classification;

/// Raw outcome of one probe attempt, before classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Status(u16),
    TransportFailure,
    TimedOut,
}

/// Knobs for [`classify`].
#[derive(Debug, Clone, Copy)]
pub struct ClassifyPolicy {
    /// Status the provider uses for authorization denial.
    pub forbidden_status: u16,
    /// When true, 404 counts as a denial. Action probes keep the
    /// default — they target synthetic paths, so "not found" says
    /// nothing about authorization. Module probes flip it: their
    /// endpoints are real, so absence means the module is absent.
    pub not_found_is_denied: bool,
}

impl Default for ClassifyPolicy {
    fn default() -> Self {
        Self {
            forbidden_status: 403,
            not_found_is_denied: false,
        }
    }
}

impl ClassifyPolicy {
    pub fn action_probe(forbidden_status: u16, not_found_is_denied: bool) -> Self {
        Self {
            forbidden_status,
            not_found_is_denied,
        }
    }

    pub fn module_probe(forbidden_status: u16) -> Self {
        Self {
            forbidden_status,
            not_found_is_denied: true,
        }
    }
}

/// Classify one probe outcome. Total: every status code and transport
/// failure maps to exactly one classification.
///
/// 2xx reached and succeeded. The provider's forbidden status is the
/// only confirmed denial. 400–402 and other 4xx mean the request
/// reached authorization and failed only on shape, so they count as
/// accessible. 5xx, transport failures, and anything outside those
/// ranges (1xx, 3xx) are inconclusive.
pub fn classify(outcome: ProbeOutcome, policy: &ClassifyPolicy) -> Classification {
    let status = match outcome {
        ProbeOutcome::Status(status) => status,
        ProbeOutcome::TransportFailure | ProbeOutcome::TimedOut => {
            return Classification::Inconclusive;
        }
    };

    if status == policy.forbidden_status {
        return Classification::Denied;
    }

    match status {
        200..=299 => Classification::Accessible,
        404 if policy.not_found_is_denied => Classification::Denied,
        400..=499 => Classification::Accessible,
        _ => Classification::Inconclusive,
    }
}

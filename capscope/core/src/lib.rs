pub mod catalog;
pub mod error;
pub mod report;
pub mod types;

pub use catalog::{namespace_of, OperationCatalog, OperationDescriptor};
pub use error::CapError;
pub use report::CapabilityReport;
pub use types::{
    Action, Bias, Capability, CapabilityProfile, Classification, Credential, IdentitySummary,
    PermissionDecision,
};

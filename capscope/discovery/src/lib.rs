//! Capability & permission discovery engine.
//!
//! Probes an external provider non-destructively to build a capability
//! profile for a credential, caches it per scope with a TTL, and
//! filters the static operation catalog against it before privileged
//! dispatch. Generic over declarative provider tables
//! (`capscope-providers`); this crate contains no provider-specific
//! code paths.

pub mod cache;
pub mod classify;
pub mod clock;
pub mod config;
pub mod engine;
pub mod filter;
pub mod format;
pub mod identity;
pub mod mock;
pub mod modules;
pub mod prober;
pub mod resources;
pub mod service;
pub mod transport;

pub use cache::ProfileCache;
pub use classify::{classify, ClassifyPolicy, ProbeOutcome};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::DiscoveryConfig;
pub use engine::DiscoveryEngine;
pub use filter::{filter_operations, filter_without_profile};
pub use format::{format_unavailable_error, UnavailableError};
pub use modules::ModuleDetector;
pub use prober::Prober;
pub use resources::ResourceMapper;
pub use service::CapabilityService;
pub use transport::{HttpTransport, ProbeTransport, TransportRequest, TransportResponse};

//! Capability advertisement and browsing (spec.md §6 "Capability
//! advertisement"). Out of the core's real-time data path; resolved
//! endpoints are handed to the client/host façades, which own the actual
//! control-channel connect (spec.md §1: "the core consumes resolved
//! endpoints").

pub mod advertiser;
pub mod browser;
pub mod error;

pub use advertiser::{CapabilityAdvertiser, SERVICE_TYPE};
pub use browser::{HostBrowser, ResolvedHost};
pub use error::DiscoveryError;

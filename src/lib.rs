//! Atlas Private Endpoint Library
//!
//! Provisions MongoDB Atlas private endpoint services for integration test
//! runs, authenticating with Atlas programmatic API keys over HTTP digest auth.

pub mod atlas;
pub mod digest;
pub mod error;
pub mod provisioner;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;

pub use atlas::{AtlasClient, AtlasCredentials};
pub use error::{ProvisionError, Result};
pub use provisioner::{PrivateEndpointProvisioner, ProvisionedEndpoint, ProvisionerConfig};
pub use types::CloudProvider;

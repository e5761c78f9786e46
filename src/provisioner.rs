//! Private Endpoint Provisioner
//!
//! Drives the three Atlas calls needed to pair a consumer private endpoint
//! with an Atlas endpoint service:
//!
//! 1. `create_endpoint` asks Atlas for an endpoint service, walking the region
//!    list until one is free, then waits for Atlas to publish the private link
//!    resource id.
//! 2. `lookup_resource_id` reads that resource id from the service list.
//! 3. `configure_endpoint` registers the consumer endpoint and its IP address.
//!
//! Regions that Atlas reports as already hosting a service are remembered on
//! the provisioner and skipped for the rest of the run.

use crate::atlas::AtlasClient;
use crate::error::{ProvisionError, Result};
use crate::types::{
    CloudProvider, EndpointConfigRequest, EndpointServiceRequest, ProvisioningResult,
    DEFAULT_REGIONS,
};
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

const CREATE_SERVICE_PATH: &str = "/privateEndpoint/endpointService";

/// Default wait between creating a service and reading its resource id
pub const DEFAULT_RESOURCE_ID_WAIT: Duration = Duration::from_secs(3 * 60);

/// Options for a provisioning run
#[derive(Debug, Clone)]
pub struct ProvisionerConfig {
    pub provider: CloudProvider,
    /// Candidate regions, tried in order
    pub regions: Vec<String>,
    /// How long Atlas is given to allocate the private link resource
    pub resource_id_wait: Duration,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            provider: CloudProvider::Azure,
            regions: DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect(),
            resource_id_wait: DEFAULT_RESOURCE_ID_WAIT,
        }
    }
}

impl ProvisionerConfig {
    pub fn provider(mut self, provider: CloudProvider) -> Self {
        self.provider = provider;
        self
    }

    pub fn regions<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.regions = regions.into_iter().map(Into::into).collect();
        self
    }

    pub fn resource_id_wait(mut self, wait: Duration) -> Self {
        self.resource_id_wait = wait;
        self
    }
}

/// Outcome of a full create + configure run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionedEndpoint {
    /// Atlas endpoint service id
    pub endpoint_id: String,
    /// Private link service resource id published by Atlas
    pub private_link_service_resource_id: String,
    /// HTTP status of the configure call
    pub status: u16,
}

/// Provisions Atlas private endpoints for one test run
pub struct PrivateEndpointProvisioner {
    client: AtlasClient,
    config: ProvisionerConfig,
    poisoned_regions: Vec<String>,
    last_endpoint_id: Option<String>,
    last_resource_id: Option<String>,
}

impl PrivateEndpointProvisioner {
    pub fn new(client: AtlasClient, config: ProvisionerConfig) -> Self {
        Self {
            client,
            config,
            poisoned_regions: Vec::new(),
            last_endpoint_id: None,
            last_resource_id: None,
        }
    }

    pub fn config(&self) -> &ProvisionerConfig {
        &self.config
    }

    /// Regions that already host an endpoint service
    pub fn poisoned_regions(&self) -> &[String] {
        &self.poisoned_regions
    }

    /// Id of the most recently created endpoint service
    pub fn last_endpoint_id(&self) -> Option<&str> {
        self.last_endpoint_id.as_deref()
    }

    /// Resource id found for the most recently created endpoint service
    pub fn last_resource_id(&self) -> Option<&str> {
        self.last_resource_id.as_deref()
    }

    pub fn is_poisoned(&self, region: &str) -> bool {
        self.poisoned_regions.iter().any(|r| r == region)
    }

    /// Exclude a region from every later attempt in this run
    pub fn poison_region(&mut self, region: &str) {
        if !self.is_poisoned(region) {
            self.poisoned_regions.push(region.to_string());
        }
    }

    /// Configured regions that have not been poisoned, in order
    pub fn candidate_regions(&self) -> impl Iterator<Item = &str> + '_ {
        self.config
            .regions
            .iter()
            .map(String::as_str)
            .filter(move |region| !self.is_poisoned(region))
    }

    fn services_path(&self) -> String {
        format!("/privateEndpoint/{}/endpointService", self.config.provider)
    }

    fn endpoint_path(&self, endpoint_id: &str) -> String {
        format!(
            "/privateEndpoint/{}/endpointService/{}/endpoint",
            self.config.provider, endpoint_id
        )
    }

    /// Create an endpoint service in the first free region.
    ///
    /// Returns `200 OK` once Atlas has published a resource id for the new
    /// service. A region conflict moves on to the next region; any other
    /// failure ends the attempt.
    pub async fn create_endpoint(&mut self) -> Result<StatusCode> {
        let candidates: Vec<String> = self.candidate_regions().map(str::to_string).collect();

        for region in candidates {
            let request = EndpointServiceRequest::new(self.config.provider, region.as_str());
            info!(
                region = %region,
                provider = %self.config.provider,
                "🌐 Requesting private endpoint service"
            );

            let response = self.client.post(CREATE_SERVICE_PATH, &request).await?;
            let result = response.json::<ProvisioningResult>();

            if let Ok(result) = &result {
                if result.is_region_conflict() {
                    warn!(region = %region, "⚠️  Endpoint service already exists in region, trying next");
                    self.poison_region(&region);
                    continue;
                }
            }

            if response.status != StatusCode::OK {
                return Err(ProvisionError::UnexpectedStatus {
                    expected: StatusCode::OK,
                    actual: response.status,
                });
            }

            let result = result?;
            if let Some(id) = result.id() {
                self.last_endpoint_id = Some(id.to_string());
            }

            if result.is_initiating() {
                let endpoint_id = result
                    .id()
                    .ok_or(ProvisionError::MissingField("id"))?
                    .to_string();

                info!(
                    region = %region,
                    endpoint_id = %endpoint_id,
                    wait_secs = self.config.resource_id_wait.as_secs(),
                    "✅ Created private endpoint service, waiting for resource ID"
                );
                tokio::time::sleep(self.config.resource_id_wait).await;

                let resource_id = self.lookup_resource_id(&endpoint_id).await?;
                if resource_id.is_empty() {
                    return Err(ProvisionError::ResourceIdMissing { endpoint_id });
                }

                info!(resource_id = %resource_id, "🔗 Private link resource ID available");
                self.last_resource_id = Some(resource_id);
                return Ok(StatusCode::OK);
            }

            warn!(
                region = %region,
                status = ?result.status(),
                "Endpoint service is neither initiating nor conflicting, trying next region"
            );
        }

        Err(ProvisionError::RegionsExhausted)
    }

    /// Private link resource id of an endpoint service, or `""` if Atlas has
    /// no such service or has not allocated the resource yet
    pub async fn lookup_resource_id(&self, endpoint_id: &str) -> Result<String> {
        debug!(endpoint_id = %endpoint_id, "Looking up private link resource ID");

        let response = self.client.get(&self.services_path()).await?;
        if response.status != StatusCode::OK {
            return Err(ProvisionError::UnexpectedStatus {
                expected: StatusCode::OK,
                actual: response.status,
            });
        }

        let services: Vec<ProvisioningResult> = response.json()?;
        let resource_id = services
            .iter()
            .find(|service| service.id() == Some(endpoint_id))
            .and_then(ProvisioningResult::private_link_service_resource_id)
            .unwrap_or_default()
            .to_string();

        debug!(
            endpoint_id = %endpoint_id,
            services = services.len(),
            found = !resource_id.is_empty(),
            "Resource ID lookup finished"
        );
        Ok(resource_id)
    }

    /// Register the consumer private endpoint against an endpoint service
    pub async fn configure_endpoint(
        &self,
        ip_address: &str,
        resource_id: &str,
        endpoint_id: &str,
    ) -> Result<StatusCode> {
        let request = EndpointConfigRequest {
            id: resource_id.to_string(),
            private_endpoint_ip_address: ip_address.to_string(),
        };

        info!(
            endpoint_id = %endpoint_id,
            ip_address = %ip_address,
            "🔧 Configuring private endpoint"
        );

        let response = self
            .client
            .post(&self.endpoint_path(endpoint_id), &request)
            .await?;

        let result = match response.json::<ProvisioningResult>() {
            Ok(result) => result,
            Err(e) if response.status.is_success() => return Err(e),
            Err(_) => ProvisioningResult::default(),
        };

        if !result.is_initiating() {
            return Err(ProvisionError::ConfigurationRejected {
                http_status: response.status,
                status: result.status().map(str::to_string),
                error_code: result.error_code().map(str::to_string),
            });
        }

        info!(endpoint_id = %endpoint_id, "✅ Private endpoint is being configured");
        Ok(response.status)
    }

    /// Create an endpoint service and pair the consumer endpoint with it
    pub async fn provision(
        &mut self,
        ip_address: &str,
        resource_id: &str,
    ) -> Result<ProvisionedEndpoint> {
        self.create_endpoint().await?;

        let endpoint_id = self
            .last_endpoint_id
            .clone()
            .ok_or(ProvisionError::MissingField("id"))?;
        let status = self
            .configure_endpoint(ip_address, resource_id, &endpoint_id)
            .await?;

        Ok(ProvisionedEndpoint {
            endpoint_id,
            private_link_service_resource_id: self.last_resource_id.clone().unwrap_or_default(),
            status: status.as_u16(),
        })
    }
}

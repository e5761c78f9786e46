//! Atlas Private Endpoint Types
//!
//! Request bodies sent to the Atlas private endpoint API and the loosely-typed
//! records it returns.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `status` reported while Atlas is still building the endpoint service
pub const INITIATING_STATUS: &str = "INITIATING";

/// `errorCode` returned when the region already hosts an endpoint service
pub const ALREADY_EXISTS_FOR_REGION: &str = "PRIVATE_ENDPOINT_SERVICE_ALREADY_EXISTS_FOR_REGION";

/// Azure regions offered by Atlas, in the order they are tried
pub const DEFAULT_REGIONS: &[&str] = &["centralus", "eastus", "eastus2", "westus", "westus2"];

/// Cloud provider hosting the endpoint service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum CloudProvider {
    Aws,
    #[default]
    Azure,
    Gcp,
}

impl std::fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloudProvider::Aws => write!(f, "AWS"),
            CloudProvider::Azure => write!(f, "AZURE"),
            CloudProvider::Gcp => write!(f, "GCP"),
        }
    }
}

impl std::str::FromStr for CloudProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AWS" => Ok(CloudProvider::Aws),
            "AZURE" => Ok(CloudProvider::Azure),
            "GCP" => Ok(CloudProvider::Gcp),
            other => Err(format!("unknown cloud provider: {}", other)),
        }
    }
}

/// Body of `POST /privateEndpoint/endpointService`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointServiceRequest {
    pub provider_name: CloudProvider,
    pub region: String,
}

impl EndpointServiceRequest {
    pub fn new(provider_name: CloudProvider, region: impl Into<String>) -> Self {
        Self {
            provider_name,
            region: region.into(),
        }
    }
}

/// Body of `POST /privateEndpoint/{provider}/endpointService/{id}/endpoint`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfigRequest {
    /// Resource id of the consumer-side private endpoint
    pub id: String,
    #[serde(rename = "privateEndpointIPAddress")]
    pub private_endpoint_ip_address: String,
}

/// A JSON object returned by Atlas.
///
/// Atlas answers with several shapes (a created service, an error envelope,
/// a list entry) so only the handful of fields we act on get accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProvisioningResult(pub Map<String, Value>);

impl ProvisioningResult {
    fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn id(&self) -> Option<&str> {
        self.str_field("id")
    }

    pub fn status(&self) -> Option<&str> {
        self.str_field("status")
    }

    pub fn error_code(&self) -> Option<&str> {
        self.str_field("errorCode")
    }

    pub fn private_link_service_resource_id(&self) -> Option<&str> {
        self.str_field("privateLinkServiceResourceId")
    }

    pub fn is_initiating(&self) -> bool {
        self.status() == Some(INITIATING_STATUS)
    }

    pub fn is_region_conflict(&self) -> bool {
        self.error_code() == Some(ALREADY_EXISTS_FOR_REGION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_service_request_wire_format() {
        let req = EndpointServiceRequest::new(CloudProvider::Azure, "eastus2");
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"providerName": "AZURE", "region": "eastus2"})
        );
    }

    #[test]
    fn test_endpoint_config_request_wire_format() {
        let req = EndpointConfigRequest {
            id: "/subscriptions/abc/privateEndpoints/pe-1".to_string(),
            private_endpoint_ip_address: "10.0.0.4".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "id": "/subscriptions/abc/privateEndpoints/pe-1",
                "privateEndpointIPAddress": "10.0.0.4"
            })
        );
    }

    #[test]
    fn test_cloud_provider_parse_and_display() {
        assert_eq!("azure".parse::<CloudProvider>(), Ok(CloudProvider::Azure));
        assert_eq!("GCP".parse::<CloudProvider>(), Ok(CloudProvider::Gcp));
        assert!("oracle".parse::<CloudProvider>().is_err());
        assert_eq!(CloudProvider::Aws.to_string(), "AWS");
        assert_eq!(CloudProvider::default(), CloudProvider::Azure);
    }

    #[test]
    fn test_provisioning_result_accessors() {
        let result: ProvisioningResult = serde_json::from_value(json!({
            "id": "5f1b",
            "status": "INITIATING",
            "regionName": "eastus"
        }))
        .unwrap();

        assert_eq!(result.id(), Some("5f1b"));
        assert!(result.is_initiating());
        assert!(!result.is_region_conflict());
        assert_eq!(result.private_link_service_resource_id(), None);
    }

    #[test]
    fn test_provisioning_result_conflict_and_non_string_fields() {
        let result: ProvisioningResult = serde_json::from_value(json!({
            "errorCode": ALREADY_EXISTS_FOR_REGION,
            "detail": "exists",
            "id": 42
        }))
        .unwrap();

        assert!(result.is_region_conflict());
        assert_eq!(result.id(), None);
        assert_eq!(result.status(), None);
    }
}

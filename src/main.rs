//! Atlas Private Endpoint Agent
//!
//! Provisions MongoDB Atlas private endpoints for integration test runs.
//!
//! # Usage
//! ```bash
//! export ATLAS_HOST=https://cloud.mongodb.com/api/atlas/v1.0/groups/<GROUP-ID>
//! export ATLAS_PUBLIC_KEY=... ATLAS_PRIVATE_KEY=...
//!
//! # Create an endpoint service in the first free region
//! atlas-private-endpoint create
//!
//! # Read the private link resource ID of a service
//! atlas-private-endpoint lookup --endpoint-id 5f1b...
//!
//! # Register the consumer endpoint
//! atlas-private-endpoint configure --endpoint-id 5f1b... --resource-id /subscriptions/... --ip-address 10.0.0.4
//!
//! # Both steps in one run
//! atlas-private-endpoint provision --resource-id /subscriptions/... --ip-address 10.0.0.4
//! ```

use anyhow::{Context, Result};
use atlas_private_endpoint::{
    AtlasClient, AtlasCredentials, CloudProvider, PrivateEndpointProvisioner, ProvisionerConfig,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

// ============================================================
// CLI Definition
// ============================================================

#[derive(Parser)]
#[command(name = "atlas-private-endpoint")]
#[command(about = "MongoDB Atlas private endpoint provisioning agent", long_about = None)]
#[command(version)]
struct Cli {
    /// Atlas project API URL (e.g. https://cloud.mongodb.com/api/atlas/v1.0/groups/<GROUP-ID>)
    #[arg(long, env = "ATLAS_HOST")]
    host: String,

    /// Atlas programmatic API public key
    #[arg(long, env = "ATLAS_PUBLIC_KEY")]
    public_key: String,

    /// Atlas programmatic API private key
    #[arg(long, env = "ATLAS_PRIVATE_KEY", hide_env_values = true)]
    private_key: String,

    /// Cloud provider of the endpoint service
    #[arg(long, default_value = "AZURE")]
    provider: CloudProvider,

    /// Candidate regions, tried in order
    #[arg(long, value_delimiter = ',', default_values_t = default_regions())]
    regions: Vec<String>,

    /// Seconds to wait for Atlas to allocate the private link resource
    #[arg(long, default_value = "180")]
    wait_secs: u64,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an endpoint service in the first free region
    Create,

    /// Look up the private link resource ID of an endpoint service
    Lookup {
        /// Atlas endpoint service ID
        #[arg(long)]
        endpoint_id: String,
    },

    /// Register a consumer private endpoint with an endpoint service
    Configure {
        /// Atlas endpoint service ID
        #[arg(long)]
        endpoint_id: String,

        /// Resource ID of the consumer private endpoint
        #[arg(long)]
        resource_id: String,

        /// Private IP address of the consumer endpoint
        #[arg(long)]
        ip_address: String,
    },

    /// Create an endpoint service and register the consumer endpoint
    Provision {
        /// Resource ID of the consumer private endpoint
        #[arg(long)]
        resource_id: String,

        /// Private IP address of the consumer endpoint
        #[arg(long)]
        ip_address: String,
    },
}

fn default_regions() -> Vec<String> {
    ProvisionerConfig::default().regions
}

fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

// ============================================================
// Main Entry Point
// ============================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.json_logs)?;

    info!(host = %cli.host, provider = %cli.provider, "🚀 Atlas private endpoint agent starting...");

    let client = AtlasClient::new(
        cli.host.clone(),
        AtlasCredentials::new(cli.public_key, cli.private_key),
    )
    .context("Failed to build Atlas client")?;

    let config = ProvisionerConfig::default()
        .provider(cli.provider)
        .regions(cli.regions)
        .resource_id_wait(Duration::from_secs(cli.wait_secs));

    let mut provisioner = PrivateEndpointProvisioner::new(client, config);
    let json = matches!(cli.output, OutputFormat::Json);

    match cli.command {
        Commands::Create => {
            provisioner
                .create_endpoint()
                .await
                .context("Failed to create private endpoint service")?;

            let endpoint_id = provisioner.last_endpoint_id().unwrap_or_default();
            let resource_id = provisioner.last_resource_id().unwrap_or_default();
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "endpointId": endpoint_id,
                        "privateLinkServiceResourceId": resource_id,
                    }))?
                );
            } else {
                println!("✅ Endpoint service: {}", endpoint_id);
                println!("🔗 Resource ID:      {}", resource_id);
            }
        }

        Commands::Lookup { endpoint_id } => {
            let resource_id = provisioner
                .lookup_resource_id(&endpoint_id)
                .await
                .with_context(|| format!("Failed to look up endpoint service {}", endpoint_id))?;

            if resource_id.is_empty() {
                anyhow::bail!("No resource ID found for endpoint service {}", endpoint_id);
            }
            println!("{}", resource_id);
        }

        Commands::Configure {
            endpoint_id,
            resource_id,
            ip_address,
        } => {
            let status = provisioner
                .configure_endpoint(&ip_address, &resource_id, &endpoint_id)
                .await
                .context("Failed to configure private endpoint")?;

            println!("✅ Private endpoint is being configured (HTTP {})", status.as_u16());
        }

        Commands::Provision {
            resource_id,
            ip_address,
        } => {
            let provisioned = provisioner
                .provision(&ip_address, &resource_id)
                .await
                .context("Failed to provision private endpoint")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&provisioned)?);
            } else {
                println!("✅ Endpoint service: {}", provisioned.endpoint_id);
                println!(
                    "🔗 Resource ID:      {}",
                    provisioned.private_link_service_resource_id
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from([
            "atlas-private-endpoint",
            "--host",
            "https://cloud.mongodb.com/api/atlas/v1.0/groups/g1",
            "--public-key",
            "pub",
            "--private-key",
            "priv",
            "create",
        ])
        .unwrap();

        assert_eq!(cli.provider, CloudProvider::Azure);
        assert_eq!(cli.regions, default_regions());
        assert_eq!(cli.wait_secs, 180);
        assert!(matches!(cli.command, Commands::Create));
    }

    #[test]
    fn test_cli_region_list_and_provision() {
        let cli = Cli::try_parse_from([
            "atlas-private-endpoint",
            "--host",
            "http://localhost",
            "--public-key",
            "pub",
            "--private-key",
            "priv",
            "--regions",
            "eastus,westus",
            "--provider",
            "aws",
            "provision",
            "--resource-id",
            "/pe",
            "--ip-address",
            "10.0.0.4",
        ])
        .unwrap();

        assert_eq!(cli.regions, vec!["eastus", "westus"]);
        assert_eq!(cli.provider, CloudProvider::Aws);
        match cli.command {
            Commands::Provision {
                resource_id,
                ip_address,
            } => {
                assert_eq!(resource_id, "/pe");
                assert_eq!(ip_address, "10.0.0.4");
            }
            _ => panic!("expected provision"),
        }
    }
}

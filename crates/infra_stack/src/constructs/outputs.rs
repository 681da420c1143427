//! Published stack outputs.

use tracing::info;

use crate::constructs::bastion::BastionHandle;
use crate::constructs::database::DatabaseHandle;
use crate::constructs::load_balancer::LoadBalancerHandle;
use crate::constructs::storage::BucketHandle;
use crate::constructs::vpn::RemoteAccessHandle;
use crate::error::StackResult;
use crate::stack::Stack;
use crate::token::Token;

/// Handles the outputs are read from.
pub struct OutputSources<'a> {
    pub load_balancer: &'a LoadBalancerHandle,
    pub bastion: &'a BastionHandle,
    pub database: &'a DatabaseHandle,
    pub bucket: &'a BucketHandle,
    pub remote_access: &'a RemoteAccessHandle,
}

/// Publish the identifiers operators need after a deployment.
pub fn export_outputs(stack: &mut Stack, sources: &OutputSources<'_>) -> StackResult<()> {
    let outputs = [
        (
            "ApplicationURL",
            sources.load_balancer.url(),
            Some("Public URL of the FastAPI application"),
        ),
        ("BastionInstanceID", sources.bastion.instance_id(), Some("Bastion Instance ID")),
        (
            "DatabaseClusterEndpoint",
            sources.database.endpoint_hostname(),
            Some("Database Cluster Endpoint"),
        ),
        (
            "DatabaseName",
            Token::lit(sources.database.database_name.as_str()),
            Some("Database name"),
        ),
        (
            "DatabaseSecretArn",
            sources.database.secret_arn(),
            Some("Secret ARN for database credentials"),
        ),
        ("PuppetBucketName", sources.bucket.bucket_name(), None),
        (
            "VpnEndpointId",
            sources.remote_access.endpoint_id(),
            Some("Client VPN Endpoint ID"),
        ),
    ];

    let count = outputs.len();
    for (name, value, description) in outputs {
        stack.add_output(name, value, description)?;
    }
    info!("Published {} stack outputs", count);
    Ok(())
}

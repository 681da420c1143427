//! Composition of the full stack from its configuration.

use tracing::info;

use crate::config::StackConfig;
use crate::constructs::{
    create_bastion, create_config_bucket, create_database, create_load_balancer, create_network,
    create_remote_access, create_repository, create_service, export_outputs, BastionHandle, BucketHandle,
    DatabaseHandle, LoadBalancerHandle, NetworkHandle, OutputSources, RemoteAccessHandle, RepositoryHandle,
    ServiceHandle,
};
use crate::error::StackResult;
use crate::stack::Stack;
use crate::template::Template;

pub const NETWORK_ID: &str = "VPCDevOpsTest";
pub const BUCKET_ID: &str = "PuppetBucket";
pub const REPOSITORY_ID: &str = "AppRepository";

/// A composed stack together with the handles of everything in it.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub stack: Stack,
    pub network: NetworkHandle,
    pub bucket: BucketHandle,
    pub remote_access: RemoteAccessHandle,
    pub bastion: BastionHandle,
    pub database: DatabaseHandle,
    pub repository: RepositoryHandle,
    pub service: ServiceHandle,
    pub load_balancer: LoadBalancerHandle,
}

/// Run every provider in dependency order. The first failing provider
/// aborts the whole assembly.
pub fn assemble(config: &StackConfig) -> StackResult<Assembly> {
    config.validate()?;
    info!("Assembling stack {}", config.stack_name);

    let mut stack = Stack::new(&config.stack_name);
    if !config.description.is_empty() {
        stack = stack.with_description(&config.description);
    }

    let network = create_network(&mut stack, NETWORK_ID, &config.network)?;
    let bucket = create_config_bucket(&mut stack, BUCKET_ID, &config.storage)?;
    let remote_access = create_remote_access(&mut stack, &network, &config.vpn)?;
    let bastion = create_bastion(
        &mut stack,
        &network,
        &bucket,
        &remote_access.security_group,
        &config.bastion,
    )?;
    let mut database = create_database(
        &mut stack,
        &network,
        &config.database,
        &[(&bastion.security_group, "Allow Bastion access to PostgreSQL")],
    )?;
    let repository = create_repository(&mut stack, REPOSITORY_ID)?;
    let service = create_service(&mut stack, &network, &mut database, &repository, &config.service)?;
    let load_balancer = create_load_balancer(&mut stack, &network, &service, &config.load_balancer)?;

    export_outputs(
        &mut stack,
        &OutputSources {
            load_balancer: &load_balancer,
            bastion: &bastion,
            database: &database,
            bucket: &bucket,
            remote_access: &remote_access,
        },
    )?;

    info!("Stack {} assembled with {} resources", config.stack_name, stack.len());

    Ok(Assembly {
        stack,
        network,
        bucket,
        remote_access,
        bastion,
        database,
        repository,
        service,
        load_balancer,
    })
}

/// Assemble and synthesize in one step.
pub fn synth(config: &StackConfig) -> StackResult<Template> {
    assemble(config)?.stack.synth()
}

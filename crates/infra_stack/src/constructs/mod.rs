//! Resource providers.
//!
//! Each provider declares one part of the stack and returns a handle that
//! later providers use to reference what it created. Providers must run in
//! dependency order; [`crate::assembly::assemble`] does that.

pub mod bastion;
pub mod database;
pub mod iam;
pub mod load_balancer;
pub mod network;
pub mod orchestration;
pub mod outputs;
pub mod registry;
pub mod security_group;
pub mod storage;
pub mod vpn;

pub use bastion::{create_bastion, BastionHandle};
pub use database::{create_database, DatabaseHandle};
pub use load_balancer::{create_load_balancer, LoadBalancerHandle};
pub use network::{create_network, NetworkHandle, SubnetHandle, SubnetKind};
pub use orchestration::{create_service, ServiceHandle};
pub use outputs::{export_outputs, OutputSources};
pub use registry::{create_repository, RepositoryHandle};
pub use security_group::SecurityGroupHandle;
pub use storage::{create_config_bucket, BucketHandle};
pub use vpn::{create_remote_access, RemoteAccessHandle};

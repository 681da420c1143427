//! # infra_deploy
//!
//! Applies synthesized stacks through a deployment engine.
//!
//! The [`DeployEngine`] trait is the seam between the stack and the cloud.
//! [`AwsCliEngine`] drives `aws cloudformation`; [`MockEngine`] records calls
//! for tests. [`Deployer`] runs the whole flow and fails as a unit.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use infra_deploy::{AwsCliEngine, AwsCliOptions, Deployer};
//! use infra_stack::StackConfig;
//!
//! # async fn run() -> infra_deploy::DeployResult<()> {
//! let engine = AwsCliEngine::new(AwsCliOptions::new().dry_run());
//! let deployer = Deployer::new(Arc::new(engine)).with_workdir("cdk.out");
//!
//! let report = deployer.deploy(&StackConfig::default()).await?;
//! println!("{} deployed as {}", report.stack_name, report.deployment_id);
//! # Ok(())
//! # }
//! ```

pub mod aws_cli;
pub mod deployer;
pub mod engine;
pub mod error;
pub mod mock;

pub use aws_cli::{AwsCliEngine, AwsCliOptions};
pub use deployer::{Deployer, DeploymentReport};
pub use engine::{DeployEngine, DeployRequest, StackOutput};
pub use error::{DeployError, DeployResult};
pub use mock::MockEngine;

//! # infra_stack
//!
//! Declarative composition of the devopstest cloud stack.
//!
//! Providers add resource declarations to a [`Stack`] in dependency order and
//! hand back typed handles that later providers reference. The stack rejects
//! any reference to something not yet declared, then synthesizes into a
//! CloudFormation [`Template`] for the deployment engine.
//!
//! ## Features
//!
//! - Network, object storage, client VPN, bastion, Aurora PostgreSQL,
//!   image registry, Fargate service and load balancer providers
//! - Deterministic subnet allocation from the network range
//! - Creation waves and cycle detection over the resource graph
//! - Template inspection and structural checks without a cloud account
//!
//! ## Example
//!
//! ```rust,no_run
//! use infra_stack::{assemble, StackConfig, StructuralChecks, TemplateFormat};
//! use std::path::Path;
//!
//! let assembly = assemble(&StackConfig::default()).unwrap();
//! let template = assembly.stack.synth().unwrap();
//!
//! let report = StructuralChecks::new().run(&template);
//! assert!(report.passed);
//!
//! template
//!     .write_to(Path::new("cdk.out"), assembly.stack.name(), TemplateFormat::Json)
//!     .unwrap();
//! ```

pub mod assembly;
pub mod assertions;
pub mod checks;
pub mod cidr;
pub mod config;
pub mod constructs;
pub mod error;
pub mod graph;
pub mod resource;
pub mod stack;
pub mod template;
pub mod token;

pub use assembly::{assemble, synth, Assembly};
pub use assertions::TemplateInspector;
pub use checks::{StructuralChecks, ValidationCheck, ValidationReport};
pub use cidr::{Cidr, SubnetAllocator};
pub use config::StackConfig;
pub use error::{StackError, StackResult};
pub use graph::DependencyGraph;
pub use resource::{LogicalId, RemovalPolicy, Resource};
pub use stack::Stack;
pub use template::{Output, Parameter, Template, TemplateFormat};
pub use token::{Pseudo, Token};

//! Deployment context for the stack.
//!
//! The defaults reproduce the reference deployment; a YAML file may override
//! any subset of fields.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cidr::Cidr;
use crate::error::{StackError, StackResult};

/// Top-level stack configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    /// Stack name used by the deployment engine.
    pub stack_name: String,
    pub description: String,
    /// Target region; the engine's default region when unset.
    pub region: Option<String>,
    pub network: NetworkConfig,
    pub storage: StorageConfig,
    pub vpn: VpnConfig,
    pub bastion: BastionConfig,
    pub database: DatabaseConfig,
    pub service: ServiceConfig,
    pub load_balancer: LoadBalancerConfig,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            stack_name: "CdkInfraTestStack".to_string(),
            description: "DevOpsTest network, VPN, bastion, database and container service".to_string(),
            region: None,
            network: NetworkConfig::default(),
            storage: StorageConfig::default(),
            vpn: VpnConfig::default(),
            bastion: BastionConfig::default(),
            database: DatabaseConfig::default(),
            service: ServiceConfig::default(),
            load_balancer: LoadBalancerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub cidr: String,
    pub max_azs: usize,
    /// NAT gateways shared by all private subnets.
    pub nat_gateways: usize,
    pub subnet_mask: u8,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            cidr: "10.0.0.0/16".to_string(),
            max_azs: 2,
            nat_gateways: 1,
            subnet_mask: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub bucket_name: String,
    /// Prefix synchronized onto the jump host.
    pub payload_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket_name: "puppet-bucket".to_string(),
            payload_prefix: "puppet".to_string(),
        }
    }
}

/// Subject fields of the private certificate authority.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaSubject {
    pub country: String,
    pub organization: String,
    pub organizational_unit: String,
    pub common_name: String,
}

impl Default for CaSubject {
    fn default() -> Self {
        Self {
            country: "BR".to_string(),
            organization: "DevOpsTest".to_string(),
            organizational_unit: "IT".to_string(),
            common_name: "vpn.devops.local".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VpnConfig {
    pub client_cidr: String,
    pub subject: CaSubject,
    pub key_algorithm: String,
    pub signing_algorithm: String,
    pub ca_validity_years: u32,
    pub server_domain: String,
    pub client_domain: String,
    pub transport_protocol: String,
    pub split_tunnel: bool,
}

impl Default for VpnConfig {
    fn default() -> Self {
        Self {
            client_cidr: "10.100.0.0/22".to_string(),
            subject: CaSubject::default(),
            key_algorithm: "RSA_2048".to_string(),
            signing_algorithm: "SHA384WITHRSA".to_string(),
            ca_validity_years: 10,
            server_domain: "vpn-server.devopstest.local".to_string(),
            client_domain: "vpn-client.devopstest.local".to_string(),
            transport_protocol: "udp".to_string(),
            split_tunnel: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BastionConfig {
    pub instance_type: String,
    /// SSM parameter path resolving to the machine image.
    pub image_parameter: String,
    pub ssh_port: u16,
}

impl Default for BastionConfig {
    fn default() -> Self {
        Self {
            instance_type: "t3.micro".to_string(),
            image_parameter: "/aws/service/ami-amazon-linux-latest/al2023-ami-kernel-6.1-x86_64"
                .to_string(),
            ssh_port: 22,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub database_name: String,
    pub username: String,
    pub engine_version: String,
    pub port: u16,
    pub min_capacity: f64,
    pub max_capacity: f64,
    pub readers: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_name: "appdb".to_string(),
            username: "postres".to_string(),
            engine_version: "14.6".to_string(),
            port: 5432,
            min_capacity: 0.5,
            max_capacity: 1.0,
            readers: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub container_name: String,
    pub cpu: u32,
    pub memory_mib: u32,
    pub container_port: u16,
    pub image_tag: String,
    pub log_stream_prefix: String,
    pub desired_count: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            container_name: "FastAPIContainer".to_string(),
            cpu: 256,
            memory_mib: 512,
            container_port: 8000,
            image_tag: "latest".to_string(),
            log_stream_prefix: "fastapi".to_string(),
            desired_count: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadBalancerConfig {
    pub listener_port: u16,
    pub health_check_path: String,
    pub health_check_interval_secs: u32,
}

impl Default for LoadBalancerConfig {
    fn default() -> Self {
        Self {
            listener_port: 80,
            health_check_path: "/health".to_string(),
            health_check_interval_secs: 30,
        }
    }
}

impl StackConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> StackResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: StackConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_file(&self, path: &Path) -> StackResult<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn vpc_cidr(&self) -> StackResult<Cidr> {
        self.network.cidr.parse()
    }

    /// Check that the configuration describes a buildable stack.
    pub fn validate(&self) -> StackResult<()> {
        let starts_with_letter = self
            .stack_name
            .chars()
            .next()
            .map_or(false, |c| c.is_ascii_alphabetic());
        if !starts_with_letter
            || self.stack_name.len() > 128
            || !self
                .stack_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(StackError::InvalidConfig(format!(
                "stack name must start with a letter and contain only letters, digits or '-' (max 128): {:?}",
                self.stack_name
            )));
        }

        let vpc = self.vpc_cidr()?;
        let client: Cidr = self.vpn.client_cidr.parse()?;
        if vpc.overlaps(&client) {
            return Err(StackError::InvalidConfig(format!(
                "VPN client range {} overlaps the network {}",
                client, vpc
            )));
        }

        if self.network.max_azs == 0 {
            return Err(StackError::InvalidConfig("at least one availability zone is required".to_string()));
        }
        if self.network.nat_gateways == 0 || self.network.nat_gateways > self.network.max_azs {
            return Err(StackError::InvalidConfig(format!(
                "nat_gateways must be between 1 and {}",
                self.network.max_azs
            )));
        }
        if self.network.subnet_mask < vpc.prefix() {
            return Err(StackError::InvalidConfig(format!(
                "subnet mask /{} is wider than the network {}",
                self.network.subnet_mask, vpc
            )));
        }

        let db = &self.database;
        if db.min_capacity <= 0.0 || db.min_capacity > db.max_capacity {
            return Err(StackError::InvalidConfig(format!(
                "database capacity bounds are inverted: {} > {}",
                db.min_capacity, db.max_capacity
            )));
        }
        if db.username.is_empty() || db.database_name.is_empty() {
            return Err(StackError::InvalidConfig("database name and username are required".to_string()));
        }

        if self.service.desired_count == 0 {
            return Err(StackError::InvalidConfig("service desired_count must be at least 1".to_string()));
        }
        if !self.load_balancer.health_check_path.starts_with('/') {
            return Err(StackError::InvalidConfig(format!(
                "health check path must be absolute: {}",
                self.load_balancer.health_check_path
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        let config = StackConfig::default();
        config.validate().unwrap();
        assert_eq!(config.network.max_azs, 2);
        assert_eq!(config.network.nat_gateways, 1);
        assert_eq!(config.database.port, 5432);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stack.yaml");
        fs::write(&path, "stack_name: demo\nservice:\n  desired_count: 2\n").unwrap();

        let config = StackConfig::from_file(&path).unwrap();
        assert_eq!(config.stack_name, "demo");
        assert_eq!(config.service.desired_count, 2);
        assert_eq!(config.service.cpu, 256);
        assert_eq!(config.storage.bucket_name, "puppet-bucket");
    }

    #[test]
    fn test_round_trip_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stack.yaml");
        StackConfig::default().to_file(&path).unwrap();
        let loaded = StackConfig::from_file(&path).unwrap();
        assert_eq!(loaded.vpn.client_cidr, "10.100.0.0/22");
    }

    #[test]
    fn test_rejects_overlapping_client_range() {
        let mut config = StackConfig::default();
        config.vpn.client_cidr = "10.0.4.0/22".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_too_many_nat_gateways() {
        let mut config = StackConfig::default();
        config.network.nat_gateways = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_capacity() {
        let mut config = StackConfig::default();
        config.database.min_capacity = 4.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_stack_name_must_start_with_a_letter() {
        for name in ["-stack", "1stack", "", "stack_name"] {
            let mut config = StackConfig::default();
            config.stack_name = name.to_string();
            assert!(
                matches!(config.validate(), Err(StackError::InvalidConfig(_))),
                "{:?} should be rejected",
                name
            );
        }

        let mut config = StackConfig::default();
        config.stack_name = "staging-stack-2".to_string();
        assert!(config.validate().is_ok());
    }
}

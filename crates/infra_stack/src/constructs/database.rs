//! Managed relational database cluster with generated credentials.

use serde_json::json;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::constructs::network::NetworkHandle;
use crate::constructs::security_group::{allow_from_group, create_security_group, Egress, SecurityGroupHandle};
use crate::error::StackResult;
use crate::resource::{LogicalId, RemovalPolicy, Resource};
use crate::stack::Stack;
use crate::token::Token;

const ENGINE: &str = "aurora-postgresql";
const SERVERLESS_INSTANCE_CLASS: &str = "db.serverless";
const PASSWORD_EXCLUDED_CHARACTERS: &str = " %+~`#$&*()|[]{}:;<>?!'/@\"\\";

#[derive(Debug, Clone)]
pub struct DatabaseHandle {
    pub cluster: LogicalId,
    pub security_group: SecurityGroupHandle,
    pub subnet_group: LogicalId,
    pub secret: LogicalId,
    pub secret_attachment: LogicalId,
    pub writer: LogicalId,
    pub readers: Vec<LogicalId>,
    pub port: u16,
    pub database_name: String,
    authorized: Vec<LogicalId>,
}

impl DatabaseHandle {
    pub fn endpoint_hostname(&self) -> Token {
        self.cluster.att("Endpoint.Address")
    }

    /// ARN of the secret holding the generated credentials.
    pub fn secret_arn(&self) -> Token {
        self.secret_attachment.reference()
    }

    /// Reference to one JSON field of the credential secret, in the form the
    /// container service injects secrets from.
    pub fn secret_field(&self, field: &str) -> Token {
        Token::concat(vec![self.secret_arn(), Token::lit(format!(":{}::", field))])
    }

    /// Groups allowed to reach the database port.
    pub fn authorized_groups(&self) -> &[LogicalId] {
        &self.authorized
    }

    /// Grant `peer` access on the database port. This is the only way
    /// ingress is ever added to the database group.
    pub fn allow_from(
        &mut self,
        stack: &mut Stack,
        peer: &SecurityGroupHandle,
        description: &str,
    ) -> StackResult<LogicalId> {
        let rule = allow_from_group(stack, &self.security_group, peer, self.port, description)?;
        self.authorized.push(peer.id.clone());
        info!("Database access granted to {}", peer.id);
        Ok(rule)
    }
}

fn resolve_secret(secret: &LogicalId, key: &str) -> Token {
    Token::concat(vec![
        Token::lit("{{resolve:secretsmanager:"),
        secret.reference(),
        Token::lit(format!(":SecretString:{}::}}}}", key)),
    ])
}

/// Declare a writer + reader serverless cluster in the private subnets,
/// reachable only from the `authorized` groups.
pub fn create_database(
    stack: &mut Stack,
    network: &NetworkHandle,
    config: &DatabaseConfig,
    authorized: &[(&SecurityGroupHandle, &str)],
) -> StackResult<DatabaseHandle> {
    let security_group = create_security_group(
        stack,
        "DatabaseSG",
        network,
        "SG for Database",
        Egress::AllowAll,
    )?;

    let subnet_group = stack.add(
        "DataBaseSubnetGroup",
        Resource::new("AWS::RDS::DBSubnetGroup")
            .prop("DBSubnetGroupDescription", "Database Subnet Group")
            .prop("SubnetIds", network.private_subnet_ids())
            .removal_policy(RemovalPolicy::Destroy),
    )?;

    let secret = stack.add(
        "DatabaseClusterSecret",
        Resource::new("AWS::SecretsManager::Secret")
            .prop("Description", "Generated credentials for the database cluster")
            .prop(
                "GenerateSecretString",
                json!({
                    "ExcludeCharacters": PASSWORD_EXCLUDED_CHARACTERS,
                    "GenerateStringKey": "password",
                    "PasswordLength": 30,
                    "SecretStringTemplate": json!({ "username": config.username }).to_string()
                }),
            )
            .removal_policy(RemovalPolicy::Destroy),
    )?;

    let cluster = stack.add(
        "DatabaseCluster",
        Resource::new("AWS::RDS::DBCluster")
            .prop("CopyTagsToSnapshot", true)
            .prop("DBSubnetGroupName", subnet_group.reference())
            .prop("DatabaseName", config.database_name.as_str())
            .prop("Engine", ENGINE)
            .prop("EngineVersion", config.engine_version.as_str())
            .prop("MasterUsername", resolve_secret(&secret, "username"))
            .prop("MasterUserPassword", resolve_secret(&secret, "password"))
            .prop("Port", config.port)
            .prop(
                "ServerlessV2ScalingConfiguration",
                json!({ "MaxCapacity": config.max_capacity, "MinCapacity": config.min_capacity }),
            )
            .prop("StorageEncrypted", true)
            .prop("VpcSecurityGroupIds", vec![security_group.group_id().to_value()])
            .removal_policy(RemovalPolicy::Destroy),
    )?;

    let secret_attachment = stack.add(
        "DatabaseClusterSecretAttachment",
        Resource::new("AWS::SecretsManager::SecretTargetAttachment")
            .prop("SecretId", secret.reference())
            .prop("TargetId", cluster.reference())
            .prop("TargetType", "AWS::RDS::DBCluster"),
    )?;

    let instance = |promotion_tier: u32| {
        Resource::new("AWS::RDS::DBInstance")
            .prop("DBClusterIdentifier", cluster.reference())
            .prop("DBInstanceClass", SERVERLESS_INSTANCE_CLASS)
            .prop("Engine", ENGINE)
            .prop("PromotionTier", promotion_tier)
            .prop("PubliclyAccessible", false)
            .removal_policy(RemovalPolicy::Destroy)
    };

    let writer = stack.add("DatabaseClusterwriter", instance(0))?;
    let mut readers = Vec::new();
    for i in 0..config.readers {
        let id = if i == 0 {
            "DatabaseClusterreader".to_string()
        } else {
            format!("DatabaseClusterreader{}", i + 1)
        };
        readers.push(stack.add(&id, instance(2).depends_on(&writer))?);
    }

    let mut handle = DatabaseHandle {
        cluster,
        security_group,
        subnet_group,
        secret,
        secret_attachment,
        writer,
        readers,
        port: config.port,
        database_name: config.database_name.clone(),
        authorized: Vec::new(),
    };

    for (peer, description) in authorized {
        handle.allow_from(stack, peer, description)?;
    }

    info!(
        "Database cluster declared ({} {}, {} reader(s), capacity {}-{})",
        ENGINE,
        config.engine_version,
        handle.readers.len(),
        config.min_capacity,
        config.max_capacity
    );

    Ok(handle)
}

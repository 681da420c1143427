//! Jump host inside the private range.

use serde_json::json;
use tracing::info;

use crate::config::BastionConfig;
use crate::constructs::iam::{self, RoleHandle};
use crate::constructs::network::NetworkHandle;
use crate::constructs::security_group::{allow_from_group, create_security_group, Egress, SecurityGroupHandle};
use crate::constructs::storage::BucketHandle;
use crate::error::StackResult;
use crate::resource::{tags, LogicalId, Resource};
use crate::stack::Stack;
use crate::template::Parameter;
use crate::token::Token;

/// Where the configuration payload is synchronized to on the host.
pub const PAYLOAD_DIR: &str = "/opt/puppet";

#[derive(Debug, Clone)]
pub struct BastionHandle {
    pub instance: LogicalId,
    pub security_group: SecurityGroupHandle,
    pub role: RoleHandle,
    pub instance_profile: LogicalId,
}

impl BastionHandle {
    pub fn instance_id(&self) -> Token {
        self.instance.reference()
    }
}

/// Bootstrap commands run once at first boot. Failures are not retried.
pub fn bootstrap_commands(bucket_name: Token, payload_prefix: &str) -> Vec<Token> {
    vec![
        Token::lit("#!/bin/bash"),
        Token::lit("yum install -y amazon-ssm-agent"),
        Token::lit("systemctl enable amazon-ssm-agent"),
        Token::lit("systemctl start amazon-ssm-agent"),
        Token::lit("yum install -y puppet"),
        Token::concat(vec![
            Token::lit("aws s3 sync s3://"),
            bucket_name,
            Token::lit(format!("/{} {}", payload_prefix, PAYLOAD_DIR)),
        ]),
        Token::lit(format!("puppet apply {}/manifests/site.pp", PAYLOAD_DIR)),
    ]
}

/// Declare a minimally privileged host reachable only from `vpn_group` on
/// the administrative port.
pub fn create_bastion(
    stack: &mut Stack,
    network: &NetworkHandle,
    bucket: &BucketHandle,
    vpn_group: &SecurityGroupHandle,
    config: &BastionConfig,
) -> StackResult<BastionHandle> {
    let security_group = create_security_group(
        stack,
        "BastionSG",
        network,
        "SG for Bastion Hosts",
        Egress::AllowAll,
    )?;
    allow_from_group(
        stack,
        &security_group,
        vpn_group,
        config.ssh_port,
        "Allow VPN access to Bastion via SSH",
    )?;

    let role = iam::create_role(
        stack,
        "BastionRole",
        "ec2.amazonaws.com",
        &["AmazonSSMManagedInstanceCore"],
    )?;
    let read_policy = bucket.grant_read(stack, "BastionRoleDefaultPolicy", &role)?;

    let instance_profile = stack.add(
        "BastionHostInstanceProfile",
        Resource::new("AWS::IAM::InstanceProfile").prop("Roles", vec![role.name().to_value()]),
    )?;

    let image = stack.add_parameter(
        "LatestAmazonLinuxImageId",
        Parameter::ssm_image_id(config.image_parameter.as_str()),
    )?;

    let user_data = Token::base64(Token::Join(
        "\n".to_string(),
        bootstrap_commands(bucket.bucket_name(), &bucket.payload_prefix),
    ));

    let subnet = network.first_private_subnet()?;
    let instance = stack.add(
        "BastionHost",
        Resource::new("AWS::EC2::Instance")
            .prop("AvailabilityZone", Token::az(subnet.az_index))
            .prop("IamInstanceProfile", instance_profile.reference())
            .prop("ImageId", image.reference())
            .prop("InstanceType", config.instance_type.as_str())
            .prop("SecurityGroupIds", vec![security_group.group_id().to_value()])
            .prop("SubnetId", subnet.subnet_id())
            .prop("Tags", tags(&[("Name", json!("BastionHost"))]))
            .prop("UserData", user_data)
            .depends_on(&role.id)
            .depends_on(&read_policy),
    )?;

    info!("Bastion host declared ({})", config.instance_type);

    Ok(BastionHandle {
        instance,
        security_group,
        role,
        instance_profile,
    })
}

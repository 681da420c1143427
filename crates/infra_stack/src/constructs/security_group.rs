//! Traffic-permission groups and the rules between them.

use serde_json::json;

use crate::constructs::network::NetworkHandle;
use crate::error::StackResult;
use crate::resource::{LogicalId, Resource};
use crate::stack::Stack;
use crate::token::Token;

/// Outbound policy of a new group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Egress {
    AllowAll,
    /// No outbound traffic until explicit egress rules are added.
    Restricted,
}

#[derive(Debug, Clone)]
pub struct SecurityGroupHandle {
    pub id: LogicalId,
}

impl SecurityGroupHandle {
    pub fn group_id(&self) -> Token {
        self.id.att("GroupId")
    }
}

pub fn create_security_group(
    stack: &mut Stack,
    id: &str,
    network: &NetworkHandle,
    description: &str,
    egress: Egress,
) -> StackResult<SecurityGroupHandle> {
    let egress_rules = match egress {
        Egress::AllowAll => json!([{
            "CidrIp": "0.0.0.0/0",
            "Description": "Allow all outbound traffic by default",
            "IpProtocol": "-1"
        }]),
        // A rule matching nothing replaces the implicit allow-all.
        Egress::Restricted => json!([{
            "CidrIp": "255.255.255.255/32",
            "Description": "Disallow all traffic",
            "FromPort": 252,
            "IpProtocol": "icmp",
            "ToPort": 86
        }]),
    };

    let resource = Resource::new("AWS::EC2::SecurityGroup")
        .prop("GroupDescription", description)
        .prop("SecurityGroupEgress", egress_rules)
        .prop("VpcId", network.vpc_id());

    let id = stack.add(id, resource)?;
    Ok(SecurityGroupHandle { id })
}

/// Allow TCP traffic on `port` into `target` from members of `peer`.
pub fn allow_from_group(
    stack: &mut Stack,
    target: &SecurityGroupHandle,
    peer: &SecurityGroupHandle,
    port: u16,
    description: &str,
) -> StackResult<LogicalId> {
    let id = format!("{}From{}{}", target.id, peer.id, port);
    let resource = Resource::new("AWS::EC2::SecurityGroupIngress")
        .prop("Description", description)
        .prop("FromPort", port)
        .prop("GroupId", target.group_id())
        .prop("IpProtocol", "tcp")
        .prop("SourceSecurityGroupId", peer.group_id())
        .prop("ToPort", port);
    stack.add(&id, resource)
}

/// Allow TCP traffic on `port` into `target` from any IPv4 address.
pub fn allow_from_anywhere(
    stack: &mut Stack,
    target: &SecurityGroupHandle,
    port: u16,
    description: &str,
) -> StackResult<LogicalId> {
    let id = format!("{}FromAnywhere{}", target.id, port);
    let resource = Resource::new("AWS::EC2::SecurityGroupIngress")
        .prop("CidrIp", "0.0.0.0/0")
        .prop("Description", description)
        .prop("FromPort", port)
        .prop("GroupId", target.group_id())
        .prop("IpProtocol", "tcp")
        .prop("ToPort", port);
    stack.add(&id, resource)
}

/// Allow TCP traffic on `port` out of `source` towards members of `peer`.
pub fn allow_to_group(
    stack: &mut Stack,
    source: &SecurityGroupHandle,
    peer: &SecurityGroupHandle,
    port: u16,
    description: &str,
) -> StackResult<LogicalId> {
    let id = format!("{}To{}{}", source.id, peer.id, port);
    let resource = Resource::new("AWS::EC2::SecurityGroupEgress")
        .prop("Description", description)
        .prop("DestinationSecurityGroupId", peer.group_id())
        .prop("FromPort", port)
        .prop("GroupId", source.group_id())
        .prop("IpProtocol", "tcp")
        .prop("ToPort", port);
    stack.add(&id, resource)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkConfig;
    use crate::constructs::network::create_network;

    fn setup() -> (Stack, NetworkHandle) {
        let mut stack = Stack::new("test");
        let network = create_network(&mut stack, "Vpc", &NetworkConfig::default()).unwrap();
        (stack, network)
    }

    #[test]
    fn test_restricted_egress_blocks_default_rule() {
        let (mut stack, network) = setup();
        let sg = create_security_group(&mut stack, "LbSG", &network, "lb", Egress::Restricted).unwrap();

        let egress = stack.resource(&sg.id).unwrap().property("SecurityGroupEgress").unwrap();
        assert_eq!(egress[0]["CidrIp"], "255.255.255.255/32");
    }

    #[test]
    fn test_group_to_group_ingress() {
        let (mut stack, network) = setup();
        let a = create_security_group(&mut stack, "A", &network, "a", Egress::AllowAll).unwrap();
        let b = create_security_group(&mut stack, "B", &network, "b", Egress::AllowAll).unwrap();

        let rule = allow_from_group(&mut stack, &a, &b, 22, "ssh").unwrap();
        assert_eq!(rule.as_str(), "AFromB22");

        let resource = stack.resource(&rule).unwrap();
        assert_eq!(resource.type_name, "AWS::EC2::SecurityGroupIngress");
        assert_eq!(resource.property("FromPort").unwrap(), 22);
        assert_eq!(
            resource.property("SourceSecurityGroupId").unwrap(),
            &b.group_id().to_value()
        );
    }

    #[test]
    fn test_duplicate_rule_is_rejected() {
        let (mut stack, network) = setup();
        let a = create_security_group(&mut stack, "A", &network, "a", Egress::AllowAll).unwrap();
        allow_from_anywhere(&mut stack, &a, 80, "http").unwrap();
        assert!(allow_from_anywhere(&mut stack, &a, 80, "http").is_err());
    }
}

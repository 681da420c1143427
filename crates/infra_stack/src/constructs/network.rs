//! Isolated network with public and private ranges across availability zones.

use serde_json::{json, Value};
use tracing::info;

use crate::cidr::{Cidr, SubnetAllocator};
use crate::config::NetworkConfig;
use crate::error::{StackError, StackResult};
use crate::resource::{tags, LogicalId, Resource};
use crate::stack::Stack;
use crate::token::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubnetKind {
    Public,
    Private,
}

impl SubnetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubnetKind::Public => "Public",
            SubnetKind::Private => "Private",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubnetHandle {
    pub id: LogicalId,
    pub kind: SubnetKind,
    pub cidr: Cidr,
    pub az_index: usize,
    pub route_table: LogicalId,
    /// The default route of this subnet.
    pub default_route: LogicalId,
}

impl SubnetHandle {
    pub fn subnet_id(&self) -> Token {
        self.id.reference()
    }
}

#[derive(Debug, Clone)]
pub struct NetworkHandle {
    pub vpc: LogicalId,
    pub cidr: Cidr,
    pub gateway_attachment: LogicalId,
    pub public_subnets: Vec<SubnetHandle>,
    pub private_subnets: Vec<SubnetHandle>,
    pub nat_gateways: Vec<LogicalId>,
}

impl NetworkHandle {
    pub fn vpc_id(&self) -> Token {
        self.vpc.reference()
    }

    pub fn cidr_block(&self) -> Token {
        self.vpc.att("CidrBlock")
    }

    pub fn public_subnet_ids(&self) -> Value {
        subnet_ids(&self.public_subnets)
    }

    pub fn private_subnet_ids(&self) -> Value {
        subnet_ids(&self.private_subnets)
    }

    pub fn first_private_subnet(&self) -> StackResult<&SubnetHandle> {
        self.private_subnets
            .first()
            .ok_or_else(|| StackError::ResourceNotFound(format!("{} private subnet", self.vpc)))
    }
}

fn subnet_ids(subnets: &[SubnetHandle]) -> Value {
    Value::Array(subnets.iter().map(|s| s.subnet_id().to_value()).collect())
}

/// Declare the network: one public and one private subnet per availability
/// zone, an internet gateway for the public range, and NAT gateways shared
/// by the private range.
pub fn create_network(stack: &mut Stack, name: &str, config: &NetworkConfig) -> StackResult<NetworkHandle> {
    let cidr: Cidr = config.cidr.parse()?;
    if config.nat_gateways == 0 || config.nat_gateways > config.max_azs {
        return Err(StackError::InvalidConfig(format!(
            "{} NAT gateways for {} availability zones",
            config.nat_gateways, config.max_azs
        )));
    }

    let vpc = stack.add(
        name,
        Resource::new("AWS::EC2::VPC")
            .prop("CidrBlock", cidr.to_string())
            .prop("EnableDnsHostnames", true)
            .prop("EnableDnsSupport", true)
            .prop("InstanceTenancy", "default")
            .prop("Tags", tags(&[("Name", json!(name))])),
    )?;

    let igw = stack.add(
        &format!("{}IGW", name),
        Resource::new("AWS::EC2::InternetGateway").prop("Tags", tags(&[("Name", json!(name))])),
    )?;
    let gateway_attachment = stack.add(
        &format!("{}VPCGW", name),
        Resource::new("AWS::EC2::VPCGatewayAttachment")
            .prop("InternetGatewayId", igw.reference())
            .prop("VpcId", vpc.reference()),
    )?;

    let mut allocator = SubnetAllocator::new(cidr);
    let public_cidrs = (0..config.max_azs)
        .map(|_| allocator.allocate(config.subnet_mask))
        .collect::<StackResult<Vec<_>>>()?;
    let private_cidrs = (0..config.max_azs)
        .map(|_| allocator.allocate(config.subnet_mask))
        .collect::<StackResult<Vec<_>>>()?;

    let mut public_subnets = Vec::new();
    for (az, subnet_cidr) in public_cidrs.into_iter().enumerate() {
        let subnet = declare_subnet(stack, name, &vpc, SubnetKind::Public, az, subnet_cidr, |route| {
            route
                .prop("GatewayId", igw.reference())
                .depends_on(&gateway_attachment)
        })?;
        public_subnets.push(subnet);
    }

    let mut nat_gateways = Vec::new();
    for (i, subnet) in public_subnets.iter().take(config.nat_gateways).enumerate() {
        let eip = stack.add(
            &format!("{}PublicSubnet{}EIP", name, i + 1),
            Resource::new("AWS::EC2::EIP").prop("Domain", "vpc"),
        )?;
        let nat = stack.add(
            &format!("{}PublicSubnet{}NATGateway", name, i + 1),
            Resource::new("AWS::EC2::NatGateway")
                .prop("AllocationId", eip.att("AllocationId"))
                .prop("SubnetId", subnet.subnet_id())
                .depends_on(&subnet.default_route),
        )?;
        nat_gateways.push(nat);
    }

    let mut private_subnets = Vec::new();
    for (az, subnet_cidr) in private_cidrs.into_iter().enumerate() {
        let nat = &nat_gateways[az % nat_gateways.len()];
        let subnet = declare_subnet(stack, name, &vpc, SubnetKind::Private, az, subnet_cidr, |route| {
            route.prop("NatGatewayId", nat.reference())
        })?;
        private_subnets.push(subnet);
    }

    info!(
        "Network {} ({}): {} zones, {} NAT gateway(s)",
        name,
        cidr,
        config.max_azs,
        nat_gateways.len()
    );

    Ok(NetworkHandle {
        vpc,
        cidr,
        gateway_attachment,
        public_subnets,
        private_subnets,
        nat_gateways,
    })
}

fn declare_subnet<F>(
    stack: &mut Stack,
    name: &str,
    vpc: &LogicalId,
    kind: SubnetKind,
    az: usize,
    cidr: Cidr,
    default_route: F,
) -> StackResult<SubnetHandle>
where
    F: FnOnce(Resource) -> Resource,
{
    let prefix = format!("{}{}Subnet{}", name, kind.as_str(), az + 1);

    let id = stack.add(
        &format!("{}Subnet", prefix),
        Resource::new("AWS::EC2::Subnet")
            .prop("AvailabilityZone", Token::az(az))
            .prop("CidrBlock", cidr.to_string())
            .prop("MapPublicIpOnLaunch", kind == SubnetKind::Public)
            .prop("VpcId", vpc.reference())
            .prop(
                "Tags",
                tags(&[
                    ("Name", json!(format!("{}/{}", name, prefix))),
                    ("subnet-type", json!(kind.as_str())),
                ]),
            ),
    )?;

    let route_table = stack.add(
        &format!("{}RouteTable", prefix),
        Resource::new("AWS::EC2::RouteTable").prop("VpcId", vpc.reference()),
    )?;

    stack.add(
        &format!("{}RouteTableAssociation", prefix),
        Resource::new("AWS::EC2::SubnetRouteTableAssociation")
            .prop("RouteTableId", route_table.reference())
            .prop("SubnetId", id.reference()),
    )?;

    let route = default_route(
        Resource::new("AWS::EC2::Route")
            .prop("DestinationCidrBlock", "0.0.0.0/0")
            .prop("RouteTableId", route_table.reference()),
    );
    let default_route = stack.add(&format!("{}DefaultRoute", prefix), route)?;

    Ok(SubnetHandle {
        id,
        kind,
        cidr,
        az_index: az,
        route_table,
        default_route,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(config: &NetworkConfig) -> (Stack, NetworkHandle) {
        let mut stack = Stack::new("test");
        let network = create_network(&mut stack, "Vpc", config).unwrap();
        (stack, network)
    }

    #[test]
    fn test_two_zones_one_public_one_private_each() {
        let (_, network) = build(&NetworkConfig::default());
        assert_eq!(network.public_subnets.len(), 2);
        assert_eq!(network.private_subnets.len(), 2);

        let zones: Vec<usize> = network.private_subnets.iter().map(|s| s.az_index).collect();
        assert_eq!(zones, vec![0, 1]);
    }

    #[test]
    fn test_subnet_ranges_are_carved_in_order() {
        let (_, network) = build(&NetworkConfig::default());
        let cidrs: Vec<String> = network
            .public_subnets
            .iter()
            .chain(network.private_subnets.iter())
            .map(|s| s.cidr.to_string())
            .collect();
        assert_eq!(cidrs, vec!["10.0.0.0/24", "10.0.1.0/24", "10.0.2.0/24", "10.0.3.0/24"]);
    }

    #[test]
    fn test_private_subnets_never_map_public_ips() {
        let (stack, network) = build(&NetworkConfig::default());
        for subnet in &network.private_subnets {
            let resource = stack.resource(&subnet.id).unwrap();
            assert_eq!(resource.property("MapPublicIpOnLaunch"), Some(&json!(false)));
        }
        for subnet in &network.public_subnets {
            let resource = stack.resource(&subnet.id).unwrap();
            assert_eq!(resource.property("MapPublicIpOnLaunch"), Some(&json!(true)));
        }
    }

    #[test]
    fn test_single_nat_gateway_shared_by_private_subnets() {
        let (stack, network) = build(&NetworkConfig::default());
        assert_eq!(network.nat_gateways.len(), 1);

        let nat_ref = network.nat_gateways[0].reference().to_value();
        for subnet in &network.private_subnets {
            let route = stack.resource(&subnet.default_route).unwrap();
            assert_eq!(route.property("NatGatewayId"), Some(&nat_ref));
        }
    }

    #[test]
    fn test_nat_gateway_per_zone() {
        let config = NetworkConfig {
            nat_gateways: 2,
            ..NetworkConfig::default()
        };
        let (stack, network) = build(&config);
        assert_eq!(network.nat_gateways.len(), 2);

        let second = stack.resource(&network.private_subnets[1].default_route).unwrap();
        assert_eq!(
            second.property("NatGatewayId"),
            Some(&network.nat_gateways[1].reference().to_value())
        );
    }

    #[test]
    fn test_network_too_small_for_subnets() {
        let config = NetworkConfig {
            cidr: "10.0.0.0/23".to_string(),
            ..NetworkConfig::default()
        };
        let mut stack = Stack::new("test");
        assert!(matches!(
            create_network(&mut stack, "Vpc", &config),
            Err(StackError::CidrExhausted { .. })
        ));
    }
}

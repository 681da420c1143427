//! Public load balancer in front of the container service.

use serde_json::json;
use tracing::info;

use crate::config::LoadBalancerConfig;
use crate::constructs::network::NetworkHandle;
use crate::constructs::orchestration::ServiceHandle;
use crate::constructs::security_group::{
    allow_from_anywhere, allow_from_group, allow_to_group, create_security_group, Egress, SecurityGroupHandle,
};
use crate::error::StackResult;
use crate::resource::{LogicalId, Resource};
use crate::stack::Stack;
use crate::token::Token;

/// Seconds the service ignores failing health checks after a task starts.
const HEALTH_CHECK_GRACE_PERIOD_SECS: u32 = 60;

#[derive(Debug, Clone)]
pub struct LoadBalancerHandle {
    pub load_balancer: LogicalId,
    pub security_group: SecurityGroupHandle,
    pub target_group: LogicalId,
    pub listener: LogicalId,
}

impl LoadBalancerHandle {
    pub fn dns_name(&self) -> Token {
        self.load_balancer.att("DNSName")
    }

    /// `http://<dns name>`
    pub fn url(&self) -> Token {
        Token::concat(vec![Token::lit("http://"), self.dns_name()])
    }
}

/// Declare an internet-facing load balancer with one HTTP listener that
/// forwards to `service`, and register the service with its target group.
pub fn create_load_balancer(
    stack: &mut Stack,
    network: &NetworkHandle,
    service: &ServiceHandle,
    config: &LoadBalancerConfig,
) -> StackResult<LoadBalancerHandle> {
    let security_group = create_security_group(
        stack,
        "AppALBSecurityGroup",
        network,
        "Automatically created Security Group for ELB",
        Egress::Restricted,
    )?;
    allow_from_anywhere(
        stack,
        &security_group,
        config.listener_port,
        &format!("Allow from anyone on port {}", config.listener_port),
    )?;

    let mut alb = Resource::new("AWS::ElasticLoadBalancingV2::LoadBalancer")
        .prop(
            "LoadBalancerAttributes",
            json!([{ "Key": "deletion_protection.enabled", "Value": "false" }]),
        )
        .prop("Scheme", "internet-facing")
        .prop("SecurityGroups", vec![security_group.group_id().to_value()])
        .prop("Subnets", network.public_subnet_ids())
        .prop("Type", "application");
    // The public subnets must be routable before the load balancer is.
    for subnet in &network.public_subnets {
        alb = alb.depends_on(&subnet.default_route);
    }
    let load_balancer = stack.add("AppALB", alb)?;

    let target_group = stack.add(
        "AppALBHttpListenerEcsTargetsGroup",
        Resource::new("AWS::ElasticLoadBalancingV2::TargetGroup")
            .prop("HealthCheckIntervalSeconds", config.health_check_interval_secs)
            .prop("HealthCheckPath", config.health_check_path.as_str())
            .prop("Port", config.listener_port)
            .prop("Protocol", "HTTP")
            .prop(
                "TargetGroupAttributes",
                json!([{ "Key": "stickiness.enabled", "Value": "false" }]),
            )
            .prop("TargetType", "ip")
            .prop("VpcId", network.vpc_id()),
    )?;

    let listener = stack.add(
        "AppALBHttpListener",
        Resource::new("AWS::ElasticLoadBalancingV2::Listener")
            .prop(
                "DefaultActions",
                json!([{ "TargetGroupArn": target_group.reference(), "Type": "forward" }]),
            )
            .prop("LoadBalancerArn", load_balancer.reference())
            .prop("Port", config.listener_port)
            .prop("Protocol", "HTTP"),
    )?;

    allow_to_group(
        stack,
        &security_group,
        &service.security_group,
        service.container_port,
        "Load balancer to target",
    )?;
    allow_from_group(
        stack,
        &service.security_group,
        &security_group,
        service.container_port,
        "Load balancer to target",
    )?;

    let registration = json!([{
        "ContainerName": service.container_name,
        "ContainerPort": service.container_port,
        "TargetGroupArn": target_group.reference()
    }]);
    stack.update_resource(&service.service, |resource| {
        resource
            .properties
            .insert("HealthCheckGracePeriodSeconds".to_string(), json!(HEALTH_CHECK_GRACE_PERIOD_SECS));
        resource.properties.insert("LoadBalancers".to_string(), registration);
        if !resource.depends_on.contains(&listener) {
            resource.depends_on.push(listener.clone());
        }
        if !resource.depends_on.contains(&target_group) {
            resource.depends_on.push(target_group.clone());
        }
    })?;

    info!(
        "Load balancer declared (port {}, health check {} every {}s)",
        config.listener_port, config.health_check_path, config.health_check_interval_secs
    );

    Ok(LoadBalancerHandle {
        load_balancer,
        security_group,
        target_group,
        listener,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseConfig, NetworkConfig, ServiceConfig};
    use crate::constructs::database::create_database;
    use crate::constructs::network::create_network;
    use crate::constructs::orchestration::create_service;
    use crate::constructs::registry::create_repository;

    fn build() -> (Stack, ServiceHandle, LoadBalancerHandle) {
        let mut stack = Stack::new("test");
        let network = create_network(&mut stack, "Vpc", &NetworkConfig::default()).unwrap();
        let mut db = create_database(&mut stack, &network, &DatabaseConfig::default(), &[]).unwrap();
        let repo = create_repository(&mut stack, "AppRepository").unwrap();
        let service = create_service(&mut stack, &network, &mut db, &repo, &ServiceConfig::default()).unwrap();
        let lb = create_load_balancer(&mut stack, &network, &service, &LoadBalancerConfig::default()).unwrap();
        (stack, service, lb)
    }

    #[test]
    fn test_health_check_path_and_interval() {
        let (stack, _, lb) = build();
        let tg = stack.resource(&lb.target_group).unwrap();
        assert_eq!(tg.property("HealthCheckPath").unwrap(), "/health");
        assert_eq!(tg.property("HealthCheckIntervalSeconds").unwrap(), 30);
        assert_eq!(tg.property("TargetType").unwrap(), "ip");
    }

    #[test]
    fn test_listener_forwards_to_target_group() {
        let (stack, _, lb) = build();
        let listener = stack.resource(&lb.listener).unwrap();
        assert_eq!(listener.property("Port").unwrap(), 80);
        assert_eq!(
            listener.property("DefaultActions").unwrap()[0]["TargetGroupArn"],
            lb.target_group.reference().to_value()
        );
    }

    #[test]
    fn test_service_registered_with_target_group() {
        let (stack, service, lb) = build();
        let resource = stack.resource(&service.service).unwrap();
        let registration = &resource.property("LoadBalancers").unwrap()[0];
        assert_eq!(registration["ContainerPort"], 8000);
        assert_eq!(registration["ContainerName"], "FastAPIContainer");
        assert!(resource.depends_on.contains(&lb.listener));
    }

    #[test]
    fn test_internet_facing_in_public_subnets() {
        let (stack, _, lb) = build();
        let alb = stack.resource(&lb.load_balancer).unwrap();
        assert_eq!(alb.property("Scheme").unwrap(), "internet-facing");
        assert_eq!(alb.property("Subnets").unwrap().as_array().unwrap().len(), 2);
    }
}

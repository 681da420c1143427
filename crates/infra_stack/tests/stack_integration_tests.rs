//! Integration tests for the assembled stack.

use infra_stack::{
    assemble, DependencyGraph, StackConfig, StructuralChecks, Template, TemplateFormat, TemplateInspector,
};
use serde_json::json;
use tempfile::tempdir;

fn inspector() -> TemplateInspector {
    let assembly = assemble(&StackConfig::default()).unwrap();
    TemplateInspector::from_stack(&assembly.stack).unwrap()
}

#[test]
fn test_network_shape() {
    let t = inspector();
    assert!(t.resource_count_is("AWS::EC2::VPC", 1));
    assert!(t.resource_count_is("AWS::EC2::Subnet", 4));
    assert!(t.resource_count_is("AWS::EC2::NatGateway", 1));
    assert!(t.resource_count_is("AWS::EC2::InternetGateway", 1));
    assert!(t.has_resource_properties("AWS::EC2::VPC", &json!({ "CidrBlock": "10.0.0.0/16" })));

    let cidrs: Vec<&str> = t
        .find_resources("AWS::EC2::Subnet")
        .into_iter()
        .map(|(_, body)| body["Properties"]["CidrBlock"].as_str().unwrap())
        .collect();
    assert_eq!(cidrs, vec!["10.0.0.0/24", "10.0.1.0/24", "10.0.2.0/24", "10.0.3.0/24"]);
}

#[test]
fn test_private_subnets_route_through_single_nat() {
    let t = inspector();
    let nat_routes: Vec<_> = t
        .find_resources("AWS::EC2::Route")
        .into_iter()
        .filter_map(|(_, body)| body["Properties"].get("NatGatewayId").cloned())
        .collect();
    assert_eq!(nat_routes.len(), 2);
    assert_eq!(nat_routes[0], nat_routes[1]);
}

#[test]
fn test_bucket_is_private_and_removed() {
    let t = inspector();
    assert!(t.has_resource_properties(
        "AWS::S3::Bucket",
        &json!({
            "BucketName": "puppet-bucket",
            "VersioningConfiguration": { "Status": "Enabled" },
            "PublicAccessBlockConfiguration": { "BlockPublicAcls": true, "RestrictPublicBuckets": true }
        })
    ));
    assert!(t.resource_count_is("Custom::S3AutoDeleteObjects", 1));
}

#[test]
fn test_vpn_endpoint() {
    let t = inspector();
    assert!(t.has_resource_properties(
        "AWS::EC2::ClientVpnEndpoint",
        &json!({
            "ClientCidrBlock": "10.100.0.0/22",
            "SplitTunnel": true,
            "TransportProtocol": "udp",
            "ConnectionLogOptions": { "Enabled": false }
        })
    ));
    assert!(t.resource_count_is("AWS::CertificateManager::Certificate", 2));
    assert!(t.resource_count_is("AWS::EC2::ClientVpnTargetNetworkAssociation", 1));
}

#[test]
fn test_database_cluster() {
    let t = inspector();
    assert!(t.has_resource_properties(
        "AWS::RDS::DBCluster",
        &json!({
            "Engine": "aurora-postgresql",
            "EngineVersion": "14.6",
            "DatabaseName": "appdb",
            "ServerlessV2ScalingConfiguration": { "MinCapacity": 0.5, "MaxCapacity": 1.0 }
        })
    ));
    assert!(t.resource_count_is("AWS::RDS::DBInstance", 2));
    assert!(t.has_resource_properties(
        "AWS::EC2::SecurityGroupIngress",
        &json!({ "Description": "Allow Bastion access to PostgreSQL", "FromPort": 5432 })
    ));
    assert!(t.has_resource_properties(
        "AWS::EC2::SecurityGroupIngress",
        &json!({ "Description": "Allow ECS to access DB", "FromPort": 5432 })
    ));
}

#[test]
fn test_service_and_load_balancer() {
    let t = inspector();
    assert!(t.has_resource_properties(
        "AWS::ECS::TaskDefinition",
        &json!({ "Cpu": "256", "Memory": "512", "RequiresCompatibilities": ["FARGATE"] })
    ));
    assert!(t.has_resource_properties(
        "AWS::ECS::Service",
        &json!({
            "LaunchType": "FARGATE",
            "DesiredCount": 1,
            "NetworkConfiguration": { "AwsvpcConfiguration": { "AssignPublicIp": "DISABLED" } }
        })
    ));
    assert!(t.has_resource_properties(
        "AWS::ElasticLoadBalancingV2::TargetGroup",
        &json!({ "HealthCheckPath": "/health", "HealthCheckIntervalSeconds": 30, "Port": 80 })
    ));
    assert!(t.has_resource_properties(
        "AWS::EC2::SecurityGroupIngress",
        &json!({ "CidrIp": "0.0.0.0/0", "FromPort": 80, "Description": "Allow from anyone on port 80" })
    ));
}

#[test]
fn test_outputs_published() {
    let t = inspector();
    for name in [
        "ApplicationURL",
        "BastionInstanceID",
        "DatabaseClusterEndpoint",
        "DatabaseName",
        "DatabaseSecretArn",
        "PuppetBucketName",
        "VpnEndpointId",
    ] {
        assert!(t.has_output(name), "missing output {}", name);
    }
    assert_eq!(t.output_value("DatabaseName").unwrap(), "appdb");
    assert_eq!(
        t.output_value("ApplicationURL").unwrap(),
        &json!({ "Fn::Join": ["", ["http://", { "Fn::GetAtt": ["AppALB", "DNSName"] }]] })
    );
}

#[test]
fn test_structural_checks_pass() {
    let t = inspector();
    let report = StructuralChecks::new().run(t.template());
    assert!(report.passed, "{:?}", report.failures().collect::<Vec<_>>());
}

#[test]
fn test_written_template_round_trips() {
    let dir = tempdir().unwrap();
    let assembly = assemble(&StackConfig::default()).unwrap();
    let template = assembly.stack.synth().unwrap();

    for format in [TemplateFormat::Json, TemplateFormat::Yaml] {
        let path = template.write_to(dir.path(), assembly.stack.name(), format).unwrap();
        let loaded = Template::from_file(&path).unwrap();
        assert_eq!(loaded.resources.len(), template.resources.len());
        assert_eq!(loaded.outputs.len(), 7);
    }
}

#[test]
fn test_creation_waves_cover_every_resource() {
    let template = infra_stack::synth(&StackConfig::default()).unwrap();
    let waves = DependencyGraph::from_template(&template)
        .unwrap()
        .creation_waves()
        .unwrap();
    let total: usize = waves.iter().map(Vec::len).sum();
    assert_eq!(total, template.resources.len());
    assert!(waves[0].contains(&"VPCDevOpsTest".to_string()));
}

#[test]
fn test_config_file_overrides() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stack.yaml");
    std::fs::write(
        &path,
        "stack_name: staging-stack\nservice:\n  desired_count: 3\ndatabase:\n  readers: 2\n",
    )
    .unwrap();

    let config = StackConfig::from_file(&path).unwrap();
    let assembly = assemble(&config).unwrap();
    let t = TemplateInspector::from_stack(&assembly.stack).unwrap();
    assert_eq!(assembly.stack.name(), "staging-stack");
    assert!(t.has_resource_properties("AWS::ECS::Service", &json!({ "DesiredCount": 3 })));
    assert!(t.resource_count_is("AWS::RDS::DBInstance", 3));
}

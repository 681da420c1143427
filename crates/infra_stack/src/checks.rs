//! Structural checks over a synthesized template.
//!
//! These run without touching the cloud and report every check rather than
//! stopping at the first failure.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::assertions::TemplateInspector;
use crate::graph::DependencyGraph;
use crate::template::Template;
use crate::token::references;

/// Outcome of a set of checks.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub checks: Vec<ValidationCheck>,
    pub passed: bool,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            checks: Vec::new(),
            passed: true,
        }
    }

    pub fn add_check(&mut self, name: &str, passed: bool, message: &str) {
        if !passed {
            warn!("Check {} failed: {}", name, message);
            self.passed = false;
        } else {
            debug!("Check {} passed", name);
        }
        self.checks.push(ValidationCheck {
            name: name.to_string(),
            passed,
            message: message.to_string(),
        });
    }

    pub fn failures(&self) -> impl Iterator<Item = &ValidationCheck> {
        self.checks.iter().filter(|c| !c.passed)
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationCheck {
    pub name: String,
    pub passed: bool,
    pub message: String,
}

/// Expected shape of the stack.
#[derive(Debug, Clone)]
pub struct StructuralChecks {
    availability_zones: usize,
    nat_gateways: usize,
    /// Security groups allowed to reach the database. Empty means "any
    /// group, but never an address range".
    database_peers: Vec<String>,
}

impl Default for StructuralChecks {
    fn default() -> Self {
        Self {
            availability_zones: 2,
            nat_gateways: 1,
            database_peers: Vec::new(),
        }
    }
}

impl StructuralChecks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_availability_zones(mut self, count: usize) -> Self {
        self.availability_zones = count;
        self
    }

    pub fn with_nat_gateways(mut self, count: usize) -> Self {
        self.nat_gateways = count;
        self
    }

    pub fn with_database_peers(mut self, peers: Vec<String>) -> Self {
        self.database_peers = peers;
        self
    }

    pub fn run(&self, template: &Template) -> ValidationReport {
        let inspector = TemplateInspector::new(template.clone());
        let mut report = ValidationReport::new();

        self.check_zones(&inspector, &mut report);
        check_private_subnets(&inspector, &mut report);
        self.check_database_ingress(&inspector, &mut report);
        check_service_private(&inspector, &mut report);
        check_removal_policies(&inspector, &mut report);

        let nat = inspector.resource_count("AWS::EC2::NatGateway");
        report.add_check(
            "nat_gateways",
            nat == self.nat_gateways,
            &format!("{} NAT gateway(s), expected {}", nat, self.nat_gateways),
        );

        match DependencyGraph::from_template(template).and_then(|g| g.creation_waves()) {
            Ok(waves) => report.add_check(
                "dependency_graph",
                true,
                &format!("{} resources in {} creation waves", template.resources.len(), waves.len()),
            ),
            Err(e) => report.add_check("dependency_graph", false, &e.to_string()),
        }

        report
    }

    /// Every zone has exactly one public and one private subnet.
    fn check_zones(&self, inspector: &TemplateInspector, report: &mut ValidationReport) {
        let mut zones: BTreeMap<String, (usize, usize)> = BTreeMap::new();
        for (_, body) in inspector.find_resources("AWS::EC2::Subnet") {
            let az = properties(body)
                .and_then(|p| p.get("AvailabilityZone"))
                .map(Value::to_string)
                .unwrap_or_default();
            let entry = zones.entry(az).or_default();
            if is_public(body) {
                entry.0 += 1;
            } else {
                entry.1 += 1;
            }
        }

        let balanced = zones.values().all(|&(public, private)| public == 1 && private == 1);
        report.add_check(
            "availability_zones",
            zones.len() == self.availability_zones && balanced,
            &format!(
                "{} zone(s) with one public and one private subnet each: {}, expected {}",
                zones.len(),
                balanced,
                self.availability_zones
            ),
        );
    }

    /// Database groups only admit traffic from other groups, and only from
    /// the configured ones when a list is given.
    fn check_database_ingress(&self, inspector: &TemplateInspector, report: &mut ValidationReport) {
        let mut db_groups = BTreeSet::new();
        for (_, body) in inspector.find_resources("AWS::RDS::DBCluster") {
            if let Some(ids) = properties(body).and_then(|p| p.get("VpcSecurityGroupIds")) {
                db_groups.extend(references(ids));
            }
        }
        if db_groups.is_empty() {
            report.add_check("database_ingress", false, "no database security group found");
            return;
        }

        let mut problems = Vec::new();
        let mut sources = BTreeSet::new();
        for (id, body) in inspector.find_resources("AWS::EC2::SecurityGroupIngress") {
            let Some(props) = properties(body) else { continue };
            let target = props.get("GroupId").map(references).unwrap_or_default();
            if !target.iter().any(|t| db_groups.contains(t)) {
                continue;
            }
            match props.get("SourceSecurityGroupId").map(references) {
                Some(peers) if !peers.is_empty() => {
                    for peer in peers {
                        if !self.database_peers.is_empty() && !self.database_peers.contains(&peer) {
                            problems.push(format!("{} admits unexpected group {}", id, peer));
                        }
                        sources.insert(peer);
                    }
                }
                _ => problems.push(format!("{} admits traffic from outside a security group", id)),
            }
        }
        for (id, body) in inspector.find_resources("AWS::EC2::SecurityGroup") {
            let inline = properties(body)
                .and_then(|p| p.get("SecurityGroupIngress"))
                .and_then(Value::as_array)
                .map_or(false, |rules| !rules.is_empty());
            if inline && db_groups.contains(id) {
                problems.push(format!("{} declares inline ingress", id));
            }
        }

        if problems.is_empty() {
            let sources: Vec<String> = sources.into_iter().collect();
            report.add_check(
                "database_ingress",
                true,
                &format!("database reachable only from {}", sources.join(", ")),
            );
        } else {
            report.add_check("database_ingress", false, &problems.join("; "));
        }
    }
}

fn properties(body: &Value) -> Option<&Value> {
    body.get("Properties")
}

fn is_public(subnet: &Value) -> bool {
    properties(subnet)
        .and_then(|p| p.get("MapPublicIpOnLaunch"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Subnets routed through a NAT gateway never map public addresses.
fn check_private_subnets(inspector: &TemplateInspector, report: &mut ValidationReport) {
    let nat_tables: BTreeSet<String> = inspector
        .find_resources("AWS::EC2::Route")
        .into_iter()
        .filter_map(|(_, body)| properties(body))
        .filter(|p| p.get("NatGatewayId").is_some())
        .flat_map(|p| p.get("RouteTableId").map(references).unwrap_or_default())
        .collect();

    let private_subnets: BTreeSet<String> = inspector
        .find_resources("AWS::EC2::SubnetRouteTableAssociation")
        .into_iter()
        .filter_map(|(_, body)| properties(body))
        .filter(|p| {
            p.get("RouteTableId")
                .map(references)
                .unwrap_or_default()
                .iter()
                .any(|t| nat_tables.contains(t))
        })
        .flat_map(|p| p.get("SubnetId").map(references).unwrap_or_default())
        .collect();

    let exposed: Vec<&str> = inspector
        .find_resources("AWS::EC2::Subnet")
        .into_iter()
        .filter(|(id, body)| private_subnets.contains(*id) && is_public(body))
        .map(|(id, _)| id)
        .collect();

    report.add_check(
        "private_subnets",
        !private_subnets.is_empty() && exposed.is_empty(),
        &if exposed.is_empty() {
            format!("{} private subnet(s), none map public addresses", private_subnets.len())
        } else {
            format!("private subnets map public addresses: {}", exposed.join(", "))
        },
    );
}

fn check_service_private(inspector: &TemplateInspector, report: &mut ValidationReport) {
    let services = inspector.find_resources("AWS::ECS::Service");
    let public: Vec<&str> = services
        .iter()
        .filter(|(_, body)| {
            properties(body)
                .and_then(|p| p.pointer("/NetworkConfiguration/AwsvpcConfiguration/AssignPublicIp"))
                .and_then(Value::as_str)
                != Some("DISABLED")
        })
        .map(|(id, _)| *id)
        .collect();

    report.add_check(
        "service_private",
        !services.is_empty() && public.is_empty(),
        &if public.is_empty() {
            format!("{} service(s) without public addresses", services.len())
        } else {
            format!("services may assign public addresses: {}", public.join(", "))
        },
    );
}

/// Stateful resources are removed with the stack and leave nothing behind:
/// buckets are emptied by an auto-delete resource and repositories are
/// emptied on delete.
fn check_removal_policies(inspector: &TemplateInspector, report: &mut ValidationReport) {
    let mut retained = Vec::new();
    for type_name in ["AWS::S3::Bucket", "AWS::RDS::DBCluster", "AWS::ECR::Repository"] {
        for (id, body) in inspector.find_resources(type_name) {
            if body.get("DeletionPolicy").and_then(Value::as_str) != Some("Delete") {
                retained.push(id.to_string());
            }
        }
    }

    let emptied: BTreeSet<String> = inspector
        .find_resources("Custom::S3AutoDeleteObjects")
        .into_iter()
        .filter_map(|(_, body)| properties(body))
        .flat_map(|p| p.get("BucketName").map(references).unwrap_or_default())
        .collect();
    let mut not_emptied: Vec<String> = inspector
        .find_resources("AWS::S3::Bucket")
        .into_iter()
        .filter(|(id, _)| !emptied.contains(*id))
        .map(|(id, _)| id.to_string())
        .collect();
    not_emptied.extend(
        inspector
            .find_resources("AWS::ECR::Repository")
            .into_iter()
            .filter(|(_, body)| {
                properties(body)
                    .and_then(|p| p.get("EmptyOnDelete"))
                    .and_then(Value::as_bool)
                    != Some(true)
            })
            .map(|(id, _)| id.to_string()),
    );

    let mut problems = Vec::new();
    if !retained.is_empty() {
        problems.push(format!("not deleted with the stack: {}", retained.join(", ")));
    }
    if !not_emptied.is_empty() {
        problems.push(format!("not emptied before deletion: {}", not_emptied.join(", ")));
    }

    report.add_check(
        "removal_policy",
        problems.is_empty(),
        &if problems.is_empty() {
            "bucket, database and registry are emptied and deleted with the stack".to_string()
        } else {
            problems.join("; ")
        },
    );
}

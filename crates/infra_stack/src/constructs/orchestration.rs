//! Container cluster, task definition and the long-running service.

use serde_json::json;
use tracing::info;

use crate::config::ServiceConfig;
use crate::constructs::database::DatabaseHandle;
use crate::constructs::iam::{self, RoleHandle};
use crate::constructs::network::NetworkHandle;
use crate::constructs::registry::RepositoryHandle;
use crate::constructs::security_group::{create_security_group, Egress, SecurityGroupHandle};
use crate::error::StackResult;
use crate::resource::{LogicalId, RemovalPolicy, Resource};
use crate::stack::Stack;
use crate::token::{Pseudo, Token};

#[derive(Debug, Clone)]
pub struct ServiceHandle {
    pub cluster: LogicalId,
    pub security_group: SecurityGroupHandle,
    pub task_role: RoleHandle,
    pub execution_role: RoleHandle,
    pub log_group: LogicalId,
    pub task_definition: LogicalId,
    pub service: LogicalId,
    pub container_name: String,
    pub container_port: u16,
}

impl ServiceHandle {
    pub fn service_name(&self) -> Token {
        self.service.att("Name")
    }
}

/// Declare the cluster and a service that keeps `desired_count` copies of
/// the application container running in the private subnets without public
/// addresses. The service group is granted database access.
pub fn create_service(
    stack: &mut Stack,
    network: &NetworkHandle,
    database: &mut DatabaseHandle,
    repository: &RepositoryHandle,
    config: &ServiceConfig,
) -> StackResult<ServiceHandle> {
    let cluster = stack.add("AppCluster", Resource::new("AWS::ECS::Cluster"))?;

    let security_group = create_security_group(stack, "EcsSG", network, "SG for ECS", Egress::AllowAll)?;
    database.allow_from(stack, &security_group, "Allow ECS to access DB")?;

    let task_role = iam::create_role(
        stack,
        "EcsTaskRole",
        "ecs-tasks.amazonaws.com",
        &[
            "service-role/AmazonECSTaskExecutionRolePolicy",
            "SecretsManagerReadWrite",
        ],
    )?;

    let log_group = stack.add(
        "AppTaskDefLogGroup",
        Resource::new("AWS::Logs::LogGroup").removal_policy(RemovalPolicy::Destroy),
    )?;

    let execution_role = iam::create_role(stack, "AppTaskDefExecutionRole", "ecs-tasks.amazonaws.com", &[])?;
    let execution_policy = iam::attach_policy(
        stack,
        "AppTaskDefExecutionRoleDefaultPolicy",
        &execution_role,
        vec![
            iam::allow(
                &["ecr:BatchCheckLayerAvailability", "ecr:BatchGetImage", "ecr:GetDownloadUrlForLayer"],
                vec![repository.arn().to_value()],
            ),
            iam::allow(&["ecr:GetAuthorizationToken"], vec![json!("*")]),
            iam::allow(
                &["logs:CreateLogStream", "logs:PutLogEvents"],
                vec![log_group.att("Arn").to_value()],
            ),
            iam::allow(
                &["secretsmanager:DescribeSecret", "secretsmanager:GetSecretValue"],
                vec![database.secret_arn().to_value()],
            ),
        ],
    )?;

    let container = json!({
        "Environment": [
            { "Name": "DB_HOST", "Value": database.endpoint_hostname() },
            { "Name": "DB_NAME", "Value": database.database_name }
        ],
        "Essential": true,
        "Image": repository.image(&config.image_tag),
        "LogConfiguration": {
            "LogDriver": "awslogs",
            "Options": {
                "awslogs-group": log_group.reference(),
                "awslogs-region": Token::Pseudo(Pseudo::Region),
                "awslogs-stream-prefix": config.log_stream_prefix
            }
        },
        "Name": config.container_name,
        "PortMappings": [{
            "ContainerPort": config.container_port,
            "HostPort": config.container_port,
            "Protocol": "tcp"
        }],
        "Secrets": [
            { "Name": "DB_PASSWORD", "ValueFrom": database.secret_field("password") },
            { "Name": "DB_USER", "ValueFrom": database.secret_field("username") }
        ]
    });

    let family = format!("{}AppTaskDef", stack.name().replace('-', ""));
    let task_definition = stack.add(
        "AppTaskDef",
        Resource::new("AWS::ECS::TaskDefinition")
            .prop("ContainerDefinitions", vec![container])
            .prop("Cpu", config.cpu.to_string())
            .prop("ExecutionRoleArn", execution_role.arn())
            .prop("Family", family)
            .prop("Memory", config.memory_mib.to_string())
            .prop("NetworkMode", "awsvpc")
            .prop("RequiresCompatibilities", vec!["FARGATE"])
            .prop("TaskRoleArn", task_role.arn())
            .depends_on(&execution_policy),
    )?;

    let service = stack.add(
        "AppService",
        Resource::new("AWS::ECS::Service")
            .prop("Cluster", cluster.reference())
            .prop(
                "DeploymentConfiguration",
                json!({ "MaximumPercent": 200, "MinimumHealthyPercent": 50 }),
            )
            .prop("DesiredCount", config.desired_count)
            .prop("EnableECSManagedTags", false)
            .prop("LaunchType", "FARGATE")
            .prop(
                "NetworkConfiguration",
                json!({
                    "AwsvpcConfiguration": {
                        "AssignPublicIp": "DISABLED",
                        "SecurityGroups": [security_group.group_id()],
                        "Subnets": network.private_subnet_ids()
                    }
                }),
            )
            .prop("TaskDefinition", task_definition.reference()),
    )?;

    info!(
        "Container service declared ({} CPU units, {} MiB, {} replica(s))",
        config.cpu, config.memory_mib, config.desired_count
    );

    Ok(ServiceHandle {
        cluster,
        security_group,
        task_role,
        execution_role,
        log_group,
        task_definition,
        service,
        container_name: config.container_name.clone(),
        container_port: config.container_port,
    })
}

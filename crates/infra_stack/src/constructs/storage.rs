//! Private object storage for the configuration payload.

use serde_json::json;
use tracing::info;

use crate::config::StorageConfig;
use crate::constructs::iam::{self, RoleHandle};
use crate::error::StackResult;
use crate::resource::{tags, LogicalId, RemovalPolicy, Resource};
use crate::stack::Stack;
use crate::token::Token;

/// Empties every object version before the bucket itself is deleted.
const AUTO_DELETE_HANDLER: &str = r#"import boto3
import cfnresponse


def handler(event, context):
    try:
        if event["RequestType"] == "Delete":
            name = event["ResourceProperties"]["BucketName"]
            boto3.resource("s3").Bucket(name).object_versions.delete()
        cfnresponse.send(event, context, cfnresponse.SUCCESS, {})
    except Exception as exc:
        cfnresponse.send(event, context, cfnresponse.FAILED, {"Error": str(exc)})
"#;

#[derive(Debug, Clone)]
pub struct BucketHandle {
    pub id: LogicalId,
    pub policy: LogicalId,
    pub auto_delete: LogicalId,
    pub payload_prefix: String,
}

impl BucketHandle {
    pub fn bucket_name(&self) -> Token {
        self.id.reference()
    }

    pub fn arn(&self) -> Token {
        self.id.att("Arn")
    }

    /// ARN matching every object in the bucket.
    pub fn objects_arn(&self) -> Token {
        Token::concat(vec![self.arn(), Token::lit("/*")])
    }

    /// Let `role` list the bucket and read its objects.
    pub fn grant_read(&self, stack: &mut Stack, policy_id: &str, role: &RoleHandle) -> StackResult<LogicalId> {
        iam::attach_policy(
            stack,
            policy_id,
            role,
            vec![iam::allow(
                &["s3:GetObject*", "s3:GetBucket*", "s3:List*"],
                vec![self.arn().to_value(), self.objects_arn().to_value()],
            )],
        )
    }
}

/// Declare a versioned, encrypted bucket with all public access blocked.
/// The bucket and its contents are removed with the stack.
pub fn create_config_bucket(stack: &mut Stack, name: &str, config: &StorageConfig) -> StackResult<BucketHandle> {
    let bucket = stack.add(
        name,
        Resource::new("AWS::S3::Bucket")
            .prop("BucketName", config.bucket_name.as_str())
            .prop(
                "BucketEncryption",
                json!({
                    "ServerSideEncryptionConfiguration": [{
                        "ServerSideEncryptionByDefault": { "SSEAlgorithm": "AES256" }
                    }]
                }),
            )
            .prop(
                "PublicAccessBlockConfiguration",
                json!({
                    "BlockPublicAcls": true,
                    "BlockPublicPolicy": true,
                    "IgnorePublicAcls": true,
                    "RestrictPublicBuckets": true
                }),
            )
            .prop("VersioningConfiguration", json!({ "Status": "Enabled" }))
            .prop("Tags", tags(&[("auto-delete-objects", json!("true"))]))
            .removal_policy(RemovalPolicy::Destroy),
    )?;

    let bucket_arn = bucket.att("Arn");
    let objects_arn = Token::concat(vec![bucket_arn.clone(), Token::lit("/*")]);

    let provider_role = iam::create_role(
        stack,
        &format!("{}AutoDeleteRole", name),
        "lambda.amazonaws.com",
        &["service-role/AWSLambdaBasicExecutionRole"],
    )?;
    let provider = stack.add(
        &format!("{}AutoDeleteHandler", name),
        Resource::new("AWS::Lambda::Function")
            .prop("Code", json!({ "ZipFile": AUTO_DELETE_HANDLER }))
            .prop("Description", format!("Empties {} before it is deleted", config.bucket_name))
            .prop("Handler", "index.handler")
            .prop("MemorySize", 128)
            .prop("Role", provider_role.arn())
            .prop("Runtime", "python3.12")
            .prop("Timeout", 900),
    )?;

    let policy = stack.add(
        &format!("{}Policy", name),
        Resource::new("AWS::S3::BucketPolicy")
            .prop("Bucket", bucket.reference())
            .prop(
                "PolicyDocument",
                iam::policy_document(vec![
                    json!({
                        "Action": "s3:*",
                        "Condition": { "Bool": { "aws:SecureTransport": "false" } },
                        "Effect": "Deny",
                        "Principal": { "AWS": "*" },
                        "Resource": [bucket_arn.to_value(), objects_arn.to_value()]
                    }),
                    json!({
                        "Action": ["s3:DeleteObject*", "s3:GetBucket*", "s3:List*", "s3:PutBucketPolicy"],
                        "Effect": "Allow",
                        "Principal": { "AWS": provider_role.arn().to_value() },
                        "Resource": [bucket_arn.to_value(), objects_arn.to_value()]
                    }),
                ]),
            ),
    )?;

    let auto_delete = stack.add(
        &format!("{}AutoDeleteObjects", name),
        Resource::new("Custom::S3AutoDeleteObjects")
            .prop("ServiceToken", provider.att("Arn"))
            .prop("BucketName", bucket.reference())
            .depends_on(&policy)
            .removal_policy(RemovalPolicy::Destroy),
    )?;

    info!("Configuration bucket {} declared", config.bucket_name);

    Ok(BucketHandle {
        id: bucket,
        policy,
        auto_delete,
        payload_prefix: config.payload_prefix.clone(),
    })
}

//! IAM roles and inline policies.

use serde_json::{json, Value};

use crate::error::StackResult;
use crate::resource::{LogicalId, Resource};
use crate::stack::Stack;
use crate::token::Token;

/// Handle to a role declared in the stack.
#[derive(Debug, Clone)]
pub struct RoleHandle {
    pub id: LogicalId,
}

impl RoleHandle {
    pub fn arn(&self) -> Token {
        self.id.att("Arn")
    }

    pub fn name(&self) -> Token {
        self.id.reference()
    }
}

/// Declare a role assumable by an AWS service, with AWS managed policies
/// attached by name (e.g. `AmazonSSMManagedInstanceCore`).
pub fn create_role(
    stack: &mut Stack,
    id: &str,
    service_principal: &str,
    managed_policies: &[&str],
) -> StackResult<RoleHandle> {
    let policies: Vec<Value> = managed_policies
        .iter()
        .map(|name| Token::managed_policy(name).to_value())
        .collect();

    let resource = Resource::new("AWS::IAM::Role")
        .prop(
            "AssumeRolePolicyDocument",
            policy_document(vec![json!({
                "Action": "sts:AssumeRole",
                "Effect": "Allow",
                "Principal": { "Service": service_principal }
            })]),
        )
        .prop_opt("ManagedPolicyArns", (!policies.is_empty()).then_some(policies));

    let id = stack.add(id, resource)?;
    Ok(RoleHandle { id })
}

/// Attach an inline policy to a role.
pub fn attach_policy(
    stack: &mut Stack,
    id: &str,
    role: &RoleHandle,
    statements: Vec<Value>,
) -> StackResult<LogicalId> {
    let resource = Resource::new("AWS::IAM::Policy")
        .prop("PolicyName", id)
        .prop("PolicyDocument", policy_document(statements))
        .prop("Roles", vec![role.name().to_value()]);
    stack.add(id, resource)
}

/// An `Allow` statement.
pub fn allow(actions: &[&str], resources: Vec<Value>) -> Value {
    json!({
        "Action": actions,
        "Effect": "Allow",
        "Resource": resources,
    })
}

pub fn policy_document(statements: Vec<Value>) -> Value {
    json!({
        "Version": "2012-10-17",
        "Statement": statements,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_with_managed_policy() {
        let mut stack = Stack::new("test");
        let role = create_role(&mut stack, "Role", "ec2.amazonaws.com", &["AmazonSSMManagedInstanceCore"]).unwrap();

        let resource = stack.resource(&role.id).unwrap();
        assert_eq!(
            resource.property("AssumeRolePolicyDocument").unwrap()["Statement"][0]["Principal"]["Service"],
            "ec2.amazonaws.com"
        );
        let arns = resource.property("ManagedPolicyArns").unwrap().as_array().unwrap();
        assert_eq!(arns.len(), 1);
        assert!(arns[0].to_string().contains("AmazonSSMManagedInstanceCore"));
    }

    #[test]
    fn test_role_without_managed_policies_omits_property() {
        let mut stack = Stack::new("test");
        let role = create_role(&mut stack, "Role", "lambda.amazonaws.com", &[]).unwrap();
        assert!(stack.resource(&role.id).unwrap().property("ManagedPolicyArns").is_none());
    }

    #[test]
    fn test_policy_requires_existing_role() {
        let mut stack = Stack::new("test");
        let ghost = RoleHandle { id: LogicalId::new("Ghost").unwrap() };
        assert!(attach_policy(&mut stack, "Policy", &ghost, vec![]).is_err());
    }
}

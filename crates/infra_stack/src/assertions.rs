//! Queries over a synthesized template, for tests and verification.

use serde_json::Value;

use crate::error::StackResult;
use crate::stack::Stack;
use crate::template::Template;

/// Read-only view of a synthesized template.
#[derive(Debug, Clone)]
pub struct TemplateInspector {
    template: Template,
}

impl TemplateInspector {
    pub fn new(template: Template) -> Self {
        Self { template }
    }

    pub fn from_stack(stack: &Stack) -> StackResult<Self> {
        Ok(Self::new(stack.synth()?))
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn resource_count(&self, type_name: &str) -> usize {
        self.find_resources(type_name).len()
    }

    pub fn resource_count_is(&self, type_name: &str, expected: usize) -> bool {
        self.resource_count(type_name) == expected
    }

    /// All resources of a type, as `(logical id, body)` pairs in template
    /// order.
    pub fn find_resources(&self, type_name: &str) -> Vec<(&str, &Value)> {
        self.template
            .resources
            .iter()
            .filter(|(_, body)| body.get("Type").and_then(Value::as_str) == Some(type_name))
            .map(|(id, body)| (id.as_str(), body))
            .collect()
    }

    /// Whether some resource of the type has properties matching
    /// `expected`. Objects match when every expected key matches; arrays
    /// match element by element.
    pub fn has_resource_properties(&self, type_name: &str, expected: &Value) -> bool {
        self.find_resources(type_name).into_iter().any(|(_, body)| {
            let properties = body.get("Properties").cloned().unwrap_or(Value::Null);
            matches_partial(&properties, expected)
        })
    }

    pub fn has_output(&self, name: &str) -> bool {
        self.template.outputs.contains_key(name)
    }

    pub fn output_value(&self, name: &str) -> Option<&Value> {
        self.template.outputs.get(name).map(|o| &o.value)
    }
}

pub fn matches_partial(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Object(actual), Value::Object(expected)) => expected
            .iter()
            .all(|(key, value)| actual.get(key).map_or(false, |a| matches_partial(a, value))),
        (Value::Array(actual), Value::Array(expected)) => {
            actual.len() == expected.len()
                && actual.iter().zip(expected).all(|(a, e)| matches_partial(a, e))
        }
        _ => actual == expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Resource;
    use serde_json::json;

    fn inspector() -> TemplateInspector {
        let mut stack = Stack::new("test");
        let vpc = stack
            .add(
                "Vpc",
                Resource::new("AWS::EC2::VPC")
                    .prop("CidrBlock", "10.0.0.0/16")
                    .prop("Tags", json!([{ "Key": "Name", "Value": "Vpc" }])),
            )
            .unwrap();
        stack
            .add("Subnet", Resource::new("AWS::EC2::Subnet").prop("VpcId", vpc.reference()))
            .unwrap();
        stack.add_output("VpcId", vpc.reference(), None).unwrap();
        TemplateInspector::from_stack(&stack).unwrap()
    }

    #[test]
    fn test_count_and_find() {
        let inspector = inspector();
        assert!(inspector.resource_count_is("AWS::EC2::VPC", 1));
        assert!(inspector.resource_count_is("AWS::EC2::NatGateway", 0));
        assert_eq!(inspector.find_resources("AWS::EC2::Subnet")[0].0, "Subnet");
    }

    #[test]
    fn test_partial_properties_match() {
        let inspector = inspector();
        assert!(inspector.has_resource_properties("AWS::EC2::VPC", &json!({ "CidrBlock": "10.0.0.0/16" })));
        assert!(inspector.has_resource_properties(
            "AWS::EC2::VPC",
            &json!({ "Tags": [{ "Key": "Name" }] })
        ));
        assert!(!inspector.has_resource_properties("AWS::EC2::VPC", &json!({ "CidrBlock": "10.1.0.0/16" })));
        assert!(!inspector.has_resource_properties("AWS::EC2::VPC", &json!({ "Tags": [] })));
    }

    #[test]
    fn test_outputs() {
        let inspector = inspector();
        assert!(inspector.has_output("VpcId"));
        assert!(!inspector.has_output("Missing"));
        assert_eq!(inspector.output_value("VpcId").unwrap(), &json!({ "Ref": "Vpc" }));
    }
}

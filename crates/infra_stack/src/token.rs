//! Intrinsic references between resources.
//!
//! A [`Token`] is a value that is only known once the deployment engine has
//! created the referenced resource (an ID, an ARN, an endpoint). Tokens are
//! rendered into the CloudFormation intrinsic function form when the
//! template is synthesized.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use crate::resource::LogicalId;

/// Pseudo parameters provided by the deployment engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pseudo {
    AccountId,
    Region,
    Partition,
    StackName,
    UrlSuffix,
}

impl Pseudo {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pseudo::AccountId => "AWS::AccountId",
            Pseudo::Region => "AWS::Region",
            Pseudo::Partition => "AWS::Partition",
            Pseudo::StackName => "AWS::StackName",
            Pseudo::UrlSuffix => "AWS::URLSuffix",
        }
    }
}

impl fmt::Display for Pseudo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A deploy-time value.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Literal(String),
    Ref(LogicalId),
    GetAtt(LogicalId, String),
    Pseudo(Pseudo),
    Join(String, Vec<Token>),
    Select(usize, Box<Token>),
    /// The availability zones of the deployment region.
    Azs,
    Base64(Box<Token>),
}

impl Token {
    pub fn lit(value: impl Into<String>) -> Self {
        Token::Literal(value.into())
    }

    pub fn reference(id: &LogicalId) -> Self {
        Token::Ref(id.clone())
    }

    pub fn att(id: &LogicalId, attribute: impl Into<String>) -> Self {
        Token::GetAtt(id.clone(), attribute.into())
    }

    /// Concatenate parts with no separator.
    pub fn concat(parts: Vec<Token>) -> Self {
        Token::Join(String::new(), parts)
    }

    /// The availability zone at `index` in the deployment region.
    pub fn az(index: usize) -> Self {
        Token::Select(index, Box::new(Token::Azs))
    }

    pub fn base64(inner: Token) -> Self {
        Token::Base64(Box::new(inner))
    }

    /// `arn:<partition>:<service>:<region>:<account>:<resource>` with the
    /// region and account filled in by the engine.
    pub fn arn(service: &str, resource: Token) -> Self {
        Token::concat(vec![
            Token::lit("arn:"),
            Token::Pseudo(Pseudo::Partition),
            Token::lit(format!(":{}:", service)),
            Token::Pseudo(Pseudo::Region),
            Token::lit(":"),
            Token::Pseudo(Pseudo::AccountId),
            Token::lit(":"),
            resource,
        ])
    }

    /// ARN of an AWS managed IAM policy.
    pub fn managed_policy(name: &str) -> Self {
        Token::concat(vec![
            Token::lit("arn:"),
            Token::Pseudo(Pseudo::Partition),
            Token::lit(format!(":iam::aws:policy/{}", name)),
        ])
    }

    /// Render to the intrinsic function JSON form.
    pub fn to_value(&self) -> Value {
        match self {
            Token::Literal(s) => Value::String(s.clone()),
            Token::Ref(id) => json!({ "Ref": id.as_str() }),
            Token::GetAtt(id, attr) => json!({ "Fn::GetAtt": [id.as_str(), attr] }),
            Token::Pseudo(p) => json!({ "Ref": p.as_str() }),
            Token::Join(sep, parts) => {
                let parts: Vec<Value> = parts.iter().map(Token::to_value).collect();
                json!({ "Fn::Join": [sep, parts] })
            }
            Token::Select(index, inner) => json!({ "Fn::Select": [index, inner.to_value()] }),
            Token::Azs => json!({ "Fn::GetAZs": "" }),
            Token::Base64(inner) => json!({ "Fn::Base64": inner.to_value() }),
        }
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Token::Literal(value.to_string())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Token::Literal(value)
    }
}

impl From<Token> for Value {
    fn from(token: Token) -> Self {
        token.to_value()
    }
}

impl From<&Token> for Value {
    fn from(token: &Token) -> Self {
        token.to_value()
    }
}

impl Serialize for Token {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Collect the logical ids a rendered value refers to via `Ref` or
/// `Fn::GetAtt`. Pseudo parameters are skipped.
pub fn references(value: &Value) -> Vec<String> {
    let mut found = Vec::new();
    collect_references(value, &mut found);
    found
}

fn collect_references(value: &Value, found: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(target)) = map.get("Ref") {
                    if !target.starts_with("AWS::") {
                        found.push(target.clone());
                    }
                    return;
                }
                if let Some(Value::Array(parts)) = map.get("Fn::GetAtt") {
                    if let Some(Value::String(target)) = parts.first() {
                        found.push(target.clone());
                    }
                    return;
                }
            }
            for v in map.values() {
                collect_references(v, found);
            }
        }
        Value::Array(items) => {
            for v in items {
                collect_references(v, found);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> LogicalId {
        LogicalId::new(s).unwrap()
    }

    #[test]
    fn test_ref_and_getatt_render() {
        assert_eq!(Token::reference(&id("Vpc")).to_value(), json!({ "Ref": "Vpc" }));
        assert_eq!(
            Token::att(&id("Db"), "Endpoint.Address").to_value(),
            json!({ "Fn::GetAtt": ["Db", "Endpoint.Address"] })
        );
    }

    #[test]
    fn test_az_selects_from_region() {
        assert_eq!(
            Token::az(1).to_value(),
            json!({ "Fn::Select": [1, { "Fn::GetAZs": "" }] })
        );
    }

    #[test]
    fn test_references_skip_pseudo_parameters() {
        let value = Token::concat(vec![
            Token::lit("http://"),
            Token::att(&id("Alb"), "DNSName"),
            Token::Pseudo(Pseudo::Region),
            Token::reference(&id("Bucket")),
        ])
        .to_value();

        assert_eq!(references(&value), vec!["Alb".to_string(), "Bucket".to_string()]);
    }

    #[test]
    fn test_references_in_nested_properties() {
        let value = json!({
            "SecurityGroupIds": [{ "Ref": "Sg" }],
            "Tags": [{ "Key": "Name", "Value": "x" }],
            "Nested": { "Deep": { "Fn::GetAtt": ["Role", "Arn"] } }
        });
        let mut refs = references(&value);
        refs.sort();
        assert_eq!(refs, vec!["Role".to_string(), "Sg".to_string()]);
    }
}

//! Synthesized template documents.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::{StackError, StackResult};

/// Output document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemplateFormat {
    #[default]
    Json,
    Yaml,
}

impl TemplateFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateFormat::Json => "json",
            TemplateFormat::Yaml => "yaml",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(TemplateFormat::Json),
            "yaml" | "yml" => Some(TemplateFormat::Yaml),
            _ => None,
        }
    }
}

/// A template input parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(rename = "Type")]
    pub type_name: String,
    #[serde(rename = "Default", skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Parameter {
    /// A parameter resolved from an SSM parameter store path at deploy time.
    pub fn ssm_image_id(path: impl Into<String>) -> Self {
        Self {
            type_name: "AWS::SSM::Parameter::Value<AWS::EC2::Image::Id>".to_string(),
            default: Some(path.into()),
            description: None,
        }
    }
}

/// A published stack output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    #[serde(rename = "Value")]
    pub value: Value,
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The declarative resource graph handed to the deployment engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "Parameters", default, skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, Parameter>,
    #[serde(rename = "Resources")]
    pub resources: IndexMap<String, Value>,
    #[serde(rename = "Outputs", default, skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<String, Output>,
}

impl Template {
    pub const FORMAT_VERSION: &'static str = "2010-09-09";

    pub fn to_json(&self) -> StackResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_yaml(&self) -> StackResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn render(&self, format: TemplateFormat) -> StackResult<String> {
        match format {
            TemplateFormat::Json => self.to_json(),
            TemplateFormat::Yaml => self.to_yaml(),
        }
    }

    /// Write `<stack>.template.<ext>` into `dir`, creating it if needed.
    pub fn write_to(&self, dir: &Path, stack_name: &str, format: TemplateFormat) -> StackResult<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.template.{}", stack_name, format.as_str()));
        fs::write(&path, self.render(format)?)?;
        info!("Wrote template with {} resources to {:?}", self.resources.len(), path);
        Ok(path)
    }

    /// Load a previously synthesized template (JSON or YAML by extension).
    pub fn from_file(path: &Path) -> StackResult<Self> {
        let content = fs::read_to_string(path)?;
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(TemplateFormat::from_str)
            .ok_or_else(|| {
                StackError::InvalidConfig(format!("Unknown template extension: {:?}", path))
            })?;

        match format {
            TemplateFormat::Json => Ok(serde_json::from_str(&content)?),
            TemplateFormat::Yaml => Ok(serde_yaml::from_str(&content)?),
        }
    }

    /// Resource type of the given logical id.
    pub fn resource_type(&self, id: &str) -> Option<&str> {
        self.resources.get(id)?.get("Type")?.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn sample() -> Template {
        let mut resources = IndexMap::new();
        resources.insert("Repo".to_string(), json!({ "Type": "AWS::ECR::Repository" }));
        Template {
            format_version: Template::FORMAT_VERSION.to_string(),
            description: Some("sample".to_string()),
            parameters: IndexMap::new(),
            resources,
            outputs: IndexMap::new(),
        }
    }

    #[test]
    fn test_json_layout() {
        let value: Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        assert_eq!(value["AWSTemplateFormatVersion"], "2010-09-09");
        assert!(value.get("Outputs").is_none());
        assert_eq!(value["Resources"]["Repo"]["Type"], "AWS::ECR::Repository");
    }

    #[test]
    fn test_write_and_reload_yaml() {
        let dir = tempdir().unwrap();
        let path = sample().write_to(dir.path(), "demo", TemplateFormat::Yaml).unwrap();

        assert!(path.ends_with("demo.template.yaml"));
        let loaded = Template::from_file(&path).unwrap();
        assert_eq!(loaded.resource_type("Repo"), Some("AWS::ECR::Repository"));
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!(TemplateFormat::from_str("YML"), Some(TemplateFormat::Yaml));
        assert_eq!(TemplateFormat::from_str("toml"), None);
    }
}

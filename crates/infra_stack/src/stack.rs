//! The stack: an ordered collection of resource declarations.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::error::{StackError, StackResult};
use crate::graph::DependencyGraph;
use crate::resource::{LogicalId, Resource};
use crate::template::{Output, Parameter, Template};
use crate::token::{references, Token};

/// A named, deployable collection of resource declarations.
///
/// Resources keep their insertion order, which is the order the providers
/// composed them in. A resource may only reference resources and parameters
/// that were declared before it. [`Stack::update_resource`] can add edges to
/// later resources, so the creation order comes from
/// [`DependencyGraph`](crate::graph::DependencyGraph), not from insertion
/// order.
#[derive(Debug, Clone)]
pub struct Stack {
    name: String,
    description: Option<String>,
    parameters: IndexMap<LogicalId, Parameter>,
    resources: IndexMap<LogicalId, Resource>,
    outputs: IndexMap<String, Output>,
}

impl Stack {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            parameters: IndexMap::new(),
            resources: IndexMap::new(),
            outputs: IndexMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declare a template parameter.
    pub fn add_parameter(&mut self, id: &str, parameter: Parameter) -> StackResult<LogicalId> {
        let id = LogicalId::new(id)?;
        if self.is_declared(id.as_str()) {
            return Err(StackError::DuplicateLogicalId(id.to_string()));
        }
        self.parameters.insert(id.clone(), parameter);
        Ok(id)
    }

    /// Add a resource. Every reference it carries must already be declared.
    pub fn add(&mut self, id: &str, resource: Resource) -> StackResult<LogicalId> {
        let id = LogicalId::new(id)?;
        if self.is_declared(id.as_str()) {
            return Err(StackError::DuplicateLogicalId(id.to_string()));
        }
        self.check_references(&id, &resource)?;

        debug!("Declared {} ({})", id, resource.type_name);
        self.resources.insert(id.clone(), resource);
        Ok(id)
    }

    /// Modify a resource that is already in the stack, e.g. when a later
    /// provider attaches itself to an earlier resource. The change is rolled
    /// back if it introduces an undeclared reference or a cycle.
    pub fn update_resource<F>(&mut self, id: &LogicalId, update: F) -> StackResult<()>
    where
        F: FnOnce(&mut Resource),
    {
        let mut updated = self
            .resources
            .get(id)
            .cloned()
            .ok_or_else(|| StackError::ResourceNotFound(id.to_string()))?;
        update(&mut updated);
        self.check_references(id, &updated)?;
        if updated.dependencies().iter().any(|d| d == id.as_str()) {
            return Err(StackError::DependencyCycle(id.to_string()));
        }

        let previous = self.resources.insert(id.clone(), updated);
        if let Err(e) = DependencyGraph::from_stack(self).creation_waves() {
            if let Some(previous) = previous {
                self.resources.insert(id.clone(), previous);
            }
            return Err(e);
        }

        debug!("Updated {}", id);
        Ok(())
    }

    /// Publish a stack output.
    pub fn add_output(
        &mut self,
        name: &str,
        value: Token,
        description: Option<&str>,
    ) -> StackResult<()> {
        LogicalId::new(name)?;
        if self.outputs.contains_key(name) {
            return Err(StackError::DuplicateOutput(name.to_string()));
        }
        let value = value.to_value();
        for target in references(&value) {
            if !self.is_declared(&target) {
                return Err(StackError::DanglingReference {
                    resource: format!("output {}", name),
                    target,
                });
            }
        }
        self.outputs.insert(
            name.to_string(),
            Output {
                value,
                description: description.map(str::to_string),
            },
        );
        Ok(())
    }

    pub fn resource(&self, id: &LogicalId) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn resources(&self) -> impl Iterator<Item = (&LogicalId, &Resource)> {
        self.resources.iter()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Render the declarative graph for the deployment engine.
    pub fn synth(&self) -> StackResult<Template> {
        let mut resources = IndexMap::new();
        for (id, resource) in &self.resources {
            resources.insert(id.to_string(), serde_json::to_value(resource)?);
        }

        Ok(Template {
            format_version: Template::FORMAT_VERSION.to_string(),
            description: self.description.clone(),
            parameters: self
                .parameters
                .iter()
                .map(|(id, p)| (id.to_string(), p.clone()))
                .collect(),
            resources,
            outputs: self.outputs.clone(),
        })
    }

    fn is_declared(&self, id: &str) -> bool {
        self.resources.contains_key(id) || self.parameters.contains_key(id)
    }

    fn check_references(&self, id: &LogicalId, resource: &Resource) -> StackResult<()> {
        let mut targets = references(&Value::Object(resource.properties.clone()));
        targets.extend(resource.depends_on.iter().map(|d| d.to_string()));

        for target in targets {
            if target == id.as_str() {
                return Err(StackError::DependencyCycle(id.to_string()));
            }
            if !self.is_declared(&target) {
                return Err(StackError::DanglingReference {
                    resource: id.to_string(),
                    target,
                });
            }
        }
        Ok(())
    }
}

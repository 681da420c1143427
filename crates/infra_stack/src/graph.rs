//! Creation order for the resources of a stack or template.
//!
//! Resources are grouped into waves: every resource in a wave depends only
//! on resources of earlier waves, so a wave can be created in parallel once
//! the previous one is complete. Deletion runs the waves in reverse.
//! Within a wave, ids are sorted alphabetically so the result is
//! deterministic.

use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{StackError, StackResult};
use crate::stack::Stack;
use crate::template::Template;
use crate::token::references;

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Resource id -> ids it depends on.
    edges: IndexMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    /// Build from `(id, dependencies)` pairs. Dependencies that are not
    /// themselves nodes (parameters, pseudo parameters) are ignored.
    pub fn new<I>(nodes: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        let nodes: Vec<(String, Vec<String>)> = nodes.into_iter().collect();
        let known: BTreeSet<String> = nodes.iter().map(|(id, _)| id.clone()).collect();

        let edges = nodes
            .into_iter()
            .map(|(id, deps)| {
                let deps = deps.into_iter().filter(|d| known.contains(d)).collect();
                (id, deps)
            })
            .collect();
        Self { edges }
    }

    pub fn from_stack(stack: &Stack) -> Self {
        Self::new(
            stack
                .resources()
                .map(|(id, resource)| (id.to_string(), resource.dependencies())),
        )
    }

    /// Build from a synthesized template. A reference to something that is
    /// neither a resource nor a parameter is an error.
    pub fn from_template(template: &Template) -> StackResult<Self> {
        let mut nodes = Vec::with_capacity(template.resources.len());
        for (id, body) in &template.resources {
            let deps = template_dependencies(body);
            for dep in &deps {
                if !template.resources.contains_key(dep) && !template.parameters.contains_key(dep) {
                    return Err(StackError::DanglingReference {
                        resource: id.clone(),
                        target: dep.clone(),
                    });
                }
            }
            nodes.push((id.clone(), deps));
        }
        Ok(Self::new(nodes))
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn dependencies_of(&self, id: &str) -> Option<&BTreeSet<String>> {
        self.edges.get(id)
    }

    /// Kahn's algorithm, one wave at a time.
    pub fn creation_waves(&self) -> StackResult<Vec<Vec<String>>> {
        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

        for (id, deps) in &self.edges {
            in_degree.insert(id.as_str(), deps.len());
            for dep in deps {
                dependents.entry(dep.as_str()).or_default().push(id.as_str());
            }
        }

        let mut ready: Vec<&str> = in_degree
            .iter()
            .filter(|(_, &d)| d == 0)
            .map(|(id, _)| *id)
            .collect();

        let mut waves = Vec::new();
        let mut placed = 0;
        while !ready.is_empty() {
            ready.sort_unstable();
            let mut next = Vec::new();
            for id in &ready {
                for dependent in dependents.get(id).into_iter().flatten() {
                    if let Some(degree) = in_degree.get_mut(dependent) {
                        *degree -= 1;
                        if *degree == 0 {
                            next.push(*dependent);
                        }
                    }
                }
            }
            placed += ready.len();
            waves.push(ready.iter().map(|s| s.to_string()).collect());
            ready = next;
        }

        if placed != self.edges.len() {
            let mut stuck: Vec<&str> = in_degree
                .into_iter()
                .filter(|(_, d)| *d > 0)
                .map(|(id, _)| id)
                .collect();
            stuck.sort_unstable();
            return Err(StackError::DependencyCycle(stuck.join(", ")));
        }

        Ok(waves)
    }

    /// Flattened creation order.
    pub fn creation_order(&self) -> StackResult<Vec<String>> {
        Ok(self.creation_waves()?.into_iter().flatten().collect())
    }

    /// Reverse of the creation order.
    pub fn deletion_order(&self) -> StackResult<Vec<String>> {
        let mut order = self.creation_order()?;
        order.reverse();
        Ok(order)
    }
}

/// Dependencies of a rendered resource body: references in `Properties`
/// plus `DependsOn` (a string or a list).
fn template_dependencies(body: &Value) -> Vec<String> {
    let mut deps = body.get("Properties").map(references).unwrap_or_default();
    match body.get("DependsOn") {
        Some(Value::String(dep)) => deps.push(dep.clone()),
        Some(Value::Array(items)) => {
            deps.extend(items.iter().filter_map(|v| v.as_str().map(str::to_string)));
        }
        _ => {}
    }
    deps.sort();
    deps.dedup();
    deps
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn graph(pairs: &[(&str, &[&str])]) -> DependencyGraph {
        DependencyGraph::new(pairs.iter().map(|(id, deps)| {
            (id.to_string(), deps.iter().map(|d| d.to_string()).collect())
        }))
    }

    #[test]
    fn test_waves_respect_dependencies() {
        let g = graph(&[
            ("Vpc", &[]),
            ("Subnet", &["Vpc"]),
            ("Igw", &[]),
            ("Route", &["Subnet", "Igw"]),
        ]);
        let waves = g.creation_waves().unwrap();
        assert_eq!(
            waves,
            vec![
                vec!["Igw".to_string(), "Vpc".to_string()],
                vec!["Subnet".to_string()],
                vec!["Route".to_string()],
            ]
        );
    }

    #[test]
    fn test_cycle_detected() {
        let g = graph(&[("A", &["B"]), ("B", &["A"]), ("C", &[])]);
        let err = g.creation_waves().unwrap_err();
        match err {
            StackError::DependencyCycle(ids) => assert_eq!(ids, "A, B"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_unknown_dependencies_ignored() {
        let g = graph(&[("Host", &["LatestImageId"])]);
        assert_eq!(g.creation_order().unwrap(), vec!["Host".to_string()]);
    }

    #[test]
    fn test_deletion_is_reverse_of_creation() {
        let g = graph(&[("Vpc", &[]), ("Subnet", &["Vpc"])]);
        assert_eq!(g.deletion_order().unwrap(), vec!["Subnet".to_string(), "Vpc".to_string()]);
    }

    #[test]
    fn test_template_depends_on_string_or_list() {
        let body = json!({
            "Type": "X",
            "Properties": { "A": { "Ref": "One" } },
            "DependsOn": ["Two", "One"]
        });
        assert_eq!(template_dependencies(&body), vec!["One".to_string(), "Two".to_string()]);

        let body = json!({ "Type": "X", "DependsOn": "Three" });
        assert_eq!(template_dependencies(&body), vec!["Three".to_string()]);
    }

    #[test]
    fn test_template_dangling_reference_rejected() {
        let template: Template = serde_json::from_value(json!({
            "AWSTemplateFormatVersion": "2010-09-09",
            "Resources": {
                "Subnet": { "Type": "AWS::EC2::Subnet", "Properties": { "VpcId": { "Ref": "Vpc" } } }
            }
        }))
        .unwrap();
        assert!(matches!(
            DependencyGraph::from_template(&template),
            Err(StackError::DanglingReference { .. })
        ));
    }
}

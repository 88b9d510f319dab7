//! Template - A CloudFormation document made of resources and outputs

use std::collections::{BTreeMap, HashSet};

use log::debug;
use serde_json::json;

use crate::naming::is_valid_title;
use crate::resource::{Resource, Value};
use crate::schema::{SchemaRegistry, TypeError};

pub const FORMAT_VERSION: &str = "2010-09-09";

/// Errors raised while assembling or rendering a template
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Invalid title '{0}': titles must be non-empty and alphanumeric")]
    InvalidTitle(String),

    #[error("Duplicate title '{0}'")]
    DuplicateTitle(String),

    #[error("{title} refers to unknown resource '{target}'")]
    UnknownReference { title: String, target: String },

    #[error("{title} ({resource_type}): {error}")]
    Schema {
        title: String,
        resource_type: String,
        error: TypeError,
    },

    #[error("Template validation failed:\n{}", format_errors(.0))]
    Invalid(Vec<TemplateError>),

    #[error("Failed to render YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type TemplateResult<T> = Result<T, TemplateError>;

fn format_errors(errors: &[TemplateError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A template output, optionally exported for cross-stack references
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub title: String,
    pub value: Value,
    pub description: Option<String>,
    /// Export name
    pub export: Option<Value>,
}

impl Output {
    pub fn new(title: impl Into<String>, value: Value) -> Self {
        Self {
            title: title.into(),
            value,
            description: None,
            export: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_export(mut self, name: Value) -> Self {
        self.export = Some(name);
        self
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut body = serde_json::Map::new();
        if let Some(description) = &self.description {
            body.insert("Description".to_string(), json!(description));
        }
        body.insert("Value".to_string(), self.value.to_json());
        if let Some(export) = &self.export {
            body.insert("Export".to_string(), json!({ "Name": export.to_json() }));
        }
        serde_json::Value::Object(body)
    }
}

/// A CloudFormation template
#[derive(Debug, Clone, Default)]
pub struct Template {
    description: Option<String>,
    resources: BTreeMap<String, Resource>,
    outputs: BTreeMap<String, Output>,
}

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Add a resource, rejecting invalid or already used titles
    pub fn add_resource(&mut self, resource: Resource) -> TemplateResult<()> {
        if !is_valid_title(&resource.title) {
            return Err(TemplateError::InvalidTitle(resource.title));
        }
        if self.resources.contains_key(&resource.title) {
            return Err(TemplateError::DuplicateTitle(resource.title));
        }
        debug!("adding {} {}", resource.resource_type, resource.title);
        self.resources.insert(resource.title.clone(), resource);
        Ok(())
    }

    /// Add a batch of resources, all or none
    ///
    /// Every title is checked against the template and the rest of the batch
    /// before anything is inserted.
    pub fn add_resources(
        &mut self,
        resources: impl IntoIterator<Item = Resource>,
    ) -> TemplateResult<()> {
        let resources: Vec<Resource> = resources.into_iter().collect();
        let mut batch = HashSet::new();
        for resource in &resources {
            if !is_valid_title(&resource.title) {
                return Err(TemplateError::InvalidTitle(resource.title.clone()));
            }
            if self.resources.contains_key(&resource.title) || !batch.insert(resource.title.as_str())
            {
                return Err(TemplateError::DuplicateTitle(resource.title.clone()));
            }
        }
        for resource in resources {
            debug!("adding {} {}", resource.resource_type, resource.title);
            self.resources.insert(resource.title.clone(), resource);
        }
        Ok(())
    }

    /// Add an output, rejecting invalid or already used titles
    pub fn add_output(&mut self, output: Output) -> TemplateResult<()> {
        if !is_valid_title(&output.title) {
            return Err(TemplateError::InvalidTitle(output.title));
        }
        if self.outputs.contains_key(&output.title) {
            return Err(TemplateError::DuplicateTitle(output.title));
        }
        self.outputs.insert(output.title.clone(), output);
        Ok(())
    }

    pub fn resource(&self, title: &str) -> Option<&Resource> {
        self.resources.get(title)
    }

    pub fn output(&self, title: &str) -> Option<&Output> {
        self.outputs.get(title)
    }

    /// Resources ordered by title
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Output> {
        self.outputs.values()
    }

    /// Resources of one CloudFormation type
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = &'a Resource> + 'a {
        self.resources
            .values()
            .filter(move |r| r.resource_type == resource_type)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Check references and, for registered types, property schemas.
    /// All problems are reported at once.
    pub fn validate(&self, schemas: &SchemaRegistry) -> TemplateResult<()> {
        let mut errors = Vec::new();

        for resource in self.resources.values() {
            for target in resource.references() {
                if !self.resources.contains_key(target) {
                    errors.push(TemplateError::UnknownReference {
                        title: resource.title.clone(),
                        target: target.to_string(),
                    });
                }
            }

            if let Some(schema) = schemas.get(&resource.resource_type)
                && let Err(type_errors) = schema.validate(&resource.properties)
            {
                errors.extend(type_errors.into_iter().map(|error| TemplateError::Schema {
                    title: resource.title.clone(),
                    resource_type: resource.resource_type.clone(),
                    error,
                }));
            }
        }

        for output in self.outputs.values() {
            for target in output.value.references() {
                if !self.resources.contains_key(target) {
                    errors.push(TemplateError::UnknownReference {
                        title: output.title.clone(),
                        target: target.to_string(),
                    });
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(TemplateError::Invalid(errors))
        }
    }

    pub fn to_json_value(&self) -> serde_json::Value {
        let mut document = serde_json::Map::new();
        document.insert("AWSTemplateFormatVersion".to_string(), json!(FORMAT_VERSION));
        if let Some(description) = &self.description {
            document.insert("Description".to_string(), json!(description));
        }
        let resources: serde_json::Map<String, serde_json::Value> = self
            .resources
            .iter()
            .map(|(title, resource)| (title.clone(), resource.to_json()))
            .collect();
        document.insert("Resources".to_string(), serde_json::Value::Object(resources));
        if !self.outputs.is_empty() {
            let outputs: serde_json::Map<String, serde_json::Value> = self
                .outputs
                .iter()
                .map(|(title, output)| (title.clone(), output.to_json()))
                .collect();
            document.insert("Outputs".to_string(), serde_json::Value::Object(outputs));
        }
        serde_json::Value::Object(document)
    }

    /// Render as pretty-printed JSON
    pub fn to_json(&self) -> TemplateResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_json_value())?)
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> TemplateResult<String> {
        Ok(serde_yaml::to_string(&self.to_json_value())?)
    }
}

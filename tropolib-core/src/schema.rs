//! Schema - Define property schemas for resource types
//!
//! Builders register a schema for each CloudFormation type they emit,
//! so that a template can be type checked before it is rendered.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use ipnetwork::Ipv4Network;

use crate::resource::Value;

/// Property type
#[derive(Debug, Clone)]
pub enum AttributeType {
    /// String
    String,
    /// Integer
    Int,
    /// Boolean
    Bool,
    /// Enum (list of allowed values)
    Enum(Vec<String>),
    /// Custom type (with validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: fn(&Value) -> Result<(), String>,
    },
    /// List
    List(Box<AttributeType>),
    /// Map
    Map(Box<AttributeType>),
    /// Anything (nested property types that are not modelled)
    Any,
}

impl AttributeType {
    pub fn enumeration(variants: &[&str]) -> Self {
        AttributeType::Enum(variants.iter().map(|v| v.to_string()).collect())
    }

    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            (AttributeType::Any, _) => Ok(()),

            // Intrinsic functions resolve at deploy time and can't be checked here
            (_, v) if v.is_intrinsic() => Ok(()),

            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Enum(variants), Value::String(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            (AttributeType::Custom { validate, base, .. }, v) => {
                base.validate(v)?;
                validate(v).map_err(|msg| TypeError::ValidationFailed { message: msg })
            }

            (AttributeType::List(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                for (k, v) in map {
                    inner.validate(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name(),
            }),
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
            AttributeType::Any => "Any".to_string(),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required property '{name}' is missing")]
    MissingRequired { name: String },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },

    #[error("Property '{name}': {inner}")]
    PropertyError { name: String, inner: Box<TypeError> },
}

impl Value {
    fn type_name(&self) -> String {
        match self {
            Value::String(_) => "String".to_string(),
            Value::Int(_) => "Int".to_string(),
            Value::Bool(_) => "Bool".to_string(),
            Value::List(_) => "List".to_string(),
            Value::Map(_) => "Map".to_string(),
            Value::Ref(name) => format!("Ref({})", name),
            Value::GetAtt(name, attr) => format!("GetAtt({}.{})", name, attr),
            Value::Join(..) => "Join".to_string(),
            Value::Sub(_) => "Sub".to_string(),
        }
    }
}

/// Property schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    /// CloudFormation property name (e.g., "VpcId")
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    pub description: Option<String>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            description: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    /// CloudFormation type name (e.g., "AWS::EC2::Subnet")
    pub resource_type: String,
    pub attributes: HashMap<String, AttributeSchema>,
    pub description: Option<String>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
            description: None,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Validate resource properties
    pub fn validate(&self, properties: &BTreeMap<String, Value>) -> Result<(), Vec<TypeError>> {
        let mut errors = Vec::new();

        // Check required properties (sorted for stable error output)
        let mut required: Vec<&String> = self
            .attributes
            .values()
            .filter(|schema| schema.required)
            .map(|schema| &schema.name)
            .collect();
        required.sort();
        for name in required {
            if !properties.contains_key(name) {
                errors.push(TypeError::MissingRequired { name: name.clone() });
            }
        }

        // Type check each property
        for (name, value) in properties {
            if let Some(schema) = self.attributes.get(name)
                && let Err(e) = schema.attr_type.validate(value)
            {
                errors.push(TypeError::PropertyError {
                    name: name.clone(),
                    inner: Box::new(e),
                });
            }
            // Unknown properties are allowed (for flexibility)
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Schemas indexed by CloudFormation type name
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, ResourceSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, schema: ResourceSchema) {
        self.schemas.insert(schema.resource_type.clone(), schema);
    }

    pub fn get(&self, resource_type: &str) -> Option<&ResourceSchema> {
        self.schemas.get(resource_type)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl FromIterator<ResourceSchema> for SchemaRegistry {
    fn from_iter<I: IntoIterator<Item = ResourceSchema>>(iter: I) -> Self {
        let mut registry = SchemaRegistry::new();
        for schema in iter {
            registry.register(schema);
        }
        registry
    }
}

/// Helper functions for common types
pub mod types {
    use super::*;

    /// IPv4 CIDR block type (e.g., "10.0.0.0/16")
    pub fn cidr() -> AttributeType {
        AttributeType::Custom {
            name: "Cidr".to_string(),
            base: Box::new(AttributeType::String),
            validate: |value| {
                if let Value::String(s) = value {
                    validate_cidr(s)
                } else {
                    Err("Expected string".to_string())
                }
            },
        }
    }

    /// Port number type (0-65535, -1 meaning all)
    pub fn port() -> AttributeType {
        AttributeType::Custom {
            name: "Port".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| match value {
                Value::Int(n) if (-1..=65535).contains(n) => Ok(()),
                Value::Int(n) => Err(format!("Port {} must be between -1 and 65535", n)),
                _ => Err("Expected integer".to_string()),
            },
        }
    }

    /// Network ACL rule number type (1-32766)
    pub fn rule_number() -> AttributeType {
        AttributeType::Custom {
            name: "RuleNumber".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| match value {
                Value::Int(n) if (1..=32766).contains(n) => Ok(()),
                Value::Int(n) => Err(format!("Rule number {} must be between 1 and 32766", n)),
                _ => Err("Expected integer".to_string()),
            },
        }
    }

    /// Tags type: list of {Key, Value} maps
    pub fn tags() -> AttributeType {
        AttributeType::List(Box::new(AttributeType::Map(Box::new(AttributeType::String))))
    }
}

/// Validate IPv4 CIDR block format (e.g., "10.0.0.0/16")
pub fn validate_cidr(cidr: &str) -> Result<(), String> {
    if !cidr.contains('/') {
        return Err(format!("Invalid CIDR format '{}': expected IP/prefix", cidr));
    }
    cidr.parse::<Ipv4Network>()
        .map(|_| ())
        .map_err(|e| format!("Invalid CIDR '{}': {}", cidr, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_string_type() {
        let t = AttributeType::String;
        assert!(t.validate(&Value::String("hello".to_string())).is_ok());
        assert!(t.validate(&Value::Ref("MainVpc".to_string())).is_ok());
        assert!(t.validate(&Value::Int(42)).is_err());
    }

    #[test]
    fn validate_enum_type() {
        let t = AttributeType::enumeration(&["allow", "deny"]);
        assert!(t.validate(&Value::String("allow".to_string())).is_ok());
        assert!(t.validate(&Value::String("permit".to_string())).is_err());
    }

    #[test]
    fn validate_rule_number() {
        let t = types::rule_number();
        assert!(t.validate(&Value::Int(1)).is_ok());
        assert!(t.validate(&Value::Int(32766)).is_ok());
        assert!(t.validate(&Value::Int(0)).is_err());
        assert!(t.validate(&Value::Int(32767)).is_err());
        assert!(t.validate(&Value::String("100".to_string())).is_err());
    }

    #[test]
    fn validate_resource_schema() {
        let schema = ResourceSchema::new("AWS::EC2::Subnet")
            .attribute(AttributeSchema::new("VpcId", AttributeType::String).required())
            .attribute(AttributeSchema::new("CidrBlock", types::cidr()))
            .attribute(AttributeSchema::new("MapPublicIpOnLaunch", AttributeType::Bool));

        let properties = BTreeMap::from([
            ("VpcId".to_string(), Value::Ref("MainVpc".to_string())),
            ("CidrBlock".to_string(), Value::from("10.0.0.0/24")),
            ("MapPublicIpOnLaunch".to_string(), Value::Bool(true)),
        ]);

        assert!(schema.validate(&properties).is_ok());
    }

    #[test]
    fn missing_required_attribute() {
        let schema = ResourceSchema::new("AWS::EC2::RouteTable")
            .attribute(AttributeSchema::new("VpcId", AttributeType::String).required());

        let errors = schema.validate(&BTreeMap::new()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "Required property 'VpcId' is missing");
    }

    #[test]
    fn nested_errors_name_the_property() {
        let schema = ResourceSchema::new("AWS::EC2::VPC")
            .attribute(AttributeSchema::new("Tags", types::tags()));
        let properties = BTreeMap::from([(
            "Tags".to_string(),
            Value::List(vec![Value::from("not-a-map")]),
        )]);

        let errors = schema.validate(&properties).unwrap_err();
        assert_eq!(
            errors[0].to_string(),
            "Property 'Tags': List item at index 0: Type mismatch: expected Map<String>, got String"
        );
    }

    #[test]
    fn validate_cidr_type() {
        let t = types::cidr();

        assert!(t.validate(&Value::from("10.0.0.0/16")).is_ok());
        assert!(t.validate(&Value::from("0.0.0.0/0")).is_ok());
        assert!(t.validate(&Value::from("255.255.255.255/32")).is_ok());
        assert!(
            t.validate(&Value::GetAtt("MainVpc".to_string(), "CidrBlock".to_string()))
                .is_ok()
        );

        assert!(t.validate(&Value::from("10.0.0.0")).is_err()); // no prefix
        assert!(t.validate(&Value::from("10.0.0.0/33")).is_err()); // prefix too large
        assert!(t.validate(&Value::from("10.0.0.256/16")).is_err()); // octet > 255
        assert!(t.validate(&Value::from("invalid")).is_err());
        assert!(t.validate(&Value::Int(42)).is_err()); // wrong type
    }
}

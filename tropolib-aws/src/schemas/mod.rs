//! Property schemas of the resource types this crate emits
//!
//! Required properties and enum values follow the CloudFormation resource
//! reference. Properties the builders never set are left out, and unknown
//! properties are accepted by the registry.

use tropolib_core::schema::{AttributeSchema, ResourceSchema, SchemaRegistry, types};

pub mod apigatewayv2;
pub mod ec2;

/// Schema of one CloudFormation type
pub struct SchemaConfig {
    /// CloudFormation type name (e.g., "AWS::EC2::VPC")
    pub aws_type_name: &'static str,
    /// Whether this resource type takes a `Tags` list
    pub has_tags: bool,
    pub schema: ResourceSchema,
}

impl SchemaConfig {
    fn new(aws_type_name: &'static str, has_tags: bool, schema: ResourceSchema) -> Self {
        let schema = if has_tags {
            schema.attribute(AttributeSchema::new("Tags", types::tags()))
        } else {
            schema
        };
        Self {
            aws_type_name,
            has_tags,
            schema,
        }
    }
}

/// Every schema config, EC2 first
pub fn configs() -> Vec<SchemaConfig> {
    let mut configs = ec2::configs();
    configs.extend(apigatewayv2::configs());
    configs
}

/// Registry with every schema, for [`tropolib_core::Template::validate`]
pub fn registry() -> SchemaRegistry {
    configs().into_iter().map(|c| c.schema).collect()
}

//! API Gateway v2 schemas

use tropolib_core::Value;
use tropolib_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use super::SchemaConfig;
use crate::resources::{API, API_ROUTE, INTEGRATION, STAGE};

fn timeout() -> AttributeType {
    AttributeType::Custom {
        name: "TimeoutInMillis".to_string(),
        base: Box::new(AttributeType::Int),
        validate: |value| match value {
            Value::Int(n) if (50..=30000).contains(n) => Ok(()),
            Value::Int(n) => Err(format!("Timeout {}ms must be between 50 and 30000", n)),
            _ => Err("Expected integer".to_string()),
        },
    }
}

pub fn api_config() -> SchemaConfig {
    SchemaConfig::new(
        API,
        false,
        ResourceSchema::new(API)
            .attribute(AttributeSchema::new("Name", AttributeType::String))
            .attribute(AttributeSchema::new("Description", AttributeType::String))
            .attribute(AttributeSchema::new(
                "ProtocolType",
                AttributeType::enumeration(&["HTTP", "WEBSOCKET"]),
            )),
    )
}

pub fn stage_config() -> SchemaConfig {
    SchemaConfig::new(
        STAGE,
        false,
        ResourceSchema::new(STAGE)
            .attribute(AttributeSchema::new("ApiId", AttributeType::String).required())
            .attribute(AttributeSchema::new("StageName", AttributeType::String).required())
            .attribute(AttributeSchema::new("AutoDeploy", AttributeType::Bool))
            .attribute(AttributeSchema::new(
                "AccessLogSettings",
                AttributeType::Map(Box::new(AttributeType::String)),
            )),
    )
}

pub fn integration_config() -> SchemaConfig {
    SchemaConfig::new(
        INTEGRATION,
        false,
        ResourceSchema::new(INTEGRATION)
            .attribute(AttributeSchema::new("ApiId", AttributeType::String).required())
            .attribute(
                AttributeSchema::new(
                    "IntegrationType",
                    AttributeType::enumeration(&["AWS", "AWS_PROXY", "HTTP", "HTTP_PROXY", "MOCK"]),
                )
                .required(),
            )
            .attribute(AttributeSchema::new("IntegrationMethod", AttributeType::String))
            .attribute(AttributeSchema::new("IntegrationUri", AttributeType::String))
            .attribute(AttributeSchema::new(
                "PayloadFormatVersion",
                AttributeType::enumeration(&["1.0", "2.0"]),
            ))
            .attribute(AttributeSchema::new("TimeoutInMillis", timeout()))
            .attribute(AttributeSchema::new("Description", AttributeType::String)),
    )
}

pub fn route_config() -> SchemaConfig {
    SchemaConfig::new(
        API_ROUTE,
        false,
        ResourceSchema::new(API_ROUTE)
            .attribute(AttributeSchema::new("ApiId", AttributeType::String).required())
            .attribute(
                AttributeSchema::new("RouteKey", AttributeType::String)
                    .required()
                    .with_description("e.g., \"GET /orders\""),
            )
            .attribute(AttributeSchema::new("Target", AttributeType::String))
            .attribute(AttributeSchema::new("OperationName", AttributeType::String)),
    )
}

pub fn configs() -> Vec<SchemaConfig> {
    vec![api_config(), stage_config(), integration_config(), route_config()]
}

//! HTTP APIs on API Gateway v2

use std::fmt;
use std::str::FromStr;

use log::debug;
use serde_json::json;
use tropolib_core::naming::alphanum;
use tropolib_core::{Resource, Template, Value};

use crate::resources::{API, API_ROUTE, INTEGRATION, STAGE};
use crate::{BuildError, BuildResult};

/// Marker every custom access log format has to contain
const REQUEST_ID: &str = "$context.requestId";

const CLF_FORMAT: &str = "$context.identity.sourceIp - - [$context.requestTime] \"$context.httpMethod $context.routeKey $context.protocol\" $context.status $context.responseLength $context.requestId";
const XML_FORMAT: &str = "<request id=\"$context.requestId\"> <ip>$context.identity.sourceIp</ip> <requestTime>$context.requestTime</requestTime> <httpMethod>$context.httpMethod</httpMethod> <routeKey>$context.routeKey</routeKey> <status>$context.status</status> <protocol>$context.protocol</protocol> <responseLength>$context.responseLength</responseLength> </request>";
const CSV_FORMAT: &str = "$context.identity.sourceIp,$context.requestTime,$context.httpMethod,$context.routeKey,$context.protocol,$context.status,$context.responseLength,$context.requestId";
const JSON_FIELDS: [(&str, &str); 8] = [
    ("requestId", "$context.requestId"),
    ("ip", "$context.identity.sourceIp"),
    ("requestTime", "$context.requestTime"),
    ("httpMethod", "$context.httpMethod"),
    ("routeKey", "$context.routeKey"),
    ("status", "$context.status"),
    ("protocol", "$context.protocol"),
    ("responseLength", "$context.responseLength"),
];

/// Timeout bounds of an HTTP API integration, in milliseconds
const TIMEOUT_RANGE: std::ops::RangeInclusive<u32> = 50..=30000;

/// Access log layout of a stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    None,
    Clf,
    Json,
    Xml,
    Csv,
    Custom(String),
}

impl LogFormat {
    /// The `$context` template, `None` when logging is off
    pub fn format(&self) -> Option<String> {
        match self {
            LogFormat::None => None,
            LogFormat::Clf => Some(CLF_FORMAT.to_string()),
            LogFormat::Json => Some(json_format()),
            LogFormat::Xml => Some(XML_FORMAT.to_string()),
            LogFormat::Csv => Some(CSV_FORMAT.to_string()),
            LogFormat::Custom(format) => Some(format.clone()),
        }
    }
}

/// One line JSON object in key order, `{"requestId": "$context.requestId", ...}`
fn json_format() -> String {
    let fields: Vec<String> = JSON_FIELDS
        .iter()
        .map(|(key, value)| format!("{}: {}", json!(key), json!(value)))
        .collect();
    format!("{{{}}}", fields.join(", "))
}

impl FromStr for LogFormat {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(LogFormat::None),
            "clf" => Ok(LogFormat::Clf),
            "json" => Ok(LogFormat::Json),
            "xml" => Ok(LogFormat::Xml),
            "csv" => Ok(LogFormat::Csv),
            _ if s.contains(REQUEST_ID) => Ok(LogFormat::Custom(s.to_string())),
            _ => Err(BuildError::InvalidLogFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Any,
    Get,
    Post,
    Put,
    Patch,
    Head,
    Delete,
    Options,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Any => "ANY",
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ANY" => Ok(HttpMethod::Any),
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "HEAD" => Ok(HttpMethod::Head),
            "DELETE" => Ok(HttpMethod::Delete),
            "OPTIONS" => Ok(HttpMethod::Options),
            _ => Err(BuildError::InvalidHttpMethod(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StageOptions {
    pub auto_deploy: bool,
    pub log_format: LogFormat,
}

impl Default for StageOptions {
    fn default() -> Self {
        Self {
            auto_deploy: false,
            log_format: LogFormat::None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouteOptions {
    pub http_method: HttpMethod,
    /// Integration timeout in milliseconds
    pub timeout: u32,
    /// Integration description, also used as the route's operation name
    pub description: Option<String>,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            http_method: HttpMethod::Any,
            timeout: 10000,
            description: None,
        }
    }
}

/// An HTTP API with its stages, integrations and routes
#[derive(Debug, Clone)]
pub struct HttpApi {
    name: String,
    clean_name: String,
    api: Resource,
    resources: Template,
}

impl HttpApi {
    pub fn new(name: &str, description: Option<&str>) -> BuildResult<Self> {
        let clean_name = alphanum(name);
        if clean_name.is_empty() {
            return Err(BuildError::InvalidName(name.to_string()));
        }
        let api = Resource::new(API, format!("{}HTTPApi", clean_name))
            .with_property("Name", name)
            .with_property("ProtocolType", "HTTP")
            .with_optional_property("Description", description);
        let mut resources = Template::new();
        resources.add_resource(api.clone())?;
        Ok(Self {
            name: name.to_string(),
            clean_name,
            api,
            resources,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn api(&self) -> &Resource {
        &self.api
    }

    /// Add a stage, with access logging unless the format is [`LogFormat::None`]
    pub fn add_stage(&mut self, name: &str, options: StageOptions) -> BuildResult<()> {
        let clean_stage = alphanum(name);
        if clean_stage.is_empty() {
            return Err(BuildError::InvalidName(name.to_string()));
        }
        let mut stage = Resource::new(STAGE, format!("{}Stage", clean_stage))
            .with_property("ApiId", self.api.reference())
            .with_property("StageName", name)
            .with_property("AutoDeploy", options.auto_deploy);

        if let Some(format) = options.log_format.format() {
            let destination = Value::join(
                ":",
                vec![
                    "arn".into(),
                    "aws".into(),
                    "logs".into(),
                    Value::region(),
                    Value::account_id(),
                    format!("{}HttpApi", self.clean_name).into(),
                    clean_stage.into(),
                ],
            );
            let settings = Value::Map(
                [
                    ("DestinationArn".to_string(), destination),
                    ("Format".to_string(), Value::String(format)),
                ]
                .into_iter()
                .collect(),
            );
            stage.set_property("AccessLogSettings", settings);
        }

        debug!("stage {} on {}", stage.title, self.api.title);
        self.resources.add_resource(stage)?;
        Ok(())
    }

    /// Route `<method> /<path>` to `target`
    ///
    /// Targets starting with `http:` or `https:` are proxied as HTTP,
    /// anything else is taken as a Lambda function ARN.
    ///
    /// Titles are derived from the path alone, so one path takes one route:
    /// adding `POST /orders` after `GET /orders` fails with a duplicate
    /// title. Use [`HttpMethod::Any`] to serve several methods on a path.
    pub fn add_route(&mut self, path: &str, target: &str, options: RouteOptions) -> BuildResult<()> {
        if !TIMEOUT_RANGE.contains(&options.timeout) {
            return Err(BuildError::InvalidTimeout(options.timeout));
        }
        let path = path.trim_start_matches('/');
        let clean_path = alphanum(path);
        if clean_path.is_empty() {
            return Err(BuildError::InvalidName(path.to_string()));
        }

        let lower = target.to_lowercase();
        let (integration_type, payload_version) =
            if lower.starts_with("http:") || lower.starts_with("https:") {
                ("HTTP_PROXY", "1.0")
            } else {
                ("AWS_PROXY", "2.0")
            };

        let integration = Resource::new(INTEGRATION, format!("{}Integration", clean_path))
            .with_property("ApiId", self.api.reference())
            .with_property("IntegrationMethod", options.http_method.as_str())
            .with_property("IntegrationUri", target)
            .with_property("IntegrationType", integration_type)
            .with_property("PayloadFormatVersion", payload_version)
            .with_property("TimeoutInMillis", options.timeout)
            .with_optional_property("Description", options.description.as_deref());
        let route = Resource::new(API_ROUTE, format!("{}Route", clean_path))
            .with_property("ApiId", self.api.reference())
            .with_property("RouteKey", format!("{} /{}", options.http_method, path))
            .with_property(
                "Target",
                Value::join("/", vec!["integrations".into(), integration.reference()]),
            )
            .with_optional_property("OperationName", options.description);

        self.resources.add_resources([integration, route])?;
        Ok(())
    }

    /// The API and everything added to it, ordered by title
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.resources()
    }

    pub fn add_to_template(&self, template: &mut Template) -> BuildResult<()> {
        template.add_resources(self.resources().cloned())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas;

    fn api() -> HttpApi {
        HttpApi::new("orders-api", Some("Order service")).unwrap()
    }

    #[test]
    fn new_creates_http_api() {
        let api = api();
        let resource = api.api();
        assert_eq!(resource.title, "ordersapiHTTPApi");
        assert_eq!(resource.property("ProtocolType"), Some(&Value::from("HTTP")));
        assert_eq!(resource.property("Name"), Some(&Value::from("orders-api")));
        assert_eq!(resource.property("Description"), Some(&Value::from("Order service")));

        let plain = HttpApi::new("plain", None).unwrap();
        assert!(plain.api().property("Description").is_none());
    }

    #[test]
    fn log_formats() {
        assert_eq!("NONE".parse::<LogFormat>().unwrap(), LogFormat::None);
        assert_eq!("Json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(
            "$context.requestId $context.status".parse::<LogFormat>().unwrap(),
            LogFormat::Custom("$context.requestId $context.status".to_string())
        );
        let err = "$context.status".parse::<LogFormat>().unwrap_err();
        assert_eq!(err.to_string(), "$context.status is not a valid log format");

        assert_eq!(
            LogFormat::Json.format().unwrap(),
            "{\"requestId\": \"$context.requestId\", \"ip\": \"$context.identity.sourceIp\", \
             \"requestTime\": \"$context.requestTime\", \"httpMethod\": \"$context.httpMethod\", \
             \"routeKey\": \"$context.routeKey\", \"status\": \"$context.status\", \
             \"protocol\": \"$context.protocol\", \"responseLength\": \"$context.responseLength\"}"
        );
        assert!(LogFormat::None.format().is_none());
    }

    #[test]
    fn stage_without_logging() {
        let mut api = api();
        api.add_stage("prod", StageOptions::default()).unwrap();
        let stage = api.resources().find(|r| r.title == "prodStage").unwrap();
        assert_eq!(stage.property("StageName"), Some(&Value::from("prod")));
        assert_eq!(stage.property("AutoDeploy"), Some(&Value::Bool(false)));
        assert_eq!(
            stage.property("ApiId"),
            Some(&Value::Ref("ordersapiHTTPApi".to_string()))
        );
        assert!(stage.property("AccessLogSettings").is_none());
    }

    #[test]
    fn stage_with_access_logs() {
        let mut api = api();
        api.add_stage(
            "$default",
            StageOptions {
                auto_deploy: true,
                log_format: LogFormat::Csv,
            },
        )
        .unwrap();
        let stage = api.resources().find(|r| r.title == "defaultStage").unwrap();
        let Some(Value::Map(settings)) = stage.property("AccessLogSettings") else {
            panic!("AccessLogSettings should be a map");
        };
        assert_eq!(settings.get("Format"), Some(&Value::from(CSV_FORMAT)));
        assert_eq!(
            settings.get("DestinationArn").map(Value::to_json),
            Some(json!({
                "Fn::Join": [":", [
                    "arn", "aws", "logs",
                    {"Ref": "AWS::Region"},
                    {"Ref": "AWS::AccountId"},
                    "ordersapiHttpApi",
                    "default"
                ]]
            }))
        );
    }

    #[test]
    fn http_and_lambda_routes() {
        let mut api = api();
        api.add_route(
            "/orders",
            "https://orders.example.com/{proxy}",
            RouteOptions {
                http_method: "get".parse().unwrap(),
                description: Some("List orders".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        api.add_route(
            "payments",
            "arn:aws:lambda:eu-west-1:123456789012:function:pay",
            RouteOptions::default(),
        )
        .unwrap();

        let find = |title: &str| api.resources().find(|r| r.title == title).unwrap().clone();

        let integration = find("ordersIntegration");
        assert_eq!(integration.property("IntegrationType"), Some(&Value::from("HTTP_PROXY")));
        assert_eq!(integration.property("PayloadFormatVersion"), Some(&Value::from("1.0")));
        assert_eq!(integration.property("IntegrationMethod"), Some(&Value::from("GET")));
        assert_eq!(integration.property("TimeoutInMillis"), Some(&Value::Int(10000)));
        assert_eq!(integration.property("Description"), Some(&Value::from("List orders")));

        let route = find("ordersRoute");
        assert_eq!(route.property("RouteKey"), Some(&Value::from("GET /orders")));
        assert_eq!(route.property("OperationName"), Some(&Value::from("List orders")));
        assert_eq!(
            route.property("Target").map(Value::to_json),
            Some(json!({"Fn::Join": ["/", ["integrations", {"Ref": "ordersIntegration"}]]}))
        );

        let lambda = find("paymentsIntegration");
        assert_eq!(lambda.property("IntegrationType"), Some(&Value::from("AWS_PROXY")));
        assert_eq!(lambda.property("PayloadFormatVersion"), Some(&Value::from("2.0")));
        assert_eq!(
            find("paymentsRoute").property("RouteKey"),
            Some(&Value::from("ANY /payments"))
        );
    }

    #[test]
    fn invalid_routes_are_rejected() {
        let mut api = api();
        let err = "FETCH".parse::<HttpMethod>().unwrap_err();
        assert_eq!(err.to_string(), "FETCH is not a valid HTTP METHOD");

        let err = api
            .add_route(
                "slow",
                "https://example.com",
                RouteOptions {
                    timeout: 40000,
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidTimeout(40000)));

        api.add_route("items", "https://example.com", RouteOptions::default())
            .unwrap();
        assert!(api
            .add_route("items", "https://example.org", RouteOptions::default())
            .is_err());
    }

    #[test]
    fn one_route_per_path() {
        let mut api = api();
        let get = RouteOptions {
            http_method: HttpMethod::Get,
            ..Default::default()
        };
        let post = RouteOptions {
            http_method: HttpMethod::Post,
            ..Default::default()
        };
        api.add_route("orders", "https://example.com", get).unwrap();
        let before = api.resources().count();

        let err = api
            .add_route("/orders", "https://example.com", post)
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::Template(tropolib_core::TemplateError::DuplicateTitle(title))
                if title == "ordersIntegration"
        ));
        assert_eq!(api.resources().count(), before);
    }

    #[test]
    fn add_to_template_validates() {
        let mut api = api();
        api.add_stage(
            "prod",
            StageOptions {
                auto_deploy: true,
                log_format: LogFormat::Clf,
            },
        )
        .unwrap();
        api.add_route("orders", "https://example.com", RouteOptions::default())
            .unwrap();

        let mut template = Template::new();
        api.add_to_template(&mut template).unwrap();
        assert_eq!(template.len(), 4);
        template.validate(&schemas::registry()).unwrap();
    }
}

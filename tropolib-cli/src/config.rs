//! Stack files
//!
//! A stack file describes one template: an optional VPC with its subnet
//! groups and peerings, and any number of HTTP APIs.
//!
//! ```yaml
//! description: Production network
//! vpc:
//!   name: Prod
//!   region: eu-west-1
//!   cidr_block: 10.0.0.0/16
//!   public_subnets:
//!     - name: Public
//!       cidr_block: 10.0.0.0/20
//!       nat_gateways: true
//!   natted_subnets:
//!     - name: App
//!       cidr_block: 10.0.16.0/20
//! http_apis:
//!   - name: orders
//!     stages:
//!       - name: prod
//!         log_format: json
//!     routes:
//!       - path: orders
//!         target: https://orders.example.com
//! ```

use std::fs;
use std::path::Path;

use log::info;
use serde::Deserialize;
use tropolib_aws::{
    HttpApi, NetworkAclChoice, PeeringOptions, RouteOptions, RouteTableChoice, StageOptions,
    VpcOptions, VpcTemplate,
};
use tropolib_core::Template;

pub const DEFAULT_STACK_FILE: &str = "tropolib.yaml";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StackConfig {
    pub description: Option<String>,
    pub vpc: Option<VpcConfig>,
    pub http_apis: Vec<HttpApiConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VpcConfig {
    #[serde(default = "default_vpc_name")]
    pub name: String,
    pub region: String,
    pub cidr_block: String,
    #[serde(default = "default_true")]
    pub internet_access: bool,
    #[serde(default)]
    pub internal_networks: Vec<String>,
    #[serde(default)]
    pub zones: Option<Vec<String>>,
    #[serde(default)]
    pub public_subnets: Vec<PublicSubnetConfig>,
    #[serde(default)]
    pub natted_subnets: Vec<SubnetConfig>,
    #[serde(default)]
    pub subnet_groups: Vec<SubnetGroupConfig>,
    #[serde(default)]
    pub peerings: Vec<PeeringConfig>,
    #[serde(default)]
    pub s3_endpoint: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublicSubnetConfig {
    pub name: String,
    pub cidr_block: String,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default)]
    pub nat_gateways: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubnetConfig {
    pub name: String,
    pub cidr_block: String,
    #[serde(default = "default_count")]
    pub count: u32,
}

/// Subnets with an explicit network ACL and route table
///
/// `network_acl` is `public`, `internal`, `none` or the title of a network
/// ACL in the template; `route_table` is `public`, `none` or a route table
/// title. The `_id` fields take existing IDs and win over the titles.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubnetGroupConfig {
    pub name: String,
    pub cidr_block: String,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default)]
    pub network_acl: Option<String>,
    #[serde(default)]
    pub network_acl_id: Option<String>,
    #[serde(default)]
    pub route_table: Option<String>,
    #[serde(default)]
    pub route_table_id: Option<String>,
}

impl SubnetGroupConfig {
    fn network_acl_choice(&self) -> NetworkAclChoice {
        if let Some(id) = &self.network_acl_id {
            return NetworkAclChoice::Id(id.clone());
        }
        match self.network_acl.as_deref() {
            None | Some("none") => NetworkAclChoice::None,
            Some("public") => NetworkAclChoice::Public,
            Some("internal") => NetworkAclChoice::Internal,
            Some(title) => NetworkAclChoice::Resource(title.to_string()),
        }
    }

    fn route_table_choice(&self) -> RouteTableChoice {
        if let Some(id) = &self.route_table_id {
            return RouteTableChoice::Id(id.clone());
        }
        match self.route_table.as_deref() {
            None | Some("none") => RouteTableChoice::None,
            Some("public") => RouteTableChoice::Public,
            Some(title) => RouteTableChoice::Resource(title.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PeeringConfig {
    pub vpc_id: String,
    pub name: String,
    #[serde(default)]
    pub cidrs: Vec<String>,
    #[serde(default)]
    pub role_arn: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default = "default_true")]
    pub private_routes: bool,
    #[serde(default = "default_true")]
    pub public_route: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpApiConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub stages: Vec<StageConfig>,
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageConfig {
    pub name: String,
    #[serde(default)]
    pub auto_deploy: bool,
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteConfig {
    pub path: String,
    pub target: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default = "default_timeout")]
    pub timeout: u32,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_vpc_name() -> String {
    VpcOptions::default().name
}

fn default_true() -> bool {
    true
}

fn default_count() -> u32 {
    tropolib_aws::MultiAzSubnets::DEFAULT_COUNT
}

fn default_log_format() -> String {
    "none".to_string()
}

fn default_method() -> String {
    "ANY".to_string()
}

fn default_timeout() -> u32 {
    RouteOptions::default().timeout
}

impl StackConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::parse(&content).map_err(|e| format!("{}: {}", path.display(), e))
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        serde_yaml::from_str(content).map_err(|e| format!("Invalid stack file: {}", e))
    }

    /// Build and validate the template
    pub fn build(&self) -> Result<Template, String> {
        let mut template = match &self.vpc {
            Some(vpc) => vpc.build()?.template().map_err(|e| e.to_string())?,
            None => Template::new(),
        };
        if let Some(description) = &self.description {
            template.set_description(description);
        }
        for api in &self.http_apis {
            api.build()?
                .add_to_template(&mut template)
                .map_err(|e| format!("HTTP API {}: {}", api.name, e))?;
        }
        template
            .validate(&tropolib_aws::schemas::registry())
            .map_err(|e| e.to_string())?;
        info!("stack built: {} resources", template.len());
        Ok(template)
    }
}

impl VpcConfig {
    fn build(&self) -> Result<VpcTemplate, String> {
        let context = |e: tropolib_aws::BuildError| format!("VPC {}: {}", self.name, e);
        let options = VpcOptions {
            name: self.name.clone(),
            internet_access_enabled: self.internet_access,
            internal_networks: self.internal_networks.clone(),
            zones: self.zones.clone(),
            description: None,
        };
        let mut vpc = VpcTemplate::new(&self.region, &self.cidr_block, options).map_err(context)?;

        for group in &self.public_subnets {
            vpc.add_public_subnet_group(&group.name, &group.cidr_block, group.count, group.nat_gateways)
                .map_err(context)?;
        }
        for group in &self.natted_subnets {
            vpc.add_natted_subnet_group(&group.name, &group.cidr_block, group.count)
                .map_err(context)?;
        }
        for group in &self.subnet_groups {
            vpc.add_subnet_group(
                &group.name,
                &group.cidr_block,
                group.count,
                group.network_acl_choice(),
                group.route_table_choice(),
            )
            .map_err(context)?;
        }
        for peering in &self.peerings {
            let options = PeeringOptions {
                role_arn: peering.role_arn.clone(),
                owner_id: peering.owner_id.clone(),
                region: peering.region.clone(),
                cidrs: peering.cidrs.clone(),
                add_route_to_private_tables: peering.private_routes,
                add_route_to_public_table: peering.public_route,
            };
            vpc.peer_with_another_vpc(&peering.vpc_id, &peering.name, options)
                .map_err(context)?;
        }
        if self.s3_endpoint {
            vpc.set_s3_endpoint().map_err(context)?;
        }
        Ok(vpc)
    }
}

impl HttpApiConfig {
    fn build(&self) -> Result<HttpApi, String> {
        let context = |e: tropolib_aws::BuildError| format!("HTTP API {}: {}", self.name, e);
        let mut api = HttpApi::new(&self.name, self.description.as_deref()).map_err(context)?;
        for stage in &self.stages {
            let options = StageOptions {
                auto_deploy: stage.auto_deploy,
                log_format: stage.log_format.parse().map_err(context)?,
            };
            api.add_stage(&stage.name, options).map_err(context)?;
        }
        for route in &self.routes {
            let options = RouteOptions {
                http_method: route.method.parse().map_err(context)?,
                timeout: route.timeout,
                description: route.description.clone(),
            };
            api.add_route(&route.path, &route.target, options)
                .map_err(context)?;
        }
        Ok(api)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const STACK: &str = r#"
description: Test network
vpc:
  name: Test
  region: eu-west-1
  cidr_block: 10.0.0.0/16
  public_subnets:
    - name: Public
      cidr_block: 10.0.0.0/20
      nat_gateways: true
  natted_subnets:
    - name: App
      cidr_block: 10.0.16.0/20
  subnet_groups:
    - name: Db
      cidr_block: 10.0.32.0/24
      count: 2
      network_acl: InternalNacl
      route_table_id: rtb-0123
  peerings:
    - vpc_id: vpc-0abc
      name: shared
      cidrs: [10.100.0.0/16]
      public_route: false
  s3_endpoint: true
http_apis:
  - name: orders
    stages:
      - name: prod
        log_format: CLF
    routes:
      - path: orders
        target: https://orders.example.com
        method: get
"#;

    #[test]
    fn defaults_are_applied() {
        let config = StackConfig::parse(
            "vpc:\n  region: eu-west-1\n  cidr_block: 10.0.0.0/16\n",
        )
        .unwrap();
        let vpc = config.vpc.unwrap();
        assert_eq!(vpc.name, "VPC");
        assert!(vpc.internet_access);
        assert!(!vpc.s3_endpoint);
        assert!(config.http_apis.is_empty());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = StackConfig::parse("vpcs: []\n").unwrap_err();
        assert!(err.contains("unknown field"), "{}", err);
    }

    #[test]
    fn subnet_group_choices() {
        let group: SubnetGroupConfig = serde_yaml::from_str(
            "name: Db\ncidr_block: 10.0.0.0/24\nnetwork_acl: public\nroute_table: MyTable\n",
        )
        .unwrap();
        assert_eq!(group.network_acl_choice(), NetworkAclChoice::Public);
        assert_eq!(
            group.route_table_choice(),
            RouteTableChoice::Resource("MyTable".to_string())
        );
        assert_eq!(group.count, 4);
    }

    #[test]
    fn builds_full_stack_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(STACK.as_bytes()).unwrap();

        let template = StackConfig::load(file.path()).unwrap().build().unwrap();
        assert_eq!(template.description(), Some("Test network"));
        assert!(template.resource("TestVpc").is_some());
        assert!(template.resource("App4RouteAssociation").is_some());
        assert!(template.resource("Db2NaclAssociation").is_some());
        assert!(template.resource("PrivRouteTable1Peer1010000016Route").is_some());
        assert!(template.resource("PubRouteTablePeer1010000016Route").is_none());
        assert!(template.resource("TestS3EndpointGateway").is_some());
        assert!(template.resource("ordersHTTPApi").is_some());
        assert!(template.resource("ordersRoute").is_some());
    }

    #[test]
    fn build_errors_name_their_source() {
        let config = StackConfig::parse(
            "http_apis:\n  - name: orders\n    routes:\n      - path: x\n        target: https://x\n        method: FETCH\n",
        )
        .unwrap();
        assert_eq!(
            config.build().unwrap_err(),
            "HTTP API orders: FETCH is not a valid HTTP METHOD"
        );
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = StackConfig::load(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(err.starts_with("Failed to read"));
    }
}

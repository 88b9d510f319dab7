//! Tropolib AWS
//!
//! Builders for AWS network stacks and HTTP APIs on top of the
//! `tropolib-core` template model.
//!
//! ## Module Structure
//!
//! - `zones` - Availability zone catalog
//! - `network` - Splitting CIDR blocks across availability zones
//! - `subnets` - Multi-AZ subnet groups
//! - `nacl` - Network ACL rule sets
//! - `vpc` - Complete VPC templates
//! - `apigatewayv2` - HTTP APIs, stages and routes
//! - `schemas` - Property schemas of the emitted resource types

pub mod apigatewayv2;
pub mod nacl;
pub mod network;
pub mod resources;
pub mod schemas;
pub mod subnets;
pub mod utils;
pub mod vpc;
pub mod zones;

use tropolib_core::TemplateError;

// Re-export main types
pub use apigatewayv2::{HttpApi, HttpMethod, LogFormat, RouteOptions, StageOptions};
pub use network::{NetSegment, NetworkError, split_net_across_region, split_net_across_zones};
pub use subnets::{MultiAzSubnets, PlacedSubnet, Placement, multiaz_subnets};
pub use vpc::{NetworkAclChoice, PeeringOptions, RouteTableChoice, VpcOptions, VpcTemplate};

/// Errors raised while building resources
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("One of vpc or vpc_id must be specified")]
    MissingVpc,

    #[error("'{0}' has no alphanumeric characters to build a title from")]
    InvalidName(String),

    #[error("{0} is not a valid log format")]
    InvalidLogFormat(String),

    #[error("{0} is not a valid HTTP METHOD")]
    InvalidHttpMethod(String),

    #[error("Integration timeout {0}ms must be between 50 and 30000")]
    InvalidTimeout(u32),

    #[error("Can't find NAT gateway in {0}")]
    NoNatGateway(String),

    #[error("{count} internal networks given, at most {max} fit in the network ACLs")]
    TooManyInternalNetworks { count: usize, max: usize },

    #[error("Unknown resource '{0}'")]
    UnknownResource(String),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Template(#[from] TemplateError),
}

pub type BuildResult<T> = Result<T, BuildError>;

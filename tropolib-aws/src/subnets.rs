//! Subnet groups spread over availability zones
//!
//! A group is described with [`MultiAzSubnets`] and expands into one
//! `AWS::EC2::Subnet` per CIDR segment, plus the network ACL and route table
//! associations for each subnet when those are given.

use log::debug;
use tropolib_core::naming::{alphanum, capitalize};
use tropolib_core::{Resource, Value};

use crate::network::{NetSegment, split_net_across_region, split_net_across_zones};
use crate::resources::{SUBNET, SUBNET_NETWORK_ACL_ASSOCIATION, SUBNET_ROUTE_TABLE_ASSOCIATION};
use crate::utils::az_index;
use crate::{BuildError, BuildResult};

/// Where a subnet was placed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Full zone name, lower case (e.g., "eu-west-1a")
    pub az: String,
    /// Upper-cased zone letter (e.g., "A")
    pub az_index: String,
    /// 1-based position in the group, appended to the subnet title
    pub suffix: usize,
}

impl Placement {
    fn new(segment: &NetSegment, suffix: usize) -> Self {
        Self {
            az: segment.az.to_lowercase(),
            az_index: az_index(&segment.az),
            suffix,
        }
    }
}

/// A generated subnet with its associations
#[derive(Debug, Clone)]
pub struct PlacedSubnet {
    pub subnet: Resource,
    pub placement: Placement,
    pub nacl_association: Option<Resource>,
    pub route_association: Option<Resource>,
}

impl PlacedSubnet {
    pub fn title(&self) -> &str {
        &self.subnet.title
    }

    /// Subnet first, then its associations
    pub fn into_resources(self) -> Vec<Resource> {
        let mut resources = vec![self.subnet];
        resources.extend(self.nacl_association);
        resources.extend(self.route_association);
        resources
    }
}

#[derive(Debug, Clone)]
enum ZoneSource {
    Region(String),
    Zones(Vec<String>),
}

/// A group of subnets split from one CIDR block
///
/// Either a VPC resource or a VPC id is required. Network ACL and route table
/// are optional. When both a resource and an id are set for the same
/// association the id takes precedence.
#[derive(Debug, Clone)]
pub struct MultiAzSubnets {
    name_prefix: String,
    cidr_block: String,
    zones: ZoneSource,
    count: u32,
    vpc: Option<Value>,
    vpc_id: Option<String>,
    network_acl: Option<Value>,
    network_acl_id: Option<String>,
    route_table: Option<Value>,
    route_table_id: Option<String>,
}

impl MultiAzSubnets {
    pub const DEFAULT_COUNT: u32 = 4;

    pub fn new(
        name_prefix: impl Into<String>,
        cidr_block: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            name_prefix: name_prefix.into(),
            cidr_block: cidr_block.into(),
            zones: ZoneSource::Region(region.into()),
            count: Self::DEFAULT_COUNT,
            vpc: None,
            vpc_id: None,
            network_acl: None,
            network_acl_id: None,
            route_table: None,
            route_table_id: None,
        }
    }

    /// Use an explicit zone list instead of the region's catalog entry
    pub fn in_zones(mut self, zones: Vec<String>) -> Self {
        self.zones = ZoneSource::Zones(zones);
        self
    }

    /// Number of subnets, must be a power of 2
    pub fn count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    pub fn vpc(mut self, vpc: &Resource) -> Self {
        self.vpc = Some(vpc.reference());
        self
    }

    pub fn vpc_id(mut self, vpc_id: impl Into<String>) -> Self {
        self.vpc_id = Some(vpc_id.into());
        self
    }

    pub fn network_acl(mut self, network_acl: &Resource) -> Self {
        self.network_acl = Some(network_acl.reference());
        self
    }

    pub fn network_acl_id(mut self, network_acl_id: impl Into<String>) -> Self {
        self.network_acl_id = Some(network_acl_id.into());
        self
    }

    pub fn route_table(mut self, route_table: &Resource) -> Self {
        self.route_table = Some(route_table.reference());
        self
    }

    pub fn route_table_id(mut self, route_table_id: impl Into<String>) -> Self {
        self.route_table_id = Some(route_table_id.into());
        self
    }

    fn resolve(id: &Option<String>, resource: &Option<Value>) -> Option<Value> {
        id.clone().map(Value::String).or_else(|| resource.clone())
    }

    /// Subnet titles are the capitalized alphanumeric prefix plus the suffix
    fn title_prefix(&self) -> String {
        capitalize(&alphanum(&self.name_prefix))
    }

    fn segments(&self) -> BuildResult<Vec<NetSegment>> {
        let segments = match &self.zones {
            ZoneSource::Region(region) => {
                split_net_across_region(&self.cidr_block, region, self.count)?
            }
            ZoneSource::Zones(zones) => split_net_across_zones(&self.cidr_block, zones, self.count)?,
        };
        Ok(segments)
    }

    /// Generate the subnets with their placement
    pub fn build(&self) -> BuildResult<Vec<PlacedSubnet>> {
        let vpc_id = Self::resolve(&self.vpc_id, &self.vpc).ok_or(BuildError::MissingVpc)?;
        let network_acl_id = Self::resolve(&self.network_acl_id, &self.network_acl);
        let route_table_id = Self::resolve(&self.route_table_id, &self.route_table);
        let prefix = self.title_prefix();
        if prefix.is_empty() {
            return Err(BuildError::InvalidName(self.name_prefix.clone()));
        }

        let mut placed = Vec::new();
        for (index, segment) in self.segments()?.iter().enumerate() {
            let placement = Placement::new(segment, index + 1);
            let subnet = Resource::new(SUBNET, format!("{}{}", prefix, placement.suffix))
                .with_property("AvailabilityZone", segment.az.as_str())
                .with_property("CidrBlock", segment.cidr.to_string())
                .with_property("VpcId", vpc_id.clone())
                .with_name_tag(format!("{} {}", self.name_prefix, placement.az_index))
                .with_metadata("az", placement.az.as_str())
                .with_metadata("az_index", placement.az_index.as_str())
                .with_metadata("suffix", placement.suffix);

            let nacl_association = network_acl_id.as_ref().map(|nacl| {
                Resource::new(
                    SUBNET_NETWORK_ACL_ASSOCIATION,
                    format!("{}NaclAssociation", subnet.title),
                )
                .with_property("SubnetId", subnet.reference())
                .with_property("NetworkAclId", nacl.clone())
            });
            let route_association = route_table_id.as_ref().map(|table| {
                route_table_association(&subnet, table.clone())
            });

            placed.push(PlacedSubnet {
                subnet,
                placement,
                nacl_association,
                route_association,
            });
        }

        debug!(
            "subnet group '{}' ({}): {} subnets",
            self.name_prefix,
            self.cidr_block,
            placed.len()
        );
        Ok(placed)
    }

    /// Generate the flat list of resources to add to a template
    pub fn build_resources(&self) -> BuildResult<Vec<Resource>> {
        Ok(self
            .build()?
            .into_iter()
            .flat_map(PlacedSubnet::into_resources)
            .collect())
    }
}

/// `<subnet>RouteAssociation` linking a subnet to a route table
pub(crate) fn route_table_association(subnet: &Resource, route_table_id: Value) -> Resource {
    Resource::new(
        SUBNET_ROUTE_TABLE_ASSOCIATION,
        format!("{}RouteAssociation", subnet.title),
    )
    .with_property("SubnetId", subnet.reference())
    .with_property("RouteTableId", route_table_id)
}

/// Split `cidr_block` over the zones of `region` into the default number of
/// subnets inside `vpc`
pub fn multiaz_subnets(
    name_prefix: &str,
    cidr_block: &str,
    region: &str,
    vpc: &Resource,
) -> BuildResult<Vec<Resource>> {
    MultiAzSubnets::new(name_prefix, cidr_block, region)
        .vpc(vpc)
        .build_resources()
}

//! VPC templates
//!
//! [`VpcTemplate`] sets up a VPC with its internet gateway, public route
//! table and the public and internal network ACLs. Subnet groups, NAT
//! gateways, peering connections and an S3 endpoint are added on top.
//!
//! Exports:
//! - VPC ID: `<stack name>-vpc-id`

use log::{debug, info, warn};
use tropolib_core::naming::{alphanum, capitalize};
use tropolib_core::{Output, Resource, Template, Value};

use crate::nacl::{ANYWHERE, internal_rules, public_rules};
use crate::network::{NetworkError, parse_cidr};
use crate::resources::{
    EIP, INTERNET_GATEWAY, NAT_GATEWAY, NETWORK_ACL, ROUTE, ROUTE_TABLE, VPC,
    VPC_ENDPOINT, VPC_GATEWAY_ATTACHMENT, VPC_PEERING_CONNECTION,
};
use crate::schemas;
use crate::subnets::{MultiAzSubnets, Placement, route_table_association};
use crate::utils::normalize_region;
use crate::zones::availability_zones;
use crate::{BuildError, BuildResult};

/// Settings for a new VPC
#[derive(Debug, Clone)]
pub struct VpcOptions {
    /// VPC name, used in titles and the Name tag
    pub name: String,
    /// Without internet access no internet gateway is set up. Public network
    /// ACLs and route tables are still created.
    pub internet_access_enabled: bool,
    /// Private ranges this VPC connects to, allowed in by the network ACLs
    pub internal_networks: Vec<String>,
    /// Zones to spread subnets over instead of the catalog entry for the region
    pub zones: Option<Vec<String>>,
    pub description: Option<String>,
}

impl Default for VpcOptions {
    fn default() -> Self {
        Self {
            name: "VPC".to_string(),
            internet_access_enabled: true,
            internal_networks: Vec::new(),
            zones: None,
            description: None,
        }
    }
}

/// Network ACL to attach to a custom subnet group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkAclChoice {
    None,
    Public,
    Internal,
    /// Title of a network ACL resource already in the template
    Resource(String),
    /// Existing network ACL ID
    Id(String),
}

/// Route table to attach to a custom subnet group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTableChoice {
    None,
    Public,
    /// Title of a route table resource already in the template
    Resource(String),
    /// Existing route table ID
    Id(String),
}

/// Settings for a VPC peering connection
#[derive(Debug, Clone)]
pub struct PeeringOptions {
    /// Role in the peer account, required when peering across accounts
    pub role_arn: Option<String>,
    pub owner_id: Option<String>,
    /// Region of the accepter VPC, defaults to the requester's
    pub region: Option<String>,
    /// CIDR blocks of the peer VPC, routed through the connection
    pub cidrs: Vec<String>,
    pub add_route_to_private_tables: bool,
    pub add_route_to_public_table: bool,
}

impl Default for PeeringOptions {
    fn default() -> Self {
        Self {
            role_arn: None,
            owner_id: None,
            region: None,
            cidrs: Vec::new(),
            add_route_to_private_tables: true,
            add_route_to_public_table: true,
        }
    }
}

/// A CloudFormation template that creates a VPC
#[derive(Debug, Clone)]
pub struct VpcTemplate {
    name: String,
    region: String,
    zones: Vec<String>,
    internal_networks: Vec<String>,
    template: Template,
    vpc: Resource,
    public_route_table: Resource,
    public_nacl: Resource,
    internal_nacl: Resource,
    nat_gateways: Vec<(Resource, Placement)>,
    natted_route_tables: Vec<(Resource, Placement)>,
}

impl VpcTemplate {
    /// Create the VPC, internet gateway, public route table and network ACLs
    pub fn new(region: &str, cidr_block: &str, options: VpcOptions) -> BuildResult<Self> {
        let region = normalize_region(region);
        let cidr = parse_cidr(cidr_block)?;
        for network in &options.internal_networks {
            parse_cidr(network)?;
        }
        let zones = match options.zones {
            Some(zones) if zones.is_empty() => return Err(NetworkError::NoZones.into()),
            Some(zones) => zones,
            None => availability_zones(&region)
                .ok_or_else(|| NetworkError::UnknownRegion(region.clone()))?,
        };
        let title_name = alphanum(&options.name);
        if title_name.is_empty() {
            return Err(BuildError::InvalidName(options.name));
        }

        let mut template = Template::new();
        if let Some(description) = &options.description {
            template.set_description(description);
        }

        let vpc = Resource::new(VPC, format!("{}Vpc", title_name))
            .with_property("CidrBlock", cidr.to_string())
            .with_property("EnableDnsHostnames", true)
            .with_property("EnableDnsSupport", true)
            .with_name_tag(options.name.as_str());
        template.add_resource(vpc.clone())?;
        template.add_output(
            Output::new("VpcId", vpc.reference())
                .with_export(Value::sub("${AWS::StackName}-vpc-id")),
        )?;

        let public_route_table = Resource::new(ROUTE_TABLE, "PubRouteTable")
            .with_property("VpcId", vpc.reference())
            .with_name_tag("Public");
        template.add_resource(public_route_table.clone())?;

        if options.internet_access_enabled {
            let igw = Resource::new(INTERNET_GATEWAY, "Igw")
                .with_name_tag(format!("{}-igw", options.name));
            let attachment = Resource::new(VPC_GATEWAY_ATTACHMENT, "IgwAttachment")
                .with_property("VpcId", vpc.reference())
                .with_property("InternetGatewayId", igw.reference());
            let route = Resource::new(ROUTE, "PubRoute")
                .with_property("RouteTableId", public_route_table.reference())
                .with_property("DestinationCidrBlock", ANYWHERE)
                .with_property("GatewayId", igw.reference())
                .depends_on(attachment.title.clone());
            template.add_resources([igw, attachment, route])?;
        }

        let public_nacl = Resource::new(NETWORK_ACL, "PubNacl")
            .with_property("VpcId", vpc.reference())
            .with_name_tag("Public");
        for rule in public_rules(&vpc, &options.internal_networks)? {
            template.add_resource(rule.entry(&public_nacl))?;
        }
        template.add_resource(public_nacl.clone())?;

        let internal_nacl = Resource::new(NETWORK_ACL, "InternalNacl")
            .with_property("VpcId", vpc.reference())
            .with_name_tag("Private");
        for rule in internal_rules(&vpc, &options.internal_networks)? {
            template.add_resource(rule.entry(&internal_nacl))?;
        }
        template.add_resource(internal_nacl.clone())?;

        info!(
            "VPC {} ({}) in {} over {} zones",
            options.name,
            cidr,
            region,
            zones.len()
        );

        Ok(Self {
            name: options.name,
            region,
            zones,
            internal_networks: options.internal_networks,
            template,
            vpc,
            public_route_table,
            public_nacl,
            internal_nacl,
            nat_gateways: Vec::new(),
            natted_route_tables: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn zones(&self) -> &[String] {
        &self.zones
    }

    pub fn internal_networks(&self) -> &[String] {
        &self.internal_networks
    }

    pub fn vpc(&self) -> &Resource {
        &self.vpc
    }

    pub fn public_route_table(&self) -> &Resource {
        &self.public_route_table
    }

    pub fn public_nacl(&self) -> &Resource {
        &self.public_nacl
    }

    pub fn internal_nacl(&self) -> &Resource {
        &self.internal_nacl
    }

    pub fn nat_gateways(&self) -> impl Iterator<Item = &Resource> {
        self.nat_gateways.iter().map(|(nat, _)| nat)
    }

    /// Private route tables, one per NAT gateway
    pub fn natted_route_tables(&self) -> impl Iterator<Item = &Resource> {
        self.natted_route_tables.iter().map(|(table, _)| table)
    }

    fn subnet_group(&self, name_prefix: &str, cidr_block: &str, count: u32) -> MultiAzSubnets {
        MultiAzSubnets::new(name_prefix, cidr_block, self.region.as_str())
            .in_zones(self.zones.clone())
            .count(count)
            .vpc(&self.vpc)
    }

    fn existing(&self, title: &str) -> BuildResult<&Resource> {
        self.template
            .resource(title)
            .ok_or_else(|| BuildError::UnknownResource(title.to_string()))
    }

    /// Create public subnets and, optionally, NAT gateways
    ///
    /// With `create_nat_gateways` each zone the group reaches gets one NAT
    /// gateway, placed in the first subnet of the group in that zone, and a
    /// private route table sending internet traffic through it. Zones that
    /// already have a NAT gateway are skipped.
    pub fn add_public_subnet_group(
        &mut self,
        name_prefix: &str,
        cidr_block: &str,
        count: u32,
        create_nat_gateways: bool,
    ) -> BuildResult<()> {
        let placed = self
            .subnet_group(name_prefix, cidr_block, count)
            .network_acl(&self.public_nacl)
            .route_table(&self.public_route_table)
            .build()?;

        // Collect the whole group first so a failure leaves the template untouched
        let mut resources = Vec::new();
        let mut new_nats: Vec<(Resource, Resource, Placement)> = Vec::new();
        for subnet in placed {
            let placement = subnet.placement.clone();
            let subnet_ref = subnet.subnet.reference();
            resources.extend(subnet.into_resources());

            if !create_nat_gateways {
                continue;
            }
            let has_nat = self.nat_gateways.iter().any(|(_, p)| p.az == placement.az)
                || new_nats.iter().any(|(_, _, p)| p.az == placement.az);
            if has_nat {
                debug!("{} already has a NAT gateway", placement.az);
                continue;
            }
            let (nat_resources, nat_gw, route_table) = self.nat_gateway(subnet_ref, &placement);
            resources.extend(nat_resources);
            new_nats.push((nat_gw, route_table, placement));
        }

        self.template.add_resources(resources)?;
        for (nat_gw, route_table, placement) in new_nats {
            self.nat_gateways.push((nat_gw, placement.clone()));
            self.natted_route_tables.push((route_table, placement));
        }
        Ok(())
    }

    /// EIP, NAT gateway, private route table and its default route for one zone.
    /// Also returns the gateway and the route table.
    fn nat_gateway(
        &self,
        subnet: Value,
        placement: &Placement,
    ) -> (Vec<Resource>, Resource, Resource) {
        let Placement {
            az,
            az_index,
            suffix,
        } = placement;

        let eip = Resource::new(EIP, format!("EipNatGw{}", suffix)).with_property("Domain", "vpc");
        let nat_gw = Resource::new(NAT_GATEWAY, format!("NatGw{}", suffix))
            .with_property("AllocationId", eip.get_att("AllocationId"))
            .with_property("SubnetId", subnet)
            .with_name_tag(format!("Nat Gw {}", az_index))
            .with_metadata("az", az.as_str())
            .with_metadata("az_index", az_index.as_str())
            .with_metadata("suffix", *suffix);
        let route_table = Resource::new(ROUTE_TABLE, format!("PrivRouteTable{}", suffix))
            .with_property("VpcId", self.vpc.reference())
            .with_name_tag(format!("Private {}", az_index))
            .with_metadata("az", az.as_str())
            .with_metadata("az_index", az_index.as_str())
            .with_metadata("suffix", *suffix);
        let route = Resource::new(ROUTE, format!("NatRoute{}", az_index.to_uppercase()))
            .with_property("RouteTableId", route_table.reference())
            .with_property("DestinationCidrBlock", ANYWHERE)
            .with_property("NatGatewayId", nat_gw.reference());

        debug!("NAT gateway {} in {}", nat_gw.title, az);
        (
            vec![eip, nat_gw.clone(), route_table.clone(), route],
            nat_gw,
            route_table,
        )
    }

    /// Create private subnets behind NAT gateways
    ///
    /// Subnets get the internal network ACL and the private route table of
    /// their zone. Every zone the group reaches needs a NAT gateway, see
    /// [`VpcTemplate::add_public_subnet_group`].
    pub fn add_natted_subnet_group(
        &mut self,
        name_prefix: &str,
        cidr_block: &str,
        count: u32,
    ) -> BuildResult<()> {
        let placed = self
            .subnet_group(name_prefix, cidr_block, count)
            .network_acl(&self.internal_nacl)
            .build()?;

        // Resolve every zone first so a failure leaves the template untouched
        let mut resources = Vec::new();
        for subnet in placed {
            let table = self
                .natted_route_tables
                .iter()
                .find(|(_, p)| p.az == subnet.placement.az)
                .map(|(table, _)| table.reference())
                .ok_or_else(|| BuildError::NoNatGateway(subnet.placement.az.clone()))?;
            let association = route_table_association(&subnet.subnet, table);
            resources.extend(subnet.into_resources());
            resources.push(association);
        }
        self.template.add_resources(resources)?;
        Ok(())
    }

    /// Create subnets with a caller chosen network ACL and route table
    pub fn add_subnet_group(
        &mut self,
        name_prefix: &str,
        cidr_block: &str,
        count: u32,
        network_acl: NetworkAclChoice,
        route_table: RouteTableChoice,
    ) -> BuildResult<()> {
        let mut group = self.subnet_group(name_prefix, cidr_block, count);
        group = match network_acl {
            NetworkAclChoice::None => group,
            NetworkAclChoice::Public => group.network_acl(&self.public_nacl),
            NetworkAclChoice::Internal => group.network_acl(&self.internal_nacl),
            NetworkAclChoice::Resource(title) => group.network_acl(self.existing(&title)?),
            NetworkAclChoice::Id(id) => group.network_acl_id(id),
        };
        group = match route_table {
            RouteTableChoice::None => group,
            RouteTableChoice::Public => group.route_table(&self.public_route_table),
            RouteTableChoice::Resource(title) => group.route_table(self.existing(&title)?),
            RouteTableChoice::Id(id) => group.route_table_id(id),
        };
        let resources = group.build_resources()?;
        self.template.add_resources(resources)?;
        Ok(())
    }

    /// Set up VPC peering
    ///
    /// Routes to the peer CIDR blocks go into the route tables that exist at
    /// the time of the call, so subnet groups should be added first.
    pub fn peer_with_another_vpc(
        &mut self,
        peer_vpc_id: &str,
        peer_vpc_name: &str,
        options: PeeringOptions,
    ) -> BuildResult<()> {
        for cidr in &options.cidrs {
            parse_cidr(cidr)?;
        }
        let title = alphanum(&format!(
            "Peer{}With{}",
            capitalize(peer_vpc_name),
            capitalize(&self.name)
        ));
        let peering = Resource::new(VPC_PEERING_CONNECTION, title)
            .with_property("VpcId", self.vpc.reference())
            .with_property("PeerVpcId", peer_vpc_id)
            .with_name_tag(format!("{} - {}", peer_vpc_name, self.name))
            .with_optional_property("PeerRegion", options.region.map(|r| normalize_region(&r)))
            .with_optional_property("PeerOwnerId", options.owner_id)
            .with_optional_property("PeerRoleArn", options.role_arn);

        let mut tables: Vec<&Resource> = Vec::new();
        if options.add_route_to_private_tables {
            tables.extend(self.natted_route_tables.iter().map(|(table, _)| table));
        }
        if options.add_route_to_public_table {
            tables.push(&self.public_route_table);
        }
        if tables.is_empty() && !options.cidrs.is_empty() {
            warn!("peering {} has CIDR blocks but no route tables to add them to", peering.title);
        }

        let mut routes = Vec::new();
        for table in tables {
            for cidr in &options.cidrs {
                routes.push(
                    Resource::new(ROUTE, format!("{}Peer{}Route", table.title, alphanum(cidr)))
                        .with_property("RouteTableId", table.reference())
                        .with_property("DestinationCidrBlock", cidr.as_str())
                        .with_property("VpcPeeringConnectionId", peering.reference()),
                );
            }
        }

        routes.insert(0, peering);
        self.template.add_resources(routes)?;
        Ok(())
    }

    /// Add an S3 gateway endpoint with full access to the private route tables
    pub fn set_s3_endpoint(&mut self) -> BuildResult<()> {
        let route_tables: Vec<Value> = self
            .natted_route_tables
            .iter()
            .map(|(table, _)| table.reference())
            .collect();
        if route_tables.is_empty() {
            warn!("S3 endpoint added without private route tables");
        }
        let endpoint = Resource::new(
            VPC_ENDPOINT,
            alphanum(&format!("{}S3EndpointGateway", self.name)),
        )
        .with_property("VpcId", self.vpc.reference())
        .with_property("ServiceName", format!("com.amazonaws.{}.s3", self.region))
        .with_property("VpcEndpointType", "Gateway")
        .with_property("RouteTableIds", route_tables);
        self.template.add_resource(endpoint)?;
        Ok(())
    }

    /// The validated template
    pub fn template(&self) -> BuildResult<Template> {
        self.template.validate(&schemas::registry())?;
        info!(
            "VPC template {}: {} resources",
            self.name,
            self.template.len()
        );
        Ok(self.template.clone())
    }

    /// Render the template as YAML
    pub fn generate(&self) -> BuildResult<String> {
        Ok(self.template()?.to_yaml()?)
    }

    /// Render the template as JSON
    pub fn generate_json(&self) -> BuildResult<String> {
        Ok(self.template()?.to_json()?)
    }
}

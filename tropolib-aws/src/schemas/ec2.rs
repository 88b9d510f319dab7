//! EC2 networking schemas

use tropolib_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::SchemaConfig;
use crate::resources::*;

fn string(name: &str) -> AttributeSchema {
    AttributeSchema::new(name, AttributeType::String)
}

fn boolean(name: &str) -> AttributeSchema {
    AttributeSchema::new(name, AttributeType::Bool)
}

pub fn vpc_config() -> SchemaConfig {
    SchemaConfig::new(
        VPC,
        true,
        ResourceSchema::new(VPC)
            .with_description("A virtual private cloud")
            .attribute(AttributeSchema::new("CidrBlock", types::cidr()))
            .attribute(boolean("EnableDnsHostnames"))
            .attribute(boolean("EnableDnsSupport"))
            .attribute(AttributeSchema::new(
                "InstanceTenancy",
                AttributeType::enumeration(&["default", "dedicated", "host"]),
            )),
    )
}

pub fn internet_gateway_config() -> SchemaConfig {
    SchemaConfig::new(
        INTERNET_GATEWAY,
        true,
        ResourceSchema::new(INTERNET_GATEWAY),
    )
}

pub fn vpc_gateway_attachment_config() -> SchemaConfig {
    SchemaConfig::new(
        VPC_GATEWAY_ATTACHMENT,
        false,
        ResourceSchema::new(VPC_GATEWAY_ATTACHMENT)
            .attribute(string("VpcId").required())
            .attribute(string("InternetGatewayId"))
            .attribute(string("VpnGatewayId")),
    )
}

pub fn route_table_config() -> SchemaConfig {
    SchemaConfig::new(
        ROUTE_TABLE,
        true,
        ResourceSchema::new(ROUTE_TABLE).attribute(string("VpcId").required()),
    )
}

pub fn route_config() -> SchemaConfig {
    SchemaConfig::new(
        ROUTE,
        false,
        ResourceSchema::new(ROUTE)
            .with_description("A route in a route table")
            .attribute(string("RouteTableId").required())
            .attribute(AttributeSchema::new("DestinationCidrBlock", types::cidr()))
            .attribute(string("GatewayId"))
            .attribute(string("NatGatewayId"))
            .attribute(string("VpcPeeringConnectionId")),
    )
}

pub fn network_acl_config() -> SchemaConfig {
    SchemaConfig::new(
        NETWORK_ACL,
        true,
        ResourceSchema::new(NETWORK_ACL).attribute(string("VpcId").required()),
    )
}

pub fn network_acl_entry_config() -> SchemaConfig {
    SchemaConfig::new(
        NETWORK_ACL_ENTRY,
        false,
        ResourceSchema::new(NETWORK_ACL_ENTRY)
            .with_description("A rule of a network ACL")
            .attribute(string("NetworkAclId").required())
            .attribute(
                AttributeSchema::new("RuleNumber", types::rule_number())
                    .required()
                    .with_description("Rules are evaluated in increasing order"),
            )
            .attribute(AttributeSchema::new("Protocol", AttributeType::Int).required())
            .attribute(
                AttributeSchema::new("RuleAction", AttributeType::enumeration(&["allow", "deny"]))
                    .required(),
            )
            .attribute(boolean("Egress"))
            .attribute(AttributeSchema::new("CidrBlock", types::cidr()))
            .attribute(AttributeSchema::new(
                "Icmp",
                AttributeType::Map(Box::new(AttributeType::Int)),
            ))
            .attribute(AttributeSchema::new(
                "PortRange",
                AttributeType::Map(Box::new(types::port())),
            )),
    )
}

pub fn subnet_config() -> SchemaConfig {
    SchemaConfig::new(
        SUBNET,
        true,
        ResourceSchema::new(SUBNET)
            .attribute(string("VpcId").required())
            .attribute(string("AvailabilityZone"))
            .attribute(AttributeSchema::new("CidrBlock", types::cidr()))
            .attribute(boolean("MapPublicIpOnLaunch")),
    )
}

pub fn subnet_network_acl_association_config() -> SchemaConfig {
    SchemaConfig::new(
        SUBNET_NETWORK_ACL_ASSOCIATION,
        false,
        ResourceSchema::new(SUBNET_NETWORK_ACL_ASSOCIATION)
            .attribute(string("NetworkAclId").required())
            .attribute(string("SubnetId").required()),
    )
}

pub fn subnet_route_table_association_config() -> SchemaConfig {
    SchemaConfig::new(
        SUBNET_ROUTE_TABLE_ASSOCIATION,
        false,
        ResourceSchema::new(SUBNET_ROUTE_TABLE_ASSOCIATION)
            .attribute(string("RouteTableId").required())
            .attribute(string("SubnetId").required()),
    )
}

pub fn eip_config() -> SchemaConfig {
    SchemaConfig::new(
        EIP,
        true,
        ResourceSchema::new(EIP).attribute(AttributeSchema::new(
            "Domain",
            AttributeType::enumeration(&["vpc", "standard"]),
        )),
    )
}

pub fn nat_gateway_config() -> SchemaConfig {
    SchemaConfig::new(
        NAT_GATEWAY,
        true,
        ResourceSchema::new(NAT_GATEWAY)
            .attribute(string("SubnetId").required())
            .attribute(string("AllocationId"))
            .attribute(AttributeSchema::new(
                "ConnectivityType",
                AttributeType::enumeration(&["public", "private"]),
            )),
    )
}

pub fn vpc_peering_connection_config() -> SchemaConfig {
    SchemaConfig::new(
        VPC_PEERING_CONNECTION,
        true,
        ResourceSchema::new(VPC_PEERING_CONNECTION)
            .attribute(string("VpcId").required())
            .attribute(string("PeerVpcId").required())
            .attribute(string("PeerOwnerId"))
            .attribute(string("PeerRegion"))
            .attribute(
                string("PeerRoleArn")
                    .with_description("Required when the peer VPC is in another account"),
            ),
    )
}

pub fn vpc_endpoint_config() -> SchemaConfig {
    SchemaConfig::new(
        VPC_ENDPOINT,
        false,
        ResourceSchema::new(VPC_ENDPOINT)
            .attribute(string("VpcId").required())
            .attribute(string("ServiceName").required())
            .attribute(AttributeSchema::new(
                "VpcEndpointType",
                AttributeType::enumeration(&["Gateway", "Interface", "GatewayLoadBalancer"]),
            ))
            .attribute(AttributeSchema::new(
                "RouteTableIds",
                AttributeType::List(Box::new(AttributeType::String)),
            ))
            .attribute(AttributeSchema::new("PolicyDocument", AttributeType::Any)),
    )
}

pub fn configs() -> Vec<SchemaConfig> {
    vec![
        vpc_config(),
        internet_gateway_config(),
        vpc_gateway_attachment_config(),
        route_table_config(),
        route_config(),
        network_acl_config(),
        network_acl_entry_config(),
        subnet_config(),
        subnet_network_acl_association_config(),
        subnet_route_table_association_config(),
        eip_config(),
        nat_gateway_config(),
        vpc_peering_connection_config(),
        vpc_endpoint_config(),
    ]
}

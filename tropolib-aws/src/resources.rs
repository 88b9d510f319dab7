//! CloudFormation type names of the resources this crate emits

// EC2 networking
pub const VPC: &str = "AWS::EC2::VPC";
pub const INTERNET_GATEWAY: &str = "AWS::EC2::InternetGateway";
pub const VPC_GATEWAY_ATTACHMENT: &str = "AWS::EC2::VPCGatewayAttachment";
pub const ROUTE_TABLE: &str = "AWS::EC2::RouteTable";
pub const ROUTE: &str = "AWS::EC2::Route";
pub const NETWORK_ACL: &str = "AWS::EC2::NetworkAcl";
pub const NETWORK_ACL_ENTRY: &str = "AWS::EC2::NetworkAclEntry";
pub const SUBNET: &str = "AWS::EC2::Subnet";
pub const SUBNET_NETWORK_ACL_ASSOCIATION: &str = "AWS::EC2::SubnetNetworkAclAssociation";
pub const SUBNET_ROUTE_TABLE_ASSOCIATION: &str = "AWS::EC2::SubnetRouteTableAssociation";
pub const EIP: &str = "AWS::EC2::EIP";
pub const NAT_GATEWAY: &str = "AWS::EC2::NatGateway";
pub const VPC_PEERING_CONNECTION: &str = "AWS::EC2::VPCPeeringConnection";
pub const VPC_ENDPOINT: &str = "AWS::EC2::VPCEndpoint";

// API Gateway V2
pub const API: &str = "AWS::ApiGatewayV2::Api";
pub const STAGE: &str = "AWS::ApiGatewayV2::Stage";
pub const INTEGRATION: &str = "AWS::ApiGatewayV2::Integration";
pub const API_ROUTE: &str = "AWS::ApiGatewayV2::Route";

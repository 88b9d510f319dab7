use serde_json::{Value as Json, json};
use tropolib_aws::{
    HttpApi, LogFormat, PeeringOptions, RouteOptions, StageOptions, VpcOptions, VpcTemplate,
};

fn three_tier_vpc() -> VpcTemplate {
    let mut vpc = VpcTemplate::new(
        "eu-west-1",
        "10.10.0.0/16",
        VpcOptions {
            name: "Prod".to_string(),
            internal_networks: vec!["172.16.0.0/12".to_string()],
            description: Some("Production network".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    vpc.add_public_subnet_group("Public", "10.10.0.0/20", 4, true)
        .unwrap();
    vpc.add_natted_subnet_group("App", "10.10.16.0/20", 4)
        .unwrap();
    vpc.peer_with_another_vpc(
        "vpc-0shared",
        "shared",
        PeeringOptions {
            cidrs: vec!["10.200.0.0/16".to_string()],
            ..Default::default()
        },
    )
    .unwrap();
    vpc.set_s3_endpoint().unwrap();
    vpc
}

fn resources_of_type<'a>(document: &'a Json, resource_type: &str) -> Vec<&'a String> {
    document["Resources"]
        .as_object()
        .unwrap()
        .iter()
        .filter(|(_, r)| r["Type"] == resource_type)
        .map(|(title, _)| title)
        .collect()
}

#[test]
fn vpc_renders_complete_json_document() {
    let document: Json = serde_json::from_str(&three_tier_vpc().generate_json().unwrap()).unwrap();

    assert_eq!(document["AWSTemplateFormatVersion"], "2010-09-09");
    assert_eq!(document["Description"], "Production network");
    assert_eq!(
        document["Outputs"]["VpcId"],
        json!({
            "Value": {"Ref": "ProdVpc"},
            "Export": {"Name": {"Fn::Sub": "${AWS::StackName}-vpc-id"}}
        })
    );

    assert_eq!(resources_of_type(&document, "AWS::EC2::Subnet").len(), 8);
    assert_eq!(resources_of_type(&document, "AWS::EC2::NatGateway").len(), 3);
    assert_eq!(
        resources_of_type(&document, "AWS::EC2::SubnetRouteTableAssociation").len(),
        8
    );

    let subnet = &document["Resources"]["App2"];
    assert_eq!(subnet["Properties"]["CidrBlock"], "10.10.20.0/22");
    assert_eq!(subnet["Properties"]["AvailabilityZone"], "eu-west-1b");
    assert_eq!(subnet["Properties"]["VpcId"], json!({"Ref": "ProdVpc"}));
    assert_eq!(
        subnet["Properties"]["Tags"],
        json!([{"Key": "Name", "Value": "App B"}])
    );
    assert_eq!(subnet["Metadata"]["az_index"], "B");

    assert_eq!(
        document["Resources"]["PubRoute"]["DependsOn"],
        json!(["IgwAttachment"])
    );
    assert_eq!(
        document["Resources"]["PubNaclInInternal0"]["Properties"]["CidrBlock"],
        "172.16.0.0/12"
    );
    assert_eq!(
        document["Resources"]["PubNaclInVpc"]["Properties"]["CidrBlock"],
        json!({"Fn::GetAtt": ["ProdVpc", "CidrBlock"]})
    );

    // three private tables and the public one each get a peering route
    let peering_routes: Vec<&String> = resources_of_type(&document, "AWS::EC2::Route")
        .into_iter()
        .filter(|title| title.ends_with("Peer1020000016Route"))
        .collect();
    assert_eq!(peering_routes.len(), 4);

    assert_eq!(
        document["Resources"]["ProdS3EndpointGateway"]["Properties"]["RouteTableIds"],
        json!([
            {"Ref": "PrivRouteTable1"},
            {"Ref": "PrivRouteTable2"},
            {"Ref": "PrivRouteTable3"}
        ])
    );
}

#[test]
fn yaml_and_json_describe_the_same_template() {
    let vpc = three_tier_vpc();
    let from_yaml: Json = serde_yaml::from_str(&vpc.generate().unwrap()).unwrap();
    let from_json: Json = serde_json::from_str(&vpc.generate_json().unwrap()).unwrap();
    assert_eq!(from_yaml, from_json);
}

#[test]
fn http_api_joins_a_vpc_template() {
    let vpc = three_tier_vpc();
    let mut template = vpc.template().unwrap();

    let mut api = HttpApi::new("orders", None).unwrap();
    api.add_stage(
        "prod",
        StageOptions {
            auto_deploy: true,
            log_format: LogFormat::Json,
        },
    )
    .unwrap();
    api.add_route("orders", "https://orders.internal", RouteOptions::default())
        .unwrap();
    api.add_to_template(&mut template).unwrap();
    template
        .validate(&tropolib_aws::schemas::registry())
        .unwrap();

    let document = template.to_json_value();
    assert_eq!(
        document["Resources"]["ordersRoute"]["Properties"]["RouteKey"],
        "ANY /orders"
    );
    assert_eq!(
        document["Resources"]["prodStage"]["Properties"]["AutoDeploy"],
        true
    );
}

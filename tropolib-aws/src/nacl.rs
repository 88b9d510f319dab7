//! Network ACL rule sets for public and internal subnets

use std::collections::BTreeMap;

use tropolib_core::{Resource, Value};

use crate::resources::NETWORK_ACL_ENTRY;
use crate::{BuildError, BuildResult};

pub const ANYWHERE: &str = "0.0.0.0/0";

/// First rule number used for internal networks
const INTERNAL_RULE_BASE: u16 = 101;
/// First rule number after the internal network range
const INTERNAL_RULE_LIMIT: u16 = 210;
/// How many internal networks fit between the VPC rule and the service rules
pub const MAX_INTERNAL_NETWORKS: usize = (INTERNAL_RULE_LIMIT - INTERNAL_RULE_BASE) as usize;

const EPHEMERAL_PORTS: (u16, u16) = (1024, 65535);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    All,
    Icmp,
    Tcp,
    Udp,
}

impl Protocol {
    /// IANA protocol number, -1 for all
    pub fn number(self) -> i64 {
        match self {
            Protocol::All => -1,
            Protocol::Icmp => 1,
            Protocol::Tcp => 6,
            Protocol::Udp => 17,
        }
    }
}

/// One allow entry of a network ACL, titled `<nacl title><name>`
#[derive(Debug, Clone, PartialEq)]
pub struct NaclRule {
    pub name: String,
    pub rule_number: u16,
    pub egress: bool,
    pub protocol: Protocol,
    pub cidr: Value,
    pub ports: Option<(u16, u16)>,
}

impl NaclRule {
    fn ingress(name: impl Into<String>, rule_number: u16, protocol: Protocol, cidr: Value) -> Self {
        Self {
            name: name.into(),
            rule_number,
            egress: false,
            protocol,
            cidr,
            ports: None,
        }
    }

    fn egress(name: impl Into<String>, rule_number: u16, protocol: Protocol, cidr: Value) -> Self {
        Self {
            egress: true,
            ..Self::ingress(name, rule_number, protocol, cidr)
        }
    }

    fn ports(mut self, from: u16, to: u16) -> Self {
        self.ports = Some((from, to));
        self
    }

    /// The `AWS::EC2::NetworkAclEntry` for this rule in `nacl`
    pub fn entry(&self, nacl: &Resource) -> Resource {
        let mut entry = Resource::new(NETWORK_ACL_ENTRY, format!("{}{}", nacl.title, self.name))
            .with_property("NetworkAclId", nacl.reference())
            .with_property("Egress", self.egress)
            .with_property("RuleNumber", self.rule_number)
            .with_property("CidrBlock", self.cidr.clone())
            .with_property("Protocol", self.protocol.number())
            .with_property("RuleAction", "allow");
        if self.protocol == Protocol::Icmp {
            entry.set_property(
                "Icmp",
                Value::Map(BTreeMap::from([
                    ("Code".to_string(), Value::Int(-1)),
                    ("Type".to_string(), Value::Int(-1)),
                ])),
            );
        }
        if let Some((from, to)) = self.ports {
            entry.set_property(
                "PortRange",
                Value::Map(BTreeMap::from([
                    ("From".to_string(), Value::from(from)),
                    ("To".to_string(), Value::from(to)),
                ])),
            );
        }
        entry
    }
}

fn check_internal_networks(internal_networks: &[String]) -> BuildResult<()> {
    if internal_networks.len() > MAX_INTERNAL_NETWORKS {
        return Err(BuildError::TooManyInternalNetworks {
            count: internal_networks.len(),
            max: MAX_INTERNAL_NETWORKS,
        });
    }
    Ok(())
}

/// Rules shared by both ACLs, up to and including the internal networks
fn base_rules(vpc: &Resource, internal_networks: &[String]) -> Vec<NaclRule> {
    let mut rules = vec![
        NaclRule::egress("OutAll", 500, Protocol::All, ANYWHERE.into()),
        NaclRule::ingress("InIcmp", 99, Protocol::Icmp, ANYWHERE.into()),
        NaclRule::ingress("InVpc", 100, Protocol::All, vpc.get_att("CidrBlock")),
    ];
    let mut rule_number = INTERNAL_RULE_BASE;
    for (index, cidr) in internal_networks.iter().enumerate() {
        rules.push(NaclRule::ingress(
            format!("InInternal{}", index),
            rule_number,
            Protocol::All,
            cidr.as_str().into(),
        ));
        rule_number += 1;
    }
    rules
}

/// Return traffic for connections opened from inside
fn ephemeral_rules() -> Vec<NaclRule> {
    let (from, to) = EPHEMERAL_PORTS;
    vec![
        NaclRule::ingress("InNatTcp", 500, Protocol::Tcp, ANYWHERE.into()).ports(from, to),
        NaclRule::ingress("InNatUdp", 501, Protocol::Udp, ANYWHERE.into()).ports(from, to),
    ]
}

/// Rules for subnets reachable from the internet: SSH, HTTP and HTTPS
pub fn public_rules(vpc: &Resource, internal_networks: &[String]) -> BuildResult<Vec<NaclRule>> {
    check_internal_networks(internal_networks)?;
    let mut rules = base_rules(vpc, internal_networks);
    rules.extend([
        NaclRule::ingress("InSsh", 210, Protocol::Tcp, ANYWHERE.into()).ports(22, 22),
        NaclRule::ingress("InHttp", 220, Protocol::Tcp, ANYWHERE.into()).ports(80, 80),
        NaclRule::ingress("InHttps", 221, Protocol::Tcp, ANYWHERE.into()).ports(443, 443),
    ]);
    rules.extend(ephemeral_rules());
    Ok(rules)
}

/// Rules for private subnets: nothing inbound from the internet except return traffic
pub fn internal_rules(vpc: &Resource, internal_networks: &[String]) -> BuildResult<Vec<NaclRule>> {
    check_internal_networks(internal_networks)?;
    let mut rules = base_rules(vpc, internal_networks);
    rules.extend(ephemeral_rules());
    Ok(rules)
}

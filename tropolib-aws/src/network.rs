//! Multi-AZ CIDR partitioning
//!
//! A block is split into a power-of-two number of equally sized subnets which
//! are handed out to availability zones round-robin, in zone order.

use std::fmt;
use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;
use log::{debug, warn};

use crate::utils::normalize_availability_zone;
use crate::zones::availability_zones;

/// Longest prefix AWS accepts for a subnet
pub const MAX_SUBNET_PREFIX: u8 = 28;

/// Most subnets a single split may produce
pub const MAX_SUBNET_COUNT: u32 = 256;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
    #[error("Invalid CIDR block '{cidr}': {reason}")]
    InvalidCidr { cidr: String, reason: String },

    #[error("CIDR block '{cidr}' has host bits set, expected '{network}'")]
    HostBitsSet { cidr: String, network: String },

    #[error("Number of subnets must be a power of 2, got {0}")]
    InvalidSubnetCount(u32),

    #[error("Can't split into {count} subnets, at most {max} are allowed")]
    TooManySubnets { count: u32, max: u32 },

    #[error("Can't split {cidr} into {count} subnets: they would be smaller than /{max_prefix}")]
    AddressSpaceExhausted {
        cidr: String,
        count: u32,
        max_prefix: u8,
    },

    #[error("Unknown region '{0}'")]
    UnknownRegion(String),

    #[error("No availability zones to place subnets in")]
    NoZones,
}

pub type NetworkResult<T> = Result<T, NetworkError>;

/// One subnet of a split, with the zone it was assigned to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetSegment {
    /// Full zone name (e.g., "eu-west-1a")
    pub az: String,
    pub cidr: Ipv4Network,
}

impl fmt::Display for NetSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.cidr, self.az)
    }
}

/// Parse an IPv4 CIDR block, rejecting addresses with host bits set
pub fn parse_cidr(cidr: &str) -> NetworkResult<Ipv4Network> {
    let cidr = cidr.trim();
    if !cidr.contains('/') {
        return Err(NetworkError::InvalidCidr {
            cidr: cidr.to_string(),
            reason: "expected IP/prefix".to_string(),
        });
    }
    let net: Ipv4Network = cidr.parse().map_err(|e| NetworkError::InvalidCidr {
        cidr: cidr.to_string(),
        reason: format!("{}", e),
    })?;
    if net.ip() != net.network() {
        return Err(NetworkError::HostBitsSet {
            cidr: cidr.to_string(),
            network: format!("{}/{}", net.network(), net.prefix()),
        });
    }
    Ok(net)
}

/// Split `cidr` into `count` subnets spread over `zones`
pub fn split_net_across_zones(
    cidr: &str,
    zones: &[String],
    count: u32,
) -> NetworkResult<Vec<NetSegment>> {
    if zones.is_empty() {
        return Err(NetworkError::NoZones);
    }
    if !count.is_power_of_two() {
        return Err(NetworkError::InvalidSubnetCount(count));
    }
    if count > MAX_SUBNET_COUNT {
        return Err(NetworkError::TooManySubnets {
            count,
            max: MAX_SUBNET_COUNT,
        });
    }
    let net = parse_cidr(cidr)?;

    let new_prefix = u32::from(net.prefix()) + count.trailing_zeros();
    if new_prefix > u32::from(MAX_SUBNET_PREFIX) {
        return Err(NetworkError::AddressSpaceExhausted {
            cidr: net.to_string(),
            count,
            max_prefix: MAX_SUBNET_PREFIX,
        });
    }
    if count as usize > zones.len() {
        warn!(
            "{} subnets requested but only {} availability zones, some zones get more than one",
            count,
            zones.len()
        );
    }

    let base = u64::from(u32::from(net.network()));
    let step = 1u64 << (32 - new_prefix);
    let mut segments = Vec::with_capacity(count as usize);
    for i in 0..u64::from(count) {
        // base + i * step stays inside the parent block
        let addr = Ipv4Addr::from((base + i * step) as u32);
        let subnet =
            Ipv4Network::new(addr, new_prefix as u8).map_err(|e| NetworkError::InvalidCidr {
                cidr: format!("{}/{}", addr, new_prefix),
                reason: format!("{}", e),
            })?;
        let az = normalize_availability_zone(&zones[i as usize % zones.len()]);
        segments.push(NetSegment { az, cidr: subnet });
    }

    debug!(
        "split {} into {}",
        net,
        segments
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(segments)
}

/// Split `cidr` across the availability zones of `region`
pub fn split_net_across_region(
    cidr: &str,
    region: &str,
    count: u32,
) -> NetworkResult<Vec<NetSegment>> {
    let zones =
        availability_zones(region).ok_or_else(|| NetworkError::UnknownRegion(region.to_string()))?;
    split_net_across_zones(cidr, &zones, count)
}

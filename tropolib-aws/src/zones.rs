//! Availability zone catalog
//!
//! Zone letters per region as they are commonly exposed to accounts. The
//! mapping of letters to physical zones differs between accounts, but the
//! letters themselves are stable, which is all template generation needs.

use crate::utils::normalize_region;

const ZONES: &[(&str, &[char])] = &[
    ("ap-northeast-1", &['a', 'c', 'd']),
    ("ap-northeast-2", &['a', 'b', 'c', 'd']),
    ("ap-northeast-3", &['a', 'b', 'c']),
    ("ap-south-1", &['a', 'b', 'c']),
    ("ap-southeast-1", &['a', 'b', 'c']),
    ("ap-southeast-2", &['a', 'b', 'c']),
    ("ca-central-1", &['a', 'b', 'd']),
    ("eu-central-1", &['a', 'b', 'c']),
    ("eu-north-1", &['a', 'b', 'c']),
    ("eu-west-1", &['a', 'b', 'c']),
    ("eu-west-2", &['a', 'b', 'c']),
    ("eu-west-3", &['a', 'b', 'c']),
    ("sa-east-1", &['a', 'b', 'c']),
    ("us-east-1", &['a', 'b', 'c', 'd', 'e', 'f']),
    ("us-east-2", &['a', 'b', 'c']),
    ("us-west-1", &['a', 'c']),
    ("us-west-2", &['a', 'b', 'c', 'd']),
];

/// Known regions, sorted
pub fn regions() -> Vec<&'static str> {
    ZONES.iter().map(|(region, _)| *region).collect()
}

/// Availability zones of a region (e.g., "eu-west-1" -> ["eu-west-1a", ...])
pub fn availability_zones(region: &str) -> Option<Vec<String>> {
    let region = normalize_region(region);
    ZONES
        .iter()
        .find(|(name, _)| *name == region)
        .map(|(name, letters)| {
            letters
                .iter()
                .map(|letter| format!("{}{}", name, letter))
                .collect()
        })
}

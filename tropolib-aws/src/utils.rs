//! Utility functions for region and availability zone names

/// Normalize region value (e.g., "eu_west_1" -> "eu-west-1", "EU-WEST-1" -> "eu-west-1")
pub fn normalize_region(s: &str) -> String {
    s.trim().replace('_', "-").to_lowercase()
}

/// Normalize availability zone value (e.g., "eu_west_1a" -> "eu-west-1a")
pub fn normalize_availability_zone(s: &str) -> String {
    s.trim().replace('_', "-").to_lowercase()
}

/// Upper-cased zone letter (e.g., "eu-west-1a" -> "A")
pub fn az_index(zone: &str) -> String {
    zone.chars()
        .next_back()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_region() {
        assert_eq!(normalize_region("eu_west_1"), "eu-west-1");
        assert_eq!(normalize_region(" US-EAST-1 "), "us-east-1");
    }

    #[test]
    fn test_normalize_availability_zone() {
        assert_eq!(normalize_availability_zone("ap_northeast_1a"), "ap-northeast-1a");
        assert_eq!(normalize_availability_zone("eu-west-1B"), "eu-west-1b");
    }

    #[test]
    fn test_az_index() {
        assert_eq!(az_index("eu-west-1a"), "A");
        assert_eq!(az_index("us-east-1f"), "F");
        assert_eq!(az_index(""), "");
    }
}

//! Naming helpers for template titles
//!
//! CloudFormation logical IDs only accept ASCII letters and digits, so titles
//! derived from user supplied names are filtered through [`alphanum`].

/// Maximum length of a logical ID
pub const MAX_TITLE_LEN: usize = 255;

/// Keep only ASCII alphanumeric characters
/// e.g., "10.1.0.0/16" -> "1010016", "my-api" -> "myapi"
pub fn alphanum(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// Upper-case the first character and lower-case the rest
/// e.g., "pUBLIC" -> "Public"
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
    }
}

/// Check that a title can be used as a logical ID
pub fn is_valid_title(title: &str) -> bool {
    !title.is_empty()
        && title.len() <= MAX_TITLE_LEN
        && title.chars().all(|c| c.is_ascii_alphanumeric())
}

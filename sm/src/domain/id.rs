//! Domain ID generation
//!
//! All IDs use the format: `{6-char-hex}-{type}-{slug}`
//! Example: `7f3c2a-roadmap-learn-react`

/// Generate a domain ID from type and title
///
/// The hex prefix is taken from the random tail of a UUIDv7, not its
/// timestamp head, so ids stay unique even for identical titles created
/// in the same instant.
pub fn generate_id(domain_type: &str, title: &str) -> String {
    let uuid = uuid::Uuid::now_v7().simple().to_string();
    let hex_prefix = &uuid[uuid.len() - 6..];
    let slug = slugify(title);
    format!("{}-{}-{}", hex_prefix, domain_type, slug)
}

/// Slugify a title for use in IDs
pub fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        // Strip apostrophes entirely, replace other non-alphanumeric with hyphens
        .filter_map(|c| {
            if c.is_alphanumeric() {
                Some(c)
            } else if c == '\'' || c == '\u{2019}' || c == '\u{2018}' {
                None
            } else {
                Some('-')
            }
        })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .take(50)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_format() {
        let id = generate_id("roadmap", "Learn React");
        let parts: Vec<&str> = id.splitn(3, '-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 6);
        assert_eq!(parts[1], "roadmap");
        assert_eq!(parts[2], "learn-react");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Learn React"), "learn-react");
        assert_eq!(slugify("Rust's Ownership Model"), "rusts-ownership-model");
        assert_eq!(slugify("  CSS: Flexbox & Grid  "), "css-flexbox-grid");
    }

    #[test]
    fn test_slugify_truncates() {
        let long = "x".repeat(100);
        assert_eq!(slugify(&long).len(), 50);
    }

    #[test]
    fn test_ids_are_unique() {
        let a = generate_id("subtask", "Same Title");
        let b = generate_id("subtask", "Same Title");
        assert_ne!(a, b);
    }
}

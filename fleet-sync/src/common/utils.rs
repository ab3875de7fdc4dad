use crate::common::constants::{COMMIT_HASH_MIN_LEN, SHORT_HASH_LEN};

/// Return the displayable version of an image reference.
///
/// The version is the tag after the last `:` of the final path segment (a registry port is
/// not a tag), or the digest after `@sha256:`. Long hex versions are commit hashes and are
/// shortened, so `app:abc1234567890123456789012345678901` yields `abc1234`.
/// An image without a tag yields `latest`.
pub fn get_image_version(image: &str) -> String {
    let image = image.trim();
    if let Some((_, digest)) = image.split_once('@') {
        let digest = digest.rsplit(':').next().unwrap_or(digest);
        return shorten(digest);
    }
    let last_segment = image.rsplit('/').next().unwrap_or(image);
    match last_segment.rsplit_once(':') {
        Some((_, tag)) if !tag.is_empty() => shorten_hash(tag),
        _ if image.is_empty() => String::new(),
        _ => "latest".to_string(),
    }
}

/// Shorten a tag when it looks like a commit hash.
fn shorten_hash(tag: &str) -> String {
    if tag.len() >= COMMIT_HASH_MIN_LEN && tag.chars().all(|c| c.is_ascii_hexdigit()) {
        shorten(tag)
    } else {
        tag.to_string()
    }
}

fn shorten(value: &str) -> String {
    value.chars().take(SHORT_HASH_LEN).collect()
}

/// Pluralize a noun for a count, `1 service`, `3 services`.
pub fn plural(count: usize, noun: &str) -> String {
    match count {
        1 => format!("1 {noun}"),
        n => format!("{n} {noun}s"),
    }
}

#[cfg(test)]
mod tests {
    use super::{get_image_version, plural};

    #[test]
    fn commit_hash_tags_are_shortened() {
        assert_eq!(
            get_image_version("app:abc1234567890123456789012345678901"),
            "abc1234"
        );
        assert_eq!(
            get_image_version("registry.local:5000/team/app:0123456789abcdef0123456789abcdef01234567"),
            "0123456"
        );
    }

    #[test]
    fn semantic_tags_are_kept() {
        assert_eq!(get_image_version("nginx:1.25.3"), "1.25.3");
        assert_eq!(get_image_version("registry.local:5000/app:v2"), "v2");
        assert_eq!(get_image_version("app:deadbeef"), "deadbeef");
    }

    #[test]
    fn missing_tag_and_digest() {
        assert_eq!(get_image_version("registry.local:5000/app"), "latest");
        assert_eq!(get_image_version("app@sha256:9f86d081884c7d65"), "9f86d08");
        assert_eq!(get_image_version(""), "");
    }

    #[test]
    fn plural_nouns() {
        assert_eq!(plural(1, "service"), "1 service");
        assert_eq!(plural(3, "service"), "3 services");
    }
}

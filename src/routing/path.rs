//! Joining a route's base path with the inbound request path.

/// Combine `base` and `path` with exactly one `/` at the seam.
///
/// Only the seam is normalised; any other slashes are kept as supplied.
pub fn join_paths(base: &str, path: &str) -> String {
    if base.is_empty() {
        return if path.is_empty() { "/".to_string() } else { path.to_string() };
    }
    if path.is_empty() {
        return base.to_string();
    }

    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}

#[cfg(test)]
mod tests {
    use super::join_paths;

    #[test]
    fn empty_inputs() {
        assert_eq!(join_paths("", ""), "/");
        assert_eq!(join_paths("", "/x"), "/x");
        assert_eq!(join_paths("/api", ""), "/api");
    }

    #[test]
    fn seam_slash_is_deduplicated() {
        assert_eq!(join_paths("/api", "/v1/x"), "/api/v1/x");
        assert_eq!(join_paths("/api/", "/v1/x"), "/api/v1/x");
        assert_eq!(join_paths("/", "/hello"), "/hello");
    }

    #[test]
    fn seam_slash_is_inserted() {
        assert_eq!(join_paths("/api", "v1/x"), "/api/v1/x");
        assert_eq!(join_paths("/api/", "v1/x"), "/api/v1/x");
    }

    #[test]
    fn only_one_slash_is_dropped() {
        assert_eq!(join_paths("/api//", "//x"), "/api///x");
    }
}
